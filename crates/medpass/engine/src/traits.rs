//! External collaborator traits.
//!
//! The engine coordinates; it never computes safety scores, decodes
//! barcodes, or persists records itself. Those concerns live behind these
//! traits, injected into the coordinator as `Arc<dyn ...>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use medpass_types::{
    AttemptId, CaptureRecord, CommitOutcome, CorrelationId, OrderId, ResidentId,
    SafetyCheckResult,
};
use serde::{Deserialize, Serialize};

/// Request sent to the external safety-check service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyCheckRequest {
    pub correlation_id: CorrelationId,
    pub attempt_id: AttemptId,
    pub resident_id: ResidentId,
    pub order_id: OrderId,
    pub medication_code: String,
    pub dosage: String,
    pub route: String,
    pub scheduled_at: DateTime<Utc>,
}

/// Failure reported by an external collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderFailure {
    #[error("service unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by the persistence collaborator.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreFailure {
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
}

/// Failure reported by the audit sink.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SinkFailure {
    #[error("audit sink unavailable: {0}")]
    Unavailable(String),
}

/// Confirmation that an outcome was durably recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
    pub attempt_id: AttemptId,
    pub outcome: CommitOutcome,
    pub persisted_at: DateTime<Utc>,
}

/// Clinical decision support service performing the safety screen.
///
/// Implemented by the facility's CDS integration; use
/// [`MockSafetyCheckProvider`](crate::mocks::MockSafetyCheckProvider) in
/// tests.
#[async_trait]
pub trait SafetyCheckProvider: Send + Sync {
    async fn perform_check(
        &self,
        request: SafetyCheckRequest,
    ) -> Result<SafetyCheckResult, ProviderFailure>;
}

/// Barcode validation against the expected medication package code.
#[async_trait]
pub trait BarcodeValidator: Send + Sync {
    /// Whether the scanned code identifies the expected medication.
    async fn validate(&self, scanned_code: &str, medication_code: &str) -> bool;
}

/// Durable record keeper for committed outcomes.
#[async_trait]
pub trait AdministrationStore: Send + Sync {
    /// Persist an administered (or partially administered) dose.
    async fn administer(
        &self,
        attempt_id: &AttemptId,
        order_id: &OrderId,
        record: &CaptureRecord,
    ) -> Result<PersistedRecord, StoreFailure>;

    /// Persist a dose that was not given, with the reason.
    async fn skip(
        &self,
        attempt_id: &AttemptId,
        order_id: &OrderId,
        outcome: CommitOutcome,
        reason: &str,
    ) -> Result<PersistedRecord, StoreFailure>;
}

/// Downstream audit log consumer.
///
/// Called synchronously on the audit path; implementations must be quick
/// and must never panic. A failure here is reported on the incident
/// channel, never to the clinical workflow.
pub trait AuditSink: Send + Sync {
    fn log_event(&self, record: &medpass_types::AuditRecord) -> Result<(), SinkFailure>;
}
