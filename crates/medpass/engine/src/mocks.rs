//! Mock collaborators for testing.
//!
//! Each mock builds its responses from the incoming request, so results
//! always match the attempt's order and resident the way a real
//! integration's would.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use medpass_types::{
    AlertCategory, AlertSeverity, AttemptId, AuditRecord, CaptureRecord, CommitOutcome, OrderId,
    SafetyAlert, SafetyCheckResult,
};

use crate::traits::{
    AdministrationStore, AuditSink, BarcodeValidator, PersistedRecord, ProviderFailure,
    SafetyCheckProvider, SafetyCheckRequest, SinkFailure, StoreFailure,
};

enum ProviderVerdict {
    Clear,
    Advisory,
    UnsafeEscalating,
    ApprovalRequired,
    Unavailable,
}

/// Mock safety-check provider for testing.
///
/// Configured with a fixed verdict; the result is built against the
/// requesting order and resident so the gate accepts it.
pub struct MockSafetyCheckProvider {
    verdict: ProviderVerdict,
    /// Calls that fail with `Unavailable` before the verdict applies.
    failures_before_success: usize,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockSafetyCheckProvider {
    /// A provider whose screens come back clean.
    pub fn clear() -> Self {
        Self::with_verdict(ProviderVerdict::Clear)
    }

    /// Unsafe but non-escalating: carries a medium-severity advisory alert.
    pub fn advisory() -> Self {
        Self::with_verdict(ProviderVerdict::Advisory)
    }

    /// Unsafe and escalation-required: carries a critical alert.
    pub fn unsafe_escalating() -> Self {
        Self::with_verdict(ProviderVerdict::UnsafeEscalating)
    }

    /// Safe, but the order needs a recorded approval before it can move.
    pub fn approval_required() -> Self {
        Self::with_verdict(ProviderVerdict::ApprovalRequired)
    }

    /// A provider that is down.
    pub fn unavailable() -> Self {
        Self::with_verdict(ProviderVerdict::Unavailable)
    }

    /// Fails the first call, then screens clean. For retry paths.
    pub fn unavailable_then_clear() -> Self {
        let mut provider = Self::with_verdict(ProviderVerdict::Clear);
        provider.failures_before_success = 1;
        provider
    }

    /// Delay every response, e.g. to trip the coordinator's timeout.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many checks have been requested.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn with_verdict(verdict: ProviderVerdict) -> Self {
        Self {
            verdict,
            failures_before_success: 0,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SafetyCheckProvider for MockSafetyCheckProvider {
    async fn perform_check(
        &self,
        request: SafetyCheckRequest,
    ) -> Result<SafetyCheckResult, ProviderFailure> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.failures_before_success {
            return Err(ProviderFailure::Unavailable("transient outage".into()));
        }

        let base = SafetyCheckResult::clear(request.resident_id, request.order_id);
        match self.verdict {
            ProviderVerdict::Clear => Ok(base),
            ProviderVerdict::Advisory => {
                let mut result = base
                    .with_alert(
                        SafetyAlert::new(
                            AlertCategory::Timing,
                            AlertSeverity::Medium,
                            "dose follows previous dose by less than the usual interval",
                        )
                        .with_recommendation("confirm last administration time")
                        .requiring_action(),
                    )
                    .with_score(0.35);
                result.safe = false;
                Ok(result)
            }
            ProviderVerdict::UnsafeEscalating => Ok(base
                .with_alert(
                    SafetyAlert::new(
                        AlertCategory::Interaction,
                        AlertSeverity::Critical,
                        "interacts with active anticoagulant order",
                    )
                    .requiring_action()
                    .requiring_escalation(),
                )
                .with_score(0.92)
                .unsafe_with_escalation()),
            ProviderVerdict::ApprovalRequired => Ok(base.requiring_approval()),
            ProviderVerdict::Unavailable => {
                Err(ProviderFailure::Unavailable("service down".into()))
            }
        }
    }
}

/// Mock barcode validator for testing.
///
/// Accepts a scan exactly when it matches the order's medication code.
pub struct MockBarcodeValidator {
    accept_any: bool,
}

impl MockBarcodeValidator {
    pub fn new() -> Self {
        Self { accept_any: false }
    }

    /// Accept every scan regardless of code.
    pub fn accept_any() -> Self {
        Self { accept_any: true }
    }
}

impl Default for MockBarcodeValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BarcodeValidator for MockBarcodeValidator {
    async fn validate(&self, scanned_code: &str, medication_code: &str) -> bool {
        self.accept_any || scanned_code == medication_code
    }
}

/// Mock administration store for testing.
///
/// Records every persisted outcome; can be flipped into a failing state to
/// exercise commit retry.
pub struct MockAdministrationStore {
    fail: AtomicBool,
    administered: Mutex<Vec<(AttemptId, OrderId, CaptureRecord)>>,
    skipped: Mutex<Vec<(AttemptId, OrderId, CommitOutcome, String)>>,
}

impl MockAdministrationStore {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            administered: Mutex::new(Vec::new()),
            skipped: Mutex::new(Vec::new()),
        }
    }

    /// A store that rejects every write.
    pub fn failing() -> Self {
        let store = Self::new();
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    /// Flip the failure state mid-test.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Doses persisted through [`AdministrationStore::administer`].
    pub fn administered(&self) -> Vec<(AttemptId, OrderId, CaptureRecord)> {
        self.administered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Outcomes persisted through [`AdministrationStore::skip`].
    pub fn skipped(&self) -> Vec<(AttemptId, OrderId, CommitOutcome, String)> {
        self.skipped
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn check_available(&self) -> Result<(), StoreFailure> {
        if self.fail.load(Ordering::SeqCst) {
            Err(StoreFailure::Unavailable("record store down".into()))
        } else {
            Ok(())
        }
    }
}

impl Default for MockAdministrationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AdministrationStore for MockAdministrationStore {
    async fn administer(
        &self,
        attempt_id: &AttemptId,
        order_id: &OrderId,
        record: &CaptureRecord,
    ) -> Result<PersistedRecord, StoreFailure> {
        self.check_available()?;
        self.administered
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((attempt_id.clone(), order_id.clone(), record.clone()));
        let outcome = if record.resident_response.is_refusal() {
            CommitOutcome::Refused
        } else {
            CommitOutcome::Administered
        };
        Ok(PersistedRecord {
            attempt_id: attempt_id.clone(),
            outcome,
            persisted_at: Utc::now(),
        })
    }

    async fn skip(
        &self,
        attempt_id: &AttemptId,
        order_id: &OrderId,
        outcome: CommitOutcome,
        reason: &str,
    ) -> Result<PersistedRecord, StoreFailure> {
        self.check_available()?;
        self.skipped
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((
                attempt_id.clone(),
                order_id.clone(),
                outcome,
                reason.to_string(),
            ));
        Ok(PersistedRecord {
            attempt_id: attempt_id.clone(),
            outcome,
            persisted_at: Utc::now(),
        })
    }
}

/// Mock audit sink for testing.
///
/// Keeps every forwarded record; can be configured to fail so tests can
/// observe the incident path.
pub struct MockAuditSink {
    fail: AtomicBool,
    records: Mutex<Vec<AuditRecord>>,
}

impl MockAuditSink {
    pub fn new() -> Self {
        Self {
            fail: AtomicBool::new(false),
            records: Mutex::new(Vec::new()),
        }
    }

    /// A sink that rejects every record.
    pub fn failing() -> Self {
        let sink = Self::new();
        sink.fail.store(true, Ordering::SeqCst);
        sink
    }

    /// Flip the failure state mid-test.
    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    /// Records successfully forwarded so far.
    pub fn recorded(&self) -> Vec<AuditRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl Default for MockAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MockAuditSink {
    fn log_event(&self, record: &AuditRecord) -> Result<(), SinkFailure> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(SinkFailure::Unavailable("downstream log down".into()));
        }
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record.clone());
        Ok(())
    }
}
