//! Audit trail vocabulary.
//!
//! Every meaningful transition of an attempt produces exactly one audit
//! record, appended before the state change becomes visible. Records are
//! ordered per attempt by a strictly increasing sequence number and are
//! never modified or deleted.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AttemptId, BlockReason, CaregiverId, CommitOutcome, CorrelationId, ResidentResponse,
    SafetyDecision, StateKind,
};

/// What happened to an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    AttemptCreated,
    SafetyCheckRequested {
        correlation_id: CorrelationId,
    },
    SafetyCheckEvaluated {
        safe: bool,
        score: f64,
        decision: SafetyDecision,
        destination: StateKind,
    },
    PolicyBlocked {
        reason: BlockReason,
    },
    ScanVerified {
        code: String,
    },
    ScanMismatch {
        failures: u32,
    },
    VerificationExhausted {
        failures: u32,
    },
    CaptureRecorded {
        response: ResidentResponse,
    },
    RequirementsResolved {
        witness_required: bool,
        signature_required: bool,
        destination: StateKind,
    },
    SignatureCaptured,
    SignatureCancelled,
    OverrideRecorded {
        reason: String,
    },
    AttemptCommitted {
        outcome: CommitOutcome,
    },
    AttemptAbandoned {
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
}

impl AuditEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AuditEvent::AttemptCreated => "attempt_created",
            AuditEvent::SafetyCheckRequested { .. } => "safety_check_requested",
            AuditEvent::SafetyCheckEvaluated { .. } => "safety_check_evaluated",
            AuditEvent::PolicyBlocked { .. } => "policy_blocked",
            AuditEvent::ScanVerified { .. } => "scan_verified",
            AuditEvent::ScanMismatch { .. } => "scan_mismatch",
            AuditEvent::VerificationExhausted { .. } => "verification_exhausted",
            AuditEvent::CaptureRecorded { .. } => "capture_recorded",
            AuditEvent::RequirementsResolved { .. } => "requirements_resolved",
            AuditEvent::SignatureCaptured => "signature_captured",
            AuditEvent::SignatureCancelled => "signature_cancelled",
            AuditEvent::OverrideRecorded { .. } => "override_recorded",
            AuditEvent::AttemptCommitted { .. } => "attempt_committed",
            AuditEvent::AttemptAbandoned { .. } => "attempt_abandoned",
        }
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One entry in an attempt's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Strictly increasing per attempt, starting at 0 with creation.
    pub sequence: u64,
    pub attempt_id: AttemptId,
    pub event: AuditEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<CaregiverId>,
    pub recorded_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(
        sequence: u64,
        attempt_id: AttemptId,
        event: AuditEvent,
        actor: Option<CaregiverId>,
    ) -> Self {
        Self {
            sequence,
            attempt_id,
            event,
            actor,
            recorded_at: Utc::now(),
        }
    }
}
