//! Administration attempts and their lifecycle states.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AttemptId, CaptureRecord, CaregiverId, CompletionRequirements, OrderId, OverrideRecord,
    ResidentId, SafetyCheckResult, SignatureRecord,
};

/// Why an attempt is blocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockReason {
    /// The safety check flagged the attempt unsafe with escalation required.
    EscalationRequired,
    /// The safety check demands explicit approval before proceeding.
    ApprovalRequired,
    /// Barcode verification failed more times than the configured bound.
    VerificationExhausted,
}

impl fmt::Display for BlockReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BlockReason::EscalationRequired => "escalation_required",
            BlockReason::ApprovalRequired => "approval_required",
            BlockReason::VerificationExhausted => "verification_exhausted",
        };
        f.write_str(s)
    }
}

/// The terminal outcome of a committed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitOutcome {
    Administered,
    Skipped,
    Refused,
}

impl fmt::Display for CommitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CommitOutcome::Administered => "administered",
            CommitOutcome::Skipped => "skipped",
            CommitOutcome::Refused => "refused",
        };
        f.write_str(s)
    }
}

/// Why an attempt failed terminally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    Abandoned,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Abandoned => f.write_str("abandoned"),
        }
    }
}

/// Payload-free discriminant of [`AttemptState`], used wherever lifecycle
/// position matters but the block reason or outcome does not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateKind {
    Created,
    SafetyCheckPending,
    AwaitingVerification,
    AwaitingCapture,
    CaptureComplete,
    AwaitingSignature,
    ReadyToCommit,
    Blocked,
    Committed,
    Failed,
}

impl StateKind {
    pub fn name(&self) -> &'static str {
        match self {
            StateKind::Created => "created",
            StateKind::SafetyCheckPending => "safety_check_pending",
            StateKind::AwaitingVerification => "awaiting_verification",
            StateKind::AwaitingCapture => "awaiting_capture",
            StateKind::CaptureComplete => "capture_complete",
            StateKind::AwaitingSignature => "awaiting_signature",
            StateKind::ReadyToCommit => "ready_to_commit",
            StateKind::Blocked => "blocked",
            StateKind::Committed => "committed",
            StateKind::Failed => "failed",
        }
    }
}

impl fmt::Display for StateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Lifecycle state of an administration attempt.
///
/// States advance monotonically along the edges the engine's transition
/// table declares. The only backward movements are explicit recoveries:
/// signature cancellation, abandonment to a re-enterable `Created`, and
/// leaving `Blocked` via fresh safety input or a recorded override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptState {
    Created,
    SafetyCheckPending,
    AwaitingVerification,
    AwaitingCapture,
    CaptureComplete,
    AwaitingSignature,
    ReadyToCommit,
    Blocked(BlockReason),
    Committed(CommitOutcome),
    Failed(FailureReason),
}

impl AttemptState {
    pub fn kind(&self) -> StateKind {
        match self {
            AttemptState::Created => StateKind::Created,
            AttemptState::SafetyCheckPending => StateKind::SafetyCheckPending,
            AttemptState::AwaitingVerification => StateKind::AwaitingVerification,
            AttemptState::AwaitingCapture => StateKind::AwaitingCapture,
            AttemptState::CaptureComplete => StateKind::CaptureComplete,
            AttemptState::AwaitingSignature => StateKind::AwaitingSignature,
            AttemptState::ReadyToCommit => StateKind::ReadyToCommit,
            AttemptState::Blocked(_) => StateKind::Blocked,
            AttemptState::Committed(_) => StateKind::Committed,
            AttemptState::Failed(_) => StateKind::Failed,
        }
    }

    /// Terminal states accept no further actions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, AttemptState::Committed(_) | AttemptState::Failed(_))
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self, AttemptState::Blocked(_))
    }
}

impl fmt::Display for AttemptState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptState::Blocked(reason) => write!(f, "blocked:{reason}"),
            AttemptState::Committed(outcome) => write!(f, "committed:{outcome}"),
            AttemptState::Failed(reason) => write!(f, "failed:{reason}"),
            other => f.write_str(other.kind().name()),
        }
    }
}

/// Barcode verification progress for the attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    /// The order's classification does not demand barcode verification.
    NotRequired,
    /// Verification is required and not yet satisfied.
    Pending { failures: u32 },
    /// A scan matched the expected medication.
    Verified {
        code: String,
        verified_at: DateTime<Utc>,
    },
}

impl VerificationStatus {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationStatus::Verified { .. })
    }

    pub fn is_required(&self) -> bool {
        !matches!(self, VerificationStatus::NotRequired)
    }

    pub fn failures(&self) -> u32 {
        match self {
            VerificationStatus::Pending { failures } => *failures,
            _ => 0,
        }
    }
}

/// A consumed safety-check result together with when the gate evaluated it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatedSafetyCheck {
    pub result: SafetyCheckResult,
    pub evaluated_at: DateTime<Utc>,
}

/// A single caregiver-initiated execution of a medication order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdministrationAttempt {
    pub id: AttemptId,
    pub order_id: OrderId,
    pub resident_id: ResidentId,
    pub initiated_by: CaregiverId,
    pub initiated_at: DateTime<Utc>,
    pub state: AttemptState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety: Option<EvaluatedSafetyCheck>,
    pub verification: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<CaptureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<CompletionRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_record: Option<OverrideRecord>,
    pub updated_at: DateTime<Utc>,
}

impl AdministrationAttempt {
    pub fn new(order_id: OrderId, resident_id: ResidentId, initiated_by: CaregiverId) -> Self {
        let now = Utc::now();
        Self {
            id: AttemptId::generate(),
            order_id,
            resident_id,
            initiated_by,
            initiated_at: now,
            state: AttemptState::Created,
            safety: None,
            verification: VerificationStatus::NotRequired,
            capture: None,
            requirements: None,
            signature: None,
            override_record: None,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Clear operational progress for re-entry after abandonment.
    ///
    /// The audit trail lives outside the attempt and is retained.
    pub fn reset_for_reentry(&mut self, verification: VerificationStatus) {
        self.state = AttemptState::Created;
        self.safety = None;
        self.verification = verification;
        self.capture = None;
        self.requirements = None;
        self.signature = None;
        self.updated_at = Utc::now();
    }

    pub fn snapshot(&self, audit_sequence: u64) -> AttemptSnapshot {
        AttemptSnapshot {
            attempt_id: self.id.clone(),
            order_id: self.order_id.clone(),
            resident_id: self.resident_id.clone(),
            initiated_by: self.initiated_by.clone(),
            initiated_at: self.initiated_at,
            state: self.state.clone(),
            safety: self.safety.clone(),
            verification: self.verification.clone(),
            capture: self.capture.clone(),
            requirements: self.requirements,
            signature: self.signature.clone(),
            override_record: self.override_record.clone(),
            audit_sequence,
            updated_at: self.updated_at,
        }
    }
}

/// Consistent point-in-time view of an attempt, returned by every
/// coordinator operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttemptSnapshot {
    pub attempt_id: AttemptId,
    pub order_id: OrderId,
    pub resident_id: ResidentId,
    pub initiated_by: CaregiverId,
    pub initiated_at: DateTime<Utc>,
    pub state: AttemptState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub safety: Option<EvaluatedSafetyCheck>,
    pub verification: VerificationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture: Option<CaptureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requirements: Option<CompletionRequirements>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<SignatureRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub override_record: Option<OverrideRecord>,
    /// Highest audit sequence assigned to this attempt at snapshot time.
    pub audit_sequence: u64,
    pub updated_at: DateTime<Utc>,
}
