//! Error types for the administration workflow

use chrono::{DateTime, Utc};

use crate::{ActionKind, AttemptId, AttemptState, BlockReason, OrderId, Permission};

/// Errors that can occur in administration workflow operations.
///
/// Validation and conflict errors leave the attempt untouched. External
/// dependency failures (`SafetyCheckUnavailable`, `SafetyCheckTimeout`,
/// `CommitUnavailable`) leave the attempt where it was so the operation can
/// be retried. Policy blocks are recorded on the attempt before they are
/// surfaced here.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Attempt not found: {0}")]
    AttemptNotFound(AttemptId),

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Order already registered: {0}")]
    DuplicateOrder(OrderId),

    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("Refusal requires a reason")]
    MissingRefusalReason,

    #[error("A witness is required for this administration")]
    MissingWitness,

    #[error("Signature token must not be empty")]
    MissingSignatureToken,

    #[error("Administration time {administered_at} outside the window around {recorded_at}")]
    CaptureOutOfWindow {
        administered_at: DateTime<Utc>,
        recorded_at: DateTime<Utc>,
    },

    #[error("Action {action} not permitted in state {state}")]
    InvalidAction {
        action: ActionKind,
        state: AttemptState,
    },

    #[error("Stale transition: expected state {expected}, found {actual}")]
    StaleTransition {
        expected: AttemptState,
        actual: AttemptState,
    },

    #[error("Operation already in flight: {operation}")]
    OperationInProgress { operation: ActionKind },

    #[error("Attempt already terminal in state {state}")]
    AlreadyTerminal { state: AttemptState },

    #[error("No safety-check result for this attempt's order and resident")]
    MissingSafetyCheck,

    #[error("Safety-check result from {checked_at} is stale ({age_secs}s old)")]
    StaleSafetyCheck {
        checked_at: DateTime<Utc>,
        age_secs: i64,
    },

    #[error("Safety-check service unavailable: {detail}")]
    SafetyCheckUnavailable { detail: String },

    #[error("Safety check timed out after {waited_ms}ms")]
    SafetyCheckTimeout { waited_ms: u64 },

    #[error("Commit could not be persisted: {detail}")]
    CommitUnavailable { detail: String },

    #[error("Attempt is blocked: {reason}")]
    PolicyBlocked { reason: BlockReason },

    #[error("Caller lacks permission: {permission:?}")]
    PermissionDenied { permission: Permission },

    #[error("Internal lock poisoned")]
    LockError,
}

/// Result type alias for administration workflow operations
pub type WorkflowResult<T> = Result<T, WorkflowError>;
