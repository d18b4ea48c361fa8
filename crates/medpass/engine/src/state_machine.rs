//! The administration transition table.
//!
//! Single authority on which actions are admissible in which states and
//! which state edges exist at all. The coordinator consults it before every
//! mutation; anything not declared here cannot happen.

use medpass_types::{ActionKind, AttemptState, StateKind, WorkflowError, WorkflowResult};

/// Declared lifecycle edges, by state kind.
///
/// Backward edges are limited to the explicit recoveries: signature
/// cancellation, abandonment to `Created`, and leaving `Blocked`.
const EDGES: &[(StateKind, StateKind)] = &[
    // Safety-check submission always passes through the pending state.
    (StateKind::Created, StateKind::SafetyCheckPending),
    (StateKind::Blocked, StateKind::SafetyCheckPending),
    (StateKind::AwaitingSignature, StateKind::SafetyCheckPending),
    // Gate evaluation routes out of pending.
    (StateKind::SafetyCheckPending, StateKind::AwaitingVerification),
    (StateKind::SafetyCheckPending, StateKind::AwaitingCapture),
    (StateKind::SafetyCheckPending, StateKind::AwaitingSignature),
    (StateKind::SafetyCheckPending, StateKind::Blocked),
    // Verification.
    (StateKind::AwaitingVerification, StateKind::AwaitingCapture),
    (StateKind::AwaitingVerification, StateKind::Blocked),
    // Capture and completion requirements.
    (StateKind::AwaitingCapture, StateKind::CaptureComplete),
    (StateKind::CaptureComplete, StateKind::AwaitingSignature),
    (StateKind::CaptureComplete, StateKind::ReadyToCommit),
    // Signature.
    (StateKind::AwaitingSignature, StateKind::ReadyToCommit),
    (StateKind::AwaitingSignature, StateKind::CaptureComplete),
    // Commit.
    (StateKind::ReadyToCommit, StateKind::Committed),
    // Skip/refuse short-circuits.
    (StateKind::Created, StateKind::Committed),
    (StateKind::AwaitingVerification, StateKind::Committed),
    (StateKind::AwaitingCapture, StateKind::Committed),
    // Override exits from a block.
    (StateKind::Blocked, StateKind::AwaitingVerification),
    (StateKind::Blocked, StateKind::AwaitingCapture),
    // Abandonment, re-enterable form.
    (StateKind::Created, StateKind::Created),
    (StateKind::SafetyCheckPending, StateKind::Created),
    (StateKind::AwaitingVerification, StateKind::Created),
    (StateKind::AwaitingCapture, StateKind::Created),
    (StateKind::CaptureComplete, StateKind::Created),
    (StateKind::AwaitingSignature, StateKind::Created),
    (StateKind::ReadyToCommit, StateKind::Created),
    (StateKind::Blocked, StateKind::Created),
    // Abandonment, terminal form.
    (StateKind::Created, StateKind::Failed),
    (StateKind::SafetyCheckPending, StateKind::Failed),
    (StateKind::AwaitingVerification, StateKind::Failed),
    (StateKind::AwaitingCapture, StateKind::Failed),
    (StateKind::CaptureComplete, StateKind::Failed),
    (StateKind::AwaitingSignature, StateKind::Failed),
    (StateKind::ReadyToCommit, StateKind::Failed),
    (StateKind::Blocked, StateKind::Failed),
];

/// Validates actions and transitions against the declared table.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable;

impl TransitionTable {
    pub fn new() -> Self {
        Self
    }

    /// Actions a caller may submit in the given state.
    pub fn admissible_actions(&self, state: &AttemptState) -> &'static [ActionKind] {
        match state.kind() {
            StateKind::Created => &[
                ActionKind::SubmitSafetyCheck,
                ActionKind::Skip,
                ActionKind::Refuse,
                ActionKind::Abandon,
            ],
            StateKind::SafetyCheckPending => {
                &[ActionKind::SubmitSafetyCheck, ActionKind::Abandon]
            }
            StateKind::AwaitingVerification => &[
                ActionKind::Scan,
                ActionKind::Skip,
                ActionKind::Refuse,
                ActionKind::Abandon,
            ],
            StateKind::AwaitingCapture => &[
                ActionKind::Capture,
                ActionKind::Skip,
                ActionKind::Refuse,
                ActionKind::Abandon,
            ],
            StateKind::CaptureComplete => &[ActionKind::Sign, ActionKind::Abandon],
            StateKind::AwaitingSignature => &[
                ActionKind::Sign,
                ActionKind::CancelSignature,
                ActionKind::SubmitSafetyCheck,
                ActionKind::Abandon,
            ],
            StateKind::ReadyToCommit => &[ActionKind::Commit, ActionKind::Abandon],
            StateKind::Blocked => &[
                ActionKind::SubmitSafetyCheck,
                ActionKind::Override,
                ActionKind::Abandon,
            ],
            StateKind::Committed | StateKind::Failed => &[],
        }
    }

    /// Reject actions the current state does not admit.
    ///
    /// Terminal states reject everything. A blocked attempt reports the
    /// block reason for any action other than its three legitimate exits,
    /// so callers learn why they are stopped rather than merely that the
    /// action was wrong.
    pub fn ensure_admissible(
        &self,
        state: &AttemptState,
        action: ActionKind,
    ) -> WorkflowResult<()> {
        if state.is_terminal() {
            return Err(WorkflowError::AlreadyTerminal {
                state: state.clone(),
            });
        }

        if let AttemptState::Blocked(reason) = state {
            return match action {
                ActionKind::SubmitSafetyCheck | ActionKind::Override | ActionKind::Abandon => {
                    Ok(())
                }
                _ => Err(WorkflowError::PolicyBlocked { reason: *reason }),
            };
        }

        if self.admissible_actions(state).contains(&action) {
            Ok(())
        } else {
            Err(WorkflowError::InvalidAction {
                action,
                state: state.clone(),
            })
        }
    }

    /// Whether the table declares the edge.
    pub fn edge_exists(&self, from: StateKind, to: StateKind) -> bool {
        EDGES.contains(&(from, to))
    }

    /// All declared edges.
    pub fn edges(&self) -> &'static [(StateKind, StateKind)] {
        EDGES
    }
}
