//! The advance vocabulary: everything a caller can ask of an attempt.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{CapturePayload, SignatureToken};

/// An action submitted against an attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// Request a fresh safety check from the external service.
    SubmitSafetyCheck,
    /// Submit a barcode scan for identity verification.
    Scan { code: String },
    /// Record what was actually administered.
    Capture(CapturePayload),
    /// Provide the electronic signature the order demands.
    Sign { token: SignatureToken },
    /// Back out of the signature step without losing capture data.
    CancelSignature,
    /// Retry a commit whose persistence call failed.
    Commit,
    /// Close the attempt without administering, with a reason.
    Skip { reason: String },
    /// Record that the resident refused, with a reason.
    Refuse { reason: String },
    /// Walk away from the attempt. A reason is mandatory when policy
    /// designates abandonment terminal.
    Abandon { reason: Option<String> },
    /// Supervisor-authorized exit from a policy block.
    Override { reason: String },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::SubmitSafetyCheck => ActionKind::SubmitSafetyCheck,
            Action::Scan { .. } => ActionKind::Scan,
            Action::Capture(_) => ActionKind::Capture,
            Action::Sign { .. } => ActionKind::Sign,
            Action::CancelSignature => ActionKind::CancelSignature,
            Action::Commit => ActionKind::Commit,
            Action::Skip { .. } => ActionKind::Skip,
            Action::Refuse { .. } => ActionKind::Refuse,
            Action::Abandon { .. } => ActionKind::Abandon,
            Action::Override { .. } => ActionKind::Override,
        }
    }
}

/// Payload-free discriminant of [`Action`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    SubmitSafetyCheck,
    Scan,
    Capture,
    Sign,
    CancelSignature,
    Commit,
    Skip,
    Refuse,
    Abandon,
    Override,
}

impl ActionKind {
    pub fn name(&self) -> &'static str {
        match self {
            ActionKind::SubmitSafetyCheck => "submit_safety_check",
            ActionKind::Scan => "scan",
            ActionKind::Capture => "capture",
            ActionKind::Sign => "sign",
            ActionKind::CancelSignature => "cancel_signature",
            ActionKind::Commit => "commit",
            ActionKind::Skip => "skip",
            ActionKind::Refuse => "refuse",
            ActionKind::Abandon => "abandon",
            ActionKind::Override => "override",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::ResidentResponse;

    #[test]
    fn kind_strips_payload() {
        let action = Action::Scan {
            code: "NDC-1".into(),
        };
        assert_eq!(action.kind(), ActionKind::Scan);

        let action = Action::Capture(CapturePayload::new(
            "50mg",
            "oral",
            Utc::now(),
            ResidentResponse::Accepted,
        ));
        assert_eq!(action.kind(), ActionKind::Capture);
    }

    #[test]
    fn kind_display_names() {
        assert_eq!(ActionKind::SubmitSafetyCheck.to_string(), "submit_safety_check");
        assert_eq!(ActionKind::CancelSignature.to_string(), "cancel_signature");
        assert_eq!(ActionKind::Override.to_string(), "override");
    }
}
