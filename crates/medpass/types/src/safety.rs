//! Safety-check vocabulary.
//!
//! Safety results are produced by an external clinical decision-support
//! service; this crate consumes them. A result is matched against the
//! attempt's order and resident before the gate will trust it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{AlertId, CaregiverId, OrderId, ResidentId, SignatureToken};

/// What kind of hazard an alert describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertCategory {
    Interaction,
    Allergy,
    Contraindication,
    Dosage,
    Timing,
}

/// Severity of a safety alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Low,
    Medium,
    High,
    Critical,
}

/// A single alert raised by the safety check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyAlert {
    pub id: AlertId,
    pub category: AlertCategory,
    pub severity: AlertSeverity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    /// The alert demands a caregiver response, not just acknowledgement.
    pub requires_action: bool,
    /// This alert alone warrants escalation. The gate routes on the
    /// result-level flag; per-alert flags travel with the alert to
    /// observers.
    pub escalation_required: bool,
}

impl SafetyAlert {
    pub fn new(
        category: AlertCategory,
        severity: AlertSeverity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: AlertId::generate(),
            category,
            severity,
            message: message.into(),
            recommendation: None,
            requires_action: false,
            escalation_required: false,
        }
    }

    pub fn with_recommendation(mut self, recommendation: impl Into<String>) -> Self {
        self.recommendation = Some(recommendation.into());
        self
    }

    pub fn requiring_action(mut self) -> Self {
        self.requires_action = true;
        self
    }

    pub fn requiring_escalation(mut self) -> Self {
        self.escalation_required = true;
        self
    }
}

/// The externally computed safety screen for one order/resident pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyCheckResult {
    pub resident_id: ResidentId,
    pub order_id: OrderId,
    /// Overall verdict of the screen. A safe result may still carry
    /// informational alerts.
    pub safe: bool,
    pub score: f64,
    pub alerts: Vec<SafetyAlert>,
    pub escalation_required: bool,
    pub approval_required: bool,
    pub checked_at: DateTime<Utc>,
}

impl SafetyCheckResult {
    /// A clean screen for the given order/resident pair.
    pub fn clear(resident_id: ResidentId, order_id: OrderId) -> Self {
        Self {
            resident_id,
            order_id,
            safe: true,
            score: 0.0,
            alerts: Vec::new(),
            escalation_required: false,
            approval_required: false,
            checked_at: Utc::now(),
        }
    }

    pub fn with_alert(mut self, alert: SafetyAlert) -> Self {
        self.alerts.push(alert);
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn unsafe_with_escalation(mut self) -> Self {
        self.safe = false;
        self.escalation_required = true;
        self
    }

    pub fn requiring_approval(mut self) -> Self {
        self.approval_required = true;
        self
    }

    pub fn with_checked_at(mut self, checked_at: DateTime<Utc>) -> Self {
        self.checked_at = checked_at;
        self
    }
}

/// The gate's verdict on an evaluated safety result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyDecision {
    Proceed,
    Block,
    Escalate,
}

impl std::fmt::Display for SafetyDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SafetyDecision::Proceed => "proceed",
            SafetyDecision::Block => "block",
            SafetyDecision::Escalate => "escalate",
        };
        f.write_str(s)
    }
}

/// Witness and signature obligations resolved at capture time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionRequirements {
    pub witness_required: bool,
    pub signature_required: bool,
}

impl CompletionRequirements {
    pub fn none() -> Self {
        Self {
            witness_required: false,
            signature_required: false,
        }
    }
}

/// A captured electronic signature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub token: SignatureToken,
    pub signed_by: CaregiverId,
    pub signed_at: DateTime<Utc>,
}

/// A supervisor-authorized override of a policy block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRecord {
    pub authorized_by: CaregiverId,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}
