//! Safety gate: the pure decision at the heart of the workflow.
//!
//! The gate consumes an externally computed [`SafetyCheckResult`] and
//! decides whether the attempt may proceed. It is a pure function of its
//! arguments: no clock reads, no I/O, no mutable state. Suspension and
//! persistence live in the coordinator.

use chrono::{DateTime, Duration, Utc};
use medpass_types::{
    BlockReason, MedicationOrder, SafetyAlert, SafetyCheckResult, SafetyDecision, WorkflowError,
    WorkflowResult,
};

/// The gate's verdict on one evaluated result.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// The attempt may proceed. Advisories are non-blocking alerts the
    /// caregiver should still see.
    Proceed { advisories: Vec<SafetyAlert> },
    /// The attempt must stop for the named reason.
    Block { reason: BlockReason },
    /// The attempt must stop and be raised beyond the caregiver's own
    /// authority.
    Escalate { alerts: Vec<SafetyAlert> },
}

impl GateDecision {
    pub fn kind(&self) -> SafetyDecision {
        match self {
            GateDecision::Proceed { .. } => SafetyDecision::Proceed,
            GateDecision::Block { .. } => SafetyDecision::Block,
            GateDecision::Escalate { .. } => SafetyDecision::Escalate,
        }
    }

    pub fn block_reason(&self) -> Option<BlockReason> {
        match self {
            GateDecision::Proceed { .. } => None,
            GateDecision::Block { reason } => Some(*reason),
            GateDecision::Escalate { .. } => Some(BlockReason::EscalationRequired),
        }
    }
}

/// Evaluates safety-check results against the block/escalate rules.
#[derive(Debug, Clone)]
pub struct SafetyGate {
    freshness: Duration,
}

impl SafetyGate {
    pub fn new(freshness: Duration) -> Self {
        Self { freshness }
    }

    /// Decide whether an attempt may proceed on the given result.
    ///
    /// Decision rules, in order:
    /// 1. A result for a different order or resident is no result at all.
    /// 2. A result older than the freshness window must be re-fetched.
    /// 3. Unsafe with escalation demanded blocks as an escalation unless an
    ///    override is on record.
    /// 4. Approval demanded blocks regardless of the safety verdict unless
    ///    an override is on record.
    /// 5. Otherwise proceed; any alerts ride along as advisories, including
    ///    those of an unsafe result that did not demand escalation.
    pub fn evaluate(
        &self,
        order: &MedicationOrder,
        result: &SafetyCheckResult,
        override_recorded: bool,
        now: DateTime<Utc>,
    ) -> WorkflowResult<GateDecision> {
        if result.order_id != order.id || result.resident_id != order.resident_id {
            return Err(WorkflowError::MissingSafetyCheck);
        }

        let age = now - result.checked_at;
        if age > self.freshness {
            return Err(WorkflowError::StaleSafetyCheck {
                checked_at: result.checked_at,
                age_secs: age.num_seconds(),
            });
        }

        if result.escalation_required && !result.safe && !override_recorded {
            return Ok(GateDecision::Escalate {
                alerts: result.alerts.clone(),
            });
        }

        if result.approval_required && !override_recorded {
            return Ok(GateDecision::Block {
                reason: BlockReason::ApprovalRequired,
            });
        }

        Ok(GateDecision::Proceed {
            advisories: result.alerts.clone(),
        })
    }
}
