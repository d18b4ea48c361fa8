//! Witness and signature requirement resolution.
//!
//! Pure OR-composition: each predicate stands alone, so rule order can
//! never change an outcome.

use medpass_types::{
    CompletionRequirements, MedicationOrder, OrderPriority, ResidentResponse, RiskLevel,
};

/// Resolves which completion evidence an administration demands.
#[derive(Debug, Clone, Default)]
pub struct RequirementsResolver;

impl RequirementsResolver {
    pub fn new() -> Self {
        Self
    }

    /// A witness is required for controlled substances, high-priority
    /// orders, and any response that was not a plain acceptance.
    pub fn witness_required(&self, order: &MedicationOrder, response: ResidentResponse) -> bool {
        order.is_controlled()
            || order.priority == OrderPriority::High
            || response != ResidentResponse::Accepted
    }

    /// A signature is required for controlled substances and high-risk
    /// orders.
    pub fn signature_required(&self, order: &MedicationOrder) -> bool {
        order.is_controlled() || order.risk_level == RiskLevel::High
    }

    pub fn resolve(
        &self,
        order: &MedicationOrder,
        response: ResidentResponse,
    ) -> CompletionRequirements {
        CompletionRequirements {
            witness_required: self.witness_required(order, response),
            signature_required: self.signature_required(order),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use medpass_types::{ResidentId, RiskClassification};

    fn make_order() -> MedicationOrder {
        MedicationOrder::new(
            ResidentId::generate(),
            "Lisinopril",
            "NDC-68180-513-01",
            "10mg",
            "oral",
            Utc::now(),
        )
    }

    #[test]
    fn ordinary_accepted_needs_nothing() {
        let reqs = RequirementsResolver::new().resolve(&make_order(), ResidentResponse::Accepted);
        assert!(!reqs.witness_required);
        assert!(!reqs.signature_required);
    }

    #[test]
    fn controlled_needs_witness_and_signature() {
        let order = make_order().with_classification(RiskClassification::Controlled);
        let reqs = RequirementsResolver::new().resolve(&order, ResidentResponse::Accepted);
        assert!(reqs.witness_required);
        assert!(reqs.signature_required);
    }

    #[test]
    fn high_priority_needs_witness_only() {
        let order = make_order().with_priority(OrderPriority::High);
        let reqs = RequirementsResolver::new().resolve(&order, ResidentResponse::Accepted);
        assert!(reqs.witness_required);
        assert!(!reqs.signature_required);
    }

    #[test]
    fn high_risk_level_needs_signature_only() {
        let order = make_order().with_risk_level(RiskLevel::High);
        let reqs = RequirementsResolver::new().resolve(&order, ResidentResponse::Accepted);
        assert!(!reqs.witness_required);
        assert!(reqs.signature_required);
    }

    #[test]
    fn refusal_and_partial_need_witness() {
        let resolver = RequirementsResolver::new();
        let order = make_order();
        assert!(resolver.witness_required(&order, ResidentResponse::Refused));
        assert!(resolver.witness_required(&order, ResidentResponse::Partial));
        assert!(!resolver.witness_required(&order, ResidentResponse::Accepted));
    }

    #[test]
    fn predicates_compose_without_precedence() {
        let resolver = RequirementsResolver::new();
        let order = make_order()
            .with_classification(RiskClassification::Controlled)
            .with_priority(OrderPriority::High)
            .with_risk_level(RiskLevel::High);
        let reqs = resolver.resolve(&order, ResidentResponse::Refused);
        assert!(reqs.witness_required);
        assert!(reqs.signature_required);
    }
}
