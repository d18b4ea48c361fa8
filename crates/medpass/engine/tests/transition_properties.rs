//! Property tests: the pure decision components honor their rules for all
//! inputs, and random action sequences never drive an attempt outside the
//! declared transition table.

use std::sync::Arc;

use chrono::{Duration, Utc};
use medpass_engine::mocks::{
    MockAdministrationStore, MockAuditSink, MockBarcodeValidator, MockSafetyCheckProvider,
};
use medpass_engine::{
    AdministrationCoordinator, AdvanceRequest, CoordinatorConfig, GateDecision,
    RequirementsResolver, SafetyGate, ScanDisposition, TransitionTable, VerificationPolicy,
};
use medpass_types::{
    Action, ActionKind, AttemptState, BlockReason, CapturePayload, CaregiverContext, CaregiverId,
    CommitOutcome, FailureReason, MedicationOrder, OrderPriority, ResidentId, ResidentResponse,
    RiskClassification, RiskLevel, SafetyCheckResult, SignatureToken, StateKind,
};
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;

// ---------------------------------------------------------------------------
// Helpers / Strategies
// ---------------------------------------------------------------------------

fn arb_risk_level() -> impl Strategy<Value = RiskLevel> {
    prop_oneof![
        Just(RiskLevel::Low),
        Just(RiskLevel::Moderate),
        Just(RiskLevel::High),
    ]
}

fn arb_priority() -> impl Strategy<Value = OrderPriority> {
    prop_oneof![Just(OrderPriority::Routine), Just(OrderPriority::High)]
}

fn arb_response() -> impl Strategy<Value = ResidentResponse> {
    prop_oneof![
        Just(ResidentResponse::Accepted),
        Just(ResidentResponse::Partial),
        Just(ResidentResponse::Refused),
    ]
}

/// Generate a random order with realistic fields.
fn arb_order() -> impl Strategy<Value = MedicationOrder> {
    (
        prop_oneof![
            Just("Lisinopril"),
            Just("Metformin"),
            Just("Warfarin"),
            Just("Oxycodone"),
        ],
        "NDC-[0-9]{4}-[0-9]{3}-[0-9]{2}",
        1u32..200,
        prop_oneof![Just("oral"), Just("subcutaneous"), Just("topical")],
        arb_risk_level(),
        arb_priority(),
    )
        .prop_map(|(name, code, mg, route, risk, priority)| {
            MedicationOrder::new(
                ResidentId::generate(),
                name,
                code,
                format!("{mg}mg"),
                route,
                Utc::now(),
            )
            .with_risk_level(risk)
            .with_priority(priority)
        })
}

fn arb_state() -> impl Strategy<Value = AttemptState> {
    prop_oneof![
        Just(AttemptState::Created),
        Just(AttemptState::SafetyCheckPending),
        Just(AttemptState::AwaitingVerification),
        Just(AttemptState::AwaitingCapture),
        Just(AttemptState::CaptureComplete),
        Just(AttemptState::AwaitingSignature),
        Just(AttemptState::ReadyToCommit),
        prop_oneof![
            Just(BlockReason::EscalationRequired),
            Just(BlockReason::ApprovalRequired),
            Just(BlockReason::VerificationExhausted),
        ]
        .prop_map(AttemptState::Blocked),
        prop_oneof![
            Just(CommitOutcome::Administered),
            Just(CommitOutcome::Skipped),
            Just(CommitOutcome::Refused),
        ]
        .prop_map(AttemptState::Committed),
        Just(AttemptState::Failed(FailureReason::Abandoned)),
    ]
}

fn arb_action_kind() -> impl Strategy<Value = ActionKind> {
    prop_oneof![
        Just(ActionKind::SubmitSafetyCheck),
        Just(ActionKind::Scan),
        Just(ActionKind::Capture),
        Just(ActionKind::Sign),
        Just(ActionKind::CancelSignature),
        Just(ActionKind::Commit),
        Just(ActionKind::Skip),
        Just(ActionKind::Refuse),
        Just(ActionKind::Abandon),
        Just(ActionKind::Override),
    ]
}

/// Order shapes worth walking: each exercises a different requirement mix.
#[derive(Debug, Clone, Copy)]
enum OrderFlavor {
    Ordinary,
    HighRisk,
    Controlled,
}

fn arb_flavor() -> impl Strategy<Value = OrderFlavor> {
    prop_oneof![
        Just(OrderFlavor::Ordinary),
        Just(OrderFlavor::HighRisk),
        Just(OrderFlavor::Controlled),
    ]
}

/// Safety-check verdicts the walk's provider can return.
#[derive(Debug, Clone, Copy)]
enum ProviderScript {
    Clear,
    Advisory,
    Escalating,
}

fn arb_script() -> impl Strategy<Value = ProviderScript> {
    prop_oneof![
        Just(ProviderScript::Clear),
        Just(ProviderScript::Advisory),
        Just(ProviderScript::Escalating),
    ]
}

/// One caller request in a random walk.
#[derive(Debug, Clone, Copy)]
enum Step {
    Submit,
    ScanGood,
    ScanBad,
    Capture,
    Sign,
    CancelSignature,
    Commit,
    Skip,
    Refuse,
    Abandon,
    Override,
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Submit),
        Just(Step::ScanGood),
        Just(Step::ScanBad),
        Just(Step::Capture),
        Just(Step::Sign),
        Just(Step::CancelSignature),
        Just(Step::Commit),
        Just(Step::Skip),
        Just(Step::Refuse),
        Just(Step::Abandon),
        Just(Step::Override),
    ]
}

fn arb_steps() -> impl Strategy<Value = Vec<Step>> {
    prop::collection::vec(arb_step(), 1..16)
}

/// Snapshot-to-snapshot pairs a single advance may produce.
///
/// One advance can fold several declared edges into one observed change:
/// submission passes through `SafetyCheckPending`, capture through
/// `CaptureComplete`, and an inline commit through `ReadyToCommit`. Each
/// folded pair below decomposes into declared edges through exactly those
/// intermediate states.
fn observed_pair_is_declared(table: &TransitionTable, from: StateKind, to: StateKind) -> bool {
    const FOLDED: &[(StateKind, StateKind)] = &[
        (StateKind::Created, StateKind::AwaitingVerification),
        (StateKind::Created, StateKind::AwaitingCapture),
        (StateKind::Created, StateKind::Blocked),
        (StateKind::AwaitingSignature, StateKind::Blocked),
        (StateKind::AwaitingCapture, StateKind::AwaitingSignature),
        (StateKind::AwaitingCapture, StateKind::ReadyToCommit),
        (StateKind::CaptureComplete, StateKind::Committed),
        (StateKind::AwaitingSignature, StateKind::Committed),
    ];
    table.edge_exists(from, to) || FOLDED.contains(&(from, to))
}

fn order_for(flavor: OrderFlavor) -> MedicationOrder {
    let base = MedicationOrder::new(
        ResidentId::generate(),
        "Metoprolol",
        "NDC-0378-0032-01",
        "50mg",
        "oral",
        Utc::now(),
    );
    match flavor {
        OrderFlavor::Ordinary => base,
        OrderFlavor::HighRisk => base.with_risk_level(RiskLevel::High),
        OrderFlavor::Controlled => base.with_classification(RiskClassification::Controlled),
    }
}

fn provider_for(script: ProviderScript) -> MockSafetyCheckProvider {
    match script {
        ProviderScript::Clear => MockSafetyCheckProvider::clear(),
        ProviderScript::Advisory => MockSafetyCheckProvider::advisory(),
        ProviderScript::Escalating => MockSafetyCheckProvider::unsafe_escalating(),
    }
}

/// Drive one random walk and check the lifecycle invariants after every
/// advance.
async fn walk(
    flavor: OrderFlavor,
    script: ProviderScript,
    steps: Vec<Step>,
) -> Result<(), TestCaseError> {
    let coordinator = AdministrationCoordinator::new(
        CoordinatorConfig::default(),
        Arc::new(provider_for(script)),
        Arc::new(MockBarcodeValidator::new()),
        Arc::new(MockAdministrationStore::new()),
        Arc::new(MockAuditSink::new()),
    );
    let order = order_for(flavor);
    coordinator
        .register_order(order.clone())
        .map_err(|e| TestCaseError::fail(e.to_string()))?;

    let ctx = CaregiverContext::controlled_caregiver(CaregiverId::generate());
    let boss = CaregiverContext::supervisor(CaregiverId::generate());
    let table = TransitionTable::new();

    let mut snap = coordinator
        .create_attempt(&order.id, &ctx)
        .map_err(|e| TestCaseError::fail(e.to_string()))?;

    for step in steps {
        let (action, who) = match step {
            Step::Submit => (Action::SubmitSafetyCheck, &ctx),
            Step::ScanGood => (
                Action::Scan {
                    code: order.medication_code.clone(),
                },
                &ctx,
            ),
            Step::ScanBad => (
                Action::Scan {
                    code: "MISMATCH".into(),
                },
                &ctx,
            ),
            Step::Capture => (
                Action::Capture(
                    CapturePayload::new(
                        order.dosage.clone(),
                        order.route.clone(),
                        order.scheduled_at,
                        ResidentResponse::Accepted,
                    )
                    .with_witness(CaregiverId::generate()),
                ),
                &ctx,
            ),
            Step::Sign => (
                Action::Sign {
                    token: SignatureToken::new("sig-walk"),
                },
                &ctx,
            ),
            Step::CancelSignature => (Action::CancelSignature, &ctx),
            Step::Commit => (Action::Commit, &ctx),
            Step::Skip => (
                Action::Skip {
                    reason: "held".into(),
                },
                &ctx,
            ),
            Step::Refuse => (
                Action::Refuse {
                    reason: "declined".into(),
                },
                &ctx,
            ),
            Step::Abandon => (
                Action::Abandon {
                    reason: Some("walk ended".into()),
                },
                &ctx,
            ),
            Step::Override => (
                Action::Override {
                    reason: "reviewed and cleared".into(),
                },
                &boss,
            ),
        };

        let before = snap.state.kind();
        let was_terminal = snap.state.is_terminal();

        match coordinator
            .advance(AdvanceRequest {
                attempt_id: snap.attempt_id.clone(),
                expected_state: snap.state.clone(),
                action,
                context: who.clone(),
            })
            .await
        {
            Ok(after) => {
                prop_assert!(
                    !was_terminal,
                    "terminal state {} accepted an advance",
                    before.name()
                );
                let to = after.state.kind();
                if before != to {
                    prop_assert!(
                        observed_pair_is_declared(&table, before, to),
                        "undeclared transition {} -> {}",
                        before.name(),
                        to.name()
                    );
                }
                if matches!(flavor, OrderFlavor::Controlled)
                    && matches!(
                        to,
                        StateKind::AwaitingCapture
                            | StateKind::CaptureComplete
                            | StateKind::AwaitingSignature
                            | StateKind::ReadyToCommit
                    )
                {
                    prop_assert!(
                        after.verification.is_verified(),
                        "controlled attempt reached {} without a verified scan",
                        to.name()
                    );
                }
                if after.state == AttemptState::Committed(CommitOutcome::Administered) {
                    prop_assert!(
                        after.capture.is_some(),
                        "administered without a capture record"
                    );
                }
                snap = after;
            }
            Err(_) => {
                // A rejected advance must leave the attempt exactly where
                // it was.
                let current = coordinator
                    .snapshot(&snap.attempt_id)
                    .map_err(|e| TestCaseError::fail(e.to_string()))?;
                prop_assert_eq!(
                    current.state.kind(),
                    before,
                    "a rejected advance moved the attempt"
                );
                snap = current;
            }
        }
    }

    // The trail is gapless from zero no matter which path the walk took.
    let records = coordinator.audit_trail(&snap.attempt_id);
    prop_assert!(!records.is_empty());
    for (i, record) in records.iter().enumerate() {
        prop_assert_eq!(record.sequence, i as u64);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Property Tests
// ---------------------------------------------------------------------------

proptest! {
    /// Controlled substances demand both witness and signature for every
    /// response.
    #[test]
    fn controlled_orders_always_demand_full_evidence(
        order in arb_order(),
        response in arb_response(),
    ) {
        let order = order.with_classification(RiskClassification::Controlled);
        let reqs = RequirementsResolver::new().resolve(&order, response);
        prop_assert!(reqs.witness_required);
        prop_assert!(reqs.signature_required);
    }

    /// Any response other than plain acceptance demands a witness.
    #[test]
    fn non_accepted_responses_always_demand_a_witness(
        order in arb_order(),
        response in prop_oneof![
            Just(ResidentResponse::Partial),
            Just(ResidentResponse::Refused),
        ],
    ) {
        let reqs = RequirementsResolver::new().resolve(&order, response);
        prop_assert!(reqs.witness_required);
    }

    /// Below the bound every mismatch leaves at least one retry, and the
    /// arithmetic accounts for every failure.
    #[test]
    fn scan_failures_are_counted_exactly(
        max in 1u32..=10,
        failures in 1u32..=20,
    ) {
        let policy = VerificationPolicy::new(max);
        match policy.register_failure(failures) {
            ScanDisposition::Retry { remaining } => {
                prop_assert!(failures < max);
                prop_assert_eq!(remaining, max - failures);
                prop_assert!(remaining >= 1);
            }
            ScanDisposition::Exhausted => prop_assert!(failures >= max),
        }
    }

    /// A fresh, clear safety result always proceeds, whatever the order.
    #[test]
    fn fresh_clear_results_always_proceed(
        order in arb_order(),
        age_secs in 0i64..=800,
    ) {
        let gate = SafetyGate::new(Duration::minutes(15));
        let now = Utc::now();
        let result = SafetyCheckResult::clear(order.resident_id.clone(), order.id.clone())
            .with_checked_at(now - Duration::seconds(age_secs));
        let decision = gate.evaluate(&order, &result, false, now).unwrap();
        prop_assert!(
            matches!(decision, GateDecision::Proceed { .. }),
            "expected GateDecision::Proceed"
        );
        prop_assert_eq!(decision.block_reason(), None);
    }

    /// An escalation blocks every order until an override is on record.
    #[test]
    fn escalations_always_block_without_an_override(order in arb_order()) {
        let gate = SafetyGate::new(Duration::minutes(15));
        let now = Utc::now();
        let result = SafetyCheckResult::clear(order.resident_id.clone(), order.id.clone())
            .unsafe_with_escalation()
            .with_checked_at(now);

        let decision = gate.evaluate(&order, &result, false, now).unwrap();
        prop_assert!(
            matches!(decision, GateDecision::Escalate { .. }),
            "expected GateDecision::Escalate"
        );
        prop_assert_eq!(decision.block_reason(), Some(BlockReason::EscalationRequired));

        let decision = gate.evaluate(&order, &result, true, now).unwrap();
        prop_assert!(
            matches!(decision, GateDecision::Proceed { .. }),
            "expected GateDecision::Proceed"
        );
    }

    /// Results older than the freshness window are rejected outright.
    #[test]
    fn stale_results_are_always_rejected(
        order in arb_order(),
        age_secs in 901i64..100_000,
    ) {
        let gate = SafetyGate::new(Duration::minutes(15));
        let now = Utc::now();
        let result = SafetyCheckResult::clear(order.resident_id.clone(), order.id.clone())
            .with_checked_at(now - Duration::seconds(age_secs));
        prop_assert!(gate.evaluate(&order, &result, false, now).is_err());
    }

    /// A result computed for another order or resident is no result at all.
    #[test]
    fn mismatched_results_are_no_result(order in arb_order()) {
        let gate = SafetyGate::new(Duration::minutes(15));
        let now = Utc::now();
        let other = order_for(OrderFlavor::Ordinary);
        let result = SafetyCheckResult::clear(other.resident_id.clone(), other.id.clone())
            .with_checked_at(now);
        prop_assert!(gate.evaluate(&order, &result, false, now).is_err());
    }

    /// `ensure_admissible` agrees with the declared action sets in every
    /// state, whatever error it reports.
    #[test]
    fn admissibility_agrees_with_the_declared_action_sets(
        state in arb_state(),
        action in arb_action_kind(),
    ) {
        let table = TransitionTable::new();
        let declared = table.admissible_actions(&state).contains(&action);
        prop_assert_eq!(table.ensure_admissible(&state, action).is_ok(), declared);
    }

    /// Random action sequences never leave the declared lifecycle: every
    /// observed change is a declared (possibly folded) edge, rejected
    /// advances move nothing, terminal states admit nothing, controlled
    /// attempts never pass verification unverified, and the audit trail
    /// stays gapless.
    #[test]
    fn random_walks_stay_inside_the_declared_lifecycle(
        flavor in arb_flavor(),
        script in arb_script(),
        steps in arb_steps(),
    ) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(walk(flavor, script, steps))?;
    }
}
