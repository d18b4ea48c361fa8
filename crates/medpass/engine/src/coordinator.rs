//! The administration coordinator: the async facade over the whole workflow.
//!
//! The coordinator owns the orders, the attempts, the audit trail, and the
//! alert channel, and consults the pure decision modules before every
//! mutation. Collaborator calls (safety service, barcode validator, record
//! store) are awaited without any internal lock held; a per-attempt
//! in-flight marker keeps concurrent advances from interleaving on the
//! same attempt.
//!
//! Mutation discipline: validation failures return before any side effect;
//! the audit record is appended before the state change becomes visible;
//! external-dependency failures leave the attempt in a retryable state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use medpass_types::{
    Action, ActionKind, AdministrationAttempt, AlertId, AttemptId, AttemptSnapshot, AttemptState,
    AuditEvent, AuditRecord, BlockReason, CapturePayload, CaptureRecord, CaregiverContext,
    CommitOutcome, CorrelationId, EvaluatedSafetyCheck, FailureReason, MedicationOrder, OrderId,
    OverrideRecord, Permission, ResidentId, SafetyAlert, SignatureRecord, SignatureToken,
    StateKind, VerificationStatus, WorkflowError, WorkflowResult,
};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::alert_channel::{AlertChannel, AlertEnvelope, AlertScope, AlertSubscription};
use crate::audit_trail::{AuditIncident, AuditTrail};
use crate::config::CoordinatorConfig;
use crate::requirements::RequirementsResolver;
use crate::safety_gate::{GateDecision, SafetyGate};
use crate::state_machine::TransitionTable;
use crate::traits::{
    AdministrationStore, AuditSink, BarcodeValidator, SafetyCheckProvider, SafetyCheckRequest,
};
use crate::verification::{ScanDisposition, VerificationPolicy};

/// A collaborator call currently in flight for an attempt.
#[derive(Debug, Clone)]
pub struct PendingOperation {
    pub kind: ActionKind,
    pub correlation_id: CorrelationId,
    pub started_at: DateTime<Utc>,
}

/// One request to advance an attempt.
#[derive(Debug, Clone)]
pub struct AdvanceRequest {
    pub attempt_id: AttemptId,
    /// The state the caller last observed. A mismatch fails the call
    /// before any side effect.
    pub expected_state: AttemptState,
    pub action: Action,
    pub context: CaregiverContext,
}

/// Releases the in-flight marker on every exit path.
struct OperationGuard<'a> {
    ledger: &'a Mutex<HashMap<AttemptId, PendingOperation>>,
    attempt_id: AttemptId,
    correlation_id: CorrelationId,
}

impl Drop for OperationGuard<'_> {
    fn drop(&mut self) {
        let mut ledger = self
            .ledger
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        ledger.remove(&self.attempt_id);
    }
}

/// Coordinates medication administration attempts end to end.
pub struct AdministrationCoordinator {
    config: CoordinatorConfig,
    gate: SafetyGate,
    policy: VerificationPolicy,
    resolver: RequirementsResolver,
    table: TransitionTable,
    audit: AuditTrail,
    alerts: AlertChannel,
    safety: Arc<dyn SafetyCheckProvider>,
    barcode: Arc<dyn BarcodeValidator>,
    store: Arc<dyn AdministrationStore>,
    orders: RwLock<HashMap<OrderId, MedicationOrder>>,
    attempts: RwLock<HashMap<AttemptId, AdministrationAttempt>>,
    inflight: Mutex<HashMap<AttemptId, PendingOperation>>,
}

impl AdministrationCoordinator {
    pub fn new(
        config: CoordinatorConfig,
        safety: Arc<dyn SafetyCheckProvider>,
        barcode: Arc<dyn BarcodeValidator>,
        store: Arc<dyn AdministrationStore>,
        audit_sink: Arc<dyn AuditSink>,
    ) -> Self {
        let audit = AuditTrail::new(audit_sink, config.incident_channel_capacity);
        let alerts = AlertChannel::new(config.alert_channel_capacity);
        let gate = SafetyGate::new(config.safety_check_freshness);
        let policy = VerificationPolicy::new(config.max_scan_failures);
        Self {
            gate,
            policy,
            resolver: RequirementsResolver::new(),
            table: TransitionTable::new(),
            audit,
            alerts,
            safety,
            barcode,
            store,
            orders: RwLock::new(HashMap::new()),
            attempts: RwLock::new(HashMap::new()),
            inflight: Mutex::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Register an order for administration. Duplicate ids are rejected;
    /// amending a prescription is a new order.
    #[instrument(skip(self, order), fields(order_id = %order.id))]
    pub fn register_order(&self, order: MedicationOrder) -> WorkflowResult<OrderId> {
        let mut orders = self.orders.write().map_err(|_| WorkflowError::LockError)?;
        if orders.contains_key(&order.id) {
            return Err(WorkflowError::DuplicateOrder(order.id.clone()));
        }
        let order_id = order.id.clone();
        orders.insert(order_id.clone(), order);
        info!(order_id = %order_id, "Order registered");
        Ok(order_id)
    }

    /// Start an administration attempt against a registered order.
    ///
    /// Controlled orders begin with verification pending; everything else
    /// starts with verification not required.
    #[instrument(skip(self, ctx), fields(order_id = %order_id, caregiver_id = %ctx.caregiver_id))]
    pub fn create_attempt(
        &self,
        order_id: &OrderId,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<AttemptSnapshot> {
        let order = self.order(order_id)?;
        self.ensure_permitted(&order, None, ctx)?;

        let mut attempt = AdministrationAttempt::new(
            order.id.clone(),
            order.resident_id.clone(),
            ctx.caregiver_id.clone(),
        );
        if self.policy.required(&order) {
            attempt.verification = VerificationStatus::Pending { failures: 0 };
        }

        let sequence = self.audit.emit(
            &attempt.id,
            AuditEvent::AttemptCreated,
            Some(ctx.caregiver_id.clone()),
        );
        let snapshot = attempt.snapshot(sequence);
        self.attempts
            .write()
            .map_err(|_| WorkflowError::LockError)?
            .insert(attempt.id.clone(), attempt);
        info!(attempt_id = %snapshot.attempt_id, "Attempt created");
        Ok(snapshot)
    }

    /// Advance an attempt by one action.
    ///
    /// Protocol: take the in-flight marker (`OperationInProgress` if one
    /// is already registered), resolve the attempt, reject terminal states,
    /// check `expected_state`, permissions, and admissibility, then run the
    /// action. The marker is released on every exit path.
    #[instrument(skip(self, req), fields(attempt_id = %req.attempt_id, action = %req.action.kind()))]
    pub async fn advance(&self, req: AdvanceRequest) -> WorkflowResult<AttemptSnapshot> {
        let action_kind = req.action.kind();
        let guard = self.begin_operation(&req.attempt_id, action_kind)?;
        let correlation_id = guard.correlation_id.clone();

        let (attempt, order) = self.load(&req.attempt_id)?;
        if attempt.state.is_terminal() {
            return Err(WorkflowError::AlreadyTerminal {
                state: attempt.state,
            });
        }
        if attempt.state != req.expected_state {
            return Err(WorkflowError::StaleTransition {
                expected: req.expected_state,
                actual: attempt.state,
            });
        }
        self.ensure_permitted(&order, Some(action_kind), &req.context)?;
        self.table.ensure_admissible(&attempt.state, action_kind)?;

        match req.action {
            Action::SubmitSafetyCheck => {
                self.run_safety_check(attempt, order, correlation_id, &req.context)
                    .await
            }
            Action::Scan { code } => self.run_scan(attempt, order, code, &req.context).await,
            Action::Capture(payload) => {
                self.run_capture(attempt, order, payload, &req.context).await
            }
            Action::Sign { token } => self.run_sign(attempt, order, token, &req.context).await,
            Action::CancelSignature => self.run_cancel_signature(attempt, &req.context),
            Action::Commit => self.commit(attempt, order, &req.context).await,
            Action::Skip { reason } => {
                self.run_close_out(attempt, order, CommitOutcome::Skipped, reason, &req.context)
                    .await
            }
            Action::Refuse { reason } => {
                self.run_close_out(attempt, order, CommitOutcome::Refused, reason, &req.context)
                    .await
            }
            Action::Abandon { reason } => self.run_abandon(attempt, order, reason, &req.context),
            Action::Override { reason } => self.run_override(attempt, reason, &req.context),
        }
    }

    /// Point-in-time view of an attempt.
    pub fn snapshot(&self, attempt_id: &AttemptId) -> WorkflowResult<AttemptSnapshot> {
        let attempts = self.attempts.read().map_err(|_| WorkflowError::LockError)?;
        let attempt = attempts
            .get(attempt_id)
            .ok_or_else(|| WorkflowError::AttemptNotFound(attempt_id.clone()))?;
        Ok(attempt.snapshot(self.audit.high_water_mark(attempt_id)))
    }

    /// The full audit trail for an attempt, in sequence order.
    pub fn audit_trail(&self, attempt_id: &AttemptId) -> Vec<AuditRecord> {
        self.audit.records_for(attempt_id)
    }

    /// Subscribe to safety alerts in a scope, with a snapshot of the
    /// currently active alerts.
    pub fn subscribe_alerts(&self, scope: AlertScope) -> AlertSubscription {
        self.alerts.subscribe(scope)
    }

    /// Active alerts in a scope without subscribing.
    pub fn active_alerts(&self, scope: &AlertScope) -> Vec<AlertEnvelope> {
        self.alerts.active_for(scope)
    }

    /// Mark an alert handled, removing it from active snapshots.
    pub fn resolve_alert(&self, resident_id: &ResidentId, alert_id: &AlertId) -> bool {
        self.alerts.resolve(resident_id, alert_id)
    }

    /// Subscribe to audit-sink incident reports.
    pub fn subscribe_audit_incidents(&self) -> broadcast::Receiver<AuditIncident> {
        self.audit.subscribe_incidents()
    }

    // ---- advance protocol internals ----

    fn begin_operation(
        &self,
        attempt_id: &AttemptId,
        kind: ActionKind,
    ) -> WorkflowResult<OperationGuard<'_>> {
        let mut inflight = self.inflight.lock().map_err(|_| WorkflowError::LockError)?;
        if let Some(pending) = inflight.get(attempt_id) {
            return Err(WorkflowError::OperationInProgress {
                operation: pending.kind,
            });
        }
        let correlation_id = CorrelationId::generate();
        inflight.insert(
            attempt_id.clone(),
            PendingOperation {
                kind,
                correlation_id: correlation_id.clone(),
                started_at: Utc::now(),
            },
        );
        Ok(OperationGuard {
            ledger: &self.inflight,
            attempt_id: attempt_id.clone(),
            correlation_id,
        })
    }

    fn load(
        &self,
        attempt_id: &AttemptId,
    ) -> WorkflowResult<(AdministrationAttempt, MedicationOrder)> {
        let attempt = {
            let attempts = self.attempts.read().map_err(|_| WorkflowError::LockError)?;
            attempts
                .get(attempt_id)
                .cloned()
                .ok_or_else(|| WorkflowError::AttemptNotFound(attempt_id.clone()))?
        };
        let order = self.order(&attempt.order_id)?;
        Ok((attempt, order))
    }

    fn order(&self, order_id: &OrderId) -> WorkflowResult<MedicationOrder> {
        let orders = self.orders.read().map_err(|_| WorkflowError::LockError)?;
        orders
            .get(order_id)
            .cloned()
            .ok_or_else(|| WorkflowError::OrderNotFound(order_id.clone()))
    }

    fn ensure_permitted(
        &self,
        order: &MedicationOrder,
        action: Option<ActionKind>,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<()> {
        let permission = match action {
            Some(ActionKind::Override) => Permission::RecordOverride,
            _ if order.is_controlled() => Permission::AdministerControlled,
            _ => Permission::AdministerMedication,
        };
        if ctx.has(permission) {
            Ok(())
        } else {
            Err(WorkflowError::PermissionDenied { permission })
        }
    }

    fn store_attempt(&self, attempt: AdministrationAttempt) -> WorkflowResult<()> {
        let mut attempts = self.attempts.write().map_err(|_| WorkflowError::LockError)?;
        attempts.insert(attempt.id.clone(), attempt);
        Ok(())
    }

    fn snapshot_of(&self, attempt: &AdministrationAttempt) -> AttemptSnapshot {
        attempt.snapshot(self.audit.high_water_mark(&attempt.id))
    }

    fn publish_alerts(&self, attempt: &AdministrationAttempt, alerts: Vec<SafetyAlert>) {
        for alert in alerts {
            self.alerts
                .publish(&attempt.id, &attempt.order_id, &attempt.resident_id, alert);
        }
    }

    /// Where a cleared safety check sends this attempt, from its own data:
    /// a captured attempt still owing a signature resumes the signature
    /// wait; unsatisfied verification comes next; otherwise capture.
    fn proceed_destination(attempt: &AdministrationAttempt) -> StateKind {
        let signature_owed = attempt.capture.is_some()
            && attempt.signature.is_none()
            && attempt
                .requirements
                .map_or(false, |r| r.signature_required);
        if signature_owed {
            StateKind::AwaitingSignature
        } else if attempt.verification.is_required() && !attempt.verification.is_verified() {
            StateKind::AwaitingVerification
        } else {
            StateKind::AwaitingCapture
        }
    }

    // ---- action handlers ----

    async fn run_safety_check(
        &self,
        mut attempt: AdministrationAttempt,
        order: MedicationOrder,
        correlation_id: CorrelationId,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<AttemptSnapshot> {
        let actor = Some(ctx.caregiver_id.clone());
        self.audit.emit(
            &attempt.id,
            AuditEvent::SafetyCheckRequested {
                correlation_id: correlation_id.clone(),
            },
            actor.clone(),
        );
        attempt.state = AttemptState::SafetyCheckPending;
        attempt.updated_at = Utc::now();
        self.store_attempt(attempt.clone())?;

        let request = SafetyCheckRequest {
            correlation_id,
            attempt_id: attempt.id.clone(),
            resident_id: order.resident_id.clone(),
            order_id: order.id.clone(),
            medication_code: order.medication_code.clone(),
            dosage: order.dosage.clone(),
            route: order.route.clone(),
            scheduled_at: order.scheduled_at,
        };
        let timeout = self.config.safety_check_timeout;
        let result = match tokio::time::timeout(timeout, self.safety.perform_check(request)).await
        {
            Ok(Ok(result)) => result,
            Ok(Err(failure)) => {
                warn!(
                    attempt_id = %attempt.id,
                    error = %failure,
                    "Safety check failed; attempt stays pending"
                );
                return Err(WorkflowError::SafetyCheckUnavailable {
                    detail: failure.to_string(),
                });
            }
            Err(_) => {
                let waited_ms = timeout.as_millis() as u64;
                warn!(
                    attempt_id = %attempt.id,
                    waited_ms,
                    "Safety check timed out; attempt stays pending"
                );
                return Err(WorkflowError::SafetyCheckTimeout { waited_ms });
            }
        };

        let now = Utc::now();
        let decision =
            self.gate
                .evaluate(&order, &result, attempt.override_record.is_some(), now)?;
        let destination = match &decision {
            GateDecision::Proceed { .. } => Self::proceed_destination(&attempt),
            _ => StateKind::Blocked,
        };

        attempt.safety = Some(EvaluatedSafetyCheck {
            result: result.clone(),
            evaluated_at: now,
        });
        self.audit.emit(
            &attempt.id,
            AuditEvent::SafetyCheckEvaluated {
                safe: result.safe,
                score: result.score,
                decision: decision.kind(),
                destination,
            },
            actor.clone(),
        );

        match decision.block_reason() {
            None => {
                attempt.state = match destination {
                    StateKind::AwaitingSignature => AttemptState::AwaitingSignature,
                    StateKind::AwaitingVerification => AttemptState::AwaitingVerification,
                    _ => AttemptState::AwaitingCapture,
                };
                info!(attempt_id = %attempt.id, state = %attempt.state, "Safety check cleared");
            }
            Some(reason) => {
                self.audit
                    .emit(&attempt.id, AuditEvent::PolicyBlocked { reason }, actor);
                attempt.state = AttemptState::Blocked(reason);
                warn!(attempt_id = %attempt.id, reason = %reason, "Attempt blocked by policy");
            }
        }
        attempt.updated_at = Utc::now();
        self.store_attempt(attempt.clone())?;
        self.publish_alerts(&attempt, result.alerts);
        Ok(self.snapshot_of(&attempt))
    }

    async fn run_scan(
        &self,
        mut attempt: AdministrationAttempt,
        order: MedicationOrder,
        code: String,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<AttemptSnapshot> {
        let actor = Some(ctx.caregiver_id.clone());
        if self.barcode.validate(&code, &order.medication_code).await {
            self.audit.emit(
                &attempt.id,
                AuditEvent::ScanVerified { code: code.clone() },
                actor,
            );
            attempt.verification = VerificationStatus::Verified {
                code,
                verified_at: Utc::now(),
            };
            attempt.state = AttemptState::AwaitingCapture;
            attempt.updated_at = Utc::now();
            self.store_attempt(attempt.clone())?;
            info!(attempt_id = %attempt.id, "Barcode verified");
            return Ok(self.snapshot_of(&attempt));
        }

        let failures = attempt.verification.failures() + 1;
        self.audit
            .emit(&attempt.id, AuditEvent::ScanMismatch { failures }, actor.clone());
        attempt.verification = VerificationStatus::Pending { failures };
        match self.policy.register_failure(failures) {
            ScanDisposition::Retry { remaining } => {
                warn!(attempt_id = %attempt.id, failures, remaining, "Barcode mismatch");
            }
            ScanDisposition::Exhausted => {
                self.audit.emit(
                    &attempt.id,
                    AuditEvent::VerificationExhausted { failures },
                    actor,
                );
                attempt.state = AttemptState::Blocked(BlockReason::VerificationExhausted);
                warn!(
                    attempt_id = %attempt.id,
                    failures,
                    "Verification exhausted; attempt blocked"
                );
            }
        }
        attempt.updated_at = Utc::now();
        self.store_attempt(attempt.clone())?;
        Ok(self.snapshot_of(&attempt))
    }

    async fn run_capture(
        &self,
        mut attempt: AdministrationAttempt,
        order: MedicationOrder,
        payload: CapturePayload,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<AttemptSnapshot> {
        if payload.dosage_given.trim().is_empty() {
            return Err(WorkflowError::MissingField {
                field: "dosage_given",
            });
        }
        if payload.route_used.trim().is_empty() {
            return Err(WorkflowError::MissingField {
                field: "route_used",
            });
        }
        // Anchored to the moment of recording, not the schedule: an
        // overdue dose is recorded when given, never back-dated.
        let now = Utc::now();
        if (payload.administered_at - now).abs() > self.config.capture_window {
            return Err(WorkflowError::CaptureOutOfWindow {
                administered_at: payload.administered_at,
                recorded_at: now,
            });
        }
        if payload.resident_response.is_refusal()
            && payload
                .refusal_reason
                .as_deref()
                .map_or(true, |r| r.trim().is_empty())
        {
            return Err(WorkflowError::MissingRefusalReason);
        }
        let requirements = self.resolver.resolve(&order, payload.resident_response);
        if requirements.witness_required && payload.witness.is_none() {
            return Err(WorkflowError::MissingWitness);
        }

        let actor = Some(ctx.caregiver_id.clone());
        let record = CaptureRecord::from_payload(payload, now);
        self.audit.emit(
            &attempt.id,
            AuditEvent::CaptureRecorded {
                response: record.resident_response,
            },
            actor.clone(),
        );
        attempt.capture = Some(record);
        attempt.state = AttemptState::CaptureComplete;

        let destination = if requirements.signature_required {
            StateKind::AwaitingSignature
        } else {
            StateKind::ReadyToCommit
        };
        self.audit.emit(
            &attempt.id,
            AuditEvent::RequirementsResolved {
                witness_required: requirements.witness_required,
                signature_required: requirements.signature_required,
                destination,
            },
            actor,
        );
        attempt.requirements = Some(requirements);
        attempt.state = if requirements.signature_required {
            AttemptState::AwaitingSignature
        } else {
            AttemptState::ReadyToCommit
        };
        attempt.updated_at = Utc::now();
        self.store_attempt(attempt.clone())?;

        if attempt.state == AttemptState::ReadyToCommit {
            return self.commit(attempt, order, ctx).await;
        }
        info!(attempt_id = %attempt.id, "Capture recorded; signature required");
        Ok(self.snapshot_of(&attempt))
    }

    async fn run_sign(
        &self,
        mut attempt: AdministrationAttempt,
        order: MedicationOrder,
        token: SignatureToken,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<AttemptSnapshot> {
        if token.is_empty() {
            return Err(WorkflowError::MissingSignatureToken);
        }
        let checked_at = attempt
            .safety
            .as_ref()
            .map(|s| s.result.checked_at)
            .ok_or(WorkflowError::MissingSafetyCheck)?;
        let age = Utc::now() - checked_at;
        if age > self.config.signature_recheck_threshold {
            // The caller refreshes via SubmitSafetyCheck and signs again.
            return Err(WorkflowError::StaleSafetyCheck {
                checked_at,
                age_secs: age.num_seconds(),
            });
        }

        self.audit.emit(
            &attempt.id,
            AuditEvent::SignatureCaptured,
            Some(ctx.caregiver_id.clone()),
        );
        attempt.signature = Some(SignatureRecord {
            token,
            signed_by: ctx.caregiver_id.clone(),
            signed_at: Utc::now(),
        });
        attempt.state = AttemptState::ReadyToCommit;
        attempt.updated_at = Utc::now();
        self.store_attempt(attempt.clone())?;
        self.commit(attempt, order, ctx).await
    }

    fn run_cancel_signature(
        &self,
        mut attempt: AdministrationAttempt,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<AttemptSnapshot> {
        self.audit.emit(
            &attempt.id,
            AuditEvent::SignatureCancelled,
            Some(ctx.caregiver_id.clone()),
        );
        attempt.signature = None;
        attempt.state = AttemptState::CaptureComplete;
        attempt.updated_at = Utc::now();
        self.store_attempt(attempt.clone())?;
        info!(attempt_id = %attempt.id, "Signature step cancelled; capture retained");
        Ok(self.snapshot_of(&attempt))
    }

    /// Persist and close out a captured attempt. Store failure leaves the
    /// attempt in `ReadyToCommit` for an explicit `Commit` retry.
    async fn commit(
        &self,
        mut attempt: AdministrationAttempt,
        order: MedicationOrder,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<AttemptSnapshot> {
        let capture = attempt
            .capture
            .clone()
            .ok_or(WorkflowError::MissingField { field: "capture" })?;
        let outcome = if capture.resident_response.is_refusal() {
            CommitOutcome::Refused
        } else {
            CommitOutcome::Administered
        };

        let persisted = if capture.resident_response.is_refusal() {
            // Validated at capture: a refusal always carries its reason.
            let reason = capture.refusal_reason.as_deref().unwrap_or("");
            self.store
                .skip(&attempt.id, &order.id, CommitOutcome::Refused, reason)
                .await
        } else {
            self.store.administer(&attempt.id, &order.id, &capture).await
        };
        if let Err(failure) = persisted {
            warn!(
                attempt_id = %attempt.id,
                error = %failure,
                "Commit not persisted; attempt stays ready"
            );
            return Err(WorkflowError::CommitUnavailable {
                detail: failure.to_string(),
            });
        }

        self.audit.emit(
            &attempt.id,
            AuditEvent::AttemptCommitted { outcome },
            Some(ctx.caregiver_id.clone()),
        );
        attempt.state = AttemptState::Committed(outcome);
        attempt.updated_at = Utc::now();
        self.store_attempt(attempt.clone())?;
        info!(attempt_id = %attempt.id, outcome = %outcome, "Attempt committed");
        Ok(self.snapshot_of(&attempt))
    }

    /// Skip or refuse without administering. An explicit alternate path,
    /// not a failure.
    async fn run_close_out(
        &self,
        mut attempt: AdministrationAttempt,
        order: MedicationOrder,
        outcome: CommitOutcome,
        reason: String,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<AttemptSnapshot> {
        if reason.trim().is_empty() {
            return Err(match outcome {
                CommitOutcome::Refused => WorkflowError::MissingRefusalReason,
                _ => WorkflowError::MissingField { field: "reason" },
            });
        }
        if let Err(failure) = self
            .store
            .skip(&attempt.id, &order.id, outcome, &reason)
            .await
        {
            return Err(WorkflowError::CommitUnavailable {
                detail: failure.to_string(),
            });
        }

        self.audit.emit(
            &attempt.id,
            AuditEvent::AttemptCommitted { outcome },
            Some(ctx.caregiver_id.clone()),
        );
        attempt.state = AttemptState::Committed(outcome);
        attempt.updated_at = Utc::now();
        self.store_attempt(attempt.clone())?;
        info!(attempt_id = %attempt.id, outcome = %outcome, "Attempt closed out");
        Ok(self.snapshot_of(&attempt))
    }

    fn run_abandon(
        &self,
        mut attempt: AdministrationAttempt,
        order: MedicationOrder,
        reason: Option<String>,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<AttemptSnapshot> {
        if self.config.abandonment_is_terminal
            && reason.as_deref().map_or(true, |r| r.trim().is_empty())
        {
            return Err(WorkflowError::MissingField { field: "reason" });
        }

        self.audit.emit(
            &attempt.id,
            AuditEvent::AttemptAbandoned {
                reason: reason.clone(),
            },
            Some(ctx.caregiver_id.clone()),
        );
        if self.config.abandonment_is_terminal {
            attempt.state = AttemptState::Failed(FailureReason::Abandoned);
            attempt.updated_at = Utc::now();
        } else {
            let verification = if self.policy.required(&order) {
                VerificationStatus::Pending { failures: 0 }
            } else {
                VerificationStatus::NotRequired
            };
            attempt.reset_for_reentry(verification);
        }
        self.store_attempt(attempt.clone())?;
        info!(attempt_id = %attempt.id, state = %attempt.state, "Attempt abandoned");
        Ok(self.snapshot_of(&attempt))
    }

    fn run_override(
        &self,
        mut attempt: AdministrationAttempt,
        reason: String,
        ctx: &CaregiverContext,
    ) -> WorkflowResult<AttemptSnapshot> {
        if reason.trim().is_empty() {
            return Err(WorkflowError::MissingField { field: "reason" });
        }
        let block_reason = match &attempt.state {
            AttemptState::Blocked(reason) => *reason,
            other => {
                return Err(WorkflowError::InvalidAction {
                    action: ActionKind::Override,
                    state: other.clone(),
                })
            }
        };

        self.audit.emit(
            &attempt.id,
            AuditEvent::OverrideRecorded {
                reason: reason.clone(),
            },
            Some(ctx.caregiver_id.clone()),
        );
        attempt.override_record = Some(OverrideRecord {
            authorized_by: ctx.caregiver_id.clone(),
            reason,
            recorded_at: Utc::now(),
        });
        if block_reason == BlockReason::VerificationExhausted {
            attempt.verification = VerificationStatus::Pending { failures: 0 };
        }
        // An override never skips identity verification.
        attempt.state =
            if attempt.verification.is_required() && !attempt.verification.is_verified() {
                AttemptState::AwaitingVerification
            } else {
                AttemptState::AwaitingCapture
            };
        attempt.updated_at = Utc::now();
        self.store_attempt(attempt.clone())?;
        warn!(
            attempt_id = %attempt.id,
            from = %block_reason,
            state = %attempt.state,
            "Override recorded"
        );
        Ok(self.snapshot_of(&attempt))
    }
}
