//! Real-time safety alert fan-out.
//!
//! Broadcast semantics are at-least-once; observers deduplicate by alert
//! id. A subscriber that falls behind gets a resync signal rather than an
//! incremental replay: it re-subscribes and receives a fresh snapshot of
//! the active alerts in its scope.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use medpass_types::{AlertId, AttemptId, OrderId, ResidentId, SafetyAlert};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// A safety alert with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEnvelope {
    pub alert: SafetyAlert,
    pub attempt_id: AttemptId,
    pub order_id: OrderId,
    pub resident_id: ResidentId,
    pub published_at: DateTime<Utc>,
}

/// Which alerts a subscriber wants to see.
#[derive(Debug, Clone, PartialEq)]
pub enum AlertScope {
    /// Alerts for one resident.
    Resident(ResidentId),
    /// Every alert in the organization.
    All,
}

impl AlertScope {
    fn matches(&self, envelope: &AlertEnvelope) -> bool {
        match self {
            AlertScope::Resident(id) => envelope.resident_id == *id,
            AlertScope::All => true,
        }
    }
}

/// What a subscriber receives.
#[derive(Debug, Clone)]
pub enum AlertStreamEvent {
    Alert(AlertEnvelope),
    /// The subscriber fell behind the channel. Re-subscribe for a fresh
    /// snapshot; nothing is replayed.
    Resync { missed: u64 },
}

/// Broadcast channel for safety alerts with an active-alert index.
pub struct AlertChannel {
    tx: broadcast::Sender<AlertEnvelope>,
    active: Mutex<HashMap<ResidentId, HashMap<AlertId, AlertEnvelope>>>,
}

impl AlertChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            active: Mutex::new(HashMap::new()),
        }
    }

    /// Publish an alert. Idempotent by alert id: re-publishing an alert
    /// already active for the resident neither duplicates the index entry
    /// nor re-broadcasts. Returns whether the alert was new.
    pub fn publish(
        &self,
        attempt_id: &AttemptId,
        order_id: &OrderId,
        resident_id: &ResidentId,
        alert: SafetyAlert,
    ) -> bool {
        let envelope = AlertEnvelope {
            attempt_id: attempt_id.clone(),
            order_id: order_id.clone(),
            resident_id: resident_id.clone(),
            published_at: Utc::now(),
            alert,
        };

        {
            let mut active = self
                .active
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let for_resident = active.entry(resident_id.clone()).or_default();
            if for_resident.contains_key(&envelope.alert.id) {
                return false;
            }
            for_resident.insert(envelope.alert.id.clone(), envelope.clone());
        }

        // No subscribers is fine; the active index still has the alert.
        let _ = self.tx.send(envelope);
        true
    }

    /// Remove an alert from the active index.
    pub fn resolve(&self, resident_id: &ResidentId, alert_id: &AlertId) -> bool {
        let mut active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        active
            .get_mut(resident_id)
            .map(|alerts| alerts.remove(alert_id).is_some())
            .unwrap_or(false)
    }

    /// Snapshot of active alerts in a scope.
    pub fn active_for(&self, scope: &AlertScope) -> Vec<AlertEnvelope> {
        let active = self
            .active
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut alerts: Vec<AlertEnvelope> = match scope {
            AlertScope::Resident(id) => active
                .get(id)
                .map(|m| m.values().cloned().collect())
                .unwrap_or_default(),
            AlertScope::All => active
                .values()
                .flat_map(|m| m.values().cloned())
                .collect(),
        };
        alerts.sort_by_key(|a| a.published_at);
        alerts
    }

    /// Subscribe to a scope. The subscription carries the current active
    /// snapshot so reconnecting observers resynchronize in full.
    pub fn subscribe(&self, scope: AlertScope) -> AlertSubscription {
        AlertSubscription {
            snapshot: self.active_for(&scope),
            rx: self.tx.subscribe(),
            scope,
        }
    }
}

/// A live, scoped subscription.
pub struct AlertSubscription {
    scope: AlertScope,
    snapshot: Vec<AlertEnvelope>,
    rx: broadcast::Receiver<AlertEnvelope>,
}

impl AlertSubscription {
    /// Active alerts at subscription time.
    pub fn snapshot(&self) -> &[AlertEnvelope] {
        &self.snapshot
    }

    /// Next in-scope event. `None` when the channel is gone.
    pub async fn recv(&mut self) -> Option<AlertStreamEvent> {
        loop {
            match self.rx.recv().await {
                Ok(envelope) if self.scope.matches(&envelope) => {
                    return Some(AlertStreamEvent::Alert(envelope))
                }
                Ok(_) => continue,
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "Alert subscriber lagged; resync required");
                    return Some(AlertStreamEvent::Resync { missed });
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use medpass_types::{AlertCategory, AlertSeverity};

    fn make_alert() -> SafetyAlert {
        SafetyAlert::new(
            AlertCategory::Interaction,
            AlertSeverity::High,
            "interaction flagged",
        )
    }

    fn publish_one(channel: &AlertChannel, resident_id: &ResidentId) -> SafetyAlert {
        let alert = make_alert();
        assert!(channel.publish(
            &AttemptId::generate(),
            &OrderId::generate(),
            resident_id,
            alert.clone(),
        ));
        alert
    }

    #[tokio::test]
    async fn subscribers_receive_published_alerts() {
        let channel = AlertChannel::new(64);
        let resident_id = ResidentId::generate();
        let mut sub = channel.subscribe(AlertScope::Resident(resident_id.clone()));
        assert!(sub.snapshot().is_empty());

        let alert = publish_one(&channel, &resident_id);
        match sub.recv().await {
            Some(AlertStreamEvent::Alert(envelope)) => {
                assert_eq!(envelope.alert.id, alert.id);
                assert_eq!(envelope.resident_id, resident_id);
            }
            other => panic!("expected alert, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn scope_filters_other_residents() {
        let channel = AlertChannel::new(64);
        let watched = ResidentId::generate();
        let other = ResidentId::generate();
        let mut sub = channel.subscribe(AlertScope::Resident(watched.clone()));

        publish_one(&channel, &other);
        let for_watched = publish_one(&channel, &watched);

        match sub.recv().await {
            Some(AlertStreamEvent::Alert(envelope)) => {
                assert_eq!(envelope.alert.id, for_watched.id)
            }
            other => panic!("expected alert, got {other:?}"),
        }
    }

    #[test]
    fn republishing_an_active_alert_is_a_no_op() {
        let channel = AlertChannel::new(64);
        let resident_id = ResidentId::generate();
        let attempt_id = AttemptId::generate();
        let order_id = OrderId::generate();
        let alert = make_alert();

        assert!(channel.publish(&attempt_id, &order_id, &resident_id, alert.clone()));
        assert!(!channel.publish(&attempt_id, &order_id, &resident_id, alert));
        assert_eq!(
            channel
                .active_for(&AlertScope::Resident(resident_id))
                .len(),
            1
        );
    }

    #[test]
    fn new_subscription_carries_the_active_snapshot() {
        let channel = AlertChannel::new(64);
        let resident_id = ResidentId::generate();
        publish_one(&channel, &resident_id);
        publish_one(&channel, &resident_id);

        let sub = channel.subscribe(AlertScope::Resident(resident_id));
        assert_eq!(sub.snapshot().len(), 2);
    }

    #[test]
    fn resolve_removes_from_the_index() {
        let channel = AlertChannel::new(64);
        let resident_id = ResidentId::generate();
        let alert = publish_one(&channel, &resident_id);

        assert!(channel.resolve(&resident_id, &alert.id));
        assert!(!channel.resolve(&resident_id, &alert.id));
        assert!(channel
            .active_for(&AlertScope::Resident(resident_id))
            .is_empty());
    }

    #[tokio::test]
    async fn lagged_subscriber_is_told_to_resync() {
        let channel = AlertChannel::new(1);
        let resident_id = ResidentId::generate();
        let mut sub = channel.subscribe(AlertScope::All);

        // Overflow the single-slot channel.
        publish_one(&channel, &resident_id);
        publish_one(&channel, &resident_id);
        publish_one(&channel, &resident_id);

        match sub.recv().await {
            Some(AlertStreamEvent::Resync { missed }) => assert!(missed >= 1),
            other => panic!("expected resync, got {other:?}"),
        }

        // Full resynchronization: a fresh subscription sees every active alert.
        let fresh = channel.subscribe(AlertScope::All);
        assert_eq!(fresh.snapshot().len(), 3);
    }

    #[test]
    fn organization_scope_sees_all_residents() {
        let channel = AlertChannel::new(64);
        publish_one(&channel, &ResidentId::generate());
        publish_one(&channel, &ResidentId::generate());
        assert_eq!(channel.active_for(&AlertScope::All).len(), 2);
    }
}
