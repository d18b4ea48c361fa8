//! Append-only audit trail with incident escalation.
//!
//! The trail is the engine's own ordered record; the injected
//! [`AuditSink`] is the facility's downstream log. A sink failure must
//! never interrupt a medication pass, so it is reported on a dedicated
//! incident channel instead of propagating into the workflow. No delete or
//! modify operations exist.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use medpass_types::{AttemptId, AuditEvent, AuditRecord, CaregiverId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::traits::AuditSink;

/// A downstream audit write that was lost.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditIncident {
    pub attempt_id: AttemptId,
    pub sequence: u64,
    pub event_name: String,
    pub detail: String,
    pub occurred_at: DateTime<Utc>,
}

/// Per-attempt ordered audit records.
pub struct AuditTrail {
    records: Mutex<HashMap<AttemptId, Vec<AuditRecord>>>,
    sink: Arc<dyn AuditSink>,
    incident_tx: broadcast::Sender<AuditIncident>,
}

impl AuditTrail {
    pub fn new(sink: Arc<dyn AuditSink>, incident_capacity: usize) -> Self {
        let (incident_tx, _) = broadcast::channel(incident_capacity);
        Self {
            records: Mutex::new(HashMap::new()),
            sink,
            incident_tx,
        }
    }

    /// Append a record and forward it downstream. Returns the assigned
    /// sequence number.
    ///
    /// Sequence assignment and append happen atomically under the lock, so
    /// per-attempt ordering holds across concurrent emitters. Cross-attempt
    /// ordering is not guaranteed.
    pub fn emit(
        &self,
        attempt_id: &AttemptId,
        event: AuditEvent,
        actor: Option<CaregiverId>,
    ) -> u64 {
        let record = {
            // An append-only trail survives a poisoned lock intact.
            let mut records = self
                .records
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let entries = records.entry(attempt_id.clone()).or_default();
            let record = AuditRecord::new(entries.len() as u64, attempt_id.clone(), event, actor);
            entries.push(record.clone());
            record
        };

        if let Err(failure) = self.sink.log_event(&record) {
            tracing::error!(
                attempt_id = %record.attempt_id,
                sequence = record.sequence,
                event = %record.event,
                error = %failure,
                "Audit sink write failed"
            );
            let incident = AuditIncident {
                attempt_id: record.attempt_id.clone(),
                sequence: record.sequence,
                event_name: record.event.name().to_string(),
                detail: failure.to_string(),
                occurred_at: Utc::now(),
            };
            let _ = self.incident_tx.send(incident);
        }

        record.sequence
    }

    /// All records for an attempt, in sequence order.
    pub fn records_for(&self, attempt_id: &AttemptId) -> Vec<AuditRecord> {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.get(attempt_id).cloned().unwrap_or_default()
    }

    /// Number of records for an attempt.
    pub fn count(&self, attempt_id: &AttemptId) -> u64 {
        let records = self
            .records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        records.get(attempt_id).map(|r| r.len() as u64).unwrap_or(0)
    }

    /// Highest sequence assigned to an attempt so far.
    pub fn high_water_mark(&self, attempt_id: &AttemptId) -> u64 {
        self.count(attempt_id).saturating_sub(1)
    }

    /// Subscribe to lost-write incidents.
    pub fn subscribe_incidents(&self) -> broadcast::Receiver<AuditIncident> {
        self.incident_tx.subscribe()
    }
}
