//! Administration capture: what was actually given.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::CaregiverId;

/// How the resident responded to the administration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidentResponse {
    Accepted,
    Partial,
    Refused,
}

impl ResidentResponse {
    pub fn is_refusal(&self) -> bool {
        matches!(self, ResidentResponse::Refused)
    }
}

/// Caller-supplied capture details, validated before anything is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturePayload {
    pub dosage_given: String,
    pub route_used: String,
    pub administered_at: DateTime<Utc>,
    pub resident_response: ResidentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<CaregiverId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl CapturePayload {
    pub fn new(
        dosage_given: impl Into<String>,
        route_used: impl Into<String>,
        administered_at: DateTime<Utc>,
        resident_response: ResidentResponse,
    ) -> Self {
        Self {
            dosage_given: dosage_given.into(),
            route_used: route_used.into(),
            administered_at,
            resident_response,
            refusal_reason: None,
            witness: None,
            notes: None,
        }
    }

    pub fn with_refusal_reason(mut self, reason: impl Into<String>) -> Self {
        self.refusal_reason = Some(reason.into());
        self
    }

    pub fn with_witness(mut self, witness: CaregiverId) -> Self {
        self.witness = Some(witness);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A validated, stored capture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub dosage_given: String,
    pub route_used: String,
    pub administered_at: DateTime<Utc>,
    pub resident_response: ResidentResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refusal_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub witness: Option<CaregiverId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl CaptureRecord {
    pub fn from_payload(payload: CapturePayload, recorded_at: DateTime<Utc>) -> Self {
        Self {
            dosage_given: payload.dosage_given,
            route_used: payload.route_used,
            administered_at: payload.administered_at,
            resident_response: payload.resident_response,
            refusal_reason: payload.refusal_reason,
            witness: payload.witness,
            notes: payload.notes,
            recorded_at,
        }
    }
}
