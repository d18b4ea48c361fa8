//! Medication orders: the prescription entries attempts execute against.
//!
//! Orders are immutable once constructed. Amending a prescription is a new
//! order, never a mutation; running attempts always reference the exact
//! order text they were initiated against.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{OrderId, ResidentId};

/// Regulatory classification of a medication order.
///
/// Controlled substances carry mandatory barcode verification and tighter
/// witness/signature requirements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskClassification {
    Ordinary,
    Controlled,
}

/// Clinical risk level assigned by the prescriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

/// Scheduling priority of the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderPriority {
    Routine,
    High,
}

/// An immutable medication order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationOrder {
    pub id: OrderId,
    pub resident_id: ResidentId,
    pub medication_name: String,
    /// Barcode payload identifying the medication package.
    pub medication_code: String,
    pub dosage: String,
    pub route: String,
    pub scheduled_at: DateTime<Utc>,
    pub classification: RiskClassification,
    pub risk_level: RiskLevel,
    pub priority: OrderPriority,
    pub created_at: DateTime<Utc>,
}

impl MedicationOrder {
    pub fn new(
        resident_id: ResidentId,
        medication_name: impl Into<String>,
        medication_code: impl Into<String>,
        dosage: impl Into<String>,
        route: impl Into<String>,
        scheduled_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::generate(),
            resident_id,
            medication_name: medication_name.into(),
            medication_code: medication_code.into(),
            dosage: dosage.into(),
            route: route.into(),
            scheduled_at,
            classification: RiskClassification::Ordinary,
            risk_level: RiskLevel::Low,
            priority: OrderPriority::Routine,
            created_at: Utc::now(),
        }
    }

    pub fn with_classification(mut self, classification: RiskClassification) -> Self {
        self.classification = classification;
        self
    }

    pub fn with_risk_level(mut self, risk_level: RiskLevel) -> Self {
        self.risk_level = risk_level;
        self
    }

    pub fn with_priority(mut self, priority: OrderPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn is_controlled(&self) -> bool {
        self.classification == RiskClassification::Controlled
    }
}
