//! Administration workflow engine for medpass
//!
//! The engine advances medication administration attempts through
//! safety-gated transitions, enforces identity verification and completion
//! requirements, and maintains a complete per-attempt audit trail.
//!
//! # Key Principle
//!
//! **The coordinator coordinates, it NEVER judges safety itself.**
//!
//! Safety verdicts come from an external clinical decision-support
//! service, barcode decoding from the scanning integration, durable
//! records from the facility store. The engine decides what those inputs
//! mean for the attempt and refuses to move without them.
//!
//! # Architecture
//!
//! The [`AdministrationCoordinator`] composes specialized components:
//!
//! - [`SafetyGate`]: Decides proceed/block/escalate from an evaluated safety result
//! - [`VerificationPolicy`]: Decides when barcode verification applies and when it is exhausted
//! - [`RequirementsResolver`]: Resolves witness and signature obligations at capture time
//! - [`TransitionTable`]: Single authority on admissible actions and declared state edges
//! - [`AuditTrail`]: Append-only per-attempt records with incident escalation
//! - [`AlertChannel`]: Safety alert fan-out with snapshot resynchronization
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use medpass_engine::mocks::*;
//! use medpass_engine::{AdministrationCoordinator, CoordinatorConfig};
//! use medpass_types::{AttemptState, CaregiverContext, CaregiverId, MedicationOrder, ResidentId};
//!
//! let coordinator = AdministrationCoordinator::new(
//!     CoordinatorConfig::default(),
//!     Arc::new(MockSafetyCheckProvider::clear()),
//!     Arc::new(MockBarcodeValidator::new()),
//!     Arc::new(MockAdministrationStore::new()),
//!     Arc::new(MockAuditSink::new()),
//! );
//!
//! // Register an order and start an attempt against it
//! let order = MedicationOrder::new(
//!     ResidentId::generate(),
//!     "Lisinopril",
//!     "NDC-68180-513-01",
//!     "10mg",
//!     "oral",
//!     chrono::Utc::now(),
//! );
//! let order_id = coordinator.register_order(order).unwrap();
//!
//! let caregiver = CaregiverContext::caregiver(CaregiverId::generate());
//! let attempt = coordinator.create_attempt(&order_id, &caregiver).unwrap();
//! assert_eq!(attempt.state, AttemptState::Created);
//! ```

#![deny(unsafe_code)]

pub mod alert_channel;
pub mod audit_trail;
pub mod config;
pub mod coordinator;
pub mod mocks;
pub mod requirements;
pub mod safety_gate;
pub mod state_machine;
pub mod traits;
pub mod verification;

// Re-export main types
pub use alert_channel::{AlertChannel, AlertEnvelope, AlertScope, AlertStreamEvent, AlertSubscription};
pub use audit_trail::{AuditIncident, AuditTrail};
pub use config::CoordinatorConfig;
pub use coordinator::{AdministrationCoordinator, AdvanceRequest, PendingOperation};
pub use requirements::RequirementsResolver;
pub use safety_gate::{GateDecision, SafetyGate};
pub use state_machine::TransitionTable;
pub use traits::{
    AdministrationStore, AuditSink, BarcodeValidator, PersistedRecord, ProviderFailure,
    SafetyCheckProvider, SafetyCheckRequest, SinkFailure, StoreFailure,
};
pub use verification::{ScanDisposition, VerificationPolicy};
