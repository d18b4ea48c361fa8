//! Medication Administration Domain Types
//!
//! A medication pass is a safety-critical workflow: every administration
//! attempt must clear an automated safety check, satisfy identity
//! verification for controlled substances, capture what was actually given,
//! and collect witness/signature evidence before it may be committed.
//!
//! # Key Concepts
//!
//! - **MedicationOrder**: An immutable prescription entry recording what to
//!   give, to whom, when, and under which risk classification.
//! - **AdministrationAttempt**: A single caregiver-initiated execution of an
//!   order, advancing through an explicit state machine.
//! - **AttemptState**: The attempt lifecycle. States advance monotonically;
//!   the only backward edges are explicit recoveries (signature
//!   cancellation, abandonment, unblocking).
//! - **SafetyCheckResult**: The externally computed interaction/allergy
//!   screen consumed by the safety gate. This crate never computes scores.
//! - **AuditRecord**: Append-only, per-attempt ordered trail. Every
//!   meaningful transition produces exactly one record, written before the
//!   state change becomes visible.
//! - **Action**: The advance vocabulary a caregiver (or their device)
//!   submits against an attempt.
//!
//! # Design Principles
//!
//! 1. Safety decisions are pure: same order, same check result, same
//!    decision. Suspension points live in the coordinator, never in the
//!    decision logic.
//! 2. Caller identity is explicit. Every action carries a
//!    [`CaregiverContext`]; nothing is ambient.
//! 3. Blocks are outcomes, not transport errors. A blocked attempt is a
//!    first-class record with its reason preserved.

#![deny(unsafe_code)]

mod action;
mod attempt;
mod audit;
mod capture;
mod context;
mod errors;
mod ids;
mod order;
mod safety;

pub use action::*;
pub use attempt::*;
pub use audit::*;
pub use capture::*;
pub use context::*;
pub use errors::*;
pub use ids::*;
pub use order::*;
pub use safety::*;
