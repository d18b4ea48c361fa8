//! Caller identity and permissions.
//!
//! Identity is never ambient: every coordinator call carries the caregiver
//! context it should be evaluated under.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::CaregiverId;

/// A permission a caregiver may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Administer ordinary medications.
    AdministerMedication,
    /// Administer controlled substances.
    AdministerControlled,
    /// Record an override of a policy block.
    RecordOverride,
}

/// The identity and permission set a call is evaluated under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaregiverContext {
    pub caregiver_id: CaregiverId,
    pub permissions: HashSet<Permission>,
}

impl CaregiverContext {
    pub fn new(caregiver_id: CaregiverId) -> Self {
        Self {
            caregiver_id,
            permissions: HashSet::new(),
        }
    }

    /// A standard caregiver: may administer ordinary medications.
    pub fn caregiver(caregiver_id: CaregiverId) -> Self {
        Self::new(caregiver_id).with_permission(Permission::AdministerMedication)
    }

    /// A caregiver cleared for controlled substances.
    pub fn controlled_caregiver(caregiver_id: CaregiverId) -> Self {
        Self::caregiver(caregiver_id).with_permission(Permission::AdministerControlled)
    }

    /// A supervisor: everything a controlled caregiver holds plus override
    /// authority.
    pub fn supervisor(caregiver_id: CaregiverId) -> Self {
        Self::controlled_caregiver(caregiver_id).with_permission(Permission::RecordOverride)
    }

    pub fn with_permission(mut self, permission: Permission) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(&permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caregiver_holds_base_permission_only() {
        let ctx = CaregiverContext::caregiver(CaregiverId::generate());
        assert!(ctx.has(Permission::AdministerMedication));
        assert!(!ctx.has(Permission::AdministerControlled));
        assert!(!ctx.has(Permission::RecordOverride));
    }

    #[test]
    fn supervisor_holds_all_permissions() {
        let ctx = CaregiverContext::supervisor(CaregiverId::generate());
        assert!(ctx.has(Permission::AdministerMedication));
        assert!(ctx.has(Permission::AdministerControlled));
        assert!(ctx.has(Permission::RecordOverride));
    }
}
