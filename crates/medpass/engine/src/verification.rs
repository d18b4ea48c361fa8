//! Identity verification policy.
//!
//! Scan comparison is exact-match only. Fuzzy matching would invite silent
//! medication substitution, so near-misses count as mismatches.

use medpass_types::MedicationOrder;

/// Where a mismatch leaves the attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDisposition {
    /// Mismatch recorded; more scans allowed.
    Retry { remaining: u32 },
    /// The retry bound is spent.
    Exhausted,
}

/// Decides when barcode verification applies and when it is exhausted.
#[derive(Debug, Clone)]
pub struct VerificationPolicy {
    max_failures: u32,
}

impl VerificationPolicy {
    pub fn new(max_failures: u32) -> Self {
        Self { max_failures }
    }

    /// Verification is mandatory for controlled substances only.
    pub fn required(&self, order: &MedicationOrder) -> bool {
        order.is_controlled()
    }

    /// Disposition after a mismatch, given the failure count including it.
    pub fn register_failure(&self, failures: u32) -> ScanDisposition {
        if failures >= self.max_failures {
            ScanDisposition::Exhausted
        } else {
            ScanDisposition::Retry {
                remaining: self.max_failures - failures,
            }
        }
    }

    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use medpass_types::{ResidentId, RiskClassification};

    fn make_order(classification: RiskClassification) -> MedicationOrder {
        MedicationOrder::new(
            ResidentId::generate(),
            "Oxycodone",
            "NDC-59011-440-10",
            "10mg",
            "oral",
            Utc::now(),
        )
        .with_classification(classification)
    }

    #[test]
    fn controlled_orders_require_verification() {
        let policy = VerificationPolicy::new(3);
        assert!(policy.required(&make_order(RiskClassification::Controlled)));
        assert!(!policy.required(&make_order(RiskClassification::Ordinary)));
    }

    #[test]
    fn failures_below_bound_allow_retry() {
        let policy = VerificationPolicy::new(3);
        assert_eq!(
            policy.register_failure(1),
            ScanDisposition::Retry { remaining: 2 }
        );
        assert_eq!(
            policy.register_failure(2),
            ScanDisposition::Retry { remaining: 1 }
        );
    }

    #[test]
    fn reaching_the_bound_exhausts() {
        let policy = VerificationPolicy::new(3);
        assert_eq!(policy.register_failure(3), ScanDisposition::Exhausted);
        assert_eq!(policy.register_failure(4), ScanDisposition::Exhausted);
    }
}
