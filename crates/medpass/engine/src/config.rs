//! Coordinator configuration.

use std::time::Duration as StdDuration;

use chrono::Duration;

/// Tunable limits and windows for the administration coordinator.
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// How long to wait on the external safety-check service.
    pub safety_check_timeout: StdDuration,
    /// Maximum age of a safety result the gate will accept.
    pub safety_check_freshness: Duration,
    /// Age beyond which a signature request forces a fresh safety check.
    pub signature_recheck_threshold: Duration,
    /// Barcode mismatches tolerated before verification is exhausted.
    pub max_scan_failures: u32,
    /// How far the stated administration time may sit from the moment the
    /// capture is recorded, either side.
    pub capture_window: Duration,
    /// When true, abandonment ends the attempt; otherwise it returns to a
    /// re-enterable `Created` state.
    pub abandonment_is_terminal: bool,
    pub alert_channel_capacity: usize,
    pub incident_channel_capacity: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            safety_check_timeout: StdDuration::from_secs(30),
            safety_check_freshness: Duration::minutes(15),
            signature_recheck_threshold: Duration::minutes(30),
            max_scan_failures: 3,
            capture_window: Duration::minutes(60),
            abandonment_is_terminal: false,
            alert_channel_capacity: 1024,
            incident_channel_capacity: 256,
        }
    }
}
