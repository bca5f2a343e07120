//! Wake interval backoff
//!
//! delay = base × 2^min(failures − threshold, max_exponent), clamped to
//! `max_interval_s`. At or below the threshold the base interval is used.

use crate::battery::BatteryState;
use crate::config::{BackoffConfig, DeviceConfig};

/// Delay before the next wake for a given failure count
///
/// # Arguments
/// * `base_s` - Base interval in seconds
/// * `failures` - Consecutive fetch failures, including this cycle's
/// * `backoff` - Threshold, exponent cap and interval cap
pub fn next_wake_delay(base_s: u32, failures: u32, backoff: &BackoffConfig) -> u32 {
    let exponent = failures
        .saturating_sub(backoff.failure_threshold)
        .min(backoff.max_exponent as u32)
        .min(31);
    let delay = (base_s as u64) << exponent;
    delay.min(backoff.max_interval_s as u64) as u32
}

/// Delay before the next wake for this cycle's outcome
///
/// A critical battery sleeps for the longest allowed interval so the
/// next wake is as far away as possible.
pub fn plan_next_wake(config: &DeviceConfig, now: Option<u64>, failures: u32, battery: BatteryState) -> u32 {
    if battery == BatteryState::Critical {
        return config.backoff.max_interval_s;
    }
    let base = config.refresh.base_interval_s(now);
    next_wake_delay(base, failures, &config.backoff)
}
