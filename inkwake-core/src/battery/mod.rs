//! Battery monitor
//!
//! Reads the power sensor once per cycle and classifies the level. A sensor
//! that fails or does not answer in time is treated as an empty battery.

use embassy_time::{with_timeout, Duration};
use inkwake_hal::PowerSensor;

use crate::config::BatteryThresholds;
use crate::logging::warn;

/// Battery classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryState {
    /// Full cycle allowed
    Normal,
    /// Full cycle with a single fetch attempt
    Low,
    /// No radio; cached data only
    Critical,
}

impl BatteryState {
    /// Classify a percentage against the configured thresholds
    pub fn classify(percent: u8, thresholds: &BatteryThresholds) -> Self {
        if percent >= thresholds.low_percent {
            BatteryState::Normal
        } else if percent >= thresholds.critical_percent {
            BatteryState::Low
        } else {
            BatteryState::Critical
        }
    }

    /// Check if the radio may be powered this cycle
    pub fn radio_allowed(&self) -> bool {
        !matches!(self, BatteryState::Critical)
    }
}

/// One battery reading
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryReading {
    pub state: BatteryState,
    /// Remaining charge, `None` if the sensor failed
    pub percent: Option<u8>,
}

/// Battery monitor over a [`PowerSensor`]
pub struct BatteryMonitor<'a, S> {
    sensor: &'a mut S,
    thresholds: BatteryThresholds,
    timeout: Duration,
}

impl<'a, S: PowerSensor> BatteryMonitor<'a, S> {
    /// Create a monitor for one cycle
    pub fn new(sensor: &'a mut S, thresholds: BatteryThresholds, timeout: Duration) -> Self {
        Self {
            sensor,
            thresholds,
            timeout,
        }
    }

    /// Read and classify the battery level
    pub async fn read(&mut self) -> BatteryState {
        self.read_level().await.state
    }

    /// Read the battery level and its classification
    pub async fn read_level(&mut self) -> BatteryReading {
        match with_timeout(self.timeout, self.sensor.read_percent()).await {
            Ok(Ok(percent)) => {
                let percent = percent.min(100);
                BatteryReading {
                    state: BatteryState::classify(percent, &self.thresholds),
                    percent: Some(percent),
                }
            }
            Ok(Err(err)) => {
                warn!("battery sensor error {:?}, assuming critical", err);
                BatteryReading {
                    state: BatteryState::Critical,
                    percent: None,
                }
            }
            Err(_) => {
                warn!("battery sensor timed out, assuming critical");
                BatteryReading {
                    state: BatteryState::Critical,
                    percent: None,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use inkwake_hal::mock::FixedPower;

    const THRESHOLDS: BatteryThresholds = BatteryThresholds {
        low_percent: 20,
        critical_percent: 5,
    };

    #[test]
    fn test_classification_boundaries() {
        assert_eq!(BatteryState::classify(100, &THRESHOLDS), BatteryState::Normal);
        assert_eq!(BatteryState::classify(20, &THRESHOLDS), BatteryState::Normal);
        assert_eq!(BatteryState::classify(19, &THRESHOLDS), BatteryState::Low);
        assert_eq!(BatteryState::classify(5, &THRESHOLDS), BatteryState::Low);
        assert_eq!(BatteryState::classify(4, &THRESHOLDS), BatteryState::Critical);
        assert_eq!(BatteryState::classify(0, &THRESHOLDS), BatteryState::Critical);
    }

    #[test]
    fn test_sensor_error_is_critical() {
        let mut sensor = FixedPower::failing();
        let mut monitor = BatteryMonitor::new(&mut sensor, THRESHOLDS, Duration::from_millis(100));
        let reading = block_on(monitor.read_level());
        assert_eq!(reading.state, BatteryState::Critical);
        assert_eq!(reading.percent, None);
    }

    #[test]
    fn test_stalled_sensor_is_critical() {
        let mut sensor = FixedPower::percent(80);
        sensor.stalled = true;
        let mut monitor = BatteryMonitor::new(&mut sensor, THRESHOLDS, Duration::from_millis(20));
        assert_eq!(block_on(monitor.read()), BatteryState::Critical);
    }

    #[test]
    fn test_normal_reading() {
        let mut sensor = FixedPower::percent(73);
        let mut monitor = BatteryMonitor::new(&mut sensor, THRESHOLDS, Duration::from_millis(100));
        let reading = block_on(monitor.read_level());
        assert_eq!(reading.state, BatteryState::Normal);
        assert_eq!(reading.percent, Some(73));
    }
}
