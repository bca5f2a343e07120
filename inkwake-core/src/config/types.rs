//! Configuration type definitions
//!
//! Every section has defaults matching a 10-minute daytime refresh,
//! 2-hour nighttime refresh and timeouts sized for a typical 2.4 GHz
//! module and a large e-paper panel.

use embassy_time::Duration;
use heapless::String;
use serde::{Deserialize, Serialize};

use crate::data::MAX_FORECAST;

/// Maximum SSID length (802.11 limit)
pub const MAX_SSID_LEN: usize = 32;

/// Maximum WPA passphrase length
pub const MAX_PASSPHRASE_LEN: usize = 64;

/// Maximum endpoint host name length
pub const MAX_HOST_LEN: usize = 64;

/// Maximum request path length
pub const MAX_PATH_LEN: usize = 64;

/// Maximum location name / API key length
pub const MAX_QUERY_LEN: usize = 48;

/// Maximum header title length
pub const MAX_TITLE_LEN: usize = 24;

/// Complete device configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct DeviceConfig {
    pub wifi: WifiConfig,
    pub endpoint: EndpointConfig,
    pub refresh: RefreshConfig,
    pub backoff: BackoffConfig,
    pub battery: BatteryThresholds,
    pub display: DisplayConfig,
    pub timeouts: TimeoutConfig,
}

/// Wireless credentials
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct WifiConfig {
    pub ssid: String<MAX_SSID_LEN>,
    pub passphrase: String<MAX_PASSPHRASE_LEN>,
}

/// How the location is sent to the endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum Location {
    /// Numeric city id (`id=`)
    CityId(u32),
    /// Free-text city name (`q=`)
    Name(String<MAX_QUERY_LEN>),
}

/// Unit system requested from the endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
    Standard,
}

impl Units {
    /// Value of the `units` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::Metric => "metric",
            Units::Imperial => "imperial",
            Units::Standard => "standard",
        }
    }

    /// Temperature unit suffix
    pub fn temperature_suffix(&self) -> &'static str {
        match self {
            Units::Metric => "C",
            Units::Imperial => "F",
            Units::Standard => "K",
        }
    }

    /// Wind speed unit suffix
    pub fn speed_suffix(&self) -> &'static str {
        match self {
            Units::Imperial => "mph",
            _ => "m/s",
        }
    }
}

/// Remote endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct EndpointConfig {
    pub host: String<MAX_HOST_LEN>,
    pub port: u16,
    /// Current-weather path
    pub path: String<MAX_PATH_LEN>,
    pub forecast_path: String<MAX_PATH_LEN>,
    /// Forecast steps to fetch and show (0-3); 0 skips the forecast request
    pub forecast_steps: u8,
    pub location: Location,
    pub api_key: String<MAX_QUERY_LEN>,
    pub units: Units,
    /// Language for condition descriptions; empty to omit
    pub language: String<8>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            host: str_or_empty("api.openweathermap.org"),
            port: 80,
            path: str_or_empty("/data/2.5/weather"),
            forecast_path: str_or_empty("/data/2.5/forecast"),
            forecast_steps: 3,
            location: Location::Name(str_or_empty("London")),
            api_key: String::new(),
            units: Units::Metric,
            language: String::new(),
        }
    }
}

/// Refresh cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct RefreshConfig {
    /// Base interval between wakes (seconds)
    pub interval_s: u32,
    /// Base interval during the night window; 0 disables the night window
    pub night_interval_s: u32,
    /// Local hour the night window starts (0-23)
    pub night_start_hour: u8,
    /// Local hour the night window ends (0-23, exclusive)
    pub night_end_hour: u8,
    /// Offset of local time from UTC
    pub utc_offset_minutes: i16,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_s: 600,
            night_interval_s: 7200,
            night_start_hour: 23,
            night_end_hour: 8,
            utc_offset_minutes: 0,
        }
    }
}

impl RefreshConfig {
    /// Local hour of day for a Unix timestamp
    pub fn local_hour(&self, unix_s: u64) -> u8 {
        let local = unix_s as i64 + self.utc_offset_minutes as i64 * 60;
        (local.rem_euclid(86_400) / 3600) as u8
    }

    /// Check if `unix_s` falls in the night window
    pub fn is_night(&self, unix_s: u64) -> bool {
        if self.night_interval_s == 0 || self.night_start_hour == self.night_end_hour {
            return false;
        }
        let hour = self.local_hour(unix_s);
        if self.night_start_hour < self.night_end_hour {
            hour >= self.night_start_hour && hour < self.night_end_hour
        } else {
            hour >= self.night_start_hour || hour < self.night_end_hour
        }
    }

    /// Base interval for a cycle starting at `now`
    ///
    /// Without a wall clock the daytime interval is used.
    pub fn base_interval_s(&self, now: Option<u64>) -> u32 {
        match now {
            Some(t) if self.is_night(t) => self.night_interval_s,
            _ => self.interval_s,
        }
    }
}

/// Exponential backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct BackoffConfig {
    /// Failures tolerated before the interval starts doubling
    pub failure_threshold: u32,
    /// Largest power of two applied to the base interval
    pub max_exponent: u8,
    /// Upper bound on any wake delay (seconds)
    pub max_interval_s: u32,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0,
            max_exponent: 5,
            max_interval_s: 6 * 3600,
        }
    }
}

/// Battery classification thresholds (percent)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct BatteryThresholds {
    pub low_percent: u8,
    pub critical_percent: u8,
}

impl Default for BatteryThresholds {
    fn default() -> Self {
        Self {
            low_percent: 20,
            critical_percent: 5,
        }
    }
}

/// Panel orientation, clockwise rotation from the native scan direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Landscape,
    Portrait,
    LandscapeFlipped,
    PortraitFlipped,
}

impl Orientation {
    /// Rotation in degrees
    pub fn degrees(&self) -> u16 {
        match self {
            Orientation::Landscape => 0,
            Orientation::Portrait => 90,
            Orientation::LandscapeFlipped => 180,
            Orientation::PortraitFlipped => 270,
        }
    }

    /// Check if width and height swap
    pub fn is_rotated(&self) -> bool {
        matches!(self, Orientation::Portrait | Orientation::PortraitFlipped)
    }
}

/// Display settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct DisplayConfig {
    pub orientation: Orientation,
    /// Header title when the data carries no location name
    pub title: String<MAX_TITLE_LEN>,
    /// Partial updates allowed before a full refresh is forced
    pub full_refresh_every: u8,
    /// Panel keeps its image across deep sleep, so partial updates are
    /// allowed on the first commit after a timer or button wake
    pub partial_across_sleep: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            orientation: Orientation::Landscape,
            title: str_or_empty("Weather"),
            full_refresh_every: 10,
            partial_across_sleep: false,
        }
    }
}

/// Operation timeouts (milliseconds)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct TimeoutConfig {
    pub sensor_ms: u32,
    pub storage_ms: u32,
    /// Radio power-up plus association
    pub connect_ms: u32,
    /// TCP connect, request and full response
    pub request_ms: u32,
    /// Panel upload and refresh
    pub panel_ms: u32,
    /// Arming the wake timer
    pub arm_ms: u32,
    /// Whole fetch including retries
    pub fetch_deadline_ms: u32,
    /// Whole cycle from wake to sleep
    pub cycle_deadline_ms: u32,
    /// Pause between fetch attempts
    pub retry_backoff_ms: u32,
    pub max_attempts: u8,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            sensor_ms: 500,
            storage_ms: 2_000,
            connect_ms: 10_000,
            request_ms: 8_000,
            panel_ms: 30_000,
            arm_ms: 500,
            fetch_deadline_ms: 45_000,
            cycle_deadline_ms: 90_000,
            retry_backoff_ms: 2_000,
            max_attempts: 3,
        }
    }
}

impl TimeoutConfig {
    pub fn sensor(&self) -> Duration {
        Duration::from_millis(self.sensor_ms as u64)
    }

    pub fn storage(&self) -> Duration {
        Duration::from_millis(self.storage_ms as u64)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_millis(self.connect_ms as u64)
    }

    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms as u64)
    }

    pub fn panel(&self) -> Duration {
        Duration::from_millis(self.panel_ms as u64)
    }

    pub fn arm(&self) -> Duration {
        Duration::from_millis(self.arm_ms as u64)
    }

    pub fn fetch_deadline(&self) -> Duration {
        Duration::from_millis(self.fetch_deadline_ms as u64)
    }

    pub fn cycle_deadline(&self) -> Duration {
        Duration::from_millis(self.cycle_deadline_ms as u64)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms as u64)
    }
}

/// Configuration validation failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Refresh interval of zero seconds
    ZeroInterval,
    /// Critical threshold not below the low threshold, or above 100%
    InvalidThresholds,
    /// Night window hours outside 0-23
    InvalidHour,
    /// No endpoint host
    EmptyHost,
    /// Zero fetch attempts
    ZeroAttempts,
    /// A deadline is shorter than the operations it must contain
    DeadlineTooShort,
    /// More forecast steps than a snapshot holds
    TooManyForecastSteps,
}

impl DeviceConfig {
    /// Check the configuration for values the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.refresh.interval_s == 0 || self.backoff.max_interval_s == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.refresh.night_start_hour > 23 || self.refresh.night_end_hour > 23 {
            return Err(ConfigError::InvalidHour);
        }
        if self.battery.low_percent > 100
            || self.battery.critical_percent >= self.battery.low_percent
        {
            return Err(ConfigError::InvalidThresholds);
        }
        if self.endpoint.host.is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if self.endpoint.forecast_steps as usize > MAX_FORECAST {
            return Err(ConfigError::TooManyForecastSteps);
        }

        let t = &self.timeouts;
        if t.max_attempts == 0 {
            return Err(ConfigError::ZeroAttempts);
        }
        let one_attempt = t.connect_ms as u64 + t.request_ms as u64;
        // Load, failure marker and final store
        let cycle_parts = t.fetch_deadline_ms as u64
            + t.panel_ms as u64
            + 3 * t.storage_ms as u64
            + t.sensor_ms as u64
            + 4 * t.arm_ms as u64;
        if (t.fetch_deadline_ms as u64) < one_attempt || (t.cycle_deadline_ms as u64) < cycle_parts {
            return Err(ConfigError::DeadlineTooShort);
        }
        Ok(())
    }
}

/// Build a bounded string, leaving it empty if `s` does not fit
pub(crate) fn str_or_empty<const N: usize>(s: &str) -> String<N> {
    String::try_from(s).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(DeviceConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = DeviceConfig::default();
        config.battery.critical_percent = 30;
        config.battery.low_percent = 20;
        assert_eq!(config.validate(), Err(ConfigError::InvalidThresholds));
    }

    #[test]
    fn test_short_cycle_deadline_rejected() {
        let mut config = DeviceConfig::default();
        config.timeouts.cycle_deadline_ms = config.timeouts.fetch_deadline_ms;
        assert_eq!(config.validate(), Err(ConfigError::DeadlineTooShort));
    }

    #[test]
    fn test_forecast_steps_bounded() {
        let mut config = DeviceConfig::default();
        config.endpoint.forecast_steps = MAX_FORECAST as u8 + 1;
        assert_eq!(config.validate(), Err(ConfigError::TooManyForecastSteps));
        config.endpoint.forecast_steps = 0;
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = DeviceConfig::default();
        config.timeouts.max_attempts = 0;
        assert_eq!(config.validate(), Err(ConfigError::ZeroAttempts));
    }

    #[test]
    fn test_night_window_wraps_midnight() {
        let refresh = RefreshConfig::default();
        // 1970-01-01 23:30 UTC
        assert!(refresh.is_night(23 * 3600 + 1800));
        // 03:00
        assert!(refresh.is_night(3 * 3600));
        // 08:00 is already day
        assert!(!refresh.is_night(8 * 3600));
        assert_eq!(refresh.base_interval_s(Some(12 * 3600)), 600);
        assert_eq!(refresh.base_interval_s(Some(2 * 3600)), 7200);
        assert_eq!(refresh.base_interval_s(None), 600);
    }

    #[test]
    fn test_utc_offset_shifts_local_hour() {
        let refresh = RefreshConfig {
            utc_offset_minutes: 120,
            ..RefreshConfig::default()
        };
        // 22:00 UTC is midnight at UTC+2
        assert_eq!(refresh.local_hour(22 * 3600), 0);
        assert!(refresh.is_night(22 * 3600));
    }

    #[test]
    fn test_night_window_disabled() {
        let refresh = RefreshConfig {
            night_interval_s: 0,
            ..RefreshConfig::default()
        };
        assert!(!refresh.is_night(2 * 3600));
    }

    #[test]
    fn test_config_postcard_roundtrip() {
        let mut config = DeviceConfig::default();
        config.endpoint.location = Location::CityId(2867714);
        config.display.orientation = Orientation::Portrait;
        let bytes = postcard::to_allocvec(&config).unwrap();
        let decoded: DeviceConfig = postcard::from_bytes(&bytes).unwrap();
        assert_eq!(decoded, config);
    }
}
