//! Simulator configuration file
//!
//! One TOML file carries the device configuration exactly as a board would
//! receive it, plus a `[sim]` table describing the simulated hardware.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use inkwake_core::config::DeviceConfig;
use serde::Deserialize;

/// Simulated hardware
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Battery charge at start
    pub battery_percent: u8,
    /// Charge lost per cycle
    pub battery_drain: u8,
    pub panel_width: u16,
    pub panel_height: u16,
    /// Radio refuses to power up
    pub offline: bool,
    /// Really sleep for the armed delay instead of skipping the clock ahead
    pub real_sleep: bool,
    /// Indoor temperature in degrees Celsius; absent means no thermometer
    pub room_temperature: Option<f32>,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            battery_percent: 80,
            battery_drain: 0,
            panel_width: 296,
            panel_height: 128,
            offline: false,
            real_sleep: false,
            room_temperature: None,
        }
    }
}

/// Contents of the simulator config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub sim: SimSettings,
    pub device: DeviceConfig,
}

impl SimConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("loading {}", path.display()))
    }

    /// Parse and validate config text
    pub fn parse(text: &str) -> Result<Self> {
        let config: SimConfig = toml::from_str(text).context("invalid TOML")?;
        config
            .device
            .validate()
            .map_err(|err| anyhow!("invalid device config: {:?}", err))?;
        if config.sim.panel_width == 0 || config.sim.panel_height == 0 {
            return Err(anyhow!("panel size must be non-zero"));
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inkwake_core::config::{Location, Units};

    #[test]
    fn test_sample_config() {
        let config = SimConfig::parse(include_str!("../device.toml")).unwrap();
        assert_eq!(config.device.endpoint.units, Units::Metric);
        assert!(matches!(config.device.endpoint.location, Location::Name(_)));
        assert_eq!(config.device.refresh.interval_s, 600);
        assert_eq!(config.sim.panel_width, 296);
        assert_eq!(config.sim.room_temperature, Some(21.5));
        assert_eq!(config.device.endpoint.forecast_steps, 3);
        assert_eq!(config.device.endpoint.forecast_path, "/data/2.5/forecast");
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = SimConfig::parse("").unwrap();
        assert_eq!(config.device, DeviceConfig::default());
        assert!(!config.sim.offline);
        assert_eq!(config.sim.room_temperature, None);
    }

    #[test]
    fn test_too_many_forecast_steps_rejected() {
        assert!(SimConfig::parse("[device.endpoint]\nforecast_steps = 9\n").is_err());
    }

    #[test]
    fn test_city_id_location() {
        let config = SimConfig::parse("[device.endpoint]\nlocation = { city_id = 2643743 }\n").unwrap();
        assert_eq!(config.device.endpoint.location, Location::CityId(2643743));
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let text = "[device.battery]\nlow_percent = 5\ncritical_percent = 10\n";
        assert!(SimConfig::parse(text).is_err());
    }

    #[test]
    fn test_bad_toml_rejected() {
        assert!(SimConfig::parse("[device\n").is_err());
    }
}
