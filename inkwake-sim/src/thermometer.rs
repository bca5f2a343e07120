//! Simulated indoor thermometer

use inkwake_hal::{SensorError, TemperatureSensor};

/// Thermometer with a fixed reading, or none at all
pub struct SimThermometer {
    decicelsius: Option<i16>,
}

impl SimThermometer {
    /// Thermometer reading `celsius`; `None` behaves like a missing sensor
    pub fn new(celsius: Option<f32>) -> Self {
        Self {
            decicelsius: celsius.map(|c| (c * 10.0).round() as i16),
        }
    }
}

impl TemperatureSensor for SimThermometer {
    async fn read_decicelsius(&mut self) -> Result<i16, SensorError> {
        self.decicelsius.ok_or(SensorError::ConversionError)
    }
}
