//! Board temperature abstractions

use crate::power::SensorError;

/// On-board temperature sensor
pub trait TemperatureSensor {
    /// Read the temperature in tenths of a degree Celsius
    fn read_decicelsius(&mut self) -> impl core::future::Future<Output = Result<i16, SensorError>>;
}

/// Sensor for boards without a thermometer
///
/// Every reading fails, so nothing is shown.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoThermometer;

impl TemperatureSensor for NoThermometer {
    async fn read_decicelsius(&mut self) -> Result<i16, SensorError> {
        Err(SensorError::ConversionError)
    }
}
