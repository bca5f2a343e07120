//! Power supply abstractions

/// Errors from the power sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Conversion failed
    ConversionError,
    /// Reading outside the calibrated range
    OutOfRange,
}

/// Battery level sensor
pub trait PowerSensor {
    /// Read the remaining charge as a percentage (0-100)
    fn read_percent(&mut self) -> impl core::future::Future<Output = Result<u8, SensorError>>;
}
