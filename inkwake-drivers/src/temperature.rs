//! On-die temperature sensor
//!
//! Many MCUs route a band-gap sensor to an internal ADC channel (channel 4
//! on the RP2040). Its output falls linearly with temperature:
//! `T = 27 - (V - 0.706) / 0.001721` in °C. Integer-only.

use inkwake_hal::{SensorError, TemperatureSensor};

use crate::battery::AdcReader;

/// Sensor voltage at 27 °C, in µV
const V27_UV: i64 = 706_000;

/// Voltage slope in µV per °C (the sensor output drops as it warms)
const SLOPE_UV_PER_C: i64 = 1_721;

/// Readings outside the sensor's rated range are rejected
const MIN_DECICELSIUS: i32 = -400;
const MAX_DECICELSIUS: i32 = 850;

/// Temperature sensor on an ADC channel
pub struct AdcTemperatureSensor<ADC> {
    adc: ADC,
    /// ADC reference voltage in mV
    vref_mv: u16,
}

impl<ADC> AdcTemperatureSensor<ADC> {
    /// Create a new sensor
    ///
    /// # Arguments
    /// - `adc`: ADC channel wired to the sensor
    /// - `vref_mv`: Reference voltage in millivolts (typically 3300)
    pub fn new(adc: ADC, vref_mv: u16) -> Self {
        Self { adc, vref_mv }
    }

    /// Convert a raw 16-bit reading to tenths of a degree Celsius
    pub fn raw_to_decicelsius(&self, raw: u16) -> Result<i16, SensorError> {
        let uv = raw as i64 * self.vref_mv as i64 * 1000 / 65_536;
        let decicelsius = 270 - (uv - V27_UV) * 10 / SLOPE_UV_PER_C;

        let decicelsius = i32::try_from(decicelsius).map_err(|_| SensorError::OutOfRange)?;
        if !(MIN_DECICELSIUS..=MAX_DECICELSIUS).contains(&decicelsius) {
            return Err(SensorError::OutOfRange);
        }
        Ok(decicelsius as i16)
    }
}

impl<ADC: AdcReader> TemperatureSensor for AdcTemperatureSensor<ADC> {
    async fn read_decicelsius(&mut self) -> Result<i16, SensorError> {
        let raw = self.adc.read().map_err(|_| SensorError::ConversionError)?;
        self.raw_to_decicelsius(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    struct DummyAdc(Result<u16, ()>);

    impl AdcReader for DummyAdc {
        fn read(&mut self) -> Result<u16, ()> {
            self.0
        }
    }

    /// Raw reading for a sensor voltage at 3.3 V reference
    fn raw_for(uv: u32) -> u16 {
        (uv as u64 * 65_536 / 3_300_000) as u16
    }

    fn sensor() -> AdcTemperatureSensor<DummyAdc> {
        AdcTemperatureSensor::new(DummyAdc(Ok(0)), 3300)
    }

    #[test]
    fn test_reference_point() {
        let t = sensor().raw_to_decicelsius(raw_for(706_000)).unwrap();
        assert!((t - 270).abs() <= 1);
    }

    #[test]
    fn test_warmer_means_lower_voltage() {
        // Ten degrees above the reference point
        let t = sensor().raw_to_decicelsius(raw_for(706_000 - 17_210)).unwrap();
        assert!((t - 370).abs() <= 1);

        let cold = sensor().raw_to_decicelsius(raw_for(740_000)).unwrap();
        assert!(cold < 270);
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(sensor().raw_to_decicelsius(0), Err(SensorError::OutOfRange));
        assert_eq!(sensor().raw_to_decicelsius(u16::MAX), Err(SensorError::OutOfRange));
    }

    #[test]
    fn test_read_decicelsius() {
        let mut sensor = AdcTemperatureSensor::new(DummyAdc(Ok(raw_for(706_000))), 3300);
        let t = block_on(sensor.read_decicelsius()).unwrap();
        assert!((265..=275).contains(&t));
    }

    #[test]
    fn test_adc_failure() {
        let mut sensor = AdcTemperatureSensor::new(DummyAdc(Err(())), 3300);
        assert_eq!(block_on(sensor.read_decicelsius()), Err(SensorError::ConversionError));
    }
}
