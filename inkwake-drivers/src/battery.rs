//! LiPo battery gauge
//!
//! Single-cell lithium battery measured through a resistor divider on an
//! ADC pin. Charge is estimated from the open-circuit voltage with a
//! lookup table, integer-only.

use inkwake_hal::{PowerSensor, SensorError};

/// Single-cell LiPo discharge curve
///
/// Table format: (cell_mv, percent), sorted by decreasing voltage.
/// Values are for a resting cell at room temperature.
const DISCHARGE_TABLE: &[(u16, u8)] = &[
    (4200, 100),
    (4110, 90),
    (4020, 80),
    (3950, 70),
    (3870, 60),
    (3840, 50),
    (3800, 40),
    (3770, 30),
    (3730, 20),
    (3690, 10),
    (3610, 5),
    (3300, 0),
];

/// Raw readings below this mean the divider or the cell is disconnected
const MIN_VALID_RAW: u16 = 256;

/// ADC reading trait for platform abstraction
pub trait AdcReader {
    /// Read the ADC scaled to 16 bits (0-65535)
    #[allow(clippy::result_unit_err)]
    fn read(&mut self) -> Result<u16, ()>;
}

/// Battery gauge on an ADC channel
pub struct AdcBatterySensor<ADC> {
    adc: ADC,
    /// ADC reference voltage in mV
    vref_mv: u16,
    /// Divider ratio ×100 (300 for a 3:1 divider)
    divider_x100: u16,
}

impl<ADC> AdcBatterySensor<ADC> {
    /// Create a new battery gauge
    ///
    /// # Arguments
    /// - `adc`: ADC channel wired to the divider tap
    /// - `vref_mv`: Reference voltage in millivolts (typically 3300)
    /// - `divider_x100`: Cell voltage over tap voltage, ×100
    pub fn new(adc: ADC, vref_mv: u16, divider_x100: u16) -> Self {
        Self {
            adc,
            vref_mv,
            divider_x100,
        }
    }

    /// Convert a raw 16-bit reading to cell voltage
    pub fn raw_to_cell_mv(&self, raw: u16) -> Result<u16, SensorError> {
        if raw < MIN_VALID_RAW {
            return Err(SensorError::OutOfRange);
        }

        let tap_mv = raw as u32 * self.vref_mv as u32 / 65_536;
        let cell_mv = tap_mv * self.divider_x100 as u32 / 100;

        u16::try_from(cell_mv).map_err(|_| SensorError::OutOfRange)
    }

    /// Estimate charge from cell voltage
    ///
    /// Clamps to 100 while charging and to 0 below the cutoff.
    /// Uses linear interpolation between table entries.
    pub fn cell_mv_to_percent(cell_mv: u16) -> u8 {
        let (top_mv, top_pct) = DISCHARGE_TABLE[0];
        if cell_mv >= top_mv {
            return top_pct;
        }

        for pair in DISCHARGE_TABLE.windows(2) {
            let (mv_high, pct_high) = pair[0];
            let (mv_low, pct_low) = pair[1];

            if cell_mv >= mv_low {
                // pct = pct_low + (pct_high - pct_low) * (mv - mv_low) / (mv_high - mv_low)
                let mv_range = (mv_high - mv_low) as u32;
                let pct_range = (pct_high - pct_low) as u32;
                let mv_offset = (cell_mv - mv_low) as u32;

                return pct_low + (pct_range * mv_offset / mv_range) as u8;
            }
        }

        0
    }
}

impl<ADC: AdcReader> PowerSensor for AdcBatterySensor<ADC> {
    async fn read_percent(&mut self) -> Result<u8, SensorError> {
        let raw = self.adc.read().map_err(|_| SensorError::ConversionError)?;
        let cell_mv = self.raw_to_cell_mv(raw)?;
        Ok(Self::cell_mv_to_percent(cell_mv))
    }
}
