//! Board driver implementations
//!
//! Concrete implementations of the capability traits defined in
//! `inkwake-hal` for common board components:
//!
//! - Battery gauge (LiPo cell behind a resistor divider on an ADC pin)
//! - Status LEDs (busy and warning on GPIO outputs)
//! - On-die temperature sensor on an ADC channel

#![no_std]
#![deny(unsafe_code)]

pub mod battery;
pub mod indicator;
pub mod temperature;

pub use battery::{AdcBatterySensor, AdcReader};
pub use indicator::GpioIndicator;
pub use temperature::AdcTemperatureSensor;
