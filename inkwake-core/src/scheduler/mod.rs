//! Wake scheduling and the duty-cycle controller
//!
//! [`backoff`] decides how long to sleep; [`controller`] runs one wake
//! from boot to deep sleep under a hard deadline.

pub mod backoff;
pub mod controller;

pub use backoff::{next_wake_delay, plan_next_wake};
pub use controller::{CycleReport, DutyCycle, Peripherals};
