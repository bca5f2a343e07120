//! Inkwake Hardware Abstraction Layer
//!
//! This crate defines the hardware capabilities the duty-cycle engine
//! drives. Board crates implement them for real silicon, the simulator
//! implements them on top of the host OS, and the `mock` feature provides
//! scriptable in-memory versions for tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  inkwake-core (duty-cycle controller)   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  inkwake-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  board crate  │       │  inkwake-sim  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`radio::RadioLink`] - Wireless link and one TCP connection as an
//!   `embedded-io-async` stream
//! - [`panel::PanelDevice`] - E-paper panel commit
//! - [`storage::StorageMedium`] - Removable file storage
//! - [`power::PowerSensor`] - Battery level
//! - [`temperature::TemperatureSensor`] - Board temperature
//! - [`wake::WakeTimer`] - Wake cause, wake timer and deep sleep
//! - [`indicator::StatusIndicator`] - Busy/warning LEDs
//!
//! Every async operation may hang on real hardware; callers are expected
//! to bound each call with a timeout.

#![no_std]
#![deny(unsafe_code)]

#[cfg(any(test, feature = "mock"))]
extern crate alloc;

pub mod indicator;
pub mod panel;
pub mod power;
pub mod radio;
pub mod storage;
pub mod temperature;
pub mod wake;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

// Re-export key traits at crate root for convenience
pub use indicator::{NoIndicator, StatusIndicator};
pub use panel::{PanelDevice, PanelError, Region};
pub use power::{PowerSensor, SensorError};
pub use radio::{RadioError, RadioLink};
pub use storage::{MediumError, StorageMedium};
pub use temperature::{NoThermometer, TemperatureSensor};
pub use wake::{TimerError, WakeEvent, WakeTimer};
