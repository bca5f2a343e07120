//! Host simulator for the Inkwake duty cycle
//!
//! Implements every capability trait on top of the host OS so the real
//! controller can run end to end on a desktop:
//!
//! - Radio: plain TCP sockets
//! - Storage: a directory of files
//! - Panel: a PBM image rewritten on every commit
//! - Wake timer: a virtual clock that skips ahead instead of sleeping
//! - Thermometer: a fixed reading from the config file

pub mod config;
pub mod indicator;
pub mod panel;
pub mod power;
pub mod radio;
pub mod storage;
pub mod thermometer;
pub mod wake;

pub use config::{SimConfig, SimSettings};
pub use indicator::LogIndicator;
pub use panel::PbmPanel;
pub use power::SimPower;
pub use radio::TcpRadio;
pub use storage::DirMedium;
pub use thermometer::SimThermometer;
pub use wake::SimWakeTimer;
