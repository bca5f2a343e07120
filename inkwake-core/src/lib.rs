//! Board-agnostic duty-cycle engine for battery-powered e-paper displays
//!
//! This crate contains all application logic that does not depend on
//! specific hardware implementations:
//!
//! - Device configuration and validation
//! - Data snapshots and the remote schema mapping
//! - Battery classification
//! - Crash-safe persistent cache
//! - Bounded network fetch with retries
//! - Frame rendering and refresh policy
//! - Explicit per-wake state machine
//! - Backoff and the duty-cycle controller
//!
//! Hardware is reached only through the capability traits in
//! [`inkwake_hal`].

#![no_std]
#![deny(unsafe_code)]

extern crate alloc;

mod logging;

pub mod battery;
pub mod cache;
pub mod config;
pub mod data;
pub mod fetch;
pub mod render;
pub mod scheduler;
pub mod state;

pub use inkwake_hal::WakeEvent;
