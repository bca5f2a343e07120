//! Request targets for the Inkwake weather endpoints
//!
//! The HTTP exchange itself is handled by `reqwless`; this crate builds
//! the origin-form target it sends, `path?key=value&...`, with values
//! percent-encoded into a fixed-size buffer.
//!
//! ```text
//! /data/2.5/forecast?q=S%C3%A3o%20Paulo&appid=...&units=metric&cnt=3
//! └──── path ──────┘└──────────────── query ─────────────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

pub mod target;

pub use target::{Target, MAX_TARGET_LEN};

/// Errors that can occur while building a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TargetError {
    /// Encoded target exceeds [`MAX_TARGET_LEN`]
    TooLong,
    /// Path is not absolute or already carries a query
    InvalidPath,
}
