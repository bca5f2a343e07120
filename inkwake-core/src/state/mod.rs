//! State machine for one duty cycle
//!
//! Defines the authoritative per-wake sequence.
//! The state machine is explicit, finite, and deterministic.

pub mod events;
pub mod machine;

pub use events::Event;
pub use machine::State;
