//! Per-wake state machine definition
//!
//! Every cycle walks the same explicit path from `Booted` to `Sleeping`.
//! The controller drives it; the machine only decides what comes next.

use super::events::Event;
use crate::battery::BatteryState;

/// Cycle states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// Wake cause read, cache record loading
    Booted,
    /// Battery classified, power budget being checked
    Classifying(BatteryState),
    /// Radio active, fetch in progress
    Fetching,
    /// Selecting cached or placeholder data
    UsingCache,
    /// Composing and committing the frame
    Rendering,
    /// Writing the cache record
    Persisting,
    /// Computing and arming the next wake
    SchedulingNextWake,
    /// Terminal; deep sleep follows
    Sleeping,
}

impl State {
    /// Check if this state may power the radio
    pub fn radio_allowed(&self) -> bool {
        matches!(self, State::Fetching)
    }

    /// Check if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Sleeping)
    }

    /// Check if the cycle deadline can still cut this state short
    pub fn is_preemptible(&self) -> bool {
        !matches!(self, State::SchedulingNextWake | State::Sleeping)
    }

    /// Process an event and return the next state
    ///
    /// This is the core state transition logic.
    pub fn transition(self, event: Event) -> Self {
        use Event::*;
        use State::*;

        match (self, event) {
            // Boot transitions
            (Booted, BootComplete(battery)) => Classifying(battery),

            // Classifying transitions
            (Classifying(BatteryState::Critical), PowerBudgetChecked) => UsingCache,
            (Classifying(_), PowerBudgetChecked) => Fetching,

            // Fetching transitions
            (Fetching, FetchSucceeded) => Rendering,
            (Fetching, FetchFailed) => UsingCache,

            // UsingCache transitions
            (UsingCache, SnapshotSelected) => Rendering,

            // Rendering transitions (display errors do not stop the cycle)
            (Rendering, FrameCommitted) => Persisting,

            // Persisting transitions (write failures do not stop the cycle)
            (Persisting, StateStored) => SchedulingNextWake,

            // SchedulingNextWake transitions
            (SchedulingNextWake, WakeArmed) => Sleeping,
            (SchedulingNextWake, DeadlineExpired) => Sleeping,

            // Deadline preemption from any working state
            (state, DeadlineExpired) if state.is_preemptible() => SchedulingNextWake,

            // Default: stay in current state
            _ => self,
        }
    }
}
