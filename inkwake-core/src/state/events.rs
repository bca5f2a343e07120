//! Events that trigger state transitions

use crate::battery::BatteryState;

/// Events that can trigger state transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event {
    // Lifecycle events
    /// Wake cause read, record loaded, battery classified
    BootComplete(BatteryState),
    /// Battery budget evaluated for radio use
    PowerBudgetChecked,

    // Data events
    /// Fresh snapshot fetched
    FetchSucceeded,
    /// Fetch gave up; fall back to cache
    FetchFailed,
    /// Cached or placeholder snapshot chosen
    SnapshotSelected,

    // Output events
    /// Frame pushed to the panel (or the attempt failed and was logged)
    FrameCommitted,
    /// Record write attempted
    StateStored,
    /// Wake timer armed (or arming failed and was logged)
    WakeArmed,

    // Timing events
    /// Hard cycle deadline reached
    DeadlineExpired,
}

impl Event {
    /// Check if this event reports a degraded outcome
    pub fn is_degraded(&self) -> bool {
        matches!(self, Event::FetchFailed | Event::DeadlineExpired)
    }
}
