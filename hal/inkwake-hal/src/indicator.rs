//! Status LED abstractions

/// Busy and warning indicators
///
/// Both must be switched off before deep sleep.
pub trait StatusIndicator {
    /// Light while the device is awake and working
    fn set_busy(&mut self, on: bool);

    /// Light when the cycle degraded (no network, stale data)
    fn set_warning(&mut self, on: bool);
}

/// Indicator for boards without LEDs
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndicator;

impl StatusIndicator for NoIndicator {
    fn set_busy(&mut self, _on: bool) {}

    fn set_warning(&mut self, _on: bool) {}
}
