//! Wake cause, wake timer and deep sleep

/// Why the device woke up
///
/// Read once at the start of a cycle and never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeEvent {
    /// Power-on or reset, no previous sleep
    ColdBoot,
    /// The armed wake timer fired
    TimerExpired,
    /// A front-panel button was pressed
    ButtonPressed(u8),
    /// External wake line (e.g. charger plugged in)
    ExternalSignal,
}

impl WakeEvent {
    /// Check if the display may still hold the previous frame
    pub fn from_sleep(&self) -> bool {
        !matches!(self, WakeEvent::ColdBoot)
    }
}

/// Errors from the wake timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerError {
    /// Requested delay exceeds what the timer can represent
    OutOfRange,
    /// RTC did not accept the alarm
    Hardware,
}

/// Real-time clock with alarm and deep-sleep control
pub trait WakeTimer {
    /// Inspect the wake cause latched by the hardware
    fn wake_cause(&mut self) -> WakeEvent;

    /// Wall-clock time in seconds since the Unix epoch, if the clock is set
    fn now_unix(&mut self) -> Option<u64>;

    /// Arm the wake timer to fire after `delay_s` seconds
    fn arm(&mut self, delay_s: u32) -> impl core::future::Future<Output = Result<(), TimerError>>;

    /// Enable or disable wake on button press
    fn set_button_wake(&mut self, enabled: bool);

    /// Enter deep sleep
    ///
    /// On hardware this does not return; the next wake restarts the program.
    fn enter_deep_sleep(&mut self) -> impl core::future::Future<Output = ()>;
}
