//! Virtual wake timer
//!
//! Deep sleep either really waits out the armed delay or skips a virtual
//! clock ahead by it, so a day of cycles runs in seconds with the night
//! window and backoff behaving as on the device.

use std::time::{SystemTime, UNIX_EPOCH};

use embassy_time::Timer;
use inkwake_hal::{TimerError, WakeEvent, WakeTimer};
use log::info;

/// Longest delay the simulated RTC alarm accepts (one week)
const MAX_DELAY_S: u32 = 7 * 24 * 3600;

/// Wake timer over the host clock
pub struct SimWakeTimer {
    cause: WakeEvent,
    armed: Option<u32>,
    button_wake: bool,
    pending_button: Option<u8>,
    real_sleep: bool,
    /// Seconds the virtual clock runs ahead of the host clock
    skipped_s: u64,
}

impl SimWakeTimer {
    /// Create a timer for a cold boot
    pub fn new(real_sleep: bool) -> Self {
        Self {
            cause: WakeEvent::ColdBoot,
            armed: None,
            button_wake: false,
            pending_button: None,
            real_sleep,
            skipped_s: 0,
        }
    }

    /// Delay armed for the coming sleep
    pub fn armed(&self) -> Option<u32> {
        self.armed
    }

    /// Press a button during the coming sleep
    ///
    /// Ignored unless button wake is enabled.
    pub fn press_button(&mut self, button: u8) {
        if self.button_wake {
            self.pending_button = Some(button);
        }
    }
}

impl WakeTimer for SimWakeTimer {
    fn wake_cause(&mut self) -> WakeEvent {
        self.cause
    }

    fn now_unix(&mut self) -> Option<u64> {
        let host = SystemTime::now().duration_since(UNIX_EPOCH).ok()?;
        Some(host.as_secs() + self.skipped_s)
    }

    async fn arm(&mut self, delay_s: u32) -> Result<(), TimerError> {
        if delay_s == 0 || delay_s > MAX_DELAY_S {
            return Err(TimerError::OutOfRange);
        }
        self.armed = Some(delay_s);
        Ok(())
    }

    fn set_button_wake(&mut self, enabled: bool) {
        self.button_wake = enabled;
    }

    async fn enter_deep_sleep(&mut self) {
        if let Some(button) = self.pending_button.take() {
            info!("woken by button {}", button);
            self.armed = None;
            self.cause = WakeEvent::ButtonPressed(button);
            return;
        }
        let Some(delay_s) = self.armed.take() else {
            info!("deep sleep without a wake timer, waking as if by button");
            self.cause = WakeEvent::ButtonPressed(0);
            return;
        };

        if self.real_sleep {
            info!("sleeping {} s", delay_s);
            Timer::after_secs(delay_s as u64).await;
        } else {
            info!("skipping {} s of deep sleep", delay_s);
            self.skipped_s += delay_s as u64;
        }
        self.cause = WakeEvent::TimerExpired;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_skips_clock_ahead() {
        let mut timer = SimWakeTimer::new(false);
        assert_eq!(timer.wake_cause(), WakeEvent::ColdBoot);
        let before = timer.now_unix().unwrap();

        block_on(timer.arm(3600)).unwrap();
        block_on(timer.enter_deep_sleep());

        assert_eq!(timer.wake_cause(), WakeEvent::TimerExpired);
        assert!(timer.now_unix().unwrap() >= before + 3600);
        assert_eq!(timer.armed(), None);
    }

    #[test]
    fn test_rejects_out_of_range_delay() {
        let mut timer = SimWakeTimer::new(false);
        assert_eq!(block_on(timer.arm(0)), Err(TimerError::OutOfRange));
        assert_eq!(block_on(timer.arm(MAX_DELAY_S + 1)), Err(TimerError::OutOfRange));
    }

    #[test]
    fn test_button_wake() {
        let mut timer = SimWakeTimer::new(false);
        timer.press_button(2);
        assert_eq!(timer.wake_cause(), WakeEvent::ColdBoot);

        timer.set_button_wake(true);
        timer.press_button(2);
        block_on(timer.arm(60)).unwrap();
        block_on(timer.enter_deep_sleep());
        assert_eq!(timer.wake_cause(), WakeEvent::ButtonPressed(2));

        block_on(timer.arm(60)).unwrap();
        block_on(timer.enter_deep_sleep());
        assert_eq!(timer.wake_cause(), WakeEvent::TimerExpired);
    }
}
