//! GPIO status LEDs
//!
//! Busy and warning LEDs driven from two output pins, directly or through
//! a transistor. Pin errors are ignored; a missing LED must never stop a
//! cycle.

use embedded_hal::digital::OutputPin;
use inkwake_hal::StatusIndicator;

/// Status LEDs on two GPIO outputs
pub struct GpioIndicator<B, W> {
    busy: B,
    warning: W,
    /// If true, LED ON = pin LOW
    inverted: bool,
}

impl<B: OutputPin, W: OutputPin> GpioIndicator<B, W> {
    /// Create a new indicator with both LEDs off
    ///
    /// # Arguments
    /// - `busy`: Pin driving the busy LED
    /// - `warning`: Pin driving the warning LED
    /// - `inverted`: If true, LEDs light when the pin is LOW
    pub fn new(busy: B, warning: W, inverted: bool) -> Self {
        let mut indicator = Self {
            busy,
            warning,
            inverted,
        };
        indicator.set_busy(false);
        indicator.set_warning(false);
        indicator
    }

    /// Create an indicator with active-high LEDs
    pub fn new_active_high(busy: B, warning: W) -> Self {
        Self::new(busy, warning, false)
    }

    /// Release the pins
    pub fn release(self) -> (B, W) {
        (self.busy, self.warning)
    }
}

fn drive<P: OutputPin>(pin: &mut P, on: bool, inverted: bool) {
    let _ = if on != inverted { pin.set_high() } else { pin.set_low() };
}

impl<B: OutputPin, W: OutputPin> StatusIndicator for GpioIndicator<B, W> {
    fn set_busy(&mut self, on: bool) {
        drive(&mut self.busy, on, self.inverted);
    }

    fn set_warning(&mut self, on: bool) {
        drive(&mut self.warning, on, self.inverted);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::convert::Infallible;
    use embedded_hal::digital::ErrorType;

    /// Mock GPIO pin for testing
    struct MockPin {
        high: bool,
    }

    impl MockPin {
        fn new(high: bool) -> Self {
            Self { high }
        }
    }

    impl ErrorType for MockPin {
        type Error = Infallible;
    }

    impl OutputPin for MockPin {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.high = false;
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.high = true;
            Ok(())
        }
    }

    #[test]
    fn test_starts_dark() {
        let indicator = GpioIndicator::new_active_high(MockPin::new(true), MockPin::new(true));
        let (busy, warning) = indicator.release();
        assert!(!busy.high);
        assert!(!warning.high);
    }

    #[test]
    fn test_active_high() {
        let mut indicator = GpioIndicator::new_active_high(MockPin::new(false), MockPin::new(false));
        indicator.set_busy(true);
        assert!(indicator.busy.high);
        assert!(!indicator.warning.high);

        indicator.set_warning(true);
        indicator.set_busy(false);
        assert!(!indicator.busy.high);
        assert!(indicator.warning.high);
    }

    #[test]
    fn test_active_low() {
        let mut indicator = GpioIndicator::new(MockPin::new(false), MockPin::new(false), true);

        // Off means the pin idles high
        assert!(indicator.busy.high);
        assert!(indicator.warning.high);

        indicator.set_busy(true);
        assert!(!indicator.busy.high);
    }
}
