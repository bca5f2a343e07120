//! Status LEDs as log lines

use inkwake_hal::StatusIndicator;
use log::{debug, info};

/// Indicator that logs every state change
#[derive(Debug, Default)]
pub struct LogIndicator {
    busy: bool,
    warning: bool,
}

impl StatusIndicator for LogIndicator {
    fn set_busy(&mut self, on: bool) {
        if on != self.busy {
            debug!("busy LED {}", if on { "on" } else { "off" });
        }
        self.busy = on;
    }

    fn set_warning(&mut self, on: bool) {
        if on && !self.warning {
            info!("warning LED on");
        }
        self.warning = on;
    }
}
