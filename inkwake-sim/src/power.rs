//! Simulated battery

use inkwake_hal::{PowerSensor, SensorError};

/// Battery that loses a fixed amount of charge per reading
pub struct SimPower {
    percent: u8,
    drain: u8,
}

impl SimPower {
    pub fn new(percent: u8, drain: u8) -> Self {
        Self {
            percent: percent.min(100),
            drain,
        }
    }
}

impl PowerSensor for SimPower {
    async fn read_percent(&mut self) -> Result<u8, SensorError> {
        let reading = self.percent;
        self.percent = self.percent.saturating_sub(self.drain);
        Ok(reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_drains_per_reading() {
        let mut power = SimPower::new(3, 2);
        assert_eq!(block_on(power.read_percent()), Ok(3));
        assert_eq!(block_on(power.read_percent()), Ok(1));
        assert_eq!(block_on(power.read_percent()), Ok(0));
    }
}
