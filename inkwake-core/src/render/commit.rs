//! Panel commit and refresh policy
//!
//! E-paper panels ghost after repeated partial updates, and most lose
//! their image state in deep sleep. A full refresh is used on the first
//! commit after wake unless the panel keeps its image across sleep, and
//! whenever the persisted partial-update count reaches its limit.
//! A partial update uploads only the regions whose signature differs from
//! the frame already on the panel.

use embassy_time::{with_timeout, Duration};
use inkwake_hal::{PanelDevice, PanelError, WakeEvent};

use super::renderer::{DisplayFrame, FrameSignature};
use crate::config::DisplayConfig;
use crate::logging::{debug, warn};

/// How a frame reaches the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RefreshMode {
    /// Whole panel, with the clearing flash
    Full,
    /// Changed regions only
    Partial,
    /// Panel already shows the frame; nothing was sent
    Unchanged,
}

/// Display commit failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// Panel reported an error
    Panel(PanelError),
    /// Panel did not finish within its timeout
    Timeout,
}

impl From<PanelError> for DisplayError {
    fn from(err: PanelError) -> Self {
        DisplayError::Panel(err)
    }
}

/// Choose the refresh mode for this cycle's commit
///
/// # Arguments
/// * `wake` - Why the device woke up
/// * `partial_updates` - Partial updates since the last full refresh
/// * `config` - Display policy
pub fn choose_refresh(wake: WakeEvent, partial_updates: u8, config: &DisplayConfig) -> RefreshMode {
    if !config.partial_across_sleep || !wake.from_sleep() {
        return RefreshMode::Full;
    }
    if partial_updates >= config.full_refresh_every {
        return RefreshMode::Full;
    }
    RefreshMode::Partial
}

/// Display commit for one cycle
pub struct Display<'a, P> {
    panel: &'a mut P,
    mode: RefreshMode,
    timeout: Duration,
}

impl<'a, P: PanelDevice> Display<'a, P> {
    /// Create a display handle that commits with `mode`
    pub fn new(panel: &'a mut P, mode: RefreshMode, timeout: Duration) -> Self {
        Self {
            panel,
            mode,
            timeout,
        }
    }

    /// Push a frame to the panel
    ///
    /// # Arguments
    /// * `frame` - Frame to show
    /// * `previous` - Signature of the frame on the panel, if known
    pub async fn commit(
        &mut self,
        frame: &DisplayFrame,
        previous: Option<&FrameSignature>,
    ) -> Result<RefreshMode, DisplayError> {
        let region = match self.mode {
            RefreshMode::Partial => Some(frame.changed_since(previous)),
            _ => None,
        };
        if region.is_some_and(|r| r.is_empty()) {
            debug!("panel content unchanged");
            return Ok(RefreshMode::Unchanged);
        }

        let panel = &mut *self.panel;
        let upload = async move {
            match region {
                Some(region) => panel.write_partial(frame.as_bytes(), region).await,
                None => panel.write_full(frame.as_bytes()).await,
            }
        };

        let mode = if region.is_some() { RefreshMode::Partial } else { RefreshMode::Full };
        match with_timeout(self.timeout, upload).await {
            Ok(Ok(())) => {
                debug!("panel commit done ({:?})", mode);
                Ok(mode)
            }
            Ok(Err(err)) => {
                warn!("panel commit failed: {:?}", err);
                Err(DisplayError::Panel(err))
            }
            Err(_) => {
                warn!("panel commit timed out");
                Err(DisplayError::Timeout)
            }
        }
    }

    /// Put the panel to sleep
    pub async fn sleep(&mut self) -> Result<(), DisplayError> {
        with_timeout(self.timeout, self.panel.sleep())
            .await
            .map_err(|_| DisplayError::Timeout)??;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::{BatteryReading, BatteryState};
    use crate::config::RefreshConfig;
    use crate::data::{DataSnapshot, Freshness};
    use crate::render::Renderer;
    use embassy_futures::block_on;
    use inkwake_hal::mock::MockPanel;
    use inkwake_hal::Region;

    fn frame_at(size: (u16, u16), percent: u8) -> DisplayFrame {
        let display = DisplayConfig::default();
        let refresh = RefreshConfig::default();
        let battery = BatteryReading {
            state: BatteryState::Normal,
            percent: Some(percent),
        };
        Renderer::new(&display, &refresh, battery, size).render(&DataSnapshot::placeholder(), Freshness::Fallback)
    }

    fn frame(size: (u16, u16)) -> DisplayFrame {
        frame_at(size, 50)
    }

    fn commit(
        panel: &mut MockPanel,
        mode: RefreshMode,
        frame: &DisplayFrame,
        previous: Option<&FrameSignature>,
    ) -> Result<RefreshMode, DisplayError> {
        block_on(Display::new(panel, mode, Duration::from_millis(100)).commit(frame, previous))
    }

    #[test]
    fn test_cold_boot_is_always_full() {
        let config = DisplayConfig {
            partial_across_sleep: true,
            ..DisplayConfig::default()
        };
        assert_eq!(choose_refresh(WakeEvent::ColdBoot, 0, &config), RefreshMode::Full);
        assert_eq!(choose_refresh(WakeEvent::TimerExpired, 0, &config), RefreshMode::Partial);
    }

    #[test]
    fn test_first_commit_after_sleep_is_full_by_default() {
        let config = DisplayConfig::default();
        assert_eq!(choose_refresh(WakeEvent::TimerExpired, 0, &config), RefreshMode::Full);
        assert_eq!(choose_refresh(WakeEvent::ButtonPressed(1), 3, &config), RefreshMode::Full);
    }

    #[test]
    fn test_partial_count_forces_full() {
        let config = DisplayConfig {
            partial_across_sleep: true,
            full_refresh_every: 3,
            ..DisplayConfig::default()
        };
        assert_eq!(choose_refresh(WakeEvent::TimerExpired, 2, &config), RefreshMode::Partial);
        assert_eq!(choose_refresh(WakeEvent::TimerExpired, 3, &config), RefreshMode::Full);
    }

    #[test]
    fn test_partial_commit_sends_changed_region() {
        let mut panel = MockPanel::new(200, 100);
        let before = frame_at((200, 100), 50);
        let after = frame_at((200, 100), 90);

        let mode = commit(&mut panel, RefreshMode::Partial, &after, Some(&before.signature()));

        assert_eq!(mode, Ok(RefreshMode::Partial));
        let region = panel.last().unwrap().region.unwrap();
        assert_eq!(region, after.changed_since(Some(&before.signature())));
        assert!(region.width < 200);
    }

    #[test]
    fn test_partial_commit_without_history_sends_whole_screen() {
        let mut panel = MockPanel::new(200, 100);
        let frame = frame((200, 100));
        assert_eq!(commit(&mut panel, RefreshMode::Partial, &frame, None), Ok(RefreshMode::Partial));
        assert_eq!(panel.last().unwrap().region, Some(Region::new(0, 0, 200, 100)));
    }

    #[test]
    fn test_unchanged_frame_is_not_uploaded() {
        let mut panel = MockPanel::new(200, 100);
        let frame = frame((200, 100));

        let mode = commit(&mut panel, RefreshMode::Partial, &frame, Some(&frame.signature()));
        assert_eq!(mode, Ok(RefreshMode::Unchanged));
        assert!(panel.writes.is_empty());

        // A full refresh is never skipped
        let mode = commit(&mut panel, RefreshMode::Full, &frame, Some(&frame.signature()));
        assert_eq!(mode, Ok(RefreshMode::Full));
        assert_eq!(panel.writes.len(), 1);
    }

    #[test]
    fn test_panel_error_is_reported() {
        let mut panel = MockPanel::new(200, 100);
        panel.fail = Some(PanelError::Busy);
        let frame = frame((200, 100));
        let result = block_on(async {
            let mut display = Display::new(&mut panel, RefreshMode::Full, Duration::from_millis(100));
            let result = display.commit(&frame, None).await;
            display.sleep().await.unwrap();
            result
        });
        assert_eq!(result, Err(DisplayError::Panel(PanelError::Busy)));
        assert!(panel.asleep);
    }
}
