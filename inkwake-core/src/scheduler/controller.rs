//! Duty-cycle controller
//!
//! Runs exactly one wake: boot, classify, fetch or fall back, render,
//! persist, schedule, sleep. The working steps race a hard cycle
//! deadline; when it fires the in-flight step is dropped, every resource
//! is released and the cycle goes straight to scheduling the next wake.
//! No failure stops the cycle from reaching [`State::Sleeping`].
//!
//! Before the radio is powered the record is stored with the failure
//! counter already raised, so a fetch cut short by the deadline still
//! counts towards backoff. A successful cycle resets it when persisting.

use embassy_futures::select::{select, Either};
use embassy_time::{with_timeout, Duration, Instant, Timer};
use inkwake_hal::{
    NoThermometer, PanelDevice, PowerSensor, RadioLink, StatusIndicator, StorageMedium, TemperatureSensor, WakeEvent,
    WakeTimer,
};

use super::backoff::plan_next_wake;
use crate::battery::{BatteryMonitor, BatteryReading, BatteryState};
use crate::cache::{CacheRecord, PersistentCache, StorageError};
use crate::config::DeviceConfig;
use crate::data::{DataSnapshot, Freshness};
use crate::fetch::{FetchClient, FetchError};
use crate::logging::{debug, error, info, warn};
use crate::render::{choose_refresh, Display, DisplayError, FrameSignature, RefreshMode, Renderer};
use crate::state::{Event, State};

/// Arm timeouts held back from the cycle deadline for release and arming
const RESERVE_ARM_TIMEOUTS: u32 = 4;

/// Hardware the controller drives
pub struct Peripherals<R, P, S, B, W, I, T = NoThermometer> {
    pub radio: R,
    pub panel: P,
    pub storage: S,
    pub power: B,
    pub wake: W,
    pub indicator: I,
    /// Indoor thermometer shown in the footer
    pub thermometer: T,
}

/// Outcome of one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CycleReport {
    pub wake: WakeEvent,
    pub battery: BatteryReading,
    /// Indoor temperature in tenths of a degree, if read
    pub room_temperature: Option<i16>,
    /// Freshness of the data on screen
    pub freshness: Freshness,
    /// Failure counter after this cycle
    pub consecutive_failures: u32,
    /// Armed delay until the next wake
    pub next_wake_s: u32,
    /// Refresh used, `None` if nothing reached the panel
    pub refresh: Option<RefreshMode>,
    pub fetch_error: Option<FetchError>,
    pub display_error: Option<DisplayError>,
    /// Record written this cycle
    pub persisted: bool,
    /// Radio powered this cycle
    pub radio_used: bool,
    /// Cycle deadline cut the working steps short
    pub preempted: bool,
    pub final_state: State,
    pub elapsed_ms: u64,
}

/// Working state of the cycle in progress
///
/// Lives outside the deadline race so partial progress survives
/// preemption.
struct Cycle {
    state: State,
    wake: WakeEvent,
    now: Option<u64>,
    config: DeviceConfig,
    external_config: bool,
    battery: BatteryReading,
    room_temperature: Option<i16>,
    /// Last-known-good snapshot to persist
    cached: Option<DataSnapshot>,
    /// Snapshot selected for display
    shown: Option<DataSnapshot>,
    failures: u32,
    last_success: Option<u64>,
    partial_updates: u8,
    /// Signature of the frame on the panel
    frame: Option<FrameSignature>,
    refresh: Option<RefreshMode>,
    fetch_error: Option<FetchError>,
    display_error: Option<DisplayError>,
    persisted: bool,
    radio_used: bool,
    panel_active: bool,
    degraded: bool,
}

impl Cycle {
    fn new(wake: WakeEvent, now: Option<u64>, config: Option<DeviceConfig>) -> Self {
        Self {
            state: State::Booted,
            wake,
            now,
            external_config: config.is_some(),
            config: config.unwrap_or_default(),
            battery: BatteryReading {
                state: BatteryState::Critical,
                percent: None,
            },
            room_temperature: None,
            cached: None,
            shown: None,
            failures: 0,
            last_success: None,
            partial_updates: 0,
            frame: None,
            refresh: None,
            fetch_error: None,
            display_error: None,
            persisted: false,
            radio_used: false,
            panel_active: false,
            degraded: false,
        }
    }

    fn advance(&mut self, event: Event) {
        let next = self.state.transition(event);
        debug!("{:?} --{:?}--> {:?}", self.state, event, next);
        self.state = next;
        self.degraded |= event.is_degraded();
    }

    fn adopt(&mut self, record: CacheRecord) {
        debug!(
            "cache record: failures={}, partial_updates={}",
            record.consecutive_failures, record.partial_updates
        );
        self.cached = record.snapshot;
        self.failures = record.consecutive_failures;
        self.last_success = record.last_success;
        self.partial_updates = record.partial_updates;
        self.frame = record.frame;
        if !self.external_config {
            self.config = record.config;
        }
    }

    /// Stale copy of the cache, or the placeholder
    fn fallback_snapshot(&self) -> DataSnapshot {
        match &self.cached {
            Some(snapshot) => snapshot.clone().into_stale(),
            None => DataSnapshot::placeholder(),
        }
    }

    fn to_record(&self) -> CacheRecord {
        CacheRecord {
            snapshot: self.cached.clone(),
            config: self.config.clone(),
            last_success: self.last_success,
            consecutive_failures: self.failures,
            partial_updates: self.partial_updates,
            frame: self.frame,
        }
    }
}

/// Duty-cycle controller
pub struct DutyCycle<R, P, S, B, W, I, T = NoThermometer> {
    hw: Peripherals<R, P, S, B, W, I, T>,
    config: Option<DeviceConfig>,
}

impl<R, P, S, B, W, I, T> DutyCycle<R, P, S, B, W, I, T>
where
    R: RadioLink,
    P: PanelDevice,
    S: StorageMedium,
    B: PowerSensor,
    W: WakeTimer,
    I: StatusIndicator,
    T: TemperatureSensor,
{
    /// Create a controller
    ///
    /// # Arguments
    /// * `hw` - Peripherals, all idle
    /// * `config` - Validated configuration; `None` reuses the one stored
    ///   in the cache record, or defaults on first run
    pub fn new(hw: Peripherals<R, P, S, B, W, I, T>, config: Option<DeviceConfig>) -> Self {
        Self { hw, config }
    }

    pub fn peripherals(&self) -> &Peripherals<R, P, S, B, W, I, T> {
        &self.hw
    }

    pub fn into_peripherals(self) -> Peripherals<R, P, S, B, W, I, T> {
        self.hw
    }

    /// Run one cycle and enter deep sleep
    ///
    /// On hardware deep sleep does not return.
    pub async fn run(&mut self) -> CycleReport {
        let report = self.run_cycle().await;
        self.hw.wake.enter_deep_sleep().await;
        report
    }

    /// Run one cycle up to the point of deep sleep
    pub async fn run_cycle(&mut self) -> CycleReport {
        let started = Instant::now();
        self.hw.indicator.set_busy(true);
        self.hw.indicator.set_warning(false);

        let wake = self.hw.wake.wake_cause();
        let now = self.hw.wake.now_unix();
        info!("woke: {:?}", wake);

        let mut cx = Cycle::new(wake, now, self.config.clone());
        let timeouts = cx.config.timeouts;
        let reserve = timeouts.arm() * RESERVE_ARM_TIMEOUTS;
        let budget = timeouts
            .cycle_deadline()
            .checked_sub(reserve)
            .unwrap_or(Duration::from_ticks(0));

        let preempted = match select(Self::steps(&mut self.hw, &mut cx), Timer::at(started + budget)).await {
            Either::First(()) => false,
            Either::Second(()) => true,
        };

        if preempted {
            warn!("cycle deadline expired in {:?}", cx.state);
            self.hw.indicator.set_warning(true);
            if cx.state == State::Fetching {
                // Matches the counter stored before the radio came up
                cx.failures = cx.failures.saturating_add(1);
                cx.fetch_error = Some(FetchError::DeadlineExceeded);
            }
            if cx.shown.is_none() {
                cx.shown = Some(cx.fallback_snapshot());
            }
            self.release(&cx).await;
            cx.advance(Event::DeadlineExpired);
        }

        // SchedulingNextWake
        let next_wake_s = plan_next_wake(&cx.config, cx.now, cx.failures, cx.battery.state);
        match with_timeout(cx.config.timeouts.arm(), self.hw.wake.arm(next_wake_s)).await {
            Ok(Ok(())) => debug!("wake timer armed for {} s", next_wake_s),
            Ok(Err(err)) => error!("arming wake timer failed: {:?}", err),
            Err(_) => error!("arming wake timer timed out"),
        }
        self.hw.wake.set_button_wake(true);
        cx.advance(Event::WakeArmed);

        self.hw.indicator.set_warning(false);
        self.hw.indicator.set_busy(false);

        let freshness = cx
            .shown
            .as_ref()
            .map_or(Freshness::Fallback, DataSnapshot::freshness);
        let elapsed_ms = started.elapsed().as_millis();
        info!(
            "cycle done in {} ms: {:?}, battery {:?}, failures {}, next wake in {} s",
            elapsed_ms, freshness, cx.battery.state, cx.failures, next_wake_s
        );

        CycleReport {
            wake,
            battery: cx.battery,
            room_temperature: cx.room_temperature,
            freshness,
            consecutive_failures: cx.failures,
            next_wake_s,
            refresh: cx.refresh,
            fetch_error: cx.fetch_error,
            display_error: cx.display_error,
            persisted: cx.persisted,
            radio_used: cx.radio_used,
            preempted,
            final_state: cx.state,
            elapsed_ms,
        }
    }

    /// Booted through Persisting
    async fn steps(hw: &mut Peripherals<R, P, S, B, W, I, T>, cx: &mut Cycle) {
        // Booted
        let storage_timeout = cx.config.timeouts.storage();
        match PersistentCache::new(&mut hw.storage, storage_timeout).load().await {
            Ok(Some(record)) => cx.adopt(record),
            Ok(None) => info!("no cache record, first run"),
            Err(StorageError::CorruptRecord) => warn!("cache record corrupt, treating as absent"),
            Err(err) => warn!("cache unavailable: {:?}", err),
        }
        let timeouts = cx.config.timeouts;

        cx.battery = BatteryMonitor::new(&mut hw.power, cx.config.battery, timeouts.sensor())
            .read_level()
            .await;
        cx.room_temperature = match with_timeout(timeouts.sensor(), hw.thermometer.read_decicelsius()).await {
            Ok(Ok(decicelsius)) => Some(decicelsius),
            Ok(Err(err)) => {
                debug!("no room temperature: {:?}", err);
                None
            }
            Err(_) => {
                warn!("thermometer timed out");
                None
            }
        };
        cx.advance(Event::BootComplete(cx.battery.state));

        // Classifying
        cx.advance(Event::PowerBudgetChecked);

        // Fetching
        if cx.state.radio_allowed() {
            Self::store_failure_marker(&mut hw.storage, cx).await;
            cx.radio_used = true;
            let mut client = FetchClient::new(&mut hw.radio, cx.now);
            if cx.battery.state == BatteryState::Low {
                client = client.with_max_attempts(1);
            }
            match client.fetch(&cx.config, timeouts.fetch_deadline()).await {
                Ok(snapshot) => {
                    cx.failures = 0;
                    cx.last_success = Some(cx.now.unwrap_or(snapshot.fetched_at()));
                    cx.cached = Some(snapshot.clone());
                    cx.shown = Some(snapshot);
                    cx.advance(Event::FetchSucceeded);
                }
                Err(err) => {
                    cx.failures = cx.failures.saturating_add(1);
                    cx.fetch_error = Some(err);
                    cx.advance(Event::FetchFailed);
                }
            }
        } else {
            info!("battery critical, radio stays off");
        }

        // UsingCache
        if cx.state == State::UsingCache {
            let snapshot = cx.fallback_snapshot();
            info!("showing {:?} data", snapshot.freshness());
            cx.shown = Some(snapshot);
            cx.degraded = true;
            cx.advance(Event::SnapshotSelected);
        }
        if cx.degraded {
            hw.indicator.set_warning(true);
        }

        // Rendering
        let snapshot = cx.shown.clone().unwrap_or_else(DataSnapshot::placeholder);
        let frame = Renderer::new(&cx.config.display, &cx.config.refresh, cx.battery, hw.panel.size())
            .with_room_temperature(cx.room_temperature)
            .render(&snapshot, snapshot.freshness());
        let mode = choose_refresh(cx.wake, cx.partial_updates, &cx.config.display);

        cx.panel_active = true;
        let mut display = Display::new(&mut hw.panel, mode, timeouts.panel());
        match display.commit(&frame, cx.frame.as_ref()).await {
            Ok(mode) => {
                match mode {
                    RefreshMode::Full => cx.partial_updates = 0,
                    RefreshMode::Partial => cx.partial_updates = cx.partial_updates.saturating_add(1),
                    RefreshMode::Unchanged => {}
                }
                cx.frame = Some(frame.signature());
                cx.refresh = Some(mode);
            }
            Err(err) => {
                // Panel content unknown; force a full refresh next time
                cx.partial_updates = cx.config.display.full_refresh_every;
                cx.frame = None;
                cx.display_error = Some(err);
            }
        }
        if let Err(err) = display.sleep().await {
            warn!("panel sleep failed: {:?}", err);
        }
        cx.panel_active = false;
        cx.advance(Event::FrameCommitted);

        // Persisting
        let record = cx.to_record();
        match PersistentCache::new(&mut hw.storage, timeouts.storage()).store(&record).await {
            Ok(()) => cx.persisted = true,
            Err(err) => warn!("record not persisted: {:?}", err),
        }
        cx.advance(Event::StateStored);
    }

    /// Store the record as if this fetch had already failed
    ///
    /// The panel signature is dropped since a preempted cycle may leave the
    /// panel showing a frame that never reaches the record.
    async fn store_failure_marker(storage: &mut S, cx: &Cycle) {
        let mut record = cx.to_record();
        record.consecutive_failures = cx.failures.saturating_add(1);
        record.frame = None;
        match PersistentCache::new(storage, cx.config.timeouts.storage()).store(&record).await {
            Ok(()) => debug!("failure marker stored"),
            Err(err) => warn!("failure marker not stored: {:?}", err),
        }
    }

    /// Release everything a preempted step may still hold
    async fn release(&mut self, cx: &Cycle) {
        let timeout = cx.config.timeouts.arm();
        if cx.radio_used && with_timeout(timeout, self.hw.radio.power_off()).await.is_err() {
            warn!("radio power-off timed out");
        }
        if with_timeout(timeout, self.hw.storage.unmount()).await.is_err() {
            warn!("storage unmount timed out");
        }
        if cx.panel_active && with_timeout(timeout, self.hw.panel.sleep()).await.is_err() {
            warn!("panel sleep timed out");
        }
    }
}
