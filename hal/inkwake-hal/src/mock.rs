//! Scriptable in-memory implementations of every capability
//!
//! Used by host tests to drive the duty-cycle engine without hardware.
//! Each mock records what it was asked to do so tests can assert on it
//! after the cycle has finished.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use embedded_io::ErrorType;
use embedded_io_async::{Read, Write};

use crate::indicator::StatusIndicator;
use crate::panel::{PanelDevice, PanelError, Region};
use crate::power::{PowerSensor, SensorError};
use crate::temperature::TemperatureSensor;
use crate::radio::{RadioError, RadioLink};
use crate::storage::{MediumError, StorageMedium};
use crate::wake::{TimerError, WakeEvent, WakeTimer};

async fn stall() {
    core::future::pending::<()>().await
}

// ============================================================================
// Radio
// ============================================================================

/// Scripted outcome of one connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exchange {
    /// Connect and answer with these raw bytes, then close
    Respond(Vec<u8>),
    /// Access point refuses association
    AssociationFails,
    /// TCP connect is refused
    ConnectFails,
    /// Association never completes
    HangOnAssociate,
    /// Request is sent but no response ever arrives
    HangOnRead,
}

impl Exchange {
    /// Build an HTTP/1.0 response with a JSON body
    pub fn http(status: u16, body: &str) -> Self {
        Self::http_with_headers(status, &[], body)
    }

    /// Build an HTTP/1.0 response with extra header lines
    pub fn http_with_headers(status: u16, headers: &[(&str, &str)], body: &str) -> Self {
        let mut head = alloc::format!("HTTP/1.0 {} X\r\nContent-Type: application/json\r\n", status);
        for (name, value) in headers {
            head.push_str(&alloc::format!("{}: {}\r\n", name, value));
        }
        head.push_str(&alloc::format!("Content-Length: {}\r\n\r\n", body.len()));
        let mut bytes = head.into_bytes();
        bytes.extend_from_slice(body.as_bytes());
        Exchange::Respond(bytes)
    }

    fn fails_association(&self) -> bool {
        matches!(self, Exchange::AssociationFails | Exchange::HangOnAssociate)
    }
}

/// Radio that plays back one [`Exchange`] per connection
///
/// Association consumes the next entry only when it scripts an
/// association failure; otherwise the entry is left for `connect`.
#[derive(Debug, Default)]
pub struct MockRadio {
    script: VecDeque<Exchange>,
    current: Option<Exchange>,
    cursor: usize,
    /// Bytes served per `read` call
    pub chunk: usize,
    /// Fail `power_on` with [`RadioError::Unavailable`]
    pub unavailable: bool,
    /// Radio is currently powered
    pub powered: bool,
    pub power_on_count: usize,
    pub power_off_count: usize,
    pub associate_count: usize,
    pub disconnect_count: usize,
    /// `disconnect` never returns
    pub stall_disconnect: bool,
    /// Raw requests written, one entry per connection
    pub requests: Vec<Vec<u8>>,
}

impl MockRadio {
    /// Create a radio that plays back `script` in order
    ///
    /// Once the script is exhausted every further association fails.
    pub fn new(script: impl IntoIterator<Item = Exchange>) -> Self {
        Self {
            script: script.into_iter().collect(),
            chunk: 64,
            ..Self::default()
        }
    }

    /// Radio that never comes up
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            chunk: 64,
            ..Self::default()
        }
    }

    /// Check if the radio was ever switched on
    pub fn was_used(&self) -> bool {
        self.power_on_count > 0
    }

    /// Requests written so far, as text
    pub fn request_lines(&self) -> Vec<String> {
        self.requests
            .iter()
            .map(|r| {
                let text = String::from_utf8_lossy(r);
                text.lines().next().unwrap_or_default().to_string()
            })
            .collect()
    }

    /// Entries not yet played back
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

impl ErrorType for MockRadio {
    type Error = RadioError;
}

impl Read for MockRadio {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, RadioError> {
        match &self.current {
            Some(Exchange::Respond(bytes)) => {
                let remaining = &bytes[self.cursor.min(bytes.len())..];
                let n = remaining.len().min(buf.len()).min(self.chunk.max(1));
                buf[..n].copy_from_slice(&remaining[..n]);
                self.cursor += n;
                Ok(n)
            }
            Some(Exchange::HangOnRead) => {
                stall().await;
                Ok(0)
            }
            _ => Err(RadioError::Io),
        }
    }
}

impl Write for MockRadio {
    async fn write(&mut self, data: &[u8]) -> Result<usize, RadioError> {
        if self.current.is_none() {
            return Err(RadioError::Io);
        }
        let request = self.requests.last_mut().ok_or(RadioError::Io)?;
        request.extend_from_slice(data);
        Ok(data.len())
    }

    async fn flush(&mut self) -> Result<(), RadioError> {
        Ok(())
    }
}

impl RadioLink for MockRadio {
    async fn power_on(&mut self) -> Result<(), RadioError> {
        self.power_on_count += 1;
        if self.unavailable {
            return Err(RadioError::Unavailable);
        }
        self.powered = true;
        Ok(())
    }

    async fn associate(&mut self, _ssid: &str, _passphrase: &str) -> Result<(), RadioError> {
        self.associate_count += 1;
        let fails = self.script.front().map_or(true, Exchange::fails_association);
        if !fails {
            return Ok(());
        }
        match self.script.pop_front() {
            Some(Exchange::HangOnAssociate) => {
                stall().await;
                Err(RadioError::AssociationFailed)
            }
            _ => Err(RadioError::AssociationFailed),
        }
    }

    async fn connect(&mut self, _host: &str, _port: u16) -> Result<(), RadioError> {
        match self.script.pop_front() {
            Some(Exchange::ConnectFails) | None => Err(RadioError::ConnectFailed),
            Some(exchange) => {
                self.current = Some(exchange);
                self.cursor = 0;
                self.requests.push(Vec::new());
                Ok(())
            }
        }
    }

    async fn disconnect(&mut self) {
        self.disconnect_count += 1;
        self.current = None;
        if self.stall_disconnect {
            stall().await;
        }
    }

    async fn power_off(&mut self) {
        self.power_off_count += 1;
        self.powered = false;
        self.current = None;
    }
}

// ============================================================================
// Storage
// ============================================================================

/// In-memory flat-file medium with power-loss injection
#[derive(Debug, Default, Clone)]
pub struct MemoryMedium {
    pub files: BTreeMap<String, Vec<u8>>,
    pub mounted: bool,
    pub mount_count: usize,
    /// Refuse to mount
    pub missing: bool,
    /// Every mutating call fails with [`MediumError::Io`]
    pub read_only: bool,
    /// Every call blocks forever
    pub stalled: bool,
    /// Remaining mutating calls before power is cut
    power_budget: Option<usize>,
    powered_down: bool,
}

impl MemoryMedium {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cut power during the `ops`-th mutating call from now
    ///
    /// The interrupted write leaves a truncated file behind and every later
    /// call fails until [`MemoryMedium::restore_power`].
    pub fn cut_power_after(&mut self, ops: usize) {
        self.power_budget = Some(ops);
    }

    /// Bring the medium back as after a reboot
    pub fn restore_power(&mut self) {
        self.power_budget = None;
        self.powered_down = false;
        self.mounted = false;
    }

    /// Check if power was cut by [`MemoryMedium::cut_power_after`]
    pub fn power_was_cut(&self) -> bool {
        self.powered_down
    }

    fn check_op(&mut self) -> Result<(), MediumError> {
        if self.powered_down {
            return Err(MediumError::Io);
        }
        if !self.mounted {
            return Err(MediumError::NotMounted);
        }
        Ok(())
    }

    /// Spend one unit of the power budget; `true` means power dies now
    fn spend(&mut self) -> bool {
        match self.power_budget {
            Some(0) => {
                self.powered_down = true;
                true
            }
            Some(n) => {
                self.power_budget = Some(n - 1);
                false
            }
            None => false,
        }
    }
}

impl StorageMedium for MemoryMedium {
    async fn mount(&mut self) -> Result<(), MediumError> {
        if self.stalled {
            stall().await;
        }
        if self.missing || self.powered_down {
            return Err(MediumError::NotMounted);
        }
        self.mounted = true;
        self.mount_count += 1;
        Ok(())
    }

    async fn read(&mut self, name: &str, buffer: &mut [u8]) -> Result<usize, MediumError> {
        if self.stalled {
            stall().await;
        }
        self.check_op()?;
        let data = self.files.get(name).ok_or(MediumError::NotFound)?;
        if data.len() > buffer.len() {
            return Err(MediumError::BufferTooSmall);
        }
        buffer[..data.len()].copy_from_slice(data);
        Ok(data.len())
    }

    async fn write(&mut self, name: &str, data: &[u8]) -> Result<(), MediumError> {
        if self.stalled {
            stall().await;
        }
        self.check_op()?;
        if self.read_only {
            return Err(MediumError::Io);
        }
        if self.spend() {
            // Torn write: only the first half reached the medium
            self.files.insert(name.to_string(), data[..data.len() / 2].to_vec());
            return Err(MediumError::Io);
        }
        self.files.insert(name.to_string(), data.to_vec());
        Ok(())
    }

    async fn rename(&mut self, from: &str, to: &str) -> Result<(), MediumError> {
        self.check_op()?;
        if self.read_only {
            return Err(MediumError::Io);
        }
        if self.spend() {
            return Err(MediumError::Io);
        }
        let data = self.files.remove(from).ok_or(MediumError::NotFound)?;
        self.files.insert(to.to_string(), data);
        Ok(())
    }

    async fn remove(&mut self, name: &str) -> Result<(), MediumError> {
        self.check_op()?;
        if self.read_only {
            return Err(MediumError::Io);
        }
        if self.spend() {
            return Err(MediumError::Io);
        }
        self.files.remove(name);
        Ok(())
    }

    async fn unmount(&mut self) {
        self.mounted = false;
    }
}

// ============================================================================
// Panel
// ============================================================================

/// One buffer upload recorded by [`MockPanel`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelWrite {
    /// `None` for a full refresh
    pub region: Option<Region>,
    pub buffer: Vec<u8>,
}

/// Panel that records every upload
#[derive(Debug)]
pub struct MockPanel {
    width: u16,
    height: u16,
    pub writes: Vec<PanelWrite>,
    /// Fail every upload with this error
    pub fail: Option<PanelError>,
    pub asleep: bool,
}

impl MockPanel {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            writes: Vec::new(),
            fail: None,
            asleep: false,
        }
    }

    /// Most recent upload
    pub fn last(&self) -> Option<&PanelWrite> {
        self.writes.last()
    }

    fn check(&mut self, buffer: &[u8]) -> Result<(), PanelError> {
        self.asleep = false;
        if let Some(err) = self.fail {
            return Err(err);
        }
        let expected = (self.width as usize).div_ceil(8) * self.height as usize;
        if buffer.len() != expected {
            return Err(PanelError::Geometry);
        }
        Ok(())
    }
}

impl PanelDevice for MockPanel {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    async fn write_full(&mut self, buffer: &[u8]) -> Result<(), PanelError> {
        self.check(buffer)?;
        self.writes.push(PanelWrite {
            region: None,
            buffer: buffer.to_vec(),
        });
        Ok(())
    }

    async fn write_partial(&mut self, buffer: &[u8], region: Region) -> Result<(), PanelError> {
        self.check(buffer)?;
        self.writes.push(PanelWrite {
            region: Some(region),
            buffer: buffer.to_vec(),
        });
        Ok(())
    }

    async fn sleep(&mut self) -> Result<(), PanelError> {
        self.asleep = true;
        Ok(())
    }
}

// ============================================================================
// Power, wake timer, indicator
// ============================================================================

/// Power sensor returning a fixed reading
#[derive(Debug, Clone, Copy)]
pub struct FixedPower {
    pub reading: Result<u8, SensorError>,
    pub stalled: bool,
}

impl FixedPower {
    pub fn percent(percent: u8) -> Self {
        Self {
            reading: Ok(percent),
            stalled: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            reading: Err(SensorError::ConversionError),
            stalled: false,
        }
    }
}

impl PowerSensor for FixedPower {
    async fn read_percent(&mut self) -> Result<u8, SensorError> {
        if self.stalled {
            stall().await;
        }
        self.reading
    }
}

/// Thermometer returning a fixed reading
#[derive(Debug, Clone, Copy)]
pub struct FixedTemperature {
    pub reading: Result<i16, SensorError>,
}

impl FixedTemperature {
    pub fn decicelsius(value: i16) -> Self {
        Self { reading: Ok(value) }
    }
}

impl TemperatureSensor for FixedTemperature {
    async fn read_decicelsius(&mut self) -> Result<i16, SensorError> {
        self.reading
    }
}

/// Wake timer that records the armed delay instead of sleeping
#[derive(Debug)]
pub struct MockWakeTimer {
    pub cause: WakeEvent,
    pub now: Option<u64>,
    pub armed: Option<u32>,
    pub arm_result: Result<(), TimerError>,
    pub button_wake: bool,
    pub slept: bool,
}

impl MockWakeTimer {
    pub fn new(cause: WakeEvent, now: Option<u64>) -> Self {
        Self {
            cause,
            now,
            armed: None,
            arm_result: Ok(()),
            button_wake: false,
            slept: false,
        }
    }
}

impl WakeTimer for MockWakeTimer {
    fn wake_cause(&mut self) -> WakeEvent {
        self.cause
    }

    fn now_unix(&mut self) -> Option<u64> {
        self.now
    }

    async fn arm(&mut self, delay_s: u32) -> Result<(), TimerError> {
        self.arm_result?;
        self.armed = Some(delay_s);
        Ok(())
    }

    fn set_button_wake(&mut self, enabled: bool) {
        self.button_wake = enabled;
    }

    async fn enter_deep_sleep(&mut self) {
        self.slept = true;
    }
}

/// Indicator that remembers every state change
#[derive(Debug, Default)]
pub struct MockIndicator {
    pub busy: bool,
    pub warning: bool,
    pub warning_was_lit: bool,
}

impl StatusIndicator for MockIndicator {
    fn set_busy(&mut self, on: bool) {
        self.busy = on;
    }

    fn set_warning(&mut self, on: bool) {
        self.warning = on;
        self.warning_was_lit |= on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_radio_plays_script_in_order() {
        let mut radio = MockRadio::new([Exchange::AssociationFails, Exchange::http(200, "{}")]);
        block_on(async {
            radio.power_on().await.unwrap();
            assert_eq!(radio.associate("net", "").await, Err(RadioError::AssociationFailed));
            radio.associate("net", "").await.unwrap();
            radio.connect("host", 80).await.unwrap();
            assert_eq!(radio.remaining(), 0);
            radio.write(b"GET / HTTP/1.0\r\n\r\n").await.unwrap();

            let mut buf = [0u8; 512];
            let mut total = 0;
            loop {
                let n = radio.read(&mut buf[total..]).await.unwrap();
                if n == 0 {
                    break;
                }
                total += n;
            }
            assert!(buf[..total].starts_with(b"HTTP/1.0 200"));
            radio.power_off().await;
        });
        assert_eq!(radio.request_lines(), ["GET / HTTP/1.0"]);
        assert!(!radio.powered);
    }

    #[test]
    fn test_radio_serves_one_exchange_per_connection() {
        let mut radio = MockRadio::new([Exchange::http(200, "a"), Exchange::ConnectFails]);
        block_on(async {
            radio.power_on().await.unwrap();
            radio.associate("net", "").await.unwrap();
            radio.connect("host", 80).await.unwrap();
            radio.disconnect().await;
            assert_eq!(radio.connect("host", 80).await, Err(RadioError::ConnectFailed));
            assert_eq!(radio.write(b"x").await, Err(RadioError::Io));
        });
        assert_eq!(radio.disconnect_count, 1);
        assert_eq!(radio.remaining(), 0);
    }

    #[test]
    fn test_extra_headers_precede_body() {
        let Exchange::Respond(bytes) = Exchange::http_with_headers(200, &[("Set-Cookie", "a=b")], "{}") else {
            panic!("expected a response");
        };
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\r\nSet-Cookie: a=b\r\n"));
        assert!(text.ends_with("Content-Length: 2\r\n\r\n{}"));
    }

    #[test]
    fn test_medium_requires_mount() {
        let mut medium = MemoryMedium::new();
        block_on(async {
            assert_eq!(medium.write("a", b"x").await, Err(MediumError::NotMounted));
            medium.mount().await.unwrap();
            medium.write("a", b"x").await.unwrap();
            let mut buf = [0u8; 4];
            assert_eq!(medium.read("a", &mut buf).await, Ok(1));
        });
    }

    #[test]
    fn test_medium_power_cut_tears_write() {
        let mut medium = MemoryMedium::new();
        medium.cut_power_after(0);
        block_on(async {
            medium.mount().await.unwrap();
            assert_eq!(medium.write("a", b"abcd").await, Err(MediumError::Io));
            assert_eq!(medium.remove("a").await, Err(MediumError::Io));
        });
        assert!(medium.power_was_cut());
        assert_eq!(medium.files.get("a").map(Vec::as_slice), Some(&b"ab"[..]));

        medium.restore_power();
        assert!(!medium.mounted);
    }

    #[test]
    fn test_panel_rejects_wrong_geometry() {
        let mut panel = MockPanel::new(16, 2);
        block_on(async {
            assert_eq!(panel.write_full(&[0u8; 3]).await, Err(PanelError::Geometry));
            panel.write_full(&[0u8; 4]).await.unwrap();
        });
        assert_eq!(panel.writes.len(), 1);
    }
}
