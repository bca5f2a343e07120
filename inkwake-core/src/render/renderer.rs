//! Frame composition
//!
//! Turns a snapshot into a [`DisplayFrame`]. Rendering is pure: the same
//! snapshot, freshness and readings always produce the same pixels.
//!
//! Each frame carries a [`FrameSignature`], one checksum per layout
//! region. Comparing it with the signature of the frame already on the
//! panel yields the region a partial refresh has to upload.

use core::fmt::Write as _;

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle},
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use heapless::String;
use inkwake_hal::Region;
use profont::{PROFONT_12_POINT, PROFONT_14_POINT, PROFONT_24_POINT};
use serde::{Deserialize, Serialize};

use super::framebuffer::FrameBuffer;
use super::layout::{Layout, REGION_COUNT};
use crate::battery::{BatteryReading, BatteryState};
use crate::config::{DisplayConfig, RefreshConfig};
use crate::data::{DataSnapshot, Field, FieldValue, Freshness};

const SMALL_FONT: &MonoFont = &PROFONT_12_POINT;
const MEDIUM_FONT: &MonoFont = &PROFONT_14_POINT;
const LARGE_FONT: &MonoFont = &PROFONT_24_POINT;

const PADDING: i32 = 4;

/// Fields that are shown in the header or not drawn at all
const HIDDEN_FIELDS: &[&str] = &["location", "icon", "observed"];

/// Per-region checksums of a rendered frame, in [`Layout::regions`] order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FrameSignature(pub [u32; REGION_COUNT]);

/// A rendered frame ready for commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayFrame {
    buffer: FrameBuffer,
    /// Layout regions in native coordinates
    regions: [Region; REGION_COUNT],
    signature: FrameSignature,
}

impl DisplayFrame {
    /// Packed pixel data in native panel order
    pub fn as_bytes(&self) -> &[u8] {
        self.buffer.as_bytes()
    }

    pub fn signature(&self) -> FrameSignature {
        self.signature
    }

    /// Native region that differs from the frame with `previous` signature
    ///
    /// Without a previous signature the panel content is unknown and the
    /// whole screen is returned. An empty region means nothing changed.
    pub fn changed_since(&self, previous: Option<&FrameSignature>) -> Region {
        let Some(previous) = previous else {
            return self.buffer.full_region();
        };
        self.regions
            .iter()
            .zip(self.signature.0.iter().zip(previous.0.iter()))
            .filter(|(_, (now, before))| now != before)
            .fold(Region::default(), |changed, (region, _)| changed.union(region))
    }

    /// Number of pixels that differ from `other`
    pub fn diff_count(&self, other: &DisplayFrame) -> usize {
        self.buffer.diff_count(&other.buffer)
    }

    pub fn buffer(&self) -> &FrameBuffer {
        &self.buffer
    }
}

/// Renderer for one cycle
pub struct Renderer<'a> {
    display: &'a DisplayConfig,
    refresh: &'a RefreshConfig,
    battery: BatteryReading,
    room_temperature: Option<i16>,
    panel_size: (u16, u16),
}

impl<'a> Renderer<'a> {
    /// Create a renderer
    ///
    /// # Arguments
    /// * `display` - Orientation and header title
    /// * `refresh` - Source of the UTC offset for clock text
    /// * `battery` - Reading shown in the battery icon
    /// * `panel_size` - Native panel size
    pub fn new(
        display: &'a DisplayConfig,
        refresh: &'a RefreshConfig,
        battery: BatteryReading,
        panel_size: (u16, u16),
    ) -> Self {
        Self {
            display,
            refresh,
            battery,
            room_temperature: None,
            panel_size,
        }
    }

    /// Show an indoor reading in tenths of a degree in the footer
    pub fn with_room_temperature(mut self, decicelsius: Option<i16>) -> Self {
        self.room_temperature = decicelsius;
        self
    }

    /// Compose a frame for `snapshot` shown with the given freshness
    pub fn render(&self, snapshot: &DataSnapshot, freshness: Freshness) -> DisplayFrame {
        let (width, height) = self.panel_size;
        let mut fb = FrameBuffer::new(width, height, self.display.orientation);
        let layout = Layout::for_size(fb.size());

        self.draw_header(&mut fb, &layout, snapshot);
        self.draw_battery(&mut fb, layout.battery);
        self.draw_primary(&mut fb, layout.primary, snapshot);
        self.draw_secondary(&mut fb, layout.secondary, snapshot);
        self.draw_forecast(&mut fb, layout.forecast, snapshot);
        self.draw_marker(&mut fb, layout.marker, snapshot, freshness);

        let regions = layout.regions().map(|area| fb.native_bounds(area));
        let signature = FrameSignature(regions.map(|region| fb.signature(region)));
        DisplayFrame {
            buffer: fb,
            regions,
            signature,
        }
    }

    fn draw_header(&self, fb: &mut FrameBuffer, layout: &Layout, snapshot: &DataSnapshot) {
        let area = layout.header;
        let title = match snapshot.get("location").map(|f| &f.value) {
            Some(FieldValue::Text(name)) => name.as_str(),
            _ => self.display.title.as_str(),
        };
        let style = MonoTextStyle::new(MEDIUM_FONT, BinaryColor::On);
        text(fb, title, area.top_left + Point::new(PADDING, PADDING), style);

        if snapshot.fetched_at() != 0 {
            let clock = self.clock(snapshot.fetched_at());
            let clock_width = (clock.len() as u32 * SMALL_FONT.character_size.width) as i32;
            let x = area.top_left.x + area.size.width as i32 - clock_width - PADDING;
            let style = MonoTextStyle::new(SMALL_FONT, BinaryColor::On);
            text(fb, &clock, Point::new(x, area.top_left.y + PADDING + 2), style);
        }

        let bottom = area.top_left.y + area.size.height as i32 - 1;
        fill(
            fb,
            Rectangle::new(Point::new(0, bottom), Size::new(fb.size().width, 1)),
            BinaryColor::On,
        );
    }

    fn draw_battery(&self, fb: &mut FrameBuffer, area: Rectangle) {
        let body = Rectangle::new(
            area.top_left + Point::new(PADDING, 6),
            Size::new(area.size.width.saturating_sub(PADDING as u32 * 2 + 3), 12),
        );
        let _ = body
            .into_styled(PrimitiveStyle::with_stroke(BinaryColor::On, 1))
            .draw(fb);
        let tip = Rectangle::new(
            Point::new(body.top_left.x + body.size.width as i32, body.top_left.y + 3),
            Size::new(3, 6),
        );
        fill(fb, tip, BinaryColor::On);

        match self.battery.percent {
            Some(percent) => {
                let inner = body.size.width.saturating_sub(4);
                let level = inner * percent.min(100) as u32 / 100;
                let gauge = Rectangle::new(body.top_left + Point::new(2, 2), Size::new(level, 8));
                fill(fb, gauge, BinaryColor::On);
            }
            None => {
                let style = MonoTextStyle::new(SMALL_FONT, BinaryColor::On);
                text(fb, "?", body.top_left + Point::new(body.size.width as i32 / 2 - 3, -2), style);
            }
        }

        if self.battery.state != BatteryState::Normal {
            let style = MonoTextStyle::new(SMALL_FONT, BinaryColor::On);
            text(fb, "!", Point::new(area.top_left.x, area.top_left.y + 4), style);
        }
    }

    fn draw_primary(&self, fb: &mut FrameBuffer, area: Rectangle, snapshot: &DataSnapshot) {
        let mut value: String<24> = String::new();
        match snapshot.primary() {
            Some(field) => format_field_value(&mut value, field, self.refresh),
            None => {
                let _ = value.push_str("--");
            }
        }

        let style = MonoTextStyle::new(LARGE_FONT, BinaryColor::On);
        let y = area.top_left.y + (area.size.height as i32 - LARGE_FONT.character_size.height as i32) / 2;
        text(fb, &value, Point::new(area.top_left.x + PADDING * 2, y), style);
    }

    fn draw_secondary(&self, fb: &mut FrameBuffer, area: Rectangle, snapshot: &DataSnapshot) {
        let primary = snapshot.primary().map(|f| f.name.as_str());
        let style = MonoTextStyle::new(SMALL_FONT, BinaryColor::On);
        let line_height = SMALL_FONT.character_size.height as i32 + 2;
        let max_lines = (area.size.height as i32 / line_height).max(0) as usize;

        let lines = snapshot
            .fields()
            .iter()
            .filter(|f| Some(f.name.as_str()) != primary)
            .filter(|f| !HIDDEN_FIELDS.contains(&f.name.as_str()))
            .take(max_lines);

        for (i, field) in lines.enumerate() {
            let mut line: String<64> = String::new();
            if !matches!(field.value, FieldValue::Text(_)) {
                let _ = write!(line, "{}: ", field.name);
            }
            format_field_value(&mut line, field, self.refresh);
            let y = area.top_left.y + i as i32 * line_height;
            text(fb, &line, Point::new(area.top_left.x + PADDING * 2, y), style);
        }
    }

    fn draw_forecast(&self, fb: &mut FrameBuffer, area: Rectangle, snapshot: &DataSnapshot) {
        let steps = snapshot.forecast();
        if steps.is_empty() {
            return;
        }
        fill(
            fb,
            Rectangle::new(area.top_left, Size::new(1, area.size.height)),
            BinaryColor::On,
        );

        let unit = snapshot.get("temp").map_or("", |f| f.unit.as_str());
        let style = MonoTextStyle::new(SMALL_FONT, BinaryColor::On);
        let line_height = SMALL_FONT.character_size.height as i32 + 2;
        let max_lines = (area.size.height as i32 / line_height).max(0) as usize;
        let with_conditions = max_lines >= steps.len() * 2;

        let mut lines: heapless::Vec<String<24>, { crate::data::MAX_FORECAST * 2 }> = heapless::Vec::new();
        for step in steps {
            let mut line = String::new();
            let _ = write!(line, "{} ", step.time);
            push_tenths(&mut line, step.temp, unit);
            let _ = lines.push(line);
            if with_conditions {
                let _ = lines.push(step.conditions.clone());
            }
        }

        let x = area.top_left.x + PADDING * 2;
        for (i, line) in lines.iter().take(max_lines).enumerate() {
            let y = area.top_left.y + PADDING + i as i32 * line_height;
            text(fb, line, Point::new(x, y), style);
        }
    }

    fn draw_marker(&self, fb: &mut FrameBuffer, area: Rectangle, snapshot: &DataSnapshot, freshness: Freshness) {
        if let Some(room) = self.room_temperature {
            let mut reading: String<16> = String::new();
            let _ = reading.push_str("in ");
            push_tenths(&mut reading, room as i32, "C");
            let width = (reading.len() as u32 * SMALL_FONT.character_size.width) as i32;
            let x = area.top_left.x + area.size.width as i32 - width - PADDING;
            let style = MonoTextStyle::new(SMALL_FONT, BinaryColor::On);
            text(fb, &reading, Point::new(x, area.top_left.y + PADDING), style);
        }

        let mut label: String<32> = String::new();
        match freshness {
            Freshness::Fresh => return,
            Freshness::Stale => {
                let _ = label.push_str("STALE");
                if snapshot.fetched_at() != 0 {
                    let _ = write!(label, " since {}", self.clock(snapshot.fetched_at()));
                }
            }
            Freshness::Fallback => {
                let _ = label.push_str("NO DATA");
            }
        }

        let label_width = label.len() as u32 * SMALL_FONT.character_size.width + PADDING as u32 * 2;
        let badge = Rectangle::new(
            area.top_left + Point::new(PADDING, 2),
            Size::new(label_width, area.size.height.saturating_sub(4)),
        );
        fill(fb, badge, BinaryColor::On);
        let style = MonoTextStyle::new(SMALL_FONT, BinaryColor::Off);
        text(fb, &label, badge.top_left + Point::new(PADDING, 2), style);
    }

    fn clock(&self, unix_s: u64) -> String<8> {
        clock_text(unix_s, self.refresh)
    }
}

fn clock_text(unix_s: u64, refresh: &RefreshConfig) -> String<8> {
    let local = unix_s as i64 + refresh.utc_offset_minutes as i64 * 60;
    let minutes_of_day = local.rem_euclid(86_400) / 60;
    let mut out = String::new();
    let _ = write!(out, "{:02}:{:02}", minutes_of_day / 60, minutes_of_day % 60);
    out
}

/// Append a field's value and unit
fn format_field_value<const N: usize>(out: &mut String<N>, field: &Field, refresh: &RefreshConfig) {
    match &field.value {
        FieldValue::Numeric(x10) => push_tenths(out, *x10, &field.unit),
        FieldValue::Text(s) => {
            let _ = out.push_str(s);
        }
        FieldValue::Timestamp(t) => {
            let _ = out.push_str(&clock_text(*t, refresh));
        }
    }
}

/// Append a fixed-point tenths value with its unit
fn push_tenths<const N: usize>(out: &mut String<N>, x10: i32, unit: &str) {
    let sign = if x10 < 0 { "-" } else { "" };
    let abs = x10.unsigned_abs();
    let _ = write!(out, "{}{}.{}{}", sign, abs / 10, abs % 10, unit);
}

fn fill(fb: &mut FrameBuffer, area: Rectangle, color: BinaryColor) {
    let _ = area.into_styled(PrimitiveStyle::with_fill(color)).draw(fb);
}

fn text(fb: &mut FrameBuffer, s: &str, at: Point, style: MonoTextStyle<'_, BinaryColor>) {
    let _ = Text::with_baseline(s, at, style, Baseline::Top).draw(fb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Orientation;
    use crate::data::ForecastEntry;

    const PANEL: (u16, u16) = (296, 128);

    fn battery(percent: u8) -> BatteryReading {
        BatteryReading {
            state: BatteryState::Normal,
            percent: Some(percent),
        }
    }

    fn snapshot() -> DataSnapshot {
        snapshot_with_temp(-35)
    }

    fn snapshot_with_temp(x10: i32) -> DataSnapshot {
        DataSnapshot::new(45_000)
            .with("temp", FieldValue::Numeric(x10), "C")
            .unwrap()
            .with("humidity", FieldValue::Numeric(810), "%")
            .unwrap()
            .with("conditions", FieldValue::Text(String::try_from("mist").unwrap()), "")
            .unwrap()
    }

    fn render(display: &DisplayConfig, snapshot: &DataSnapshot, freshness: Freshness) -> DisplayFrame {
        let refresh = RefreshConfig::default();
        Renderer::new(display, &refresh, battery(80), PANEL).render(snapshot, freshness)
    }

    #[test]
    fn test_render_is_deterministic() {
        let display = DisplayConfig::default();
        let a = render(&display, &snapshot(), Freshness::Fresh);
        let b = render(&display, &snapshot(), Freshness::Fresh);
        assert_eq!(a, b);
        assert!(a.as_bytes().iter().any(|&b| b != 0));
    }

    #[test]
    fn test_degraded_renders_differ_from_fresh() {
        let display = DisplayConfig::default();
        let data = snapshot();
        let fresh = render(&display, &data, Freshness::Fresh);
        let stale = render(&display, &data.clone().into_stale(), Freshness::Stale);
        let fallback = render(&display, &data, Freshness::Fallback);

        assert!(fresh.diff_count(&stale) > 0);
        assert!(fresh.diff_count(&fallback) > 0);
        assert!(stale.diff_count(&fallback) > 0);
    }

    #[test]
    fn test_placeholder_renders() {
        let display = DisplayConfig::default();
        let frame = render(&display, &DataSnapshot::placeholder(), Freshness::Fallback);
        assert!(frame.as_bytes().iter().any(|&b| b != 0));
    }

    #[test]
    fn test_unknown_panel_content_changes_everything() {
        let display = DisplayConfig::default();
        let frame = render(&display, &snapshot(), Freshness::Fresh);
        assert_eq!(frame.changed_since(None), Region::new(0, 0, PANEL.0, PANEL.1));
    }

    #[test]
    fn test_identical_frame_changes_nothing() {
        let display = DisplayConfig::default();
        let before = render(&display, &snapshot(), Freshness::Fresh);
        let after = render(&display, &snapshot(), Freshness::Fresh);
        assert!(after.changed_since(Some(&before.signature())).is_empty());
    }

    #[test]
    fn test_changed_value_touches_its_region_only() {
        let display = DisplayConfig::default();
        let before = render(&display, &snapshot(), Freshness::Fresh);
        let after = render(&display, &snapshot_with_temp(215), Freshness::Fresh);

        let layout = Layout::for_size(Size::new(PANEL.0 as u32, PANEL.1 as u32));
        let primary = after.buffer().native_bounds(layout.primary);
        assert_eq!(after.changed_since(Some(&before.signature())), primary);
        assert!(primary.width < PANEL.0);
    }

    #[test]
    fn test_room_temperature_is_drawn_in_footer() {
        let display = DisplayConfig::default();
        let refresh = RefreshConfig::default();
        let plain = Renderer::new(&display, &refresh, battery(80), PANEL).render(&snapshot(), Freshness::Fresh);
        let room = Renderer::new(&display, &refresh, battery(80), PANEL)
            .with_room_temperature(Some(215))
            .render(&snapshot(), Freshness::Fresh);

        let layout = Layout::for_size(Size::new(PANEL.0 as u32, PANEL.1 as u32));
        let marker = room.buffer().native_bounds(layout.marker);
        assert_eq!(room.changed_since(Some(&plain.signature())), marker);
    }

    #[test]
    fn test_forecast_is_drawn_in_its_column() {
        let display = DisplayConfig::default();
        let step = ForecastEntry {
            date: String::try_from("2024-03-01").unwrap(),
            time: String::try_from("15:00").unwrap(),
            temp: 110,
            conditions: String::try_from("rain").unwrap(),
        };
        let mut steps = heapless::Vec::new();
        steps.push(step).unwrap();

        let plain = render(&display, &snapshot(), Freshness::Fresh);
        let with_forecast = render(&display, &snapshot().with_forecast(steps), Freshness::Fresh);

        let layout = Layout::for_size(Size::new(PANEL.0 as u32, PANEL.1 as u32));
        let column = with_forecast.buffer().native_bounds(layout.forecast);
        assert_eq!(with_forecast.changed_since(Some(&plain.signature())), column);
    }

    #[test]
    fn test_orientation_changes_pixels_not_size() {
        let landscape = DisplayConfig::default();
        let portrait = DisplayConfig {
            orientation: Orientation::Portrait,
            ..DisplayConfig::default()
        };
        let a = render(&landscape, &snapshot(), Freshness::Fresh);
        let b = render(&portrait, &snapshot(), Freshness::Fresh);
        assert_eq!(a.as_bytes().len(), b.as_bytes().len());
        assert_ne!(a, b);
    }

    #[test]
    fn test_field_formatting() {
        let refresh = RefreshConfig::default();
        let mut out: String<24> = String::new();
        let field = snapshot().get("temp").unwrap().clone();
        format_field_value(&mut out, &field, &refresh);
        assert_eq!(out, "-3.5C");
    }

    #[test]
    fn test_clock_text_applies_offset() {
        let refresh = RefreshConfig {
            utc_offset_minutes: 90,
            ..RefreshConfig::default()
        };
        assert_eq!(clock_text(45_000, &refresh), "14:00");
    }
}
