//! OpenWeather schema mapping
//!
//! Only the fields the dashboard shows are declared; everything else in
//! the response is ignored.
//!
//! - Current weather: `main.temp`, `main.humidity` and at least one entry
//!   in `weather[]` are required.
//! - Forecast: each `list[]` step needs `main.temp` and `dt_txt`
//!   (`YYYY-MM-DD HH:MM:SS`).

use alloc::string::String as AllocString;
use alloc::vec::Vec as AllocVec;

use heapless::{String, Vec};
use serde::Deserialize;

use super::snapshot::{DataSnapshot, FieldValue, ForecastEntry, SnapshotError, MAX_FORECAST};
use crate::config::Units;

#[derive(Debug, Deserialize)]
struct CurrentWeather {
    #[serde(default)]
    name: Option<AllocString>,
    main: Main,
    weather: AllocVec<Condition>,
    #[serde(default)]
    wind: Option<Wind>,
    #[serde(default)]
    dt: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Main {
    temp: f32,
    #[serde(default)]
    feels_like: Option<f32>,
    humidity: f32,
}

#[derive(Debug, Deserialize)]
struct Condition {
    description: AllocString,
    #[serde(default)]
    icon: Option<AllocString>,
}

#[derive(Debug, Deserialize)]
struct Wind {
    speed: f32,
}

#[derive(Debug, Deserialize)]
struct Forecast {
    list: AllocVec<ForecastStep>,
}

#[derive(Debug, Deserialize)]
struct ForecastStep {
    main: StepMain,
    #[serde(default)]
    weather: AllocVec<Condition>,
    dt_txt: AllocString,
}

#[derive(Debug, Deserialize)]
struct StepMain {
    temp: f32,
}

/// Schema mapping failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SchemaError {
    /// Not JSON, or a required field is missing or mistyped
    InvalidJson,
    /// `weather[]` is empty
    NoConditions,
    /// Forecast step time is not `YYYY-MM-DD HH:MM:SS`
    InvalidStepTime,
    /// Mapped data does not fit a snapshot
    Snapshot(SnapshotError),
}

impl From<SnapshotError> for SchemaError {
    fn from(err: SnapshotError) -> Self {
        SchemaError::Snapshot(err)
    }
}

/// Parse a current-weather response body into a snapshot
///
/// # Arguments
/// * `body` - JSON response body
/// * `units` - Unit system the request asked for
/// * `now` - Device wall-clock time; falls back to the observation time
pub fn parse_current(body: &[u8], units: Units, now: Option<u64>) -> Result<DataSnapshot, SchemaError> {
    let wire: CurrentWeather = serde_json::from_slice(body).map_err(|_| SchemaError::InvalidJson)?;
    let condition = wire.weather.first().ok_or(SchemaError::NoConditions)?;

    let fetched_at = now.or(wire.dt).unwrap_or(0);
    let mut snapshot = DataSnapshot::new(fetched_at);

    if let Some(name) = wire.name.as_deref().filter(|n| !n.is_empty()) {
        snapshot.push("location", FieldValue::Text(truncate(name)), "")?;
    }
    snapshot.push("temp", FieldValue::Numeric(tenths(wire.main.temp)), units.temperature_suffix())?;
    if let Some(feels_like) = wire.main.feels_like {
        snapshot.push("feels_like", FieldValue::Numeric(tenths(feels_like)), units.temperature_suffix())?;
    }
    snapshot.push("humidity", FieldValue::Numeric(tenths(wire.main.humidity)), "%")?;
    snapshot.push("conditions", FieldValue::Text(truncate(&condition.description)), "")?;
    if let Some(icon) = condition.icon.as_deref() {
        snapshot.push("icon", FieldValue::Text(truncate(icon)), "")?;
    }
    if let Some(wind) = &wire.wind {
        snapshot.push("wind", FieldValue::Numeric(tenths(wind.speed)), units.speed_suffix())?;
    }
    if let Some(dt) = wire.dt {
        snapshot.push("observed", FieldValue::Timestamp(dt), "")?;
    }

    Ok(snapshot)
}

/// Parse a forecast response body into at most `limit` steps
///
/// # Arguments
/// * `body` - JSON response body
/// * `limit` - Steps to keep, capped at [`MAX_FORECAST`]
pub fn parse_forecast(body: &[u8], limit: usize) -> Result<Vec<ForecastEntry, MAX_FORECAST>, SchemaError> {
    let wire: Forecast = serde_json::from_slice(body).map_err(|_| SchemaError::InvalidJson)?;
    let mut steps = Vec::new();

    for step in wire.list.iter().take(limit.min(MAX_FORECAST)) {
        let (date, time) = step.dt_txt.split_once(' ').ok_or(SchemaError::InvalidStepTime)?;
        let time = time.get(..5).ok_or(SchemaError::InvalidStepTime)?;
        if date.len() != 10 {
            return Err(SchemaError::InvalidStepTime);
        }
        let entry = ForecastEntry {
            date: truncate(date),
            time: truncate(time),
            temp: tenths(step.main.temp),
            conditions: step
                .weather
                .first()
                .map(|c| truncate(&c.description))
                .unwrap_or_default(),
        };
        // Bounded by take() above
        let _ = steps.push(entry);
    }

    Ok(steps)
}

/// Round to fixed-point tenths
fn tenths(value: f32) -> i32 {
    let scaled = value * 10.0;
    if scaled >= 0.0 {
        (scaled + 0.5) as i32
    } else {
        (scaled - 0.5) as i32
    }
}

/// Copy as much of `s` as fits, cutting on a character boundary
pub(crate) fn truncate<const N: usize>(s: &str) -> String<N> {
    let mut out = String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Freshness;

    const BERLIN: &str = r#"{
        "coord": {"lon": 13.41, "lat": 52.52},
        "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
        "main": {"temp": 21.46, "feels_like": 21.2, "temp_min": 20.0, "humidity": 64, "pressure": 1012},
        "wind": {"speed": 3.6, "deg": 240},
        "dt": 1700000000,
        "name": "Berlin",
        "cod": 200
    }"#;

    #[test]
    fn test_parse_full_response() {
        let snapshot = parse_current(BERLIN.as_bytes(), Units::Metric, Some(1700000100)).unwrap();

        assert_eq!(snapshot.freshness(), Freshness::Fresh);
        assert_eq!(snapshot.fetched_at(), 1700000100);
        assert_eq!(snapshot.get("temp").unwrap().value, FieldValue::Numeric(215));
        assert_eq!(snapshot.get("temp").unwrap().unit, "C");
        assert_eq!(snapshot.get("feels_like").unwrap().value, FieldValue::Numeric(212));
        assert_eq!(snapshot.get("humidity").unwrap().value, FieldValue::Numeric(640));
        assert_eq!(snapshot.get("wind").unwrap().value, FieldValue::Numeric(36));
        assert_eq!(
            snapshot.get("conditions").unwrap().value,
            FieldValue::Text(String::try_from("light rain").unwrap())
        );
        assert_eq!(snapshot.get("observed").unwrap().value, FieldValue::Timestamp(1700000000));
        assert_eq!(snapshot.primary().unwrap().name, "temp");
    }

    #[test]
    fn test_minimal_response() {
        let body = br#"{"main":{"temp":-3.25,"humidity":80},"weather":[{"description":"snow"}]}"#;
        let snapshot = parse_current(body, Units::Imperial, None).unwrap();
        assert_eq!(snapshot.fetched_at(), 0);
        assert_eq!(snapshot.get("temp").unwrap().value, FieldValue::Numeric(-33));
        assert_eq!(snapshot.get("temp").unwrap().unit, "F");
        assert!(snapshot.get("location").is_none());
        assert!(snapshot.get("wind").is_none());
    }

    #[test]
    fn test_missing_humidity_is_rejected() {
        let body = br#"{"main":{"temp":1.0},"weather":[{"description":"x"}]}"#;
        assert_eq!(parse_current(body, Units::Metric, None), Err(SchemaError::InvalidJson));
    }

    #[test]
    fn test_empty_conditions_rejected() {
        let body = br#"{"main":{"temp":1.0,"humidity":5},"weather":[]}"#;
        assert_eq!(parse_current(body, Units::Metric, None), Err(SchemaError::NoConditions));
    }

    #[test]
    fn test_not_json() {
        assert_eq!(
            parse_current(b"<html>502</html>", Units::Metric, None),
            Err(SchemaError::InvalidJson)
        );
    }

    const FORECAST: &str = r#"{
        "cod": "200",
        "cnt": 3,
        "list": [
            {"dt": 1700010000, "main": {"temp": 4.46, "humidity": 90}, "weather": [{"description": "overcast clouds", "icon": "04n"}], "wind": {"speed": 2.1, "gust": 4.0, "deg": 200}, "dt_txt": "2023-11-15 03:00:00"},
            {"dt": 1700020800, "main": {"temp": 3.9}, "weather": [{"description": "light rain"}], "dt_txt": "2023-11-15 06:00:00"},
            {"dt": 1700031600, "main": {"temp": -0.51}, "weather": [], "dt_txt": "2023-11-15 09:00:00"}
        ]
    }"#;

    #[test]
    fn test_parse_forecast_steps() {
        let steps = parse_forecast(FORECAST.as_bytes(), 3).unwrap();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0].date, "2023-11-15");
        assert_eq!(steps[0].time, "03:00");
        assert_eq!(steps[0].temp, 45);
        assert_eq!(steps[0].conditions, "overcast clouds");
        assert_eq!(steps[2].temp, -5);
        assert!(steps[2].conditions.is_empty());
    }

    #[test]
    fn test_forecast_limit_is_applied() {
        assert_eq!(parse_forecast(FORECAST.as_bytes(), 1).unwrap().len(), 1);
        assert!(parse_forecast(FORECAST.as_bytes(), 0).unwrap().is_empty());
        assert_eq!(parse_forecast(FORECAST.as_bytes(), 10).unwrap().len(), MAX_FORECAST);
    }

    #[test]
    fn test_forecast_step_time_is_checked() {
        let body = br#"{"list":[{"main":{"temp":1.0},"dt_txt":"soon"}]}"#;
        assert_eq!(parse_forecast(body, 3), Err(SchemaError::InvalidStepTime));
        assert_eq!(parse_forecast(BERLIN.as_bytes(), 3), Err(SchemaError::InvalidJson));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let s: String<5> = truncate("abcdé");
        assert_eq!(s, "abcd");
    }
}
