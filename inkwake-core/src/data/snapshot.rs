//! Data snapshot types
//!
//! A snapshot is an immutable set of named fields captured at one point in
//! time. Snapshots are never edited after creation: a cached snapshot
//! shown again is a new value with a different freshness.

use heapless::{String, Vec};
use serde::{Deserialize, Serialize};

/// Maximum fields per snapshot
pub const MAX_FIELDS: usize = 10;

/// Maximum field name length
pub const MAX_NAME_LEN: usize = 16;

/// Maximum text value length
pub const MAX_TEXT_LEN: usize = 48;

/// Maximum unit suffix length
pub const MAX_UNIT_LEN: usize = 4;

/// Maximum forecast steps per snapshot
pub const MAX_FORECAST: usize = 3;

/// How current the displayed data is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Freshness {
    /// Fetched during this cycle
    Fresh,
    /// Last-known-good data from the cache
    Stale,
    /// Nothing available; placeholder content
    Fallback,
}

/// Typed field value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FieldValue {
    /// Fixed-point number in tenths (215 = 21.5)
    Numeric(i32),
    Text(String<MAX_TEXT_LEN>),
    /// Seconds since the Unix epoch
    Timestamp(u64),
}

/// One named value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Field {
    pub name: String<MAX_NAME_LEN>,
    pub value: FieldValue,
    pub unit: String<MAX_UNIT_LEN>,
}

/// One forecast step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ForecastEntry {
    /// Date as sent by the endpoint, `YYYY-MM-DD`
    pub date: String<10>,
    /// Time of day, `HH:MM`
    pub time: String<5>,
    /// Temperature in tenths, in the unit of the `temp` field
    pub temp: i32,
    pub conditions: String<24>,
}

/// Errors building a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SnapshotError {
    /// More than [`MAX_FIELDS`] fields
    TooManyFields,
    /// Name or unit longer than allowed
    NameTooLong,
}

/// A set of fields plus when they were fetched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataSnapshot {
    fields: Vec<Field, MAX_FIELDS>,
    forecast: Vec<ForecastEntry, MAX_FORECAST>,
    fetched_at: u64,
    freshness: Freshness,
}

impl DataSnapshot {
    /// Create an empty fresh snapshot
    pub fn new(fetched_at: u64) -> Self {
        Self {
            fields: Vec::new(),
            forecast: Vec::new(),
            fetched_at,
            freshness: Freshness::Fresh,
        }
    }

    /// Placeholder shown when neither fresh nor cached data exists
    pub fn placeholder() -> Self {
        Self {
            fields: Vec::new(),
            forecast: Vec::new(),
            fetched_at: 0,
            freshness: Freshness::Fallback,
        }
    }

    /// Append a field
    ///
    /// # Arguments
    /// * `name` - Field name
    /// * `value` - Field value
    /// * `unit` - Unit suffix, empty for none
    pub fn push(&mut self, name: &str, value: FieldValue, unit: &str) -> Result<(), SnapshotError> {
        let field = Field {
            name: String::try_from(name).map_err(|_| SnapshotError::NameTooLong)?,
            value,
            unit: String::try_from(unit).map_err(|_| SnapshotError::NameTooLong)?,
        };
        self.fields
            .push(field)
            .map_err(|_| SnapshotError::TooManyFields)
    }

    /// Builder-style [`DataSnapshot::push`]
    pub fn with(mut self, name: &str, value: FieldValue, unit: &str) -> Result<Self, SnapshotError> {
        self.push(name, value, unit)?;
        Ok(self)
    }

    /// Attach forecast steps, replacing any already present
    pub fn with_forecast(mut self, forecast: Vec<ForecastEntry, MAX_FORECAST>) -> Self {
        self.forecast = forecast;
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Upcoming forecast steps, earliest first
    pub fn forecast(&self) -> &[ForecastEntry] {
        &self.forecast
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// First numeric field, used as the primary value
    pub fn primary(&self) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| matches!(f.value, FieldValue::Numeric(_)))
    }

    pub fn fetched_at(&self) -> u64 {
        self.fetched_at
    }

    pub fn freshness(&self) -> Freshness {
        self.freshness
    }

    /// The same data marked as last-known-good
    pub fn into_stale(self) -> Self {
        Self {
            freshness: Freshness::Stale,
            ..self
        }
    }
}
