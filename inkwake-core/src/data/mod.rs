//! Data snapshots
//!
//! Typed snapshots of remote data and the mapping from the remote schema:
//! current conditions plus an optional short forecast.

pub mod snapshot;
pub mod weather;

pub use snapshot::{DataSnapshot, Field, FieldValue, ForecastEntry, Freshness, SnapshotError, MAX_FIELDS, MAX_FORECAST};
pub use weather::{parse_current, parse_forecast, SchemaError};
