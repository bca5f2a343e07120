//! Persistent cache
//!
//! Holds the single record that survives deep sleep: the last-known-good
//! snapshot, the configuration, and the failure and refresh counters.

pub mod record;
pub mod store;

pub use record::{CacheRecord, RecordError, RECORD_MAGIC, RECORD_VERSION};
pub use store::{PersistentCache, StorageError, RECORD_FILE, TEMP_FILE};
