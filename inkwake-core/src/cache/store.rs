//! Crash-safe record storage
//!
//! The record is written to a temporary file and renamed over the
//! canonical one, so a power cut at any point leaves either the previous
//! or the new record readable. The medium is mounted only for the
//! duration of one load or store.

use alloc::vec;

use embassy_time::{with_timeout, Duration};
use inkwake_hal::{MediumError, StorageMedium};

use super::record::{CacheRecord, MAX_RECORD_SIZE};
use crate::logging::{debug, info, warn};

/// Canonical record file name
pub const RECORD_FILE: &str = "inkwake.rec";

/// Temporary file used while replacing the record
pub const TEMP_FILE: &str = "inkwake.tmp";

/// Persistent cache failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StorageError {
    /// Medium missing, failed to mount, or stopped answering
    StorageUnavailable,
    /// Record present but unreadable (checksum, magic, version or schema)
    CorruptRecord,
    /// Record could not be written; the previous one is still in place
    WriteFailed,
}

/// Persistent cache over a [`StorageMedium`]
pub struct PersistentCache<'a, M> {
    medium: &'a mut M,
    timeout: Duration,
}

impl<'a, M: StorageMedium> PersistentCache<'a, M> {
    /// Create a cache handle for one cycle
    ///
    /// # Arguments
    /// * `medium` - Storage medium, unmounted
    /// * `timeout` - Bound on each individual medium operation
    pub fn new(medium: &'a mut M, timeout: Duration) -> Self {
        Self { medium, timeout }
    }

    /// Load the record
    ///
    /// Returns `Ok(None)` on first run.
    pub async fn load(&mut self) -> Result<Option<CacheRecord>, StorageError> {
        self.mount().await?;
        let result = self.load_mounted().await;
        self.unmount().await;
        result
    }

    /// Atomically replace the record
    pub async fn store(&mut self, record: &CacheRecord) -> Result<(), StorageError> {
        let bytes = record.encode().map_err(|err| {
            warn!("record encode failed: {:?}", err);
            StorageError::WriteFailed
        })?;

        self.mount().await?;
        let result = self.replace(&bytes).await;
        self.unmount().await;

        if result.is_ok() {
            debug!("stored record ({} bytes)", bytes.len());
        }
        result
    }

    async fn replace(&mut self, bytes: &[u8]) -> Result<(), StorageError> {
        match with_timeout(self.timeout, self.medium.write(TEMP_FILE, bytes)).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                warn!("temp record write failed: {:?}", err);
                return Err(StorageError::WriteFailed);
            }
            Err(_) => {
                warn!("temp record write timed out");
                return Err(StorageError::WriteFailed);
            }
        }

        match with_timeout(self.timeout, self.medium.rename(TEMP_FILE, RECORD_FILE)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                warn!("record rename failed: {:?}", err);
                Err(StorageError::WriteFailed)
            }
            Err(_) => {
                warn!("record rename timed out");
                Err(StorageError::WriteFailed)
            }
        }
    }

    async fn load_mounted(&mut self) -> Result<Option<CacheRecord>, StorageError> {
        let mut buf = vec![0u8; MAX_RECORD_SIZE];

        match self.read(RECORD_FILE, &mut buf).await {
            Ok(n) => CacheRecord::decode(&buf[..n]).map(Some).map_err(|err| {
                warn!("cache record rejected: {:?}", err);
                StorageError::CorruptRecord
            }),
            Err(MediumError::NotFound) => self.recover_temp(&mut buf).await,
            Err(MediumError::BufferTooSmall) => {
                warn!("cache record larger than {} bytes", MAX_RECORD_SIZE);
                Err(StorageError::CorruptRecord)
            }
            Err(_) => Err(StorageError::StorageUnavailable),
        }
    }

    /// Promote a complete temporary record left by an interrupted replace
    async fn recover_temp(&mut self, buf: &mut [u8]) -> Result<Option<CacheRecord>, StorageError> {
        let Ok(n) = self.read(TEMP_FILE, buf).await else {
            return Ok(None);
        };

        match CacheRecord::decode(&buf[..n]) {
            Ok(record) => {
                info!("recovered record from interrupted write");
                if let Ok(Err(err)) =
                    with_timeout(self.timeout, self.medium.rename(TEMP_FILE, RECORD_FILE)).await
                {
                    warn!("temp record promotion failed: {:?}", err);
                }
                Ok(Some(record))
            }
            Err(_) => {
                debug!("discarding incomplete temp record");
                match with_timeout(self.timeout, self.medium.remove(TEMP_FILE)).await {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => warn!("temp record removal failed: {:?}", err),
                    Err(_) => warn!("temp record removal timed out"),
                }
                Ok(None)
            }
        }
    }

    async fn read(&mut self, name: &str, buf: &mut [u8]) -> Result<usize, MediumError> {
        with_timeout(self.timeout, self.medium.read(name, buf))
            .await
            .unwrap_or(Err(MediumError::Io))
    }

    async fn mount(&mut self) -> Result<(), StorageError> {
        match with_timeout(self.timeout, self.medium.mount()).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => {
                warn!("storage mount failed: {:?}", err);
                Err(StorageError::StorageUnavailable)
            }
            Err(_) => {
                warn!("storage mount timed out");
                Err(StorageError::StorageUnavailable)
            }
        }
    }

    async fn unmount(&mut self) {
        if with_timeout(self.timeout, self.medium.unmount()).await.is_err() {
            warn!("storage unmount timed out");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::record::RECORD_VERSION;
    use crate::config::DeviceConfig;
    use crate::data::{DataSnapshot, FieldValue};
    use embassy_futures::block_on;
    use inkwake_hal::mock::MemoryMedium;
    use proptest::prelude::*;

    const TIMEOUT: Duration = Duration::from_millis(200);

    fn record(temp: i32, failures: u32) -> CacheRecord {
        CacheRecord {
            snapshot: Some(
                DataSnapshot::new(1000)
                    .with("temp", FieldValue::Numeric(temp), "C")
                    .unwrap(),
            ),
            config: DeviceConfig::default(),
            last_success: Some(1000),
            consecutive_failures: failures,
            partial_updates: 0,
            frame: None,
        }
    }

    #[test]
    fn test_first_run_has_no_record() {
        let mut medium = MemoryMedium::new();
        let loaded = block_on(PersistentCache::new(&mut medium, TIMEOUT).load());
        assert_eq!(loaded, Ok(None));
        assert!(!medium.mounted);
    }

    #[test]
    fn test_store_then_load() {
        let mut medium = MemoryMedium::new();
        let original = record(215, 0);
        block_on(async {
            let mut cache = PersistentCache::new(&mut medium, TIMEOUT);
            cache.store(&original).await.unwrap();
            assert_eq!(cache.load().await, Ok(Some(original.clone())));
        });
        assert!(medium.files.contains_key(RECORD_FILE));
        assert!(!medium.files.contains_key(TEMP_FILE));
        assert!(!medium.mounted);
    }

    #[test]
    fn test_missing_medium() {
        let mut medium = MemoryMedium::new();
        medium.missing = true;
        block_on(async {
            let mut cache = PersistentCache::new(&mut medium, TIMEOUT);
            assert_eq!(cache.load().await, Err(StorageError::StorageUnavailable));
            assert_eq!(cache.store(&record(1, 0)).await, Err(StorageError::StorageUnavailable));
        });
    }

    #[test]
    fn test_stalled_medium_times_out() {
        let mut medium = MemoryMedium::new();
        medium.stalled = true;
        let loaded = block_on(PersistentCache::new(&mut medium, Duration::from_millis(20)).load());
        assert_eq!(loaded, Err(StorageError::StorageUnavailable));
    }

    #[test]
    fn test_corrupt_record_reported() {
        let mut medium = MemoryMedium::new();
        let mut bytes = record(1, 0).encode().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        medium.files.insert(RECORD_FILE.into(), bytes);

        let loaded = block_on(PersistentCache::new(&mut medium, TIMEOUT).load());
        assert_eq!(loaded, Err(StorageError::CorruptRecord));
    }

    #[test]
    fn test_old_version_reported_as_corrupt() {
        let mut medium = MemoryMedium::new();
        let mut bytes = record(1, 0).encode().unwrap();
        bytes[4] = RECORD_VERSION.wrapping_sub(1);
        medium.files.insert(RECORD_FILE.into(), bytes);

        let loaded = block_on(PersistentCache::new(&mut medium, TIMEOUT).load());
        assert_eq!(loaded, Err(StorageError::CorruptRecord));
    }

    #[test]
    fn test_write_failure_keeps_previous() {
        let mut medium = MemoryMedium::new();
        let previous = record(100, 1);
        block_on(PersistentCache::new(&mut medium, TIMEOUT).store(&previous)).unwrap();

        medium.read_only = true;
        let result = block_on(PersistentCache::new(&mut medium, TIMEOUT).store(&record(200, 0)));
        assert_eq!(result, Err(StorageError::WriteFailed));

        medium.read_only = false;
        let loaded = block_on(PersistentCache::new(&mut medium, TIMEOUT).load());
        assert_eq!(loaded, Ok(Some(previous)));
    }

    #[test]
    fn test_orphaned_temp_is_recovered() {
        let mut medium = MemoryMedium::new();
        let orphan = record(300, 0);
        medium.files.insert(TEMP_FILE.into(), orphan.encode().unwrap());

        let loaded = block_on(PersistentCache::new(&mut medium, TIMEOUT).load());
        assert_eq!(loaded, Ok(Some(orphan)));
        assert!(medium.files.contains_key(RECORD_FILE));
        assert!(!medium.files.contains_key(TEMP_FILE));
    }

    #[test]
    fn test_torn_temp_is_removed() {
        let mut medium = MemoryMedium::new();
        let bytes = record(300, 0).encode().unwrap();
        medium.files.insert(TEMP_FILE.into(), bytes[..bytes.len() / 2].to_vec());

        let loaded = block_on(PersistentCache::new(&mut medium, TIMEOUT).load());
        assert_eq!(loaded, Ok(None));
        assert!(medium.files.is_empty());
    }

    proptest! {
        #[test]
        fn test_power_loss_never_tears_record(cut in 0usize..4, had_previous in any::<bool>()) {
            let mut medium = MemoryMedium::new();
            let previous = record(100, 3);
            let next = record(200, 0);

            if had_previous {
                block_on(PersistentCache::new(&mut medium, TIMEOUT).store(&previous)).unwrap();
            }

            medium.cut_power_after(cut);
            let _ = block_on(PersistentCache::new(&mut medium, TIMEOUT).store(&next));
            medium.restore_power();

            let loaded = block_on(PersistentCache::new(&mut medium, TIMEOUT).load()).unwrap();
            let acceptable = match &loaded {
                Some(r) => *r == next || (had_previous && *r == previous),
                None => !had_previous,
            };
            prop_assert!(acceptable, "torn state after cut at {}: {:?}", cut, loaded);
        }
    }
}
