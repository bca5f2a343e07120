//! Removable storage abstractions
//!
//! Provides a minimal flat-file interface over SD cards or onboard flash
//! filesystems. Files are addressed by short names in a single directory.

/// Errors from storage medium operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MediumError {
    /// Medium missing or mount failed
    NotMounted,
    /// File does not exist
    NotFound,
    /// File larger than the provided buffer
    BufferTooSmall,
    /// Low-level read or write failed
    Io,
    /// No space left
    Full,
}

/// Flat-file storage medium
pub trait StorageMedium {
    /// Mount the medium
    fn mount(&mut self) -> impl core::future::Future<Output = Result<(), MediumError>>;

    /// Read a whole file into the provided buffer
    ///
    /// # Arguments
    /// * `name` - File name
    /// * `buffer` - Buffer to read data into
    ///
    /// # Returns
    /// The number of bytes read, or an error.
    fn read(
        &mut self,
        name: &str,
        buffer: &mut [u8],
    ) -> impl core::future::Future<Output = Result<usize, MediumError>>;

    /// Create or truncate `name` and write `data` to it
    fn write(&mut self, name: &str, data: &[u8]) -> impl core::future::Future<Output = Result<(), MediumError>>;

    /// Rename `from` to `to`, replacing `to` if it exists
    fn rename(&mut self, from: &str, to: &str) -> impl core::future::Future<Output = Result<(), MediumError>>;

    /// Remove a file; removing a missing file is not an error
    fn remove(&mut self, name: &str) -> impl core::future::Future<Output = Result<(), MediumError>>;

    /// Flush and unmount
    fn unmount(&mut self) -> impl core::future::Future<Output = ()>;
}
