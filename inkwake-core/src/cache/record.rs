//! Cache record and its on-disk encoding
//!
//! Record format:
//! - MAGIC (4 bytes): `IWKR`
//! - VERSION (1 byte): [`RECORD_VERSION`]
//! - LENGTH (2 bytes, LE): payload length
//! - PAYLOAD: postcard-encoded [`CacheRecord`]
//! - CRC (4 bytes, LE): CRC-32 (IEEE) over MAGIC..PAYLOAD

use alloc::vec::Vec;

use serde::{Deserialize, Serialize};

use crate::config::DeviceConfig;
use crate::data::DataSnapshot;
use crate::render::FrameSignature;

/// Magic bytes identifying a record file
pub const RECORD_MAGIC: [u8; 4] = *b"IWKR";

/// Current record format version
pub const RECORD_VERSION: u8 = 2;

/// Largest record accepted on read or write
pub const MAX_RECORD_SIZE: usize = 2048;

const HEADER_LEN: usize = 4 + 1 + 2;
const CRC_LEN: usize = 4;

/// Everything that survives a sleep boundary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CacheRecord {
    /// Last-known-good snapshot; absent until the first successful fetch
    pub snapshot: Option<DataSnapshot>,
    /// Configuration in effect when the record was written
    pub config: DeviceConfig,
    /// Wall-clock time of the last successful fetch
    pub last_success: Option<u64>,
    /// Fetch failures since the last success
    pub consecutive_failures: u32,
    /// Partial panel updates since the last full refresh
    pub partial_updates: u8,
    /// Signature of the frame on the panel; `None` when unknown
    pub frame: Option<FrameSignature>,
}

impl CacheRecord {
    /// Record for a device that has never fetched
    pub fn empty(config: DeviceConfig) -> Self {
        Self {
            snapshot: None,
            config,
            last_success: None,
            consecutive_failures: 0,
            partial_updates: 0,
            frame: None,
        }
    }

    /// Encode into the on-disk format
    pub fn encode(&self) -> Result<Vec<u8>, RecordError> {
        let payload = postcard::to_allocvec(self).map_err(|_| RecordError::Encode)?;
        let total = HEADER_LEN + payload.len() + CRC_LEN;
        if total > MAX_RECORD_SIZE {
            return Err(RecordError::TooLarge);
        }

        let mut out = Vec::with_capacity(total);
        out.extend_from_slice(&RECORD_MAGIC);
        out.push(RECORD_VERSION);
        out.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        out.extend_from_slice(&payload);
        let crc = crc32(&out);
        out.extend_from_slice(&crc.to_le_bytes());
        Ok(out)
    }

    /// Decode and verify a record
    pub fn decode(bytes: &[u8]) -> Result<Self, RecordError> {
        if bytes.len() < HEADER_LEN + CRC_LEN {
            return Err(RecordError::Truncated);
        }
        if bytes[..4] != RECORD_MAGIC {
            return Err(RecordError::BadMagic);
        }
        if bytes[4] != RECORD_VERSION {
            return Err(RecordError::VersionMismatch);
        }
        let len = u16::from_le_bytes([bytes[5], bytes[6]]) as usize;
        let body_end = HEADER_LEN + len;
        if bytes.len() != body_end + CRC_LEN {
            return Err(RecordError::Truncated);
        }

        let mut stored = [0u8; CRC_LEN];
        stored.copy_from_slice(&bytes[body_end..]);
        if u32::from_le_bytes(stored) != crc32(&bytes[..body_end]) {
            return Err(RecordError::ChecksumMismatch);
        }

        postcard::from_bytes(&bytes[HEADER_LEN..body_end]).map_err(|_| RecordError::Decode)
    }
}

/// Record encoding failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RecordError {
    /// Serialization failed
    Encode,
    /// Encoded record exceeds [`MAX_RECORD_SIZE`]
    TooLarge,
    /// Fewer bytes than the header announces
    Truncated,
    /// Magic bytes do not match
    BadMagic,
    /// Written by an incompatible format version
    VersionMismatch,
    /// CRC does not match the content
    ChecksumMismatch,
    /// Payload does not match the schema
    Decode,
}

/// CRC-32 (IEEE 802.3) over `data`
pub fn crc32(data: &[u8]) -> u32 {
    !crc32_update(0xFFFF_FFFF, data)
}

pub(crate) fn crc32_update(crc: u32, data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB88320;
    let mut crc = crc;

    for &byte in data {
        crc ^= byte as u32;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }

    crc
}
