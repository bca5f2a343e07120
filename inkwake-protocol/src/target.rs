//! Origin-form request target
//!
//! Query keys are emitted verbatim; values are percent-encoded, leaving
//! only RFC 3986 unreserved characters as they are.

use core::fmt;

use heapless::String;

use crate::TargetError;

/// Maximum encoded target length
pub const MAX_TARGET_LEN: usize = 256;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

/// A request target under construction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    buf: String<MAX_TARGET_LEN>,
    params: usize,
}

impl Target {
    /// Start a target at `path`; an empty path means `/`
    pub fn new(path: &str) -> Result<Self, TargetError> {
        let path = if path.is_empty() { "/" } else { path };
        if !path.starts_with('/') || path.contains(['?', '#', ' ']) {
            return Err(TargetError::InvalidPath);
        }
        let mut buf = String::new();
        buf.push_str(path).map_err(|_| TargetError::TooLong)?;
        Ok(Self { buf, params: 0 })
    }

    /// Append a query parameter
    pub fn param(mut self, key: &str, value: &str) -> Result<Self, TargetError> {
        let separator = if self.params == 0 { '?' } else { '&' };
        self.push(separator)?;
        self.buf.push_str(key).map_err(|_| TargetError::TooLong)?;
        self.push('=')?;
        for &b in value.as_bytes() {
            if b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~') {
                self.push(b as char)?;
            } else {
                self.push('%')?;
                self.push(HEX[(b >> 4) as usize] as char)?;
                self.push(HEX[(b & 0x0F) as usize] as char)?;
            }
        }
        self.params += 1;
        Ok(self)
    }

    /// Append a numeric query parameter
    pub fn param_u32(self, key: &str, value: u32) -> Result<Self, TargetError> {
        let mut digits: String<10> = String::new();
        fmt::Write::write_fmt(&mut digits, format_args!("{}", value)).map_err(|_| TargetError::TooLong)?;
        self.param(key, &digits)
    }

    /// Encoded target
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    fn push(&mut self, c: char) -> Result<(), TargetError> {
        self.buf.push(c).map_err(|_| TargetError::TooLong)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.buf)
    }
}
