//! Wireless link abstractions
//!
//! A duty cycle opens one TCP connection at a time, so the link exposes
//! the whole lifecycle on one object: power, association, connection and
//! teardown. The open connection is the link itself, read and written
//! through [`embedded_io_async`] so any HTTP client speaking those traits
//! can drive it.

use embedded_io::{ErrorKind, ErrorType};
use embedded_io_async::{Read, Write};

/// Errors from radio operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RadioError {
    /// Radio hardware did not come up
    Unavailable,
    /// Association with the access point was refused
    AssociationFailed,
    /// TCP connection could not be opened
    ConnectFailed,
    /// Connection dropped or I/O error mid-exchange
    Io,
}

impl embedded_io::Error for RadioError {
    fn kind(&self) -> ErrorKind {
        match self {
            RadioError::Unavailable | RadioError::AssociationFailed => ErrorKind::NotConnected,
            RadioError::ConnectFailed => ErrorKind::ConnectionRefused,
            RadioError::Io => ErrorKind::ConnectionReset,
        }
    }
}

/// Wireless link carrying one TCP connection at a time
///
/// `read` returning `Ok(0)` means the peer closed the connection.
pub trait RadioLink: Read + Write + ErrorType<Error = RadioError> {
    /// Power up the radio
    fn power_on(&mut self) -> impl core::future::Future<Output = Result<(), RadioError>>;

    /// Join the configured network
    ///
    /// # Arguments
    /// * `ssid` - Network name
    /// * `passphrase` - Pre-shared key (empty for open networks)
    fn associate(
        &mut self,
        ssid: &str,
        passphrase: &str,
    ) -> impl core::future::Future<Output = Result<(), RadioError>>;

    /// Open a TCP connection to `host:port`
    fn connect(
        &mut self,
        host: &str,
        port: u16,
    ) -> impl core::future::Future<Output = Result<(), RadioError>>;

    /// Close the connection if one is open
    fn disconnect(&mut self) -> impl core::future::Future<Output = ()>;

    /// Power the radio down
    ///
    /// Must be safe to call in any state, including when already off.
    fn power_off(&mut self) -> impl core::future::Future<Output = ()>;
}
