//! TCP radio
//!
//! Power and association are bookkeeping only; each connection is a
//! real socket with OS-level timeouts so a dead server cannot stall the
//! executor longer than the configured request timeout.

use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use embedded_io::ErrorType;
use inkwake_hal::{RadioError, RadioLink};
use log::{debug, info, warn};

/// Radio backed by host TCP sockets
pub struct TcpRadio {
    io_timeout: Duration,
    offline: bool,
    powered: bool,
    associated: bool,
    stream: Option<TcpStream>,
}

impl TcpRadio {
    /// Create a radio
    ///
    /// # Arguments
    /// * `io_timeout` - Connect, read and write timeout for the socket
    /// * `offline` - Refuse to power up, as if the module were missing
    pub fn new(io_timeout: Duration, offline: bool) -> Self {
        Self {
            io_timeout,
            offline,
            powered: false,
            associated: false,
            stream: None,
        }
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    fn stream(&mut self) -> Result<&mut TcpStream, RadioError> {
        self.stream.as_mut().ok_or(RadioError::Io)
    }
}

impl ErrorType for TcpRadio {
    type Error = RadioError;
}

impl embedded_io_async::Read for TcpRadio {
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, RadioError> {
        match self.stream()?.read(buf) {
            Ok(n) => Ok(n),
            Err(err) if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                warn!("socket read timed out");
                Err(RadioError::Io)
            }
            Err(err) => {
                warn!("socket read failed: {}", err);
                Err(RadioError::Io)
            }
        }
    }
}

impl embedded_io_async::Write for TcpRadio {
    async fn write(&mut self, data: &[u8]) -> Result<usize, RadioError> {
        self.stream()?.write(data).map_err(|err| {
            warn!("socket write failed: {}", err);
            RadioError::Io
        })
    }

    async fn flush(&mut self) -> Result<(), RadioError> {
        self.stream()?.flush().map_err(|err| {
            warn!("socket flush failed: {}", err);
            RadioError::Io
        })
    }
}

impl RadioLink for TcpRadio {
    async fn power_on(&mut self) -> Result<(), RadioError> {
        if self.offline {
            return Err(RadioError::Unavailable);
        }
        self.powered = true;
        debug!("radio powered on");
        Ok(())
    }

    async fn associate(&mut self, ssid: &str, _passphrase: &str) -> Result<(), RadioError> {
        if !self.powered {
            return Err(RadioError::AssociationFailed);
        }
        self.associated = true;
        info!("associated with '{}'", ssid);
        Ok(())
    }

    async fn connect(&mut self, host: &str, port: u16) -> Result<(), RadioError> {
        if !self.associated {
            return Err(RadioError::ConnectFailed);
        }
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|err| {
                warn!("resolving {} failed: {}", host, err);
                RadioError::ConnectFailed
            })?
            .next()
            .ok_or(RadioError::ConnectFailed)?;

        let stream = TcpStream::connect_timeout(&addr, self.io_timeout).map_err(|err| {
            warn!("connecting to {} failed: {}", addr, err);
            RadioError::ConnectFailed
        })?;
        stream
            .set_read_timeout(Some(self.io_timeout))
            .and_then(|_| stream.set_write_timeout(Some(self.io_timeout)))
            .map_err(|_| RadioError::Io)?;

        debug!("connected to {}", addr);
        self.stream = Some(stream);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
    }

    async fn power_off(&mut self) {
        self.disconnect().await;
        self.associated = false;
        if self.powered {
            debug!("radio powered off");
        }
        self.powered = false;
    }
}
