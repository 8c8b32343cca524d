//! Serial line transport.

use super::{Transport, TransportError};
use std::io::{Read, Write};
use std::time::Duration;

/// Default line speed for SRFP devices.
pub const DEFAULT_BAUD_RATE: u32 = 2400;

/// How long one blocking read waits at the port level when the caller asked
/// for no timeout. Expiry just re-arms the read.
const IDLE_POLL: Duration = Duration::from_secs(3600);

/// A transport over a serial port (`/dev/ttyS1`, `COM1`, ...).
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    name: String,
    read_timeout: Option<Duration>,
}

impl SerialTransport {
    /// Open `name` at `baud_rate`, 8N1, no flow control.
    pub fn open(name: &str, baud_rate: u32) -> Result<Self, TransportError> {
        let port = serialport::new(name, baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(IDLE_POLL)
            .open()?;
        tracing::debug!(target: "srfp::transport", port = name, baud_rate, "serial port opened");
        Ok(Self {
            port,
            name: name.to_string(),
            read_timeout: None,
        })
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("name", &self.name)
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

impl Transport for SerialTransport {
    fn send(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        self.port.write_all(buf).map_err(TransportError::from_io)?;
        self.port.flush().map_err(TransportError::from_io)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        loop {
            match self.port.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => match TransportError::from_io(e) {
                    TransportError::Timeout if self.read_timeout.is_none() => continue,
                    err => return Err(err),
                },
            }
        }
    }

    fn set_read_timeout(&mut self, dur: Option<Duration>) -> Result<(), TransportError> {
        self.read_timeout = dur.filter(|d| !d.is_zero());
        self.port.set_timeout(self.read_timeout.unwrap_or(IDLE_POLL))?;
        Ok(())
    }

    fn describe(&self) -> String {
        format!("serial:{}", self.name)
    }
}
