//! Unix socket transport implementation.

use super::{Transport, TransportError};
use std::io::{Read, Write};
use std::net::Shutdown;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A Unix domain socket transport, typically a VM serial port exposed on the
/// host (e.g. `unix:/tmp/virtualbox-sock`).
#[derive(Debug)]
pub struct UnixTransport {
    stream: UnixStream,
    path: Option<PathBuf>,
    closed: bool,
}

impl UnixTransport {
    /// Connect to a Unix socket at the given path.
    pub fn connect<P: AsRef<Path>>(path: P) -> Result<Self, TransportError> {
        let stream = UnixStream::connect(path.as_ref())?;
        Ok(Self {
            stream,
            path: Some(path.as_ref().to_path_buf()),
            closed: false,
        })
    }

    /// Create a transport from an existing UnixStream.
    pub fn from_stream(stream: UnixStream) -> Self {
        Self {
            stream,
            path: None,
            closed: false,
        }
    }
}

impl Transport for UnixTransport {
    fn send(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.stream.write_all(buf).map_err(TransportError::from_io)?;
        self.stream.flush().map_err(TransportError::from_io)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        self.stream.read(buf).map_err(TransportError::from_io)
    }

    fn set_read_timeout(&mut self, dur: Option<Duration>) -> Result<(), TransportError> {
        // A zero duration is rejected by the socket API; treat it as "block".
        let dur = dur.filter(|d| !d.is_zero());
        Ok(self.stream.set_read_timeout(dur)?)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.closed = true;
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        match &self.path {
            Some(path) => format!("unix:{}", path.display()),
            None => "unix:<pair>".to_string(),
        }
    }
}
