//! Transport trait definitions.
//!
//! A transport is a raw, blocking byte channel. Framing is done one level up
//! by [`MessageChannel`](crate::MessageChannel), which is why `recv` may hand
//! back fewer bytes than asked for.

use std::io;
use std::time::Duration;

/// A synchronous byte channel to an SRFP device.
pub trait Transport: Send {
    /// Write all of `buf` to the channel.
    fn send(&mut self, buf: &[u8]) -> Result<(), TransportError>;

    /// Read at most `buf.len()` bytes. `Ok(0)` means the channel has no more
    /// data to give (peer closed, or a sink that never answers).
    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;

    /// Bound how long a single `recv` may block. `None` blocks forever.
    fn set_read_timeout(&mut self, _dur: Option<Duration>) -> Result<(), TransportError> {
        Ok(())
    }

    /// Release the underlying channel.
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }

    /// Short human-readable description for logs.
    fn describe(&self) -> String;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, buf: &[u8]) -> Result<(), TransportError> {
        (**self).send(buf)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        (**self).recv(buf)
    }

    fn set_read_timeout(&mut self, dur: Option<Duration>) -> Result<(), TransportError> {
        (**self).set_read_timeout(dur)
    }

    fn close(&mut self) -> Result<(), TransportError> {
        (**self).close()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// Transport error types.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    Closed,
}

impl TransportError {
    /// Classify an I/O error, folding read timeouts into [`TransportError::Timeout`].
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => TransportError::Timeout,
            _ => TransportError::Io(err),
        }
    }
}

impl From<TransportError> for io::Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => e,
            TransportError::Serial(e) => io::Error::new(io::ErrorKind::Other, e),
            TransportError::Timeout => io::Error::new(io::ErrorKind::TimedOut, err),
            TransportError::Closed => io::Error::new(io::ErrorKind::NotConnected, err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeouts_are_classified() {
        let err = TransportError::from_io(io::Error::from(io::ErrorKind::WouldBlock));
        assert!(matches!(err, TransportError::Timeout));
        let err = TransportError::from_io(io::Error::from(io::ErrorKind::TimedOut));
        assert!(matches!(err, TransportError::Timeout));
        let err = TransportError::from_io(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[test]
    fn test_into_io_error() {
        let err: io::Error = TransportError::Timeout.into();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
        let err: io::Error = TransportError::Closed.into();
        assert_eq!(err.kind(), io::ErrorKind::NotConnected);
    }
}
