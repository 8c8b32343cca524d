//! Sink transport for dry runs and tests.

use super::{Transport, TransportError};

/// Discards everything sent and never answers.
///
/// Every `recv` returns `Ok(0)`, so a request over this transport fails with
/// an end-of-stream protocol error instead of blocking.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTransport;

impl NullTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for NullTransport {
    fn send(&mut self, _buf: &[u8]) -> Result<(), TransportError> {
        Ok(())
    }

    fn recv(&mut self, _buf: &mut [u8]) -> Result<usize, TransportError> {
        Ok(0)
    }

    fn describe(&self) -> String {
        "null:".to_string()
    }
}
