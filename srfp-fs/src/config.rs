//! Bridge and transport configuration.

use crate::transport::DEFAULT_BAUD_RATE;
use srfp_proto::MAX_CHUNK_SIZE;
use std::time::Duration;

/// Default bound on a single blocking receive.
///
/// Serial links at 2400 baud move ~240 bytes/s, so a full 0x0FFF chunk
/// takes ~17s on the wire.
pub const DEFAULT_RECV_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for a [`RemoteFs`](crate::RemoteFs) bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Bound on each blocking transport read. `None` blocks forever.
    pub recv_timeout: Option<Duration>,

    /// Largest range requested per `FileContentsRequest`.
    pub max_chunk_size: u32,

    /// Fail responses whose echoed id differs from the request id.
    pub strict_ids: bool,

    /// Attribute TTL handed to the FUSE kernel cache.
    pub attr_ttl: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            recv_timeout: Some(DEFAULT_RECV_TIMEOUT),
            max_chunk_size: MAX_CHUNK_SIZE,
            strict_ids: false,
            attr_ttl: Duration::from_secs(1),
        }
    }
}

impl BridgeConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the receive timeout.
    pub fn recv_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.recv_timeout = timeout;
        self
    }

    /// Set the chunk size, clamped to `1..=MAX_CHUNK_SIZE`.
    pub fn max_chunk_size(mut self, size: u32) -> Self {
        self.max_chunk_size = size.clamp(1, MAX_CHUNK_SIZE);
        self
    }

    /// Enable or disable echoed-id verification.
    pub fn strict_ids(mut self, strict: bool) -> Self {
        self.strict_ids = strict;
        self
    }

    /// Set the attribute TTL.
    pub fn attr_ttl(mut self, ttl: Duration) -> Self {
        self.attr_ttl = ttl;
        self
    }
}

/// Options used when opening a transport from an address.
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Serial line speed; ignored by other transports.
    pub baud_rate: u32,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
        }
    }
}

impl TransportOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }
}
