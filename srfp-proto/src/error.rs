//! Codec error type.

use crate::message::MessageType;

/// Errors raised while encoding or decoding SRFP frames.
///
/// Every variant is fatal for the frame being processed; nothing here is
/// retried by the codec itself.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("unknown message type tag: {0:#04x}")]
    UnknownMessageType(u8),

    #[error("malformed {kind:?} body: {reason}")]
    MalformedBody {
        kind: MessageType,
        reason: &'static str,
    },

    #[error("CRC mismatch: frame carries {expected:#010x}, computed {actual:#010x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("body too large: {0} bytes (max {max})", max = u16::MAX)]
    BodyTooLarge(usize),

    #[error("path segment contains a NUL byte")]
    NulInSegment,

    /// An empty segment has no wire representation: `[""]` and `[]` both
    /// encode to an empty body.
    #[error("empty path segment")]
    EmptySegment,

    #[error("frame truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unexpected end of stream after {received} of {expected} bytes")]
    UnexpectedEof { expected: usize, received: usize },

    #[error("unexpected response: expected {expected:?}, got {actual:?}")]
    UnexpectedResponse {
        expected: MessageType,
        actual: MessageType,
    },

    #[error("response id {actual} does not match request id {expected}")]
    IdMismatch { expected: u16, actual: u16 },
}

impl From<ProtocolError> for std::io::Error {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::UnexpectedEof { .. } => {
                std::io::Error::new(std::io::ErrorKind::UnexpectedEof, err)
            }
            _ => std::io::Error::new(std::io::ErrorKind::InvalidData, err),
        }
    }
}
