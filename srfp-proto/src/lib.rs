//! Wire codec for the Simple Remote File Protocol (SRFP).
//!
//! SRFP browses and reads a remote read-only filesystem over a slow,
//! strictly synchronous link (serial line or Unix socket). Each exchange is
//! one request frame followed by one response frame:
//!
//! ```text
//!   [1-byte type][2-byte id][2-byte length][body][4-byte CRC32]
//! ```
//!
//! Message types:
//!   0x01 DirectoryListRequest   0x81 DirectoryListResponse
//!   0x02 NodeInfoRequest        0x82 NodeInfoResponse
//!   0x03 FileContentsRequest    0x83 FileContentsResponse
//!   0x7F VersionRequest         0xFF VersionResponse
//!   0x80 Error

mod error;
mod message;
pub mod path;
mod wire;

pub use error::ProtocolError;
pub use message::{ErrorCode, Message, MessageType, NodeInfo, Version};
pub use path::{filename_to_segments, segments_to_filename};
pub use wire::{
    parse_header, Frame, Header, PendingFrame, CRC_LEN, HEADER_LEN, MAX_BODY_LEN, MAX_CHUNK_SIZE,
};
