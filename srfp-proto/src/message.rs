//! Message kinds and their bodies.

use serde::{Deserialize, Serialize};

/// One-byte type tag carried in every frame header.
///
/// Requests have the high bit clear, responses have it set.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    DirectoryListRequest = 0x01,
    NodeInfoRequest = 0x02,
    FileContentsRequest = 0x03,
    VersionRequest = 0x7F,
    Error = 0x80,
    DirectoryListResponse = 0x81,
    NodeInfoResponse = 0x82,
    FileContentsResponse = 0x83,
    VersionResponse = 0xFF,
}

impl MessageType {
    /// Parse a type tag, returning None for unknown tags.
    pub fn from_u8_opt(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(MessageType::DirectoryListRequest),
            0x02 => Some(MessageType::NodeInfoRequest),
            0x03 => Some(MessageType::FileContentsRequest),
            0x7F => Some(MessageType::VersionRequest),
            0x80 => Some(MessageType::Error),
            0x81 => Some(MessageType::DirectoryListResponse),
            0x82 => Some(MessageType::NodeInfoResponse),
            0x83 => Some(MessageType::FileContentsResponse),
            0xFF => Some(MessageType::VersionResponse),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// True for kinds a device sends back.
    pub fn is_response(self) -> bool {
        self.as_u8() & 0x80 != 0
    }
}

/// Error code carried by an `Error` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    DoesNotExist,
    Other,
    /// Any code this side does not know about; kept so it can be reported.
    Unknown(u8),
}

impl ErrorCode {
    pub const DOES_NOT_EXIST: u8 = 0x01;
    pub const OTHER: u8 = 0xFF;

    pub fn from_u8(value: u8) -> Self {
        match value {
            Self::DOES_NOT_EXIST => ErrorCode::DoesNotExist,
            Self::OTHER => ErrorCode::Other,
            other => ErrorCode::Unknown(other),
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            ErrorCode::DoesNotExist => Self::DOES_NOT_EXIST,
            ErrorCode::Other => Self::OTHER,
            ErrorCode::Unknown(code) => code,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCode::DoesNotExist => write!(f, "does not exist"),
            ErrorCode::Other => write!(f, "other"),
            ErrorCode::Unknown(code) => write!(f, "unknown ({:#04x})", code),
        }
    }
}

/// Node metadata exactly as it travels in a `NodeInfoResponse`.
///
/// Timestamps are seconds since the epoch; 0 means the device did not
/// provide the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeInfo {
    pub is_file: bool,
    pub size: u32,
    pub created: u32,
    pub accessed: u32,
    pub modified: u32,
}

/// Firmware version triple reported by a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub bugfix: u8,
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.bugfix)
    }
}

/// A single SRFP message body.
///
/// Paths and directory entries are lists of raw byte segments; they are
/// joined with NUL on the wire and never contain NUL themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    DirectoryListRequest {
        path: Vec<Vec<u8>>,
    },
    NodeInfoRequest {
        path: Vec<Vec<u8>>,
    },
    FileContentsRequest {
        offset: u32,
        length: u32,
        path: Vec<Vec<u8>>,
    },
    VersionRequest,
    Error {
        code: ErrorCode,
    },
    DirectoryListResponse {
        entries: Vec<Vec<u8>>,
    },
    NodeInfoResponse(NodeInfo),
    FileContentsResponse {
        data: Vec<u8>,
    },
    VersionResponse(Version),
}

impl Message {
    pub fn message_type(&self) -> MessageType {
        match self {
            Message::DirectoryListRequest { .. } => MessageType::DirectoryListRequest,
            Message::NodeInfoRequest { .. } => MessageType::NodeInfoRequest,
            Message::FileContentsRequest { .. } => MessageType::FileContentsRequest,
            Message::VersionRequest => MessageType::VersionRequest,
            Message::Error { .. } => MessageType::Error,
            Message::DirectoryListResponse { .. } => MessageType::DirectoryListResponse,
            Message::NodeInfoResponse(_) => MessageType::NodeInfoResponse,
            Message::FileContentsResponse { .. } => MessageType::FileContentsResponse,
            Message::VersionResponse(_) => MessageType::VersionResponse,
        }
    }
}
