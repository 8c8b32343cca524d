//! Frame encoding and two-phase decoding.
//!
//! # Frame Format
//!
//! ```text
//! +------+--------+--------+----------------+-----------+
//! | type |   id   | length |      body      |   crc32   |
//! | (1)  |  (2)   |  (2)   | (length bytes) |    (4)    |
//! +------+--------+--------+----------------+-----------+
//! ```
//!
//! All integers are big-endian. The CRC covers header and body.
//!
//! Decoding is split in two so that streaming transports can read the fixed
//! header, learn how much is left, and then read the rest:
//! [`parse_header`] followed by [`PendingFrame::parse_rest`].

use crate::error::ProtocolError;
use crate::message::{ErrorCode, Message, MessageType, NodeInfo, Version};
use crate::path::{decode_segments, encode_segments};
use std::io::{Read, Write};

/// Size of the fixed frame header.
pub const HEADER_LEN: usize = 5;

/// Size of the trailing CRC32.
pub const CRC_LEN: usize = 4;

/// Largest body the 16-bit length field can describe.
pub const MAX_BODY_LEN: usize = u16::MAX as usize;

/// Largest file range a single `FileContentsRequest` may ask for.
pub const MAX_CHUNK_SIZE: u32 = 0x0FFF;

const NODE_INFO_LEN: usize = 17;
const VERSION_LEN: usize = 3;
const FILE_RANGE_LEN: usize = 8;

/// Fixed header fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub kind: MessageType,
    pub id: u16,
    pub length: u16,
}

impl Header {
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let id = self.id.to_be_bytes();
        let len = self.length.to_be_bytes();
        [self.kind.as_u8(), id[0], id[1], len[0], len[1]]
    }
}

/// A message together with the sequence id it was sent under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub id: u16,
    pub message: Message,
}

impl Frame {
    pub fn new(id: u16, message: Message) -> Self {
        Self { id, message }
    }

    /// Serialize to `header || body || crc32(header || body)`.
    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        let body = encode_body(&self.message)?;
        if body.len() > MAX_BODY_LEN {
            return Err(ProtocolError::BodyTooLarge(body.len()));
        }

        let header = Header {
            kind: self.message.message_type(),
            id: self.id,
            length: body.len() as u16,
        };

        let mut buf = Vec::with_capacity(HEADER_LEN + body.len() + CRC_LEN);
        buf.extend_from_slice(&header.to_bytes());
        buf.extend_from_slice(&body);
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_be_bytes());
        Ok(buf)
    }

    /// Decode one complete frame from a buffer holding exactly that frame.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < HEADER_LEN {
            return Err(ProtocolError::Truncated {
                expected: HEADER_LEN,
                actual: data.len(),
            });
        }
        let (head, rest) = data.split_at(HEADER_LEN);
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(head);
        let (pending, _) = parse_header(&header)?;
        pending.parse_rest(rest)
    }

    /// Write this frame to a writer.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        let buf = self.encode()?;
        writer.write_all(&buf)?;
        writer.flush()
    }

    /// Read one frame from a blocking reader.
    pub fn read_from<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let mut header = [0u8; HEADER_LEN];
        reader.read_exact(&mut header)?;
        let (pending, remaining) = parse_header(&header)?;
        let mut rest = vec![0u8; remaining];
        reader.read_exact(&mut rest)?;
        Ok(pending.parse_rest(&rest)?)
    }
}

/// A frame whose header has been read but whose body and CRC have not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFrame {
    header: Header,
    raw_header: [u8; HEADER_LEN],
}

/// Parse the fixed header.
///
/// Returns the pending frame and how many more bytes (body plus CRC) must be
/// read before calling [`PendingFrame::parse_rest`].
pub fn parse_header(raw: &[u8; HEADER_LEN]) -> Result<(PendingFrame, usize), ProtocolError> {
    let kind = MessageType::from_u8_opt(raw[0]).ok_or(ProtocolError::UnknownMessageType(raw[0]))?;
    let header = Header {
        kind,
        id: u16::from_be_bytes([raw[1], raw[2]]),
        length: u16::from_be_bytes([raw[3], raw[4]]),
    };
    let pending = PendingFrame {
        header,
        raw_header: *raw,
    };
    let remaining = pending.remaining();
    Ok((pending, remaining))
}

impl PendingFrame {
    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn kind(&self) -> MessageType {
        self.header.kind
    }

    pub fn id(&self) -> u16 {
        self.header.id
    }

    /// Bytes still to be read: body plus trailing CRC.
    pub fn remaining(&self) -> usize {
        self.header.length as usize + CRC_LEN
    }

    /// Verify the CRC and decode the body.
    pub fn parse_rest(self, rest: &[u8]) -> Result<Frame, ProtocolError> {
        if rest.len() != self.remaining() {
            return Err(ProtocolError::Truncated {
                expected: self.remaining(),
                actual: rest.len(),
            });
        }

        let (body, crc_bytes) = rest.split_at(rest.len() - CRC_LEN);
        let expected = u32::from_be_bytes([crc_bytes[0], crc_bytes[1], crc_bytes[2], crc_bytes[3]]);

        let mut hasher = crc32fast::Hasher::new();
        hasher.update(&self.raw_header);
        hasher.update(body);
        let actual = hasher.finalize();
        if actual != expected {
            return Err(ProtocolError::CrcMismatch { expected, actual });
        }

        let message = decode_body(self.header.kind, body)?;
        Ok(Frame {
            id: self.header.id,
            message,
        })
    }
}

fn encode_body(message: &Message) -> Result<Vec<u8>, ProtocolError> {
    let body = match message {
        Message::DirectoryListRequest { path } | Message::NodeInfoRequest { path } => {
            encode_segments(path)?
        }
        Message::FileContentsRequest {
            offset,
            length,
            path,
        } => {
            let mut buf = Vec::with_capacity(FILE_RANGE_LEN + path.len() * 8);
            buf.extend_from_slice(&offset.to_be_bytes());
            buf.extend_from_slice(&length.to_be_bytes());
            buf.extend_from_slice(&encode_segments(path)?);
            buf
        }
        Message::VersionRequest => Vec::new(),
        Message::Error { code } => vec![code.as_u8()],
        Message::DirectoryListResponse { entries } => encode_segments(entries)?,
        Message::NodeInfoResponse(info) => {
            let mut buf = Vec::with_capacity(NODE_INFO_LEN);
            buf.push(info.is_file as u8);
            buf.extend_from_slice(&info.size.to_be_bytes());
            buf.extend_from_slice(&info.created.to_be_bytes());
            buf.extend_from_slice(&info.accessed.to_be_bytes());
            buf.extend_from_slice(&info.modified.to_be_bytes());
            buf
        }
        Message::FileContentsResponse { data } => data.clone(),
        Message::VersionResponse(v) => vec![v.major, v.minor, v.bugfix],
    };
    Ok(body)
}

fn decode_body(kind: MessageType, body: &[u8]) -> Result<Message, ProtocolError> {
    let expect_len = |len: usize, reason: &'static str| {
        if body.len() == len {
            Ok(())
        } else {
            Err(ProtocolError::MalformedBody { kind, reason })
        }
    };

    let message = match kind {
        MessageType::DirectoryListRequest => Message::DirectoryListRequest {
            path: decode_segments(body),
        },
        MessageType::NodeInfoRequest => Message::NodeInfoRequest {
            path: decode_segments(body),
        },
        MessageType::FileContentsRequest => {
            if body.len() < FILE_RANGE_LEN {
                return Err(ProtocolError::MalformedBody {
                    kind,
                    reason: "missing offset/length fields",
                });
            }
            Message::FileContentsRequest {
                offset: read_u32(&body[0..4]),
                length: read_u32(&body[4..8]),
                path: decode_segments(&body[FILE_RANGE_LEN..]),
            }
        }
        MessageType::VersionRequest => {
            expect_len(0, "expected an empty body")?;
            Message::VersionRequest
        }
        MessageType::Error => {
            expect_len(1, "expected a single error code byte")?;
            Message::Error {
                code: ErrorCode::from_u8(body[0]),
            }
        }
        MessageType::DirectoryListResponse => Message::DirectoryListResponse {
            entries: decode_segments(body),
        },
        MessageType::NodeInfoResponse => {
            expect_len(NODE_INFO_LEN, "expected 17 bytes of node info")?;
            Message::NodeInfoResponse(NodeInfo {
                is_file: body[0] != 0,
                size: read_u32(&body[1..5]),
                created: read_u32(&body[5..9]),
                accessed: read_u32(&body[9..13]),
                modified: read_u32(&body[13..17]),
            })
        }
        MessageType::FileContentsResponse => Message::FileContentsResponse {
            data: body.to_vec(),
        },
        MessageType::VersionResponse => {
            expect_len(VERSION_LEN, "expected a 3-byte version triple")?;
            Message::VersionResponse(Version {
                major: body[0],
                minor: body[1],
                bugfix: body[2],
            })
        }
    };
    Ok(message)
}

#[inline]
fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}
