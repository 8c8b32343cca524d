//! Error taxonomy for the filesystem bridge.

use crate::transport::TransportError;
use srfp_proto::{ErrorCode, ProtocolError};
use std::io;
use std::path::PathBuf;

/// Errors returned by [`RemoteFs`](crate::RemoteFs) and its transports.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed frame, unknown type tag, CRC mismatch or out-of-sequence reply.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// A well-formed `Error` message from the device.
    #[error("remote error: {code}")]
    Remote { code: ErrorCode },

    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    #[error("is a directory: {}", .0.display())]
    IsADirectory(PathBuf),

    #[error("not a directory: {}", .0.display())]
    NotADirectory(PathBuf),

    /// Write-family operation on the read-only filesystem.
    #[error("read-only filesystem: {0} is not supported")]
    UnsupportedOperation(&'static str),

    #[error("invalid transport address: {0:?} (expected unix:<path>, serial:<port> or null:)")]
    InvalidAddress(String),

    #[error("invalid open mode: {0:?}")]
    InvalidMode(String),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("failed to start bridge worker: {0}")]
    Spawn(#[source] io::Error),

    #[error("bridge worker is not running")]
    WorkerGone,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    /// Map onto the errno the FUSE layer replies with.
    pub fn errno(&self) -> i32 {
        match self {
            Error::NotFound(_) => libc::ENOENT,
            Error::IsADirectory(_) => libc::EISDIR,
            Error::NotADirectory(_) => libc::ENOTDIR,
            Error::UnsupportedOperation(_) => libc::EROFS,
            Error::InvalidMode(_) => libc::EINVAL,
            Error::Transport(TransportError::Timeout) => libc::ETIMEDOUT,
            _ => libc::EIO,
        }
    }

    /// True for the one expected, non-fatal outcome: a missing path.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        let kind = match &err {
            Error::NotFound(_) => io::ErrorKind::NotFound,
            Error::UnsupportedOperation(_) => io::ErrorKind::Unsupported,
            Error::InvalidMode(_) | Error::InvalidAddress(_) => io::ErrorKind::InvalidInput,
            Error::Protocol(_) => io::ErrorKind::InvalidData,
            Error::Transport(TransportError::Timeout) => io::ErrorKind::TimedOut,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}
