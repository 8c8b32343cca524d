//! Read-only remote filesystem over the Simple Remote File Protocol.
//!
//! `srfp-fs` provides the stack between a caller and an SRFP device:
//!
//! - **Transport**: Unix socket, serial line, or null sink byte channels
//! - **Channel**: id-sequenced request/response exchanges with framed reads
//! - **Bridge**: [`RemoteFs`], a thread-safe filesystem API that serializes
//!   every caller through one worker thread
//! - **Client**: FUSE mount of a [`RemoteFs`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use srfp_fs::{BridgeConfig, RemoteFs, TransportOptions};
//!
//! let fs = RemoteFs::connect("unix:/tmp/virtualbox-sock", &TransportOptions::new(), BridgeConfig::new())?;
//! for name in fs.list_directory("/")? {
//!     println!("{}", name.to_string_lossy());
//! }
//! ```
//!
//! # Features
//!
//! - `fuse-client` (default): Enable FUSE mounting via `fuser`

mod bridge;
mod channel;
mod config;
mod error;
mod file;
pub mod transport;
mod types;

#[cfg(feature = "fuse-client")]
pub mod client;

pub use bridge::{PendingReply, RemoteFs};
pub use channel::MessageChannel;
pub use config::{BridgeConfig, TransportOptions, DEFAULT_RECV_TIMEOUT};
pub use error::{Error, Result};
pub use file::RemoteFile;
pub use transport::{Transport, TransportAddress, TransportError};
pub use types::{Metadata, OpenMode};

#[cfg(feature = "fuse-client")]
pub use client::{mount, mount_spawn, MountConfig, MountHandle};

/// Prelude for common imports.
pub mod prelude {
    pub use crate::{BridgeConfig, Error, Metadata, RemoteFs, TransportOptions};
    pub use srfp_proto::{ErrorCode, Message, Version};
}
