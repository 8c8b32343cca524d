//! FUSE front end for the read-only bridge.
//!
//! ```text
//!   kernel VFS ──► FuseClient ──► RemoteFs queue ──► worker ──► device
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use srfp_fs::client::{mount, MountConfig};
//! use srfp_fs::{BridgeConfig, RemoteFs, TransportOptions};
//! use std::sync::Arc;
//!
//! let fs = RemoteFs::connect("serial:/dev/ttyS1", &TransportOptions::new(), BridgeConfig::new())?;
//! mount(Arc::new(fs), "/mnt/device", &MountConfig::new())?;
//! ```
//!
//! # Feature
//!
//! This module requires the `fuse-client` feature (enabled by default).

mod fuse;
mod inodes;
mod mount;

pub use fuse::FuseClient;
pub use inodes::{InodeTable, ROOT_INO};
pub use mount::{mount, mount_spawn, MountConfig, MountHandle};
