use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use srfp_fs::{BridgeConfig, TransportOptions};

#[derive(Parser, Debug)]
#[command(name = "srfpfs", version, about = "Browse and mount a remote read-only filesystem over SRFP")]
pub struct Cli {
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Mount the remote tree through FUSE (blocks until unmounted)
    Mount(MountArgs),
    /// List a remote directory
    Ls(LsArgs),
    /// Show metadata for a remote path
    Stat(StatArgs),
    /// Write a remote file to stdout
    Cat(CatArgs),
    /// Print the device firmware version
    Version(VersionArgs),
}

/// How to reach the device. Shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// Transport address: unix:<socket>, serial:<port> or null:
    pub address: String,

    /// Serial line speed
    #[arg(long, default_value_t = srfp_fs::transport::DEFAULT_BAUD_RATE)]
    pub baud: u32,

    /// Receive timeout in milliseconds (0 waits forever)
    #[arg(long, default_value_t = 30_000)]
    pub timeout_ms: u64,

    /// Largest range requested per read (capped at 4095)
    #[arg(long, default_value_t = srfp_proto::MAX_CHUNK_SIZE)]
    pub chunk_size: u32,

    /// Reject replies whose echoed id differs from the request id
    #[arg(long)]
    pub strict_ids: bool,
}

impl ConnectArgs {
    pub fn transport_options(&self) -> TransportOptions {
        TransportOptions::new().baud_rate(self.baud)
    }

    pub fn bridge_config(&self) -> BridgeConfig {
        let timeout = (self.timeout_ms > 0).then(|| Duration::from_millis(self.timeout_ms));
        BridgeConfig::new()
            .recv_timeout(timeout)
            .max_chunk_size(self.chunk_size)
            .strict_ids(self.strict_ids)
    }
}

#[derive(Args, Debug)]
pub struct MountArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Directory to mount on
    pub mount_point: PathBuf,

    /// Allow other users to access the mount
    #[arg(long)]
    pub allow_other: bool,

    /// Unmount automatically when the process exits
    #[arg(long)]
    pub auto_unmount: bool,

    /// Filesystem name shown in /proc/mounts
    #[arg(long, default_value = "srfp")]
    pub fs_name: String,
}

#[derive(Args, Debug)]
pub struct LsArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Remote directory
    #[arg(default_value = "/")]
    pub path: PathBuf,

    /// Also stat each entry and print size and kind
    #[arg(long, short)]
    pub long: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct StatArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Remote path
    pub path: PathBuf,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct CatArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,

    /// Remote file
    pub path: PathBuf,

    /// Start reading at this byte offset
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Read at most this many bytes (default: to end of file)
    #[arg(long)]
    pub length: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    #[command(flatten)]
    pub connect: ConnectArgs,
}
