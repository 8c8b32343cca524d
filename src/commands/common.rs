//! Shared setup for commands that talk to a device.

use anyhow::{Context, Result};
use srfp_fs::RemoteFs;
use tracing::debug;

use crate::cli::ConnectArgs;

/// Open the transport named on the command line and start a bridge over it.
pub fn connect(args: &ConnectArgs) -> Result<RemoteFs> {
    let config = args.bridge_config();
    debug!(address = %args.address, ?config, "connecting");
    RemoteFs::connect(&args.address, &args.transport_options(), config)
        .with_context(|| format!("connecting to {}", args.address))
}

/// Render an optional epoch timestamp for table output.
pub fn format_time(secs: Option<u64>) -> String {
    secs.map_or_else(|| "-".to_string(), |s| s.to_string())
}
