use anyhow::Result;

use crate::cli::MountArgs;

#[cfg(feature = "fuse-client")]
pub fn cmd_mount(args: MountArgs) -> Result<()> {
    use anyhow::Context;
    use srfp_fs::MountConfig;
    use std::sync::Arc;
    use tracing::info;

    use super::common;

    let fs = common::connect(&args.connect)?;
    // Fail fast if nothing answers before handing the kernel a dead mount.
    let version = fs
        .version()
        .with_context(|| format!("no SRFP device at {}", args.connect.address))?;
    info!(%version, address = %args.connect.address, "device answered");

    let config = MountConfig::new()
        .fs_name(args.fs_name)
        .allow_other(args.allow_other)
        .auto_unmount(args.auto_unmount);
    srfp_fs::mount(Arc::new(fs), &args.mount_point, &config)
        .with_context(|| format!("mounting on {}", args.mount_point.display()))
}

#[cfg(not(feature = "fuse-client"))]
pub fn cmd_mount(_args: MountArgs) -> Result<()> {
    anyhow::bail!("srfpfs was built without the fuse-client feature")
}
