//! Mounting the bridge through FUSE.

use super::FuseClient;
use crate::bridge::RemoteFs;
use fuser::{BackgroundSession, MountOption};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Configuration for FUSE mount.
#[derive(Debug, Clone)]
pub struct MountConfig {
    /// Name shown in `/proc/mounts`.
    pub fs_name: String,
    /// Let other users see the mount (needs `user_allow_other` or root).
    pub allow_other: bool,
    /// Ask the kernel to unmount when the process exits.
    pub auto_unmount: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            fs_name: "srfp".to_string(),
            allow_other: false,
            auto_unmount: false,
        }
    }
}

impl MountConfig {
    /// Create a new mount config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fs_name(mut self, name: impl Into<String>) -> Self {
        self.fs_name = name.into();
        self
    }

    pub fn allow_other(mut self, allow: bool) -> Self {
        self.allow_other = allow;
        self
    }

    pub fn auto_unmount(mut self, auto: bool) -> Self {
        self.auto_unmount = auto;
        self
    }

    fn options(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::FSName(self.fs_name.clone()),
            MountOption::RO,
            MountOption::NoExec,
            MountOption::NoSuid,
            MountOption::NoDev,
        ];
        if self.allow_other {
            options.push(MountOption::AllowOther);
        }
        if self.auto_unmount {
            options.push(MountOption::AutoUnmount);
        }
        options
    }
}

/// Handle for a spawned FUSE mount.
///
/// Created by [`mount_spawn`]. Unmounts when dropped.
pub struct MountHandle {
    session: Option<BackgroundSession>,
}

impl MountHandle {
    /// Wait for an external unmount (e.g. `fusermount3 -u`).
    pub fn join(mut self) {
        if let Some(session) = self.session.take() {
            session.join();
        }
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(target: "srfp::fuse", "MountHandle::drop() unmounting");
            drop(session);
        }
    }
}

/// Mount `fs` at `mount_point`, blocking until it is unmounted.
pub fn mount<P: AsRef<Path>>(
    fs: Arc<RemoteFs>,
    mount_point: P,
    config: &MountConfig,
) -> anyhow::Result<()> {
    let options = config.options();
    info!(target: "srfp::fuse", mount_point = %mount_point.as_ref().display(), ?options, "mounting");
    fuser::mount2(FuseClient::new(fs), mount_point.as_ref(), &options)?;
    info!(target: "srfp::fuse", "unmounted");
    Ok(())
}

/// Mount `fs` at `mount_point` on a background thread.
pub fn mount_spawn<P: AsRef<Path>>(
    fs: Arc<RemoteFs>,
    mount_point: P,
    config: &MountConfig,
) -> anyhow::Result<MountHandle> {
    let options = config.options();
    info!(target: "srfp::fuse", mount_point = %mount_point.as_ref().display(), ?options, "mounting in background");
    let session = fuser::spawn_mount2(FuseClient::new(fs), mount_point.as_ref(), &options)?;
    Ok(MountHandle {
        session: Some(session),
    })
}
