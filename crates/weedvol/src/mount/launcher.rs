//! Launching the external mount mechanism.

use std::path::PathBuf;
use std::process::Stdio;

use weedvol_common::{VolResult, VolumeError};

use crate::driver::Volume;

/// Default SeaweedFS binary.
pub const DEFAULT_MOUNT_BINARY: &str = "weed";

/// Everything the mount mechanism needs to attach one filer location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountCommand {
    /// Local directory to mount into.
    pub mountpoint: PathBuf,
    /// Filer address.
    pub host: String,
    /// Path inside the filer namespace.
    pub filerpath: String,
    /// Extra flags, passed through verbatim and in order.
    pub options: Vec<String>,
}

impl MountCommand {
    /// Build the command for a volume.
    #[must_use]
    pub fn for_volume(volume: &Volume) -> Self {
        Self {
            mountpoint: volume.mountpoint.clone(),
            host: volume.host.clone(),
            filerpath: volume.filerpath.clone(),
            options: volume.options.clone(),
        }
    }

    /// Arguments for `weed`, starting with the `mount` subcommand.
    #[must_use]
    pub fn args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(4 + self.options.len());
        args.push("mount".to_string());
        args.push(format!("-dir={}", self.mountpoint.display()));
        args.push(format!("-filer={}", self.host));
        args.push(format!("-filer.path={}", self.filerpath));
        args.extend(self.options.iter().cloned());
        args
    }
}

/// Starts a mount without waiting for it to complete.
///
/// Implementations return once the mechanism has been started. Whether the
/// mount actually appeared is decided by probing the mountpoint afterwards.
pub trait MountLauncher: Send + Sync {
    /// Start mounting according to `command`.
    fn launch(&self, command: &MountCommand) -> VolResult<()>;
}

/// Runs `weed mount` as a detached child process.
///
/// `weed mount` stays in the foreground for as long as the mount is alive,
/// so the child is never waited on by the caller. Its output is logged
/// when it exits.
#[derive(Debug, Clone)]
pub struct WeedMountLauncher {
    binary: PathBuf,
}

impl WeedMountLauncher {
    /// Create a launcher for the given binary.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// The binary this launcher runs.
    #[must_use]
    pub fn binary(&self) -> &std::path::Path {
        &self.binary
    }
}

impl Default for WeedMountLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT_BINARY)
    }
}

impl MountLauncher for WeedMountLauncher {
    fn launch(&self, command: &MountCommand) -> VolResult<()> {
        let args = command.args();
        tracing::debug!(binary = %self.binary.display(), ?args, "Launching mount process");

        let child = tokio::process::Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VolumeError::MountFailed {
                path: command.mountpoint.clone(),
                message: format!("failed to start {}: {e}", self.binary.display()),
            })?;

        let mountpoint = command.mountpoint.clone();
        let pid = child.id();
        tokio::spawn(async move {
            match child.wait_with_output().await {
                Ok(output) => tracing::debug!(
                    path = %mountpoint.display(),
                    ?pid,
                    status = %output.status,
                    stdout = %String::from_utf8_lossy(&output.stdout),
                    stderr = %String::from_utf8_lossy(&output.stderr),
                    "Mount process exited"
                ),
                Err(e) => tracing::warn!(
                    path = %mountpoint.display(),
                    ?pid,
                    error = %e,
                    "Lost track of mount process"
                ),
            }
        });

        Ok(())
    }
}
