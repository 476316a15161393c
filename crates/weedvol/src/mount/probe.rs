//! Mount detection.

use std::path::Path;

use rustix::io::Errno;
use weedvol_common::VolResult;

/// Answers whether a directory is currently an active mount point.
pub trait MountProbe: Send + Sync {
    /// Returns `Ok(false)` when `path` does not exist.
    fn is_mounted(&self, path: &Path) -> VolResult<bool>;
}

/// Detects mounts by comparing the device id of a directory with that of
/// its parent.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeviceProbe;

impl MountProbe for DeviceProbe {
    fn is_mounted(&self, path: &Path) -> VolResult<bool> {
        let dir = match rustix::fs::stat(path) {
            Ok(st) => st,
            Err(Errno::NOENT) => return Ok(false),
            Err(e) => return Err(std::io::Error::from(e).into()),
        };

        let parent = rustix::fs::stat(path.join("..")).map_err(std::io::Error::from)?;

        let mounted = dir.st_dev != parent.st_dev;
        tracing::trace!(path = %path.display(), mounted, "Probed mountpoint");
        Ok(mounted)
    }
}
