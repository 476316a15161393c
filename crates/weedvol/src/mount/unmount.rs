//! Detaching mounts.

use std::path::Path;

use rustix::io::Errno;
use weedvol_common::{VolResult, VolumeError};

/// Synchronously detaches a mount.
pub trait Unmounter: Send + Sync {
    /// Detach the mount at `path`, leaving the directory in place.
    fn unmount(&self, path: &Path) -> VolResult<()>;
}

/// Calls `umount(2)` with default flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyscallUnmounter;

#[cfg(target_os = "linux")]
impl Unmounter for SyscallUnmounter {
    fn unmount(&self, path: &Path) -> VolResult<()> {
        use rustix::mount::{UnmountFlags, unmount};

        tracing::debug!(path = %path.display(), "Unmounting filesystem");

        unmount(path, UnmountFlags::empty()).map_err(|errno| classify(path, errno))
    }
}

#[cfg(not(target_os = "linux"))]
impl Unmounter for SyscallUnmounter {
    fn unmount(&self, path: &Path) -> VolResult<()> {
        Err(VolumeError::Unmount {
            path: path.to_path_buf(),
            message: "unmount is only supported on Linux".to_string(),
        })
    }
}

/// `EINVAL` means the target was not a mount point.
fn classify(path: &Path, errno: Errno) -> VolumeError {
    let message = std::io::Error::from(errno).to_string();
    if errno == Errno::INVAL {
        VolumeError::InvalidMount {
            path: path.to_path_buf(),
            message,
        }
    } else {
        VolumeError::Unmount {
            path: path.to_path_buf(),
            message,
        }
    }
}
