//! Standard filesystem paths for weedvol.

use std::path::{Path, PathBuf};

use md5::{Digest, Md5};
use once_cell::sync::Lazy;

/// Default root directory for weedvol data.
pub static WEEDVOL_ROOT: Lazy<PathBuf> = Lazy::new(|| {
    std::env::var("WEEDVOL_ROOT")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/mnt"))
});

/// Name of the file holding the persisted volume table.
pub const STATE_FILE_NAME: &str = "seaweedfs-state.json";

/// Standard paths used by the volume driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeedvolPaths {
    /// Root data directory (default: /mnt).
    pub root: PathBuf,
}

impl WeedvolPaths {
    /// Create paths with default locations.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create paths with a custom root directory.
    #[must_use]
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Directory holding one mountpoint per distinct filer location.
    #[must_use]
    pub fn volumes(&self) -> PathBuf {
        self.root.join("volumes")
    }

    /// Directory holding the state file.
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }

    /// Persisted volume table.
    #[must_use]
    pub fn state_file(&self) -> PathBuf {
        self.state_dir().join(STATE_FILE_NAME)
    }

    /// Mountpoint for a filer location.
    ///
    /// Volumes pointing at the same host and path share a mountpoint.
    #[must_use]
    pub fn mountpoint(&self, host: &str, filerpath: &str) -> PathBuf {
        self.volumes().join(location_digest(host, filerpath))
    }

    /// Create all necessary directories.
    ///
    /// # Errors
    ///
    /// Returns an error if directory creation fails.
    pub fn create_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.volumes())?;
        std::fs::create_dir_all(self.state_dir())?;
        Ok(())
    }

    /// Whether `path` lives under the volumes directory.
    #[must_use]
    pub fn owns(&self, path: &Path) -> bool {
        path.starts_with(self.volumes())
    }
}

impl Default for WeedvolPaths {
    fn default() -> Self {
        Self {
            root: WEEDVOL_ROOT.clone(),
        }
    }
}

/// Hex MD5 digest of `host` immediately followed by `filerpath`.
#[must_use]
pub fn location_digest(host: &str, filerpath: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(host.as_bytes());
    hasher.update(filerpath.as_bytes());
    hex::encode(hasher.finalize())
}
