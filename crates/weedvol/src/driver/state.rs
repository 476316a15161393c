//! Volume table persistence.

use std::collections::BTreeMap;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use weedvol_common::{VolResult, VolumeError};

use super::volume::Volume;

/// The persisted mapping from volume name to record.
pub type VolumeTable = BTreeMap<String, Volume>;

/// Loads and saves the volume table as a single JSON document.
#[derive(Debug, Clone)]
pub struct StateStore {
    /// Path of the state file.
    path: PathBuf,
}

impl StateStore {
    /// Create a store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the state file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the volume table.
    ///
    /// A missing file yields an empty table. Connection counts are reset to
    /// zero, since no caller survives a restart attached.
    pub fn load(&self) -> VolResult<VolumeTable> {
        let json = match std::fs::read(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No state found");
                return Ok(VolumeTable::new());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        let table: Option<VolumeTable> =
            serde_json::from_slice(&json).map_err(|e| VolumeError::StateCorrupt {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        let mut table = table.unwrap_or_default();

        for (name, volume) in &mut table {
            if volume.connections != 0 {
                tracing::debug!(
                    volume = %name,
                    connections = volume.connections,
                    "Resetting stale connection count"
                );
                volume.connections = 0;
            }
            if volume.name.is_empty() {
                volume.name.clone_from(name);
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            count = table.len(),
            "Loaded volume state"
        );

        Ok(table)
    }

    /// Replace the state file with `table`.
    ///
    /// The new contents are written to a temporary file in the same
    /// directory and renamed into place.
    pub fn save(&self, table: &VolumeTable) -> VolResult<()> {
        let dir = self.path.parent().ok_or_else(|| VolumeError::Config {
            message: format!("state file {} has no parent directory", self.path.display()),
        })?;
        std::fs::create_dir_all(dir).map_err(|e| self.io_error(e))?;

        let json = serde_json::to_vec_pretty(table)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| self.io_error(e))?;
        tmp.write_all(&json).map_err(|e| self.io_error(e))?;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))
            .map_err(|e| self.io_error(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_error(e.error))?;

        tracing::debug!(
            path = %self.path.display(),
            count = table.len(),
            "Saved volume state"
        );

        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> VolumeError {
        VolumeError::StateIo {
            path: self.path.clone(),
            source,
        }
    }
}
