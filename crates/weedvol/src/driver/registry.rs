//! The volume driver: reference-counted mount lifecycle over a persisted
//! volume table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;
use weedvol_common::{VolResult, VolumeError};

use super::config::DriverConfig;
use super::state::{StateStore, VolumeTable};
use super::volume::{Capabilities, CreateOptions, Scope, Volume, VolumeInfo};
use crate::mount::{
    DeviceProbe, MountExecutor, MountLauncher, MountProbe, SyscallUnmounter, Unmounter,
    WeedMountLauncher,
};

/// Owns the volume table and serializes every operation on it.
///
/// A single lock covers the whole table. `mount` keeps the write lock while
/// it waits for the mount to appear, so at most one mount or unmount is in
/// flight at any time.
pub struct VolumeDriver {
    config: DriverConfig,
    volumes: RwLock<VolumeTable>,
    store: StateStore,
    executor: MountExecutor,
    unmounter: Arc<dyn Unmounter>,
}

impl std::fmt::Debug for VolumeDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeDriver")
            .field("config", &self.config)
            .field("store", &self.store)
            .field("executor", &self.executor)
            .finish_non_exhaustive()
    }
}

impl VolumeDriver {
    /// Open the driver with the system mount mechanism.
    ///
    /// # Errors
    ///
    /// Fails if an existing state file cannot be read or decoded.
    pub fn open(config: DriverConfig) -> VolResult<Self> {
        let launcher = Arc::new(WeedMountLauncher::new(config.mount_binary.clone()));
        Self::with_parts(
            config,
            launcher,
            Arc::new(DeviceProbe),
            Arc::new(SyscallUnmounter),
        )
    }

    /// Open the driver with explicit mount collaborators.
    ///
    /// # Errors
    ///
    /// Fails if an existing state file cannot be read or decoded.
    pub fn with_parts(
        config: DriverConfig,
        launcher: Arc<dyn MountLauncher>,
        probe: Arc<dyn MountProbe>,
        unmounter: Arc<dyn Unmounter>,
    ) -> VolResult<Self> {
        let store = StateStore::new(config.paths.state_file());
        let volumes = store.load()?;

        tracing::info!(
            root = %config.paths.root.display(),
            count = volumes.len(),
            "Volume driver ready"
        );

        Ok(Self {
            executor: MountExecutor::new(launcher, probe, config.probe),
            config,
            volumes: RwLock::new(volumes),
            store,
            unmounter,
        })
    }

    /// Driver configuration.
    #[must_use]
    pub const fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Register a volume.
    ///
    /// Re-creating a volume with an identical definition is a no-op.
    pub async fn create(&self, name: &str, opts: &BTreeMap<String, String>) -> VolResult<()> {
        tracing::debug!(method = "create", volume = %name, ?opts, "Request");

        let mut table = self.volumes.write().await;
        self.create_locked(&mut table, name, opts)
            .inspect_err(report("create", name))
    }

    fn create_locked(
        &self,
        table: &mut VolumeTable,
        name: &str,
        opts: &BTreeMap<String, String>,
    ) -> VolResult<()> {
        if name.is_empty() {
            return Err(VolumeError::Config {
                message: "volume name must not be empty".to_string(),
            });
        }

        let volume = Volume::new(name, CreateOptions::parse(opts)?, &self.config.paths);

        if let Some(existing) = table.get(name) {
            if existing.same_definition(&volume) {
                tracing::debug!(volume = %name, "Volume already exists");
                return Ok(());
            }
            return Err(VolumeError::VolumeExists {
                name: name.to_string(),
            });
        }

        tracing::info!(
            volume = %name,
            host = %volume.host,
            filerpath = %volume.filerpath,
            path = %volume.mountpoint.display(),
            "Volume created"
        );

        table.insert(name.to_string(), volume);
        self.persist(table);
        Ok(())
    }

    /// Forget a volume and delete its mountpoint directory.
    pub async fn remove(&self, name: &str) -> VolResult<()> {
        tracing::debug!(method = "remove", volume = %name, "Request");

        let mut table = self.volumes.write().await;
        self.remove_locked(&mut table, name)
            .inspect_err(report("remove", name))
    }

    fn remove_locked(&self, table: &mut VolumeTable, name: &str) -> VolResult<()> {
        let volume = table
            .get(name)
            .ok_or_else(|| VolumeError::not_found(name))?;

        if volume.in_use() {
            return Err(VolumeError::VolumeInUse {
                name: name.to_string(),
                connections: volume.connections(),
            });
        }

        let mountpoint = volume.mountpoint.clone();
        if shares_mountpoint(table, name, &mountpoint) {
            tracing::debug!(
                volume = %name,
                path = %mountpoint.display(),
                "Mountpoint shared with another volume, keeping it"
            );
        } else {
            if self.executor.probe().is_mounted(&mountpoint)? {
                return Err(VolumeError::StillMounted { path: mountpoint });
            }
            if self.config.paths.owns(&mountpoint) {
                match std::fs::remove_dir_all(&mountpoint) {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
            } else {
                tracing::warn!(
                    volume = %name,
                    path = %mountpoint.display(),
                    "Mountpoint outside the volumes directory, not deleting it"
                );
            }
        }

        table.remove(name);
        self.persist(table);

        tracing::info!(volume = %name, "Volume removed");
        Ok(())
    }

    /// Mountpoint of a volume.
    pub async fn path(&self, name: &str) -> VolResult<PathBuf> {
        tracing::debug!(method = "path", volume = %name, "Request");

        let table = self.volumes.read().await;
        table
            .get(name)
            .map(|v| v.mountpoint.clone())
            .ok_or_else(|| VolumeError::not_found(name))
            .inspect_err(report("path", name))
    }

    /// Attach a caller, mounting the volume if it is the first.
    pub async fn mount(&self, name: &str) -> VolResult<PathBuf> {
        tracing::debug!(method = "mount", volume = %name, "Request");

        let mut table = self.volumes.write().await;
        self.mount_locked(&mut table, name)
            .await
            .inspect_err(report("mount", name))
    }

    async fn mount_locked(&self, table: &mut VolumeTable, name: &str) -> VolResult<PathBuf> {
        let volume = table
            .get_mut(name)
            .ok_or_else(|| VolumeError::not_found(name))?;

        if !volume.in_use() {
            self.executor.mount(volume).await?;
        }

        volume.connections += 1;
        let mountpoint = volume.mountpoint.clone();
        tracing::debug!(
            volume = %name,
            connections = volume.connections,
            "Volume attached"
        );

        self.persist(table);
        Ok(mountpoint)
    }

    /// Detach a caller, unmounting the volume when it was the last.
    ///
    /// The connection count only drops once the mount is gone, unless the
    /// mountpoint turns out not to be a mount at all.
    pub async fn unmount(&self, name: &str) -> VolResult<()> {
        tracing::debug!(method = "unmount", volume = %name, "Request");

        let mut table = self.volumes.write().await;
        self.unmount_locked(&mut table, name)
            .inspect_err(report("unmount", name))
    }

    fn unmount_locked(&self, table: &mut VolumeTable, name: &str) -> VolResult<()> {
        let volume = table
            .get(name)
            .ok_or_else(|| VolumeError::not_found(name))?;
        let connections = volume.connections();
        let mountpoint = volume.mountpoint.clone();
        let shared = shares_mountpoint_in_use(table, name, &mountpoint);
        let stale = connections == 0 && !shared && self.executor.probe().is_mounted(&mountpoint)?;

        let detached = match connections {
            0 if stale => {
                tracing::warn!(
                    volume = %name,
                    path = %mountpoint.display(),
                    "Detaching stale mount"
                );
                self.unmounter.unmount(&mountpoint)
            }
            0 => {
                tracing::debug!(volume = %name, "Volume not attached");
                Ok(())
            }
            1 if shared => {
                tracing::debug!(
                    volume = %name,
                    path = %mountpoint.display(),
                    "Mountpoint still used by another volume"
                );
                Ok(())
            }
            1 => self.unmounter.unmount(&mountpoint),
            _ => Ok(()),
        };

        // A live mount that failed to detach keeps its caller counted.
        if detached.is_err() && !matches!(detached, Err(VolumeError::InvalidMount { .. })) {
            return detached;
        }

        if let Some(volume) = table.get_mut(name) {
            volume.connections = volume.connections.saturating_sub(1);
            tracing::debug!(
                volume = %name,
                connections = volume.connections,
                "Volume detached"
            );
        }
        self.persist(table);

        if detached.is_ok() && connections == 1 && !shared {
            tracing::info!(volume = %name, path = %mountpoint.display(), "Volume unmounted");
        }
        detached
    }

    /// Name and mountpoint of a volume.
    pub async fn get(&self, name: &str) -> VolResult<VolumeInfo> {
        tracing::debug!(method = "get", volume = %name, "Request");

        self.inspect(name).await.map(|v| v.info())
    }

    /// Full record of a volume.
    pub async fn inspect(&self, name: &str) -> VolResult<Volume> {
        let table = self.volumes.read().await;
        table
            .get(name)
            .cloned()
            .ok_or_else(|| VolumeError::not_found(name))
            .inspect_err(report("get", name))
    }

    /// All volumes, ordered by name.
    pub async fn list(&self) -> Vec<VolumeInfo> {
        tracing::debug!(method = "list", "Request");

        let table = self.volumes.read().await;
        table.values().map(Volume::info).collect()
    }

    /// Static capability report.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        Capabilities {
            scope: Scope::Local,
        }
    }

    /// Save failures are logged; the in-memory table stays authoritative.
    fn persist(&self, table: &VolumeTable) {
        if let Err(e) = self.store.save(table) {
            tracing::error!(
                path = %self.store.path().display(),
                error = %e,
                "Failed to save volume state"
            );
        }
    }
}

/// Whether a volume other than `name` uses `mountpoint`.
fn shares_mountpoint(table: &VolumeTable, name: &str, mountpoint: &Path) -> bool {
    table
        .values()
        .any(|v| v.name != name && v.mountpoint == mountpoint)
}

/// Whether a volume other than `name` has callers attached at `mountpoint`.
fn shares_mountpoint_in_use(table: &VolumeTable, name: &str, mountpoint: &Path) -> bool {
    table
        .values()
        .any(|v| v.name != name && v.mountpoint == mountpoint && v.in_use())
}

fn report<'a>(method: &'static str, name: &'a str) -> impl FnOnce(&VolumeError) + 'a {
    move |e| tracing::error!(method, volume = %name, error = %e, "Request failed")
}
