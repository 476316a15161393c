//! Simulated mount mechanism shared by the driver tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use weedvol::DriverConfig;
use weedvol::VolumeDriver;
use weedvol::mount::{MountCommand, MountLauncher, MountProbe, ProbeSchedule, Unmounter};
use weedvol_common::{VolResult, VolumeError};

/// Launcher, probe and unmounter backed by one in-memory mount table.
///
/// A launched mount becomes visible on the `probes_until_mounted`-th probe
/// of its mountpoint; with `None` it never appears.
#[derive(Default)]
pub struct SimulatedMounts {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    probes_until_mounted: Option<u32>,
    fail_unmount: bool,
    pending: HashMap<PathBuf, u32>,
    mounted: HashSet<PathBuf>,
    launches: Vec<MountCommand>,
    unmounts: Vec<PathBuf>,
}

impl SimulatedMounts {
    pub fn appearing_after(probes: u32) -> Arc<Self> {
        let sim = Self::default();
        sim.inner.lock().probes_until_mounted = Some(probes);
        Arc::new(sim)
    }

    pub fn never_mounting() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail_unmount(&self, fail: bool) {
        self.inner.lock().fail_unmount = fail;
    }

    pub fn launches(&self) -> Vec<MountCommand> {
        self.inner.lock().launches.clone()
    }

    pub fn unmounts(&self) -> Vec<PathBuf> {
        self.inner.lock().unmounts.clone()
    }

    pub fn is_live(&self, path: &Path) -> bool {
        self.inner.lock().mounted.contains(path)
    }
}

impl MountLauncher for SimulatedMounts {
    fn launch(&self, command: &MountCommand) -> VolResult<()> {
        let mut inner = self.inner.lock();
        inner.launches.push(command.clone());
        if let Some(probes) = inner.probes_until_mounted {
            inner.pending.insert(command.mountpoint.clone(), probes);
        }
        Ok(())
    }
}

impl MountProbe for SimulatedMounts {
    fn is_mounted(&self, path: &Path) -> VolResult<bool> {
        let mut inner = self.inner.lock();
        if inner.mounted.contains(path) {
            return Ok(true);
        }
        let Some(remaining) = inner.pending.get_mut(path) else {
            return Ok(false);
        };
        *remaining = remaining.saturating_sub(1);
        if *remaining == 0 {
            inner.pending.remove(path);
            inner.mounted.insert(path.to_path_buf());
            return Ok(true);
        }
        Ok(false)
    }
}

impl Unmounter for SimulatedMounts {
    fn unmount(&self, path: &Path) -> VolResult<()> {
        let mut inner = self.inner.lock();
        if inner.fail_unmount {
            return Err(VolumeError::Unmount {
                path: path.to_path_buf(),
                message: "Device or resource busy (os error 16)".to_string(),
            });
        }
        if !inner.mounted.remove(path) {
            return Err(VolumeError::InvalidMount {
                path: path.to_path_buf(),
                message: "Invalid argument (os error 22)".to_string(),
            });
        }
        inner.unmounts.push(path.to_path_buf());
        Ok(())
    }
}

/// Open a driver rooted at `root` that uses `sim` for every mount side effect.
pub fn open_driver(root: &Path, sim: &Arc<SimulatedMounts>) -> VolumeDriver {
    let config = DriverConfig::default()
        .with_root(root)
        .with_probe_schedule(ProbeSchedule::immediate(5));
    VolumeDriver::with_parts(config, sim.clone(), sim.clone(), sim.clone()).unwrap()
}

pub fn filer_opts(host: &str, filerpath: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("host".to_string(), host.to_string()),
        ("filerpath".to_string(), filerpath.to_string()),
    ])
}
