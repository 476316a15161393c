//! Mount orchestration: launch, then confirm by probing.

use std::os::unix::fs::DirBuilderExt;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use weedvol_common::{VolResult, VolumeError};

use super::launcher::{MountCommand, MountLauncher};
use super::probe::MountProbe;
use crate::driver::Volume;

/// How often and how patiently a fresh mount is probed.
///
/// Probe `n` is followed by a sleep of `n * step` unless it was the last,
/// so the default schedule waits 1+2+3+4 = 10 seconds at most.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSchedule {
    /// Number of probes before giving up.
    pub attempts: u32,
    /// Delay increment between probes.
    pub step: Duration,
}

impl ProbeSchedule {
    /// Create a schedule.
    #[must_use]
    pub const fn new(attempts: u32, step: Duration) -> Self {
        Self { attempts, step }
    }

    /// Probe immediately, `attempts` times, without sleeping.
    #[must_use]
    pub const fn immediate(attempts: u32) -> Self {
        Self::new(attempts, Duration::ZERO)
    }

    /// Sleep following probe number `attempt` (1-based).
    #[must_use]
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.step * attempt
    }

    /// Longest total time spent sleeping.
    #[must_use]
    pub fn max_wait(&self) -> Duration {
        (1..self.attempts).map(|n| self.delay_after(n)).sum()
    }
}

impl Default for ProbeSchedule {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(1))
    }
}

/// Brings a volume's mountpoint up.
///
/// Callers serialize access per volume; the executor itself keeps no state.
pub struct MountExecutor {
    launcher: Arc<dyn MountLauncher>,
    probe: Arc<dyn MountProbe>,
    schedule: ProbeSchedule,
}

impl std::fmt::Debug for MountExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MountExecutor")
            .field("schedule", &self.schedule)
            .finish_non_exhaustive()
    }
}

impl MountExecutor {
    /// Create an executor.
    pub fn new(
        launcher: Arc<dyn MountLauncher>,
        probe: Arc<dyn MountProbe>,
        schedule: ProbeSchedule,
    ) -> Self {
        Self {
            launcher,
            probe,
            schedule,
        }
    }

    /// The probe used to confirm mounts.
    #[must_use]
    pub fn probe(&self) -> &dyn MountProbe {
        self.probe.as_ref()
    }

    /// The probe schedule.
    #[must_use]
    pub const fn schedule(&self) -> ProbeSchedule {
        self.schedule
    }

    /// Mount `volume` and wait until the mount is observable.
    ///
    /// A mountpoint that is already a live mount is adopted as is.
    pub async fn mount(&self, volume: &Volume) -> VolResult<()> {
        let path = volume.mountpoint.as_path();
        prepare_mountpoint(path)?;

        if self.probe.is_mounted(path)? {
            tracing::info!(
                volume = %volume.name,
                path = %path.display(),
                "Mountpoint already mounted, adopting it"
            );
            return Ok(());
        }

        self.launcher.launch(&MountCommand::for_volume(volume))?;
        self.wait_for_mount(path).await?;

        tracing::info!(volume = %volume.name, path = %path.display(), "Volume mounted");
        Ok(())
    }

    async fn wait_for_mount(&self, path: &Path) -> VolResult<()> {
        let attempts = self.schedule.attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self.probe.is_mounted(path) {
                Ok(true) => {
                    tracing::debug!(path = %path.display(), attempt, "Mount observed");
                    return Ok(());
                }
                Ok(false) => {
                    tracing::debug!(path = %path.display(), attempt, "Not mounted yet");
                    last_error = None;
                }
                Err(e) => {
                    tracing::debug!(path = %path.display(), attempt, error = %e, "Probe failed");
                    last_error = Some(e);
                }
            }

            if attempt < attempts {
                tokio::time::sleep(self.schedule.delay_after(attempt)).await;
            }
        }

        Err(last_error.unwrap_or_else(|| VolumeError::MountTimeout {
            path: path.to_path_buf(),
            attempts,
        }))
    }
}

/// Make sure `path` is a directory, creating it (and its parents) if absent.
pub fn prepare_mountpoint(path: &Path) -> VolResult<()> {
    match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(VolumeError::NotADirectory {
            path: path.to_path_buf(),
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => std::fs::DirBuilder::new()
            .recursive(true)
            .mode(0o755)
            .create(path)
            .map_err(|e| VolumeError::MountFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        Err(e) => Err(VolumeError::MountFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
    }
}
