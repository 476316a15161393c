//! Driver configuration.

use std::path::PathBuf;

use weedvol_common::WeedvolPaths;

use crate::mount::{DEFAULT_MOUNT_BINARY, ProbeSchedule};

/// Driver configuration options.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Paths for volume data and state.
    pub paths: WeedvolPaths,
    /// Binary that performs mounts.
    pub mount_binary: PathBuf,
    /// How a fresh mount is confirmed.
    pub probe: ProbeSchedule,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            paths: WeedvolPaths::new(),
            mount_binary: PathBuf::from(DEFAULT_MOUNT_BINARY),
            probe: ProbeSchedule::default(),
        }
    }
}

impl DriverConfig {
    /// Set the root directory.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.paths = WeedvolPaths::with_root(root);
        self
    }

    /// Set the mount binary.
    #[must_use]
    pub fn with_mount_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.mount_binary = binary.into();
        self
    }

    /// Set the probe schedule.
    #[must_use]
    pub fn with_probe_schedule(mut self, probe: ProbeSchedule) -> Self {
        self.probe = probe;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn default_config() {
        let config = DriverConfig::default();
        assert_eq!(config.mount_binary, PathBuf::from("weed"));
        assert_eq!(config.probe.attempts, 5);
    }

    #[test]
    fn builder_pattern() {
        let config = DriverConfig::default()
            .with_root("/custom/root")
            .with_mount_binary("/usr/local/bin/weed")
            .with_probe_schedule(ProbeSchedule::new(3, Duration::from_millis(10)));

        assert_eq!(
            config.paths.state_file(),
            PathBuf::from("/custom/root/state/seaweedfs-state.json")
        );
        assert_eq!(config.mount_binary, PathBuf::from("/usr/local/bin/weed"));
        assert_eq!(config.probe.attempts, 3);
    }
}
