//! Mount side effects.
//!
//! This module handles:
//! - Detecting whether a directory is a live mount
//! - Launching the external mount mechanism and confirming the result
//! - Detaching mounts

mod executor;
mod launcher;
mod probe;
mod unmount;

pub use executor::{MountExecutor, ProbeSchedule, prepare_mountpoint};
pub use launcher::{DEFAULT_MOUNT_BINARY, MountCommand, MountLauncher, WeedMountLauncher};
pub use probe::{DeviceProbe, MountProbe};
pub use unmount::{SyscallUnmounter, Unmounter};
