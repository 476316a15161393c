//! Common error types for the weedvol volume plugin.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Result type alias using [`VolumeError`].
pub type VolResult<T> = Result<T, VolumeError>;

/// Broad classification of a [`VolumeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A request was missing required input.
    Validation,
    /// The named volume does not exist.
    NotFound,
    /// The request conflicts with the current state of the volume.
    Conflict,
    /// The mount never became observable.
    MountTimeout,
    /// The mount mechanism or the filesystem beneath it failed.
    MountMechanism,
    /// Detaching a mount failed.
    Unmount,
    /// The state file could not be read or written.
    Persistence,
}

/// Errors raised by volume operations.
#[derive(Error, Diagnostic, Debug)]
pub enum VolumeError {
    /// A required creation option was not supplied.
    #[error("'{option}' option required")]
    #[diagnostic(
        code(weedvol::volume::missing_option),
        help("Pass it with `--opt {option}=...` when creating the volume")
    )]
    MissingOption {
        /// Name of the missing option.
        option: &'static str,
    },

    /// Volume not found.
    #[error("volume {name} not found")]
    #[diagnostic(code(weedvol::volume::not_found))]
    VolumeNotFound {
        /// The volume name that was not found.
        name: String,
    },

    /// A volume with this name already exists with a different definition.
    #[error("volume {name} already exists")]
    #[diagnostic(
        code(weedvol::volume::exists),
        help("Remove the existing volume first, or create it with identical options")
    )]
    VolumeExists {
        /// The conflicting volume name.
        name: String,
    },

    /// Volume still has attached callers.
    #[error("volume {name} is currently used by {connections} container(s)")]
    #[diagnostic(code(weedvol::volume::in_use))]
    VolumeInUse {
        /// The volume name.
        name: String,
        /// Active connections at the time of the request.
        connections: usize,
    },

    /// Mountpoint is still an active mount.
    #[error("{} is still mounted", path.display())]
    #[diagnostic(
        code(weedvol::mount::still_mounted),
        help("Unmount the volume before removing it")
    )]
    StillMounted {
        /// The mounted directory.
        path: PathBuf,
    },

    /// Mountpoint exists but is not a directory.
    #[error("{} already exists and is not a directory", path.display())]
    #[diagnostic(code(weedvol::mount::not_a_directory))]
    NotADirectory {
        /// The offending path.
        path: PathBuf,
    },

    /// Mount did not appear within the probe budget.
    #[error("{} was not mounted after {attempts} attempts", path.display())]
    #[diagnostic(
        code(weedvol::mount::timeout),
        help("Check that the filer is reachable and the mount binary is installed")
    )]
    MountTimeout {
        /// The mountpoint that was probed.
        path: PathBuf,
        /// Number of probes performed.
        attempts: u32,
    },

    /// Mount mechanism failed.
    #[error("failed to mount {}: {message}", path.display())]
    #[diagnostic(code(weedvol::mount::failed))]
    MountFailed {
        /// The mountpoint.
        path: PathBuf,
        /// The underlying failure.
        message: String,
    },

    /// Unmount target was not a mount.
    #[error("error unmounting invalid mount {}: {message}", path.display())]
    #[diagnostic(code(weedvol::unmount::invalid_mount))]
    InvalidMount {
        /// The path passed to unmount.
        path: PathBuf,
        /// The OS error message.
        message: String,
    },

    /// Unmount failed.
    #[error("error unmounting {}: {message}", path.display())]
    #[diagnostic(code(weedvol::unmount::failed))]
    Unmount {
        /// The path passed to unmount.
        path: PathBuf,
        /// The OS error message.
        message: String,
    },

    /// State file exists but cannot be decoded.
    #[error("corrupt state file {}: {message}", path.display())]
    #[diagnostic(
        code(weedvol::state::corrupt),
        help("Inspect or move the state file aside; volumes will need to be recreated")
    )]
    StateCorrupt {
        /// The state file path.
        path: PathBuf,
        /// The decode error.
        message: String,
    },

    /// State file could not be read or written.
    #[error("failed to access state file {}: {source}", path.display())]
    #[diagnostic(code(weedvol::state::io))]
    StateIo {
        /// The state file path.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    #[diagnostic(code(weedvol::io))]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    #[diagnostic(code(weedvol::serialization))]
    Serialization(String),

    /// Configuration error.
    #[error("Configuration error: {message}")]
    #[diagnostic(code(weedvol::config))]
    Config {
        /// The error message.
        message: String,
    },
}

impl VolumeError {
    /// Classify this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingOption { .. } | Self::Config { .. } => ErrorKind::Validation,
            Self::VolumeNotFound { .. } => ErrorKind::NotFound,
            Self::VolumeExists { .. }
            | Self::VolumeInUse { .. }
            | Self::StillMounted { .. }
            | Self::NotADirectory { .. } => ErrorKind::Conflict,
            Self::MountTimeout { .. } => ErrorKind::MountTimeout,
            Self::MountFailed { .. } | Self::Io(_) => ErrorKind::MountMechanism,
            Self::InvalidMount { .. } | Self::Unmount { .. } => ErrorKind::Unmount,
            Self::StateCorrupt { .. } | Self::StateIo { .. } | Self::Serialization(_) => {
                ErrorKind::Persistence
            }
        }
    }

    /// Shorthand for [`VolumeError::VolumeNotFound`].
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::VolumeNotFound { name: name.into() }
    }
}

impl From<serde_json::Error> for VolumeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
