//! Volume driver core.
//!
//! This module provides the [`VolumeDriver`] and the records it manages.

mod config;
mod registry;
mod state;
mod volume;

pub use config::DriverConfig;
pub use registry::VolumeDriver;
pub use state::{StateStore, VolumeTable};
pub use volume::{
    Capabilities, CreateOptions, FILERPATH_OPTION, HOST_OPTION, Scope, Volume, VolumeInfo,
};
