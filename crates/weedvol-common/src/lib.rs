//! # weedvol-common
//!
//! Shared types for the weedvol volume plugin.
//!
//! This crate provides functionality used by both the driver library and
//! the plugin daemon:
//! - Common error types
//! - Standard filesystem paths and mountpoint naming

#![warn(missing_docs)]

pub mod error;
pub mod paths;

pub use error::{ErrorKind, VolResult, VolumeError};
pub use paths::{WeedvolPaths, location_digest};
