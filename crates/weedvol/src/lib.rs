//! # weedvol
//!
//! Volume lifecycle management for SeaweedFS-backed container volumes.
//!
//! Each named volume maps to exactly one local mountpoint. The driver
//! reference-counts attach requests so a filer mount is established by the
//! first caller and torn down only after the last one detaches.
//!
//! ## Features
//!
//! - **Shared mounts**: concurrent callers attach to a single mount
//! - **Mount confirmation**: fresh mounts are probed until they appear
//! - **Persistent state**: the volume table survives restarts
//!
//! ## Usage
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use weedvol::{DriverConfig, VolumeDriver};
//!
//! # async fn example() -> weedvol_common::VolResult<()> {
//! let driver = VolumeDriver::open(DriverConfig::default().with_root("/mnt"))?;
//!
//! let opts = BTreeMap::from([
//!     ("host".to_string(), "filer:8888".to_string()),
//!     ("filerpath".to_string(), "/data".to_string()),
//! ]);
//! driver.create("data", &opts).await?;
//!
//! let mountpoint = driver.mount("data").await?;
//! println!("mounted at {}", mountpoint.display());
//! driver.unmount("data").await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod driver;
pub mod mount;

pub use driver::{DriverConfig, Volume, VolumeDriver, VolumeInfo};
