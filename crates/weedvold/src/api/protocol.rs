//! Docker volume plugin wire types.
//!
//! Field names follow the plugin protocol, which uses Go-style
//! capitalization throughout.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use weedvol::Volume;
use weedvol::driver::Capabilities;

/// `/VolumeDriver.Create` request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub opts: Option<BTreeMap<String, String>>,
}

/// Requests that only carry a volume name.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NameRequest {
    #[serde(default)]
    pub name: String,
}

/// `/VolumeDriver.Mount` and `/VolumeDriver.Unmount` requests.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountRequest {
    #[serde(default)]
    pub name: String,
    /// Caller id; the driver counts callers without tracking them.
    #[serde(default, rename = "ID")]
    pub id: String,
}

/// Response carrying only an error string, empty on success.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrResponse {
    pub err: String,
}

/// `/VolumeDriver.Path` and `/VolumeDriver.Mount` response.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MountpointResponse {
    pub mountpoint: String,
    pub err: String,
}

/// A volume as reported to the plugin host.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeBody {
    pub name: String,
    pub mountpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BTreeMap<String, serde_json::Value>>,
}

impl VolumeBody {
    pub fn summary(name: &str, mountpoint: &std::path::Path) -> Self {
        Self {
            name: name.to_string(),
            mountpoint: mountpoint.display().to_string(),
            status: None,
        }
    }

    pub fn detailed(volume: &Volume) -> Self {
        let status = BTreeMap::from([
            ("connections".to_string(), volume.connections().into()),
            ("host".to_string(), volume.host.clone().into()),
            ("filerpath".to_string(), volume.filerpath.clone().into()),
        ]);
        Self {
            status: Some(status),
            ..Self::summary(&volume.name, &volume.mountpoint)
        }
    }
}

/// `/VolumeDriver.Get` response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResponse {
    pub volume: VolumeBody,
    pub err: String,
}

/// `/VolumeDriver.List` response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListResponse {
    pub volumes: Vec<VolumeBody>,
    pub err: String,
}

/// `/VolumeDriver.Capabilities` response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CapabilitiesResponse {
    pub capabilities: Capabilities,
}

/// `/Plugin.Activate` response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ActivateResponse {
    pub implements: Vec<String>,
}
