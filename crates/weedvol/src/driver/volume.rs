//! Volume records and their creation options.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};
use weedvol_common::{VolResult, VolumeError, WeedvolPaths};

/// Option naming the filer address.
pub const HOST_OPTION: &str = "host";

/// Option naming the path inside the filer namespace.
pub const FILERPATH_OPTION: &str = "filerpath";

/// A named volume backed by a filer location.
///
/// Field names match the state file written by earlier releases of the
/// plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Volume {
    /// Volume name.
    pub name: String,
    /// Filer address.
    pub host: String,
    /// Path inside the filer namespace.
    pub filerpath: String,
    /// Pass-through flags for the mount mechanism.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub options: Vec<String>,
    /// Local mount directory.
    pub mountpoint: PathBuf,
    /// Attached callers. Runtime only; reset when state is loaded.
    #[serde(default)]
    pub(crate) connections: usize,
}

impl Volume {
    /// Build a fresh, unattached volume.
    #[must_use]
    pub fn new(name: impl Into<String>, options: CreateOptions, paths: &WeedvolPaths) -> Self {
        let mountpoint = paths.mountpoint(&options.host, &options.filerpath);
        Self {
            name: name.into(),
            host: options.host,
            filerpath: options.filerpath,
            options: options.extra,
            mountpoint,
            connections: 0,
        }
    }

    /// Number of attached callers.
    #[must_use]
    pub const fn connections(&self) -> usize {
        self.connections
    }

    /// Whether any caller is attached.
    #[must_use]
    pub const fn in_use(&self) -> bool {
        self.connections > 0
    }

    /// Whether two records describe the same filer location and flags.
    #[must_use]
    pub fn same_definition(&self, other: &Self) -> bool {
        self.host == other.host
            && self.filerpath == other.filerpath
            && self.options == other.options
            && self.mountpoint == other.mountpoint
    }

    /// Name and mountpoint projection.
    #[must_use]
    pub fn info(&self) -> VolumeInfo {
        VolumeInfo {
            name: self.name.clone(),
            mountpoint: self.mountpoint.clone(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Creation options split into the recognized keys and pass-through flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOptions {
    /// Filer address.
    pub host: String,
    /// Path inside the filer namespace.
    pub filerpath: String,
    /// Remaining options rendered as `key=value`, or `key` when the value is empty.
    pub extra: Vec<String>,
}

impl CreateOptions {
    /// Parse request options.
    ///
    /// # Errors
    ///
    /// Fails when `host` or `filerpath` is missing or empty.
    pub fn parse(opts: &BTreeMap<String, String>) -> VolResult<Self> {
        let mut host = String::new();
        let mut filerpath = String::new();
        let mut extra = Vec::new();

        for (key, value) in opts {
            match key.as_str() {
                HOST_OPTION => host.clone_from(value),
                FILERPATH_OPTION => filerpath.clone_from(value),
                _ if value.is_empty() => extra.push(key.clone()),
                _ => extra.push(format!("{key}={value}")),
            }
        }

        if host.is_empty() {
            return Err(VolumeError::MissingOption {
                option: HOST_OPTION,
            });
        }
        if filerpath.is_empty() {
            return Err(VolumeError::MissingOption {
                option: FILERPATH_OPTION,
            });
        }

        Ok(Self {
            host,
            filerpath,
            extra,
        })
    }
}

/// Name and mountpoint of a volume, as reported by `get` and `list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VolumeInfo {
    /// Volume name.
    pub name: String,
    /// Local mount directory.
    pub mountpoint: PathBuf,
}

/// Visibility of volumes across hosts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Volumes exist on this host only.
    Local,
    /// Volumes are shared cluster-wide.
    Global,
}

/// What the driver supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Capabilities {
    /// Volume scope.
    pub scope: Scope,
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn opts(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn parse_splits_recognized_options() {
        let parsed = CreateOptions::parse(&opts(&[
            ("host", "filer:8888"),
            ("filerpath", "/data"),
            ("-replication", "001"),
            ("-readOnly", ""),
        ]))
        .unwrap();

        assert_eq!(parsed.host, "filer:8888");
        assert_eq!(parsed.filerpath, "/data");
        assert_eq!(parsed.extra, vec!["-readOnly", "-replication=001"]);
    }

    #[test]
    fn parse_requires_host() {
        let err = CreateOptions::parse(&opts(&[("filerpath", "/data")])).unwrap_err();
        assert!(matches!(err, VolumeError::MissingOption { option: "host" }));

        let err =
            CreateOptions::parse(&opts(&[("host", ""), ("filerpath", "/data")])).unwrap_err();
        assert!(matches!(err, VolumeError::MissingOption { option: "host" }));
    }

    #[test]
    fn parse_requires_filerpath() {
        let err = CreateOptions::parse(&opts(&[("host", "filer:8888")])).unwrap_err();
        assert!(matches!(
            err,
            VolumeError::MissingOption {
                option: "filerpath"
            }
        ));
    }

    #[test]
    fn new_volume_derives_mountpoint() {
        let paths = WeedvolPaths::with_root("/mnt");
        let parsed =
            CreateOptions::parse(&opts(&[("host", "filer:8888"), ("filerpath", "/data")])).unwrap();
        let vol = Volume::new("v1", parsed, &paths);

        assert_eq!(vol.mountpoint, paths.mountpoint("filer:8888", "/data"));
        assert_eq!(vol.connections(), 0);
        assert!(!vol.in_use());
    }

    #[test]
    fn decodes_legacy_record_with_null_options() {
        let json = r#"{"Name":"v1","Host":"filer:8888","Filerpath":"/data","Options":null,"Mountpoint":"/mnt/volumes/x"}"#;
        let vol: Volume = serde_json::from_str(json).unwrap();
        assert!(vol.options.is_empty());
        assert_eq!(vol.connections(), 0);
    }

    #[test]
    fn capabilities_wire_format() {
        let caps = Capabilities {
            scope: Scope::Local,
        };
        assert_eq!(
            serde_json::to_string(&caps).unwrap(),
            r#"{"Scope":"local"}"#
        );
    }

    proptest! {
        #[test]
        fn parse_fails_iff_location_missing(
            host in proptest::option::of("[a-z0-9:.]{0,12}"),
            filerpath in proptest::option::of("[a-z0-9/]{0,12}"),
            extra in proptest::collection::btree_map("-[a-z]{1,8}", "[a-z0-9]{0,4}", 0..4),
        ) {
            let mut map = extra.clone();
            if let Some(h) = &host {
                map.insert(HOST_OPTION.to_string(), h.clone());
            }
            if let Some(p) = &filerpath {
                map.insert(FILERPATH_OPTION.to_string(), p.clone());
            }

            let valid = host.as_deref().is_some_and(|h| !h.is_empty())
                && filerpath.as_deref().is_some_and(|p| !p.is_empty());
            match CreateOptions::parse(&map) {
                Ok(parsed) => {
                    prop_assert!(valid);
                    prop_assert_eq!(parsed.extra.len(), extra.len());
                }
                Err(err) => {
                    prop_assert!(!valid);
                    let is_missing = matches!(err, VolumeError::MissingOption { .. });
                    prop_assert!(is_missing);
                }
            }
        }
    }
}
