//! # Artifact Manifest
//!
//! `manifest.json` sits at the archive root and declares the app identity
//! and which archive entries hold its component bundles:
//!
//! ```json
//! {
//!   "manifestVersion": 6,
//!   "appId": "b4ae822e-eca9-4fcb-8747-217f2a1f53a1",
//!   "buildId": "0x0f75775f470c1585",
//!   "requestedPermissions": ["access_internet"],
//!   "components": {
//!     "watch": { "higgs": { "filename": "device-higgs.zip", "platform": ["27.31.1.29"] } },
//!     "companion": { "filename": "companion.zip" }
//!   },
//!   "sourceMaps": { "device": { "higgs": "sourcemaps/device-higgs.map" } }
//! }
//! ```
//!
//! The version is checked before the rest of the document is interpreted,
//! so a future revision is reported as unsupported rather than as a schema
//! error. Unknown keys are ignored.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;

use fba_core::{AppId, BuildId};

use crate::error::{DecodeError, DecodeResult};

/// The manifest revision this decoder reads.
pub const SUPPORTED_MANIFEST_VERSION: u64 = 6;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    app_id: String,
    build_id: String,
    #[serde(default)]
    requested_permissions: Vec<String>,
    components: RawComponents,
    #[serde(default)]
    source_maps: RawSourceMaps,
}

#[derive(Debug, Deserialize)]
struct RawComponents {
    #[serde(default)]
    watch: BTreeMap<String, RawDeviceComponent>,
    companion: Option<RawCompanion>,
}

#[derive(Debug, Deserialize)]
struct RawDeviceComponent {
    filename: String,
    platform: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawCompanion {
    filename: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawSourceMaps {
    #[serde(default)]
    device: BTreeMap<String, String>,
    companion: Option<String>,
}

/// A device component declared by the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DeviceDeclaration {
    pub(crate) family: String,
    pub(crate) filename: String,
    pub(crate) platforms: Vec<String>,
}

/// A manifest that passed every rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Manifest {
    pub(crate) version: u64,
    pub(crate) app_id: AppId,
    pub(crate) build_id: BuildId,
    pub(crate) requested_permissions: Vec<String>,
    pub(crate) devices: Vec<DeviceDeclaration>,
    pub(crate) companion: Option<String>,
    pub(crate) device_source_maps: BTreeMap<String, String>,
    pub(crate) companion_source_map: Option<String>,
}

impl Manifest {
    /// Every archive path the manifest refers to, in declaration order.
    pub(crate) fn referenced_paths(&self) -> impl Iterator<Item = &str> {
        self.devices
            .iter()
            .map(|d| d.filename.as_str())
            .chain(self.companion.as_deref())
            .chain(self.device_source_maps.values().map(String::as_str))
            .chain(self.companion_source_map.as_deref())
    }
}

/// Parse and validate `manifest.json` contents.
pub(crate) fn parse(bytes: &[u8]) -> DecodeResult<Manifest> {
    let document: Value = serde_json::from_slice(bytes)
        .map_err(|e| DecodeError::manifest(format!("not valid JSON: {e}")))?;
    if !document.is_object() {
        return Err(DecodeError::manifest("top level must be an object"));
    }

    let version = match document.get("manifestVersion") {
        Some(Value::Number(n)) => n
            .as_u64()
            .ok_or_else(|| DecodeError::manifest(format!("manifestVersion must be a non-negative integer, got {n}")))?,
        Some(other) => {
            return Err(DecodeError::manifest(format!(
                "manifestVersion must be an integer, got {other}"
            )))
        }
        None => return Err(DecodeError::manifest("missing manifestVersion")),
    };
    if version != SUPPORTED_MANIFEST_VERSION {
        return Err(DecodeError::UnsupportedManifestVersion {
            found: version,
            supported: SUPPORTED_MANIFEST_VERSION,
        });
    }

    let raw: RawManifest =
        serde_json::from_value(document).map_err(|e| DecodeError::manifest(e.to_string()))?;

    let app_id = AppId::parse(&raw.app_id).map_err(|e| DecodeError::manifest(e.to_string()))?;
    let build_id =
        BuildId::parse(&raw.build_id).map_err(|e| DecodeError::manifest(e.to_string()))?;

    let mut seen = BTreeSet::new();
    for permission in &raw.requested_permissions {
        if permission.trim().is_empty() {
            return Err(DecodeError::manifest("requestedPermissions contains an empty entry"));
        }
        if !seen.insert(permission.as_str()) {
            return Err(DecodeError::manifest(format!(
                "requestedPermissions lists {permission:?} twice"
            )));
        }
    }

    if raw.components.watch.is_empty() {
        return Err(DecodeError::manifest("components.watch declares no device components"));
    }

    let mut devices = Vec::with_capacity(raw.components.watch.len());
    for (family, component) in raw.components.watch {
        check_family(&family)?;
        check_entry_path(&format!("components.watch.{family}.filename"), &component.filename)?;
        if component.platform.is_empty() {
            return Err(DecodeError::manifest(format!(
                "components.watch.{family}.platform must not be empty"
            )));
        }
        if component.platform.iter().any(|p| p.trim().is_empty()) {
            return Err(DecodeError::manifest(format!(
                "components.watch.{family}.platform contains an empty entry"
            )));
        }
        devices.push(DeviceDeclaration {
            family,
            filename: component.filename,
            platforms: component.platform,
        });
    }

    let companion = match raw.components.companion {
        Some(c) => {
            check_entry_path("components.companion.filename", &c.filename)?;
            Some(c.filename)
        }
        None => None,
    };

    for (family, path) in &raw.source_maps.device {
        if !devices.iter().any(|d| &d.family == family) {
            return Err(DecodeError::manifest(format!(
                "sourceMaps.device.{family} refers to an undeclared device family"
            )));
        }
        check_entry_path(&format!("sourceMaps.device.{family}"), path)?;
    }
    if let Some(path) = &raw.source_maps.companion {
        if companion.is_none() {
            return Err(DecodeError::manifest(
                "sourceMaps.companion is set but no companion component is declared",
            ));
        }
        check_entry_path("sourceMaps.companion", path)?;
    }

    Ok(Manifest {
        version,
        app_id,
        build_id,
        requested_permissions: raw.requested_permissions,
        devices,
        companion,
        device_source_maps: raw.source_maps.device,
        companion_source_map: raw.source_maps.companion,
    })
}

fn check_family(family: &str) -> DecodeResult<()> {
    if family.is_empty()
        || !family
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Err(DecodeError::manifest(format!(
            "device family {family:?} must be lowercase ASCII letters and digits"
        )));
    }
    Ok(())
}

/// Reject paths that could escape the archive root when extracted.
fn check_entry_path(field: &str, path: &str) -> DecodeResult<()> {
    let unsafe_path = path.is_empty()
        || path.starts_with('/')
        || path.contains('\\')
        || path.contains('\0')
        || path.split('/').any(|segment| segment == ".." || segment.is_empty());
    if unsafe_path {
        return Err(DecodeError::manifest(format!(
            "{field} is not a safe relative archive path: {path:?}"
        )));
    }
    Ok(())
}
