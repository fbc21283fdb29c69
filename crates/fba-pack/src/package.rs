//! # Package
//!
//! The validated, immutable in-memory form of an artifact. There is no
//! public constructor and no mutating method: a `Package` exists only as the
//! output of a successful decode, and a different package is always a
//! different value.

use std::collections::BTreeMap;

use serde::Serialize;

use fba_core::{sha256_digest, AppId, BuildId, ContentDigest};

/// A component bundle extracted from the artifact.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct ComponentBundle {
    filename: String,
    size: u64,
    digest: ContentDigest,
    #[serde(skip)]
    bytes: Vec<u8>,
}

impl ComponentBundle {
    pub(crate) fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            size: bytes.len() as u64,
            digest: sha256_digest(&bytes),
            bytes,
        }
    }

    /// Archive path the bundle was read from.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Bundle length in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// SHA-256 of the bundle contents.
    pub fn digest(&self) -> &ContentDigest {
        &self.digest
    }

    /// The bundle contents (itself a ZIP archive).
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl std::fmt::Debug for ComponentBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentBundle")
            .field("filename", &self.filename)
            .field("size", &self.size)
            .field("digest", &self.digest.to_hex())
            .finish()
    }
}

/// A device bundle and the firmware platforms it runs on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceComponent {
    platforms: Vec<String>,
    bundle: ComponentBundle,
}

impl DeviceComponent {
    pub(crate) fn new(platforms: Vec<String>, bundle: ComponentBundle) -> Self {
        Self { platforms, bundle }
    }

    /// Firmware platform specifications the bundle supports.
    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    /// The device bundle.
    pub fn bundle(&self) -> &ComponentBundle {
        &self.bundle
    }
}

/// Archive paths of source maps shipped with the artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SourceMaps {
    /// Source map path per device family.
    pub device: BTreeMap<String, String>,
    /// Companion source map path.
    pub companion: Option<String>,
}

/// A decoded application package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Package {
    app_id: AppId,
    build_id: BuildId,
    manifest_version: u64,
    requested_permissions: Vec<String>,
    devices: BTreeMap<String, DeviceComponent>,
    companion: Option<ComponentBundle>,
    source_maps: SourceMaps,
    artifact_digest: ContentDigest,
    artifact_size: u64,
}

/// Parts of a package gathered by the decoder.
pub(crate) struct PackageParts {
    pub(crate) app_id: AppId,
    pub(crate) build_id: BuildId,
    pub(crate) manifest_version: u64,
    pub(crate) requested_permissions: Vec<String>,
    pub(crate) devices: BTreeMap<String, DeviceComponent>,
    pub(crate) companion: Option<ComponentBundle>,
    pub(crate) source_maps: SourceMaps,
}

impl Package {
    pub(crate) fn assemble(parts: PackageParts, artifact: &[u8]) -> Self {
        Self {
            app_id: parts.app_id,
            build_id: parts.build_id,
            manifest_version: parts.manifest_version,
            requested_permissions: parts.requested_permissions,
            devices: parts.devices,
            companion: parts.companion,
            source_maps: parts.source_maps,
            artifact_digest: sha256_digest(artifact),
            artifact_size: artifact.len() as u64,
        }
    }

    /// The app's unique identifier.
    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// The build identifier.
    pub fn build_id(&self) -> &BuildId {
        &self.build_id
    }

    /// Manifest format revision the artifact was written with.
    pub fn manifest_version(&self) -> u64 {
        self.manifest_version
    }

    /// Permissions the app requests, in manifest order.
    pub fn requested_permissions(&self) -> &[String] {
        &self.requested_permissions
    }

    /// Device components keyed by device family.
    pub fn devices(&self) -> &BTreeMap<String, DeviceComponent> {
        &self.devices
    }

    /// Device component for one family.
    pub fn device(&self, family: &str) -> Option<&DeviceComponent> {
        self.devices.get(family)
    }

    /// Names of the device families the package targets.
    pub fn device_families(&self) -> impl Iterator<Item = &str> {
        self.devices.keys().map(String::as_str)
    }

    /// Companion bundle, if the app ships one.
    pub fn companion(&self) -> Option<&ComponentBundle> {
        self.companion.as_ref()
    }

    /// Source map references.
    pub fn source_maps(&self) -> &SourceMaps {
        &self.source_maps
    }

    /// SHA-256 of the whole artifact.
    pub fn artifact_digest(&self) -> &ContentDigest {
        &self.artifact_digest
    }

    /// Length of the artifact in bytes.
    pub fn artifact_size(&self) -> u64 {
        self.artifact_size
    }
}

impl std::fmt::Display for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.app_id, self.build_id)
    }
}
