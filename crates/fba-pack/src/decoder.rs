//! # Artifact Decoder
//!
//! Turns artifact bytes into a [`Package`]. The pipeline is
//! validate-then-extract:
//!
//! 1. Walk the archive structure ([`ArchiveLayout::inspect`]).
//! 2. Extract and validate `manifest.json`.
//! 3. Extract every component bundle the manifest names (CRC-checked) and
//!    validate each bundle's own archive structure.
//! 4. Confirm every referenced source map exists.
//!
//! Only when all steps pass is a `Package` assembled. The decoder holds no
//! mutable state and performs no I/O; the same bytes always produce an equal
//! package or an equal error.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::archive::{Archive, ArchiveLayout};
use crate::error::{DecodeError, DecodeResult};
use crate::manifest;
use crate::package::{ComponentBundle, DeviceComponent, Package, PackageParts, SourceMaps};

/// Archive path of the manifest.
pub const MANIFEST_ENTRY: &str = "manifest.json";

/// Size and count limits applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeLimits {
    /// Maximum artifact length in bytes.
    pub max_artifact_bytes: u64,
    /// Maximum number of archive entries.
    pub max_entries: usize,
    /// Maximum declared uncompressed size of a single entry.
    pub max_entry_bytes: u64,
}

impl DecodeLimits {
    /// Default maximum artifact length: 64 MiB.
    pub const DEFAULT_MAX_ARTIFACT_BYTES: u64 = 64 * 1024 * 1024;
    /// Default maximum entry count.
    pub const DEFAULT_MAX_ENTRIES: usize = 4096;
    /// Default maximum uncompressed entry size: 32 MiB.
    pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 32 * 1024 * 1024;
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self {
            max_artifact_bytes: Self::DEFAULT_MAX_ARTIFACT_BYTES,
            max_entries: Self::DEFAULT_MAX_ENTRIES,
            max_entry_bytes: Self::DEFAULT_MAX_ENTRY_BYTES,
        }
    }
}

/// Anything that can turn artifact bytes into a [`Package`].
///
/// [`ArtifactDecoder`] is the real implementation; the seam exists so the
/// package context can be exercised with stub decoders.
pub trait PackageDecoder: Send + Sync {
    /// Decode `bytes` into a package, or explain why they are rejected.
    fn decode(&self, bytes: &[u8]) -> DecodeResult<Package>;
}

/// The artifact format decoder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArtifactDecoder {
    limits: DecodeLimits,
}

impl ArtifactDecoder {
    /// Create a decoder with explicit limits.
    pub fn new(limits: DecodeLimits) -> Self {
        Self { limits }
    }

    /// The limits this decoder enforces.
    pub fn limits(&self) -> &DecodeLimits {
        &self.limits
    }

    /// Decode an artifact.
    pub fn decode(&self, bytes: &[u8]) -> DecodeResult<Package> {
        let mut archive = Archive::open(bytes, &self.limits)?;

        let manifest_bytes = archive.read_entry(MANIFEST_ENTRY)?;
        let manifest = manifest::parse(&manifest_bytes)?;

        // Report a missing reference before extracting anything large.
        if let Some(missing) = manifest.referenced_paths().find(|p| !archive.contains(p)) {
            return Err(DecodeError::MissingEntry {
                name: missing.to_string(),
            });
        }

        let mut devices = BTreeMap::new();
        for declaration in &manifest.devices {
            let bundle = self.read_bundle(&mut archive, &declaration.filename)?;
            devices.insert(
                declaration.family.clone(),
                DeviceComponent::new(declaration.platforms.clone(), bundle),
            );
        }

        let companion = match &manifest.companion {
            Some(filename) => Some(self.read_bundle(&mut archive, filename)?),
            None => None,
        };

        let package = Package::assemble(
            PackageParts {
                app_id: manifest.app_id,
                build_id: manifest.build_id,
                manifest_version: manifest.version,
                requested_permissions: manifest.requested_permissions,
                devices,
                companion,
                source_maps: SourceMaps {
                    device: manifest.device_source_maps,
                    companion: manifest.companion_source_map,
                },
            },
            bytes,
        );

        tracing::debug!(
            app_id = %package.app_id(),
            build_id = %package.build_id(),
            devices = package.devices().len(),
            companion = package.companion().is_some(),
            "decoded artifact"
        );
        Ok(package)
    }

    fn read_bundle(&self, archive: &mut Archive<'_>, filename: &str) -> DecodeResult<ComponentBundle> {
        let bytes = archive.read_entry(filename)?;
        ArchiveLayout::inspect(&bytes, &self.limits).map_err(|source| {
            DecodeError::InvalidComponent {
                filename: filename.to_string(),
                source: Box::new(source),
            }
        })?;
        Ok(ComponentBundle::new(filename, bytes))
    }
}

impl PackageDecoder for ArtifactDecoder {
    fn decode(&self, bytes: &[u8]) -> DecodeResult<Package> {
        ArtifactDecoder::decode(self, bytes)
    }
}

/// Decode an artifact with default limits.
pub fn decode(bytes: &[u8]) -> DecodeResult<Package> {
    ArtifactDecoder::default().decode(bytes)
}
