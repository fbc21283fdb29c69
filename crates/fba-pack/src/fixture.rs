//! Test fixtures: build artifacts in memory.
//!
//! Available to this crate's unit tests and, through the `test-support`
//! feature, to downstream tests. Entries are written uncompressed so tests
//! can locate and tamper with their bytes.

use std::io::{Cursor, Write};

use serde_json::{json, Map, Value};
use zip::result::ZipResult;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write a ZIP archive holding `files` in order.
pub fn bundle(files: &[(&str, &[u8])]) -> ZipResult<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Stored);
    for (name, contents) in files {
        writer.start_file(*name, options)?;
        writer.write_all(contents)?;
    }
    Ok(writer.finish()?.into_inner())
}

/// Builder for artifacts with a well-formed manifest by default.
#[derive(Debug, Clone)]
pub struct ArtifactBuilder {
    app_id: String,
    build_id: String,
    manifest_version: u64,
    permissions: Vec<String>,
    devices: Vec<(String, Vec<String>)>,
    companion: bool,
    device_source_maps: Vec<(String, String)>,
    companion_source_map: Option<String>,
    manifest_override: Option<Value>,
    replaced: Vec<(String, Vec<u8>)>,
    extra: Vec<(String, Vec<u8>)>,
    omitted: Vec<String>,
}

impl Default for ArtifactBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactBuilder {
    /// App id written by default.
    pub const APP_ID: &'static str = "b4ae822e-eca9-4fcb-8747-217f2a1f53a1";
    /// Build id written by default.
    pub const BUILD_ID: &'static str = "0x0f75775f470c1585";

    /// One `higgs` device component, a companion, and `access_internet`.
    pub fn new() -> Self {
        Self {
            app_id: Self::APP_ID.to_string(),
            build_id: Self::BUILD_ID.to_string(),
            manifest_version: 6,
            permissions: vec!["access_internet".to_string()],
            devices: vec![("higgs".to_string(), vec!["27.31.1.29".to_string()])],
            companion: true,
            device_source_maps: Vec::new(),
            companion_source_map: None,
            manifest_override: None,
            replaced: Vec::new(),
            extra: Vec::new(),
            omitted: Vec::new(),
        }
    }

    /// Set the manifest `appId`.
    pub fn app_id(mut self, app_id: &str) -> Self {
        self.app_id = app_id.to_string();
        self
    }

    /// Set the manifest `buildId`.
    pub fn build_id(mut self, build_id: &str) -> Self {
        self.build_id = build_id.to_string();
        self
    }

    /// Set the manifest `manifestVersion`.
    pub fn manifest_version(mut self, version: u64) -> Self {
        self.manifest_version = version;
        self
    }

    /// Replace the requested permissions.
    pub fn permissions(mut self, permissions: &[&str]) -> Self {
        self.permissions = permissions.iter().map(|p| p.to_string()).collect();
        self
    }

    /// Add a device component and its bundle entry.
    pub fn device(mut self, family: &str, platforms: &[&str]) -> Self {
        self.devices.push((
            family.to_string(),
            platforms.iter().map(|p| p.to_string()).collect(),
        ));
        self
    }

    /// Include or drop the companion component.
    pub fn companion(mut self, include: bool) -> Self {
        self.companion = include;
        self
    }

    /// Declare and write a device source map.
    pub fn device_source_map(mut self, family: &str, path: &str) -> Self {
        self.device_source_maps
            .push((family.to_string(), path.to_string()));
        self
    }

    /// Declare and write the companion source map.
    pub fn companion_source_map(mut self, path: &str) -> Self {
        self.companion_source_map = Some(path.to_string());
        self
    }

    /// Write `manifest` verbatim instead of the generated manifest.
    pub fn manifest_json(mut self, manifest: Value) -> Self {
        self.manifest_override = Some(manifest);
        self
    }

    /// Write `contents` in place of a generated entry.
    pub fn replace_entry(mut self, name: &str, contents: Vec<u8>) -> Self {
        self.replaced.push((name.to_string(), contents));
        self
    }

    /// Append an entry the manifest does not mention.
    pub fn entry(mut self, name: &str, contents: Vec<u8>) -> Self {
        self.extra.push((name.to_string(), contents));
        self
    }

    /// Skip writing a generated entry while still declaring it.
    pub fn omit_entry(mut self, name: &str) -> Self {
        self.omitted.push(name.to_string());
        self
    }

    /// The manifest document this builder writes.
    pub fn manifest(&self) -> Value {
        if let Some(manifest) = &self.manifest_override {
            return manifest.clone();
        }

        let mut watch = Map::new();
        for (family, platforms) in &self.devices {
            watch.insert(
                family.clone(),
                json!({ "filename": device_filename(family), "platform": platforms }),
            );
        }
        let mut components = json!({ "watch": watch });
        if self.companion {
            components["companion"] = json!({ "filename": "companion.zip" });
        }

        let mut manifest = json!({
            "manifestVersion": self.manifest_version,
            "appId": self.app_id,
            "buildId": self.build_id,
            "requestedPermissions": self.permissions,
            "components": components,
        });

        if !self.device_source_maps.is_empty() || self.companion_source_map.is_some() {
            let device: Map<String, Value> = self
                .device_source_maps
                .iter()
                .map(|(family, path)| (family.clone(), Value::String(path.clone())))
                .collect();
            let mut source_maps = json!({ "device": device });
            if let Some(path) = &self.companion_source_map {
                source_maps["companion"] = Value::String(path.clone());
            }
            manifest["sourceMaps"] = source_maps;
        }
        manifest
    }

    /// Write the artifact.
    pub fn build(&self) -> ZipResult<Vec<u8>> {
        let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

        let manifest = serde_json::to_vec_pretty(&self.manifest()).map_err(std::io::Error::from)?;
        entries.push(("manifest.json".to_string(), manifest));

        for (family, _) in &self.devices {
            let script = format!("// device entry point for {family}\n");
            let contents = bundle(&[
                ("manifest.json", &br#"{"appType":"app"}"#[..]),
                ("app/index.js", script.as_bytes()),
            ])?;
            entries.push((device_filename(family), contents));
        }
        if self.companion {
            let contents = bundle(&[("companion/index.js", b"// companion\n")])?;
            entries.push(("companion.zip".to_string(), contents));
        }
        for (_, path) in &self.device_source_maps {
            entries.push((path.clone(), br#"{"version":3}"#.to_vec()));
        }
        if let Some(path) = &self.companion_source_map {
            entries.push((path.clone(), br#"{"version":3}"#.to_vec()));
        }

        for (name, contents) in &self.replaced {
            if let Some(slot) = entries.iter_mut().find(|(n, _)| n == name) {
                slot.1 = contents.clone();
            }
        }
        entries.retain(|(name, _)| !self.omitted.contains(name));
        entries.extend(self.extra.iter().cloned());

        let files: Vec<(&str, &[u8])> = entries
            .iter()
            .map(|(name, contents)| (name.as_str(), contents.as_slice()))
            .collect();
        bundle(&files)
    }
}

fn device_filename(family: &str) -> String {
    format!("device-{family}.zip")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_manifest_shape() {
        let manifest = ArtifactBuilder::new().manifest();
        assert_eq!(manifest["manifestVersion"], 6);
        assert_eq!(manifest["appId"], ArtifactBuilder::APP_ID);
        assert_eq!(
            manifest["components"]["watch"]["higgs"]["filename"],
            "device-higgs.zip"
        );
        assert_eq!(manifest["components"]["companion"]["filename"], "companion.zip");
        assert!(manifest.get("sourceMaps").is_none());
    }

    #[test]
    fn build_starts_with_local_header() {
        let bytes = ArtifactBuilder::new().build().unwrap();
        assert_eq!(&bytes[..4], b"PK\x03\x04");
    }
}
