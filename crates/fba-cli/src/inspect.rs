//! # Inspect Subcommand
//!
//! Loads one artifact through a [`PackageContext`] backed by the filesystem
//! and prints a summary of the committed package, or a JSON report with
//! `--json`.

use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use fba_context::{ContextConfig, FsByteSource, LoadedPackage, PackageContext};
use fba_pack::{ComponentBundle, Package};

use crate::describe_blob;

/// Arguments for the `fba inspect` subcommand.
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Path to the artifact.
    #[arg(value_name = "ARTIFACT")]
    pub artifact: PathBuf,

    /// Print a JSON report instead of a text summary.
    #[arg(long)]
    pub json: bool,
}

/// Execute the inspect subcommand.
pub fn run_inspect(args: &InspectArgs, config: &ContextConfig) -> Result<u8> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;
    let loaded = runtime.block_on(load(args, config))?;

    let output = if args.json {
        serde_json::to_string_pretty(&InspectReport::new(&loaded))
            .context("failed to serialize inspect report")?
    } else {
        render_summary(&loaded)
    };
    println!("{output}");
    Ok(0)
}

async fn load(args: &InspectArgs, config: &ContextConfig) -> Result<LoadedPackage> {
    let context = PackageContext::with_config(FsByteSource::new(), config);
    context
        .load(args.artifact.clone())
        .await
        .with_context(|| format!("failed to load {}", args.artifact.display()))?;
    context
        .snapshot()
        .context("context holds no package after a successful load")
}

/// Human-readable summary of a loaded package.
pub fn render_summary(loaded: &LoadedPackage) -> String {
    let package = loaded.package();
    let mut out = String::new();
    let _ = writeln!(out, "origin:       {}", loaded.origin());
    let _ = writeln!(out, "app id:       {}", package.app_id());
    let _ = writeln!(out, "build id:     {}", package.build_id());
    let _ = writeln!(out, "manifest:     v{}", package.manifest_version());
    let _ = writeln!(
        out,
        "artifact:     {}",
        describe_blob(package.artifact_size(), package.artifact_digest())
    );
    let permissions = if package.requested_permissions().is_empty() {
        "(none)".to_string()
    } else {
        package.requested_permissions().join(", ")
    };
    let _ = writeln!(out, "permissions:  {permissions}");

    for (family, device) in package.devices() {
        let _ = writeln!(
            out,
            "device {family}: {} [{}]",
            describe_bundle(device.bundle()),
            device.platforms().join(", ")
        );
    }
    match package.companion() {
        Some(bundle) => {
            let _ = writeln!(out, "companion:    {}", describe_bundle(bundle));
        }
        None => {
            let _ = writeln!(out, "companion:    (none)");
        }
    }

    let maps = package.source_maps();
    for (family, path) in &maps.device {
        let _ = writeln!(out, "source map {family}: {path}");
    }
    if let Some(path) = &maps.companion {
        let _ = writeln!(out, "source map companion: {path}");
    }
    out.trim_end().to_string()
}

fn describe_bundle(bundle: &ComponentBundle) -> String {
    format!(
        "{} {}",
        bundle.filename(),
        describe_blob(bundle.size(), bundle.digest())
    )
}

/// JSON form of `fba inspect --json`.
#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub origin: String,
    pub app_id: String,
    pub build_id: String,
    pub manifest_version: u64,
    pub artifact_size: u64,
    pub artifact_digest: String,
    pub requested_permissions: Vec<String>,
    pub devices: Vec<DeviceReport>,
    pub companion: Option<BundleReport>,
    pub source_maps: fba_pack::SourceMaps,
}

/// One device component in an [`InspectReport`].
#[derive(Debug, Serialize)]
pub struct DeviceReport {
    pub family: String,
    pub platforms: Vec<String>,
    pub bundle: BundleReport,
}

/// One component bundle in an [`InspectReport`].
#[derive(Debug, Serialize)]
pub struct BundleReport {
    pub filename: String,
    pub size: u64,
    pub digest: String,
}

impl BundleReport {
    fn new(bundle: &ComponentBundle) -> Self {
        Self {
            filename: bundle.filename().to_string(),
            size: bundle.size(),
            digest: bundle.digest().to_string(),
        }
    }
}

impl InspectReport {
    /// Build the report for a committed package.
    pub fn new(loaded: &LoadedPackage) -> Self {
        let package: &Package = loaded.package();
        Self {
            origin: loaded.origin().to_string(),
            app_id: package.app_id().to_string(),
            build_id: package.build_id().to_string(),
            manifest_version: package.manifest_version(),
            artifact_size: package.artifact_size(),
            artifact_digest: package.artifact_digest().to_string(),
            requested_permissions: package.requested_permissions().to_vec(),
            devices: package
                .devices()
                .iter()
                .map(|(family, device)| DeviceReport {
                    family: family.clone(),
                    platforms: device.platforms().to_vec(),
                    bundle: BundleReport::new(device.bundle()),
                })
                .collect(),
            companion: package.companion().map(BundleReport::new),
            source_maps: package.source_maps().clone(),
        }
    }
}
