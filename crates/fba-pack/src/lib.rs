//! # fba-pack — Artifact Decoder
//!
//! Turns the bytes of a packaged application (`.fba`) into an immutable
//! [`Package`]. An artifact is a ZIP archive holding `manifest.json`, one
//! bundle per targeted device family, an optional companion bundle, and
//! optional source maps.
//!
//! - **Archive** (`archive.rs`): structural walk of the ZIP container with
//!   byte offsets on every failure.
//! - **Manifest** (`manifest.rs`): schema and consistency checks of
//!   `manifest.json`.
//! - **Decoder** (`decoder.rs`): the validate-then-extract pipeline and the
//!   [`PackageDecoder`] seam.
//! - **Package** (`package.rs`): the decoded value.
//!
//! ## Crate Policy
//!
//! - Decoding is pure: no I/O, no shared state, deterministic output.
//! - Untrusted input never panics; every rejection is a [`DecodeError`].

pub mod archive;
pub mod decoder;
pub mod error;
mod manifest;
pub mod package;

#[cfg(any(test, feature = "test-support"))]
pub mod fixture;

pub use archive::ArchiveLayout;
pub use decoder::{decode, ArtifactDecoder, DecodeLimits, PackageDecoder, MANIFEST_ENTRY};
pub use error::{DecodeError, DecodeResult};
pub use manifest::SUPPORTED_MANIFEST_VERSION;
pub use package::{ComponentBundle, DeviceComponent, Package, SourceMaps};
