//! # fba-cli — CLI for Packaged App Artifacts
//!
//! Provides the `fba` command-line interface.
//!
//! ## Subcommands
//!
//! - `fba inspect` — Load an artifact through a package context and print
//!   what it contains.
//! - `fba verify` — Check one or more artifacts and report every rejection
//!   with its reason and byte offset.
//!
//! ```bash
//! fba inspect build/app.fba
//! fba inspect build/app.fba --json
//! fba -v verify build/*.fba
//! ```
//!
//! Decode limits and the read timeout come from the `FBA_*` environment
//! variables (see [`fba_context::ContextConfig::from_env`]).

pub mod inspect;
pub mod verify;

use fba_core::ContentDigest;

/// Render a byte count with its digest, as shown by every subcommand.
pub fn describe_blob(size: u64, digest: &ContentDigest) -> String {
    format!("{size} bytes {digest}")
}
