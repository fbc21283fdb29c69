//! # Verify Subcommand
//!
//! Decodes each artifact given on the command line and prints one line per
//! file: `OK` with the package identity, or `FAIL` with the rejection reason
//! and, when known, the byte offset. Exits non-zero if any file fails.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use fba_context::ContextConfig;
use fba_pack::{ArtifactDecoder, Package};

use crate::describe_blob;

/// Arguments for the `fba verify` subcommand.
#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Artifacts to check.
    #[arg(value_name = "ARTIFACT", required = true)]
    pub artifacts: Vec<PathBuf>,
}

/// Result of checking one artifact.
#[derive(Debug)]
pub enum Verdict {
    /// The artifact decoded.
    Ok(Package),
    /// The artifact was rejected.
    Fail {
        /// Why.
        reason: String,
        /// Byte offset of the violation, if known.
        offset: Option<u64>,
    },
}

impl Verdict {
    /// Whether the artifact passed.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Execute the verify subcommand.
pub fn run_verify(args: &VerifyArgs, config: &ContextConfig) -> Result<u8> {
    let decoder = config.decoder();
    let mut failures = 0usize;
    for path in &args.artifacts {
        let verdict = verify_artifact(path, &decoder);
        if !verdict.is_ok() {
            failures += 1;
        }
        println!("{}", render_verdict(path, &verdict));
    }

    if failures > 0 {
        tracing::warn!(failures, total = args.artifacts.len(), "verification failed");
        Ok(1)
    } else {
        Ok(0)
    }
}

/// Read and decode one artifact.
pub fn verify_artifact(path: &Path, decoder: &ArtifactDecoder) -> Verdict {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => {
            return Verdict::Fail {
                reason: format!("cannot read file: {e}"),
                offset: None,
            }
        }
    };
    match decoder.decode(&bytes) {
        Ok(package) => Verdict::Ok(package),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "artifact rejected");
            Verdict::Fail {
                reason: e.reason(),
                offset: e.offset(),
            }
        }
    }
}

/// One output line for `path`.
pub fn render_verdict(path: &Path, verdict: &Verdict) -> String {
    match verdict {
        Verdict::Ok(package) => format!(
            "OK   {}: {package} ({})",
            path.display(),
            describe_blob(package.artifact_size(), package.artifact_digest())
        ),
        Verdict::Fail {
            reason,
            offset: Some(offset),
        } => format!("FAIL {}: {reason} [offset {offset}]", path.display()),
        Verdict::Fail {
            reason,
            offset: None,
        } => format!("FAIL {}: {reason}", path.display()),
    }
}
