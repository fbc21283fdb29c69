//! Context configuration.
//!
//! Decode limits and the acquisition timeout. Defaults suit interactive
//! tooling; override via environment variables or explicit construction.

use std::str::FromStr;
use std::time::Duration;

use fba_pack::{ArtifactDecoder, DecodeLimits};

/// Environment variable overriding [`DecodeLimits::max_artifact_bytes`].
pub const ENV_MAX_ARTIFACT_BYTES: &str = "FBA_MAX_ARTIFACT_BYTES";
/// Environment variable overriding [`DecodeLimits::max_entries`].
pub const ENV_MAX_ENTRIES: &str = "FBA_MAX_ENTRIES";
/// Environment variable overriding [`DecodeLimits::max_entry_bytes`].
pub const ENV_MAX_ENTRY_BYTES: &str = "FBA_MAX_ENTRY_BYTES";
/// Environment variable setting the read timeout in whole seconds.
pub const ENV_READ_TIMEOUT_SECS: &str = "FBA_READ_TIMEOUT_SECS";

/// Configuration for a [`PackageContext`](crate::PackageContext).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextConfig {
    /// Limits applied by the default decoder.
    pub limits: DecodeLimits,
    /// Upper bound on byte acquisition. `None` waits indefinitely.
    pub read_timeout: Option<Duration>,
}

impl ContextConfig {
    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `FBA_MAX_ARTIFACT_BYTES` (default: 64 MiB)
    /// - `FBA_MAX_ENTRIES` (default: 4096)
    /// - `FBA_MAX_ENTRY_BYTES` (default: 32 MiB)
    /// - `FBA_READ_TIMEOUT_SECS` (default: no timeout)
    ///
    /// An unset variable keeps its default; a set but unparsable one is an
    /// error rather than being silently ignored.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = DecodeLimits::default();
        let limits = DecodeLimits {
            max_artifact_bytes: parse_var(&lookup, ENV_MAX_ARTIFACT_BYTES)?
                .unwrap_or(defaults.max_artifact_bytes),
            max_entries: parse_var(&lookup, ENV_MAX_ENTRIES)?.unwrap_or(defaults.max_entries),
            max_entry_bytes: parse_var(&lookup, ENV_MAX_ENTRY_BYTES)?
                .unwrap_or(defaults.max_entry_bytes),
        };
        let read_timeout = parse_var::<u64>(&lookup, ENV_READ_TIMEOUT_SECS)?.map(Duration::from_secs);
        Ok(Self {
            limits,
            read_timeout,
        })
    }

    /// Set the read timeout.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// The artifact decoder these settings describe.
    pub fn decoder(&self) -> ArtifactDecoder {
        ArtifactDecoder::new(self.limits)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                name: name.to_string(),
                value: raw.clone(),
                reason: e.to_string(),
            }),
    }
}

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set to a value that does not parse.
    #[error("invalid value {value:?} for {name}: {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: String,
    },
}
