//! # Identity Newtypes
//!
//! Identifiers carried by a decoded package and by the context that holds it.
//!
//! ## Validation
//!
//! [`AppId`] wraps a UUID and is valid by construction once parsed.
//! [`BuildId`] validates the `0x` + 16 hex digit format and stores it in
//! lower case, so two spellings of the same build compare equal.
//! [`Origin`] is an opaque locator; the only rule is that it is non-empty
//! when parsed from user input.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

// ---------------------------------------------------------------------------
// AppId
// ---------------------------------------------------------------------------

/// The unique identifier of a packaged application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(Uuid);

impl AppId {
    /// Parse an app identifier from its hyphenated string form.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| ValidationError::InvalidAppId(s.to_string()))
    }
}

impl FromStr for AppId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// BuildId
// ---------------------------------------------------------------------------

/// Number of hex digits following the `0x` prefix of a build identifier.
pub const BUILD_ID_HEX_DIGITS: usize = 16;

/// A build identifier: `0x` followed by 16 hex digits (a 64-bit value).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BuildId(String);

impl BuildId {
    /// Parse and normalize a build identifier.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| ValidationError::InvalidBuildId(s.to_string()))?;
        if digits.len() != BUILD_ID_HEX_DIGITS || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ValidationError::InvalidBuildId(s.to_string()));
        }
        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// The normalized string form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The numeric value of the build identifier.
    pub fn value(&self) -> u64 {
        // Format was checked in `parse`, so this cannot fail.
        u64::from_str_radix(&self.0[2..], 16).unwrap_or_default()
    }
}

impl TryFrom<String> for BuildId {
    type Error = ValidationError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<BuildId> for String {
    fn from(id: BuildId) -> Self {
        id.0
    }
}

impl FromStr for BuildId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for BuildId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Origin
// ---------------------------------------------------------------------------

/// An opaque locator naming where an artifact's bytes came from.
///
/// The context never interprets it; byte sources may (a filesystem source
/// treats it as a path).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Origin(String);

impl Origin {
    /// Create an origin from any string-like value.
    pub fn new(locator: impl Into<String>) -> Self {
        Self(locator.into())
    }

    /// Parse an origin from user input, rejecting empty locators.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if s.trim().is_empty() {
            return Err(ValidationError::EmptyOrigin);
        }
        Ok(Self(s.to_string()))
    }

    /// The locator as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The locator interpreted as a filesystem path.
    pub fn as_path(&self) -> &Path {
        Path::new(&self.0)
    }
}

impl From<&str> for Origin {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Origin {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&Path> for Origin {
    fn from(p: &Path) -> Self {
        Self(p.to_string_lossy().into_owned())
    }
}

impl From<PathBuf> for Origin {
    fn from(p: PathBuf) -> Self {
        Self::from(p.as_path())
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
