//! # Error Types
//!
//! Validation errors raised when constructing identifier newtypes. Each
//! variant carries the rejected input and the expected format so a broken
//! manifest can be diagnosed from the message alone.

use thiserror::Error;

/// Validation errors for identifier newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// App identifier is not a UUID.
    #[error("invalid app id: \"{0}\" (expected a UUID)")]
    InvalidAppId(String),

    /// Build identifier does not match `0x` followed by 16 hex digits.
    #[error("invalid build id: \"{0}\" (expected 0x followed by 16 hex digits)")]
    InvalidBuildId(String),

    /// An origin must name something.
    #[error("origin must not be empty")]
    EmptyOrigin,
}
