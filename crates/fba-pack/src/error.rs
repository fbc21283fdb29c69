//! Decode error types.
//!
//! Every way an artifact can be rejected has its own variant. Structural
//! failures carry the byte offset at which the violation was found so a
//! broken artifact can be located with a hex dump.

use thiserror::Error;

/// Errors produced while decoding an artifact.
///
/// `Clone` and `PartialEq` so callers (and tests) can compare failures:
/// decoding the same bytes twice yields equal errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The buffer ends before a required structure.
    #[error("artifact truncated: needed {needed} bytes, got {actual}")]
    Truncated {
        /// Minimum length required to continue.
        needed: u64,
        /// Actual buffer length.
        actual: u64,
    },

    /// A record signature did not match.
    #[error("bad {record} signature at offset {offset}: expected {expected:#010x}, found {found:#010x}")]
    BadMagic {
        /// Which record was expected.
        record: &'static str,
        /// Offset of the signature.
        offset: u64,
        /// Expected little-endian signature.
        expected: u32,
        /// Signature actually present.
        found: u32,
    },

    /// No end-of-central-directory record in the trailing search window.
    #[error("end of central directory record not found")]
    MissingDirectory,

    /// A declared length or count disagrees with the buffer.
    #[error("{field} at offset {offset} declares {declared}, but the artifact has {actual}")]
    LengthMismatch {
        /// Offset of the declaring field.
        offset: u64,
        /// Name of the declaring field.
        field: &'static str,
        /// Value declared by the artifact.
        declared: u64,
        /// Value implied by the buffer.
        actual: u64,
    },

    /// Archive uses a feature this decoder does not accept.
    #[error("unsupported archive feature at offset {offset}: {feature}")]
    Unsupported {
        /// Offset of the record using the feature.
        offset: u64,
        /// Feature name.
        feature: &'static str,
    },

    /// Two central directory records share a name.
    #[error("duplicate entry {name:?} at offset {offset}")]
    DuplicateEntry {
        /// The repeated name.
        name: String,
        /// Offset of the second record.
        offset: u64,
    },

    /// Entry name is not valid UTF-8.
    #[error("entry name at offset {offset} is not valid UTF-8")]
    InvalidEntryName {
        /// Offset of the name bytes.
        offset: u64,
    },

    /// A configured decode limit was exceeded.
    #[error("{limit_name} exceeded: limit {limit}, got {actual}")]
    LimitExceeded {
        /// Which limit.
        limit_name: &'static str,
        /// Configured limit.
        limit: u64,
        /// Observed value.
        actual: u64,
    },

    /// A required entry is absent.
    #[error("missing entry {name:?}")]
    MissingEntry {
        /// The entry path.
        name: String,
    },

    /// Entry contents failed decompression or CRC-32 verification.
    #[error("corrupt entry {entry:?} (local header at offset {offset}): {reason}")]
    CorruptEntry {
        /// The entry path.
        entry: String,
        /// Offset of the entry's local header.
        offset: u64,
        /// Underlying failure.
        reason: String,
    },

    /// Archive rejected by the ZIP reader for a reason not classified above.
    #[error("malformed archive: {reason}")]
    Archive {
        /// Reader diagnostic.
        reason: String,
    },

    /// `manifest.json` is malformed or violates a manifest rule.
    #[error("invalid manifest: {reason}")]
    Manifest {
        /// What is wrong.
        reason: String,
    },

    /// Manifest declares a format revision this decoder does not read.
    #[error("unsupported manifest version {found} (supported: {supported})")]
    UnsupportedManifestVersion {
        /// Declared version.
        found: u64,
        /// The one supported version.
        supported: u64,
    },

    /// A component bundle inside the artifact is itself malformed.
    #[error("component bundle {filename:?} is invalid: {source}")]
    InvalidComponent {
        /// Entry path of the bundle.
        filename: String,
        /// Why the bundle was rejected.
        #[source]
        source: Box<DecodeError>,
    },
}

impl DecodeError {
    /// Byte offset of the violation, when one is determinable.
    ///
    /// For [`DecodeError::InvalidComponent`] this is the offset inside the
    /// nested bundle.
    pub fn offset(&self) -> Option<u64> {
        match self {
            Self::Truncated { actual, .. } => Some(*actual),
            Self::BadMagic { offset, .. }
            | Self::LengthMismatch { offset, .. }
            | Self::Unsupported { offset, .. }
            | Self::DuplicateEntry { offset, .. }
            | Self::InvalidEntryName { offset }
            | Self::CorruptEntry { offset, .. } => Some(*offset),
            Self::InvalidComponent { source, .. } => source.offset(),
            Self::MissingDirectory
            | Self::LimitExceeded { .. }
            | Self::MissingEntry { .. }
            | Self::Archive { .. }
            | Self::Manifest { .. }
            | Self::UnsupportedManifestVersion { .. } => None,
        }
    }

    /// Human-readable reason for the rejection.
    pub fn reason(&self) -> String {
        self.to_string()
    }

    pub(crate) fn manifest(reason: impl Into<String>) -> Self {
        Self::Manifest {
            reason: reason.into(),
        }
    }
}

/// Result type alias for decode operations.
pub type DecodeResult<T> = Result<T, DecodeError>;
