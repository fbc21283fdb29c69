//! # fba-core — Foundational Types for the App Artifact Loader
//!
//! Defines the primitives shared by the decoder and the package context.
//! It depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** [`AppId`], [`BuildId`] and
//!    [`Origin`] are distinct types. A build identifier cannot be passed where
//!    an app identifier is expected, and string identifiers are validated at
//!    construction.
//!
//! 2. **Tagged digests.** Every digest carries its [`DigestAlgorithm`] so the
//!    verifying side knows which hash function produced it.
//!
//! ## Crate Policy
//!
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod digest;
pub mod error;
pub mod identity;

// Re-export primary types for ergonomic imports.
pub use digest::{sha256_digest, ContentDigest, DigestAlgorithm};
pub use error::ValidationError;
pub use identity::{AppId, BuildId, Origin};
