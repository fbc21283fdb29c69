//! # fba-context — Package Context
//!
//! The stateful half of the loader. A [`PackageContext`] acquires artifact
//! bytes through a [`ByteSource`], decodes them with a
//! [`PackageDecoder`](fba_pack::PackageDecoder), commits the resulting
//! package together with its origin, and notifies attached observers.
//!
//! ## Guarantees
//!
//! - The package and origin change together or not at all.
//! - A failed load returns the original error and changes nothing.
//! - Observers fire exactly once per successful load, after the commit, in
//!   attach order; never on failure.
//! - Overlapping loads are serialized.

pub mod config;
pub mod context;
pub mod observer;
pub mod source;

pub use config::{ConfigError, ContextConfig};
pub use context::{LoadError, LoadedPackage, PackageContext, PackageContextBuilder};
pub use observer::{LoadObserver, ObserverRegistry};
pub use source::{ByteSource, FsByteSource, MemoryByteSource, MemorySourceError};
