//! # Package Context
//!
//! Holds the currently active [`Package`] and the [`Origin`] it was loaded
//! from, and runs the load protocol:
//!
//! 1. Acquire bytes from the [`ByteSource`] (the only suspension point).
//! 2. Decode them with the [`PackageDecoder`].
//! 3. Commit the (package, origin) pair in a single write.
//! 4. Notify observers, in attach order, after the commit.
//!
//! Any failure in steps 1–2 is returned verbatim and leaves the context
//! exactly as it was; observers do not fire. There is no unload: once a
//! package is loaded the context only ever moves to another loaded state.
//!
//! ## Concurrency
//!
//! Loads are serialized by an async gate held for the whole sequence, so
//! overlapping `load` calls run one after another in arrival order. The
//! committed pair sits behind a `parking_lot::RwLock` that is never held
//! across an `.await`; readers never wait on the gate.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

use fba_core::Origin;
use fba_pack::{ArtifactDecoder, DecodeError, Package, PackageDecoder};

use crate::config::ContextConfig;
use crate::observer::{LoadObserver, ObserverRegistry};
use crate::source::ByteSource;

/// A committed package together with the origin it was loaded from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedPackage {
    package: Arc<Package>,
    origin: Origin,
}

impl LoadedPackage {
    /// The loaded package.
    pub fn package(&self) -> &Arc<Package> {
        &self.package
    }

    /// Where the package's bytes came from.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }
}

/// Why a load failed. The context's state is unchanged in every case.
#[derive(Debug, thiserror::Error)]
pub enum LoadError<E> {
    /// The byte source failed; its error is carried unchanged.
    #[error("failed to read artifact")]
    Source(#[source] E),

    /// The bytes were read but are not a valid artifact.
    #[error("failed to decode artifact")]
    Decode(#[source] DecodeError),

    /// The byte source did not answer within the configured timeout.
    #[error("timed out after {timeout:?} reading artifact from {origin}")]
    TimedOut { origin: Origin, timeout: Duration },
}

impl<E> LoadError<E> {
    /// The decode failure, if decoding is what failed.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match self {
            Self::Decode(e) => Some(e),
            _ => None,
        }
    }

    /// The byte source's error, if acquisition is what failed.
    pub fn source_error(&self) -> Option<&E> {
        match self {
            Self::Source(e) => Some(e),
            _ => None,
        }
    }
}

/// Owner of the active package.
pub struct PackageContext<S, D = ArtifactDecoder> {
    source: S,
    decoder: D,
    read_timeout: Option<Duration>,
    current: RwLock<Option<LoadedPackage>>,
    observers: ObserverRegistry,
    load_gate: tokio::sync::Mutex<()>,
}

impl<S: ByteSource> PackageContext<S> {
    /// An empty context using the artifact decoder with default limits.
    pub fn new(source: S) -> Self {
        Self::with_decoder(source, ArtifactDecoder::default())
    }

    /// An empty context configured from `config`.
    pub fn with_config(source: S, config: &ContextConfig) -> Self {
        let mut context = Self::with_decoder(source, config.decoder());
        context.read_timeout = config.read_timeout;
        context
    }

    /// Start building a context with pre-attached observers.
    pub fn builder(source: S) -> PackageContextBuilder<S> {
        PackageContextBuilder {
            source,
            decoder: ArtifactDecoder::default(),
            read_timeout: None,
            observers: Vec::new(),
        }
    }
}

impl<S: ByteSource, D: PackageDecoder> PackageContext<S, D> {
    /// An empty context using a specific decoder.
    pub fn with_decoder(source: S, decoder: D) -> Self {
        Self {
            source,
            decoder,
            read_timeout: None,
            current: RwLock::new(None),
            observers: ObserverRegistry::new(),
            load_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Load the artifact at `origin` and make it the active package.
    ///
    /// On success the new package and `origin` are committed together and
    /// every observer fires once before this returns. On failure the error
    /// is returned as produced and nothing changes.
    pub async fn load(
        &self,
        origin: impl Into<Origin>,
    ) -> Result<Arc<Package>, LoadError<S::Error>> {
        let origin = origin.into();
        let _gate = self.load_gate.lock().await;

        tracing::debug!(%origin, "acquiring artifact bytes");
        let bytes = self.acquire(&origin).await?;

        let package = match self.decoder.decode(&bytes) {
            Ok(package) => Arc::new(package),
            Err(e) => {
                tracing::warn!(
                    %origin,
                    reason = %e.reason(),
                    offset = ?e.offset(),
                    "rejected artifact"
                );
                return Err(LoadError::Decode(e));
            }
        };

        let loaded = LoadedPackage {
            package: Arc::clone(&package),
            origin,
        };
        *self.current.write() = Some(loaded.clone());
        tracing::info!(
            app_id = %package.app_id(),
            build_id = %package.build_id(),
            origin = %loaded.origin,
            "loaded package"
        );

        let fired = self.observers.notify(&loaded);
        tracing::debug!(observers = fired, "notified load observers");
        Ok(package)
    }

    async fn acquire(&self, origin: &Origin) -> Result<Vec<u8>, LoadError<S::Error>> {
        let read = self.source.read(origin);
        let result = match self.read_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, read).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(%origin, ?timeout, "artifact read timed out");
                    return Err(LoadError::TimedOut {
                        origin: origin.clone(),
                        timeout,
                    });
                }
            },
            None => read.await,
        };
        result.map_err(|e| {
            tracing::warn!(%origin, error = %e, "artifact read failed");
            LoadError::Source(e)
        })
    }
}

impl<S, D> PackageContext<S, D> {
    /// Register a callback fired after every successful load.
    pub fn attach<F>(&self, callback: F)
    where
        F: Fn(&LoadedPackage) + Send + Sync + 'static,
    {
        self.observers.attach(callback);
    }

    /// The active package, if any.
    pub fn current_package(&self) -> Option<Arc<Package>> {
        self.current.read().as_ref().map(|l| Arc::clone(&l.package))
    }

    /// The origin of the active package, if any.
    pub fn current_origin(&self) -> Option<Origin> {
        self.current.read().as_ref().map(|l| l.origin.clone())
    }

    /// The active package and its origin, read together.
    pub fn snapshot(&self) -> Option<LoadedPackage> {
        self.current.read().clone()
    }

    /// Whether a package has been loaded.
    pub fn is_loaded(&self) -> bool {
        self.current.read().is_some()
    }

    /// Number of attached observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// The read timeout in effect.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.read_timeout
    }

    /// The byte source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// The decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}

impl<S, D> fmt::Debug for PackageContext<S, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let current = self.snapshot();
        f.debug_struct("PackageContext")
            .field("origin", &current.as_ref().map(|l| l.origin.as_str().to_string()))
            .field(
                "package",
                &current.as_ref().map(|l| l.package.to_string()),
            )
            .field("observers", &self.observers.len())
            .field("read_timeout", &self.read_timeout)
            .finish()
    }
}

/// Builder for a [`PackageContext`].
pub struct PackageContextBuilder<S, D = ArtifactDecoder> {
    source: S,
    decoder: D,
    read_timeout: Option<Duration>,
    observers: Vec<LoadObserver>,
}

impl<S> PackageContextBuilder<S, ArtifactDecoder> {
    /// Apply decode limits and read timeout from `config`.
    pub fn config(mut self, config: &ContextConfig) -> Self {
        self.decoder = config.decoder();
        self.read_timeout = config.read_timeout;
        self
    }
}

impl<S, D> PackageContextBuilder<S, D> {
    /// Replace the decoder.
    pub fn decoder<D2>(self, decoder: D2) -> PackageContextBuilder<S, D2> {
        PackageContextBuilder {
            source: self.source,
            decoder,
            read_timeout: self.read_timeout,
            observers: self.observers,
        }
    }

    /// Bound byte acquisition by `timeout`.
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = Some(timeout);
        self
    }

    /// Pre-attach an observer. Observers fire in the order given.
    pub fn observer<F>(mut self, callback: F) -> Self
    where
        F: Fn(&LoadedPackage) + Send + Sync + 'static,
    {
        self.observers.push(Arc::new(callback));
        self
    }

    /// Build an empty context.
    pub fn build(self) -> PackageContext<S, D>
    where
        S: ByteSource,
        D: PackageDecoder,
    {
        let mut context = PackageContext::with_decoder(self.source, self.decoder);
        context.read_timeout = self.read_timeout;
        for observer in self.observers {
            context.observers.push(observer);
        }
        context
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemoryByteSource, MemorySourceError};
    use fba_pack::fixture::ArtifactBuilder;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn source_with(origin: &str) -> MemoryByteSource {
        let source = MemoryByteSource::new();
        source.insert(origin, ArtifactBuilder::new().build().unwrap());
        source
    }

    #[tokio::test]
    async fn new_context_is_empty() {
        let context = PackageContext::new(MemoryByteSource::new());
        assert!(!context.is_loaded());
        assert!(context.current_package().is_none());
        assert!(context.current_origin().is_none());
        assert!(context.snapshot().is_none());
    }

    #[tokio::test]
    async fn load_commits_package_and_origin() {
        let context = PackageContext::new(source_with("app.fba"));
        let package = context.load("app.fba").await.unwrap();
        let snapshot = context.snapshot().unwrap();
        assert!(Arc::ptr_eq(snapshot.package(), &package));
        assert_eq!(snapshot.origin(), &Origin::new("app.fba"));
        assert_eq!(package.app_id().to_string(), ArtifactBuilder::APP_ID);
    }

    #[tokio::test]
    async fn missing_origin_is_a_source_error() {
        let context = PackageContext::new(MemoryByteSource::new());
        let err = context.load("nope.fba").await.unwrap_err();
        assert_eq!(
            err.source_error(),
            Some(&MemorySourceError::NotFound(Origin::new("nope.fba")))
        );
        assert!(err.decode_error().is_none());
        assert!(!context.is_loaded());
    }

    #[tokio::test]
    async fn builder_observers_fire_in_order() {
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let (first, second) = (Arc::clone(&order), Arc::clone(&order));
        let context = PackageContext::builder(source_with("app.fba"))
            .observer(move |_| first.lock().push(1))
            .observer(move |_| second.lock().push(2))
            .build();
        assert_eq!(context.observer_count(), 2);

        context.load("app.fba").await.unwrap();
        assert_eq!(*order.lock(), vec![1, 2]);
    }

    #[tokio::test]
    async fn observer_may_attach_during_notification() {
        let context = Arc::new(PackageContext::new(source_with("app.fba")));
        let late = Arc::new(AtomicUsize::new(0));
        let weak = Arc::downgrade(&context);
        let counter = Arc::clone(&late);
        context.attach(move |_| {
            if let Some(context) = weak.upgrade() {
                let counter = Arc::clone(&counter);
                context.attach(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                });
            }
        });

        context.load("app.fba").await.unwrap();
        assert_eq!(late.load(Ordering::SeqCst), 0);
        assert_eq!(context.observer_count(), 2);

        context.load("app.fba").await.unwrap();
        assert_eq!(late.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn observer_reads_committed_state() {
        let context = Arc::new(PackageContext::new(source_with("app.fba")));
        let seen = Arc::new(parking_lot::Mutex::new(None));
        let weak = Arc::downgrade(&context);
        let slot = Arc::clone(&seen);
        context.attach(move |loaded| {
            if let Some(context) = weak.upgrade() {
                *slot.lock() = Some(context.snapshot() == Some(loaded.clone()));
            }
        });
        context.load("app.fba").await.unwrap();
        assert_eq!(*seen.lock(), Some(true));
    }

    #[test]
    fn config_applies_limits_and_timeout() {
        let config = ContextConfig::default().with_read_timeout(Duration::from_secs(2));
        let context = PackageContext::with_config(MemoryByteSource::new(), &config);
        assert_eq!(context.read_timeout(), Some(Duration::from_secs(2)));
        assert_eq!(context.decoder().limits(), &config.limits);

        let built = PackageContext::builder(MemoryByteSource::new())
            .config(&config)
            .build();
        assert_eq!(built.read_timeout(), Some(Duration::from_secs(2)));
    }

    #[test]
    fn load_error_messages() {
        let err: LoadError<MemorySourceError> = LoadError::TimedOut {
            origin: Origin::new("slow.fba"),
            timeout: Duration::from_millis(5),
        };
        assert_eq!(
            err.to_string(),
            "timed out after 5ms reading artifact from slow.fba"
        );
        let err: LoadError<MemorySourceError> = LoadError::Decode(DecodeError::MissingDirectory);
        assert_eq!(err.to_string(), "failed to decode artifact");
    }
}
