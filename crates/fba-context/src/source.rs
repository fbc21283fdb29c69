//! # Byte Sources
//!
//! Where artifact bytes come from. The context never touches storage itself;
//! it asks a [`ByteSource`] for the bytes behind an [`Origin`] and passes any
//! failure back to its caller unchanged.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use fba_core::Origin;

/// Asynchronous provider of raw artifact bytes.
#[async_trait]
pub trait ByteSource: Send + Sync {
    /// The source's own failure type, surfaced verbatim by
    /// [`LoadError::Source`](crate::LoadError::Source).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Read every byte of the artifact at `origin`.
    async fn read(&self, origin: &Origin) -> Result<Vec<u8>, Self::Error>;
}

/// Reads artifacts from the local filesystem.
///
/// Relative origins resolve against the configured root, or against the
/// process working directory when there is none.
#[derive(Debug, Clone, Default)]
pub struct FsByteSource {
    root: Option<PathBuf>,
}

impl FsByteSource {
    /// A source resolving relative origins against the working directory.
    pub fn new() -> Self {
        Self { root: None }
    }

    /// A source resolving relative origins against `root`.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    /// The path `origin` resolves to.
    pub fn resolve(&self, origin: &Origin) -> PathBuf {
        let path = origin.as_path();
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl From<&Path> for FsByteSource {
    fn from(root: &Path) -> Self {
        Self::with_root(root)
    }
}

#[async_trait]
impl ByteSource for FsByteSource {
    type Error = std::io::Error;

    async fn read(&self, origin: &Origin) -> Result<Vec<u8>, Self::Error> {
        let path = self.resolve(origin);
        tracing::trace!(path = %path.display(), "reading artifact from filesystem");
        tokio::fs::read(&path).await
    }
}

/// In-memory byte source keyed by origin.
#[derive(Debug, Default)]
pub struct MemoryByteSource {
    artifacts: RwLock<HashMap<Origin, Vec<u8>>>,
}

impl MemoryByteSource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `bytes` under `origin`, returning what was there before.
    pub fn insert(&self, origin: impl Into<Origin>, bytes: Vec<u8>) -> Option<Vec<u8>> {
        self.artifacts.write().insert(origin.into(), bytes)
    }

    /// Forget the artifact at `origin`.
    pub fn remove(&self, origin: &Origin) -> Option<Vec<u8>> {
        self.artifacts.write().remove(origin)
    }

    /// Number of stored artifacts.
    pub fn len(&self) -> usize {
        self.artifacts.read().len()
    }

    /// Whether no artifacts are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl ByteSource for MemoryByteSource {
    type Error = MemorySourceError;

    async fn read(&self, origin: &Origin) -> Result<Vec<u8>, Self::Error> {
        self.artifacts
            .read()
            .get(origin)
            .cloned()
            .ok_or_else(|| MemorySourceError::NotFound(origin.clone()))
    }
}

/// Failure of a [`MemoryByteSource`] read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemorySourceError {
    /// Nothing is stored under the origin.
    #[error("no artifact stored at {0}")]
    NotFound(Origin),
}
