//! Load observers.
//!
//! An ordered, append-only list of callbacks fired after each committed
//! load. Notification walks a snapshot of the list, so a callback may attach
//! further observers (they fire from the next load on) or read the context
//! without deadlocking.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::context::LoadedPackage;

/// A callback fired after a successful load.
pub type LoadObserver = Arc<dyn Fn(&LoadedPackage) + Send + Sync>;

/// Ordered, append-only observer list.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: RwLock<Vec<LoadObserver>>,
}

impl ObserverRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a callback. Callbacks fire in attach order.
    pub fn attach<F>(&self, callback: F)
    where
        F: Fn(&LoadedPackage) + Send + Sync + 'static,
    {
        self.observers.write().push(Arc::new(callback));
    }

    pub(crate) fn push(&self, observer: LoadObserver) {
        self.observers.write().push(observer);
    }

    /// Number of attached callbacks.
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Whether no callbacks are attached.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every callback once with `loaded`, returning how many fired.
    pub fn notify(&self, loaded: &LoadedPackage) -> usize {
        let snapshot: Vec<LoadObserver> = self.observers.read().clone();
        for observer in &snapshot {
            observer(loaded);
        }
        snapshot.len()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}
