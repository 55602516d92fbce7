//! Dynamic<T> - A reactive value with change notifications
//!
//! `Dynamic<T>` wraps a value and provides subscription-based change
//! notification. Subscriptions can be polled synchronously or awaited.
//!
//! Backed by a `tokio::sync::watch` channel: writers never block on readers,
//! and a slow reader only ever sees the latest value.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

struct DynamicInner<T> {
    tx: watch::Sender<T>,
    /// Incremented on each update.
    version: AtomicU64,
}

/// A reactive value that can be observed for changes.
///
/// - `get()`: read the current value
/// - `set()` / `update()`: replace or modify it, bumping the version
/// - `subscribe()`: get a [`Subscription`] that polls or awaits changes
///
/// Clones share the same value.
///
/// # Example
///
/// ```rust,ignore
/// use etcher_core::reactive::Dynamic;
///
/// let counter = Dynamic::new(0);
/// let mut sub = counter.subscribe();
///
/// counter.set(1);
/// assert_eq!(sub.poll(), Some(1));
/// assert_eq!(sub.poll(), None);
/// ```
pub struct Dynamic<T> {
    inner: Arc<DynamicInner<T>>,
}

impl<T> Clone for Dynamic<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Dynamic<T> {
    /// Create a new Dynamic with the given initial value.
    pub fn new(value: T) -> Self {
        let (tx, _rx) = watch::channel(value);
        Self {
            inner: Arc::new(DynamicInner {
                tx,
                version: AtomicU64::new(0),
            }),
        }
    }

    /// Get the current value.
    pub fn get(&self) -> T {
        self.inner.tx.borrow().clone()
    }

    /// Get the current version number.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Set a new value and notify subscribers.
    pub fn set(&self, value: T) {
        self.inner.tx.send_replace(value);
        self.inner.version.fetch_add(1, Ordering::Release);
    }

    /// Modify the value in place and notify subscribers.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        self.inner.tx.send_modify(f);
        self.inner.version.fetch_add(1, Ordering::Release);
    }

    /// Subscribe to value changes made after this call.
    pub fn subscribe(&self) -> Subscription<T> {
        Subscription {
            rx: self.inner.tx.subscribe(),
        }
    }
}

impl<T: Clone + Send + Sync + Default + 'static> Default for Dynamic<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + Send + Sync + std::fmt::Debug + 'static> std::fmt::Debug for Dynamic<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dynamic")
            .field("value", &self.get())
            .field("version", &self.version())
            .finish()
    }
}

/// A subscription to a [`Dynamic`] value.
///
/// Does not keep the source alive: once every `Dynamic` clone is dropped,
/// [`Subscription::changed`] returns `None`.
pub struct Subscription<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone + Send + Sync + 'static> Subscription<T> {
    /// Check if the source has changed since the last poll.
    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }

    /// Returns the new value if the source changed since the last poll.
    pub fn poll(&mut self) -> Option<T> {
        if self.has_changed() {
            Some(self.rx.borrow_and_update().clone())
        } else {
            None
        }
    }

    /// Wait for the next change.
    ///
    /// Returns `None` once the source is gone.
    pub async fn changed(&mut self) -> Option<T> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    /// Get the current value regardless of whether it changed.
    pub fn get(&self) -> T {
        self.rx.borrow().clone()
    }
}
