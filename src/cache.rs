//! Per-document build-once cache.
//!
//! Chunking, embedding, and indexing a document is expensive, so the
//! result is computed at most once per document key and shared across all
//! requests for the process lifetime. Concurrent first-access requests for
//! the same key serialize on a per-key cell and all observe the single
//! build's result; requests for different keys never contend.
//!
//! There is deliberately no eviction: retention is process-lifetime, and
//! bounding memory is the surrounding deployment's responsibility.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::OnceCell;

/// Concurrency-safe mapping from document key to a built-once value.
///
/// The value type is generic; the engine stores the
/// [`VectorIndex`](crate::index::VectorIndex) built for each document.
/// Values are handed out as `Arc` clones of a single allocation, so every
/// caller for a key observes the same instance.
pub struct DocumentCache<T> {
    entries: Mutex<HashMap<String, Arc<OnceCell<Arc<T>>>>>,
}

impl<T> DocumentCache<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key`, building it first if absent.
    ///
    /// If the value is present it is returned immediately with no
    /// recomputation. Otherwise `build` runs; callers racing on the same
    /// absent key wait for that single build and share its result rather
    /// than duplicating work. The map lock is only held to look up the
    /// per-key cell, never across the build, so builds for different keys
    /// proceed fully in parallel.
    ///
    /// A failed build stores nothing: the error goes to the caller whose
    /// build ran, and the next caller for the key starts a fresh build.
    pub async fn get_or_build<F, Fut, E>(&self, key: &str, build: F) -> Result<Arc<T>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let cell = {
            let mut entries = self.entries.lock();
            entries
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        if let Some(value) = cell.get() {
            tracing::debug!(key, "document cache hit");
            return Ok(value.clone());
        }

        let value = cell
            .get_or_try_init(|| async {
                tracing::info!(key, "building document cache entry");
                build().await.map(Arc::new)
            })
            .await?;
        Ok(value.clone())
    }

    /// True when a fully built value exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .is_some_and(|cell| cell.get().is_some())
    }

    /// Number of fully built entries.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|cell| cell.get().is_some())
            .count()
    }

    /// True when no entry has been built yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for DocumentCache<T> {
    fn default() -> Self {
        Self::new()
    }
}
