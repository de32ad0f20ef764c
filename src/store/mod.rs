#[cfg(test)]
mod store_test;

use std::collections::HashMap;
use std::future::Future;

use tokio::sync::RwLock;

use crate::fields::FieldMap;
use crate::fields::FieldValue;
use crate::Result;

/// Local replica of every cached namespace, keyed by logical name.
///
/// Readers run concurrently; writers serialize behind one exclusive lock so
/// a reader always observes the pre- or post-image of a write, never a
/// partial map. The `_with` variants run a caller-supplied async hook while
/// still holding the write lock, which is how local writes stay ordered
/// with their matching remote operation.
///
/// The lock is async-aware because remote I/O runs inside the write
/// critical section. It is plain and non-reentrant: hooks must not call
/// back into the store.
#[derive(Debug, Default)]
pub struct Store {
    namespaces: RwLock<HashMap<String, FieldMap>>,
}

impl Store {
    pub fn new() -> Self {
        Store {
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Returns a copy of one namespace, or `None` when it was never loaded.
    pub async fn read(
        &self,
        namespace: &str,
    ) -> Option<FieldMap> {
        let guard = self.namespaces.read().await;
        guard.get(namespace).cloned()
    }

    /// Returns a copy of one namespace, falling back to `fetch` on a miss.
    ///
    /// The shared lock stays held across the fallback, so a concurrent
    /// refresh cannot slip in between the miss and the fetched result. The
    /// fetched map is handed to the caller but never inserted.
    pub async fn read_or_else<F, Fut>(
        &self,
        namespace: &str,
        fetch: F,
    ) -> Result<FieldMap>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<FieldMap>>,
    {
        let guard = self.namespaces.read().await;
        if let Some(fields) = guard.get(namespace) {
            return Ok(fields.clone());
        }
        fetch().await
    }

    /// Replaces one namespace wholesale.
    pub async fn replace(
        &self,
        namespace: &str,
        fields: FieldMap,
    ) {
        let mut guard = self.namespaces.write().await;
        guard.insert(namespace.to_string(), fields);
    }

    /// Replaces one namespace, then awaits `hook` while still holding the
    /// write lock.
    ///
    /// The hook's error becomes the operation's error, but the cache keeps
    /// the new value either way: the local write is already visible when
    /// the hook runs. Callers needing the remote and local state to agree
    /// again after a failure must re-fetch.
    pub async fn replace_with<F, Fut>(
        &self,
        namespace: &str,
        fields: FieldMap,
        hook: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut guard = self.namespaces.write().await;
        guard.insert(namespace.to_string(), fields);
        hook().await
    }

    /// Upserts a single field, creating the namespace when absent.
    pub async fn upsert(
        &self,
        namespace: &str,
        field: &str,
        value: FieldValue,
    ) {
        let mut guard = self.namespaces.write().await;
        let entry = guard.entry(namespace.to_string()).or_default();
        entry.insert(field.to_string(), value);
    }

    /// Upserts a single field, then awaits `hook` while still holding the
    /// write lock. Same failure contract as [`Store::replace_with`].
    pub async fn upsert_with<F, Fut>(
        &self,
        namespace: &str,
        field: &str,
        value: FieldValue,
        hook: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut guard = self.namespaces.write().await;
        let entry = guard.entry(namespace.to_string()).or_default();
        entry.insert(field.to_string(), value);
        hook().await
    }

    /// Replaces the whole cache with the map `reload` produces, under one
    /// write-lock acquisition.
    ///
    /// Unlike the per-namespace hooks, a failing reload leaves the cache
    /// untouched: readers see the pre- or post-image of the whole
    /// reconciliation, never a half-applied one.
    pub async fn replace_all_with<F, Fut>(
        &self,
        reload: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<HashMap<String, FieldMap>>>,
    {
        let mut guard = self.namespaces.write().await;
        let all = reload().await?;
        *guard = all;
        Ok(())
    }

    /// Copy of the entire cache, for diagnostics and tests.
    pub async fn snapshot(&self) -> HashMap<String, FieldMap> {
        let guard = self.namespaces.read().await;
        guard.clone()
    }

    pub async fn contains(
        &self,
        namespace: &str,
    ) -> bool {
        let guard = self.namespaces.read().await;
        guard.contains_key(namespace)
    }

    pub async fn len(&self) -> usize {
        let guard = self.namespaces.read().await;
        guard.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
