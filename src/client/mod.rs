//! Public replication client.
//!
//! A [`Client`] owns the local cache, one transport connection and the
//! background watch task. Reads are answered from memory; `*_global`
//! writes go through the backend and notify every peer of the service.
//!
//! # Basic Usage
//! ```no_run
//! use central::Client;
//! use central::Settings;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut settings = Settings::load(None).unwrap();
//!     settings.service.namespaces = vec!["limits".into()];
//!
//!     let client = Client::builder(settings).build().await.unwrap();
//!
//!     // Replicated write: every peer of the service sees it.
//!     client.hset_global("limits", "max", 100_i64).await.unwrap();
//!
//!     // Reads are served from the local cache.
//!     let limits = client.get("limits").await.unwrap();
//!     println!("limits: {:?}", limits);
//!
//!     client.shutdown().await.unwrap();
//! }
//! ```

mod builder;


pub use builder::ClientBuilder;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use tracing::info;

use crate::config::Settings;
use crate::fields::canonical_field;
use crate::fields::FieldMap;
use crate::fields::FieldValue;
use crate::identity::Identity;
use crate::metrics::BULK_FETCHES;
use crate::metrics::PUBLISHES;
use crate::metrics::REMOTE_WRITE_FAILURES;
use crate::metrics::STORE_REFRESHES;
use crate::namespace::Namespace;
use crate::store::Store;
use crate::transport::Adapter;
use crate::watcher::Watcher;
use crate::watcher::WatcherState;
use crate::Result;

/// Replicated configuration client for one service.
pub struct Client {
    settings: Settings,
    identity: Identity,
    store: Arc<Store>,
    adapter: Arc<dyn Adapter>,
    watcher: Watcher,
}

impl Client {
    /// Start building a client over the given settings.
    pub fn builder(settings: Settings) -> ClientBuilder {
        ClientBuilder::new(settings)
    }

    /// Read the full field map of one namespace.
    ///
    /// Registered namespaces are answered from the cache. A miss falls
    /// through to the backend without installing the answer, so reads of
    /// unregistered namespaces stay uncached round trips.
    pub async fn get(
        &self,
        namespace: &str,
    ) -> Result<FieldMap> {
        let namespace = Namespace::new(self.service(), namespace)?;

        self.store
            .read_or_else(namespace.name(), || async {
                debug!("cache miss for {}, asking the backend", namespace.name());
                BULK_FETCHES.with_label_values(&[namespace.name()]).inc();
                self.adapter.bulk_fetch(&namespace).await
            })
            .await
    }

    /// Replace one namespace locally.
    ///
    /// Nothing is written to the backend and peers are not notified; the
    /// next refresh of this namespace overwrites the change.
    pub async fn set(
        &self,
        namespace: &str,
        fields: FieldMap,
    ) -> Result<()> {
        let namespace = Namespace::new(self.service(), namespace)?;

        debug!("set {} locally ({} fields)", namespace.name(), fields.len());
        self.store.replace(namespace.name(), fields).await;
        Ok(())
    }

    /// Upsert a single field locally. Same locality contract as
    /// [`Client::set`].
    pub async fn hset(
        &self,
        namespace: &str,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        let namespace = Namespace::new(self.service(), namespace)?;
        let field = canonical_field(field)?;

        debug!("hset {}.{} locally", namespace.name(), field);
        self.store
            .upsert(namespace.name(), &field, value.into())
            .await;
        Ok(())
    }

    /// Replace one namespace locally, write it to the backend and notify
    /// peers, all under one cache write lock.
    ///
    /// When the remote half fails the error is surfaced, but the cache
    /// keeps the attempted value; the local replica runs ahead of the
    /// backend until the next refresh.
    pub async fn set_global(
        &self,
        namespace: &str,
        fields: FieldMap,
    ) -> Result<()> {
        let namespace = Namespace::new(self.service(), namespace)?;

        let result = self
            .store
            .replace_with(namespace.name(), fields.clone(), || async {
                self.write_and_publish(&namespace, &fields).await
            })
            .await;

        if result.is_err() {
            REMOTE_WRITE_FAILURES
                .with_label_values(&[namespace.name()])
                .inc();
        }
        result
    }

    /// Upsert a single field locally, write it to the backend and notify
    /// peers, all under one cache write lock. Same failure contract as
    /// [`Client::set_global`].
    pub async fn hset_global(
        &self,
        namespace: &str,
        field: &str,
        value: impl Into<FieldValue>,
    ) -> Result<()> {
        let namespace = Namespace::new(self.service(), namespace)?;
        let field = canonical_field(field)?;
        let value = value.into();

        let mut delta = FieldMap::new();
        delta.insert(field.clone(), value.clone());

        let result = self
            .store
            .upsert_with(namespace.name(), &field, value, || async {
                self.write_and_publish(&namespace, &delta).await
            })
            .await;

        if result.is_err() {
            REMOTE_WRITE_FAILURES
                .with_label_values(&[namespace.name()])
                .inc();
        }
        result
    }

    /// Re-fetch every registered namespace and install the images under a
    /// single cache write lock, so readers see the pre- or post-image of
    /// the whole reconciliation.
    pub async fn update(&self) -> Result<()> {
        let mut namespaces = Vec::new();
        for name in &self.settings.service.namespaces {
            namespaces.push(Namespace::new(self.service(), name)?);
        }

        self.store
            .replace_all_with(|| async {
                let mut all = HashMap::new();
                for namespace in &namespaces {
                    BULK_FETCHES.with_label_values(&[namespace.name()]).inc();
                    let fields = self.adapter.bulk_fetch(namespace).await?;
                    all.insert(namespace.name().to_string(), fields);
                }
                Ok(all)
            })
            .await?;

        for namespace in &namespaces {
            STORE_REFRESHES.with_label_values(&[namespace.name()]).inc();
        }

        info!("refreshed {} namespace(s)", namespaces.len());
        Ok(())
    }

    /// Stop the watch task gracefully.
    ///
    /// The cache stays readable but no longer follows peer changes.
    pub async fn shutdown(&self) -> Result<()> {
        info!("client {} shutting down", self.identity);
        self.watcher.stop().await
    }

    /// Tear the client down without waiting for the watch task.
    pub fn destroy(self) {
        info!("client {} destroyed", self.identity);
        self.watcher.force_stop();
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn service(&self) -> &str {
        &self.settings.service.name
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn watcher_state(&self) -> WatcherState {
        self.watcher.state()
    }

    /// Copy of the whole cache, for diagnostics.
    pub async fn snapshot(&self) -> HashMap<String, FieldMap> {
        self.store.snapshot().await
    }

    async fn write_and_publish(
        &self,
        namespace: &Namespace,
        fields: &FieldMap,
    ) -> Result<()> {
        self.adapter.atomic_write(namespace, fields).await?;
        self.adapter.publish(namespace, &self.identity).await?;
        PUBLISHES.with_label_values(&[namespace.name()]).inc();
        debug!("replicated {} ({} fields)", namespace.name(), fields.len());
        Ok(())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.watcher.force_stop();
    }
}
