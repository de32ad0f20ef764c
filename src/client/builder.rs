use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::Client;
use crate::config::Settings;
use crate::config::TransportKind;
use crate::identity::Identity;
use crate::metrics::register_custom_metrics;
use crate::store::Store;
use crate::transport::Adapter;
use crate::transport::ConsulAdapter;
use crate::transport::RedisAdapter;
use crate::watcher::Watcher;
use crate::Result;

/// Assembles a [`Client`]: validates settings, connects the transport,
/// opens the change subscription, primes the cache and starts the watch
/// task.
pub struct ClientBuilder {
    settings: Settings,
    adapter: Option<Arc<dyn Adapter>>,
}

impl ClientBuilder {
    pub(crate) fn new(settings: Settings) -> Self {
        Self {
            settings,
            adapter: None,
        }
    }

    /// Use a pre-built transport instead of connecting one from settings.
    pub fn adapter(
        mut self,
        adapter: Arc<dyn Adapter>,
    ) -> Self {
        self.adapter = Some(adapter);
        self
    }

    /// Connect and return a ready client.
    ///
    /// The subscription is opened before the cache is primed; a client
    /// that cannot follow changes is not handed out.
    pub async fn build(self) -> Result<Client> {
        register_custom_metrics();
        self.settings.validate()?;

        let identity = Identity::generate();
        info!(
            "starting replication client for {} as {}",
            self.settings.service.name, identity
        );

        let adapter = match self.adapter {
            Some(adapter) => adapter,
            None => build_adapter(&self.settings).await?,
        };

        let store = Arc::new(Store::new());
        let source = adapter.subscribe().await?;
        let watcher = Watcher::spawn(identity.clone(), adapter.clone(), store.clone(), source);

        let client = Client {
            settings: self.settings,
            identity,
            store,
            adapter,
            watcher,
        };

        // A failing first refresh drops the client, which also tears the
        // watch task down.
        client.update().await?;

        info!(
            "replication client ready, watching {} namespace(s)",
            client.settings.service.namespaces.len()
        );
        Ok(client)
    }
}

async fn build_adapter(settings: &Settings) -> Result<Arc<dyn Adapter>> {
    match settings.transport {
        TransportKind::Redis => {
            let adapter = RedisAdapter::connect(
                settings.service.name.clone(),
                &settings.redis,
                Duration::from_millis(settings.watch.resubscribe_delay_in_ms),
            )
            .await?;
            Ok(Arc::new(adapter))
        }
        TransportKind::Consul => {
            let adapter = ConsulAdapter::connect(
                settings.service.name.clone(),
                &settings.consul,
                Duration::from_millis(settings.watch.retry_delay_in_ms),
            )
            .await?;
            Ok(Arc::new(adapter))
        }
    }
}
