use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use redis::aio::MultiplexedConnection;
use redis::aio::PubSub;
use redis::AsyncCommands;
use redis::Client;
use tokio::time::sleep;
use tokio::time::timeout;
use tracing::debug;
use tracing::warn;

use super::Adapter;
use super::EventSource;
use crate::config::RedisConfig;
use crate::event::ChangeEvent;
use crate::fields::from_wire_map;
use crate::fields::FieldMap;
use crate::identity::Identity;
use crate::metrics::EVENTS_MALFORMED;
use crate::namespace::Namespace;
use crate::Result;
use crate::TransportError;

/// Redis-backed transport.
///
/// Field maps live in hashes keyed by the qualified namespace; change
/// notifications travel over pub/sub channels of the same name, carrying
/// the writer's identity as payload.
pub struct RedisAdapter {
    service: String,
    client: Client,
    connection: MultiplexedConnection,
    response_timeout: Duration,
    resubscribe_delay: Duration,
}

impl RedisAdapter {
    /// Connect to Redis within the configured budget.
    pub async fn connect(
        service: impl Into<String>,
        config: &RedisConfig,
        resubscribe_delay: Duration,
    ) -> Result<Self> {
        let client = Client::open(config.url.as_str())?;
        let connect_timeout = Duration::from_millis(config.connect_timeout_in_ms);

        let connection = match timeout(connect_timeout, client.get_multiplexed_tokio_connection()).await {
            Ok(connection) => connection?,
            Err(_) => return Err(TransportError::Timeout(connect_timeout).into()),
        };

        debug!("connected to redis at {}", config.url);

        Ok(Self {
            service: service.into(),
            client,
            connection,
            response_timeout: Duration::from_millis(config.response_timeout_in_ms),
            resubscribe_delay,
        })
    }

    async fn with_timeout<T, F>(
        &self,
        fut: F,
    ) -> Result<T>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.response_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(TransportError::Timeout(self.response_timeout).into()),
        }
    }
}

#[async_trait]
impl Adapter for RedisAdapter {
    async fn bulk_fetch(
        &self,
        namespace: &Namespace,
    ) -> Result<FieldMap> {
        // The multiplexed connection is cheap to clone per operation.
        let mut conn = self.connection.clone();
        let key = namespace.qualified();

        let raw: HashMap<String, String> = self.with_timeout(conn.hgetall(&key)).await?;

        debug!("fetched {} field(s) from {}", raw.len(), key);
        Ok(from_wire_map(raw))
    }

    async fn atomic_write(
        &self,
        namespace: &Namespace,
        fields: &FieldMap,
    ) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }

        let mut conn = self.connection.clone();
        let key = namespace.qualified();

        let mut pipe = redis::pipe();
        pipe.atomic();
        for (field, value) in fields {
            pipe.hset(&key, field, value.to_wire());
        }

        let _: () = self.with_timeout(pipe.query_async(&mut conn)).await?;

        debug!("wrote {} field(s) into {}", fields.len(), key);
        Ok(())
    }

    async fn publish(
        &self,
        namespace: &Namespace,
        identity: &Identity,
    ) -> Result<()> {
        let mut conn = self.connection.clone();
        let channel = namespace.qualified();

        // The receiver count is irrelevant; publishing to nobody is fine.
        let _: i64 = self
            .with_timeout(conn.publish(&channel, identity.as_str()))
            .await?;

        debug!("published change of {} as {}", channel, identity);
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn EventSource>> {
        let source = RedisEventSource::connect(
            self.client.clone(),
            self.service.clone(),
            self.resubscribe_delay,
        )
        .await?;

        Ok(Box::new(source))
    }
}

/// Pub/sub subscription covering every namespace of one service.
pub struct RedisEventSource {
    client: Client,
    service: String,
    pattern: String,
    pubsub: Option<PubSub>,
    resubscribe_delay: Duration,
}

impl RedisEventSource {
    async fn connect(
        client: Client,
        service: String,
        resubscribe_delay: Duration,
    ) -> Result<Self> {
        let pattern = format!("{}:*", service);
        let mut source = Self {
            client,
            service,
            pattern,
            pubsub: None,
            resubscribe_delay,
        };

        // The initial subscription must succeed; later drops are retried.
        source.resubscribe().await?;
        Ok(source)
    }

    async fn resubscribe(&mut self) -> Result<()> {
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.psubscribe(&self.pattern).await?;
        debug!("subscribed to {}", self.pattern);
        self.pubsub = Some(pubsub);
        Ok(())
    }
}

#[async_trait]
impl EventSource for RedisEventSource {
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>> {
        loop {
            if self.pubsub.is_none() {
                if let Err(e) = self.resubscribe().await {
                    warn!("resubscribe failed: {e}, retrying");
                    sleep(self.resubscribe_delay).await;
                    continue;
                }
            }

            let next = match self.pubsub.as_mut() {
                Some(pubsub) => pubsub.on_message().next().await,
                None => continue,
            };

            let message = match next {
                Some(message) => message,
                None => {
                    // The connection dropped underneath the subscription.
                    warn!("change stream interrupted, resubscribing");
                    self.pubsub = None;
                    sleep(self.resubscribe_delay).await;
                    continue;
                }
            };

            let channel = message.get_channel_name().to_string();
            let payload: String = match message.get_payload() {
                Ok(payload) => payload,
                Err(e) => {
                    warn!("undecodable payload on {}: {e}", channel);
                    EVENTS_MALFORMED.with_label_values(&["redis"]).inc();
                    continue;
                }
            };

            match decode_channel(&channel, &self.service) {
                Some(namespace) => {
                    return Ok(Some(ChangeEvent {
                        service: self.service.clone(),
                        namespace,
                        identity: Identity::from_wire(payload),
                        marker: None,
                    }));
                }
                None => {
                    warn!("unexpected channel name: {}", channel);
                    EVENTS_MALFORMED.with_label_values(&["redis"]).inc();
                    continue;
                }
            }
        }
    }
}

/// Split a `service:namespace` channel name and check the service prefix.
pub(crate) fn decode_channel(
    channel: &str,
    service: &str,
) -> Option<String> {
    let (prefix, namespace) = channel.split_once(':')?;
    if prefix != service || namespace.is_empty() {
        return None;
    }
    Some(namespace.to_string())
}
