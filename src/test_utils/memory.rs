use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::event::ChangeEvent;
use crate::fields::FieldMap;
use crate::identity::Identity;
use crate::namespace::Namespace;
use crate::transport::Adapter;
use crate::transport::EventSource;
use crate::Result;
use crate::TransportError;

/// Shared in-memory backend: one per simulated deployment, handed to
/// every simulated process through [`MemoryBackend::adapter`].
///
/// Writes merge like a hash store, publishes fan out to every
/// subscriber (the publisher's own included), and per-namespace fetch
/// counters expose how often the backend was actually consulted.
pub struct MemoryBackend {
    data: Mutex<HashMap<String, FieldMap>>,
    subscribers: Mutex<Vec<mpsc::UnboundedSender<ChangeEvent>>>,
    fetch_counts: Mutex<HashMap<String, usize>>,
    publish_count: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            data: Mutex::new(HashMap::new()),
            subscribers: Mutex::new(Vec::new()),
            fetch_counts: Mutex::new(HashMap::new()),
            publish_count: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        })
    }

    /// Adapter bound to one simulated process of `service`.
    pub fn adapter(
        self: &Arc<Self>,
        service: &str,
    ) -> Arc<MemoryAdapter> {
        Arc::new(MemoryAdapter {
            backend: self.clone(),
            service: service.to_string(),
        })
    }

    /// Pre-load one namespace, bypassing counters and notifications.
    pub fn seed(
        &self,
        qualified: &str,
        fields: FieldMap,
    ) {
        self.data.lock().insert(qualified.to_string(), fields);
    }

    /// Current remote image of one namespace.
    pub fn stored(
        &self,
        qualified: &str,
    ) -> Option<FieldMap> {
        self.data.lock().get(qualified).cloned()
    }

    pub fn fetch_count(
        &self,
        qualified: &str,
    ) -> usize {
        self.fetch_counts.lock().get(qualified).copied().unwrap_or(0)
    }

    pub fn publish_count(&self) -> usize {
        self.publish_count.load(Ordering::SeqCst)
    }

    /// Make every following write fail with an API error.
    pub fn fail_writes(
        &self,
        fail: bool,
    ) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

pub struct MemoryAdapter {
    backend: Arc<MemoryBackend>,
    service: String,
}

#[async_trait]
impl Adapter for MemoryAdapter {
    async fn bulk_fetch(
        &self,
        namespace: &Namespace,
    ) -> Result<FieldMap> {
        let qualified = namespace.qualified();
        *self
            .backend
            .fetch_counts
            .lock()
            .entry(qualified.clone())
            .or_insert(0) += 1;
        Ok(self.backend.stored(&qualified).unwrap_or_default())
    }

    async fn atomic_write(
        &self,
        namespace: &Namespace,
        fields: &FieldMap,
    ) -> Result<()> {
        if self.backend.fail_writes.load(Ordering::SeqCst) {
            return Err(TransportError::Api {
                status: 500,
                body: "injected write failure".to_string(),
            }
            .into());
        }

        let mut data = self.backend.data.lock();
        let entry = data.entry(namespace.qualified()).or_default();
        for (field, value) in fields {
            entry.insert(field.clone(), value.clone());
        }
        Ok(())
    }

    async fn publish(
        &self,
        namespace: &Namespace,
        identity: &Identity,
    ) -> Result<()> {
        self.backend.publish_count.fetch_add(1, Ordering::SeqCst);

        let event = ChangeEvent {
            service: namespace.service().to_string(),
            namespace: namespace.name().to_string(),
            identity: identity.clone(),
            marker: None,
        };

        let mut subscribers = self.backend.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn EventSource>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.backend.subscribers.lock().push(tx);
        Ok(Box::new(MemoryEventSource {
            service: self.service.clone(),
            rx,
        }))
    }
}

pub struct MemoryEventSource {
    service: String,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
}

#[async_trait]
impl EventSource for MemoryEventSource {
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>> {
        // Subscriptions are scoped to one service, like a channel pattern.
        loop {
            match self.rx.recv().await {
                Some(event) if event.service == self.service => return Ok(Some(event)),
                Some(_) => continue,
                None => return Ok(None),
            }
        }
    }
}
