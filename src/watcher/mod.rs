//! Background change-event consumption.
//!
//! One watch task per client: it drains the transport's event stream,
//! drops the client's own echoes, and refreshes the affected namespace
//! from the backend on every peer change.


use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::trace;
use tracing::warn;

use crate::event::ChangeEvent;
use crate::identity::Identity;
use crate::metrics::BULK_FETCHES;
use crate::metrics::EVENTS_RECEIVED;
use crate::metrics::EVENTS_SELF_SUPPRESSED;
use crate::metrics::STORE_REFRESHES;
use crate::namespace::Namespace;
use crate::store::Store;
use crate::transport::Adapter;
use crate::transport::EventSource;
use crate::Result;

/// Lifecycle of the background watch task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    /// Spawned, first poll not reached yet
    Idle,
    /// Consuming events
    Running,
    /// Graceful stop requested, task still winding down
    Stopping,
    /// Task finished or was torn down
    Stopped,
}

/// Handle over the background watch task.
pub struct Watcher {
    state: Arc<Mutex<WatcherState>>,
    shutdown: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Watcher {
    /// Spawn the watch task over an open event stream.
    pub(crate) fn spawn(
        identity: Identity,
        adapter: Arc<dyn Adapter>,
        store: Arc<Store>,
        source: Box<dyn EventSource>,
    ) -> Self {
        let state = Arc::new(Mutex::new(WatcherState::Idle));
        let shutdown = CancellationToken::new();

        let task_state = state.clone();
        let task_shutdown = shutdown.clone();
        let handle = tokio::spawn(async move {
            *task_state.lock() = WatcherState::Running;
            watch_loop(identity, adapter, store, source, task_shutdown).await;
            *task_state.lock() = WatcherState::Stopped;
        });

        Self {
            state,
            shutdown,
            handle: Mutex::new(Some(handle)),
        }
    }

    pub fn state(&self) -> WatcherState {
        *self.state.lock()
    }

    /// Ask the watch task to finish and wait for it.
    ///
    /// Idempotent; stopping an already stopped watcher is a no-op.
    pub(crate) async fn stop(&self) -> Result<()> {
        let handle = self.handle.lock().take();
        let handle = match handle {
            Some(handle) => handle,
            None => return Ok(()),
        };

        *self.state.lock() = WatcherState::Stopping;
        self.shutdown.cancel();

        let result = handle.await;
        *self.state.lock() = WatcherState::Stopped;
        result?;
        Ok(())
    }

    /// Tear the watch task down without waiting for it.
    pub(crate) fn force_stop(&self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.lock().take() {
            handle.abort();
        }
        *self.state.lock() = WatcherState::Stopped;
    }
}

async fn watch_loop(
    identity: Identity,
    adapter: Arc<dyn Adapter>,
    store: Arc<Store>,
    mut source: Box<dyn EventSource>,
    shutdown: CancellationToken,
) {
    info!("watch loop started as {}", identity);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("watch loop stopping");
                return;
            }

            next = source.next_event() => {
                match next {
                    Ok(Some(event)) => {
                        handle_event(&identity, adapter.as_ref(), store.as_ref(), event).await;
                    }
                    Ok(None) => {
                        warn!("change stream closed, watch loop exiting");
                        return;
                    }
                    Err(e) => {
                        warn!("change stream error: {e}");
                    }
                }
            }
        }
    }
}

async fn handle_event(
    identity: &Identity,
    adapter: &dyn Adapter,
    store: &Store,
    event: ChangeEvent,
) {
    EVENTS_RECEIVED
        .with_label_values(&[event.namespace.as_str()])
        .inc();

    if event.identity == *identity {
        trace!("suppressing own change echo for {}", event.namespace);
        EVENTS_SELF_SUPPRESSED
            .with_label_values(&[event.namespace.as_str()])
            .inc();
        return;
    }

    let namespace = match Namespace::new(&event.service, &event.namespace) {
        Ok(namespace) => namespace,
        Err(e) => {
            warn!("dropping event with invalid namespace: {e}");
            return;
        }
    };

    debug!(
        "peer {} changed {}, refreshing",
        event.identity,
        namespace.name()
    );
    BULK_FETCHES.with_label_values(&[namespace.name()]).inc();

    match adapter.bulk_fetch(&namespace).await {
        Ok(fields) => {
            store.replace(namespace.name(), fields).await;
            STORE_REFRESHES.with_label_values(&[namespace.name()]).inc();
        }
        Err(e) => {
            // The cache keeps serving the previous image.
            warn!("refresh of {} failed: {e}", namespace.name());
        }
    }
}
