//! Backend transports.
//!
//! A transport owns every remote interaction: bulk reads, atomic writes,
//! change publication and the change-event subscription. The client and
//! watcher only ever see the [`Adapter`] and [`EventSource`] traits, so
//! backends stay swappable and tests run against in-memory fakes.

mod consul;
mod redis;


pub use self::consul::*;
pub use self::redis::*;

//---
use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;

use crate::event::ChangeEvent;
use crate::fields::FieldMap;
use crate::identity::Identity;
use crate::namespace::Namespace;
use crate::Result;

/// Remote operations shared by every backend.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Adapter: Send + Sync + 'static {
    /// Fetch the full current field map of one namespace.
    ///
    /// A namespace the backend has never seen yields an empty map, not an
    /// error.
    async fn bulk_fetch(
        &self,
        namespace: &Namespace,
    ) -> Result<FieldMap>;

    /// Write the given fields into the namespace.
    ///
    /// Fields absent from `fields` keep their current remote value; this
    /// is a merge, not a replacement.
    async fn atomic_write(
        &self,
        namespace: &Namespace,
        fields: &FieldMap,
    ) -> Result<()>;

    /// Announce that `namespace` changed, attributed to `identity`.
    async fn publish(
        &self,
        namespace: &Namespace,
        identity: &Identity,
    ) -> Result<()>;

    /// Open a change-event stream for the whole service.
    async fn subscribe(&self) -> Result<Box<dyn EventSource>>;
}

/// A stream of change events, one backend subscription each.
///
/// Implementations yield every well-formed event they observe, the
/// caller's own echoes included; filtering by origin happens downstream.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventSource: Send + 'static {
    /// Wait for the next change event.
    ///
    /// Transient backend trouble is absorbed internally with retry and
    /// resubscription. `Ok(None)` means the stream is permanently closed.
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>>;
}
