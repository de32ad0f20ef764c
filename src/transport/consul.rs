use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::Adapter;
use super::EventSource;
use crate::config::ConsulConfig;
use crate::event::ChangeEvent;
use crate::fields::from_wire_map;
use crate::fields::FieldMap;
use crate::identity::Identity;
use crate::metrics::EVENTS_MALFORMED;
use crate::metrics::EVENTS_STALE_SKIPPED;
use crate::namespace::Namespace;
use crate::EventError;
use crate::Result;
use crate::TransportError;

lazy_static! {
    // Tag grammar: /service/identity/namespace, namespace may be
    // hierarchical.
    static ref TAG_PATTERN: Regex =
        Regex::new(r"^/([A-Za-z0-9_\-]+)/([A-Za-z0-9_\-]+)/([A-Za-z0-9_\-/]+)$")
            .expect("Should succeed to compile tag pattern");
}

/// Consul-backed transport.
///
/// Field maps live in the KV store under `service:namespace/field` keys;
/// change notifications travel as user events, tagged with the writer's
/// identity, and are consumed through long polls against the event list.
#[derive(Clone)]
pub struct ConsulAdapter {
    service: String,
    http: reqwest::Client,
    base_url: String,
    event_name: String,
    wait_secs: u64,
    retry_delay: Duration,
}

impl ConsulAdapter {
    /// Connect to the local Consul agent.
    ///
    /// Construction fails when the agent is unreachable.
    pub async fn connect(
        service: impl Into<String>,
        config: &ConsulConfig,
        retry_delay: Duration,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_in_ms))
            .build()?;

        let adapter = Self {
            service: service.into(),
            http,
            base_url: config.base_url(),
            event_name: config.event_name.clone(),
            wait_secs: config.wait_in_secs,
            retry_delay,
        };

        adapter.list_events(None).await?;
        debug!("connected to consul at {}", adapter.base_url);

        Ok(adapter)
    }

    async fn list_events(
        &self,
        cursor: Option<u64>,
    ) -> Result<Vec<ConsulEvent>> {
        let mut url = format!(
            "{}/v1/event/list?name={}&service={}",
            self.base_url, self.event_name, self.service
        );
        if let Some(index) = cursor {
            url.push_str(&format!("&index={}&wait={}s", index, self.wait_secs));
        }

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }
        if body.trim().is_empty() {
            return Err(TransportError::Api {
                status: status.as_u16(),
                body: "empty event list body".to_string(),
            }
            .into());
        }

        let events: Vec<ConsulEvent> = serde_json::from_str(&body)?;
        Ok(events)
    }

    fn kv_url(&self, path: &str) -> String {
        format!("{}/v1/kv/{}", self.base_url, path)
    }

    async fn kv_get_recurse(
        &self,
        prefix: &str,
    ) -> Result<Vec<KvPair>> {
        let url = format!("{}?recurse=true", self.kv_url(prefix));
        let response = self.http.get(&url).send().await?;

        // An unknown prefix is an empty namespace, not a failure.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let pairs: Vec<KvPair> = response.json().await?;
        Ok(pairs)
    }
}

#[async_trait]
impl Adapter for ConsulAdapter {
    async fn bulk_fetch(
        &self,
        namespace: &Namespace,
    ) -> Result<FieldMap> {
        let qualified = namespace.qualified();
        let prefix = format!("{}/", qualified);
        let pairs = self.kv_get_recurse(&qualified).await?;

        let mut raw = HashMap::new();
        for pair in pairs {
            // Recursion also returns deeper namespaces; their keys carry
            // extra path segments.
            let field = match pair.key.strip_prefix(&prefix) {
                Some(field) if !field.is_empty() && !field.contains('/') => field.to_string(),
                _ => {
                    trace!("skipping unrelated key {}", pair.key);
                    continue;
                }
            };
            raw.insert(field, decode_value(pair.value)?);
        }

        debug!("fetched {} field(s) from {}", raw.len(), qualified);
        Ok(from_wire_map(raw))
    }

    async fn atomic_write(
        &self,
        namespace: &Namespace,
        fields: &FieldMap,
    ) -> Result<()> {
        // The KV API offers no multi-key write here; on failure earlier
        // fields stay written.
        for (field, value) in fields {
            let url = self.kv_url(&format!("{}/{}", namespace.qualified(), field));
            let response = self.http.put(&url).body(value.to_wire()).send().await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(TransportError::Api {
                    status: status.as_u16(),
                    body,
                }
                .into());
            }
        }

        debug!(
            "wrote {} field(s) into {}",
            fields.len(),
            namespace.qualified()
        );
        Ok(())
    }

    async fn publish(
        &self,
        namespace: &Namespace,
        identity: &Identity,
    ) -> Result<()> {
        let tag = format!("/{}/{}/{}", self.service, identity, namespace.name());
        let url = format!(
            "{}/v1/event/fire/{}?service={}&tag={}",
            self.base_url, self.event_name, self.service, tag
        );

        let response = self.http.put(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Api {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        debug!(
            "fired {} for {} as {}",
            self.event_name,
            namespace.name(),
            identity
        );
        Ok(())
    }

    async fn subscribe(&self) -> Result<Box<dyn EventSource>> {
        Ok(Box::new(ConsulEventSource::new(self.clone())))
    }
}

/// Long-polling event stream backed by the agent's user event list.
pub struct ConsulEventSource {
    adapter: ConsulAdapter,
    pub(crate) cursor: Option<u64>,
    pub(crate) last_ltime: Option<u64>,
    pub(crate) backlog: VecDeque<ChangeEvent>,
}

impl ConsulEventSource {
    pub(crate) fn new(adapter: ConsulAdapter) -> Self {
        Self {
            adapter,
            cursor: None,
            last_ltime: None,
            backlog: VecDeque::new(),
        }
    }

    /// Fold one poll answer into the cursor and the backlog.
    ///
    /// Returns whether the poll made progress; a quiet poll signals the
    /// caller to pause before polling again.
    pub(crate) fn ingest(&mut self, events: Vec<ConsulEvent>) -> bool {
        let previous_cursor = self.cursor;

        if let Some(last) = events.last() {
            match watch_index(&last.id) {
                Ok(index) => self.cursor = Some(index),
                Err(e) => {
                    warn!("cannot derive poll cursor: {e}");
                    EVENTS_MALFORMED.with_label_values(&["consul"]).inc();
                    self.cursor = None;
                }
            }
        }

        for event in events {
            // The event list replays history on every poll; the Lamport
            // clock separates new entries from replays.
            if let Some(seen) = self.last_ltime {
                if event.ltime <= seen {
                    trace!("skipping replayed event at ltime {}", event.ltime);
                    EVENTS_STALE_SKIPPED.with_label_values(&["consul"]).inc();
                    continue;
                }
            }

            match parse_tag(&event.tag) {
                Ok((service, identity, namespace)) => {
                    self.last_ltime = Some(event.ltime);

                    if service != self.adapter.service {
                        debug!("ignoring event for foreign service {}", service);
                        continue;
                    }

                    self.backlog.push_back(ChangeEvent {
                        service,
                        namespace,
                        identity: Identity::from_wire(identity),
                        marker: Some(event.ltime),
                    });
                }
                Err(e) => {
                    // Advance past the broken event so it is warned once,
                    // not on every replay.
                    self.last_ltime = Some(event.ltime);
                    warn!("{e}");
                    EVENTS_MALFORMED.with_label_values(&["consul"]).inc();
                }
            }
        }

        self.cursor != previous_cursor || !self.backlog.is_empty()
    }
}

#[async_trait]
impl EventSource for ConsulEventSource {
    async fn next_event(&mut self) -> Result<Option<ChangeEvent>> {
        loop {
            if let Some(event) = self.backlog.pop_front() {
                return Ok(Some(event));
            }

            match self.adapter.list_events(self.cursor).await {
                Ok(events) => {
                    if !self.ingest(events) {
                        sleep(self.adapter.retry_delay).await;
                    }
                }
                Err(e) => {
                    warn!("event poll failed: {e}, restarting watch");
                    self.cursor = None;
                    sleep(self.adapter.retry_delay).await;
                }
            }
        }
    }
}

/// One entry from the agent's user event list.
#[derive(Debug, Deserialize)]
pub(crate) struct ConsulEvent {
    #[serde(rename = "ID")]
    pub(crate) id: String,
    #[serde(rename = "LTime")]
    pub(crate) ltime: u64,
    #[serde(rename = "TagFilter", default)]
    pub(crate) tag: String,
}

#[derive(Debug, Deserialize)]
struct KvPair {
    #[serde(rename = "Key")]
    key: String,
    #[serde(rename = "Value")]
    value: Option<String>,
}

fn decode_value(value: Option<String>) -> Result<String> {
    let encoded = match value {
        Some(encoded) => encoded,
        None => return Ok(String::new()),
    };

    let bytes = STANDARD
        .decode(encoded.as_bytes())
        .map_err(|e| TransportError::Decode(format!("invalid base64 value: {e}")))?;

    String::from_utf8(bytes)
        .map_err(|e| TransportError::Decode(format!("value is not utf-8: {e}")).into())
}

/// Extract `(service, identity, namespace)` from an event tag.
pub(crate) fn parse_tag(tag: &str) -> std::result::Result<(String, String, String), EventError> {
    let captures = TAG_PATTERN
        .captures(tag)
        .ok_or_else(|| EventError::MalformedTag(tag.to_string()))?;

    Ok((
        captures[1].to_string(),
        captures[2].to_string(),
        captures[3].to_string(),
    ))
}

/// Derive the blocking-query index from an event id.
///
/// Mirrors the agent's own folding of the 128-bit id into the `X-Consul-Index`
/// it answers event lists with; polling with any other index makes the wait
/// return immediately and turns the long poll into a busy loop.
pub(crate) fn watch_index(id: &str) -> std::result::Result<u64, EventError> {
    let hex: String = id.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(EventError::MalformedId(id.to_string()));
    }

    let high = u64::from_str_radix(&hex[..16], 16)
        .map_err(|_| EventError::MalformedId(id.to_string()))?;
    let low = u64::from_str_radix(&hex[16..], 16)
        .map_err(|_| EventError::MalformedId(id.to_string()))?;

    Ok(high ^ low)
}

#[cfg(test)]
impl ConsulAdapter {
    pub(crate) fn test_adapter(service: &str) -> Self {
        Self {
            service: service.to_string(),
            http: reqwest::Client::new(),
            base_url: "http://127.0.0.1:8500".to_string(),
            event_name: "feature/changed".to_string(),
            wait_secs: 1,
            retry_delay: Duration::from_millis(10),
        }
    }
}
