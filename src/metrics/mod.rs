use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use tracing::error;

lazy_static! {
    pub static ref EVENTS_RECEIVED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "central_events_received_total",
            "Change events observed on the subscription, by namespace"
        ),
        &["namespace"]
    )
    .expect("Should succeed to create metric");

    pub static ref EVENTS_SELF_SUPPRESSED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "central_events_self_suppressed_total",
            "Own change echoes dropped without a refresh, by namespace"
        ),
        &["namespace"]
    )
    .expect("Should succeed to create metric");

    pub static ref EVENTS_MALFORMED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "central_events_malformed_total",
            "Notifications that could not be decoded, by transport"
        ),
        &["transport"]
    )
    .expect("Should succeed to create metric");

    pub static ref EVENTS_STALE_SKIPPED: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "central_events_stale_skipped_total",
            "Replayed notifications skipped by the clock filter, by transport"
        ),
        &["transport"]
    )
    .expect("Should succeed to create metric");

    pub static ref STORE_REFRESHES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "central_store_refreshes_total",
            "Namespace images installed into the cache, by namespace"
        ),
        &["namespace"]
    )
    .expect("Should succeed to create metric");

    pub static ref BULK_FETCHES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "central_bulk_fetches_total",
            "Full namespace reads against the backend, by namespace"
        ),
        &["namespace"]
    )
    .expect("Should succeed to create metric");

    pub static ref PUBLISHES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "central_publishes_total",
            "Change notifications sent after a global write, by namespace"
        ),
        &["namespace"]
    )
    .expect("Should succeed to create metric");

    pub static ref REMOTE_WRITE_FAILURES: IntCounterVec = IntCounterVec::new(
        Opts::new(
            "central_remote_write_failures_total",
            "Global writes whose backend half failed, by namespace"
        ),
        &["namespace"]
    )
    .expect("Should succeed to create metric");

    pub static ref REGISTRY: Registry = Registry::new();
}

static METRICS_INIT: Once = Once::new();

/// Register every collector with the crate registry.
///
/// Safe to call more than once; only the first call registers.
pub fn register_custom_metrics() {
    METRICS_INIT.call_once(|| {
        REGISTRY
            .register(Box::new(EVENTS_RECEIVED.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(EVENTS_SELF_SUPPRESSED.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(EVENTS_MALFORMED.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(EVENTS_STALE_SKIPPED.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(STORE_REFRESHES.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(BULK_FETCHES.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(PUBLISHES.clone()))
            .expect("collector can be registered");
        REGISTRY
            .register(Box::new(REMOTE_WRITE_FAILURES.clone()))
            .expect("collector can be registered");
    });
}

/// Render every registered collector for Prometheus to scrape.
pub fn gather_metrics() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        error!("could not encode custom metrics: {}", e);
    }

    match String::from_utf8(buffer) {
        Ok(body) => body,
        Err(e) => {
            error!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
