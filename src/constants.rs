// -
// Service defaults

/// Fallback service name used when none is configured.
pub(crate) const DEFAULT_SERVICE_NAME: &str = "mothership";

/// Consul user event fired on every namespace change.
pub(crate) const DEFAULT_CONSUL_EVENT_NAME: &str = "feature/changed";

// -
// Watch loop tuning

/// Delay before retrying a failed or empty poll, in milliseconds.
pub(crate) const DEFAULT_RETRY_DELAY_MS: u64 = 1_000;

/// Delay before re-establishing a dropped subscription, in milliseconds.
pub(crate) const DEFAULT_RESUBSCRIBE_DELAY_MS: u64 = 1_000;

/// Long-poll hold time requested from the Consul event endpoint, in seconds.
pub(crate) const DEFAULT_CONSUL_WAIT_SECS: u64 = 55;
