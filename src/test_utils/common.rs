use crate::config::Settings;
use crate::fields::FieldMap;
use crate::fields::FieldValue;

/// Settings with short watch delays, suitable for bounded test waits.
pub fn test_settings(
    service: &str,
    namespaces: &[&str],
) -> Settings {
    let mut settings = Settings::default();
    settings.service.name = service.to_string();
    settings.service.namespaces = namespaces.iter().map(|n| n.to_string()).collect();
    settings.watch.retry_delay_in_ms = 10;
    settings.watch.resubscribe_delay_in_ms = 10;
    settings
}

/// Build a field map from literal pairs.
pub fn field_map(pairs: &[(&str, FieldValue)]) -> FieldMap {
    pairs
        .iter()
        .map(|(field, value)| (field.to_string(), value.clone()))
        .collect()
}

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    env_logger::init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}
