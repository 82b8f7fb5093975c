//! The process wide prometheus registry.
//!
//! Metric structs derive `prometheus_metric_storage::MetricStorage` and are
//! looked up in [`storage`]. Tests never have to set anything up: the first
//! lookup installs an unprefixed registry.

use {
    prometheus::{Encoder, Registry, TextEncoder},
    prometheus_metric_storage::StorageRegistry,
    std::sync::OnceLock,
};

static REGISTRY: OnceLock<StorageRegistry> = OnceLock::new();

/// Installs a registry that prefixes every metric name with `prefix`.
///
/// Only the first installation wins. Returns `false` if a registry was
/// already in place, either from an earlier call or from a lookup, or if the
/// prefix is not a valid metric name.
pub fn setup_registry(prefix: &str) -> bool {
    let Ok(registry) = Registry::new_custom(Some(prefix.to_owned()), None) else {
        return false;
    };
    REGISTRY.set(StorageRegistry::new(registry)).is_ok()
}

pub fn storage() -> &'static StorageRegistry {
    REGISTRY.get_or_init(StorageRegistry::default)
}

pub fn registry() -> &'static Registry {
    storage().registry()
}

/// All registered metrics in the prometheus text exposition format.
pub fn encode() -> Result<String, prometheus::Error> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry().gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()))
}
