//! Time-series store selection and target mapping.

use build_metrics_adapters::{InfluxStore, InfluxStoreConfig};
use build_metrics_app::PublishTarget;
use build_metrics_config::TargetConfig;
use build_metrics_ports::{Credentials, TargetEndpoint, TimeSeriesStorePort};
use build_metrics_shared::SecretString;
use std::sync::Arc;

/// Build the InfluxDB store; writes have no timeout unless `timeout_ms` is set.
#[must_use]
pub fn build_store_port(timeout_ms: Option<u64>) -> Arc<dyn TimeSeriesStorePort> {
    Arc::new(InfluxStore::new(InfluxStoreConfig {
        timeout_ms,
        ..InfluxStoreConfig::default()
    }))
}

/// Map configured targets to publish targets, keeping their order.
#[must_use]
pub fn to_publish_targets(targets: &[TargetConfig]) -> Vec<PublishTarget> {
    targets.iter().map(to_publish_target).collect()
}

fn to_publish_target(target: &TargetConfig) -> PublishTarget {
    let credentials = target.username.as_ref().map(|username| Credentials {
        username: username.clone(),
        password: target
            .password
            .clone()
            .unwrap_or_else(|| SecretString::new("")),
    });
    PublishTarget {
        label: target.label().into(),
        endpoint: TargetEndpoint {
            url: target.url.clone(),
            credentials,
        },
        database: target.database.clone(),
        retention_policy: target.retention_policy.clone(),
        expose_exceptions: target.expose_exceptions,
    }
}
