//! Serde round-trip tests for pool configuration.
//!
//! Pools themselves are never serialized; the config is exported, shipped and
//! used to build an equivalent pool.

use std::time::Duration;

use nebula_pool::testing::CountingFactory;
use nebula_pool::{BoundedPool, DisabledPolicy, PoolConfig};
use pretty_assertions::assert_eq;

#[test]
fn config_round_trips_through_json() {
    let config = PoolConfig::named("orders")
        .with_capacity(8)
        .with_min_idle(2)
        .with_acquire_timeout(Duration::from_secs(5))
        .with_construct_timeout(Duration::from_millis(1500))
        .with_disabled_policy(DisabledPolicy::Reject);

    let json = serde_json::to_string(&config).unwrap();
    let back: PoolConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back, config);
}

#[test]
fn durations_use_human_readable_form() {
    let json = r#"{
        "name": "cache",
        "capacity": 4,
        "acquire_timeout": "250ms",
        "wait_window": "10s",
        "disabled_policy": "reject"
    }"#;
    let config: PoolConfig = serde_json::from_str(json).unwrap();

    assert_eq!(config.acquire_timeout, Some(Duration::from_millis(250)));
    assert_eq!(config.wait_window, Duration::from_secs(10));
    assert_eq!(config.disabled_policy, DisabledPolicy::Reject);
    assert_eq!(config.construct_timeout, None);
    assert_eq!(config.min_idle, 0);
}

#[test]
fn missing_fields_take_defaults() {
    let config: PoolConfig = serde_json::from_str("{}").unwrap();
    assert_eq!(config, PoolConfig::default());
}

#[test]
fn exported_config_rebuilds_an_equivalent_pool() {
    let original = BoundedPool::new(
        CountingFactory::new(),
        PoolConfig::named("export").with_capacity(3).with_min_idle(1),
    )
    .unwrap();
    original.set_capacity(4).unwrap();

    original.disable();
    let shipped = serde_json::to_string(&original.config()).unwrap();
    let config: PoolConfig = serde_json::from_str(&shipped).unwrap();

    let rebuilt = BoundedPool::new(CountingFactory::new(), config).unwrap();
    assert_eq!(rebuilt.capacity(), 4);
    assert_eq!(rebuilt.name(), "export");
    assert_eq!(rebuilt.idle_count(), 1);
    assert!(rebuilt.is_enabled());
}
