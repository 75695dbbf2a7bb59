//! Facade tests: key derivation and lifecycle forwarding.

use std::sync::Arc;

use nebula_pool::testing::CountingFactory;
use nebula_pool::{PoolConfig, PoolKey, Pools};
use pretty_assertions::assert_eq;

fn config() -> PoolConfig {
    PoolConfig::named("facade").with_capacity(2)
}

fn pool_from_helper(pools: &Pools<CountingFactory>) -> Arc<nebula_pool::BoundedPool<CountingFactory>> {
    pools.pool(None, CountingFactory::new(), config()).unwrap()
}

#[test]
fn explicit_key_is_shared_across_call_sites() {
    let pools = Pools::new();
    let a = pools.pool(Some("db"), CountingFactory::new(), config()).unwrap();
    let b = pools.pool(Some("db"), CountingFactory::new(), config()).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(pools.registry().contains_key(&PoolKey::named("db")));
}

#[test]
fn derived_key_is_stable_for_one_call_site() {
    let pools = Pools::new();
    let a = pool_from_helper(&pools);
    let b = pool_from_helper(&pools);

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(pools.registry().len(), 1);
}

#[test]
fn distinct_call_sites_get_distinct_pools() {
    let pools = Pools::new();
    let a = pools.pool(None, CountingFactory::new(), config()).unwrap();
    let b = pools.pool(None, CountingFactory::new(), config()).unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_eq!(pools.registry().len(), 2);
}

#[test]
fn acquire_releases_through_guard() {
    let pools = Pools::new();
    let checkout = pools
        .acquire(Some("guarded"), CountingFactory::new(), config())
        .unwrap();
    let id = checkout.id();
    let pool = Arc::clone(checkout.pool());
    drop(checkout);

    assert_eq!(pool.idle_ids(), vec![id]);
}

#[test]
fn lifecycle_is_forwarded_to_every_pool() {
    let pools = Pools::new();
    let warm = config().with_min_idle(2);
    let a = pools.pool(Some("a"), CountingFactory::new(), warm.clone()).unwrap();
    let b = pools.pool(Some("b"), CountingFactory::new(), warm).unwrap();

    pools.disable_all();
    assert!(!a.is_enabled() && !b.is_enabled());
    assert_eq!(a.parked_count() + b.parked_count(), 4);

    pools.enable_all().unwrap();
    assert_eq!(a.idle_count() + b.idle_count(), 4);

    pools.close_all();
    assert_eq!(a.idle_count() + b.idle_count(), 0);
    assert_eq!(pools.registry().len(), 2);

    pools.clear();
    assert!(pools.registry().is_empty());
}

#[test]
fn enable_all_reports_recreation_failure() {
    let pools = Pools::new();
    let pool = pools
        .pool(Some("flaky"), CountingFactory::new(), config().with_min_idle(1))
        .unwrap();

    pools.disable_all();
    pool.factory().set_failing(true);
    assert!(pools.enable_all().is_err());
    assert!(pool.is_enabled());
}
