//! Integration Tests for the Cache Store
//!
//! Exercises the public API the way domain services use it: one store shared
//! across threads, typed values, locks and bulk calls.

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use mini_cache::{CacheConfig, CacheError, CacheStore, CacheValue, SetOptions};

// == Helper Functions ==

fn repair_record() -> CacheValue {
    let mut record = BTreeMap::new();
    record.insert("id".to_string(), CacheValue::Int(1042));
    record.insert(
        "cost".to_string(),
        CacheValue::Decimal(BigDecimal::from_str("199.990").unwrap()),
    );
    record.insert(
        "received".to_string(),
        CacheValue::Timestamp(DateTime::<Utc>::from_timestamp_millis(1_714_000_000_500).unwrap()),
    );
    record.insert(
        "history".to_string(),
        CacheValue::List(vec![
            CacheValue::from("received"),
            CacheValue::from("diagnosed"),
            CacheValue::Null,
        ]),
    );
    CacheValue::Map(record)
}

// == Entry Store ==

#[test]
fn test_unknown_key_is_a_miss() {
    let store = CacheStore::new();

    assert_eq!(store.get("client:404").unwrap(), None);
    assert_eq!(store.get_statistics().misses, 1);
    assert_eq!(store.get_statistics().hits, 0);
}

#[test]
fn test_nested_value_roundtrip() {
    let store = CacheStore::new();

    store.set("repair:1042", repair_record()).unwrap();

    assert_eq!(store.get("repair:1042").unwrap(), Some(repair_record()));
}

#[test]
fn test_nested_value_roundtrip_compressed() {
    let store = CacheStore::new();

    store
        .set_with("repair:1042", repair_record(), SetOptions::new().compressed())
        .unwrap();

    assert_eq!(store.get("repair:1042").unwrap(), Some(repair_record()));
}

#[test]
fn test_ttl_expiry() {
    let store = CacheStore::new();

    store
        .set_with("session", "abc", SetOptions::new().ttl(Duration::from_millis(100)))
        .unwrap();
    assert_eq!(store.get("session").unwrap(), Some(CacheValue::from("abc")));

    thread::sleep(Duration::from_millis(200));

    assert_eq!(store.get("session").unwrap(), None);
    assert!(!store.contains_key("session"));
}

#[test]
fn test_memory_usage_grows_with_content() {
    let store = CacheStore::new();
    assert_eq!(store.get_memory_usage(), 0);

    store.set("report:monthly", repair_record()).unwrap();

    assert!(store.get_memory_usage() > 0);
}

// == Eviction ==

#[test]
fn test_size_limit_scenario() {
    let store = CacheStore::new();
    store.configure(Some(2));

    store.set("k1", "v1").unwrap();
    store.set("k2", "v2").unwrap();
    store.set("k3", "v3").unwrap();

    assert_eq!(store.get("k1").unwrap(), None);
    assert_eq!(store.get("k2").unwrap(), Some(CacheValue::from("v2")));
    assert_eq!(store.get("k3").unwrap(), Some(CacheValue::from("v3")));
}

#[test]
fn test_store_from_config() {
    let config = CacheConfig {
        max_size: Some(3),
        ..CacheConfig::default()
    };
    let store = CacheStore::from_config(&config);

    for i in 0..10 {
        store.set(format!("device:{i}"), i).unwrap();
    }

    assert_eq!(store.len(), 3);
    assert_eq!(store.get_statistics().evictions, 7);
    assert!(store.contains_key("device:9"));
}

// == Pattern Invalidation ==

#[test]
fn test_pattern_invalidation_leaves_other_keys() {
    let store = CacheStore::new();
    store.set("user:1", "alice").unwrap();
    store.set("user:2", "bob").unwrap();
    store.set("user_settings", "dark").unwrap();
    store.set("claim:7", "open").unwrap();

    assert_eq!(store.invalidate_pattern("user:*").unwrap(), 2);

    assert_eq!(store.get("user:1").unwrap(), None);
    assert_eq!(store.get("user:2").unwrap(), None);
    assert!(store.contains_key("user_settings"));
    assert!(store.contains_key("claim:7"));
}

#[test]
fn test_pattern_invalidation_is_not_retroactive() {
    let store = CacheStore::new();
    store.set("user:1", "alice").unwrap();

    store.invalidate_pattern("user:*").unwrap();
    store.set("user:2", "bob").unwrap();

    assert!(store.contains_key("user:2"));
}

#[test]
fn test_invalid_pattern() {
    let store = CacheStore::new();
    assert!(matches!(
        store.invalidate_pattern("warranty:[0-9"),
        Err(CacheError::InvalidPattern { .. })
    ));
}

#[test]
fn test_double_star_pattern_invalidates_namespace() {
    let store = CacheStore::new();
    store.set("user:1", "alice").unwrap();
    store.set("user:1:sessions", 3).unwrap();
    store.set("claim:7", "open").unwrap();

    assert_eq!(store.invalidate_pattern("user:**").unwrap(), 2);
    assert!(store.contains_key("claim:7"));
}

// == Counters ==

#[test]
fn test_counter_scenario() {
    let store = CacheStore::new();

    store.set("counter", 0).unwrap();
    store.increment("counter", 1).unwrap();
    assert_eq!(store.get("counter").unwrap(), Some(CacheValue::Int(1)));

    store.decrement("counter", 1).unwrap();
    assert_eq!(store.get("counter").unwrap(), Some(CacheValue::Int(0)));
}

#[test]
fn test_incr_defaults_to_one() {
    let store = CacheStore::new();
    store.set("page_views", 0).unwrap();

    store.incr("page_views").unwrap();
    store.incr("page_views").unwrap();
    store.decr("page_views").unwrap();

    assert_eq!(store.get("page_views").unwrap(), Some(CacheValue::Int(1)));
}

#[test]
fn test_infinite_float_roundtrip_compressed() {
    let store = CacheStore::new();
    let reading = CacheValue::from(vec![1.5, f64::INFINITY, f64::NEG_INFINITY]);

    store
        .set_with("sensor:12", reading.clone(), SetOptions::new().compressed())
        .unwrap();

    assert_eq!(store.get("sensor:12").unwrap(), Some(reading));
    assert_eq!(store.get_statistics().hits, 1);
}

#[test]
fn test_increment_missing_key() {
    let store = CacheStore::new();
    assert!(matches!(
        store.increment("counter", 1),
        Err(CacheError::KeyNotFound(key)) if key == "counter"
    ));
}

#[test]
fn test_concurrent_increments_lose_no_updates() {
    const THREADS: usize = 8;
    const PER_THREAD: usize = 250;

    let store = Arc::new(CacheStore::new());
    store.set("hits", 0).unwrap();

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..PER_THREAD {
                    store.increment("hits", 1).unwrap();
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("increment thread panicked");
    }

    assert_eq!(
        store.get("hits").unwrap(),
        Some(CacheValue::Int((THREADS * PER_THREAD) as i64))
    );
}

#[test]
fn test_decimal_counter() {
    let store = CacheStore::new();
    store
        .set("balance", BigDecimal::from_str("10.05").unwrap())
        .unwrap();

    store.increment("balance", 5).unwrap();

    assert_eq!(
        store.get("balance").unwrap(),
        Some(CacheValue::Decimal(BigDecimal::from_str("15.05").unwrap()))
    );
}

// == Locking ==

#[test]
fn test_lock_blocks_other_writers_until_released() {
    let store = CacheStore::new();
    let locked = Barrier::new(2);
    let attempted = Barrier::new(2);

    thread::scope(|scope| {
        scope.spawn(|| {
            let lock = store.lock("claim:1");
            locked.wait();
            attempted.wait();
            drop(lock);
        });

        locked.wait();
        assert!(store.is_locked("claim:1"));
        assert!(matches!(
            store.set("claim:1", "approved"),
            Err(CacheError::Locked(_))
        ));
        attempted.wait();
    });

    assert!(!store.is_locked("claim:1"));
    store.set("claim:1", "approved").unwrap();
    assert_eq!(store.get("claim:1").unwrap(), Some(CacheValue::from("approved")));
}

#[test]
fn test_lock_waits_for_previous_holder() {
    let store = Arc::new(CacheStore::new());
    store.set("stock", 10).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let lock = store.lock("stock");
                let current = lock.get().unwrap().and_then(|v| v.as_i64()).unwrap();
                thread::sleep(Duration::from_millis(5));
                lock.set(current - 1).unwrap();
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("lock thread panicked");
    }

    assert_eq!(store.get("stock").unwrap(), Some(CacheValue::Int(6)));
    assert!(!store.is_locked("stock"));
}

#[test]
fn test_lock_released_when_holder_panics() {
    let store = CacheStore::new();

    let result = thread::scope(|scope| {
        scope
            .spawn(|| {
                let _lock = store.lock("document:9");
                panic!("render failed");
            })
            .join()
    });

    assert!(result.is_err());
    assert!(!store.is_locked("document:9"));
    store.set("document:9", "rendered").unwrap();
}

#[test]
fn test_reads_of_locked_key_return_committed_value() {
    let store = CacheStore::new();
    store.set("warranty:3", "active").unwrap();

    let _lock = store.lock("warranty:3");

    assert_eq!(store.get("warranty:3").unwrap(), Some(CacheValue::from("active")));
}

// == Bulk Operations ==

#[test]
fn test_bulk_roundtrip() {
    let store = CacheStore::new();

    store
        .set_many([
            ("notification:1", CacheValue::from("sent")),
            ("notification:2", CacheValue::from("queued")),
        ])
        .unwrap();

    let found = store
        .get_many(["notification:1", "notification:2", "notification:3"])
        .unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found["notification:2"], CacheValue::from("queued"));
}

#[test]
fn test_bulk_set_fails_atomically_on_locked_key() {
    let store = CacheStore::new();
    store.set("b", "old").unwrap();
    let _lock = store.lock("b");

    let result = store.set_many([("a", "new"), ("b", "new")]);

    assert!(matches!(result, Err(CacheError::Locked(_))));
    assert!(!store.contains_key("a"));
    assert_eq!(store.get("b").unwrap(), Some(CacheValue::from("old")));
}

// == Statistics ==

#[test]
fn test_statistics_survive_clear() {
    let store = CacheStore::new();
    store.set("a", 1).unwrap();
    store.get("a").unwrap();
    store.get("b").unwrap();

    store.clear();

    let stats = store.get_statistics();
    assert_eq!(stats.hits, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.total_entries, 0);
    assert_eq!(stats.hit_rate(), 0.5);
}
