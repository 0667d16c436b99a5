use chrono::Duration;
use scenemcp::{
    auth::{Identity, IdentitySource},
    mcp::{
        BoundedCache, CapabilityRegistry, InstanceFactory, ManualClock, McpInstanceRegistry,
        RequestDispatcher,
    },
    test_utils::stubs,
};
use serde_json::json;
use std::sync::Arc;

fn manual_cache(capacity: usize) -> (BoundedCache<String, u32>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::default());
    let cache = BoundedCache::with_clock(capacity, clock.clone()).expect("non-zero capacity");
    (cache, clock)
}

/// Test 1: size never exceeds capacity for any run of distinct inserts
#[test]
fn test_capacity_invariant_holds_after_every_set() {
    for capacity in 1..=6 {
        let (cache, clock) = manual_cache(capacity);

        for i in 0..40u32 {
            cache.set(format!("k{}", i), i);
            clock.advance(Duration::milliseconds(5));
            assert!(
                cache.len() <= capacity,
                "len {} exceeded capacity {}",
                cache.len(),
                capacity
            );
        }

        assert_eq!(cache.len(), capacity);
    }
}

/// Test 2: touching the first key protects it; the oldest untouched key goes
#[test]
fn test_lru_evicts_oldest_untouched_key() {
    for capacity in 2..=8 {
        let (cache, clock) = manual_cache(capacity);

        cache.set("k0".to_string(), 0);
        for i in 1..capacity {
            clock.advance(Duration::seconds(1));
            cache.set(format!("k{}", i), i as u32);
            clock.advance(Duration::seconds(1));
            assert_eq!(cache.get(&"k0".to_string()), Some(0));
        }

        clock.advance(Duration::seconds(1));
        let evicted = cache.set("new".to_string(), 99);

        assert_eq!(evicted.as_deref(), Some("k1"), "capacity {}", capacity);
        assert!(cache.contains(&"k0".to_string()));
        assert!(cache.contains(&"new".to_string()));
        assert_eq!(cache.len(), capacity);
    }
}

/// Test 3: the two capacity-2 scenarios through the full dispatch path
#[tokio::test]
async fn test_dispatch_evicts_least_recent_identity() -> anyhow::Result<()> {
    let clock = Arc::new(ManualClock::default());
    let factory = InstanceFactory::new(
        Arc::new(CapabilityRegistry::builtin()),
        stubs::collaborators("X"),
    );
    let registry = Arc::new(McpInstanceRegistry::with_clock(2, factory, clock.clone())?);
    let dispatcher = RequestDispatcher::new(registry.clone());

    let ping = serde_json::to_vec(&json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }))?;
    let user = |key: &str| Identity::new(key, IdentitySource::ApiKey);

    dispatcher.dispatch(&ping, &user("u1")).await;
    clock.advance(Duration::seconds(1));
    dispatcher.dispatch(&ping, &user("u2")).await;
    clock.advance(Duration::seconds(1));
    dispatcher.dispatch(&ping, &user("u3")).await;

    assert_eq!(registry.len(), 2);
    assert!(!registry.contains(&"u1".into()));
    assert!(registry.contains(&"u2".into()));
    assert!(registry.contains(&"u3".into()));

    // u2 is touched, so u3 becomes the eviction candidate
    clock.advance(Duration::seconds(1));
    dispatcher.dispatch(&ping, &user("u2")).await;
    clock.advance(Duration::seconds(1));
    dispatcher.dispatch(&ping, &user("u1")).await;

    assert!(registry.contains(&"u1".into()));
    assert!(registry.contains(&"u2".into()));
    assert!(!registry.contains(&"u3".into()));
    assert_eq!(registry.stats().evictions, 2);

    Ok(())
}

/// Test 4: repeated hits return the same instance and never evict
#[test]
fn test_cache_hit_is_idempotent() -> anyhow::Result<()> {
    let registry = stubs::registry(3, stubs::collaborators("X"));
    let identity = Identity::new("repeat", IdentitySource::OAuth);

    let first = registry.get_or_create(&identity);
    let before = registry.stats();
    let second = registry.get_or_create(&identity);
    let third = registry.get_or_create(&identity);
    let after = registry.stats();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&second, &third));
    assert_eq!(after.misses, before.misses);
    assert_eq!(after.evictions, 0);
    assert_eq!(after.hits, before.hits + 2);

    Ok(())
}

/// Test 5: every identity sees the same tools in the same order
#[test]
fn test_capability_surface_is_identity_independent() {
    let registry = stubs::registry(10, stubs::collaborators("X"));

    let surfaces: Vec<Vec<&'static str>> = ["a", "b", "c"]
        .iter()
        .map(|key| {
            registry
                .get_or_create(&Identity::new(*key, IdentitySource::ApiKey))
                .tool_names()
        })
        .collect();

    assert_eq!(surfaces[0], vec!["generate_scene", "get_docs"]);
    assert!(surfaces.windows(2).all(|pair| pair[0] == pair[1]));
}

/// Test 6: a burst of cold starts across identities stays within capacity
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_dispatch_respects_capacity() -> anyhow::Result<()> {
    let dispatcher = stubs::dispatcher(4, stubs::collaborators("X"));
    let request = Arc::new(serde_json::to_vec(
        &json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }),
    )?);

    let mut handles = Vec::new();
    for i in 0..64 {
        let dispatcher = dispatcher.clone();
        let request = request.clone();
        handles.push(tokio::spawn(async move {
            let identity = Identity::new(format!("user-{}", i % 12), IdentitySource::ApiKey);
            let response = dispatcher.dispatch(&request, &identity).await;
            assert!(response.result.is_some());
            assert!(dispatcher.registry().len() <= 4);
        }));
    }

    for handle in handles {
        handle.await?;
    }

    assert_eq!(dispatcher.registry().len(), 4);

    Ok(())
}
