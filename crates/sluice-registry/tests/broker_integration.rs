//! End-to-end tests across the broker core: rate-limited admission,
//! session lifecycle, per-session result caching, and config discovery.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use sluice_limiter::SlidingWindowLimiter;
use sluice_registry::{RegistryConfig, SessionMeta, SessionRegistry};
use sluice_store::{ConfigCache, ConfigDiscovery, DiscoveredConfig, ResultCacheConfig};
use sluice_types::connection::{Connection, ConnectionError, MockConnection};
use sluice_types::result::{Column, QueryResult};

fn sample_result(rows: usize) -> QueryResult {
    QueryResult::succeeded(
        vec![Column::new("ID", "NUMBER")],
        (0..rows).map(|i| vec![json!(i)]).collect(),
    )
}

/// The connect path: every admitted attempt creates a session, the sixth
/// attempt inside the window is turned away with a retry hint.
#[tokio::test]
async fn connect_path_is_rate_limited_per_client() {
    let limiter = SlidingWindowLimiter::new();
    let registry = SessionRegistry::new(RegistryConfig::default()).unwrap();

    let mut tokens = Vec::new();
    for _ in 0..5 {
        let decision = limiter.allow("203.0.113.7");
        assert!(decision.allowed);
        tokens.push(registry.create(Arc::new(MockConnection::new()), SessionMeta::new("analyst")));
    }

    let denied = limiter.allow("203.0.113.7");
    assert!(!denied.allowed);
    assert!(denied.retry_after_secs >= 1);

    // The limiter keys on client address, not token: another client
    // connects fine, and existing sessions are untouched.
    assert!(limiter.allow("198.51.100.2").allowed);
    assert_eq!(registry.len(), 5);
    for token in &tokens {
        assert!(registry.get(token).await.is_some());
    }
}

/// Query results land in the session's private cache and survive until
/// the byte budget pushes them out, oldest first.
#[tokio::test]
async fn session_results_honor_byte_budget() {
    let first = sample_result(2);
    let second = sample_result(3);
    // Budget admits either result alone but not both together.
    let budget = second.estimated_size() + first.estimated_size() / 2;

    let registry = SessionRegistry::with_cache_config(
        RegistryConfig::default(),
        ResultCacheConfig::new().with_max_bytes(Some(budget)),
    )
    .unwrap();

    let conn = Arc::new(MockConnection::new());
    conn.push_response(Ok(first));
    conn.push_response(Ok(second));
    let token = registry.create(conn.clone(), SessionMeta::new("analyst"));
    let session = registry.get(&token).await.unwrap();

    let (q1, _) = session.run("SELECT * FROM small", Duration::from_secs(5)).await;
    let (q2, _) = session.run("SELECT * FROM large", Duration::from_secs(5)).await;

    assert!(session.results().get(&q1).is_none());
    assert!(session.results().get(&q2).is_some());
    assert!(session.results().stats().total_bytes <= budget);
}

/// A failed execution is cached as a value; the session stays alive and
/// the next query proceeds normally.
#[tokio::test]
async fn failed_query_is_cached_not_fatal() {
    let registry = SessionRegistry::new(RegistryConfig::default()).unwrap();
    let conn = Arc::new(MockConnection::new());
    conn.push_response(Err(ConnectionError::Query("syntax error".into())));
    let token = registry.create(conn.clone(), SessionMeta::new("analyst"));

    let session = registry.get(&token).await.unwrap();
    let (q1, bad) = session.run("SELEC 1", Duration::from_secs(5)).await;
    assert!(bad.is_failed());
    assert!(session.results().get(&q1).unwrap().is_failed());

    let (_, good) = session.run("SELECT 1", Duration::from_secs(5)).await;
    assert!(!good.is_failed());
    assert!(registry.get(&token).await.is_some());
}

/// A session removed while a caller still holds it: the cache stays
/// readable, the connection is closed exactly once, and the registry
/// reports the session gone.
#[tokio::test]
async fn removal_under_a_live_handle() {
    let registry = SessionRegistry::new(RegistryConfig::default()).unwrap();
    let conn = Arc::new(MockConnection::new());
    let token = registry.create(conn.clone(), SessionMeta::new("analyst"));

    let session = registry.get(&token).await.unwrap();
    let (q1, _) = session.run("SELECT 1", Duration::from_secs(5)).await;

    assert!(registry.remove(&token).await);
    assert!(registry.get(&token).await.is_none());
    assert_eq!(conn.close_count(), 1);

    // Teardown cleared the cache; the handle itself remains valid for
    // reads and writes until dropped.
    assert!(session.results().get(&q1).is_none());
    session.results().put("late", sample_result(1));
    assert!(session.results().get("late").is_some());
}

struct EntityDiscovery;

#[async_trait]
impl ConfigDiscovery for EntityDiscovery {
    async fn discover(
        &self,
        conn: &dyn Connection,
    ) -> Result<DiscoveredConfig, ConnectionError> {
        let result = conn
            .execute(
                "SELECT table_name FROM information_schema.tables",
                Duration::from_secs(5),
            )
            .await?;
        Ok(DiscoveredConfig::new(json!({
            "entities_found": result.row_count(),
        })))
    }
}

/// Discovery runs once per session token, is invalidated on logout, and
/// rebuilt on the next lookup.
#[tokio::test]
async fn discovery_config_tracks_session_lifetime() {
    let registry = SessionRegistry::new(RegistryConfig::default()).unwrap();
    let configs = ConfigCache::new();

    let conn = Arc::new(MockConnection::new());
    conn.push_response(Ok(sample_result(4)));
    let token = registry.create(conn.clone(), SessionMeta::new("analyst"));

    let session = registry.get(&token).await.unwrap();
    let config = configs
        .get_or_discover(&token, session.connection().as_ref(), &EntityDiscovery)
        .await
        .unwrap();
    assert_eq!(config.payload, json!({ "entities_found": 4 }));

    // Second lookup is served from cache; the scripted response queue is
    // untouched.
    let cached = configs
        .get_or_discover(&token, session.connection().as_ref(), &EntityDiscovery)
        .await
        .unwrap();
    assert_eq!(cached.payload, config.payload);
    assert_eq!(conn.executed().len(), 1);

    registry.remove(&token).await;
    assert!(configs.invalidate(&token));
    assert!(configs.get(&token).is_none());
}

/// The reaper and foreground removals share one eviction path: racing
/// them never double-closes a connection.
#[tokio::test(flavor = "multi_thread")]
async fn reaper_and_remove_do_not_double_close() {
    let registry = SessionRegistry::new(
        RegistryConfig::new()
            .with_idle_timeout(Duration::from_millis(10))
            .with_reap_interval(Duration::from_millis(5)),
    )
    .unwrap();
    registry.start_reaper();

    let mut conns = Vec::new();
    for i in 0..16 {
        let conn = Arc::new(MockConnection::new());
        let token = registry.create(conn.clone(), SessionMeta::new(format!("u{i}")));
        conns.push((token, conn));
    }

    tokio::time::sleep(Duration::from_millis(15)).await;

    // Race explicit removals against the sweeping reaper.
    let mut handles = Vec::new();
    for (token, _) in &conns {
        let registry = registry.clone();
        let token = token.clone();
        handles.push(tokio::spawn(async move { registry.remove(&token).await }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    registry.shutdown().await;

    assert!(registry.is_empty());
    for (_, conn) in &conns {
        assert_eq!(conn.close_count(), 1);
    }
}
