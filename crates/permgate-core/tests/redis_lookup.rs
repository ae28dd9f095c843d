//! Integration tests against a real Redis.
//!
//! Tests use testcontainers to spin up a Redis instance.

use std::sync::Arc;
use std::time::Duration;

use permgate_core::{
    CancellationToken, Decision, LocalCache, PermError, PermgateConfig, RedisSettings,
    RemoteLookup, Resolver,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::redis::Redis;
use tokio::sync::OnceCell;

// Shared Redis container for all tests
static SHARED_REDIS: OnceCell<(ContainerAsync<Redis>, String)> = OnceCell::const_new();

/// Get or create the shared Redis container
async fn get_redis_url() -> String {
    let (_, url) = SHARED_REDIS
        .get_or_init(|| async {
            let container = Redis::default()
                .start()
                .await
                .expect("start redis container");

            let host_port = container.get_host_port_ipv4(6379).await.expect("get port");
            let url = format!("redis://127.0.0.1:{}", host_port);

            (container, url)
        })
        .await;

    url.clone()
}

async fn seed(url: &str, commands: Vec<redis::Cmd>) {
    let client = redis::Client::open(url).expect("redis client");
    let mut conn = client
        .get_multiplexed_async_connection()
        .await
        .expect("redis connection");
    for cmd in commands {
        let _: () = cmd.query_async(&mut conn).await.expect("seed command");
    }
}

fn settings(url: String) -> RedisSettings {
    RedisSettings {
        url: Some(url),
        pool_size: 4,
        timeout_ms: 5000,
    }
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_connect_reports_no_replicas() {
    let url = get_redis_url().await;
    let lookup = RemoteLookup::connect(&settings(url)).await.unwrap();
    assert_eq!(lookup.replicas(), 0);
}

#[tokio::test]
async fn test_connect_refused() {
    // Nothing listens on port 1
    let err = RemoteLookup::connect(&RedisSettings {
        url: Some("redis://127.0.0.1:1".into()),
        pool_size: 1,
        timeout_ms: 500,
    })
    .await
    .unwrap_err();
    assert!(matches!(err, PermError::Connection(_)));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_hash_and_legacy_records() {
    let url = get_redis_url().await;
    seed(
        &url,
        vec![
            redis::cmd("DEL")
                .arg("it:hash.example")
                .arg("it:legacy.example")
                .arg("it:broken.example")
                .to_owned(),
            redis::cmd("HSET")
                .arg("it:hash.example")
                .arg("version")
                .arg("4")
                .arg("data")
                .arg("0")
                .to_owned(),
            redis::cmd("SET").arg("it:legacy.example").arg("1").to_owned(),
            redis::cmd("HSET")
                .arg("it:broken.example")
                .arg("data")
                .arg("1")
                .to_owned(),
        ],
    )
    .await;

    let lookup = RemoteLookup::connect(&settings(url)).await.unwrap();
    let cancel = CancellationToken::new();

    assert_eq!(lookup.get(&cancel, "it:hash.example").await.unwrap(), "0");
    assert_eq!(lookup.get(&cancel, "it:legacy.example").await.unwrap(), "1");
    assert!(matches!(
        lookup.get(&cancel, "it:broken.example").await,
        Err(PermError::Decode { .. })
    ));
    assert!(matches!(
        lookup.get(&cancel, "it:absent.example").await,
        Err(PermError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_resolver_end_to_end() {
    let url = get_redis_url().await;
    seed(
        &url,
        vec![
            redis::cmd("DEL").arg("perm/e2e.example").to_owned(),
            redis::cmd("HSET")
                .arg("perm/e2e.example")
                .arg("data")
                .arg("1")
                .arg("version")
                .arg("1")
                .to_owned(),
        ],
    )
    .await;

    let mut config = PermgateConfig::default();
    config.redis = settings(url.clone());
    let resolver = Resolver::connect(&config).await.unwrap();
    let cancel = CancellationToken::new();

    assert_eq!(
        resolver.decide(&cancel, "perm/e2e.example").await.unwrap(),
        Decision::Allow
    );

    // Change the stored record; the cached decision is still served
    seed(
        &url,
        vec![
            redis::cmd("HSET")
                .arg("perm/e2e.example")
                .arg("data")
                .arg("0")
                .to_owned(),
        ],
    )
    .await;
    assert_eq!(
        resolver.decide(&cancel, "perm/e2e.example").await.unwrap(),
        Decision::Allow
    );

    resolver.shutdown().await;
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_short_ttl_refetches() {
    let url = get_redis_url().await;
    seed(
        &url,
        vec![
            redis::cmd("DEL").arg("perm/ttl.example").to_owned(),
            redis::cmd("SET").arg("perm/ttl.example").arg("0").to_owned(),
        ],
    )
    .await;

    let remote = RemoteLookup::connect(&settings(url.clone())).await.unwrap();
    let resolver = Resolver::new(Arc::new(LocalCache::new(Duration::from_millis(100))), remote);
    let cancel = CancellationToken::new();

    assert_eq!(resolver.resolve(&cancel, "perm/ttl.example").await.unwrap(), "0");

    seed(
        &url,
        vec![redis::cmd("SET").arg("perm/ttl.example").arg("1").to_owned()],
    )
    .await;
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(resolver.resolve(&cancel, "perm/ttl.example").await.unwrap(), "1");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_non_utf8_hash_value_is_decode_error() {
    let url = get_redis_url().await;
    seed(
        &url,
        vec![
            redis::cmd("DEL").arg("it:bytes.example").to_owned(),
            redis::cmd("HSET")
                .arg("it:bytes.example")
                .arg("data")
                .arg(&[0xffu8, 0xfe][..])
                .arg("version")
                .arg("1")
                .to_owned(),
        ],
    )
    .await;

    let lookup = RemoteLookup::connect(&settings(url)).await.unwrap();
    assert!(matches!(
        lookup.get(&CancellationToken::new(), "it:bytes.example").await,
        Err(PermError::Decode { .. })
    ));
}
