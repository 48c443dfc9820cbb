//! Tests against a live Redis. Run with
//!
//!   REDIS_URL=redis://127.0.0.1:6379/ cargo test --test redis_store_test -- --ignored
//!
//! Each test writes to its own uniquely named stream and deletes it afterwards.

use std::sync::Arc;

use chrono::{Duration, Utc};
use homelog::{
    redis_client,
    store::{RedisStore, SampleStore},
};

async fn store() -> Option<(RedisStore, redis::aio::ConnectionManager)> {
    let url = std::env::var("REDIS_URL").ok()?;
    let conn = redis_client::connect(&url).await.unwrap();
    Some((RedisStore::new(conn.clone()), conn))
}

fn unique_stream(label: &str) -> String {
    format!(
        "test-{label}-{}-{}",
        std::process::id(),
        Utc::now().timestamp_nanos_opt().unwrap_or_default()
    )
}

async fn cleanup(conn: &mut redis::aio::ConnectionManager, stream: &str) {
    let _: () = redis::pipe()
        .del(format!("homelog:stream:{stream}"))
        .ignore()
        .srem("homelog:streams", stream)
        .ignore()
        .query_async(conn)
        .await
        .unwrap();
}

#[tokio::test]
#[ignore = "needs REDIS_URL"]
async fn test_concurrent_appends_all_persist() {
    let Some((store, mut conn)) = store().await else {
        return;
    };
    let store = Arc::new(store);
    let stream = unique_stream("concurrent");

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let store = store.clone();
            let stream = stream.clone();
            tokio::spawn(async move { store.append(&stream, i as f64).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let now = Utc::now();
    let start = now - Duration::minutes(1);
    let end = now + Duration::minutes(1);
    assert_eq!(store.count_range(&stream, start, end).await.unwrap(), 16);

    let samples = store.select_range(&stream, start, end).await.unwrap();
    let mut values: Vec<f64> = samples.iter().map(|s| s.value).collect();
    values.sort_by(|a, b| a.total_cmp(b));
    assert_eq!(values, (0..16).map(f64::from).collect::<Vec<_>>());
    assert!(samples.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));

    cleanup(&mut conn, &stream).await;
}

#[tokio::test]
#[ignore = "needs REDIS_URL"]
async fn test_append_then_latest_and_registry() {
    let Some((store, mut conn)) = store().await else {
        return;
    };
    let stream = unique_stream("latest");

    store.append(&stream, 78.5).await.unwrap();
    store.append(&stream, 78.5).await.unwrap();
    let last = store.append(&stream, -3.25).await.unwrap();

    let latest = store.latest(&stream).await.unwrap().unwrap();
    assert_eq!(latest, last);
    assert!(store.streams().await.unwrap().contains(&stream));

    // Duplicate (timestamp, value) pairs are distinct records.
    let start = last.timestamp - Duration::minutes(1);
    let end = last.timestamp + Duration::minutes(1);
    assert_eq!(store.count_range(&stream, start, end).await.unwrap(), 3);
    assert_eq!(store.count_range(&stream, end, start).await.unwrap(), 0);

    store.ping().await.unwrap();
    cleanup(&mut conn, &stream).await;
}
