//! Many clients appending and listing at once, the way the gateway drives a
//! backend. Runs on a multi-threaded runtime.

#![allow(clippy::expect_used, clippy::panic)]

use std::{collections::BTreeSet, sync::Arc, time::Duration};

use loggate_storage::{
    MemoryBackend, MockClock, StorageBackend, prefix_range,
    testutil::{entry_key, live_keys},
};
use tokio::task::JoinSet;

const CLIENTS: usize = 16;
const APPENDS_PER_CLIENT: usize = 50;
const RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn listings_taken_during_appends_are_sorted_and_only_grow() {
    let backend = MemoryBackend::new();

    let mut writers = JoinSet::new();
    for client in 0..CLIENTS {
        let backend = backend.clone();
        writers.spawn(async move {
            for i in 0..APPENDS_PER_CLIENT {
                let key = entry_key(client * APPENDS_PER_CLIENT + i);
                backend.set_with_ttl(key, b"{}".to_vec(), RETENTION).await.expect("append");
                tokio::task::yield_now().await;
            }
        });
    }

    let reader = {
        let backend = backend.clone();
        tokio::spawn(async move {
            let mut seen: BTreeSet<Vec<u8>> = BTreeSet::new();
            for _ in 0..50 {
                let listed = live_keys(&backend, b"logs\x00").await;
                assert!(listed.windows(2).all(|pair| pair[0] < pair[1]), "listing out of order");
                let now: BTreeSet<Vec<u8>> = listed.into_iter().collect();
                assert!(seen.is_subset(&now), "an acknowledged entry disappeared");
                seen = now;
                tokio::task::yield_now().await;
            }
        })
    };

    while let Some(done) = writers.join_next().await {
        done.expect("writer panicked");
    }
    reader.await.expect("reader panicked");

    assert_eq!(live_keys(&backend, b"logs\x00").await.len(), CLIENTS * APPENDS_PER_CLIENT);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn reads_racing_expiry_see_whole_values_or_nothing() {
    let clock = Arc::new(MockClock::new());
    let backend = MemoryBackend::with_clock(clock.clone());
    for n in 0..100 {
        let ttl = Duration::from_secs(1 + (n % 10) as u64);
        backend.set_with_ttl(entry_key(n), b"{\"n\":1}".to_vec(), ttl).await.expect("append");
    }

    let mut readers = JoinSet::new();
    for _ in 0..8 {
        let backend = backend.clone();
        readers.spawn(async move {
            for n in 0..100 {
                if let Some(body) = backend.get(&entry_key(n)).await.expect("get") {
                    assert_eq!(body.as_ref(), b"{\"n\":1}");
                }
            }
        });
    }
    for _ in 0..10 {
        clock.advance(Duration::from_secs(1));
        backend.purge_expired();
        tokio::task::yield_now().await;
    }

    while let Some(done) = readers.join_next().await {
        done.expect("reader panicked");
    }
    assert!(live_keys(&backend, b"logs\x00").await.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn clearing_logs_during_appends_spares_other_namespaces() {
    let backend = MemoryBackend::new();
    for n in 0..200 {
        let key = [&b"audit\x00"[..], n.to_string().as_bytes()].concat();
        backend.set(key, b"a".to_vec()).await.expect("seed");
    }

    let appender = {
        let backend = backend.clone();
        tokio::spawn(async move {
            for n in 0..200 {
                let key = entry_key(n);
                backend.set_with_ttl(key, b"{}".to_vec(), RETENTION).await.expect("append");
            }
        })
    };
    backend.clear_range(prefix_range(b"logs\x00")).await.expect("clear");
    appender.await.expect("appender panicked");

    assert_eq!(live_keys(&backend, b"audit\x00").await.len(), 200);
}
