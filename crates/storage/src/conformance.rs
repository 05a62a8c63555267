//! Behaviour the log store relies on, runnable against any backend.
//!
//! `loggate-log` writes each entry with [`set_with_ttl`] under
//! `namespace \0 id`, lists a namespace with one prefix [`get_range`], and
//! relies on the backend to hide entries once their retention elapses.
//! Each check below pins one of those assumptions using keys of that shape.
//! Engines wire them up with [`backend_contract_tests!`](crate::backend_contract_tests).
//!
//! [`set_with_ttl`]: StorageBackend::set_with_ttl
//! [`get_range`]: StorageBackend::get_range

use std::{sync::Arc, time::Duration};

use bytes::Bytes;

use crate::{HealthProbe, StorageBackend, prefix_range};

const NAMESPACE: &[u8] = b"logs\x00";
const RETENTION: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Key of the `n`th entry in the `logs` namespace. Zero padding to the id
/// width keeps byte order equal to numeric order.
#[must_use]
pub fn entry_key(n: usize) -> Vec<u8> {
    let mut key = NAMESPACE.to_vec();
    key.extend_from_slice(format!("{n:026}").as_bytes());
    key
}

fn entry_body(n: usize) -> Vec<u8> {
    format!(r#"{{"user":"u{n}","level":"info","seq":{n}}}"#).into_bytes()
}

async fn scan<B: StorageBackend>(backend: &B) -> Vec<(Bytes, Bytes)> {
    backend
        .get_range(prefix_range(NAMESPACE))
        .await
        .expect("namespace scan")
        .into_iter()
        .map(|kv| (kv.key, kv.value))
        .collect()
}

/// An acknowledged append is immediately readable, byte for byte.
pub async fn acknowledged_write_is_visible<B: StorageBackend>(backend: &B) {
    backend.set_with_ttl(entry_key(1), entry_body(1), RETENTION).await.expect("append");

    let stored = backend.get(&entry_key(1)).await.expect("get");
    assert_eq!(stored.as_deref(), Some(entry_body(1).as_slice()));
}

/// A namespace scan returns every entry once, ascending by key, whatever
/// order the writes arrived in.
pub async fn scan_returns_namespace_in_key_order<B: StorageBackend>(backend: &B) {
    for n in [7, 2, 9, 0, 4] {
        backend.set_with_ttl(entry_key(n), entry_body(n), RETENTION).await.expect("append");
    }

    let keys: Vec<Bytes> = scan(backend).await.into_iter().map(|(key, _)| key).collect();
    let expected: Vec<Bytes> = [0, 2, 4, 7, 9].map(|n| Bytes::from(entry_key(n))).to_vec();
    assert_eq!(keys, expected);
}

/// Keys that share bytes with the namespace but sit outside it stay out of
/// the scan.
pub async fn scan_ignores_neighbouring_namespaces<B: StorageBackend>(backend: &B) {
    backend.set_with_ttl(entry_key(1), entry_body(1), RETENTION).await.expect("append");
    for stray in [&b"logs"[..], b"logs\x01x", b"logsx", b"log\x00", b"metrics\x00a"] {
        backend.set_with_ttl(stray.to_vec(), b"{}".to_vec(), RETENTION).await.expect("append");
    }

    let scanned = scan(backend).await;
    assert_eq!(scanned.len(), 1, "got {scanned:?}");
    assert_eq!(scanned[0].0, Bytes::from(entry_key(1)));
}

/// Once its TTL elapses an entry disappears from both reads and scans,
/// while younger entries stay.
pub async fn expired_entries_leave_scans<B: StorageBackend>(backend: &B) {
    backend
        .set_with_ttl(entry_key(1), entry_body(1), Duration::from_millis(50))
        .await
        .expect("append short-lived");
    backend.set_with_ttl(entry_key(2), entry_body(2), RETENTION).await.expect("append");

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(backend.get(&entry_key(1)).await.expect("get"), None);
    let keys: Vec<Bytes> = scan(backend).await.into_iter().map(|(key, _)| key).collect();
    assert_eq!(keys, vec![Bytes::from(entry_key(2))]);
}

/// A zero TTL expires on the spot.
pub async fn zero_ttl_is_never_visible<B: StorageBackend>(backend: &B) {
    backend.set_with_ttl(entry_key(1), entry_body(1), Duration::ZERO).await.expect("append");

    assert_eq!(backend.get(&entry_key(1)).await.expect("get"), None);
    assert!(scan(backend).await.is_empty());
}

/// Writing an existing key replaces both the body and the deadline.
pub async fn rewrite_replaces_value_and_expiry<B: StorageBackend>(backend: &B) {
    backend
        .set_with_ttl(entry_key(1), b"first".to_vec(), Duration::from_millis(50))
        .await
        .expect("append");
    backend.set_with_ttl(entry_key(1), b"second".to_vec(), RETENTION).await.expect("rewrite");

    tokio::time::sleep(Duration::from_millis(120)).await;

    assert_eq!(backend.get(&entry_key(1)).await.expect("get"), Some(Bytes::from("second")));
    assert_eq!(scan(backend).await.len(), 1);
}

/// Missing and deleted keys read as `None`, and deleting twice is fine.
pub async fn missing_and_deleted_keys_read_as_none<B: StorageBackend>(backend: &B) {
    assert_eq!(backend.get(&entry_key(404)).await.expect("get missing"), None);

    backend.set_with_ttl(entry_key(1), entry_body(1), RETENTION).await.expect("append");
    backend.delete(&entry_key(1)).await.expect("delete");
    backend.delete(&entry_key(1)).await.expect("delete again");

    assert_eq!(backend.get(&entry_key(1)).await.expect("get deleted"), None);
}

/// Clearing the namespace range removes its entries and nothing else.
pub async fn purge_clears_only_the_namespace<B: StorageBackend>(backend: &B) {
    for n in 0..5 {
        backend.set_with_ttl(entry_key(n), entry_body(n), RETENTION).await.expect("append");
    }
    backend.set(b"logs\x01keep".to_vec(), b"{}".to_vec()).await.expect("set neighbour");

    backend.clear_range(prefix_range(NAMESPACE)).await.expect("clear");
    backend.clear_range(prefix_range(NAMESPACE)).await.expect("clear empty namespace");

    assert!(scan(backend).await.is_empty());
    assert!(backend.get(b"logs\x01keep").await.expect("get neighbour").is_some());
}

/// `writers` concurrent appends all complete and all land in the scan.
pub async fn concurrent_writers_all_land<B>(backend: Arc<B>, writers: usize)
where
    B: StorageBackend + 'static,
{
    let tasks: Vec<_> = (0..writers)
        .map(|n| {
            let backend = Arc::clone(&backend);
            tokio::spawn(async move {
                backend.set_with_ttl(entry_key(n), entry_body(n), RETENTION).await
            })
        })
        .collect();
    for task in tasks {
        task.await.expect("writer panicked").expect("append");
    }

    let scanned = scan(backend.as_ref()).await;
    assert_eq!(scanned.len(), writers);
    assert!(scanned.windows(2).all(|pair| pair[0].0 < pair[1].0), "scan out of order");
}

/// A freshly opened backend answers both probes as serving.
pub async fn health_probes_report_serving<B: StorageBackend>(backend: &B) {
    for probe in [HealthProbe::Liveness, HealthProbe::Readiness] {
        let status = backend.health_check(probe).await.expect("health check");
        assert!(status.is_serving(), "{probe}: {status}");
    }
}

/// Generates one `#[tokio::test]` per check above.
///
/// `$fresh` must evaluate to `(backend, guard)`, where `guard` keeps any
/// on-disk state alive for the length of the test. Concurrency runs on a
/// multi-threaded runtime so blocking engines are exercised the way the
/// gateway drives them.
#[macro_export]
macro_rules! backend_contract_tests {
    (@each $fresh:expr; $($check:ident),+ $(,)?) => {
        $(
            #[tokio::test]
            async fn $check() {
                let (backend, _guard) = $fresh;
                $crate::conformance::$check(&backend).await;
            }
        )+
    };
    ($fresh:expr) => {
        $crate::backend_contract_tests!(@each $fresh;
            acknowledged_write_is_visible,
            scan_returns_namespace_in_key_order,
            scan_ignores_neighbouring_namespaces,
            expired_entries_leave_scans,
            zero_ttl_is_never_visible,
            rewrite_replaces_value_and_expiry,
            missing_and_deleted_keys_read_as_none,
            purge_clears_only_the_namespace,
            health_probes_report_serving,
        );

        #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
        async fn concurrent_writers_all_land() {
            let (backend, _guard) = $fresh;
            let finished = tokio::time::timeout(
                std::time::Duration::from_secs(30),
                $crate::conformance::concurrent_writers_all_land(std::sync::Arc::new(backend), 64),
            )
            .await;
            assert!(finished.is_ok(), "concurrent appends did not finish");
        }
    };
}
