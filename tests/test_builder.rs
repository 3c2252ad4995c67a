//! DexSync builder tests. None of these reach the network.

mod common;

use std::time::Duration;

use dex_sync::{DexError, DexSync, DuckDbStore, NetworkError, Store, SyncStatus};

#[test]
fn build_without_sync_stays_not_started() {
    let dex = DexSync::builder()
        .in_memory(true)
        .sync_on_build(false)
        .build()
        .unwrap();

    assert!(matches!(dex.status(), SyncStatus::NotStarted));
    assert!(matches!(dex.wait(), SyncStatus::NotStarted));
    assert!(dex.db_path().is_none());
    assert_eq!(dex.records().count().unwrap(), 0);
    assert_eq!(dex.to_string(), "DexSync(db=:memory:, status=not started)");
}

#[test]
fn populated_file_store_skips_network() {
    let tmp = tempfile::tempdir().unwrap();
    {
        let store = DuckDbStore::open(tmp.path().join("dex.duckdb")).unwrap();
        store.create(&common::record(1)).unwrap();
        store.create(&common::record(386)).unwrap();
    }

    // An unroutable endpoint would fail if the presence check did not short-circuit.
    let dex = DexSync::builder()
        .data_dir(tmp.path())
        .base_url("http://127.0.0.1:9/api/v2/pokemon/")
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    match dex.wait() {
        SyncStatus::Success(report) => assert!(report.skipped),
        other => panic!("expected skipped success, got {:?}", other),
    }
    assert_eq!(dex.db_path(), Some(tmp.path().join("dex.duckdb").as_path()));
    assert_eq!(dex.records().count().unwrap(), 2);
}

#[test]
fn unreachable_catalog_fails_without_writes() {
    let dex = DexSync::builder()
        .in_memory(true)
        .base_url("http://127.0.0.1:9/api/v2/pokemon/")
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();

    let status = dex.wait();
    assert!(matches!(
        status.error(),
        Some(DexError::Network(NetworkError::Transport(_)))
    ));
    assert_eq!(dex.store().count().unwrap(), 0);
}

#[test]
fn subscriber_sees_terminal_status() {
    let dex = DexSync::builder()
        .in_memory(true)
        .sync_on_build(false)
        .base_url("http://127.0.0.1:9/api/v2/pokemon/")
        .timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    let rx = dex.subscribe();

    let status = dex.sync();

    assert!(status.is_terminal());
    let seen: Vec<SyncStatus> = rx.try_iter().collect();
    assert!(matches!(seen[0], SyncStatus::NotStarted));
    assert!(matches!(seen[1], SyncStatus::Fetching));
    assert!(seen[2].is_terminal());
}

// ---------------------------------------------------------------------------
// Configuration validation
// ---------------------------------------------------------------------------

#[test]
fn zero_catalog_size_is_rejected() {
    let err = DexSync::builder()
        .in_memory(true)
        .catalog_size(0)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, DexError::InvalidArgument(_)));
}

#[test]
fn zero_fan_out_is_rejected() {
    let err = DexSync::builder()
        .in_memory(true)
        .fan_out(0)
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, DexError::InvalidArgument(_)));
}

#[test]
fn malformed_base_url_is_rejected() {
    let err = DexSync::builder()
        .in_memory(true)
        .base_url("::not a url::")
        .build()
        .err()
        .unwrap();
    assert!(matches!(err, DexError::Network(NetworkError::BadUrl(_))));
}

#[cfg(feature = "async")]
mod async_wrapper {
    use std::time::Duration;

    use dex_sync::{AsyncDexSync, DexError, DuckDbStore, PresenceCheck, Store, StoreError, SyncStatus};

    #[tokio::test]
    async fn builds_and_reports_status() {
        let dex = AsyncDexSync::builder()
            .in_memory(true)
            .sync_on_build(false)
            .build()
            .await
            .unwrap();
        assert!(matches!(dex.wait().await.unwrap(), SyncStatus::NotStarted));
        assert!(matches!(
            dex.toggle_favorite(1).await,
            Err(DexError::Store(StoreError::NotFound(1)))
        ));
    }

    #[tokio::test]
    async fn catalog_size_and_fan_out_are_validated() {
        let err = AsyncDexSync::builder()
            .in_memory(true)
            .catalog_size(0)
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DexError::InvalidArgument(_)));

        let err = AsyncDexSync::builder()
            .in_memory(true)
            .fan_out(0)
            .build()
            .await
            .err()
            .unwrap();
        assert!(matches!(err, DexError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn full_count_presence_is_forwarded() {
        let tmp = tempfile::tempdir().unwrap();
        {
            let store = DuckDbStore::open(tmp.path().join("dex.duckdb")).unwrap();
            store.create(&super::common::record(1)).unwrap();
            store.create(&super::common::record(386)).unwrap();
        }

        // Both boundary ids are stored, so only a full-count check goes to the
        // (unreachable) network.
        let dex = AsyncDexSync::builder()
            .data_dir(tmp.path())
            .base_url("http://127.0.0.1:9/api/v2/pokemon/")
            .timeout(Duration::from_millis(200))
            .presence(PresenceCheck::full_count(386))
            .build()
            .await
            .unwrap();

        let status = dex.wait().await.unwrap();
        assert!(matches!(
            status.error(),
            Some(DexError::Network(dex_sync::NetworkError::Transport(_)))
        ));
    }
}
