use dupscan_core::{ContentHash, MetricsStore, ScanConfig, ScanOutcome, WorkItem};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

fn outcome(i: u64) -> ScanOutcome {
    let item = WorkItem::new(format!("/data/file{i}.bin"), i);
    if i % 7 == 0 {
        ScanOutcome::failed(item, "read error")
    } else {
        // Ten distinct contents, so most hashes end up in real groups.
        ScanOutcome::hashed(item, ContentHash::new([(i % 10) as u8; 32]))
    }
}

#[test]
fn test_snapshots_never_observe_torn_updates() {
    let store = MetricsStore::new();
    let done = Arc::new(AtomicBool::new(false));

    let writer = {
        let store = store.clone();
        let done = Arc::clone(&done);
        thread::spawn(move || {
            for i in 1..=2_000 {
                store.record_discovered();
                store.apply(outcome(i));
            }
            done.store(true, Ordering::Release);
        })
    };

    let readers: Vec<_> = (0..3)
        .map(|_| {
            let store = store.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut observed = 0;
                while !done.load(Ordering::Acquire) || observed == 0 {
                    let report = store.snapshot();
                    assert_eq!(
                        report.files_scanned,
                        report.errors.len() as u64 + report.hashed_files()
                    );
                    let status = store.status();
                    assert!(status.files_pending >= -1);
                    observed += 1;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let report = store.snapshot();
    assert_eq!(report.files_scanned, 2_000);
    assert_eq!(report.total_files_discovered, 2_000);
    assert_eq!(report.errors.len(), 2_000 / 7);
}

#[test]
fn test_status_json_shape() {
    let store = MetricsStore::new();
    store.record_discovered();
    store.record_discovered();
    store.apply(outcome(1));

    let json = serde_json::to_value(store.status()).unwrap();
    assert_eq!(json["files_scanned"], 1);
    assert_eq!(json["files_pending"], 1);
    assert_eq!(json["total_bytes"], 1);
    assert_eq!(json["errors_count"], 0);
    assert_eq!(json["running"], true);
}

#[test]
fn test_metrics_json_shape() {
    let store = MetricsStore::new();
    for i in [1, 11, 2, 7] {
        store.record_discovered();
        store.apply(outcome(i));
    }
    store.finish_with(|_| ());

    let json = serde_json::to_value(store.metrics()).unwrap();
    assert_eq!(json["total_files"], 4);
    assert_eq!(json["files_scanned"], 4);
    assert_eq!(json["files_pending"], 0);
    assert_eq!(json["total_bytes"], 21);
    assert_eq!(json["duplicate_files_count"], 1);
    assert_eq!(json["type_count"][".bin"], 3);

    let duplicates = json["duplicates"].as_object().unwrap();
    assert_eq!(duplicates.len(), 1);
    let (hash, paths) = duplicates.iter().next().unwrap();
    assert_eq!(hash, &ContentHash::new([1; 32]).to_hex());
    assert_eq!(paths.as_array().unwrap().len(), 2);

    let errors = json["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["path"], "/data/file7.bin");
    assert_eq!(errors[0]["error"], "read error");
    assert!(errors[0]["time"].is_string());
    assert!(json["start_time"].is_string());
    assert!(json["end_time"].is_string());
}

#[test]
fn test_config_serde_defaults() {
    let config: ScanConfig =
        serde_json::from_str(r#"{ "directories": ["/srv/media"] }"#).unwrap();
    assert_eq!(config.directories, vec![PathBuf::from("/srv/media")]);
    assert_eq!(config.workers, dupscan_core::DEFAULT_WORKERS);
    assert_eq!(config.max_file_size, dupscan_core::DEFAULT_MAX_FILE_SIZE);
    assert_eq!(config.queue_capacity, dupscan_core::DEFAULT_QUEUE_CAPACITY);
    assert!(config.validate().is_ok());
}
