//! Hashing workers.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use dupscan_core::{ContentHash, ScanOutcome, WorkItem};

use crate::cancel::CancelSignal;

const READ_BUFFER_SIZE: usize = 64 * 1024;

/// How the pool's workers finished.
#[derive(Debug, Clone, Default)]
pub struct PoolStats {
    /// Outcomes each worker handed to the result queue, indexed by worker id.
    pub processed: Vec<u64>,
}

impl PoolStats {
    /// Outcomes handed off across all workers.
    pub fn total_processed(&self) -> u64 {
        self.processed.iter().sum()
    }
}

/// A fixed number of identical hashing workers.
pub struct WorkerPool {
    workers: usize,
    signal: CancelSignal,
}

impl WorkerPool {
    /// Create a pool of `workers` workers observing `signal`.
    pub fn new(workers: usize, signal: CancelSignal) -> Self {
        Self { workers, signal }
    }

    /// Start the workers.
    ///
    /// The returned task finishes once every worker has stopped. Each worker
    /// owns a clone of `work` and of `results`, so the result queue closes
    /// exactly then.
    pub fn spawn(
        self,
        work: async_channel::Receiver<WorkItem>,
        results: mpsc::Sender<ScanOutcome>,
    ) -> JoinHandle<PoolStats> {
        let handles: Vec<JoinHandle<u64>> = (0..self.workers)
            .map(|id| {
                let work = work.clone();
                let results = results.clone();
                let signal = self.signal.clone();
                tokio::spawn(run_worker(id, work, results, signal))
            })
            .collect();
        drop(work);
        drop(results);

        tokio::spawn(async move {
            let mut stats = PoolStats::default();
            for handle in handles {
                match handle.await {
                    Ok(processed) => stats.processed.push(processed),
                    Err(err) => {
                        error!("worker task failed: {err}");
                        stats.processed.push(0);
                    }
                }
            }
            stats
        })
    }
}

async fn run_worker(
    id: usize,
    work: async_channel::Receiver<WorkItem>,
    results: mpsc::Sender<ScanOutcome>,
    signal: CancelSignal,
) -> u64 {
    let mut processed = 0;

    loop {
        let item = tokio::select! {
            biased;
            _ = signal.triggered() => break,
            next = work.recv() => match next {
                Ok(item) => item,
                Err(_) => break,
            },
        };

        let Some(outcome) = hash_in_background(item, &signal).await else {
            break;
        };

        let delivered = tokio::select! {
            biased;
            _ = signal.triggered() => false,
            sent = results.send(outcome) => sent.is_ok(),
        };
        if !delivered {
            break;
        }
        processed += 1;
    }

    debug!(worker = id, processed, cancelled = signal.is_triggered(), "worker stopped");
    processed
}

/// Hash on the blocking pool. Returns `None` if the signal fires first; the
/// read itself is left to finish on its own and its result is dropped.
async fn hash_in_background(item: WorkItem, signal: &CancelSignal) -> Option<ScanOutcome> {
    let fallback = item.clone();
    let task = tokio::task::spawn_blocking(move || hash_file(item));

    tokio::select! {
        biased;
        _ = signal.triggered() => None,
        joined = task => Some(joined.unwrap_or_else(|err| {
            ScanOutcome::failed(fallback, format!("hashing task failed: {err}"))
        })),
    }
}

/// Hash one file. Open and read failures become an errored outcome.
pub fn hash_file(item: WorkItem) -> ScanOutcome {
    match compute_sha256(&item.path) {
        Ok(hash) => ScanOutcome::hashed(item, hash),
        Err(err) => {
            debug!(path = %item.path.display(), "hashing failed: {err}");
            ScanOutcome::failed(item, err.to_string())
        }
    }
}

/// Stream the whole file through SHA-256.
fn compute_sha256(path: &Path) -> io::Result<ContentHash> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; READ_BUFFER_SIZE];

    loop {
        let bytes_read = match file.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };
        hasher.update(&buffer[..bytes_read]);
    }

    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    Ok(ContentHash::new(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    const HI_SHA256: &str = "8f434346648f6b96df89dda901c5176b10a6d83961dd3c1ac88b59b2dc327aa4";

    #[test]
    fn test_hash_file_known_digest() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a.txt");
        fs::write(&path, "hi").unwrap();

        let outcome = hash_file(WorkItem::new(&path, 2));
        assert_eq!(outcome.hash.unwrap().to_hex(), HI_SHA256);
        assert_eq!(outcome.file_type, ".txt");
    }

    #[test]
    fn test_identical_and_differing_content() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::write(root.join("one.bin"), "duplicate content here").unwrap();
        fs::write(root.join("two.bin"), "duplicate content here").unwrap();
        fs::write(root.join("three.bin"), "duplicate content herf").unwrap();

        let one = hash_file(WorkItem::new(root.join("one.bin"), 22)).hash.unwrap();
        let two = hash_file(WorkItem::new(root.join("two.bin"), 22)).hash.unwrap();
        let three = hash_file(WorkItem::new(root.join("three.bin"), 22)).hash.unwrap();

        assert_eq!(one, two);
        assert_ne!(one, three);
    }

    #[test]
    fn test_missing_file_is_an_errored_outcome() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("vanished.log");

        let outcome = hash_file(WorkItem::new(&path, 10));
        assert!(outcome.is_error());
        assert_eq!(outcome.file_type, ".log");
        assert_eq!(outcome.size, 10);
        assert_eq!(outcome.path, path);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_emits_one_outcome_per_item() {
        let temp = TempDir::new().unwrap();
        let (work_tx, work_rx) = async_channel::bounded(4);
        let (result_tx, mut result_rx) = mpsc::channel(4);

        let pool = WorkerPool::new(3, CancelSignal::new()).spawn(work_rx, result_tx);

        let feeder = {
            let root = temp.path().to_path_buf();
            tokio::spawn(async move {
                for i in 0..20 {
                    let path = root.join(format!("f{i}.txt"));
                    if i % 5 != 0 {
                        fs::write(&path, format!("{}", i % 3)).unwrap();
                    }
                    work_tx.send(WorkItem::new(path, 1)).await.unwrap();
                }
            })
        };

        let mut outcomes = Vec::new();
        while let Some(outcome) = result_rx.recv().await {
            outcomes.push(outcome);
        }
        feeder.await.unwrap();
        let stats = pool.await.unwrap();

        assert_eq!(outcomes.len(), 20);
        assert_eq!(outcomes.iter().filter(|o| o.is_error()).count(), 4);
        assert_eq!(stats.processed.len(), 3);
        assert_eq!(stats.total_processed(), 20);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_each_worker_holds_its_own_receiver() {
        let temp = TempDir::new().unwrap();
        let (work_tx, work_rx) = async_channel::bounded(8);
        let (result_tx, mut result_rx) = mpsc::channel(8);

        let pool = WorkerPool::new(4, CancelSignal::new()).spawn(work_rx, result_tx);
        // The pool keeps no handle of its own; every worker receives directly.
        assert_eq!(work_tx.receiver_count(), 4);

        for i in 0..8 {
            let path = temp.path().join(format!("w{i}.txt"));
            fs::write(&path, "w").unwrap();
            work_tx.send(WorkItem::new(path, 1)).await.unwrap();
        }
        drop(work_tx);

        let mut received = 0;
        while result_rx.recv().await.is_some() {
            received += 1;
        }
        let stats = pool.await.unwrap();
        assert_eq!(received, 8);
        assert_eq!(stats.processed.len(), 4);
        assert_eq!(stats.total_processed(), 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_pool_stops_when_blocked_on_full_result_queue() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("x.txt");
        fs::write(&path, "x").unwrap();

        let signal = CancelSignal::new();
        let (work_tx, work_rx) = async_channel::bounded(16);
        // Capacity 1 and no consumer: the second outcome blocks its worker.
        let (result_tx, result_rx) = mpsc::channel(1);
        for _ in 0..8 {
            work_tx.send(WorkItem::new(&path, 1)).await.unwrap();
        }

        let pool = WorkerPool::new(2, signal.clone()).spawn(work_rx, result_tx);
        tokio::time::sleep(Duration::from_millis(50)).await;
        signal.trigger();

        let stats = tokio::time::timeout(Duration::from_secs(2), pool)
            .await
            .expect("workers did not stop after cancellation")
            .unwrap();
        assert!(stats.total_processed() <= 1);
        drop(result_rx);
        drop(work_tx);
    }
}
