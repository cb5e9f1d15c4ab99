//! Directory discovery feeding the work queue.

use std::ops::ControlFlow;
use std::path::Path;

use jwalk::{Parallelism, WalkDir};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use dupscan_core::{DiscoveryWarning, MetricsStore, ScanConfig, WarningKind, WorkItem};

use crate::cancel::CancelSignal;

/// What the discoverer saw while walking the configured roots.
#[derive(Debug, Clone, Default)]
pub struct DiscoveryStats {
    /// Work items successfully handed to the work queue.
    pub files_emitted: u64,
    /// Regular files over the size limit.
    pub files_skipped_too_large: u64,
    /// Symlinks, devices, sockets and other non-regular entries.
    pub special_files_skipped: u64,
    /// Non-fatal problems: unreadable roots, traversal and metadata errors.
    pub warnings: Vec<DiscoveryWarning>,
    /// Whether discovery stopped early because of cancellation.
    pub cancelled: bool,
}

/// Walks the configured roots and emits a [`WorkItem`] per candidate file.
pub struct Discoverer {
    config: ScanConfig,
    store: MetricsStore,
    signal: CancelSignal,
}

impl Discoverer {
    /// Create a discoverer that reports into `store` and stops on `signal`.
    pub fn new(config: ScanConfig, store: MetricsStore, signal: CancelSignal) -> Self {
        Self {
            config,
            store,
            signal,
        }
    }

    /// Run discovery on the blocking pool. The work queue closes when the
    /// returned task finishes, whether it ran to completion or was cancelled.
    pub fn spawn(self, tx: async_channel::Sender<WorkItem>) -> JoinHandle<DiscoveryStats> {
        let runtime = Handle::current();
        tokio::task::spawn_blocking(move || self.run(tx, &runtime))
    }

    /// Walk every root, blocking the current thread.
    ///
    /// Must not be called from an async context; `runtime` is used to wait on
    /// the queue and the signal together.
    pub fn run(self, tx: async_channel::Sender<WorkItem>, runtime: &Handle) -> DiscoveryStats {
        let mut stats = DiscoveryStats::default();

        for root in self.config.roots() {
            if self.walk_root(&root, &tx, runtime, &mut stats).is_break() {
                stats.cancelled = true;
                debug!(root = %root.display(), "discovery cancelled");
                break;
            }
        }

        debug!(
            emitted = stats.files_emitted,
            too_large = stats.files_skipped_too_large,
            warnings = stats.warnings.len(),
            "discovery finished"
        );
        // Dropping `tx` here closes the work queue.
        stats
    }

    fn walk_root(
        &self,
        root: &Path,
        tx: &async_channel::Sender<WorkItem>,
        runtime: &Handle,
        stats: &mut DiscoveryStats,
    ) -> ControlFlow<()> {
        match std::fs::metadata(root) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => {
                record_warning(stats, DiscoveryWarning::not_a_directory(root));
                return ControlFlow::Continue(());
            }
            Err(err) => {
                record_warning(stats, DiscoveryWarning::missing_root(root, &err));
                return ControlFlow::Continue(());
            }
        }

        let parallelism = match self.config.walk_threads {
            0 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        };

        let walker = WalkDir::new(root)
            .parallelism(parallelism)
            .skip_hidden(false)
            .follow_links(false);

        for entry_result in walker {
            if self.signal.is_triggered() {
                return ControlFlow::Break(());
            }

            let entry = match entry_result {
                Ok(e) => e,
                Err(err) => {
                    let path = err.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    record_warning(
                        stats,
                        DiscoveryWarning::new(path, err.to_string(), WarningKind::WalkError),
                    );
                    continue;
                }
            };

            let file_type = entry.file_type();
            if file_type.is_dir() {
                // jwalk reports a directory it could not list on the
                // directory's own entry; its siblings are still walked.
                if let Some(err) = &entry.read_children_error {
                    record_warning(
                        stats,
                        DiscoveryWarning::new(
                            entry.path(),
                            err.to_string(),
                            WarningKind::WalkError,
                        ),
                    );
                }
                continue;
            }
            // Symlinks are never followed, and nothing but regular files is hashed.
            if !file_type.is_file() {
                stats.special_files_skipped += 1;
                continue;
            }

            let path = entry.path();
            let size = match entry.metadata() {
                Ok(m) => m.len(),
                Err(err) => {
                    record_warning(
                        stats,
                        DiscoveryWarning::new(&path, err.to_string(), WarningKind::MetadataError),
                    );
                    continue;
                }
            };

            if size > self.config.max_file_size {
                trace!(path = %path.display(), size, "skipping file over size limit");
                stats.files_skipped_too_large += 1;
                continue;
            }

            if !self.emit(WorkItem::new(path, size), tx, runtime) {
                return ControlFlow::Break(());
            }
            self.store.record_discovered();
            stats.files_emitted += 1;
        }

        ControlFlow::Continue(())
    }

    /// Hand one item to the work queue, waiting for space. Returns `false` if
    /// the signal fired first or the queue has no receivers left.
    fn emit(
        &self,
        item: WorkItem,
        tx: &async_channel::Sender<WorkItem>,
        runtime: &Handle,
    ) -> bool {
        runtime.block_on(async {
            tokio::select! {
                biased;
                _ = self.signal.triggered() => false,
                sent = tx.send(item) => sent.is_ok(),
            }
        })
    }
}

fn record_warning(stats: &mut DiscoveryStats, warning: DiscoveryWarning) {
    warn!(path = %warning.path.display(), kind = ?warning.kind, "{}", warning.message);
    stats.warnings.push(warning);
}
