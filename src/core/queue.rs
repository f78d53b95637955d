use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tubegrab_core::core::events::{EventEmitter, ItemProgress};
use tubegrab_core::models::task::{CompletedItem, Item, ItemFailure, Task, TaskStatus};
use uuid::Uuid;

use crate::core::direct_downloader::{DirectDownloader, TransferError};
use crate::core::ledger::ProgressLedger;
use crate::models::media::{TransferOutcome, TransferProgress};
use crate::platforms::source_tool::ResolutionError;
use crate::platforms::traits::AssetResolver;

const PROGRESS_INTERVAL_MS: u64 = 150;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("no videos to download")]
    EmptyBatch,
}

/// Why one item of a batch ended up in the failed list.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error(transparent)]
    Transfer(#[from] TransferError),
}

impl ItemError {
    pub fn kind(&self) -> &'static str {
        match self {
            ItemError::Resolution(e) => e.kind(),
            ItemError::Transfer(e) => e.kind(),
        }
    }
}

pub struct ProgressThrottle {
    last_emit: std::time::Instant,
    min_interval: std::time::Duration,
}

impl ProgressThrottle {
    pub fn new(min_interval_ms: u64) -> Self {
        let min_interval = std::time::Duration::from_millis(min_interval_ms);
        let now = std::time::Instant::now();
        Self {
            last_emit: now.checked_sub(min_interval).unwrap_or(now),
            min_interval,
        }
    }

    pub fn should_emit(&mut self) -> bool {
        let now = std::time::Instant::now();
        if now.duration_since(self.last_emit) >= self.min_interval {
            self.last_emit = now;
            true
        } else {
            false
        }
    }
}

/// Normalizes every item and suffixes repeated ids (`x`, `x-2`, `x-3`) so each
/// item owns its output file.
pub fn prepare_items(items: Vec<Item>) -> Vec<Item> {
    let mut taken = HashSet::new();
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            let mut item = item.normalized(i);
            if !taken.insert(item.id.clone()) {
                let base = item.id.clone();
                let mut n = 2;
                while !taken.insert(format!("{}-{}", base, n)) {
                    n += 1;
                }
                item.id = format!("{}-{}", base, n);
                tracing::debug!("[queue] repeated id {} renamed to {}", base, item.id);
            }
            item
        })
        .collect()
}

/// Handle to a submitted batch. The task id is what callers poll with.
pub struct BatchHandle {
    task_id: Uuid,
    join: JoinHandle<()>,
}

impl BatchHandle {
    pub fn task_id(&self) -> Uuid {
        self.task_id
    }

    pub async fn wait(self) -> Result<(), tokio::task::JoinError> {
        self.join.await
    }
}

/// Runs batches in the background: one worker slot per concurrently processed
/// batch, items inside a batch strictly one after another.
#[derive(Clone)]
pub struct DownloadOrchestrator<E: EventEmitter> {
    ledger: ProgressLedger,
    resolver: Arc<dyn AssetResolver>,
    downloader: DirectDownloader,
    slots: Arc<Semaphore>,
    emitter: E,
}

impl<E: EventEmitter> DownloadOrchestrator<E> {
    pub fn new(
        ledger: ProgressLedger,
        resolver: Arc<dyn AssetResolver>,
        downloader: DirectDownloader,
        max_concurrent_batches: usize,
        emitter: E,
    ) -> Self {
        Self {
            ledger,
            resolver,
            downloader,
            slots: Arc::new(Semaphore::new(max_concurrent_batches.max(1))),
            emitter,
        }
    }

    pub fn ledger(&self) -> &ProgressLedger {
        &self.ledger
    }

    pub async fn submit(
        &self,
        items: Vec<Item>,
        destination: PathBuf,
    ) -> Result<BatchHandle, SubmitError> {
        if items.is_empty() {
            return Err(SubmitError::EmptyBatch);
        }
        let items = prepare_items(items);

        let task_id = Uuid::new_v4();
        let task = Task::new(task_id, items.len());
        self.ledger.insert(task.clone()).await;
        self.emitter.emit_task_state(&task);
        tracing::info!(
            "[queue] task {} accepted: {} videos into {}",
            task_id,
            items.len(),
            destination.display()
        );

        let this = self.clone();
        let join = tokio::spawn(async move {
            this.run_batch(task_id, items, destination).await;
        });

        Ok(BatchHandle { task_id, join })
    }

    async fn update<F>(&self, task_id: Uuid, f: F)
    where
        F: FnOnce(&mut Task),
    {
        match self.ledger.update(task_id, f).await {
            Ok(task) => self.emitter.emit_task_state(&task),
            Err(e) => tracing::warn!("[queue] ledger refused update: {}", e),
        }
    }

    async fn run_batch(&self, task_id: Uuid, items: Vec<Item>, destination: PathBuf) {
        let _permit = match self.slots.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => {
                tracing::error!("[queue] worker pool closed, task {} dropped", task_id);
                return;
            }
        };

        if let Err(e) = tokio::fs::create_dir_all(&destination).await {
            tracing::error!(
                "[queue] cannot create {}: {}",
                destination.display(),
                e
            );
            self.fail_batch(task_id, &items, &destination, &e).await;
            return;
        }

        for item in &items {
            self.process_item(task_id, item, &destination).await;
        }

        self.update(task_id, |t| {
            t.status = TaskStatus::Completed;
            t.progress = 100;
            t.current_video = None;
            t.current_video_title = None;
            t.clear_file_progress();
            t.message = "All downloads completed".to_string();
        })
        .await;
        tracing::info!("[queue] task {} finished", task_id);
    }

    async fn fail_batch(
        &self,
        task_id: Uuid,
        items: &[Item],
        destination: &Path,
        error: &std::io::Error,
    ) {
        let message = format!("Cannot write to {}: {}", destination.display(), error);
        self.update(task_id, |t| {
            for item in items {
                t.record_failed(ItemFailure {
                    id: item.id.clone(),
                    kind: "IOError".to_string(),
                    message: message.clone(),
                });
            }
            t.recompute_progress();
            t.status = TaskStatus::Failed;
            t.current_video = None;
            t.current_video_title = None;
            t.message = message.clone();
        })
        .await;
    }

    async fn process_item(&self, task_id: Uuid, item: &Item, destination: &Path) {
        tracing::info!("[queue] starting {} ({})", item.title, item.url);
        self.update(task_id, |t| {
            t.status = TaskStatus::Downloading;
            t.current_video = Some(item.id.clone());
            t.current_video_title = Some(item.title.clone());
            t.message = format!("Processing {}...", item.title);
        })
        .await;

        let outcome = self.download_item(task_id, item, destination).await;

        match &outcome {
            Ok(dl) => tracing::info!(
                "[queue] completed {} -> {} ({} bytes)",
                item.id,
                dl.file_path.display(),
                dl.file_size_bytes
            ),
            Err(e) => tracing::warn!("[queue] {} failed [{}]: {}", item.id, e.kind(), e),
        }

        self.update(task_id, move |t| {
            match outcome {
                Ok(dl) => {
                    t.record_completed(CompletedItem {
                        id: item.id.clone(),
                        path: dl.file_path,
                        size_bytes: dl.file_size_bytes,
                    });
                    t.message = format!("Completed {}", item.title);
                }
                Err(e) => {
                    t.record_failed(ItemFailure {
                        id: item.id.clone(),
                        kind: e.kind().to_string(),
                        message: e.to_string(),
                    });
                    t.message = format!("Failed to download {}", item.title);
                }
            }
            t.recompute_progress();
            t.clear_file_progress();
        })
        .await;
    }

    async fn download_item(
        &self,
        task_id: Uuid,
        item: &Item,
        destination: &Path,
    ) -> Result<TransferOutcome, ItemError> {
        let asset = self.resolver.resolve(item, destination).await?;

        self.update(task_id, |t| {
            t.message = format!("Downloading {}...", item.title);
        })
        .await;

        let (tx, mut rx) = mpsc::channel::<TransferProgress>(64);
        let ledger = self.ledger.clone();
        let emitter = self.emitter.clone();
        let item_id = item.id.clone();
        let progress_forwarder = tokio::spawn(async move {
            let mut throttle = ProgressThrottle::new(PROGRESS_INTERVAL_MS);
            while let Some(p) = rx.recv().await {
                emitter.emit_progress(&ItemProgress {
                    task_id,
                    item_id: item_id.clone(),
                    percent: p.percent,
                    downloaded_bytes: p.downloaded_bytes,
                    total_bytes: p.total_bytes,
                });
                if !throttle.should_emit() && p.percent < 100.0 {
                    continue;
                }
                let _ = ledger
                    .update(task_id, |t| {
                        t.file_progress = p.percent;
                        t.downloaded_bytes = p.downloaded_bytes;
                        t.total_bytes = p.total_bytes;
                    })
                    .await;
            }
        });

        let result = self
            .downloader
            .download(&asset.url, destination, &item.id, tx)
            .await;

        if let Err(e) = progress_forwarder.await {
            tracing::warn!("[queue] progress forwarder for {} died: {}", item.id, e);
        }

        Ok(result?)
    }
}
