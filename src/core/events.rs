use tubegrab_core::core::events::{EventEmitter, ItemProgress};
use tubegrab_core::models::task::Task;

/// Publishes task updates to the log.
#[derive(Clone, Default)]
pub struct TracingEventEmitter;

impl TracingEventEmitter {
    pub fn new() -> Self {
        Self
    }
}

impl EventEmitter for TracingEventEmitter {
    fn emit_task_state(&self, task: &Task) {
        tracing::info!(
            task_id = %task.id,
            status = %task.status,
            progress = task.progress,
            completed = task.completed_videos.len(),
            failed = task.failed_videos.len(),
            total = task.total,
            "{}",
            task.message
        );
    }

    fn emit_progress(&self, progress: &ItemProgress) {
        tracing::trace!(
            task_id = %progress.task_id,
            item = %progress.item_id,
            downloaded = progress.downloaded_bytes,
            "file progress {:.2}%",
            progress.percent
        );
    }
}
