use serde::Serialize;
use uuid::Uuid;

use crate::models::task::Task;

#[derive(Clone, Serialize)]
pub struct ItemProgress {
    pub task_id: Uuid,
    pub item_id: String,
    pub percent: f64,
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
}

/// Receives every task record the ledger accepts, plus per-chunk transfer progress.
pub trait EventEmitter: Send + Sync + Clone + 'static {
    fn emit_task_state(&self, task: &Task);
    fn emit_progress(&self, progress: &ItemProgress);
}
