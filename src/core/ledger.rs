use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::RwLock;
use tubegrab_core::models::task::Task;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("task {0} not found")]
    NotFound(Uuid),
    #[error("task {0} is already finished")]
    Finalized(Uuid),
    #[error("task {id} cannot move from {from} to {to}")]
    Backwards { id: Uuid, from: String, to: String },
}

/// Shared table of task records. Writers replace whole records, readers get clones.
#[derive(Clone, Default)]
pub struct ProgressLedger {
    tasks: Arc<RwLock<HashMap<Uuid, Task>>>,
}

impl ProgressLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, task: Task) {
        let mut tasks = self.tasks.write().await;
        tasks.insert(task.id, task);
    }

    /// Applies `f` to a copy of the record and stores the copy if the change is legal.
    pub async fn update<F>(&self, id: Uuid, f: F) -> Result<Task, LedgerError>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.tasks.write().await;
        let current = tasks.get(&id).ok_or(LedgerError::NotFound(id))?;
        if current.status.is_terminal() {
            return Err(LedgerError::Finalized(id));
        }

        let mut next = current.clone();
        f(&mut next);

        if !current.status.can_move_to(next.status) {
            return Err(LedgerError::Backwards {
                id,
                from: current.status.to_string(),
                to: next.status.to_string(),
            });
        }

        next.updated_at = chrono::Utc::now();
        tasks.insert(id, next.clone());
        Ok(next)
    }

    pub async fn snapshot(&self, id: Uuid) -> Result<Task, LedgerError> {
        let tasks = self.tasks.read().await;
        tasks.get(&id).cloned().ok_or(LedgerError::NotFound(id))
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}
