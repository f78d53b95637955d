use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::commands::CommandError;
use crate::core::ledger::LedgerError;
use crate::core::queue::SubmitError;
use crate::core::url_parser;
use crate::models::task::{Item, Task};
use crate::AppState;

#[derive(Debug, Clone, Deserialize)]
pub struct StartDownloadRequest {
    #[serde(default)]
    pub videos: Vec<Item>,
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadStarted {
    pub success: bool,
    pub task_id: Uuid,
}

/// Accepts a batch and returns its task id right away; the work happens in the background.
pub async fn start_download(
    state: &AppState,
    request: StartDownloadRequest,
) -> Result<DownloadStarted, CommandError> {
    if let Some(pos) = request.videos.iter().position(|v| v.url.trim().is_empty()) {
        return Err(CommandError::InvalidRequest(format!(
            "video {} has no URL",
            pos + 1
        )));
    }

    let videos: Vec<Item> = request
        .videos
        .into_iter()
        .map(|mut v| {
            v.url = v.url.trim().to_string();
            if v.id.trim().is_empty() {
                if let Some(id) = url_parser::video_id(&v.url) {
                    v.id = id;
                }
            }
            v
        })
        .collect();

    let destination = request
        .path
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| state.settings.queue.default_output_dir.clone());

    let handle = state
        .orchestrator
        .submit(videos, destination)
        .await
        .map_err(|e| match e {
            SubmitError::EmptyBatch => CommandError::InvalidRequest(e.to_string()),
        })?;

    Ok(DownloadStarted {
        success: true,
        task_id: handle.task_id(),
    })
}

pub async fn download_progress(state: &AppState, task_id: &str) -> Result<Task, CommandError> {
    let id = Uuid::parse_str(task_id.trim())
        .map_err(|_| CommandError::NotFound(task_id.to_string()))?;
    state.ledger.snapshot(id).await.map_err(|e| match e {
        LedgerError::NotFound(id) => CommandError::NotFound(id.to_string()),
        other => CommandError::Failed(other.to_string()),
    })
}
