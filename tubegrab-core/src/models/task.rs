use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Starting,
    Downloading,
    Completed,
    Failed,
}

impl TaskStatus {
    fn rank(self) -> u8 {
        match self {
            TaskStatus::Starting => 0,
            TaskStatus::Downloading => 1,
            TaskStatus::Completed | TaskStatus::Failed => 2,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Staying put is allowed, moving backwards or leaving a terminal state is not.
    pub fn can_move_to(self, next: TaskStatus) -> bool {
        if self.is_terminal() {
            return self == next;
        }
        next.rank() >= self.rank()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Starting => "starting",
            TaskStatus::Downloading => "downloading",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One requested video.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Item {
    #[serde(default)]
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

impl Item {
    /// Fills an empty id or title from the item's position in its batch.
    pub fn normalized(mut self, index: usize) -> Self {
        if self.id.trim().is_empty() {
            self.id = format!("video-{}", index);
        }
        if self.title.trim().is_empty() {
            self.title = format!("Video {}", index + 1);
        }
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemFailure {
    pub id: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletedItem {
    pub id: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}

/// Progress record of one batch download, as seen by pollers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub status: TaskStatus,
    pub progress: u32,
    pub current_video: Option<String>,
    pub current_video_title: Option<String>,
    pub completed_videos: Vec<String>,
    pub failed_videos: Vec<String>,
    pub total: usize,
    pub message: String,
    pub file_progress: f64,
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub failures: Vec<ItemFailure>,
    pub files: Vec<CompletedItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(id: Uuid, total: usize) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: TaskStatus::Starting,
            progress: 0,
            current_video: None,
            current_video_title: None,
            completed_videos: Vec::new(),
            failed_videos: Vec::new(),
            total,
            message: "Initializing download...".to_string(),
            file_progress: 0.0,
            downloaded_bytes: 0,
            total_bytes: None,
            failures: Vec::new(),
            files: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn finished_count(&self) -> usize {
        self.completed_videos.len() + self.failed_videos.len()
    }

    pub fn recompute_progress(&mut self) {
        self.progress = if self.total == 0 {
            100
        } else {
            ((self.finished_count() * 100) / self.total) as u32
        };
    }

    pub fn clear_file_progress(&mut self) {
        self.file_progress = 0.0;
        self.downloaded_bytes = 0;
        self.total_bytes = None;
    }

    pub fn record_completed(&mut self, file: CompletedItem) {
        if self.finished_count() >= self.total {
            return;
        }
        self.completed_videos.push(file.id.clone());
        self.files.push(file);
    }

    pub fn record_failed(&mut self, failure: ItemFailure) {
        if self.finished_count() >= self.total {
            return;
        }
        self.failed_videos.push(failure.id.clone());
        self.failures.push(failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(id: &str) -> ItemFailure {
        ItemFailure {
            id: id.into(),
            kind: "AssetLinkTimeout".into(),
            message: "timeout".into(),
        }
    }

    #[test]
    fn status_moves_forward_only() {
        assert!(TaskStatus::Starting.can_move_to(TaskStatus::Downloading));
        assert!(TaskStatus::Downloading.can_move_to(TaskStatus::Downloading));
        assert!(TaskStatus::Downloading.can_move_to(TaskStatus::Completed));
        assert!(!TaskStatus::Downloading.can_move_to(TaskStatus::Starting));
        assert!(!TaskStatus::Completed.can_move_to(TaskStatus::Downloading));
        assert!(!TaskStatus::Completed.can_move_to(TaskStatus::Failed));
    }

    #[test]
    fn status_serializes_lowercase() {
        let json = serde_json::to_string(&TaskStatus::Downloading).unwrap();
        assert_eq!(json, "\"downloading\"");
    }

    #[test]
    fn item_normalized_fills_blanks() {
        let item = Item {
            id: "".into(),
            url: "https://www.youtube.com/watch?v=abc".into(),
            title: " ".into(),
            thumbnail: None,
        }
        .normalized(2);
        assert_eq!(item.id, "video-2");
        assert_eq!(item.title, "Video 3");
    }

    #[test]
    fn progress_counts_failures() {
        let mut task = Task::new(Uuid::new_v4(), 3);
        task.record_failed(failure("b"));
        task.recompute_progress();
        assert_eq!(task.progress, 33);
    }

    #[test]
    fn records_never_exceed_total() {
        let mut task = Task::new(Uuid::new_v4(), 1);
        task.record_failed(failure("a"));
        task.record_failed(failure("b"));
        assert_eq!(task.failed_videos, vec!["a".to_string()]);
        assert_eq!(task.failures.len(), 1);
    }
}
