mod common;

use std::sync::Arc;

use async_trait::async_trait;

use tubegrab_core::models::settings::AppSettings;
use tubegrab_core::models::task::{Item, TaskStatus};
use tubegrab_lib::cli::parse_batch;
use tubegrab_lib::commands::downloads::{download_progress, start_download, StartDownloadRequest};
use tubegrab_lib::commands::playlist::extract_playlist;
use tubegrab_lib::commands::CommandError;
use tubegrab_lib::platforms::playlist::{items_from_links, ExtractionError};
use tubegrab_lib::platforms::traits::PlaylistExtractor;
use tubegrab_lib::AppState;

use common::{start_media_server, Scripted, ScriptedResolver};

struct FixedPlaylist(Vec<String>);

#[async_trait]
impl PlaylistExtractor for FixedPlaylist {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn extract(&self, _playlist_url: &str) -> Result<Vec<Item>, ExtractionError> {
        if self.0.is_empty() {
            return Err(ExtractionError::NoLinks);
        }
        Ok(items_from_links(self.0.clone()))
    }
}

fn state(resolver: ScriptedResolver, links: Vec<&str>) -> AppState {
    AppState::with_parts(
        AppSettings::default(),
        Arc::new(resolver),
        Arc::new(FixedPlaylist(links.into_iter().map(String::from).collect())),
    )
    .unwrap()
}

#[tokio::test]
async fn test_unknown_task_id_not_found() {
    let state = state(ScriptedResolver::new(vec![]), vec![]);

    let err = download_progress(&state, "not-a-uuid").await.unwrap_err();
    assert!(matches!(err, CommandError::NotFound(_)));

    let err = download_progress(&state, &uuid::Uuid::new_v4().to_string())
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::NotFound(_)));
}

#[tokio::test]
async fn test_empty_batch_is_invalid() {
    let state = state(ScriptedResolver::new(vec![]), vec![]);
    let err = start_download(
        &state,
        StartDownloadRequest {
            videos: vec![],
            path: None,
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, CommandError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_video_without_url_is_invalid() {
    let state = state(ScriptedResolver::new(vec![]), vec![]);
    let request = parse_batch(r#"[{"url": "https://youtu.be/aaaaaaaaaaa"}, {"url": "  "}]"#).unwrap();
    let err = start_download(&state, request).await.unwrap_err();
    assert_eq!(err, CommandError::InvalidRequest("video 2 has no URL".into()));
}

#[tokio::test]
async fn test_start_then_poll_until_done() {
    let addr = start_media_server().await;
    let resolver = ScriptedResolver::new(vec![(
        "dQw4w9WgXcQ",
        Scripted::Asset(format!("http://{}/video", addr)),
    )]);
    let state = state(resolver, vec![]);
    let dir = tempfile::tempdir().unwrap();

    let raw = format!(
        r#"{{"videos": [{{"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}}], "path": "{}"}}"#,
        dir.path().display()
    );
    let started = start_download(&state, parse_batch(&raw).unwrap())
        .await
        .unwrap();
    assert!(started.success);

    let task_id = started.task_id.to_string();
    let mut task = download_progress(&state, &task_id).await.unwrap();
    for _ in 0..100 {
        if task.status.is_terminal() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        task = download_progress(&state, &task_id).await.unwrap();
    }

    assert_eq!(task.status, TaskStatus::Completed);
    assert_eq!(task.completed_videos, vec!["dQw4w9WgXcQ"]);
    assert!(dir.path().join("dQw4w9WgXcQ.mp4").exists());
}

#[tokio::test]
async fn test_playlist_url_is_validated() {
    let state = state(ScriptedResolver::new(vec![]), vec![]);
    let err = extract_playlist(&state, "https://www.youtube.com/watch?v=abc")
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::InvalidRequest(_)));

    let err = extract_playlist(&state, "").await.unwrap_err();
    assert!(matches!(err, CommandError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_playlist_extraction_results() {
    let state = state(
        ScriptedResolver::new(vec![]),
        vec![
            "https://www.youtube.com/watch?v=aaaaaaaaaaa",
            "https://www.youtube.com/watch?v=bbbbbbbbbbb",
            "https://www.youtube.com/watch?v=aaaaaaaaaaa",
        ],
    );
    let result = extract_playlist(&state, "https://www.youtube.com/playlist?list=PL123")
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.count, 2);
    assert_eq!(result.videos[0].id, "aaaaaaaaaaa");
    assert_eq!(result.videos[1].title, "Video 2");
}

#[tokio::test]
async fn test_playlist_without_links_fails() {
    let state = state(ScriptedResolver::new(vec![]), vec![]);
    let err = extract_playlist(&state, "https://www.youtube.com/playlist?list=PL123")
        .await
        .unwrap_err();
    assert!(matches!(err, CommandError::Failed(_)));
}
