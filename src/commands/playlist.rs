use serde::Serialize;

use crate::commands::CommandError;
use crate::core::url_parser;
use crate::models::task::Item;
use crate::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistResult {
    pub success: bool,
    pub videos: Vec<Item>,
    pub count: usize,
}

pub async fn extract_playlist(state: &AppState, url: &str) -> Result<PlaylistResult, CommandError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(CommandError::InvalidRequest("No playlist URL provided".to_string()));
    }
    if !url_parser::is_playlist_url(url) {
        return Err(CommandError::InvalidRequest(format!(
            "not a playlist URL: {}",
            url
        )));
    }

    tracing::info!("[playlist] extracting {} via {}", url, state.playlist.name());
    let videos = state
        .playlist
        .extract(url)
        .await
        .map_err(|e| CommandError::Failed(format!("Failed to extract links: {}", e)))?;

    Ok(PlaylistResult {
        success: true,
        count: videos.len(),
        videos,
    })
}
