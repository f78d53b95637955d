use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};

use crate::commands;
use crate::commands::downloads::StartDownloadRequest;
use crate::models::task::Item;
use crate::storage;
use crate::AppState;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Parser)]
#[command(name = "tubegrab", version, about = "Batch video downloader driven through a browser")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Download every video listed in a batch file
    Download {
        /// JSON file: `{"videos": [...], "path": "..."}` or a bare array of videos
        batch: PathBuf,
        /// Output directory, overrides the batch file and the configured default
        dir: Option<PathBuf>,
    },
    /// List the videos of a playlist, optionally downloading them
    Playlist {
        url: String,
        /// Output directory used with --download
        dir: Option<PathBuf>,
        #[arg(long)]
        download: bool,
    },
    /// Print the settings file location and the active settings
    Settings,
}

/// Accepts either `{"videos": [...], "path": "..."}` or a bare array of videos.
pub fn parse_batch(raw: &str) -> anyhow::Result<StartDownloadRequest> {
    if let Ok(request) = serde_json::from_str::<StartDownloadRequest>(raw) {
        return Ok(request);
    }
    let videos: Vec<Item> = serde_json::from_str(raw).context("batch file is not valid JSON")?;
    Ok(StartDownloadRequest { videos, path: None })
}

fn dir_string(dir: Option<PathBuf>) -> Option<String> {
    dir.map(|d| d.to_string_lossy().into_owned())
}

async fn submit_and_watch(state: &AppState, request: StartDownloadRequest) -> anyhow::Result<()> {
    let started = commands::downloads::start_download(state, request)
        .await
        .map_err(|e| anyhow!(e))?;
    println!("Task ID: {}", started.task_id);

    let task_id = started.task_id.to_string();
    loop {
        tokio::time::sleep(POLL_INTERVAL).await;
        let task = commands::downloads::download_progress(state, &task_id)
            .await
            .map_err(|e| anyhow!(e))?;
        println!(
            "Progress: {} - {} ({}%, file {:.2}%)",
            task.status, task.message, task.progress, task.file_progress
        );
        if task.status.is_terminal() {
            for file in &task.files {
                println!(
                    "  ok    {} -> {} ({:.2} MB)",
                    file.id,
                    file.path.display(),
                    file.size_bytes as f64 / (1024.0 * 1024.0)
                );
            }
            for failure in &task.failures {
                println!("  fail  {} [{}] {}", failure.id, failure.kind, failure.message);
            }
            return Ok(());
        }
    }
}

pub async fn dispatch(state: &AppState, command: Command) -> anyhow::Result<()> {
    match command {
        Command::Download { batch, dir } => {
            let raw = std::fs::read_to_string(&batch)
                .with_context(|| format!("cannot read batch file {}", batch.display()))?;
            let mut request = parse_batch(&raw)?;
            if let Some(dir) = dir_string(dir) {
                request.path = Some(dir);
            }
            submit_and_watch(state, request).await
        }
        Command::Playlist { url, dir, download } => {
            let result = commands::playlist::extract_playlist(state, &url)
                .await
                .map_err(|e| anyhow!(e))?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if download {
                let request = StartDownloadRequest {
                    videos: result.videos,
                    path: dir_string(dir),
                };
                submit_and_watch(state, request).await?;
            }
            Ok(())
        }
        Command::Settings => {
            let path = storage::config::settings_path();
            if !path.exists() {
                storage::config::save_settings(&state.settings)?;
            }
            println!("{}", path.display());
            println!("{}", serde_json::to_string_pretty(&state.settings)?);
            Ok(())
        }
    }
}
