#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use tubegrab_core::core::events::{EventEmitter, ItemProgress};
use tubegrab_core::models::task::{Item, Task};
use tubegrab_lib::models::media::{AssetOrigin, ResolvedAsset};
use tubegrab_lib::platforms::source_tool::ResolutionError;
use tubegrab_lib::platforms::traits::AssetResolver;

pub const VIDEO_SIZE: usize = 64 * 1024;

async fn serve_video() -> impl IntoResponse {
    let body: Vec<u8> = (0..VIDEO_SIZE).map(|i| (i % 256) as u8).collect();
    (StatusCode::OK, [(header::CONTENT_TYPE, "video/mp4")], body)
}

async fn serve_empty() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "video/mp4")], Vec::<u8>::new())
}

pub async fn start_media_server() -> SocketAddr {
    let app = Router::new()
        .route("/video", get(serve_video))
        .route("/empty", get(serve_empty));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

pub enum Scripted {
    Asset(String),
    Fail(ResolutionError),
}

/// Resolver that answers from a fixed table keyed by item id.
pub struct ScriptedResolver {
    answers: Mutex<HashMap<String, Scripted>>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedResolver {
    pub fn new(answers: Vec<(&str, Scripted)>) -> Self {
        Self {
            answers: Mutex::new(
                answers
                    .into_iter()
                    .map(|(id, s)| (id.to_string(), s))
                    .collect(),
            ),
            gate: None,
        }
    }

    /// Every resolve waits for one `notify_one` on the gate first.
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }
}

#[async_trait]
impl AssetResolver for ScriptedResolver {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn resolve(
        &self,
        item: &Item,
        _destination: &Path,
    ) -> Result<ResolvedAsset, ResolutionError> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        let answer = self.answers.lock().unwrap().remove(&item.id);
        match answer {
            Some(Scripted::Asset(url)) => Ok(ResolvedAsset {
                url,
                origin: AssetOrigin::Anchor,
            }),
            Some(Scripted::Fail(e)) => Err(e),
            None => Err(ResolutionError::Browser(format!("no script for {}", item.id))),
        }
    }
}

#[derive(Clone, Default)]
pub struct RecordingEmitter {
    pub states: Arc<Mutex<Vec<Task>>>,
    pub progress: Arc<Mutex<Vec<ItemProgress>>>,
}

impl RecordingEmitter {
    pub fn states(&self) -> Vec<Task> {
        self.states.lock().unwrap().clone()
    }
}

impl EventEmitter for RecordingEmitter {
    fn emit_task_state(&self, task: &Task) {
        self.states.lock().unwrap().push(task.clone());
    }

    fn emit_progress(&self, progress: &ItemProgress) {
        self.progress.lock().unwrap().push(progress.clone());
    }
}

pub fn item(id: &str) -> Item {
    Item {
        id: id.to_string(),
        url: format!("https://www.youtube.com/watch?v={}", id),
        title: format!("Title {}", id),
        thumbnail: None,
    }
}
