use std::sync::Arc;

use clap::Parser;
use tubegrab_core::fs_paths::{AppPaths, DesktopPaths};

use crate::cli::Cli;
use crate::core::direct_downloader::DirectDownloader;
use crate::core::events::TracingEventEmitter;
use crate::core::ledger::ProgressLedger;
use crate::core::queue::DownloadOrchestrator;
use crate::models::settings::AppSettings;
use crate::platforms::playlist::ToolPlaylistExtractor;
use crate::platforms::source_tool::SourceToolResolver;
use crate::platforms::traits::{AssetResolver, PlaylistExtractor};

pub mod cli;
pub mod commands;
pub mod core;
pub mod models;
pub mod platforms;
pub mod storage;

pub struct AppState {
    pub settings: AppSettings,
    pub ledger: ProgressLedger,
    pub orchestrator: DownloadOrchestrator<TracingEventEmitter>,
    pub playlist: Arc<dyn PlaylistExtractor>,
}

impl AppState {
    pub fn new(settings: AppSettings) -> anyhow::Result<Self> {
        let profiles = DesktopPaths.profiles_dir();
        let resolver = Arc::new(SourceToolResolver::new(
            settings.resolver.clone(),
            profiles.clone(),
        ));
        let playlist = Arc::new(ToolPlaylistExtractor::new(
            settings.playlist.clone(),
            settings.resolver.clone(),
            profiles,
        ));
        Self::with_parts(settings, resolver, playlist)
    }

    pub fn with_parts(
        settings: AppSettings,
        resolver: Arc<dyn AssetResolver>,
        playlist: Arc<dyn PlaylistExtractor>,
    ) -> anyhow::Result<Self> {
        let ledger = ProgressLedger::new();
        let downloader = DirectDownloader::new(settings.transfer.clone(), &settings.proxy)?;
        let orchestrator = DownloadOrchestrator::new(
            ledger.clone(),
            resolver,
            downloader,
            settings.queue.max_concurrent_batches,
            TracingEventEmitter::new(),
        );
        Ok(Self {
            settings,
            ledger,
            orchestrator,
            playlist,
        })
    }
}

pub fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt::init();

    let settings = storage::config::load_settings();
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let state = AppState::new(settings)?;
        cli::dispatch(&state, cli.command).await
    })
}
