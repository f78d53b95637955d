use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where on the source tool's page the asset URL was read from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AssetOrigin {
    Anchor,
    CompletionControl,
    MediaElement,
}

/// Signed, short-lived media URL. Only good for the session that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedAsset {
    pub url: String,
    pub origin: AssetOrigin,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct TransferProgress {
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
    pub file_path: PathBuf,
    pub file_size_bytes: u64,
}
