use std::path::Path;

use async_trait::async_trait;

use crate::models::media::ResolvedAsset;
use crate::models::task::Item;
use crate::platforms::playlist::ExtractionError;
use crate::platforms::source_tool::ResolutionError;

#[async_trait]
pub trait AssetResolver: Send + Sync {
    fn name(&self) -> &str;
    /// `destination` is the batch directory; browser-side downloads land there too.
    async fn resolve(
        &self,
        item: &Item,
        destination: &Path,
    ) -> Result<ResolvedAsset, ResolutionError>;
}

#[async_trait]
pub trait PlaylistExtractor: Send + Sync {
    fn name(&self) -> &str;
    async fn extract(&self, playlist_url: &str) -> Result<Vec<Item>, ExtractionError>;
}
