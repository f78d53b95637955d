use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;
use tubegrab_core::models::settings::{PlaylistSettings, ResolverSettings};

use crate::core::browser::{
    clickable_script, dismiss_consent, element_present_script, eval_bool, fill_input,
    input_selector, poll_until, BrowserError, BrowserOptions, BrowserSession,
};
use crate::core::url_parser;
use crate::models::task::Item;
use crate::platforms::source_tool::challenge;
use crate::platforms::traits::PlaylistExtractor;

static WATCH_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"https://(?:www\.)?youtube\.com/watch\?v=[^\s"'<>]+"#).unwrap()
});

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("browser could not be started: {0}")]
    BrowserLaunch(String),
    #[error("extractor tool did not load within {0:?}")]
    PageLoadTimeout(Duration),
    #[error("input '{0}' not found on the extractor tool")]
    InputNotFound(String),
    #[error("submit control '{0}' never became clickable")]
    SubmitNotClickable(String),
    #[error("extractor produced no result within {0:?}")]
    ResultTimeout(Duration),
    #[error("could not extract video links, check that the playlist is public")]
    NoLinks,
    #[error("browser error: {0}")]
    Browser(String),
}

impl From<CdpError> for ExtractionError {
    fn from(e: CdpError) -> Self {
        ExtractionError::Browser(e.to_string())
    }
}

impl From<BrowserError> for ExtractionError {
    fn from(e: BrowserError) -> Self {
        ExtractionError::BrowserLaunch(e.to_string())
    }
}

/// Watch links found in anchors of the rendered result page.
pub fn links_from_anchors(html: &str, pattern: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(pattern) && href.contains("watch?v="))
        .map(|href| href.to_string())
        .collect()
}

/// Watch links listed inside textareas, for tools that only print them as text.
pub fn links_from_textareas(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    let Ok(selector) = Selector::parse("textarea") else {
        return Vec::new();
    };
    document
        .select(&selector)
        .flat_map(|ta| {
            let text: String = ta.text().collect();
            WATCH_URL_RE
                .find_iter(&text)
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Keeps the first occurrence of every link and turns them into items.
pub fn items_from_links(links: Vec<String>) -> Vec<Item> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|l| seen.insert(l.clone()))
        .enumerate()
        .map(|(i, link)| {
            let id = url_parser::video_id(&link).unwrap_or_else(|| format!("video-{}", i));
            Item {
                thumbnail: Some(url_parser::thumbnail_url(&id)),
                id,
                url: link,
                title: format!("Video {}", i + 1),
            }
        })
        .collect()
}

/// Lists a playlist's videos through a third-party link extractor page.
pub struct ToolPlaylistExtractor {
    settings: PlaylistSettings,
    resolver_settings: ResolverSettings,
    browser_opts: BrowserOptions,
    profiles_root: PathBuf,
}

impl ToolPlaylistExtractor {
    pub fn new(
        settings: PlaylistSettings,
        resolver_settings: ResolverSettings,
        profiles_root: PathBuf,
    ) -> Self {
        let browser_opts = BrowserOptions::from(&resolver_settings);
        Self {
            settings,
            resolver_settings,
            browser_opts,
            profiles_root,
        }
    }

    async fn drive(
        &self,
        session: &BrowserSession,
        playlist_url: &str,
    ) -> Result<Vec<Item>, ExtractionError> {
        let s = &self.settings;
        let timing = &self.resolver_settings;

        let page = session
            .open(&s.tool_url, timing.page_load_timeout())
            .await?
            .ok_or(ExtractionError::PageLoadTimeout(timing.page_load_timeout()))?;
        tokio::time::sleep(timing.settle_delay()).await;
        dismiss_consent(&page, &timing.consent_labels).await;

        let input_css = input_selector(&s.input_name);
        let present_js = element_present_script(&input_css);
        let (js, page_ref) = (present_js.as_str(), &page);
        if poll_until(timing.input_timeout(), timing.poll_interval(), move || async move {
            eval_bool(page_ref, js).await.unwrap_or(false).then_some(())
        })
        .await
        .is_none()
        {
            return Err(ExtractionError::InputNotFound(s.input_name.clone()));
        }
        fill_input(&page, &input_css, playlist_url).await?;
        tokio::time::sleep(Duration::from_secs(2)).await;

        challenge::try_checkbox(&page, &timing.challenge_selector, timing.settle_delay()).await;

        let clickable_js = clickable_script(&s.submit_selector);
        let js = clickable_js.as_str();
        if poll_until(timing.submit_timeout(), timing.poll_interval(), move || async move {
            eval_bool(page_ref, js).await.unwrap_or(false).then_some(())
        })
        .await
        .is_none()
        {
            return Err(ExtractionError::SubmitNotClickable(s.submit_selector.clone()));
        }
        page.find_element(s.submit_selector.as_str())
            .await?
            .click()
            .await?;
        tokio::time::sleep(timing.post_submit_delay()).await;

        let result_timeout = Duration::from_secs(s.result_timeout_secs);
        let result_js = element_present_script(&s.result_selector);
        let js = result_js.as_str();
        if poll_until(result_timeout, timing.poll_interval(), move || async move {
            eval_bool(page_ref, js).await.unwrap_or(false).then_some(())
        })
        .await
        .is_none()
        {
            return Err(ExtractionError::ResultTimeout(result_timeout));
        }

        let html = page.content().await?;
        let mut links = links_from_anchors(&html, &s.link_pattern);
        if links.is_empty() {
            links = links_from_textareas(&html);
        }

        let items = items_from_links(links);
        if items.is_empty() {
            return Err(ExtractionError::NoLinks);
        }
        tracing::info!("[playlist] extracted {} videos from {}", items.len(), playlist_url);
        Ok(items)
    }
}

#[async_trait]
impl PlaylistExtractor for ToolPlaylistExtractor {
    fn name(&self) -> &str {
        "link_extractor"
    }

    async fn extract(&self, playlist_url: &str) -> Result<Vec<Item>, ExtractionError> {
        let session = BrowserSession::launch(&self.browser_opts, &self.profiles_root).await?;
        let outcome = self.drive(&session, playlist_url).await;
        session.shutdown().await;
        outcome
    }
}
