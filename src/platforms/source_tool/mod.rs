pub mod challenge;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::{
    SetDownloadBehaviorBehavior, SetDownloadBehaviorParams,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use serde::Deserialize;
use thiserror::Error;
use tubegrab_core::models::settings::ResolverSettings;

use crate::core::browser::{
    clickable_script, dismiss_consent, element_present_script, eval_bool, eval_string,
    fill_input, input_selector, js_string, poll_until, BrowserError, BrowserOptions,
    BrowserSession,
};
use crate::core::filename::file_stem_for;
use crate::models::media::{AssetOrigin, ResolvedAsset};
use crate::models::task::Item;
use crate::platforms::traits::AssetResolver;

use self::challenge::ChallengeOutcome;

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("browser could not be started: {0}")]
    BrowserLaunch(String),
    #[error("source tool did not load within {0:?}")]
    PageLoadTimeout(Duration),
    #[error("input '{0}' not found on the source tool")]
    InputNotFound(String),
    #[error("submit control '{0}' never became clickable")]
    SubmitNotClickable(String),
    #[error("no asset link appeared within {0:?}")]
    AssetLinkTimeout(Duration),
    #[error("blocked by a verification challenge")]
    ChallengeBlocked,
    #[error("browser error: {0}")]
    Browser(String),
}

impl ResolutionError {
    pub fn kind(&self) -> &'static str {
        match self {
            ResolutionError::BrowserLaunch(_) => "BrowserLaunch",
            ResolutionError::PageLoadTimeout(_) => "PageLoadTimeout",
            ResolutionError::InputNotFound(_) => "InputNotFound",
            ResolutionError::SubmitNotClickable(_) => "SubmitNotClickable",
            ResolutionError::AssetLinkTimeout(_) => "AssetLinkTimeout",
            ResolutionError::ChallengeBlocked => "ChallengeBlocked",
            ResolutionError::Browser(_) => "BrowserError",
        }
    }
}

impl From<CdpError> for ResolutionError {
    fn from(e: CdpError) -> Self {
        ResolutionError::Browser(e.to_string())
    }
}

impl From<BrowserError> for ResolutionError {
    fn from(e: BrowserError) -> Self {
        ResolutionError::BrowserLaunch(e.to_string())
    }
}

#[derive(Debug, Deserialize, PartialEq)]
struct AssetProbe {
    origin: String,
    href: String,
}

impl AssetProbe {
    fn into_asset(self) -> ResolvedAsset {
        let origin = if self.origin == "anchor" {
            AssetOrigin::Anchor
        } else {
            AssetOrigin::CompletionControl
        };
        ResolvedAsset {
            url: self.href,
            origin,
        }
    }
}

fn parse_probe(raw: &str) -> Option<AssetProbe> {
    if raw.is_empty() {
        return None;
    }
    serde_json::from_str::<AssetProbe>(raw)
        .ok()
        .filter(|p| !p.href.is_empty())
}

/// Walks anchors in document order; the first CDN link or labelled completion control wins.
fn asset_link_script(settings: &ResolverSettings) -> String {
    format!(
        r#"(() => {{
            const cdn = {cdn};
            const label = {label}.toLowerCase();
            const control = {selector};
            for (const a of document.querySelectorAll('a')) {{
                const href = a.href || '';
                if (!href) continue;
                if (href.includes(cdn)) {{
                    return JSON.stringify({{ origin: 'anchor', href }});
                }}
                const text = (a.innerText || a.textContent || '').toLowerCase();
                if (a.matches(control) && text.includes(label)) {{
                    return JSON.stringify({{ origin: 'control', href }});
                }}
            }}
            return '';
        }})()"#,
        cdn = js_string(&settings.cdn_host_pattern),
        label = js_string(&settings.completion_label),
        selector = js_string(&settings.completion_selector),
    )
}

const VIDEO_SOURCE_SCRIPT: &str = r#"(() => {
    const v = document.querySelector('video');
    if (!v) return '';
    const source = v.querySelector('source');
    return v.currentSrc || v.src || (source ? source.src : '') || '';
})()"#;

fn download_trigger_script(href: &str, file_name: &str) -> String {
    format!(
        r#"(() => {{
            const link = document.createElement('a');
            link.href = {href};
            link.download = {name};
            document.body.appendChild(link);
            link.click();
            document.body.removeChild(link);
            return true;
        }})()"#,
        href = js_string(href),
        name = js_string(file_name),
    )
}

/// Lets the browser save into the batch directory instead of its own default.
fn download_behavior(destination: &Path) -> SetDownloadBehaviorParams {
    let dir = std::path::absolute(destination).unwrap_or_else(|_| destination.to_path_buf());
    let mut params = SetDownloadBehaviorParams::new(SetDownloadBehaviorBehavior::Allow);
    params.download_path = Some(dir.to_string_lossy().into_owned());
    params
}

/// The media element's live source wins when it still points at the CDN.
fn prefer_media_source(extracted: ResolvedAsset, video_src: &str, cdn: &str) -> ResolvedAsset {
    if !video_src.is_empty() && video_src.contains(cdn) {
        ResolvedAsset {
            url: video_src.to_string(),
            origin: AssetOrigin::MediaElement,
        }
    } else {
        extracted
    }
}

fn preview(url: &str) -> String {
    url.chars().take(50).collect()
}

/// Drives the configured source tool in a fresh browser for every item.
pub struct SourceToolResolver {
    settings: ResolverSettings,
    browser_opts: BrowserOptions,
    profiles_root: PathBuf,
}

impl SourceToolResolver {
    pub fn new(settings: ResolverSettings, profiles_root: PathBuf) -> Self {
        let browser_opts = BrowserOptions::from(&settings);
        Self {
            settings,
            browser_opts,
            profiles_root,
        }
    }

    async fn drive(
        &self,
        session: &BrowserSession,
        item: &Item,
        destination: &Path,
    ) -> Result<ResolvedAsset, ResolutionError> {
        let s = &self.settings;
        tracing::info!("[resolver] navigating to source tool for {}", item.id);
        let page = session
            .open(&s.source_tool_url, s.page_load_timeout())
            .await?
            .ok_or(ResolutionError::PageLoadTimeout(s.page_load_timeout()))?;
        tokio::time::sleep(s.settle_delay()).await;

        if dismiss_consent(&page, &s.consent_labels).await {
            tracing::info!("[resolver] consent dialog dismissed");
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        self.submit(&page, item).await?;
        let extracted = self.wait_for_asset_link(&page).await?;
        tracing::info!(
            "[resolver] asset link for {} ({:?}): {}...",
            item.id,
            extracted.origin,
            preview(&extracted.url)
        );

        Ok(self
            .follow_in_new_tab(session, &page, item, extracted, destination)
            .await)
    }

    async fn submit(&self, page: &Page, item: &Item) -> Result<(), ResolutionError> {
        let s = &self.settings;
        let input_css = input_selector(&s.input_name);

        let present_js = element_present_script(&input_css);
        let js = present_js.as_str();
        let found = poll_until(s.input_timeout(), s.poll_interval(), move || async move {
            eval_bool(page, js).await.unwrap_or(false).then_some(())
        })
        .await;
        if found.is_none() {
            return Err(ResolutionError::InputNotFound(s.input_name.clone()));
        }
        fill_input(page, &input_css, &item.url).await?;

        if challenge::try_checkbox(page, &s.challenge_selector, s.settle_delay()).await
            == ChallengeOutcome::Unreachable
        {
            tracing::warn!("[resolver] verification widget present but not clickable");
        }

        let clickable_js = clickable_script(&s.submit_selector);
        let js = clickable_js.as_str();
        let ready = poll_until(s.submit_timeout(), s.poll_interval(), move || async move {
            eval_bool(page, js).await.unwrap_or(false).then_some(())
        })
        .await;
        if ready.is_none() {
            return Err(ResolutionError::SubmitNotClickable(s.submit_selector.clone()));
        }
        page.find_element(s.submit_selector.as_str())
            .await?
            .click()
            .await?;
        tracing::info!("[resolver] submitted {}", item.url);
        tokio::time::sleep(s.post_submit_delay()).await;
        Ok(())
    }

    async fn wait_for_asset_link(&self, page: &Page) -> Result<ResolvedAsset, ResolutionError> {
        let s = &self.settings;
        let script = asset_link_script(s);
        let js = script.as_str();
        let probe = poll_until(s.asset_link_timeout(), s.poll_interval(), move || async move {
            eval_string(page, js)
                .await
                .ok()
                .and_then(|raw| parse_probe(&raw))
        })
        .await;

        match probe {
            Some(p) => Ok(p.into_asset()),
            None if challenge::is_visible(page, &s.challenge_selector).await => {
                Err(ResolutionError::ChallengeBlocked)
            }
            None => Err(ResolutionError::AssetLinkTimeout(s.asset_link_timeout())),
        }
    }

    /// Opens the asset in its own tab the way a user would, then returns to the tool.
    /// Nothing in here fails the item; the extracted URL is kept on any error.
    async fn follow_in_new_tab(
        &self,
        session: &BrowserSession,
        main: &Page,
        item: &Item,
        extracted: ResolvedAsset,
        destination: &Path,
    ) -> ResolvedAsset {
        let s = &self.settings;
        let tab = match session.open(&extracted.url, s.page_load_timeout()).await {
            Ok(Some(tab)) => tab,
            Ok(None) => {
                tracing::warn!("[resolver] asset tab did not load for {}", item.id);
                return extracted;
            }
            Err(e) => {
                tracing::warn!("[resolver] could not open asset tab: {}", e);
                return extracted;
            }
        };
        tokio::time::sleep(s.tab_settle_delay()).await;

        let video_js = element_present_script("video");
        let (js, tab_ref) = (video_js.as_str(), &tab);
        let has_video = poll_until(s.video_element_timeout(), s.poll_interval(), move || async move {
            eval_bool(tab_ref, js).await.unwrap_or(false).then_some(())
        })
        .await
        .is_some();

        let asset = if has_video {
            let src = eval_string(&tab, VIDEO_SOURCE_SCRIPT)
                .await
                .unwrap_or_default();
            let asset = prefer_media_source(extracted, &src, &s.cdn_host_pattern);

            let file_name = format!("web_{}.{}", file_stem_for(&item.id), "mp4");
            if let Err(e) = session
                .browser()
                .execute(download_behavior(destination))
                .await
            {
                tracing::debug!("[resolver] could not set download directory: {}", e);
            }
            if let Err(e) = tab
                .evaluate(download_trigger_script(&asset.url, &file_name))
                .await
            {
                tracing::debug!("[resolver] download trigger failed: {}", e);
            }
            tokio::time::sleep(Duration::from_secs(2)).await;
            asset
        } else {
            tracing::debug!("[resolver] no video element in asset tab for {}", item.id);
            extracted
        };

        if let Err(e) = tab.close().await {
            tracing::debug!("[resolver] closing asset tab failed: {}", e);
        }
        if let Err(e) = main.bring_to_front().await {
            tracing::debug!("[resolver] refocusing source tool failed: {}", e);
        }
        asset
    }
}

#[async_trait]
impl AssetResolver for SourceToolResolver {
    fn name(&self) -> &str {
        "source_tool"
    }

    async fn resolve(
        &self,
        item: &Item,
        destination: &Path,
    ) -> Result<ResolvedAsset, ResolutionError> {
        let session = BrowserSession::launch(&self.browser_opts, &self.profiles_root).await?;
        let outcome = self.drive(&session, item, destination).await;
        session.shutdown().await;
        outcome
    }
}
