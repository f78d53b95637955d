use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use thiserror::Error;
use tokio::task::JoinHandle;
use tubegrab_core::models::settings::ResolverSettings;

const CLOSE_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to configure browser: {0}")]
    Config(String),
    #[error("failed to create profile directory: {0}")]
    Profile(#[from] std::io::Error),
    #[error(transparent)]
    Cdp(#[from] CdpError),
}

#[derive(Debug, Clone)]
pub struct BrowserOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub user_agent: String,
    pub request_timeout: Duration,
}

impl From<&ResolverSettings> for BrowserOptions {
    fn from(s: &ResolverSettings) -> Self {
        Self {
            headless: s.headless,
            chrome_executable: s.chrome_executable.clone(),
            user_agent: s.user_agent.clone(),
            request_timeout: s.page_load_timeout(),
        }
    }
}

/// One browser process with its own throwaway profile.
pub struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
    profile_dir: PathBuf,
}

impl BrowserSession {
    pub async fn launch(opts: &BrowserOptions, profiles_root: &Path) -> Result<Self, BrowserError> {
        let profile_dir = profiles_root.join(uuid::Uuid::new_v4().to_string());
        tokio::fs::create_dir_all(&profile_dir).await?;

        let mut builder = BrowserConfig::builder()
            .user_data_dir(&profile_dir)
            .request_timeout(opts.request_timeout)
            .no_sandbox()
            .arg("--ignore-certificate-errors")
            .arg("--ignore-ssl-errors")
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", opts.user_agent));
        if !opts.headless {
            builder = builder.with_head();
        }
        if let Some(exe) = &opts.chrome_executable {
            builder = builder.chrome_executable(exe);
        }
        let config = match builder.build() {
            Ok(c) => c,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&profile_dir).await;
                return Err(BrowserError::Config(e));
            }
        };

        let (browser, mut handler) = match Browser::launch(config).await {
            Ok(pair) => pair,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&profile_dir).await;
                return Err(e.into());
            }
        };
        let handler = tokio::spawn(async move {
            while handler.next().await.is_some() {}
        });
        tracing::debug!("[browser] launched with profile {}", profile_dir.display());

        Ok(Self {
            browser,
            handler,
            profile_dir,
        })
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub async fn open(&self, url: &str, timeout: Duration) -> Result<Option<Page>, CdpError> {
        match tokio::time::timeout(timeout, self.browser.new_page(url)).await {
            Ok(page) => page.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Closes the browser, kills it if it lingers and removes the profile.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.browser.close().await {
            tracing::debug!("[browser] close failed: {}", e);
        }
        if tokio::time::timeout(CLOSE_GRACE, self.browser.wait())
            .await
            .is_err()
        {
            tracing::warn!("[browser] did not exit in {:?}, killing", CLOSE_GRACE);
            let _ = self.browser.kill().await;
        }
        self.handler.abort();
        if let Err(e) = tokio::fs::remove_dir_all(&self.profile_dir).await {
            tracing::debug!(
                "[browser] could not remove profile {}: {}",
                self.profile_dir.display(),
                e
            );
        }
    }
}

/// Runs `probe` every `interval` until it yields a value or `timeout` passes.
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let start = Instant::now();
    loop {
        let remaining = timeout.saturating_sub(start.elapsed());
        if let Ok(Some(value)) = tokio::time::timeout(remaining, probe()).await {
            return Some(value);
        }
        if start.elapsed() >= timeout {
            return None;
        }
        tokio::time::sleep(interval).await;
    }
}

/// Quotes a value for interpolation into an injected script.
pub fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

pub async fn eval_string(page: &Page, script: &str) -> Result<String, CdpError> {
    let result = page.evaluate(script).await?;
    Ok(result.into_value::<String>().unwrap_or_default())
}

pub async fn eval_bool(page: &Page, script: &str) -> Result<bool, CdpError> {
    let result = page.evaluate(script).await?;
    Ok(result.into_value::<bool>().unwrap_or(false))
}

/// `input[name='<name>']` with the name escaped as a CSS string.
pub fn input_selector(name: &str) -> String {
    let mut escaped = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' | '\'' => {
                escaped.push('\\');
                escaped.push(c);
            }
            '\n' => escaped.push_str("\\a "),
            _ => escaped.push(c),
        }
    }
    format!("input[name='{}']", escaped)
}

pub fn element_present_script(selector: &str) -> String {
    format!("document.querySelector({}) !== null", js_string(selector))
}

/// Script that clicks the first visible button or link whose label matches one of `labels`.
pub fn consent_click_script(labels: &[String]) -> String {
    let labels: Vec<String> = labels.iter().map(|l| l.to_lowercase()).collect();
    let labels_json = serde_json::to_string(&labels).unwrap_or_else(|_| "[]".to_string());
    format!(
        r#"(() => {{
            const labels = {labels_json};
            const nodes = document.querySelectorAll('button, [role="button"], a');
            for (const node of nodes) {{
                const text = (node.innerText || node.textContent || '').trim().toLowerCase();
                if (text && labels.includes(text) && node.offsetParent !== null) {{
                    node.click();
                    return true;
                }}
            }}
            return false;
        }})()"#
    )
}

pub async fn dismiss_consent(page: &Page, labels: &[String]) -> bool {
    if labels.is_empty() {
        return false;
    }
    match eval_bool(page, &consent_click_script(labels)).await {
        Ok(clicked) => clicked,
        Err(e) => {
            tracing::debug!("[browser] consent probe failed: {}", e);
            false
        }
    }
}

/// Empties a text input and types `value` into it.
pub async fn fill_input(page: &Page, selector: &str, value: &str) -> Result<(), CdpError> {
    let clear = format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            el.value = '';
            el.dispatchEvent(new Event('input', {{ bubbles: true }}));
            return true;
        }})()"#,
        sel = js_string(selector)
    );
    eval_bool(page, &clear).await?;
    page.find_element(selector)
        .await?
        .click()
        .await?
        .type_str(value)
        .await?;
    Ok(())
}

pub fn clickable_script(selector: &str) -> String {
    format!(
        r#"(() => {{
            const el = document.querySelector({sel});
            if (!el) return false;
            if (el.disabled || el.getAttribute('aria-disabled') === 'true') return false;
            const rect = el.getBoundingClientRect();
            return el.offsetParent !== null && rect.width > 0 && rect.height > 0;
        }})()"#,
        sel = js_string(selector)
    )
}
