use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    pub schema_version: u32,
    #[serde(default)]
    pub resolver: ResolverSettings,
    #[serde(default)]
    pub transfer: TransferSettings,
    #[serde(default)]
    pub playlist: PlaylistSettings,
    #[serde(default)]
    pub queue: QueueSettings,
    #[serde(default)]
    pub proxy: ProxySettings,
}

/// Source tool that turns a video URL into a signed media URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    pub source_tool_url: String,
    pub input_name: String,
    pub submit_selector: String,
    pub completion_selector: String,
    pub completion_label: String,
    pub cdn_host_pattern: String,
    pub challenge_selector: String,
    pub consent_labels: Vec<String>,
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub user_agent: String,
    pub page_load_timeout_secs: u64,
    pub settle_delay_ms: u64,
    pub input_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    pub post_submit_delay_ms: u64,
    pub asset_link_timeout_secs: u64,
    pub tab_settle_delay_ms: u64,
    pub video_element_timeout_secs: u64,
    pub poll_interval_ms: u64,
}

impl ResolverSettings {
    pub fn page_load_timeout(&self) -> Duration {
        Duration::from_secs(self.page_load_timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    pub fn input_timeout(&self) -> Duration {
        Duration::from_secs(self.input_timeout_secs)
    }

    pub fn submit_timeout(&self) -> Duration {
        Duration::from_secs(self.submit_timeout_secs)
    }

    pub fn post_submit_delay(&self) -> Duration {
        Duration::from_millis(self.post_submit_delay_ms)
    }

    pub fn asset_link_timeout(&self) -> Duration {
        Duration::from_secs(self.asset_link_timeout_secs)
    }

    pub fn tab_settle_delay(&self) -> Duration {
        Duration::from_millis(self.tab_settle_delay_ms)
    }

    pub fn video_element_timeout(&self) -> Duration {
        Duration::from_secs(self.video_element_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            source_tool_url: "https://turboscribe.ai/downloader/youtube/mp4".into(),
            input_name: "url".into(),
            submit_selector: "button[type='submit']".into(),
            completion_selector: "a.dui-btn".into(),
            completion_label: "Download".into(),
            cdn_host_pattern: "googlevideo.com".into(),
            challenge_selector: "iframe[title='reCAPTCHA']".into(),
            consent_labels: vec![
                "Accept all".into(),
                "Accept".into(),
                "I agree".into(),
                "Consent".into(),
            ],
            headless: false,
            chrome_executable: None,
            user_agent: BROWSER_USER_AGENT.into(),
            page_load_timeout_secs: 30,
            settle_delay_ms: 3000,
            input_timeout_secs: 15,
            submit_timeout_secs: 10,
            post_submit_delay_ms: 5000,
            asset_link_timeout_secs: 90,
            tab_settle_delay_ms: 4000,
            video_element_timeout_secs: 10,
            poll_interval_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    pub user_agent: String,
    pub referer: String,
    pub timeout_secs: u64,
    pub chunk_size: usize,
    pub file_extension: String,
}

impl TransferSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            user_agent: BROWSER_USER_AGENT.into(),
            referer: "https://www.youtube.com/".into(),
            timeout_secs: 300,
            chunk_size: 8 * 1024,
            file_extension: "mp4".into(),
        }
    }
}

/// Link extractor tool that lists the videos of a playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistSettings {
    pub tool_url: String,
    pub input_name: String,
    pub submit_selector: String,
    pub result_selector: String,
    pub link_pattern: String,
    pub result_timeout_secs: u64,
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            tool_url: "https://nimtools.com/youtube-playlist-video-link-extractor".into(),
            input_name: "text".into(),
            submit_selector: "input[type='submit']".into(),
            result_selector: "#copyButton".into(),
            link_pattern: "youtube.com/watch".into(),
            result_timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueSettings {
    pub max_concurrent_batches: usize,
    pub default_output_dir: PathBuf,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_concurrent_batches: 1,
            default_output_dir: PathBuf::from("downloads"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProxySettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_proxy_type")]
    pub proxy_type: String,
    #[serde(default)]
    pub host: String,
    #[serde(default = "default_proxy_port")]
    pub port: u16,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

fn default_proxy_type() -> String {
    "http".into()
}

fn default_proxy_port() -> u16 {
    8080
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema_version: 1,
            resolver: ResolverSettings::default(),
            transfer: TransferSettings::default(),
            playlist: PlaylistSettings::default(),
            queue: QueueSettings::default(),
            proxy: ProxySettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let json = r#"{ "schema_version": 1, "transfer": { "timeout_secs": 60 } }"#;
        let settings: AppSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.transfer.timeout_secs, 60);
        assert_eq!(settings.transfer.chunk_size, 8192);
        assert_eq!(settings.resolver.asset_link_timeout_secs, 90);
        assert_eq!(settings.queue.max_concurrent_batches, 1);
    }

    #[test]
    fn proxy_defaults_apply_per_field() {
        let json = r#"{ "schema_version": 1, "proxy": { "enabled": true, "host": "127.0.0.1" } }"#;
        let settings: AppSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.proxy.port, 8080);
        assert_eq!(settings.proxy.proxy_type, "http");
    }
}
