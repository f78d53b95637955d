use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_ENCODING, RANGE, REFERER};
use tubegrab_core::models::settings::{ProxySettings, TransferSettings};

pub fn proxy_url(proxy: &ProxySettings) -> Option<String> {
    if !proxy.enabled || proxy.host.is_empty() {
        return None;
    }
    let scheme = match proxy.proxy_type.as_str() {
        "socks5" => "socks5",
        "https" => "https",
        _ => "http",
    };
    if !proxy.username.is_empty() {
        Some(format!(
            "{}://{}:{}@{}:{}",
            scheme, proxy.username, proxy.password, proxy.host, proxy.port
        ))
    } else {
        Some(format!("{}://{}:{}", scheme, proxy.host, proxy.port))
    }
}

pub fn apply_proxy(
    builder: reqwest::ClientBuilder,
    proxy: &ProxySettings,
) -> reqwest::ClientBuilder {
    let Some(url) = proxy_url(proxy) else {
        return builder;
    };
    match reqwest::Proxy::all(&url) {
        Ok(p) => builder.proxy(p),
        Err(e) => {
            tracing::warn!("[http] invalid proxy URL: {}", e);
            builder
        }
    }
}

/// Headers the CDN checks before serving a signed media URL.
pub fn media_headers(settings: &TransferSettings) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity;q=1, *;q=0"));
    headers.insert(RANGE, HeaderValue::from_static("bytes=0-"));
    if let Ok(referer) = HeaderValue::from_str(&settings.referer) {
        headers.insert(REFERER, referer);
    }
    headers
}

pub fn build_media_client(
    settings: &TransferSettings,
    proxy: &ProxySettings,
) -> anyhow::Result<reqwest::Client> {
    let builder = reqwest::Client::builder()
        .user_agent(settings.user_agent.clone())
        .default_headers(media_headers(settings))
        .connect_timeout(Duration::from_secs(30));
    Ok(apply_proxy(builder, proxy).build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_proxy_has_no_url() {
        let proxy = ProxySettings {
            enabled: false,
            host: "127.0.0.1".into(),
            ..Default::default()
        };
        assert!(proxy_url(&proxy).is_none());
    }

    #[test]
    fn socks_proxy_with_credentials() {
        let proxy = ProxySettings {
            enabled: true,
            proxy_type: "socks5".into(),
            host: "10.0.0.1".into(),
            port: 1080,
            username: "u".into(),
            password: "p".into(),
        };
        assert_eq!(proxy_url(&proxy).as_deref(), Some("socks5://u:p@10.0.0.1:1080"));
    }

    #[test]
    fn media_headers_request_whole_resource() {
        let headers = media_headers(&TransferSettings::default());
        assert_eq!(headers.get(RANGE).unwrap(), "bytes=0-");
        assert_eq!(headers.get(REFERER).unwrap(), "https://www.youtube.com/");
    }
}
