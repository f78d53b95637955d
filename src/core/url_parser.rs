#[derive(Debug, Clone)]
pub struct ParsedUrl {
    pub url: String,
    pub content_id: Option<String>,
    pub playlist_id: Option<String>,
    pub content_type: ParsedContentType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedContentType {
    Video,
    Short,
    Playlist,
    Unknown,
}

pub fn is_youtube_host(host: &str) -> bool {
    let host = host.trim_start_matches("www.").trim_start_matches("m.");
    host == "youtube.com" || host == "youtu.be" || host == "music.youtube.com"
}

pub fn parse_url(url_str: &str) -> Option<ParsedUrl> {
    let parsed = url::Url::parse(url_str.trim()).ok()?;
    let host = parsed.host_str()?;
    if !is_youtube_host(host) {
        return None;
    }
    let segments: Vec<&str> = parsed
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .collect();
    let (content_id, content_type) = parse_youtube(&parsed, &segments);
    let playlist_id = parsed
        .query_pairs()
        .find(|(k, v)| k == "list" && !v.is_empty())
        .map(|(_, v)| v.to_string());

    Some(ParsedUrl {
        url: url_str.trim().to_string(),
        content_id,
        playlist_id,
        content_type,
    })
}

fn parse_youtube(parsed: &url::Url, segments: &[&str]) -> (Option<String>, ParsedContentType) {
    if let Some(v) = parsed.query_pairs().find(|(k, _)| k == "v").map(|(_, v)| v.to_string()) {
        if parsed.query_pairs().any(|(k, _)| k == "list") {
            return (Some(v), ParsedContentType::Playlist);
        }
        return (Some(v), ParsedContentType::Video);
    }

    if parsed.host_str().is_some_and(|h| h.contains("youtu.be")) {
        let id = segments.first().map(|s| s.to_string());
        return (id, ParsedContentType::Video);
    }

    if segments.first() == Some(&"shorts") {
        let id = segments.get(1).map(|s| s.to_string());
        return (id, ParsedContentType::Short);
    }

    if segments.first() == Some(&"playlist") {
        return (None, ParsedContentType::Playlist);
    }

    (None, ParsedContentType::Unknown)
}

/// Video id of a watch/short link, `None` for anything else.
pub fn video_id(url_str: &str) -> Option<String> {
    let parsed = parse_url(url_str)?;
    match parsed.content_type {
        ParsedContentType::Video | ParsedContentType::Short | ParsedContentType::Playlist => {
            parsed.content_id.filter(|id| !id.is_empty())
        }
        ParsedContentType::Unknown => None,
    }
}

pub fn is_playlist_url(url_str: &str) -> bool {
    parse_url(url_str).is_some_and(|p| p.playlist_id.is_some())
}

pub fn thumbnail_url(video_id: &str) -> String {
    format!("https://img.youtube.com/vi/{}/mqdefault.jpg", video_id)
}
