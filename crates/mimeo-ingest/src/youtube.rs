//! Caption tracks from the YouTube watch page and player API.

use crate::error::{IngestError, IngestResult};
use crate::services::{CaptionSource, CaptionTrack, ServiceFailure, ServiceResult};
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://www.youtube.com";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";
const PLAYER_CLIENT_NAME: &str = "ANDROID";
const PLAYER_CLIENT_VERSION: &str = "20.10.38";

pub struct YoutubeCaptionSource {
    client: Client,
    rt: Arc<Runtime>,
    base_url: String,
}

impl YoutubeCaptionSource {
    pub fn new(rt: Arc<Runtime>) -> IngestResult<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| IngestError::Service(http_failure(e)))?;

        Ok(Self {
            client,
            rt,
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    async fn player_response(&self, video_id: &str) -> ServiceResult<Value> {
        let watch_url = format!("{}/watch?v={}", self.base_url, video_id);
        debug!("Fetching {}", watch_url);
        let html = self
            .client
            .get(&watch_url)
            .header("Accept-Language", "en-US")
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_failure)?
            .text()
            .await
            .map_err(http_failure)?;

        let api_key = extract_api_key(&html)?;

        let player_url = format!("{}/youtubei/v1/player?key={}", self.base_url, api_key);
        let body = json!({
            "context": {
                "client": {
                    "clientName": PLAYER_CLIENT_NAME,
                    "clientVersion": PLAYER_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        self.client
            .post(&player_url)
            .json(&body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_failure)?
            .json::<Value>()
            .await
            .map_err(|e| ServiceFailure::MalformedResponse(e.to_string()))
    }

    async fn download(&self, url: &str) -> ServiceResult<String> {
        self.client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_failure)?
            .text()
            .await
            .map_err(http_failure)
    }
}

impl CaptionSource for YoutubeCaptionSource {
    fn list_tracks(&self, video_id: &str) -> ServiceResult<Vec<CaptionTrack>> {
        let player = self.rt.block_on(self.player_response(video_id))?;
        parse_caption_tracks(&player)
    }

    fn fetch_track(&self, track: &CaptionTrack) -> ServiceResult<Vec<String>> {
        let xml = self.rt.block_on(self.download(&track.url))?;
        parse_timedtext(&xml)
    }
}

fn http_failure(e: reqwest::Error) -> ServiceFailure {
    match e.status() {
        Some(StatusCode::NOT_FOUND) => ServiceFailure::NotFound(e.to_string()),
        Some(status) if status.is_client_error() && status != StatusCode::TOO_MANY_REQUESTS => {
            ServiceFailure::MalformedResponse(e.to_string())
        }
        _ => ServiceFailure::Transient(e.to_string()),
    }
}

/// The player API key embedded in a watch page.
pub fn extract_api_key(html: &str) -> ServiceResult<String> {
    let pattern = Regex::new(r#""INNERTUBE_API_KEY":\s*"([A-Za-z0-9_-]+)""#)
        .map_err(|e| ServiceFailure::MalformedResponse(e.to_string()))?;

    if let Some(key) = pattern.captures(html).and_then(|c| c.get(1)) {
        return Ok(key.as_str().to_string());
    }
    if html.contains("class=\"g-recaptcha\"") {
        return Err(ServiceFailure::Transient("rate limited by captcha".to_string()));
    }
    Err(ServiceFailure::NotFound("watch page has no player data".to_string()))
}

/// Caption tracks listed in a player API response.
pub fn parse_caption_tracks(player: &Value) -> ServiceResult<Vec<CaptionTrack>> {
    let playability = &player["playabilityStatus"];
    if let Some(status) = playability["status"].as_str() {
        if status != "OK" {
            let reason = playability["reason"].as_str().unwrap_or(status);
            return Err(ServiceFailure::NotFound(format!("video unplayable: {}", reason)));
        }
    }

    let Some(listed) = player["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"].as_array() else {
        return Err(ServiceFailure::NotFound("captions are disabled".to_string()));
    };

    let tracks = listed
        .iter()
        .filter_map(|t| {
            let url = t["baseUrl"].as_str()?.replace("&fmt=srv3", "");
            let language_code = t["languageCode"].as_str()?.to_string();
            let language = t["name"]["runs"][0]["text"]
                .as_str()
                .or_else(|| t["name"]["simpleText"].as_str())
                .unwrap_or(&language_code)
                .to_string();
            Some(CaptionTrack {
                language_code,
                language,
                url,
                generated: t["kind"].as_str() == Some("asr"),
            })
        })
        .collect();

    Ok(tracks)
}

/// Text fragments of a timed-text document, in document order.
pub fn parse_timedtext(xml: &str) -> ServiceResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut fragments = Vec::new();
    let mut current: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if matches!(e.name().as_ref(), b"text" | b"p") => {
                current = Some(String::new());
            }
            Ok(Event::Text(t)) => {
                if let Some(buf) = current.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| ServiceFailure::MalformedResponse(e.to_string()))?;
                    if !buf.is_empty() {
                        buf.push(' ');
                    }
                    buf.push_str(&text);
                }
            }
            Ok(Event::End(e)) if matches!(e.name().as_ref(), b"text" | b"p") => {
                if let Some(raw) = current.take() {
                    fragments.push(clean_fragment(&raw));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(ServiceFailure::MalformedResponse(format!("timed text: {}", e))),
        }
    }

    Ok(fragments)
}

/// Undo the second level of escaping captions carry and drop inline markup.
fn clean_fragment(raw: &str) -> String {
    let unescaped = quick_xml::escape::unescape(raw)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| raw.to_string());

    let mut out = String::with_capacity(unescaped.len());
    let mut in_tag = false;
    for c in unescaped.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_api_key() {
        let html = r#"<script>ytcfg.set({"INNERTUBE_API_KEY": "AIzaSyA-test_KEY1","X":1})</script>"#;
        assert_eq!(extract_api_key(html).unwrap(), "AIzaSyA-test_KEY1");

        let captcha = r#"<div class="g-recaptcha"></div>"#;
        assert!(matches!(extract_api_key(captcha), Err(ServiceFailure::Transient(_))));
        assert!(matches!(extract_api_key("<html></html>"), Err(ServiceFailure::NotFound(_))));
    }

    #[test]
    fn test_parse_caption_tracks() {
        let player = json!({
            "playabilityStatus": {"status": "OK"},
            "captions": {"playerCaptionsTracklistRenderer": {"captionTracks": [
                {"baseUrl": "https://yt.test/tt?v=1&lang=pt&fmt=srv3", "languageCode": "pt",
                 "name": {"runs": [{"text": "Portuguese"}]}},
                {"baseUrl": "https://yt.test/tt?v=1&lang=en", "languageCode": "en",
                 "name": {"simpleText": "English (auto-generated)"}, "kind": "asr"},
                {"languageCode": "de"}
            ]}}
        });
        let tracks = parse_caption_tracks(&player).unwrap();

        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].url, "https://yt.test/tt?v=1&lang=pt");
        assert_eq!(tracks[0].language, "Portuguese");
        assert!(!tracks[0].generated);
        assert_eq!(tracks[1].language, "English (auto-generated)");
        assert!(tracks[1].generated);
    }

    #[test]
    fn test_unplayable_and_disabled() {
        let unplayable = json!({"playabilityStatus": {"status": "ERROR", "reason": "Video unavailable"}});
        let err = parse_caption_tracks(&unplayable).unwrap_err();
        assert!(err.to_string().contains("Video unavailable"));

        let disabled = json!({"playabilityStatus": {"status": "OK"}});
        assert!(matches!(parse_caption_tracks(&disabled), Err(ServiceFailure::NotFound(_))));
    }

    #[test]
    fn test_parse_timedtext() {
        let xml = r##"<?xml version="1.0" encoding="utf-8" ?><transcript>
            <text start="0.1" dur="2.0">Ol&amp;#225; pessoal</text>
            <text start="2.1" dur="1.5">it&amp;#39;s &lt;font color="#fff"&gt;great&lt;/font&gt;</text>
            <text start="3.6" dur="1.0"></text>
            <text start="4.6" dur="1.0">line one
line two</text>
        </transcript>"##;
        let fragments = parse_timedtext(xml).unwrap();

        assert_eq!(fragments[0], "Olá pessoal");
        assert_eq!(fragments[1], "it's great");
        assert_eq!(fragments.last().unwrap(), "line one\nline two");
    }

    #[test]
    fn test_parse_srv3_segments() {
        let xml = r#"<timedtext format="3"><body><p t="0" d="1"><s>hello</s><s> world</s></p></body></timedtext>"#;
        assert_eq!(parse_timedtext(xml).unwrap(), vec!["hello world"]);
    }

    #[test]
    fn test_malformed_xml() {
        assert!(parse_timedtext("<transcript><text>unterminated</transcript>").is_err());
    }
}
