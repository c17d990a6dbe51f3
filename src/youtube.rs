use std::fmt;

use async_trait::async_trait;
use eyre::{Result, WrapErr, bail};
use log::{debug, info};
use regex::Regex;
use serde::Deserialize;

use crate::{Segment, Transcript};

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";

/// Caption track kind YouTube uses for auto-generated (speech recognition) tracks
const AUTO_GENERATED_KIND: &str = "asr";

/// Why a video has no usable transcript. These are expected outcomes, not failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// The video has no caption tracks at all
    Disabled,
    /// Caption tracks exist, but none in the requested language
    NotFound { requested: String },
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::Disabled => write!(f, "transcripts are disabled for this video"),
            Unavailable::NotFound { requested } => write!(f, "no transcript found for language '{requested}'"),
        }
    }
}

/// Outcome of a transcript lookup. Hard failures travel as `Err` instead.
#[derive(Debug, Clone, PartialEq)]
pub enum TranscriptFetch {
    Available(Transcript),
    Unavailable(Unavailable),
}

/// Source of video transcripts
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Look up the transcript for `video_id`.
    ///
    /// Only "disabled" and "not found" come back as `Ok(Unavailable)`; network
    /// errors, unplayable videos and malformed responses are `Err`.
    async fn fetch(&self, video_id: &str) -> Result<TranscriptFetch>;
}

#[derive(Debug, Deserialize)]
struct InnerTubePlayerResponse {
    #[serde(rename = "playabilityStatus")]
    playability_status: Option<PlayabilityStatus>,
    captions: Option<CaptionsData>,
}

#[derive(Debug, Deserialize)]
struct PlayabilityStatus {
    status: String,
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionsData {
    #[serde(rename = "playerCaptionsTracklistRenderer")]
    player_captions_tracklist_renderer: Option<CaptionTracklistRenderer>,
}

#[derive(Debug, Deserialize)]
struct CaptionTracklistRenderer {
    #[serde(rename = "captionTracks")]
    caption_tracks: Option<Vec<CaptionTrack>>,
}

#[derive(Debug, Deserialize)]
struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    base_url: String,
    #[serde(rename = "languageCode")]
    language_code: String,
    kind: Option<String>,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some(AUTO_GENERATED_KIND)
    }

    /// Timed-text URL for the classic `<text start dur>` XML format
    fn timedtext_url(&self) -> String {
        self.base_url.replace("&fmt=srv3", "")
    }
}

#[derive(Debug)]
enum TrackSelection<'a> {
    Track(&'a CaptionTrack),
    Unavailable(Unavailable),
}

/// Transcript provider backed by YouTube's built-in captions (InnerTube API)
#[derive(Debug, Clone)]
pub struct YouTubeCaptions {
    client: reqwest::Client,
    lang: String,
    base_url: String,
}

impl YouTubeCaptions {
    pub fn new(client: reqwest::Client, lang: impl Into<String>) -> Self {
        Self {
            client,
            lang: lang.into(),
            base_url: YOUTUBE_BASE_URL.to_string(),
        }
    }

    /// Point the watch page and player requests at another host
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_text(&self, url: &str) -> Result<String> {
        let text = self
            .client
            .get(url)
            .header("User-Agent", USER_AGENT)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(text)
    }

    async fn player_response(&self, video_id: &str) -> Result<InnerTubePlayerResponse> {
        // Step 1: Fetch the watch page to get the InnerTube API key
        let watch_url = format!("{}/watch?v={video_id}", self.base_url);
        debug!("Fetching watch page: {watch_url}");

        let page_html = self.get_text(&watch_url).await?;

        let api_key = extract_api_key(&page_html)?;
        debug!("Extracted InnerTube API key: {api_key}");

        // Step 2: Call InnerTube player endpoint
        let player_url = format!(
            "{}/youtubei/v1/player?key={api_key}&prettyPrint=false",
            self.base_url
        );

        let body = serde_json::json!({
            "context": {
                "client": {
                    "hl": self.lang,
                    "gl": "US",
                    "clientName": "WEB",
                    "clientVersion": "2.20241126.01.00"
                }
            },
            "videoId": video_id
        });

        let resp = self
            .client
            .post(&player_url)
            .header("User-Agent", USER_AGENT)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(resp)
    }
}

#[async_trait]
impl TranscriptProvider for YouTubeCaptions {
    async fn fetch(&self, video_id: &str) -> Result<TranscriptFetch> {
        let resp = self
            .player_response(video_id)
            .await
            .wrap_err_with(|| format!("failed to load player data for video {video_id}"))?;

        let track = match select_track(&resp, &self.lang)? {
            TrackSelection::Track(track) => track,
            TrackSelection::Unavailable(reason) => {
                info!("Transcript unavailable for {video_id}: {reason}");
                return Ok(TranscriptFetch::Unavailable(reason));
            }
        };
        debug!(
            "Using caption track: lang={} generated={}",
            track.language_code,
            track.is_generated()
        );

        // Step 3: Fetch the caption XML
        let caption_xml = self
            .get_text(&track.timedtext_url())
            .await
            .wrap_err_with(|| format!("failed to download captions for video {video_id}"))?;

        let segments = parse_caption_xml(&caption_xml)?;
        debug!("Parsed {} caption segments for {video_id}", segments.len());

        Ok(TranscriptFetch::Available(Transcript {
            video_id: video_id.to_string(),
            language: track.language_code.clone(),
            segments,
        }))
    }
}

fn extract_api_key(html: &str) -> Result<String> {
    let re = Regex::new(r#""INNERTUBE_API_KEY"\s*:\s*"([^"]+)""#)?;
    if let Some(caps) = re.captures(html) {
        return Ok(caps[1].to_string());
    }

    // Fallback: try the newer pattern
    let re2 = Regex::new(r#"innertubeApiKey\s*[=:]\s*"([^"]+)""#)?;
    if let Some(caps) = re2.captures(html) {
        return Ok(caps[1].to_string());
    }

    bail!("could not extract InnerTube API key from watch page");
}

/// Pick the caption track for `lang`, preferring a manually created one.
fn select_track<'a>(resp: &'a InnerTubePlayerResponse, lang: &str) -> Result<TrackSelection<'a>> {
    if let Some(status) = &resp.playability_status {
        if status.status != "OK" {
            let reason = status.reason.as_deref().unwrap_or("no reason given");
            bail!("video is not playable ({}): {reason}", status.status);
        }
    }

    let tracks = match resp
        .captions
        .as_ref()
        .and_then(|c| c.player_captions_tracklist_renderer.as_ref())
        .and_then(|r| r.caption_tracks.as_ref())
    {
        Some(tracks) if !tracks.is_empty() => tracks,
        _ => return Ok(TrackSelection::Unavailable(Unavailable::Disabled)),
    };

    let matching: Vec<&CaptionTrack> = tracks.iter().filter(|t| t.language_code == lang).collect();
    let track = matching
        .iter()
        .find(|t| !t.is_generated())
        .or_else(|| matching.first())
        .copied();

    Ok(match track {
        Some(track) => TrackSelection::Track(track),
        None => TrackSelection::Unavailable(Unavailable::NotFound {
            requested: lang.to_string(),
        }),
    })
}

fn parse_caption_xml(xml: &str) -> Result<Vec<Segment>> {
    use quick_xml::Reader;
    use quick_xml::events::Event;

    let mut reader = Reader::from_str(xml);
    let mut segments = Vec::new();
    let mut current_start: Option<f64> = None;
    let mut current_dur: Option<f64> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"text" => {
                let mut start = None;
                let mut dur = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"start" => {
                            start = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        b"dur" => {
                            dur = String::from_utf8_lossy(&attr.value).parse::<f64>().ok();
                        }
                        _ => {}
                    }
                }
                current_start = start;
                // Some cues omit dur
                current_dur = dur.or(Some(0.0));
            }
            Ok(Event::Text(ref e)) => {
                if let (Some(start), Some(dur)) = (current_start.take(), current_dur.take()) {
                    // Entities unknown to XML (&nbsp;) fail strict unescaping; decode the raw text instead
                    let raw_text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(_) => String::from_utf8_lossy(e).into_owned(),
                    };
                    let text = html_escape::decode_html_entities(&raw_text).to_string();
                    if !text.trim().is_empty() {
                        segments.push(Segment {
                            text,
                            start,
                            duration: dur,
                        });
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("error parsing caption XML: {e}"),
            _ => {}
        }
    }

    Ok(segments)
}
