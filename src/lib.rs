pub mod config;
pub mod notes;
pub mod output;
pub mod server;
pub mod shell;
pub mod youtube;

use reqwest::Url;

/// Host used by share links: youtu.be/ID
const SHORT_HOST: &str = "youtu.be";

/// Hosts used by watch links: youtube.com/watch?v=ID
const FULL_HOSTS: [&str; 2] = ["youtube.com", "www.youtube.com"];

/// A single captioned segment
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Transcript for a video, segments in chronological order
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub video_id: String,
    pub language: String,
    pub segments: Vec<Segment>,
}

impl Transcript {
    /// All segment texts joined by a single space, in segment order
    pub fn full_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Extract the video ID from a youtu.be or youtube.com link.
///
/// Returns `None` for anything that is not an absolute URL on one of the
/// recognized hosts, and for watch links without a `v` parameter.
pub fn extract_video_id(input: &str) -> Option<String> {
    let url = Url::parse(input.trim()).ok()?;
    let host = url.host_str()?;

    // youtu.be/ID
    if host == SHORT_HOST {
        let id = url.path().trim_start_matches('/');
        return (!id.is_empty()).then(|| id.to_string());
    }

    // youtube.com/watch?v=ID
    if FULL_HOSTS.contains(&host) {
        return url
            .query_pairs()
            .find(|(key, value)| key == "v" && !value.is_empty())
            .map(|(_, value)| value.into_owned());
    }

    None
}
