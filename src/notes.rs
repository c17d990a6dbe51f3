use async_trait::async_trait;
use eyre::{Result, bail};
use log::debug;

use crate::config::Settings;

const NOTES_INSTRUCTIONS: &str = "You are a teaching assistant helping a student study.

Convert the following lecture transcript into clear, structured study notes.

Rules:
- Use headings for topics
- Use bullet points
- Clearly define important terms
- Include examples if mentioned
- Keep explanations simple and concise
- Do NOT include filler or commentary";

/// A language model that turns a prompt into generated text
#[async_trait]
pub trait NotesModel: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

/// Wrap transcript text in the study-notes instructions
pub fn build_prompt(transcript_text: &str) -> String {
    format!("\n{NOTES_INSTRUCTIONS}\n\nTranscript:\n{transcript_text}\n")
}

/// Generate study notes from transcript text, returned verbatim from the model
pub async fn generate_notes(model: &dyn NotesModel, transcript_text: &str) -> Result<String> {
    let prompt = build_prompt(transcript_text);
    debug!("Generating notes from {} chars of transcript", transcript_text.len());
    model.generate(&prompt).await
}

/// Gemini `generateContent` client
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, settings: &Settings) -> Self {
        Self {
            client,
            api_key: settings.gemini_api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.gemini_base_url.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl NotesModel for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        // A missing key surfaces here, at generation time
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("GEMINI_API_KEY environment variable not set (required for note generation)");
        };

        debug!("Generating via Gemini API with model {}", self.model);

        let body = serde_json::json!({
            "contents": [
                {
                    "parts": [
                        { "text": prompt }
                    ]
                }
            ]
        });

        let resp = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            bail!("Gemini API returned {status}: {body}");
        }

        let json: serde_json::Value = resp.json().await?;
        extract_gemini_text(&json)
    }
}

fn extract_gemini_text(json: &serde_json::Value) -> Result<String> {
    if let Some(parts) = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(|p| p.as_array())
    {
        let text: String = parts
            .iter()
            .filter_map(|part| part.get("text")?.as_str())
            .collect::<Vec<_>>()
            .join("");
        if !text.is_empty() {
            return Ok(text);
        }
    }

    if let Some(reason) = json
        .get("promptFeedback")
        .and_then(|f| f.get("blockReason"))
        .and_then(|r| r.as_str())
    {
        bail!("Gemini blocked the prompt: {reason}");
    }

    if let Some(reason) = json
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("finishReason"))
        .and_then(|r| r.as_str())
    {
        bail!("Gemini returned no text (finish reason: {reason})");
    }

    bail!("unexpected Gemini API response format");
}
