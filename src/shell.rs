use std::fmt;
use std::sync::Arc;

use eyre::{Result, WrapErr};
use log::{debug, info};

use crate::extract_video_id;
use crate::notes::{NotesModel, generate_notes};
use crate::youtube::{TranscriptFetch, TranscriptProvider, Unavailable};

/// One user interaction: the current contents of the URL field, and whether
/// the generate button was pressed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interaction {
    pub url: String,
    pub generate: bool,
}

impl Interaction {
    pub fn entered(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            generate: false,
        }
    }

    pub fn generate(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            generate: true,
        }
    }
}

/// Why an interaction stopped before the generate button
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoTranscript {
    /// Reported by the transcript provider
    Provider(Unavailable),
    /// The provider returned a transcript without any segments
    Empty,
}

impl fmt::Display for NoTranscript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoTranscript::Provider(reason) => reason.fmt(f),
            NoTranscript::Empty => write!(f, "the transcript is empty"),
        }
    }
}

/// Where an interaction is in the link -> transcript -> notes pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum Stage {
    /// Nothing entered yet
    Idle,
    /// Link entered, ID extraction attempted
    Parsed { video_id: Option<String> },
    /// Link did not yield a video ID
    Invalid,
    /// Transcript lookup in progress
    Fetching { video_id: String },
    /// No transcript for this video
    Unavailable { video_id: String, reason: NoTranscript },
    /// Transcript present, waiting for the generate button
    Ready { video_id: String, transcript_text: String },
    /// Model call in progress
    Generating { video_id: String, transcript_text: String },
    /// Notes produced
    Displayed { video_id: String, notes: String },
}

impl Stage {
    /// Entry stage for an interaction
    pub fn start(interaction: &Interaction) -> Self {
        if interaction.url.is_empty() {
            Stage::Idle
        } else {
            Stage::Parsed {
                video_id: extract_video_id(&interaction.url),
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::Parsed { .. } => "parsed",
            Stage::Invalid => "invalid",
            Stage::Fetching { .. } => "fetching",
            Stage::Unavailable { .. } => "unavailable",
            Stage::Ready { .. } => "ready",
            Stage::Generating { .. } => "generating",
            Stage::Displayed { .. } => "displayed",
        }
    }

    pub fn video_id(&self) -> Option<&str> {
        match self {
            Stage::Parsed { video_id } => video_id.as_deref(),
            Stage::Fetching { video_id }
            | Stage::Unavailable { video_id, .. }
            | Stage::Ready { video_id, .. }
            | Stage::Generating { video_id, .. }
            | Stage::Displayed { video_id, .. } => Some(video_id),
            Stage::Idle | Stage::Invalid => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Runs the pipeline for one interaction. Holds no per-user state: every
/// interaction re-derives the video ID and re-fetches the transcript.
#[derive(Clone)]
pub struct Shell {
    transcripts: Arc<dyn TranscriptProvider>,
    model: Arc<dyn NotesModel>,
}

impl Shell {
    pub fn new(transcripts: Arc<dyn TranscriptProvider>, model: Arc<dyn NotesModel>) -> Self {
        Self { transcripts, model }
    }

    /// Advance from the entry stage until no further transition applies.
    ///
    /// Only the soft "no transcript" outcomes are handled here; transcript
    /// provider and model failures are returned as `Err`.
    pub async fn run(&self, interaction: &Interaction) -> Result<Stage> {
        let mut stage = Stage::start(interaction);
        while let Some(next) = self.advance(&stage, interaction).await? {
            debug!("{stage} -> {next}");
            stage = next;
        }
        Ok(stage)
    }

    async fn advance(&self, stage: &Stage, interaction: &Interaction) -> Result<Option<Stage>> {
        let next = match stage {
            Stage::Idle | Stage::Invalid | Stage::Unavailable { .. } | Stage::Displayed { .. } => return Ok(None),
            Stage::Parsed { video_id: None } => Stage::Invalid,
            Stage::Parsed {
                video_id: Some(video_id),
            } => Stage::Fetching {
                video_id: video_id.clone(),
            },
            Stage::Fetching { video_id } => self.fetch(video_id).await?,
            Stage::Ready {
                video_id,
                transcript_text,
            } => {
                if !interaction.generate {
                    return Ok(None);
                }
                Stage::Generating {
                    video_id: video_id.clone(),
                    transcript_text: transcript_text.clone(),
                }
            }
            Stage::Generating {
                video_id,
                transcript_text,
            } => {
                let notes = generate_notes(self.model.as_ref(), transcript_text)
                    .await
                    .wrap_err_with(|| format!("failed to generate notes for video {video_id}"))?;
                info!("Generated {} chars of notes for {video_id}", notes.len());
                Stage::Displayed {
                    video_id: video_id.clone(),
                    notes,
                }
            }
        };
        Ok(Some(next))
    }

    async fn fetch(&self, video_id: &str) -> Result<Stage> {
        let fetched = self
            .transcripts
            .fetch(video_id)
            .await
            .wrap_err_with(|| format!("failed to fetch transcript for video {video_id}"))?;

        Ok(match fetched {
            TranscriptFetch::Available(transcript) if transcript.segments.is_empty() => Stage::Unavailable {
                video_id: video_id.to_string(),
                reason: NoTranscript::Empty,
            },
            TranscriptFetch::Available(transcript) => Stage::Ready {
                video_id: video_id.to_string(),
                transcript_text: transcript.full_text(),
            },
            TranscriptFetch::Unavailable(reason) => Stage::Unavailable {
                video_id: video_id.to_string(),
                reason: NoTranscript::Provider(reason),
            },
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{Segment, Transcript};
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// What the fake provider answers with
    pub(crate) enum Script {
        Segments(Vec<&'static str>),
        Unavailable(Unavailable),
        Fail(&'static str),
    }

    pub(crate) struct FakeTranscripts {
        pub script: Script,
        pub requested: Mutex<Vec<String>>,
    }

    impl FakeTranscripts {
        pub fn new(script: Script) -> Arc<Self> {
            Arc::new(Self {
                script,
                requested: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.requested.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl TranscriptProvider for FakeTranscripts {
        async fn fetch(&self, video_id: &str) -> Result<TranscriptFetch> {
            self.requested.lock().unwrap().push(video_id.to_string());
            match &self.script {
                Script::Segments(texts) => Ok(TranscriptFetch::Available(Transcript {
                    video_id: video_id.to_string(),
                    language: "en".to_string(),
                    segments: texts
                        .iter()
                        .enumerate()
                        .map(|(i, text)| Segment {
                            text: text.to_string(),
                            start: i as f64,
                            duration: 1.0,
                        })
                        .collect(),
                })),
                Script::Unavailable(reason) => Ok(TranscriptFetch::Unavailable(reason.clone())),
                Script::Fail(msg) => Err(eyre::eyre!("{msg}")),
            }
        }
    }

    pub(crate) struct FakeModel {
        pub reply: Result<&'static str, &'static str>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl FakeModel {
        pub fn replying(reply: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(msg: &'static str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(msg),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl NotesModel for FakeModel {
        async fn generate(&self, prompt: &str) -> Result<String> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(msg) => Err(eyre::eyre!("{msg}")),
            }
        }
    }

    const LOOPS_URL: &str = "https://www.youtube.com/watch?v=abc123";
    const LOOPS_NOTES: &str = "## Loops\n- **Loop**: repeats code";

    fn loops() -> Arc<FakeTranscripts> {
        FakeTranscripts::new(Script::Segments(vec!["Intro to loops", "They repeat code"]))
    }

    #[tokio::test]
    async fn test_empty_input_is_idle() {
        let transcripts = loops();
        let shell = Shell::new(transcripts.clone(), FakeModel::replying(LOOPS_NOTES));
        let stage = shell.run(&Interaction::default()).await.unwrap();
        assert_eq!(stage, Stage::Idle);
        assert_eq!(transcripts.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_link_issues_no_network_calls() {
        let transcripts = loops();
        let model = FakeModel::replying(LOOPS_NOTES);
        let shell = Shell::new(transcripts.clone(), model.clone());

        let stage = shell.run(&Interaction::generate("not a url")).await.unwrap();
        assert_eq!(stage, Stage::Invalid);
        assert_eq!(transcripts.calls(), 0);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_unrecognized_host_is_invalid() {
        let transcripts = loops();
        let shell = Shell::new(transcripts.clone(), FakeModel::replying(LOOPS_NOTES));
        let stage = shell.run(&Interaction::entered("https://vimeo.com/123")).await.unwrap();
        assert_eq!(stage, Stage::Invalid);
        assert_eq!(transcripts.calls(), 0);
    }

    #[tokio::test]
    async fn test_entered_link_waits_for_button() {
        let transcripts = loops();
        let model = FakeModel::replying(LOOPS_NOTES);
        let shell = Shell::new(transcripts.clone(), model.clone());

        let stage = shell.run(&Interaction::entered(LOOPS_URL)).await.unwrap();
        assert_eq!(
            stage,
            Stage::Ready {
                video_id: "abc123".to_string(),
                transcript_text: "Intro to loops They repeat code".to_string(),
            }
        );
        assert_eq!(transcripts.requested.lock().unwrap().as_slice(), ["abc123"]);
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_generate_displays_model_text_verbatim() {
        let transcripts = loops();
        let model = FakeModel::replying(LOOPS_NOTES);
        let shell = Shell::new(transcripts.clone(), model.clone());

        let stage = shell.run(&Interaction::generate(LOOPS_URL)).await.unwrap();
        assert_eq!(
            stage,
            Stage::Displayed {
                video_id: "abc123".to_string(),
                notes: LOOPS_NOTES.to_string(),
            }
        );

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Intro to loops They repeat code"));
    }

    #[tokio::test]
    async fn test_every_interaction_refetches() {
        let transcripts = loops();
        let shell = Shell::new(transcripts.clone(), FakeModel::replying(LOOPS_NOTES));
        shell.run(&Interaction::entered(LOOPS_URL)).await.unwrap();
        shell.run(&Interaction::generate(LOOPS_URL)).await.unwrap();
        assert_eq!(transcripts.calls(), 2);
    }

    #[tokio::test]
    async fn test_disabled_transcript_is_unavailable() {
        let transcripts = FakeTranscripts::new(Script::Unavailable(Unavailable::Disabled));
        let model = FakeModel::replying(LOOPS_NOTES);
        let shell = Shell::new(transcripts, model.clone());

        let stage = shell.run(&Interaction::generate("https://youtu.be/abc123")).await.unwrap();
        assert_eq!(
            stage,
            Stage::Unavailable {
                video_id: "abc123".to_string(),
                reason: NoTranscript::Provider(Unavailable::Disabled),
            }
        );
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_transcript_is_unavailable() {
        let reason = Unavailable::NotFound {
            requested: "en".to_string(),
        };
        let transcripts = FakeTranscripts::new(Script::Unavailable(reason.clone()));
        let shell = Shell::new(transcripts, FakeModel::replying(LOOPS_NOTES));

        let stage = shell.run(&Interaction::entered(LOOPS_URL)).await.unwrap();
        assert_eq!(
            stage,
            Stage::Unavailable {
                video_id: "abc123".to_string(),
                reason: NoTranscript::Provider(reason),
            }
        );
    }

    #[tokio::test]
    async fn test_empty_transcript_is_unavailable() {
        let transcripts = FakeTranscripts::new(Script::Segments(vec![]));
        let shell = Shell::new(transcripts, FakeModel::replying(LOOPS_NOTES));
        let stage = shell.run(&Interaction::generate(LOOPS_URL)).await.unwrap();
        assert_eq!(
            stage,
            Stage::Unavailable {
                video_id: "abc123".to_string(),
                reason: NoTranscript::Empty,
            }
        );
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let transcripts = FakeTranscripts::new(Script::Fail("rate limited"));
        let model = FakeModel::replying(LOOPS_NOTES);
        let shell = Shell::new(transcripts, model.clone());

        let err = shell.run(&Interaction::generate(LOOPS_URL)).await.unwrap_err();
        let chain = format!("{err:#}");
        assert!(chain.contains("failed to fetch transcript for video abc123"));
        assert!(chain.contains("rate limited"));
        assert_eq!(model.calls(), 0);
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let shell = Shell::new(loops(), FakeModel::failing("quota exceeded"));
        let err = shell.run(&Interaction::generate(LOOPS_URL)).await.unwrap_err();
        assert!(format!("{err:#}").contains("quota exceeded"));
    }

    #[test]
    fn test_stage_video_id() {
        assert_eq!(Stage::Idle.video_id(), None);
        assert_eq!(Stage::Invalid.video_id(), None);
        assert_eq!(Stage::Parsed { video_id: None }.video_id(), None);
        let ready = Stage::Ready {
            video_id: "abc".to_string(),
            transcript_text: String::new(),
        };
        assert_eq!(ready.video_id(), Some("abc"));
        assert_eq!(ready.to_string(), "ready");
    }

    #[test]
    fn test_no_transcript_display() {
        assert_eq!(
            NoTranscript::Provider(Unavailable::Disabled).to_string(),
            "transcripts are disabled for this video"
        );
        assert_eq!(NoTranscript::Empty.to_string(), "the transcript is empty");
    }
}
