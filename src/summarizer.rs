//! Session summarization with primary/fallback provider selection.
//!
//! Summarizes a whole conversation into a short prose summary plus key
//! points. A configurable primary provider (typically a local model) is
//! tried first under a timeout; on timeout or error the secondary provider
//! takes over. With the primary disabled the secondary is used directly.
//! An empty transcript returns a fixed message without calling either
//! provider.

use std::sync::Arc;
use std::time::Duration;

use crate::providers::ChatProvider;
use crate::session::ConversationStore;
use crate::turn::ConversationTurn;
use crate::types::QaError;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 800;
const TRANSCRIPT_FETCH_LIMIT: usize = usize::MAX;

/// Reply for a session with no recorded conversation.
pub const EMPTY_SESSION_SUMMARY: &str = "No conversation found for this session.";

/// How the summary was produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SummaryPath {
    /// Empty transcript, no provider was called.
    None,
    /// The primary provider answered within its timeout.
    Primary,
    /// The primary was disabled, the secondary answered directly.
    Secondary,
    /// The primary timed out or failed; the secondary answered.
    Fallback { reason: String },
}

/// A produced summary and the route that produced it.
#[derive(Clone, Debug)]
pub struct SummaryOutcome {
    pub summary: String,
    pub key_points: Vec<String>,
    pub path: SummaryPath,
    pub model: String,
}

/// Summarizer tuning.
#[derive(Clone, Debug)]
pub struct SummarizerConfig {
    /// Whether the primary provider is tried at all.
    pub primary_enabled: bool,
    /// Time allowed for the primary provider before falling back.
    pub primary_timeout: Duration,
}

impl Default for SummarizerConfig {
    fn default() -> Self {
        Self {
            primary_enabled: true,
            primary_timeout: Duration::from_secs(30),
        }
    }
}

/// The summarizer stage.
pub struct Summarizer {
    primary: Arc<dyn ChatProvider>,
    secondary: Arc<dyn ChatProvider>,
    config: SummarizerConfig,
}

impl Summarizer {
    pub fn new(primary: Arc<dyn ChatProvider>, secondary: Arc<dyn ChatProvider>) -> Self {
        Self {
            primary,
            secondary,
            config: SummarizerConfig::default(),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: SummarizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Summarizes the full conversation of `session_id`.
    ///
    /// The primary provider is tried only when the caller asks for it via
    /// `prefer_primary` AND the summarizer's `primary_enabled` toggle is
    /// set; otherwise the secondary answers directly.
    ///
    /// # Errors
    ///
    /// Fails when the conversation store fails, or when whichever provider
    /// ends up responsible (secondary after fallback, or primary-less
    /// secondary) fails. A primary failure alone is absorbed into the
    /// fallback path.
    pub async fn summarize(
        &self,
        store: &Arc<dyn ConversationStore>,
        session_id: &str,
        prefer_primary: bool,
    ) -> Result<SummaryOutcome, QaError> {
        let turns = store.turns(session_id, TRANSCRIPT_FETCH_LIMIT).await?;
        if turns.is_empty() {
            tracing::debug!(session_id, "nothing to summarize");
            return Ok(SummaryOutcome {
                summary: EMPTY_SESSION_SUMMARY.to_string(),
                key_points: Vec::new(),
                path: SummaryPath::None,
                model: "none".to_string(),
            });
        }

        let prompt = prompt(&transcript(&turns));

        if prefer_primary && self.config.primary_enabled {
            let attempt = tokio::time::timeout(
                self.config.primary_timeout,
                self.primary.complete(&prompt, TEMPERATURE, MAX_TOKENS),
            )
            .await;
            match attempt {
                Ok(Ok(response)) => {
                    let (summary, key_points) = parse_summary(&response);
                    return Ok(SummaryOutcome {
                        summary,
                        key_points,
                        path: SummaryPath::Primary,
                        model: self.primary.model_name().to_string(),
                    });
                }
                Ok(Err(error)) => {
                    tracing::warn!(%error, "primary summarizer failed, falling back");
                    return self
                        .secondary_summary(&prompt, SummaryPath::Fallback {
                            reason: error.to_string(),
                        })
                        .await;
                }
                Err(_) => {
                    tracing::warn!(
                        timeout = ?self.config.primary_timeout,
                        "primary summarizer timed out, falling back"
                    );
                    return self
                        .secondary_summary(&prompt, SummaryPath::Fallback {
                            reason: "primary timed out".to_string(),
                        })
                        .await;
                }
            }
        }

        self.secondary_summary(&prompt, SummaryPath::Secondary).await
    }

    async fn secondary_summary(
        &self,
        prompt: &str,
        path: SummaryPath,
    ) -> Result<SummaryOutcome, QaError> {
        let response = self.secondary.complete(prompt, TEMPERATURE, MAX_TOKENS).await?;
        let (summary, key_points) = parse_summary(&response);
        Ok(SummaryOutcome {
            summary,
            key_points,
            path,
            model: self.secondary.model_name().to_string(),
        })
    }
}

fn transcript(turns: &[ConversationTurn]) -> String {
    let mut text = String::from("Conversation History:\n\n");
    for turn in turns {
        if turn.has_role(ConversationTurn::USER) {
            text.push_str(&format!("User: {}\n", turn.text));
        } else {
            text.push_str(&format!("Assistant: {}\n\n", turn.text));
        }
    }
    text
}

fn prompt(transcript: &str) -> String {
    format!(
        "You are an expert study assistant helping students review their \
         learning sessions.\n\n\
         Please analyze the following conversation and provide:\n\
         1. A concise summary (2-3 paragraphs) covering the main topics discussed\n\
         2. A bulleted list of key points and important information\n\n\
         Format your response as:\n\
         SUMMARY:\n\
         [Your summary here]\n\n\
         KEY POINTS:\n\
         - [Point 1]\n\
         - [Point 2]\n\
         - [Point 3]\n\
         ...\n\n\
         ---\n\
         {transcript}\n\
         ---\n"
    )
}

/// Splits a provider response into summary text and bullet points.
///
/// Lenient by design: a response with no `KEY POINTS:` marker is all
/// summary, and only lines starting with `-` count as points.
fn parse_summary(response: &str) -> (String, Vec<String>) {
    let mut parts = response.splitn(2, "KEY POINTS:");
    let summary = parts
        .next()
        .unwrap_or_default()
        .replace("SUMMARY:", "")
        .trim()
        .to_string();

    let key_points = parts
        .next()
        .map(|points| {
            points
                .lines()
                .filter(|line| line.trim_start().starts_with('-'))
                .map(|line| line.trim().trim_start_matches('-').trim().to_string())
                .filter(|point| !point.is_empty())
                .collect()
        })
        .unwrap_or_default();

    (summary, key_points)
}
