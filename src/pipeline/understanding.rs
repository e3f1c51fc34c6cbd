//! Stage 1: question understanding.
//!
//! Rephrases the raw question for semantic search and tags it with an
//! intent label. Provider failures and malformed responses degrade to the
//! original question and the default intent; this stage never fails the
//! request.

use std::sync::Arc;

use crate::providers::ChatProvider;

/// Intent assigned when the provider response carries no usable label.
pub const DEFAULT_INTENT: &str = "factual_query";

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 150;

/// Output of the understanding stage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Understanding {
    pub understood_question: String,
    pub intent: String,
}

impl Understanding {
    fn degraded(question: &str) -> Self {
        Self {
            understood_question: question.to_string(),
            intent: DEFAULT_INTENT.to_string(),
        }
    }
}

fn prompt(question: &str) -> String {
    format!(
        "You are a Question Understanding Agent. Analyze the user's question and:\n\
         1. Rephrase it for better clarity and semantic search\n\
         2. Identify the intent (e.g., \"factual_query\", \"clarification\", \
         \"follow_up\", \"comparison\", \"summarization\")\n\n\
         Question: {question}\n\n\
         Respond in this format:\n\
         UNDERSTOOD: [rephrased question]\n\
         INTENT: [intent type]\n"
    )
}

/// Parses the `UNDERSTOOD:`/`INTENT:` labeled lines out of a provider
/// response. Provider text is untrusted free text, so any missing or
/// malformed label falls back to its default rather than erroring.
fn parse_response(question: &str, response: &str) -> Understanding {
    let mut parsed = Understanding::degraded(question);
    for line in response.lines() {
        if let Some(rest) = line.strip_prefix("UNDERSTOOD:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                parsed.understood_question = rest.to_string();
            }
        } else if let Some(rest) = line.strip_prefix("INTENT:") {
            let rest = rest.trim();
            if !rest.is_empty() {
                parsed.intent = rest.to_string();
            }
        }
    }
    parsed
}

/// Runs the understanding stage against `provider`.
pub async fn understand(provider: &Arc<dyn ChatProvider>, question: &str) -> Understanding {
    match provider
        .complete(&prompt(question), TEMPERATURE, MAX_TOKENS)
        .await
    {
        Ok(response) => {
            let parsed = parse_response(question, &response);
            tracing::debug!(
                understood = %parsed.understood_question,
                intent = %parsed.intent,
                "question understood"
            );
            parsed
        }
        Err(error) => {
            tracing::warn!(%error, "understanding stage degraded to original question");
            Understanding::degraded(question)
        }
    }
}
