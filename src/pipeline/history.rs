//! Stage 2: history relevance.
//!
//! Decides whether the current question references the prior conversation.
//! Fewer than two stored turns short-circuits to "no relevant history"
//! without a provider call. On an affirmative provider verdict the last
//! six turns (three exchanges) are carried forward; anything else,
//! including provider failure, degrades to no history.

use std::sync::Arc;

use crate::providers::ChatProvider;
use crate::session::ConversationStore;
use crate::turn::ConversationTurn;
use crate::types::QaError;

/// Turns fetched from the store for analysis.
pub const HISTORY_FETCH_LIMIT: usize = 20;
/// Turns formatted into the relevance prompt.
const HISTORY_PROMPT_LIMIT: usize = 10;
/// Turns returned when the question references the conversation.
const RELEVANT_TAIL: usize = 6;

const TEMPERATURE: f32 = 0.1;
const MAX_TOKENS: u32 = 200;

fn format_turns(turns: &[ConversationTurn]) -> String {
    turns
        .iter()
        .map(|turn| format!("{}: {}", turn.role.to_uppercase(), turn.text))
        .collect::<Vec<_>>()
        .join("\n")
}

fn prompt(question: &str, turns: &[ConversationTurn]) -> String {
    let start = turns.len().saturating_sub(HISTORY_PROMPT_LIMIT);
    format!(
        "You are a History Analysis Agent. Determine if the current question \
         references or relates to previous conversation.\n\n\
         Chat History:\n{}\n\n\
         Current Question: {question}\n\n\
         Does this question reference previous conversation? Answer YES or NO, \
         then explain which parts are relevant.\n\n\
         Format:\n\
         REFERENCES_HISTORY: [YES/NO]\n\
         RELEVANT_CONTEXT: [brief explanation]\n",
        format_turns(&turns[start..])
    )
}

/// Runs the history-relevance stage.
///
/// # Errors
///
/// Fails only when the conversation store itself fails; provider problems
/// degrade to an empty result.
pub async fn relevant_history(
    provider: &Arc<dyn ChatProvider>,
    store: &Arc<dyn ConversationStore>,
    session_id: &str,
    question: &str,
) -> Result<Vec<ConversationTurn>, QaError> {
    let turns = store.turns(session_id, HISTORY_FETCH_LIMIT).await?;
    if turns.len() < 2 {
        tracing::debug!(
            session_id,
            turns = turns.len(),
            "too little history, skipping relevance check"
        );
        return Ok(Vec::new());
    }

    match provider
        .complete(&prompt(question, &turns), TEMPERATURE, MAX_TOKENS)
        .await
    {
        Ok(response) if response.contains("REFERENCES_HISTORY: YES") => {
            let start = turns.len().saturating_sub(RELEVANT_TAIL);
            let relevant = turns[start..].to_vec();
            tracing::debug!(session_id, carried = relevant.len(), "history is relevant");
            Ok(relevant)
        }
        Ok(_) => Ok(Vec::new()),
        Err(error) => {
            tracing::warn!(%error, "history stage degraded to empty history");
            Ok(Vec::new())
        }
    }
}
