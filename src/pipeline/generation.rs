//! Stage 4: answer generation.
//!
//! Composes a single grounded prompt from the reranked chunks, the carried
//! history, both phrasings of the question, and the intent label, then
//! returns the provider's trimmed response verbatim. The intent only
//! shapes the formatting guidance; it never skips retrieval.

use std::sync::Arc;

use crate::chunker::Chunk;
use crate::providers::ChatProvider;
use crate::turn::ConversationTurn;
use crate::types::QaError;

const TEMPERATURE: f32 = 0.3;
const MAX_TOKENS: u32 = 2000;
const CHUNK_SEPARATOR: &str = "\n---\n";

fn structuring_guidance(intent: &str) -> &'static str {
    match intent {
        "comparison" => {
            "Present the comparison as a table or parallel bullet lists so the \
             differences line up side by side."
        }
        "summarization" => {
            "Present the answer as a concise bulleted summary of the relevant points."
        }
        _ => {
            "Structure the answer clearly with bullet points, sections, or \
             numbered lists as the content warrants."
        }
    }
}

fn history_block(history: &[ConversationTurn]) -> String {
    if history.is_empty() {
        return String::new();
    }
    let lines: Vec<String> = history
        .iter()
        .map(|turn| format!("{}: {}", turn.role.to_uppercase(), turn.text))
        .collect();
    format!("\n\nPREVIOUS CONVERSATION:\n{}", lines.join("\n"))
}

fn prompt(
    question: &str,
    understood_question: &str,
    intent: &str,
    chunks: &[Chunk],
    history: &[ConversationTurn],
) -> String {
    let context: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    format!(
        "You are a document Q&A assistant. Answer questions using ONLY the \
         document content provided below.\n\n\
         Rules:\n\
         1. Use ONLY information from the DOCUMENT CONTEXT below, never external knowledge.\n\
         2. Use ALL the relevant information provided in the context.\n\
         3. If the document mentions the topic, answer with whatever content is available.\n\
         4. If the document only mentions the topic as a heading with no details, say so.\n\
         5. If the topic is not in the document at all, say you cannot find it mentioned.\n\n\
         {guidance}\n\n\
         ---\n\
         DOCUMENT CONTEXT (your ONLY source, {count} chunks provided):\n\
         {context}{history}\n\
         ---\n\n\
         QUESTION: {question}\n\
         REPHRASED: {understood_question}\n\
         INTENT: {intent}\n\n\
         Provide a comprehensive answer using ALL relevant information from the \
         document context above. Do not add external knowledge:\n",
        guidance = structuring_guidance(intent),
        count = chunks.len(),
        context = context.join(CHUNK_SEPARATOR),
        history = history_block(history),
    )
}

/// Runs the generation stage and returns the provider's answer, trimmed.
///
/// # Errors
///
/// Generation is not degradable: provider failures abort the request.
pub async fn generate(
    provider: &Arc<dyn ChatProvider>,
    question: &str,
    understood_question: &str,
    intent: &str,
    chunks: &[Chunk],
    history: &[ConversationTurn],
) -> Result<String, QaError> {
    let answer = provider
        .complete(
            &prompt(question, understood_question, intent, chunks, history),
            TEMPERATURE,
            MAX_TOKENS,
        )
        .await?;
    Ok(answer.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(index: usize, text: &str) -> Chunk {
        Chunk {
            index,
            text: text.to_string(),
        }
    }

    #[test]
    fn prompt_joins_chunks_with_the_separator() {
        let text = prompt(
            "q",
            "q",
            "factual_query",
            &[chunk(0, "first chunk"), chunk(1, "second chunk")],
            &[],
        );
        assert!(text.contains("first chunk\n---\nsecond chunk"));
        assert!(text.contains("2 chunks provided"));
    }

    #[test]
    fn history_is_omitted_when_empty() {
        let text = prompt("q", "q", "factual_query", &[chunk(0, "c")], &[]);
        assert!(!text.contains("PREVIOUS CONVERSATION"));
    }

    #[test]
    fn history_is_formatted_with_uppercase_roles() {
        let history = vec![
            ConversationTurn::user("what about IVF?"),
            ConversationTurn::assistant("IVF is covered after 24 months."),
        ];
        let text = prompt("q", "q", "follow_up", &[chunk(0, "c")], &history);
        assert!(text.contains("PREVIOUS CONVERSATION:\nUSER: what about IVF?"));
        assert!(text.contains("ASSISTANT: IVF is covered after 24 months."));
    }

    #[test]
    fn guidance_varies_by_intent() {
        let comparison = prompt("q", "q", "comparison", &[chunk(0, "c")], &[]);
        let summary = prompt("q", "q", "summarization", &[chunk(0, "c")], &[]);
        assert!(comparison.contains("table"));
        assert!(summary.contains("bulleted summary"));
    }
}
