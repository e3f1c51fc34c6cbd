//! Paragraph-aware text chunking.
//!
//! Splits document text into retrieval-sized passages on paragraph
//! boundaries (blank-line-delimited segments), greedily packing consecutive
//! paragraphs into a buffer until the configured maximum length would be
//! exceeded. Very short chunks are discarded as noise (headers, page
//! numbers, footers).

use crate::types::QaError;

/// An immutable span of document text, the atomic retrieval unit.
///
/// The ordinal `index` is stable within the chunk's document and doubles as
/// the tie-break key when reranking preserves retrieval order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Chunk {
    /// Position of this chunk within its document's chunk list.
    pub index: usize,
    /// The chunk text.
    pub text: String,
}

/// Tunables for [`chunk_text`].
#[derive(Clone, Debug)]
pub struct ChunkerConfig {
    /// Maximum chunk length in characters. A single paragraph longer than
    /// this still becomes its own chunk; the limit only bounds packing.
    pub max_chars: usize,
    /// Chunks with a word count at or below this are discarded.
    pub short_word_limit: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chars: 800,
            short_word_limit: 5,
        }
    }
}

/// Splits `text` into chunks along paragraph boundaries.
///
/// Paragraphs are blank-line-delimited segments. Consecutive paragraphs are
/// joined with a single space into a buffer until appending the next one
/// would exceed `max_chars`; the buffer is then emitted and a new one
/// started with the paragraph that triggered the overflow. The final
/// non-empty buffer is emitted as well.
///
/// # Errors
///
/// Returns [`QaError::EmptyDocument`] when no chunk survives the short-word
/// filter. Callers must treat this as terminal: the document has no
/// processable content.
pub fn chunk_text(text: &str, config: &ChunkerConfig) -> Result<Vec<Chunk>, QaError> {
    let mut buffers: Vec<String> = Vec::new();
    let mut buffer = String::new();

    for paragraph in paragraphs(text) {
        if buffer.is_empty() {
            buffer.push_str(&paragraph);
            continue;
        }
        if buffer.len() + 1 + paragraph.len() > config.max_chars {
            buffers.push(std::mem::take(&mut buffer));
            buffer.push_str(&paragraph);
        } else {
            buffer.push(' ');
            buffer.push_str(&paragraph);
        }
    }
    if !buffer.is_empty() {
        buffers.push(buffer);
    }

    let chunks: Vec<Chunk> = buffers
        .into_iter()
        .filter(|text| text.split_whitespace().count() > config.short_word_limit)
        .enumerate()
        .map(|(index, text)| Chunk { index, text })
        .collect();

    if chunks.is_empty() {
        return Err(QaError::EmptyDocument);
    }

    tracing::debug!(chunks = chunks.len(), "chunked document");
    Ok(chunks)
}

/// Blank-line-delimited segments of `text`, with surrounding whitespace
/// trimmed and intra-paragraph line breaks collapsed to single spaces.
fn paragraphs(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !current.is_empty() {
                out.push(current.join(" "));
                current.clear();
            }
        } else {
            current.push(trimmed);
        }
    }
    if !current.is_empty() {
        out.push(current.join(" "));
    }
    out
}
