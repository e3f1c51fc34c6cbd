//! Lexical-overlap reranking of vector-search candidates.
//!
//! The second half of a deliberate two-stage retrieval: vector distance
//! provides broad recall, then this reranker boosts precision by counting
//! exact question-word hits. The stage order matters and is fixed by the
//! retrieval stage: vector search first, lexical rerank second.

use std::collections::HashSet;

use crate::chunker::Chunk;

/// Reorders `candidates` by descending bag-of-words overlap with
/// `question` and keeps the first `top_k`.
///
/// The score of a chunk is the number of **distinct** lowercase question
/// words it contains (case-insensitive substring containment, no
/// stemming). The sort is stable: ties keep their original retrieval
/// order, so vector-distance ranking still decides among equally scored
/// chunks.
pub fn rerank_by_overlap(question: &str, candidates: Vec<Chunk>, top_k: usize) -> Vec<Chunk> {
    let words: HashSet<String> = question
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut ranked = candidates;
    ranked.sort_by_cached_key(|chunk| {
        let haystack = chunk.text.to_lowercase();
        let hits = words.iter().filter(|w| haystack.contains(w.as_str())).count();
        std::cmp::Reverse(hits)
    });
    ranked.truncate(top_k);
    ranked
}
