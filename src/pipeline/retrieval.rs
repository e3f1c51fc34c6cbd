//! Stage 3: context retrieval.
//!
//! Resolves the session's document, builds (or reuses) its chunked and
//! embedded index, then runs the two-stage search: synonym-expanded vector
//! search for broad recall, lexical-overlap rerank for precision. Retrieval
//! depth scales up when the question asks for a detailed answer.

use std::sync::Arc;

use crate::cache::DocumentCache;
use crate::chunker::{self, Chunk, ChunkerConfig};
use crate::document::DocumentFetcher;
use crate::embedding::BatchedEmbedder;
use crate::expansion::SynonymTable;
use crate::index::{self, VectorIndex};
use crate::rerank::rerank_by_overlap;
use crate::session::SessionResolver;
use crate::types::QaError;

/// Candidate counts for the two retrieval stages, with the deeper variants
/// used when the question asks for a detailed answer.
#[derive(Clone, Debug)]
pub struct RetrievalConfig {
    /// Vector-search candidates for an ordinary question.
    pub base_k: usize,
    /// Chunks kept after reranking an ordinary question.
    pub base_top_k: usize,
    /// Vector-search candidates when detail is requested.
    pub detail_k: usize,
    /// Chunks kept after reranking when detail is requested.
    pub detail_top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            base_k: 21,
            base_top_k: 21,
            detail_k: 40,
            detail_top_k: 35,
        }
    }
}

/// Keywords whose presence in a question selects the deeper retrieval
/// depths. Matching is plain lowercase substring containment, so "detail"
/// also fires inside "detailed" or "details".
const DETAIL_KEYWORDS: &[&str] = &[
    "detail",
    "detailed",
    "depth",
    "in-depth",
    "comprehensive",
    "thorough",
    "complete",
    "full",
    "extensive",
    "elaborate",
];

/// True when either phrasing of the question asks for a detailed answer.
pub fn wants_detail(question: &str, understood_question: &str) -> bool {
    let question = question.to_lowercase();
    let understood = understood_question.to_lowercase();
    DETAIL_KEYWORDS
        .iter()
        .any(|keyword| question.contains(keyword) || understood.contains(keyword))
}

/// Shared retrieval machinery: the document fetcher, embedder, per-document
/// index cache, and the expansion table.
pub struct Retriever {
    fetcher: DocumentFetcher,
    embedder: BatchedEmbedder,
    cache: DocumentCache<VectorIndex>,
    synonyms: SynonymTable,
    chunker: ChunkerConfig,
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(fetcher: DocumentFetcher, embedder: BatchedEmbedder) -> Self {
        Self {
            fetcher,
            embedder,
            cache: DocumentCache::new(),
            synonyms: SynonymTable::default(),
            chunker: ChunkerConfig::default(),
            config: RetrievalConfig::default(),
        }
    }

    #[must_use]
    pub fn with_synonyms(mut self, synonyms: SynonymTable) -> Self {
        self.synonyms = synonyms;
        self
    }

    #[must_use]
    pub fn with_chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: RetrievalConfig) -> Self {
        self.config = config;
        self
    }

    /// The per-document index cache, exposed for inspection.
    pub fn cache(&self) -> &DocumentCache<VectorIndex> {
        &self.cache
    }

    /// Retrieves the reranked context chunks for a question.
    ///
    /// # Errors
    ///
    /// Fatal, never degraded: a session without a document yields
    /// [`QaError::NoDocument`], and any fetch, chunking, embedding, or
    /// index failure aborts the request. A failed index build leaves no
    /// cache entry behind.
    pub async fn retrieve(
        &self,
        resolver: &Arc<dyn SessionResolver>,
        session_id: &str,
        question: &str,
        understood_question: &str,
    ) -> Result<Vec<Chunk>, QaError> {
        let document = resolver
            .document_for(session_id)
            .await?
            .ok_or_else(|| QaError::NoDocument {
                session_id: session_id.to_string(),
            })?;

        let key = document.cache_key();
        let index = self
            .cache
            .get_or_build(&key, || async {
                let text = self.fetcher.load_text(&document).await?;
                let chunks = chunker::chunk_text(&text, &self.chunker)?;
                let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
                let vectors = self.embedder.embed_all(&texts).await?;
                let index = VectorIndex::insert_all(vectors, chunks)?;
                tracing::info!(key, chunks = index.len(), dim = index.dim(), "indexed document");
                Ok::<_, QaError>(index)
            })
            .await?;

        let (k, top_k) = if wants_detail(question, understood_question) {
            tracing::debug!(session_id, "detail requested, deepening retrieval");
            (self.config.detail_k, self.config.detail_top_k)
        } else {
            (self.config.base_k, self.config.base_top_k)
        };

        let variants = self.synonyms.expand(understood_question);
        let variant_vectors = self.embedder.embed_all(&variants).await?;
        let query = index::mean_vector(&variant_vectors);

        let candidates: Vec<Chunk> = index.search(&query, k)?.into_iter().cloned().collect();
        tracing::debug!(
            session_id,
            variants = variants.len(),
            candidates = candidates.len(),
            "vector search complete"
        );
        Ok(rerank_by_overlap(understood_question, candidates, top_k))
    }
}
