//! Retrieval-and-orchestration engine for document question answering.
//!
//! Answers natural-language questions about a document by retrieving its
//! most relevant passages and composing an answer from them, with
//! multi-turn conversational context and session summarization. Documents
//! are chunked, embedded, and indexed at most once per document and the
//! index is shared across all requests.
//!
//! ```text
//! DocumentRef ──► document::DocumentFetcher ──► chunker::chunk_text
//!                                                      │
//!                          embedding::BatchedEmbedder ◄┘
//!                                    │
//!                                    ▼
//!                    index::VectorIndex ──► cache::DocumentCache
//!
//! question ──► pipeline::understanding ──► pipeline::history
//!                                                │
//!              expansion::SynonymTable ──► pipeline::retrieval
//!                                                │  (search + rerank)
//!                                                ▼
//!                                     pipeline::generation ──► answer
//!
//! transcript ──► summarizer::Summarizer (primary ▸ timeout ▸ fallback)
//! ```
//!
//! The pipeline's first two stages degrade to safe defaults on provider
//! failure; retrieval and generation propagate errors to the caller.

pub mod cache;
pub mod chunker;
pub mod document;
pub mod embedding;
pub mod expansion;
pub mod index;
pub mod pipeline;
pub mod providers;
pub mod rerank;
pub mod session;
pub mod summarizer;
pub mod turn;
pub mod types;

pub use cache::DocumentCache;
pub use chunker::{Chunk, ChunkerConfig};
pub use document::DocumentFetcher;
pub use embedding::{BatchedEmbedder, EmbeddingProvider, HttpEmbeddingProvider, MockEmbeddingProvider};
pub use expansion::SynonymTable;
pub use index::VectorIndex;
pub use pipeline::{AgentPipeline, PipelineOutcome, RetrievalConfig, Retriever};
pub use providers::{ChatProvider, HttpChatProvider};
pub use rerank::rerank_by_overlap;
pub use session::{ConversationStore, InMemorySessionStore, SessionResolver};
pub use summarizer::{Summarizer, SummarizerConfig, SummaryOutcome, SummaryPath};
pub use turn::ConversationTurn;
pub use types::{DocumentRef, QaError};
