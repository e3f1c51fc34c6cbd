//! Shared domain types and the crate-wide error taxonomy.

use std::path::PathBuf;

use thiserror::Error;
use url::Url;

/// Errors surfaced by the question-answering engine.
///
/// The taxonomy separates terminal conditions the caller must act on
/// (`EmptyDocument`, `NoDocument`, `DimensionMismatch`) from provider and
/// transport failures. Stages that are allowed to degrade (question
/// understanding, history relevance, the summarizer's primary path) absorb
/// provider failures internally and never surface them as `QaError`.
#[derive(Debug, Error)]
pub enum QaError {
    /// The document produced no usable chunks after extraction and
    /// filtering. Terminal: the caller must supply a document with more
    /// content, retrying will not help.
    #[error("document produced no usable chunks after filtering")]
    EmptyDocument,

    /// The session has no associated document reference. Terminal
    /// configuration error.
    #[error("session '{session_id}' has no associated document")]
    NoDocument { session_id: String },

    /// An embedding vector's length disagrees with the index dimension.
    /// Indicates a provider contract violation.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The embedding provider failed or returned an invalid payload.
    #[error("embedding provider error: {0}")]
    EmbeddingProvider(String),

    /// A chat completion provider failed or returned an invalid payload.
    #[error("chat provider error ({provider}): {message}")]
    LlmProvider { provider: String, message: String },

    /// Fetching or extracting text from the source document failed.
    #[error("document source error: {0}")]
    DocumentSource(String),

    /// The external conversation store could not be read.
    #[error("conversation store error: {0}")]
    ConversationStore(String),

    /// Transport-level HTTP failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Filesystem failure while reading a local document.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Opaque reference to the document backing a session.
///
/// Produced by a [`SessionResolver`](crate::session::SessionResolver);
/// the engine only ever uses it to fetch bytes and as a cache key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentRef {
    /// Remote document fetched over HTTP.
    Url(Url),
    /// Previously uploaded document on local disk.
    LocalPath(PathBuf),
}

impl DocumentRef {
    /// Stable cache key identifying this document.
    ///
    /// Two references compare equal exactly when their keys do, so the
    /// document cache builds each referenced document at most once.
    pub fn cache_key(&self) -> String {
        match self {
            DocumentRef::Url(url) => url.to_string(),
            DocumentRef::LocalPath(path) => path.display().to_string(),
        }
    }
}

impl std::fmt::Display for DocumentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.cache_key())
    }
}
