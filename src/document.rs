//! Document fetching and text extraction.
//!
//! Resolves a [`DocumentRef`] to raw bytes (HTTP download or local read)
//! and extracts plain text. Page-oriented PDF documents are extracted with
//! page text concatenated by newlines; plain UTF-8 files pass through
//! untouched. PDF extraction is CPU-bound and runs on the blocking thread
//! pool so it never stalls unrelated requests.

use tokio::fs;

use crate::types::{DocumentRef, QaError};

/// Fetches document bytes and extracts their text.
#[derive(Clone, Default)]
pub struct DocumentFetcher {
    client: reqwest::Client,
}

impl DocumentFetcher {
    /// Creates a fetcher with a default HTTP client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher reusing an existing HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Downloads or reads the raw bytes behind `document`.
    ///
    /// Fetch failures are fatal and surfaced untouched; the engine never
    /// retries document fetches internally.
    pub async fn fetch_bytes(&self, document: &DocumentRef) -> Result<Vec<u8>, QaError> {
        match document {
            DocumentRef::Url(url) => {
                let response = self
                    .client
                    .get(url.clone())
                    .send()
                    .await?
                    .error_for_status()?;
                Ok(response.bytes().await?.to_vec())
            }
            DocumentRef::LocalPath(path) => Ok(fs::read(path).await?),
        }
    }

    /// Fetches `document` and extracts its text.
    pub async fn load_text(&self, document: &DocumentRef) -> Result<String, QaError> {
        let bytes = self.fetch_bytes(document).await?;
        tracing::debug!(document = %document, bytes = bytes.len(), "fetched document");
        extract_text(bytes).await
    }
}

/// Extracts plain text from raw document bytes.
///
/// PDFs (recognized by their magic bytes) are parsed off-thread with page
/// text joined by newlines; anything else must be valid UTF-8 text.
pub async fn extract_text(bytes: Vec<u8>) -> Result<String, QaError> {
    if bytes.starts_with(b"%PDF") {
        return tokio::task::spawn_blocking(move || {
            pdf_extract::extract_text_from_mem(&bytes)
                .map_err(|e| QaError::DocumentSource(format!("PDF extraction failed: {e}")))
        })
        .await
        .map_err(|e| QaError::DocumentSource(format!("extraction task failed: {e}")))?;
    }

    String::from_utf8(bytes)
        .map_err(|_| QaError::DocumentSource("document is neither PDF nor UTF-8 text".into()))
}
