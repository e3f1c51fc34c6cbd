//! Session-scoped conversation history and document resolution.
//!
//! Every request carries a session id. The engine resolves the session to
//! its single bound document through [`SessionResolver`] and reads the
//! session's conversation history through [`ConversationStore`]. Both are
//! traits so deployments can back them with whatever persistence they run,
//! and tests can use the in-memory implementation shipped here.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::turn::ConversationTurn;
use crate::types::{DocumentRef, QaError};

/// Read access to a session's conversation history.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Returns up to `limit` most recent turns for `session_id`, oldest
    /// first. An unknown session yields an empty list, not an error.
    async fn turns(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>, QaError>;
}

/// Maps a session id to the document it is bound to.
#[async_trait]
pub trait SessionResolver: Send + Sync {
    /// Returns the document bound to `session_id`, or `None` when the
    /// session has no document yet.
    async fn document_for(&self, session_id: &str) -> Result<Option<DocumentRef>, QaError>;
}

#[derive(Default)]
struct SessionState {
    document: Option<DocumentRef>,
    turns: Vec<ConversationTurn>,
}

/// In-memory [`ConversationStore`] and [`SessionResolver`], used in tests
/// and demos.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: Mutex<HashMap<String, SessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `document` to `session_id`, replacing any previous binding.
    pub fn bind_document(&self, session_id: &str, document: DocumentRef) {
        self.sessions
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .document = Some(document);
    }

    /// Appends a turn to the session's history.
    pub fn push_turn(&self, session_id: &str, turn: ConversationTurn) {
        self.sessions
            .lock()
            .entry(session_id.to_string())
            .or_default()
            .turns
            .push(turn);
    }

    /// Number of turns stored for `session_id`.
    pub fn turn_count(&self, session_id: &str) -> usize {
        self.sessions
            .lock()
            .get(session_id)
            .map_or(0, |state| state.turns.len())
    }
}

#[async_trait]
impl ConversationStore for InMemorySessionStore {
    async fn turns(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>, QaError> {
        let sessions = self.sessions.lock();
        let Some(state) = sessions.get(session_id) else {
            return Ok(Vec::new());
        };
        let start = state.turns.len().saturating_sub(limit);
        Ok(state.turns[start..].to_vec())
    }
}

#[async_trait]
impl SessionResolver for InMemorySessionStore {
    async fn document_for(&self, session_id: &str) -> Result<Option<DocumentRef>, QaError> {
        Ok(self
            .sessions
            .lock()
            .get(session_id)
            .and_then(|state| state.document.clone()))
    }
}

#[async_trait]
impl<S: ConversationStore + ?Sized> ConversationStore for Arc<S> {
    async fn turns(&self, session_id: &str, limit: usize) -> Result<Vec<ConversationTurn>, QaError> {
        (**self).turns(session_id, limit).await
    }
}

#[async_trait]
impl<S: SessionResolver + ?Sized> SessionResolver for Arc<S> {
    async fn document_for(&self, session_id: &str) -> Result<Option<DocumentRef>, QaError> {
        (**self).document_for(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_session_has_no_turns_and_no_document() {
        let store = InMemorySessionStore::new();
        assert!(store.turns("nope", 10).await.unwrap().is_empty());
        assert!(store.document_for("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn turns_returns_most_recent_oldest_first() {
        let store = InMemorySessionStore::new();
        for i in 0..5 {
            store.push_turn("s", ConversationTurn::user(format!("q{i}")));
        }

        let turns = store.turns("s", 3).await.unwrap();
        let texts: Vec<_> = turns.iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["q2", "q3", "q4"]);
    }

    #[tokio::test]
    async fn bound_document_is_resolved() {
        let store = InMemorySessionStore::new();
        store.bind_document("s", DocumentRef::LocalPath("policy.pdf".into()));

        let document = store.document_for("s").await.unwrap().unwrap();
        assert_eq!(document.cache_key(), "policy.pdf");
    }
}
