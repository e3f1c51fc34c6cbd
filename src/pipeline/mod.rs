//! The four-stage question-answering pipeline.
//!
//! Stages run strictly in order for one request: Understanding rephrases
//! the question, History Relevance decides what prior conversation to
//! carry, Retrieval assembles the context chunks, and Generation composes
//! the answer. Understanding and History degrade on failure; Retrieval and
//! Generation abort the request. Separate requests against an
//! already-cached document run fully in parallel.

pub mod generation;
pub mod history;
pub mod retrieval;
pub mod understanding;

use std::sync::Arc;

use futures_util::future;

use crate::chunker::Chunk;
use crate::document::DocumentFetcher;
use crate::embedding::BatchedEmbedder;
use crate::providers::ChatProvider;
use crate::session::{ConversationStore, SessionResolver};
use crate::turn::ConversationTurn;
use crate::types::QaError;

pub use retrieval::{RetrievalConfig, Retriever};
pub use understanding::{Understanding, DEFAULT_INTENT};

/// Everything one request produced, stage by stage.
#[derive(Clone, Debug)]
pub struct PipelineOutcome {
    pub question: String,
    pub understood_question: String,
    pub intent: String,
    pub relevant_history: Vec<ConversationTurn>,
    pub chunks: Vec<Chunk>,
    pub answer: String,
}

/// The assembled pipeline: chat provider, retrieval machinery, and the
/// session collaborators.
pub struct AgentPipeline {
    chat: Arc<dyn ChatProvider>,
    retriever: Retriever,
    store: Arc<dyn ConversationStore>,
    resolver: Arc<dyn SessionResolver>,
}

/// Builder for [`AgentPipeline`].
pub struct AgentPipelineBuilder {
    chat: Arc<dyn ChatProvider>,
    retriever: Retriever,
    store: Option<Arc<dyn ConversationStore>>,
    resolver: Option<Arc<dyn SessionResolver>>,
}

impl AgentPipelineBuilder {
    #[must_use]
    pub fn store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn SessionResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Finishes the build.
    ///
    /// # Errors
    ///
    /// Fails when the conversation store or session resolver is missing.
    pub fn build(self) -> Result<AgentPipeline, QaError> {
        let store = self.store.ok_or_else(|| {
            QaError::ConversationStore("pipeline built without a conversation store".into())
        })?;
        let resolver = self.resolver.ok_or_else(|| {
            QaError::ConversationStore("pipeline built without a session resolver".into())
        })?;
        Ok(AgentPipeline {
            chat: self.chat,
            retriever: self.retriever,
            store,
            resolver,
        })
    }
}

impl AgentPipeline {
    /// Starts a builder from the chat provider and an embedder; retrieval
    /// uses a default fetcher, chunker, synonym table, and depths.
    pub fn builder(chat: Arc<dyn ChatProvider>, embedder: BatchedEmbedder) -> AgentPipelineBuilder {
        Self::builder_with_retriever(chat, Retriever::new(DocumentFetcher::new(), embedder))
    }

    /// Starts a builder with a fully configured [`Retriever`].
    pub fn builder_with_retriever(
        chat: Arc<dyn ChatProvider>,
        retriever: Retriever,
    ) -> AgentPipelineBuilder {
        AgentPipelineBuilder {
            chat,
            retriever,
            store: None,
            resolver: None,
        }
    }

    /// The retrieval machinery, exposed for cache inspection.
    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answers one question for a session, running all four stages.
    ///
    /// # Errors
    ///
    /// Propagates the first fatal error from the retrieval or generation
    /// stages (including a session without a document); the earlier stages
    /// degrade instead of failing.
    pub async fn answer(&self, session_id: &str, question: &str) -> Result<PipelineOutcome, QaError> {
        tracing::info!(session_id, question, "pipeline start");

        let understanding = understanding::understand(&self.chat, question).await;
        let relevant_history =
            history::relevant_history(&self.chat, &self.store, session_id, question).await?;
        let chunks = self
            .retriever
            .retrieve(
                &self.resolver,
                session_id,
                question,
                &understanding.understood_question,
            )
            .await?;
        let answer = generation::generate(
            &self.chat,
            question,
            &understanding.understood_question,
            &understanding.intent,
            &chunks,
            &relevant_history,
        )
        .await?;

        tracing::info!(
            session_id,
            intent = %understanding.intent,
            chunks = chunks.len(),
            history = relevant_history.len(),
            "pipeline complete"
        );
        Ok(PipelineOutcome {
            question: question.to_string(),
            understood_question: understanding.understood_question,
            intent: understanding.intent,
            relevant_history,
            chunks,
            answer,
        })
    }

    /// Answers a batch of questions for one session concurrently.
    ///
    /// The document index is built at most once even when every question
    /// races on a cold cache; the first fatal error from any question fails
    /// the whole batch.
    pub async fn answer_all(
        &self,
        session_id: &str,
        questions: &[String],
    ) -> Result<Vec<PipelineOutcome>, QaError> {
        future::try_join_all(
            questions
                .iter()
                .map(|question| self.answer(session_id, question)),
        )
        .await
    }
}
