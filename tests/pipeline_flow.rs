//! End-to-end pipeline runs against scripted providers and a real
//! temp-file document.

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use qasmith::{
    AgentPipeline, BatchedEmbedder, ChatProvider, ConversationTurn, DocumentRef,
    EmbeddingProvider, InMemorySessionStore, MockEmbeddingProvider, QaError,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("qasmith=debug")
        .with_test_writer()
        .try_init();
}

const DOCUMENT: &str = "\
The policy covers hospitalization expenses for all listed members of the insured family.\n\
\n\
Claims are settled within thirty days of receiving the complete set of supporting documents.\n\
\n\
Maternity benefits and infertility treatment carry a waiting period of twenty four months.\n";

/// Chat provider that routes on the prompt's stage banner and counts calls
/// per stage.
struct ScriptedChat {
    understanding_reply: String,
    history_reply: String,
    generation_reply: String,
    understanding_calls: AtomicUsize,
    history_calls: AtomicUsize,
    generation_calls: AtomicUsize,
}

impl ScriptedChat {
    fn new() -> Self {
        Self {
            understanding_reply: "UNDERSTOOD: What hospitalization costs does the policy cover?\n\
                                  INTENT: factual_query"
                .to_string(),
            history_reply: "REFERENCES_HISTORY: NO\nRELEVANT_CONTEXT: none".to_string(),
            generation_reply: "  The policy covers hospitalization for listed members.  ".to_string(),
            understanding_calls: AtomicUsize::new(0),
            history_calls: AtomicUsize::new(0),
            generation_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl ChatProvider for ScriptedChat {
    async fn complete(
        &self,
        prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, QaError> {
        if prompt.contains("Question Understanding Agent") {
            self.understanding_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.understanding_reply.clone())
        } else if prompt.contains("History Analysis Agent") {
            self.history_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.history_reply.clone())
        } else {
            self.generation_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.generation_reply.clone())
        }
    }

    fn model_name(&self) -> &str {
        "scripted-chat"
    }
}

/// Embedding provider that counts batch calls before delegating to the
/// deterministic mock.
struct CountingEmbedder {
    inner: MockEmbeddingProvider,
    calls: AtomicUsize,
}

impl CountingEmbedder {
    fn new() -> Self {
        Self {
            inner: MockEmbeddingProvider::new(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for CountingEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, QaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.embed_batch(texts).await
    }

    fn model_name(&self) -> &str {
        "counting-mock"
    }
}

fn temp_document() -> (tempfile::NamedTempFile, DocumentRef) {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "{DOCUMENT}").unwrap();
    let document = DocumentRef::LocalPath(file.path().to_path_buf());
    (file, document)
}

fn pipeline(
    chat: Arc<ScriptedChat>,
    store: Arc<InMemorySessionStore>,
) -> AgentPipeline {
    AgentPipeline::builder(
        chat,
        BatchedEmbedder::new(Arc::new(MockEmbeddingProvider::new())),
    )
    .store(store.clone())
    .resolver(store)
    .build()
    .unwrap()
}

#[tokio::test]
async fn answers_from_a_fresh_document() {
    init_tracing();
    let (_file, document) = temp_document();
    let store = Arc::new(InMemorySessionStore::new());
    store.bind_document("s1", document.clone());

    let chat = Arc::new(ScriptedChat::new());
    let pipeline = pipeline(chat.clone(), store);

    let outcome = pipeline.answer("s1", "What is covered?").await.unwrap();

    assert_eq!(
        outcome.understood_question,
        "What hospitalization costs does the policy cover?"
    );
    assert_eq!(outcome.intent, "factual_query");
    assert!(outcome.relevant_history.is_empty());
    assert_eq!(outcome.chunks.len(), 1, "short document packs into one chunk");
    // Generation output comes back trimmed, otherwise verbatim.
    assert_eq!(
        outcome.answer,
        "The policy covers hospitalization for listed members."
    );

    assert_eq!(chat.understanding_calls.load(Ordering::SeqCst), 1);
    assert_eq!(chat.generation_calls.load(Ordering::SeqCst), 1);
    // No stored turns, so the history stage never reached the provider.
    assert_eq!(chat.history_calls.load(Ordering::SeqCst), 0);
    assert!(pipeline.retriever().cache().contains(&document.cache_key()));
}

#[tokio::test]
async fn malformed_understanding_degrades_to_the_original_question() {
    let (_file, document) = temp_document();
    let store = Arc::new(InMemorySessionStore::new());
    store.bind_document("s1", document);

    let mut chat = ScriptedChat::new();
    chat.understanding_reply = "I prefer not to follow formats.".to_string();
    let pipeline = pipeline(Arc::new(chat), store);

    let outcome = pipeline.answer("s1", "What is covered?").await.unwrap();
    assert_eq!(outcome.understood_question, "What is covered?");
    assert_eq!(outcome.intent, "factual_query");
    assert!(!outcome.answer.is_empty());
}

#[tokio::test]
async fn relevant_history_is_carried_into_the_outcome() {
    let (_file, document) = temp_document();
    let store = Arc::new(InMemorySessionStore::new());
    store.bind_document("s1", document);
    store.push_turn("s1", ConversationTurn::user("what about IVF?"));
    store.push_turn(
        "s1",
        ConversationTurn::assistant("IVF has a 24 month waiting period."),
    );

    let mut chat = ScriptedChat::new();
    chat.history_reply =
        "REFERENCES_HISTORY: YES\nRELEVANT_CONTEXT: follow-up about IVF".to_string();
    let chat = Arc::new(chat);
    let pipeline = pipeline(chat.clone(), store);

    let outcome = pipeline.answer("s1", "And the waiting period?").await.unwrap();
    assert_eq!(outcome.relevant_history.len(), 2);
    assert_eq!(chat.history_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_document_fails_before_embedding_and_generation() {
    let store = Arc::new(InMemorySessionStore::new());
    let chat = Arc::new(ScriptedChat::new());
    let embedder = Arc::new(CountingEmbedder::new());
    let pipeline = AgentPipeline::builder(chat.clone(), BatchedEmbedder::new(embedder.clone()))
        .store(store.clone())
        .resolver(store)
        .build()
        .unwrap();

    let err = pipeline.answer("ghost", "What is covered?").await.unwrap_err();
    assert!(matches!(err, QaError::NoDocument { ref session_id } if session_id == "ghost"));
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(chat.generation_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn empty_document_fails_before_embedding_and_generation() {
    let file = tempfile::NamedTempFile::new().unwrap();
    let store = Arc::new(InMemorySessionStore::new());
    store.bind_document("s1", DocumentRef::LocalPath(file.path().to_path_buf()));

    let chat = Arc::new(ScriptedChat::new());
    let embedder = Arc::new(CountingEmbedder::new());
    let pipeline = AgentPipeline::builder(chat.clone(), BatchedEmbedder::new(embedder.clone()))
        .store(store.clone())
        .resolver(store)
        .build()
        .unwrap();

    let err = pipeline.answer("s1", "What is covered?").await.unwrap_err();
    assert!(matches!(err, QaError::EmptyDocument));
    // Chunking failed the build, so no embedding batch and no answer call
    // ever happened.
    assert_eq!(embedder.calls.load(Ordering::SeqCst), 0);
    assert_eq!(chat.generation_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn answer_all_answers_every_question_and_indexes_once() {
    let (_file, document) = temp_document();
    let store = Arc::new(InMemorySessionStore::new());
    store.bind_document("s1", document.clone());

    let chat = Arc::new(ScriptedChat::new());
    let pipeline = pipeline(chat.clone(), store);

    let questions: Vec<String> = (0..4)
        .map(|i| format!("Question number {i} about coverage?"))
        .collect();
    let outcomes = pipeline.answer_all("s1", &questions).await.unwrap();

    assert_eq!(outcomes.len(), 4);
    assert_eq!(outcomes[2].question, questions[2]);
    assert_eq!(chat.generation_calls.load(Ordering::SeqCst), 4);
    assert_eq!(pipeline.retriever().cache().len(), 1);
}
