//! Provider selection and fallback paths of the summarizer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use qasmith::{
    ChatProvider, ConversationStore, ConversationTurn, InMemorySessionStore, QaError, Summarizer,
    SummarizerConfig, SummaryPath,
};

const GOOD_REPLY: &str = "SUMMARY:\nThe session covered policy coverage.\n\n\
                          KEY POINTS:\n- Hospitalization is covered\n- Claims settle in 30 days";

/// Provider that optionally sleeps or fails before answering, counting
/// every call.
struct StubChat {
    name: &'static str,
    delay: Option<Duration>,
    fail: bool,
    calls: AtomicUsize,
}

impl StubChat {
    fn answering(name: &'static str) -> Self {
        Self {
            name,
            delay: None,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    fn slow(name: &'static str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::answering(name)
        }
    }

    fn failing(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::answering(name)
        }
    }
}

#[async_trait]
impl ChatProvider for StubChat {
    async fn complete(
        &self,
        _prompt: &str,
        _temperature: f32,
        _max_tokens: u32,
    ) -> Result<String, QaError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail {
            return Err(QaError::LlmProvider {
                provider: self.name.to_string(),
                message: "model unavailable".to_string(),
            });
        }
        Ok(GOOD_REPLY.to_string())
    }

    fn model_name(&self) -> &str {
        self.name
    }
}

fn store_with_turns() -> Arc<dyn ConversationStore> {
    let store = InMemorySessionStore::new();
    store.push_turn("s1", ConversationTurn::user("What is covered?"));
    store.push_turn("s1", ConversationTurn::assistant("Hospitalization is covered."));
    Arc::new(store)
}

#[tokio::test]
async fn primary_answers_within_its_timeout() {
    let primary = Arc::new(StubChat::answering("local-model"));
    let secondary = Arc::new(StubChat::answering("cloud-model"));
    let summarizer = Summarizer::new(primary.clone(), secondary.clone());

    let outcome = summarizer.summarize(&store_with_turns(), "s1", true).await.unwrap();

    assert_eq!(outcome.path, SummaryPath::Primary);
    assert_eq!(outcome.model, "local-model");
    assert_eq!(outcome.summary, "The session covered policy coverage.");
    assert_eq!(
        outcome.key_points,
        vec!["Hospitalization is covered", "Claims settle in 30 days"]
    );
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn slow_primary_falls_back_to_secondary() {
    let primary = Arc::new(StubChat::slow("local-model", Duration::from_secs(5)));
    let secondary = Arc::new(StubChat::answering("cloud-model"));
    let summarizer = Summarizer::new(primary.clone(), secondary.clone()).with_config(
        SummarizerConfig {
            primary_enabled: true,
            primary_timeout: Duration::from_millis(30),
        },
    );

    let outcome = summarizer.summarize(&store_with_turns(), "s1", true).await.unwrap();

    assert!(matches!(outcome.path, SummaryPath::Fallback { .. }));
    assert_eq!(outcome.model, "cloud-model");
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn failing_primary_falls_back_with_the_reason() {
    let primary = Arc::new(StubChat::failing("local-model"));
    let secondary = Arc::new(StubChat::answering("cloud-model"));
    let summarizer = Summarizer::new(primary, secondary);

    let outcome = summarizer.summarize(&store_with_turns(), "s1", true).await.unwrap();

    match outcome.path {
        SummaryPath::Fallback { reason } => assert!(reason.contains("model unavailable")),
        other => panic!("expected fallback, got {other:?}"),
    }
    assert_eq!(outcome.model, "cloud-model");
}

#[tokio::test]
async fn disabled_primary_goes_straight_to_secondary() {
    let primary = Arc::new(StubChat::answering("local-model"));
    let secondary = Arc::new(StubChat::answering("cloud-model"));
    let summarizer = Summarizer::new(primary.clone(), secondary.clone()).with_config(
        SummarizerConfig {
            primary_enabled: false,
            primary_timeout: Duration::from_secs(30),
        },
    );

    let outcome = summarizer.summarize(&store_with_turns(), "s1", true).await.unwrap();

    assert_eq!(outcome.path, SummaryPath::Secondary);
    assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn caller_can_decline_the_primary() {
    let primary = Arc::new(StubChat::answering("local-model"));
    let secondary = Arc::new(StubChat::answering("cloud-model"));
    let summarizer = Summarizer::new(primary.clone(), secondary.clone());

    let outcome = summarizer
        .summarize(&store_with_turns(), "s1", false)
        .await
        .unwrap();

    assert_eq!(outcome.path, SummaryPath::Secondary);
    assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn empty_session_calls_no_provider() {
    let primary = Arc::new(StubChat::answering("local-model"));
    let secondary = Arc::new(StubChat::answering("cloud-model"));
    let summarizer = Summarizer::new(primary.clone(), secondary.clone());

    let store: Arc<dyn ConversationStore> = Arc::new(InMemorySessionStore::new());
    let outcome = summarizer.summarize(&store, "nobody", true).await.unwrap();

    assert_eq!(outcome.path, SummaryPath::None);
    assert_eq!(outcome.summary, "No conversation found for this session.");
    assert!(outcome.key_points.is_empty());
    assert_eq!(outcome.model, "none");
    assert_eq!(primary.calls.load(Ordering::SeqCst), 0);
    assert_eq!(secondary.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn both_providers_failing_surfaces_the_secondary_error() {
    let primary = Arc::new(StubChat::failing("local-model"));
    let secondary = Arc::new(StubChat::failing("cloud-model"));
    let summarizer = Summarizer::new(primary, secondary);

    let err = summarizer.summarize(&store_with_turns(), "s1", true).await.unwrap_err();
    assert!(matches!(err, QaError::LlmProvider { ref provider, .. } if provider == "cloud-model"));
}
