//! End-to-end turn scenarios against an in-process runner with a scripted
//! stub provider. No network, no real LLM.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use veda_core::{AgentName, ChatEvent, MessageSink, QuestionSource, SqliteSink};
use veda_engine::{GenerativeEngine, HybridOrchestrator, PatternCatalog, PatternEngine};
use veda_llms::{
    ChatMessage, FinishReason, GenerateRequest, GenerateResponse, GenerateStream, Provider,
    Result as LlmResult, Role, StreamEvent, ToolCall, Usage,
};
use veda_runtime::{RuntimeConfig, TurnRequest, TurnRunner};
use veda_toolbus::ToolBus;

/// A deterministic tutor double: routes to teach, asks for one pattern
/// question when it has the generate_question tool, explains otherwise.
#[derive(Default)]
struct TutorStub {
    delay: Option<Duration>,
}

impl TutorStub {
    fn slow(delay: Duration) -> Self {
        Self { delay: Some(delay) }
    }

    fn respond(&self, request: &GenerateRequest) -> GenerateResponse {
        let system = request
            .messages
            .first()
            .map(|m| m.content.as_str())
            .unwrap_or("");

        if system.contains("route a student's message") {
            return GenerateResponse::text_only(
                r#"{"target": "teach", "reason": "general query", "confidence": 0.9}"#,
            );
        }

        if system.contains("Summarize this tutoring conversation") {
            return GenerateResponse::text_only("Covered APs and quadratics so far.");
        }

        let has_tool_round = request.messages.iter().any(|m| m.role == Role::Tool);
        let can_generate = request.tools.iter().any(|t| t.name == "generate_question");
        if can_generate && !has_tool_round {
            return GenerateResponse {
                text: String::new(),
                tool_calls: vec![ToolCall::new(
                    "call_1",
                    "generate_question",
                    serde_json::json!({
                        "concept": "quadratic_nature_of_roots",
                        "marks": 2,
                        "difficulty": 0.4,
                        "force_source": "pattern"
                    }),
                )],
                usage: Usage::default(),
                finish: FinishReason::ToolCalls,
            };
        }
        if has_tool_round {
            return GenerateResponse::text_only("Here's your question — give it a try!");
        }

        GenerateResponse::text_only("Let me explain that step by step.")
    }
}

#[async_trait]
impl Provider for TutorStub {
    fn provider_id(&self) -> &str {
        "tutor-stub"
    }

    async fn generate(&self, request: GenerateRequest) -> LlmResult<GenerateResponse> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.respond(&request))
    }

    async fn stream(&self, request: GenerateRequest) -> LlmResult<GenerateStream> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response = self.respond(&request);
        let mut events = vec![Ok(StreamEvent::start("stub-1"))];
        if response.tool_calls.is_empty() {
            // two chunks so concatenation is actually exercised
            let text = response.text;
            let mid = text.len() / 2;
            let mid = (0..=mid).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
            events.push(Ok(StreamEvent::text_delta(text[..mid].to_string())));
            events.push(Ok(StreamEvent::text_delta(text[mid..].to_string())));
        } else {
            for call in response.tool_calls {
                events.push(Ok(StreamEvent::tool_call_end(
                    call.id,
                    call.name,
                    call.arguments,
                )));
            }
        }
        events.push(Ok(StreamEvent::finish(Usage::default(), FinishReason::Stop)));
        Ok(GenerateStream::new(Box::pin(futures::stream::iter(events))))
    }
}

fn build_runner(provider: Arc<dyn Provider>, config: RuntimeConfig) -> Arc<TurnRunner> {
    let catalog = Arc::new(PatternCatalog::builtin().unwrap());
    let pattern = Arc::new(PatternEngine::with_seed(Arc::clone(&catalog), 17));
    let generative = Arc::new(
        GenerativeEngine::new(Arc::clone(&provider), "stub").with_fallback(Arc::clone(&pattern)),
    );
    let orchestrator = Arc::new(HybridOrchestrator::new(pattern, generative).with_seed(9));
    let toolbus = Arc::new(ToolBus::new(orchestrator, Arc::clone(&provider), "stub"));
    Arc::new(TurnRunner::new(provider, toolbus, config))
}

fn runner() -> Arc<TurnRunner> {
    build_runner(Arc::new(TutorStub::default()), RuntimeConfig::new())
}

async fn session_message_count(runner: &TurnRunner, session: &str) -> usize {
    let (_, handle) = runner.store().resolve(Some(session.to_string()));
    let entry = runner
        .store()
        .acquire(&handle, Duration::from_millis(100))
        .await
        .unwrap();
    entry.messages.len()
}

#[tokio::test]
async fn scenario_1_first_hello() {
    let runner = runner();
    let outcome = runner
        .run_turn(TurnRequest::new("hello").with_session("s1"))
        .await
        .unwrap();

    assert_eq!(outcome.agent, AgentName::Teach);
    assert!(outcome.reply.text.len() < 300);
    assert!(!outcome.reply.terminal);
    assert_eq!(session_message_count(&runner, "s1").await, 2);
}

#[tokio::test]
async fn scenario_2_thank_you_never_terminates() {
    let runner = runner();
    runner
        .run_turn(TurnRequest::new("hello").with_session("s2"))
        .await
        .unwrap();

    let outcome = runner
        .run_turn(TurnRequest::new("thank you").with_session("s2"))
        .await
        .unwrap();

    assert_eq!(outcome.agent, AgentName::Teach);
    assert!(!outcome.reply.terminal);
    // 2 prior + user + assistant
    assert_eq!(session_message_count(&runner, "s2").await, 4);
}

#[tokio::test]
async fn scenario_3_slash_test_delivers_question() {
    let runner = runner();
    let outcome = runner
        .run_turn(TurnRequest::new("/test").with_session("s3"))
        .await
        .unwrap();

    assert_eq!(outcome.agent, AgentName::Practice);
    let question = outcome.reply.question.expect("practice turn carries a question");
    assert!(matches!(
        question.source,
        QuestionSource::Pattern | QuestionSource::Ai
    ));
    assert!(!question.final_answer.is_empty());
}

#[tokio::test]
async fn scenario_4_follow_up_example_stays_on_topic() {
    let runner = runner();
    let first = runner
        .run_turn(TurnRequest::new("explain quadratic equations").with_session("s4"))
        .await
        .unwrap();
    assert_eq!(first.agent, AgentName::Teach);

    let second = runner
        .run_turn(TurnRequest::new("can you show me an example").with_session("s4"))
        .await
        .unwrap();
    assert_eq!(second.agent, AgentName::Teach);
    assert!(
        second.reply.text.contains("x²") || second.reply.text.contains("x^2"),
        "worked example must mention a quadratic: {}",
        second.reply.text
    );
}

#[tokio::test]
async fn scenario_6_bye_closes_and_resets() {
    let runner = runner();
    runner
        .run_turn(TurnRequest::new("hello").with_session("s5"))
        .await
        .unwrap();

    let outcome = runner
        .run_turn(TurnRequest::new("bye").with_session("s5"))
        .await
        .unwrap();

    assert_eq!(outcome.agent, AgentName::Teach);
    assert!(outcome.reply.terminal);
    assert!(outcome.reply.text.len() < 300);
    assert!(outcome.reply.text.to_lowercase().contains("progress is saved"));

    // the next turn starts a fresh conversation
    assert_eq!(session_message_count(&runner, "s5").await, 0);
}

#[tokio::test]
async fn grading_flow_wrong_then_right() {
    let runner = runner();
    let outcome = runner
        .run_turn(TurnRequest::new("/test").with_session("g1"))
        .await
        .unwrap();
    let question = outcome.reply.question.unwrap();

    // a wrong numeric attempt earns the first hint
    let wrong = runner
        .run_turn(TurnRequest::new("-999999").with_session("g1"))
        .await
        .unwrap();
    assert_eq!(wrong.reply.metadata["grade"], "incorrect");
    assert!(wrong.reply.text.contains("hint"));

    // the recorded answer itself grades correct
    let right = runner
        .run_turn(TurnRequest::new(question.final_answer.clone()).with_session("g1"))
        .await
        .unwrap();
    assert_eq!(right.reply.metadata["grade"], "correct");
}

#[tokio::test]
async fn memory_stays_bounded_and_summarizes() {
    let mut config = RuntimeConfig::new()
        .with_memory_window(6)
        .with_session_wait(Duration::from_secs(1));
    config.keep_verbatim = 2;
    let runner = build_runner(Arc::new(TutorStub::default()), config);

    for i in 0..8 {
        runner
            .run_turn(TurnRequest::new(format!("tell me fact number {}", i)).with_session("m1"))
            .await
            .unwrap();
    }

    let (_, handle) = runner.store().resolve(Some("m1".to_string()));
    let entry = runner
        .store()
        .acquire(&handle, Duration::from_millis(100))
        .await
        .unwrap();
    assert!(entry.messages.len() <= 6, "window exceeded: {}", entry.messages.len());
    assert_eq!(
        entry.summary.as_deref(),
        Some("Covered APs and quadratics so far.")
    );
}

#[tokio::test]
async fn busy_session_is_rejected() {
    let runner = build_runner(
        Arc::new(TutorStub::default()),
        RuntimeConfig::new().with_session_wait(Duration::from_millis(50)),
    );

    let (_, handle) = runner.store().resolve(Some("b1".to_string()));
    let _guard = runner
        .store()
        .acquire(&handle, Duration::from_millis(100))
        .await
        .unwrap();

    let err = runner
        .run_turn(TurnRequest::new("hello").with_session("b1"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "SessionBusy");
}

#[tokio::test]
async fn deadline_breach_returns_fallback_and_persists_nothing() {
    let runner = build_runner(
        Arc::new(TutorStub::slow(Duration::from_millis(300))),
        RuntimeConfig::new().with_turn_deadline(Duration::from_millis(50)),
    );

    let outcome = runner
        .run_turn(TurnRequest::new("give me a question").with_session("t1"))
        .await
        .unwrap();
    assert!(outcome.reply.text.contains("trouble thinking"));
    assert_eq!(outcome.reply.metadata["error_kind"], "Timeout");
    assert_eq!(session_message_count(&runner, "t1").await, 0);
}

#[tokio::test]
async fn empty_message_rejected() {
    let runner = runner();
    let err = runner
        .run_turn(TurnRequest::new("   "))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "InputInvalid");
}

#[tokio::test]
async fn unknown_force_agent_is_ignored() {
    let runner = runner();
    let outcome = runner
        .run_turn(
            TurnRequest::new("i want to practice")
                .with_session("f1")
                .with_force_agent("wizard"),
        )
        .await
        .unwrap();
    // normal routing applies: "practice" is a rule word
    assert_eq!(outcome.agent, AgentName::Practice);
}

#[tokio::test]
async fn known_force_agent_overrides_routing() {
    let runner = runner();
    let outcome = runner
        .run_turn(
            TurnRequest::new("i want to practice")
                .with_session("f2")
                .with_force_agent("wellbeing"),
        )
        .await
        .unwrap();
    assert_eq!(outcome.agent, AgentName::Wellbeing);
}

#[tokio::test]
async fn stream_tokens_concatenate_to_persisted_message() {
    let runner = runner();
    let mut rx = runner.stream_turn(
        TurnRequest::new("walk me through circle theorems").with_session("st1"),
        CancellationToken::new(),
    );

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert!(matches!(events.first(), Some(ChatEvent::Meta { .. })));
    assert!(matches!(events.last(), Some(ChatEvent::Done)));

    let concatenated: String = events
        .iter()
        .filter_map(|e| match e {
            ChatEvent::Token { text } => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert!(!concatenated.is_empty());

    let (_, handle) = runner.store().resolve(Some("st1".to_string()));
    let entry = runner
        .store()
        .acquire(&handle, Duration::from_millis(100))
        .await
        .unwrap();
    let persisted = &entry.messages.back().unwrap().content;
    assert_eq!(&concatenated, persisted);
}

#[tokio::test]
async fn stream_greeting_is_deterministic() {
    let runner = runner();
    let mut rx = runner.stream_turn(
        TurnRequest::new("hello").with_session("st2"),
        CancellationToken::new(),
    );

    let mut token_count = 0;
    let mut saw_done = false;
    while let Some(event) = rx.recv().await {
        match event {
            ChatEvent::Token { .. } => token_count += 1,
            ChatEvent::Done => saw_done = true,
            _ => {}
        }
    }
    assert_eq!(token_count, 1);
    assert!(saw_done);
    assert_eq!(session_message_count(&runner, "st2").await, 2);
}

#[tokio::test]
async fn cancelled_stream_persists_nothing() {
    let runner = build_runner(
        Arc::new(TutorStub::slow(Duration::from_millis(100))),
        RuntimeConfig::new(),
    );
    let cancel = CancellationToken::new();
    let mut rx = runner.stream_turn(
        TurnRequest::new("explain something long").with_session("c1"),
        cancel.clone(),
    );

    // let the meta event through, then disconnect
    let first = rx.recv().await.unwrap();
    assert!(matches!(first, ChatEvent::Meta { .. }));
    cancel.cancel();

    // drain whatever remains; no Done should follow the cancellation
    let mut saw_done = false;
    while let Some(event) = rx.recv().await {
        if matches!(event, ChatEvent::Done) {
            saw_done = true;
        }
    }
    assert!(!saw_done);
    assert_eq!(session_message_count(&runner, "c1").await, 0);
}

#[tokio::test]
async fn sink_receives_appended_messages() {
    let dir = tempfile::tempdir().unwrap();
    let sink = Arc::new(SqliteSink::open(&dir.path().join("veda.db")).unwrap());

    let provider: Arc<dyn Provider> = Arc::new(TutorStub::default());
    let catalog = Arc::new(PatternCatalog::builtin().unwrap());
    let pattern = Arc::new(PatternEngine::with_seed(Arc::clone(&catalog), 17));
    let generative = Arc::new(
        GenerativeEngine::new(Arc::clone(&provider), "stub").with_fallback(Arc::clone(&pattern)),
    );
    let orchestrator = Arc::new(HybridOrchestrator::new(pattern, generative).with_seed(9));
    let toolbus = Arc::new(ToolBus::new(orchestrator, Arc::clone(&provider), "stub"));
    let runner = Arc::new(
        TurnRunner::new(provider, toolbus, RuntimeConfig::new())
            .with_sink(Arc::clone(&sink) as Arc<dyn MessageSink>),
    );

    runner
        .run_turn(TurnRequest::new("hello").with_session("sink1"))
        .await
        .unwrap();

    assert_eq!(sink.count("sink1").unwrap(), 2);
}
