//! Session memory: a process-wide map of bounded per-session message
//! windows with a summarization hook on overflow.
//!
//! Concurrency model: the map itself is sharded (`DashMap`); each session
//! carries its own async mutex, and a whole turn runs under that mutex so
//! same-session turns are strictly serialized. Idle entries are evicted
//! lazily on access.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use veda_core::{AgentName, Message, Question, SessionId};
use veda_llms::{ChatMessage, GenerateRequest, Provider};

use crate::error::{Result, RuntimeError};

#[derive(Debug, Default)]
pub struct SessionEntry {
    pub messages: VecDeque<Message>,
    pub summary: Option<String>,
    /// The question currently being graded, if any.
    pub open_question: Option<Question>,
    /// Wrong attempts against the open question; drives the hint stage.
    pub wrong_attempts: u32,
    pub last_agent: Option<AgentName>,
}

impl SessionEntry {
    pub fn clear(&mut self) {
        self.messages.clear();
        self.summary = None;
        self.open_question = None;
        self.wrong_attempts = 0;
        self.last_agent = None;
    }
}

pub struct SessionHandle {
    state: Arc<Mutex<SessionEntry>>,
    /// Milliseconds since the store's epoch; touched on every resolve.
    last_active_ms: AtomicU64,
}

pub struct SessionStore {
    sessions: DashMap<String, Arc<SessionHandle>>,
    epoch: Instant,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            epoch: Instant::now(),
            ttl,
        }
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Resolve or allocate a session, sweeping expired entries on the way.
    pub fn resolve(&self, session_id: Option<String>) -> (SessionId, Arc<SessionHandle>) {
        self.evict_idle();

        let id = match session_id {
            Some(raw) if !raw.trim().is_empty() => SessionId::from(raw),
            _ => SessionId::new(),
        };

        let handle = self
            .sessions
            .entry(id.as_str().to_string())
            .or_insert_with(|| {
                debug!(session = %id, "new session");
                Arc::new(SessionHandle {
                    state: Arc::new(Mutex::new(SessionEntry::default())),
                    last_active_ms: AtomicU64::new(0),
                })
            })
            .clone();
        handle.last_active_ms.store(self.now_ms(), Ordering::Relaxed);

        (id, handle)
    }

    /// Serialize same-session turns: take the session lock, waiting at most
    /// `wait` before rejecting the request as busy.
    pub async fn acquire(
        &self,
        handle: &Arc<SessionHandle>,
        wait: Duration,
    ) -> Result<OwnedMutexGuard<SessionEntry>> {
        tokio::time::timeout(wait, Arc::clone(&handle.state).lock_owned())
            .await
            .map_err(|_| RuntimeError::SessionBusy)
    }

    pub fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn evict_idle(&self) {
        let ttl_ms = self.ttl.as_millis() as u64;
        let now = self.now_ms();
        self.sessions
            .retain(|_, handle| now.saturating_sub(handle.last_active_ms.load(Ordering::Relaxed)) < ttl_ms);
    }
}

/// Fold overflow into the rolling summary: the newest `keep_verbatim`
/// messages stay intact, everything older is summarized in one LLM call.
/// Best-effort: on failure the old messages are still dropped and the
/// previous summary is kept.
pub async fn compact_overflow(
    entry: &mut SessionEntry,
    provider: &Arc<dyn Provider>,
    model: &str,
    window: usize,
    keep_verbatim: usize,
    summary_max_tokens: u32,
    llm_timeout: Duration,
) {
    if entry.messages.len() <= window {
        return;
    }

    let surplus_len = entry.messages.len() - keep_verbatim;
    let surplus: Vec<Message> = entry.messages.drain(..surplus_len).collect();

    let mut transcript = String::new();
    if let Some(existing) = &entry.summary {
        transcript.push_str("Earlier summary: ");
        transcript.push_str(existing);
        transcript.push('\n');
    }
    for message in &surplus {
        transcript.push_str(message.role.as_str());
        transcript.push_str(": ");
        transcript.push_str(&message.content);
        transcript.push('\n');
    }

    let request = GenerateRequest::new(
        model,
        vec![
            ChatMessage::system(
                "Summarize this tutoring conversation for future context: topics covered, \
                 questions attempted, what the student struggled with. Be dense and factual.",
            ),
            ChatMessage::user(transcript),
        ],
    )
    .with_temperature(0.2)
    .with_max_tokens(summary_max_tokens)
    .with_timeout(llm_timeout);

    match provider.generate(request).await {
        Ok(response) if !response.text.trim().is_empty() => {
            debug!(dropped = surplus.len(), "session memory compacted");
            entry.summary = Some(response.text.trim().to_string());
        }
        Ok(_) => {
            warn!(dropped = surplus.len(), "summarizer returned nothing, surplus dropped");
        }
        Err(e) => {
            warn!(dropped = surplus.len(), error = %e, "summarization failed, surplus dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use veda_llms::{GenerateResponse, GenerateStream, Result as LlmResult};

    struct FixedSummary(&'static str);

    #[async_trait]
    impl Provider for FixedSummary {
        fn provider_id(&self) -> &str {
            "fixed-summary"
        }

        async fn generate(&self, _request: GenerateRequest) -> LlmResult<GenerateResponse> {
            if self.0.is_empty() {
                return Err(veda_llms::Error::provider_error("down"));
            }
            Ok(GenerateResponse::text_only(self.0))
        }

        async fn stream(&self, _request: GenerateRequest) -> LlmResult<GenerateStream> {
            Ok(GenerateStream::new(Box::pin(futures::stream::empty())))
        }
    }

    #[tokio::test]
    async fn test_resolve_allocates_and_reuses() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (id, _handle) = store.resolve(None);
        assert_eq!(id.as_str().len(), 36);

        let (id2, _handle2) = store.resolve(Some("s1".to_string()));
        assert_eq!(id2.as_str(), "s1");
        assert_eq!(store.len(), 2);

        let (id3, _handle3) = store.resolve(Some("s1".to_string()));
        assert_eq!(id3.as_str(), "s1");
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_same_session_serializes() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (_, handle) = store.resolve(Some("s1".to_string()));

        let guard = store
            .acquire(&handle, Duration::from_millis(50))
            .await
            .unwrap();

        // a second acquire while the first guard is held times out
        let busy = store.acquire(&handle, Duration::from_millis(50)).await;
        assert!(matches!(busy, Err(RuntimeError::SessionBusy)));

        drop(guard);
        assert!(store
            .acquire(&handle, Duration::from_millis(50))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_different_sessions_do_not_block() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (_, h1) = store.resolve(Some("s1".to_string()));
        let (_, h2) = store.resolve(Some("s2".to_string()));

        let _g1 = store.acquire(&h1, Duration::from_millis(50)).await.unwrap();
        let g2 = store.acquire(&h2, Duration::from_millis(50)).await;
        assert!(g2.is_ok());
    }

    #[tokio::test]
    async fn test_idle_eviction() {
        let store = SessionStore::new(Duration::from_millis(10));
        store.resolve(Some("old".to_string()));
        tokio::time::sleep(Duration::from_millis(30)).await;

        // resolving anything sweeps expired entries
        store.resolve(Some("fresh".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_clears_session() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (_, handle) = store.resolve(Some("s1".to_string()));
        {
            let mut entry = store
                .acquire(&handle, Duration::from_millis(50))
                .await
                .unwrap();
            entry.messages.push_back(Message::user("hello"));
        }
        store.remove("s1");

        let (_, handle) = store.resolve(Some("s1".to_string()));
        let entry = store
            .acquire(&handle, Duration::from_millis(50))
            .await
            .unwrap();
        assert!(entry.messages.is_empty());
    }

    #[tokio::test]
    async fn test_compact_overflow_summarizes() {
        let provider: Arc<dyn Provider> =
            Arc::new(FixedSummary("Student practised APs and quadratics."));
        let mut entry = SessionEntry::default();
        for i in 0..12 {
            entry.messages.push_back(Message::user(format!("m{}", i)));
        }

        compact_overflow(&mut entry, &provider, "m", 10, 4, 400, Duration::from_secs(5)).await;

        assert_eq!(entry.messages.len(), 4);
        assert_eq!(entry.messages[0].content, "m8");
        assert_eq!(
            entry.summary.as_deref(),
            Some("Student practised APs and quadratics.")
        );
    }

    #[tokio::test]
    async fn test_compact_overflow_best_effort_on_failure() {
        let provider: Arc<dyn Provider> = Arc::new(FixedSummary(""));
        let mut entry = SessionEntry::default();
        entry.summary = Some("earlier".to_string());
        for i in 0..12 {
            entry.messages.push_back(Message::user(format!("m{}", i)));
        }

        compact_overflow(&mut entry, &provider, "m", 10, 4, 400, Duration::from_secs(5)).await;

        // surplus dropped, previous summary kept
        assert_eq!(entry.messages.len(), 4);
        assert_eq!(entry.summary.as_deref(), Some("earlier"));
    }

    #[tokio::test]
    async fn test_compact_noop_under_window() {
        let provider: Arc<dyn Provider> = Arc::new(FixedSummary("unused"));
        let mut entry = SessionEntry::default();
        entry.messages.push_back(Message::user("hello"));

        compact_overflow(&mut entry, &provider, "m", 10, 4, 400, Duration::from_secs(5)).await;
        assert_eq!(entry.messages.len(), 1);
        assert!(entry.summary.is_none());
    }

    #[test]
    fn test_entry_clear() {
        let mut entry = SessionEntry::default();
        entry.messages.push_back(Message::user("x"));
        entry.summary = Some("s".to_string());
        entry.wrong_attempts = 2;
        entry.clear();
        assert!(entry.messages.is_empty());
        assert!(entry.summary.is_none());
        assert_eq!(entry.wrong_attempts, 0);
    }
}
