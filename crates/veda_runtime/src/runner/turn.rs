//! The unary turn path and the deterministic reply branches.

use std::time::Instant;

use tracing::{info, warn};

use veda_agents::{fixed_reply, grade_with_hint};
use veda_constant::app;
use veda_core::{
    AgentName, AgentReply, Message, RouteDecision, RouteTarget, SessionId, TurnState,
};

use crate::error::{Result, RuntimeError};
use crate::memory::{compact_overflow, SessionEntry};

use super::{TurnOutcome, TurnRequest, TurnRunner};

/// Request body size bound, in bytes.
const MAX_MESSAGE_BYTES: usize = 8 * 1024;

const CLOSING_REPLY: &str =
    "Great session! Your progress is saved — come back any time and we'll pick up right \
     where you left off. 👋";

const PROVIDER_DOWN_REPLY: &str =
    "I'm having a little trouble thinking straight right now. Give me a moment and ask \
     again — your progress is safe.";

/// Words that mark a message as something other than an answer attempt.
const NOT_AN_ATTEMPT_WORDS: &[&str] = &[
    "question", "practice", "another", "next", "new", "more", "hint", "skip", "explain",
    "help", "why", "how", "thank", "thanks",
];

impl TurnRunner {
    /// Run one unary turn: validate, serialize on the session, route,
    /// execute, persist.
    pub async fn run_turn(&self, request: TurnRequest) -> Result<TurnOutcome> {
        self.validate(&request)?;

        let (session_id, handle) = self.store.resolve(request.session_id.clone());
        let mut entry = self.store.acquire(&handle, self.config.session_wait).await?;

        let span = veda_observability::turn_span!(session_id.as_str());
        let _guard = span.enter();

        let turn_start = Instant::now();
        let state = self.build_state(&session_id, &entry, &request);

        let route_start = Instant::now();
        let route = self.supervisor.route(&state).await;
        let route_ms = route_start.elapsed().as_millis() as u64;
        span.record("route.target", route.target.as_str());
        span.record("route.source", format!("{:?}", route.source).as_str());
        span.record("route.confidence", route.confidence);

        let agent = match route.target {
            RouteTarget::Agent(agent) => agent,
            RouteTarget::Finish => AgentName::Teach,
        };

        let executed = tokio::time::timeout(
            self.config.turn_deadline,
            self.execute(&state, &route, &mut entry),
        )
        .await;

        let reply = match executed {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                // provider failures degrade to a reassurance reply; anything
                // else propagates to the HTTP layer
                span.record("error.kind", e.kind());
                veda_observability::record_error(&e);
                warn!(session = %session_id, kind = e.kind(), error = %e, "turn failed");
                match e {
                    RuntimeError::ProviderUnavailable(_) => {
                        AgentReply::text(PROVIDER_DOWN_REPLY)
                            .with_meta("error_kind", serde_json::json!(e.kind()))
                    }
                    other => return Err(other),
                }
            }
            Err(_) => {
                // soft deadline breached: fallback reply, nothing persisted
                info!(
                    session = %session_id,
                    elapsed_ms = turn_start.elapsed().as_millis() as u64,
                    "turn deadline exceeded"
                );
                return Ok(TurnOutcome {
                    session_id,
                    reply: AgentReply::text(app::DEADLINE_FALLBACK_REPLY)
                        .with_meta("error_kind", serde_json::json!("Timeout")),
                    agent,
                    route,
                });
            }
        };

        if reply.terminal {
            // closure: the session starts fresh next time
            drop(entry);
            self.store.remove(session_id.as_str());
        } else {
            self.persist_exchange(&session_id, &mut entry, &state, &reply, agent)
                .await;
        }

        // one structured record per turn
        info!(
            session = %session_id,
            agent = agent.as_str(),
            route.source = ?route.source,
            route.confidence = route.confidence,
            route_ms,
            total_ms = turn_start.elapsed().as_millis() as u64,
            terminal = reply.terminal,
            error_kind = reply
                .metadata
                .get("error_kind")
                .and_then(|v| v.as_str())
                .unwrap_or(""),
            "turn completed"
        );

        Ok(TurnOutcome {
            session_id,
            reply,
            agent,
            route,
        })
    }

    fn validate(&self, request: &TurnRequest) -> Result<()> {
        if request.message.trim().is_empty() {
            return Err(RuntimeError::InputInvalid("message is empty".to_string()));
        }
        if request.message.len() > MAX_MESSAGE_BYTES {
            return Err(RuntimeError::InputInvalid(format!(
                "message exceeds {} bytes",
                MAX_MESSAGE_BYTES
            )));
        }
        Ok(())
    }

    pub(crate) fn build_state(
        &self,
        session_id: &SessionId,
        entry: &SessionEntry,
        request: &TurnRequest,
    ) -> TurnState {
        let history: Vec<Message> = entry.messages.iter().cloned().collect();
        let mut state = TurnState::new(
            session_id.clone(),
            history,
            Message::user(request.message.clone()),
        );
        if let Some(profile) = self.effective_profile(request) {
            state = state.with_profile(profile);
        }
        if let Some(summary) = &entry.summary {
            state = state.with_summary(summary.clone());
        }
        state
    }

    /// Everything between routing and persistence: finish short-circuit,
    /// fixed handlers, answer grading, then the agent loop.
    pub(crate) async fn execute(
        &self,
        state: &TurnState,
        route: &RouteDecision,
        entry: &mut SessionEntry,
    ) -> Result<AgentReply> {
        let agent = match route.target {
            RouteTarget::Finish => {
                return Ok(AgentReply::terminal(CLOSING_REPLY));
            }
            RouteTarget::Agent(agent) => agent,
        };

        if let Some(reply) = fixed_reply(state) {
            return Ok(reply);
        }

        // grading path: an open question plus something that reads like an
        // answer attempt is graded deterministically, no LLM involved. The
        // session state decides, not the routed agent: a bare "128" rarely
        // routes to practice on its own.
        if looks_like_attempt(state.user_text()) {
            if let Some(question) = entry.open_question.clone() {
                return Ok(self.grade_attempt(&question, state.user_text(), entry));
            }
        }

        self.agent_loop(state, agent, entry).await
    }

    fn grade_attempt(
        &self,
        question: &veda_core::Question,
        attempt: &str,
        entry: &mut SessionEntry,
    ) -> AgentReply {
        match grade_with_hint(question, attempt, entry.wrong_attempts) {
            Ok(()) => {
                entry.open_question = None;
                entry.wrong_attempts = 0;
                AgentReply::text(format!(
                    "Correct! {} is exactly right. 🎉 Want another one?",
                    question.final_answer
                ))
                .with_meta("grade", serde_json::json!("correct"))
            }
            Err(hint) => {
                entry.wrong_attempts += 1;
                let text = match hint {
                    Some(hint_text) => {
                        format!("Not quite — here's a hint: {}", hint_text)
                    }
                    None => "Not quite. Take another look and try once more.".to_string(),
                };
                AgentReply::text(text)
                    .with_meta("grade", serde_json::json!("incorrect"))
                    .with_meta(
                        "attempt",
                        serde_json::json!(entry.wrong_attempts),
                    )
            }
        }
    }

    pub(crate) async fn persist_exchange(
        &self,
        session_id: &SessionId,
        entry: &mut SessionEntry,
        state: &TurnState,
        reply: &AgentReply,
        agent: AgentName,
    ) {
        entry.messages.push_back(state.user_message.clone());
        let assistant =
            Message::assistant(reply.text.clone()).with_meta("agent", serde_json::json!(agent.as_str()));
        entry.messages.push_back(assistant.clone());
        entry.last_agent = Some(agent);

        compact_overflow(
            entry,
            &self.provider,
            &self.config.model,
            self.config.memory_window,
            self.config.keep_verbatim,
            self.config.summary_max_tokens,
            self.config.llm_timeout,
        )
        .await;

        // the sink is append-only and best-effort
        if let Err(e) = self
            .sink
            .append(session_id.as_str(), &state.user_message, None)
        {
            warn!(error = %e, "sink append failed for user message");
        }
        if let Err(e) = self
            .sink
            .append(session_id.as_str(), &assistant, Some(agent.as_str()))
        {
            warn!(error = %e, "sink append failed for assistant message");
        }
    }
}

/// Heuristic: short or numeric messages are answer attempts; messages that
/// ask for something new are not.
pub(crate) fn looks_like_attempt(text: &str) -> bool {
    let normalized = veda_agents::normalize(text);
    if normalized.is_empty() {
        return false;
    }
    let words: Vec<&str> = normalized.split(' ').collect();
    if words.iter().any(|w| NOT_AN_ATTEMPT_WORDS.contains(w)) {
        return false;
    }
    let has_digit = normalized.chars().any(|c| c.is_ascii_digit());
    has_digit || words.len() <= 4
}
