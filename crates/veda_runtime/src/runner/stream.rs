//! The streaming turn path. Events flow over an mpsc channel the HTTP
//! layer adapts to server-sent-event framing.
//!
//! Contract: `Meta` first, then zero or more `Token`s, then `Done`; errors
//! emit `Error` followed by `Done`. The concatenation of all `Token`
//! payloads equals the assistant message persisted to memory. A cancelled
//! turn persists nothing; already-emitted tokens are not retracted.

use std::sync::Arc;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use veda_constant::app::MAX_TOOL_CALLS_PER_TURN;
use veda_core::{AgentName, AgentReply, ChatEvent, Question, RouteTarget, TurnState};
use veda_llms::{ChatMessage, GenerateRequest, StreamEvent, ToolCall};

use crate::error::RuntimeError;
use crate::memory::SessionEntry;

use super::{TurnRequest, TurnRunner};

const STREAM_ERROR_REPLY: &str =
    "I'm having a little trouble thinking straight right now. Please try again in a moment.";

impl TurnRunner {
    /// Streaming entry point. Returns immediately; events arrive on the
    /// receiver as the turn progresses.
    pub fn stream_turn(
        self: &Arc<Self>,
        request: TurnRequest,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<ChatEvent> {
        let (tx, rx) = mpsc::channel(64);
        let runner = Arc::clone(self);

        tokio::spawn(async move {
            runner.stream_turn_inner(request, cancel, tx).await;
        });

        rx
    }

    async fn stream_turn_inner(
        &self,
        request: TurnRequest,
        cancel: CancellationToken,
        tx: mpsc::Sender<ChatEvent>,
    ) {
        if request.message.trim().is_empty() {
            let _ = tx.send(ChatEvent::error("message is empty")).await;
            let _ = tx.send(ChatEvent::done()).await;
            return;
        }

        let (session_id, handle) = self.store.resolve(request.session_id.clone());
        let mut entry = match self.store.acquire(&handle, self.config.session_wait).await {
            Ok(entry) => entry,
            Err(_) => {
                let _ = tx
                    .send(ChatEvent::error("this session is busy with another turn"))
                    .await;
                let _ = tx.send(ChatEvent::done()).await;
                return;
            }
        };

        let state = self.build_state(&session_id, &entry, &request);
        let route = self.supervisor.route(&state).await;
        let agent = match route.target {
            RouteTarget::Agent(agent) => agent,
            RouteTarget::Finish => AgentName::Teach,
        };

        let persona = self.persona_of(agent);
        let _ = tx
            .send(ChatEvent::meta(
                session_id.as_str(),
                persona.name,
                persona.label,
                persona.emoji,
                persona.color,
            ))
            .await;

        let streamed = tokio::time::timeout(
            self.config.turn_deadline,
            self.stream_reply(&state, &route, agent, &mut entry, &cancel, &tx),
        )
        .await;

        match streamed {
            Ok(Ok(Some(reply))) => {
                if reply.terminal {
                    drop(entry);
                    self.store.remove(session_id.as_str());
                } else {
                    self.persist_exchange(&session_id, &mut entry, &state, &reply, agent)
                        .await;
                }
                info!(
                    session = %session_id,
                    agent = agent.as_str(),
                    route.source = ?route.source,
                    terminal = reply.terminal,
                    "streamed turn completed"
                );
                let _ = tx.send(ChatEvent::done()).await;
            }
            Ok(Ok(None)) => {
                // cancelled mid-stream: partial output is discarded, the
                // client is gone, nothing is persisted
                info!(session = %session_id, "streamed turn cancelled");
            }
            Ok(Err(e)) => {
                warn!(session = %session_id, kind = e.kind(), error = %e, "streamed turn failed");
                let _ = tx.send(ChatEvent::error(STREAM_ERROR_REPLY)).await;
                let _ = tx.send(ChatEvent::done()).await;
            }
            Err(_) => {
                info!(session = %session_id, "streamed turn deadline exceeded");
                let _ = tx
                    .send(ChatEvent::error(veda_constant::app::DEADLINE_FALLBACK_REPLY))
                    .await;
                let _ = tx.send(ChatEvent::done()).await;
            }
        }
    }

    /// Produce the reply, emitting tokens as they arrive. `Ok(None)` means
    /// the client cancelled.
    async fn stream_reply(
        &self,
        state: &TurnState,
        route: &veda_core::RouteDecision,
        agent: AgentName,
        entry: &mut SessionEntry,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<ChatEvent>,
    ) -> Result<Option<AgentReply>, RuntimeError> {
        // deterministic branches produce the whole text at once; it is sent
        // as a single token so concatenation still matches what persists
        let deterministic = match route.target {
            RouteTarget::Finish => Some(self.execute(state, route, entry).await?),
            RouteTarget::Agent(_) => {
                if let Some(reply) = veda_agents::fixed_reply(state) {
                    Some(reply)
                } else if entry.open_question.is_some()
                    && super::turn::looks_like_attempt(state.user_text())
                {
                    // reuse the unary path's grading logic
                    let reply = self.execute(state, route, entry).await?;
                    Some(reply)
                } else {
                    None
                }
            }
        };

        if let Some(reply) = deterministic {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            let _ = tx.send(ChatEvent::token(reply.text.clone())).await;
            return Ok(Some(reply));
        }

        self.stream_agent_loop(state, agent, entry, cancel, tx).await
    }

    /// Token-streaming variant of the agent loop. Text deltas are forwarded
    /// as they arrive; tool calls collected from the stream are executed
    /// between rounds.
    async fn stream_agent_loop(
        &self,
        state: &TurnState,
        agent: AgentName,
        entry: &mut SessionEntry,
        cancel: &CancellationToken,
        tx: &mpsc::Sender<ChatEvent>,
    ) -> Result<Option<AgentReply>, RuntimeError> {
        let config = self.agents.get(&agent).cloned().ok_or_else(|| {
            RuntimeError::InputInvalid(format!("no such agent: {}", agent))
        })?;

        let tools = self.allowed_tool_specs(&config);
        let mut messages = super::tools::build_conversation(&config, state);

        let mut full_text = String::new();
        let mut calls_executed = 0usize;
        let mut captured_question: Option<Question> = None;

        loop {
            let request = GenerateRequest::new(self.config.model.as_str(), messages.clone())
                .with_tools(tools.clone())
                .with_temperature(config.temperature)
                .with_max_tokens(config.token_budget)
                .with_timeout(self.config.llm_timeout);

            let mut stream = self
                .provider
                .stream(request)
                .await
                .map_err(|e| RuntimeError::ProviderUnavailable(e.to_string()))?;

            let mut round_text = String::new();
            let mut round_calls: Vec<ToolCall> = Vec::new();

            loop {
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(None),
                    event = stream.next() => event,
                };
                let Some(event) = event else { break };

                match event.map_err(|e| RuntimeError::ProviderUnavailable(e.to_string()))? {
                    StreamEvent::TextDelta { delta } => {
                        round_text.push_str(&delta);
                        full_text.push_str(&delta);
                        let _ = tx.send(ChatEvent::token(delta)).await;
                    }
                    StreamEvent::ToolCallEnd {
                        id,
                        name,
                        arguments,
                    } => {
                        round_calls.push(ToolCall::new(id, name, arguments));
                    }
                    StreamEvent::Error { message } => {
                        return Err(RuntimeError::ProviderUnavailable(message));
                    }
                    // Start / deltas / finish need no handling here
                    _ => {}
                }
            }

            if round_calls.is_empty() {
                let mut reply = AgentReply::text(full_text);
                if let Some(question) = captured_question {
                    reply = reply.with_question(question);
                }
                return Ok(Some(reply));
            }

            if calls_executed + round_calls.len() > MAX_TOOL_CALLS_PER_TURN {
                warn!(agent = agent.as_str(), calls_executed, "tool loop exceeded while streaming");
                let mut reply = AgentReply::text(full_text)
                    .with_meta("error_kind", serde_json::json!("ToolLoopExceeded"));
                if let Some(question) = captured_question {
                    reply = reply.with_question(question);
                }
                return Ok(Some(reply));
            }

            messages
                .push(ChatMessage::assistant(round_text).with_tool_calls(round_calls.clone()));
            for call in &round_calls {
                calls_executed += 1;
                let result_text = self
                    .dispatch_tool(&config, call, &mut captured_question, entry)
                    .await;
                messages.push(ChatMessage::tool_result(call.id.clone(), result_text));
            }
        }
    }
}
