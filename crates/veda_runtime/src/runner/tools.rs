//! The agent LLM loop: build the conversation, let the model reply or call
//! tools, dispatch tools through the ToolBus, feed results back.

use tracing::{info, warn};

use veda_agents::AgentConfig;
use veda_constant::app::MAX_TOOL_CALLS_PER_TURN;
use veda_core::{AgentName, AgentReply, Question, Role as CoreRole, TurnState};
use veda_llms::{ChatMessage, GenerateRequest, ToolCall, ToolSpec};

use crate::error::{Result, RuntimeError};
use crate::memory::SessionEntry;

use super::TurnRunner;

const TOOL_LOOP_APOLOGY: &str =
    "Sorry — I got a little tangled up there. Could you ask that once more?";

impl TurnRunner {
    /// Drive the agent until it produces a final text reply, executing at
    /// most `MAX_TOOL_CALLS_PER_TURN` tool calls on the way.
    pub(crate) async fn agent_loop(
        &self,
        state: &TurnState,
        agent: AgentName,
        entry: &mut SessionEntry,
    ) -> Result<AgentReply> {
        let config = self.agents.get(&agent).cloned().ok_or_else(|| {
            RuntimeError::InputInvalid(format!("no such agent: {}", agent))
        })?;

        let tools = self.allowed_tool_specs(&config);
        let mut messages = build_conversation(&config, state);

        let mut calls_executed = 0usize;
        let mut captured_question: Option<Question> = None;
        let mut last_text = String::new();

        loop {
            let request = GenerateRequest::new(self.config.model.as_str(), messages.clone())
                .with_tools(tools.clone())
                .with_temperature(config.temperature)
                .with_max_tokens(config.token_budget)
                .with_timeout(self.config.llm_timeout);

            let response = self
                .provider
                .generate(request)
                .await
                .map_err(|e| RuntimeError::ProviderUnavailable(e.to_string()))?;

            if !response.text.is_empty() {
                last_text = response.text.clone();
            }

            if response.tool_calls.is_empty() {
                let mut reply = AgentReply::text(response.text);
                if let Some(question) = captured_question {
                    reply = reply.with_question(question);
                }
                return Ok(reply);
            }

            if calls_executed + response.tool_calls.len() > MAX_TOOL_CALLS_PER_TURN {
                warn!(
                    agent = agent.as_str(),
                    calls_executed,
                    requested = response.tool_calls.len(),
                    "tool loop exceeded"
                );
                let text = if last_text.is_empty() {
                    TOOL_LOOP_APOLOGY.to_string()
                } else {
                    format!("{}\n\n{}", last_text, TOOL_LOOP_APOLOGY)
                };
                let mut reply = AgentReply::text(text)
                    .with_meta("error_kind", serde_json::json!("ToolLoopExceeded"));
                if let Some(question) = captured_question {
                    reply = reply.with_question(question);
                }
                return Ok(reply);
            }

            // echo the assistant's tool request, then append each result
            messages.push(
                ChatMessage::assistant(response.text.clone())
                    .with_tool_calls(response.tool_calls.clone()),
            );

            for call in &response.tool_calls {
                calls_executed += 1;
                let result_text = self
                    .dispatch_tool(&config, call, &mut captured_question, entry)
                    .await;
                messages.push(ChatMessage::tool_result(call.id.clone(), result_text));
            }
        }
    }

    /// Execute one tool call, enforcing the agent's allow-list. Failures
    /// are folded into the tool result so the model can react.
    pub(crate) async fn dispatch_tool(
        &self,
        config: &AgentConfig,
        call: &ToolCall,
        captured_question: &mut Option<Question>,
        entry: &mut SessionEntry,
    ) -> String {
        if !config.allowed_tools.contains(&call.name.as_str()) {
            warn!(
                agent = config.name.as_str(),
                tool = %call.name,
                "agent requested a tool outside its allow-list"
            );
            return format!("error: the {} tool is not available here", call.name);
        }

        match self.toolbus.call(&call.name, call.arguments.clone()).await {
            Ok((result, duration_ms)) => {
                info!(tool = %call.name, duration_ms, "tool executed");
                if call.name == "generate_question" {
                    match serde_json::from_value::<Question>(result.clone()) {
                        Ok(question) => {
                            entry.open_question = Some(question.clone());
                            entry.wrong_attempts = 0;
                            *captured_question = Some(question);
                        }
                        Err(e) => {
                            warn!(error = %e, "generate_question result did not parse as a question")
                        }
                    }
                }
                result.to_string()
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "tool failed");
                format!("error: {}", e)
            }
        }
    }

    pub(crate) fn allowed_tool_specs(&self, config: &AgentConfig) -> Vec<ToolSpec> {
        self.toolbus
            .list_tools()
            .into_iter()
            .filter(|info| config.allowed_tools.contains(&info.name.as_str()))
            .map(|info| ToolSpec {
                name: info.name,
                description: info.description,
                parameters: info.parameters,
            })
            .collect()
    }
}

/// System prompt plus prior history; the user message is already the last
/// history entry.
pub(crate) fn build_conversation(config: &AgentConfig, state: &TurnState) -> Vec<ChatMessage> {
    let mut system = config.system_prompt.clone();
    if let Some(summary) = &state.summary {
        system.push_str("\n\nConversation summary so far: ");
        system.push_str(summary);
    }
    if let Some(language) = state.language() {
        system.push_str(&format!("\n\nReply in the student's language: {}.", language));
    }

    let mut messages = vec![ChatMessage::system(system)];
    for message in &state.history {
        match message.role {
            CoreRole::User => messages.push(ChatMessage::user(message.content.clone())),
            CoreRole::Assistant => {
                messages.push(ChatMessage::assistant(message.content.clone()))
            }
            CoreRole::System => {}
        }
    }
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use veda_agents::roster;
    use veda_core::{Message, SessionId};

    #[test]
    fn test_build_conversation_shape() {
        let config = roster().remove(&AgentName::Teach).unwrap();
        let state = TurnState::new(
            SessionId::new(),
            vec![Message::user("hello"), Message::assistant("hi!")],
            Message::user("explain circles"),
        )
        .with_summary("earlier: APs covered");

        let messages = build_conversation(&config, &state);
        assert_eq!(messages.len(), 4); // system + 3 history entries
        assert!(messages[0].content.contains("Socratic"));
        assert!(messages[0].content.contains("earlier: APs covered"));
        assert_eq!(messages.last().unwrap().content, "explain circles");
    }

    #[test]
    fn test_language_threaded_into_system_prompt() {
        let config = roster().remove(&AgentName::Teach).unwrap();
        let state = TurnState::new(SessionId::new(), Vec::new(), Message::user("namaste"))
            .with_profile(veda_core::UserProfile::new().with_language("hi"));
        let messages = build_conversation(&config, &state);
        assert!(messages[0].content.contains("language: hi"));
    }
}
