use serde::{Deserialize, Serialize};

use crate::message::{Message, Metadata, Role};
use crate::question::Question;
use crate::route::AgentName;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_preference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_agent: Option<AgentName>,
}

impl UserProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_language(mut self, lang: impl Into<String>) -> Self {
        self.language_preference = Some(lang.into());
        self
    }

    pub fn with_force_agent(mut self, agent: AgentName) -> Self {
        self.force_agent = Some(agent);
        self
    }
}

/// Per-request state assembled by the runner and consumed by the supervisor
/// and the selected agent. Never persisted whole.
#[derive(Debug, Clone)]
pub struct TurnState {
    pub session_id: SessionId,
    /// Prior messages plus the current user message as the last entry.
    pub history: Vec<Message>,
    pub user_message: Message,
    pub profile: Option<UserProfile>,
    pub summary: Option<String>,
    pub scratch: Metadata,
}

impl TurnState {
    /// Build turn state from prior history and the incoming user message.
    /// Appends the user message so it is always the last history entry.
    pub fn new(session_id: SessionId, mut history: Vec<Message>, user_message: Message) -> Self {
        history.push(user_message.clone());
        Self {
            session_id,
            history,
            user_message,
            profile: None,
            summary: None,
            scratch: Metadata::new(),
        }
    }

    pub fn with_profile(mut self, profile: UserProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn user_text(&self) -> &str {
        &self.user_message.content
    }

    pub fn language(&self) -> Option<&str> {
        self.profile
            .as_ref()
            .and_then(|p| p.language_preference.as_deref())
    }

    /// Last assistant message before the current user turn, if any.
    pub fn last_assistant(&self) -> Option<&Message> {
        self.history.iter().rev().find(|m| m.role == Role::Assistant)
    }
}

/// What an agent invocation produces for one turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    pub text: String,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question: Option<Question>,
    /// True when the turn closes the session.
    #[serde(default)]
    pub terminal: bool,
}

impl AgentReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            text: content.into(),
            metadata: Metadata::new(),
            question: None,
            terminal: false,
        }
    }

    pub fn terminal(content: impl Into<String>) -> Self {
        Self {
            text: content.into(),
            metadata: Metadata::new(),
            question: None,
            terminal: true,
        }
    }

    pub fn with_question(mut self, question: Question) -> Self {
        self.question = Some(question);
        self
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::QuestionSource;

    #[test]
    fn test_session_id_new() {
        let id = SessionId::new();
        assert_eq!(id.as_str().len(), 36); // UUID format
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::from("s1".to_string());
        assert_eq!(format!("{}", id), "s1");
    }

    #[test]
    fn test_user_message_is_last_history_entry() {
        let history = vec![Message::user("hello"), Message::assistant("hi!")];
        let user = Message::user("explain quadratics");
        let state = TurnState::new(SessionId::from("s1".to_string()), history, user);

        assert_eq!(state.history.len(), 3);
        assert_eq!(state.history.last().unwrap().content, "explain quadratics");
        assert_eq!(state.user_text(), "explain quadratics");
    }

    #[test]
    fn test_last_assistant() {
        let history = vec![
            Message::user("hello"),
            Message::assistant("hi!"),
            Message::user("thanks"),
            Message::assistant("welcome"),
        ];
        let state = TurnState::new(
            SessionId::new(),
            history,
            Message::user("one more thing"),
        );
        assert_eq!(state.last_assistant().unwrap().content, "welcome");
    }

    #[test]
    fn test_language_from_profile() {
        let state = TurnState::new(SessionId::new(), Vec::new(), Message::user("namaste"))
            .with_profile(UserProfile::new().with_language("hi"));
        assert_eq!(state.language(), Some("hi"));
    }

    #[test]
    fn test_agent_reply_text() {
        let reply = AgentReply::text("here is an explanation");
        assert!(!reply.terminal);
        assert!(reply.question.is_none());
    }

    #[test]
    fn test_agent_reply_terminal() {
        let reply = AgentReply::terminal("goodbye, progress saved");
        assert!(reply.terminal);
    }

    #[test]
    fn test_agent_reply_with_question() {
        let q = Question::new("quadratic_roots", 2, 0.4, QuestionSource::Pattern);
        let reply = AgentReply::text("try this one").with_question(q);
        assert!(reply.question.is_some());
    }

    #[test]
    fn test_agent_reply_serialization() {
        let reply = AgentReply::text("ok").with_meta("route", serde_json::json!("rule"));
        let json = serde_json::to_string(&reply).unwrap();
        assert!(json.contains(r#""terminal":false"#));

        let decoded: AgentReply = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.text, "ok");
        assert_eq!(decoded.metadata["route"], "rule");
    }
}
