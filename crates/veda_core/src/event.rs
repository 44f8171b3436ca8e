use serde::{Deserialize, Serialize};

/// Events carried over the streaming chat channel. The HTTP layer adapts
/// these to server-sent-event framing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    Meta {
        session_id: String,
        agent_name: String,
        agent_label: String,
        agent_emoji: String,
        agent_color: String,
    },

    Token { text: String },

    Done,

    Error { text: String },
}

impl ChatEvent {
    pub fn meta(
        session_id: impl Into<String>,
        agent_name: impl Into<String>,
        agent_label: impl Into<String>,
        agent_emoji: impl Into<String>,
        agent_color: impl Into<String>,
    ) -> Self {
        ChatEvent::Meta {
            session_id: session_id.into(),
            agent_name: agent_name.into(),
            agent_label: agent_label.into(),
            agent_emoji: agent_emoji.into(),
            agent_color: agent_color.into(),
        }
    }

    pub fn token(text: impl Into<String>) -> Self {
        ChatEvent::Token { text: text.into() }
    }

    pub fn done() -> Self {
        ChatEvent::Done
    }

    pub fn error(text: impl Into<String>) -> Self {
        ChatEvent::Error { text: text.into() }
    }

    /// SSE event name for this payload.
    pub fn event_name(&self) -> &'static str {
        match self {
            ChatEvent::Meta { .. } => "meta",
            ChatEvent::Token { .. } => "token",
            ChatEvent::Done => "done",
            ChatEvent::Error { .. } => "error",
        }
    }
}
