use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-form per-message metadata map.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single chat message. Immutable once appended to a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            metadata: Metadata::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        let role = Role::Assistant;
        let json = serde_json::to_string(&role).unwrap();
        assert_eq!(json, "\"assistant\"");

        let decoded: Role = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, Role::Assistant);
    }

    #[test]
    fn test_all_roles() {
        for role in [Role::User, Role::Assistant, Role::System] {
            let json = serde_json::to_string(&role).unwrap();
            let decoded: Role = serde_json::from_str(&json).unwrap();
            assert_eq!(decoded, role);
        }
    }

    #[test]
    fn test_message_factories() {
        let user = Message::user("hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.content, "hello");
        assert!(user.metadata.is_empty());

        let assistant = Message::assistant("hi there");
        assert_eq!(assistant.role, Role::Assistant);

        let system = Message::system("be helpful");
        assert_eq!(system.role, Role::System);
    }

    #[test]
    fn test_message_with_meta() {
        let msg = Message::assistant("done")
            .with_meta("agent", serde_json::json!("teach"))
            .with_meta("confidence", serde_json::json!(0.9));
        assert_eq!(msg.metadata.len(), 2);
        assert_eq!(msg.metadata["agent"], "teach");
    }

    #[test]
    fn test_message_serialization() {
        let msg = Message::user("what is a quadratic?");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains("metadata")); // empty map is skipped

        let decoded: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded.role, Role::User);
        assert_eq!(decoded.content, "what is a quadratic?");
    }
}
