use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Conversation {
    /// Builds a new conversation with a server-assigned id and timestamps.
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            title,
            summary: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update payload for a conversation: absent fields are left
/// unchanged by the repository.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MessageRole {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub tokens_used: Option<i64>,
    pub model: Option<String>,
}

impl Message {
    pub fn new(conversation_id: String, role: MessageRole, content: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id,
            role,
            content,
            created_at: Utc::now(),
            tokens_used: None,
            model: None,
        }
    }

    /// Attaches provider accounting to an assistant message.
    pub fn with_usage(mut self, tokens_used: i64, model: impl Into<String>) -> Self {
        self.tokens_used = Some(tokens_used);
        self.model = Some(model.into());
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub conversation_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [MessageRole::System, MessageRole::User, MessageRole::Assistant] {
            let parsed = MessageRole::try_from(role.as_str().to_string()).unwrap();
            assert_eq!(parsed, role);
        }
    }

    #[test]
    fn role_rejects_unknown_values() {
        assert!(MessageRole::try_from("moderator".to_string()).is_err());
        // Roles are stored lowercase; no case folding on the way in.
        assert!(MessageRole::try_from("USER".to_string()).is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&MessageRole::Assistant).unwrap(), "\"assistant\"");
        let role: MessageRole = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, MessageRole::System);
    }

    #[test]
    fn chat_request_conversation_id_is_optional() {
        let req: ChatRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert!(req.conversation_id.is_none());

        let req: ChatRequest =
            serde_json::from_str(r#"{"message":"hi","conversation_id":"c1"}"#).unwrap();
        assert_eq!(req.conversation_id.as_deref(), Some("c1"));
    }

    #[test]
    fn conversation_gets_fresh_id_and_matching_timestamps() {
        let a = Conversation::new("A".into());
        let b = Conversation::new("B".into());
        assert_ne!(a.id, b.id);
        assert_eq!(a.created_at, a.updated_at);
        assert!(a.summary.is_none());
    }

    #[test]
    fn with_usage_fills_accounting_fields() {
        let msg = Message::new("c1".into(), MessageRole::Assistant, "hi".into())
            .with_usage(42, "gpt-3.5-turbo");
        assert_eq!(msg.tokens_used, Some(42));
        assert_eq!(msg.model.as_deref(), Some("gpt-3.5-turbo"));
    }
}
