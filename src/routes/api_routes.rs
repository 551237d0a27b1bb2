use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse, Conversation, ConversationUpdate, Message, MessageRole};
use crate::routes::AppState;

const DEFAULT_CONVERSATION_LIMIT: i64 = 10;

// ── Request / response bodies ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListConversationsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConversationListResponse {
    pub conversations: Vec<Conversation>,
}

/// One transcript entry as exposed over the wire: role and content only.
#[derive(Debug, Serialize)]
pub struct MessageView {
    pub role: MessageRole,
    pub content: String,
}

impl From<&Message> for MessageView {
    fn from(m: &Message) -> Self {
        Self { role: m.role, content: m.content.clone() }
    }
}

#[derive(Debug, Serialize)]
pub struct ConversationDetailResponse {
    pub id: String,
    pub title: String,
    pub summary: Option<String>,
    pub messages: Vec<MessageView>,
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET `/health`
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// POST `/chat` — run one chat turn.
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, AppError> {
    let response = state.chat_service.chat(request).await?;
    Ok(Json(response))
}

/// GET `/conversations?limit=N` — most recently updated conversations.
pub async fn list_conversations_handler(
    State(state): State<AppState>,
    Query(query): Query<ListConversationsQuery>,
) -> Result<Json<ConversationListResponse>, AppError> {
    let limit = query.limit.unwrap_or(DEFAULT_CONVERSATION_LIMIT);
    let conversations = state.conversation_service.get_recent_conversations(limit).await?;
    Ok(Json(ConversationListResponse { conversations }))
}

/// POST `/conversations` — create a conversation; every body field is
/// optional, `{}` is a valid request.
pub async fn create_conversation_handler(
    State(state): State<AppState>,
    Json(request): Json<CreateConversationRequest>,
) -> Result<Json<Conversation>, AppError> {
    let conversation = state.conversation_service.create_conversation(request.title).await?;
    Ok(Json(conversation))
}

/// GET `/conversations/{id}` — conversation with its full transcript.
pub async fn get_conversation_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ConversationDetailResponse>, AppError> {
    let conversation = state
        .conversation_service
        .get_conversation(&id)
        .await?
        .ok_or_else(|| AppError::ConversationNotFound { id: id.clone() })?;

    let messages = state.conversation_service.get_messages(&id).await?;

    Ok(Json(ConversationDetailResponse {
        id: conversation.id,
        title: conversation.title,
        summary: conversation.summary,
        messages: messages.iter().map(MessageView::from).collect(),
    }))
}

/// PUT `/conversations/{id}` — partial update of title/summary.
pub async fn update_conversation_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(changes): Json<ConversationUpdate>,
) -> Result<Json<Conversation>, AppError> {
    let conversation = state.conversation_service.update_conversation(&id, changes).await?;
    Ok(Json(conversation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_response_exposes_role_and_content_only() {
        let msg = Message::new("c1".into(), MessageRole::User, "hi".into());
        let detail = ConversationDetailResponse {
            id: "c1".into(),
            title: "New Conversation".into(),
            summary: None,
            messages: vec![MessageView::from(&msg)],
        };

        let value = serde_json::to_value(&detail).unwrap();
        assert_eq!(value["messages"][0]["role"], "user");
        assert_eq!(value["messages"][0]["content"], "hi");
        assert!(value["messages"][0].get("id").is_none());
        assert!(value["messages"][0].get("created_at").is_none());
    }

    #[test]
    fn conversation_serializes_rfc3339_timestamps() {
        let conv = Conversation::new("t".into());
        let value = serde_json::to_value(&conv).unwrap();
        let created_at = value["created_at"].as_str().unwrap();
        assert!(created_at.contains('T'), "expected RFC 3339 date-time, got {created_at}");
    }

    #[test]
    fn update_body_fields_are_optional() {
        let changes: ConversationUpdate = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(changes.title.as_deref(), Some("x"));
        assert!(changes.summary.is_none());

        let changes: ConversationUpdate = serde_json::from_str("{}").unwrap();
        assert!(changes.title.is_none() && changes.summary.is_none());
    }
}
