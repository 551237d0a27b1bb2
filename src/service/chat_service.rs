use std::sync::Arc;

use crate::agent::CompletionBackend;
use crate::errors::AppError;
use crate::models::{ChatRequest, ChatResponse, MessageRole};
use crate::service::conversation_service::ConversationService;

const MAX_MESSAGE_LENGTH: usize = 8000;

/// Orchestrates one chat turn: resolve-or-create the conversation, persist
/// the user message, replay the transcript through the completion backend,
/// persist the reply.
#[derive(Clone)]
pub struct ChatService {
    conversations: ConversationService,
    backend: Arc<dyn CompletionBackend>,
}

impl ChatService {
    pub fn new(conversations: ConversationService, backend: Arc<dyn CompletionBackend>) -> Self {
        Self { conversations, backend }
    }

    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, AppError> {
        // ── Validation ────────────────────────────────────────────────────────
        if request.message.trim().is_empty() {
            return Err(AppError::EmptyField { field_name: "message".to_string() });
        }
        if request.message.len() > MAX_MESSAGE_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "message".to_string(),
                max_length: MAX_MESSAGE_LENGTH,
                actual_length: request.message.len(),
            });
        }

        // ── Resolve or create the conversation ────────────────────────────────
        // An id that does not resolve gets a fresh conversation; the returned
        // id then differs from the one the client sent.
        let conversation = match &request.conversation_id {
            Some(id) => self.conversations.get_conversation(id).await?,
            None => None,
        };
        let conversation = match conversation {
            Some(c) => c,
            None => self.conversations.create_conversation(None).await?,
        };
        let conversation_id = conversation.id;

        // ── Persist the user message ──────────────────────────────────────────
        self.conversations
            .add_message(&conversation_id, MessageRole::User, &request.message, None, None)
            .await?;

        // ── Replay the full transcript through the model ──────────────────────
        // A failed completion leaves the user message persisted; the client
        // may retry by resending.
        let history = self.conversations.get_messages(&conversation_id).await?;
        let reply = self.backend.complete(&conversation_id, &history).await?;

        // ── Persist the assistant reply ───────────────────────────────────────
        self.conversations
            .add_message(
                &conversation_id,
                MessageRole::Assistant,
                &reply.content,
                Some(reply.tokens_used),
                Some(reply.model),
            )
            .await?;

        Ok(ChatResponse { reply: reply.content, conversation_id })
    }
}
