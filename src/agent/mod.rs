use async_trait::async_trait;
use rig::completion::Completion as _;
use rig::message::{AssistantContent, Message as RigMessage};
use rig::prelude::CompletionClient;
use rig::providers::openai;
use tracing::error;

use crate::errors::AppError;
use crate::models::{Message, MessageRole};

/// What a completion backend hands back for one chat turn.
#[derive(Debug, Clone)]
pub struct ModelReply {
    pub content: String,
    pub tokens_used: i64,
    pub model: String,
}

/// Seam between orchestration and the LLM provider. Takes the full ordered
/// transcript, ending with the user turn to answer, and returns the reply
/// with its token accounting.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        conversation_id: &str,
        history: &[Message],
    ) -> Result<ModelReply, AppError>;
}

/// Replays stored user/assistant turns as provider chat history. Stored
/// `system` messages are carried via the agent preamble instead.
fn to_rig_history(messages: &[Message]) -> Vec<RigMessage> {
    messages
        .iter()
        .filter_map(|m| match m.role {
            MessageRole::User => Some(RigMessage::user(&m.content)),
            MessageRole::Assistant => Some(RigMessage::assistant(&m.content)),
            MessageRole::System => None,
        })
        .collect()
}

/// Backend that runs a single chat turn against the OpenAI API via rig.
/// A fresh agent is built per request so the history is replayed from the DB
/// each time.
#[derive(Clone)]
pub struct OpenAiAgentService {
    client: openai::Client,
    model: String,
    max_tokens: u64,
}

impl OpenAiAgentService {
    pub fn new(api_key: &str, model: String, max_tokens: u64) -> Self {
        let client = openai::Client::builder()
            .api_key(api_key)
            .build()
            .expect("Failed to build OpenAI client");
        Self { client, model, max_tokens }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiAgentService {
    async fn complete(
        &self,
        conversation_id: &str,
        history: &[Message],
    ) -> Result<ModelReply, AppError> {
        // The transcript always ends with the user turn being answered.
        let (last, prior) = history.split_last().ok_or_else(|| {
            AppError::Unexpected("Cannot run a completion on an empty transcript".into())
        })?;
        if last.role != MessageRole::User {
            return Err(AppError::Unexpected(format!(
                "Transcript must end with a user message, got '{}'",
                last.role
            )));
        }

        let preamble = prior
            .iter()
            .filter(|m| m.role == MessageRole::System)
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let mut builder = self.client.agent(&self.model).max_tokens(self.max_tokens);
        if !preamble.is_empty() {
            builder = builder.preamble(&preamble);
        }
        let agent = builder.build();

        let response = agent
            .completion(last.content.as_str(), to_rig_history(prior))
            .await
            .map_err(|e| {
                error!("Failed to build completion request for conversation {conversation_id}: {e}");
                AppError::CompletionFailed { message: e.to_string() }
            })?
            .send()
            .await
            .map_err(|e| {
                error!("Completion failed for conversation {conversation_id}: {e}");
                AppError::CompletionFailed { message: e.to_string() }
            })?;

        let content = response
            .choice
            .iter()
            .filter_map(|c| match c {
                AssistantContent::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("");

        Ok(ModelReply {
            content,
            tokens_used: response.usage.total_tokens as i64,
            model: self.model.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: MessageRole, content: &str) -> Message {
        Message::new("c1".into(), role, content.into())
    }

    #[test]
    fn history_replay_keeps_order_and_drops_system() {
        let history = vec![
            msg(MessageRole::System, "You are a helpful assistant."),
            msg(MessageRole::User, "first"),
            msg(MessageRole::Assistant, "second"),
            msg(MessageRole::User, "third"),
        ];
        let replay = to_rig_history(&history);
        assert_eq!(replay.len(), 3);
    }
}
