use crate::db::conversation_repository::ConversationRepository;
use crate::db::message_repository::MessageRepository;
use crate::errors::AppError;
use crate::models::{Conversation, ConversationUpdate, Message, MessageRole};

pub const DEFAULT_TITLE: &str = "New Conversation";
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Domain operations over conversations and their transcripts. Stateless;
/// every call goes straight through the repositories to the store.
#[derive(Clone)]
pub struct ConversationService {
    conversation_repo: ConversationRepository,
    message_repo: MessageRepository,
}

impl ConversationService {
    pub fn new(
        conversation_repo: ConversationRepository,
        message_repo: MessageRepository,
    ) -> Self {
        Self { conversation_repo, message_repo }
    }

    /// Creates a conversation (title defaulted when absent) and seeds its
    /// transcript with the fixed system instruction. The seeded message is
    /// not part of the return value.
    pub async fn create_conversation(
        &self,
        title: Option<String>,
    ) -> Result<Conversation, AppError> {
        let conversation =
            Conversation::new(title.unwrap_or_else(|| DEFAULT_TITLE.to_string()));
        let conversation = self.conversation_repo.save(&conversation).await?;

        self.add_message(&conversation.id, MessageRole::System, SYSTEM_PROMPT, None, None)
            .await?;

        Ok(conversation)
    }

    pub async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        self.conversation_repo.find_by_id(id).await
    }

    pub async fn get_recent_conversations(
        &self,
        limit: i64,
    ) -> Result<Vec<Conversation>, AppError> {
        self.conversation_repo.find_recent(limit).await
    }

    /// Partial update: absent fields are left untouched. Fails with
    /// `ConversationNotFound` before any mutation when the id does not
    /// resolve.
    pub async fn update_conversation(
        &self,
        id: &str,
        changes: ConversationUpdate,
    ) -> Result<Conversation, AppError> {
        let conversation = self
            .conversation_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound { id: id.to_string() })?;

        self.conversation_repo.update(&conversation, &changes).await
    }

    /// Appends one message to an existing conversation and bumps the
    /// conversation's `updated_at`.
    pub async fn add_message(
        &self,
        conversation_id: &str,
        role: MessageRole,
        content: &str,
        tokens_used: Option<i64>,
        model: Option<String>,
    ) -> Result<Message, AppError> {
        self.conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound { id: conversation_id.to_string() })?;

        let mut message =
            Message::new(conversation_id.to_string(), role, content.to_string());
        message.tokens_used = tokens_used;
        message.model = model;

        let message = self.message_repo.save(&message).await?;
        self.conversation_repo.update_timestamp(conversation_id).await?;
        Ok(message)
    }

    /// Full transcript in creation order.
    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<Message>, AppError> {
        self.conversation_repo
            .find_by_id(conversation_id)
            .await?
            .ok_or_else(|| AppError::ConversationNotFound { id: conversation_id.to_string() })?;

        self.message_repo.find_by_conversation_id(conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_service() -> (TempDir, ConversationService) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = crate::db::connect(&url).await.unwrap();
        let service = ConversationService::new(
            ConversationRepository::new(pool.clone()),
            MessageRepository::new(pool),
        );
        (dir, service)
    }

    #[tokio::test]
    async fn create_seeds_exactly_one_system_message() {
        let (_dir, svc) = test_service().await;

        let conv = svc.create_conversation(None).await.unwrap();
        assert_eq!(conv.title, DEFAULT_TITLE);

        let messages = svc.get_messages(&conv.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, MessageRole::System);
        assert_eq!(messages[0].content, SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn create_honors_explicit_title() {
        let (_dir, svc) = test_service().await;
        let conv = svc.create_conversation(Some("Trip planning".into())).await.unwrap();
        assert_eq!(conv.title, "Trip planning");

        let fetched = svc.get_conversation(&conv.id).await.unwrap().unwrap();
        assert_eq!(fetched.title, "Trip planning");
        assert!(fetched.summary.is_none());
    }

    #[tokio::test]
    async fn messages_round_trip_in_insertion_order() {
        let (_dir, svc) = test_service().await;
        let conv = svc.create_conversation(None).await.unwrap();

        for (role, content) in [
            (MessageRole::User, "one"),
            (MessageRole::Assistant, "two"),
            (MessageRole::User, "three"),
        ] {
            svc.add_message(&conv.id, role, content, None, None).await.unwrap();
        }

        let messages = svc.get_messages(&conv.id).await.unwrap();
        let transcript: Vec<(MessageRole, &str)> =
            messages.iter().map(|m| (m.role, m.content.as_str())).collect();
        assert_eq!(
            transcript,
            vec![
                (MessageRole::System, SYSTEM_PROMPT),
                (MessageRole::User, "one"),
                (MessageRole::Assistant, "two"),
                (MessageRole::User, "three"),
            ]
        );
    }

    #[tokio::test]
    async fn add_message_stores_token_accounting() {
        let (_dir, svc) = test_service().await;
        let conv = svc.create_conversation(None).await.unwrap();

        svc.add_message(
            &conv.id,
            MessageRole::Assistant,
            "hello",
            Some(37),
            Some("gpt-3.5-turbo".into()),
        )
        .await
        .unwrap();

        let messages = svc.get_messages(&conv.id).await.unwrap();
        let assistant = messages.last().unwrap();
        assert_eq!(assistant.tokens_used, Some(37));
        assert_eq!(assistant.model.as_deref(), Some("gpt-3.5-turbo"));
    }

    #[tokio::test]
    async fn add_message_to_unknown_conversation_is_not_found() {
        let (_dir, svc) = test_service().await;
        let err = svc
            .add_message("missing", MessageRole::User, "hi", None, None)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn get_messages_of_unknown_conversation_is_not_found() {
        let (_dir, svc) = test_service().await;
        let err = svc.get_messages("missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_of_unknown_conversation_is_not_found() {
        let (_dir, svc) = test_service().await;
        let err = svc
            .update_conversation("missing", ConversationUpdate {
                title: Some("x".into()),
                summary: None,
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(svc.get_recent_conversations(10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_applies_only_present_fields() {
        let (_dir, svc) = test_service().await;
        let conv = svc.create_conversation(Some("Original".into())).await.unwrap();

        let updated = svc
            .update_conversation(&conv.id, ConversationUpdate {
                title: None,
                summary: Some("a short recap".into()),
            })
            .await
            .unwrap();
        assert_eq!(updated.title, "Original");
        assert_eq!(updated.summary.as_deref(), Some("a short recap"));
        assert!(updated.updated_at >= conv.updated_at);

        let updated = svc
            .update_conversation(&conv.id, ConversationUpdate {
                title: Some("Renamed".into()),
                summary: None,
            })
            .await
            .unwrap();
        assert_eq!(updated.title, "Renamed");
        // Absent summary leaves the stored one untouched.
        assert_eq!(updated.summary.as_deref(), Some("a short recap"));
    }

    #[tokio::test]
    async fn recent_conversations_are_bounded_and_ordered() {
        let (_dir, svc) = test_service().await;
        let a = svc.create_conversation(Some("a".into())).await.unwrap();
        let b = svc.create_conversation(Some("b".into())).await.unwrap();
        let c = svc.create_conversation(Some("c".into())).await.unwrap();

        // Touch the oldest so it becomes the most recent.
        svc.add_message(&a.id, MessageRole::User, "bump", None, None).await.unwrap();

        let recent = svc.get_recent_conversations(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].id, a.id);
        assert_eq!(recent[1].id, c.id);
        assert!(recent[0].updated_at >= recent[1].updated_at);

        let all = svc.get_recent_conversations(10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[2].id, b.id);
    }
}
