use chrono::Utc;
use sqlx::SqlitePool;
use tracing::error;

use crate::errors::AppError;
use crate::models::{Conversation, ConversationUpdate};

#[derive(Clone)]
pub struct ConversationRepository {
    pool: SqlitePool,
}

impl ConversationRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<Conversation>, AppError> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, title, summary, created_at, updated_at
             FROM conversations WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to find conversation {id}: {e}");
            AppError::db_query(format!("Failed to find conversation {id}"), e)
        })
    }

    /// Most recently touched conversations first, bounded by `limit`.
    pub async fn find_recent(&self, limit: i64) -> Result<Vec<Conversation>, AppError> {
        sqlx::query_as::<_, Conversation>(
            "SELECT id, title, summary, created_at, updated_at
             FROM conversations
             ORDER BY updated_at DESC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch recent conversations: {e}");
            AppError::db_query("Failed to fetch conversations", e)
        })
    }

    pub async fn save(&self, conversation: &Conversation) -> Result<Conversation, AppError> {
        sqlx::query(
            "INSERT INTO conversations (id, title, summary, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&conversation.id)
        .bind(&conversation.title)
        .bind(&conversation.summary)
        .bind(conversation.created_at)
        .bind(conversation.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save conversation {}: {e}", conversation.id);
            AppError::db_query("Failed to save conversation", e)
        })?;
        Ok(conversation.clone())
    }

    /// Applies the present fields of `changes` (absent = unchanged) and
    /// refreshes `updated_at`.
    pub async fn update(
        &self,
        conversation: &Conversation,
        changes: &ConversationUpdate,
    ) -> Result<Conversation, AppError> {
        let mut updated = conversation.clone();
        if let Some(title) = &changes.title {
            updated.title = title.clone();
        }
        if let Some(summary) = &changes.summary {
            updated.summary = Some(summary.clone());
        }
        updated.updated_at = Utc::now();

        sqlx::query(
            "UPDATE conversations SET title = ?, summary = ?, updated_at = ? WHERE id = ?",
        )
        .bind(&updated.title)
        .bind(&updated.summary)
        .bind(updated.updated_at)
        .bind(&updated.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to update conversation {}: {e}", updated.id);
            AppError::db_query("Failed to update conversation", e)
        })?;
        Ok(updated)
    }

    /// Bumps `updated_at` only; used when a message is appended.
    pub async fn update_timestamp(&self, id: &str) -> Result<(), AppError> {
        sqlx::query("UPDATE conversations SET updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to update conversation timestamp {id}: {e}");
                AppError::db_query("Failed to update conversation", e)
            })?;
        Ok(())
    }
}
