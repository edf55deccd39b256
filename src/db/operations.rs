// Conversation persistence. Queries are runtime-checked (no DATABASE_URL
// needed at compile time).

use crate::models::{Conversation, StoredMessage};
use crate::types::AppResult;
use sqlx::PgPool;
use uuid::Uuid;

pub struct DatabaseOperations;

impl DatabaseOperations {
    pub async fn create_conversation(pool: &PgPool) -> AppResult<Conversation> {
        let conversation: Conversation = sqlx::query_as(
            "INSERT INTO conversations (id) VALUES ($1) RETURNING id, created_at",
        )
        .bind(Uuid::new_v4())
        .fetch_one(pool)
        .await?;

        Ok(conversation)
    }

    pub async fn get_conversation(
        pool: &PgPool,
        conversation_id: Uuid,
    ) -> AppResult<Option<Conversation>> {
        let conversation: Option<Conversation> =
            sqlx::query_as("SELECT id, created_at FROM conversations WHERE id = $1")
                .bind(conversation_id)
                .fetch_optional(pool)
                .await?;

        Ok(conversation)
    }

    pub async fn create_message(
        pool: &PgPool,
        conversation_id: Uuid,
        role: &str,
        content: &str,
        tool_used: Option<&str>,
    ) -> AppResult<StoredMessage> {
        let message: StoredMessage = sqlx::query_as(
            r#"
            INSERT INTO messages (id, conversation_id, role, content, tool_used)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, conversation_id, role, content, tool_used, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(conversation_id)
        .bind(role)
        .bind(content)
        .bind(tool_used)
        .fetch_one(pool)
        .await?;

        Ok(message)
    }

    pub async fn get_messages_for_conversation(
        pool: &PgPool,
        conversation_id: Uuid,
    ) -> AppResult<Vec<StoredMessage>> {
        let messages: Vec<StoredMessage> = sqlx::query_as(
            r#"
            SELECT id, conversation_id, role, content, tool_used, created_at
            FROM messages
            WHERE conversation_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(conversation_id)
        .fetch_all(pool)
        .await?;

        Ok(messages)
    }
}
