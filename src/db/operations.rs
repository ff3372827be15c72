//! Chat persistence operations.
//!
//! Queries are checked at runtime rather than with the compile-time macros,
//! so builds do not require a live DATABASE_URL.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use uuid::Uuid;

use crate::types::AppResult;

const TITLE_LIMIT: usize = 50;

#[derive(Debug, Clone, FromRow)]
struct ChatRow {
    id: Uuid,
    title: String,
    user_id: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub chat_id: Uuid,
    pub body: String,
    pub is_user: bool,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agents: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: Uuid,
    pub title: String,
    pub user_id: String,
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPage {
    pub chats: Vec<Chat>,
    pub total: i64,
    pub total_pages: i64,
    pub current_page: i64,
}

/// A message to be appended to a chat.
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub body: String,
    pub is_user: bool,
    pub agents: Option<serde_json::Value>,
    pub results: Option<serde_json::Value>,
}

#[derive(Clone)]
pub struct ChatStore {
    pool: PgPool,
}

impl ChatStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create_chat(&self, user_id: &str, title: &str) -> AppResult<Chat> {
        let row = sqlx::query_as::<_, ChatRow>(
            "INSERT INTO chats (id, title, user_id) VALUES ($1, $2, $3) \
             RETURNING id, title, user_id, created_at, updated_at",
        )
        .bind(Uuid::new_v4())
        .bind(title)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(self.hydrate(row, Vec::new()))
    }

    /// Append a message and bump the chat's updated_at. Returns the chat with
    /// all messages, or None when the chat does not exist.
    pub async fn add_message(
        &self,
        chat_id: Uuid,
        message: NewMessage,
    ) -> AppResult<Option<Chat>> {
        let inserted = sqlx::query(
            "INSERT INTO messages (id, chat_id, body, is_user, agents, results) \
             SELECT $1, $2, $3, $4, $5, $6 WHERE EXISTS (SELECT 1 FROM chats WHERE id = $2)",
        )
        .bind(Uuid::new_v4())
        .bind(chat_id)
        .bind(&message.body)
        .bind(message.is_user)
        .bind(&message.agents)
        .bind(&message.results)
        .execute(&self.pool)
        .await?;

        if inserted.rows_affected() == 0 {
            return Ok(None);
        }

        sqlx::query("UPDATE chats SET updated_at = now() WHERE id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        self.get_chat(chat_id).await
    }

    pub async fn get_chat(&self, chat_id: Uuid) -> AppResult<Option<Chat>> {
        let row = sqlx::query_as::<_, ChatRow>(
            "SELECT id, title, user_id, created_at, updated_at FROM chats WHERE id = $1",
        )
        .bind(chat_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let messages = self.messages_of(row.id).await?;
                Ok(Some(self.hydrate(row, messages)))
            }
            None => Ok(None),
        }
    }

    pub async fn list_chats(&self, user_id: &str, limit: i64, page: i64) -> AppResult<ChatPage> {
        let limit = limit.max(1);
        let page = page.max(1);
        let offset = (page - 1) * limit;

        let rows = sqlx::query_as::<_, ChatRow>(
            "SELECT id, title, user_id, created_at, updated_at FROM chats \
             WHERE user_id = $1 ORDER BY updated_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chats WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in rows {
            let messages = self.messages_of(row.id).await?;
            chats.push(self.hydrate(row, messages));
        }

        Ok(ChatPage {
            chats,
            total,
            total_pages: (total + limit - 1) / limit,
            current_page: page,
        })
    }

    pub async fn delete_chat(&self, chat_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM chats WHERE id = $1")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Case-insensitive substring search over chat titles and message bodies.
    pub async fn search_chats(&self, user_id: &str, query: &str) -> AppResult<Vec<Chat>> {
        let pattern = format!("%{}%", query.replace('%', "\\%").replace('_', "\\_"));
        let rows = sqlx::query_as::<_, ChatRow>(
            "SELECT DISTINCT c.id, c.title, c.user_id, c.created_at, c.updated_at \
             FROM chats c LEFT JOIN messages m ON c.id = m.chat_id \
             WHERE c.user_id = $1 AND (c.title ILIKE $2 OR m.body ILIKE $2) \
             ORDER BY c.updated_at DESC",
        )
        .bind(user_id)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        let mut chats = Vec::with_capacity(rows.len());
        for row in rows {
            let messages = self.messages_of(row.id).await?;
            chats.push(self.hydrate(row, messages));
        }
        Ok(chats)
    }

    async fn messages_of(&self, chat_id: Uuid) -> AppResult<Vec<ChatMessage>> {
        Ok(sqlx::query_as::<_, ChatMessage>(
            "SELECT id, chat_id, body, is_user, created_at, agents, results \
             FROM messages WHERE chat_id = $1 ORDER BY created_at ASC",
        )
        .bind(chat_id)
        .fetch_all(&self.pool)
        .await?)
    }

    fn hydrate(&self, row: ChatRow, messages: Vec<ChatMessage>) -> Chat {
        Chat {
            id: row.id,
            title: row.title,
            user_id: row.user_id,
            messages,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Derive a chat title from its first message: the first 50 characters, with
/// an ellipsis when truncated.
pub fn generate_title(first_message: &str) -> String {
    let trimmed = first_message.trim();
    if trimmed.is_empty() {
        return "New Conversation".to_string();
    }
    let head: String = trimmed.chars().take(TITLE_LIMIT).collect();
    if head.chars().count() < trimmed.chars().count() {
        format!("{head}...")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn title_truncates_at_fifty_chars() {
        assert_eq!(generate_title(""), "New Conversation");
        assert_eq!(generate_title("   "), "New Conversation");
        assert_eq!(generate_title("short request"), "short request");

        let long = "a".repeat(80);
        let title = generate_title(&long);
        assert_eq!(title, format!("{}...", "a".repeat(50)));
    }

    #[test]
    fn title_at_exact_limit_is_not_truncated() {
        let exact = "b".repeat(50);
        assert_eq!(generate_title(&exact), exact);
    }
}
