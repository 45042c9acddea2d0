use sqlx::SqlitePool;

use super::HelloMessage;
use crate::error::AppResult;

const MESSAGE_COLUMNS: &str = "id, name, message, created_at, updated_at";

#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// The most recent message stored for `name`.
    pub async fn latest_by_name(&self, name: &str) -> AppResult<Option<HelloMessage>> {
        let sql = format!(
            "SELECT {} FROM hello_world_messages WHERE name = ?1 ORDER BY created_at DESC, id DESC LIMIT 1",
            MESSAGE_COLUMNS
        );
        Ok(sqlx::query_as::<_, HelloMessage>(&sql).bind(name).fetch_optional(&self.pool).await?)
    }

    /// Stores a message, defaulting the text to `Hello, <name>!`.
    pub async fn create(&self, name: &str, message: Option<&str>) -> AppResult<HelloMessage> {
        let text = match message {
            Some(m) if !m.is_empty() => m.to_string(),
            _ => format!("Hello, {}!", name),
        };
        let sql = format!(
            "INSERT INTO hello_world_messages (name, message) VALUES (?1, ?2) RETURNING {}",
            MESSAGE_COLUMNS
        );
        let created =
            sqlx::query_as::<_, HelloMessage>(&sql).bind(name).bind(&text).fetch_one(&self.pool).await?;
        tracing::info!(id = created.id, name = %name, "Hello World message created");
        Ok(created)
    }

    /// Every message, newest first.
    pub async fn list(&self) -> AppResult<Vec<HelloMessage>> {
        let sql = format!("SELECT {} FROM hello_world_messages ORDER BY created_at DESC, id DESC", MESSAGE_COLUMNS);
        Ok(sqlx::query_as::<_, HelloMessage>(&sql).fetch_all(&self.pool).await?)
    }
}
