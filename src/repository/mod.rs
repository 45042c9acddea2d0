//! Persistence of users and hello-world messages.
//!
//! Each repository owns a pool clone and maps rows onto the serializable models
//! below. Timestamps are stored as ISO-8601 text by SQLite itself.

mod messages;
mod users;

use serde::Serialize;

pub use messages::MessageRepository;
pub use users::UserRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

/// A partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub avatar: Option<String>,
}

impl UserChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.avatar.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct HelloMessage {
    pub id: i64,
    pub name: String,
    pub message: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Maps the empty string an optional validated field normalizes to onto `None`.
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) async fn memory_pool() -> sqlx::SqlitePool {
    let cfg = crate::config::DatabaseConfig { url: "sqlite::memory:".to_string(), max_connections: 1 };
    let pool = crate::db::connect(&cfg).await.unwrap();
    crate::db::init_db(&pool).await.unwrap();
    pool
}
