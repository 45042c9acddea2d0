use sqlx::SqlitePool;

use super::{NewUser, User, UserChanges};
use crate::error::AppResult;

const USER_COLUMNS: &str = "id, name, email, avatar, created_at, updated_at";

#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// One page of users ordered by id. `page` is 1-based.
    pub async fn find_page(&self, page: u64, limit: u64) -> AppResult<Vec<User>> {
        let offset = page.saturating_sub(1).saturating_mul(limit);
        let sql = format!("SELECT {} FROM users ORDER BY id LIMIT ?1 OFFSET ?2", USER_COLUMNS);
        let users = sqlx::query_as::<_, User>(&sql)
            .bind(limit as i64)
            .bind(offset.min(i64::MAX as u64) as i64)
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }

    pub async fn count(&self) -> AppResult<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users").fetch_one(&self.pool).await?;
        Ok(total.max(0) as u64)
    }

    pub async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    pub async fn create(&self, user: &NewUser) -> AppResult<User> {
        let sql = format!("INSERT INTO users (name, email, avatar) VALUES (?1, ?2, ?3) RETURNING {}", USER_COLUMNS);
        let created = sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.avatar)
            .fetch_one(&self.pool)
            .await?;
        tracing::info!(id = created.id, "User created");
        Ok(created)
    }

    /// Applies `changes` and bumps `updated_at`. Returns `None` when no such user exists.
    /// Applies a partial update. An empty change set leaves the row and its `updated_at` as they are.
    pub async fn update(&self, id: i64, changes: &UserChanges) -> AppResult<Option<User>> {
        if changes.is_empty() {
            return self.find_by_id(id).await;
        }
        let sql = format!(
            "UPDATE users SET name = COALESCE(?1, name), email = COALESCE(?2, email), \
             avatar = COALESCE(?3, avatar), updated_at = strftime('%Y-%m-%dT%H:%M:%fZ','now') \
             WHERE id = ?4 RETURNING {}",
            USER_COLUMNS
        );
        let updated = sqlx::query_as::<_, User>(&sql)
            .bind(&changes.name)
            .bind(&changes.email)
            .bind(&changes.avatar)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(updated)
    }

    /// Returns whether a row was deleted.
    pub async fn delete(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?1").bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }
}
