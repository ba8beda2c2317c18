use sqlx::sqlite::SqlitePool;

use crate::store::{Identity, StoredUser};

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub refresh_token: Option<String>,
}

impl From<User> for StoredUser {
    fn from(user: User) -> Self {
        Self {
            identity: Identity {
                id: user.uuid,
                username: user.username,
                email: user.email,
            },
            password_hash: user.password_hash,
            refresh_token: user.refresh_token,
        }
    }
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the user ID.
    pub async fn create(
        &self,
        uuid: &str,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, username, email, password_hash) VALUES (?, ?, ?, ?)",
        )
        .bind(uuid)
        .bind(username)
        .bind(email)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    /// Get a user by username or email (case-insensitive).
    /// An identifier containing '@' is only ever matched against emails.
    pub async fn get_by_identifier(&self, identifier: &str) -> Result<Option<User>, sqlx::Error> {
        if identifier.contains('@') {
            self.get_by_email(identifier).await
        } else {
            self.get_by_username(identifier).await
        }
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, username, email, password_hash, refresh_token FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, username, email, password_hash, refresh_token FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a user by UUID.
    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, uuid, username, email, password_hash, refresh_token FROM users WHERE uuid = ?",
        )
        .bind(uuid)
        .fetch_optional(&self.pool)
        .await
    }

    /// Overwrite the stored refresh token.
    pub async fn set_refresh_token(&self, uuid: &str, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = ? WHERE uuid = ?")
            .bind(token)
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the stored refresh token only if it still equals `current`.
    /// A single statement, so two callers racing on the same value cannot both win.
    pub async fn swap_refresh_token(
        &self,
        uuid: &str,
        current: &str,
        new: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = ? WHERE uuid = ? AND refresh_token = ?")
                .bind(new)
                .bind(uuid)
                .bind(current)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Remove the stored refresh token.
    pub async fn clear_refresh_token(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = NULL WHERE uuid = ? AND refresh_token IS NOT NULL",
        )
        .bind(uuid)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check if a username or email is already taken.
    pub async fn is_taken(&self, username: &str, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i32,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }
}
