//! SQLite-backed implementation of the credential store.

use crate::password;
use crate::store::{CredentialStore, StoreError, StoredUser};

use super::Database;

impl CredentialStore for Database {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<StoredUser>, StoreError> {
        Ok(self
            .users()
            .get_by_identifier(identifier)
            .await?
            .map(StoredUser::from))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<StoredUser>, StoreError> {
        Ok(self.users().get_by_uuid(id).await?.map(StoredUser::from))
    }

    async fn verify_password(&self, user: &StoredUser, password: &str) -> Result<bool, StoreError> {
        let hash = user.password_hash.clone();
        let password = password.to_string();

        // Argon2 is deliberately slow, keep it off the async workers
        tokio::task::spawn_blocking(move || password::verify_password(&password, &hash))
            .await
            .map_err(|e| StoreError::Password(format!("Password task failed: {}", e)))?
    }

    async fn verify_unknown(&self, password: &str) -> Result<(), StoreError> {
        let password = password.to_string();
        tokio::task::spawn_blocking(move || password::verify_dummy(&password))
            .await
            .map_err(|e| StoreError::Password(format!("Password task failed: {}", e)))?
    }

    async fn persist_refresh_token(&self, id: &str, token: &str) -> Result<(), StoreError> {
        if self.users().set_refresh_token(id, token).await? {
            Ok(())
        } else {
            Err(StoreError::MissingRecord(id.to_string()))
        }
    }

    async fn rotate_refresh_token(
        &self,
        id: &str,
        current: &str,
        new: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.users().swap_refresh_token(id, current, new).await?)
    }

    async fn clear_refresh_token(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.users().clear_refresh_token(id).await?)
    }
}

impl Database {
    /// Create a user with a freshly hashed password. Returns the new subject id.
    pub async fn create_user(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<String, StoreError> {
        // Email lookups are keyed on '@', so a username must never contain one
        if username.contains('@') {
            return Err(StoreError::InvalidInput(format!(
                "Username must not contain '@': {}",
                username
            )));
        }

        let password = password.to_string();
        let hash = tokio::task::spawn_blocking(move || password::hash_password(&password))
            .await
            .map_err(|e| StoreError::Password(format!("Password task failed: {}", e)))??;

        let uuid = uuid::Uuid::new_v4().to_string();
        self.users().create(&uuid, username, email, &hash).await?;
        Ok(uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_find_and_verify_password() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .create_user("alice", "alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        let user = db.find_by_identifier("alice").await.unwrap().unwrap();
        assert_eq!(user.identity.id, id);
        assert!(db.verify_password(&user, "hunter2hunter2").await.unwrap());
        assert!(!db.verify_password(&user, "wrong").await.unwrap());

        let by_email = db
            .find_by_identifier("alice@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.identity, user.identity);

        assert!(db.find_by_identifier("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_username_with_at_sign_rejected() {
        let db = Database::open(":memory:").await.unwrap();

        let result = db
            .create_user("bob@example.com", "bob@example.com", "hunter2hunter2")
            .await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
        assert!(db.find_by_identifier("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_unknown_runs() {
        let db = Database::open(":memory:").await.unwrap();
        db.verify_unknown("whatever").await.unwrap();
    }

    #[tokio::test]
    async fn test_persist_refresh_token_for_missing_user_fails() {
        let db = Database::open(":memory:").await.unwrap();

        let result = db.persist_refresh_token("no-such-user", "token").await;
        assert!(matches!(result, Err(StoreError::MissingRecord(_))));
    }

    #[tokio::test]
    async fn test_rotate_and_clear() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .create_user("alice", "alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        db.persist_refresh_token(&id, "r1").await.unwrap();
        assert!(db.rotate_refresh_token(&id, "r1", "r2").await.unwrap());
        assert!(!db.rotate_refresh_token(&id, "r1", "r3").await.unwrap());

        let user = db.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("r2"));

        assert!(db.clear_refresh_token(&id).await.unwrap());
        let user = db.find_by_id(&id).await.unwrap().unwrap();
        assert!(user.refresh_token.is_none());
    }
}
