use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::repo_types::User;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("email already registered")]
    Conflict,
    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let Some(db_err) = e.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::Conflict;
            }
        }
        StoreError::Database(e.into())
    }
}

/// Persistent user storage. Email uniqueness is enforced here, not by callers.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    /// Returns `StoreError::Conflict` if the email is taken.
    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"SELECT id, email, password_hash, created_at FROM users WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash)
            VALUES ($1, $2)
            RETURNING id, email, password_hash, created_at
            "#,
        )
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }
}

#[cfg(test)]
pub use memory::MemoryUserStore;

#[cfg(test)]
mod memory {
    use std::collections::HashMap;
    use std::sync::RwLock;

    use async_trait::async_trait;
    use time::OffsetDateTime;
    use uuid::Uuid;

    use super::{StoreError, UserStore};
    use crate::auth::repo_types::User;

    /// Keyed by email; the write lock makes check-and-insert atomic.
    #[derive(Default)]
    pub struct MemoryUserStore {
        users: RwLock<HashMap<String, User>>,
    }

    impl MemoryUserStore {
        pub fn len(&self) -> usize {
            self.users.read().map(|u| u.len()).unwrap_or(0)
        }
    }

    fn poisoned<T>(_: T) -> StoreError {
        StoreError::Database(anyhow::anyhow!("user store lock poisoned"))
    }

    #[async_trait]
    impl UserStore for MemoryUserStore {
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
            let users = self.users.read().map_err(poisoned)?;
            Ok(users.get(email).cloned())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
            let users = self.users.read().map_err(poisoned)?;
            Ok(users.values().find(|u| u.id == id).cloned())
        }

        async fn create(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
            let mut users = self.users.write().map_err(poisoned)?;
            if users.contains_key(email) {
                return Err(StoreError::Conflict);
            }
            let user = User {
                id: Uuid::new_v4(),
                email: email.to_string(),
                password_hash: password_hash.to_string(),
                created_at: OffsetDateTime::now_utc(),
            };
            users.insert(email.to_string(), user.clone());
            Ok(user)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_find_by_email_and_id() {
        let store = MemoryUserStore::default();
        let user = store.create("a@x.com", "hash").await.expect("create");

        let by_email = store.find_by_email("a@x.com").await.expect("lookup");
        assert_eq!(by_email.map(|u| u.id), Some(user.id));

        let by_id = store.find_by_id(user.id).await.expect("lookup");
        assert_eq!(by_id.map(|u| u.email), Some("a@x.com".to_string()));
    }

    #[tokio::test]
    async fn missing_user_is_none_not_error() {
        let store = MemoryUserStore::default();
        assert!(store.find_by_email("nobody@x.com").await.expect("lookup").is_none());
        assert!(store.find_by_id(Uuid::new_v4()).await.expect("lookup").is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let store = MemoryUserStore::default();
        store.create("a@x.com", "first").await.expect("create");
        let err = store.create("a@x.com", "second").await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict));
        assert_eq!(store.len(), 1);

        let kept = store.find_by_email("a@x.com").await.expect("lookup").expect("present");
        assert_eq!(kept.password_hash, "first");
    }

    #[test]
    fn non_database_sqlx_error_is_not_conflict() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
