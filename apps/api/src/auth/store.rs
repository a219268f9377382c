//! User persistence behind the `UserStore` trait.
//!
//! `AppState` holds an `Arc<dyn UserStore>`; production uses `PgUserStore`.

use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::models::user::UserRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(e.to_string())
            }
            other => StoreError::Database(other),
        }
    }
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Atomically flips `verified` to true for `user_id` if it is not already set.
    ///
    /// Returns the record after the transition, or `None` when no unverified
    /// record with that id exists. Must be a single indivisible operation.
    async fn conditional_verify(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError>;

    /// Inserts a new unverified user. `None` when the email is already registered.
    async fn create_unverified(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_unverified_by_email(&self, email: &str)
        -> Result<Option<UserRecord>, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn conditional_verify(&self, user_id: Uuid) -> Result<Option<UserRecord>, StoreError> {
        // Single statement: the row lock taken by UPDATE serialises concurrent callers,
        // and the loser re-evaluates `verified = FALSE` and matches nothing.
        Ok(sqlx::query_as::<_, UserRecord>(
            r#"
            UPDATE users
            SET verified = TRUE, verified_at = now()
            WHERE id = $1 AND verified = FALSE
            RETURNING id, email, verified, verified_at, created_at
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn create_unverified(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let user = UserRecord::new_unverified(email.to_string());
        Ok(sqlx::query_as::<_, UserRecord>(
            r#"
            INSERT INTO users (id, email, verified, created_at)
            VALUES ($1, $2, FALSE, $3)
            ON CONFLICT (email) DO NOTHING
            RETURNING id, email, verified, verified_at, created_at
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(user.created_at)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn find_unverified_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        Ok(sqlx::query_as::<_, UserRecord>(
            "SELECT id, email, verified, verified_at, created_at FROM users WHERE email = $1 AND verified = FALSE",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?)
    }
}

#[cfg(test)]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use chrono::Utc;

    use super::*;

    /// Mutex-guarded map with the same conditional-update semantics as Postgres.
    #[derive(Default)]
    pub struct InMemoryUserStore {
        users: Mutex<HashMap<Uuid, UserRecord>>,
        /// When set, every call fails with `StoreError::Unavailable`.
        offline: AtomicBool,
    }

    impl InMemoryUserStore {
        pub fn insert(&self, user: UserRecord) {
            self.users.lock().unwrap().insert(user.id, user);
        }

        pub fn get(&self, user_id: Uuid) -> Option<UserRecord> {
            self.users.lock().unwrap().get(&user_id).cloned()
        }

        pub fn len(&self) -> usize {
            self.users.lock().unwrap().len()
        }

        pub fn set_offline(&self, offline: bool) {
            self.offline.store(offline, Ordering::SeqCst);
        }

        fn check_online(&self) -> Result<(), StoreError> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(StoreError::Unavailable("connection refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl UserStore for InMemoryUserStore {
        async fn conditional_verify(
            &self,
            user_id: Uuid,
        ) -> Result<Option<UserRecord>, StoreError> {
            self.check_online()?;
            let mut users = self.users.lock().unwrap();
            match users.get_mut(&user_id) {
                Some(user) if !user.verified => {
                    user.verified = true;
                    user.verified_at = Some(Utc::now());
                    Ok(Some(user.clone()))
                }
                _ => Ok(None),
            }
        }

        async fn create_unverified(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
            self.check_online()?;
            let mut users = self.users.lock().unwrap();
            if users.values().any(|u| u.email == email) {
                return Ok(None);
            }
            let user = UserRecord::new_unverified(email.to_string());
            users.insert(user.id, user.clone());
            Ok(Some(user))
        }

        async fn find_unverified_by_email(
            &self,
            email: &str,
        ) -> Result<Option<UserRecord>, StoreError> {
            self.check_online()?;
            Ok(self
                .users
                .lock()
                .unwrap()
                .values()
                .find(|u| u.email == email && !u.verified)
                .cloned())
        }
    }

    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_conditional_verify_transitions_once() {
            let store = InMemoryUserStore::default();
            let user = UserRecord::new_unverified("jane@example.com".to_string());
            store.insert(user.clone());

            let first = store.conditional_verify(user.id).await.unwrap();
            assert!(first.is_some_and(|u| u.verified));
            assert!(store.conditional_verify(user.id).await.unwrap().is_none());
            assert!(store.get(user.id).unwrap().verified);
        }

        #[tokio::test]
        async fn test_create_unverified_rejects_duplicates() {
            let store = InMemoryUserStore::default();
            assert!(store.create_unverified("jane@example.com").await.unwrap().is_some());
            assert!(store.create_unverified("jane@example.com").await.unwrap().is_none());
            assert_eq!(store.len(), 1);
        }

        #[tokio::test]
        async fn test_offline_store_fails() {
            let store = InMemoryUserStore::default();
            store.set_offline(true);
            assert!(matches!(
                store.conditional_verify(Uuid::new_v4()).await,
                Err(StoreError::Unavailable(_))
            ));
        }
    }
}

#[cfg(test)]
mod pg_tests {
    use super::*;
    use crate::db::create_pool;

    /// Connects to `TEST_DATABASE_URL`; run with `cargo test -- --ignored`.
    async fn pg_store() -> PgUserStore {
        let url = std::env::var("TEST_DATABASE_URL").expect("TEST_DATABASE_URL must be set");
        PgUserStore::new(create_pool(&url).await.unwrap())
    }

    fn unique_email() -> String {
        format!("{}@example.com", Uuid::new_v4())
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_pg_conditional_verify_transitions_once() {
        let store = pg_store().await;
        let user = store
            .create_unverified(&unique_email())
            .await
            .unwrap()
            .unwrap();

        let first = store.conditional_verify(user.id).await.unwrap().unwrap();
        assert!(first.verified);
        assert!(first.verified_at.is_some());
        assert!(store.conditional_verify(user.id).await.unwrap().is_none());
        assert!(store.conditional_verify(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_pg_concurrent_conditional_verify_single_winner() {
        let store = pg_store().await;
        let user = store
            .create_unverified(&unique_email())
            .await
            .unwrap()
            .unwrap();

        let user_id = user.id;
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.conditional_verify(user_id).await })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().unwrap().is_some() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
        assert!(store
            .find_unverified_by_email(&user.email)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL"]
    async fn test_pg_duplicate_email_returns_none() {
        let store = pg_store().await;
        let email = unique_email();
        assert!(store.create_unverified(&email).await.unwrap().is_some());
        assert!(store.create_unverified(&email).await.unwrap().is_none());
    }
}
