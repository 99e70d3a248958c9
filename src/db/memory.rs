//! In-memory user store.
//!
//! Selected with `database.backend = "memory"`. Nothing survives a restart.

use super::{DbError, User, UserStore};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::atomic::{AtomicI32, Ordering};

/// User store backed by a concurrent map keyed by email.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    by_email: DashMap<String, User>,
    next_id: AtomicI32,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl MemoryUserStore {
    /// Number of registered users.
    pub fn len(&self) -> usize {
        self.by_email.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_email.is_empty()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(
        &self,
        name: &str,
        email: &str,
        hashed_password: &str,
    ) -> Result<User, DbError> {
        match self.by_email.entry(email.to_string()) {
            Entry::Occupied(_) => Err(DbError::EmailExists(email.to_string())),
            Entry::Vacant(slot) => {
                let user = User {
                    id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
                    name: name.to_string(),
                    email: email.to_string(),
                    hashed_password: hashed_password.to_string(),
                    created_at: Utc::now(),
                };
                slot.insert(user.clone());
                Ok(user)
            }
        }
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DbError> {
        Ok(self.by_email.get(email).map(|u| u.clone()))
    }

    async fn ping(&self) -> Result<(), DbError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryUserStore::new();
        let user = store
            .create_user("Ana", "ana@example.com", "$argon2id$hash")
            .await
            .unwrap();
        assert_eq!(user.id, 1);

        let found = store.find_by_email("ana@example.com").await.unwrap().unwrap();
        assert_eq!(found, user);
        assert!(store.find_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let store = MemoryUserStore::new();
        store.create_user("Ana", "ana@example.com", "h").await.unwrap();
        let err = store
            .create_user("Other", "ana@example.com", "h2")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::EmailExists(e) if e == "ana@example.com"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = MemoryUserStore::new();
        let a = store.create_user("A", "a@x.io", "h").await.unwrap();
        let b = store.create_user("B", "b@x.io", "h").await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
    }
}
