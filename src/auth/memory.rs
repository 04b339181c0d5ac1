//! In-memory user store used by the test suite.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::repo::{StoreError, UserStore};
use crate::auth::repo_types::{NewUser, User};

#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<Uuid, User>>,
    /// email -> user ID, mirrors the unique index
    email_index: RwLock<HashMap<String, Uuid>>,
    calls: AtomicUsize,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of store operations performed so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn touch(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.touch();
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.touch();
        let id = self.email_index.read().await.get(email).copied();
        match id {
            Some(id) => Ok(self.users.read().await.get(&id).cloned()),
            None => Ok(None),
        }
    }

    async fn exists_by_email(&self, email: &str) -> Result<bool, StoreError> {
        self.touch();
        Ok(self.email_index.read().await.contains_key(email))
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        self.touch();
        let mut users = self.users.write().await;
        let mut index = self.email_index.write().await;
        if index.contains_key(&user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        index.insert(created.email.clone(), created.id);
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(&self, user: &User) -> Result<User, StoreError> {
        self.touch();
        let mut users = self.users.write().await;
        let mut index = self.email_index.write().await;
        let old_email = match users.get(&user.id) {
            Some(existing) => existing.email.clone(),
            None => return Err(StoreError::NotFound),
        };
        if old_email != user.email {
            if index.contains_key(&user.email) {
                return Err(StoreError::DuplicateEmail);
            }
            index.remove(&old_email);
            index.insert(user.email.clone(), user.id);
        }
        users.insert(user.id, user.clone());
        Ok(user.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        self.touch();
        let mut users = self.users.write().await;
        let mut index = self.email_index.write().await;
        match users.remove(&id) {
            Some(user) => {
                index.remove(&user.email);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            password_hash: "$argon2id$placeholder".into(),
        }
    }

    #[tokio::test]
    async fn create_enforces_unique_email() {
        let store = InMemoryUserStore::new();
        store.create(new_user("a@x.com")).await.unwrap();
        let err = store.create(new_user("a@x.com")).await.unwrap_err();
        assert!(matches!(err, StoreError::DuplicateEmail));
    }

    #[tokio::test]
    async fn update_moves_email_index_and_rejects_collisions() {
        let store = InMemoryUserStore::new();
        let mut a = store.create(new_user("a@x.com")).await.unwrap();
        store.create(new_user("b@x.com")).await.unwrap();

        a.email = "b@x.com".into();
        assert!(matches!(store.update(&a).await, Err(StoreError::DuplicateEmail)));

        a.email = "c@x.com".into();
        store.update(&a).await.unwrap();
        assert!(!store.exists_by_email("a@x.com").await.unwrap());
        assert_eq!(store.find_by_email("c@x.com").await.unwrap().unwrap().id, a.id);
    }

    #[tokio::test]
    async fn update_missing_user_is_not_found() {
        let store = InMemoryUserStore::new();
        let ghost = User {
            id: Uuid::new_v4(),
            email: "ghost@x.com".into(),
            password_hash: String::new(),
            created_at: OffsetDateTime::now_utc(),
        };
        assert!(matches!(store.update(&ghost).await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn delete_frees_the_email() {
        let store = InMemoryUserStore::new();
        let a = store.create(new_user("a@x.com")).await.unwrap();
        assert!(store.delete(a.id).await.unwrap());
        assert!(!store.delete(a.id).await.unwrap());
        assert!(store.find_by_id(a.id).await.unwrap().is_none());
        store.create(new_user("a@x.com")).await.unwrap();
    }
}
