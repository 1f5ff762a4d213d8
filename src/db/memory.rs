use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::db::models::UserRecord;
use crate::db::operations::UserStore;
use crate::error::{AppError, DatabaseError};
use crate::Result;

/// Process-local user table. Used by tests and embedders without a database.
#[derive(Default)]
pub struct InMemoryUserStore {
    users: RwLock<HashMap<i64, UserRecord>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: UserRecord) {
        self.users.write().await.insert(user.id, user);
    }

    pub async fn set_active(&self, id: i64, active: bool) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or(AppError::DatabaseError(DatabaseError::NotFound))?;
        user.is_active = active;
        user.updated_at = Utc::now();
        Ok(())
    }

    pub async fn set_role(&self, id: i64, role: &str) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or(AppError::DatabaseError(DatabaseError::NotFound))?;
        user.role = role.to_string();
        user.updated_at = Utc::now();
        Ok(())
    }

    pub async fn remove(&self, id: i64) -> Option<UserRecord> {
        self.users.write().await.remove(&id)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn touch_last_login(&self, id: i64) -> Result<()> {
        let mut users = self.users.write().await;
        let user = users
            .get_mut(&id)
            .ok_or(AppError::DatabaseError(DatabaseError::NotFound))?;
        user.last_login = Some(Utc::now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_lookup_and_touch() {
        let store = InMemoryUserStore::new();
        store
            .insert(UserRecord::new(1, "vet@test.com", "hash".into(), "veterinario"))
            .await;

        let by_email = store.find_by_email("vet@test.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(1));
        assert!(store.find_by_email("other@test.com").await.unwrap().is_none());

        store.touch_last_login(1).await.unwrap();
        let user = store.find_by_id(1).await.unwrap().unwrap();
        assert!(user.last_login.is_some());
    }

    #[tokio::test]
    async fn test_mutations_on_missing_user_fail() {
        let store = InMemoryUserStore::new();
        assert!(store.touch_last_login(42).await.is_err());
        assert!(store.set_active(42, false).await.is_err());
    }
}
