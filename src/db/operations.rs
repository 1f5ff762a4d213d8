use async_trait::async_trait;
use chrono::Utc;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

use crate::db::models::UserRecord;
use crate::error::{AppError, DatabaseError};
use crate::Result;

/// Schema under `migrations/`, embedded at compile time.
pub static MIGRATOR: Migrator = sqlx::migrate!();

const USER_COLUMNS: &str = "id, email, password_hash, display_name, role, is_active, \
                            is_verified, created_at, updated_at, last_login";

/// Lookups the auth core needs from whatever owns the accounts.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>>;

    /// `email` is already normalized (trimmed, lower-case).
    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    async fn touch_last_login(&self, id: i64) -> Result<()>;
}

pub struct PgUserStore {
    pool: Arc<PgPool>,
}

impl PgUserStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub async fn connect(
        url: &str,
        max_connections: u32,
        acquire_timeout: Duration,
    ) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await
            .map_err(|e| AppError::DatabaseError(DatabaseError::ConnectionError(e.to_string())))?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Applies any pending schema migrations.
    pub async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(self.pool.as_ref()).await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let user = sqlx::query_as::<_, UserRecord>(&format!(
            "SELECT {} FROM users WHERE email = $1",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(self.pool.as_ref())
        .await?;

        Ok(user)
    }

    async fn touch_last_login(&self, id: i64) -> Result<()> {
        sqlx::query("UPDATE users SET last_login = $1 WHERE id = $2")
            .bind(Utc::now())
            .bind(id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_users_migration_is_embedded() {
        let migrations: Vec<_> = MIGRATOR.iter().collect();
        assert_eq!(migrations.len(), 1);
        assert_eq!(migrations[0].version, 1);
        assert_eq!(migrations[0].description, "create users");
        assert!(migrations[0].sql.contains("CREATE TABLE"));
        assert!(migrations[0].sql.contains("users"));
    }
}
