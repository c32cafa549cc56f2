use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

use crate::core::credentials::{CredentialError, CredentialStore};

/// Shared API secrets keyed by `(service, key)`.
pub struct SqliteCredentialStore {
    pool: Pool<Sqlite>,
}

impl SqliteCredentialStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), CredentialError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS api_credentials (
                service TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                PRIMARY KEY (service, key)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| CredentialError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn get(&self, service: &str, key: &str) -> Result<Option<String>, CredentialError> {
        let row = sqlx::query("SELECT value FROM api_credentials WHERE service = ? AND key = ?")
            .bind(service)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| CredentialError::StorageError(e.to_string()))?;

        Ok(row.map(|row| row.get("value")))
    }

    async fn set(&self, service: &str, key: &str, value: &str) -> Result<(), CredentialError> {
        sqlx::query(
            r#"
            INSERT INTO api_credentials (service, key, value)
            VALUES (?, ?, ?)
            ON CONFLICT(service, key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(service)
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| CredentialError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_set_overwrites_value() {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        let store = SqliteCredentialStore::new(pool);
        store.migrate().await.unwrap();

        assert!(store.get("github", "token").await.unwrap().is_none());

        store.set("github", "token", "first").await.unwrap();
        store.set("github", "token", "second").await.unwrap();
        assert_eq!(
            store.get("github", "token").await.unwrap().as_deref(),
            Some("second")
        );
        assert!(store.get("sentry", "token").await.unwrap().is_none());
    }
}
