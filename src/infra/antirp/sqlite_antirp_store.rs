use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

use crate::core::antirp::{AntiRpConfig, AntiRpError, AntiRpStore};

pub struct SqliteAntiRpStore {
    pool: Pool<Sqlite>,
}

impl SqliteAntiRpStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), AntiRpError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS antirp_config (
                guild_id INTEGER PRIMARY KEY,
                enabled BOOLEAN NOT NULL DEFAULT 0,
                whitelist TEXT NOT NULL DEFAULT '[]'
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| AntiRpError::StorageError(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl AntiRpStore for SqliteAntiRpStore {
    async fn get_config(&self, guild_id: u64) -> Result<AntiRpConfig, AntiRpError> {
        let row = sqlx::query("SELECT enabled, whitelist FROM antirp_config WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AntiRpError::StorageError(e.to_string()))?;

        let Some(row) = row else {
            return Ok(AntiRpConfig::default());
        };

        let whitelist: String = row.get("whitelist");
        Ok(AntiRpConfig {
            enabled: row.get("enabled"),
            whitelist: serde_json::from_str(&whitelist)
                .map_err(|e| AntiRpError::StorageError(e.to_string()))?,
        })
    }

    async fn save_config(&self, guild_id: u64, config: AntiRpConfig) -> Result<(), AntiRpError> {
        let whitelist = serde_json::to_string(&config.whitelist)
            .map_err(|e| AntiRpError::StorageError(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO antirp_config (guild_id, enabled, whitelist)
            VALUES (?, ?, ?)
            ON CONFLICT(guild_id) DO UPDATE SET
                enabled = excluded.enabled,
                whitelist = excluded.whitelist
            "#,
        )
        .bind(guild_id as i64)
        .bind(config.enabled)
        .bind(whitelist)
        .execute(&self.pool)
        .await
        .map_err(|e| AntiRpError::StorageError(e.to_string()))?;
        Ok(())
    }
}
