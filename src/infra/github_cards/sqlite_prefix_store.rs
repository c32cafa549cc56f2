use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

use crate::core::github_cards::{GithubCardsError, PrefixStore, RepoRef};

pub struct SqlitePrefixStore {
    pool: Pool<Sqlite>,
}

impl SqlitePrefixStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<(), GithubCardsError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS github_prefixes (
                guild_id INTEGER NOT NULL,
                prefix TEXT NOT NULL,
                owner TEXT NOT NULL,
                repo TEXT NOT NULL,
                PRIMARY KEY (guild_id, prefix)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| GithubCardsError::Store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl PrefixStore for SqlitePrefixStore {
    async fn all_prefixes(
        &self,
    ) -> Result<HashMap<u64, HashMap<String, RepoRef>>, GithubCardsError> {
        let rows = sqlx::query("SELECT guild_id, prefix, owner, repo FROM github_prefixes")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GithubCardsError::Store(e.to_string()))?;

        let mut guilds: HashMap<u64, HashMap<String, RepoRef>> = HashMap::new();
        for row in rows {
            let guild_id = row.get::<i64, _>("guild_id") as u64;
            guilds.entry(guild_id).or_default().insert(
                row.get("prefix"),
                RepoRef::new(row.get::<String, _>("owner"), row.get::<String, _>("repo")),
            );
        }
        Ok(guilds)
    }

    async fn guild_prefixes(
        &self,
        guild_id: u64,
    ) -> Result<HashMap<String, RepoRef>, GithubCardsError> {
        let rows = sqlx::query("SELECT prefix, owner, repo FROM github_prefixes WHERE guild_id = ?")
            .bind(guild_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| GithubCardsError::Store(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.get("prefix"),
                    RepoRef::new(row.get::<String, _>("owner"), row.get::<String, _>("repo")),
                )
            })
            .collect())
    }

    async fn insert_prefix(
        &self,
        guild_id: u64,
        prefix: &str,
        repo: &RepoRef,
    ) -> Result<bool, GithubCardsError> {
        let result = sqlx::query(
            r#"
            INSERT INTO github_prefixes (guild_id, prefix, owner, repo)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(guild_id, prefix) DO NOTHING
            "#,
        )
        .bind(guild_id as i64)
        .bind(prefix)
        .bind(&repo.owner)
        .bind(&repo.repo)
        .execute(&self.pool)
        .await
        .map_err(|e| GithubCardsError::Store(e.to_string()))?;

        Ok(result.rows_affected() == 1)
    }

    async fn remove_prefix(&self, guild_id: u64, prefix: &str) -> Result<(), GithubCardsError> {
        sqlx::query("DELETE FROM github_prefixes WHERE guild_id = ? AND prefix = ?")
            .bind(guild_id as i64)
            .bind(prefix)
            .execute(&self.pool)
            .await
            .map_err(|e| GithubCardsError::Store(e.to_string()))?;
        Ok(())
    }
}
