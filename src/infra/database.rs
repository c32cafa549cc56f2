use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite};

pub const DATABASE_FILE: &str = "sentinel.db";

/// Open (creating if needed) the bot database inside `data_dir`.
pub async fn open_pool(data_dir: &Path) -> Result<Pool<Sqlite>, sqlx::Error> {
    std::fs::create_dir_all(data_dir)?;
    let path = data_dir.join(DATABASE_FILE);
    let pool = SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await?;
    tracing::info!(path = %path.display(), "Opened SQLite database");
    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_pool_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("nested");

        let pool = open_pool(&data_dir).await.unwrap();
        sqlx::query("SELECT 1").execute(&pool).await.unwrap();

        assert!(data_dir.join(DATABASE_FILE).exists());
    }
}
