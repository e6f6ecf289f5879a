//! Storage layer: SQLite result store.
//!
//! Holds DB pool setup, the migration runner and the queries used to record
//! and read back matching runs.

use anyhow::Context;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;

pub mod models;
pub mod results;

pub async fn connect(database_url: &str) -> anyhow::Result<SqlitePool> {
    let mut url = database_url.to_string();
    if !database_url.starts_with("sqlite:") {
        let path = std::path::PathBuf::from(database_url);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating database directory {}", parent.display()))?;
        }
        let norm = path.to_string_lossy().replace('\\', "/");
        if path.is_absolute() {
            url = format!("sqlite:///{}", norm.trim_start_matches('/'));
        } else {
            url = format!("sqlite://{}", norm);
        }
    }
    let connect_opts = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
    let mut opts = SqlitePoolOptions::new();
    if url.contains("memory") {
        opts = opts.max_connections(1);
    } else {
        opts = opts.max_connections(5);
    }
    let pool = opts.connect_with(connect_opts).await?;
    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> anyhow::Result<()> {
    // Applies SQLx migrations located in crates/storage/migrations.
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("nested").join("runs.db");
        let pool = connect(&db.to_string_lossy()).await.unwrap();
        migrate(&pool).await.unwrap();
        assert!(db.exists());
    }

    #[tokio::test]
    async fn unusable_parent_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not_a_dir");
        std::fs::write(&blocker, b"").unwrap();
        let db = blocker.join("runs.db");
        let err = connect(&db.to_string_lossy()).await.unwrap_err();
        assert!(format!("{:#}", err).contains("creating database directory"));
    }
}
