//! SQLite-backed capture history: one row per processed screenshot plus the
//! PNG on disk next to it.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};

#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub id: i64,
    pub timestamp: String,
    pub image_path: PathBuf,
    pub prompt: String,
    pub raw_response: Option<String>,
    pub shortcut: String,
    pub output_type: String,
}

pub struct HistoryStore {
    pool: SqlitePool,
    screenshots_dir: PathBuf,
}

impl HistoryStore {
    /// Open (or create) the database and the screenshots directory.
    pub async fn open(db_path: &Path, screenshots_dir: &Path) -> Result<Self> {
        tokio::fs::create_dir_all(screenshots_dir)
            .await
            .context("Failed to create screenshots directory")?;

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options)
            .await
            .context("Failed to open history database")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS captures (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                image_path TEXT NOT NULL,
                prompt TEXT NOT NULL,
                raw_response TEXT,
                shortcut TEXT NOT NULL,
                output_type TEXT DEFAULT 'latex'
            )",
        )
        .execute(&pool)
        .await?;

        Ok(Self {
            pool,
            screenshots_dir: screenshots_dir.to_path_buf(),
        })
    }

    /// Insert the row first so SQLite assigns the id, name the image file
    /// after it, then point the row at the file.
    pub async fn save_entry(
        &self,
        png: &[u8],
        prompt: &str,
        raw_response: &str,
        shortcut: &str,
    ) -> Result<i64> {
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query(
            "INSERT INTO captures (timestamp, image_path, prompt, raw_response, shortcut, output_type)
             VALUES (?, '', ?, ?, ?, 'latex')
             RETURNING id",
        )
        .bind(&timestamp)
        .bind(prompt)
        .bind(raw_response)
        .bind(shortcut)
        .fetch_one(&mut *conn)
        .await?;
        let id: i64 = row.get("id");

        let filename = format!("{id}_{timestamp}.png");
        tokio::fs::write(self.screenshots_dir.join(&filename), png)
            .await
            .context("Failed to write screenshot file")?;

        sqlx::query("UPDATE captures SET image_path = ? WHERE id = ?")
            .bind(&filename)
            .bind(id)
            .execute(&mut *conn)
            .await?;

        tracing::debug!("saved history entry {} ({})", id, filename);
        Ok(id)
    }

    /// All entries, newest first; stored relative paths are resolved against
    /// the screenshots directory.
    pub async fn entries(&self) -> Result<Vec<HistoryEntry>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query(
            "SELECT id, timestamp, image_path, prompt, raw_response, shortcut, output_type
             FROM captures
             ORDER BY timestamp DESC, id DESC",
        )
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let stored: String = row.get("image_path");
                let stored = PathBuf::from(stored);
                let image_path = if stored.is_absolute() {
                    stored
                } else {
                    self.screenshots_dir.join(stored)
                };
                HistoryEntry {
                    id: row.get("id"),
                    timestamp: row.get("timestamp"),
                    image_path,
                    prompt: row.get("prompt"),
                    raw_response: row.get("raw_response"),
                    shortcut: row.get("shortcut"),
                    output_type: row.get("output_type"),
                }
            })
            .collect())
    }

    /// Drop every entry and the saved screenshots.
    pub async fn reset(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.screenshots_dir).await? {
            tokio::fs::remove_dir_all(&self.screenshots_dir)
                .await
                .context("Failed to remove screenshots directory")?;
        }
        tokio::fs::create_dir_all(&self.screenshots_dir).await?;

        let mut conn = self.pool.acquire().await?;
        sqlx::query("DELETE FROM captures").execute(&mut *conn).await?;
        tracing::info!("history reset");
        Ok(())
    }
}
