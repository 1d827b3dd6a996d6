use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::info;

use super::HistoryStore;
use crate::config::HistoryConfig;
use crate::error::{StoreError, StoreResult};
use crate::schema::FinalBrief;

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Briefs retained per user; older entries are pruned on append.
const MAX_BRIEFS_PER_USER: i64 = 10;

/// SQLite-backed brief history
#[derive(Clone)]
pub struct SqliteHistoryStore {
    pool: SqlitePool,
}

impl SqliteHistoryStore {
    /// Create a new SQLite history store
    pub async fn new(config: &HistoryConfig) -> StoreResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StoreError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StoreResult<()> {
        info!("Running database migrations...");

        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Migration {
                message: format!("Failed to run migrations: {}", e),
            })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[derive(sqlx::FromRow)]
struct BriefRow {
    payload: String,
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn list(&self, user_id: &str) -> StoreResult<Vec<FinalBrief>> {
        let rows: Vec<BriefRow> = sqlx::query_as(
            r#"
            SELECT payload
            FROM briefs
            WHERE user_id = ?
            ORDER BY id DESC
            LIMIT ?
            "#,
        )
        .bind(user_id)
        .bind(MAX_BRIEFS_PER_USER)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                serde_json::from_str(&row.payload).map_err(|e| StoreError::Serialization {
                    message: format!("Stored brief is not deserializable: {}", e),
                })
            })
            .collect()
    }

    async fn append(&self, user_id: &str, brief: &FinalBrief) -> StoreResult<()> {
        let payload = serde_json::to_string(brief).map_err(|e| StoreError::Serialization {
            message: format!("Brief is not serializable: {}", e),
        })?;

        sqlx::query(
            r#"
            INSERT INTO briefs (brief_id, user_id, topic, payload, generated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&brief.id)
        .bind(user_id)
        .bind(&brief.topic)
        .bind(&payload)
        .bind(brief.generated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        // Keep only the newest entries per user
        sqlx::query(
            r#"
            DELETE FROM briefs
            WHERE user_id = ?
              AND id NOT IN (
                SELECT id FROM briefs
                WHERE user_id = ?
                ORDER BY id DESC
                LIMIT ?
              )
            "#,
        )
        .bind(user_id)
        .bind(user_id)
        .bind(MAX_BRIEFS_PER_USER)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
