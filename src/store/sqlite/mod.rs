use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::search::KnowledgeCandidate;
use crate::store::sqlite::models::{ChatRecord, KnowledgeRecord, NewChatRecord, NewKnowledgeRecord};
use crate::store::sqlite::queries::{ChatQueries, KnowledgeQueries};


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// File name of the database inside the configuration directory
pub const DATABASE_FILE: &str = "knowledge.db";

#[derive(Debug, Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let database = Self { pool };
        database.run_migrations().await?;

        Ok(database)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    #[inline]
    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations");

        sqlx::migrate!("src/store/sqlite/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Database migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn initialize_from_config_dir(config_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                config_dir.display()
            )
        })?;

        Self::new(config_dir.join(DATABASE_FILE)).await
    }

    // Knowledge operations
    #[inline]
    pub async fn insert_knowledge(&self, record: NewKnowledgeRecord) -> Result<KnowledgeRecord> {
        KnowledgeQueries::create(&self.pool, record).await
    }

    #[inline]
    pub async fn insert_knowledge_batch(
        &self,
        records: Vec<NewKnowledgeRecord>,
    ) -> Result<Vec<KnowledgeRecord>> {
        KnowledgeQueries::create_batch(&self.pool, records).await
    }

    #[inline]
    pub async fn count_knowledge(&self, owner_id: i64) -> Result<i64> {
        KnowledgeQueries::count_for_owner(&self.pool, owner_id).await
    }

    #[inline]
    pub async fn list_knowledge(&self, owner_id: i64) -> Result<Vec<KnowledgeRecord>> {
        KnowledgeQueries::list_by_owner(&self.pool, owner_id).await
    }

    #[inline]
    pub async fn knowledge_candidates(&self, owner_id: i64) -> Result<Vec<KnowledgeCandidate>> {
        KnowledgeQueries::candidates_for_owner(&self.pool, owner_id).await
    }

    #[inline]
    pub async fn delete_knowledge(&self, id: i64, owner_id: i64) -> Result<bool> {
        KnowledgeQueries::delete_for_owner(&self.pool, id, owner_id).await
    }

    // Chat history operations
    #[inline]
    pub async fn insert_chat(&self, record: NewChatRecord) -> Result<ChatRecord> {
        ChatQueries::create(&self.pool, record).await
    }

    #[inline]
    pub async fn recent_chats(&self, owner_id: i64, limit: usize) -> Result<Vec<ChatRecord>> {
        ChatQueries::recent_for_owner(&self.pool, owner_id, limit).await
    }
}
