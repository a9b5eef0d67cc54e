
use super::models::{CandidateRow, ChatRecord, KnowledgeRecord, NewChatRecord, NewKnowledgeRecord};
use crate::search::KnowledgeCandidate;
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

pub struct KnowledgeQueries;

impl KnowledgeQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, record: NewKnowledgeRecord) -> Result<KnowledgeRecord> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            "INSERT INTO knowledge (owner_id, title, content, embedding, source, created_date) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(record.owner_id)
        .bind(&record.title)
        .bind(&record.content)
        .bind(&record.embedding)
        .bind(&record.source)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create knowledge record")?
        .last_insert_rowid();

        Self::get_for_owner(pool, id, record.owner_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created knowledge record"))
    }

    /// Insert every record in one transaction; on any failure nothing is stored
    #[inline]
    pub async fn create_batch(
        pool: &SqlitePool,
        records: Vec<NewKnowledgeRecord>,
    ) -> Result<Vec<KnowledgeRecord>> {
        let mut transaction = pool
            .begin()
            .await
            .context("Failed to begin transaction for batch knowledge insert")?;

        let now = Utc::now().naive_utc();
        let mut created = Vec::with_capacity(records.len());

        for record in records {
            let id = sqlx::query(
                "INSERT INTO knowledge (owner_id, title, content, embedding, source, created_date) VALUES (?, ?, ?, ?, ?, ?)",
            )
            .bind(record.owner_id)
            .bind(&record.title)
            .bind(&record.content)
            .bind(&record.embedding)
            .bind(&record.source)
            .bind(now)
            .execute(&mut *transaction)
            .await
            .with_context(|| format!("Failed to create knowledge record '{}'", record.title))?
            .last_insert_rowid();

            let row = sqlx::query_as::<_, KnowledgeRecord>(
                r#"
                SELECT id, owner_id, title, content, embedding, source, created_date
                FROM knowledge WHERE id = ?
                "#,
            )
            .bind(id)
            .fetch_one(&mut *transaction)
            .await
            .context("Failed to retrieve created knowledge record")?;

            created.push(row);
        }

        transaction
            .commit()
            .await
            .context("Failed to commit batch knowledge insert")?;

        debug!("Inserted {} knowledge records in one batch", created.len());
        Ok(created)
    }

    #[inline]
    pub async fn get_for_owner(
        pool: &SqlitePool,
        id: i64,
        owner_id: i64,
    ) -> Result<Option<KnowledgeRecord>> {
        let result = sqlx::query_as::<_, KnowledgeRecord>(
            r#"
            SELECT id, owner_id, title, content, embedding, source, created_date
            FROM knowledge WHERE id = ? AND owner_id = ?
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get knowledge record")?;

        Ok(result)
    }

    /// Newest first
    #[inline]
    pub async fn list_by_owner(pool: &SqlitePool, owner_id: i64) -> Result<Vec<KnowledgeRecord>> {
        let records = sqlx::query_as::<_, KnowledgeRecord>(
            r#"
            SELECT id, owner_id, title, content, embedding, source, created_date
            FROM knowledge WHERE owner_id = ?
            ORDER BY created_date DESC, id DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .context("Failed to list knowledge records")?;

        Ok(records)
    }

    /// Every record of one owner, in insertion order, ready for ranking
    #[inline]
    pub async fn candidates_for_owner(
        pool: &SqlitePool,
        owner_id: i64,
    ) -> Result<Vec<KnowledgeCandidate>> {
        let rows = sqlx::query_as::<_, CandidateRow>(
            "SELECT id, content, embedding FROM knowledge WHERE owner_id = ? ORDER BY id",
        )
        .bind(owner_id)
        .fetch_all(pool)
        .await
        .context("Failed to load knowledge candidates")?;

        debug!("Loaded {} candidates for owner {}", rows.len(), owner_id);
        Ok(rows.into_iter().map(KnowledgeCandidate::from).collect())
    }

    /// Delete one record; returns false when it does not exist or belongs to someone else
    #[inline]
    pub async fn delete_for_owner(pool: &SqlitePool, id: i64, owner_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM knowledge WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(pool)
            .await
            .context("Failed to delete knowledge record")?;

        Ok(result.rows_affected() > 0)
    }

    #[inline]
    pub async fn count_for_owner(pool: &SqlitePool, owner_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_one(pool)
            .await
            .context("Failed to count knowledge records")?;

        Ok(count)
    }
}

pub struct ChatQueries;

impl ChatQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, record: NewChatRecord) -> Result<ChatRecord> {
        let now = Utc::now().naive_utc();
        let id = sqlx::query(
            "INSERT INTO chats (owner_id, message, reply, created_date) VALUES (?, ?, ?, ?)",
        )
        .bind(record.owner_id)
        .bind(&record.message)
        .bind(&record.reply)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to save chat exchange")?
        .last_insert_rowid();

        let created = sqlx::query_as::<_, ChatRecord>(
            "SELECT id, owner_id, message, reply, created_date FROM chats WHERE id = ?",
        )
        .bind(id)
        .fetch_one(pool)
        .await
        .context("Failed to retrieve saved chat exchange")?;

        Ok(created)
    }

    /// The `limit` most recent exchanges of one owner, newest first
    #[inline]
    pub async fn recent_for_owner(
        pool: &SqlitePool,
        owner_id: i64,
        limit: usize,
    ) -> Result<Vec<ChatRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let records = sqlx::query_as::<_, ChatRecord>(
            r#"
            SELECT id, owner_id, message, reply, created_date
            FROM chats WHERE owner_id = ?
            ORDER BY created_date DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .fetch_all(pool)
        .await
        .context("Failed to load chat history")?;

        Ok(records)
    }
}
