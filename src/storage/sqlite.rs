//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::content::{ContentItem, ContentKind, ParentInfo, Platform};
use crate::state::{BatchStatus, JobStatus};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{BatchResultRecord, BatchRunRecord, DeleteSummary, JobRecord, ParentRecord};
use crate::ScopeError;
use chrono::Utc;
use rusqlite::types::Type;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const JOB_COLUMNS: &str = "analysis_id, subject_id, display_name, status, progress, \
                           error_message, created_at, updated_at";

const PARENT_COLUMNS: &str = "analysis_id, platform, subject_id, username, display_name, \
                              description, profile_url, avatar_url, audience_size, \
                              following_count, media_count, total_views, is_verified, \
                              is_private, uploads_playlist_id, fetched_at";

const ITEM_COLUMNS: &str = "item_id, kind, url, thumbnail_url, caption, view_count, like_count, \
                            comment_count, date_posted, duration_seconds, hashtags, mentions";

const BATCH_COLUMNS: &str = "id, status, total_urls, processed, succeeded, failed, \
                             error_message, started_at, finished_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> Result<Self, ScopeError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> Result<Self, ScopeError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }
}

fn json_column(index: usize, raw: String) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn job_from_row(row: &Row<'_>) -> rusqlite::Result<JobRecord> {
    Ok(JobRecord {
        analysis_id: row.get(0)?,
        subject_id: row.get(1)?,
        display_name: row.get(2)?,
        status: JobStatus::from_db_string(&row.get::<_, String>(3)?).unwrap_or(JobStatus::Failed),
        progress: row.get(4)?,
        error_message: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn parent_from_row(row: &Row<'_>) -> rusqlite::Result<ParentRecord> {
    let platform =
        Platform::from_db_string(&row.get::<_, String>(1)?).unwrap_or(Platform::YouTube);

    Ok(ParentRecord {
        analysis_id: row.get(0)?,
        info: ParentInfo {
            platform,
            subject_id: row.get(2)?,
            username: row.get(3)?,
            display_name: row.get(4)?,
            description: row.get(5)?,
            profile_url: row.get(6)?,
            avatar_url: row.get(7)?,
            audience_size: row.get(8)?,
            following_count: row.get(9)?,
            media_count: row.get(10)?,
            total_views: row.get(11)?,
            is_verified: row.get(12)?,
            is_private: row.get(13)?,
            uploads_playlist_id: row.get(14)?,
        },
        fetched_at: row.get(15)?,
    })
}

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<ContentItem> {
    Ok(ContentItem {
        item_id: row.get(0)?,
        kind: ContentKind::from_db_string(&row.get::<_, String>(1)?).unwrap_or(ContentKind::Post),
        url: row.get(2)?,
        thumbnail_url: row.get(3)?,
        caption: row.get(4)?,
        view_count: row.get(5)?,
        like_count: row.get(6)?,
        comment_count: row.get(7)?,
        date_posted: row.get(8)?,
        duration_seconds: row.get(9)?,
        hashtags: json_column(10, row.get(10)?)?,
        mentions: json_column(11, row.get(11)?)?,
    })
}

fn batch_from_row(row: &Row<'_>) -> rusqlite::Result<BatchRunRecord> {
    Ok(BatchRunRecord {
        id: row.get(0)?,
        status: BatchStatus::from_db_string(&row.get::<_, String>(1)?)
            .unwrap_or(BatchStatus::Failed),
        total_urls: row.get(2)?,
        processed: row.get(3)?,
        succeeded: row.get(4)?,
        failed: row.get(5)?,
        error_message: row.get(6)?,
        started_at: row.get(7)?,
        finished_at: row.get(8)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Analyses =====

    fn insert_job(
        &mut self,
        analysis_id: &str,
        subject_id: &str,
        display_name: &str,
    ) -> StorageResult<JobRecord> {
        let now = Utc::now();
        let result = self.conn.execute(
            "INSERT INTO analyses (analysis_id, subject_id, display_name, status, progress,
             created_at, updated_at) VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)",
            params![
                analysis_id,
                subject_id,
                display_name,
                JobStatus::Pending.to_db_string(),
                now
            ],
        );

        match result {
            Ok(_) => Ok(JobRecord {
                analysis_id: analysis_id.to_string(),
                subject_id: subject_id.to_string(),
                display_name: display_name.to_string(),
                status: JobStatus::Pending,
                progress: 0,
                error_message: None,
                created_at: now,
                updated_at: now,
            }),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                Err(StorageError::DuplicateAnalysis(analysis_id.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn get_job(&self, analysis_id: &str) -> StorageResult<Option<JobRecord>> {
        let job = self
            .conn
            .query_row(
                &format!("SELECT {} FROM analyses WHERE analysis_id = ?1", JOB_COLUMNS),
                params![analysis_id],
                job_from_row,
            )
            .optional()?;
        Ok(job)
    }

    fn update_job_status(
        &mut self,
        analysis_id: &str,
        status: JobStatus,
        progress: u8,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE analyses SET status = ?1, progress = ?2, error_message = ?3, updated_at = ?4
             WHERE analysis_id = ?5",
            params![
                status.to_db_string(),
                progress,
                error_message,
                Utc::now(),
                analysis_id
            ],
        )?;

        if changed == 0 {
            return Err(StorageError::AnalysisNotFound(analysis_id.to_string()));
        }
        Ok(())
    }

    fn update_job_identity(
        &mut self,
        analysis_id: &str,
        subject_id: &str,
        display_name: &str,
    ) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE analyses SET subject_id = ?1, display_name = ?2, updated_at = ?3
             WHERE analysis_id = ?4",
            params![subject_id, display_name, Utc::now(), analysis_id],
        )?;

        if changed == 0 {
            return Err(StorageError::AnalysisNotFound(analysis_id.to_string()));
        }
        Ok(())
    }

    fn list_jobs(&self, limit: usize) -> StorageResult<Vec<JobRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM analyses ORDER BY created_at DESC, rowid DESC LIMIT ?1",
            JOB_COLUMNS
        ))?;

        let jobs = stmt
            .query_map(params![limit], job_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(jobs)
    }

    fn delete_job(&mut self, analysis_id: &str) -> StorageResult<DeleteSummary> {
        let tx = self.conn.transaction()?;

        let items = tx.execute(
            "DELETE FROM content_items WHERE analysis_id = ?1",
            params![analysis_id],
        )?;
        let parents = tx.execute(
            "DELETE FROM parents WHERE analysis_id = ?1",
            params![analysis_id],
        )?;
        let jobs = tx.execute(
            "DELETE FROM analyses WHERE analysis_id = ?1",
            params![analysis_id],
        )?;

        tx.commit()?;

        Ok(DeleteSummary {
            jobs,
            parents,
            items,
        })
    }

    // ===== Parent records =====

    fn upsert_parent(&mut self, analysis_id: &str, parent: &ParentInfo) -> StorageResult<()> {
        self.conn.execute(
            &format!(
                "INSERT OR REPLACE INTO parents ({}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                PARENT_COLUMNS
            ),
            params![
                analysis_id,
                parent.platform.to_db_string(),
                parent.subject_id,
                parent.username,
                parent.display_name,
                parent.description,
                parent.profile_url,
                parent.avatar_url,
                parent.audience_size,
                parent.following_count,
                parent.media_count,
                parent.total_views,
                parent.is_verified,
                parent.is_private,
                parent.uploads_playlist_id,
                Utc::now(),
            ],
        )?;
        Ok(())
    }

    fn get_parent(&self, analysis_id: &str) -> StorageResult<Option<ParentRecord>> {
        let parent = self
            .conn
            .query_row(
                &format!("SELECT {} FROM parents WHERE analysis_id = ?1", PARENT_COLUMNS),
                params![analysis_id],
                parent_from_row,
            )
            .optional()?;
        Ok(parent)
    }

    // ===== Content items =====

    fn insert_content_items(
        &mut self,
        analysis_id: &str,
        items: &[ContentItem],
    ) -> StorageResult<usize> {
        let tx = self.conn.transaction()?;
        let mut written = 0;

        {
            let mut stmt = tx.prepare(&format!(
                "INSERT OR REPLACE INTO content_items (analysis_id, {}) VALUES
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
                ITEM_COLUMNS
            ))?;

            for item in items {
                let hashtags = serde_json::to_string(&item.hashtags)?;
                let mentions = serde_json::to_string(&item.mentions)?;

                written += stmt.execute(params![
                    analysis_id,
                    item.item_id,
                    item.kind.to_db_string(),
                    item.url,
                    item.thumbnail_url,
                    item.caption,
                    item.view_count,
                    item.like_count,
                    item.comment_count,
                    item.date_posted,
                    item.duration_seconds,
                    hashtags,
                    mentions,
                ])?;
            }
        }

        tx.commit()?;
        Ok(written)
    }

    fn get_content_items(&self, analysis_id: &str) -> StorageResult<Vec<ContentItem>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM content_items WHERE analysis_id = ?1 ORDER BY id",
            ITEM_COLUMNS
        ))?;

        let items = stmt
            .query_map(params![analysis_id], item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    fn count_content_items(&self, analysis_id: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM content_items WHERE analysis_id = ?1",
            params![analysis_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Batch runs =====

    fn create_batch_run(&mut self, total_urls: usize) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO batch_runs (status, total_urls, started_at) VALUES (?1, ?2, ?3)",
            params![BatchStatus::Running.to_db_string(), total_urls, Utc::now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn record_batch_result(
        &mut self,
        batch_id: i64,
        url: &str,
        outcome: Result<&ContentItem, &str>,
    ) -> StorageResult<()> {
        let (item_json, error_message) = match outcome {
            Ok(item) => (Some(serde_json::to_string(item)?), None),
            Err(message) => (None, Some(message)),
        };
        let succeeded = i64::from(item_json.is_some());

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO batch_results (batch_id, url, item_json, error_message)
             VALUES (?1, ?2, ?3, ?4)",
            params![batch_id, url, item_json, error_message],
        )?;
        let changed = tx.execute(
            "UPDATE batch_runs SET processed = processed + 1,
             succeeded = succeeded + ?1, failed = failed + ?2 WHERE id = ?3",
            params![succeeded, 1 - succeeded, batch_id],
        )?;
        if changed == 0 {
            return Err(StorageError::BatchNotFound(batch_id));
        }
        tx.commit()?;

        Ok(())
    }

    fn finish_batch_run(
        &mut self,
        batch_id: i64,
        status: BatchStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE batch_runs SET status = ?1, error_message = ?2, finished_at = ?3
             WHERE id = ?4",
            params![status.to_db_string(), error_message, Utc::now(), batch_id],
        )?;

        if changed == 0 {
            return Err(StorageError::BatchNotFound(batch_id));
        }
        Ok(())
    }

    fn get_batch_run(&self, batch_id: i64) -> StorageResult<Option<BatchRunRecord>> {
        let run = self
            .conn
            .query_row(
                &format!("SELECT {} FROM batch_runs WHERE id = ?1", BATCH_COLUMNS),
                params![batch_id],
                batch_from_row,
            )
            .optional()?;
        Ok(run)
    }

    fn get_batch_results(&self, batch_id: i64) -> StorageResult<Vec<BatchResultRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT url, item_json, error_message FROM batch_results
             WHERE batch_id = ?1 ORDER BY id",
        )?;

        let rows = stmt
            .query_map(params![batch_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, Option<String>>(1)?,
                    row.get::<_, Option<String>>(2)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut results = Vec::with_capacity(rows.len());
        for (url, item_json, error_message) in rows {
            let item = match item_json {
                Some(json) => Some(serde_json::from_str(&json)?),
                None => None,
            };
            results.push(BatchResultRecord {
                url,
                item,
                error_message,
            });
        }

        Ok(results)
    }

    // ===== Statistics =====

    fn count_jobs_by_status(&self) -> StorageResult<HashMap<JobStatus, u64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT status, COUNT(*) FROM analyses GROUP BY status")?;

        let rows = stmt.query_map([], |row| {
            let status: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            Ok((status, count))
        })?;

        let mut counts = HashMap::new();
        for row in rows {
            let (status, count) = row?;
            if let Some(status) = JobStatus::from_db_string(&status) {
                counts.insert(status, count as u64);
            }
        }

        Ok(counts)
    }

    fn count_total_items(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM content_items", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_parents(&self) -> StorageResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM parents", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
