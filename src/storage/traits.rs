//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::content::{ContentItem, ParentInfo};
use crate::state::{BatchStatus, JobStatus};
use crate::storage::{BatchResultRecord, BatchRunRecord, DeleteSummary, JobRecord, ParentRecord};
use std::collections::HashMap;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Analysis already exists: {0}")]
    DuplicateAnalysis(String),

    #[error("Analysis not found: {0}")]
    AnalysisNotFound(String),

    #[error("Batch run not found: {0}")]
    BatchNotFound(i64),

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Each analysis only ever touches rows carrying its own `analysis_id`, so
/// per-statement atomicity is all the tracker relies on. Multi-row writes
/// (bulk inserts, deletes) run in a transaction.
pub trait Storage {
    // ===== Analyses =====

    /// Inserts a `pending` analysis with progress 0
    ///
    /// Fails with `DuplicateAnalysis` if the id is taken.
    fn insert_job(
        &mut self,
        analysis_id: &str,
        subject_id: &str,
        display_name: &str,
    ) -> StorageResult<JobRecord>;

    /// Gets an analysis by id
    fn get_job(&self, analysis_id: &str) -> StorageResult<Option<JobRecord>>;

    /// Writes status, progress and error message, refreshing `updated_at`
    fn update_job_status(
        &mut self,
        analysis_id: &str,
        status: JobStatus,
        progress: u8,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Writes the resolved subject id and display name
    fn update_job_identity(
        &mut self,
        analysis_id: &str,
        subject_id: &str,
        display_name: &str,
    ) -> StorageResult<()>;

    /// Lists analyses, newest first
    fn list_jobs(&self, limit: usize) -> StorageResult<Vec<JobRecord>>;

    /// Removes an analysis with its parent and content rows
    ///
    /// A missing analysis yields an all-zero summary.
    fn delete_job(&mut self, analysis_id: &str) -> StorageResult<DeleteSummary>;

    // ===== Parent records =====

    /// Inserts or replaces the parent metadata of an analysis
    fn upsert_parent(&mut self, analysis_id: &str, parent: &ParentInfo) -> StorageResult<()>;

    /// Gets the parent metadata of an analysis
    fn get_parent(&self, analysis_id: &str) -> StorageResult<Option<ParentRecord>>;

    // ===== Content items =====

    /// Bulk-inserts items, replacing rows with the same item id
    ///
    /// # Returns
    ///
    /// The number of rows written
    fn insert_content_items(
        &mut self,
        analysis_id: &str,
        items: &[ContentItem],
    ) -> StorageResult<usize>;

    /// Gets every item of an analysis in insertion order
    fn get_content_items(&self, analysis_id: &str) -> StorageResult<Vec<ContentItem>>;

    /// Counts the items of an analysis
    fn count_content_items(&self, analysis_id: &str) -> StorageResult<u64>;

    // ===== Batch runs =====

    /// Starts a `running` batch run
    fn create_batch_run(&mut self, total_urls: usize) -> StorageResult<i64>;

    /// Records one URL outcome and bumps the run counters
    fn record_batch_result(
        &mut self,
        batch_id: i64,
        url: &str,
        outcome: Result<&ContentItem, &str>,
    ) -> StorageResult<()>;

    /// Moves a batch run to a terminal status
    fn finish_batch_run(
        &mut self,
        batch_id: i64,
        status: BatchStatus,
        error_message: Option<&str>,
    ) -> StorageResult<()>;

    /// Gets a batch run by id
    fn get_batch_run(&self, batch_id: i64) -> StorageResult<Option<BatchRunRecord>>;

    /// Gets the per-URL outcomes of a batch run
    fn get_batch_results(&self, batch_id: i64) -> StorageResult<Vec<BatchResultRecord>>;

    // ===== Statistics =====

    /// Counts analyses by status
    fn count_jobs_by_status(&self) -> StorageResult<HashMap<JobStatus, u64>>;

    /// Counts content items across all analyses
    fn count_total_items(&self) -> StorageResult<u64>;

    /// Counts stored parent records
    fn count_parents(&self) -> StorageResult<u64>;
}
