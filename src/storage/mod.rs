//! Storage module for persisting analyses
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Analysis job rows and their status/progress columns
//! - Parent (channel/profile) records and content items
//! - Bulk lookup runs and their per-URL outcomes

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::content::{ContentItem, ParentInfo};
use crate::state::{BatchStatus, JobStatus};
use crate::ScopeError;
use chrono::{DateTime, Utc};

use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> Result<SqliteStorage, ScopeError> {
    SqliteStorage::new(path)
}

/// One analysis row
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub analysis_id: String,

    /// `"unknown"` until the background task resolves the subject
    pub subject_id: String,

    pub display_name: String,
    pub status: JobStatus,
    pub progress: u8,

    /// Set only when `status` is `failed`
    pub error_message: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parent metadata stored for an analysis
#[derive(Debug, Clone, PartialEq)]
pub struct ParentRecord {
    pub analysis_id: String,
    pub info: ParentInfo,
    pub fetched_at: DateTime<Utc>,
}

/// Rows removed by a delete
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    pub jobs: usize,
    pub parents: usize,
    pub items: usize,
}

impl DeleteSummary {
    pub fn total(&self) -> usize {
        self.jobs + self.parents + self.items
    }
}

/// A bulk lookup run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRunRecord {
    pub id: i64,
    pub status: BatchStatus,
    pub total_urls: usize,
    pub processed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Outcome of one URL in a bulk lookup run
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResultRecord {
    pub url: String,
    pub item: Option<ContentItem>,
    pub error_message: Option<String>,
}
