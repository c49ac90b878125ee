//! Analysis job tracker
//!
//! Owns the status/progress state machine of analysis rows. `advance` is the
//! only path that changes `status`, `progress` or `error_message`; it checks
//! the requested values and the transition under one storage lock, so a
//! concurrent writer can never slip a change between the check and the write.
//!
//! # Policies
//!
//! - `advance` on a `completed` or `failed` job fails with
//!   `InvalidTransition` and leaves the row untouched.
//! - `completed` carries progress 100 and progress 100 means `completed`.
//! - `pending` carries progress 0.
//! - progress never decreases, except when moving to `failed` (which
//!   reports 0).
//! - an error message is required for `failed` and rejected otherwise.

mod ids;

pub use ids::{generate_analysis_id, ANALYSIS_ID_PREFIX};

use crate::state::JobStatus;
use crate::storage::{
    DeleteSummary, JobRecord, SqliteStorage, Storage, StorageError, StorageResult,
};
use crate::{Result, ScopeError};
use std::sync::{Arc, Mutex};

/// Progress value of a finished job
pub const PROGRESS_COMPLETE: u8 = 100;

/// Shared handle to the job rows
#[derive(Clone)]
pub struct JobTracker {
    storage: Arc<Mutex<SqliteStorage>>,
}

impl JobTracker {
    /// Creates a tracker owning `storage`
    pub fn new(storage: SqliteStorage) -> Self {
        Self::from_shared(Arc::new(Mutex::new(storage)))
    }

    /// Creates a tracker over storage shared with other components
    pub fn from_shared(storage: Arc<Mutex<SqliteStorage>>) -> Self {
        Self { storage }
    }

    /// Runs a read-only closure against the storage
    pub fn with_storage<T>(&self, f: impl FnOnce(&SqliteStorage) -> StorageResult<T>) -> Result<T> {
        let storage = self.storage.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(f(&storage)?)
    }

    /// Runs a mutating closure against the storage
    pub(crate) fn with_storage_mut<T>(
        &self,
        f: impl FnOnce(&mut SqliteStorage) -> StorageResult<T>,
    ) -> Result<T> {
        let mut storage = self.storage.lock().map_err(|_| StorageError::LockPoisoned)?;
        Ok(f(&mut storage)?)
    }

    /// Inserts a new job as `pending` with progress 0
    ///
    /// # Errors
    ///
    /// * `Validation` - an argument is empty
    /// * `DuplicateJob` - `analysis_id` already exists
    pub fn create_job(
        &self,
        analysis_id: &str,
        subject_id: &str,
        display_name: &str,
    ) -> Result<JobRecord> {
        require_non_empty("analysis_id", analysis_id)?;
        require_non_empty("subject_id", subject_id)?;
        require_non_empty("display_name", display_name)?;

        let job = self.with_storage_mut(|s| s.insert_job(analysis_id, subject_id, display_name))?;
        tracing::info!("Created analysis {} for {}", analysis_id, display_name);
        Ok(job)
    }

    /// Moves a job to `status` with `progress`
    ///
    /// # Errors
    ///
    /// * `Validation` - the values break the progress or error message rules
    /// * `NotFound` - no job has this id
    /// * `InvalidTransition` - the job is terminal, or the move goes backwards
    pub fn advance(
        &self,
        analysis_id: &str,
        status: JobStatus,
        progress: u8,
        error_message: Option<&str>,
    ) -> Result<JobRecord> {
        validate_advance(status, progress, error_message)?;

        let mut storage = self
            .storage
            .lock()
            .map_err(|_| StorageError::LockPoisoned)?;

        let current = storage
            .get_job(analysis_id)?
            .ok_or_else(|| ScopeError::NotFound(analysis_id.to_string()))?;

        if !current.status.can_transition_to(status) {
            return Err(ScopeError::InvalidTransition {
                analysis_id: analysis_id.to_string(),
                from: current.status,
                to: status,
            });
        }

        if status != JobStatus::Failed && progress < current.progress {
            return Err(ScopeError::Validation(format!(
                "progress may not decrease ({} -> {})",
                current.progress, progress
            )));
        }

        storage.update_job_status(analysis_id, status, progress, error_message)?;

        let updated = storage
            .get_job(analysis_id)?
            .ok_or_else(|| ScopeError::NotFound(analysis_id.to_string()))?;

        if status.is_terminal() {
            tracing::info!("Analysis {} is {}", analysis_id, status);
        } else {
            tracing::debug!("Analysis {} -> {} ({}%)", analysis_id, status, progress);
        }

        Ok(updated)
    }

    /// Records the resolved subject id and display name
    ///
    /// Touches only the identity columns and `updated_at`.
    pub fn resolve_subject(
        &self,
        analysis_id: &str,
        subject_id: &str,
        display_name: &str,
    ) -> Result<()> {
        require_non_empty("subject_id", subject_id)?;
        require_non_empty("display_name", display_name)?;

        self.with_storage_mut(|s| s.update_job_identity(analysis_id, subject_id, display_name))
    }

    /// Returns the job row, if any
    pub fn get_job(&self, analysis_id: &str) -> Result<Option<JobRecord>> {
        self.with_storage(|s| s.get_job(analysis_id))
    }

    /// Lists jobs, newest first
    pub fn list_jobs(&self, limit: usize) -> Result<Vec<JobRecord>> {
        self.with_storage(|s| s.list_jobs(limit))
    }

    /// Deletes a job and everything stored under it
    ///
    /// Deleting a missing job is not an error; the summary is all zeros.
    pub fn delete_job(&self, analysis_id: &str) -> Result<DeleteSummary> {
        let summary = self.with_storage_mut(|s| s.delete_job(analysis_id))?;
        if summary.jobs > 0 {
            tracing::info!(
                "Deleted analysis {} ({} content items)",
                analysis_id,
                summary.items
            );
        }
        Ok(summary)
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ScopeError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Checks the values of an `advance` call on their own
fn validate_advance(status: JobStatus, progress: u8, error_message: Option<&str>) -> Result<()> {
    if progress > PROGRESS_COMPLETE {
        return Err(ScopeError::Validation(format!(
            "progress must be between 0 and 100, got {}",
            progress
        )));
    }

    let has_message = error_message.map_or(false, |m| !m.trim().is_empty());
    match status {
        JobStatus::Failed if !has_message => Err(ScopeError::Validation(
            "a failed job requires an error message".to_string(),
        )),
        JobStatus::Failed => Ok(()),
        _ if error_message.is_some() => Err(ScopeError::Validation(format!(
            "error message is only allowed on failed jobs, not {}",
            status
        ))),
        JobStatus::Completed if progress != PROGRESS_COMPLETE => Err(ScopeError::Validation(
            format!("a completed job must report progress 100, got {}", progress),
        )),
        JobStatus::Pending if progress != 0 => Err(ScopeError::Validation(format!(
            "a pending job must report progress 0, got {}",
            progress
        ))),
        JobStatus::Processing if progress == PROGRESS_COMPLETE => Err(ScopeError::Validation(
            "progress 100 is only valid for completed jobs".to_string(),
        )),
        _ => Ok(()),
    }
}
