//! Cancellable bulk oEmbed lookups
//!
//! A batch run walks a list of post URLs in chunks. Lookups inside a chunk
//! run concurrently and are paced by the oEmbed client's limiter. The cancel
//! flag is checked between chunks, so a chunk that has started always
//! finishes and is recorded.

use crate::client::OEmbedClient;
use crate::state::BatchStatus;
use crate::storage::{BatchRunRecord, Storage};
use crate::tracker::JobTracker;
use crate::{Result, ScopeError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;

/// Default number of URLs looked up concurrently
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// Caller-settable stop signal, shared between clones
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Looks up every URL and records each outcome under a new batch run
///
/// Per-URL failures are recorded and do not stop the run. The run ends
/// `cancelled` if `cancel` is set before the last chunk starts, `failed`
/// if storing a result fails, and `completed` otherwise.
///
/// # Returns
///
/// The final batch run record
///
/// # Errors
///
/// Only when the batch run itself cannot be created or read back. A storage
/// failure mid-run is recorded on the run instead.
pub async fn run_batch(
    tracker: &JobTracker,
    oembed: &OEmbedClient,
    urls: &[String],
    chunk_size: usize,
    cancel: &CancelFlag,
) -> Result<BatchRunRecord> {
    let batch_id = tracker.with_storage_mut(|s| s.create_batch_run(urls.len()))?;
    tracing::info!("Batch {} started with {} URLs", batch_id, urls.len());

    let processed = process_chunks(tracker, oembed, batch_id, urls, chunk_size, cancel).await;
    let (status, error) = match processed {
        Ok(status) => (status, None),
        Err(e) => {
            tracing::error!("Batch {} failed: {}", batch_id, e);
            (BatchStatus::Failed, Some(e.to_string()))
        }
    };

    tracker.with_storage_mut(|s| s.finish_batch_run(batch_id, status, error.as_deref()))?;

    let run = tracker
        .with_storage(|s| s.get_batch_run(batch_id))?
        .ok_or_else(|| ScopeError::NotFound(format!("batch {}", batch_id)))?;

    tracing::info!(
        "Batch {} {}: {} succeeded, {} failed of {}",
        batch_id,
        run.status,
        run.succeeded,
        run.failed,
        run.total_urls
    );
    Ok(run)
}

async fn process_chunks(
    tracker: &JobTracker,
    oembed: &OEmbedClient,
    batch_id: i64,
    urls: &[String],
    chunk_size: usize,
    cancel: &CancelFlag,
) -> Result<BatchStatus> {
    for (index, chunk) in urls.chunks(chunk_size.max(1)).enumerate() {
        if cancel.is_cancelled() {
            tracing::warn!("Batch {} cancelled before chunk {}", batch_id, index + 1);
            return Ok(BatchStatus::Cancelled);
        }

        let mut lookups = JoinSet::new();
        for (position, url) in chunk.iter().enumerate() {
            let client = oembed.clone();
            let url = url.clone();
            lookups.spawn(async move {
                let outcome = client.fetch_item(&url).await;
                (position, url, outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(chunk.len());
        while let Some(joined) = lookups.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Batch {} lookup task aborted: {}", batch_id, e),
            }
        }
        // Completion order is arbitrary; record in input order
        outcomes.sort_by_key(|(position, _, _)| *position);

        for (_, url, outcome) in outcomes {
            match outcome {
                Ok(item) => tracker
                    .with_storage_mut(|s| s.record_batch_result(batch_id, &url, Ok(&item)))?,
                Err(e) => {
                    tracing::warn!("Lookup of {} failed: {}", url, e);
                    let message = e.to_string();
                    tracker.with_storage_mut(|s| {
                        s.record_batch_result(batch_id, &url, Err(message.as_str()))
                    })?
                }
            }
        }

        tracing::debug!("Batch {} chunk {} recorded", batch_id, index + 1);
    }

    Ok(BatchStatus::Completed)
}
