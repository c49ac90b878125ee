//! One analysis, start to finish

use crate::client::{ContentSource, MAX_DETAIL_BATCH};
use crate::config::PipelineConfig;
use crate::content::{ContentItem, ParentInfo, Subject};
use crate::limiter::RateLimiter;
use crate::state::JobStatus;
use crate::storage::Storage;
use crate::tracker::{JobTracker, PROGRESS_COMPLETE};
use crate::{ExternalError, ExternalResult, Result};
use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

pub(crate) const PROGRESS_RESOLVED: u8 = 10;
pub(crate) const PROGRESS_PARENT: u8 = 20;
pub(crate) const PROGRESS_ENUMERATED: u8 = 50;
pub(crate) const PROGRESS_DETAILS_START: u8 = 60;
pub(crate) const PROGRESS_DETAILS_END: u8 = 90;

/// Progress after `done` of `total` detail batches
pub(crate) fn batch_progress(done: usize, total: usize) -> u8 {
    if total == 0 {
        return PROGRESS_DETAILS_END;
    }
    let span = usize::from(PROGRESS_DETAILS_END - PROGRESS_DETAILS_START);
    let step = span * done.min(total) / total;
    PROGRESS_DETAILS_START + step as u8
}

/// Everything a background analysis needs, owned
pub(crate) struct AnalysisRun {
    pub analysis_id: String,
    pub subject: Subject,
    pub source: Arc<dyn ContentSource>,
    pub tracker: JobTracker,
    pub limiter: Arc<RateLimiter>,
    pub settings: PipelineConfig,
}

impl AnalysisRun {
    fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.settings.step_timeout_secs)
    }

    /// Runs `call`, failing it if it outlives the step timeout
    async fn timed<T>(
        &self,
        operation: &str,
        call: impl Future<Output = ExternalResult<T>>,
    ) -> ExternalResult<T> {
        match tokio::time::timeout(self.step_timeout(), call).await {
            Ok(result) => result,
            Err(_) => Err(ExternalError::Timeout {
                operation: operation.to_string(),
                seconds: self.settings.step_timeout_secs,
            }),
        }
    }

    fn report(&self, progress: u8) -> Result<()> {
        self.tracker
            .advance(&self.analysis_id, JobStatus::Processing, progress, None)?;
        Ok(())
    }

    /// Drives the job through every step
    ///
    /// Returns after recording `completed`. Any error is left for the
    /// caller's failure boundary to record.
    pub async fn execute(self) -> Result<()> {
        let id = self.analysis_id.as_str();
        tracing::info!("Starting analysis {} ({})", id, self.subject.platform);

        // 1. Identity
        let resolved = self
            .timed("resolve subject", self.source.resolve_subject(&self.subject))
            .await?;
        self.tracker
            .resolve_subject(id, &resolved.subject_id, &resolved.display_name)?;
        self.report(PROGRESS_RESOLVED)?;

        // 2. Parent metadata
        let parent = self
            .timed("fetch parent metadata", self.source.fetch_parent(&resolved))
            .await?;
        self.tracker
            .with_storage_mut(|s| s.upsert_parent(id, &parent))?;
        self.report(PROGRESS_PARENT)?;

        // 3. Child ids
        let ids = self.enumerate(&parent).await?;
        tracing::info!("Analysis {}: {} items to fetch", id, ids.len());
        self.report(PROGRESS_ENUMERATED)?;

        // 4 + 5. Details, persisted batch by batch
        let batch_size = self.settings.batch_size.clamp(1, MAX_DETAIL_BATCH);
        let batches: Vec<&[String]> = ids.chunks(batch_size).collect();
        let total = batches.len();
        let mut stored = 0;

        for (index, batch) in batches.into_iter().enumerate() {
            let items = self.fetch_details(&parent, batch).await?;

            stored += self
                .tracker
                .with_storage_mut(|s| s.insert_content_items(id, &items))?;

            tracing::debug!(
                "Analysis {}: batch {}/{} stored {} items",
                id,
                index + 1,
                total,
                items.len()
            );
            self.report(batch_progress(index + 1, total))?;
        }

        // 6. Done
        self.tracker
            .advance(id, JobStatus::Completed, PROGRESS_COMPLETE, None)?;
        tracing::info!("Analysis {} completed with {} items", id, stored);
        Ok(())
    }

    /// Fetches one detail batch
    ///
    /// Sources that pace their own lookups are called directly: each of their
    /// calls is already bounded by its limiter's retries and the request
    /// timeout. Other sources run the whole batch as one limiter task under
    /// the step timeout.
    async fn fetch_details(
        &self,
        parent: &ParentInfo,
        batch: &[String],
    ) -> ExternalResult<Vec<ContentItem>> {
        if self.source.paces_details() {
            return self.source.fetch_child_details(parent, batch).await;
        }

        self.limiter
            .execute(|| {
                self.timed(
                    "fetch content details",
                    self.source.fetch_child_details(parent, batch),
                )
            })
            .await
    }

    /// Walks the paginated child ids up to `max_items`
    async fn enumerate(&self, parent: &ParentInfo) -> Result<Vec<String>> {
        let limit = self.settings.max_items;
        let mut seen = HashSet::new();
        let mut seen_tokens = HashSet::new();
        let mut ids = Vec::new();
        let mut token: Option<String> = None;

        loop {
            let page = self
                .timed(
                    "enumerate content",
                    self.source.enumerate_children(parent, token.as_deref()),
                )
                .await?;

            let before = ids.len();
            for child in page.ids {
                if ids.len() >= limit {
                    break;
                }
                if seen.insert(child.clone()) {
                    ids.push(child);
                }
            }

            // A page of repeats or a token seen before would loop forever
            match page.next_page_token {
                Some(next)
                    if ids.len() < limit
                        && ids.len() > before
                        && seen_tokens.insert(next.clone()) =>
                {
                    token = Some(next)
                }
                Some(next) if ids.len() < limit => {
                    tracing::warn!(
                        "Analysis {}: stopping enumeration at repeated page {}",
                        self.analysis_id,
                        next
                    );
                    break;
                }
                _ => break,
            }
        }

        Ok(ids)
    }
}
