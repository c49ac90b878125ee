//! Background analysis pipeline
//!
//! `submit` creates the job row and returns its id right away; the work runs
//! on a spawned task. That task sits behind a failure boundary: whether the
//! work returns an error or panics, the job ends with exactly one terminal
//! `advance` call.
//!
//! # Steps
//!
//! | Step | Progress |
//! |------|----------|
//! | resolve subject identity | 10 |
//! | fetch and store parent metadata | 20 |
//! | enumerate child ids (paginated, capped) | 50 |
//! | fetch and store details per batch, rate limited | 60-90 |
//! | mark completed | 100 |

mod run;

use crate::client::SourceRegistry;
use crate::config::PipelineConfig;
use crate::content::parse_subject;
use crate::limiter::RateLimiter;
use crate::state::JobStatus;
use crate::storage::JobRecord;
use crate::tracker::{generate_analysis_id, JobTracker};
use crate::{ExternalError, Result, ScopeError};
use run::AnalysisRun;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// A job accepted by [`AnalysisPipeline::submit`]
#[derive(Debug)]
pub struct SubmittedJob {
    pub analysis_id: String,
    /// Resolves once the job has reached a terminal state
    pub handle: JoinHandle<()>,
}

/// Creates analysis jobs and drives them in the background
#[derive(Clone)]
pub struct AnalysisPipeline {
    tracker: JobTracker,
    sources: SourceRegistry,
    limiter: Arc<RateLimiter>,
    settings: PipelineConfig,
}

impl AnalysisPipeline {
    pub fn new(
        tracker: JobTracker,
        sources: SourceRegistry,
        limiter: Arc<RateLimiter>,
        settings: PipelineConfig,
    ) -> Self {
        Self {
            tracker,
            sources,
            limiter,
            settings,
        }
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    /// Accepts a creator identifier and starts analyzing it
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// * `Validation` - the identifier is malformed or its platform has no
    ///   configured source
    pub fn submit(&self, identifier: &str) -> Result<SubmittedJob> {
        let subject = parse_subject(identifier)?;
        let source = self.sources.get(subject.platform).ok_or_else(|| {
            ScopeError::Validation(format!("no {} source is configured", subject.platform))
        })?;

        let analysis_id = generate_analysis_id(identifier);
        self.tracker.create_job(
            &analysis_id,
            subject.initial_subject_id(),
            &subject.display_name(),
        )?;

        let run = AnalysisRun {
            analysis_id: analysis_id.clone(),
            subject,
            source,
            tracker: self.tracker.clone(),
            limiter: Arc::clone(&self.limiter),
            settings: self.settings.clone(),
        };

        Ok(SubmittedJob {
            analysis_id,
            handle: spawn_with_boundary(run),
        })
    }
}

/// Spawns the run and records `failed` if it errors or panics
fn spawn_with_boundary(run: AnalysisRun) -> JoinHandle<()> {
    let tracker = run.tracker.clone();
    let analysis_id = run.analysis_id.clone();

    tokio::spawn(async move {
        let message = match tokio::spawn(run.execute()).await {
            Ok(Ok(())) => return,
            Ok(Err(e)) => e.to_string(),
            Err(e) if e.is_panic() => "analysis task panicked".to_string(),
            Err(e) => format!("analysis task was cancelled: {}", e),
        };

        tracing::error!("Analysis {} failed: {}", analysis_id, message);
        if let Err(e) = tracker.advance(&analysis_id, JobStatus::Failed, 0, Some(&message)) {
            tracing::error!("Could not record failure of {}: {}", analysis_id, e);
        }
    })
}

/// Polls a job until it is `completed` or `failed`
///
/// # Errors
///
/// * `NotFound` - the job disappeared
/// * `External(Timeout)` - `timeout` elapsed first
pub async fn wait_for_terminal(
    tracker: &JobTracker,
    analysis_id: &str,
    poll_interval: Duration,
    timeout: Option<Duration>,
) -> Result<JobRecord> {
    let started = Instant::now();
    let mut last_progress = None;

    loop {
        let job = tracker
            .get_job(analysis_id)?
            .ok_or_else(|| ScopeError::NotFound(analysis_id.to_string()))?;

        if job.status.is_terminal() {
            return Ok(job);
        }

        if last_progress != Some(job.progress) {
            tracing::info!("Analysis {}: {} ({}%)", analysis_id, job.status, job.progress);
            last_progress = Some(job.progress);
        }

        if let Some(limit) = timeout {
            if started.elapsed() >= limit {
                return Err(ExternalError::Timeout {
                    operation: format!("waiting for analysis {}", analysis_id),
                    seconds: limit.as_secs(),
                }
                .into());
            }
        }

        tokio::time::sleep(poll_interval).await;
    }
}
