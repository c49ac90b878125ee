//! Result aggregation
//!
//! Joins an analysis with its parent record and content items, orders the
//! items explicitly, classifies them into performance tiers and returns one
//! page of the result.

mod page;
mod segment;

pub use page::{
    paginate, sort_items, Page, PageRequest, SortOrder, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};
pub use segment::{segment, Metric, Segments, Thresholds, Tier};

use crate::content::{ContentItem, ParentInfo};
use crate::state::JobStatus;
use crate::storage::{JobRecord, Storage};
use crate::tracker::JobTracker;
use crate::{Result, ScopeError};

/// Options for [`get_aggregated_result`]
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultQuery {
    pub page: PageRequest,
    pub metric: Metric,
    pub sort: SortOrder,
    /// Overrides the parent's audience size in the thresholds
    pub audience_size: Option<u64>,
}

/// A content item with its tier
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentedItem {
    pub item: ContentItem,
    pub tier: Tier,
}

/// Parent info plus a page of segmented children
#[derive(Debug, Clone)]
pub struct AggregatedResult {
    pub job: JobRecord,
    pub parent: Option<ParentInfo>,
    pub metric: Metric,
    pub thresholds: Thresholds,
    /// Item count per tier over the whole dataset
    pub tier_counts: Vec<(Tier, usize)>,
    pub page: Page<SegmentedItem>,
    /// True only for completed jobs; otherwise `total_count` may still grow
    /// or reflect a partial failure
    pub is_final: bool,
}

/// Assembles the result of one analysis
///
/// Works for any status. Callers should check `is_final` before trusting
/// `page.total_count` as complete.
///
/// # Errors
///
/// * `NotFound` - no analysis has this id
pub fn get_aggregated_result(
    tracker: &JobTracker,
    analysis_id: &str,
    query: &ResultQuery,
) -> Result<AggregatedResult> {
    let (job, parent, mut items) = tracker.with_storage(|s| {
        Ok((
            s.get_job(analysis_id)?,
            s.get_parent(analysis_id)?,
            s.get_content_items(analysis_id)?,
        ))
    })?;
    let job = job.ok_or_else(|| ScopeError::NotFound(analysis_id.to_string()))?;
    let parent = parent.map(|record| record.info);

    let audience_size = query
        .audience_size
        .or_else(|| parent.as_ref().and_then(|p| p.audience_size))
        .unwrap_or(0);

    sort_items(&mut items, query.sort);
    let segments = segment(&items, query.metric, audience_size);
    let thresholds = segments.thresholds;

    let segmented: Vec<SegmentedItem> = items
        .into_iter()
        .map(|item| {
            let tier = thresholds.tier_of(query.metric.value(&item));
            SegmentedItem { item, tier }
        })
        .collect();

    tracing::debug!(
        "Aggregated {} items for {} ({} by {})",
        segmented.len(),
        analysis_id,
        job.status,
        query.metric
    );

    Ok(AggregatedResult {
        is_final: job.status == JobStatus::Completed,
        tier_counts: segments.counts(),
        page: paginate(&segmented, query.page),
        job,
        parent,
        metric: query.metric,
        thresholds,
    })
}
