//! Output module for creator reports and database statistics
//!
//! This module handles:
//! - Building a report of one analysis from stored data
//! - Rendering that report as markdown
//! - Summarizing the whole database

mod markdown;
pub mod stats;

pub use markdown::{format_creator_report, write_creator_report};
pub use stats::{load_statistics, print_statistics, ScopeStatistics};

use crate::aggregate::{
    get_aggregated_result, Metric, PageRequest, ResultQuery, SegmentedItem, SortOrder, Thresholds,
    Tier,
};
use crate::content::ParentInfo;
use crate::storage::{JobRecord, Storage};
use crate::tracker::JobTracker;
use crate::Result;
use std::collections::HashMap;

/// Number of items listed in the report's top section
pub const TOP_ITEMS: usize = 10;

/// Number of hashtags listed in the report
pub const TOP_HASHTAGS: usize = 15;

/// Everything a creator report shows
#[derive(Debug, Clone)]
pub struct CreatorReport {
    pub job: JobRecord,
    pub parent: Option<ParentInfo>,
    pub metric: Metric,
    pub thresholds: Thresholds,
    pub tier_counts: Vec<(Tier, usize)>,
    pub total_items: usize,
    pub total_views: u64,
    pub total_likes: u64,
    pub total_comments: u64,
    /// Best items by `metric`
    pub top_items: Vec<SegmentedItem>,
    /// Most used hashtags with their counts, most frequent first
    pub top_hashtags: Vec<(String, usize)>,
}

impl CreatorReport {
    /// Average of `metric` per item
    pub fn average(&self) -> f64 {
        if self.total_items == 0 {
            return 0.0;
        }
        let total = match self.metric {
            Metric::Views => self.total_views,
            Metric::Likes => self.total_likes,
        };
        total as f64 / self.total_items as f64
    }
}

/// Builds the report of one analysis
///
/// # Errors
///
/// * `NotFound` - no analysis has this id
pub fn generate_report(
    tracker: &JobTracker,
    analysis_id: &str,
    metric: Metric,
) -> Result<CreatorReport> {
    let sort = match metric {
        Metric::Views => SortOrder::MostViewed,
        Metric::Likes => SortOrder::MostLiked,
    };
    let query = ResultQuery {
        page: PageRequest::new(1, TOP_ITEMS),
        metric,
        sort,
        audience_size: None,
    };
    let result = get_aggregated_result(tracker, analysis_id, &query)?;
    let items = tracker.with_storage(|s| s.get_content_items(analysis_id))?;

    let mut hashtags: HashMap<String, usize> = HashMap::new();
    for tag in items.iter().flat_map(|item| &item.hashtags) {
        *hashtags.entry(tag.to_lowercase()).or_default() += 1;
    }
    let mut top_hashtags: Vec<(String, usize)> = hashtags.into_iter().collect();
    top_hashtags.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_hashtags.truncate(TOP_HASHTAGS);

    Ok(CreatorReport {
        total_items: result.page.total_count,
        total_views: items.iter().map(|i| i.view_count).sum(),
        total_likes: items.iter().map(|i| i.like_count).sum(),
        total_comments: items.iter().map(|i| i.comment_count).sum(),
        top_items: result.page.items,
        top_hashtags,
        job: result.job,
        parent: result.parent,
        metric,
        thresholds: result.thresholds,
        tier_counts: result.tier_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{ContentItem, ContentKind, Platform};
    use crate::state::JobStatus;
    use crate::storage::SqliteStorage;

    fn tracker_with_items() -> JobTracker {
        let tracker = JobTracker::new(SqliteStorage::new_in_memory().unwrap());
        tracker.create_job("an_r", "UCr", "Report Channel").unwrap();

        let captions = ["#Travel #food", "#travel", "#food #travel", "no tags"];
        let items: Vec<ContentItem> = captions
            .iter()
            .enumerate()
            .map(|(i, caption)| {
                let mut item =
                    ContentItem::new(&format!("v{}", i), ContentKind::Video, "", caption);
                item.view_count = (i as u64 + 1) * 100;
                item.like_count = 10;
                item.comment_count = 1;
                item
            })
            .collect();

        tracker
            .with_storage_mut(|s| {
                s.upsert_parent(
                    "an_r",
                    &ParentInfo::new(Platform::YouTube, "UCr", "Report Channel"),
                )?;
                s.insert_content_items("an_r", &items)
            })
            .unwrap();
        tracker
            .advance("an_r", JobStatus::Completed, 100, None)
            .unwrap();
        tracker
    }

    #[test]
    fn test_generate_report_totals() {
        let tracker = tracker_with_items();
        let report = generate_report(&tracker, "an_r", Metric::Views).unwrap();

        assert_eq!(report.total_items, 4);
        assert_eq!(report.total_views, 1_000);
        assert_eq!(report.total_likes, 40);
        assert_eq!(report.total_comments, 4);
        assert_eq!(report.average(), 250.0);
        assert_eq!(report.top_items[0].item.item_id, "v3");
    }

    #[test]
    fn test_hashtags_counted_case_insensitively() {
        let tracker = tracker_with_items();
        let report = generate_report(&tracker, "an_r", Metric::Likes).unwrap();

        assert_eq!(
            report.top_hashtags,
            vec![("travel".to_string(), 3), ("food".to_string(), 2)]
        );
    }
}
