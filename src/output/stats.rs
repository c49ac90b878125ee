//! Statistics over the analysis database

use crate::state::JobStatus;
use crate::storage::Storage;
use crate::tracker::JobTracker;
use crate::Result;
use std::collections::HashMap;

/// Database-wide counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeStatistics {
    /// Count of analyses by status; statuses with no jobs are absent
    pub jobs_by_status: HashMap<JobStatus, u64>,

    /// Content items across all analyses
    pub total_items: u64,

    /// Stored parent records
    pub total_parents: u64,
}

impl ScopeStatistics {
    pub fn total_jobs(&self) -> u64 {
        self.jobs_by_status.values().sum()
    }

    pub fn jobs_in(&self, status: JobStatus) -> u64 {
        self.jobs_by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Loads statistics from storage
pub fn load_statistics(tracker: &JobTracker) -> Result<ScopeStatistics> {
    tracker.with_storage(|s| {
        Ok(ScopeStatistics {
            jobs_by_status: s.count_jobs_by_status()?,
            total_items: s.count_total_items()?,
            total_parents: s.count_parents()?,
        })
    })
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &ScopeStatistics) {
    println!("=== Creator-Scope Statistics ===\n");

    println!("Overview:");
    println!("  Analyses: {}", stats.total_jobs());
    println!("  Parent records: {}", stats.total_parents);
    println!("  Content items: {}", stats.total_items);
    println!();

    println!("Analyses by Status:");
    let total = stats.total_jobs();
    for status in JobStatus::all_states() {
        let count = stats.jobs_in(status);
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        println!("  {}: {} ({:.1}%)", status, count, percentage);
    }
    println!();

    let completed = stats.jobs_in(JobStatus::Completed);
    if completed > 0 {
        println!(
            "Average items per analysis: {:.1}",
            stats.total_items as f64 / total as f64
        );
    }
}
