//! Markdown creator reports
//!
//! Renders a [`CreatorReport`] as a human-readable document: profile
//! summary, tier breakdown with thresholds, top items and top hashtags.

use crate::aggregate::Tier;
use crate::output::CreatorReport;
use crate::Result;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Writes the report to `<dir>/<analysis_id>.md`
///
/// Creates `dir` if needed.
///
/// # Returns
///
/// The path of the written file
pub fn write_creator_report(report: &CreatorReport, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(format!("{}.md", report.job.analysis_id));

    let mut file = File::create(&path)?;
    file.write_all(format_creator_report(report).as_bytes())?;

    tracing::info!("Wrote report for {} to {}", report.job.analysis_id, path.display());
    Ok(path)
}

/// Formats a creator report as markdown
pub fn format_creator_report(report: &CreatorReport) -> String {
    let mut md = String::new();

    md.push_str(&format!("# Creator Report: {}\n\n", report.job.display_name));

    // Analysis metadata
    md.push_str("## Analysis\n\n");
    md.push_str(&format!("- **Analysis ID**: {}\n", report.job.analysis_id));
    md.push_str(&format!("- **Status**: {}\n", report.job.status));
    md.push_str(&format!("- **Progress**: {}%\n", report.job.progress));
    if let Some(error) = &report.job.error_message {
        md.push_str(&format!("- **Error**: {}\n", error));
    }
    md.push_str(&format!(
        "- **Created**: {}\n",
        report.job.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    md.push_str(&format!(
        "- **Updated**: {}\n\n",
        report.job.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    if !report.job.status.is_terminal() || report.job.error_message.is_some() {
        md.push_str("> Results below are partial.\n\n");
    }

    // Profile
    if let Some(parent) = &report.parent {
        md.push_str("## Profile\n\n");
        md.push_str(&format!("- **Platform**: {}\n", parent.platform));
        md.push_str(&format!("- **Name**: {}\n", parent.display_name));
        if let Some(username) = &parent.username {
            md.push_str(&format!("- **Username**: @{}\n", username));
        }
        if let Some(url) = &parent.profile_url {
            md.push_str(&format!("- **URL**: {}\n", url));
        }
        if let Some(audience) = parent.audience_size {
            md.push_str(&format!("- **Audience**: {}\n", audience));
        }
        if let Some(media) = parent.media_count {
            md.push_str(&format!("- **Published items**: {}\n", media));
        }
        if let Some(views) = parent.total_views {
            md.push_str(&format!("- **Lifetime views**: {}\n", views));
        }
        if parent.is_verified == Some(true) {
            md.push_str("- **Verified**: yes\n");
        }
        if let Some(description) = parent.description.as_deref().filter(|d| !d.is_empty()) {
            md.push_str(&format!("\n{}\n", description.trim()));
        }
        md.push('\n');
    }

    // Totals
    md.push_str("## Content Overview\n\n");
    md.push_str(&format!("- **Items analyzed**: {}\n", report.total_items));
    md.push_str(&format!("- **Total views**: {}\n", report.total_views));
    md.push_str(&format!("- **Total likes**: {}\n", report.total_likes));
    md.push_str(&format!("- **Total comments**: {}\n", report.total_comments));
    md.push_str(&format!(
        "- **Average {} per item**: {:.1}\n\n",
        report.metric,
        report.average()
    ));

    // Tiers
    md.push_str(&format!("## Performance Tiers (by {})\n\n", report.metric));
    md.push_str("| Tier | Threshold | Items |\n");
    md.push_str("|------|-----------|-------|\n");
    let thresholds = &report.thresholds;
    for (tier, count) in &report.tier_counts {
        let threshold = match tier {
            Tier::Viral => format!(">= {:.0}", thresholds.viral),
            Tier::VeryHigh => format!(">= {:.0}", thresholds.very_high),
            Tier::High => format!(">= {:.0}", thresholds.high),
            Tier::Medium => format!(">= {:.0}", thresholds.medium),
            Tier::Low => format!("< {:.0}", thresholds.medium),
        };
        md.push_str(&format!("| {} | {} | {} |\n", tier, threshold, count));
    }
    md.push('\n');

    // Top items
    if !report.top_items.is_empty() {
        md.push_str(&format!("## Top {} Items\n\n", report.top_items.len()));
        md.push_str("| # | Item | Tier | Views | Likes | Comments | Posted |\n");
        md.push_str("|---|------|------|-------|-------|----------|--------|\n");

        for (rank, segmented) in report.top_items.iter().enumerate() {
            let item = &segmented.item;
            let posted = item
                .date_posted
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string());
            md.push_str(&format!(
                "| {} | [{}]({}) | {} | {} | {} | {} | {} |\n",
                rank + 1,
                table_cell(&item.caption, &item.item_id),
                item.url,
                segmented.tier,
                item.view_count,
                item.like_count,
                item.comment_count,
                posted
            ));
        }
        md.push('\n');
    }

    // Hashtags
    if !report.top_hashtags.is_empty() {
        md.push_str("## Top Hashtags\n\n");
        md.push_str("| Hashtag | Uses |\n");
        md.push_str("|---------|------|\n");
        for (tag, count) in &report.top_hashtags {
            md.push_str(&format!("| #{} | {} |\n", tag, count));
        }
        md.push('\n');
    }

    md
}

/// First line of a caption, shortened and safe inside a table row
fn table_cell(caption: &str, fallback: &str) -> String {
    let line = caption.lines().next().unwrap_or("").trim();
    if line.is_empty() {
        return fallback.to_string();
    }

    let mut text: String = line.chars().take(60).collect();
    if line.chars().count() > 60 {
        text.push_str("...");
    }
    text.replace('|', "\\|").replace('[', "(").replace(']', ")")
}
