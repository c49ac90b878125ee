//! Performance segmentation
//!
//! Buckets items into tiers by one engagement metric, relative to the
//! dataset's maximum and mean and an optional audience size:
//!
//! | Tier | Threshold |
//! |------|-----------|
//! | viral | `max(audience * 2, max * 0.8)` |
//! | very high | `max(audience, mean * 2)` |
//! | high | `max(audience * 0.5, mean * 1.5)` |
//! | medium | `mean * 0.7` |
//! | low | everything below medium |
//!
//! An item lands in the first tier whose threshold it meets (`>=`).

use crate::content::ContentItem;
use std::fmt;
use std::str::FromStr;

/// Engagement metric used for segmentation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    #[default]
    Views,
    Likes,
}

impl Metric {
    pub fn value(&self, item: &ContentItem) -> u64 {
        match self {
            Self::Views => item.view_count,
            Self::Likes => item.like_count,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Views => "views",
            Self::Likes => "likes",
        }
    }
}

impl FromStr for Metric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "views" => Ok(Self::Views),
            "likes" => Ok(Self::Likes),
            other => Err(format!("unknown metric '{}', expected views or likes", other)),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Performance tier, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Tier {
    Viral,
    VeryHigh,
    High,
    Medium,
    Low,
}

impl Tier {
    pub fn all() -> [Tier; 5] {
        [
            Self::Viral,
            Self::VeryHigh,
            Self::High,
            Self::Medium,
            Self::Low,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Viral => "viral",
            Self::VeryHigh => "very high",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tier cut-offs for one dataset
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub viral: f64,
    pub very_high: f64,
    pub high: f64,
    pub medium: f64,
}

impl Thresholds {
    /// Computes thresholds from metric values and an audience size
    ///
    /// An empty dataset has a max and mean of 0.
    pub fn compute(values: &[u64], audience_size: u64) -> Self {
        let audience = audience_size as f64;
        let max = values.iter().copied().max().unwrap_or(0) as f64;
        let mean = if values.is_empty() {
            0.0
        } else {
            values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
        };

        Self {
            viral: (audience * 2.0).max(max * 0.8),
            very_high: audience.max(mean * 2.0),
            high: (audience * 0.5).max(mean * 1.5),
            medium: mean * 0.7,
        }
    }

    /// Returns the first tier whose threshold `value` meets
    pub fn tier_of(&self, value: u64) -> Tier {
        let value = value as f64;
        if value >= self.viral {
            Tier::Viral
        } else if value >= self.very_high {
            Tier::VeryHigh
        } else if value >= self.high {
            Tier::High
        } else if value >= self.medium {
            Tier::Medium
        } else {
            Tier::Low
        }
    }
}

/// Items grouped by tier
#[derive(Debug, Clone, PartialEq)]
pub struct Segments {
    pub thresholds: Thresholds,
    pub viral: Vec<ContentItem>,
    pub very_high: Vec<ContentItem>,
    pub high: Vec<ContentItem>,
    pub medium: Vec<ContentItem>,
    pub low: Vec<ContentItem>,
}

impl Segments {
    pub fn bucket(&self, tier: Tier) -> &[ContentItem] {
        match tier {
            Tier::Viral => &self.viral,
            Tier::VeryHigh => &self.very_high,
            Tier::High => &self.high,
            Tier::Medium => &self.medium,
            Tier::Low => &self.low,
        }
    }

    /// Item count per tier, best tier first
    pub fn counts(&self) -> Vec<(Tier, usize)> {
        Tier::all()
            .into_iter()
            .map(|tier| (tier, self.bucket(tier).len()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        Tier::all().iter().all(|&tier| self.bucket(tier).is_empty())
    }
}

/// Buckets `items` by `metric`
///
/// Pure and deterministic: items keep their input order within a bucket.
/// An empty input gives five empty buckets.
///
/// # Example
///
/// ```
/// use creator_scope::aggregate::{segment, Metric};
/// use creator_scope::content::{ContentItem, ContentKind};
///
/// let items: Vec<ContentItem> = [10, 10, 1000, 1_000_000]
///     .iter()
///     .enumerate()
///     .map(|(i, &views)| {
///         let mut item = ContentItem::new(&i.to_string(), ContentKind::Video, "", "");
///         item.view_count = views;
///         item
///     })
///     .collect();
///
/// let segments = segment(&items, Metric::Views, 0);
/// assert_eq!(segments.viral.len(), 1);
/// assert_eq!(segments.low.len(), 3);
/// ```
pub fn segment(items: &[ContentItem], metric: Metric, audience_size: u64) -> Segments {
    let values: Vec<u64> = items.iter().map(|item| metric.value(item)).collect();
    let thresholds = Thresholds::compute(&values, audience_size);

    let mut segments = Segments {
        thresholds,
        viral: Vec::new(),
        very_high: Vec::new(),
        high: Vec::new(),
        medium: Vec::new(),
        low: Vec::new(),
    };

    for (item, &value) in items.iter().zip(&values) {
        let bucket = match thresholds.tier_of(value) {
            Tier::Viral => &mut segments.viral,
            Tier::VeryHigh => &mut segments.very_high,
            Tier::High => &mut segments.high,
            Tier::Medium => &mut segments.medium,
            Tier::Low => &mut segments.low,
        };
        bucket.push(item.clone());
    }

    segments
}
