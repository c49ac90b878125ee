//! Pagination and ordering of child records

use crate::content::ContentItem;
use std::cmp::Ordering;
use std::str::FromStr;

/// Largest page size a caller may request
pub const MAX_PAGE_SIZE: usize = 100;

/// Page size used when the caller gives none
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// A clamped, 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    /// Clamps `page_size` to `1..=100`; page 0 is read as page 1
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> usize {
        (self.page - 1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_SIZE)
    }
}

/// One page of a larger listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_count: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

/// Slices `all` into the requested page
///
/// Out-of-range pages come back with no items, not an error.
pub fn paginate<T: Clone>(all: &[T], request: PageRequest) -> Page<T> {
    let total_count = all.len();
    let total_pages = total_count.div_ceil(request.page_size);

    let items = all
        .iter()
        .skip(request.offset())
        .take(request.page_size)
        .cloned()
        .collect();

    Page {
        items,
        page: request.page,
        page_size: request.page_size,
        total_count,
        total_pages,
        has_next_page: request.page < total_pages,
        has_previous_page: request.page > 1,
    }
}

/// Presentation order for child records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Most recent first; undated items last
    #[default]
    Newest,
    MostViewed,
    MostLiked,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "newest" => Ok(Self::Newest),
            "most-viewed" | "views" => Ok(Self::MostViewed),
            "most-liked" | "likes" => Ok(Self::MostLiked),
            other => Err(format!(
                "unknown sort '{}', expected newest, most-viewed or most-liked",
                other
            )),
        }
    }
}

/// Sorts items in place; ties fall back to item id
pub fn sort_items(items: &mut [ContentItem], order: SortOrder) {
    items.sort_by(|a, b| {
        let primary = match order {
            SortOrder::Newest => match (a.date_posted, b.date_posted) {
                (Some(x), Some(y)) => y.cmp(&x),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            },
            SortOrder::MostViewed => b.view_count.cmp(&a.view_count),
            SortOrder::MostLiked => b.like_count.cmp(&a.like_count),
        };
        primary.then_with(|| a.item_id.cmp(&b.item_id))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_first_page_of_120() {
        let all: Vec<u32> = (0..120).collect();
        let page = paginate(&all, PageRequest::new(1, 50));

        assert_eq!(page.items.len(), 50);
        assert_eq!(page.total_count, 120);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next_page);
        assert!(!page.has_previous_page);
    }

    #[test]
    fn test_last_page_of_120() {
        let all: Vec<u32> = (0..120).collect();
        let page = paginate(&all, PageRequest::new(3, 50));

        assert_eq!(page.items.len(), 20);
        assert_eq!(page.items[0], 100);
        assert!(!page.has_next_page);
        assert!(page.has_previous_page);
    }

    #[test]
    fn test_out_of_range_page_is_empty() {
        let all: Vec<u32> = (0..10).collect();
        let page = paginate(&all, PageRequest::new(7, 5));

        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 2);
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_request_clamping() {
        assert_eq!(PageRequest::new(0, 500), PageRequest::new(1, 100));
        assert_eq!(PageRequest::new(2, 0).page_size, 1);

        let empty: Vec<u32> = Vec::new();
        let page = paginate(&empty, PageRequest::default());
        assert_eq!(page.total_pages, 0);
        assert!(!page.has_next_page);
    }

    #[test]
    fn test_sort_orders() {
        let mut items: Vec<ContentItem> = ["b", "a", "c"]
            .iter()
            .map(|id| ContentItem::new(id, ContentKind::Video, "", ""))
            .collect();
        items[0].view_count = 10;
        items[1].view_count = 10;
        items[2].view_count = 50;
        items[0].date_posted = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        items[2].date_posted = Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());

        sort_items(&mut items, SortOrder::MostViewed);
        let ids: Vec<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a", "b"]);

        sort_items(&mut items, SortOrder::Newest);
        let ids: Vec<&str> = items.iter().map(|i| i.item_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
    }

    #[test]
    fn test_sort_from_str() {
        assert_eq!("most_viewed".parse::<SortOrder>(), Ok(SortOrder::MostViewed));
        assert_eq!("newest".parse::<SortOrder>(), Ok(SortOrder::Newest));
        assert!("oldest".parse::<SortOrder>().is_err());
    }
}
