//! Page-number pagination.
//!
//! [`Paginator`] turns a raw `?page=` value and a total item count into a
//! [`PageWindow`] (which slice to fetch), and a fetched slice into a
//! [`Page`] carrying the navigation metadata list views render.
//! Out-of-range requests never fail: they resolve to the first or last page.

use serde::Serialize;

/// Default number of items per page.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Fixed-size page slicer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    per_page: u64,
}

impl Default for Paginator {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl Paginator {
    /// Create a paginator. A page size of zero is treated as one.
    #[must_use]
    pub const fn new(per_page: u64) -> Self {
        Self {
            per_page: if per_page == 0 { 1 } else { per_page },
        }
    }

    /// Number of pages for `count` items. An empty collection still has one page.
    #[must_use]
    pub const fn num_pages(&self, count: u64) -> u64 {
        if count == 0 {
            1
        } else {
            count.div_ceil(self.per_page)
        }
    }

    /// Resolve the requested page against `count` items.
    #[must_use]
    pub fn window(&self, raw_page: Option<&str>, count: u64) -> PageWindow {
        let num_pages = self.num_pages(count);
        let number = parse_page_number(raw_page).clamp(1, num_pages);

        PageWindow {
            number,
            num_pages,
            count,
            offset: (number - 1) * self.per_page,
            limit: self.per_page,
        }
    }
}

/// Interprets a raw page parameter.
///
/// Missing or non-numeric values mean page 1, values below 1 mean page 1,
/// and digit strings too large for `u64` saturate so they clamp to the last page.
fn parse_page_number(raw: Option<&str>) -> u64 {
    let Some(raw) = raw.map(str::trim) else {
        return 1;
    };

    if let Ok(number) = raw.parse::<u64>() {
        return number.max(1);
    }

    let unsigned = raw.strip_prefix('+').unwrap_or(raw);
    if !unsigned.is_empty() && unsigned.bytes().all(|b| b.is_ascii_digit()) {
        return u64::MAX;
    }

    1
}

/// The slice of a collection a page covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number, always within `1..=num_pages`.
    pub number: u64,
    /// Total number of pages.
    pub num_pages: u64,
    /// Total number of items in the collection.
    pub count: u64,
    /// Items to skip.
    pub offset: u64,
    /// Items to take.
    pub limit: u64,
}

/// One page of an ordered collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    /// Items on this page.
    pub object_list: Vec<T>,
    /// 1-based page number.
    pub number: u64,
    /// Total number of pages.
    pub num_pages: u64,
    /// Total number of items across all pages.
    pub count: u64,
    /// Whether a later page exists.
    pub has_next: bool,
    /// Whether an earlier page exists.
    pub has_previous: bool,
    /// Number of the next page, if any.
    pub next_page_number: Option<u64>,
    /// Number of the previous page, if any.
    pub previous_page_number: Option<u64>,
}

impl<T> Page<T> {
    /// Build a page from the fetched items of `window`.
    #[must_use]
    pub fn new(object_list: Vec<T>, window: PageWindow) -> Self {
        let has_next = window.number < window.num_pages;
        let has_previous = window.number > 1;

        Self {
            object_list,
            number: window.number,
            num_pages: window.num_pages,
            count: window.count,
            has_next,
            has_previous,
            next_page_number: has_next.then(|| window.number + 1),
            previous_page_number: has_previous.then(|| window.number - 1),
        }
    }

    /// Number of items on this page.
    #[must_use]
    pub fn len(&self) -> usize {
        self.object_list.len()
    }

    /// Whether this page holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.object_list.is_empty()
    }
}
