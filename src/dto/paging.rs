use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const MAX_PAGE_SIZE: usize = 100;

/// One page of results plus the numbers a pager needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total_items: usize,
    pub total_pages: usize,
    pub has_previous: bool,
    pub has_next: bool,
    pub start_item: usize,
    pub end_item: usize,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, page: usize, page_size: usize, total_items: usize) -> Self {
        let total_pages = if page_size == 0 {
            0
        } else {
            total_items.div_ceil(page_size)
        };
        let start_item = if total_items == 0 {
            0
        } else {
            page_offset(page, page_size).saturating_add(1)
        };
        let end_item = page.saturating_mul(page_size).min(total_items);
        Self {
            items,
            page,
            page_size,
            total_items,
            total_pages,
            has_previous: page > 1,
            has_next: page < total_pages,
            start_item,
            end_item,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items,
            total_pages: self.total_pages,
            has_previous: self.has_previous,
            has_next: self.has_next,
            start_item: self.start_item,
            end_item: self.end_item,
        }
    }
}

/// Rows skipped before `page`. Saturates so huge page numbers land past the end.
pub fn page_offset(page: usize, page_size: usize) -> usize {
    page.saturating_sub(1).saturating_mul(page_size)
}

/// Page number from 1, size clamped to `1..=MAX_PAGE_SIZE`.
pub fn normalize_page(page: Option<usize>, page_size: Option<usize>) -> (usize, usize) {
    let page = page.unwrap_or(1).max(1);
    let page_size = page_size
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    (page, page_size)
}
