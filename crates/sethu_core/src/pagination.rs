use serde::Serialize;

/// Page size of the main knowledge listing.
pub const KNOWLEDGE_PAGE_SIZE: usize = 15;
/// Page size of the short preview strips on the home page.
pub const PREVIEW_PAGE_SIZE: usize = 5;
/// Page size of the dashboard reading list.
pub const DASHBOARD_PAGE_SIZE: usize = 7;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
    pub total_pages: usize,
    pub has_more: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            pagination: self.pagination,
        }
    }
}

/// Number of pages for `total` items; never less than one, so an empty
/// result is "page 1 of 1".
pub fn total_pages(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1)).max(1)
}

/// Slices `items` into the 1-based `page` of size `page_size`.
///
/// Pages below 1 are read as page 1. Pages past the end come back empty with
/// `has_more == false` instead of failing.
pub fn paginate<T: Clone>(items: &[T], page: usize, page_size: usize) -> Page<T> {
    let per_page = page_size.max(1);
    let page = page.max(1);
    let total = items.len();

    let start = (page - 1).saturating_mul(per_page);
    let slice = if start < total {
        let end = start.saturating_add(per_page).min(total);
        items[start..end].to_vec()
    } else {
        Vec::new()
    };

    Page {
        items: slice,
        pagination: Pagination {
            page,
            per_page,
            total,
            total_pages: total_pages(total, per_page),
            has_more: page.saturating_mul(per_page) < total,
        },
    }
}
