//! Pagination summary for the applicants table

/// Display metadata for one page of results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    pub total_pages: i64,
    /// 1-based index of the first row shown, 0 when the page is empty
    pub first_item: i64,
    /// 1-based index of the last row shown
    pub last_item: i64,
}

impl Pagination {
    pub fn has_previous(&self) -> bool {
        self.page > 1
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }
}

/// Calculate pagination metadata from total results and requested page
///
/// The page is not clamped: a page past the end reports no visible rows.
///
/// # Examples
/// ```
/// use wct_admin::pagination::calculate_pagination;
///
/// // 45 results at 20 per page = 3 pages (20 + 20 + 5)
/// let p = calculate_pagination(45, 3, 20);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!((p.first_item, p.last_item), (41, 45));
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, page_size: i64) -> Pagination {
    let page_size = page_size.max(1);
    let page = requested_page.max(1);
    let total_pages = (total_results + page_size - 1) / page_size;
    let offset = (page - 1).saturating_mul(page_size);

    let (first_item, last_item) = if offset >= total_results {
        (0, 0)
    } else {
        (offset + 1, (offset + page_size).min(total_results))
    };

    Pagination {
        page,
        total_pages,
        first_item,
        last_item,
    }
}
