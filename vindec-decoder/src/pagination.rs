//! Pagination utilities for the admin listing

/// Page size used when the client does not ask for one
pub const DEFAULT_PAGE_SIZE: i64 = 20;

/// Largest page size a client may request
pub const MAX_PAGE_SIZE: i64 = 100;

/// Pagination metadata calculated from total results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Current page number (1-indexed)
    pub page: i64,
    /// Rows per page after clamping
    pub page_size: i64,
    /// Total number of pages
    pub total_pages: i64,
    /// Offset for SQL LIMIT/OFFSET query
    pub offset: i64,
}

/// Clamp a requested page size to `[1, MAX_PAGE_SIZE]`
pub fn clamp_page_size(requested: i64) -> i64 {
    requested.clamp(1, MAX_PAGE_SIZE)
}

/// Calculate pagination metadata from total results and requested page
///
/// Page is kept within `[1, total_pages]` (page 1 when there are no rows).
///
/// # Examples
/// ```
/// use vindec_decoder::pagination::calculate_pagination;
///
/// // 45 results at 20 per page = 3 pages (20 + 20 + 5)
/// let p = calculate_pagination(45, 2, 20);
/// assert_eq!(p.page, 2);
/// assert_eq!(p.total_pages, 3);
/// assert_eq!(p.offset, 20);
///
/// // Requesting out-of-bounds page gets clamped
/// let p = calculate_pagination(45, 99, 20);
/// assert_eq!(p.page, 3);
/// assert_eq!(p.offset, 40);
/// ```
pub fn calculate_pagination(total_results: i64, requested_page: i64, page_size: i64) -> Pagination {
    let page_size = clamp_page_size(page_size);
    let total_pages = (total_results + page_size - 1) / page_size;
    let page = requested_page.max(1).min(total_pages.max(1));
    let offset = (page - 1) * page_size;

    Pagination {
        page,
        page_size,
        total_pages,
        offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pagination_normal() {
        let p = calculate_pagination(250, 2, 100);
        assert_eq!(p.page, 2);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_default_page_size() {
        let p = calculate_pagination(41, 3, DEFAULT_PAGE_SIZE);
        assert_eq!(p.page, 3);
        assert_eq!(p.total_pages, 3);
        assert_eq!(p.offset, 40);
    }

    #[test]
    fn test_pagination_out_of_bounds_high() {
        let p = calculate_pagination(150, 99, 100);
        assert_eq!(p.page, 2);
        assert_eq!(p.offset, 100);
    }

    #[test]
    fn test_pagination_out_of_bounds_low() {
        let p = calculate_pagination(150, 0, 100);
        assert_eq!(p.page, 1);
        assert_eq!(p.offset, 0);

        let p = calculate_pagination(150, -5, 100);
        assert_eq!(p.page, 1);
    }

    #[test]
    fn test_pagination_empty() {
        let p = calculate_pagination(0, 1, 20);
        assert_eq!(p.page, 1);
        assert_eq!(p.total_pages, 0);
        assert_eq!(p.offset, 0);
    }

    #[test]
    fn test_page_size_clamped() {
        assert_eq!(clamp_page_size(0), 1);
        assert_eq!(clamp_page_size(-3), 1);
        assert_eq!(clamp_page_size(50), 50);
        assert_eq!(clamp_page_size(1000), MAX_PAGE_SIZE);

        let p = calculate_pagination(500, 2, 1000);
        assert_eq!(p.page_size, 100);
        assert_eq!(p.offset, 100);
    }
}
