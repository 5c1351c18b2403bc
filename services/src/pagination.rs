//! Pure pagination window math, shared by the image and web-link listings.

/// Page-number oriented pagination summary (image listing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageInfo {
    pub current_page: u64,
    pub total_pages: u64,
    pub has_next: bool,
    pub has_prev: bool,
}

/// Compute the page window for a 1-based `page` over `total` rows.
///
/// `total == 0` yields zero pages and neither a next nor a previous page.
pub fn page_info(total: u64, page: u64, limit: u64) -> PageInfo {
    let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
    PageInfo {
        current_page: page,
        total_pages,
        has_next: page < total_pages,
        has_prev: page > 1,
    }
}

/// Offset oriented pagination summary (web-link listing).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffsetInfo {
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
    pub has_more: bool,
    pub total_pages: u64,
    pub current_page: u64,
}

/// Compute the offset window over `total` rows.
pub fn offset_info(total: u64, limit: u64, offset: u64) -> OffsetInfo {
    let total_pages = if limit == 0 { 0 } else { total.div_ceil(limit) };
    let current_page = if limit == 0 { 0 } else { offset / limit + 1 };
    OffsetInfo {
        total,
        limit,
        offset,
        has_more: offset.saturating_add(limit) < total,
        total_pages,
        current_page,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_info_empty() {
        let info = page_info(0, 1, 12);
        assert_eq!(info.total_pages, 0);
        assert!(!info.has_next);
        assert!(!info.has_prev);
    }

    #[test]
    fn test_page_info_exact_multiple() {
        let info = page_info(24, 2, 12);
        assert_eq!(info.total_pages, 2);
        assert!(!info.has_next);
        assert!(info.has_prev);
    }

    #[test]
    fn test_page_info_partial_last_page() {
        let info = page_info(25, 1, 12);
        assert_eq!(info.total_pages, 3);
        assert!(info.has_next);
        assert!(!info.has_prev);
    }

    #[test]
    fn test_page_info_algebra_holds_over_range() {
        for total in 0..50u64 {
            for page in 1..8u64 {
                for limit in 1..8u64 {
                    let info = page_info(total, page, limit);
                    assert_eq!(info.total_pages, total.div_ceil(limit));
                    assert_eq!(info.has_next, page < info.total_pages);
                    assert_eq!(info.has_prev, page > 1);
                }
            }
        }
    }

    #[test]
    fn test_offset_info_first_window() {
        let info = offset_info(120, 50, 0);
        assert_eq!(info.total_pages, 3);
        assert_eq!(info.current_page, 1);
        assert!(info.has_more);
    }

    #[test]
    fn test_offset_info_last_window() {
        let info = offset_info(120, 50, 100);
        assert_eq!(info.current_page, 3);
        assert!(!info.has_more);
    }

    #[test]
    fn test_offset_info_extreme_offset_does_not_wrap() {
        let info = offset_info(120, 50, u64::MAX);
        assert!(!info.has_more);
    }

    #[test]
    fn test_offset_info_empty() {
        let info = offset_info(0, 50, 0);
        assert_eq!(info.total, 0);
        assert_eq!(info.total_pages, 0);
        assert_eq!(info.current_page, 1);
        assert!(!info.has_more);
    }
}
