//! Page requests and normalized page results.

use serde::Serialize;
use tracing::debug;

/// One list fetch: which page, how many rows, and the search filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub page_size: u32,
    pub search_term: String,
}

impl PageRequest {
    /// Build a request from raw caller input. A page below 1 is clamped to 1
    /// and a non-positive page size falls back to `default_page_size`; neither
    /// is an error.
    pub fn new(page: i64, search_term: &str, page_size: i64, default_page_size: u32) -> Self {
        if page < 1 {
            debug!(page, "page below 1 requested, clamping to 1");
        }
        let page = page.clamp(1, u32::MAX as i64) as u32;
        let page_size = if page_size > 0 {
            page_size.min(u32::MAX as i64) as u32
        } else {
            debug!(page_size, default_page_size, "invalid page size, using default");
            default_page_size.max(1)
        };
        Self {
            page,
            page_size,
            search_term: search_term.to_string(),
        }
    }

    /// Query parameters for the list endpoint. `search` is omitted when empty.
    pub fn query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("page", self.page.to_string()),
            ("per_page", self.page_size.to_string()),
        ];
        if !self.search_term.is_empty() {
            params.push(("search", self.search_term.clone()));
        }
        params
    }
}

/// A normalized page of a remote collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
    pub page_size: u32,
    pub total: u64,
}

impl<T> PageResult<T> {
    /// The fail-closed result held after any fetch failure.
    pub fn empty(page_size: u32) -> Self {
        Self {
            items: Vec::new(),
            current_page: 1,
            last_page: 1,
            page_size,
            total: 0,
        }
    }

    /// Build a result from server-reported metadata, enforcing
    /// `1 <= current_page <= last_page` and `items.len() <= page_size`.
    pub fn from_parts(
        mut items: Vec<T>,
        current_page: u64,
        last_page: u64,
        page_size: u64,
        total: u64,
    ) -> Self {
        let page_size = page_size.clamp(1, u32::MAX as u64) as u32;
        let last_page = last_page.clamp(1, u32::MAX as u64) as u32;
        let current_page = current_page.clamp(1, last_page as u64) as u32;
        if items.len() > page_size as usize {
            debug!(
                received = items.len(),
                page_size, "server returned more rows than per_page, truncating"
            );
            items.truncate(page_size as usize);
        }
        Self {
            items,
            current_page,
            last_page,
            page_size,
            total,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn has_next(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn has_previous(&self) -> bool {
        self.current_page > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_clamps_input() {
        let req = PageRequest::new(-3, "", 0, 10);
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 10);

        let req = PageRequest::new(4, "pizza", 25, 10);
        assert_eq!(req.page, 4);
        assert_eq!(req.page_size, 25);
        assert_eq!(req.search_term, "pizza");
    }

    #[test]
    fn test_query_params_omit_empty_search() {
        let req = PageRequest::new(2, "", 10, 10);
        assert_eq!(
            req.query_params(),
            vec![("page", "2".to_string()), ("per_page", "10".to_string())]
        );

        let req = PageRequest::new(1, "veg burger", 5, 10);
        assert_eq!(req.query_params().last(), Some(&("search", "veg burger".to_string())));
    }

    #[test]
    fn test_from_parts_enforces_invariants() {
        let page = PageResult::from_parts(vec![1, 2, 3, 4], 9, 3, 3, 9);
        assert_eq!(page.current_page, 3);
        assert_eq!(page.last_page, 3);
        assert_eq!(page.items, vec![1, 2, 3]);
        assert!(!page.has_next());
        assert!(page.has_previous());

        let page: PageResult<u8> = PageResult::from_parts(vec![], 0, 0, 0, 0);
        assert_eq!((page.current_page, page.last_page, page.page_size), (1, 1, 1));
    }

    #[test]
    fn test_empty_result() {
        let page: PageResult<String> = PageResult::empty(10);
        assert!(page.is_empty());
        assert_eq!((page.current_page, page.last_page, page.total), (1, 1, 0));
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }
}
