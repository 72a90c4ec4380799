//! Page requests and paginated results

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::DEFAULT_PAGE_SIZE;
use crate::params::ParamSource;

/// Which page to fetch and how large pages are.
///
/// `page` is at least 1 and `per_page` is never 0, however the request was
/// built or deserialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawPageRequest")]
pub struct PageRequest {
    page: u64,
    per_page: u64,
}

#[derive(Deserialize)]
struct RawPageRequest {
    #[serde(default)]
    page: u64,
    #[serde(default)]
    per_page: u64,
}

impl From<RawPageRequest> for PageRequest {
    fn from(raw: RawPageRequest) -> Self {
        Self::new(raw.page, raw.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            per_page: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    /// Pages start at 1; a zero page size falls back to the default
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: if per_page == 0 { DEFAULT_PAGE_SIZE } else { per_page },
        }
    }

    /// First page of `per_page` items
    pub fn first(per_page: u64) -> Self {
        Self::new(1, per_page)
    }

    /// Read `page` and `per_page` (or `list_rows`) from request parameters.
    /// Missing, malformed or zero values fall back to page 1 and
    /// `default_per_page`.
    pub fn from_params(params: &dyn ParamSource, default_per_page: u64) -> Self {
        let page = params.param("page").and_then(|v| as_u64(&v)).unwrap_or(1);
        let per_page = params
            .param("per_page")
            .or_else(|| params.param("list_rows"))
            .and_then(|v| as_u64(&v))
            .filter(|&n| n > 0)
            .unwrap_or(default_per_page);
        Self::new(page, per_page)
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn per_page(&self) -> u64 {
        self.per_page
    }

    pub fn offset(&self) -> u64 {
        self.page.saturating_sub(1).saturating_mul(self.per_page)
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// One page of results plus the metadata needed to render page links
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginator<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
}

impl<T> Paginator<T> {
    pub fn new(items: Vec<T>, total: u64, request: PageRequest) -> Self {
        let per_page = request.per_page().max(1);
        Self {
            items,
            total,
            per_page,
            current_page: request.page().max(1),
            last_page: total.div_ceil(per_page).max(1),
        }
    }

    pub fn has_more(&self) -> bool {
        self.current_page < self.last_page
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U, F>(self, f: F) -> Paginator<U>
    where
        F: FnMut(T) -> U,
    {
        Paginator {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            per_page: self.per_page,
            current_page: self.current_page,
            last_page: self.last_page,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::RequestParams;

    #[test]
    fn test_page_request_normalization() {
        let request = PageRequest::new(0, 0);
        assert_eq!((request.page(), request.per_page()), (1, 10));
        assert_eq!(PageRequest::new(3, 15).offset(), 30);
        assert_eq!(PageRequest::default().offset(), 0);
    }

    #[test]
    fn test_deserialized_request_is_normalized() {
        let request: PageRequest = serde_json::from_str(r#"{"page":0,"per_page":10}"#).unwrap();
        assert_eq!(request.page(), 1);
        assert_eq!(request.offset(), 0);

        let request: PageRequest = serde_json::from_str(r#"{"per_page":0}"#).unwrap();
        assert_eq!(request, PageRequest::default());
    }

    #[test]
    fn test_huge_page_offset_saturates() {
        assert_eq!(PageRequest::new(u64::MAX, 10).offset(), u64::MAX);
    }

    #[test]
    fn test_from_params() {
        let params = RequestParams::from_query("page=4&list_rows=20");
        assert_eq!(PageRequest::from_params(&params, 10), PageRequest::new(4, 20));

        let params = RequestParams::from_query("page=abc");
        assert_eq!(PageRequest::from_params(&params, 25), PageRequest::new(1, 25));

        let params = RequestParams::from_query("page=0&per_page=0");
        assert_eq!(PageRequest::from_params(&params, 25), PageRequest::new(1, 25));

        let params = RequestParams::from_query("page=18446744073709551615&per_page=10");
        assert_eq!(PageRequest::from_params(&params, 25).page(), u64::MAX);
    }

    #[test]
    fn test_paginator_metadata() {
        let page = Paginator::new(vec![1, 2, 3, 4, 5], 25, PageRequest::new(3, 10));
        assert_eq!(page.last_page, 3);
        assert!(!page.has_more());

        let empty: Paginator<i32> = Paginator::new(Vec::new(), 0, PageRequest::default());
        assert_eq!(empty.last_page, 1);
        assert!(empty.is_empty());

        let doubled = Paginator::new(vec![1, 2], 12, PageRequest::new(1, 2)).map(|n| n * 2);
        assert_eq!(doubled.items, vec![2, 4]);
        assert_eq!(doubled.last_page, 6);
        assert!(doubled.has_more());
    }
}
