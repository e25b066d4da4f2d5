use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_TAKE: i64 = 10;

/// PageWindow
///
/// The slice a list query should fetch: skip `skip` rows, then take `take`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub take: i64,
    pub skip: i64,
    pub page_count: i64,
}

/// paginate
///
/// `page` is 1-indexed. A page below 1 is clamped to 1 and a take below 1 is clamped to 1,
/// so `skip` is never negative and `page_count` never divides by zero. Neither value
/// overflows for any `take`, including `i64::MAX`.
pub fn paginate(all_count: i64, page: i64, take: i64) -> PageWindow {
    let page = page.max(1);
    let take = take.max(1);
    let all_count = all_count.max(0);

    PageWindow {
        page,
        take,
        skip: (page - 1).saturating_mul(take),
        page_count: all_count / take + i64::from(all_count % take != 0),
    }
}

/// PageQuery
///
/// Query parameters accepted by every list endpoint (`?page=&take=`).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-indexed page number. Defaults to 1.
    pub page: Option<i64>,
    /// Page size. Defaults to 10.
    pub take: Option<i64>,
}

impl PageQuery {
    /// The requested page and take with defaults applied and both clamped to at least 1.
    pub fn resolve(&self) -> (i64, i64) {
        (
            self.page.unwrap_or(DEFAULT_PAGE).max(1),
            self.take.unwrap_or(DEFAULT_TAKE).max(1),
        )
    }

    /// Rows to skip for this query.
    pub fn offset(&self) -> i64 {
        let (page, take) = self.resolve();
        paginate(0, page, take).skip
    }
}

/// Page
///
/// One page of a list query. Built fresh per request and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_count: i64,
    pub page: i64,
    pub take: i64,
    pub page_count: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, query: PageQuery) -> Self {
        let (page, take) = query.resolve();
        let window = paginate(total_count, page, take);
        Self {
            items,
            total_count,
            page: window.page,
            take: window.take,
            page_count: window.page_count,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            take: self.take,
            page_count: self.page_count,
        }
    }
}
