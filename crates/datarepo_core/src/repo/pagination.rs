//! Offset pagination with total-count metadata and navigation links.
//!
//! # Invariants
//! - `last_page >= 1`, also for empty result sets.
//! - Links keep every original query pair except the page number, which is
//!   replaced.

use crate::model::Record;
use crate::query::sql::SelectQuery;
use crate::repo::error::RepoResult;
use crate::repo::exec::{count_records, fetch_records};
use rusqlite::Connection;
use serde::Serialize;
use url::form_urlencoded;

/// One bounded slice of a result set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
    /// 1-based position of the first item, `None` for an empty page.
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub links: PageLinks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLinks {
    pub first: String,
    pub last: String,
    pub prev: Option<String>,
    pub next: Option<String>,
}

/// Builds page links for one query string layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Paginator {
    path: String,
    number_parameter: String,
    pairs: Vec<(String, String)>,
}

impl Paginator {
    /// `number_parameter` is the query key carrying the page number, such as
    /// `page` or `page[number]`.
    pub fn new(path: impl Into<String>, number_parameter: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            number_parameter: number_parameter.into(),
            pairs: Vec::new(),
        }
    }

    /// Keeps `pairs` on every generated link.
    pub fn preserving(mut self, pairs: &[(String, String)]) -> Self {
        self.pairs = pairs.to_vec();
        self
    }

    pub fn url(&self, page: u64) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &self.pairs {
            if *key != self.number_parameter {
                serializer.append_pair(key, value);
            }
        }
        serializer.append_pair(&self.number_parameter, &page.to_string());
        format!("{}?{}", self.path, serializer.finish())
    }

    /// Wraps one fetched slice in page metadata.
    pub fn page<T>(&self, data: Vec<T>, total: u64, per_page: u64, current_page: u64) -> Page<T> {
        let per_page = per_page.max(1);
        let current_page = current_page.max(1);
        let last_page = total.div_ceil(per_page).max(1);
        let (from, to) = if data.is_empty() {
            (None, None)
        } else {
            let from = (current_page - 1) * per_page + 1;
            (Some(from), Some(from + data.len() as u64 - 1))
        };

        let links = PageLinks {
            first: self.url(1),
            last: self.url(last_page),
            prev: (current_page > 1).then(|| self.url(current_page - 1)),
            next: (current_page < last_page).then(|| self.url(current_page + 1)),
        };

        Page {
            data,
            total,
            per_page,
            current_page,
            last_page,
            from,
            to,
            links,
        }
    }
}

/// Counts matches for `query`, then fetches the requested slice.
pub(crate) fn fetch_page(
    conn: &Connection,
    query: &SelectQuery,
    per_page: u64,
    page: u64,
) -> RepoResult<(Vec<Record>, u64)> {
    let per_page = per_page.max(1);
    let page = page.max(1);
    let total = count_records(conn, query)?;

    let mut sliced = query.clone();
    sliced.limit(per_page);
    sliced.offset((page - 1).saturating_mul(per_page));
    let records = fetch_records(conn, &sliced)?;
    Ok((records, total))
}
