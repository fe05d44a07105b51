//! Structured request parameters parsed from a URL query string.
//!
//! # Responsibility
//! - Turn `filter[x]=..&sort=..&include=..&fields[t]=..&page[number]=..`
//!   into typed values.
//! - Keep the original pairs so pagination links can reproduce them.
//!
//! # Invariants
//! - Parsing never fails; malformed or unknown keys are skipped.
//! - Allow-list checks happen later, in the query shaper.

use crate::config::QueryConfig;
use crate::query::sort::SortField;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use url::form_urlencoded;

static BRACKET_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([^\[\]]+)\[([^\[\]]*)\]$").expect("valid bracket key regex"));

/// Request parameters passed explicitly into every collection query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    filters: BTreeMap<String, String>,
    sorts: Vec<SortField>,
    includes: Vec<String>,
    fields: BTreeMap<String, Vec<String>>,
    page_number: Option<u64>,
    page_size: Option<u64>,
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `query` using the default parameter names.
    pub fn parse(query: &str) -> Self {
        Self::parse_with(query, &QueryConfig::default())
    }

    /// Parses `query` (with or without a leading `?`).
    pub fn parse_with(query: &str, config: &QueryConfig) -> Self {
        let query = query.trim().trim_start_matches('?');
        let mut params = Self::default();
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            params.push_pair(key.into_owned(), value.into_owned(), config);
        }
        params
    }

    /// Adds `filter[name]=value`.
    pub fn with_filter(self, name: &str, value: impl Into<String>) -> Self {
        let config = QueryConfig::default();
        let key = format!("{}[{name}]", config.filter_parameter);
        self.with_pair(key, value.into(), &config)
    }

    /// Replaces the sort terms with a comma list such as `-name,age`.
    pub fn with_sort(self, terms: impl Into<String>) -> Self {
        let config = QueryConfig::default();
        let key = config.sort_parameter.clone();
        self.with_pair(key, terms.into(), &config)
    }

    /// Replaces the includes with a comma list such as `posts,profile`.
    pub fn with_include(self, relations: impl Into<String>) -> Self {
        let config = QueryConfig::default();
        let key = config.include_parameter.clone();
        self.with_pair(key, relations.into(), &config)
    }

    /// Adds `fields[table]=a,b`.
    pub fn with_fields(self, table: &str, columns: impl Into<String>) -> Self {
        let config = QueryConfig::default();
        let key = format!("{}[{table}]", config.fields_parameter);
        self.with_pair(key, columns.into(), &config)
    }

    /// Sets `page[number]` and `page[size]`.
    pub fn with_page(self, number: u64, size: u64) -> Self {
        let config = QueryConfig::default();
        let number_key = config.page_number_parameter();
        let size_key = format!("{}[{}]", config.page_parameter, config.page_size_key);
        self.with_pair(number_key, number.to_string(), &config)
            .with_pair(size_key, size.to_string(), &config)
    }

    pub fn filters(&self) -> &BTreeMap<String, String> {
        &self.filters
    }

    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters.get(name).map(String::as_str)
    }

    pub fn sorts(&self) -> &[SortField] {
        &self.sorts
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    /// Requested projection for `table`, falling back to unscoped `fields=`.
    pub fn fields_for(&self, table: &str) -> Option<&[String]> {
        self.fields
            .get(table)
            .or_else(|| self.fields.get(""))
            .map(Vec::as_slice)
    }

    pub fn page_number(&self) -> Option<u64> {
        self.page_number
    }

    pub fn page_size(&self) -> Option<u64> {
        self.page_size
    }

    /// Decoded query pairs in request order.
    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    fn with_pair(mut self, key: String, value: String, config: &QueryConfig) -> Self {
        self.pairs.retain(|(existing, _)| *existing != key);
        self.push_pair(key, value, config);
        self
    }

    fn push_pair(&mut self, key: String, value: String, config: &QueryConfig) {
        self.absorb(&key, &value, config);
        self.pairs.push((key, value));
    }

    fn absorb(&mut self, key: &str, value: &str, config: &QueryConfig) {
        if let Some(captures) = BRACKET_KEY_RE.captures(key) {
            let base = &captures[1];
            let inner = &captures[2];
            if base == config.filter_parameter && !inner.is_empty() {
                self.filters.insert(inner.to_string(), value.to_string());
            } else if base == config.fields_parameter {
                self.fields.insert(inner.to_string(), split_list(value));
            } else if base == config.page_parameter && inner == config.page_number_key {
                self.page_number = parse_positive(value);
            } else if base == config.page_parameter && inner == config.page_size_key {
                self.page_size = parse_positive(value);
            } else {
                debug!("event=query_param_skipped module=query key={key}");
            }
            return;
        }

        if key == config.sort_parameter {
            self.sorts = split_list(value)
                .iter()
                .filter_map(|term| SortField::parse(term))
                .collect();
        } else if key == config.include_parameter {
            self.includes = split_list(value);
        } else if key == config.fields_parameter {
            self.fields.insert(String::new(), split_list(value));
        } else if key == config.page_parameter {
            self.page_number = parse_positive(value);
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_positive(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|number| *number > 0)
}
