//! Sort declarations and `sort=` parameter parsing.

use serde::Deserialize;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }

    /// Parses `asc`/`desc` in any case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

/// One requested ordering term: `name` ascending, `-name` descending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    pub name: String,
    pub direction: SortDirection,
}

impl SortField {
    pub fn asc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            direction: SortDirection::Desc,
        }
    }

    /// Parses one term; blank terms yield `None`.
    pub fn parse(term: &str) -> Option<Self> {
        let term = term.trim();
        let (name, direction) = match term.strip_prefix('-') {
            Some(rest) => (rest.trim(), SortDirection::Desc),
            None => (term.strip_prefix('+').unwrap_or(term).trim(), SortDirection::Asc),
        };
        if name.is_empty() {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            direction,
        })
    }
}

impl Display for SortField {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.direction {
            SortDirection::Asc => write!(f, "{}", self.name),
            SortDirection::Desc => write!(f, "-{}", self.name),
        }
    }
}

/// Sort exposed to callers under `name`, ordering by `column`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AllowedSort {
    pub name: String,
    #[serde(default)]
    pub column: Option<String>,
}

impl AllowedSort {
    /// Sort whose public name is the column name.
    pub fn field(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: None,
        }
    }

    /// Sort exposed under an alias.
    pub fn aliased(name: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            column: Some(column.into()),
        }
    }

    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }
}
