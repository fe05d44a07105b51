//! Filter declarations and their translation into `WHERE` predicates.
//!
//! # Invariants
//! - A filter only ever touches its own declared column.
//! - Blank values are treated as "no filter".

use crate::model::FieldValue;
use crate::query::search::contains_pattern;
use crate::query::sql::Conditions;
use serde::Deserialize;

/// How a filter value constrains its column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Equality; a comma list becomes `IN`.
    Exact,
    /// Substring match; a comma list matches any item.
    #[default]
    Partial,
    /// Comparison with an optional leading operator, e.g. `>=18`.
    Operator,
}

/// Filter exposed to callers under `name`, constraining `column`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AllowedFilter {
    pub name: String,
    #[serde(default)]
    pub column: Option<String>,
    #[serde(default)]
    pub kind: FilterKind,
}

impl AllowedFilter {
    pub fn exact(name: impl Into<String>) -> Self {
        Self::build(name, FilterKind::Exact)
    }

    pub fn partial(name: impl Into<String>) -> Self {
        Self::build(name, FilterKind::Partial)
    }

    pub fn operator(name: impl Into<String>) -> Self {
        Self::build(name, FilterKind::Operator)
    }

    /// Points the filter at a column other than its public name.
    pub fn on_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn column(&self) -> &str {
        self.column.as_deref().unwrap_or(&self.name)
    }

    /// Adds this filter's predicate for `raw` to `conditions`.
    ///
    /// Returns `false` when `raw` carries no usable value.
    pub fn apply(&self, conditions: &mut Conditions, raw: &str) -> bool {
        let values = split_values(raw);
        if values.is_empty() {
            return false;
        }

        match self.kind {
            FilterKind::Exact => {
                let mut bound: Vec<FieldValue> =
                    values.iter().map(|value| exact_value(value)).collect();
                if bound.len() == 1 {
                    conditions.where_eq(self.column(), bound.remove(0));
                } else {
                    conditions.is_in(self.column(), bound);
                }
            }
            FilterKind::Partial => {
                conditions.like_any(
                    values
                        .iter()
                        .map(|value| (self.column().to_string(), contains_pattern(value)))
                        .collect(),
                );
            }
            FilterKind::Operator => {
                let (operator, value) = split_operator(raw.trim());
                if value.is_empty() {
                    return false;
                }
                conditions.compare(self.column(), operator, FieldValue::from(value));
            }
        }
        true
    }

    fn build(name: impl Into<String>, kind: FilterKind) -> Self {
        Self {
            name: name.into(),
            column: None,
            kind,
        }
    }
}

fn split_values(raw: &str) -> Vec<&str> {
    raw.split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .collect()
}

fn exact_value(value: &str) -> FieldValue {
    match value {
        "true" => FieldValue::Integer(1),
        "false" => FieldValue::Integer(0),
        other => FieldValue::from(other),
    }
}

/// Splits a leading comparison operator off `raw`; defaults to `=`.
fn split_operator(raw: &str) -> (&'static str, &str) {
    const OPERATORS: &[(&str, &str)] = &[
        (">=", ">="),
        ("<=", "<="),
        ("<>", "<>"),
        ("!=", "<>"),
        (">", ">"),
        ("<", "<"),
        ("=", "="),
    ];
    for &(prefix, operator) in OPERATORS {
        if let Some(rest) = raw.strip_prefix(prefix) {
            return (operator, rest.trim());
        }
    }
    ("=", raw)
}

#[cfg(test)]
mod tests {
    use super::{split_operator, AllowedFilter};
    use crate::model::FieldValue;
    use crate::query::sql::Conditions;

    fn render(conditions: &Conditions) -> (String, Vec<FieldValue>) {
        let mut sql = String::new();
        let binds = conditions.write_where(&mut sql);
        (sql, binds)
    }

    #[test]
    fn exact_single_value_is_equality() {
        let mut conditions = Conditions::new();
        assert!(AllowedFilter::exact("status").apply(&mut conditions, "active"));
        let (sql, binds) = render(&conditions);
        assert_eq!(sql, " WHERE \"status\" = ?");
        assert_eq!(binds, vec![FieldValue::from("active")]);
    }

    #[test]
    fn exact_list_becomes_in_and_maps_booleans() {
        let mut conditions = Conditions::new();
        AllowedFilter::exact("flag").apply(&mut conditions, "true, false");
        let (sql, binds) = render(&conditions);
        assert_eq!(sql, " WHERE \"flag\" IN (?, ?)");
        assert_eq!(binds, vec![FieldValue::Integer(1), FieldValue::Integer(0)]);
    }

    #[test]
    fn partial_uses_escaped_contains_pattern_on_alias_column() {
        let mut conditions = Conditions::new();
        AllowedFilter::partial("name")
            .on_column("first_name")
            .apply(&mut conditions, "a_b");
        let (sql, binds) = render(&conditions);
        assert_eq!(sql, " WHERE (\"first_name\" LIKE ? ESCAPE '\\')");
        assert_eq!(binds, vec![FieldValue::from("%a\\_b%")]);
    }

    #[test]
    fn operator_filter_parses_prefix() {
        let mut conditions = Conditions::new();
        AllowedFilter::operator("age").apply(&mut conditions, ">= 18");
        let (sql, binds) = render(&conditions);
        assert_eq!(sql, " WHERE \"age\" >= ?");
        assert_eq!(binds, vec![FieldValue::from("18")]);
        assert_eq!(split_operator("!=3"), ("<>", "3"));
        assert_eq!(split_operator("7"), ("=", "7"));
    }

    #[test]
    fn blank_values_are_ignored() {
        let mut conditions = Conditions::new();
        assert!(!AllowedFilter::exact("status").apply(&mut conditions, " , "));
        assert!(!AllowedFilter::operator("age").apply(&mut conditions, ">="));
        assert!(conditions.is_empty());
    }
}
