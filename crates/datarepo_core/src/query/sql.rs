//! SQL text assembly with bound parameters.
//!
//! # Invariants
//! - Identifiers are always quoted; callers validate them against the model
//!   before they reach this module.
//! - Values never appear in SQL text, only in the bind list.

use crate::model::FieldValue;
use crate::query::sort::SortDirection;

/// Quotes an SQLite identifier, doubling embedded quotes.
pub(crate) fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Conjunction of `WHERE` predicates with their bind values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conditions {
    clauses: Vec<String>,
    binds: Vec<FieldValue>,
}

impl Conditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// `column = value`, or `column IS NULL` for null values.
    pub fn where_eq(&mut self, column: &str, value: FieldValue) {
        if value.is_null() {
            self.clauses.push(format!("{} IS NULL", quote_ident(column)));
            return;
        }
        self.clauses.push(format!("{} = ?", quote_ident(column)));
        self.binds.push(value);
    }

    /// `column IN (...)`. An empty list matches nothing.
    pub fn is_in(&mut self, column: &str, values: Vec<FieldValue>) {
        if values.is_empty() {
            self.clauses.push("0 = 1".to_string());
            return;
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        self.clauses
            .push(format!("{} IN ({placeholders})", quote_ident(column)));
        self.binds.extend(values);
    }

    /// `column <op> value` for a comparison operator token.
    pub fn compare(&mut self, column: &str, operator: &str, value: FieldValue) {
        self.clauses
            .push(format!("{} {operator} ?", quote_ident(column)));
        self.binds.push(value);
    }

    /// `(c1 LIKE p OR c2 LIKE p ...)` for every `(column, pattern)` pair.
    ///
    /// Patterns must already be escaped with `\`. An empty list adds nothing.
    pub fn like_any(&mut self, pairs: Vec<(String, String)>) {
        if pairs.is_empty() {
            return;
        }
        let mut parts = Vec::with_capacity(pairs.len());
        for (column, pattern) in pairs {
            parts.push(format!("{} LIKE ? ESCAPE '\\'", quote_ident(&column)));
            self.binds.push(FieldValue::Text(pattern));
        }
        self.clauses.push(format!("({})", parts.join(" OR ")));
    }

    /// Appends ` WHERE ...` (or nothing) to `sql` and returns the binds.
    pub(crate) fn write_where(&self, sql: &mut String) -> Vec<FieldValue> {
        if !self.clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.clauses.join(" AND "));
        }
        self.binds.clone()
    }
}

/// `SELECT` statement over one table.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    table: String,
    columns: Vec<String>,
    conditions: Conditions,
    orders: Vec<(String, SortDirection)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQuery {
    pub fn new(table: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            table: table.into(),
            columns,
            conditions: Conditions::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn set_columns(&mut self, columns: Vec<String>) {
        self.columns = columns;
    }

    pub fn conditions_mut(&mut self) -> &mut Conditions {
        &mut self.conditions
    }

    pub fn order_by(&mut self, column: impl Into<String>, direction: SortDirection) {
        let column = column.into();
        if self.orders.iter().any(|(existing, _)| *existing == column) {
            return;
        }
        self.orders.push((column, direction));
    }

    pub fn limit(&mut self, limit: u64) {
        self.limit = Some(limit);
    }

    pub fn offset(&mut self, offset: u64) {
        self.offset = Some(offset);
    }

    /// Renders the statement and its bind values in placeholder order.
    pub fn to_sql(&self) -> (String, Vec<FieldValue>) {
        let projection = self
            .columns
            .iter()
            .map(|column| quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");
        let mut sql = format!("SELECT {projection} FROM {}", quote_ident(&self.table));
        let mut binds = self.conditions.write_where(&mut sql);

        if !self.orders.is_empty() {
            let orders = self
                .orders
                .iter()
                .map(|(column, direction)| format!("{} {}", quote_ident(column), direction.as_sql()))
                .collect::<Vec<_>>()
                .join(", ");
            sql.push_str(" ORDER BY ");
            sql.push_str(&orders);
        }

        match (self.limit, self.offset) {
            (Some(limit), offset) => {
                sql.push_str(" LIMIT ?");
                binds.push(FieldValue::Integer(to_i64(limit)));
                if let Some(offset) = offset.filter(|value| *value > 0) {
                    sql.push_str(" OFFSET ?");
                    binds.push(FieldValue::Integer(to_i64(offset)));
                }
            }
            (None, Some(offset)) if offset > 0 => {
                sql.push_str(" LIMIT -1 OFFSET ?");
                binds.push(FieldValue::Integer(to_i64(offset)));
            }
            (None, _) => {}
        }

        (sql, binds)
    }

    /// Renders `SELECT COUNT(*)` over the same conditions.
    pub fn to_count_sql(&self) -> (String, Vec<FieldValue>) {
        let mut sql = format!("SELECT COUNT(*) FROM {}", quote_ident(&self.table));
        let binds = self.conditions.write_where(&mut sql);
        (sql, binds)
    }
}

fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
