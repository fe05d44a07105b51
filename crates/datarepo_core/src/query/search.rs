//! Substring ("like") matching across a field set.

use crate::query::sql::Conditions;

/// Escapes `LIKE` wildcards so `term` matches literally, using `\`.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for ch in term.chars() {
        if matches!(ch, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// `%term%` with wildcards in `term` escaped.
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// Adds `(f1 LIKE %term% OR f2 LIKE %term% ...)` to `conditions`.
///
/// An empty field set adds no constraint.
pub fn where_like(conditions: &mut Conditions, fields: &[String], term: &str) {
    let pattern = contains_pattern(term);
    conditions.like_any(
        fields
            .iter()
            .map(|field| (field.clone(), pattern.clone()))
            .collect(),
    );
}
