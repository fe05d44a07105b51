//! Dynamic read model and write attributes.

use super::value::FieldValue;
use rusqlite::Row;
use serde::Serialize;
use std::collections::BTreeMap;

/// One row read from a resource table, plus any eager-loaded relations.
///
/// Serializes as a flat JSON object: columns first, relation names mapping to
/// nested objects (`HasOne`/`BelongsTo`) or arrays (`HasMany`).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    #[serde(flatten)]
    attributes: BTreeMap<String, FieldValue>,
    #[serde(flatten)]
    relations: BTreeMap<String, Related>,
}

/// Eager-loaded relation payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Related {
    One(Option<Box<Record>>),
    Many(Vec<Record>),
}

impl Record {
    pub(crate) fn from_row(row: &Row<'_>, columns: &[String]) -> rusqlite::Result<Self> {
        let mut attributes = BTreeMap::new();
        for (index, column) in columns.iter().enumerate() {
            attributes.insert(column.clone(), row.get::<_, FieldValue>(index)?);
        }
        Ok(Self {
            attributes,
            relations: BTreeMap::new(),
        })
    }

    /// Returns the value of one column, if it was selected.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.attributes.get(column)
    }

    pub fn attributes(&self) -> &BTreeMap<String, FieldValue> {
        &self.attributes
    }

    pub fn relation(&self, name: &str) -> Option<&Related> {
        self.relations.get(name)
    }

    pub fn relations(&self) -> &BTreeMap<String, Related> {
        &self.relations
    }

    pub(crate) fn set_relation(&mut self, name: &str, related: Related) {
        self.relations.insert(name.to_string(), related);
    }

    /// Drops helper columns that were selected only to resolve relations.
    pub(crate) fn retain_columns(&mut self, keep: &[String]) {
        self.attributes.retain(|column, _| keep.contains(column));
    }
}

impl Related {
    /// Returns the related records as a slice, empty when a single relation
    /// is unset.
    pub fn records(&self) -> &[Record] {
        match self {
            Self::One(Some(record)) => std::slice::from_ref(record.as_ref()),
            Self::One(None) => &[],
            Self::Many(records) => records.as_slice(),
        }
    }
}

/// Ordered column -> value map used for inserts, updates and equality
/// condition sets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Attributes {
    values: BTreeMap<String, FieldValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.values.insert(column.into(), value.into());
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.values.get(column)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.values.iter()
    }

    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attributes = Self::new();
        for (column, value) in iter {
            attributes.insert(column, value);
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::{Attributes, FieldValue, Record, Related};

    #[test]
    fn record_serializes_relations_inline() {
        let mut child = Record::default();
        child.attributes.insert("id".to_string(), FieldValue::Integer(9));

        let mut record = Record::default();
        record.attributes.insert("id".to_string(), FieldValue::Integer(1));
        record.set_relation("posts", Related::Many(vec![child]));
        record.set_relation("profile", Related::One(None));

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "id": 1, "posts": [{ "id": 9 }], "profile": null })
        );
    }

    #[test]
    fn attributes_keep_last_value_per_column() {
        let attributes = Attributes::new().with("name", "a").with("name", "b");
        assert_eq!(attributes.len(), 1);
        assert_eq!(attributes.get("name"), Some(&FieldValue::from("b")));
    }

    #[test]
    fn attributes_collect_from_pairs() {
        let attributes: Attributes = [("status", "active"), ("role", "admin")]
            .into_iter()
            .collect();
        let columns: Vec<_> = attributes.columns().cloned().collect();
        assert_eq!(columns, vec!["role".to_string(), "status".to_string()]);
    }
}
