//! Eager loading of declared relations onto fetched records.
//!
//! # Invariants
//! - One query per relation (chunked for large key sets), never per parent.
//! - Each parent receives only rows whose key matches its own.
//! - Related rows are ordered by the related primary key.

use crate::model::{FieldValue, Model, Record, Related, RelationKind, ResolvedRelation};
use crate::query::sort::SortDirection;
use crate::query::sql::SelectQuery;
use crate::repo::error::RepoResult;
use crate::repo::exec::fetch_records;
use rusqlite::Connection;
use std::collections::BTreeMap;

const MAX_KEYS_PER_QUERY: usize = 500;

/// Loads every relation in `names` onto `records`.
///
/// # Errors
/// - `UnknownRelation` when a name is not declared on `model`.
pub(crate) fn load_relations(
    conn: &Connection,
    model: &Model,
    records: &mut [Record],
    names: &[String],
) -> RepoResult<()> {
    if records.is_empty() {
        return Ok(());
    }
    for name in names {
        let relation = model.ensure_relation(name)?;
        load_relation(conn, relation, records)?;
    }
    Ok(())
}

fn load_relation(
    conn: &Connection,
    relation: &ResolvedRelation,
    records: &mut [Record],
) -> RepoResult<()> {
    let mut keys = BTreeMap::new();
    for record in records.iter() {
        if let Some(value) = record.get(&relation.parent_key) {
            if let Some(key) = value.match_key() {
                keys.entry(key).or_insert_with(|| value.clone());
            }
        }
    }

    let values: Vec<FieldValue> = keys.into_values().collect();
    let mut grouped = BTreeMap::new();
    for chunk in values.chunks(MAX_KEYS_PER_QUERY) {
        let mut query = SelectQuery::new(
            relation.related_table.as_str(),
            relation.related_columns.clone(),
        );
        query
            .conditions_mut()
            .is_in(&relation.related_key, chunk.to_vec());
        query.order_by(relation.related_primary_key.as_str(), SortDirection::Asc);

        for related in fetch_records(conn, &query)? {
            if let Some(key) = related.get(&relation.related_key).and_then(FieldValue::match_key) {
                grouped.entry(key).or_insert_with(Vec::new).push(related);
            }
        }
    }

    for record in records.iter_mut() {
        let matches: Vec<Record> = record
            .get(&relation.parent_key)
            .and_then(FieldValue::match_key)
            .and_then(|key| grouped.get(&key).cloned())
            .unwrap_or_default();
        let related = match relation.kind {
            RelationKind::HasMany => Related::Many(matches),
            RelationKind::HasOne | RelationKind::BelongsTo => {
                Related::One(matches.into_iter().next().map(Box::new))
            }
        };
        record.set_relation(&relation.name, related);
    }

    Ok(())
}
