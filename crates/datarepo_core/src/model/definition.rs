//! Resource declarations and their resolution against a live schema.
//!
//! # Responsibility
//! - Let application wiring declare a resource table, its primary key and
//!   its relations without any query code.
//! - Resolve a declaration once against a connection, discovering columns.
//!
//! # Invariants
//! - A resolved [`Model`] always names an existing table, primary key and
//!   relation key columns.
//! - Resolution failures are configuration faults, not runtime conditions.

use crate::query::sql::quote_ident;
use crate::repo::error::{RepoError, RepoResult};
use rusqlite::Connection;
use serde::Deserialize;

const DEFAULT_PRIMARY_KEY: &str = "id";

/// Relation cardinality and key direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    /// Related rows hold a foreign key to this row.
    HasMany,
    /// Like `HasMany`, at most one related row is attached.
    HasOne,
    /// This row holds a foreign key to the related row.
    BelongsTo,
}

/// Declared relation between a resource table and a related table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relation {
    pub name: String,
    pub kind: RelationKind,
    pub related_table: String,
    /// Column on the related table for `HasMany`/`HasOne`, on this table for
    /// `BelongsTo`.
    pub foreign_key: String,
    /// Column the foreign key points at. Defaults to the owning side's
    /// primary key.
    pub owner_key: Option<String>,
    pub related_primary_key: String,
}

impl Relation {
    pub fn has_many(
        name: impl Into<String>,
        related_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::build(RelationKind::HasMany, name, related_table, foreign_key)
    }

    pub fn has_one(
        name: impl Into<String>,
        related_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::build(RelationKind::HasOne, name, related_table, foreign_key)
    }

    pub fn belongs_to(
        name: impl Into<String>,
        related_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self::build(RelationKind::BelongsTo, name, related_table, foreign_key)
    }

    pub fn owner_key(mut self, column: impl Into<String>) -> Self {
        self.owner_key = Some(column.into());
        self
    }

    pub fn related_primary_key(mut self, column: impl Into<String>) -> Self {
        self.related_primary_key = column.into();
        self
    }

    fn build(
        kind: RelationKind,
        name: impl Into<String>,
        related_table: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            related_table: related_table.into(),
            foreign_key: foreign_key.into(),
            owner_key: None,
            related_primary_key: DEFAULT_PRIMARY_KEY.to_string(),
        }
    }
}

/// Static description of one resource, injected by application wiring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelDefinition {
    pub table: String,
    pub primary_key: String,
    pub relations: Vec<Relation>,
}

impl ModelDefinition {
    /// Declares a resource table with the conventional `id` primary key.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            relations: Vec::new(),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    pub fn relation(mut self, relation: Relation) -> Self {
        self.relations.push(relation);
        self
    }

    /// Resolves this declaration against `conn`.
    pub fn resolve(&self, conn: &Connection) -> RepoResult<Model> {
        Model::resolve(conn, self)
    }
}

/// Relation with both key columns resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedRelation {
    pub name: String,
    pub kind: RelationKind,
    pub related_table: String,
    pub related_primary_key: String,
    pub related_columns: Vec<String>,
    /// Column read from parent rows.
    pub parent_key: String,
    /// Column matched on related rows.
    pub related_key: String,
}

/// A [`ModelDefinition`] bound to an existing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Model {
    table: String,
    primary_key: String,
    columns: Vec<String>,
    relations: Vec<ResolvedRelation>,
}

impl Model {
    /// Resolves `definition` against the schema visible on `conn`.
    ///
    /// # Errors
    /// - `MissingRequiredTable` when the resource or a related table is absent.
    /// - `MissingRequiredColumn` when a primary or relation key is absent.
    pub fn resolve(conn: &Connection, definition: &ModelDefinition) -> RepoResult<Self> {
        let columns = require_table(conn, &definition.table)?;
        require_column(&definition.table, &columns, &definition.primary_key)?;

        let mut relations = Vec::with_capacity(definition.relations.len());
        for relation in &definition.relations {
            if relations
                .iter()
                .any(|resolved: &ResolvedRelation| resolved.name == relation.name)
            {
                return Err(RepoError::InvalidSpec(format!(
                    "relation `{}` declared twice on `{}`",
                    relation.name, definition.table
                )));
            }

            let related_columns = require_table(conn, &relation.related_table)?;
            require_column(
                &relation.related_table,
                &related_columns,
                &relation.related_primary_key,
            )?;

            let (parent_key, related_key) = match relation.kind {
                RelationKind::HasMany | RelationKind::HasOne => (
                    relation
                        .owner_key
                        .clone()
                        .unwrap_or_else(|| definition.primary_key.clone()),
                    relation.foreign_key.clone(),
                ),
                RelationKind::BelongsTo => (
                    relation.foreign_key.clone(),
                    relation
                        .owner_key
                        .clone()
                        .unwrap_or_else(|| relation.related_primary_key.clone()),
                ),
            };
            require_column(&definition.table, &columns, &parent_key)?;
            require_column(&relation.related_table, &related_columns, &related_key)?;

            relations.push(ResolvedRelation {
                name: relation.name.clone(),
                kind: relation.kind,
                related_table: relation.related_table.clone(),
                related_primary_key: relation.related_primary_key.clone(),
                related_columns,
                parent_key,
                related_key,
            });
        }

        Ok(Self {
            table: definition.table.clone(),
            primary_key: definition.primary_key.clone(),
            columns,
            relations,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Table columns in schema order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|known| known == column)
    }

    pub fn relations(&self) -> &[ResolvedRelation] {
        &self.relations
    }

    pub fn relation(&self, name: &str) -> Option<&ResolvedRelation> {
        self.relations.iter().find(|relation| relation.name == name)
    }

    /// Fails with `UnknownColumn` unless `column` belongs to this model.
    pub fn ensure_column(&self, column: &str) -> RepoResult<()> {
        if self.has_column(column) {
            return Ok(());
        }
        Err(RepoError::UnknownColumn {
            table: self.table.clone(),
            column: column.to_string(),
        })
    }

    /// Fails with `UnknownRelation` unless `name` is declared on this model.
    pub fn ensure_relation(&self, name: &str) -> RepoResult<&ResolvedRelation> {
        self.relation(name).ok_or_else(|| RepoError::UnknownRelation {
            table: self.table.clone(),
            relation: name.to_string(),
        })
    }
}

fn require_table(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let columns = table_columns(conn, table)?;
    if columns.is_empty() {
        return Err(RepoError::MissingRequiredTable(table.to_string()));
    }
    Ok(columns)
}

fn require_column(table: &str, columns: &[String], column: &str) -> RepoResult<()> {
    if columns.iter().any(|known| known == column) {
        return Ok(());
    }
    Err(RepoError::MissingRequiredColumn {
        table: table.to_string(),
        column: column.to_string(),
    })
}

/// Lists columns of `table` in schema order; empty when the table is absent.
fn table_columns(conn: &Connection, table: &str) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({});", quote_ident(table)))?;
    let mut rows = stmt.query([])?;
    let mut columns = Vec::new();
    while let Some(row) = rows.next()? {
        columns.push(row.get::<_, String>(1)?);
    }
    Ok(columns)
}
