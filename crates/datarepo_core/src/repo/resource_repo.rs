//! Generic resource repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD/find/search/paginate over one resolved [`Model`].
//! - Keep SQL details inside the repository boundary.
//!
//! # Invariants
//! - A repository always holds exactly one resolved model.
//! - Caller-supplied column names are checked against the model before they
//!   reach SQL; values are always bound.
//! - Persistence faults propagate unchanged as `RepoError::Db`.

use crate::model::{Attributes, FieldValue, Model, Record};
use crate::query::search::where_like;
use crate::query::sort::SortDirection;
use crate::query::sql::{quote_ident, Conditions, SelectQuery};
use crate::repo::error::{RepoError, RepoResult};
use crate::repo::exec::{execute_write, fetch_records};
use crate::repo::pagination::{fetch_page, Page, Paginator};
use crate::repo::relations::load_relations;
use log::{error, info};
use rusqlite::{params_from_iter, Connection};
use std::time::Instant;

/// Page size used by [`ResourceRepository::paginate`] callers that have no
/// preference.
pub const DEFAULT_PER_PAGE: u64 = 15;

/// Direction for [`ResourceRepository::list`] callers that have no
/// preference. Newest-first, unlike [`SortDirection::default`].
pub const DEFAULT_LIST_DIRECTION: SortDirection = SortDirection::Desc;

const ALL_COLUMNS: &str = "*";

/// Repository interface for generic resource operations.
///
/// `columns` arguments select a projection; an empty slice or `["*"]` selects
/// every column.
pub trait ResourceRepository {
    fn model(&self) -> &Model;
    /// Swaps the bound model. Search fields must exist on the new model.
    fn set_model(&mut self, model: Model) -> RepoResult<()>;

    fn all(&self, columns: &[&str]) -> RepoResult<Vec<Record>>;
    /// Rows ordered by `order_by_column` with `with` relations loaded. Pass
    /// [`DEFAULT_LIST_DIRECTION`] for the conventional descending listing.
    fn list(
        &self,
        order_by_column: &str,
        direction: SortDirection,
        with: &[&str],
        columns: &[&str],
    ) -> RepoResult<Vec<Record>>;
    fn create(&self, data: &Attributes) -> RepoResult<Record>;
    fn update(
        &self,
        attribute: &str,
        id: impl Into<FieldValue>,
        data: &Attributes,
    ) -> RepoResult<usize>;
    fn update_by(&self, params: &Attributes, data: &Attributes) -> RepoResult<usize>;
    fn delete(&self, id: impl Into<FieldValue>) -> RepoResult<usize>;
    fn delete_by(&self, params: &Attributes) -> RepoResult<usize>;
    fn search(&self, term: &str) -> RepoResult<Vec<Record>>;
    fn find(&self, id: impl Into<FieldValue>, columns: &[&str]) -> RepoResult<Option<Record>>;
    /// Like [`ResourceRepository::find`], but a miss is `RepoError::NotFound`.
    fn find_or_fail(&self, id: impl Into<FieldValue>, columns: &[&str]) -> RepoResult<Record>;
    fn find_by(&self, params: &Attributes, columns: &[&str]) -> RepoResult<Option<Record>>;
    fn find_all_by(&self, params: &Attributes, columns: &[&str]) -> RepoResult<Vec<Record>>;
    fn paginate(&self, per_page: u64, page: u64) -> RepoResult<Page<Record>>;
}

/// SQLite-backed resource repository.
pub struct SqliteResourceRepository<'conn> {
    conn: &'conn Connection,
    model: Model,
    search_fields: Vec<String>,
    path: String,
}

impl<'conn> SqliteResourceRepository<'conn> {
    /// Binds a repository to an already resolved model.
    pub fn new(conn: &'conn Connection, model: Model) -> Self {
        Self {
            conn,
            model,
            search_fields: Vec::new(),
            path: String::new(),
        }
    }

    /// Declares the columns [`ResourceRepository::search`] matches against.
    pub fn with_search_fields<I, S>(mut self, fields: I) -> RepoResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
        for field in &fields {
            self.model.ensure_column(field)?;
        }
        self.search_fields = fields;
        Ok(self)
    }

    /// Sets the path prefixed to pagination links.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    pub fn search_fields(&self) -> &[String] {
        &self.search_fields
    }

    /// Starts a query over every column, without conditions.
    pub fn select_all(&self) -> SelectQuery {
        SelectQuery::new(self.model.table(), self.model.columns().to_vec())
    }

    /// Adds one equality predicate per entry of `params`.
    pub fn apply_conditions(
        &self,
        conditions: &mut Conditions,
        params: &Attributes,
    ) -> RepoResult<()> {
        for (column, value) in params.iter() {
            self.model.ensure_column(column)?;
            conditions.where_eq(column, value.clone());
        }
        Ok(())
    }

    /// Adds the search-field "like" group for `term`.
    pub fn apply_search(&self, conditions: &mut Conditions, term: &str) {
        where_like(conditions, &self.search_fields, term);
    }

    fn projection(&self, columns: &[&str]) -> RepoResult<Vec<String>> {
        if columns.is_empty() || columns.contains(&ALL_COLUMNS) {
            return Ok(self.model.columns().to_vec());
        }
        let mut selected = Vec::with_capacity(columns.len());
        for column in columns {
            self.model.ensure_column(column)?;
            if !selected.iter().any(|known: &String| known == column) {
                selected.push((*column).to_string());
            }
        }
        Ok(selected)
    }

    fn select(&self, columns: &[&str]) -> RepoResult<SelectQuery> {
        Ok(SelectQuery::new(self.model.table(), self.projection(columns)?))
    }

    fn where_params(&self, params: &Attributes, columns: &[&str]) -> RepoResult<SelectQuery> {
        let mut query = self.select(columns)?;
        self.apply_conditions(query.conditions_mut(), params)?;
        query.order_by(self.model.primary_key(), SortDirection::Asc);
        Ok(query)
    }

    fn first(&self, mut query: SelectQuery) -> RepoResult<Option<Record>> {
        query.limit(1);
        Ok(fetch_records(self.conn, &query)?.into_iter().next())
    }

    fn update_where(&self, conditions: &Conditions, data: &Attributes) -> RepoResult<usize> {
        if data.is_empty() {
            return Err(RepoError::EmptyAttributes);
        }

        let mut assignments = Vec::with_capacity(data.len());
        let mut binds = Vec::with_capacity(data.len());
        for (column, value) in data.iter() {
            self.model.ensure_column(column)?;
            assignments.push(format!("{} = ?", quote_ident(column)));
            binds.push(value.clone());
        }

        let mut sql = format!(
            "UPDATE {} SET {}",
            quote_ident(self.model.table()),
            assignments.join(", ")
        );
        binds.extend(conditions.write_where(&mut sql));
        execute_write(self.conn, "update", self.model.table(), &sql, binds)
    }

    fn delete_where(&self, conditions: &Conditions) -> RepoResult<usize> {
        let mut sql = format!("DELETE FROM {}", quote_ident(self.model.table()));
        let binds = conditions.write_where(&mut sql);
        execute_write(self.conn, "delete", self.model.table(), &sql, binds)
    }
}

impl ResourceRepository for SqliteResourceRepository<'_> {
    fn model(&self) -> &Model {
        &self.model
    }

    fn set_model(&mut self, model: Model) -> RepoResult<()> {
        for field in &self.search_fields {
            model.ensure_column(field)?;
        }
        self.model = model;
        Ok(())
    }

    fn all(&self, columns: &[&str]) -> RepoResult<Vec<Record>> {
        let mut query = self.select(columns)?;
        query.order_by(self.model.primary_key(), SortDirection::Asc);
        fetch_records(self.conn, &query)
    }

    fn list(
        &self,
        order_by_column: &str,
        direction: SortDirection,
        with: &[&str],
        columns: &[&str],
    ) -> RepoResult<Vec<Record>> {
        self.model.ensure_column(order_by_column)?;
        let relations: Vec<String> = with.iter().map(|name| (*name).to_string()).collect();

        let visible = self.projection(columns)?;
        let mut selected = visible.clone();
        for name in &relations {
            let parent_key = &self.model.ensure_relation(name)?.parent_key;
            if !selected.contains(parent_key) {
                selected.push(parent_key.clone());
            }
        }

        let mut query = SelectQuery::new(self.model.table(), selected.clone());
        query.order_by(order_by_column, direction);
        query.order_by(self.model.primary_key(), SortDirection::Asc);

        let mut records = fetch_records(self.conn, &query)?;
        load_relations(self.conn, &self.model, &mut records, &relations)?;
        if selected.len() != visible.len() {
            for record in &mut records {
                record.retain_columns(&visible);
            }
        }
        Ok(records)
    }

    fn create(&self, data: &Attributes) -> RepoResult<Record> {
        if data.is_empty() {
            return Err(RepoError::EmptyAttributes);
        }

        let started_at = Instant::now();
        let mut columns = Vec::with_capacity(data.len());
        let mut binds = Vec::with_capacity(data.len());
        for (column, value) in data.iter() {
            self.model.ensure_column(column)?;
            columns.push(quote_ident(column));
            binds.push(value.clone());
        }
        let returning = self
            .model
            .columns()
            .iter()
            .map(|column| quote_ident(column))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {returning};",
            quote_ident(self.model.table()),
            columns.join(", "),
            vec!["?"; binds.len()].join(", ")
        );

        let result = (|| -> RepoResult<Record> {
            let mut stmt = self.conn.prepare(&sql)?;
            let mut rows = stmt.query(params_from_iter(binds))?;
            match rows.next()? {
                Some(row) => Ok(Record::from_row(row, self.model.columns())?),
                None => Err(RepoError::InvalidData(format!(
                    "insert into `{}` returned no row",
                    self.model.table()
                ))),
            }
        })();

        match &result {
            Ok(_) => info!(
                "event=repo_create module=repo status=ok table={} duration_ms={}",
                self.model.table(),
                started_at.elapsed().as_millis()
            ),
            Err(err) => error!(
                "event=repo_create module=repo status=error table={} duration_ms={} error={}",
                self.model.table(),
                started_at.elapsed().as_millis(),
                err
            ),
        }
        result
    }

    fn update(
        &self,
        attribute: &str,
        id: impl Into<FieldValue>,
        data: &Attributes,
    ) -> RepoResult<usize> {
        self.model.ensure_column(attribute)?;
        let mut conditions = Conditions::new();
        conditions.where_eq(attribute, id.into());
        self.update_where(&conditions, data)
    }

    fn update_by(&self, params: &Attributes, data: &Attributes) -> RepoResult<usize> {
        let mut conditions = Conditions::new();
        self.apply_conditions(&mut conditions, params)?;
        self.update_where(&conditions, data)
    }

    fn delete(&self, id: impl Into<FieldValue>) -> RepoResult<usize> {
        let mut conditions = Conditions::new();
        conditions.where_eq(self.model.primary_key(), id.into());
        self.delete_where(&conditions)
    }

    fn delete_by(&self, params: &Attributes) -> RepoResult<usize> {
        let mut conditions = Conditions::new();
        self.apply_conditions(&mut conditions, params)?;
        self.delete_where(&conditions)
    }

    fn search(&self, term: &str) -> RepoResult<Vec<Record>> {
        let mut query = self.select_all();
        self.apply_search(query.conditions_mut(), term);
        query.order_by(self.model.primary_key(), SortDirection::Asc);
        fetch_records(self.conn, &query)
    }

    fn find(&self, id: impl Into<FieldValue>, columns: &[&str]) -> RepoResult<Option<Record>> {
        let mut query = self.select(columns)?;
        query
            .conditions_mut()
            .where_eq(self.model.primary_key(), id.into());
        self.first(query)
    }

    fn find_or_fail(&self, id: impl Into<FieldValue>, columns: &[&str]) -> RepoResult<Record> {
        let key = id.into();
        self.find(key.clone(), columns)?
            .ok_or_else(|| RepoError::NotFound {
                table: self.model.table().to_string(),
                key,
            })
    }

    fn find_by(&self, params: &Attributes, columns: &[&str]) -> RepoResult<Option<Record>> {
        let query = self.where_params(params, columns)?;
        self.first(query)
    }

    fn find_all_by(&self, params: &Attributes, columns: &[&str]) -> RepoResult<Vec<Record>> {
        let query = self.where_params(params, columns)?;
        fetch_records(self.conn, &query)
    }

    fn paginate(&self, per_page: u64, page: u64) -> RepoResult<Page<Record>> {
        let per_page = if per_page == 0 {
            DEFAULT_PER_PAGE
        } else {
            per_page
        };
        let page = page.max(1);

        let mut query = self.select_all();
        query.order_by(self.model.primary_key(), SortDirection::Asc);
        let (records, total) = fetch_page(self.conn, &query, per_page, page)?;
        Ok(Paginator::new(self.path.as_str(), "page").page(records, total, per_page, page))
    }
}
