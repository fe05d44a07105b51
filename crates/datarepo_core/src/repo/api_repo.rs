//! Query-string driven repository for API collection and resource reads.
//!
//! # Responsibility
//! - Compose a [`SqliteResourceRepository`] with a [`QueryShaper`] built
//!   from a [`QuerySpec`].
//! - Apply request parameters, passed explicitly as [`QueryParams`], to every
//!   read.
//!
//! # Invariants
//! - Only allow-listed filters, sorts, includes and fields affect a query.
//! - Collection results are ordered by the primary key after any requested
//!   sort, so pages never overlap.

use crate::config::QueryConfig;
use crate::model::{Attributes, FieldValue, Model, Record};
use crate::query::params::QueryParams;
use crate::query::shaper::{QueryShaper, Shaped};
use crate::query::spec::QuerySpec;
use crate::query::sql::SelectQuery;
use crate::repo::error::RepoResult;
use crate::repo::exec::fetch_records;
use crate::repo::pagination::{fetch_page, Page, Paginator};
use crate::repo::relations::load_relations;
use crate::repo::resource_repo::{ResourceRepository, SqliteResourceRepository};
use log::info;
use rusqlite::Connection;

/// Read operations driven by request parameters.
pub trait ApiRepository {
    fn get_all_resources(&self, params: &QueryParams) -> RepoResult<Vec<Record>>;
    fn paginate_all_resources(&self, params: &QueryParams) -> RepoResult<Page<Record>>;
    fn get_all_resources_by(
        &self,
        conditions: &Attributes,
        params: &QueryParams,
    ) -> RepoResult<Vec<Record>>;
    fn paginate_all_resources_by(
        &self,
        conditions: &Attributes,
        params: &QueryParams,
    ) -> RepoResult<Page<Record>>;
    /// First row where `attribute = id`, with resource includes loaded.
    fn get_resource(
        &self,
        attribute: &str,
        id: impl Into<FieldValue>,
        params: &QueryParams,
    ) -> RepoResult<Option<Record>>;
    fn get_resource_by(
        &self,
        conditions: &Attributes,
        params: &QueryParams,
    ) -> RepoResult<Option<Record>>;
    fn search_resources(&self, term: &str, params: &QueryParams) -> RepoResult<Vec<Record>>;
    fn paginate_search_resources(
        &self,
        term: &str,
        params: &QueryParams,
    ) -> RepoResult<Page<Record>>;
}

/// SQLite-backed [`ApiRepository`].
pub struct SqliteApiRepository<'conn, S: QuerySpec> {
    resources: SqliteResourceRepository<'conn>,
    shaper: QueryShaper,
    spec: S,
    config: QueryConfig,
}

impl<'conn, S: QuerySpec> SqliteApiRepository<'conn, S> {
    /// Binds `spec` to `model`.
    ///
    /// # Errors
    /// - `InvalidSpec` when an allow-list does not match the model.
    pub fn new(conn: &'conn Connection, model: Model, spec: S) -> RepoResult<Self> {
        let shaper = QueryShaper::new(&model, &spec)?;
        let config = QueryConfig::default();
        let resources = SqliteResourceRepository::new(conn, model)
            .with_search_fields(shaper.search_fields().to_vec())?
            .with_path(config.path.clone());
        Ok(Self {
            resources,
            shaper,
            spec,
            config,
        })
    }

    /// Replaces parameter names, page limits and the link path.
    pub fn with_config(mut self, config: QueryConfig) -> Self {
        self.resources = self.resources.with_path(config.path.clone());
        self.config = config;
        self
    }

    /// Underlying CRUD repository over the same model.
    pub fn resources(&self) -> &SqliteResourceRepository<'conn> {
        &self.resources
    }

    pub fn spec(&self) -> &S {
        &self.spec
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn model(&self) -> &Model {
        self.resources.model()
    }

    /// Rebinds the repository to `model`, re-validating the spec against it.
    /// On error the previous model stays in place.
    pub fn set_model(&mut self, model: Model) -> RepoResult<()> {
        let shaper = QueryShaper::new(&model, &self.spec)?;
        self.resources.set_model(model)?;
        self.shaper = shaper;
        Ok(())
    }

    fn conn(&self) -> &'conn Connection {
        self.resources.connection()
    }

    fn base_query(&self, conditions: &Attributes) -> RepoResult<SelectQuery> {
        let mut query = self.resources.select_all();
        self.resources
            .apply_conditions(query.conditions_mut(), conditions)?;
        Ok(query)
    }

    fn search_query(&self, term: &str) -> SelectQuery {
        let mut query = self.resources.select_all();
        self.resources.apply_search(query.conditions_mut(), term);
        query
    }

    /// Runs `query` as an unpaginated collection request.
    pub fn collection_query(
        &self,
        mut query: SelectQuery,
        params: &QueryParams,
    ) -> RepoResult<Vec<Record>> {
        let shaped = self
            .shaper
            .shape_collection(self.model(), &mut query, params);
        let records = fetch_records(self.conn(), &query)?;
        self.finish(records, &shaped)
    }

    /// Runs `query` as a paginated collection request.
    pub fn paginated_collection_query(
        &self,
        mut query: SelectQuery,
        params: &QueryParams,
    ) -> RepoResult<Page<Record>> {
        let shaped = self
            .shaper
            .shape_collection(self.model(), &mut query, params);
        let per_page = self.config.page_size(params.page_size());
        let current_page = params.page_number().unwrap_or(1).max(1);

        let (records, total) = fetch_page(self.conn(), &query, per_page, current_page)?;
        let records = self.finish(records, &shaped)?;
        info!(
            "event=api_paginate module=repo status=ok table={} total={} per_page={} page={}",
            self.model().table(),
            total,
            per_page,
            current_page
        );

        Ok(
            Paginator::new(self.config.path.as_str(), self.config.page_number_parameter())
                .preserving(params.pairs())
                .page(records, total, per_page, current_page),
        )
    }

    /// Runs `query` as a single-resource request.
    pub fn resource_query(
        &self,
        mut query: SelectQuery,
        params: &QueryParams,
    ) -> RepoResult<Option<Record>> {
        let shaped = self.shaper.shape_resource(self.model(), &mut query, params);
        query.limit(1);
        let records = fetch_records(self.conn(), &query)?;
        Ok(self.finish(records, &shaped)?.into_iter().next())
    }

    fn finish(&self, mut records: Vec<Record>, shaped: &Shaped) -> RepoResult<Vec<Record>> {
        load_relations(self.conn(), self.model(), &mut records, &shaped.includes)?;
        if let Some(visible) = &shaped.visible_columns {
            for record in &mut records {
                record.retain_columns(visible);
            }
        }
        Ok(records)
    }
}

impl<S: QuerySpec> ApiRepository for SqliteApiRepository<'_, S> {
    fn get_all_resources(&self, params: &QueryParams) -> RepoResult<Vec<Record>> {
        self.collection_query(self.resources.select_all(), params)
    }

    fn paginate_all_resources(&self, params: &QueryParams) -> RepoResult<Page<Record>> {
        self.paginated_collection_query(self.resources.select_all(), params)
    }

    fn get_all_resources_by(
        &self,
        conditions: &Attributes,
        params: &QueryParams,
    ) -> RepoResult<Vec<Record>> {
        self.collection_query(self.base_query(conditions)?, params)
    }

    fn paginate_all_resources_by(
        &self,
        conditions: &Attributes,
        params: &QueryParams,
    ) -> RepoResult<Page<Record>> {
        self.paginated_collection_query(self.base_query(conditions)?, params)
    }

    fn get_resource(
        &self,
        attribute: &str,
        id: impl Into<FieldValue>,
        params: &QueryParams,
    ) -> RepoResult<Option<Record>> {
        self.model().ensure_column(attribute)?;
        let mut query = self.resources.select_all();
        query.conditions_mut().where_eq(attribute, id.into());
        self.resource_query(query, params)
    }

    fn get_resource_by(
        &self,
        conditions: &Attributes,
        params: &QueryParams,
    ) -> RepoResult<Option<Record>> {
        self.resource_query(self.base_query(conditions)?, params)
    }

    fn search_resources(&self, term: &str, params: &QueryParams) -> RepoResult<Vec<Record>> {
        self.collection_query(self.search_query(term), params)
    }

    fn paginate_search_resources(
        &self,
        term: &str,
        params: &QueryParams,
    ) -> RepoResult<Page<Record>> {
        self.paginated_collection_query(self.search_query(term), params)
    }
}
