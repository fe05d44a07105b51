//! Applies a repository's allow-lists and request parameters to a query.
//!
//! # Responsibility
//! - Validate a [`QuerySpec`] once against the bound [`Model`].
//! - Translate allowed filters, sorts, includes and fields into a
//!   [`SelectQuery`], silently dropping everything else.
//!
//! # Invariants
//! - Every identifier a shaper writes into SQL was checked against the model
//!   at construction.
//! - Collection queries always end with `primary key ASC`, so ordering is
//!   stable when no sort applies.

use crate::model::Model;
use crate::query::filter::AllowedFilter;
use crate::query::params::QueryParams;
use crate::query::sort::{AllowedSort, SortDirection, SortField};
use crate::query::spec::QuerySpec;
use crate::query::sql::SelectQuery;
use crate::repo::error::{RepoError, RepoResult};
use log::debug;

/// Result of shaping: which relations to load and which columns to keep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Shaped {
    pub includes: Vec<String>,
    /// `Some` when the request narrowed the projection; helper key columns
    /// selected for relation loading are dropped from results afterwards.
    pub visible_columns: Option<Vec<String>>,
}

/// Validated snapshot of a [`QuerySpec`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryShaper {
    filters: Vec<AllowedFilter>,
    sorts: Vec<AllowedSort>,
    default_sort: Vec<(String, SortDirection)>,
    collection_relations: Vec<String>,
    resource_relations: Vec<String>,
    fields: Vec<String>,
    search_fields: Vec<String>,
}

impl QueryShaper {
    /// Snapshots and validates `spec` against `model`.
    ///
    /// # Errors
    /// - `InvalidSpec` when any allow-list names a column or relation the
    ///   model does not have.
    pub fn new<S: QuerySpec + ?Sized>(model: &Model, spec: &S) -> RepoResult<Self> {
        let filters = spec.filters();
        for filter in &filters {
            require_column(model, "filter", &filter.name, filter.column())?;
        }

        let sorts = spec.sorts();
        for sort in &sorts {
            require_column(model, "sort", &sort.name, sort.column())?;
        }

        let mut default_sort = Vec::new();
        for field in spec.default_sort() {
            let column = resolve_sort_column(&sorts, &field)
                .map(str::to_string)
                .unwrap_or_else(|| field.name.clone());
            require_column(model, "default sort", &field.name, &column)?;
            default_sort.push((column, field.direction));
        }

        let collection_relations = spec.collection_relations();
        let resource_relations = spec.resource_relations();
        for name in collection_relations.iter().chain(resource_relations.iter()) {
            if model.relation(name).is_none() {
                return Err(RepoError::InvalidSpec(format!(
                    "include `{name}` is not a relation of `{}`",
                    model.table()
                )));
            }
        }

        let fields = spec.fields();
        for field in &fields {
            require_column(model, "field", field, field)?;
        }

        let search_fields = spec.search_fields();
        for field in &search_fields {
            require_column(model, "search field", field, field)?;
        }

        Ok(Self {
            filters,
            sorts,
            default_sort,
            collection_relations,
            resource_relations,
            fields,
            search_fields,
        })
    }

    pub fn search_fields(&self) -> &[String] {
        &self.search_fields
    }

    /// Applies filters, sorts, includes and fields for a collection request.
    pub fn shape_collection(
        &self,
        model: &Model,
        query: &mut SelectQuery,
        params: &QueryParams,
    ) -> Shaped {
        for (name, raw) in params.filters() {
            match self.filters.iter().find(|filter| filter.name == *name) {
                Some(filter) => {
                    if !filter.apply(query.conditions_mut(), raw) {
                        debug!("event=query_param_ignored module=query kind=filter name={name} reason=blank");
                    }
                }
                None => {
                    debug!("event=query_param_ignored module=query kind=filter name={name} reason=not_allowed");
                }
            }
        }

        if params.sorts().is_empty() {
            for (column, direction) in &self.default_sort {
                query.order_by(column.as_str(), *direction);
            }
        } else {
            for field in params.sorts() {
                match resolve_sort_column(&self.sorts, field) {
                    Some(column) => query.order_by(column, field.direction),
                    None => debug!(
                        "event=query_param_ignored module=query kind=sort name={} reason=not_allowed",
                        field.name
                    ),
                }
            }
        }
        query.order_by(model.primary_key(), SortDirection::Asc);

        let includes = allowed_includes(params, &self.collection_relations);
        let visible_columns = self.project(model, query, params, &includes);

        Shaped {
            includes,
            visible_columns,
        }
    }

    /// Applies only resource includes for a single-resource request.
    pub fn shape_resource(
        &self,
        model: &Model,
        query: &mut SelectQuery,
        params: &QueryParams,
    ) -> Shaped {
        query.order_by(model.primary_key(), SortDirection::Asc);
        Shaped {
            includes: allowed_includes(params, &self.resource_relations),
            visible_columns: None,
        }
    }

    fn project(
        &self,
        model: &Model,
        query: &mut SelectQuery,
        params: &QueryParams,
        includes: &[String],
    ) -> Option<Vec<String>> {
        let requested = params.fields_for(model.table())?;
        let visible: Vec<String> = model
            .columns()
            .iter()
            .filter(|column| requested.contains(*column) && self.fields.contains(*column))
            .cloned()
            .collect();
        if visible.is_empty() {
            debug!(
                "event=query_param_ignored module=query kind=fields table={} reason=not_allowed",
                model.table()
            );
            return None;
        }

        let mut required = vec![model.primary_key().to_string()];
        for name in includes {
            if let Some(relation) = model.relation(name) {
                required.push(relation.parent_key.clone());
            }
        }
        let selected = model
            .columns()
            .iter()
            .filter(|column| visible.contains(*column) || required.contains(*column))
            .cloned()
            .collect();
        query.set_columns(selected);
        Some(visible)
    }
}

fn resolve_sort_column<'a>(sorts: &'a [AllowedSort], field: &SortField) -> Option<&'a str> {
    sorts
        .iter()
        .find(|sort| sort.name == field.name)
        .map(AllowedSort::column)
}

fn allowed_includes(params: &QueryParams, allowed: &[String]) -> Vec<String> {
    let mut includes: Vec<String> = Vec::new();
    for name in params.includes() {
        if !allowed.contains(name) {
            debug!("event=query_param_ignored module=query kind=include name={name} reason=not_allowed");
            continue;
        }
        if !includes.contains(name) {
            includes.push(name.clone());
        }
    }
    includes
}

fn require_column(model: &Model, kind: &str, name: &str, column: &str) -> RepoResult<()> {
    if model.has_column(column) {
        return Ok(());
    }
    Err(RepoError::InvalidSpec(format!(
        "{kind} `{name}` targets unknown column `{column}` of `{}`",
        model.table()
    )))
}
