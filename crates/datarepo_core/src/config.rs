//! Query-string and resource configuration.
//!
//! # Responsibility
//! - Name the query-string parameters the parser reads.
//! - Bound pagination sizes.
//! - Describe a whole resource (model + allow-lists) as JSON for tools that
//!   cannot declare one in code.
//!
//! # Invariants
//! - Every field has a default, so a partial JSON document is valid.
//! - `max_page_size >= 1`; `default_page_size` is clamped into range.

use crate::model::{ModelDefinition, Relation};
use crate::query::filter::AllowedFilter;
use crate::query::sort::{AllowedSort, SortField};
use crate::query::spec::QuerySpec;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read configuration: {err}"),
            Self::Parse(err) => write!(f, "failed to parse configuration: {err}"),
            Self::Invalid(message) => write!(f, "invalid configuration: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

/// Parameter names and pagination limits.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub filter_parameter: String,
    pub sort_parameter: String,
    pub include_parameter: String,
    pub fields_parameter: String,
    pub page_parameter: String,
    pub page_number_key: String,
    pub page_size_key: String,
    pub default_page_size: u64,
    pub max_page_size: u64,
    /// Base URL or path prefixed to pagination links.
    pub path: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            filter_parameter: "filter".to_string(),
            sort_parameter: "sort".to_string(),
            include_parameter: "include".to_string(),
            fields_parameter: "fields".to_string(),
            page_parameter: "page".to_string(),
            page_number_key: "number".to_string(),
            page_size_key: "size".to_string(),
            default_page_size: 30,
            max_page_size: 30,
            path: String::new(),
        }
    }
}

impl QueryConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_page_size == 0 {
            return Err(ConfigError::Invalid(
                "max_page_size must be at least 1".to_string(),
            ));
        }
        for (key, value) in [
            ("filter_parameter", &self.filter_parameter),
            ("sort_parameter", &self.sort_parameter),
            ("include_parameter", &self.include_parameter),
            ("fields_parameter", &self.fields_parameter),
            ("page_parameter", &self.page_parameter),
            ("page_number_key", &self.page_number_key),
            ("page_size_key", &self.page_size_key),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Invalid(format!("{key} cannot be empty")));
            }
        }
        Ok(())
    }

    /// Resolves a requested page size against the configured bounds.
    pub fn page_size(&self, requested: Option<u64>) -> u64 {
        let size = match requested {
            Some(0) | None => self.default_page_size,
            Some(value) => value,
        };
        size.clamp(1, self.max_page_size.max(1))
    }

    /// Query key carrying the page number, e.g. `page[number]`.
    pub fn page_number_parameter(&self) -> String {
        format!("{}[{}]", self.page_parameter, self.page_number_key)
    }
}

/// JSON description of one resource and its query allow-lists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceConfig {
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    #[serde(default)]
    pub relations: Vec<RelationConfig>,
    #[serde(default)]
    pub filters: Vec<AllowedFilter>,
    #[serde(default)]
    pub sorts: Vec<AllowedSort>,
    /// Sort terms like `-created_at`.
    #[serde(default)]
    pub default_sort: Vec<String>,
    #[serde(default)]
    pub collection_includes: Vec<String>,
    #[serde(default)]
    pub resource_includes: Vec<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub search_fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RelationConfig {
    pub name: String,
    pub kind: crate::model::RelationKind,
    pub related_table: String,
    pub foreign_key: String,
    #[serde(default)]
    pub owner_key: Option<String>,
    #[serde(default = "default_primary_key")]
    pub related_primary_key: String,
}

fn default_primary_key() -> String {
    "id".to_string()
}

impl ResourceConfig {
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        if config.table.trim().is_empty() {
            return Err(ConfigError::Invalid("table cannot be empty".to_string()));
        }
        for term in &config.default_sort {
            if SortField::parse(term).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "default sort term `{term}` is blank"
                )));
            }
        }
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> ConfigResult<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    pub fn model_definition(&self) -> ModelDefinition {
        let mut definition = ModelDefinition::new(&self.table).primary_key(&self.primary_key);
        for relation in &self.relations {
            let mut declared = Relation {
                name: relation.name.clone(),
                kind: relation.kind,
                related_table: relation.related_table.clone(),
                foreign_key: relation.foreign_key.clone(),
                owner_key: None,
                related_primary_key: relation.related_primary_key.clone(),
            };
            if let Some(owner_key) = relation.owner_key.as_ref() {
                declared = declared.owner_key(owner_key);
            }
            definition = definition.relation(declared);
        }
        definition
    }
}

/// [`QuerySpec`] backed by a [`ResourceConfig`].
#[derive(Debug, Clone)]
pub struct ConfiguredSpec {
    config: ResourceConfig,
}

impl ConfiguredSpec {
    pub fn new(config: ResourceConfig) -> Self {
        Self { config }
    }
}

impl QuerySpec for ConfiguredSpec {
    fn filters(&self) -> Vec<AllowedFilter> {
        self.config.filters.clone()
    }

    fn sorts(&self) -> Vec<AllowedSort> {
        self.config.sorts.clone()
    }

    fn default_sort(&self) -> Vec<SortField> {
        self.config
            .default_sort
            .iter()
            .filter_map(|term| SortField::parse(term))
            .collect()
    }

    fn collection_relations(&self) -> Vec<String> {
        self.config.collection_includes.clone()
    }

    fn resource_relations(&self) -> Vec<String> {
        self.config.resource_includes.clone()
    }

    fn fields(&self) -> Vec<String> {
        self.config.fields.clone()
    }

    fn search_fields(&self) -> Vec<String> {
        self.config.search_fields.clone()
    }
}
