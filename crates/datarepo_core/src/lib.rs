//! Generic data-access layer over SQLite.
//!
//! A [`ModelDefinition`] names a table and its relations; resolving it against
//! a connection yields a [`Model`] that repositories are built around.
//! [`SqliteResourceRepository`] covers CRUD and lookups, while
//! [`SqliteApiRepository`] shapes reads from query-string parameters under the
//! allow-lists of a [`QuerySpec`].

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;

pub use config::{ConfigError, ConfiguredSpec, QueryConfig, ResourceConfig};
pub use db::{open_db, open_db_in_memory, DbError, Migration};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::{Attributes, FieldValue, Model, ModelDefinition, Record, Related, Relation};
pub use query::{AllowedFilter, AllowedSort, QueryParams, QuerySpec, SortDirection, SortField};
pub use repo::{
    ApiRepository, Page, RepoError, RepoResult, ResourceRepository, SqliteApiRepository,
    SqliteResourceRepository,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
