//! Repository error type shared by model resolution, CRUD and API queries.

use crate::db::DbError;
use crate::model::FieldValue;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic repository error for model resolution and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Underlying SQLite/bootstrap error, propagated unchanged.
    Db(DbError),
    /// Primary-key lookup that requires a row found none.
    NotFound { table: String, key: FieldValue },
    /// Model table does not exist on the connection.
    MissingRequiredTable(String),
    /// Declared key column does not exist on the table.
    MissingRequiredColumn { table: String, column: String },
    /// Caller-supplied column name is not a column of the bound model.
    UnknownColumn { table: String, column: String },
    /// Relation name is not declared on the bound model.
    UnknownRelation { table: String, relation: String },
    /// Query allow-lists reference something the model does not have.
    InvalidSpec(String),
    /// Create/update called with no attributes.
    EmptyAttributes,
    /// Persisted data cannot be converted to a valid read model.
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { table, key } => write!(f, "no row in `{table}` for key {key}"),
            Self::MissingRequiredTable(table) => {
                write!(f, "repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "repository requires column `{column}` in table `{table}`")
            }
            Self::UnknownColumn { table, column } => {
                write!(f, "unknown column `{column}` for table `{table}`")
            }
            Self::UnknownRelation { table, relation } => {
                write!(f, "unknown relation `{relation}` for table `{table}`")
            }
            Self::InvalidSpec(message) => write!(f, "invalid query specification: {message}"),
            Self::EmptyAttributes => write!(f, "at least one attribute is required"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}
