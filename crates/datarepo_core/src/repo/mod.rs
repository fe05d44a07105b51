//! Repository layer over resolved resource models.
//!
//! # Responsibility
//! - [`resource_repo`]: CRUD, lookups, search and plain pagination.
//! - [`api_repo`]: the same reads driven by request parameters and
//!   allow-lists.
//!
//! # Invariants
//! - Repositories borrow one connection and hold one resolved model.
//! - Semantic faults (`NotFound`, `UnknownColumn`, ...) are distinct from
//!   persistence faults (`Db`).

pub mod api_repo;
pub mod error;
mod exec;
pub mod pagination;
mod relations;
pub mod resource_repo;

pub use api_repo::{ApiRepository, SqliteApiRepository};
pub use error::{RepoError, RepoResult};
pub use pagination::{Page, PageLinks, Paginator};
pub use resource_repo::{
    ResourceRepository, SqliteResourceRepository, DEFAULT_LIST_DIRECTION,
    DEFAULT_PER_PAGE,
};
