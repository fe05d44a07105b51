//! Request-to-query translation.
//!
//! # Responsibility
//! - Parse request parameters ([`QueryParams`]).
//! - Declare allow-lists ([`QuerySpec`]) and apply them ([`QueryShaper`]).
//! - Render parameterized SQL ([`SelectQuery`], [`Conditions`]).
//!
//! # Invariants
//! - Nothing outside an allow-list reaches SQL; it is ignored, not rejected.

pub mod filter;
pub mod params;
pub mod search;
pub mod shaper;
pub mod sort;
pub mod spec;
pub mod sql;

pub use filter::{AllowedFilter, FilterKind};
pub use params::QueryParams;
pub use shaper::{QueryShaper, Shaped};
pub use sort::{AllowedSort, SortDirection, SortField};
pub use spec::QuerySpec;
pub use sql::{Conditions, SelectQuery};
