//! Per-repository query allow-lists.

use crate::query::filter::AllowedFilter;
use crate::query::sort::{AllowedSort, SortField};

/// Declares what callers may filter, sort, include, project and search.
///
/// Anything a request asks for outside these lists is ignored. Only
/// [`QuerySpec::search_fields`] is mandatory; every other list defaults to
/// empty, which disables that kind of shaping.
///
/// # Example
/// ```
/// use datarepo_core::query::{AllowedFilter, AllowedSort, QuerySpec, SortField};
///
/// struct UserQueries;
///
/// impl QuerySpec for UserQueries {
///     fn filters(&self) -> Vec<AllowedFilter> {
///         vec![AllowedFilter::exact("status")]
///     }
///
///     fn sorts(&self) -> Vec<AllowedSort> {
///         vec![AllowedSort::field("first_name")]
///     }
///
///     fn default_sort(&self) -> Vec<SortField> {
///         vec![SortField::desc("id")]
///     }
///
///     fn search_fields(&self) -> Vec<String> {
///         vec!["first_name".to_string(), "last_name".to_string()]
///     }
/// }
/// ```
pub trait QuerySpec {
    fn filters(&self) -> Vec<AllowedFilter> {
        Vec::new()
    }

    fn sorts(&self) -> Vec<AllowedSort> {
        Vec::new()
    }

    /// Applied only when the request carries no sort terms. Names resolve
    /// through [`QuerySpec::sorts`] first, then as plain columns.
    fn default_sort(&self) -> Vec<SortField> {
        Vec::new()
    }

    /// Relations a collection request may include.
    fn collection_relations(&self) -> Vec<String> {
        Vec::new()
    }

    /// Relations a single-resource request may include.
    fn resource_relations(&self) -> Vec<String> {
        Vec::new()
    }

    /// Columns a request may project with `fields`.
    fn fields(&self) -> Vec<String> {
        Vec::new()
    }

    fn search_fields(&self) -> Vec<String>;
}
