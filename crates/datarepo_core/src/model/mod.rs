//! Resource model declarations and dynamic records.
//!
//! # Responsibility
//! - Describe a resource table and its relations ([`ModelDefinition`]).
//! - Bind a description to a live schema ([`Model`]).
//! - Carry row data in a schema-agnostic shape ([`Record`], [`FieldValue`]).
//!
//! # Invariants
//! - Repositories never construct a `Model` implicitly; wiring resolves it
//!   once and injects it.

pub mod definition;
pub mod record;
pub mod value;

pub use definition::{Model, ModelDefinition, Relation, RelationKind, ResolvedRelation};
pub use record::{Attributes, Record, Related};
pub use value::FieldValue;
