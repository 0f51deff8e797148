//! nodeweave-core: schema definitions and validation for graph models.
//!
//! This crate holds everything about a model that can be checked without
//! talking to the database:
//! - Property values and their declared types
//! - Schema definitions (labels, typed properties, primary keys)
//! - Relationship definitions and the two-phase schema registry
//! - Constraint validation with field-level violations
//! - Typed equality filters

pub mod error;
pub mod filter;
pub mod registry;
pub mod schema;
pub mod validation;
pub mod value;

pub use error::{SchemaError, Violation, ViolationKind};
pub use filter::Where;
pub use registry::{RegistryBuilder, RelationshipPhase, SchemaRegistry};
pub use schema::{Constraint, Direction, PropertySpec, RelationshipDefinition, SchemaDefinition};
pub use value::{props, Properties, PropertyType, Value};
