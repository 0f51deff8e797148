//! Two-phase schema registry.
//!
//! Phase 1 ([`RegistryBuilder`]) registers schemas and custom validators.
//! Phase 2 ([`RelationshipPhase`]) registers relationships, including
//! reverse aliases, and fails if either endpoint was never registered.
//! [`RelationshipPhase::finish`] freezes everything into a [`SchemaRegistry`].
//!
//! ```
//! # use nodeweave_core::registry::SchemaRegistry;
//! # use nodeweave_core::schema::{Direction, PropertySpec, RelationshipDefinition, SchemaDefinition};
//! let movie = SchemaDefinition::define(
//!     "Movie",
//!     "name",
//!     [("name", PropertySpec::string().required())],
//! )?;
//! let user = SchemaDefinition::define(
//!     "User",
//!     "name",
//!     [("name", PropertySpec::string().required())],
//! )?;
//! let registry = SchemaRegistry::builder()
//!     .schema(movie)?
//!     .schema(user)?
//!     .relationships()
//!     .relate(
//!         "User",
//!         RelationshipDefinition::new("LikesMovie", "Movie", "LIKES", Direction::Out)
//!             .with_reverse("LikedBy"),
//!     )?
//!     .finish()?;
//! assert_eq!(registry.relationship("Movie", "LikedBy")?.target, "User");
//! # Ok::<(), nodeweave_core::SchemaError>(())
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Result, SchemaError};
use crate::filter::Where;
use crate::schema::{RelationshipDefinition, SchemaDefinition};
use crate::validation::{self, ValidatorFn, Validators};
use crate::value::{Properties, Value};

/// Phase 1: schemas and validators.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    schemas: BTreeMap<String, SchemaDefinition>,
    validators: Validators,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom validator referenced by `Constraint::Custom(id)`.
    pub fn validator(mut self, id: &str, validator: ValidatorFn) -> Self {
        self.validators.register(id, validator);
        self
    }

    pub fn schema(mut self, schema: SchemaDefinition) -> Result<Self> {
        if self.schemas.contains_key(schema.label()) {
            return Err(SchemaError::InvalidDefinition {
                label: schema.label().to_string(),
                reason: "label is already registered".to_string(),
            });
        }
        self.schemas.insert(schema.label().to_string(), schema);
        Ok(self)
    }

    /// Close phase 1 and start registering relationships.
    pub fn relationships(self) -> RelationshipPhase {
        RelationshipPhase {
            schemas: self.schemas,
            validators: self.validators,
        }
    }
}

/// Phase 2: relationships between already-registered schemas.
#[derive(Debug)]
pub struct RelationshipPhase {
    schemas: BTreeMap<String, SchemaDefinition>,
    validators: Validators,
}

impl RelationshipPhase {
    /// Register `definition` on `source`, and its reverse alias on the target if set.
    pub fn relate(mut self, source: &str, definition: RelationshipDefinition) -> Result<Self> {
        for label in [source, definition.target.as_str()] {
            if !self.schemas.contains_key(label) {
                return Err(SchemaError::UnknownSchema {
                    label: label.to_string(),
                });
            }
        }

        let reverse = definition.reversed(source);
        let target = definition.target.clone();

        if let Some(schema) = self.schemas.get_mut(source) {
            schema.insert_relationship(definition)?;
        }
        if let (Some(reverse), Some(schema)) = (reverse, self.schemas.get_mut(&target)) {
            schema.insert_relationship(reverse)?;
        }
        Ok(self)
    }

    /// Resolve an alias registered so far.
    pub fn resolve(&self, label: &str, alias: &str) -> Result<&RelationshipDefinition> {
        self.schemas
            .get(label)
            .ok_or_else(|| SchemaError::UnknownSchema {
                label: label.to_string(),
            })?
            .relationship(alias)
    }

    /// Freeze the registry.
    ///
    /// Fails if any property references a validator that was never registered.
    pub fn finish(self) -> Result<SchemaRegistry> {
        for schema in self.schemas.values() {
            for (property, spec) in schema.properties() {
                if let Some(missing) = spec
                    .custom_validators()
                    .find(|id| !self.validators.contains(id))
                {
                    return Err(SchemaError::UnknownValidator {
                        label: schema.label().to_string(),
                        property: property.to_string(),
                        validator: missing.to_string(),
                    });
                }
            }
        }

        tracing::debug!(schemas = self.schemas.len(), "Schema registry finalized");

        Ok(SchemaRegistry {
            schemas: self
                .schemas
                .into_iter()
                .map(|(label, schema)| (label, Arc::new(schema)))
                .collect(),
            validators: self.validators,
        })
    }
}

/// Immutable, process-wide set of schemas and their relationships.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Arc<SchemaDefinition>>,
    validators: Validators,
}

impl SchemaRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn schema(&self, label: &str) -> Result<&Arc<SchemaDefinition>> {
        self.schemas
            .get(label)
            .ok_or_else(|| SchemaError::UnknownSchema {
                label: label.to_string(),
            })
    }

    /// Look up a relationship by its alias on `label`.
    pub fn relationship(&self, label: &str, alias: &str) -> Result<&RelationshipDefinition> {
        self.schema(label)?.relationship(alias)
    }

    pub fn validators(&self) -> &Validators {
        &self.validators
    }

    /// An empty filter on `label`.
    pub fn filter(&self, label: &str) -> Result<Where> {
        Ok(Where::all(self.schema(label)?))
    }

    pub fn validate(&self, label: &str, properties: &Properties) -> Result<()> {
        validation::validate_properties(self.schema(label)?, properties, &self.validators)
    }

    pub fn validate_batch(&self, label: &str, batch: &[Properties]) -> Result<()> {
        validation::validate_batch(self.schema(label)?, batch, &self.validators)
    }

    pub fn validate_field(&self, label: &str, name: &str, value: &Value) -> Result<()> {
        validation::validate_field(self.schema(label)?, name, value, &self.validators)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Direction, PropertySpec};
    use crate::value::props;

    fn named(label: &str) -> SchemaDefinition {
        SchemaDefinition::define(
            label,
            "name",
            [("name", PropertySpec::string().required().min_length(1))],
        )
        .unwrap()
    }

    fn likes() -> RelationshipDefinition {
        RelationshipDefinition::new("LikesMovie", "Movie", "LIKES", Direction::Out)
            .with_reverse("LikedBy")
    }

    #[test]
    fn duplicate_labels_are_rejected() {
        let err = SchemaRegistry::builder()
            .schema(named("Movie"))
            .unwrap()
            .schema(named("Movie"))
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition { .. }));
    }

    #[test]
    fn relating_to_a_missing_schema_fails() {
        let err = SchemaRegistry::builder()
            .schema(named("User"))
            .unwrap()
            .relationships()
            .relate("User", likes())
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::UnknownSchema {
                label: "Movie".to_string()
            }
        );
    }

    #[test]
    fn reverse_alias_is_registered_on_target() {
        let registry = SchemaRegistry::builder()
            .schema(named("Movie"))
            .unwrap()
            .schema(named("User"))
            .unwrap()
            .relationships()
            .relate("User", likes())
            .unwrap()
            .finish()
            .unwrap();

        let forward = registry.relationship("User", "LikesMovie").unwrap();
        assert_eq!(forward.direction, Direction::Out);
        let reverse = registry.relationship("Movie", "LikedBy").unwrap();
        assert_eq!(reverse.direction, Direction::In);
        assert_eq!(reverse.edge_type, "LIKES");
    }

    #[test]
    fn resolving_before_registration_is_unresolved() {
        let phase = SchemaRegistry::builder()
            .schema(named("Movie"))
            .unwrap()
            .schema(named("User"))
            .unwrap()
            .relationships();
        assert!(matches!(
            phase.resolve("Movie", "LikedBy"),
            Err(SchemaError::UnresolvedRelationship { .. })
        ));

        let phase = phase.relate("User", likes()).unwrap();
        assert!(phase.resolve("Movie", "LikedBy").is_ok());
    }

    #[test]
    fn relating_twice_is_idempotent() {
        let registry = SchemaRegistry::builder()
            .schema(named("Movie"))
            .unwrap()
            .schema(named("User"))
            .unwrap()
            .relationships()
            .relate("User", likes())
            .unwrap()
            .relate("User", likes())
            .unwrap()
            .finish()
            .unwrap();
        assert_eq!(registry.schema("Movie").unwrap().relationships().count(), 1);
    }

    #[test]
    fn reverse_alias_collision_is_a_duplicate() {
        let err = SchemaRegistry::builder()
            .schema(named("Movie"))
            .unwrap()
            .schema(named("User"))
            .unwrap()
            .relationships()
            .relate("User", likes())
            .unwrap()
            .relate(
                "User",
                RelationshipDefinition::new("Rated", "Movie", "RATED", Direction::Out)
                    .with_reverse("LikedBy"),
            )
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateAlias { .. }));
    }

    #[test]
    fn missing_validator_fails_at_finish() {
        let schema = SchemaDefinition::define(
            "Movie",
            "name",
            [("name", PropertySpec::string().required().custom("title_case"))],
        )
        .unwrap();
        let err = SchemaRegistry::builder()
            .schema(schema)
            .unwrap()
            .relationships()
            .finish()
            .unwrap_err();
        assert!(matches!(err, SchemaError::UnknownValidator { .. }));
    }

    #[test]
    fn registry_validates_with_its_validators() {
        let schema = SchemaDefinition::define(
            "Movie",
            "name",
            [("name", PropertySpec::string().required().custom("title_case"))],
        )
        .unwrap();
        let registry = SchemaRegistry::builder()
            .validator("title_case", |v| {
                v.as_str()
                    .and_then(|s| s.chars().next())
                    .is_some_and(char::is_uppercase)
            })
            .schema(schema)
            .unwrap()
            .relationships()
            .finish()
            .unwrap();

        assert!(registry
            .validate("Movie", &props([("name", Value::from("Inception"))]))
            .is_ok());
        assert!(registry
            .validate("Movie", &props([("name", Value::from("inception"))]))
            .is_err());
    }
}
