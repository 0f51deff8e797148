//! Declarative schema definitions for node labels and their relationships.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::value::PropertyType;

// ── Property Specs ────────────────────────────────────────────────

/// A single constraint attached to a property.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Required,
    /// Minimum string length, counted in characters.
    MinLength(usize),
    /// Inclusive numeric lower bound.
    Minimum(f64),
    /// Named predicate resolved through the registry's validator table.
    Custom(String),
}

/// Type and constraints of one schema property.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertySpec {
    pub kind: PropertyType,
    pub constraints: Vec<Constraint>,
}

impl PropertySpec {
    pub fn new(kind: PropertyType) -> Self {
        Self {
            kind,
            constraints: Vec::new(),
        }
    }

    pub fn string() -> Self {
        Self::new(PropertyType::String)
    }

    pub fn number() -> Self {
        Self::new(PropertyType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(PropertyType::Boolean)
    }

    pub fn required(mut self) -> Self {
        self.constraints.push(Constraint::Required);
        self
    }

    pub fn min_length(mut self, min: usize) -> Self {
        self.constraints.push(Constraint::MinLength(min));
        self
    }

    pub fn minimum(mut self, min: f64) -> Self {
        self.constraints.push(Constraint::Minimum(min));
        self
    }

    pub fn custom(mut self, validator: &str) -> Self {
        self.constraints.push(Constraint::Custom(validator.to_string()));
        self
    }

    pub fn is_required(&self) -> bool {
        self.constraints.contains(&Constraint::Required)
    }

    /// Ids of the custom validators this property references.
    pub fn custom_validators(&self) -> impl Iterator<Item = &str> {
        self.constraints.iter().filter_map(|c| match c {
            Constraint::Custom(id) => Some(id.as_str()),
            _ => None,
        })
    }
}

// ── Relationships ─────────────────────────────────────────────────

/// Traversal direction of a relationship, seen from its source schema.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Out,
    In,
    Either,
}

impl Direction {
    pub fn reversed(self) -> Self {
        match self {
            Direction::Out => Direction::In,
            Direction::In => Direction::Out,
            Direction::Either => Direction::Either,
        }
    }
}

/// A named, typed, directed relationship from one schema to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipDefinition {
    /// Application-facing name, unique per source schema.
    pub alias: String,
    /// Label of the target schema.
    pub target: String,
    /// Edge type stored in the database (e.g. `LIKES`).
    pub edge_type: String,
    pub direction: Direction,
    /// Alias to register on the target schema, pointing back at the source.
    pub reverse_alias: Option<String>,
}

impl RelationshipDefinition {
    pub fn new(alias: &str, target: &str, edge_type: &str, direction: Direction) -> Self {
        Self {
            alias: alias.to_string(),
            target: target.to_string(),
            edge_type: edge_type.to_string(),
            direction,
            reverse_alias: None,
        }
    }

    pub fn with_reverse(mut self, alias: &str) -> Self {
        self.reverse_alias = Some(alias.to_string());
        self
    }

    /// The definition registered on the target schema for the reverse alias.
    pub fn reversed(&self, source_label: &str) -> Option<RelationshipDefinition> {
        self.reverse_alias.as_ref().map(|alias| RelationshipDefinition {
            alias: alias.clone(),
            target: source_label.to_string(),
            edge_type: self.edge_type.clone(),
            direction: self.direction.reversed(),
            reverse_alias: Some(self.alias.clone()),
        })
    }
}

// ── Schema Definition ─────────────────────────────────────────────

/// Label, primary key, typed properties, and relationship table of a node type.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDefinition {
    label: String,
    primary_key: String,
    properties: BTreeMap<String, PropertySpec>,
    relationships: BTreeMap<String, RelationshipDefinition>,
}

impl SchemaDefinition {
    /// Define a schema.
    ///
    /// The primary key must be one of the properties and must be required.
    /// Labels and property names are interpolated into Cypher, so they must be
    /// plain identifiers.
    pub fn define<K, I>(label: &str, primary_key: &str, properties: I) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, PropertySpec)>,
    {
        let properties: BTreeMap<String, PropertySpec> = properties
            .into_iter()
            .map(|(name, spec)| (name.into(), spec))
            .collect();

        let invalid = |reason: String| SchemaError::InvalidDefinition {
            label: label.to_string(),
            reason,
        };

        if !is_identifier(label) {
            return Err(invalid(format!("label {label:?} is not a valid identifier")));
        }

        for (name, spec) in &properties {
            if !is_identifier(name) {
                return Err(invalid(format!(
                    "property {name:?} is not a valid identifier"
                )));
            }
            for constraint in &spec.constraints {
                match constraint {
                    Constraint::MinLength(_) if spec.kind != PropertyType::String => {
                        return Err(invalid(format!(
                            "minLength on {name} requires a string property"
                        )));
                    }
                    Constraint::Minimum(_) if spec.kind != PropertyType::Number => {
                        return Err(invalid(format!(
                            "minimum on {name} requires a number property"
                        )));
                    }
                    _ => {}
                }
            }
        }

        match properties.get(primary_key) {
            None => {
                return Err(invalid(format!(
                    "primary key {primary_key} is not a declared property"
                )))
            }
            Some(spec) if !spec.is_required() => {
                return Err(invalid(format!(
                    "primary key {primary_key} must be required"
                )))
            }
            Some(_) => {}
        }

        Ok(Self {
            label: label.to_string(),
            primary_key: primary_key.to_string(),
            properties,
            relationships: BTreeMap::new(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    pub fn property(&self, name: &str) -> Option<&PropertySpec> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &PropertySpec)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Register a relationship on this schema.
    pub fn add_relationship(
        &mut self,
        alias: &str,
        target: &str,
        edge_type: &str,
        direction: Direction,
    ) -> Result<()> {
        self.insert_relationship(RelationshipDefinition::new(
            alias, target, edge_type, direction,
        ))
    }

    /// Register a relationship definition.
    ///
    /// Registering an identical definition twice is a no-op; a different
    /// definition under an existing alias is a [`SchemaError::DuplicateAlias`].
    pub fn insert_relationship(&mut self, definition: RelationshipDefinition) -> Result<()> {
        for (what, name) in [
            ("alias", &definition.alias),
            ("edge type", &definition.edge_type),
        ] {
            if !is_identifier(name) {
                return Err(SchemaError::InvalidDefinition {
                    label: self.label.clone(),
                    reason: format!("relationship {what} {name:?} is not a valid identifier"),
                });
            }
        }

        if let Some(existing) = self.relationships.get(&definition.alias) {
            if existing == &definition {
                return Ok(());
            }
            return Err(SchemaError::DuplicateAlias {
                label: self.label.clone(),
                alias: definition.alias,
            });
        }

        self.relationships
            .insert(definition.alias.clone(), definition);
        Ok(())
    }

    /// Look up a relationship by alias.
    pub fn relationship(&self, alias: &str) -> Result<&RelationshipDefinition> {
        self.relationships
            .get(alias)
            .ok_or_else(|| SchemaError::UnresolvedRelationship {
                label: self.label.clone(),
                alias: alias.to_string(),
            })
    }

    pub fn relationships(&self) -> impl Iterator<Item = &RelationshipDefinition> {
        self.relationships.values()
    }
}

/// Whether `name` can be spliced into Cypher as a label, key, or type.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie() -> SchemaDefinition {
        SchemaDefinition::define(
            "Movie",
            "name",
            [
                ("name", PropertySpec::string().required().min_length(1)),
                ("year", PropertySpec::number().required().minimum(1900.0)),
            ],
        )
        .unwrap()
    }

    #[test]
    fn primary_key_must_be_declared() {
        let err = SchemaDefinition::define(
            "Movie",
            "title",
            [("name", PropertySpec::string().required())],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition { .. }));
    }

    #[test]
    fn primary_key_must_be_required() {
        let err = SchemaDefinition::define("Movie", "name", [("name", PropertySpec::string())])
            .unwrap_err();
        assert!(err.to_string().contains("must be required"));
    }

    #[test]
    fn constraints_must_fit_the_type() {
        let err = SchemaDefinition::define(
            "Movie",
            "name",
            [
                ("name", PropertySpec::string().required()),
                ("year", PropertySpec::number().min_length(4)),
            ],
        )
        .unwrap_err();
        assert!(err.to_string().contains("minLength on year"));
    }

    #[test]
    fn labels_must_be_identifiers() {
        let err = SchemaDefinition::define(
            "Movie) DETACH DELETE (m",
            "name",
            [("name", PropertySpec::string().required())],
        )
        .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidDefinition { .. }));
    }

    #[test]
    fn duplicate_alias_is_rejected() {
        let mut schema = movie();
        schema
            .add_relationship("Sequel", "Movie", "SEQUEL_OF", Direction::Out)
            .unwrap();
        let err = schema
            .add_relationship("Sequel", "Movie", "FOLLOWS", Direction::Out)
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateAlias {
                label: "Movie".to_string(),
                alias: "Sequel".to_string()
            }
        );
    }

    #[test]
    fn identical_registration_is_idempotent() {
        let mut schema = movie();
        schema
            .add_relationship("Sequel", "Movie", "SEQUEL_OF", Direction::Out)
            .unwrap();
        schema
            .add_relationship("Sequel", "Movie", "SEQUEL_OF", Direction::Out)
            .unwrap();
        assert_eq!(schema.relationships().count(), 1);
    }

    #[test]
    fn unknown_alias_is_unresolved() {
        let err = movie().relationship("LikedBy").unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedRelationship { .. }));
    }

    #[test]
    fn reverse_flips_direction_and_target() {
        let likes = RelationshipDefinition::new("LikesMovie", "Movie", "LIKES", Direction::Out)
            .with_reverse("LikedBy");
        let reverse = likes.reversed("User").unwrap();
        assert_eq!(reverse.alias, "LikedBy");
        assert_eq!(reverse.target, "User");
        assert_eq!(reverse.direction, Direction::In);
        assert_eq!(reverse.reverse_alias.as_deref(), Some("LikesMovie"));
    }

    #[test]
    fn identifier_rules() {
        assert!(is_identifier("LIKES"));
        assert!(is_identifier("_private1"));
        assert!(!is_identifier("1abc"));
        assert!(!is_identifier("has space"));
        assert!(!is_identifier(""));
    }
}
