//! Entity instances and their persistence state.

use std::collections::BTreeSet;
use std::sync::Arc;

use nodeweave_core::value::from_properties;
use nodeweave_core::{Properties, SchemaDefinition, SchemaError, SchemaRegistry, Value};

use crate::client::GraphError;

/// Where an entity stands relative to the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Built in memory, never saved.
    New,
    /// Matches what was last read from or written to the database.
    Persisted,
    /// Persisted, with unsaved changes.
    Modified,
}

/// A node's properties bound to its schema.
///
/// Every `build`/`find_*` call yields an independent entity; two entities
/// for the same node do not observe each other's changes.
#[derive(Debug, Clone)]
pub struct Entity {
    registry: Arc<SchemaRegistry>,
    schema: Arc<SchemaDefinition>,
    properties: Properties,
    state: EntityState,
    persisted_key: Option<Value>,
    dirty: BTreeSet<String>,
}

impl Entity {
    pub(crate) fn new(
        registry: Arc<SchemaRegistry>,
        schema: Arc<SchemaDefinition>,
        properties: Properties,
    ) -> Self {
        Self {
            registry,
            schema,
            properties,
            state: EntityState::New,
            persisted_key: None,
            dirty: BTreeSet::new(),
        }
    }

    pub(crate) fn persisted(
        registry: Arc<SchemaRegistry>,
        schema: Arc<SchemaDefinition>,
        properties: Properties,
    ) -> Self {
        let mut entity = Self::new(registry, schema, properties);
        entity.mark_persisted();
        entity
    }

    pub fn label(&self) -> &str {
        self.schema.label()
    }

    pub fn schema(&self) -> &Arc<SchemaDefinition> {
        &self.schema
    }

    pub fn state(&self) -> EntityState {
        self.state
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.properties.get(name)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(Value::as_i64)
    }

    /// Current primary-key value.
    pub fn primary_key(&self) -> Option<&Value> {
        self.properties.get(self.schema.primary_key())
    }

    /// Primary-key value the node is stored under; `None` until saved.
    pub fn persisted_key(&self) -> Option<&Value> {
        self.persisted_key.as_ref()
    }

    /// Fields changed since the entity was last persisted.
    pub fn dirty_fields(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    /// Assign a property after validating it against the schema.
    ///
    /// A persisted entity becomes `Modified` only if the value changes.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), SchemaError> {
        let value = value.into();
        self.registry
            .validate_field(self.schema.label(), name, &value)?;

        if self.properties.get(name) == Some(&value) {
            return Ok(());
        }
        self.properties.insert(name.to_string(), value);
        if self.state != EntityState::New {
            self.dirty.insert(name.to_string());
            self.state = EntityState::Modified;
        }
        Ok(())
    }

    /// Deserialize the properties into a typed struct.
    pub fn to<T: serde::de::DeserializeOwned>(&self) -> Result<T, GraphError> {
        from_properties(&self.properties).map_err(|e| GraphError::Serialization(e.to_string()))
    }

    pub(crate) fn mark_persisted(&mut self) {
        self.persisted_key = self.primary_key().cloned();
        self.dirty.clear();
        self.state = EntityState::Persisted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nodeweave_core::{props, PropertySpec};

    fn registry() -> Arc<SchemaRegistry> {
        let user = SchemaDefinition::define(
            "User",
            "name",
            [
                ("name", PropertySpec::string().required().min_length(1)),
                ("age", PropertySpec::number().required().minimum(1.0)),
            ],
        )
        .unwrap();
        Arc::new(
            SchemaRegistry::builder()
                .schema(user)
                .unwrap()
                .relationships()
                .finish()
                .unwrap(),
        )
    }

    fn barry(state_persisted: bool) -> Entity {
        let registry = registry();
        let schema = Arc::clone(registry.schema("User").unwrap());
        let properties = props([("name", Value::from("Barry")), ("age", Value::from(36))]);
        if state_persisted {
            Entity::persisted(registry, schema, properties)
        } else {
            Entity::new(registry, schema, properties)
        }
    }

    #[test]
    fn new_entities_stay_new_on_set() {
        let mut entity = barry(false);
        entity.set("age", 37).unwrap();
        assert_eq!(entity.state(), EntityState::New);
        assert_eq!(entity.dirty_fields().count(), 0);
        assert!(entity.persisted_key().is_none());
    }

    #[test]
    fn changing_a_persisted_entity_marks_it_modified() {
        let mut entity = barry(true);
        assert_eq!(entity.state(), EntityState::Persisted);

        entity.set("age", 37).unwrap();
        assert_eq!(entity.state(), EntityState::Modified);
        assert_eq!(entity.dirty_fields().collect::<Vec<_>>(), vec!["age"]);
        assert_eq!(entity.get_i64("age"), Some(37));
    }

    #[test]
    fn setting_the_same_value_is_not_a_change() {
        let mut entity = barry(true);
        entity.set("age", 36).unwrap();
        assert_eq!(entity.state(), EntityState::Persisted);
    }

    #[test]
    fn invalid_assignment_leaves_entity_untouched() {
        let mut entity = barry(true);
        assert!(entity.set("age", 0).is_err());
        assert!(entity.set("nickname", "B").is_err());
        assert_eq!(entity.get_i64("age"), Some(36));
        assert_eq!(entity.state(), EntityState::Persisted);
    }

    #[test]
    fn persisted_key_survives_primary_key_change() {
        let mut entity = barry(true);
        entity.set("name", "Barold").unwrap();
        assert_eq!(entity.persisted_key(), Some(&Value::from("Barry")));
        assert_eq!(entity.primary_key(), Some(&Value::from("Barold")));
    }

    #[test]
    fn typed_view() {
        #[derive(serde::Deserialize)]
        struct User {
            name: String,
            age: i64,
        }
        let user: User = barry(true).to().unwrap();
        assert_eq!(user.name, "Barry");
        assert_eq!(user.age, 36);
    }
}
