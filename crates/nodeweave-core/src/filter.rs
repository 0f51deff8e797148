//! Equality filters over schema properties.

use std::sync::Arc;

use crate::error::{Result, SchemaError, Violation, ViolationKind};
use crate::schema::SchemaDefinition;
use crate::value::{Properties, Value};

/// A partial mapping from property name to expected value, bound to one schema.
///
/// Property names and value types are checked against the schema when the
/// filter is built, so a query never carries an unknown property. An empty
/// filter matches every node of the label.
#[derive(Debug, Clone, PartialEq)]
pub struct Where {
    schema: Arc<SchemaDefinition>,
    conditions: Properties,
}

impl Where {
    /// An empty filter for `schema`.
    pub fn all(schema: &Arc<SchemaDefinition>) -> Self {
        Self {
            schema: Arc::clone(schema),
            conditions: Properties::new(),
        }
    }

    /// Start a filter for `schema`; reads better than [`Where::all`] in chains.
    pub fn on(schema: &Arc<SchemaDefinition>) -> Self {
        Self::all(schema)
    }

    /// Build a filter from an existing property map.
    pub fn from_properties(schema: &Arc<SchemaDefinition>, properties: Properties) -> Result<Self> {
        properties
            .into_iter()
            .try_fold(Self::all(schema), |filter, (name, value)| {
                filter.eq(&name, value)
            })
    }

    /// Add an equality condition.
    pub fn eq(mut self, name: &str, value: impl Into<Value>) -> Result<Self> {
        let value = value.into();
        let spec = self
            .schema
            .property(name)
            .ok_or_else(|| SchemaError::UnknownProperty {
                label: self.schema.label().to_string(),
                property: name.to_string(),
            })?;

        if value.property_type() != spec.kind {
            return Err(SchemaError::Validation {
                label: self.schema.label().to_string(),
                violations: vec![Violation::new(
                    name,
                    ViolationKind::WrongType {
                        expected: spec.kind,
                        actual: value.property_type(),
                    },
                )],
            });
        }

        self.conditions.insert(name.to_string(), value);
        Ok(self)
    }

    pub fn schema(&self) -> &Arc<SchemaDefinition> {
        &self.schema
    }

    pub fn label(&self) -> &str {
        self.schema.label()
    }

    pub fn conditions(&self) -> &Properties {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}
