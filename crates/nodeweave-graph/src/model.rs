//! Model handles: a schema bound to a query runner.

use std::sync::Arc;

use nodeweave_core::{Properties, RelationshipDefinition, SchemaDefinition, SchemaRegistry, Where};

use crate::builder::NodeMatch;
use crate::client::GraphError;
use crate::entity::Entity;
use crate::runner::{QueryRunner, Row};

/// Entry point for all operations on one label.
///
/// Clone is cheap; every field is shared.
#[derive(Clone)]
pub struct Model {
    pub(crate) registry: Arc<SchemaRegistry>,
    pub(crate) schema: Arc<SchemaDefinition>,
    pub(crate) runner: Arc<dyn QueryRunner>,
}

impl Model {
    pub fn new(
        registry: &Arc<SchemaRegistry>,
        label: &str,
        runner: Arc<dyn QueryRunner>,
    ) -> Result<Self, GraphError> {
        let schema = Arc::clone(registry.schema(label)?);
        Ok(Self {
            registry: Arc::clone(registry),
            schema,
            runner,
        })
    }

    pub fn label(&self) -> &str {
        self.schema.label()
    }

    pub fn schema(&self) -> &Arc<SchemaDefinition> {
        &self.schema
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    pub fn runner(&self) -> &Arc<dyn QueryRunner> {
        &self.runner
    }

    /// An empty filter on this model; chain `.eq(..)?` to narrow it.
    pub fn filter(&self) -> Where {
        Where::on(&self.schema)
    }

    /// A match clause on this model for the query composer.
    pub fn node(&self) -> NodeMatch {
        NodeMatch::new(&self.schema)
    }

    /// Look up a relationship registered on this model by alias.
    pub fn relationship(&self, alias: &str) -> Result<&RelationshipDefinition, GraphError> {
        Ok(self.schema.relationship(alias)?)
    }

    /// Validate `properties` and wrap them in an unsaved entity.
    pub fn build(&self, properties: Properties) -> Result<Entity, GraphError> {
        self.registry.validate(self.label(), &properties)?;
        Ok(Entity::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.schema),
            properties,
        ))
    }

    pub(crate) fn check_filter(&self, filter: &Where, expected: &str) -> Result<(), GraphError> {
        if filter.label() != expected {
            return Err(GraphError::InvalidQuery(format!(
                "filter on {} used where {expected} was expected",
                filter.label()
            )));
        }
        Ok(())
    }

    pub(crate) fn check_entity(&self, entity: &Entity) -> Result<(), GraphError> {
        if entity.label() != self.label() {
            return Err(GraphError::InvalidQuery(format!(
                "{} entity passed to the {} model",
                entity.label(),
                self.label()
            )));
        }
        Ok(())
    }
}

/// Fail with a persistence error unless `column` of the first row equals `expected`.
pub(crate) fn expect_count(
    rows: &[Row],
    column: &str,
    expected: i64,
    operation: &'static str,
    label: &str,
) -> Result<(), GraphError> {
    let actual = rows.first().and_then(|row| row.count(column)).unwrap_or(0);
    if actual != expected {
        return Err(GraphError::persistence(
            operation,
            label,
            format!("expected {expected} node(s) to be affected, got {actual}"),
        ));
    }
    Ok(())
}
