//! Write operations: create, save, delete.
//!
//! Every write runs inside a transaction so that a statement affecting the
//! wrong number of nodes is rolled back rather than left half-applied.
//! Validation happens before the transaction is opened.

use std::sync::Arc;

use nodeweave_core::{Properties, Value};

use crate::client::GraphError;
use crate::cypher::property_map;
use crate::entity::{Entity, EntityState};
use crate::model::{expect_count, Model};
use crate::runner::{finish, Params, Statement, Transaction};

impl Model {
    // ── Creates ──────────────────────────────────────────────────

    /// Validate and create a single node.
    ///
    /// Never retried: a create has no deduplication key.
    pub async fn create_one(&self, properties: Properties) -> Result<Entity, GraphError> {
        self.create_one_related(properties, Vec::new()).await
    }

    /// Create many nodes atomically.
    ///
    /// Every element is validated first; a single invalid element fails the
    /// whole batch before anything is sent.
    pub async fn create_many(&self, batch: Vec<Properties>) -> Result<Vec<Entity>, GraphError> {
        self.registry.validate_batch(self.label(), &batch)?;
        if batch.is_empty() {
            return Ok(Vec::new());
        }

        let mut txn = self.runner.begin().await?;
        let outcome = self.insert_all(txn.as_mut(), &batch).await;
        finish(txn, outcome).await?;

        tracing::info!(label = %self.label(), count = batch.len(), "Created nodes");
        Ok(batch
            .into_iter()
            .map(|properties| {
                Entity::persisted(
                    Arc::clone(&self.registry),
                    Arc::clone(&self.schema),
                    properties,
                )
            })
            .collect())
    }

    // ── Save ─────────────────────────────────────────────────────

    /// Persist an entity: create it if new, update its dirty fields if modified.
    ///
    /// Updates match the node by the primary key it was persisted under and
    /// fail unless exactly one node matches.
    pub async fn save(&self, entity: &mut Entity) -> Result<(), GraphError> {
        self.check_entity(entity)?;
        if entity.state() == EntityState::Persisted {
            return Ok(());
        }
        self.registry.validate(self.label(), entity.properties())?;

        let mut txn = self.runner.begin().await?;
        let outcome = match entity.state() {
            EntityState::New => self.insert(txn.as_mut(), entity.properties()).await,
            _ => self.update(txn.as_mut(), entity).await,
        };
        finish(txn, outcome).await?;

        tracing::debug!(label = %self.label(), key = ?entity.primary_key(), "Saved node");
        entity.mark_persisted();
        Ok(())
    }

    // ── Delete ───────────────────────────────────────────────────

    /// Detach-delete the node behind `entity`.
    pub async fn delete(&self, entity: Entity) -> Result<(), GraphError> {
        self.check_entity(&entity)?;
        let key = entity.persisted_key().cloned().ok_or_else(|| {
            GraphError::persistence("delete", self.label(), "entity has never been saved")
        })?;

        let statement = self.delete_statement(&key);
        let mut txn = self.runner.begin().await?;
        let outcome = match txn.execute(&statement).await {
            Ok(rows) => expect_count(&rows, "deleted", 1, "delete", self.label()),
            Err(e) => Err(e),
        };
        finish(txn, outcome).await?;

        tracing::debug!(label = %self.label(), key = %key, "Deleted node");
        Ok(())
    }

    // ── Statement execution ──────────────────────────────────────

    pub(crate) async fn insert(
        &self,
        txn: &mut dyn Transaction,
        properties: &Properties,
    ) -> Result<(), GraphError> {
        let rows = txn.execute(&self.create_statement(properties)).await?;
        expect_count(&rows, "created", 1, "create", self.label())
    }

    async fn insert_all(
        &self,
        txn: &mut dyn Transaction,
        batch: &[Properties],
    ) -> Result<(), GraphError> {
        for properties in batch {
            self.insert(txn, properties).await?;
        }
        Ok(())
    }

    async fn update(&self, txn: &mut dyn Transaction, entity: &Entity) -> Result<(), GraphError> {
        let Some(statement) = self.update_statement(entity) else {
            return Ok(());
        };
        let rows = txn.execute(&statement).await?;
        expect_count(&rows, "matched", 1, "update", self.label())
    }

    // ── Statements ───────────────────────────────────────────────

    pub(crate) fn create_statement(&self, properties: &Properties) -> Statement {
        let mut params = Params::new();
        let map = property_map(properties, "n", &mut params);
        Statement {
            cypher: format!(
                "CREATE (n:{label} {map})
                 RETURN count(n) AS created",
                label = self.label()
            ),
            params,
            columns: vec!["created".to_string()],
        }
    }

    /// `None` when nothing is dirty or the entity was never persisted.
    fn update_statement(&self, entity: &Entity) -> Option<Statement> {
        let key = entity.persisted_key()?;
        let assignments: Vec<String> = entity
            .dirty_fields()
            .map(|field| format!("n.{field} = $set_{field}"))
            .collect();
        if assignments.is_empty() {
            return None;
        }

        let mut statement = Statement::new(format!(
            "MATCH (n:{label} {{{pk}: $key}})
             SET {assignments}
             RETURN count(n) AS matched",
            label = self.label(),
            pk = self.schema.primary_key(),
            assignments = assignments.join(", "),
        ))
        .param("key", key.clone())
        .columns(["matched"]);

        for field in entity.dirty_fields() {
            if let Some(value) = entity.get(field) {
                statement = statement.param(&format!("set_{field}"), value.clone());
            }
        }
        Some(statement)
    }

    fn delete_statement(&self, key: &Value) -> Statement {
        Statement::new(format!(
            "MATCH (n:{label} {{{pk}: $key}})
             DETACH DELETE n
             RETURN count(n) AS deleted",
            label = self.label(),
            pk = self.schema.primary_key(),
        ))
        .param("key", key.clone())
        .columns(["deleted"])
    }
}
