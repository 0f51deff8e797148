//! Read operations on a single label.

use std::sync::Arc;

use nodeweave_core::{Properties, Value, Where};

use crate::client::GraphError;
use crate::cypher::node_pattern;
use crate::entity::Entity;
use crate::model::Model;
use crate::runner::{Params, Row, Statement};

impl Model {
    // ── Lookups ──────────────────────────────────────────────────

    /// First node matching `filter`, ordered by primary key.
    pub async fn find_one(&self, filter: Where) -> Result<Option<Entity>, GraphError> {
        let mut found = self.find_many(filter, Some(1)).await?;
        Ok(found.pop())
    }

    /// Every node matching `filter`, ordered by primary key.
    pub async fn find_many(
        &self,
        filter: Where,
        limit: Option<u64>,
    ) -> Result<Vec<Entity>, GraphError> {
        self.check_filter(&filter, self.label())?;
        let rows = self.runner.execute(&self.find_statement(&filter, limit)).await?;
        rows.iter().map(|row| self.entity_from_row(row)).collect()
    }

    /// The node with primary key `key`, or [`GraphError::NotFound`].
    pub async fn get(&self, key: impl Into<Value>) -> Result<Entity, GraphError> {
        let key = key.into();
        let filter = self.filter().eq(self.schema.primary_key(), key.clone())?;
        self.find_one(filter)
            .await?
            .ok_or_else(|| GraphError::NotFound {
                label: self.label().to_string(),
                key: key.to_string(),
            })
    }

    // ── Aggregates ───────────────────────────────────────────────

    /// Number of nodes matching `filter`.
    pub async fn count(&self, filter: Where) -> Result<u64, GraphError> {
        self.check_filter(&filter, self.label())?;
        let mut params = Params::new();
        let pattern = node_pattern(Some("n"), self.label(), filter.conditions(), "w", &mut params);
        let statement = Statement {
            cypher: format!("MATCH {pattern} RETURN count(n) AS total"),
            params,
            columns: vec!["total".to_string()],
        };

        let rows = self.runner.execute(&statement).await?;
        let total = rows.first().and_then(|row| row.count("total")).unwrap_or(0);
        Ok(total.max(0) as u64)
    }

    // ── Helpers ──────────────────────────────────────────────────

    fn find_statement(&self, filter: &Where, limit: Option<u64>) -> Statement {
        let mut params = Params::new();
        let pattern = node_pattern(Some("n"), self.label(), filter.conditions(), "w", &mut params);
        let mut cypher = format!(
            "MATCH {pattern}
             RETURN n
             ORDER BY n.{pk}",
            pk = self.schema.primary_key()
        );
        if let Some(limit) = limit {
            cypher.push_str(" LIMIT $limit");
            params.insert("limit".to_string(), Value::Integer(limit as i64));
        }
        Statement {
            cypher,
            params,
            columns: vec!["n".to_string()],
        }
    }

    fn entity_from_row(&self, row: &Row) -> Result<Entity, GraphError> {
        let properties: Properties = row.node("n").cloned().ok_or_else(|| {
            GraphError::Serialization(format!("expected a {} node in column n", self.label()))
        })?;
        Ok(Entity::persisted(
            Arc::clone(&self.registry),
            Arc::clone(&self.schema),
            properties,
        ))
    }
}
