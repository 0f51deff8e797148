//! The query-execution seam.
//!
//! Everything above this module speaks in [`Statement`]s and [`Row`]s. The
//! driver-backed runner lives in [`crate::client`]; [`crate::mock`] provides a
//! scripted one for tests.

use std::collections::BTreeMap;

use async_trait::async_trait;

use nodeweave_core::{Properties, Value};

use crate::client::GraphError;

/// Named query parameters.
pub type Params = BTreeMap<String, Value>;

/// A Cypher statement, its parameters, and the columns it returns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Statement {
    pub cypher: String,
    pub params: Params,
    pub columns: Vec<String>,
}

impl Statement {
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            ..Default::default()
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }
}

/// One returned column value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Node(Properties),
    Value(Value),
    Null,
}

/// One result row, keyed by returned column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    fields: BTreeMap<String, Field>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_node(mut self, column: &str, properties: Properties) -> Self {
        self.insert(column, Field::Node(properties));
        self
    }

    pub fn with_value(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.insert(column, Field::Value(value.into()));
        self
    }

    pub fn insert(&mut self, column: &str, field: Field) {
        self.fields.insert(column.to_string(), field);
    }

    pub fn get(&self, column: &str) -> Option<&Field> {
        self.fields.get(column)
    }

    pub fn node(&self, column: &str) -> Option<&Properties> {
        match self.fields.get(column) {
            Some(Field::Node(props)) => Some(props),
            _ => None,
        }
    }

    pub fn value(&self, column: &str) -> Option<&Value> {
        match self.fields.get(column) {
            Some(Field::Value(value)) => Some(value),
            _ => None,
        }
    }

    /// Integer column, as returned by `count(..)` and `size(..)`.
    pub fn count(&self, column: &str) -> Option<i64> {
        self.value(column).and_then(Value::as_i64)
    }
}

/// Executes statements against a graph database.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    /// Execute a statement in its own auto-commit transaction.
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>, GraphError>;

    /// Begin an explicit transaction.
    async fn begin(&self) -> Result<Box<dyn Transaction>, GraphError>;
}

/// An open transaction. Must be consumed by [`commit`](Transaction::commit)
/// or [`rollback`](Transaction::rollback).
#[async_trait]
pub trait Transaction: Send {
    async fn execute(&mut self, statement: &Statement) -> Result<Vec<Row>, GraphError>;

    async fn commit(self: Box<Self>) -> Result<(), GraphError>;

    async fn rollback(self: Box<Self>) -> Result<(), GraphError>;
}

/// Commit on success, roll back on failure.
///
/// A failed rollback is logged and the original error is returned.
pub async fn finish<T>(
    txn: Box<dyn Transaction>,
    outcome: Result<T, GraphError>,
) -> Result<T, GraphError> {
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::warn!(error = %rollback_err, "Transaction rollback failed");
            }
            tracing::debug!(error = %e, "Transaction rolled back");
            Err(e)
        }
    }
}
