//! Neo4j connection management and the driver-backed query runner.

use async_trait::async_trait;
use neo4rs::{BoltType, ConfigBuilder, Graph, Query};
use serde::Deserialize;

use nodeweave_core::{Properties, SchemaError, Value};

use crate::runner::{Field, QueryRunner, Row, Statement, Transaction};

/// Errors from graph operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("Neo4j connection error: {0}")]
    Connection(String),

    #[error("Neo4j query error: {0}")]
    Query(#[from] neo4rs::Error),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("{operation} on {label} failed: {detail}")]
    Persistence {
        operation: &'static str,
        label: String,
        detail: String,
    },

    #[error("Node not found: {label} with primary key {key}")]
    NotFound { label: String, key: String },

    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Query execution failed: {0}")]
    Execution(String),
}

impl GraphError {
    pub(crate) fn persistence(
        operation: &'static str,
        label: &str,
        detail: impl Into<String>,
    ) -> Self {
        GraphError::Persistence {
            operation,
            label: label.to_string(),
            detail: detail.into(),
        }
    }
}

/// Configuration for connecting to Neo4j.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_password")]
    pub password: String,
    /// Upgrade plain `bolt://` / `neo4j://` URLs to their TLS schemes.
    #[serde(default)]
    pub encrypted: bool,
    /// Target database; the server default when unset.
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    #[serde(default = "default_fetch_size")]
    pub fetch_size: usize,
}

fn default_url() -> String {
    "bolt://localhost:7687".to_string()
}

fn default_username() -> String {
    "neo4j".to_string()
}

fn default_password() -> String {
    "neo4j".to_string()
}

fn default_max_connections() -> u32 {
    16
}

fn default_fetch_size() -> usize {
    256
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            username: default_username(),
            password: default_password(),
            encrypted: false,
            database: None,
            max_connections: default_max_connections(),
            fetch_size: default_fetch_size(),
        }
    }
}

impl GraphConfig {
    /// The URL handed to the driver, with the encryption flag applied.
    pub fn effective_url(&self) -> String {
        if !self.encrypted {
            return self.url.clone();
        }
        for scheme in ["bolt", "neo4j"] {
            if let Some(rest) = self.url.strip_prefix(&format!("{scheme}://")) {
                return format!("{scheme}+s://{rest}");
            }
        }
        self.url.clone()
    }
}

/// Thread-safe Neo4j graph client with connection pooling.
///
/// Clone is cheap (inner Arc).
#[derive(Clone)]
pub struct GraphClient {
    graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j with the given configuration.
    pub async fn connect(config: &GraphConfig) -> Result<Self, GraphError> {
        let mut builder = ConfigBuilder::default()
            .uri(config.effective_url())
            .user(config.username.as_str())
            .password(config.password.as_str())
            .max_connections(config.max_connections as usize)
            .fetch_size(config.fetch_size);
        if let Some(db) = &config.database {
            builder = builder.db(db.as_str());
        }
        let neo_config = builder
            .build()
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        let graph = Graph::connect(neo_config)
            .await
            .map_err(|e| GraphError::Connection(e.to_string()))?;

        tracing::info!(url = %config.url, encrypted = config.encrypted, "Connected to Neo4j");
        Ok(Self { graph })
    }

    /// Execute a query and collect all rows.
    pub async fn query_rows(&self, query: Query) -> Result<Vec<neo4rs::Row>, GraphError> {
        let mut stream = self.graph.execute(query).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    /// Begin a driver transaction.
    pub async fn start_txn(&self) -> Result<neo4rs::Txn, GraphError> {
        Ok(self.graph.start_txn().await?)
    }
}

#[async_trait]
impl QueryRunner for GraphClient {
    async fn execute(&self, statement: &Statement) -> Result<Vec<Row>, GraphError> {
        tracing::debug!(cypher = %statement.cypher, "Executing statement");
        let rows = self.query_rows(to_query(statement)).await?;
        Ok(rows
            .iter()
            .map(|row| convert_row(row, &statement.columns))
            .collect())
    }

    async fn begin(&self) -> Result<Box<dyn Transaction>, GraphError> {
        let txn = self.start_txn().await?;
        Ok(Box::new(Neo4jTransaction { txn }))
    }
}

/// A driver transaction behind the [`Transaction`] seam.
struct Neo4jTransaction {
    txn: neo4rs::Txn,
}

#[async_trait]
impl Transaction for Neo4jTransaction {
    async fn execute(&mut self, statement: &Statement) -> Result<Vec<Row>, GraphError> {
        tracing::debug!(cypher = %statement.cypher, "Executing statement in transaction");
        let mut stream = self.txn.execute(to_query(statement)).await?;
        let mut rows = Vec::new();
        while let Some(row) = stream.next(self.txn.handle()).await? {
            rows.push(convert_row(&row, &statement.columns));
        }
        Ok(rows)
    }

    async fn commit(self: Box<Self>) -> Result<(), GraphError> {
        self.txn.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), GraphError> {
        self.txn.rollback().await?;
        Ok(())
    }
}

// ── Conversion ───────────────────────────────────────────────────

fn to_query(statement: &Statement) -> Query {
    statement
        .params
        .iter()
        .fold(neo4rs::query(&statement.cypher), |q, (key, value)| {
            q.param(key, to_bolt(value))
        })
}

fn to_bolt(value: &Value) -> BoltType {
    match value {
        Value::Boolean(b) => (*b).into(),
        Value::Integer(n) => (*n).into(),
        Value::Float(n) => (*n).into(),
        Value::String(s) => s.clone().into(),
    }
}

/// Convert a driver row, column by column, into a [`Row`].
fn convert_row(row: &neo4rs::Row, columns: &[String]) -> Row {
    let mut converted = Row::new();
    for column in columns {
        let field = match row.get::<neo4rs::Node>(column) {
            Ok(node) => Field::Node(node_properties(&node)),
            Err(_) => row_scalar(row, column).map_or(Field::Null, Field::Value),
        };
        converted.insert(column, field);
    }
    converted
}

fn row_scalar(row: &neo4rs::Row, column: &str) -> Option<Value> {
    if let Ok(n) = row.get::<i64>(column) {
        return Some(Value::Integer(n));
    }
    if let Ok(n) = row.get::<f64>(column) {
        return Some(Value::Float(n));
    }
    if let Ok(b) = row.get::<bool>(column) {
        return Some(Value::Boolean(b));
    }
    row.get::<String>(column).ok().map(Value::String)
}

fn node_properties(node: &neo4rs::Node) -> Properties {
    let mut props = Properties::new();
    for key in node.keys() {
        let value = if let Ok(n) = node.get::<i64>(key) {
            Value::Integer(n)
        } else if let Ok(n) = node.get::<f64>(key) {
            Value::Float(n)
        } else if let Ok(b) = node.get::<bool>(key) {
            Value::Boolean(b)
        } else if let Ok(s) = node.get::<String>(key) {
            Value::String(s)
        } else {
            continue;
        };
        props.insert(key.to_string(), value);
    }
    props
}
