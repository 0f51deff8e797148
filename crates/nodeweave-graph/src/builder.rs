//! Read-query composer.
//!
//! A [`QueryBuilder`] collects match clauses, projections, and ordering,
//! checks them against the registry, and renders a parametrized
//! [`Statement`]. Nothing reaches the runner until [`QueryBuilder::run`].
//!
//! ```ignore
//! let query = QueryBuilder::new(&registry)
//!     .match_related(
//!         Pattern::start(users.node().identifier("u"))
//!             .then(RelationshipStep::from_definition(users.relationship("LikesMovie")?),
//!                   movies.node().identifier("m")),
//!     )
//!     .return_items([
//!         Projection::node("m"),
//!         Projection::count("u", "totalLikes"),
//!         Projection::avg("u", "age", "averageAge"),
//!     ])
//!     .order_by("totalLikes", Order::Desc)
//!     .limit(1);
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;

use nodeweave_core::schema::is_identifier;
use nodeweave_core::value::from_properties;
use nodeweave_core::{
    Direction, Properties, PropertyType, RelationshipDefinition, SchemaDefinition,
    SchemaRegistry, Value, Where,
};

use crate::client::GraphError;
use crate::cypher::{node_pattern, relationship};
use crate::runner::{Params, QueryRunner, Row, Statement};

// ── Match clauses ────────────────────────────────────────────────

/// One node in a match clause: a schema, an optional filter, and an optional identifier.
#[derive(Debug, Clone)]
pub struct NodeMatch {
    schema: Arc<SchemaDefinition>,
    filter: Option<Where>,
    identifier: Option<String>,
}

impl NodeMatch {
    pub fn new(schema: &Arc<SchemaDefinition>) -> Self {
        Self {
            schema: Arc::clone(schema),
            filter: None,
            identifier: None,
        }
    }

    /// Bind the node to `identifier` so it can be projected or ordered on.
    pub fn identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }

    pub fn filter(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn label(&self) -> &str {
        self.schema.label()
    }
}

/// One hop between two nodes of a pattern.
#[derive(Debug, Clone)]
pub struct RelationshipStep {
    definition: Option<RelationshipDefinition>,
    direction: Direction,
    identifier: Option<String>,
}

impl RelationshipStep {
    /// Traverse a registered relationship in its own direction.
    pub fn from_definition(definition: &RelationshipDefinition) -> Self {
        Self {
            direction: definition.direction,
            definition: Some(definition.clone()),
            identifier: None,
        }
    }

    /// Traverse any edge type in `direction`.
    pub fn any(direction: Direction) -> Self {
        Self {
            definition: None,
            direction,
            identifier: None,
        }
    }

    pub fn identifier(mut self, identifier: &str) -> Self {
        self.identifier = Some(identifier.to_string());
        self
    }
}

/// A chain `node (step node)*`.
#[derive(Debug, Clone)]
pub struct Pattern {
    start: NodeMatch,
    hops: Vec<(RelationshipStep, NodeMatch)>,
}

impl Pattern {
    pub fn start(node: NodeMatch) -> Self {
        Self {
            start: node,
            hops: Vec::new(),
        }
    }

    pub fn then(mut self, step: RelationshipStep, node: NodeMatch) -> Self {
        self.hops.push((step, node));
        self
    }
}

// ── Projections and ordering ─────────────────────────────────────

/// One item of the `RETURN` list.
#[derive(Debug, Clone, PartialEq)]
pub enum Projection {
    /// A bound node, returned whole.
    Node(String),
    /// `count(target) AS alias`.
    Count { target: String, alias: String },
    /// `avg(target.property) AS alias`; `property` must be numeric.
    Avg {
        target: String,
        property: String,
        alias: String,
    },
}

impl Projection {
    pub fn node(identifier: &str) -> Self {
        Projection::Node(identifier.to_string())
    }

    pub fn count(target: &str, alias: &str) -> Self {
        Projection::Count {
            target: target.to_string(),
            alias: alias.to_string(),
        }
    }

    pub fn avg(target: &str, property: &str, alias: &str) -> Self {
        Projection::Avg {
            target: target.to_string(),
            property: property.to_string(),
            alias: alias.to_string(),
        }
    }

    /// Result column this projection fills.
    pub fn column(&self) -> &str {
        match self {
            Projection::Node(identifier) => identifier,
            Projection::Count { alias, .. } | Projection::Avg { alias, .. } => alias,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

// ── Builder ──────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Clause {
    Node(NodeMatch),
    Pattern(Pattern),
}

/// Composes a read query over registered schemas.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    registry: Arc<SchemaRegistry>,
    clauses: Vec<Clause>,
    projections: Vec<Projection>,
    order: Vec<(String, Order)>,
    skip: Option<u64>,
    limit: Option<u64>,
}

/// What an identifier is bound to.
enum Binding {
    Node(Arc<SchemaDefinition>),
    Relationship,
}

impl QueryBuilder {
    pub fn new(registry: &Arc<SchemaRegistry>) -> Self {
        Self {
            registry: Arc::clone(registry),
            clauses: Vec::new(),
            projections: Vec::new(),
            order: Vec::new(),
            skip: None,
            limit: None,
        }
    }

    pub fn match_node(mut self, node: NodeMatch) -> Self {
        self.clauses.push(Clause::Node(node));
        self
    }

    pub fn match_related(mut self, pattern: Pattern) -> Self {
        self.clauses.push(Clause::Pattern(pattern));
        self
    }

    pub fn return_items(mut self, items: impl IntoIterator<Item = Projection>) -> Self {
        self.projections.extend(items);
        self
    }

    /// Add a sort key; `field` is a result column or `identifier.property`.
    /// Later keys break ties left by earlier ones.
    pub fn order_by(mut self, field: &str, order: Order) -> Self {
        self.order.push((field.to_string(), order));
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Validate and render the query.
    pub fn build(&self) -> Result<Statement, GraphError> {
        if self.clauses.is_empty() {
            return Err(invalid("a query needs at least one match clause"));
        }
        if self.projections.is_empty() {
            return Err(invalid("a query needs at least one return item"));
        }

        let mut render = Renderer::default();
        let mut lines = Vec::with_capacity(self.clauses.len() + 3);
        for clause in &self.clauses {
            let rendered = match clause {
                Clause::Node(node) => render.node(&self.registry, node)?,
                Clause::Pattern(pattern) => render.pattern(&self.registry, pattern)?,
            };
            lines.push(format!("MATCH {rendered}"));
        }

        let items = self
            .projections
            .iter()
            .map(|projection| render.projection(projection))
            .collect::<Result<Vec<_>, _>>()?;
        lines.push(format!("RETURN {}", items.join(", ")));

        if !self.order.is_empty() {
            let keys = self
                .order
                .iter()
                .map(|(field, order)| render.sort_key(field, *order, &self.projections))
                .collect::<Result<Vec<_>, _>>()?;
            lines.push(format!("ORDER BY {}", keys.join(", ")));
        }
        if let Some(skip) = self.skip {
            render.params.insert("skip".into(), Value::Integer(skip as i64));
            lines.push("SKIP $skip".into());
        }
        if let Some(limit) = self.limit {
            render.params.insert("limit".into(), Value::Integer(limit as i64));
            lines.push("LIMIT $limit".into());
        }

        Ok(Statement {
            cypher: lines.join("\n"),
            params: render.params,
            columns: self
                .projections
                .iter()
                .map(|p| p.column().to_string())
                .collect(),
        })
    }

    /// Build the query and execute it on `runner`.
    pub async fn run(&self, runner: &dyn QueryRunner) -> Result<QueryResult, GraphError> {
        let statement = self.build()?;
        tracing::debug!(cypher = %statement.cypher, "Running composed query");
        let rows = runner.execute(&statement).await?;
        Ok(QueryResult {
            columns: statement.columns,
            rows,
        })
    }
}

fn invalid(message: impl Into<String>) -> GraphError {
    GraphError::InvalidQuery(message.into())
}

/// Tracks bound identifiers and parameters while rendering one query.
#[derive(Default)]
struct Renderer {
    bound: BTreeMap<String, Binding>,
    params: Params,
    filters: usize,
}

impl Renderer {
    fn node(&mut self, registry: &SchemaRegistry, node: &NodeMatch) -> Result<String, GraphError> {
        let label = node.label();
        if !Arc::ptr_eq(registry.schema(label)?, &node.schema) {
            return Err(invalid(format!("{label} is not the registered schema")));
        }

        let empty = Properties::new();
        let conditions = match &node.filter {
            Some(filter) if filter.label() != label => {
                return Err(invalid(format!(
                    "filter on {} applied to {label}",
                    filter.label()
                )))
            }
            Some(filter) => filter.conditions(),
            None => &empty,
        };

        if let Some(identifier) = &node.identifier {
            self.bind(identifier, Binding::Node(Arc::clone(&node.schema)))?;
        }
        let prefix = format!("w{}", self.filters);
        if !conditions.is_empty() {
            self.filters += 1;
        }
        Ok(node_pattern(
            node.identifier.as_deref(),
            label,
            conditions,
            &prefix,
            &mut self.params,
        ))
    }

    fn pattern(&mut self, registry: &SchemaRegistry, pattern: &Pattern) -> Result<String, GraphError> {
        let mut rendered = self.node(registry, &pattern.start)?;
        let mut previous = &pattern.start;

        for (step, next) in &pattern.hops {
            if let Some(definition) = &step.definition {
                let registered = previous.schema.relationship(&definition.alias)?;
                if registered != definition {
                    return Err(invalid(format!(
                        "{} is not a relationship of {}",
                        definition.alias,
                        previous.label()
                    )));
                }
                if definition.target != next.label() {
                    return Err(invalid(format!(
                        "{} leads to {}, not {}",
                        definition.alias,
                        definition.target,
                        next.label()
                    )));
                }
            }
            if let Some(identifier) = &step.identifier {
                self.bind(identifier, Binding::Relationship)?;
            }

            rendered.push_str(&relationship(
                step.identifier.as_deref(),
                step.definition.as_ref().map(|d| d.edge_type.as_str()),
                step.direction,
            ));
            rendered.push_str(&self.node(registry, next)?);
            previous = next;
        }
        Ok(rendered)
    }

    fn bind(&mut self, identifier: &str, binding: Binding) -> Result<(), GraphError> {
        if !is_identifier(identifier) {
            return Err(invalid(format!("{identifier:?} is not a valid identifier")));
        }
        match (self.bound.get(identifier), &binding) {
            (None, _) => {
                self.bound.insert(identifier.to_string(), binding);
                Ok(())
            }
            // Rebinding a node to the same label joins the two clauses.
            (Some(Binding::Node(existing)), Binding::Node(schema))
                if existing.label() == schema.label() =>
            {
                Ok(())
            }
            _ => Err(invalid(format!("{identifier} is bound twice"))),
        }
    }

    fn bound_node(&self, identifier: &str) -> Result<&Arc<SchemaDefinition>, GraphError> {
        match self.bound.get(identifier) {
            Some(Binding::Node(schema)) => Ok(schema),
            Some(Binding::Relationship) => {
                Err(invalid(format!("{identifier} is a relationship, not a node")))
            }
            None => Err(invalid(format!("{identifier} is not bound by any match clause"))),
        }
    }

    fn numeric_property(&self, identifier: &str, property: &str) -> Result<(), GraphError> {
        let schema = self.bound_node(identifier)?;
        match schema.property(property) {
            Some(spec) if spec.kind == PropertyType::Number => Ok(()),
            Some(spec) => Err(invalid(format!(
                "{}.{property} is a {}, not a number",
                schema.label(),
                spec.kind
            ))),
            None => Err(invalid(format!(
                "{} has no property {property}",
                schema.label()
            ))),
        }
    }

    fn projection(&self, projection: &Projection) -> Result<String, GraphError> {
        let column = projection.column();
        if !is_identifier(column) {
            return Err(invalid(format!("{column:?} is not a valid column name")));
        }
        match projection {
            Projection::Node(identifier) => {
                self.bound_node(identifier)?;
                Ok(identifier.clone())
            }
            Projection::Count { target, alias } => {
                self.check_alias(alias)?;
                if !self.bound.contains_key(target) {
                    return Err(invalid(format!("{target} is not bound by any match clause")));
                }
                Ok(format!("count({target}) AS {alias}"))
            }
            Projection::Avg {
                target,
                property,
                alias,
            } => {
                self.check_alias(alias)?;
                self.numeric_property(target, property)?;
                Ok(format!("avg({target}.{property}) AS {alias}"))
            }
        }
    }

    fn check_alias(&self, alias: &str) -> Result<(), GraphError> {
        if self.bound.contains_key(alias) {
            return Err(invalid(format!("{alias} shadows a bound identifier")));
        }
        Ok(())
    }

    fn sort_key(
        &self,
        field: &str,
        order: Order,
        projections: &[Projection],
    ) -> Result<String, GraphError> {
        let known = match field.split_once('.') {
            Some((identifier, property)) => {
                let has_property = self
                    .bound_node(identifier)
                    .map(|schema| schema.property(property).is_some())?;
                // With aggregates, only grouping keys stay in scope after RETURN.
                let aggregated = projections.iter().any(|p| !matches!(p, Projection::Node(_)));
                let grouped = projections
                    .iter()
                    .any(|p| matches!(p, Projection::Node(node) if node == identifier));
                has_property && (!aggregated || grouped)
            }
            None => projections.iter().any(|p| p.column() == field),
        };
        if !known {
            return Err(invalid(format!("cannot order by {field}")));
        }
        Ok(match order {
            Order::Asc => field.to_string(),
            Order::Desc => format!("{field} DESC"),
        })
    }
}

// ── Results ──────────────────────────────────────────────────────

/// Rows returned by a composed query, in result order.
#[derive(Debug, Clone, Default)]
pub struct QueryResult {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl QueryResult {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn first(&self) -> Option<&Row> {
        self.rows.first()
    }

    /// Property sets bound to `identifier`, one per row that has one.
    pub fn nodes(&self, identifier: &str) -> Vec<&Properties> {
        self.rows
            .iter()
            .filter_map(|row| row.node(identifier))
            .collect()
    }

    /// Nodes bound to `identifier`, deserialized into `T`.
    pub fn properties<T: serde::de::DeserializeOwned>(
        &self,
        identifier: &str,
    ) -> Result<Vec<T>, GraphError> {
        self.nodes(identifier)
            .into_iter()
            .map(|props| {
                from_properties(props).map_err(|e| GraphError::Serialization(e.to_string()))
            })
            .collect()
    }

    /// Aggregate or scalar value in column `key` of row `row`.
    pub fn scalar(&self, row: usize, key: &str) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.value(key))
    }
}
