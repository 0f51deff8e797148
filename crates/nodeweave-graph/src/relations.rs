//! Relationship linking: `relate_to` and nested create-and-relate.
//!
//! Aliases, filters, and payloads are all resolved and validated before a
//! transaction is opened. Each link is one statement that matches the source
//! by primary key and creates an edge per matched target.

use std::sync::Arc;

use nodeweave_core::{Properties, RelationshipDefinition, Value, Where};

use crate::client::GraphError;
use crate::cypher::{create_edge, node_pattern};
use crate::entity::Entity;
use crate::model::{expect_count, Model};
use crate::runner::{finish, Params, Row, Statement, Transaction};

/// Nodes to connect to a newly created entity through one alias.
///
/// `matching` relates existing nodes, `creating` creates new ones and
/// relates them. Both may be given; both are applied.
#[derive(Debug, Clone)]
pub struct RelatedNodes {
    alias: String,
    filter: Option<Where>,
    create: Vec<Properties>,
}

impl RelatedNodes {
    pub fn new(alias: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            filter: None,
            create: Vec::new(),
        }
    }

    /// Relate every existing target matching `filter`. At least one must match.
    pub fn matching(mut self, filter: Where) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Create a target node with `properties` and relate it.
    pub fn creating(mut self, properties: Properties) -> Self {
        self.create.push(properties);
        self
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }
}

/// A payload with its alias resolved against the source schema.
struct ResolvedLink<'a> {
    definition: &'a RelationshipDefinition,
    payload: &'a RelatedNodes,
}

impl Model {
    /// Create an entity and connect it to related nodes in one transaction.
    ///
    /// A `matching` filter that finds no target fails the whole operation,
    /// including the creation of the entity itself.
    pub async fn create_one_related(
        &self,
        properties: Properties,
        related: Vec<RelatedNodes>,
    ) -> Result<Entity, GraphError> {
        self.registry.validate(self.label(), &properties)?;
        let links = self.resolve_links(&related)?;
        let entity = Entity::persisted(
            Arc::clone(&self.registry),
            Arc::clone(&self.schema),
            properties,
        );
        let key = self.require_key(&entity, "create")?;

        let mut txn = self.runner.begin().await?;
        let outcome = self.create_linked(txn.as_mut(), &entity, &key, &links).await;
        finish(txn, outcome).await?;

        tracing::info!(
            label = %self.label(),
            key = %key,
            links = links.len(),
            "Created node"
        );
        Ok(entity)
    }

    /// Create an edge from `source` to every node matching `filter`.
    ///
    /// An empty filter relates every node of the target label. Returns the
    /// number of edges created; zero matches is not an error.
    pub async fn relate_to(
        &self,
        source: &Entity,
        alias: &str,
        filter: Where,
    ) -> Result<u64, GraphError> {
        self.check_entity(source)?;
        let definition = self.schema.relationship(alias)?;
        self.check_filter(&filter, &definition.target)?;
        let key = source.persisted_key().cloned().ok_or_else(|| {
            GraphError::persistence("relate", self.label(), "source entity has never been saved")
        })?;

        let statement = self.relate_statement(definition, &key, filter.conditions());
        let mut txn = self.runner.begin().await?;
        let outcome = match txn.execute(&statement).await {
            Ok(rows) => self.created_edges(&rows),
            Err(e) => Err(e),
        };
        let created = finish(txn, outcome).await?;

        tracing::debug!(
            label = %self.label(),
            key = %key,
            alias,
            created,
            "Related nodes"
        );
        Ok(created)
    }

    fn resolve_links<'a>(
        &'a self,
        related: &'a [RelatedNodes],
    ) -> Result<Vec<ResolvedLink<'a>>, GraphError> {
        related
            .iter()
            .map(|payload| -> Result<ResolvedLink<'a>, GraphError> {
                let definition = self.schema.relationship(&payload.alias)?;
                if let Some(filter) = &payload.filter {
                    self.check_filter(filter, &definition.target)?;
                }
                self.registry
                    .validate_batch(&definition.target, &payload.create)?;
                Ok(ResolvedLink {
                    definition,
                    payload,
                })
            })
            .collect()
    }

    fn require_key(&self, entity: &Entity, operation: &'static str) -> Result<Value, GraphError> {
        entity
            .persisted_key()
            .cloned()
            .ok_or_else(|| GraphError::persistence(operation, self.label(), "missing primary key"))
    }

    async fn create_linked(
        &self,
        txn: &mut dyn Transaction,
        entity: &Entity,
        key: &Value,
        links: &[ResolvedLink<'_>],
    ) -> Result<(), GraphError> {
        self.insert(txn, entity.properties()).await?;

        for link in links {
            let definition = link.definition;
            if let Some(filter) = &link.payload.filter {
                let statement = self.relate_statement(definition, key, filter.conditions());
                let created = self.created_edges(&txn.execute(&statement).await?)?;
                if created == 0 {
                    return Err(GraphError::persistence(
                        "relate",
                        self.label(),
                        format!(
                            "no {} matched the filter for {}",
                            definition.target, definition.alias
                        ),
                    ));
                }
            }
            for properties in &link.payload.create {
                let statement = self.create_related_statement(definition, key, properties);
                let rows = txn.execute(&statement).await?;
                expect_count(&rows, "created", 1, "create", &definition.target)?;
            }
        }
        Ok(())
    }

    /// Zero rows means the source was not found; more than one means the
    /// primary key is not unique in the database.
    fn created_edges(&self, rows: &[Row]) -> Result<u64, GraphError> {
        match rows {
            [row] => Ok(row.count("created").unwrap_or(0).max(0) as u64),
            [] => Err(GraphError::persistence(
                "relate",
                self.label(),
                "source node not found",
            )),
            _ => Err(GraphError::persistence(
                "relate",
                self.label(),
                format!("{} source nodes share the primary key", rows.len()),
            )),
        }
    }

    fn source_pattern(&self, key: &Value, params: &mut Params) -> String {
        let mut conditions = Properties::new();
        conditions.insert(self.schema.primary_key().to_string(), key.clone());
        node_pattern(Some("a"), self.label(), &conditions, "source", params)
    }

    fn relate_statement(
        &self,
        definition: &RelationshipDefinition,
        key: &Value,
        conditions: &Properties,
    ) -> Statement {
        let mut params = Params::new();
        let source = self.source_pattern(key, &mut params);
        let target = node_pattern(Some("b"), &definition.target, conditions, "target", &mut params);
        Statement {
            cypher: format!(
                "MATCH {source}
                 OPTIONAL MATCH {target}
                 WITH a, collect(b) AS targets
                 FOREACH (t IN targets | CREATE {edge})
                 RETURN size(targets) AS created",
                edge = create_edge("a", "t", &definition.edge_type, definition.direction),
            ),
            params,
            columns: vec!["created".to_string()],
        }
    }

    fn create_related_statement(
        &self,
        definition: &RelationshipDefinition,
        key: &Value,
        properties: &Properties,
    ) -> Statement {
        let mut params = Params::new();
        let source = self.source_pattern(key, &mut params);
        let target = node_pattern(Some("b"), &definition.target, properties, "target", &mut params);
        Statement {
            cypher: format!(
                "MATCH {source}
                 CREATE {target}
                 CREATE {edge}
                 RETURN count(b) AS created",
                edge = create_edge("a", "b", &definition.edge_type, definition.direction),
            ),
            params,
            columns: vec!["created".to_string()],
        }
    }
}

#[cfg(test)]
mod tests {
    use nodeweave_core::{SchemaError, Value};

    use super::RelatedNodes;
    use crate::mock::TxnOutcome;
    use crate::testing::{fixture, movie, user};
    use crate::GraphError;

    #[tokio::test]
    async fn relate_to_matches_source_by_key_and_targets_by_filter() {
        let (mock, users, movies) = fixture();
        mock.push_count("created", 1).push_count("created", 1);

        let cynthia = users.create_one(user("Cynthia", 21)).await.unwrap();
        let inception = movies.filter().eq("name", "Inception").unwrap();
        let created = users.relate_to(&cynthia, "LikesMovie", inception).await.unwrap();

        assert_eq!(created, 1);
        let relate = &mock.statements()[1];
        assert!(relate.cypher.contains("MATCH (a:User {name: $source_name})"));
        assert!(relate.cypher.contains("OPTIONAL MATCH (b:Movie {name: $target_name})"));
        assert!(relate.cypher.contains("CREATE (a)-[:LIKES]->(t)"));
        assert_eq!(relate.params["source_name"], Value::from("Cynthia"));
        assert_eq!(relate.params["target_name"], Value::from("Inception"));
        assert_eq!(mock.transactions()[1], TxnOutcome::Committed);
    }

    #[tokio::test]
    async fn empty_filter_relates_every_target() {
        let (mock, users, movies) = fixture();
        mock.push_count("created", 1).push_count("created", 3);

        let barry = users.create_one(user("Barry", 36)).await.unwrap();
        let created = users
            .relate_to(&barry, "LikesMovie", movies.filter())
            .await
            .unwrap();

        assert_eq!(created, 3);
        assert!(mock.statements()[1].cypher.contains("OPTIONAL MATCH (b:Movie)"));
    }

    #[tokio::test]
    async fn zero_matches_is_success() {
        let (mock, users, movies) = fixture();
        mock.push_count("created", 1).push_count("created", 0);

        let barry = users.create_one(user("Barry", 36)).await.unwrap();
        let nothing = movies.filter().eq("name", "Metropolis").unwrap();
        assert_eq!(users.relate_to(&barry, "LikesMovie", nothing).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn reverse_alias_creates_incoming_edges() {
        let (mock, users, movies) = fixture();
        mock.push_count("created", 1).push_count("created", 1);

        let inception = movies.create_one(movie("Inception", 2010)).await.unwrap();
        let barry = users.filter().eq("name", "Barry").unwrap();
        movies.relate_to(&inception, "LikedBy", barry).await.unwrap();

        assert!(mock.statements()[1].cypher.contains("CREATE (a)<-[:LIKES]-(t)"));
    }

    #[tokio::test]
    async fn missing_source_is_a_persistence_error() {
        let (mock, users, movies) = fixture();
        mock.push_count("created", 1).push_rows(Vec::new());

        let barry = users.create_one(user("Barry", 36)).await.unwrap();
        let err = users
            .relate_to(&barry, "LikesMovie", movies.filter())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Persistence { operation: "relate", .. }));
        assert_eq!(mock.transactions()[1], TxnOutcome::RolledBack);
    }

    #[tokio::test]
    async fn ambiguous_source_rolls_back() {
        let (mock, users, movies) = fixture();
        mock.push_count("created", 1);
        mock.push_rows(vec![
            crate::Row::new().with_value("created", 2),
            crate::Row::new().with_value("created", 2),
        ]);

        let barry = users.create_one(user("Barry", 36)).await.unwrap();
        assert!(users.relate_to(&barry, "LikesMovie", movies.filter()).await.is_err());
        assert_eq!(mock.transactions()[1], TxnOutcome::RolledBack);
    }

    #[tokio::test]
    async fn unsaved_source_and_unknown_alias_fail_before_the_network() {
        let (mock, users, movies) = fixture();
        let jason = users.build(user("Jason", 26)).unwrap();

        let err = users
            .relate_to(&jason, "LikesMovie", movies.filter())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::Persistence { .. }));

        mock.push_count("created", 1);
        let barry = users.create_one(user("Barry", 36)).await.unwrap();
        let err = users
            .relate_to(&barry, "Dislikes", movies.filter())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            GraphError::Schema(SchemaError::UnresolvedRelationship { .. })
        ));
        let err = users
            .relate_to(&barry, "LikesMovie", users.filter())
            .await
            .unwrap_err();
        assert!(matches!(err, GraphError::InvalidQuery(_)));
        assert_eq!(mock.statements().len(), 1);
    }

    #[tokio::test]
    async fn nested_create_relates_existing_and_new_targets() {
        let (mock, users, movies) = fixture();
        mock.push_count("created", 1)
            .push_count("created", 1)
            .push_count("created", 1);

        let jason = users
            .create_one_related(
                user("Jason", 26),
                vec![RelatedNodes::new("LikesMovie")
                    .matching(movies.filter().eq("name", "The Dark Knight").unwrap())
                    .creating(movie("Interstellar", 2014))],
            )
            .await
            .unwrap();

        assert_eq!(jason.get_i64("age"), Some(26));
        let executed = mock.executed();
        assert_eq!(executed.len(), 3);
        assert!(executed.iter().all(|e| e.transaction == Some(0)));
        assert!(executed[0].statement.cypher.starts_with("CREATE (n:User"));
        assert!(executed[1].statement.cypher.contains("OPTIONAL MATCH (b:Movie {name: $target_name})"));
        assert!(executed[2].statement.cypher.contains("CREATE (b:Movie {name: $target_name, year: $target_year})"));
        assert!(executed[2].statement.cypher.contains("CREATE (a)-[:LIKES]->(b)"));
        assert_eq!(
            executed[1].statement.params["target_name"],
            Value::from("The Dark Knight")
        );
        assert_eq!(
            executed[2].statement.params["target_name"],
            Value::from("Interstellar")
        );
        assert_eq!(mock.transactions(), vec![TxnOutcome::Committed]);
    }

    #[tokio::test]
    async fn nested_filter_matching_nothing_rolls_back_everything() {
        let (mock, users, movies) = fixture();
        mock.push_count("created", 1).push_count("created", 0);

        let err = users
            .create_one_related(
                user("Jason", 26),
                vec![RelatedNodes::new("LikesMovie")
                    .matching(movies.filter().eq("name", "Metropolis").unwrap())
                    .creating(movie("Interstellar", 2014))],
            )
            .await
            .unwrap_err();

        assert!(matches!(err, GraphError::Persistence { operation: "relate", .. }));
        assert_eq!(mock.statements().len(), 2);
        assert_eq!(mock.transactions(), vec![TxnOutcome::RolledBack]);
    }

    #[tokio::test]
    async fn invalid_nested_payload_fails_before_the_network() {
        let (mock, users, _) = fixture();
        let err = users
            .create_one_related(
                user("Jason", 26),
                vec![RelatedNodes::new("LikesMovie").creating(movie("Metropolis", 1850))],
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("year"));
        assert!(mock.executed().is_empty());
        assert!(mock.transactions().is_empty());
    }
}
