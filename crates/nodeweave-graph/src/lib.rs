//! Nodeweave Graph: Neo4j-backed operations on nodeweave models.
//!
//! A [`Model`] binds one registered schema to a [`QueryRunner`]. Through it
//! entities are built, saved, found, deleted, and related; [`QueryBuilder`]
//! composes read queries across models. [`GraphClient`] runs statements on
//! Neo4j; [`MockRunner`] replays scripted rows in tests.

pub mod builder;
pub mod client;
mod cypher;
pub mod entity;
pub mod mock;
pub mod model;
pub mod mutations;
pub mod queries;
pub mod relations;
pub mod runner;

#[cfg(test)]
mod testing;

pub use builder::{
    NodeMatch, Order, Pattern, Projection, QueryBuilder, QueryResult, RelationshipStep,
};
pub use client::{GraphClient, GraphConfig, GraphError};
pub use entity::{Entity, EntityState};
pub use mock::{MockRunner, TxnOutcome};
pub use model::Model;
pub use relations::RelatedNodes;
pub use runner::{Field, QueryRunner, Row, Statement, Transaction};
