//! The `User` and `Movie` models and their `LIKES` relationship.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use nodeweave_core::{
    props, Direction, Properties, PropertySpec, RelationshipDefinition, SchemaDefinition,
    SchemaRegistry, Value,
};
use nodeweave_graph::{Model, QueryRunner};

use crate::error::Result;

pub const USER: &str = "User";
pub const MOVIE: &str = "Movie";

/// `User -[:LIKES]-> Movie`.
pub const LIKES_MOVIE: &str = "LikesMovie";
/// The same edges seen from the movie.
pub const LIKED_BY: &str = "LikedBy";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProperties {
    pub name: String,
    pub age: i64,
}

impl UserProperties {
    pub fn new(name: &str, age: i64) -> Self {
        Self {
            name: name.to_string(),
            age,
        }
    }
}

impl From<UserProperties> for Properties {
    fn from(user: UserProperties) -> Self {
        props([("name", Value::from(user.name)), ("age", Value::from(user.age))])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieProperties {
    pub name: String,
    pub year: i64,
}

impl MovieProperties {
    pub fn new(name: &str, year: i64) -> Self {
        Self {
            name: name.to_string(),
            year,
        }
    }
}

impl From<MovieProperties> for Properties {
    fn from(movie: MovieProperties) -> Self {
        props([("name", Value::from(movie.name)), ("year", Value::from(movie.year))])
    }
}

/// Register both schemas, then the relationship and its reverse alias.
pub fn registry() -> Result<SchemaRegistry> {
    let users = SchemaDefinition::define(
        USER,
        "name",
        [
            ("name", PropertySpec::string().required().min_length(1)),
            ("age", PropertySpec::number().required().minimum(1.0)),
        ],
    )?;
    let movies = SchemaDefinition::define(
        MOVIE,
        "name",
        [
            ("name", PropertySpec::string().required().min_length(1)),
            ("year", PropertySpec::number().required().minimum(1900.0)),
        ],
    )?;

    let registry = SchemaRegistry::builder()
        .schema(users)?
        .schema(movies)?
        .relationships()
        .relate(
            USER,
            RelationshipDefinition::new(LIKES_MOVIE, MOVIE, "LIKES", Direction::Out)
                .with_reverse(LIKED_BY),
        )?
        .finish()?;
    Ok(registry)
}

/// Both models bound to one runner.
#[derive(Clone)]
pub struct Models {
    pub registry: Arc<SchemaRegistry>,
    pub users: Model,
    pub movies: Model,
}

impl Models {
    pub fn new(runner: Arc<dyn QueryRunner>) -> Result<Self> {
        let registry = Arc::new(registry()?);
        let users = Model::new(&registry, USER, Arc::clone(&runner))?;
        let movies = Model::new(&registry, MOVIE, runner)?;
        Ok(Self {
            registry,
            users,
            movies,
        })
    }

    pub fn runner(&self) -> &dyn QueryRunner {
        &**self.users.runner()
    }
}
