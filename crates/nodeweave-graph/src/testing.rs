//! Shared fixtures for unit tests: the Users/Movies registry on a mock runner.

use std::sync::Arc;

use nodeweave_core::{
    props, Direction, Properties, PropertySpec, RelationshipDefinition, SchemaDefinition,
    SchemaRegistry, Value,
};

use crate::mock::MockRunner;
use crate::model::Model;

pub(crate) fn registry() -> Arc<SchemaRegistry> {
    let user = SchemaDefinition::define(
        "User",
        "name",
        [
            ("name", PropertySpec::string().required().min_length(1)),
            ("age", PropertySpec::number().required().minimum(1.0)),
        ],
    )
    .unwrap();
    let movie = SchemaDefinition::define(
        "Movie",
        "name",
        [
            ("name", PropertySpec::string().required().min_length(1)),
            ("year", PropertySpec::number().required().minimum(1900.0)),
        ],
    )
    .unwrap();

    let registry = SchemaRegistry::builder()
        .schema(user)
        .unwrap()
        .schema(movie)
        .unwrap()
        .relationships()
        .relate(
            "User",
            RelationshipDefinition::new("LikesMovie", "Movie", "LIKES", Direction::Out)
                .with_reverse("LikedBy"),
        )
        .unwrap()
        .finish()
        .unwrap();
    Arc::new(registry)
}

/// A mock runner with `User` and `Movie` models bound to it.
pub(crate) fn fixture() -> (MockRunner, Model, Model) {
    let registry = registry();
    let mock = MockRunner::new();
    let users = Model::new(&registry, "User", Arc::new(mock.clone())).unwrap();
    let movies = Model::new(&registry, "Movie", Arc::new(mock.clone())).unwrap();
    (mock, users, movies)
}

pub(crate) fn user(name: &str, age: i64) -> Properties {
    props([("name", Value::from(name)), ("age", Value::from(age))])
}

pub(crate) fn movie(name: &str, year: i64) -> Properties {
    props([("name", Value::from(name)), ("year", Value::from(year))])
}
