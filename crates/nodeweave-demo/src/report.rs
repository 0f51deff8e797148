//! Read the demo graph back through the query composer.

use nodeweave_core::{Direction, Value};
use nodeweave_graph::{Order, Pattern, Projection, QueryBuilder, RelationshipStep};

use crate::error::{DemoError, Result};
use crate::models::{Models, MovieProperties, UserProperties, LIKES_MOVIE, MOVIE, USER};

/// The movie with the most likes.
#[derive(Debug, Clone, PartialEq)]
pub struct MostLiked {
    pub movie: MovieProperties,
    pub total_likes: i64,
    pub average_age: f64,
}

/// Find a user and a movie by name with two independent match clauses.
pub async fn find_user_and_movie(
    models: &Models,
    user: &str,
    movie: &str,
) -> Result<(UserProperties, MovieProperties)> {
    let result = QueryBuilder::new(&models.registry)
        .match_node(
            models
                .users
                .node()
                .filter(models.users.filter().eq("name", user)?)
                .identifier("user"),
        )
        .match_node(
            models
                .movies
                .node()
                .filter(models.movies.filter().eq("name", movie)?)
                .identifier("movie"),
        )
        .return_items([Projection::node("user"), Projection::node("movie")])
        .run(models.runner())
        .await?;

    let found_user = result
        .properties::<UserProperties>("user")?
        .into_iter()
        .next()
        .ok_or_else(|| missing(USER, user))?;
    let found_movie = result
        .properties::<MovieProperties>("movie")?
        .into_iter()
        .next()
        .ok_or_else(|| missing(MOVIE, movie))?;
    Ok((found_user, found_movie))
}

/// Movies liked by both `first` and `second`, by name.
pub async fn common_liked_movies(
    models: &Models,
    first: &str,
    second: &str,
) -> Result<Vec<MovieProperties>> {
    let likes = RelationshipStep::from_definition(models.users.relationship(LIKES_MOVIE)?);
    let pattern = Pattern::start(
        models
            .users
            .node()
            .filter(models.users.filter().eq("name", first)?),
    )
    .then(likes, models.movies.node().identifier("movie"))
    .then(
        RelationshipStep::any(Direction::In),
        models
            .users
            .node()
            .filter(models.users.filter().eq("name", second)?),
    );

    let result = QueryBuilder::new(&models.registry)
        .match_related(pattern)
        .return_items([Projection::node("movie")])
        .order_by("movie.name", Order::Asc)
        .run(models.runner())
        .await?;
    Ok(result.properties::<MovieProperties>("movie")?)
}

/// The most liked movie, how many users like it, and their average age.
///
/// `None` when nobody likes anything. Ties go to whichever movie the
/// database returns first.
pub async fn find_most_liked(models: &Models) -> Result<Option<MostLiked>> {
    let likes = RelationshipStep::from_definition(models.users.relationship(LIKES_MOVIE)?)
        .identifier("likesMovie");
    let result = QueryBuilder::new(&models.registry)
        .match_related(
            Pattern::start(models.users.node().identifier("user"))
                .then(likes, models.movies.node().identifier("movie")),
        )
        .return_items([
            Projection::node("movie"),
            Projection::count("likesMovie", "totalLikes"),
            Projection::avg("user", "age", "averageAge"),
        ])
        .order_by("totalLikes", Order::Desc)
        .limit(1)
        .run(models.runner())
        .await?;

    let Some(movie) = result.properties::<MovieProperties>("movie")?.into_iter().next() else {
        return Ok(None);
    };
    Ok(Some(MostLiked {
        movie,
        total_likes: result
            .scalar(0, "totalLikes")
            .and_then(Value::as_i64)
            .unwrap_or(0),
        average_age: result
            .scalar(0, "averageAge")
            .and_then(Value::as_f64)
            .unwrap_or(0.0),
    }))
}

/// Run every report and render one line per finding.
pub async fn run_queries(models: &Models) -> Result<Vec<String>> {
    let mut lines = Vec::new();

    let (jason, inception) = find_user_and_movie(models, "Jason", "Inception").await?;
    lines.push(format!("{} is {} years old", jason.name, jason.age));
    lines.push(format!("{} came out in {}", inception.name, inception.year));

    let common: Vec<String> = common_liked_movies(models, "Jason", "Barry")
        .await?
        .into_iter()
        .map(|movie| movie.name)
        .collect();
    lines.push(format!(
        "Common liked movies between Jason and Barry: {}",
        common.join(", ")
    ));

    if let Some(most) = find_most_liked(models).await? {
        lines.push(format!(
            "The most liked movie is {}, as {} users like it! Their average age is {}",
            most.movie.name, most.total_likes, most.average_age
        ));
    }
    Ok(lines)
}

fn missing(label: &str, name: &str) -> DemoError {
    DemoError::MissingNode {
        label: label.to_string(),
        name: name.to_string(),
    }
}
