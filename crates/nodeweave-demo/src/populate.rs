//! Fill the graph with the demo users, movies, and likes.

use nodeweave_graph::{QueryRunner, RelatedNodes, Statement};

use crate::config::DemoConfig;
use crate::error::{DemoError, Result};
use crate::models::{Models, MovieProperties, UserProperties, LIKES_MOVIE, USER};

/// What a populate run did, for reporting.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopulateSummary {
    /// Barry's age as read back before it was updated.
    pub barry_age_before: Option<i64>,
    /// Edges created by relating Barry to every movie.
    pub barry_likes: u64,
}

/// Populate the graph.
///
/// Users Barry, Cynthia, and Jason; movies The Dark Knight, Inception, and
/// Interstellar; every kind of write the models support is exercised once.
pub async fn populate(models: &Models, config: &DemoConfig) -> Result<PopulateSummary> {
    let users = &models.users;
    let movies = &models.movies;
    let mut summary = PopulateSummary::default();

    if config.clear_database {
        models
            .runner()
            .execute(&Statement::new("MATCH (n) DETACH DELETE n"))
            .await?;
        tracing::info!("Cleared database");
    }

    users
        .create_one(UserProperties::new("Barry", 36).into())
        .await?;

    movies
        .create_many(vec![
            MovieProperties::new("The Dark Knight", 2008).into(),
            MovieProperties::new("Inception", 2010).into(),
        ])
        .await?;

    let mut cynthia = users.build(UserProperties::new("Cynthia", 21).into())?;
    users.save(&mut cynthia).await?;
    users
        .relate_to(
            &cynthia,
            LIKES_MOVIE,
            movies.filter().eq("name", "Inception")?,
        )
        .await?;

    // Jason likes an existing movie and a new one, created in the same transaction.
    users
        .create_one_related(
            UserProperties::new("Jason", 26).into(),
            vec![RelatedNodes::new(LIKES_MOVIE)
                .matching(movies.filter().eq("name", "The Dark Knight")?)
                .creating(MovieProperties::new("Interstellar", 2014).into())],
        )
        .await?;

    let mut barry = users
        .find_one(users.filter().eq("name", "Barry")?)
        .await?
        .ok_or_else(|| DemoError::MissingNode {
            label: USER.to_string(),
            name: "Barry".to_string(),
        })?;
    summary.barry_age_before = barry.get_i64("age");
    tracing::info!(age = ?summary.barry_age_before, "Found Barry");

    barry.set("age", 37)?;
    users.save(&mut barry).await?;
    summary.barry_likes = users
        .relate_to(&barry, LIKES_MOVIE, movies.filter())
        .await?;

    users
        .relate_to(
            &cynthia,
            LIKES_MOVIE,
            movies.filter().eq("name", "Interstellar")?,
        )
        .await?;

    tracing::info!(barry_likes = summary.barry_likes, "Populated graph");
    Ok(summary)
}
