//! Analytical queries reachable from the command line. Each one prints its
//! result as pretty JSON.

use anyhow::Result;
use clap::Subcommand;
use serde::Serialize;

use filmgraph_common::DirectorKeyPolicy;
use filmgraph_docstore::{FilmAnalytics, ScoreField};
use filmgraph_graph::GraphReader;

use crate::stores::Stores;

#[derive(Subcommand, Debug, Clone)]
pub enum QueryCommand {
    // --- document store ---
    /// Year with the most films
    BusiestYear,
    /// Number of films released after a year
    FilmsAfter { year: i64 },
    /// Average votes for films of one year
    AvgVotes { year: i64 },
    /// Film count per year
    FilmsPerYear,
    /// Every distinct genre
    Genres,
    /// Film with the highest revenue
    TopRevenue,
    /// Directors credited on more than N films
    ProlificDirectors {
        #[arg(default_value_t = 5)]
        min_films: i64,
    },
    /// Genre with the highest average revenue
    RichestGenre,
    /// Top 3 films per decade by rating, or by metascore
    TopPerDecade {
        #[arg(long)]
        metascore: bool,
    },
    /// Longest film in each genre
    LongestPerGenre,
    /// Pearson correlation between runtime and revenue
    RuntimeRevenue,
    /// Average runtime per decade
    RuntimeByDecade,
    /// Films with Metascore above 80 and revenue above 50M
    Acclaimed,

    // --- graph store ---
    /// Node and edge totals
    Counts,
    /// Actor with the most films
    TopActor,
    /// Actors who played alongside someone
    Coactors { actor: String },
    /// Actor whose films earned the most
    RichestActor,
    /// Average votes over all films
    GraphAvgVotes,
    /// Votes per film
    VotesPerFilm {
        #[arg(default_value_t = 10)]
        limit: i64,
    },
    /// Most common genre
    TopGenre,
    /// Films of an actor's co-actors
    CoactorFilms { actor: String },
    /// Director who worked with the most actors
    DirectorWithMostActors,
    /// Films sharing the most actors with other films
    ConnectedFilms {
        #[arg(default_value_t = 10)]
        limit: i64,
    },
    /// Actors who worked with the most directors
    VersatileActors {
        #[arg(default_value_t = 10)]
        limit: i64,
    },
    /// Genre-based recommendations for an actor
    Recommend {
        actor: String,
        #[arg(default_value_t = 5)]
        limit: i64,
    },
    /// Shortest path between two actors
    Path { from: String, to: String },
    /// Film pairs sharing a genre but no director
    SharedGenre {
        #[arg(default_value_t = 20)]
        limit: i64,
    },
    /// Director-actor pairs with at least N films together
    Collaborations {
        #[arg(default_value_t = 2)]
        min_films: i64,
        #[arg(default_value_t = 20)]
        limit: i64,
    },
}

/// Run one query and render its result.
pub async fn run_query(
    cmd: &QueryCommand,
    stores: &Stores,
    policy: DirectorKeyPolicy,
) -> Result<String> {
    let docs = FilmAnalytics::new(stores.documents.pool().clone());
    let graph = GraphReader::new(stores.graph.clone());

    match cmd {
        QueryCommand::BusiestYear => render(&docs.year_with_most_films().await?),
        QueryCommand::FilmsAfter { year } => render(&docs.count_films_after(*year).await?),
        QueryCommand::AvgVotes { year } => render(&docs.avg_votes_for_year(*year).await?),
        QueryCommand::FilmsPerYear => render(&docs.films_per_year().await?),
        QueryCommand::Genres => render(&docs.distinct_genres().await?),
        QueryCommand::TopRevenue => render(&docs.film_with_highest_revenue().await?),
        QueryCommand::ProlificDirectors { min_films } => {
            render(&docs.prolific_directors(*min_films, policy).await?)
        }
        QueryCommand::RichestGenre => render(&docs.genre_with_highest_avg_revenue().await?),
        QueryCommand::TopPerDecade { metascore } => {
            let score = if *metascore {
                ScoreField::Metascore
            } else {
                ScoreField::Rating
            };
            render(&docs.top_per_decade(score, 3).await?)
        }
        QueryCommand::LongestPerGenre => render(&docs.longest_film_per_genre().await?),
        QueryCommand::RuntimeRevenue => render(&docs.runtime_revenue_correlation().await?),
        QueryCommand::RuntimeByDecade => render(&docs.avg_runtime_by_decade().await?),
        QueryCommand::Acclaimed => {
            docs.create_acclaimed_view().await?;
            render(&docs.acclaimed_films().await?)
        }

        QueryCommand::Counts => render(&graph.counts().await?),
        QueryCommand::TopActor => render(&graph.top_actor().await?),
        QueryCommand::Coactors { actor } => render(&graph.coactors(actor).await?),
        QueryCommand::RichestActor => render(&graph.actor_with_highest_revenue().await?),
        QueryCommand::GraphAvgVotes => render(&graph.avg_votes().await?),
        QueryCommand::VotesPerFilm { limit } => render(&graph.votes_per_film(*limit).await?),
        QueryCommand::TopGenre => render(&graph.most_common_genre().await?),
        QueryCommand::CoactorFilms { actor } => render(&graph.films_of_coactors(actor).await?),
        QueryCommand::DirectorWithMostActors => {
            render(&graph.director_with_most_actors().await?)
        }
        QueryCommand::ConnectedFilms { limit } => {
            render(&graph.most_connected_films(*limit).await?)
        }
        QueryCommand::VersatileActors { limit } => {
            render(&graph.actors_with_most_directors(*limit).await?)
        }
        QueryCommand::Recommend { actor, limit } => {
            render(&graph.recommend_films(actor, *limit).await?)
        }
        QueryCommand::Path { from, to } => render(&graph.shortest_path(from, to).await?),
        QueryCommand::SharedGenre { limit } => {
            render(&graph.shared_genre_different_directors(*limit).await?)
        }
        QueryCommand::Collaborations { min_films, limit } => {
            render(&graph.collaborations(*min_films, *limit).await?)
        }
    }
}

fn render<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
