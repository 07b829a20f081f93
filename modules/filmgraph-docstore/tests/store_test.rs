//! Integration tests for DocumentStore and FilmAnalytics.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use std::str::FromStr;

use filmgraph_common::DirectorKeyPolicy;
use filmgraph_docstore::{DocumentStore, FilmAnalytics, ScoreField};
use serde_json::json;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;

/// Pool pinned to a fresh schema so tests in this file don't share a table.
async fn test_pool(schema: &str) -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;

    let admin = PgPool::connect(&url).await.ok()?;
    sqlx::query(&format!("DROP SCHEMA IF EXISTS {schema} CASCADE"))
        .execute(&admin)
        .await
        .ok()?;
    sqlx::query(&format!("CREATE SCHEMA {schema}"))
        .execute(&admin)
        .await
        .ok()?;
    admin.close().await;

    let options = PgConnectOptions::from_str(&url)
        .ok()?
        .options([("search_path", schema)]);
    PgPoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .ok()
}

async fn seeded_store(schema: &str) -> Option<DocumentStore> {
    let store = DocumentStore::new(test_pool(schema).await?);
    store.ensure_schema().await.unwrap();

    let docs = [
        ("1", json!({"title": "Guardians of the Galaxy", "year": 2014, "Runtime (Minutes)": 121,
                     "Revenue (Millions)": 333.13, "rating": 8.1, "Metascore": 76, "Votes": 757074,
                     "genre": "Action,Adventure,Sci-Fi", "Director": "James Gunn",
                     "Actors": "Chris Pratt, Vin Diesel, Bradley Cooper, Zoe Saldana"})),
        ("2", json!({"title": "Prometheus", "year": 2012, "Runtime (Minutes)": 124,
                     "Revenue (Millions)": "126.46", "rating": 7.0, "Metascore": 65, "Votes": 485820,
                     "genre": "Adventure,Mystery,Sci-Fi", "Director": "Ridley Scott",
                     "Actors": "Noomi Rapace, Logan Marshall-Green, Michael Fassbender, Charlize Theron"})),
        ("3", json!({"title": "Split", "year": 2016, "Runtime (Minutes)": 117,
                     "Revenue (Millions)": 138.12, "rating": 7.3, "Metascore": 62, "Votes": 157606,
                     "genre": "Horror,Thriller", "Director": "M. Night Shyamalan",
                     "Actors": "James McAvoy, Anya Taylor-Joy, Haley Lu Richardson, Jessica Sula"})),
        ("4", json!({"title": "The Lost City of Z", "year": 2016, "Runtime (Minutes)": 141,
                     "Revenue (Millions)": "", "rating": 7.1, "Metascore": 78, "Votes": 7188,
                     "genre": "Action,Adventure,Biography", "Director": "James Gray, Ridley Scott",
                     "Actors": "Charlie Hunnam, Robert Pattinson, Sienna Miller, Tom Holland"})),
    ];
    for (id, doc) in &docs {
        store.put_film(id, doc).await.unwrap();
    }
    Some(store)
}

#[tokio::test]
async fn films_round_trip_with_ids() {
    let Some(store) = seeded_store("fg_films_round_trip").await else {
        return;
    };

    let films = store.films().await.unwrap();
    assert_eq!(films.len(), 4);
    assert_eq!(films[0].id, "1");
    assert_eq!(films[1].revenue.as_deref(), Some("126.46"));
    assert_eq!(films[3].revenue.as_deref(), Some(""));
    assert_eq!(store.count().await.unwrap(), 4);
}

#[tokio::test]
async fn put_film_replaces_existing_document() {
    let Some(store) = seeded_store("fg_put_replaces").await else {
        return;
    };

    store
        .put_film("1", &json!({"title": "Renamed", "year": 2014}))
        .await
        .unwrap();

    let films = store.films().await.unwrap();
    assert_eq!(films.len(), 4);
    assert_eq!(films[0].title.as_deref(), Some("Renamed"));
    assert_eq!(films[0].director, None);
}

#[tokio::test]
async fn non_object_document_comes_back_as_bare_record() {
    let Some(store) = seeded_store("fg_non_object").await else {
        return;
    };

    store.put_film("9", &json!("not a film")).await.unwrap();
    let films = store.films().await.unwrap();
    let bare = films.iter().find(|f| f.id == "9").unwrap();
    assert_eq!(bare.title, None);
}

#[tokio::test]
async fn analytics_over_mixed_numeric_encodings() {
    let Some(store) = seeded_store("fg_analytics").await else {
        return;
    };
    let analytics = FilmAnalytics::new(store.pool().clone());

    assert_eq!(analytics.year_with_most_films().await.unwrap(), Some((2016, 2)));
    assert_eq!(analytics.count_films_after(2013).await.unwrap(), 3);

    let leader = analytics.film_with_highest_revenue().await.unwrap().unwrap();
    assert_eq!(leader.title, "Guardians of the Galaxy");

    let genres = analytics.distinct_genres().await.unwrap();
    assert!(genres.contains(&"Sci-Fi".to_string()));
    assert!(genres.iter().all(|g| g.trim() == g));

    let actors = analytics.distinct_actors().await.unwrap();
    assert_eq!(actors.len(), 16);

    let by_decade = analytics.top_per_decade(ScoreField::Rating, 3).await.unwrap();
    assert_eq!(by_decade.len(), 1);
    assert_eq!(by_decade[0].decade, 2010);
    assert_eq!(by_decade[0].films[0].0, "Guardians of the Galaxy");

    let per_year = analytics.films_per_year().await.unwrap();
    assert_eq!(per_year, vec![(2012, 1), (2014, 1), (2016, 2)]);
}

#[tokio::test]
async fn director_policy_changes_prolific_counts() {
    let Some(store) = seeded_store("fg_director_policy").await else {
        return;
    };
    let analytics = FilmAnalytics::new(store.pool().clone());

    let split = analytics
        .prolific_directors(1, DirectorKeyPolicy::Split)
        .await
        .unwrap();
    assert_eq!(split, vec![("Ridley Scott".to_string(), 2)]);

    let raw = analytics
        .prolific_directors(1, DirectorKeyPolicy::Raw)
        .await
        .unwrap();
    assert!(raw.is_empty());
}

#[tokio::test]
async fn acclaimed_view_filters_on_metascore_and_revenue() {
    let Some(store) = seeded_store("fg_acclaimed").await else {
        return;
    };
    store
        .put_film("5", &json!({"title": "Acclaimed", "Metascore": 90, "Revenue (Millions)": "75"}))
        .await
        .unwrap();

    let analytics = FilmAnalytics::new(store.pool().clone());
    analytics.create_acclaimed_view().await.unwrap();
    analytics.create_acclaimed_view().await.unwrap();

    let films = analytics.acclaimed_films().await.unwrap();
    assert_eq!(films.len(), 1);
    assert_eq!(films[0].id, "5");
}
