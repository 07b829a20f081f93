// Pipeline properties against in-memory stores. No database, no Docker.
//
// Run with: cargo test -p filmgraph-export --test pipeline_test

use filmgraph_common::{DirectorKeyPolicy, RelationKind};
use filmgraph_export::testing::{film_record, MemoryCounts, MemoryFilms, MemoryGraph, UnreachableFilms};
use filmgraph_export::{FieldCleaner, Pipeline, PipelineState, Stage};

fn f1() -> filmgraph_common::FilmRecord {
    film_record("f1", "Exemple Film", "Un Réalisateur", "A, B")
}

#[tokio::test]
async fn single_film_projects_nodes_and_edges() {
    let source = MemoryFilms::new(vec![f1()]);
    let graph = MemoryGraph::new();

    let summary = Pipeline::new(&source, &graph, FieldCleaner::default())
        .run()
        .await
        .unwrap();

    assert_eq!(
        graph.counts(),
        MemoryCounts {
            films: 1,
            actors: 2,
            directors: 1,
            acted_in: 2,
            directed: 1,
        }
    );
    assert_eq!(summary.final_state, PipelineState::Done);
    assert_eq!(summary.stats.films_upserted, 1);
    assert_eq!(summary.stats.acted_in_merged, 2);
    assert_eq!(summary.stats.directed_merged, 1);
    assert_eq!(summary.stats.records_rejected, 0);

    let film = graph.film("f1").unwrap();
    assert_eq!(film.title, "Exemple Film");
    assert_eq!(film.year, 2021);
    assert_eq!(film.votes, 1000);
    assert!(graph.has_edge(RelationKind::ActedIn, "A", "f1"));
    assert!(graph.has_edge(RelationKind::Directed, "Un Réalisateur", "f1"));
}

#[tokio::test]
async fn record_with_empty_revenue_contributes_nothing() {
    let mut record = f1();
    record.revenue = Some(String::new());
    let source = MemoryFilms::new(vec![record]);
    let graph = MemoryGraph::new();

    let summary = Pipeline::new(&source, &graph, FieldCleaner::default())
        .run()
        .await
        .unwrap();

    assert_eq!(graph.counts(), MemoryCounts::default());
    assert_eq!(summary.stats.records_read, 1);
    assert_eq!(summary.stats.records_rejected, 1);
    assert_eq!(summary.stats.actors_upserted, 0);
}

#[tokio::test]
async fn record_with_empty_genre_contributes_nothing() {
    let mut record = f1();
    record.genre = Some(String::new());
    let source = MemoryFilms::new(vec![record, film_record("f2", "Kept", "D", "C")]);
    let graph = MemoryGraph::new();

    let summary = Pipeline::new(&source, &graph, FieldCleaner::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.stats.records_rejected, 1);
    assert!(graph.film("f1").is_none());
    assert_eq!(graph.actors(), vec!["C"]);
    assert_eq!(graph.directors(), vec!["D"]);
    assert_eq!(
        graph.counts(),
        MemoryCounts {
            films: 1,
            actors: 1,
            directors: 1,
            acted_in: 1,
            directed: 1,
        }
    );
}

#[tokio::test]
async fn rerun_over_unchanged_source_changes_nothing() {
    let source = MemoryFilms::new(vec![
        f1(),
        film_record("f2", "Second Film", "Un Réalisateur", "B, C"),
    ]);
    let graph = MemoryGraph::new();

    Pipeline::new(&source, &graph, FieldCleaner::default())
        .run()
        .await
        .unwrap();
    let first = graph.counts();

    Pipeline::new(&source, &graph, FieldCleaner::default())
        .run()
        .await
        .unwrap();

    assert_eq!(graph.counts(), first);
    assert_eq!(first.actors, 3);
    assert_eq!(first.acted_in, 4);
    assert_eq!(first.directors, 1);
}

#[tokio::test]
async fn actor_names_are_deduplicated_across_records() {
    let source = MemoryFilms::new(vec![
        film_record("f1", "One", "D", "Tom Hanks, Tom Hanks , Meg Ryan"),
        film_record("f2", "Two", "D", "Meg Ryan,  Tom Hanks"),
    ]);
    let graph = MemoryGraph::new();

    let summary = Pipeline::new(&source, &graph, FieldCleaner::default())
        .run()
        .await
        .unwrap();

    assert_eq!(graph.actors(), vec!["Meg Ryan", "Tom Hanks"]);
    assert_eq!(summary.stats.actors_upserted, 2);
    assert_eq!(graph.counts().acted_in, 4);
}

#[tokio::test]
async fn relationships_before_actors_are_dangling_then_resume() {
    let source = MemoryFilms::new(vec![film_record("f1", "Solo", "D", "X")]);
    let graph = MemoryGraph::new();
    let mut pipeline = Pipeline::new(&source, &graph, FieldCleaner::default());

    pipeline.run_stage(Stage::Films).await.unwrap();
    pipeline.run_stage(Stage::Relationships).await.unwrap();

    // Neither X nor D exists yet: two skips, no edges, no implicit nodes.
    assert_eq!(pipeline.stats().dangling_skipped, 2);
    assert_eq!(pipeline.stats().acted_in_merged, 0);
    assert_eq!(graph.counts().acted_in, 0);
    assert_eq!(graph.counts().actors, 0);
    assert_eq!(pipeline.state(), PipelineState::RelationshipsLoaded);

    pipeline.run_stage(Stage::Actors).await.unwrap();
    pipeline.run_stage(Stage::Relationships).await.unwrap();

    assert_eq!(graph.counts().acted_in, 1);
    assert!(graph.has_edge(RelationKind::ActedIn, "X", "f1"));
    assert_eq!(pipeline.stats().dangling_skipped, 3);
}

#[tokio::test]
async fn write_failure_is_counted_and_run_continues() {
    let source = MemoryFilms::new(vec![
        film_record("f1", "One", "D", "A"),
        film_record("f2", "Two", "D", "B"),
    ]);
    let graph = MemoryGraph::new().fail_on("f1");

    let summary = Pipeline::new(&source, &graph, FieldCleaner::default())
        .run()
        .await
        .unwrap();

    assert_eq!(summary.final_state, PipelineState::Done);
    assert_eq!(summary.stats.write_errors, 1);
    assert_eq!(summary.stats.films_upserted, 1);
    assert!(graph.film("f1").is_none());
    assert!(graph.film("f2").is_some());

    // f1's edges have no film to attach to.
    assert_eq!(summary.stats.dangling_skipped, 2);
    assert_eq!(graph.counts().acted_in, 1);

    // Once the store recovers, a rerun fills the gap.
    graph.heal("f1");
    Pipeline::new(&source, &graph, FieldCleaner::default())
        .run()
        .await
        .unwrap();
    assert_eq!(graph.counts().films, 2);
    assert_eq!(graph.counts().acted_in, 2);
}

#[tokio::test]
async fn failing_actor_write_skips_only_that_actor() {
    let source = MemoryFilms::new(vec![film_record("f1", "One", "D", "A, B")]);
    let graph = MemoryGraph::new().fail_on("A");

    let summary = Pipeline::new(&source, &graph, FieldCleaner::default())
        .run()
        .await
        .unwrap();

    assert_eq!(graph.actors(), vec!["B"]);
    // Upsert of A fails, then its edge merge fails the same way.
    assert_eq!(summary.stats.write_errors, 2);
    assert_eq!(summary.stats.acted_in_merged, 1);
}

#[tokio::test]
async fn unreadable_source_aborts_before_any_write() {
    let graph = MemoryGraph::new();
    let mut pipeline = Pipeline::new(&UnreachableFilms, &graph, FieldCleaner::default());

    assert!(pipeline.run().await.is_err());
    assert_eq!(pipeline.state(), PipelineState::NotStarted);
    assert_eq!(graph.counts(), MemoryCounts::default());
}

#[tokio::test]
async fn raw_director_policy_keeps_whole_string() {
    let source = MemoryFilms::new(vec![film_record("f1", "Fargo", "Joel Coen, Ethan Coen", "A")]);

    let split = MemoryGraph::new();
    Pipeline::new(&source, &split, FieldCleaner::new(DirectorKeyPolicy::Split))
        .run()
        .await
        .unwrap();
    assert_eq!(split.directors(), vec!["Ethan Coen", "Joel Coen"]);
    assert_eq!(split.counts().directed, 2);

    let raw = MemoryGraph::new();
    Pipeline::new(&source, &raw, FieldCleaner::new(DirectorKeyPolicy::Raw))
        .run()
        .await
        .unwrap();
    assert_eq!(raw.directors(), vec!["Joel Coen, Ethan Coen"]);
    assert_eq!(raw.counts().directed, 1);
}

#[tokio::test]
async fn raw_director_policy_trims_the_key() {
    let source = MemoryFilms::new(vec![film_record("f1", "Solo", " Jane Doe ", "A")]);
    let graph = MemoryGraph::new();

    Pipeline::new(&source, &graph, FieldCleaner::new(DirectorKeyPolicy::Raw))
        .run()
        .await
        .unwrap();

    assert_eq!(graph.directors(), vec!["Jane Doe"]);
    assert!(graph.has_edge(RelationKind::Directed, "Jane Doe", "f1"));
    assert_eq!(graph.film("f1").unwrap().director, " Jane Doe ");
}

#[tokio::test]
async fn run_resumes_from_current_state() {
    let source = MemoryFilms::new(vec![f1()]);
    let graph = MemoryGraph::new();
    let mut pipeline = Pipeline::new(&source, &graph, FieldCleaner::default());

    pipeline.run_stage(Stage::Films).await.unwrap();
    pipeline.run_stage(Stage::Actors).await.unwrap();
    assert_eq!(pipeline.state(), PipelineState::ActorsLoaded);

    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.final_state, PipelineState::Done);
    // The source was read once and every stage ran once.
    assert_eq!(summary.stats.films_upserted, 1);
    assert_eq!(summary.stats.actors_upserted, 2);
    assert_eq!(summary.stats.directors_upserted, 1);
    assert_eq!(graph.counts().directed, 1);
}
