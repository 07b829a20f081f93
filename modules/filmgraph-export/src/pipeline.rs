//! The export pipeline: documents in, graph out.
//!
//! Stages run in a fixed order, each one an idempotent pass over the
//! validated batch:
//!
//! ```text
//! NotStarted → FilmsLoaded → ActorsLoaded → DirectorsLoaded → RelationshipsLoaded → Done
//! ```
//!
//! Nothing is transactional across stages. A crash mid-run is recovered by
//! running again from the start, or by running the missing stages alone.

use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use filmgraph_common::{FilmGraphError, RelationKind};

use crate::cleaner::{CleanedBatch, FieldCleaner};
use crate::traits::{FilmSource, GraphSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Films,
    Actors,
    Directors,
    Relationships,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Films,
        Stage::Actors,
        Stage::Directors,
        Stage::Relationships,
    ];

    /// State reached once this stage has run.
    pub fn completes(self) -> PipelineState {
        match self {
            Stage::Films => PipelineState::FilmsLoaded,
            Stage::Actors => PipelineState::ActorsLoaded,
            Stage::Directors => PipelineState::DirectorsLoaded,
            Stage::Relationships => PipelineState::RelationshipsLoaded,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Films => "films",
            Stage::Actors => "actors",
            Stage::Directors => "directors",
            Stage::Relationships => "relationships",
        })
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "films" => Ok(Stage::Films),
            "actors" => Ok(Stage::Actors),
            "directors" => Ok(Stage::Directors),
            "relationships" | "relations" => Ok(Stage::Relationships),
            other => Err(format!(
                "unknown stage '{other}' (expected films, actors, directors or relationships)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    NotStarted,
    FilmsLoaded,
    ActorsLoaded,
    DirectorsLoaded,
    RelationshipsLoaded,
    Done,
}

impl PipelineState {
    /// The stage that moves the pipeline out of this state, if any.
    pub fn next_stage(self) -> Option<Stage> {
        match self {
            PipelineState::NotStarted => Some(Stage::Films),
            PipelineState::FilmsLoaded => Some(Stage::Actors),
            PipelineState::ActorsLoaded => Some(Stage::Directors),
            PipelineState::DirectorsLoaded => Some(Stage::Relationships),
            PipelineState::RelationshipsLoaded | PipelineState::Done => None,
        }
    }

    pub fn advance(self) -> PipelineState {
        match self {
            PipelineState::NotStarted => PipelineState::FilmsLoaded,
            PipelineState::FilmsLoaded => PipelineState::ActorsLoaded,
            PipelineState::ActorsLoaded => PipelineState::DirectorsLoaded,
            PipelineState::DirectorsLoaded => PipelineState::RelationshipsLoaded,
            PipelineState::RelationshipsLoaded | PipelineState::Done => PipelineState::Done,
        }
    }
}

/// Counters from an export run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExportStats {
    pub records_read: u32,
    pub records_rejected: u32,
    pub films_upserted: u32,
    pub actors_upserted: u32,
    pub directors_upserted: u32,
    pub acted_in_merged: u32,
    pub directed_merged: u32,
    pub dangling_skipped: u32,
    pub write_errors: u32,
}

impl ExportStats {
    pub fn relations_merged(&self, kind: RelationKind) -> u32 {
        match kind {
            RelationKind::ActedIn => self.acted_in_merged,
            RelationKind::Directed => self.directed_merged,
        }
    }

    fn record_merge(&mut self, kind: RelationKind) {
        match kind {
            RelationKind::ActedIn => self.acted_in_merged += 1,
            RelationKind::Directed => self.directed_merged += 1,
        }
    }
}

impl fmt::Display for ExportStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "\n=== Film Graph Export Complete ===")?;
        writeln!(f, "Records read:       {}", self.records_read)?;
        writeln!(f, "Records rejected:   {}", self.records_rejected)?;
        writeln!(f, "\nNodes:")?;
        writeln!(f, "  Film:     {}", self.films_upserted)?;
        writeln!(f, "  Actor:    {}", self.actors_upserted)?;
        writeln!(f, "  Director: {}", self.directors_upserted)?;
        writeln!(f, "\nRelationships:")?;
        writeln!(f, "  ACTED_IN: {}", self.acted_in_merged)?;
        writeln!(f, "  DIRECTED: {}", self.directed_merged)?;
        writeln!(f, "\nSkipped:")?;
        writeln!(f, "  Dangling references: {}", self.dangling_skipped)?;
        write!(f, "  Write errors:        {}", self.write_errors)
    }
}

/// A finished run: what happened and when.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub final_state: PipelineState,
    pub stats: ExportStats,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.stats)?;
        let elapsed = self.finished_at - self.started_at;
        write!(
            f,
            "\nFinished {} ({:.1}s, state {:?})",
            self.finished_at.format("%Y-%m-%d %H:%M:%S UTC"),
            elapsed.num_milliseconds() as f64 / 1000.0,
            self.final_state,
        )
    }
}

pub struct Pipeline<'a> {
    source: &'a dyn FilmSource,
    sink: &'a dyn GraphSink,
    cleaner: FieldCleaner,
    state: PipelineState,
    batch: Option<CleanedBatch>,
    stats: ExportStats,
}

impl<'a> Pipeline<'a> {
    pub fn new(source: &'a dyn FilmSource, sink: &'a dyn GraphSink, cleaner: FieldCleaner) -> Self {
        Self {
            source,
            sink,
            cleaner,
            state: PipelineState::NotStarted,
            batch: None,
            stats: ExportStats::default(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> &ExportStats {
        &self.stats
    }

    /// Run every remaining stage in order and finish in `Done`.
    ///
    /// Only a failure to read the source aborts; per-record problems are
    /// logged and counted.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let started_at = Utc::now();
        info!(state = ?self.state, "Film graph export starting");

        while let Some(stage) = self.state.next_stage() {
            self.run_stage(stage).await?;
        }
        self.state = self.state.advance();

        info!(
            films = self.stats.films_upserted,
            actors = self.stats.actors_upserted,
            directors = self.stats.directors_upserted,
            acted_in = self.stats.acted_in_merged,
            directed = self.stats.directed_merged,
            rejected = self.stats.records_rejected,
            dangling = self.stats.dangling_skipped,
            write_errors = self.stats.write_errors,
            "Film graph export finished"
        );

        Ok(RunSummary {
            started_at,
            finished_at: Utc::now(),
            final_state: self.state,
            stats: self.stats.clone(),
        })
    }

    /// Run one stage on its own. The pipeline's state becomes the state
    /// that stage completes, whatever it was before.
    pub async fn run_stage(&mut self, stage: Stage) -> Result<()> {
        let batch = self.take_batch().await?;
        info!(stage = %stage, films = batch.films.len(), "Stage starting");

        match stage {
            Stage::Films => self.load_films(&batch).await,
            Stage::Actors => self.load_actors(&batch).await,
            Stage::Directors => self.load_directors(&batch).await,
            Stage::Relationships => self.load_relationships(&batch).await,
        }

        self.batch = Some(batch);
        self.state = stage.completes();
        info!(stage = %stage, state = ?self.state, "Stage complete");
        Ok(())
    }

    /// The validated batch, read and cleaned on first use.
    async fn take_batch(&mut self) -> Result<CleanedBatch> {
        if let Some(batch) = self.batch.take() {
            return Ok(batch);
        }

        let records = self.source.films().await?;
        let batch = CleanedBatch::from_records(&self.cleaner, &records);

        self.stats.records_read = u32::try_from(records.len()).unwrap_or(u32::MAX);
        self.stats.records_rejected = u32::try_from(batch.rejections.len()).unwrap_or(u32::MAX);
        for rejection in &batch.rejections {
            warn!(
                film_id = rejection.film_id.as_str(),
                "{}",
                FilmGraphError::from(rejection.clone())
            );
        }
        info!(
            read = records.len(),
            valid = batch.films.len(),
            rejected = batch.rejections.len(),
            "Film records validated"
        );
        Ok(batch)
    }

    async fn load_films(&mut self, batch: &CleanedBatch) {
        for film in &batch.films {
            match self.sink.upsert_film(&film.node).await {
                Ok(()) => self.stats.films_upserted += 1,
                Err(e) => self.write_failed(&film.node.id, e),
            }
        }
    }

    async fn load_actors(&mut self, batch: &CleanedBatch) {
        for name in batch.distinct_actors() {
            match self.sink.upsert_actor(&name).await {
                Ok(()) => self.stats.actors_upserted += 1,
                Err(e) => self.write_failed(&name, e),
            }
        }
    }

    async fn load_directors(&mut self, batch: &CleanedBatch) {
        for name in batch.distinct_directors() {
            match self.sink.upsert_director(&name).await {
                Ok(()) => self.stats.directors_upserted += 1,
                Err(e) => self.write_failed(&name, e),
            }
        }
    }

    async fn load_relationships(&mut self, batch: &CleanedBatch) {
        for film in &batch.films {
            let edges = film
                .actors
                .iter()
                .map(|a| (RelationKind::ActedIn, a))
                .chain(film.directors.iter().map(|d| (RelationKind::Directed, d)));

            for (kind, from) in edges {
                match self.sink.merge_relation(kind, from, &film.node.id).await {
                    Ok(true) => self.stats.record_merge(kind),
                    Ok(false) => {
                        self.stats.dangling_skipped += 1;
                        let err = FilmGraphError::DanglingReference {
                            kind,
                            from: from.clone(),
                            film_id: film.node.id.clone(),
                        };
                        warn!("{err}");
                    }
                    Err(e) => self.write_failed(&format!("{kind} {from} -> {}", film.node.id), e),
                }
            }
        }
    }

    fn write_failed(&mut self, key: &str, source: anyhow::Error) {
        self.stats.write_errors += 1;
        let err = FilmGraphError::write(key, source);
        warn!(key, "{err}");
    }
}
