// In-memory doubles for the pipeline's two trait seams.
//
// - MemoryFilms (FilmSource): a fixed list of records
// - MemoryGraph (GraphSink): stateful node and edge sets with the same
//   keyed-merge semantics as the real graph, plus write-failure injection
//
// Plus `film_record()` for building a complete source record.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Mutex;

use anyhow::{bail, Result};
use async_trait::async_trait;

use filmgraph_common::{FilmNode, FilmRecord, RelationKind};

use crate::traits::{FilmSource, GraphSink};

// ---------------------------------------------------------------------------
// MemoryFilms
// ---------------------------------------------------------------------------

pub struct MemoryFilms {
    records: Vec<FilmRecord>,
}

impl MemoryFilms {
    pub fn new(records: Vec<FilmRecord>) -> Self {
        Self { records }
    }
}

#[async_trait]
impl FilmSource for MemoryFilms {
    async fn films(&self) -> Result<Vec<FilmRecord>> {
        Ok(self.records.clone())
    }
}

/// A source that cannot be read.
pub struct UnreachableFilms;

#[async_trait]
impl FilmSource for UnreachableFilms {
    async fn films(&self) -> Result<Vec<FilmRecord>> {
        bail!("document store unreachable")
    }
}

// ---------------------------------------------------------------------------
// MemoryGraph
// ---------------------------------------------------------------------------

/// Node and edge totals of a `MemoryGraph`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryCounts {
    pub films: usize,
    pub actors: usize,
    pub directors: usize,
    pub acted_in: usize,
    pub directed: usize,
}

#[derive(Default)]
struct GraphState {
    films: BTreeMap<String, FilmNode>,
    actors: BTreeSet<String>,
    directors: BTreeSet<String>,
    acted_in: BTreeSet<(String, String)>,
    directed: BTreeSet<(String, String)>,
}

#[derive(Default)]
pub struct MemoryGraph {
    state: Mutex<GraphState>,
    failing: Mutex<HashSet<String>>,
}

impl MemoryGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write keyed on `key` (film id or person name) fail.
    pub fn fail_on(self, key: &str) -> Self {
        self.failing.lock().unwrap().insert(key.to_string());
        self
    }

    /// Let writes keyed on `key` succeed again.
    pub fn heal(&self, key: &str) {
        self.failing.lock().unwrap().remove(key);
    }

    pub fn counts(&self) -> MemoryCounts {
        let s = self.state.lock().unwrap();
        MemoryCounts {
            films: s.films.len(),
            actors: s.actors.len(),
            directors: s.directors.len(),
            acted_in: s.acted_in.len(),
            directed: s.directed.len(),
        }
    }

    pub fn film(&self, id: &str) -> Option<FilmNode> {
        self.state.lock().unwrap().films.get(id).cloned()
    }

    pub fn actors(&self) -> Vec<String> {
        self.state.lock().unwrap().actors.iter().cloned().collect()
    }

    pub fn directors(&self) -> Vec<String> {
        self.state.lock().unwrap().directors.iter().cloned().collect()
    }

    pub fn has_edge(&self, kind: RelationKind, from: &str, film_id: &str) -> bool {
        let s = self.state.lock().unwrap();
        let key = (from.to_string(), film_id.to_string());
        match kind {
            RelationKind::ActedIn => s.acted_in.contains(&key),
            RelationKind::Directed => s.directed.contains(&key),
        }
    }

    fn check(&self, key: &str) -> Result<()> {
        if self.failing.lock().unwrap().contains(key) {
            bail!("injected write failure for {key}");
        }
        Ok(())
    }
}

#[async_trait]
impl GraphSink for MemoryGraph {
    async fn upsert_film(&self, film: &FilmNode) -> Result<()> {
        self.check(&film.id)?;
        self.state
            .lock()
            .unwrap()
            .films
            .insert(film.id.clone(), film.clone());
        Ok(())
    }

    async fn upsert_actor(&self, name: &str) -> Result<()> {
        self.check(name)?;
        self.state.lock().unwrap().actors.insert(name.to_string());
        Ok(())
    }

    async fn upsert_director(&self, name: &str) -> Result<()> {
        self.check(name)?;
        self.state.lock().unwrap().directors.insert(name.to_string());
        Ok(())
    }

    async fn merge_relation(&self, kind: RelationKind, from: &str, film_id: &str) -> Result<bool> {
        self.check(from)?;
        let mut s = self.state.lock().unwrap();
        let source_exists = match kind {
            RelationKind::ActedIn => s.actors.contains(from),
            RelationKind::Directed => s.directors.contains(from),
        };
        if !source_exists || !s.films.contains_key(film_id) {
            return Ok(false);
        }
        let key = (from.to_string(), film_id.to_string());
        match kind {
            RelationKind::ActedIn => s.acted_in.insert(key),
            RelationKind::Directed => s.directed.insert(key),
        };
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// A record with every required field filled in.
pub fn film_record(id: &str, title: &str, director: &str, actors: &str) -> FilmRecord {
    FilmRecord {
        id: id.to_string(),
        title: Some(title.to_string()),
        year: Some("2021".to_string()),
        runtime: Some("120".to_string()),
        revenue: Some("50".to_string()),
        rating: Some("8.5".to_string()),
        metascore: Some("70".to_string()),
        genre: Some("Drama".to_string()),
        director: Some(director.to_string()),
        actors: Some(actors.to_string()),
        votes: Some("1000".to_string()),
    }
}
