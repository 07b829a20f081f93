// Trait seams for the export pipeline.
//
// FilmSource: where candidate film records come from (DocumentStore).
// GraphSink: the four keyed writes the projection needs (GraphWriter).
//
// The pipeline only sees these traits, so its properties can be tested
// against the in-memory doubles in testing.rs with no database.

use anyhow::Result;
use async_trait::async_trait;

use filmgraph_common::{FilmNode, FilmRecord, PersonKind, RelationKind};
use filmgraph_docstore::DocumentStore;
use filmgraph_graph::GraphWriter;

#[async_trait]
pub trait FilmSource: Send + Sync {
    /// The full candidate set, unvalidated.
    async fn films(&self) -> Result<Vec<FilmRecord>>;
}

#[async_trait]
pub trait GraphSink: Send + Sync {
    async fn upsert_film(&self, film: &FilmNode) -> Result<()>;

    async fn upsert_actor(&self, name: &str) -> Result<()>;

    async fn upsert_director(&self, name: &str) -> Result<()>;

    /// Merge an edge between two existing nodes. `Ok(false)` means an
    /// endpoint was missing and nothing was written.
    async fn merge_relation(&self, kind: RelationKind, from: &str, film_id: &str) -> Result<bool>;
}

#[async_trait]
impl FilmSource for DocumentStore {
    async fn films(&self) -> Result<Vec<FilmRecord>> {
        DocumentStore::films(self).await
    }
}

#[async_trait]
impl GraphSink for GraphWriter {
    async fn upsert_film(&self, film: &FilmNode) -> Result<()> {
        Ok(GraphWriter::upsert_film(self, film).await?)
    }

    async fn upsert_actor(&self, name: &str) -> Result<()> {
        Ok(self.upsert_person(PersonKind::Actor, name).await?)
    }

    async fn upsert_director(&self, name: &str) -> Result<()> {
        Ok(self.upsert_person(PersonKind::Director, name).await?)
    }

    async fn merge_relation(&self, kind: RelationKind, from: &str, film_id: &str) -> Result<bool> {
        Ok(GraphWriter::merge_relation(self, kind, from, film_id).await?)
    }
}
