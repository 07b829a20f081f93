use neo4rs::query;
use tracing::info;

use filmgraph_common::{FilmNode, PersonKind, RelationKind};

use crate::GraphClient;

/// Director↔Director relations computed from what is already in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirectorRelation {
    /// Directed films sharing at least one genre.
    Influences,
    /// Directed films sharing a genre in the same year.
    CompetesWith,
}

impl DirectorRelation {
    pub fn rel_type(self) -> &'static str {
        match self {
            DirectorRelation::Influences => "INFLUENCES",
            DirectorRelation::CompetesWith => "COMPETES_WITH",
        }
    }
}

/// Write-side wrapper for the graph. Every write is a keyed MERGE, so
/// repeating any call leaves the graph unchanged.
pub struct GraphWriter {
    client: GraphClient,
}

impl GraphWriter {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    /// Upsert a `:Film` by id, overwriting every attribute.
    pub async fn upsert_film(&self, film: &FilmNode) -> Result<(), neo4rs::Error> {
        let q = query(
            "MERGE (f:Film {id: $id})
             SET f.title = $title,
                 f.year = $year,
                 f.votes = $votes,
                 f.revenue = $revenue,
                 f.rating = $rating,
                 f.director = $director,
                 f.genre = $genre",
        )
        .param("id", film.id.as_str())
        .param("title", film.title.as_str())
        .param("year", film.year)
        .param("votes", film.votes)
        .param("revenue", film.revenue)
        .param("rating", film.rating)
        .param("director", film.director.as_str())
        .param("genre", film.genre.as_str());

        self.client.graph.run(q).await
    }

    /// Upsert an `:Actor` or `:Director` keyed by name.
    pub async fn upsert_person(&self, kind: PersonKind, name: &str) -> Result<(), neo4rs::Error> {
        let cypher = format!("MERGE (:{} {{name: $name}})", kind.label());
        self.client.graph.run(query(&cypher).param("name", name)).await
    }

    /// Merge a person→film edge between two existing nodes.
    ///
    /// Never creates either endpoint. Returns `false` when one of them is
    /// missing, in which case nothing was written.
    pub async fn merge_relation(
        &self,
        kind: RelationKind,
        from: &str,
        film_id: &str,
    ) -> Result<bool, neo4rs::Error> {
        let cypher = format!(
            "MATCH (p:{label} {{name: $name}})
             MATCH (f:Film {{id: $film_id}})
             MERGE (p)-[r:{rel}]->(f)
             RETURN count(r) AS linked",
            label = kind.source().label(),
            rel = kind.rel_type(),
        );
        let q = query(&cypher).param("name", from).param("film_id", film_id);

        let mut stream = self.client.graph.execute(q).await?;
        let linked: i64 = match stream.next().await? {
            Some(row) => row.get("linked").unwrap_or(0),
            None => 0,
        };
        Ok(linked > 0)
    }

    /// Add someone as an Actor of an existing film. The Actor node is merged
    /// even when the film is missing; the edge only when it exists.
    pub async fn add_cast_member(&self, name: &str, film_id: &str) -> Result<bool, neo4rs::Error> {
        let q = query(
            "MERGE (a:Actor {name: $name})
             WITH a
             OPTIONAL MATCH (f:Film {id: $film_id})
             FOREACH (ignored IN CASE WHEN f IS NULL THEN [] ELSE [1] END |
                 MERGE (a)-[:ACTED_IN]->(f))
             RETURN f IS NOT NULL AS linked",
        )
        .param("name", name)
        .param("film_id", film_id);

        let mut stream = self.client.graph.execute(q).await?;
        let linked: bool = match stream.next().await? {
            Some(row) => row.get("linked").unwrap_or(false),
            None => false,
        };
        Ok(linked)
    }

    /// Materialize a derived director relation. Returns how many such
    /// relationships exist afterwards.
    pub async fn derive_director_relations(
        &self,
        relation: DirectorRelation,
    ) -> Result<i64, neo4rs::Error> {
        let same_year = match relation {
            DirectorRelation::Influences => "",
            DirectorRelation::CompetesWith => "AND f1.year = f2.year",
        };
        let rel = relation.rel_type();
        let cypher = format!(
            "MATCH (d1:Director)-[:DIRECTED]->(f1:Film),
                   (d2:Director)-[:DIRECTED]->(f2:Film)
             WHERE d1 <> d2 {same_year}
               AND ANY(g IN split(f1.genre, ',')
                       WHERE trim(g) <> '' AND trim(g) IN [x IN split(f2.genre, ',') | trim(x)])
             WITH DISTINCT d1, d2
             MERGE (d1)-[:{rel}]->(d2)"
        );
        self.client.graph.run(query(&cypher)).await?;

        let count_cypher = format!("MATCH (:Director)-[r:{rel}]->(:Director) RETURN count(r) AS n");
        let mut stream = self.client.graph.execute(query(&count_cypher)).await?;
        let n: i64 = match stream.next().await? {
            Some(row) => row.get("n").unwrap_or(0),
            None => 0,
        };
        info!(relation = rel, count = n, "Derived director relations merged");
        Ok(n)
    }
}
