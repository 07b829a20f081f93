//! Read-side relationship queries over the projected graph.

use neo4rs::{query, Query};
use serde::Serialize;

use crate::GraphClient;

/// Node and edge totals, used to check a projection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GraphCounts {
    pub films: i64,
    pub actors: i64,
    pub directors: i64,
    pub acted_in: i64,
    pub directed: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub title: String,
    pub genre: String,
    pub rating: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collaboration {
    pub director: String,
    pub actor: String,
    pub films: i64,
    pub avg_revenue: f64,
}

pub struct GraphReader {
    client: GraphClient,
}

impl GraphReader {
    pub fn new(client: GraphClient) -> Self {
        Self { client }
    }

    pub async fn counts(&self) -> Result<GraphCounts, neo4rs::Error> {
        Ok(GraphCounts {
            films: self.scalar_count("MATCH (n:Film) RETURN count(n) AS n").await?,
            actors: self.scalar_count("MATCH (n:Actor) RETURN count(n) AS n").await?,
            directors: self.scalar_count("MATCH (n:Director) RETURN count(n) AS n").await?,
            acted_in: self
                .scalar_count("MATCH (:Actor)-[r:ACTED_IN]->(:Film) RETURN count(r) AS n")
                .await?,
            directed: self
                .scalar_count("MATCH (:Director)-[r:DIRECTED]->(:Film) RETURN count(r) AS n")
                .await?,
        })
    }

    /// Actor credited on the most films.
    pub async fn top_actor(&self) -> Result<Option<(String, i64)>, neo4rs::Error> {
        let q = query(
            "MATCH (a:Actor)-[:ACTED_IN]->(f:Film)
             RETURN a.name AS name, count(f) AS n
             ORDER BY n DESC, name ASC
             LIMIT 1",
        );
        Ok(self.name_counts(q).await?.into_iter().next())
    }

    pub async fn coactors(&self, actor: &str) -> Result<Vec<String>, neo4rs::Error> {
        let q = query(
            "MATCH (a:Actor {name: $name})-[:ACTED_IN]->(:Film)<-[:ACTED_IN]-(co:Actor)
             WHERE co.name <> $name
             RETURN DISTINCT co.name AS name
             ORDER BY name",
        )
        .param("name", actor);
        self.names(q).await
    }

    /// Actor whose films add up to the highest revenue (millions).
    pub async fn actor_with_highest_revenue(&self) -> Result<Option<(String, f64)>, neo4rs::Error> {
        let q = query(
            "MATCH (a:Actor)-[:ACTED_IN]->(f:Film)
             WHERE f.revenue IS NOT NULL
             WITH a, sum(f.revenue) AS total
             RETURN a.name AS name, total
             ORDER BY total DESC, name ASC
             LIMIT 1",
        );
        let mut stream = self.client.graph.execute(q).await?;
        Ok(match stream.next().await? {
            Some(row) => Some((
                row.get("name").unwrap_or_default(),
                row.get("total").unwrap_or(0.0),
            )),
            None => None,
        })
    }

    pub async fn avg_votes(&self) -> Result<Option<f64>, neo4rs::Error> {
        let q = query(
            "MATCH (f:Film) WHERE f.votes IS NOT NULL
             RETURN avg(f.votes) AS avg",
        );
        let mut stream = self.client.graph.execute(q).await?;
        Ok(match stream.next().await? {
            Some(row) => row.get::<Option<f64>>("avg").unwrap_or(None),
            None => None,
        })
    }

    /// (title, votes), most voted first.
    pub async fn votes_per_film(&self, limit: i64) -> Result<Vec<(String, i64)>, neo4rs::Error> {
        let q = query(
            "MATCH (f:Film) WHERE f.votes IS NOT NULL
             RETURN f.title AS name, f.votes AS n
             ORDER BY n DESC
             LIMIT $limit",
        )
        .param("limit", limit);
        self.name_counts(q).await
    }

    pub async fn most_common_genre(&self) -> Result<Option<(String, i64)>, neo4rs::Error> {
        let q = query(
            "MATCH (f:Film) WHERE f.genre IS NOT NULL AND f.genre <> ''
             UNWIND split(f.genre, ',') AS g
             WITH trim(g) AS name WHERE name <> ''
             RETURN name, count(*) AS n
             ORDER BY n DESC, name ASC
             LIMIT 1",
        );
        Ok(self.name_counts(q).await?.into_iter().next())
    }

    /// Films (title, year) of everyone who acted alongside `actor`, newest first.
    pub async fn films_of_coactors(&self, actor: &str) -> Result<Vec<(String, i64)>, neo4rs::Error> {
        let q = query(
            "MATCH (me:Actor {name: $name})-[:ACTED_IN]->(:Film)<-[:ACTED_IN]-(co:Actor)
             WITH DISTINCT co
             MATCH (co)-[:ACTED_IN]->(f:Film)
             RETURN DISTINCT f.title AS name, f.year AS n
             ORDER BY n DESC, name ASC",
        )
        .param("name", actor);
        self.name_counts(q).await
    }

    /// Director who worked with the most distinct actors.
    pub async fn director_with_most_actors(&self) -> Result<Option<(String, i64)>, neo4rs::Error> {
        let q = query(
            "MATCH (d:Director)-[:DIRECTED]->(:Film)<-[:ACTED_IN]-(a:Actor)
             RETURN d.name AS name, count(DISTINCT a) AS n
             ORDER BY n DESC, name ASC
             LIMIT 1",
        );
        Ok(self.name_counts(q).await?.into_iter().next())
    }

    /// Films whose actors also appear in the most other films.
    pub async fn most_connected_films(&self, limit: i64) -> Result<Vec<(String, i64)>, neo4rs::Error> {
        let q = query(
            "MATCH (f1:Film)<-[:ACTED_IN]-(a:Actor)-[:ACTED_IN]->(f2:Film)
             WHERE f1 <> f2
             WITH f1, count(DISTINCT a) AS shared
             RETURN f1.title AS name, shared AS n
             ORDER BY n DESC, name ASC
             LIMIT $limit",
        )
        .param("limit", limit);
        self.name_counts(q).await
    }

    /// Actors who worked under the most distinct Director nodes.
    pub async fn actors_with_most_directors(
        &self,
        limit: i64,
    ) -> Result<Vec<(String, i64)>, neo4rs::Error> {
        let q = query(
            "MATCH (a:Actor)-[:ACTED_IN]->(:Film)<-[:DIRECTED]-(d:Director)
             RETURN a.name AS name, count(DISTINCT d) AS n
             ORDER BY n DESC, name ASC
             LIMIT $limit",
        )
        .param("limit", limit);
        self.name_counts(q).await
    }

    /// Best-rated films sharing a genre with `actor`'s filmography that the
    /// actor is not already in.
    pub async fn recommend_films(
        &self,
        actor: &str,
        limit: i64,
    ) -> Result<Vec<Recommendation>, neo4rs::Error> {
        let q = query(
            "MATCH (a:Actor {name: $name})-[:ACTED_IN]->(f:Film)
             UNWIND split(f.genre, ',') AS g
             WITH a, collect(DISTINCT trim(g)) AS liked
             MATCH (rec:Film)
             WHERE ANY(genre IN liked WHERE genre <> '' AND rec.genre CONTAINS genre)
               AND NOT (a)-[:ACTED_IN]->(rec)
               AND rec.rating IS NOT NULL
             RETURN rec.title AS title, rec.genre AS genre, rec.rating AS rating
             ORDER BY rating DESC, title ASC
             LIMIT $limit",
        )
        .param("name", actor)
        .param("limit", limit);

        let mut stream = self.client.graph.execute(q).await?;
        let mut out = Vec::new();
        while let Some(row) = stream.next().await? {
            out.push(Recommendation {
                title: row.get("title").unwrap_or_default(),
                genre: row.get("genre").unwrap_or_default(),
                rating: row.get("rating").unwrap_or(0.0),
            });
        }
        Ok(out)
    }

    /// Names along one shortest path between two actors over ACTED_IN and
    /// DIRECTED edges. Films show up by title.
    pub async fn shortest_path(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Option<Vec<String>>, neo4rs::Error> {
        let q = query(
            "MATCH (a1:Actor {name: $from}), (a2:Actor {name: $to})
             MATCH p = shortestPath((a1)-[:ACTED_IN|DIRECTED*]-(a2))
             RETURN [n IN nodes(p) | coalesce(n.name, n.title)] AS names
             LIMIT 1",
        )
        .param("from", from)
        .param("to", to);

        let mut stream = self.client.graph.execute(q).await?;
        Ok(match stream.next().await? {
            Some(row) => Some(row.get::<Vec<String>>("names").unwrap_or_default()),
            None => None,
        })
    }

    /// Film pairs sharing a genre with no Director in common.
    pub async fn shared_genre_different_directors(
        &self,
        limit: i64,
    ) -> Result<Vec<(String, String)>, neo4rs::Error> {
        let q = query(
            "MATCH (f1:Film), (f2:Film)
             WHERE f1.id < f2.id
               AND ANY(g IN split(f1.genre, ',')
                       WHERE trim(g) <> '' AND trim(g) IN [x IN split(f2.genre, ',') | trim(x)])
               AND NOT EXISTS { MATCH (f1)<-[:DIRECTED]-(:Director)-[:DIRECTED]->(f2) }
             RETURN f1.title AS first, f2.title AS second
             ORDER BY first, second
             LIMIT $limit",
        )
        .param("limit", limit);

        let mut stream = self.client.graph.execute(q).await?;
        let mut out: Vec<(String, String)> = Vec::new();
        while let Some(row) = stream.next().await? {
            out.push((
                row.get("first").unwrap_or_default(),
                row.get("second").unwrap_or_default(),
            ));
        }
        Ok(out)
    }

    /// Director–actor pairs with at least `min_films` films together.
    pub async fn collaborations(
        &self,
        min_films: i64,
        limit: i64,
    ) -> Result<Vec<Collaboration>, neo4rs::Error> {
        let q = query(
            "MATCH (d:Director)-[:DIRECTED]->(f:Film)<-[:ACTED_IN]-(a:Actor)
             WHERE f.revenue IS NOT NULL
             WITH d, a, count(f) AS films, avg(toFloat(f.revenue)) AS avg_revenue
             WHERE films >= $min_films
             RETURN d.name AS director, a.name AS actor, films, avg_revenue
             ORDER BY films DESC, avg_revenue DESC
             LIMIT $limit",
        )
        .param("min_films", min_films)
        .param("limit", limit);

        let mut stream = self.client.graph.execute(q).await?;
        let mut out = Vec::new();
        while let Some(row) = stream.next().await? {
            out.push(Collaboration {
                director: row.get("director").unwrap_or_default(),
                actor: row.get("actor").unwrap_or_default(),
                films: row.get("films").unwrap_or(0),
                avg_revenue: row.get("avg_revenue").unwrap_or(0.0),
            });
        }
        Ok(out)
    }

    // --- helpers ---

    async fn scalar_count(&self, cypher: &str) -> Result<i64, neo4rs::Error> {
        let mut stream = self.client.graph.execute(query(cypher)).await?;
        Ok(match stream.next().await? {
            Some(row) => row.get("n").unwrap_or(0),
            None => 0,
        })
    }

    /// Collect rows shaped `name: String, n: Integer`.
    async fn name_counts(&self, q: Query) -> Result<Vec<(String, i64)>, neo4rs::Error> {
        let mut stream = self.client.graph.execute(q).await?;
        let mut out: Vec<(String, i64)> = Vec::new();
        while let Some(row) = stream.next().await? {
            out.push((row.get("name").unwrap_or_default(), row.get("n").unwrap_or(0)));
        }
        Ok(out)
    }

    async fn names(&self, q: Query) -> Result<Vec<String>, neo4rs::Error> {
        let mut stream = self.client.graph.execute(q).await?;
        let mut out: Vec<String> = Vec::new();
        while let Some(row) = stream.next().await? {
            out.push(row.get("name").unwrap_or_default());
        }
        Ok(out)
    }
}
