use neo4rs::{query, ConfigBuilder, Graph};
use tracing::info;

use filmgraph_common::FilmGraphError;

/// Thin wrapper around neo4rs::Graph providing connection setup.
#[derive(Clone)]
pub struct GraphClient {
    pub(crate) graph: Graph,
}

impl GraphClient {
    /// Connect to Neo4j and prove the server answers with a `RETURN 1`.
    /// Any failure is a connectivity error carrying the driver's cause.
    pub async fn connect(
        uri: &str,
        user: &str,
        password: &str,
        max_connections: usize,
    ) -> Result<Self, FilmGraphError> {
        let config = ConfigBuilder::default()
            .uri(uri)
            .user(user)
            .password(password)
            .fetch_size(500)
            .max_connections(max_connections)
            .build()
            .map_err(|e| FilmGraphError::connectivity("graph", e))?;
        let graph = Graph::connect(config)
            .await
            .map_err(|e| FilmGraphError::connectivity("graph", e))?;

        graph
            .run(query("RETURN 1"))
            .await
            .map_err(|e| FilmGraphError::connectivity("graph", e))?;

        info!(uri, "Connected to graph store");
        Ok(Self { graph })
    }

    /// Release the connection pool. Clones held elsewhere keep their
    /// connections until they are dropped too.
    pub fn close(self) {
        drop(self.graph);
        info!("Graph store connection closed");
    }
}
