use tracing::info;

use filmgraph_common::{Config, FilmGraphError};
use filmgraph_docstore::DocumentStore;
use filmgraph_graph::GraphClient;

/// Both store handles for one run. Built from `Config`, passed down by
/// reference, closed once at the end.
pub struct Stores {
    pub documents: DocumentStore,
    pub graph: GraphClient,
}

impl Stores {
    /// Connect to both stores before any work starts. If the graph is
    /// unreachable the already-open document pool is released before the
    /// error is returned.
    pub async fn connect(config: &Config) -> Result<Self, FilmGraphError> {
        let documents = DocumentStore::connect(&config.database_url).await?;

        let graph = match GraphClient::connect(
            &config.neo4j_uri,
            &config.neo4j_user,
            &config.neo4j_password,
            config.neo4j_max_connections,
        )
        .await
        {
            Ok(graph) => graph,
            Err(e) => {
                documents.close().await;
                return Err(e);
            }
        };

        info!("Both stores reachable");
        Ok(Self { documents, graph })
    }

    pub async fn close(self) {
        self.graph.close();
        self.documents.close().await;
    }
}
