use neo4rs::query;
use tracing::{info, warn};

use crate::GraphClient;

/// Uniqueness constraints backing the natural keys the projection merges on.
const CONSTRAINTS: [&str; 3] = [
    "CREATE CONSTRAINT film_id IF NOT EXISTS FOR (f:Film) REQUIRE f.id IS UNIQUE",
    "CREATE CONSTRAINT actor_name IF NOT EXISTS FOR (a:Actor) REQUIRE a.name IS UNIQUE",
    "CREATE CONSTRAINT director_name IF NOT EXISTS FOR (d:Director) REQUIRE d.name IS UNIQUE",
];

const INDEXES: [&str; 2] = [
    "CREATE INDEX film_year IF NOT EXISTS FOR (f:Film) ON (f.year)",
    "CREATE INDEX film_rating IF NOT EXISTS FOR (f:Film) ON (f.rating)",
];

/// Run idempotent schema migrations: constraints, indexes.
pub async fn migrate(client: &GraphClient) -> Result<(), neo4rs::Error> {
    let g = &client.graph;

    info!("Running graph schema migrations...");

    for c in &CONSTRAINTS {
        run_ignoring_exists(g, c).await?;
    }
    info!("Natural key constraints created");

    for idx in &INDEXES {
        run_ignoring_exists(g, idx).await?;
    }
    info!("Film property indexes created");

    Ok(())
}

async fn run_ignoring_exists(g: &neo4rs::Graph, cypher: &str) -> Result<(), neo4rs::Error> {
    match g.run(query(cypher)).await {
        Ok(_) => Ok(()),
        Err(e) => {
            if is_already_exists(&e.to_string()) {
                warn!("Already exists (skipped): {}", cypher.chars().take(80).collect::<String>());
                Ok(())
            } else {
                Err(e)
            }
        }
    }
}

fn is_already_exists(msg: &str) -> bool {
    let msg = msg.to_lowercase();
    msg.contains("already exists") || msg.contains("equivalent")
}
