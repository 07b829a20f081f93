use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use filmgraph_common::Config;
use filmgraph_docstore::DocumentStore;
use filmgraph_export::import::{import_documents, parse_documents};
use filmgraph_export::queries::{run_query, QueryCommand};
use filmgraph_export::{FieldCleaner, Pipeline, Stage, Stores};
use filmgraph_graph::migrate::migrate;
use filmgraph_graph::{DirectorRelation, GraphWriter};

#[derive(Parser)]
#[command(name = "filmgraph", about = "Project film documents into a Neo4j graph")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load a JSON array or JSON-lines dataset into the document store
    Import { path: PathBuf },
    #[command(flatten)]
    Graph(GraphCommand),
}

/// Commands that need both stores.
#[derive(Subcommand)]
enum GraphCommand {
    /// Run the whole export pipeline (the default)
    Export,
    /// Run a single export stage
    Stage { stage: Stage },
    /// Merge director-to-director relations derived from the graph
    Derive { relation: DeriveKind },
    /// Add people as actors of an existing film
    Cast {
        film_id: String,
        #[arg(required = true)]
        names: Vec<String>,
    },
    /// Run one analytical query
    Query {
        #[command(subcommand)]
        query: QueryCommand,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DeriveKind {
    Influences,
    Competes,
}

impl From<DeriveKind> for DirectorRelation {
    fn from(kind: DeriveKind) -> Self {
        match kind {
            DeriveKind::Influences => DirectorRelation::Influences,
            DeriveKind::Competes => DirectorRelation::CompetesWith,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing()?;

    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    match cli.command.unwrap_or(Command::Graph(GraphCommand::Export)) {
        Command::Import { path } => {
            let store = DocumentStore::connect(&config.database_url).await?;
            let result = load_dataset(&store, &path).await;
            store.close().await;
            result
        }
        Command::Graph(command) => {
            let stores = Stores::connect(&config).await?;
            let result = execute(command, &stores, &config).await;
            stores.close().await;
            result
        }
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("filmgraph=info".parse()?);
    let json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

async fn execute(command: GraphCommand, stores: &Stores, config: &Config) -> Result<()> {
    let writer = GraphWriter::new(stores.graph.clone());
    let cleaner = FieldCleaner::new(config.director_key_policy);

    match command {
        GraphCommand::Export => {
            info!("Film graph export starting...");
            prepare(stores).await;
            let mut pipeline = Pipeline::new(&stores.documents, &writer, cleaner);
            let summary = pipeline.run().await?;
            println!("{summary}");
        }
        GraphCommand::Stage { stage } => {
            prepare(stores).await;
            let mut pipeline = Pipeline::new(&stores.documents, &writer, cleaner);
            pipeline.run_stage(stage).await?;
            println!("{}", pipeline.stats());
        }
        GraphCommand::Derive { relation } => {
            let relation = DirectorRelation::from(relation);
            let n = writer.derive_director_relations(relation).await?;
            println!("{} relations: {n}", relation.rel_type());
        }
        GraphCommand::Cast { film_id, names } => {
            for name in names.iter().map(|n| n.trim()).filter(|n| !n.is_empty()) {
                if writer.add_cast_member(name, &film_id).await? {
                    info!(name, film_id = film_id.as_str(), "Cast member linked");
                } else {
                    warn!(name, film_id = film_id.as_str(), "Film not found; actor added without edge");
                }
            }
        }
        GraphCommand::Query { query } => {
            let text = run_query(&query, stores, config.director_key_policy).await?;
            println!("{text}");
        }
    }
    Ok(())
}

/// Schema setup ahead of an export. A failure here is logged, not fatal:
/// the merges still work without constraints.
async fn prepare(stores: &Stores) {
    if let Err(e) = stores.documents.ensure_schema().await {
        warn!(error = %e, "Document schema check failed");
    }
    if let Err(e) = migrate(&stores.graph).await {
        warn!(error = %e, "Graph schema migration failed, continuing without constraints");
    }
}

async fn load_dataset(store: &DocumentStore, path: &Path) -> Result<()> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read dataset {}", path.display()))?;
    let docs = parse_documents(&text)?;

    let stored = import_documents(store, &docs).await?;
    println!("Imported {stored} of {} film documents", docs.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_is_routed_apart_from_graph_commands() {
        let cli = Cli::parse_from(["filmgraph", "import", "films.json"]);
        assert!(matches!(cli.command, Some(Command::Import { ref path }) if path == Path::new("films.json")));

        let cli = Cli::parse_from(["filmgraph", "stage", "relationships"]);
        assert!(matches!(
            cli.command,
            Some(Command::Graph(GraphCommand::Stage { stage: Stage::Relationships }))
        ));

        let cli = Cli::parse_from(["filmgraph", "derive", "competes"]);
        assert!(matches!(
            cli.command,
            Some(Command::Graph(GraphCommand::Derive { relation: DeriveKind::Competes }))
        ));

        assert!(Cli::parse_from(["filmgraph"]).command.is_none());
    }
}
