//! DocumentStore: film documents kept as JSONB rows in Postgres.
//!
//! One row per film: the primary key in `id`, the flat film document in
//! `doc`. Documents are read back leniently; typing and validation happen
//! downstream in the field cleaner.

use anyhow::Result;
use futures::TryStreamExt;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use filmgraph_common::{FilmGraphError, FilmRecord};

#[derive(Clone)]
pub struct DocumentStore {
    pool: PgPool,
}

impl DocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a pool and prove the server answers. Any failure here is a
    /// connectivity error.
    pub async fn connect(database_url: &str) -> Result<Self, FilmGraphError> {
        let pool = PgPoolOptions::new()
            .max_connections(2)
            .connect(database_url)
            .await
            .map_err(|e| FilmGraphError::connectivity("document", e))?;

        sqlx::query("SELECT 1")
            .execute(&pool)
            .await
            .map_err(|e| FilmGraphError::connectivity("document", e))?;

        info!("Connected to document store");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the films table if it does not exist.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS films (
                id   TEXT  PRIMARY KEY,
                doc  JSONB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Insert or replace a film document under `id`.
    pub async fn put_film(&self, id: &str, doc: &Value) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO films (id, doc) VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE SET doc = EXCLUDED.doc
            "#,
        )
        .bind(id)
        .bind(doc)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Every film document, ordered by id.
    ///
    /// A row whose body is not a JSON object still comes back, as a record
    /// with only its id set, so the cleaner can reject and report it.
    pub async fn films(&self) -> Result<Vec<FilmRecord>> {
        let mut rows = sqlx::query_as::<_, (String, Value)>("SELECT id, doc FROM films ORDER BY id")
            .fetch(&self.pool);

        let mut films = Vec::new();
        while let Some((id, doc)) = rows.try_next().await? {
            let record = match FilmRecord::from_document(id.clone(), doc) {
                Ok(r) => r,
                Err(e) => {
                    warn!(film_id = id.as_str(), error = %e, "Film document is not an object");
                    FilmRecord {
                        id,
                        ..Default::default()
                    }
                }
            };
            films.push(record);
        }
        Ok(films)
    }

    pub async fn count(&self) -> Result<i64> {
        let (n,): (i64,) = sqlx::query_as("SELECT count(*) FROM films")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Release every pooled connection.
    pub async fn close(self) {
        self.pool.close().await;
        info!("Document store connection closed");
    }
}

/// Pick a primary key for an imported document: `_id`, then `id`, then
/// `Rank`, then the 1-based position in the file.
pub fn document_key(doc: &Value, position: usize) -> String {
    for field in ["_id", "id", "Rank"] {
        match doc.get(field) {
            Some(Value::String(s)) if !s.trim().is_empty() => return s.trim().to_string(),
            Some(Value::Number(n)) => return n.to_string(),
            Some(Value::Object(o)) => {
                if let Some(Value::String(oid)) = o.get("$oid") {
                    return oid.clone();
                }
            }
            _ => {}
        }
    }
    (position + 1).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn key_prefers_mongo_style_id() {
        let doc = json!({"_id": {"$oid": "65a1"}, "Rank": 3});
        assert_eq!(document_key(&doc, 0), "65a1");
    }

    #[test]
    fn key_falls_back_to_rank_then_position() {
        assert_eq!(document_key(&json!({"Rank": 12}), 0), "12");
        assert_eq!(document_key(&json!({"title": "x"}), 4), "5");
        assert_eq!(document_key(&json!({"id": "  "}), 0), "1");
    }
}
