//! Read-only analytical queries over the film documents.
//!
//! Grouping and sorting happen in Postgres. Numeric fields may be stored as
//! strings (sometimes empty), so every numeric access goes through
//! [`num`], which yields NULL for anything that is not a plain number.

use anyhow::Result;
use serde::Serialize;
use sqlx::PgPool;

use filmgraph_common::{DirectorKeyPolicy, FilmRecord};

/// `doc->>field` as float8, or NULL when blank or not numeric.
fn num(field: &str) -> String {
    format!(
        "(CASE WHEN btrim(doc->>'{field}') ~ '^-?[0-9]+(\\.[0-9]+)?$' \
         THEN btrim(doc->>'{field}')::float8 END)"
    )
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueLeader {
    pub title: String,
    pub year: Option<i64>,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecadeTop {
    pub decade: i64,
    /// (title, score), best first.
    pub films: Vec<(String, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LongestFilm {
    pub genre: String,
    pub title: String,
    pub runtime: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreField {
    Rating,
    Metascore,
}

impl ScoreField {
    fn field(self) -> &'static str {
        match self {
            ScoreField::Rating => "rating",
            ScoreField::Metascore => "Metascore",
        }
    }
}

/// Name of the view holding critically and commercially successful films.
pub const ACCLAIMED_VIEW: &str = "acclaimed_films";

pub struct FilmAnalytics {
    pool: PgPool,
}

impl FilmAnalytics {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Year with the most films, as (year, count).
    pub async fn year_with_most_films(&self) -> Result<Option<(i64, i64)>> {
        let sql = format!(
            "SELECT y::int8, count(*) AS n
             FROM (SELECT {year} AS y FROM films) t
             WHERE y IS NOT NULL
             GROUP BY y
             ORDER BY n DESC, y ASC
             LIMIT 1",
            year = num("year"),
        );
        Ok(sqlx::query_as::<_, (i64, i64)>(&sql)
            .fetch_optional(&self.pool)
            .await?)
    }

    pub async fn count_films_after(&self, year: i64) -> Result<i64> {
        let sql = format!("SELECT count(*) FROM films WHERE {} > $1", num("year"));
        let (n,): (i64,) = sqlx::query_as(&sql)
            .bind(year as f64)
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    pub async fn avg_votes_for_year(&self, year: i64) -> Result<Option<f64>> {
        let sql = format!(
            "SELECT avg({votes}) FROM films WHERE {year} = $1",
            votes = num("Votes"),
            year = num("year"),
        );
        let (avg,): (Option<f64>,) = sqlx::query_as(&sql)
            .bind(year as f64)
            .fetch_one(&self.pool)
            .await?;
        Ok(avg)
    }

    /// (year, count) ascending by year.
    pub async fn films_per_year(&self) -> Result<Vec<(i64, i64)>> {
        let sql = format!(
            "SELECT y::int8, count(*)
             FROM (SELECT {year} AS y FROM films) t
             WHERE y IS NOT NULL
             GROUP BY y
             ORDER BY y",
            year = num("year"),
        );
        Ok(sqlx::query_as::<_, (i64, i64)>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Every genre name, split out of the comma-separated field and trimmed.
    pub async fn distinct_genres(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT btrim(g) AS genre
             FROM films, unnest(string_to_array(doc->>'genre', ',')) AS g
             WHERE btrim(g) <> ''
             ORDER BY genre",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(g,)| g).collect())
    }

    /// Every actor name across all documents, split server-side, trimmed and
    /// deduplicated.
    pub async fn distinct_actors(&self) -> Result<Vec<String>> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT btrim(a) AS actor
             FROM films, unnest(string_to_array(doc->>'Actors', ',')) AS a
             WHERE btrim(a) <> ''
             ORDER BY actor",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(a,)| a).collect())
    }

    pub async fn film_with_highest_revenue(&self) -> Result<Option<RevenueLeader>> {
        let sql = format!(
            "SELECT doc->>'title', {year}::int8, r
             FROM (SELECT doc, {rev} AS r FROM films) t
             WHERE r IS NOT NULL
             ORDER BY r DESC
             LIMIT 1",
            year = num("year"),
            rev = num("Revenue (Millions)"),
        );
        let row: Option<(Option<String>, Option<i64>, f64)> =
            sqlx::query_as(&sql).fetch_optional(&self.pool).await?;
        Ok(row.map(|(title, year, revenue)| RevenueLeader {
            title: title.unwrap_or_default(),
            year,
            revenue,
        }))
    }

    /// Directors credited on more than `min_films` films, most prolific first.
    pub async fn prolific_directors(
        &self,
        min_films: i64,
        policy: DirectorKeyPolicy,
    ) -> Result<Vec<(String, i64)>> {
        let source = match policy {
            DirectorKeyPolicy::Split => {
                "SELECT btrim(d) AS director
                 FROM films, unnest(string_to_array(doc->>'Director', ',')) AS d"
            }
            DirectorKeyPolicy::Raw => "SELECT btrim(doc->>'Director') AS director FROM films",
        };
        let sql = format!(
            "SELECT director, count(*) AS n
             FROM ({source}) t
             WHERE director IS NOT NULL AND btrim(director) <> ''
             GROUP BY director
             HAVING count(*) > $1
             ORDER BY n DESC, director ASC"
        );
        Ok(sqlx::query_as::<_, (String, i64)>(&sql)
            .bind(min_films)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Genre whose films have the highest average revenue.
    pub async fn genre_with_highest_avg_revenue(&self) -> Result<Option<(String, f64)>> {
        let sql = format!(
            "SELECT btrim(g) AS genre, avg(r) AS avg_revenue
             FROM (SELECT doc, {rev} AS r FROM films) t,
                  unnest(string_to_array(doc->>'genre', ',')) AS g
             WHERE r IS NOT NULL AND btrim(g) <> ''
             GROUP BY genre
             ORDER BY avg_revenue DESC
             LIMIT 1",
            rev = num("Revenue (Millions)"),
        );
        Ok(sqlx::query_as::<_, (String, f64)>(&sql)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Best `n` films per decade by `score`.
    pub async fn top_per_decade(&self, score: ScoreField, n: i64) -> Result<Vec<DecadeTop>> {
        let sql = format!(
            "SELECT decade, title, s FROM (
                 SELECT (floor(y / 10) * 10)::int8 AS decade,
                        coalesce(doc->>'title', '') AS title,
                        s,
                        row_number() OVER (PARTITION BY floor(y / 10) ORDER BY s DESC) AS rn
                 FROM (SELECT doc, {year} AS y, {score} AS s FROM films) t
                 WHERE y IS NOT NULL AND s IS NOT NULL
             ) ranked
             WHERE rn <= $1
             ORDER BY decade, s DESC",
            year = num("year"),
            score = num(score.field()),
        );
        let rows: Vec<(i64, String, f64)> =
            sqlx::query_as(&sql).bind(n).fetch_all(&self.pool).await?;
        Ok(group_by_decade(rows))
    }

    pub async fn longest_film_per_genre(&self) -> Result<Vec<LongestFilm>> {
        let sql = format!(
            "SELECT DISTINCT ON (genre) btrim(g) AS genre, coalesce(doc->>'title', ''), r
             FROM (SELECT doc, {runtime} AS r FROM films) t,
                  unnest(string_to_array(doc->>'genre', ',')) AS g
             WHERE r IS NOT NULL AND btrim(g) <> ''
             ORDER BY genre, r DESC",
            runtime = num("Runtime (Minutes)"),
        );
        let rows: Vec<(String, String, f64)> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        Ok(rows
            .into_iter()
            .map(|(genre, title, runtime)| LongestFilm {
                genre,
                title,
                runtime,
            })
            .collect())
    }

    /// (runtime, revenue) for every film carrying both, ordered by runtime.
    pub async fn runtime_and_revenue(&self) -> Result<Vec<(f64, f64)>> {
        let sql = format!(
            "SELECT rt, rv FROM (SELECT {runtime} AS rt, {rev} AS rv FROM films) t
             WHERE rt IS NOT NULL AND rv IS NOT NULL
             ORDER BY rt",
            runtime = num("Runtime (Minutes)"),
            rev = num("Revenue (Millions)"),
        );
        Ok(sqlx::query_as::<_, (f64, f64)>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    /// Pearson correlation between runtime and revenue.
    pub async fn runtime_revenue_correlation(&self) -> Result<Option<f64>> {
        let pairs = self.runtime_and_revenue().await?;
        Ok(pearson(&pairs))
    }

    /// (decade, average runtime in minutes) ascending.
    pub async fn avg_runtime_by_decade(&self) -> Result<Vec<(i64, f64)>> {
        let sql = format!(
            "SELECT (floor(y / 10) * 10)::int8 AS decade, avg(rt)
             FROM (SELECT {year} AS y, {runtime} AS rt FROM films) t
             WHERE y IS NOT NULL AND rt IS NOT NULL
             GROUP BY decade
             ORDER BY decade",
            year = num("year"),
            runtime = num("Runtime (Minutes)"),
        );
        Ok(sqlx::query_as::<_, (i64, f64)>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    /// (Re)create the view of films with Metascore > 80 and revenue > 50M.
    pub async fn create_acclaimed_view(&self) -> Result<()> {
        let sql = format!(
            "CREATE OR REPLACE VIEW {ACCLAIMED_VIEW} AS
             SELECT id, doc FROM films
             WHERE {meta} > 80 AND {rev} > 50",
            meta = num("Metascore"),
            rev = num("Revenue (Millions)"),
        );
        sqlx::query(&sql).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn acclaimed_films(&self) -> Result<Vec<FilmRecord>> {
        let sql = format!("SELECT id, doc FROM {ACCLAIMED_VIEW} ORDER BY id");
        let rows: Vec<(String, serde_json::Value)> =
            sqlx::query_as(&sql).fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|(id, doc)| FilmRecord::from_document(id, doc).map_err(Into::into))
            .collect()
    }
}

fn group_by_decade(rows: Vec<(i64, String, f64)>) -> Vec<DecadeTop> {
    let mut out: Vec<DecadeTop> = Vec::new();
    for (decade, title, score) in rows {
        match out.last_mut() {
            Some(top) if top.decade == decade => top.films.push((title, score)),
            _ => out.push(DecadeTop {
                decade,
                films: vec![(title, score)],
            }),
        }
    }
    out
}

/// Pearson correlation coefficient. `None` for fewer than two points or a
/// constant series.
pub fn pearson(pairs: &[(f64, f64)]) -> Option<f64> {
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }
    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }
    Some(cov / (var_x.sqrt() * var_y.sqrt()))
}
