//! Field cleaner: decides whether a film record is exportable and coerces
//! it into a typed Film payload plus its split cast and director keys.
//!
//! Validation is all-or-nothing. One missing, blank or malformed required
//! field rejects the whole record; nothing is defaulted.

use std::collections::HashSet;
use std::fmt;

use filmgraph_common::{split_names, DirectorKeyPolicy, FilmGraphError, FilmNode, FilmRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    MissingField(&'static str),
    Malformed { field: &'static str, value: String },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::MissingField(field) => write!(f, "missing or empty field '{field}'"),
            RejectReason::Malformed { field, value } => {
                write!(f, "field '{field}' is not numeric: '{value}'")
            }
        }
    }
}

/// A record that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub film_id: String,
    pub title: String,
    pub reason: RejectReason,
}

impl From<Rejection> for FilmGraphError {
    fn from(r: Rejection) -> Self {
        FilmGraphError::Validation {
            title: r.title,
            reason: r.reason.to_string(),
        }
    }
}

/// A record that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFilm {
    pub node: FilmNode,
    /// Trimmed, deduplicated actor names.
    pub actors: Vec<String>,
    /// Director keys under the configured policy.
    pub directors: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FieldCleaner {
    policy: DirectorKeyPolicy,
}

impl FieldCleaner {
    pub fn new(policy: DirectorKeyPolicy) -> Self {
        Self { policy }
    }

    pub fn clean(&self, record: &FilmRecord) -> Result<ValidFilm, Rejection> {
        let reject = |reason: RejectReason| Rejection {
            film_id: record.id.clone(),
            title: record.display_title().to_string(),
            reason,
        };

        if record.id.trim().is_empty() {
            return Err(reject(RejectReason::MissingField("id")));
        }

        let title = required(&record.title, "title").map_err(reject)?;
        let year = required(&record.year, "year").map_err(reject)?;
        let revenue = required(&record.revenue, "Revenue (Millions)").map_err(reject)?;
        let rating = required(&record.rating, "rating").map_err(reject)?;
        let director = required(&record.director, "Director").map_err(reject)?;
        let genre = required(&record.genre, "genre").map_err(reject)?;
        let votes = required(&record.votes, "Votes").map_err(reject)?;

        let year = parse_int(year, "year").map_err(reject)?;
        let votes = parse_int(votes, "Votes").map_err(reject)?;
        let revenue = parse_float(revenue, "Revenue (Millions)").map_err(reject)?;
        let rating = parse_float(rating, "rating").map_err(reject)?;

        let directors = self.director_keys(director);
        if directors.is_empty() {
            return Err(reject(RejectReason::MissingField("Director")));
        }

        let actors = record.actors.as_deref().map(split_names).unwrap_or_default();

        Ok(ValidFilm {
            node: FilmNode {
                id: record.id.clone(),
                title: title.to_string(),
                year,
                votes,
                revenue,
                rating,
                director: director.to_string(),
                genre: genre.to_string(),
            },
            actors,
            directors,
        })
    }

    /// Director node keys for a raw director string. `Raw` keeps the whole
    /// string, trimmed.
    pub fn director_keys(&self, raw: &str) -> Vec<String> {
        match self.policy {
            DirectorKeyPolicy::Split => split_names(raw),
            DirectorKeyPolicy::Raw => match raw.trim() {
                "" => Vec::new(),
                key => vec![key.to_string()],
            },
        }
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, RejectReason> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(RejectReason::MissingField(field)),
    }
}

/// Integers may arrive as "2021" or "2021.0".
fn parse_int(raw: &str, field: &'static str) -> Result<i64, RejectReason> {
    let s = raw.trim();
    if let Ok(n) = s.parse::<i64>() {
        return Ok(n);
    }
    match s.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        _ => Err(RejectReason::Malformed {
            field,
            value: raw.to_string(),
        }),
    }
}

fn parse_float(raw: &str, field: &'static str) -> Result<f64, RejectReason> {
    match raw.trim().parse::<f64>() {
        Ok(f) if f.is_finite() => Ok(f),
        _ => Err(RejectReason::Malformed {
            field,
            value: raw.to_string(),
        }),
    }
}

/// The outcome of cleaning a whole source set.
#[derive(Debug, Clone, Default)]
pub struct CleanedBatch {
    pub films: Vec<ValidFilm>,
    pub rejections: Vec<Rejection>,
}

impl CleanedBatch {
    pub fn from_records(cleaner: &FieldCleaner, records: &[FilmRecord]) -> Self {
        let mut batch = CleanedBatch::default();
        for record in records {
            match cleaner.clean(record) {
                Ok(film) => batch.films.push(film),
                Err(rejection) => batch.rejections.push(rejection),
            }
        }
        batch
    }

    /// Every actor across the valid films, each exactly once, first-seen order.
    pub fn distinct_actors(&self) -> Vec<String> {
        distinct(self.films.iter().flat_map(|f| f.actors.iter()))
    }

    /// Every director key across the valid films, each exactly once.
    pub fn distinct_directors(&self) -> Vec<String> {
        distinct(self.films.iter().flat_map(|f| f.directors.iter()))
    }
}

fn distinct<'a>(names: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .filter(|n| seen.insert(n.as_str()))
        .cloned()
        .collect()
}
