use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// --- Source side ---

/// A flat film document as stored in the document store.
///
/// Every field is optional and lenient: numbers stored as JSON numbers and
/// numbers stored as strings both land here as `Some(String)`. Typing is the
/// field cleaner's job, not the loader's.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilmRecord {
    /// Primary key of the source document. Lives outside the JSON body.
    #[serde(skip)]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub year: Option<String>,
    #[serde(rename = "Runtime (Minutes)", default, deserialize_with = "lenient_string")]
    pub runtime: Option<String>,
    #[serde(rename = "Revenue (Millions)", default, deserialize_with = "lenient_string")]
    pub revenue: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub rating: Option<String>,
    #[serde(rename = "Metascore", default, deserialize_with = "lenient_string")]
    pub metascore: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub genre: Option<String>,
    #[serde(rename = "Director", default, deserialize_with = "lenient_string")]
    pub director: Option<String>,
    #[serde(rename = "Actors", default, deserialize_with = "lenient_string")]
    pub actors: Option<String>,
    #[serde(rename = "Votes", default, deserialize_with = "lenient_string")]
    pub votes: Option<String>,
}

impl FilmRecord {
    /// Decode a stored JSON document, attaching the primary key it was stored under.
    pub fn from_document(id: impl Into<String>, doc: Value) -> Result<Self, serde_json::Error> {
        let mut record: FilmRecord = serde_json::from_value(doc)?;
        record.id = id.into();
        Ok(record)
    }

    /// Title for log lines; falls back to the id when the title is missing.
    pub fn display_title(&self) -> &str {
        match self.title.as_deref() {
            Some(t) if !t.trim().is_empty() => t,
            _ => &self.id,
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Array(_)) | Some(Value::Object(_)) => None,
    })
}

// --- Graph side ---

/// Typed payload for a `:Film` node, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmNode {
    pub id: String,
    pub title: String,
    pub year: i64,
    pub votes: i64,
    /// Millions.
    pub revenue: f64,
    pub rating: f64,
    /// Raw director string as stored in the source.
    pub director: String,
    /// Raw comma-separated genre string.
    pub genre: String,
}

/// Person node kinds that hang off a film.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonKind {
    Actor,
    Director,
}

impl PersonKind {
    pub fn label(self) -> &'static str {
        match self {
            PersonKind::Actor => "Actor",
            PersonKind::Director => "Director",
        }
    }
}

/// Person→Film edge kinds written by the projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationKind {
    ActedIn,
    Directed,
}

impl RelationKind {
    pub fn rel_type(self) -> &'static str {
        match self {
            RelationKind::ActedIn => "ACTED_IN",
            RelationKind::Directed => "DIRECTED",
        }
    }

    /// Label of the node the edge starts from.
    pub fn source(self) -> PersonKind {
        match self {
            RelationKind::ActedIn => PersonKind::Actor,
            RelationKind::Directed => PersonKind::Director,
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.rel_type())
    }
}

/// How a director string becomes Director node keys.
///
/// `Split` breaks co-directed credits ("A, B") into one key per person and is
/// applied everywhere directors are keyed or counted. `Raw` keeps the source
/// string exactly as stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DirectorKeyPolicy {
    #[default]
    Split,
    Raw,
}

impl FromStr for DirectorKeyPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "split" => Ok(DirectorKeyPolicy::Split),
            "raw" => Ok(DirectorKeyPolicy::Raw),
            other => Err(format!("unknown director key policy '{other}' (expected split|raw)")),
        }
    }
}

impl fmt::Display for DirectorKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectorKeyPolicy::Split => f.write_str("split"),
            DirectorKeyPolicy::Raw => f.write_str("raw"),
        }
    }
}

/// Split a comma-separated multi-value field into trimmed, non-empty,
/// first-seen-unique names.
pub fn split_names(raw: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for token in raw.split(',') {
        let name = token.trim();
        if name.is_empty() || out.iter().any(|n| n == name) {
            continue;
        }
        out.push(name.to_string());
    }
    out
}
