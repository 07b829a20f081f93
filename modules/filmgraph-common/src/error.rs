use thiserror::Error;

use crate::types::RelationKind;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum FilmGraphError {
    /// A source record is not exportable. Non-fatal.
    #[error("Validation error for '{title}': {reason}")]
    Validation { title: String, reason: String },

    /// A store could not be reached at startup. Fatal.
    #[error("Cannot reach {store} store: {source}")]
    Connectivity {
        store: &'static str,
        #[source]
        source: BoxError,
    },

    /// A single upsert/merge failed mid-run. Non-fatal.
    #[error("Write failed for {key}: {source}")]
    Write {
        key: String,
        #[source]
        source: BoxError,
    },

    /// An edge endpoint did not exist. Non-fatal.
    #[error("Dangling {kind} reference: '{from}' -> film {film_id}")]
    DanglingReference {
        kind: RelationKind,
        from: String,
        film_id: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl FilmGraphError {
    pub fn connectivity(
        store: &'static str,
        source: impl Into<BoxError>,
    ) -> Self {
        FilmGraphError::Connectivity {
            store,
            source: source.into(),
        }
    }

    pub fn write(key: impl Into<String>, source: impl Into<BoxError>) -> Self {
        FilmGraphError::Write {
            key: key.into(),
            source: source.into(),
        }
    }

    /// Whether the run must stop. Only startup problems are fatal.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            FilmGraphError::Connectivity { .. } | FilmGraphError::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_startup_errors_are_fatal() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        assert!(FilmGraphError::connectivity("graph", io).is_fatal());
        assert!(FilmGraphError::Config("NEO4J_URI".into()).is_fatal());

        let dangling = FilmGraphError::DanglingReference {
            kind: RelationKind::ActedIn,
            from: "X".into(),
            film_id: "f1".into(),
        };
        assert!(!dangling.is_fatal());
        assert_eq!(dangling.to_string(), "Dangling ACTED_IN reference: 'X' -> film f1");
    }

    #[test]
    fn connectivity_keeps_underlying_cause() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err = FilmGraphError::connectivity("document", io);
        assert_eq!(err.to_string(), "Cannot reach document store: refused");
        assert!(std::error::Error::source(&err).is_some());
    }
}
