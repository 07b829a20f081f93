pub mod analytics;
pub mod store;

pub use analytics::{FilmAnalytics, ScoreField};
pub use store::{document_key, DocumentStore};
