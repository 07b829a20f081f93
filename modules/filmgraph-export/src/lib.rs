pub mod cleaner;
pub mod import;
pub mod pipeline;
pub mod queries;
pub mod stores;
pub mod traits;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use cleaner::{CleanedBatch, FieldCleaner, RejectReason, Rejection, ValidFilm};
pub use pipeline::{ExportStats, Pipeline, PipelineState, RunSummary, Stage};
pub use stores::Stores;
pub use traits::{FilmSource, GraphSink};
