pub mod client;
pub mod migrate;
pub mod reader;
pub mod writer;

#[cfg(feature = "test-utils")]
pub mod testutil;

pub use client::GraphClient;
pub use reader::{Collaboration, GraphCounts, GraphReader, Recommendation};
pub use writer::{DirectorRelation, GraphWriter};
