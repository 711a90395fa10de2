//! In-process vector similarity search for retrieval-augmented generation.
//!
//! ```no_run
//! use ragvec::{NewChunk, Settings, VectorSearchEngine};
//!
//! # fn main() -> ragvec::EngineResult<()> {
//! let settings = Settings::default();
//! ragvec::logging::init_from(&settings);
//! let engine = VectorSearchEngine::new(settings)?;
//! engine.store(NewChunk::new("c1", "doc-1", "Refunds take 5 days"), &[0.1, 0.9, 0.0])?;
//! let hits = engine.search(&[0.1, 0.8, 0.1], "", 5, 0.2)?;
//! # let _ = hits;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod vector;

// Explicit exports for better API clarity
pub use config::Settings;
pub use error::{EngineError, EngineResult};
pub use vector::{
    ChunkIndex, ChunkView, EngineStats, LoadReport, NewChunk, PartitionKey, PersistedRow,
    SearchHit, SearchRequest, TextFilter, VectorSearchEngine,
};
