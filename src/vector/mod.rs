//! Vector storage and similarity search for retrieval-augmented generation.
//!
//! This module keeps chunk embeddings in one contiguous arena, scopes them by
//! partition, and answers top-k cosine similarity queries with SIMD kernels
//! fanned out over a worker pool.
//!
//! # Performance Targets
//! - Vector access: one bounds check, no allocation
//! - Memory usage: 4 bytes per dimension per chunk plus metadata
//! - Search latency: linear in the partition size, parallel above a threshold
//!
//! # Architecture
//! - [`VectorArena`] owns every vector; chunks are addressed by [`ChunkIndex`]
//! - [`ChunkStore`] pairs the arena with metadata, tombstones and the
//!   [`PartitionIndex`]
//! - [`VectorSearchEngine`] guards the store with a reader/writer lock, runs the
//!   scoring workers and consults the [`SearchCache`]
//! - [`codec`] reads and writes the persisted vector column

mod arena;
mod cache;
mod chunk;
pub mod codec;
mod engine;
mod partition;
mod query;
pub mod simd;
mod storage;
mod topk;
mod types;

// Re-export core types for public API
pub use arena::VectorArena;
pub use cache::{CacheKey, CacheStats, HASH_PREFIX_LEN, SearchCache};
pub use chunk::{BigramSet, ChunkMeta, ChunkView, NewChunk};
pub use codec::{
    CodecError, ElementLayout, KNOWN_EMBEDDING_DIMENSIONS, decode_vector,
    decode_vector_with_dimension, detect_layout, encode_vector, encode_vector_legacy,
};
pub use engine::{EngineStats, LoadReport, PersistedRow, VectorSearchEngine};
pub use partition::PartitionIndex;
pub use query::{SearchHit, SearchRequest, TextFilter};
pub use simd::{KernelDispatch, SimdLevel, cosine_similarity, dot_product, l2_normalize};
pub use storage::ChunkStore;
pub use topk::TopK;
pub use types::{ChunkIndex, PartitionKey, ScoredCandidate, VectorDimension};
