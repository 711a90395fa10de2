//! Type-safe wrappers and core types for vector search functionality.
//!
//! This module provides newtypes following the project's strict type safety
//! guidelines. Chunk handles are plain integers into the arena, never
//! references into the buffer, so growth can never leave one dangling.

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;

use crate::error::EngineError;

/// Position of a chunk in the vector arena.
///
/// Indices are assigned in store order and stay valid for the lifetime of the
/// chunk; deleting other chunks or growing the arena never renumbers them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ChunkIndex(u32);

impl ChunkIndex {
    /// Creates a new `ChunkIndex`.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the underlying u32 value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize` for slice addressing.
    #[must_use]
    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ChunkIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical partition (tenant or product scope) a chunk belongs to.
///
/// The empty key is the shared pool: chunks stored under it are visible to
/// searches in every partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// Creates a partition key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The shared pool key.
    #[must_use]
    pub fn shared() -> Self {
        Self(String::new())
    }

    /// Whether this key denotes the shared pool.
    #[must_use]
    pub fn is_shared(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PartitionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for PartitionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_shared() {
            write!(f, "<shared>")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Type-safe wrapper for vector dimensions.
///
/// Ensures runtime validation of vector dimensions to prevent
/// dimension mismatches during operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VectorDimension(usize);

impl VectorDimension {
    /// Creates a new `VectorDimension` with validation.
    ///
    /// Returns an error if the dimension is zero.
    pub fn new(dim: usize) -> Result<Self, EngineError> {
        if dim == 0 {
            return Err(EngineError::InvalidDimension {
                dimension: 0,
                reason: "Vector dimension cannot be zero",
            });
        }
        Ok(Self(dim))
    }

    /// Returns the underlying dimension value.
    #[must_use]
    pub const fn get(&self) -> usize {
        self.0
    }

    /// Validates that a vector has the expected dimension.
    pub fn validate_vector(&self, vector: &[f32]) -> Result<(), EngineError> {
        if vector.len() != self.0 {
            return Err(EngineError::DimensionMismatch {
                expected: self.0,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

/// Transient (index, score) pair produced by a scoring worker.
///
/// Ordered so that `a > b` means `a` ranks ahead of `b`: higher score first,
/// equal scores broken by the lower index.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate {
    pub index: ChunkIndex,
    pub score: f32,
}

impl ScoredCandidate {
    #[must_use]
    pub const fn new(index: ChunkIndex, score: f32) -> Self {
        Self { index, score }
    }

    /// Whether `self` ranks strictly ahead of `other`.
    #[inline]
    #[must_use]
    pub fn outranks(&self, other: &Self) -> bool {
        self.rank_cmp(other) == Ordering::Greater
    }

    /// Total ranking order used by workers, the merge and the final sort.
    #[inline]
    #[must_use]
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.index.cmp(&self.index))
    }
}
