//! Contiguous vector arena.
//!
//! All vectors live in one owned `Vec<f32>`: vector `i` occupies
//! `data[i * dim .. i * dim + dim]`. The dimension is fixed by the first
//! stored vector (or up front from configuration). When the buffer is full it
//! grows by doubling, copying into a fresh allocation; indices never change.
//!
//! # Performance Characteristics
//!
//! - Append: O(1) amortized
//! - Vector access: one bounds check, no allocation
//! - Memory usage: 4 bytes per dimension per vector, plus at most 2x slack

use crate::error::{EngineError, EngineResult};
use crate::vector::types::{ChunkIndex, VectorDimension};

/// Owner of every stored vector.
#[derive(Debug, Clone)]
pub struct VectorArena {
    /// Flat vector data.
    data: Vec<f32>,

    /// Dimension shared by all vectors, unset until the first append.
    dimension: Option<VectorDimension>,

    /// Number of vectors stored.
    count: usize,

    /// Vectors to reserve room for on the first append.
    initial_capacity: usize,

    /// Number of reallocations performed so far.
    growths: usize,
}

impl VectorArena {
    /// Creates an empty arena.
    ///
    /// # Arguments
    /// * `initial_capacity` - Vectors to reserve room for on the first append
    /// * `dimension` - Fixed dimension, or `None` to take it from the first vector
    #[must_use]
    pub fn new(initial_capacity: usize, dimension: Option<VectorDimension>) -> Self {
        Self {
            data: Vec::new(),
            dimension,
            count: 0,
            initial_capacity: initial_capacity.max(1),
            growths: 0,
        }
    }

    /// The established dimension, if any vector has been stored or one was configured.
    #[must_use]
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.dimension
    }

    /// Number of vectors stored, tombstoned ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of vectors that fit before the next reallocation.
    #[must_use]
    pub fn capacity(&self) -> usize {
        match self.dimension {
            Some(dim) => self.data.capacity() / dim.get(),
            None => 0,
        }
    }

    /// Number of reallocations performed so far.
    #[must_use]
    pub fn growth_count(&self) -> usize {
        self.growths
    }

    /// Appends a vector and returns its index.
    ///
    /// Fails with `DimensionMismatch` if the vector does not match the
    /// established dimension, `InvalidDimension` for an empty first vector,
    /// and `CapacityExhausted` if the buffer cannot grow.
    pub fn push(&mut self, vector: &[f32]) -> EngineResult<ChunkIndex> {
        let dimension = match self.dimension {
            Some(dim) => {
                dim.validate_vector(vector)?;
                dim
            }
            None => {
                let dim = VectorDimension::new(vector.len())?;
                self.dimension = Some(dim);
                dim
            }
        };

        let index = u32::try_from(self.count).map_err(|_| EngineError::CapacityExhausted {
            requested_vectors: self.count + 1,
            dimension: dimension.get(),
        })?;

        self.ensure_room_for_one(dimension)?;
        self.data.extend_from_slice(vector);
        self.count += 1;

        Ok(ChunkIndex::new(index))
    }

    /// Zero-copy view of the vector at `index`.
    ///
    /// Returns `None` for indices that were never assigned.
    #[inline]
    #[must_use]
    pub fn get(&self, index: ChunkIndex) -> Option<&[f32]> {
        let dim = self.dimension?.get();
        let start = index.as_usize().checked_mul(dim)?;
        let end = start.checked_add(dim)?;
        self.data.get(start..end)
    }

    /// Grows the buffer by doubling when the next vector does not fit.
    fn ensure_room_for_one(&mut self, dimension: VectorDimension) -> EngineResult<()> {
        let dim = dimension.get();
        let needed = self.data.len() + dim;
        if needed <= self.data.capacity() {
            return Ok(());
        }

        let current_vectors = self.data.capacity() / dim;
        let target_vectors = if current_vectors == 0 {
            self.initial_capacity
        } else {
            current_vectors.saturating_mul(2)
        }
        .max(self.count + 1);

        let exhausted = || EngineError::CapacityExhausted {
            requested_vectors: target_vectors,
            dimension: dim,
        };
        let target_len = target_vectors.checked_mul(dim).ok_or_else(exhausted)?;

        let mut grown: Vec<f32> = Vec::new();
        grown.try_reserve_exact(target_len).map_err(|_| exhausted())?;
        grown.extend_from_slice(&self.data);
        self.data = grown;
        self.growths += 1;

        tracing::debug!(
            "vector arena grew to {} vectors (dimension {}, growth #{})",
            target_vectors,
            dim,
            self.growths
        );
        Ok(())
    }
}
