//! Search request types.

use serde::Serialize;

use crate::error::{EngineError, EngineResult};
use crate::vector::chunk::BigramSet;
use crate::vector::types::{ChunkIndex, PartitionKey};

/// Lexical pre-filter applied before vector scoring.
///
/// Candidates whose bigram Dice coefficient against `text` is below
/// `min_overlap` are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFilter {
    pub text: String,
    pub min_overlap: f32,
}

impl TextFilter {
    pub fn new(text: impl Into<String>, min_overlap: f32) -> Self {
        Self {
            text: text.into(),
            min_overlap,
        }
    }

    /// Bigrams of the filter text, computed once per search.
    #[must_use]
    pub fn bigrams(&self) -> BigramSet {
        BigramSet::from_text(&self.text)
    }
}

/// A similarity search against one partition (plus the shared pool).
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Vec<f32>,
    pub partition: PartitionKey,
    pub k: usize,
    pub threshold: f32,
    pub text_filter: Option<TextFilter>,
}

impl SearchRequest {
    /// Request over the shared pool with threshold 0.
    pub fn new(query: impl Into<Vec<f32>>, k: usize) -> Self {
        Self {
            query: query.into(),
            partition: PartitionKey::shared(),
            k,
            threshold: 0.0,
            text_filter: None,
        }
    }

    #[must_use]
    pub fn in_partition(mut self, partition: impl Into<PartitionKey>) -> Self {
        self.partition = partition.into();
        self
    }

    /// Sets `k` from a signed count, as supplied by callers outside Rust.
    ///
    /// Zero and negative counts are rejected with `InvalidTopK`.
    pub fn try_with_k(mut self, k: i64) -> EngineResult<Self> {
        if k <= 0 {
            return Err(EngineError::InvalidTopK { k });
        }
        self.k = usize::try_from(k).unwrap_or(usize::MAX);
        Ok(self)
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_text_filter(mut self, filter: TextFilter) -> Self {
        self.text_filter = Some(filter);
        self
    }

    /// Checks the parts of the request that do not depend on stored data.
    pub fn validate(&self) -> EngineResult<()> {
        if self.threshold.is_nan() {
            return Err(EngineError::InvalidThreshold {
                value: self.threshold,
            });
        }
        if let Some(filter) = &self.text_filter {
            if filter.min_overlap.is_nan() {
                return Err(EngineError::InvalidThreshold {
                    value: filter.min_overlap,
                });
            }
        }
        Ok(())
    }
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub index: ChunkIndex,
    pub chunk_id: String,
    pub document_id: String,
    pub score: f32,
    pub text: String,
    pub image_ref: Option<String>,
}
