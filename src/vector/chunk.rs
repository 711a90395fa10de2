//! Chunk metadata kept beside each vector in the arena.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::vector::types::{ChunkIndex, PartitionKey};

/// Chunk content supplied by the ingestion pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub partition: PartitionKey,
    pub text: String,
    pub image_ref: Option<String>,
}

impl NewChunk {
    /// Chunk in the shared partition without an image.
    pub fn new(
        chunk_id: impl Into<String>,
        document_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            chunk_id: chunk_id.into(),
            document_id: document_id.into(),
            partition: PartitionKey::shared(),
            text: text.into(),
            image_ref: None,
        }
    }

    #[must_use]
    pub fn in_partition(mut self, partition: impl Into<PartitionKey>) -> Self {
        self.partition = partition.into();
        self
    }

    #[must_use]
    pub fn with_image(mut self, image_ref: impl Into<String>) -> Self {
        self.image_ref = Some(image_ref.into());
        self
    }
}

/// Set of character bigrams of a lowercased text.
///
/// Stored as sorted, deduplicated packed pairs so overlap is a linear merge.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BigramSet(Vec<u64>);

impl BigramSet {
    /// Builds the set from already lowercased text.
    #[must_use]
    pub fn from_lowercase(text: &str) -> Self {
        let chars: Vec<char> = text.chars().filter(|c| !c.is_whitespace()).collect();
        let mut grams: Vec<u64> = chars
            .windows(2)
            .map(|w| (u64::from(u32::from(w[0])) << 32) | u64::from(u32::from(w[1])))
            .collect();
        grams.sort_unstable();
        grams.dedup();
        Self(grams)
    }

    /// Builds the set from arbitrary text.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        Self::from_lowercase(&text.to_lowercase())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of bigrams present in both sets.
    #[must_use]
    pub fn intersection_len(&self, other: &Self) -> usize {
        let (mut i, mut j, mut shared) = (0, 0, 0);
        while i < self.0.len() && j < other.0.len() {
            match self.0[i].cmp(&other.0[j]) {
                std::cmp::Ordering::Less => i += 1,
                std::cmp::Ordering::Greater => j += 1,
                std::cmp::Ordering::Equal => {
                    shared += 1;
                    i += 1;
                    j += 1;
                }
            }
        }
        shared
    }

    /// Dice coefficient in `[0, 1]`; two empty sets score 0.
    #[must_use]
    pub fn dice(&self, other: &Self) -> f32 {
        let total = self.len() + other.len();
        if total == 0 {
            return 0.0;
        }
        (2 * self.intersection_len(other)) as f32 / total as f32
    }
}

/// Metadata of a stored chunk. The vector itself lives in the arena.
#[derive(Debug, Clone)]
pub struct ChunkMeta {
    pub chunk_id: String,
    pub document_id: String,
    pub partition: PartitionKey,
    pub text: String,
    pub text_lower: String,
    pub bigrams: BigramSet,
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ChunkMeta {
    /// Derives the lowercased text and bigram set from ingested content.
    #[must_use]
    pub fn from_new(chunk: NewChunk) -> Self {
        let text_lower = chunk.text.to_lowercase();
        let bigrams = BigramSet::from_lowercase(&text_lower);
        Self {
            chunk_id: chunk.chunk_id,
            document_id: chunk.document_id,
            partition: chunk.partition,
            text: chunk.text,
            text_lower,
            bigrams,
            image_ref: chunk.image_ref,
            created_at: Utc::now(),
        }
    }

    /// Owned snapshot for callers outside the store lock.
    #[must_use]
    pub fn view(&self, index: ChunkIndex) -> ChunkView {
        ChunkView {
            index,
            chunk_id: self.chunk_id.clone(),
            document_id: self.document_id.clone(),
            partition: self.partition.clone(),
            text: self.text.clone(),
            image_ref: self.image_ref.clone(),
            created_at: self.created_at,
        }
    }
}

/// Snapshot of a live chunk's metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkView {
    pub index: ChunkIndex,
    pub chunk_id: String,
    pub document_id: String,
    pub partition: PartitionKey,
    pub text: String,
    pub image_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}
