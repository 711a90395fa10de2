//! Chunk store: the system of record for vectors and their metadata.
//!
//! The arena and the metadata array are kept in 1:1 correspondence: slot `i`
//! of `chunks` describes vector `i` of the arena. Deleted chunks are
//! tombstoned in place; slots are never compacted, so indices held by the
//! partition index or the result cache stay valid.

use std::collections::HashMap;

use crate::error::EngineResult;
use crate::vector::arena::VectorArena;
use crate::vector::chunk::{ChunkMeta, ChunkView, NewChunk};
use crate::vector::partition::PartitionIndex;
use crate::vector::types::{ChunkIndex, PartitionKey, VectorDimension};

/// Vectors, metadata, tombstones and the partition index behind one lock.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    arena: VectorArena,

    /// Metadata per arena slot.
    chunks: Vec<ChunkMeta>,

    /// Tombstone flag per arena slot.
    deleted: Vec<bool>,

    /// Live indices per parent document.
    by_document: HashMap<String, Vec<ChunkIndex>>,

    partitions: PartitionIndex,

    live: usize,
}

impl ChunkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(initial_capacity: usize, dimension: Option<VectorDimension>) -> Self {
        Self {
            arena: VectorArena::new(initial_capacity, dimension),
            chunks: Vec::new(),
            deleted: Vec::new(),
            by_document: HashMap::new(),
            partitions: PartitionIndex::new(),
            live: 0,
        }
    }

    /// Appends a chunk and its vector, registering it in its partition.
    ///
    /// Nothing is recorded if the vector is rejected.
    pub fn store(&mut self, chunk: NewChunk, vector: &[f32]) -> EngineResult<ChunkIndex> {
        let index = self.arena.push(vector)?;
        let meta = ChunkMeta::from_new(chunk);

        self.partitions.insert(&meta.partition, index);
        self.by_document
            .entry(meta.document_id.clone())
            .or_default()
            .push(index);
        self.chunks.push(meta);
        self.deleted.push(false);
        self.live += 1;

        debug_assert_eq!(self.chunks.len(), self.arena.len());
        Ok(index)
    }

    /// Tombstones every chunk of `document_id` and returns how many were removed.
    ///
    /// Unknown documents remove nothing.
    pub fn delete_document(&mut self, document_id: &str) -> usize {
        let Some(indices) = self.by_document.remove(document_id) else {
            return 0;
        };

        let mut per_partition: HashMap<PartitionKey, Vec<ChunkIndex>> = HashMap::new();
        for index in &indices {
            let slot = index.as_usize();
            self.deleted[slot] = true;
            per_partition
                .entry(self.chunks[slot].partition.clone())
                .or_default()
                .push(*index);
        }
        for (partition, removed) in per_partition {
            self.partitions.remove(&partition, &removed);
        }

        self.live -= indices.len();
        indices.len()
    }

    /// Whether `index` refers to a stored, non-deleted chunk.
    #[inline]
    #[must_use]
    pub fn is_live(&self, index: ChunkIndex) -> bool {
        self.deleted.get(index.as_usize()).is_some_and(|d| !d)
    }

    /// Zero-copy view of a live chunk's vector.
    #[inline]
    #[must_use]
    pub fn vector(&self, index: ChunkIndex) -> Option<&[f32]> {
        if !self.is_live(index) {
            return None;
        }
        self.arena.get(index)
    }

    /// Metadata of a live chunk.
    #[must_use]
    pub fn meta(&self, index: ChunkIndex) -> Option<&ChunkMeta> {
        if !self.is_live(index) {
            return None;
        }
        self.chunks.get(index.as_usize())
    }

    /// Owned snapshot of a live chunk.
    #[must_use]
    pub fn view(&self, index: ChunkIndex) -> Option<ChunkView> {
        self.meta(index).map(|meta| meta.view(index))
    }

    /// Live indices belonging to `document_id`, ascending.
    #[must_use]
    pub fn document_chunks(&self, document_id: &str) -> Vec<ChunkIndex> {
        self.by_document.get(document_id).cloned().unwrap_or_default()
    }

    /// Live indices visible from `partition`, ascending.
    #[must_use]
    pub fn candidates(&self, partition: &PartitionKey) -> Vec<ChunkIndex> {
        let mut candidates = self.partitions.candidates(partition);
        candidates.retain(|i| self.is_live(*i));
        candidates
    }

    #[must_use]
    pub fn dimension(&self) -> Option<VectorDimension> {
        self.arena.dimension()
    }

    #[must_use]
    pub fn arena(&self) -> &VectorArena {
        &self.arena
    }

    #[must_use]
    pub fn partitions(&self) -> &PartitionIndex {
        &self.partitions
    }

    /// Number of live chunks.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Number of slots ever assigned, tombstoned ones included.
    #[must_use]
    pub fn slot_count(&self) -> usize {
        self.chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, doc: &str, partition: &str) -> NewChunk {
        NewChunk::new(id, doc, format!("text of {id}")).in_partition(partition)
    }

    #[test]
    fn test_store_and_read_back() {
        let mut store = ChunkStore::new(4, None);
        let a = store.store(chunk("c1", "d1", ""), &[1.0, 0.0]).unwrap();
        let b = store.store(chunk("c2", "d1", "p"), &[0.0, 1.0]).unwrap();

        assert_eq!(store.vector(a).unwrap(), &[1.0, 0.0]);
        assert_eq!(store.vector(b).unwrap(), &[0.0, 1.0]);
        assert_eq!(store.meta(b).unwrap().chunk_id, "c2");
        assert_eq!(store.live_count(), 2);
        assert_eq!(store.document_chunks("d1"), vec![a, b]);
    }

    #[test]
    fn test_rejected_vector_leaves_no_trace() {
        let mut store = ChunkStore::new(4, None);
        store.store(chunk("c1", "d1", ""), &[1.0, 0.0]).unwrap();
        assert!(store.store(chunk("c2", "d2", "p"), &[1.0]).is_err());

        assert_eq!(store.slot_count(), 1);
        assert!(store.document_chunks("d2").is_empty());
        assert_eq!(store.partitions().partition_count(), 0);
    }

    #[test]
    fn test_delete_tombstones_without_renumbering() {
        let mut store = ChunkStore::new(4, None);
        let a = store.store(chunk("c1", "d1", "p"), &[1.0, 0.0]).unwrap();
        let b = store.store(chunk("c2", "d2", "p"), &[0.0, 1.0]).unwrap();
        let c = store.store(chunk("c3", "d1", ""), &[1.0, 1.0]).unwrap();

        assert_eq!(store.delete_document("d1"), 2);
        assert!(!store.is_live(a));
        assert!(!store.is_live(c));
        assert!(store.vector(a).is_none());
        assert!(store.meta(c).is_none());

        // Survivor keeps its index and data
        assert_eq!(store.vector(b).unwrap(), &[0.0, 1.0]);
        assert_eq!(store.candidates(&PartitionKey::from("p")), vec![b]);
        assert_eq!(store.live_count(), 1);
        assert_eq!(store.slot_count(), 3);
        assert!(store.is_live(b));
    }

    #[test]
    fn test_delete_unknown_document_is_noop() {
        let mut store = ChunkStore::new(4, None);
        store.store(chunk("c1", "d1", ""), &[1.0]).unwrap();
        assert_eq!(store.delete_document("missing"), 0);
        assert_eq!(store.delete_document("d1"), 1);
        assert_eq!(store.delete_document("d1"), 0);
    }
}
