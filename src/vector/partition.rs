//! Partition index: which chunk indices each partition can see.
//!
//! Every bucket keeps its indices in ascending order. Since indices are
//! handed out in increasing order, inserts are appends.

use std::collections::HashMap;

use crate::vector::types::{ChunkIndex, PartitionKey};

/// Mapping from partition key to the chunk indices stored under it.
///
/// The shared bucket (empty key) is kept apart because every search reads it.
#[derive(Debug, Clone, Default)]
pub struct PartitionIndex {
    buckets: HashMap<PartitionKey, Vec<ChunkIndex>>,
    shared: Vec<ChunkIndex>,
}

impl PartitionIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `index` under `partition`.
    pub fn insert(&mut self, partition: &PartitionKey, index: ChunkIndex) {
        let bucket = if partition.is_shared() {
            &mut self.shared
        } else {
            self.buckets.entry(partition.clone()).or_default()
        };
        match bucket.last() {
            Some(last) if *last >= index => {
                if let Err(pos) = bucket.binary_search(&index) {
                    bucket.insert(pos, index);
                }
            }
            _ => bucket.push(index),
        }
    }

    /// Removes `indices` from `partition`, dropping the bucket once empty.
    pub fn remove(&mut self, partition: &PartitionKey, indices: &[ChunkIndex]) {
        if indices.is_empty() {
            return;
        }
        let mut doomed = indices.to_vec();
        doomed.sort_unstable();
        let keep = |i: &ChunkIndex| doomed.binary_search(i).is_err();

        if partition.is_shared() {
            self.shared.retain(keep);
            return;
        }
        if let Some(bucket) = self.buckets.get_mut(partition) {
            bucket.retain(keep);
            if bucket.is_empty() {
                self.buckets.remove(partition);
            }
        }
    }

    /// Indices visible from `partition`: its own bucket merged with the shared one.
    ///
    /// The result is ascending and free of duplicates.
    #[must_use]
    pub fn candidates(&self, partition: &PartitionKey) -> Vec<ChunkIndex> {
        let own = self.bucket(partition);
        if partition.is_shared() {
            return own.to_vec();
        }
        merge_ascending(own, &self.shared)
    }

    /// Indices stored directly under `partition`.
    #[must_use]
    pub fn bucket(&self, partition: &PartitionKey) -> &[ChunkIndex] {
        if partition.is_shared() {
            return &self.shared;
        }
        self.buckets.get(partition).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of named (non-shared) partitions with at least one chunk.
    #[must_use]
    pub fn partition_count(&self) -> usize {
        self.buckets.len()
    }
}

fn merge_ascending(a: &[ChunkIndex], b: &[ChunkIndex]) -> Vec<ChunkIndex> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i] < b[j] {
            out.push(a[i]);
            i += 1;
        } else if b[j] < a[i] {
            out.push(b[j]);
            j += 1;
        } else {
            out.push(a[i]);
            i += 1;
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
