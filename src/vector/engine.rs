//! Vector search engine that orchestrates storing, deleting and searching.
//!
//! The chunk store sits behind one reader/writer lock: searches share it,
//! mutations take it exclusively. Every successful mutation bumps a
//! generation counter while still holding the write lock, and searches read
//! the counter under the read lock, so a cached result is only reused against
//! the exact snapshot it was computed from.
//!
//! # Search
//!
//! 1. Collect live candidates visible from the partition (own bucket plus the
//!    shared pool).
//! 2. Split them contiguously across an adaptive number of workers.
//! 3. Each worker scores its slice with the SIMD kernels and keeps a bounded
//!    [`TopK`] of candidates at or above the threshold.
//! 4. Merge the per-worker selectors into the final ranking.
//!
//! A panic inside any worker fails the whole search with
//! [`EngineError::WorkerFailed`]; partial rankings are never returned.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use rayon::prelude::*;
use serde::Serialize;

use crate::config::{SearchConfig, Settings};
use crate::error::{EngineError, EngineResult};
use crate::vector::cache::{CacheKey, CacheStats, SearchCache};
use crate::vector::chunk::{BigramSet, ChunkView, NewChunk};
use crate::vector::codec::{CodecError, decode_vector, decode_vector_with_dimension};
use crate::vector::query::{SearchHit, SearchRequest};
use crate::vector::simd::{KernelDispatch, KernelThresholds, SimdLevel};
use crate::vector::storage::ChunkStore;
use crate::vector::topk::TopK;
use crate::vector::types::{ChunkIndex, PartitionKey, ScoredCandidate, VectorDimension};

/// A persisted chunk row: metadata plus its encoded vector column.
#[derive(Debug, Clone)]
pub struct PersistedRow {
    pub chunk: NewChunk,
    pub vector_bytes: Vec<u8>,
}

/// Outcome of [`VectorSearchEngine::load_rows`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub skipped: usize,
}

/// Point-in-time engine statistics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineStats {
    pub dimension: Option<usize>,
    pub slots: usize,
    pub live_chunks: usize,
    pub tombstoned_chunks: usize,
    pub partitions: usize,
    pub generation: u64,
    pub arena_capacity: usize,
    pub arena_growths: usize,
    pub simd_level: SimdLevel,
    pub cache: CacheStats,
}

/// In-process similarity search over chunk embeddings.
#[derive(Debug)]
pub struct VectorSearchEngine {
    /// Arena, metadata and partition index
    store: RwLock<ChunkStore>,

    /// Bumped by every mutation, under the write lock
    generation: AtomicU64,

    /// Result cache with its own lock
    cache: SearchCache,

    /// Kernel selection shared by all workers
    kernels: KernelDispatch,

    settings: Settings,
}

impl VectorSearchEngine {
    /// Creates an engine from validated settings.
    pub fn new(settings: Settings) -> EngineResult<Self> {
        settings.validate()?;

        let dimension = settings.arena.dimension.map(VectorDimension::new).transpose()?;
        let kernels = KernelDispatch::new(KernelThresholds::from(&settings.simd));

        tracing::info!(
            "vector search engine ready: simd={}, cache capacity={}, max workers={}",
            kernels.level(),
            settings.cache.capacity,
            settings.search.max_workers
        );

        Ok(Self {
            store: RwLock::new(ChunkStore::new(settings.arena.initial_capacity, dimension)),
            generation: AtomicU64::new(0),
            cache: SearchCache::from_config(&settings.cache),
            kernels,
            settings,
        })
    }

    /// Creates an engine with default settings.
    pub fn with_defaults() -> EngineResult<Self> {
        Self::new(Settings::default())
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Current mutation generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Number of live chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.store.read().live_count()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stores a chunk and its embedding, returning the assigned index.
    pub fn store(&self, chunk: NewChunk, vector: &[f32]) -> EngineResult<ChunkIndex> {
        let mut store = self.store.write();
        let index = store.store(chunk, vector)?;
        self.bump_generation();
        tracing::debug!("stored chunk {index} (dimension {})", vector.len());
        Ok(index)
    }

    /// Stores a chunk whose embedding is still in its persisted byte form.
    ///
    /// Once the dimension is known it is used to decode instead of the
    /// byte-length heuristic.
    pub fn store_encoded(&self, chunk: NewChunk, bytes: &[u8]) -> EngineResult<ChunkIndex> {
        let mut store = self.store.write();
        let vector = decode_for(store.dimension(), bytes)?;
        let index = store.store(chunk, &vector)?;
        self.bump_generation();
        tracing::debug!("stored encoded chunk {index} ({} bytes)", bytes.len());
        Ok(index)
    }

    /// Loads persisted rows in one exclusive section.
    ///
    /// Rows that cannot be decoded or do not match the dimension are skipped
    /// with a warning. Running out of memory aborts the load; rows stored up
    /// to that point stay stored.
    pub fn load_rows(
        &self,
        rows: impl IntoIterator<Item = PersistedRow>,
    ) -> EngineResult<LoadReport> {
        let mut store = self.store.write();
        let mut report = LoadReport::default();

        let outcome = rows.into_iter().try_for_each(|row| {
            let chunk_id = row.chunk.chunk_id.clone();
            let stored = decode_for(store.dimension(), &row.vector_bytes)
                .map_err(EngineError::from)
                .and_then(|vector| store.store(row.chunk, &vector));
            match stored {
                Ok(_) => {
                    report.loaded += 1;
                    Ok(())
                }
                Err(e @ EngineError::CapacityExhausted { .. }) => Err(e),
                Err(e) => {
                    tracing::warn!("skipping persisted chunk {chunk_id}: {}", e.status_code());
                    report.skipped += 1;
                    Ok(())
                }
            }
        });

        if report.loaded > 0 {
            self.bump_generation();
        }
        tracing::info!(
            "loaded {} persisted chunks, skipped {}",
            report.loaded,
            report.skipped
        );
        outcome.map(|()| report)
    }

    /// Tombstones every chunk of a document; unknown documents are a no-op.
    ///
    /// Returns the number of chunks removed.
    pub fn delete(&self, document_id: &str) -> usize {
        let mut store = self.store.write();
        let removed = store.delete_document(document_id);
        if removed > 0 {
            self.bump_generation();
        }
        tracing::debug!("deleted {removed} chunks of document {document_id}");
        removed
    }

    /// Top-`k` chunks most similar to `query` within `partition`.
    pub fn search(
        &self,
        query: &[f32],
        partition: impl Into<PartitionKey>,
        k: usize,
        threshold: f32,
    ) -> EngineResult<Vec<SearchHit>> {
        let request = SearchRequest::new(query, k)
            .in_partition(partition)
            .with_threshold(threshold);
        self.search_with(&request)
    }

    /// Runs a fully specified search request.
    ///
    /// Results are ordered by descending score, equal scores by ascending
    /// index. No match is `Ok(vec![])`, never an error.
    pub fn search_with(&self, request: &SearchRequest) -> EngineResult<Vec<SearchHit>> {
        request.validate()?;
        if request.k == 0 {
            return Ok(Vec::new());
        }

        let store = self.store.read();
        let Some(dimension) = store.dimension() else {
            return Ok(Vec::new());
        };
        dimension.validate_vector(&request.query)?;

        let generation = self.generation();
        let key = CacheKey::from_request(request);
        if let Some(ranked) = self.cache.get(&key, generation) {
            tracing::debug!("search cache hit ({} results)", ranked.len());
            return Ok(materialize(&store, &ranked));
        }

        let candidates = store.candidates(&request.partition);
        let ranked = self.rank(&store, request, &candidates)?;
        self.cache.insert(key, ranked.clone(), generation);

        Ok(materialize(&store, &ranked))
    }

    /// Metadata snapshot of a live chunk.
    #[must_use]
    pub fn chunk(&self, index: ChunkIndex) -> Option<ChunkView> {
        self.store.read().view(index)
    }

    /// Live chunk indices of a document, ascending.
    #[must_use]
    pub fn chunks_for_document(&self, document_id: &str) -> Vec<ChunkIndex> {
        self.store.read().document_chunks(document_id)
    }

    /// Copy of a live chunk's vector.
    #[must_use]
    pub fn vector(&self, index: ChunkIndex) -> Option<Vec<f32>> {
        self.with_vector(index, <[f32]>::to_vec)
    }

    /// Runs `f` on a zero-copy view of a live chunk's vector.
    pub fn with_vector<R>(&self, index: ChunkIndex, f: impl FnOnce(&[f32]) -> R) -> Option<R> {
        self.store.read().vector(index).map(f)
    }

    /// Drops every cached search result.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Drops cached search results older than the TTL.
    pub fn purge_expired_cache(&self) -> usize {
        self.cache.purge_expired()
    }

    #[must_use]
    pub fn stats(&self) -> EngineStats {
        let store = self.store.read();
        let slots = store.slot_count();
        let live = store.live_count();
        EngineStats {
            dimension: store.dimension().map(|d| d.get()),
            slots,
            live_chunks: live,
            tombstoned_chunks: slots - live,
            partitions: store.partitions().partition_count(),
            generation: self.generation(),
            arena_capacity: store.arena().capacity(),
            arena_growths: store.arena().growth_count(),
            simd_level: self.kernels.level(),
            cache: self.cache.stats(),
        }
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Scores `candidates` and returns the merged top-k.
    fn rank(
        &self,
        store: &ChunkStore,
        request: &SearchRequest,
        candidates: &[ChunkIndex],
    ) -> EngineResult<Vec<ScoredCandidate>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let query = request.query.as_slice();
        let query_norm = self.kernels.norm(query);
        let kernels = self.kernels;
        // No more than every candidate can qualify
        let k = request.k.min(candidates.len());
        let threshold = request.threshold;
        let filter: Option<(BigramSet, f32)> = request
            .text_filter
            .as_ref()
            .map(|f| (f.bigrams(), f.min_overlap));

        let workers = worker_count(candidates.len(), &self.settings.search);
        tracing::debug!(
            "scoring {} candidates with {workers} workers (k={k}, threshold={threshold})",
            candidates.len()
        );

        let selectors = run_workers(candidates, workers, |_, slice| {
            let mut top = TopK::new(k);
            for &index in slice {
                let Some(meta) = store.meta(index) else {
                    continue;
                };
                if let Some((bigrams, min_overlap)) = &filter {
                    if meta.bigrams.dice(bigrams) < *min_overlap {
                        continue;
                    }
                }
                let Some(vector) = store.vector(index) else {
                    continue;
                };
                let score = kernels.cosine_with_norm(query, query_norm, vector);
                if score >= threshold {
                    top.offer(ScoredCandidate::new(index, score));
                }
            }
            top
        })?;

        let mut merged = TopK::new(k);
        for selector in selectors {
            merged.merge(selector);
        }
        Ok(merged.into_sorted_vec())
    }
}

/// Decodes a persisted vector, trusting a known dimension over the heuristic.
fn decode_for(dimension: Option<VectorDimension>, bytes: &[u8]) -> Result<Vec<f32>, CodecError> {
    match dimension {
        Some(dim) => decode_vector_with_dimension(bytes, dim.get()),
        None => decode_vector(bytes),
    }
}

fn materialize(store: &ChunkStore, ranked: &[ScoredCandidate]) -> Vec<SearchHit> {
    ranked
        .iter()
        .filter_map(|candidate| {
            store.meta(candidate.index).map(|meta| SearchHit {
                index: candidate.index,
                chunk_id: meta.chunk_id.clone(),
                document_id: meta.document_id.clone(),
                score: candidate.score,
                text: meta.text.clone(),
                image_ref: meta.image_ref.clone(),
            })
        })
        .collect()
}

/// Number of scoring workers for `candidates` candidates.
///
/// One worker below the parallel threshold, otherwise one per
/// `candidates_per_worker` candidates, capped at `max_workers`.
pub(crate) fn worker_count(candidates: usize, config: &SearchConfig) -> usize {
    if candidates < config.parallel_threshold {
        return 1;
    }
    candidates
        .div_ceil(config.candidates_per_worker.max(1))
        .clamp(1, config.max_workers.max(1))
}

/// Runs `work` over contiguous slices of `items`, one slice per worker.
///
/// Results come back in slice order. A panic in any worker turns into
/// `WorkerFailed` for the whole call.
pub(crate) fn run_workers<I, T, F>(items: &[I], workers: usize, work: F) -> EngineResult<Vec<T>>
where
    I: Sync,
    T: Send,
    F: Fn(usize, &[I]) -> T + Sync + Send,
{
    let guarded = |worker: usize, slice: &[I]| {
        catch_unwind(AssertUnwindSafe(|| work(worker, slice))).map_err(|payload| {
            let reason = panic_message(payload.as_ref());
            tracing::error!("search worker {worker} panicked: {reason}");
            EngineError::WorkerFailed { worker, reason }
        })
    };

    if workers <= 1 || items.len() <= 1 {
        return guarded(0, items).map(|result| vec![result]);
    }

    let slice_len = items.len().div_ceil(workers);
    items
        .par_chunks(slice_len)
        .enumerate()
        .map(|(worker, slice)| guarded(worker, slice))
        .collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
