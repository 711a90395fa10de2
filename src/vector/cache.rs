//! Query result cache.
//!
//! Entries are keyed by an FNV-1a hash over a prefix of the query bit
//! pattern plus the other search parameters. A hash hit is only trusted after
//! the full key stored in the entry compares equal, so a collision degrades to
//! a miss instead of a wrong answer.
//!
//! Every entry is tagged with the store generation it was computed against.
//! Lookups carrying a different generation purge the entry. Independently of
//! LRU pressure, entries older than the TTL are dropped on access or by
//! [`SearchCache::purge_expired`].
//!
//! The cache has its own mutex, separate from the store lock.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

use crate::config::CacheConfig;
use crate::vector::query::SearchRequest;
use crate::vector::types::{PartitionKey, ScoredCandidate};

/// Number of leading query components fed into the hash.
pub const HASH_PREFIX_LEN: usize = 16;

/// FNV-1a hash function for good distribution
fn fnv1a_hash(data: &[u8], mut hash: u64) -> u64 {
    const FNV_PRIME: u64 = 0x100000001b3;

    for byte in data {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

const FNV_OFFSET_BASIS: u64 = 0xcbf29ce484222325;

/// Full identity of a cached search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKey {
    query_bits: Vec<u32>,
    k: usize,
    threshold_bits: u32,
    partition: PartitionKey,
    filter: Option<(String, u32)>,
}

impl CacheKey {
    #[must_use]
    pub fn from_request(request: &SearchRequest) -> Self {
        Self {
            query_bits: request.query.iter().map(|v| v.to_bits()).collect(),
            k: request.k,
            threshold_bits: request.threshold.to_bits(),
            partition: request.partition.clone(),
            filter: request
                .text_filter
                .as_ref()
                .map(|f| (f.text.clone(), f.min_overlap.to_bits())),
        }
    }

    /// Hash over the query prefix and every scalar parameter.
    #[must_use]
    pub fn hash(&self) -> u64 {
        let mut hash = FNV_OFFSET_BASIS;
        for bits in self.query_bits.iter().take(HASH_PREFIX_LEN) {
            hash = fnv1a_hash(&bits.to_le_bytes(), hash);
        }
        hash = fnv1a_hash(&(self.query_bits.len() as u64).to_le_bytes(), hash);
        hash = fnv1a_hash(&(self.k as u64).to_le_bytes(), hash);
        hash = fnv1a_hash(&self.threshold_bits.to_le_bytes(), hash);
        hash = fnv1a_hash(self.partition.as_str().as_bytes(), hash);
        // Separator so ("ab", None) and ("a", Some("b")) differ
        hash = fnv1a_hash(&[0xff], hash);
        if let Some((text, overlap)) = &self.filter {
            hash = fnv1a_hash(text.as_bytes(), hash);
            hash = fnv1a_hash(&overlap.to_le_bytes(), hash);
        }
        hash
    }
}

#[derive(Debug, Clone)]
struct CachedSearch {
    key: CacheKey,
    results: Vec<ScoredCandidate>,
    generation: u64,
    created: Instant,
}

enum Lookup {
    Hit(Vec<ScoredCandidate>),
    Absent,
    Collision,
    Stale,
    Expired,
}

/// Counters and occupancy of a [`SearchCache`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub entries: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
    pub expirations: u64,
    pub collisions: u64,
}

/// LRU + TTL cache of ranked candidate lists.
#[derive(Debug)]
pub struct SearchCache {
    /// `None` when caching is disabled.
    entries: Option<Mutex<LruCache<u64, CachedSearch>>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
    invalidations: AtomicU64,
    expirations: AtomicU64,
    collisions: AtomicU64,
}

impl SearchCache {
    /// Creates a cache; a capacity of zero disables it.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            collisions: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.capacity, config.ttl())
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.entries.is_some()
    }

    /// Returns the cached candidates for `key` computed at `generation`.
    pub fn get(&self, key: &CacheKey, generation: u64) -> Option<Vec<ScoredCandidate>> {
        let entries = self.entries.as_ref()?;
        let hash = key.hash();
        let mut entries = entries.lock();

        let lookup = match entries.get(&hash) {
            None => Lookup::Absent,
            Some(entry) if entry.key != *key => Lookup::Collision,
            Some(entry) if entry.generation != generation => Lookup::Stale,
            Some(entry) if entry.created.elapsed() > self.ttl => Lookup::Expired,
            Some(entry) => Lookup::Hit(entry.results.clone()),
        };

        match lookup {
            Lookup::Hit(results) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                return Some(results);
            }
            Lookup::Absent => {}
            Lookup::Collision => {
                self.collisions.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("search cache collision on hash {hash:#018x}");
            }
            Lookup::Stale => {
                entries.pop(&hash);
                self.invalidations.fetch_add(1, Ordering::Relaxed);
            }
            Lookup::Expired => {
                entries.pop(&hash);
                self.expirations.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Stores candidates computed at `generation`.
    pub fn insert(&self, key: CacheKey, results: Vec<ScoredCandidate>, generation: u64) {
        let Some(entries) = self.entries.as_ref() else {
            return;
        };
        let hash = key.hash();
        let entry = CachedSearch {
            key,
            results,
            generation,
            created: Instant::now(),
        };
        if let Some((evicted, _)) = entries.lock().push(hash, entry) {
            if evicted != hash {
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Drops every entry older than the TTL and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let Some(entries) = self.entries.as_ref() else {
            return 0;
        };
        let mut entries = entries.lock();
        let expired: Vec<u64> = entries
            .iter()
            .filter(|(_, entry)| entry.created.elapsed() > self.ttl)
            .map(|(hash, _)| *hash)
            .collect();
        for hash in &expired {
            entries.pop(hash);
        }
        self.expirations
            .fetch_add(expired.len() as u64, Ordering::Relaxed);
        if !expired.is_empty() {
            tracing::warn!("purged {} expired search cache entries", expired.len());
        }
        expired.len()
    }

    /// Removes every entry. Counters are kept.
    pub fn clear(&self) {
        if let Some(entries) = self.entries.as_ref() {
            entries.lock().clear();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.lock().len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        let (entries, capacity) = match self.entries.as_ref() {
            Some(entries) => {
                let entries = entries.lock();
                (entries.len(), entries.cap().get())
            }
            None => (0, 0),
        };
        CacheStats {
            enabled: self.is_enabled(),
            entries,
            capacity,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            collisions: self.collisions.load(Ordering::Relaxed),
        }
    }
}
