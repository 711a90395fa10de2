//! Search ranking against a brute-force reference

use rand::Rng;
use ragvec::vector::cosine_similarity;
use ragvec::{NewChunk, Settings, VectorSearchEngine};

fn random_vector(rng: &mut impl Rng, dim: usize) -> Vec<f32> {
    (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect()
}

fn engine_with_workers(parallel_threshold: usize, per_worker: usize) -> VectorSearchEngine {
    let mut settings = Settings::default();
    settings.search.parallel_threshold = parallel_threshold;
    settings.search.candidates_per_worker = per_worker;
    settings.search.max_workers = 6;
    VectorSearchEngine::new(settings).unwrap()
}

/// Exact top-k by full sort, ties on ascending index
fn brute_force(vectors: &[Vec<f32>], query: &[f32], k: usize, threshold: f32) -> Vec<(u32, f32)> {
    let mut scored: Vec<(u32, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| (i as u32, cosine_similarity(query, v)))
        .filter(|(_, s)| *s >= threshold)
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);
    scored
}

#[test]
fn test_top_k_matches_brute_force() {
    let mut rng = rand::rng();
    let dim = 96;
    let vectors: Vec<Vec<f32>> = (0..3_000).map(|_| random_vector(&mut rng, dim)).collect();

    for engine in [engine_with_workers(usize::MAX, 1024), engine_with_workers(256, 128)] {
        for (i, v) in vectors.iter().enumerate() {
            engine
                .store(NewChunk::new(format!("c{i}"), format!("d{}", i % 50), "text"), v)
                .unwrap();
        }

        for k in [1, 10, 64] {
            let query = random_vector(&mut rng, dim);
            let expected = brute_force(&vectors, &query, k, 0.0);
            let hits = engine.search(&query, "", k, 0.0).unwrap();

            let got: Vec<u32> = hits.iter().map(|h| h.index.get()).collect();
            let want: Vec<u32> = expected.iter().map(|(i, _)| *i).collect();
            assert_eq!(got, want, "k={k}");
            for (hit, (_, score)) in hits.iter().zip(&expected) {
                assert!((hit.score - score).abs() < 1e-5);
            }
        }
    }
}

#[test]
fn test_threshold_is_inclusive() {
    let engine = VectorSearchEngine::with_defaults().unwrap();
    // Unit vectors: cosine equals the first component exactly
    engine.store(NewChunk::new("exact", "d", ""), &[0.5, 0.75f32.sqrt()]).unwrap();
    engine.store(NewChunk::new("below", "d", ""), &[0.25, 0.9375f32.sqrt()]).unwrap();
    engine.store(NewChunk::new("above", "d", ""), &[1.0, 0.0]).unwrap();

    let exact_score = engine
        .search(&[1.0, 0.0], "", 3, -1.0)
        .unwrap()
        .into_iter()
        .find(|h| h.chunk_id == "exact")
        .unwrap()
        .score;

    let hits = engine.search(&[1.0, 0.0], "", 3, exact_score).unwrap();
    let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["above", "exact"]);
}

#[test]
fn test_all_below_threshold_is_empty() {
    let engine = VectorSearchEngine::with_defaults().unwrap();
    engine.store(NewChunk::new("a", "d", ""), &[0.0, 1.0]).unwrap();
    let hits = engine.search(&[1.0, 0.0], "", 5, 0.5).unwrap();
    assert!(hits.is_empty());
}

#[test]
fn test_equal_scores_order_by_index() {
    let engine = engine_with_workers(2, 1);
    for i in 0..12 {
        engine
            .store(NewChunk::new(format!("dup{i}"), "d", ""), &[1.0, 1.0])
            .unwrap();
    }
    let hits = engine.search(&[1.0, 1.0], "", 5, 0.0).unwrap();
    let indices: Vec<u32> = hits.iter().map(|h| h.index.get()).collect();
    assert_eq!(indices, vec![0, 1, 2, 3, 4]);
}

#[test]
fn test_repeated_search_is_identical() {
    let mut settings = Settings::default();
    settings.cache.capacity = 0;
    let engine = VectorSearchEngine::new(settings).unwrap();
    assert!(!engine.stats().cache.enabled);
    let mut rng = rand::rng();
    for i in 0..500 {
        engine
            .store(NewChunk::new(format!("c{i}"), "d", ""), &random_vector(&mut rng, 16))
            .unwrap();
    }
    let query = random_vector(&mut rng, 16);
    let first = engine.search(&query, "", 20, -1.0).unwrap();
    for _ in 0..5 {
        assert_eq!(engine.search(&query, "", 20, -1.0).unwrap(), first);
    }
}

#[test]
fn test_k_larger_than_corpus_returns_all_qualifying() {
    let engine = engine_with_workers(4, 2);
    let mut rng = rand::rng();
    let vectors: Vec<Vec<f32>> = (0..10).map(|_| random_vector(&mut rng, 8)).collect();
    for (i, v) in vectors.iter().enumerate() {
        engine.store(NewChunk::new(format!("c{i}"), "d", ""), v).unwrap();
    }

    let query = random_vector(&mut rng, 8);
    let expected: Vec<u32> = brute_force(&vectors, &query, vectors.len(), -1.0)
        .into_iter()
        .map(|(i, _)| i)
        .collect();
    for k in [usize::MAX, 1 << 40, 11] {
        let got: Vec<u32> = engine
            .search(&query, "", k, -1.0)
            .unwrap()
            .iter()
            .map(|h| h.index.get())
            .collect();
        assert_eq!(got, expected, "k={k}");
    }
}
