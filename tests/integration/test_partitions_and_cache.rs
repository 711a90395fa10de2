//! Partition scoping and result cache coherence

use ragvec::{NewChunk, SearchRequest, VectorSearchEngine};

fn chunk(id: &str, doc: &str, partition: &str) -> NewChunk {
    NewChunk::new(id, doc, format!("content of {id}")).in_partition(partition)
}

#[test]
fn test_partition_isolation() {
    let engine = VectorSearchEngine::with_defaults().unwrap();
    engine.store(chunk("a1", "doc-a", "A"), &[1.0, 0.0]).unwrap();
    engine.store(chunk("b1", "doc-b", "B"), &[1.0, 0.0]).unwrap();
    engine.store(chunk("s1", "doc-s", ""), &[0.9, 0.1]).unwrap();

    let ids = |partition: &str| -> Vec<String> {
        engine
            .search(&[1.0, 0.0], partition, 10, 0.0)
            .unwrap()
            .into_iter()
            .map(|h| h.chunk_id)
            .collect()
    };

    assert_eq!(ids("A"), vec!["a1", "s1"]);
    assert_eq!(ids("B"), vec!["b1", "s1"]);
    assert_eq!(ids(""), vec!["s1"]);
    assert_eq!(ids("unknown"), vec!["s1"]);
}

#[test]
fn test_hits_carry_chunk_metadata() {
    let engine = VectorSearchEngine::with_defaults().unwrap();
    let index = engine
        .store(
            NewChunk::new("c1", "doc-1", "Refunds take 5 days").with_image("img/refund.png"),
            &[0.0, 1.0],
        )
        .unwrap();

    let hit = &engine.search(&[0.0, 1.0], "", 1, 0.0).unwrap()[0];
    assert_eq!(hit.index, index);
    assert_eq!(hit.document_id, "doc-1");
    assert_eq!(hit.text, "Refunds take 5 days");
    assert_eq!(hit.image_ref.as_deref(), Some("img/refund.png"));

    let view = engine.chunk(index).unwrap();
    assert_eq!(view.chunk_id, "c1");
    assert!(view.partition.is_shared());
    assert_eq!(engine.chunks_for_document("doc-1"), vec![index]);
}

#[test]
fn test_cache_hit_returns_identical_results() {
    let engine = VectorSearchEngine::with_defaults().unwrap();
    for i in 0..20 {
        let angle = i as f32 * 0.1;
        engine
            .store(chunk(&format!("c{i}"), "d", "T"), &[angle.cos(), angle.sin()])
            .unwrap();
    }

    let request = SearchRequest::new(vec![1.0, 0.2], 5)
        .in_partition("T")
        .with_threshold(0.1);
    let first = engine.search_with(&request).unwrap();
    let second = engine.search_with(&request).unwrap();
    assert_eq!(first, second);

    let stats = engine.stats();
    assert_eq!(stats.cache.hits, 1);
    assert_eq!(stats.cache.misses, 1);
    assert_eq!(stats.cache.entries, 1);
}

#[test]
fn test_store_between_searches_is_visible() {
    let engine = VectorSearchEngine::with_defaults().unwrap();
    engine.store(chunk("old", "d1", ""), &[0.5, 0.5]).unwrap();
    let before = engine.search(&[1.0, 0.0], "", 5, 0.0).unwrap();
    assert_eq!(before.len(), 1);

    engine.store(chunk("new", "d2", ""), &[1.0, 0.0]).unwrap();
    let after = engine.search(&[1.0, 0.0], "", 5, 0.0).unwrap();
    assert_eq!(after[0].chunk_id, "new");
    assert_eq!(after.len(), 2);
    assert_eq!(engine.stats().cache.invalidations, 1);
}

#[test]
fn test_delete_between_searches_is_visible() {
    let engine = VectorSearchEngine::with_defaults().unwrap();
    engine.store(chunk("keep", "d1", "P"), &[0.5, 0.5]).unwrap();
    engine.store(chunk("drop", "d2", "P"), &[1.0, 0.0]).unwrap();

    let before = engine.search(&[1.0, 0.0], "P", 5, 0.0).unwrap();
    assert_eq!(before[0].chunk_id, "drop");

    assert_eq!(engine.delete("d2"), 1);
    let after = engine.search(&[1.0, 0.0], "P", 5, 0.0).unwrap();
    let ids: Vec<&str> = after.iter().map(|h| h.chunk_id.as_str()).collect();
    assert_eq!(ids, vec!["keep"]);
}

#[test]
fn test_clear_cache() {
    let engine = VectorSearchEngine::with_defaults().unwrap();
    engine.store(chunk("a", "d", ""), &[1.0]).unwrap();
    engine.search(&[1.0], "", 1, 0.0).unwrap();
    assert_eq!(engine.stats().cache.entries, 1);

    engine.clear_cache();
    assert_eq!(engine.stats().cache.entries, 0);
    assert_eq!(engine.purge_expired_cache(), 0);
}
