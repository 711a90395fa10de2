//! Concurrent store, delete and search

use std::sync::Arc;
use std::thread;

use ragvec::{NewChunk, VectorSearchEngine};

const DIM: usize = 32;

/// Every component equals the writer id, so a torn vector is detectable
fn tagged_vector(writer: usize) -> Vec<f32> {
    vec![writer as f32 + 1.0; DIM]
}

#[test]
fn test_concurrent_store_and_search() {
    let engine = Arc::new(VectorSearchEngine::with_defaults().unwrap());
    let writers = 4;
    let per_writer = 250;

    let mut handles = Vec::new();
    for writer in 0..writers {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for i in 0..per_writer {
                let chunk = NewChunk::new(format!("w{writer}-{i}"), format!("doc-{writer}"), "");
                engine.store(chunk, &tagged_vector(writer)).unwrap();
            }
        }));
    }
    for _ in 0..4 {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            let query = vec![1.0; DIM];
            for _ in 0..200 {
                let hits = engine.search(&query, "", 10, 0.0).unwrap();
                for pair in hits.windows(2) {
                    assert!(pair[0].score >= pair[1].score);
                }
                for hit in hits {
                    // All tagged vectors are parallel to the query
                    assert!((hit.score - 1.0).abs() < 1e-5);
                }
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(engine.len(), writers * per_writer);
    for writer in 0..writers {
        let indices = engine.chunks_for_document(&format!("doc-{writer}"));
        assert_eq!(indices.len(), per_writer);
        for index in indices {
            assert_eq!(engine.vector(index).unwrap(), tagged_vector(writer));
        }
    }
}

#[test]
fn test_concurrent_delete_and_search() {
    let engine = Arc::new(VectorSearchEngine::with_defaults().unwrap());
    for doc in 0..50 {
        for i in 0..10 {
            engine
                .store(NewChunk::new(format!("{doc}-{i}"), format!("doc-{doc}"), ""), &[1.0, i as f32])
                .unwrap();
        }
    }

    let deleter = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            let mut removed = 0;
            for doc in 0..50 {
                removed += engine.delete(&format!("doc-{doc}"));
            }
            removed
        })
    };
    let searcher = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..100 {
                let hits = engine.search(&[1.0, 0.0], "", 20, -1.0).unwrap();
                assert!(hits.len() <= 20);
            }
        })
    };

    assert_eq!(deleter.join().unwrap(), 500);
    searcher.join().unwrap();
    assert!(engine.is_empty());
    assert!(engine.search(&[1.0, 0.0], "", 20, -1.0).unwrap().is_empty());
}
