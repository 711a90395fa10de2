//! Persisted vector column compatibility

use rand::Rng;
use ragvec::vector::{
    CodecError, ElementLayout, decode_vector, detect_layout, encode_vector, encode_vector_legacy,
};
use ragvec::{NewChunk, PersistedRow, VectorSearchEngine};

#[test]
fn test_f32_roundtrip_is_exact() {
    let mut rng = rand::rng();
    for dim in [1, 3, 384, 768, 1536] {
        let v: Vec<f32> = (0..dim).map(|_| rng.random_range(-10.0..10.0)).collect();
        assert_eq!(decode_vector(&encode_vector(&v)).unwrap(), v, "dim={dim}");
    }
}

#[test]
fn test_legacy_f64_common_dimensions() {
    let mut rng = rand::rng();
    for dim in [384, 768, 1536] {
        let v: Vec<f64> = (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect();
        let bytes = encode_vector_legacy(&v);
        assert_eq!(detect_layout(&bytes).unwrap(), ElementLayout::F64, "dim={dim}");

        let decoded = decode_vector(&bytes).unwrap();
        assert_eq!(decoded.len(), dim);
        for (a, b) in decoded.iter().zip(&v) {
            assert_eq!(*a, *b as f32);
        }
    }
}

#[test]
fn test_special_values_survive() {
    let v = [f32::INFINITY, f32::NEG_INFINITY, f32::NAN, -0.0, f32::MIN_POSITIVE];
    let decoded = decode_vector(&encode_vector(&v)).unwrap();
    assert_eq!(decoded[0], f32::INFINITY);
    assert_eq!(decoded[1], f32::NEG_INFINITY);
    assert!(decoded[2].is_nan());
    assert_eq!(decoded[3].to_bits(), (-0.0f32).to_bits());
    assert_eq!(decoded[4], f32::MIN_POSITIVE);
}

#[test]
fn test_corrupt_length_rejected() {
    assert_eq!(
        decode_vector(&[0u8; 6]),
        Err(CodecError::CorruptLength { len: 6 })
    );
}

#[test]
fn test_load_rows_skips_bad_rows() {
    let engine = VectorSearchEngine::with_defaults().unwrap();
    let good: Vec<f32> = (0..768).map(|i| i as f32 / 768.0).collect();
    let legacy: Vec<f64> = (0..768).map(|i| 1.0 - f64::from(i) / 768.0).collect();

    let rows = vec![
        PersistedRow {
            chunk: NewChunk::new("good", "d1", "first"),
            vector_bytes: encode_vector(&good),
        },
        PersistedRow {
            chunk: NewChunk::new("torn", "d1", "second"),
            vector_bytes: vec![1, 2, 3],
        },
        PersistedRow {
            chunk: NewChunk::new("legacy", "d2", "third"),
            vector_bytes: encode_vector_legacy(&legacy),
        },
    ];
    let report = engine.load_rows(rows).unwrap();
    assert_eq!(report.loaded, 2);
    assert_eq!(report.skipped, 1);

    let hits = engine.search(&good, "", 1, 0.0).unwrap();
    assert_eq!(hits[0].chunk_id, "good");
    assert!((hits[0].score - 1.0).abs() < 1e-5);
}
