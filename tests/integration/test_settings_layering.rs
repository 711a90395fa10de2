//! Settings layering and engine construction

use figment::Jail;
use ragvec::{EngineError, Settings, VectorSearchEngine};

#[test]
fn test_toml_and_env_layering() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "ragvec.toml",
            r#"
            [cache]
            capacity = 8
            ttl_secs = 30

            [search]
            parallel_threshold = 64
            "#,
        )?;
        jail.set_env("RAGVEC_CACHE__CAPACITY", "16");
        jail.set_env("RAGVEC_ARENA__DIMENSION", "3");

        let settings = Settings::load().expect("settings should load");
        assert_eq!(settings.cache.capacity, 16);
        assert_eq!(settings.cache.ttl_secs, 30);
        assert_eq!(settings.search.parallel_threshold, 64);
        assert_eq!(settings.arena.dimension, Some(3));

        let engine = VectorSearchEngine::new(settings).expect("engine should build");
        assert_eq!(engine.stats().dimension, Some(3));
        assert_eq!(engine.stats().cache.capacity, 16);
        assert!(engine.stats().cache.enabled);
        Ok(())
    });
}

#[test]
fn test_save_then_load() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("ragvec.toml");

    let mut settings = Settings::default();
    settings.cache.capacity = 3;
    settings.simd.avx2_min_len = 64;
    settings.save(&path).map_err(|e| anyhow::anyhow!("{e}"))?;

    let loaded = Settings::load_from(&path).map_err(|e| anyhow::anyhow!("{e}"))?;
    assert_eq!(loaded.cache.capacity, 3);
    assert_eq!(loaded.simd.avx2_min_len, 64);
    Ok(())
}

#[test]
fn test_invalid_settings_rejected() {
    let mut settings = Settings::default();
    settings.search.max_workers = 0;
    assert!(matches!(
        VectorSearchEngine::new(settings),
        Err(EngineError::Config(_))
    ));

    let mut settings = Settings::default();
    settings.arena.dimension = Some(0);
    assert!(VectorSearchEngine::new(settings).is_err());
}

#[test]
fn test_stats_serialize() {
    let engine = VectorSearchEngine::with_defaults().unwrap();
    let json = serde_json::to_value(engine.stats()).unwrap();
    assert_eq!(json["live_chunks"], 0);
    assert!(json["simd_level"].is_string());
    assert!(json["cache"]["hits"].is_number());
}
