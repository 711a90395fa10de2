//! Configuration module for the vector search engine.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `RAGVEC_` and use double underscores
//! to separate nested levels:
//! - `RAGVEC_CACHE__CAPACITY=64` sets `cache.capacity`
//! - `RAGVEC_SEARCH__MAX_WORKERS=4` sets `search.max_workers`
//! - `RAGVEC_SIMD__AVX2_MIN_LEN=32` sets `simd.avx2_min_len`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{EngineError, EngineResult};

/// Default configuration file looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "ragvec.toml";

/// Prefix for environment overrides.
const ENV_PREFIX: &str = "RAGVEC_";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Settings {
    /// Vector arena settings
    #[serde(default)]
    pub arena: ArenaConfig,

    /// Worker fan-out settings
    #[serde(default)]
    pub search: SearchConfig,

    /// Query result cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Kernel dispatch thresholds
    #[serde(default)]
    pub simd: SimdConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ArenaConfig {
    /// Number of vectors to reserve room for before the first growth
    #[serde(default = "default_initial_capacity")]
    pub initial_capacity: usize,

    /// Fixed vector dimension; when unset the first stored vector decides
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimension: Option<usize>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SearchConfig {
    /// Candidate count below which a single worker scores everything
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: usize,

    /// Candidates each additional worker should receive
    #[serde(default = "default_candidates_per_worker")]
    pub candidates_per_worker: usize,

    /// Upper bound on concurrent scoring workers
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CacheConfig {
    /// Maximum number of cached searches (0 disables the cache)
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,

    /// Seconds before a cached search expires
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimdConfig {
    /// Minimum vector length for the AVX2 kernel
    #[serde(default = "default_avx2_min_len")]
    pub avx2_min_len: usize,

    /// Minimum vector length for the SSE kernel
    #[serde(default = "default_sse_min_len")]
    pub sse_min_len: usize,

    /// Minimum vector length for the NEON kernel
    #[serde(default = "default_neon_min_len")]
    pub neon_min_len: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is not set
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_initial_capacity() -> usize {
    1024
}
fn default_parallel_threshold() -> usize {
    2048
}
fn default_candidates_per_worker() -> usize {
    1024
}
fn default_max_workers() -> usize {
    num_cpus::get()
}
fn default_cache_capacity() -> usize {
    256
}
fn default_cache_ttl_secs() -> u64 {
    300
}
fn default_avx2_min_len() -> usize {
    16
}
fn default_sse_min_len() -> usize {
    8
}
fn default_neon_min_len() -> usize {
    8
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            initial_capacity: default_initial_capacity(),
            dimension: None,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: default_parallel_threshold(),
            candidates_per_worker: default_candidates_per_worker(),
            max_workers: default_max_workers(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl Default for SimdConfig {
    fn default() -> Self {
        Self {
            avx2_min_len: default_avx2_min_len(),
            sse_min_len: default_sse_min_len(),
            neon_min_len: default_neon_min_len(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl CacheConfig {
    /// Time-to-live of a cache entry.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Settings {
    /// Load configuration from all sources
    ///
    /// Defaults, then `ragvec.toml` in the working directory if it exists,
    /// then `RAGVEC_*` environment variables.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from(PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from a specific file, still honouring env overrides
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            // Double underscore (__) separates nested levels,
            // single underscore stays part of the field name
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Reject settings the engine cannot run with.
    pub fn validate(&self) -> EngineResult<()> {
        if self.search.candidates_per_worker == 0 {
            return Err(EngineError::Config(
                "search.candidates_per_worker must be at least 1".to_string(),
            ));
        }
        if self.search.max_workers == 0 {
            return Err(EngineError::Config(
                "search.max_workers must be at least 1".to_string(),
            ));
        }
        if self.arena.dimension == Some(0) {
            return Err(EngineError::Config(
                "arena.dimension cannot be zero".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.arena.initial_capacity, 1024);
        assert!(settings.arena.dimension.is_none());
        assert!(settings.search.max_workers > 0);
        assert_eq!(settings.cache.capacity, 256);
        assert_eq!(settings.cache.ttl(), Duration::from_secs(300));
        assert_eq!(settings.logging.level, "info");
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("ragvec.toml");

        let toml_content = r#"
[arena]
dimension = 384

[search]
parallel_threshold = 10
max_workers = 3

[cache]
capacity = 8
"#;

        fs::write(&config_path, toml_content).unwrap();

        let settings = Settings::load_from(&config_path).unwrap();
        assert_eq!(settings.arena.dimension, Some(384));
        assert_eq!(settings.search.parallel_threshold, 10);
        assert_eq!(settings.search.max_workers, 3);
        assert_eq!(settings.cache.capacity, 8);
        // Untouched values keep their defaults
        assert_eq!(settings.cache.ttl_secs, 300);
        assert_eq!(settings.search.candidates_per_worker, 1024);
    }

    #[test]
    fn test_save_settings() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("ragvec.toml");

        let mut settings = Settings::default();
        settings.cache.ttl_secs = 12;
        settings.simd.avx2_min_len = 64;

        settings.save(&config_path).unwrap();

        let loaded = Settings::load_from(&config_path).unwrap();
        assert_eq!(loaded.cache.ttl_secs, 12);
        assert_eq!(loaded.simd.avx2_min_len, 64);
    }

    #[test]
    fn test_env_overrides_file() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "ragvec.toml",
                r#"
[cache]
capacity = 32
ttl_secs = 60
"#,
            )?;
            jail.set_env("RAGVEC_CACHE__CAPACITY", "4");
            jail.set_env("RAGVEC_SEARCH__CANDIDATES_PER_WORKER", "7");

            let settings = Settings::load().map_err(|e| e.to_string())?;
            assert_eq!(settings.cache.capacity, 4);
            assert_eq!(settings.cache.ttl_secs, 60);
            assert_eq!(settings.search.candidates_per_worker, 7);
            Ok(())
        });
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut settings = Settings::default();
        settings.search.max_workers = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.arena.dimension = Some(0);
        assert!(settings.validate().is_err());
    }
}
