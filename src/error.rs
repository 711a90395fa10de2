//! Error types for the vector search engine
//!
//! This module provides structured error types using thiserror. Every
//! message carries a suggestion so callers can act on it without digging
//! into the engine internals.

use crate::vector::CodecError;
use thiserror::Error;

/// Main error type for store, delete and search operations
#[derive(Error, Debug)]
pub enum EngineError {
    /// Validation errors
    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors use the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Invalid vector dimension: {dimension}\nReason: {reason}")]
    InvalidDimension {
        dimension: usize,
        reason: &'static str,
    },

    #[error("Invalid similarity threshold: {value}\nSuggestion: Use a finite threshold, e.g. 0.0")]
    InvalidThreshold { value: f32 },

    #[error("Invalid top-k value: {k}\nSuggestion: Request at least one result")]
    InvalidTopK { k: i64 },

    /// Capacity errors
    #[error(
        "Vector arena could not grow to {requested_vectors} vectors of dimension {dimension}\nSuggestion: Reduce the corpus size or free memory in the hosting process"
    )]
    CapacityExhausted {
        requested_vectors: usize,
        dimension: usize,
    },

    /// Serialization errors
    #[error("Vector decoding failed: {0}")]
    Codec(#[from] CodecError),

    /// Worker errors
    #[error(
        "Search worker {worker} failed: {reason}\nSuggestion: The search was aborted, no partial results were returned"
    )]
    WorkerFailed { worker: usize, reason: String },

    /// Configuration errors
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl EngineError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::InvalidDimension { .. } => "INVALID_DIMENSION",
            Self::InvalidThreshold { .. } => "INVALID_THRESHOLD",
            Self::InvalidTopK { .. } => "INVALID_TOP_K",
            Self::CapacityExhausted { .. } => "CAPACITY_EXHAUSTED",
            Self::Codec(_) => "SERIALIZATION_ERROR",
            Self::WorkerFailed { .. } => "WORKER_FAILED",
            Self::Config(_) => "CONFIG_ERROR",
        }
        .to_string()
    }

    /// Whether the caller can fix this error by correcting its input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::DimensionMismatch { .. }
                | Self::InvalidDimension { .. }
                | Self::InvalidThreshold { .. }
                | Self::InvalidTopK { .. }
        )
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::DimensionMismatch { .. } => vec![
                "Re-embed the content with the model used for the rest of the corpus",
                "Check that the query embedding comes from the same model as the index",
            ],
            Self::Codec(_) => vec![
                "Skip the affected row, it cannot be decoded",
                "Re-ingest the source document to regenerate its vectors",
            ],
            Self::CapacityExhausted { .. } => vec![
                "The engine is out of memory, restart the process with a smaller corpus",
            ],
            Self::WorkerFailed { .. } => vec![
                "Retry the search, no state was modified",
                "If the failure repeats, inspect the logs for the worker panic message",
            ],
            Self::Config(_) => vec!["Check ragvec.toml and RAGVEC_* environment variables"],
            _ => vec![],
        }
    }
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
