//! Byte codec for persisted vector columns.
//!
//! # Storage Format
//!
//! Vectors are persisted as a contiguous, header-less, little-endian IEEE-754
//! array. Current rows use 4 bytes per element (f32); legacy rows use 8 bytes
//! per element (f64). Decoding always yields f32.
//!
//! # Layout Detection
//!
//! - Length not a multiple of 4: corrupt.
//! - Multiple of 4 but not of 8: f32, no further checks.
//! - Multiple of 8: both layouts are possible. If exactly one of the candidate
//!   element counts is in [`KNOWN_EMBEDDING_DIMENSIONS`], that layout wins.
//!   Otherwise the layout whose decoded values look like embedding components
//!   wins, with ties going to f32.
//!
//! Callers that know the dimension should use [`decode_vector_with_dimension`],
//! which never guesses.

use thiserror::Error;

/// Number of bytes per f32 value.
const BYTES_PER_F32: usize = 4;

/// Number of bytes per legacy f64 value.
const BYTES_PER_F64: usize = 8;

/// Embedding dimensions produced by common models.
///
/// Used only to disambiguate byte lengths that are valid for both layouts.
/// Dimensions outside this list fall through to the value heuristic.
pub const KNOWN_EMBEDDING_DIMENSIONS: &[usize] =
    &[128, 256, 384, 512, 768, 1024, 1536, 2048, 3072, 4096];

/// Magnitude range a decoded embedding component is expected to fall in.
const PLAUSIBLE_MIN: f64 = 1e-8;
const PLAUSIBLE_MAX: f64 = 1e4;

/// Errors raised while decoding a persisted vector.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error(
        "Corrupt vector blob: {len} bytes is not a multiple of 4\nSuggestion: Skip this row and re-ingest its document"
    )]
    CorruptLength { len: usize },

    #[error(
        "Vector blob of {len} bytes cannot hold {dimension} elements\nSuggestion: Check the dimension recorded for this column"
    )]
    DimensionMismatch { len: usize, dimension: usize },
}

/// Element encoding of a persisted vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementLayout {
    /// 4 bytes per element.
    F32,
    /// 8 bytes per element (legacy rows).
    F64,
}

impl ElementLayout {
    #[must_use]
    pub const fn element_size(&self) -> usize {
        match self {
            Self::F32 => BYTES_PER_F32,
            Self::F64 => BYTES_PER_F64,
        }
    }
}

/// Serializes a vector in the current f32 layout.
#[must_use]
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * BYTES_PER_F32);
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Serializes a vector in the legacy f64 layout.
#[must_use]
pub fn encode_vector_legacy(vector: &[f64]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * BYTES_PER_F64);
    for &value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Determines the element layout of a blob from its length and contents.
pub fn detect_layout(bytes: &[u8]) -> Result<ElementLayout, CodecError> {
    let len = bytes.len();
    if len % BYTES_PER_F32 != 0 {
        return Err(CodecError::CorruptLength { len });
    }
    if len % BYTES_PER_F64 != 0 {
        return Ok(ElementLayout::F32);
    }

    let as_f32 = KNOWN_EMBEDDING_DIMENSIONS.contains(&(len / BYTES_PER_F32));
    let as_f64 = KNOWN_EMBEDDING_DIMENSIONS.contains(&(len / BYTES_PER_F64));
    match (as_f32, as_f64) {
        (true, false) => Ok(ElementLayout::F32),
        (false, true) => Ok(ElementLayout::F64),
        _ => {
            let f32_score = plausibility(f32_values(bytes).map(f64::from));
            let f64_score = plausibility(f64_values(bytes));
            if f64_score > f32_score {
                Ok(ElementLayout::F64)
            } else {
                Ok(ElementLayout::F32)
            }
        }
    }
}

/// Decodes a persisted vector, detecting its layout.
pub fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>, CodecError> {
    let layout = detect_layout(bytes)?;
    Ok(decode_with_layout(bytes, layout))
}

/// Decodes a persisted vector whose dimension is known.
///
/// The layout follows from `bytes.len() / dimension`; no heuristic is applied.
pub fn decode_vector_with_dimension(bytes: &[u8], dimension: usize) -> Result<Vec<f32>, CodecError> {
    let len = bytes.len();
    if len % BYTES_PER_F32 != 0 {
        return Err(CodecError::CorruptLength { len });
    }
    let layout = if len == dimension * BYTES_PER_F32 {
        ElementLayout::F32
    } else if len == dimension * BYTES_PER_F64 {
        ElementLayout::F64
    } else {
        return Err(CodecError::DimensionMismatch { len, dimension });
    };
    Ok(decode_with_layout(bytes, layout))
}

fn decode_with_layout(bytes: &[u8], layout: ElementLayout) -> Vec<f32> {
    match layout {
        ElementLayout::F32 => f32_values(bytes).collect(),
        // `as` keeps infinities and NaN, and rounds finite values to nearest
        ElementLayout::F64 => f64_values(bytes).map(|v| v as f32).collect(),
    }
}

fn f32_values(bytes: &[u8]) -> impl Iterator<Item = f32> + '_ {
    bytes
        .chunks_exact(BYTES_PER_F32)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
}

fn f64_values(bytes: &[u8]) -> impl Iterator<Item = f64> + '_ {
    bytes.chunks_exact(BYTES_PER_F64).map(|c| {
        f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]])
    })
}

/// Fraction of finite non-zero values whose magnitude looks like an embedding component.
///
/// Zeros and non-finite values say nothing about the layout and are ignored.
fn plausibility(values: impl Iterator<Item = f64>) -> f64 {
    let mut considered = 0usize;
    let mut plausible = 0usize;
    for value in values {
        if !value.is_finite() || value == 0.0 {
            continue;
        }
        considered += 1;
        let magnitude = value.abs();
        if (PLAUSIBLE_MIN..=PLAUSIBLE_MAX).contains(&magnitude) {
            plausible += 1;
        }
    }
    if considered == 0 {
        return 0.0;
    }
    plausible as f64 / considered as f64
}
