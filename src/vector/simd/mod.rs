//! SIMD-optimized similarity kernels with runtime dispatch.
//!
//! Provides explicit SIMD intrinsics for x86_64 (AVX2+FMA, SSE2) and aarch64
//! (NEON), with a four-accumulator scalar fallback.
//!
//! # Architecture Selection
//!
//! | Platform     | Kernels (widest first) | Width            |
//! |--------------|------------------------|------------------|
//! | x86_64+AVX2  | AVX2+FMA, SSE2         | 8×f32, 4×f32     |
//! | x86_64       | SSE2                   | 4×f32            |
//! | aarch64      | NEON                   | 4×f32            |
//! | other        | scalar                 | 4 accumulators   |
//!
//! CPU features are detected once per process. Each call then picks the widest
//! available kernel whose minimum length the input satisfies; shorter inputs
//! go to the scalar kernel.

mod scalar;

#[cfg(target_arch = "aarch64")]
mod neon;
#[cfg(target_arch = "x86_64")]
mod x86;

use std::sync::OnceLock;

use serde::Serialize;

use crate::config::SimdConfig;

/// Kernel family, widest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SimdLevel {
    /// AVX2 + FMA, 8 lanes (`x86_64` only).
    Avx2,
    /// SSE2, 4 lanes (`x86_64` baseline).
    Sse,
    /// NEON, 4 lanes (aarch64, always present).
    Neon,
    /// Portable fallback.
    Scalar,
}

impl SimdLevel {
    /// Kernels usable when this level is the best one detected, widest first.
    fn ladder(self) -> &'static [SimdLevel] {
        match self {
            Self::Avx2 => &[Self::Avx2, Self::Sse],
            Self::Sse => &[Self::Sse],
            Self::Neon => &[Self::Neon],
            Self::Scalar => &[],
        }
    }

    /// Whether the running CPU can execute this kernel.
    #[must_use]
    pub fn is_supported(self) -> bool {
        active_level().ladder().contains(&self) || self == Self::Scalar
    }
}

impl std::fmt::Display for SimdLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Avx2 => "avx2+fma",
            Self::Sse => "sse2",
            Self::Neon => "neon",
            Self::Scalar => "scalar",
        };
        f.write_str(name)
    }
}

/// Detected capability, written once.
static SIMD_LEVEL: OnceLock<SimdLevel> = OnceLock::new();

fn detect_simd_level() -> SimdLevel {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            return SimdLevel::Avx2;
        }
        return SimdLevel::Sse;
    }

    #[cfg(target_arch = "aarch64")]
    {
        return SimdLevel::Neon;
    }

    #[allow(unreachable_code)]
    SimdLevel::Scalar
}

/// Returns the widest kernel family the CPU supports.
#[inline]
#[must_use]
pub fn active_level() -> SimdLevel {
    *SIMD_LEVEL.get_or_init(|| {
        let level = detect_simd_level();
        tracing::info!("SIMD kernel family selected: {level}");
        level
    })
}

/// Every kernel the running CPU can execute, scalar included.
#[must_use]
pub fn supported_levels() -> Vec<SimdLevel> {
    let mut levels = active_level().ladder().to_vec();
    levels.push(SimdLevel::Scalar);
    levels
}

/// Minimum input lengths at which each kernel is worth dispatching to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelThresholds {
    pub avx2_min_len: usize,
    pub sse_min_len: usize,
    pub neon_min_len: usize,
}

impl KernelThresholds {
    fn min_len(&self, level: SimdLevel) -> usize {
        match level {
            SimdLevel::Avx2 => self.avx2_min_len,
            SimdLevel::Sse => self.sse_min_len,
            SimdLevel::Neon => self.neon_min_len,
            SimdLevel::Scalar => 0,
        }
    }
}

impl Default for KernelThresholds {
    fn default() -> Self {
        Self::from(&SimdConfig::default())
    }
}

impl From<&SimdConfig> for KernelThresholds {
    fn from(config: &SimdConfig) -> Self {
        Self {
            avx2_min_len: config.avx2_min_len,
            sse_min_len: config.sse_min_len,
            neon_min_len: config.neon_min_len,
        }
    }
}

/// Kernel selection bound to a capability level and a set of thresholds.
///
/// Cheap to copy; the engine keeps one and hands it to every worker.
#[derive(Debug, Clone, Copy)]
pub struct KernelDispatch {
    level: SimdLevel,
    thresholds: KernelThresholds,
}

impl Default for KernelDispatch {
    fn default() -> Self {
        Self::new(KernelThresholds::default())
    }
}

impl KernelDispatch {
    /// Dispatch over the detected capability level.
    #[must_use]
    pub fn new(thresholds: KernelThresholds) -> Self {
        Self {
            level: active_level(),
            thresholds,
        }
    }

    /// Dispatch pinned to one kernel family, ignoring thresholds.
    ///
    /// Returns `None` if the CPU cannot run `level`.
    #[must_use]
    pub fn pinned(level: SimdLevel) -> Option<Self> {
        if !level.is_supported() {
            return None;
        }
        Some(Self {
            level,
            thresholds: KernelThresholds {
                avx2_min_len: 0,
                sse_min_len: 0,
                neon_min_len: 0,
            },
        })
    }

    /// The widest kernel family this dispatch may use.
    #[must_use]
    pub fn level(&self) -> SimdLevel {
        self.level
    }

    /// Kernel used for inputs of length `len`.
    #[inline]
    #[must_use]
    pub fn kernel_for(&self, len: usize) -> SimdLevel {
        self.level
            .ladder()
            .iter()
            .copied()
            .find(|k| len >= self.thresholds.min_len(*k))
            .unwrap_or(SimdLevel::Scalar)
    }

    /// Dot product of two equal-length vectors.
    ///
    /// Inputs of different lengths are truncated to the shorter one.
    #[inline]
    #[must_use]
    pub fn dot(&self, a: &[f32], b: &[f32]) -> f32 {
        debug_assert_eq!(a.len(), b.len(), "Vector length mismatch");
        let n = a.len().min(b.len());
        let (a, b) = (&a[..n], &b[..n]);

        match self.kernel_for(n) {
            #[cfg(target_arch = "x86_64")]
            // SAFETY: Avx2 is only reachable when detection reported avx2 and fma.
            SimdLevel::Avx2 => unsafe { x86::dot_avx2(a, b) },
            #[cfg(target_arch = "x86_64")]
            // SAFETY: equal lengths, SSE2 is baseline on x86_64.
            SimdLevel::Sse => unsafe { x86::dot_sse(a, b) },
            #[cfg(target_arch = "aarch64")]
            // SAFETY: equal lengths, NEON is baseline on aarch64.
            SimdLevel::Neon => unsafe { neon::dot_neon(a, b) },
            _ => scalar::dot(a, b),
        }
    }

    /// Euclidean norm.
    #[inline]
    #[must_use]
    pub fn norm(&self, a: &[f32]) -> f32 {
        self.dot(a, a).sqrt()
    }

    /// Cosine similarity; zero-norm inputs score 0.
    #[inline]
    #[must_use]
    pub fn cosine(&self, a: &[f32], b: &[f32]) -> f32 {
        self.cosine_with_norm(a, self.norm(a), b)
    }

    /// Cosine similarity against a query whose norm is already known.
    #[inline]
    #[must_use]
    pub fn cosine_with_norm(&self, query: &[f32], query_norm: f32, v: &[f32]) -> f32 {
        let v_norm = self.norm(v);
        if query_norm == 0.0 || v_norm == 0.0 {
            return 0.0;
        }
        (self.dot(query, v) / (query_norm * v_norm)).clamp(-1.0, 1.0)
    }
}

/// Process-wide dispatch with default thresholds.
fn default_dispatch() -> &'static KernelDispatch {
    static DEFAULT: OnceLock<KernelDispatch> = OnceLock::new();
    DEFAULT.get_or_init(KernelDispatch::default)
}

/// Compute dot product of two vectors with the fastest available kernel.
#[inline]
#[must_use]
pub fn dot_product(a: &[f32], b: &[f32]) -> f32 {
    default_dispatch().dot(a, b)
}

/// Euclidean norm of a vector.
#[inline]
#[must_use]
pub fn norm(v: &[f32]) -> f32 {
    default_dispatch().norm(v)
}

/// Cosine similarity of two vectors; 0 when either has zero norm.
#[inline]
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    default_dispatch().cosine(a, b)
}

/// L2 normalize a vector in place. Zero vectors are left untouched.
pub fn l2_normalize(v: &mut [f32]) {
    let n = norm(v);
    if n > f32::EPSILON {
        for x in v.iter_mut() {
            *x /= n;
        }
    }
}

/// Force capability detection and run each kernel once.
///
/// Call at startup so the first search does not pay for detection.
pub fn warmup() {
    // 768 is a common embedding dimension
    let a = vec![0.01f32; 768];
    let b = vec![0.02f32; 768];
    for level in supported_levels() {
        if let Some(dispatch) = KernelDispatch::pinned(level) {
            let _ = dispatch.dot(&a, &b);
        }
    }
    let _ = cosine_similarity(&a, &b);
}
