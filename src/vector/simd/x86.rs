//! x86_64 kernels: AVX2+FMA (8 lanes) and SSE2 (4 lanes).
//!
//! Both kernels walk the input in three stages: a wide block spread over four
//! accumulators, single-register blocks for the remainder, then a scalar tail.
//! Callers guarantee `a.len() == b.len()` and, for AVX2, that the CPU reports
//! `avx2` and `fma`.

use std::arch::x86_64::*;

/// AVX2 lanes per register.
const AVX2_LANES: usize = 8;

/// SSE lanes per register.
const SSE_LANES: usize = 4;

/// Accumulators used by the wide stage of each kernel.
const ACCUMULATORS: usize = 4;

/// AVX2+FMA dot product.
///
/// # Safety
/// The CPU must support `avx2` and `fma`, and both slices must have the same length.
#[target_feature(enable = "avx2,fma")]
pub(super) unsafe fn dot_avx2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len().min(b.len());
    let pa = a.as_ptr();
    let pb = b.as_ptr();
    let wide = AVX2_LANES * ACCUMULATORS;
    let mut i = 0;

    // SAFETY: every load covers [i, i + 8) with i + 8 <= n, inside both slices.
    let mut sum = unsafe {
        let mut acc0 = _mm256_setzero_ps();
        let mut acc1 = _mm256_setzero_ps();
        let mut acc2 = _mm256_setzero_ps();
        let mut acc3 = _mm256_setzero_ps();

        while i + wide <= n {
            acc0 = _mm256_fmadd_ps(_mm256_loadu_ps(pa.add(i)), _mm256_loadu_ps(pb.add(i)), acc0);
            acc1 = _mm256_fmadd_ps(
                _mm256_loadu_ps(pa.add(i + 8)),
                _mm256_loadu_ps(pb.add(i + 8)),
                acc1,
            );
            acc2 = _mm256_fmadd_ps(
                _mm256_loadu_ps(pa.add(i + 16)),
                _mm256_loadu_ps(pb.add(i + 16)),
                acc2,
            );
            acc3 = _mm256_fmadd_ps(
                _mm256_loadu_ps(pa.add(i + 24)),
                _mm256_loadu_ps(pb.add(i + 24)),
                acc3,
            );
            i += wide;
        }

        while i + AVX2_LANES <= n {
            acc0 = _mm256_fmadd_ps(_mm256_loadu_ps(pa.add(i)), _mm256_loadu_ps(pb.add(i)), acc0);
            i += AVX2_LANES;
        }

        let acc = _mm256_add_ps(_mm256_add_ps(acc0, acc1), _mm256_add_ps(acc2, acc3));
        hsum_avx2(acc)
    };

    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

/// SSE2 dot product. SSE2 is part of the x86_64 baseline.
///
/// # Safety
/// Both slices must have the same length.
pub(super) unsafe fn dot_sse(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len().min(b.len());
    let pa = a.as_ptr();
    let pb = b.as_ptr();
    let wide = SSE_LANES * ACCUMULATORS;
    let mut i = 0;

    // SAFETY: every load covers [i, i + 4) with i + 4 <= n, inside both slices.
    let mut sum = unsafe {
        let mut acc0 = _mm_setzero_ps();
        let mut acc1 = _mm_setzero_ps();
        let mut acc2 = _mm_setzero_ps();
        let mut acc3 = _mm_setzero_ps();

        while i + wide <= n {
            acc0 = _mm_add_ps(acc0, _mm_mul_ps(_mm_loadu_ps(pa.add(i)), _mm_loadu_ps(pb.add(i))));
            acc1 = _mm_add_ps(
                acc1,
                _mm_mul_ps(_mm_loadu_ps(pa.add(i + 4)), _mm_loadu_ps(pb.add(i + 4))),
            );
            acc2 = _mm_add_ps(
                acc2,
                _mm_mul_ps(_mm_loadu_ps(pa.add(i + 8)), _mm_loadu_ps(pb.add(i + 8))),
            );
            acc3 = _mm_add_ps(
                acc3,
                _mm_mul_ps(_mm_loadu_ps(pa.add(i + 12)), _mm_loadu_ps(pb.add(i + 12))),
            );
            i += wide;
        }

        while i + SSE_LANES <= n {
            acc0 = _mm_add_ps(acc0, _mm_mul_ps(_mm_loadu_ps(pa.add(i)), _mm_loadu_ps(pb.add(i))));
            i += SSE_LANES;
        }

        let acc = _mm_add_ps(_mm_add_ps(acc0, acc1), _mm_add_ps(acc2, acc3));
        hsum_sse(acc)
    };

    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}

/// Folds 8 lanes to one: high half onto low half, then the 4-lane fold.
#[target_feature(enable = "avx2,fma")]
#[inline]
unsafe fn hsum_avx2(v: __m256) -> f32 {
    unsafe {
        let lo = _mm256_castps256_ps128(v);
        let hi = _mm256_extractf128_ps(v, 1);
        hsum_sse(_mm_add_ps(lo, hi))
    }
}

/// Folds 4 lanes to one in two pairwise steps.
#[inline]
unsafe fn hsum_sse(v: __m128) -> f32 {
    unsafe {
        // [v2, v3, v2, v3]
        let high = _mm_movehl_ps(v, v);
        // [v0+v2, v1+v3, ..]
        let pairs = _mm_add_ps(v, high);
        // lane 1 into lane 0
        let odd = _mm_shuffle_ps(pairs, pairs, 0b01);
        _mm_cvtss_f32(_mm_add_ss(pairs, odd))
    }
}
