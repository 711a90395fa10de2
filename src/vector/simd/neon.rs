//! aarch64 NEON kernel (4 lanes). NEON is always present on aarch64.

use std::arch::aarch64::*;

const LANES: usize = 4;
const ACCUMULATORS: usize = 4;

/// NEON dot product: 16-float blocks over four accumulators, 4-float blocks, then a tail.
///
/// # Safety
/// Both slices must have the same length.
pub(super) unsafe fn dot_neon(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let n = a.len().min(b.len());
    let pa = a.as_ptr();
    let pb = b.as_ptr();
    let wide = LANES * ACCUMULATORS;
    let mut i = 0;

    // SAFETY: every load covers [i, i + 4) with i + 4 <= n, inside both slices.
    let mut sum = unsafe {
        let mut acc0 = vdupq_n_f32(0.0);
        let mut acc1 = vdupq_n_f32(0.0);
        let mut acc2 = vdupq_n_f32(0.0);
        let mut acc3 = vdupq_n_f32(0.0);

        while i + wide <= n {
            acc0 = vfmaq_f32(acc0, vld1q_f32(pa.add(i)), vld1q_f32(pb.add(i)));
            acc1 = vfmaq_f32(acc1, vld1q_f32(pa.add(i + 4)), vld1q_f32(pb.add(i + 4)));
            acc2 = vfmaq_f32(acc2, vld1q_f32(pa.add(i + 8)), vld1q_f32(pb.add(i + 8)));
            acc3 = vfmaq_f32(acc3, vld1q_f32(pa.add(i + 12)), vld1q_f32(pb.add(i + 12)));
            i += wide;
        }

        while i + LANES <= n {
            acc0 = vfmaq_f32(acc0, vld1q_f32(pa.add(i)), vld1q_f32(pb.add(i)));
            i += LANES;
        }

        let acc = vaddq_f32(vaddq_f32(acc0, acc1), vaddq_f32(acc2, acc3));
        // faddp pairs lanes, then pairs the pair sums
        vaddvq_f32(acc)
    };

    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }
    sum
}
