//! Portable kernels used below every SIMD threshold and on targets without one.

/// Elements consumed per unrolled iteration.
const BLOCK: usize = 4;

/// Dot product with four independent accumulators.
///
/// Splitting the sum breaks the serial add dependency so the CPU can keep
/// several multiplies in flight.
#[inline]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let (a, b) = (&a[..n], &b[..n]);

    let mut acc = [0.0f32; BLOCK];
    let mut blocks_a = a.chunks_exact(BLOCK);
    let mut blocks_b = b.chunks_exact(BLOCK);
    for (xa, xb) in (&mut blocks_a).zip(&mut blocks_b) {
        acc[0] += xa[0] * xb[0];
        acc[1] += xa[1] * xb[1];
        acc[2] += xa[2] * xb[2];
        acc[3] += xa[3] * xb[3];
    }

    let mut sum = (acc[0] + acc[1]) + (acc[2] + acc[3]);
    for (x, y) in blocks_a.remainder().iter().zip(blocks_b.remainder()) {
        sum += x * y;
    }
    sum
}

/// Reference dot product: one accumulator, strictly left to right.
///
/// Only used to check the faster kernels.
#[cfg(test)]
pub fn dot_naive(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
