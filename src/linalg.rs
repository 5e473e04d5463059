//! GEMM primitive used by the dense layer.
//!
//! All matrices are column-major, as in BLAS. The forward pass calls
//! `gemm(Trans, NoTrans, ..)` and the backward pass `gemm(NoTrans, NoTrans, ..)`
//! on the same weight matrix.
//!
//! With the `blas` feature the call goes to CBLAS (`sgemm`/`dgemm`); otherwise
//! the portable kernel below runs, one output column per rayon task.

use rayon::prelude::*;

use crate::real::Real;

/// Transpose flag of one GEMM operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    None,
    Ordinary,
}

#[cfg(feature = "blas")]
impl From<Transpose> for cblas::Transpose {
    fn from(trans: Transpose) -> Self {
        match trans {
            Transpose::None => cblas::Transpose::None,
            Transpose::Ordinary => cblas::Transpose::Ordinary,
        }
    }
}

/// `C = alpha * op(A) * op(B) + beta * C` with `op(A)` of shape `m x k`,
/// `op(B)` of shape `k x n` and `C` of shape `m x n`.
///
/// When `beta` is zero, `C` is overwritten without being read.
#[allow(clippy::too_many_arguments)]
pub fn gemm<T: Real>(
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    a: &[T],
    lda: usize,
    b: &[T],
    ldb: usize,
    beta: T,
    c: &mut [T],
    ldc: usize,
) {
    if m == 0 || n == 0 {
        return;
    }
    debug_assert!(ldc >= m);
    debug_assert!(c.len() >= ldc * (n - 1) + m);

    T::gemm(trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc);
}

#[cfg_attr(feature = "blas", allow(dead_code))]
#[allow(clippy::too_many_arguments)]
pub(crate) fn gemm_portable<T: Real>(
    trans_a: Transpose,
    trans_b: Transpose,
    m: usize,
    n: usize,
    k: usize,
    alpha: T,
    a: &[T],
    lda: usize,
    b: &[T],
    ldb: usize,
    beta: T,
    c: &mut [T],
    ldc: usize,
) {
    let a_at = |i: usize, p: usize| match trans_a {
        Transpose::None => a[i + p * lda],
        Transpose::Ordinary => a[p + i * lda],
    };
    let b_at = |p: usize, j: usize| match trans_b {
        Transpose::None => b[p + j * ldb],
        Transpose::Ordinary => b[j + p * ldb],
    };

    c.par_chunks_mut(ldc)
        .take(n)
        .enumerate()
        .for_each(|(j, column)| {
            for (i, value) in column.iter_mut().take(m).enumerate() {
                let mut acc = T::ZERO;
                for p in 0..k {
                    acc += a_at(i, p) * b_at(p, j);
                }

                *value = if beta == T::ZERO {
                    alpha * acc
                } else {
                    alpha * acc + beta * *value
                };
            }
        });
}
