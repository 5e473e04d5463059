//! Floating-point abstraction over the two supported precisions.
//!
//! Every numeric routine of the crate is generic over [`Real`], implemented
//! for `f32` and `f64`. [`NnpReal`] is the default precision chosen at build
//! time: `f64`, or `f32` with the `single` feature.

use std::fmt::{Debug, Display};
use std::ops::{Add, AddAssign, Div, Mul, MulAssign, Neg, Sub};
use std::str::FromStr;

use crate::linalg::Transpose;

#[cfg(not(feature = "single"))]
pub type NnpReal = f64;

#[cfg(feature = "single")]
pub type NnpReal = f32;

/// Scalar type usable by the layer engine.
pub trait Real:
    Copy
    + Send
    + Sync
    + Default
    + PartialOrd
    + Debug
    + Display
    + FromStr
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + MulAssign
    + 'static
{
    const ZERO: Self;
    const ONE: Self;
    const HALF: Self;

    fn from_f64(value: f64) -> Self;
    fn to_f64(self) -> f64;

    fn exp(self) -> Self;
    fn tanh(self) -> Self;
    fn erf(self) -> Self;
    fn sqrt(self) -> Self;

    /// General matrix multiply in column-major (BLAS) convention:
    /// `C = alpha * op(A) * op(B) + beta * C`.
    #[allow(clippy::too_many_arguments)]
    fn gemm(
        trans_a: Transpose,
        trans_b: Transpose,
        m: usize,
        n: usize,
        k: usize,
        alpha: Self,
        a: &[Self],
        lda: usize,
        b: &[Self],
        ldb: usize,
        beta: Self,
        c: &mut [Self],
        ldc: usize,
    );
}

macro_rules! impl_real {
    ($t:ty, $erf:path, $blas_gemm:path) => {
        impl Real for $t {
            const ZERO: Self = 0.0;
            const ONE: Self = 1.0;
            const HALF: Self = 0.5;

            #[inline]
            fn from_f64(value: f64) -> Self {
                value as $t
            }

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64
            }

            #[inline]
            fn exp(self) -> Self {
                <$t>::exp(self)
            }

            #[inline]
            fn tanh(self) -> Self {
                <$t>::tanh(self)
            }

            #[inline]
            fn erf(self) -> Self {
                $erf(self)
            }

            #[inline]
            fn sqrt(self) -> Self {
                <$t>::sqrt(self)
            }

            fn gemm(
                trans_a: Transpose,
                trans_b: Transpose,
                m: usize,
                n: usize,
                k: usize,
                alpha: Self,
                a: &[Self],
                lda: usize,
                b: &[Self],
                ldb: usize,
                beta: Self,
                c: &mut [Self],
                ldc: usize,
            ) {
                #[cfg(feature = "blas")]
                {
                    use cblas::Layout;

                    unsafe {
                        $blas_gemm(
                            Layout::ColumnMajor,
                            trans_a.into(),
                            trans_b.into(),
                            m as i32,
                            n as i32,
                            k as i32,
                            alpha,
                            a,
                            lda as i32,
                            b,
                            ldb as i32,
                            beta,
                            c,
                            ldc as i32,
                        );
                    }
                }

                #[cfg(not(feature = "blas"))]
                crate::linalg::gemm_portable(
                    trans_a, trans_b, m, n, k, alpha, a, lda, b, ldb, beta, c, ldc,
                );
            }
        }
    };
}

impl_real!(f32, libm::erff, cblas::sgemm);
impl_real!(f64, libm::erf, cblas::dgemm);
