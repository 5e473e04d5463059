//! Activation functions of the dense layer
//!
//! Each activation is a kernel `fn(x) -> (y, dy/dx)` evaluated element-wise
//! over the pre-activation values of a batch:
//! - Identity (pass-through, derivative 1)
//! - Sigmoid (saturated outside [-50, 50])
//! - Tanh
//! - ELU (alpha = 1)
//! - Twisted tanh (tanh plus a constant 0.16 slope)
//! - GELU (exact form with the error function)
//!
//! The layer picks its kernel once at construction, see [`Activation::kernel`].

use std::fmt;
use std::str::FromStr;

use rayon::prelude::*;
use serde::Deserialize;

use crate::error::NnpError;
use crate::real::Real;

/// Beyond this magnitude sigmoid is clamped to 0 or 1 with zero slope.
pub const SIGMOID_MAX: f64 = 50.0;

/// Slope added to tanh by [`Activation::TwistedTanh`].
pub const TWTANH_ALPHA: f64 = 0.16;

const ROOT2: f64 = std::f64::consts::SQRT_2;
const ROOT2PI: f64 = 2.506_628_274_631_000_7;

/// Element-wise kernel returning the activated value and its derivative.
pub type Kernel<T> = fn(T) -> (T, T);

/// Activation kind of a layer, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    #[serde(alias = "asis")]
    Identity,
    Sigmoid,
    Tanh,
    Elu,
    #[serde(alias = "twtanh")]
    TwistedTanh,
    Gelu,
}

impl Activation {
    /// Every activation, in declaration order.
    pub const ALL: [Activation; 6] = [
        Activation::Identity,
        Activation::Sigmoid,
        Activation::Tanh,
        Activation::Elu,
        Activation::TwistedTanh,
        Activation::Gelu,
    ];

    /// Select the element-wise kernel for this activation.
    pub fn kernel<T: Real>(self) -> Kernel<T> {
        match self {
            Activation::Identity => identity::<T>,
            Activation::Sigmoid => sigmoid::<T>,
            Activation::Tanh => tanh::<T>,
            Activation::Elu => elu::<T>,
            Activation::TwistedTanh => twisted_tanh::<T>,
            Activation::Gelu => gelu::<T>,
        }
    }

    /// Evaluate a single element.
    pub fn evaluate<T: Real>(self, x: T) -> (T, T) {
        self.kernel::<T>()(x)
    }

    /// Canonical lowercase name, as accepted in configs.
    pub fn name(self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::Sigmoid => "sigmoid",
            Activation::Tanh => "tanh",
            Activation::Elu => "elu",
            Activation::TwistedTanh => "twisted_tanh",
            Activation::Gelu => "gelu",
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = NnpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "identity" | "asis" => Ok(Activation::Identity),
            "sigmoid" => Ok(Activation::Sigmoid),
            "tanh" => Ok(Activation::Tanh),
            "elu" => Ok(Activation::Elu),
            "twisted_tanh" | "twtanh" => Ok(Activation::TwistedTanh),
            "gelu" => Ok(Activation::Gelu),
            _ => Err(NnpError::InvalidConfig(format!(
                "Invalid activation function '{}'. Must be one of: \
                 identity, sigmoid, tanh, elu, twisted_tanh, gelu",
                s
            ))),
        }
    }
}

/// Identity: `(x, 1)`.
pub fn identity<T: Real>(x: T) -> (T, T) {
    (x, T::ONE)
}

/// Logistic sigmoid and its derivative, saturated beyond [`SIGMOID_MAX`].
pub fn sigmoid<T: Real>(x: T) -> (T, T) {
    let max = T::from_f64(SIGMOID_MAX);
    if x < -max {
        (T::ZERO, T::ZERO)
    } else if x > max {
        (T::ONE, T::ZERO)
    } else {
        let y = T::ONE / (T::ONE + (-x).exp());
        (y, y * (T::ONE - y))
    }
}

/// Hyperbolic tangent and its derivative.
pub fn tanh<T: Real>(x: T) -> (T, T) {
    let y = x.tanh();
    (y, T::ONE - y * y)
}

/// ELU with unit scale and its derivative.
pub fn elu<T: Real>(x: T) -> (T, T) {
    if x >= T::ZERO {
        (x, T::ONE)
    } else {
        let y = x.exp() - T::ONE;
        (y, y + T::ONE)
    }
}

/// `tanh(x) + alpha * x` with `alpha` = [`TWTANH_ALPHA`], and its derivative.
pub fn twisted_tanh<T: Real>(x: T) -> (T, T) {
    let alpha = T::from_f64(TWTANH_ALPHA);
    let y = x.tanh();
    (y + alpha * x, (T::ONE - y * y) + alpha)
}

/// Exact GELU `x * Phi(x)` and its derivative.
pub fn gelu<T: Real>(x: T) -> (T, T) {
    // phi: standard normal CDF, dphi: its density
    let phi = T::HALF * (T::ONE + (x / T::from_f64(ROOT2)).erf());
    let dphi = (-T::HALF * x * x).exp() / T::from_f64(ROOT2PI);
    (x * phi, phi + x * dphi)
}

/// Apply `kernel` in place over `data`, writing derivatives into `derivative`.
///
/// Both slices must have the same length.
pub fn operate_activation<T: Real>(kernel: Kernel<T>, data: &mut [T], derivative: &mut [T]) {
    debug_assert_eq!(data.len(), derivative.len());

    data.par_iter_mut()
        .zip(derivative.par_iter_mut())
        .for_each(|(value, drv)| {
            let (y, z) = kernel(*value);
            *value = y;
            *drv = z;
        });
}
