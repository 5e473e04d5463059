//! Dense layer engine for neural network interatomic potentials
//!
//! This library evaluates one fully connected layer of an atomic neural
//! network over a batch of atomic environments: the forward pass, the
//! analytic gradient with respect to the layer input, and the weight
//! lifecycle (distributed loading and projection onto a new input layout).
//!
//! # Modules
//!
//! - `layers`: Layer trait and the dense layer
//! - `utils`: Activation functions and the initialisation RNG
//! - `memory`: Batch buffers and the pluggable allocator
//! - `comm`: Collective communication used by weight loading
//! - `linalg`: GEMM primitive (portable or CBLAS)
//! - `scan`: Reader for parameter streams
//! - `config`: JSON layer configuration
//! - `real`: Precision abstraction (`f32`/`f64`)
//! - `error`: Error type

#[cfg(feature = "blas")]
extern crate blas_src;

pub mod comm;
pub mod config;
pub mod error;
pub mod layers;
pub mod linalg;
pub mod memory;
pub mod real;
pub mod scan;
pub mod utils;

pub use error::{NnpError, Result};
pub use layers::{DenseLayer, Layer};
pub use real::{NnpReal, Real};
pub use utils::Activation;
