//! Shared utilities for the layer engine
//!
//! Activation kernels and the random number generator used for weight
//! initialisation.

pub mod activations;
pub mod rng;

pub use activations::Activation;
pub use rng::XorShiftRng;
