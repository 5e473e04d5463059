//! Layer abstractions of the neural network potential
//!
//! The [`Layer`] trait is the contract consumed by the network-chain
//! component; [`DenseLayer`] is its fully connected implementation.

mod r#trait;
pub mod dense;

// Re-export the Layer trait for convenience
pub use r#trait::Layer;
pub use dense::DenseLayer;
