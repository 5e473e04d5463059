//! Layer trait definition
//!
//! This is the contract the network-chain component relies on: it sizes the
//! batch, fills each layer's input, runs the forward pass layer by layer and
//! then the backward pass in reverse order.

use crate::error::Result;
use crate::real::Real;

/// Batched forward/backward stage of a network.
///
/// Data is laid out sample by sample: the values of one sample are
/// contiguous, so a batch of `n` samples with `w` nodes is `n * w` values.
///
/// # Example
///
/// ```ignore
/// layer.set_size_of_batch(batch_size)?;
/// layer.input_mut().copy_from_slice(&descriptors);
/// layer.go_forward(&mut energies)?;
///
/// // dE/dy for every output
/// layer.go_backward(&mut grad_output, true)?;
/// let grad_descriptors = layer.input_gradient();
/// ```
pub trait Layer<T: Real> {
    /// Set the number of samples of the next forward/backward cycle.
    ///
    /// Grows the batch buffers when needed, never shrinks them.
    fn set_size_of_batch(&mut self, size_batch: usize) -> Result<()>;

    /// Compute `activation(W^T x + b)` for the whole batch into `output`,
    /// caching the activation derivative for [`Layer::go_backward`].
    fn go_forward(&mut self, output: &mut [T]) -> Result<()>;

    /// Scale `grad_output` in place by the cached activation derivative and,
    /// when `to_input_grad` is set, compute the input gradient `W g`.
    ///
    /// With `to_input_grad == false` the input-gradient buffer is untouched.
    fn go_backward(&mut self, grad_output: &mut [T], to_input_grad: bool) -> Result<()>;

    fn input_size(&self) -> usize;

    fn output_size(&self) -> usize;

    /// Current number of samples (0 before the first `set_size_of_batch`).
    fn batch_size(&self) -> usize;

    /// Weights plus biases.
    fn parameter_count(&self) -> usize;
}
