//! Dense (fully connected) layer implementation
//!
//! The layer performs `y = f(W^T x + b)` for a batch of samples, where
//! `W` is `num_inp_nodes x num_out_nodes` and `f` one of the activations of
//! [`Activation`]. Weights are stored column by column: the weight from input
//! `i` to output `o` is at `i + o * num_inp_nodes`, which is also the order
//! of the weight section in parameter files.

use std::io::BufRead;
use std::sync::Arc;

use log::{info, warn};
use rayon::prelude::*;

use crate::comm::{Communicator, COORDINATOR_RANK};
use crate::error::{NnpError, Result};
use crate::layers::Layer;
use crate::linalg::{gemm, Transpose};
use crate::memory::{good_memory_size, BatchBuffer, BufferAllocator, HeapAllocator};
use crate::real::{NnpReal, Real};
use crate::scan::scan_reals;
use crate::utils::activations::{operate_activation, Activation, Kernel};
use crate::utils::rng::XorShiftRng;

/// Dense layer with weights, biases and batch working buffers.
///
/// # Fields
///
/// * `weight` - `num_inp_nodes * num_out_nodes` values, column-major
/// * `bias` - `num_out_nodes` values
/// * `inp_data` - input of the current batch, filled by the caller
/// * `inp_grad` - gradient with respect to the input, filled by `go_backward`
/// * `out_drv1` - activation derivative cached by `go_forward`
///
/// # Example
///
/// ```
/// use rust_nnp_layer::layers::{DenseLayer, Layer};
/// use rust_nnp_layer::utils::Activation;
///
/// let mut layer = DenseLayer::<f64>::new(2, 3, Activation::Identity).unwrap();
/// layer.weights_mut().copy_from_slice(&[1.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
/// layer.set_size_of_batch(1).unwrap();
/// layer.input_mut().copy_from_slice(&[2.0, 3.0]);
///
/// let mut output = [0.0; 3];
/// layer.go_forward(&mut output).unwrap();
/// assert_eq!(output, [2.0, 3.0, 5.0]);
/// ```
pub struct DenseLayer<T: Real = NnpReal> {
    num_inp_nodes: usize,
    num_out_nodes: usize,
    activation: Activation,
    kernel: Kernel<T>,

    weight: Vec<T>,
    bias: Vec<T>,

    size_batch: usize,
    size_batch_max: usize,
    inp_data: BatchBuffer<T>,
    inp_grad: BatchBuffer<T>,
    out_drv1: BatchBuffer<T>,
    derivative_cached: bool,

    allocator: Arc<dyn BufferAllocator<T>>,
}

impl<T: Real> DenseLayer<T> {
    /// Create a layer whose batch buffers come from the heap.
    pub fn new(num_inp_nodes: usize, num_out_nodes: usize, activation: Activation) -> Result<Self> {
        Self::with_allocator(
            num_inp_nodes,
            num_out_nodes,
            activation,
            0,
            Arc::new(HeapAllocator),
        )
    }

    /// Create a layer whose batch buffers are managed by `allocator`.
    ///
    /// `memory_tag` distinguishes the buffer names of layers sharing one
    /// allocator (`nnp:inpData{tag}`, `nnp:inpGrad{tag}`, `nnp:outDrv1{tag}`).
    /// Weights and biases start at zero. Batch buffers are allocated by the
    /// first [`Layer::set_size_of_batch`].
    pub fn with_allocator(
        num_inp_nodes: usize,
        num_out_nodes: usize,
        activation: Activation,
        memory_tag: usize,
        allocator: Arc<dyn BufferAllocator<T>>,
    ) -> Result<Self> {
        if num_inp_nodes < 1 {
            return Err(NnpError::NonPositiveSize("input"));
        }

        if num_out_nodes < 1 {
            return Err(NnpError::NonPositiveSize("output"));
        }

        Ok(Self {
            num_inp_nodes,
            num_out_nodes,
            activation,
            kernel: activation.kernel::<T>(),
            weight: vec![T::ZERO; num_inp_nodes * num_out_nodes],
            bias: vec![T::ZERO; num_out_nodes],
            size_batch: 0,
            size_batch_max: 0,
            inp_data: BatchBuffer::new(format!("nnp:inpData{}", memory_tag), num_inp_nodes),
            inp_grad: BatchBuffer::new(format!("nnp:inpGrad{}", memory_tag), num_inp_nodes),
            out_drv1: BatchBuffer::new(format!("nnp:outDrv1{}", memory_tag), num_out_nodes),
            derivative_cached: false,
            allocator,
        })
    }

    /// Get the number of input nodes.
    pub fn num_inp_nodes(&self) -> usize {
        self.num_inp_nodes
    }

    /// Get the number of output nodes.
    pub fn num_out_nodes(&self) -> usize {
        self.num_out_nodes
    }

    /// Get the activation applied to every output node.
    pub fn activation(&self) -> Activation {
        self.activation
    }

    /// Number of samples the batch buffers can hold without reallocation.
    pub fn batch_capacity(&self) -> usize {
        self.size_batch_max
    }

    /// All weights, column-major (`inp + out * num_inp_nodes`).
    pub fn weights(&self) -> &[T] {
        &self.weight
    }

    /// Mutable access to all weights, same layout as [`DenseLayer::weights`].
    pub fn weights_mut(&mut self) -> &mut [T] {
        &mut self.weight
    }

    /// Get the biases, one per output node.
    pub fn biases(&self) -> &[T] {
        &self.bias
    }

    /// Mutable access to the biases.
    pub fn biases_mut(&mut self) -> &mut [T] {
        &mut self.bias
    }

    /// Weight from input node `inp` to output node `out`.
    ///
    /// # Panics
    ///
    /// Panics if either index is out of range.
    pub fn weight(&self, inp: usize, out: usize) -> T {
        assert!(inp < self.num_inp_nodes && out < self.num_out_nodes);
        self.weight[inp + out * self.num_inp_nodes]
    }

    /// Set the weight from input node `inp` to output node `out`.
    pub fn set_weight(&mut self, inp: usize, out: usize, value: T) -> Result<()> {
        if inp >= self.num_inp_nodes {
            return Err(NnpError::IndexOutOfRange {
                name: "input node",
                index: inp,
                size: self.num_inp_nodes,
            });
        }
        self.check_output_node(out)?;

        self.weight[inp + out * self.num_inp_nodes] = value;
        Ok(())
    }

    /// Set the bias of output node `out`.
    pub fn set_bias(&mut self, out: usize, value: T) -> Result<()> {
        self.check_output_node(out)?;

        self.bias[out] = value;
        Ok(())
    }

    fn check_output_node(&self, out: usize) -> Result<()> {
        if out >= self.num_out_nodes {
            return Err(NnpError::IndexOutOfRange {
                name: "output node",
                index: out,
                size: self.num_out_nodes,
            });
        }
        Ok(())
    }

    /// Input of the current batch, `num_inp_nodes` values per sample.
    pub fn input(&self) -> &[T] {
        self.inp_data.as_slice()
    }

    /// Mutable input of the current batch, filled by the caller before `go_forward`.
    pub fn input_mut(&mut self) -> &mut [T] {
        self.inp_data.as_mut_slice()
    }

    /// Input gradient written by the last `go_backward(.., true)`.
    pub fn input_gradient(&self) -> &[T] {
        self.inp_grad.as_slice()
    }

    /// Activation derivative cached by the last `go_forward`.
    pub fn output_derivative(&self) -> &[T] {
        self.out_drv1.as_slice()
    }

    /// Xavier/Glorot uniform initialisation with zero biases.
    ///
    /// Weights are drawn from [-limit, limit] with
    /// `limit = sqrt(6 / (num_inp_nodes + num_out_nodes))`.
    pub fn randomize_weights(&mut self, rng: &mut XorShiftRng) {
        let limit = (6.0 / (self.num_inp_nodes + self.num_out_nodes) as f64).sqrt();

        for value in &mut self.weight {
            *value = T::from_f64(rng.uniform(-limit, limit));
        }
        self.bias.fill(T::ZERO);
    }

    /// Load weights and biases from a parameter stream, identically on every
    /// worker of `comm`.
    ///
    /// Only the coordinator reads `source`; other workers pass `None`. The
    /// stream holds `num_inp_nodes * num_out_nodes` weights followed by
    /// `num_out_nodes` biases. A read failure on the coordinator is broadcast
    /// before anyone returns, so either every worker gets the same
    /// [`NnpError::Scan`] or every worker continues to the parameter
    /// broadcast. With `zero_bias` the biases are cleared afterwards.
    pub fn scan_weight<C: Communicator>(
        &mut self,
        mut source: Option<&mut dyn BufRead>,
        zero_bias: bool,
        comm: &C,
    ) -> Result<()> {
        let coordinator = comm.is_coordinator();

        let mut ierr = 0;
        if coordinator {
            ierr = scan_section(source.as_deref_mut(), &mut self.weight, "weight");
        }

        comm.broadcast_flag(&mut ierr, COORDINATOR_RANK);
        if ierr != 0 {
            return Err(NnpError::Scan("weight"));
        }

        ierr = 0;
        if coordinator {
            ierr = scan_section(source.as_deref_mut(), &mut self.bias, "bias");
        }

        comm.broadcast_flag(&mut ierr, COORDINATOR_RANK);
        if ierr != 0 {
            return Err(NnpError::Scan("bias"));
        }

        comm.broadcast_reals(&mut self.weight, COORDINATOR_RANK);
        comm.broadcast_reals(&mut self.bias, COORDINATOR_RANK);

        if zero_bias {
            self.bias.fill(T::ZERO);
        }

        if coordinator {
            info!(
                "loaded dense layer {}x{} ({}) on {} worker(s)",
                self.num_inp_nodes,
                self.num_out_nodes,
                self.activation,
                comm.size()
            );
        }
        Ok(())
    }

    /// Copy trained parameters from `src`, remapping its input nodes.
    ///
    /// Input node `i` of `src` lands on input node `map_inp_nodes[i]` of this
    /// layer. Entries outside `0..num_inp_nodes` drop that input. Biases are
    /// copied as they are. Weights of inputs that nothing maps to keep their
    /// current values, so initialise them beforehand (zeros after
    /// construction, or [`DenseLayer::randomize_weights`]).
    pub fn project_weight_from(
        &mut self,
        src: &DenseLayer<T>,
        map_inp_nodes: &[isize],
    ) -> Result<()> {
        if map_inp_nodes.len() < src.num_inp_nodes {
            return Err(NnpError::ShortBuffer {
                name: "map of input nodes",
                expected: src.num_inp_nodes,
                actual: map_inp_nodes.len(),
            });
        }

        if src.num_out_nodes != self.num_out_nodes {
            return Err(NnpError::ProjectionMismatch("#out-nodes"));
        }

        if src.activation != self.activation {
            return Err(NnpError::ProjectionMismatch("activation"));
        }

        let num_inp_nodes1 = src.num_inp_nodes;
        let num_inp_nodes2 = self.num_inp_nodes;

        self.weight
            .par_chunks_mut(num_inp_nodes2)
            .zip(self.bias.par_iter_mut())
            .zip(src.weight.par_chunks(num_inp_nodes1))
            .zip(src.bias.par_iter())
            .for_each(|(((weight2, bias2), weight1), bias1)| {
                *bias2 = *bias1;

                for (value, &iinp2) in weight1.iter().zip(map_inp_nodes) {
                    if 0 <= iinp2 && (iinp2 as usize) < num_inp_nodes2 {
                        weight2[iinp2 as usize] = *value;
                    }
                }
            });

        info!(
            "projected dense layer {}x{} onto {}x{}",
            num_inp_nodes1, self.num_out_nodes, num_inp_nodes2, self.num_out_nodes
        );
        Ok(())
    }
}

/// Read one parameter section on the coordinator, returning the error flag.
fn scan_section<T: Real, R: BufRead + ?Sized>(
    source: Option<&mut R>,
    values: &mut [T],
    section: &str,
) -> i32 {
    let Some(reader) = source else {
        warn!("no parameter stream to scan @{}", section);
        return 1;
    };

    match scan_reals(reader, values) {
        Ok(()) => 0,
        Err(err) => {
            warn!("cannot scan neural network @{}: {}", section, err);
            1
        }
    }
}

impl<T: Real> Layer<T> for DenseLayer<T> {
    fn set_size_of_batch(&mut self, size_batch: usize) -> Result<()> {
        if size_batch < 1 {
            return Err(NnpError::NonPositiveBatch);
        }

        if self.size_batch != size_batch {
            self.derivative_cached = false;
        }
        self.size_batch = size_batch;

        if self.size_batch_max < self.size_batch {
            self.size_batch_max = good_memory_size(self.size_batch);

            let allocator = self.allocator.as_ref();
            self.inp_data.ensure_capacity(self.size_batch_max, allocator);
            self.inp_grad.ensure_capacity(self.size_batch_max, allocator);
            self.out_drv1.ensure_capacity(self.size_batch_max, allocator);
        }

        self.inp_data.set_rows(size_batch);
        self.inp_grad.set_rows(size_batch);
        self.out_drv1.set_rows(size_batch);
        Ok(())
    }

    fn go_forward(&mut self, output: &mut [T]) -> Result<()> {
        if self.size_batch < 1 {
            return Err(NnpError::NonPositiveBatch);
        }

        if !self.inp_data.is_allocated() {
            return Err(NnpError::Unallocated("inpData"));
        }

        let num_data = self.num_out_nodes * self.size_batch;
        if output.len() < num_data {
            return Err(NnpError::ShortBuffer {
                name: "outData",
                expected: num_data,
                actual: output.len(),
            });
        }
        let output = &mut output[..num_data];

        // inpData -> outData, through neural network
        gemm(
            Transpose::Ordinary,
            Transpose::None,
            self.num_out_nodes,
            self.size_batch,
            self.num_inp_nodes,
            T::ONE,
            &self.weight,
            self.num_inp_nodes,
            self.inp_data.as_slice(),
            self.num_inp_nodes,
            T::ZERO,
            output,
            self.num_out_nodes,
        );

        let bias = &self.bias;
        output
            .par_chunks_mut(self.num_out_nodes)
            .for_each(|sample| {
                for (value, b) in sample.iter_mut().zip(bias) {
                    *value += *b;
                }
            });

        operate_activation(self.kernel, output, self.out_drv1.as_mut_slice());
        self.derivative_cached = true;
        Ok(())
    }

    fn go_backward(&mut self, grad_output: &mut [T], to_input_grad: bool) -> Result<()> {
        if self.size_batch < 1 {
            return Err(NnpError::NonPositiveBatch);
        }

        let num_data = self.num_out_nodes * self.size_batch;
        if grad_output.len() < num_data {
            return Err(NnpError::ShortBuffer {
                name: "outGrad",
                expected: num_data,
                actual: grad_output.len(),
            });
        }

        if !self.derivative_cached {
            return Err(NnpError::MissingDerivative);
        }
        let grad_output = &mut grad_output[..num_data];

        // derive activation function
        grad_output
            .par_iter_mut()
            .zip(self.out_drv1.as_slice().par_iter())
            .for_each(|(grad, drv)| *grad *= *drv);
        self.derivative_cached = false;

        // outGrad -> inpGrad, through neural network
        if to_input_grad {
            if !self.inp_grad.is_allocated() {
                return Err(NnpError::Unallocated("inpGrad"));
            }

            gemm(
                Transpose::None,
                Transpose::None,
                self.num_inp_nodes,
                self.size_batch,
                self.num_out_nodes,
                T::ONE,
                &self.weight,
                self.num_inp_nodes,
                grad_output,
                self.num_out_nodes,
                T::ZERO,
                self.inp_grad.as_mut_slice(),
                self.num_inp_nodes,
            );
        }

        Ok(())
    }

    fn input_size(&self) -> usize {
        self.num_inp_nodes
    }

    fn output_size(&self) -> usize {
        self.num_out_nodes
    }

    fn batch_size(&self) -> usize {
        self.size_batch
    }

    fn parameter_count(&self) -> usize {
        self.weight.len() + self.bias.len()
    }
}

impl<T: Real> Drop for DenseLayer<T> {
    fn drop(&mut self) {
        let allocator = self.allocator.as_ref();
        self.inp_data.release(allocator);
        self.inp_grad.release(allocator);
        self.out_drv1.release(allocator);
    }
}
