//! Layer configuration
//!
//! A dense layer can be described in JSON and built from that description:
//!
//! ```json
//! {
//!   "input_size": 12,
//!   "output_size": 8,
//!   "activation": "twisted_tanh",
//!   "zero_bias": false,
//!   "memory_tag": 0
//! }
//! ```
//!
//! Accepted activation names: `identity` (or `asis`), `sigmoid`, `tanh`,
//! `elu`, `twisted_tanh` (or `twtanh`) and `gelu`.

use std::fs;
use std::sync::Arc;

use serde::Deserialize;

use crate::error::{NnpError, Result};
use crate::layers::DenseLayer;
use crate::memory::BufferAllocator;
use crate::real::Real;
use crate::utils::activations::Activation;

/// Description of one dense layer.
#[derive(Debug, Clone, Deserialize)]
pub struct LayerConfig {
    /// Number of input nodes (descriptor length for a first layer)
    pub input_size: usize,

    /// Number of output nodes
    pub output_size: usize,

    pub activation: Activation,

    /// Clear the biases after loading weights
    #[serde(default)]
    pub zero_bias: bool,

    /// Suffix of the batch buffer names, unique per layer sharing an allocator
    #[serde(default)]
    pub memory_tag: usize,
}

/// Loads a layer configuration from a JSON file.
///
/// # Examples
///
/// ```no_run
/// use rust_nnp_layer::config::load_config;
///
/// let cfg = load_config("config/layer.json").unwrap();
/// assert!(cfg.input_size > 0);
/// ```
pub fn load_config(path: &str) -> Result<LayerConfig> {
    let contents = fs::read_to_string(path)?;
    let config: LayerConfig = serde_json::from_str(&contents)?;
    validate_config(&config)?;
    Ok(config)
}

fn validate_config(config: &LayerConfig) -> Result<()> {
    if config.input_size == 0 {
        return Err(NnpError::InvalidConfig(
            "input_size must be positive".to_string(),
        ));
    }

    if config.output_size == 0 {
        return Err(NnpError::InvalidConfig(
            "output_size must be positive".to_string(),
        ));
    }

    Ok(())
}

/// Build a layer described by `config`, with buffers from `allocator`.
pub fn build_layer<T: Real>(
    config: &LayerConfig,
    allocator: Arc<dyn BufferAllocator<T>>,
) -> Result<DenseLayer<T>> {
    validate_config(config)?;
    DenseLayer::with_allocator(
        config.input_size,
        config.output_size,
        config.activation,
        config.memory_tag,
        allocator,
    )
}
