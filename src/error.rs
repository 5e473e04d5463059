//! Error type shared by every operation of the layer engine.
//!
//! None of these errors is recoverable inside the engine. Callers are expected
//! to propagate them up to process termination rather than retry.

use std::io;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NnpError {
    /// A node count passed at construction was zero.
    #[error("{0} size of neural network is not positive.")]
    NonPositiveSize(&'static str),

    #[error("size of batch is not positive.")]
    NonPositiveBatch,

    /// A batch buffer was accessed before `set_size_of_batch` allocated it.
    #[error("{0} is not allocated.")]
    Unallocated(&'static str),

    /// A caller-provided slice is too short for the current batch or layer.
    #[error("{name} is too short: expected at least {expected} values, got {actual}.")]
    ShortBuffer {
        name: &'static str,
        expected: usize,
        actual: usize,
    },

    /// `go_backward` was called without a `go_forward` for the current batch.
    #[error("derivative of activation is not cached, call go_forward first.")]
    MissingDerivative,

    /// A node index passed to a parameter setter is out of range.
    #[error("{name} index {index} is out of range (size {size}).")]
    IndexOutOfRange {
        name: &'static str,
        index: usize,
        size: usize,
    },

    #[error("cannot project weight, for incorrect {0}.")]
    ProjectionMismatch(&'static str),

    /// Weight loading failed on the coordinator. Every worker of the group
    /// observes this error together.
    #[error("cannot scan neural network @{0}")]
    Scan(&'static str),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, NnpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_descriptive() {
        assert_eq!(
            NnpError::NonPositiveSize("input").to_string(),
            "input size of neural network is not positive."
        );
        assert_eq!(
            NnpError::Scan("bias").to_string(),
            "cannot scan neural network @bias"
        );
        assert_eq!(
            NnpError::ProjectionMismatch("#out-nodes").to_string(),
            "cannot project weight, for incorrect #out-nodes."
        );
    }

    #[test]
    fn test_short_buffer_message() {
        let err = NnpError::ShortBuffer {
            name: "outData",
            expected: 6,
            actual: 3,
        };
        assert_eq!(
            err.to_string(),
            "outData is too short: expected at least 6 values, got 3."
        );
    }
}
