//! Error types for configuration and network validation.
//!
//! Every variant here is fatal and is raised before any state is mutated.
//! Numerical non-convergence inside the router is deliberately *not* an
//! error; it is counted in [`SolverDiagnostics`](crate::solver::SolverDiagnostics).

use thiserror::Error;

/// Errors raised while configuring or running the sediment-dependent eroder.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SedDepError {
    /// Response-function family name not recognised.
    #[error(
        "Unknown sediment flux function '{0}'; use one of 'generalized_humped', \
         'None', 'linear_decline', 'almost_parabolic'"
    )]
    UnknownResponseFunction(String),

    /// Response-function family recognised but refused.
    #[error("Sediment flux function '{name}' is not supported: {reason}")]
    UnsupportedResponseFunction { name: String, reason: String },

    /// Transport law name not recognised.
    #[error("Supplied transport law form '{0}' not recognised; use 'power_law'")]
    UnknownTransportLaw(String),

    /// Legacy transport law names that are explicitly rejected.
    #[error("Transport law '{name}' is not permitted: {reason}")]
    RetiredTransportLaw { name: String, reason: String },

    /// Per-node runoff array does not match the node count.
    #[error("Runoff rate array has {actual} entries, network has {expected} nodes")]
    RunoffLengthMismatch { expected: usize, actual: usize },

    /// Receiver array describes a route-to-multiple network.
    #[error(
        "Receiver array has {len} entries for {n_nodes} nodes: a route-to-multiple \
         flow director has been run; only single-receiver trees are supported"
    )]
    MultipleReceivers { n_nodes: usize, len: usize },

    /// A per-node array has the wrong length.
    #[error("Field '{field}' has {actual} entries, expected {expected}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Receiver id out of range.
    #[error("Node {node} drains to receiver {receiver}, which is not a node")]
    InvalidReceiver { node: usize, receiver: usize },

    /// Processing order is not usable for the downstream pass.
    #[error("Invalid processing order: {0}")]
    InvalidProcessingOrder(String),

    /// Flooded node id out of range.
    #[error("Flooded node id {node} out of range for {n_nodes} nodes")]
    InvalidFloodedNode { node: usize, n_nodes: usize },

    /// Numeric configuration parameter outside its valid range.
    #[error("Invalid parameter {name} = {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Requested timestep is negative or not finite.
    #[error("Invalid timestep: dt = {0} years")]
    InvalidTimestep(f64),
}

impl SedDepError {
    /// Create a shape mismatch error.
    pub fn shape_mismatch(field: &'static str, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            field,
            expected,
            actual,
        }
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter { name, value }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SedDepError>;
