//! # sedflux-rs
//!
//! Sediment-flux-dependent channel incision on single-receiver drainage
//! networks.
//!
//! Given drainage area, receivers, processing order and slopes from an
//! external flow router, the eroder advances bedrock elevation and a
//! persistent loose-sediment layer over one coarse timestep, sub-stepping
//! internally for stability. This crate provides:
//! - Sediment-flux response functions f(Qs/Qc) (constant, linear decline,
//!   almost parabolic, generalized humped)
//! - Stream-power erosion and transport-capacity laws
//! - A headwater-to-outlet routing kernel with a bounded fixed-point solve
//! - Wave and convergence sub-step criteria
//! - Solver diagnostics and a per-call sediment budget

pub mod analysis;
pub mod eroder;
pub mod error;
pub mod laws;
pub mod network;
pub mod solver;
pub mod types;

// Re-export main types for convenience
pub use analysis::SedimentBudget;
pub use eroder::{ErosionOutputs, RunoffRate, SedDepConfig, SedDepEroder, field_names};
pub use error::{Result, SedDepError};
pub use laws::{PowerLaw, ResponseFunction, ResponseShape, StreamPowerLaws, TransportLaw};
pub use network::{FloodedNodes, FlowNetwork, NodeStatus};
pub use solver::{
    ErosionReport, MIN_SUBSTEP_FRACTION, RouterInputs, RouterScratch, RouterStats,
    SolverDiagnostics, StabilityConfig, StabilityController, SubstepClock, SubstepLimit,
    route_sediment_downstream,
};
pub use types::{SECONDS_PER_YEAR, Seconds, Years};
