//! Sub-stepping solver.
//!
//! - [`route_sediment_downstream`]: one headwater-to-outlet routing pass
//! - [`StabilityController`]: sub-step length from the wave and convergence bounds
//! - [`SolverDiagnostics`] / [`ErosionReport`]: counters and per-call summaries

mod diagnostics;
mod router;
mod stability;

pub use diagnostics::{ErosionReport, SolverDiagnostics};
pub use router::{RouterInputs, RouterScratch, RouterStats, route_sediment_downstream};
pub use stability::{
    ConvergenceBound, MIN_SUBSTEP_FRACTION, StabilityConfig, StabilityController, SubstepClock,
    SubstepLimit,
};
