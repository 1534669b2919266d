//! Sediment-flux-dependent eroder.
//!
//! - [`SedDepEroder`]: owns the sediment layer and runs the sub-step loop
//! - [`SedDepConfig`]: laws, densities, runoff and solver settings
//! - [`ErosionOutputs`]: per-node fields published after each call

mod config;
mod outputs;
mod sed_dep;

pub use config::{RunoffRate, SedDepConfig};
pub use outputs::{ErosionOutputs, field_names};
pub use sed_dep::SedDepEroder;
