//! Post-step analysis.
//!
//! - [`SedimentBudget`]: per-call sediment volume accounting

mod budget;

pub use budget::SedimentBudget;
