//! Constitutive laws for sediment-dependent incision.
//!
//! - [`ResponseFunction`]: sediment-flux response f(Qs/Qc)
//! - [`StreamPowerLaws`]: detachment-limited erosion rate and transport capacity

mod power_law;
mod response;

pub use power_law::{MIN_SLOPE, PowerLaw, StreamPowerLaws, TransportLaw};
pub use response::{ResponseFunction, ResponseShape};
