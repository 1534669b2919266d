//! Drainage network inputs.
//!
//! - [`FlowNetwork`]: receivers, order, area, slope and link lengths from flow routing
//! - [`FloodedNodes`]: optional flooded-node override from a lake filler

mod flooded;
mod flow;

pub use flooded::FloodedNodes;
pub use flow::{FlowNetwork, NodeStatus};
