//! Single-receiver drainage network produced by flow routing.
//!
//! The network is read-only for the duration of one erosion call. Slopes are
//! recomputed by the eroder into its own buffer between sub-steps, along the
//! receiver links fixed here.

use crate::error::{Result, SedDepError};

/// Boundary status of a node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodeStatus {
    /// Interior node: erodes, deposits and forwards sediment.
    #[default]
    Core,
    /// Open boundary: receives sediment and exports it from the domain.
    FixedValue,
    /// Closed boundary: takes no part in routing.
    Closed,
}

impl NodeStatus {
    /// True for interior nodes.
    #[inline(always)]
    pub fn is_core(self) -> bool {
        matches!(self, Self::Core)
    }
}

/// Flow-routing inputs for one erosion call.
///
/// All arrays are indexed by node id and must have `n_nodes` entries.
#[derive(Clone, Debug)]
pub struct FlowNetwork {
    /// Number of nodes
    pub n_nodes: usize,
    /// Upstream contributing area (m²)
    pub drainage_area: Vec<f64>,
    /// Receiver node; a node draining to itself is an outlet or a pit
    pub receiver: Vec<usize>,
    /// Topological order, outlet-first: every node appears after its receiver
    pub upstream_order: Vec<usize>,
    /// Steepest downslope gradient (dimensionless)
    pub slope: Vec<f64>,
    /// Length of the link to the receiver (m), `None` for non-draining nodes
    pub link_length: Vec<Option<f64>>,
    /// Boundary status per node
    pub status: Vec<NodeStatus>,
    /// Area of the cell around each node (m²), zero where there is no cell
    pub cell_area: Vec<f64>,
}

impl FlowNetwork {
    /// Assemble a network and validate it.
    ///
    /// # Arguments
    /// * `drainage_area` - Contributing area per node
    /// * `receiver` - Receiver per node (must be single-receiver)
    /// * `upstream_order` - Outlet-first processing order
    /// * `slope` - Steepest downslope gradient per node
    /// * `link_length` - Length of each node's link to its receiver
    /// * `status` - Boundary status per node
    /// * `cell_area` - Cell area per node
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        drainage_area: Vec<f64>,
        receiver: Vec<usize>,
        upstream_order: Vec<usize>,
        slope: Vec<f64>,
        link_length: Vec<Option<f64>>,
        status: Vec<NodeStatus>,
        cell_area: Vec<f64>,
    ) -> Result<Self> {
        let network = Self {
            n_nodes: drainage_area.len(),
            drainage_area,
            receiver,
            upstream_order,
            slope,
            link_length,
            status,
            cell_area,
        };
        network.validate()?;
        Ok(network)
    }

    /// Check array shapes, receiver range and the processing-order contract.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_nodes;

        // A route-to-multiple director stores k receivers per node.
        if self.receiver.len() != n && n > 0 && self.receiver.len() % n == 0 {
            return Err(SedDepError::MultipleReceivers {
                n_nodes: n,
                len: self.receiver.len(),
            });
        }

        check_len("drainage_area", n, self.drainage_area.len())?;
        check_len("receiver", n, self.receiver.len())?;
        check_len("upstream_order", n, self.upstream_order.len())?;
        check_len("slope", n, self.slope.len())?;
        check_len("link_length", n, self.link_length.len())?;
        check_len("status", n, self.status.len())?;
        check_len("cell_area", n, self.cell_area.len())?;

        for (node, &receiver) in self.receiver.iter().enumerate() {
            if receiver >= n {
                return Err(SedDepError::InvalidReceiver { node, receiver });
            }
        }

        check_non_negative("drainage_area", &self.drainage_area)?;
        check_non_negative("cell_area", &self.cell_area)?;
        for &length in self.link_length.iter().flatten() {
            if !(length.is_finite() && length > 0.0) {
                return Err(SedDepError::invalid_parameter("link_length", length));
            }
        }

        let mut position = vec![usize::MAX; n];
        for (pos, &node) in self.upstream_order.iter().enumerate() {
            if node >= n {
                return Err(SedDepError::InvalidProcessingOrder(format!(
                    "node id {} out of range",
                    node
                )));
            }
            if position[node] != usize::MAX {
                return Err(SedDepError::InvalidProcessingOrder(format!(
                    "node {} appears more than once",
                    node
                )));
            }
            position[node] = pos;
        }

        // Visited in reverse, so a receiver must sit earlier in the order.
        for node in 0..n {
            let receiver = self.receiver[node];
            if receiver != node && position[receiver] > position[node] {
                return Err(SedDepError::InvalidProcessingOrder(format!(
                    "node {} would be processed after its receiver {}",
                    node, receiver
                )));
            }
        }

        Ok(())
    }

    /// Nodes in headwater-first order (the reverse of `upstream_order`).
    pub fn downstream_order(&self) -> impl Iterator<Item = usize> + '_ {
        self.upstream_order.iter().rev().copied()
    }

    /// True when the node is interior.
    #[inline(always)]
    pub fn is_core(&self, node: usize) -> bool {
        self.status[node].is_core()
    }

    /// Ids of interior nodes.
    pub fn core_nodes(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_nodes).filter(move |&i| self.is_core(i))
    }

    /// True for a node that drains to itself.
    #[inline(always)]
    pub fn is_sink(&self, node: usize) -> bool {
        self.receiver[node] == node
    }

    /// Interior node with a defined link to a distinct receiver.
    #[inline(always)]
    pub fn is_core_draining(&self, node: usize) -> bool {
        self.is_core(node) && !self.is_sink(node) && self.link_length[node].is_some()
    }

    /// Recompute downslope gradients from an updated elevation.
    ///
    /// Only core draining nodes get a slope; all others are zero. Negative
    /// gradients are clipped to zero.
    pub fn recompute_slopes(&self, elevation: &[f64], slope: &mut [f64]) {
        debug_assert_eq!(elevation.len(), self.n_nodes);
        debug_assert_eq!(slope.len(), self.n_nodes);
        for node in 0..self.n_nodes {
            slope[node] = match self.link_length[node] {
                Some(length) if self.is_core_draining(node) && length > 0.0 => {
                    let drop = elevation[node] - elevation[self.receiver[node]];
                    (drop / length).max(0.0)
                }
                _ => 0.0,
            };
        }
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(SedDepError::shape_mismatch(field, expected, actual))
    }
}

fn check_non_negative(field: &'static str, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !(v.is_finite() && **v >= 0.0)) {
        Some(&bad) => Err(SedDepError::invalid_parameter(field, bad)),
        None => Ok(()),
    }
}
