//! Downstream sediment routing kernel.
//!
//! One pass visits every node headwater-first, accumulates incoming
//! sediment flux, and resolves the local erosion/deposition balance:
//!
//! ```text
//! flooded          : Qc = 0, deposit everything, forward nothing
//! Qs >= Qc (TL)    : no erosion, deposit (Qs - Qc)/porosity, forward Qc
//! Qs <  Qc (DL)    : dz/dt = -E' f(x), forward min(Qs + E' f(x) A_cell, Qc), where
//!                    x = Qs/Qc + E' f(x) A_cell / Qc   (fixed-point, stops at 1)
//! ```
//!
//! Non-core nodes record what reaches them and export it. The pass does not
//! allocate apart from recording residuals of aborted refinements.

use crate::laws::ResponseFunction;
use crate::network::NodeStatus;

/// Read-only inputs to one routing pass.
#[derive(Clone, Copy)]
pub struct RouterInputs<'a> {
    /// Outlet-first topological order; visited in reverse
    pub upstream_order: &'a [usize],
    /// Receiver per node
    pub receiver: &'a [usize],
    /// Boundary status per node
    pub status: &'a [NodeStatus],
    /// Cell area per node (m²)
    pub cell_area: &'a [f64],
    /// Local hillslope sediment supply (m³/s)
    pub hillslope_supply: &'a [f64],
    /// Transport capacity Qc (m³/s)
    pub capacity: &'a [f64],
    /// Erosion rate without the response factor, E' (m/s)
    pub erosion_rate: &'a [f64],
    /// Flooded flags
    pub flooded: &'a [bool],
    /// Sediment-to-rock density ratio applied to deposition
    pub porosity: f64,
    /// Sediment-flux response function
    pub response: &'a ResponseFunction,
    /// Maximum fixed-point refinements per node
    pub max_repeats: usize,
    /// Relative change in f under which a refinement has converged
    pub tolerance: f64,
}

/// Per-node outputs of a routing pass, reused across sub-steps.
#[derive(Clone, Debug, Default)]
pub struct RouterScratch {
    /// Volumetric sediment discharge arriving at each node, local supply included
    pub sediment_in: Vec<f64>,
    /// Fluvial sediment discharge delivered by donors, local supply excluded
    pub upstream_discharge: Vec<f64>,
    /// Qs/Qc; 1 for transport-limited and flooded nodes
    pub relative_flux: Vec<f64>,
    /// Bedrock elevation rate (m/s, negative for incision)
    pub dzdt: Vec<f64>,
    /// Transport-limited flag
    pub is_transport_limited: Vec<bool>,
    /// Bulk deposition rate (m³/s)
    pub deposition_rate: Vec<f64>,
    /// Residuals of refinements that ran out of passes in the last sweep
    pub abort_residuals: Vec<f64>,
}

impl RouterScratch {
    /// Allocate zeroed buffers for `n_nodes`.
    pub fn new(n_nodes: usize) -> Self {
        Self {
            sediment_in: vec![0.0; n_nodes],
            upstream_discharge: vec![0.0; n_nodes],
            relative_flux: vec![0.0; n_nodes],
            dzdt: vec![0.0; n_nodes],
            is_transport_limited: vec![false; n_nodes],
            deposition_rate: vec![0.0; n_nodes],
            abort_residuals: Vec::new(),
        }
    }

    /// Number of nodes the buffers are sized for.
    pub fn len(&self) -> usize {
        self.dzdt.len()
    }

    /// True when sized for zero nodes.
    pub fn is_empty(&self) -> bool {
        self.dzdt.is_empty()
    }

    fn reset(&mut self) {
        self.sediment_in.fill(0.0);
        self.upstream_discharge.fill(0.0);
        self.relative_flux.fill(0.0);
        self.dzdt.fill(0.0);
        self.is_transport_limited.fill(false);
        self.deposition_rate.fill(0.0);
        self.abort_residuals.clear();
    }
}

/// Counters and volume rates from one routing pass.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RouterStats {
    /// Detachment-limited fixed-point solves
    pub dl_solves: usize,
    /// Solves that ran out of refinement passes
    pub aborts: usize,
    /// Transport-limited nodes (flooded included)
    pub transport_limited: usize,
    /// Hillslope supply entering the network (m³/s)
    pub supply_rate: f64,
    /// Bedrock eroded at core nodes (m³/s)
    pub erosion_rate: f64,
    /// Solid sediment left in place (m³/s)
    pub deposition_rate: f64,
    /// Sediment reaching non-core nodes (m³/s)
    pub export_rate: f64,
    /// Eroded sediment dropped by the capacity cap (m³/s)
    pub capped_rate: f64,
}

/// Run one headwater-to-outlet routing pass.
///
/// Scratch buffers must be sized for the network. Returns the pass
/// counters; per-node results are left in `scratch`.
pub fn route_sediment_downstream(
    inputs: &RouterInputs<'_>,
    scratch: &mut RouterScratch,
) -> RouterStats {
    debug_assert_eq!(scratch.len(), inputs.receiver.len());
    scratch.reset();

    let mut stats = RouterStats::default();

    for &node in inputs.upstream_order.iter().rev() {
        let supply = inputs.hillslope_supply[node];
        let upstream = scratch.sediment_in[node];
        let qs = upstream + supply;
        scratch.upstream_discharge[node] = upstream;
        scratch.sediment_in[node] = qs;

        if !inputs.status[node].is_core() {
            stats.export_rate += qs;
            continue;
        }
        stats.supply_rate += supply;

        let receiver = inputs.receiver[node];
        let is_sink = receiver == node;
        let qc = inputs.capacity[node];

        if inputs.flooded[node] || is_sink {
            scratch.is_transport_limited[node] = true;
            scratch.relative_flux[node] = 1.0;
            scratch.deposition_rate[node] = qs / inputs.porosity;
            stats.deposition_rate += qs;
            stats.transport_limited += 1;
            continue;
        }

        let forwarded = if qs >= qc {
            scratch.is_transport_limited[node] = true;
            scratch.relative_flux[node] = 1.0;
            scratch.deposition_rate[node] = (qs - qc) / inputs.porosity;
            stats.deposition_rate += qs - qc;
            stats.transport_limited += 1;
            qc
        } else {
            let x_in = qs / qc;
            let e_prime = inputs.erosion_rate[node];
            let area = inputs.cell_area[node];
            let solve = refine_relative_flux(inputs, x_in, e_prime * area / qc);

            stats.dl_solves += 1;
            if !solve.converged {
                stats.aborts += 1;
                scratch.abort_residuals.push(solve.residual);
            }

            let erosion = e_prime * solve.efficiency;
            let eroded_volume = erosion * area;
            let out = (qs + eroded_volume).min(qc);
            scratch.dzdt[node] = -erosion;
            scratch.relative_flux[node] = x_in;
            stats.erosion_rate += eroded_volume;
            stats.capped_rate += qs + eroded_volume - out;
            out
        };

        scratch.sediment_in[receiver] += forwarded;
    }

    stats
}

struct Refinement {
    efficiency: f64,
    residual: f64,
    converged: bool,
}

/// Fixed-point solve of x = x_in + gain * f(x) on [x_in, 1].
///
/// `gain` is E' A_cell / Qc, the relative flux a node adds at full efficiency.
/// Reaching x = 1 stops the refinement and keeps the last efficiency.
#[inline]
fn refine_relative_flux(inputs: &RouterInputs<'_>, x_in: f64, gain: f64) -> Refinement {
    let response = inputs.response;
    let mut efficiency = response.eval(x_in);
    let mut residual = f64::INFINITY;

    for _ in 0..inputs.max_repeats {
        let x = x_in + gain * efficiency;
        if x >= 1.0 {
            return Refinement {
                efficiency,
                residual: 0.0,
                converged: true,
            };
        }
        let updated = response.eval(x);
        residual = if updated > 0.0 {
            ((updated - efficiency) / updated).abs()
        } else {
            (updated - efficiency).abs()
        };
        efficiency = updated;
        if residual < inputs.tolerance {
            return Refinement {
                efficiency,
                residual,
                converged: true,
            };
        }
    }

    Refinement {
        efficiency,
        residual,
        converged: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::laws::ResponseShape;
    use approx::assert_relative_eq;

    struct Chain {
        order: Vec<usize>,
        receiver: Vec<usize>,
        status: Vec<NodeStatus>,
        cell_area: Vec<f64>,
        supply: Vec<f64>,
        capacity: Vec<f64>,
        erosion: Vec<f64>,
        flooded: Vec<bool>,
    }

    /// 3 -> 2 -> 1 -> 0 with node 0 an open outlet.
    fn chain() -> Chain {
        Chain {
            order: vec![0, 1, 2, 3],
            receiver: vec![0, 0, 1, 2],
            status: vec![
                NodeStatus::FixedValue,
                NodeStatus::Core,
                NodeStatus::Core,
                NodeStatus::Core,
            ],
            cell_area: vec![0.0, 1.0, 1.0, 1.0],
            supply: vec![0.0, 0.0, 0.0, 0.0],
            capacity: vec![0.0, 10.0, 10.0, 10.0],
            erosion: vec![0.0, 1.0, 1.0, 1.0],
            flooded: vec![false; 4],
        }
    }

    fn run(c: &Chain, response: &ResponseFunction) -> (RouterScratch, RouterStats) {
        run_with_repeats(c, response, 50)
    }

    fn run_with_repeats(
        c: &Chain,
        response: &ResponseFunction,
        max_repeats: usize,
    ) -> (RouterScratch, RouterStats) {
        let inputs = RouterInputs {
            upstream_order: &c.order,
            receiver: &c.receiver,
            status: &c.status,
            cell_area: &c.cell_area,
            hillslope_supply: &c.supply,
            capacity: &c.capacity,
            erosion_rate: &c.erosion,
            flooded: &c.flooded,
            porosity: 1.0,
            response,
            max_repeats,
            tolerance: 0.01,
        };
        let mut scratch = RouterScratch::new(c.order.len());
        let stats = route_sediment_downstream(&inputs, &mut scratch);
        (scratch, stats)
    }

    #[test]
    fn test_constant_response_accumulates_erosion() {
        let c = chain();
        let f = ResponseFunction::new(ResponseShape::Constant).unwrap();
        let (s, stats) = run(&c, &f);
        for node in 1..4 {
            assert_relative_eq!(s.dzdt[node], -1.0);
            assert!(!s.is_transport_limited[node]);
        }
        assert_relative_eq!(s.sediment_in[3], 0.0);
        assert_relative_eq!(s.sediment_in[2], 1.0);
        assert_relative_eq!(s.sediment_in[1], 2.0);
        assert_relative_eq!(s.sediment_in[0], 3.0);
        assert_relative_eq!(stats.export_rate, 3.0);
        assert_eq!(stats.dl_solves, 3);
        assert_eq!(stats.aborts, 0);
    }

    #[test]
    fn test_transport_limited_forwards_capacity() {
        let mut c = chain();
        c.supply[3] = 25.0;
        let f = ResponseFunction::new(ResponseShape::LinearDecline).unwrap();
        let (s, stats) = run(&c, &f);
        assert!(s.is_transport_limited[3]);
        assert_eq!(s.dzdt[3], 0.0);
        assert_eq!(s.relative_flux[3], 1.0);
        assert_relative_eq!(s.deposition_rate[3], 15.0);
        // Downstream nodes see exactly capacity and are TL too.
        assert_relative_eq!(s.sediment_in[2], 10.0);
        assert!(s.is_transport_limited[2]);
        assert_relative_eq!(s.deposition_rate[2], 0.0);
        assert_eq!(stats.transport_limited, 3);
    }

    #[test]
    fn test_detachment_limited_refines_efficiency() {
        let mut c = chain();
        c.supply[3] = 2.0;
        let f = ResponseFunction::new(ResponseShape::LinearDecline).unwrap();
        let (s, stats) = run(&c, &f);
        assert!(!s.is_transport_limited[3]);
        assert_relative_eq!(s.relative_flux[3], 0.2);
        // x = 0.2 + 0.1 (1 - x)  ->  x = 0.3/1.1
        let x = 0.3 / 1.1;
        assert_relative_eq!(s.dzdt[3], -(1.0 - x), max_relative = 0.02);
        assert_relative_eq!(s.sediment_in[2], x * 10.0, max_relative = 0.02);
        assert_eq!(stats.aborts, 0);
    }

    #[test]
    fn test_upstream_discharge_excludes_local_supply() {
        let mut c = chain();
        c.supply = vec![0.0, 0.5, 1.0, 25.0];
        let f = ResponseFunction::new(ResponseShape::LinearDecline).unwrap();
        let (s, _) = run(&c, &f);
        assert_eq!(s.upstream_discharge[3], 0.0);
        assert_relative_eq!(s.sediment_in[3], 25.0);
        assert_relative_eq!(s.upstream_discharge[2], 10.0);
        assert_relative_eq!(s.sediment_in[2], 11.0);
        assert_relative_eq!(s.upstream_discharge[1], 10.0);
        assert_relative_eq!(s.sediment_in[1], 10.5);
    }

    #[test]
    fn test_unconverged_refinement_keeps_last_estimate() {
        let mut c = chain();
        // x_in = 0.2 and gain = E' A / Qc = 0.5 at the head; no erosion below.
        c.supply[3] = 2.0;
        c.erosion = vec![0.0, 0.0, 0.0, 5.0];
        let f = ResponseFunction::new(ResponseShape::LinearDecline).unwrap();
        let (s, stats) = run_with_repeats(&c, &f, 1);

        // One pass: f(0.2) = 0.8, x = 0.6, f(0.6) = 0.4, change of 100%.
        assert_eq!(stats.aborts, 1);
        assert_eq!(stats.dl_solves, 3);
        assert_eq!(s.abort_residuals.len(), 1);
        assert_relative_eq!(s.abort_residuals[0], 1.0);
        assert!(s.abort_residuals[0] > 0.01);

        assert!(s.dzdt[3].is_finite());
        assert_relative_eq!(s.dzdt[3], -2.0);
        assert_relative_eq!(s.relative_flux[3], 0.2);
        assert_relative_eq!(s.sediment_in[2], 4.0);
        assert_relative_eq!(stats.export_rate, 4.0);

        // The same node converges with the default budget.
        let (s, stats) = run(&c, &f);
        assert_eq!(stats.aborts, 0);
        assert!(s.abort_residuals.is_empty());
    }

    #[test]
    fn test_capped_excess_is_tracked() {
        let mut c = chain();
        c.erosion[3] = 50.0;
        let f = ResponseFunction::new(ResponseShape::Constant).unwrap();
        let (s, stats) = run(&c, &f);
        assert_relative_eq!(s.dzdt[3], -50.0);
        assert_relative_eq!(s.sediment_in[2], 10.0);
        assert_relative_eq!(stats.capped_rate, 40.0);
    }

    #[test]
    fn test_flooded_node_traps_everything() {
        let mut c = chain();
        c.supply[3] = 4.0;
        c.flooded[2] = true;
        c.capacity[2] = 0.0;
        c.erosion[2] = 0.0;
        let f = ResponseFunction::new(ResponseShape::Constant).unwrap();
        let (s, _) = run(&c, &f);
        assert_eq!(s.dzdt[2], 0.0);
        assert_relative_eq!(s.deposition_rate[2], s.sediment_in[2]);
        assert_relative_eq!(s.sediment_in[1], 0.0);
        assert_eq!(s.relative_flux[2], 1.0);
    }

    #[test]
    fn test_conservation_of_solid_volume() {
        let mut c = chain();
        c.supply = vec![0.0, 3.0, 1.0, 12.0];
        c.capacity = vec![0.0, 40.0, 10.0, 20.0];
        c.erosion = vec![0.0, 2.0, 4.0, 1.0];
        let f = ResponseFunction::new(ResponseShape::leh_valley()).unwrap();
        let (_, stats) = run(&c, &f);
        let sources = stats.supply_rate + stats.erosion_rate;
        let sinks = stats.deposition_rate + stats.export_rate + stats.capped_rate;
        assert_relative_eq!(sources, sinks, max_relative = 1e-12);
        assert!(stats.dl_solves >= 2);
    }
}
