//! Sediment-flux-dependent incision over one coarse timestep.
//!
//! State machine per call:
//!
//! ```text
//! INIT     validate inputs, mobilise the sediment layer into hillslope supply
//! SUBSTEP  route sediment -> pick Δt_sub -> update bedrock and sediment
//! RESLOPE  recompute slopes along the fixed receiver links
//! DONE     once the sub-steps sum to Δt
//! ```

use log::{debug, trace, warn};

use crate::error::{Result, SedDepError};
use crate::eroder::{ErosionOutputs, SedDepConfig};
use crate::laws::{PowerLaw, ResponseFunction, StreamPowerLaws};
use crate::network::{FloodedNodes, FlowNetwork};
use crate::solver::{
    ErosionReport, RouterInputs, RouterScratch, SolverDiagnostics, StabilityConfig,
    StabilityController, SubstepClock, SubstepLimit, route_sediment_downstream,
};
use crate::types::Years;

/// Scratch arrays reused across sub-steps and calls.
#[derive(Clone, Debug)]
struct Workspace {
    bedrock: Vec<f64>,
    slope: Vec<f64>,
    hillslope_supply: Vec<f64>,
    capacity: Vec<f64>,
    erosion_rate: Vec<f64>,
    flooded: Vec<bool>,
    router: RouterScratch,
}

impl Workspace {
    fn new(n_nodes: usize) -> Self {
        Self {
            bedrock: vec![0.0; n_nodes],
            slope: vec![0.0; n_nodes],
            hillslope_supply: vec![0.0; n_nodes],
            capacity: vec![0.0; n_nodes],
            erosion_rate: vec![0.0; n_nodes],
            flooded: vec![false; n_nodes],
            router: RouterScratch::new(n_nodes),
        }
    }
}

/// Sediment-flux-dependent channel incision.
///
/// Owns the persistent sediment layer. Elevation is owned by the caller and
/// updated in place so that `z = bedrock + sediment_depth` at core nodes.
///
/// # Example
///
/// ```ignore
/// use sedflux_rs::{SedDepConfig, SedDepEroder, Years};
///
/// let mut eroder = SedDepEroder::new(SedDepConfig::default(), &network)?;
/// for _ in 0..n_steps {
///     route_flow(&mut network, &elevation);
///     let report = eroder.erode(&network, &mut elevation, Years::new(100.0), None)?;
///     log::info!("{}", report.summary_line());
/// }
/// ```
#[derive(Clone, Debug)]
pub struct SedDepEroder {
    laws: StreamPowerLaws,
    response: ResponseFunction,
    porosity: f64,
    runoff: Vec<f64>,
    max_repeats: usize,
    tolerance: f64,
    stability: StabilityConfig,
    n_nodes: usize,
    sediment_depth: Vec<f64>,
    outputs: ErosionOutputs,
    diagnostics: SolverDiagnostics,
    work: Workspace,
}

impl SedDepEroder {
    /// Validate the configuration against a network and resolve it.
    ///
    /// The sediment layer starts zero-filled.
    pub fn new(config: SedDepConfig, network: &FlowNetwork) -> Result<Self> {
        config.validate()?;
        network.validate()?;

        let laws = StreamPowerLaws::new(
            config.transport_law,
            PowerLaw::from_per_year(config.k_sp, config.m_sp, config.n_sp),
            PowerLaw::from_per_year(config.k_t, config.m_t, config.n_t),
        )?;
        let response = ResponseFunction::new(config.response)?;
        let n_nodes = network.n_nodes;
        let runoff = config.runoff_rate.resolve(n_nodes)?;

        debug!(
            "SedDepEroder: {} nodes, response={}, transport={}, norm={:.6}",
            n_nodes,
            config.response,
            config.transport_law,
            response.normalization()
        );

        Ok(Self {
            laws,
            response,
            porosity: config.porosity(),
            runoff,
            max_repeats: config.pseudoimplicit_repeats,
            tolerance: config.refinement_tolerance,
            stability: config.stability,
            n_nodes,
            sediment_depth: vec![0.0; n_nodes],
            outputs: ErosionOutputs::zeros(n_nodes),
            diagnostics: SolverDiagnostics::default(),
            work: Workspace::new(n_nodes),
        })
    }

    /// Replace the initial sediment layer.
    pub fn with_sediment_depth(mut self, depth: Vec<f64>) -> Result<Self> {
        self.set_sediment_depth(depth)?;
        Ok(self)
    }

    /// Replace the sediment layer.
    pub fn set_sediment_depth(&mut self, depth: Vec<f64>) -> Result<()> {
        if depth.len() != self.n_nodes {
            return Err(SedDepError::shape_mismatch(
                "sediment_depth",
                self.n_nodes,
                depth.len(),
            ));
        }
        if let Some(&bad) = depth.iter().find(|h| !(h.is_finite() && **h >= 0.0)) {
            return Err(SedDepError::invalid_parameter("sediment_depth", bad));
        }
        self.sediment_depth = depth;
        Ok(())
    }

    /// Loose sediment thickness per node (m).
    pub fn sediment_depth(&self) -> &[f64] {
        &self.sediment_depth
    }

    /// Mutable access to the sediment layer for coupling with other processes.
    pub fn sediment_depth_mut(&mut self) -> &mut [f64] {
        &mut self.sediment_depth
    }

    /// Transport-limited flags from the last sub-step.
    pub fn is_transport_limited(&self) -> &[bool] {
        &self.outputs.is_transport_limited
    }

    /// Output fields from the last call.
    pub fn outputs(&self) -> &ErosionOutputs {
        &self.outputs
    }

    /// Counters accumulated over all calls.
    pub fn diagnostics(&self) -> &SolverDiagnostics {
        &self.diagnostics
    }

    /// Resolved response function.
    pub fn response(&self) -> &ResponseFunction {
        &self.response
    }

    /// Resolved power laws (per-second prefactors).
    pub fn laws(&self) -> &StreamPowerLaws {
        &self.laws
    }

    /// Number of nodes the eroder was built for.
    pub fn n_nodes(&self) -> usize {
        self.n_nodes
    }

    /// Same as [`erode`](Self::erode).
    pub fn run_one_step(
        &mut self,
        network: &FlowNetwork,
        elevation: &mut [f64],
        dt: Years,
        flooded: Option<&FloodedNodes>,
    ) -> Result<ErosionReport> {
        self.erode(network, elevation, dt, flooded)
    }

    /// Erode and deposit over `dt`, sub-stepping internally.
    ///
    /// All validation happens before any state is touched. A zero `dt`
    /// returns immediately and leaves elevation, sediment and outputs as they
    /// were.
    ///
    /// # Arguments
    /// * `network` - Flow routing computed on the current elevation
    /// * `elevation` - Surface elevation, updated in place at core nodes
    /// * `dt` - Interval to advance
    /// * `flooded` - Nodes to treat as perfect sediment traps
    pub fn erode(
        &mut self,
        network: &FlowNetwork,
        elevation: &mut [f64],
        dt: Years,
        flooded: Option<&FloodedNodes>,
    ) -> Result<ErosionReport> {
        self.check_inputs(network, elevation, dt)?;
        match flooded {
            Some(f) => f.resolve_into(&mut self.work.flooded)?,
            None => self.work.flooded.fill(false),
        }

        let controller = StabilityController::new(self.stability, &self.laws, network);
        let mut report = ErosionReport::new(dt, controller.wave_limit());
        self.diagnostics.calls += 1;

        if dt.get() == 0.0 {
            debug!("dt = 0, nothing to do");
            return Ok(report);
        }

        let dt_secs = dt.to_seconds();
        self.mobilise_sediment(network, elevation, dt_secs.get());
        for (s, &s0) in self.work.slope.iter_mut().zip(&network.slope) {
            *s = s0.max(0.0);
        }

        let mut clock = SubstepClock::new(dt_secs);
        let mut flood_floor_hits = 0usize;

        loop {
            self.laws.fill_rates(
                &network.drainage_area,
                &self.work.slope,
                &self.work.flooded,
                &mut self.work.capacity,
                &mut self.work.erosion_rate,
            );

            let inputs = RouterInputs {
                upstream_order: &network.upstream_order,
                receiver: &network.receiver,
                status: &network.status,
                cell_area: &network.cell_area,
                hillslope_supply: &self.work.hillslope_supply,
                capacity: &self.work.capacity,
                erosion_rate: &self.work.erosion_rate,
                flooded: &self.work.flooded,
                porosity: self.porosity,
                response: &self.response,
                max_repeats: self.max_repeats,
                tolerance: self.tolerance,
            };
            let stats = route_sediment_downstream(&inputs, &mut self.work.router);

            let (candidate, limit) = controller.propose(
                clock.remaining(),
                elevation,
                &self.work.router.dzdt,
                &network.receiver,
                &self.work.flooded,
            );
            if limit == SubstepLimit::FloodFloor {
                flood_floor_hits += 1;
            }
            let step = clock.advance(candidate);

            self.apply_substep(network, elevation, step.get());

            self.diagnostics
                .record_pass(&stats, &self.work.router.abort_residuals);
            report.record_substep(step, limit, &stats, &self.work.router.abort_residuals);

            trace!(
                "substep {}: dt_sub={:.4e} s ({}), elapsed {:.1}%",
                clock.n_substeps(),
                step.get(),
                limit,
                100.0 * clock.elapsed().get() / dt_secs.get()
            );

            if clock.is_done() {
                break;
            }
            network.recompute_slopes(elevation, &mut self.work.slope);
        }

        self.publish_outputs(network);

        debug!(
            "erode: {} substeps in [{:.3e}, {:.3e}] s, wave limit {:.3e} s, {} aborted refinements",
            report.n_substeps,
            report.min_substep.get(),
            report.max_substep.get(),
            report.wave_limit.get(),
            report.aborts
        );
        if report.aborts > 0 {
            warn!(
                "{} fixed-point refinements did not converge in {} passes (worst residual {:.3e})",
                report.aborts,
                self.max_repeats,
                report.worst_abort_error.unwrap_or(f64::NAN)
            );
        }
        if flood_floor_hits > 0 {
            warn!(
                "flood floor of {} engaged on {} substeps",
                self.stability.flood_floor, flood_floor_hits
            );
        }

        Ok(report)
    }

    fn check_inputs(&self, network: &FlowNetwork, elevation: &[f64], dt: Years) -> Result<()> {
        let dt_years = dt.get();
        if !(dt_years.is_finite() && dt_years >= 0.0) {
            return Err(SedDepError::InvalidTimestep(dt_years));
        }
        network.validate()?;
        if network.n_nodes != self.n_nodes {
            return Err(SedDepError::shape_mismatch(
                "network",
                self.n_nodes,
                network.n_nodes,
            ));
        }
        if elevation.len() != self.n_nodes {
            return Err(SedDepError::shape_mismatch(
                "elevation",
                self.n_nodes,
                elevation.len(),
            ));
        }
        Ok(())
    }

    /// Split elevation into bedrock and sediment, then turn the sediment of
    /// each core cell into a steady supply over the whole interval.
    fn mobilise_sediment(&mut self, network: &FlowNetwork, elevation: &[f64], dt_secs: f64) {
        let work = &mut self.work;
        for node in 0..self.n_nodes {
            work.bedrock[node] = elevation[node] - self.sediment_depth[node];
            work.hillslope_supply[node] = 0.0;
            if network.is_core(node) {
                let area = network.cell_area[node];
                work.hillslope_supply[node] = self.sediment_depth[node] * area / dt_secs;
                self.sediment_depth[node] = 0.0;
            }
        }
    }

    /// Lower bedrock by dz/dt and rebuild the sediment layer from this
    /// sub-step's deposition, at core nodes only.
    fn apply_substep(&mut self, network: &FlowNetwork, elevation: &mut [f64], step: f64) {
        let work = &mut self.work;
        for node in 0..self.n_nodes {
            if !network.is_core(node) {
                continue;
            }
            let area = network.cell_area[node];
            self.sediment_depth[node] = if area > 0.0 {
                work.router.deposition_rate[node] * step / area
            } else {
                0.0
            };
            work.bedrock[node] += work.router.dzdt[node] * step;
            elevation[node] = work.bedrock[node] + self.sediment_depth[node];
        }
    }

    fn publish_outputs(&mut self, network: &FlowNetwork) {
        let out = &mut self.outputs;
        let router = &self.work.router;
        out.transport_capacity.copy_from_slice(&self.work.capacity);
        out.sediment_discharge
            .copy_from_slice(&router.upstream_discharge);
        out.relative_flux.copy_from_slice(&router.relative_flux);
        out.is_transport_limited
            .copy_from_slice(&router.is_transport_limited);
        out.bed_shear_stress.fill(0.0);
        for ((q, &r), &a) in out
            .water_discharge
            .iter_mut()
            .zip(&self.runoff)
            .zip(&network.drainage_area)
        {
            *q = r * a;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::laws::ResponseShape;
    use crate::network::NodeStatus;
    use approx::assert_relative_eq;

    /// 3 -> 2 -> 1 -> 0, 100 m links, node 0 an open outlet.
    fn chain() -> (FlowNetwork, Vec<f64>) {
        let z = vec![0.0, 1.0, 2.0, 3.0];
        let net = FlowNetwork::new(
            vec![3e4, 3e4, 2e4, 1e4],
            vec![0, 0, 1, 2],
            vec![0, 1, 2, 3],
            vec![0.0, 0.01, 0.01, 0.01],
            vec![None, Some(100.0), Some(100.0), Some(100.0)],
            vec![
                NodeStatus::FixedValue,
                NodeStatus::Core,
                NodeStatus::Core,
                NodeStatus::Core,
            ],
            vec![0.0, 1e4, 1e4, 1e4],
        )
        .unwrap();
        (net, z)
    }

    fn config() -> SedDepConfig {
        SedDepConfig::default()
            .with_erosion(1e-4, 0.5, 1.0)
            .with_transport(1e-2, 1.5, 1.0)
            .with_response(ResponseShape::Constant)
    }

    #[test]
    fn test_zero_dt_is_noop() {
        let (net, mut z) = chain();
        let mut eroder = SedDepEroder::new(config(), &net)
            .unwrap()
            .with_sediment_depth(vec![0.0, 0.1, 0.1, 0.1])
            .unwrap();
        let z0 = z.clone();
        let report = eroder.erode(&net, &mut z, Years::ZERO, None).unwrap();
        assert_eq!(report.n_substeps, 0);
        assert_eq!(z, z0);
        assert_eq!(eroder.sediment_depth(), &[0.0, 0.1, 0.1, 0.1]);
    }

    #[test]
    fn test_negative_dt_rejected() {
        let (net, mut z) = chain();
        let mut eroder = SedDepEroder::new(config(), &net).unwrap();
        assert_eq!(
            eroder.erode(&net, &mut z, Years::new(-1.0), None),
            Err(SedDepError::InvalidTimestep(-1.0))
        );
    }

    #[test]
    fn test_outlet_never_changes() {
        let (net, mut z) = chain();
        let mut eroder = SedDepEroder::new(config(), &net).unwrap();
        eroder.erode(&net, &mut z, Years::new(1000.0), None).unwrap();
        assert_eq!(z[0], 0.0);
        assert!(z[1] < 1.0 && z[2] < 2.0 && z[3] < 3.0);
        assert!(eroder.sediment_depth().iter().all(|&h| h >= 0.0));
    }

    #[test]
    fn test_bad_flood_ids_leave_state_untouched() {
        let (net, mut z) = chain();
        let mut eroder = SedDepEroder::new(config(), &net)
            .unwrap()
            .with_sediment_depth(vec![0.0, 0.2, 0.2, 0.2])
            .unwrap();
        let z0 = z.clone();
        let flooded = FloodedNodes::Ids(vec![7]);
        assert!(eroder
            .erode(&net, &mut z, Years::new(10.0), Some(&flooded))
            .is_err());
        assert_eq!(z, z0);
        assert_eq!(eroder.sediment_depth(), &[0.0, 0.2, 0.2, 0.2]);
    }

    #[test]
    fn test_water_discharge_and_zero_shear() {
        let (net, mut z) = chain();
        let config = config().with_runoff(2.0);
        let mut eroder = SedDepEroder::new(config, &net).unwrap();
        eroder.erode(&net, &mut z, Years::new(1.0), None).unwrap();
        let out = eroder.outputs();
        assert_relative_eq!(out.water_discharge[3], 2e4);
        assert!(out.bed_shear_stress.iter().all(|&t| t == 0.0));
    }

    #[test]
    fn test_budget_closes() {
        let (net, mut z) = chain();
        let config = config().with_response(ResponseShape::leh_valley());
        let mut eroder = SedDepEroder::new(config, &net)
            .unwrap()
            .with_sediment_depth(vec![0.0, 0.01, 0.01, 0.01])
            .unwrap();
        let report = eroder.erode(&net, &mut z, Years::new(500.0), None).unwrap();
        assert!(report.n_substeps >= 1);
        assert_relative_eq!(report.budget.supplied_m3, 300.0, max_relative = 1e-9);
        assert!(report.budget.relative_residual() < 1e-9);
        assert_eq!(eroder.diagnostics().calls, 1);
        assert_eq!(eroder.diagnostics().substeps, report.n_substeps);
    }

    #[test]
    fn test_refinement_aborts_accumulate_across_calls() {
        let (net, mut z) = chain();
        let config = config()
            .with_response(ResponseShape::LinearDecline)
            .with_refinement(1, 1e-12);
        let mut eroder = SedDepEroder::new(config, &net).unwrap();

        let first = eroder.erode(&net, &mut z, Years::new(10.0), None).unwrap();
        assert!(first.aborts > 0);
        assert!(first.worst_abort_error.is_some_and(|e| e > 1e-12));
        let after_first = eroder.diagnostics().pseudoimplicit_aborts;
        assert_eq!(after_first, first.aborts);
        assert_eq!(eroder.diagnostics().errors_at_abort.len(), after_first);

        let second = eroder.erode(&net, &mut z, Years::new(10.0), None).unwrap();
        let diag = eroder.diagnostics();
        assert_eq!(diag.calls, 2);
        assert_eq!(diag.pseudoimplicit_aborts, first.aborts + second.aborts);
        assert_eq!(diag.errors_at_abort.len(), diag.pseudoimplicit_aborts);
        assert!(diag.errors_at_abort.iter().all(|e| e.is_finite() && *e > 1e-12));
        assert!(z.iter().all(|v| v.is_finite()));
        assert!(z[1] < 1.0 && z[2] < 2.0 && z[3] < 3.0);
    }

    #[test]
    fn test_runoff_length_checked() {
        let (net, _) = chain();
        let config = config().with_runoff(vec![1.0; 3]);
        assert!(matches!(
            SedDepEroder::new(config, &net),
            Err(SedDepError::RunoffLengthMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }
}
