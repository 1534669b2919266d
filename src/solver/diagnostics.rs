//! Solver counters and per-call reports.

use std::collections::HashMap;

use crate::analysis::SedimentBudget;
use crate::solver::{RouterStats, SubstepLimit};
use crate::types::{Seconds, Years};

/// Counters that persist across erosion calls.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SolverDiagnostics {
    /// Completed erosion calls
    pub calls: usize,
    /// Sub-steps over all calls
    pub substeps: usize,
    /// Detachment-limited fixed-point solves
    pub total_dl_calls: usize,
    /// Solves that ran out of refinement passes
    pub pseudoimplicit_aborts: usize,
    /// Relative change in f at each abort
    pub errors_at_abort: Vec<f64>,
}

impl SolverDiagnostics {
    /// Fold one routing pass into the counters.
    pub fn record_pass(&mut self, stats: &RouterStats, abort_residuals: &[f64]) {
        self.substeps += 1;
        self.total_dl_calls += stats.dl_solves;
        self.pseudoimplicit_aborts += stats.aborts;
        self.errors_at_abort.extend_from_slice(abort_residuals);
    }

    /// Fraction of detachment-limited solves that aborted.
    pub fn abort_fraction(&self) -> f64 {
        if self.total_dl_calls == 0 {
            0.0
        } else {
            self.pseudoimplicit_aborts as f64 / self.total_dl_calls as f64
        }
    }

    /// Largest residual recorded at an abort.
    pub fn worst_abort_error(&self) -> Option<f64> {
        self.errors_at_abort.iter().copied().reduce(f64::max)
    }

    /// Clear all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Format counters as a single line.
    pub fn summary_line(&self) -> String {
        format!(
            "calls={} substeps={} dl_solves={} aborts={} ({:.2}%)",
            self.calls,
            self.substeps,
            self.total_dl_calls,
            self.pseudoimplicit_aborts,
            100.0 * self.abort_fraction()
        )
    }
}

/// Summary of one erosion call.
#[derive(Clone, Debug, PartialEq)]
pub struct ErosionReport {
    /// Requested interval
    pub dt: Years,
    /// Sub-steps taken
    pub n_substeps: usize,
    /// Shortest sub-step
    pub min_substep: Seconds,
    /// Longest sub-step
    pub max_substep: Seconds,
    /// Wave bound for the call
    pub wave_limit: Seconds,
    /// How many sub-steps each bound set
    pub limits: HashMap<SubstepLimit, usize>,
    /// Refinements that ran out of passes during this call
    pub aborts: usize,
    /// Largest residual among those aborts
    pub worst_abort_error: Option<f64>,
    /// Transport-limited nodes after the final sub-step
    pub n_transport_limited: usize,
    /// Volume accounting for the call
    pub budget: SedimentBudget,
}

impl ErosionReport {
    /// Empty report for an interval.
    pub fn new(dt: Years, wave_limit: Seconds) -> Self {
        Self {
            dt,
            n_substeps: 0,
            min_substep: Seconds::new(f64::INFINITY),
            max_substep: Seconds::ZERO,
            wave_limit,
            limits: HashMap::new(),
            aborts: 0,
            worst_abort_error: None,
            n_transport_limited: 0,
            budget: SedimentBudget::default(),
        }
    }

    /// Record one applied sub-step.
    pub fn record_substep(
        &mut self,
        step: Seconds,
        limit: SubstepLimit,
        stats: &RouterStats,
        abort_residuals: &[f64],
    ) {
        self.n_substeps += 1;
        self.min_substep = self.min_substep.min(step);
        self.max_substep = self.max_substep.max(step);
        *self.limits.entry(limit).or_insert(0) += 1;
        self.aborts += stats.aborts;
        for &r in abort_residuals {
            self.worst_abort_error = Some(self.worst_abort_error.map_or(r, |w| w.max(r)));
        }
        self.n_transport_limited = stats.transport_limited;
        self.budget.accumulate(stats, step);
    }

    /// Sub-steps set by a given bound.
    pub fn count(&self, limit: SubstepLimit) -> usize {
        self.limits.get(&limit).copied().unwrap_or(0)
    }

    /// Format the report as a single line.
    pub fn summary_line(&self) -> String {
        if self.n_substeps == 0 {
            return format!("dt={} no sub-steps", self.dt);
        }
        format!(
            "dt={} substeps={} step=[{:.3e},{:.3e}] s wave={:.3e} s aborts={} TL={} | {}",
            self.dt,
            self.n_substeps,
            self.min_substep.get(),
            self.max_substep.get(),
            self.wave_limit.get(),
            self.aborts,
            self.n_transport_limited,
            self.budget.summary_line()
        )
    }
}
