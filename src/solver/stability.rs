//! Adaptive sub-step selection.
//!
//! Two bounds are combined by minimum, each scaled by a safety prefactor:
//!
//! - wave: Δt ≤ L / (K A^m S^(n-1)), the time for a knickpoint to cross a link,
//!   evaluated once per call;
//! - convergence: Δt ≤ (z - z_r) / (dz_r/dt - dz/dt) over node pairs that are
//!   closing on each other, evaluated after every routing pass.
//!
//! When the convergence bound comes from a flooded pair the sub-step is held
//! at or above a floor so that ponded reaches near equilibrium cannot stall
//! the loop.

use std::fmt;

use crate::error::{Result, SedDepError};
use crate::laws::StreamPowerLaws;
use crate::network::FlowNetwork;
use crate::types::{SECONDS_PER_HOUR, Seconds};

/// Floor on a sub-step as a fraction of the outer interval.
pub const MIN_SUBSTEP_FRACTION: f64 = 1e-9;

/// Safety prefactors and the flood floor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StabilityConfig {
    /// Fraction of the knickpoint crossing time allowed per sub-step
    pub wave_prefactor: f64,
    /// Fraction of the node-pair crossing time allowed per sub-step
    pub convergence_prefactor: f64,
    /// Smallest sub-step when flooding limits convergence
    pub flood_floor: Seconds,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            wave_prefactor: 0.2,
            convergence_prefactor: 0.3,
            flood_floor: Seconds::new(SECONDS_PER_HOUR),
        }
    }
}

impl StabilityConfig {
    /// Set the wave criterion prefactor.
    pub fn with_wave_prefactor(mut self, prefactor: f64) -> Self {
        self.wave_prefactor = prefactor;
        self
    }

    /// Set the convergence criterion prefactor.
    pub fn with_convergence_prefactor(mut self, prefactor: f64) -> Self {
        self.convergence_prefactor = prefactor;
        self
    }

    /// Set the flood floor.
    pub fn with_flood_floor(mut self, floor: Seconds) -> Self {
        self.flood_floor = floor;
        self
    }

    /// Reject non-positive or non-finite prefactors and a negative floor.
    pub fn validate(&self) -> Result<()> {
        if !(self.wave_prefactor.is_finite() && self.wave_prefactor > 0.0) {
            return Err(SedDepError::invalid_parameter(
                "wave_prefactor",
                self.wave_prefactor,
            ));
        }
        if !(self.convergence_prefactor.is_finite() && self.convergence_prefactor > 0.0) {
            return Err(SedDepError::invalid_parameter(
                "convergence_prefactor",
                self.convergence_prefactor,
            ));
        }
        let floor = self.flood_floor.get();
        if !(floor.is_finite() && floor >= 0.0) {
            return Err(SedDepError::invalid_parameter("flood_floor", floor));
        }
        Ok(())
    }
}

/// Which bound set the length of a sub-step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SubstepLimit {
    /// Knickpoint wave criterion
    Wave,
    /// Node-pair convergence criterion
    Convergence,
    /// Flood floor overrode a shorter flooded convergence bound
    FloodFloor,
    /// Nothing bound the step below the time left in the interval
    Remaining,
}

impl fmt::Display for SubstepLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Wave => "wave",
            Self::Convergence => "convergence",
            Self::FloodFloor => "flood floor",
            Self::Remaining => "remaining",
        };
        f.write_str(name)
    }
}

/// Shortest crossing time among converging node pairs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConvergenceBound {
    /// Unscaled time to cross (s)
    pub time: Seconds,
    /// The limiting pair involves a flooded node
    pub flooded: bool,
}

/// Tracks elapsed time within one outer interval.
#[derive(Clone, Copy, Debug)]
pub struct SubstepClock {
    total: Seconds,
    elapsed: Seconds,
    n_substeps: usize,
}

impl SubstepClock {
    /// Start a clock for an interval.
    pub fn new(total: Seconds) -> Self {
        Self {
            total,
            elapsed: Seconds::ZERO,
            n_substeps: 0,
        }
    }

    /// Time left in the interval.
    pub fn remaining(&self) -> Seconds {
        (self.total - self.elapsed).max(Seconds::ZERO)
    }

    /// Time consumed so far.
    pub fn elapsed(&self) -> Seconds {
        self.elapsed
    }

    /// Sub-steps taken so far.
    pub fn n_substeps(&self) -> usize {
        self.n_substeps
    }

    /// True once the interval is used up.
    pub fn is_done(&self) -> bool {
        self.elapsed.get() >= self.total.get()
    }

    /// Consume a candidate step and return the length actually taken.
    ///
    /// The final step is trimmed to land exactly on the end of the interval.
    /// Candidates below [`MIN_SUBSTEP_FRACTION`] of the interval, including
    /// zero, negative and NaN, are raised to that floor.
    pub fn advance(&mut self, candidate: Seconds) -> Seconds {
        let remaining = self.remaining();
        let step = self.min_step().max(candidate);
        let next = self.elapsed + step;
        let step = if next.get() >= self.total.get() {
            self.elapsed = self.total;
            remaining
        } else {
            self.elapsed = next;
            step
        };
        self.n_substeps += 1;
        step
    }

    /// Smallest step the clock will take.
    pub fn min_step(&self) -> Seconds {
        Seconds::new(self.total.get() * MIN_SUBSTEP_FRACTION)
    }
}

/// Picks sub-step lengths for one outer call.
#[derive(Clone, Debug)]
pub struct StabilityController {
    config: StabilityConfig,
    wave_limit: Seconds,
}

impl StabilityController {
    /// Create a controller and evaluate the wave bound from the initial slopes.
    pub fn new(config: StabilityConfig, laws: &StreamPowerLaws, network: &FlowNetwork) -> Self {
        let wave_limit = Self::wave_bound(&config, laws, network);
        Self { config, wave_limit }
    }

    /// Wave bound for this call.
    pub fn wave_limit(&self) -> Seconds {
        self.wave_limit
    }

    /// Configuration in use.
    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Prefactor times the smallest L / (K A^m S^(n-1)) over core draining nodes.
    ///
    /// Infinite when no node drains or the erosion prefactor is zero.
    pub fn wave_bound(
        config: &StabilityConfig,
        laws: &StreamPowerLaws,
        network: &FlowNetwork,
    ) -> Seconds {
        let mut min_time = f64::INFINITY;
        for node in 0..network.n_nodes {
            if !network.is_core_draining(node) {
                continue;
            }
            let Some(length) = network.link_length[node] else {
                continue;
            };
            let celerity = laws.wave_celerity(network.drainage_area[node], network.slope[node]);
            if celerity > 0.0 {
                min_time = min_time.min(length / celerity);
            }
        }
        Seconds::new(config.wave_prefactor * min_time)
    }

    /// Smallest crossing time over pairs where the node sits above its
    /// receiver and is being lowered faster than it.
    ///
    /// `None` when no pair is converging.
    pub fn convergence_bound(
        elevation: &[f64],
        dzdt: &[f64],
        receiver: &[usize],
        flooded: &[bool],
    ) -> Option<ConvergenceBound> {
        let mut best: Option<ConvergenceBound> = None;
        for node in 0..receiver.len() {
            let r = receiver[node];
            let rate_diff = dzdt[r] - dzdt[node];
            let vert_diff = elevation[node] - elevation[r];
            if rate_diff > 0.0 && vert_diff > 0.0 {
                let time = vert_diff / rate_diff;
                if best.map_or(true, |b| time < b.time.get()) {
                    best = Some(ConvergenceBound {
                        time: Seconds::new(time),
                        flooded: flooded[node] || flooded[r],
                    });
                }
            }
        }
        best
    }

    /// Choose the next sub-step length before clock trimming.
    ///
    /// `dzdt` must come from a routing pass over the current elevation.
    pub fn propose(
        &self,
        remaining: Seconds,
        elevation: &[f64],
        dzdt: &[f64],
        receiver: &[usize],
        flooded: &[bool],
    ) -> (Seconds, SubstepLimit) {
        let (mut step, mut limit, mut flood_limited) =
            match Self::convergence_bound(elevation, dzdt, receiver, flooded) {
                Some(bound) => (
                    self.config.convergence_prefactor * bound.time.get(),
                    SubstepLimit::Convergence,
                    bound.flooded,
                ),
                None => (remaining.get(), SubstepLimit::Remaining, false),
            };

        if self.wave_limit.get() < step {
            step = self.wave_limit.get();
            limit = SubstepLimit::Wave;
            flood_limited = false;
        }

        let floor = self.config.flood_floor.get();
        if flood_limited && step < floor {
            step = floor;
            limit = SubstepLimit::FloodFloor;
        }

        if step >= remaining.get() {
            (remaining, SubstepLimit::Remaining)
        } else {
            (Seconds::new(step), limit)
        }
    }
}
