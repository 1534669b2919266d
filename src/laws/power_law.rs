//! Area-slope power laws for detachment-limited erosion and transport capacity.
//!
//! ```text
//! E' = K  * A^m  * S^n     (erosion rate with f(Qs/Qc) removed, m/s)
//! Qc = Kt * A^mt * S^nt    (volumetric transport capacity, m³/s)
//! ```
//!
//! Prefactors are supplied per year and stored per second.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SedDepError};
use crate::types::Years;

/// Smallest positive slope used wherever a slope is raised to a negative
/// power or would otherwise vanish.
pub const MIN_SLOPE: f64 = f64::MIN_POSITIVE;

/// Tolerance under which an exponent is treated as exactly one.
const UNIT_EXPONENT_TOL: f64 = 1e-8;

/// A single prefactor-times-area-times-slope power law.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PowerLaw {
    /// Prefactor in per-second units.
    pub k: f64,
    /// Exponent on drainage area.
    pub m: f64,
    /// Exponent on slope.
    pub n: f64,
}

impl PowerLaw {
    /// Create from a per-year prefactor.
    ///
    /// # Arguments
    /// * `k_per_year` - Prefactor with a per-year time unit
    /// * `m` - Drainage area exponent
    /// * `n` - Slope exponent
    pub fn from_per_year(k_per_year: f64, m: f64, n: f64) -> Self {
        Self {
            k: Years::per_year_to_per_second(k_per_year),
            m,
            n,
        }
    }

    /// K * A^m, the slope-free part of the law.
    #[inline(always)]
    pub fn area_term(&self, area: f64) -> f64 {
        self.k * area.powf(self.m)
    }

    /// S^n with the slope floored at zero.
    #[inline(always)]
    pub fn slope_term(&self, slope: f64) -> f64 {
        slope.max(0.0).powf(self.n)
    }

    /// K * A^m * S^n.
    #[inline(always)]
    pub fn evaluate(&self, area: f64, slope: f64) -> f64 {
        self.area_term(area) * self.slope_term(slope)
    }

    /// Whether the slope exponent is (numerically) one.
    #[inline]
    pub fn is_linear_in_slope(&self) -> bool {
        (self.n - 1.0).abs() < UNIT_EXPONENT_TOL
    }

    fn validate(
        &self,
        k_name: &'static str,
        m_name: &'static str,
        n_name: &'static str,
    ) -> Result<()> {
        if !(self.k.is_finite() && self.k >= 0.0) {
            return Err(SedDepError::invalid_parameter(k_name, self.k));
        }
        if !self.m.is_finite() {
            return Err(SedDepError::invalid_parameter(m_name, self.m));
        }
        if !(self.n.is_finite() && self.n >= 0.0) {
            return Err(SedDepError::invalid_parameter(n_name, self.n));
        }
        Ok(())
    }
}

/// Transport law family.
///
/// Only the power law is implemented; legacy names are parsed so they can
/// be rejected with a specific message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransportLaw {
    /// Qc = Kt * A^mt * S^nt.
    #[default]
    PowerLaw,
}

impl TransportLaw {
    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::PowerLaw => "power_law",
        }
    }
}

impl fmt::Display for TransportLaw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransportLaw {
    type Err = SedDepError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "power_law" => Ok(Self::PowerLaw),
            "MPM" => Err(SedDepError::RetiredTransportLaw {
                name: s.to_string(),
                reason: "MPM is no longer a permitted value for Qc".to_string(),
            }),
            "Voller_generalized" => Err(SedDepError::RetiredTransportLaw {
                name: s.to_string(),
                reason: "Voller_generalized is not yet supported".to_string(),
            }),
            other => Err(SedDepError::UnknownTransportLaw(other.to_string())),
        }
    }
}

/// Erosion and transport laws evaluated together at every node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StreamPowerLaws {
    /// Detachment-limited erosion law (K_sp, m_sp, n_sp).
    pub erosion: PowerLaw,
    /// Transport capacity law (K_t, m_t, n_t).
    pub transport: PowerLaw,
}

impl StreamPowerLaws {
    /// Build from per-year prefactors and exponents.
    pub fn new(law: TransportLaw, erosion: PowerLaw, transport: PowerLaw) -> Result<Self> {
        match law {
            TransportLaw::PowerLaw => {
                erosion.validate("k_sp", "m_sp", "n_sp")?;
                transport.validate("k_t", "m_t", "n_t")?;
                Ok(Self { erosion, transport })
            }
        }
    }

    /// Erosion rate with the response function removed: E' = K A^m S^n.
    #[inline(always)]
    pub fn erosion_rate(&self, area: f64, slope: f64) -> f64 {
        self.erosion.evaluate(area, slope)
    }

    /// Volumetric transport capacity Qc = Kt A^mt S^nt.
    #[inline(always)]
    pub fn transport_capacity(&self, area: f64, slope: f64) -> f64 {
        self.transport.evaluate(area, slope)
    }

    /// Knickpoint celerity factor used by the wave stability criterion.
    ///
    /// K A^m when n ≈ 1, K A^m S^(n-1) otherwise, with S floored at
    /// [`MIN_SLOPE`]. f(Qs/Qc) is taken as 1.
    #[inline]
    pub fn wave_celerity(&self, area: f64, slope: f64) -> f64 {
        let base = self.erosion.area_term(area);
        if self.erosion.is_linear_in_slope() {
            base
        } else {
            base * slope.max(MIN_SLOPE).powf(self.erosion.n - 1.0)
        }
    }

    /// Fill per-node capacity and erosion-rate arrays for one sub-step.
    ///
    /// Flooded nodes get zero for both: they neither erode nor carry load.
    pub fn fill_rates(
        &self,
        area: &[f64],
        slope: &[f64],
        flooded: &[bool],
        capacity: &mut [f64],
        erosion_rate: &mut [f64],
    ) {
        debug_assert_eq!(area.len(), slope.len());
        debug_assert_eq!(area.len(), capacity.len());
        debug_assert_eq!(area.len(), erosion_rate.len());
        for i in 0..area.len() {
            if flooded[i] {
                capacity[i] = 0.0;
                erosion_rate[i] = 0.0;
            } else {
                capacity[i] = self.transport_capacity(area[i], slope[i]);
                erosion_rate[i] = self.erosion_rate(area[i], slope[i]);
            }
        }
    }
}
