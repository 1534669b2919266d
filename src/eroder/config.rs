//! Eroder configuration.

use crate::error::{Result, SedDepError};
use crate::laws::{ResponseShape, TransportLaw};
use crate::solver::StabilityConfig;

/// Runoff rate used to publish water discharge.
#[derive(Clone, Debug, PartialEq)]
pub enum RunoffRate {
    /// Uniform rate (m/s)
    Constant(f64),
    /// One rate per node (m/s)
    PerNode(Vec<f64>),
}

impl Default for RunoffRate {
    fn default() -> Self {
        Self::Constant(1.0)
    }
}

impl RunoffRate {
    /// Expand into a dense per-node array.
    pub fn resolve(&self, n_nodes: usize) -> Result<Vec<f64>> {
        match self {
            Self::Constant(rate) => Ok(vec![*rate; n_nodes]),
            Self::PerNode(rates) => {
                if rates.len() != n_nodes {
                    return Err(SedDepError::RunoffLengthMismatch {
                        expected: n_nodes,
                        actual: rates.len(),
                    });
                }
                Ok(rates.clone())
            }
        }
    }
}

impl From<f64> for RunoffRate {
    fn from(rate: f64) -> Self {
        Self::Constant(rate)
    }
}

impl From<Vec<f64>> for RunoffRate {
    fn from(rates: Vec<f64>) -> Self {
        Self::PerNode(rates)
    }
}

/// Parameters of the sediment-flux-dependent eroder.
///
/// Prefactors are per year; they are converted to per second when the
/// eroder is built.
#[derive(Clone, Debug, PartialEq)]
pub struct SedDepConfig {
    /// Erosion prefactor K_sp (per year)
    pub k_sp: f64,
    /// Erosion area exponent
    pub m_sp: f64,
    /// Erosion slope exponent
    pub n_sp: f64,
    /// Transport law family
    pub transport_law: TransportLaw,
    /// Transport prefactor K_t (per year)
    pub k_t: f64,
    /// Transport area exponent
    pub m_t: f64,
    /// Transport slope exponent
    pub n_t: f64,
    /// Sediment-flux response function
    pub response: ResponseShape,
    /// Bedrock density (kg/m³)
    pub rock_density: f64,
    /// Sediment density (kg/m³)
    pub sediment_density: f64,
    /// Runoff rate (m/s)
    pub runoff_rate: RunoffRate,
    /// Maximum fixed-point refinements per node
    pub pseudoimplicit_repeats: usize,
    /// Relative change in f under which a refinement has converged
    pub refinement_tolerance: f64,
    /// Sub-step selection
    pub stability: StabilityConfig,
}

impl Default for SedDepConfig {
    fn default() -> Self {
        Self {
            k_sp: 1.0e-6,
            m_sp: 0.5,
            n_sp: 1.0,
            transport_law: TransportLaw::PowerLaw,
            k_t: 1.0e-4,
            m_t: 1.5,
            n_t: 1.0,
            response: ResponseShape::default(),
            rock_density: 2700.0,
            sediment_density: 2700.0,
            runoff_rate: RunoffRate::default(),
            pseudoimplicit_repeats: 50,
            refinement_tolerance: 0.01,
            stability: StabilityConfig::default(),
        }
    }
}

impl SedDepConfig {
    /// Set the erosion law.
    pub fn with_erosion(mut self, k_sp: f64, m_sp: f64, n_sp: f64) -> Self {
        self.k_sp = k_sp;
        self.m_sp = m_sp;
        self.n_sp = n_sp;
        self
    }

    /// Set the transport capacity law.
    pub fn with_transport(mut self, k_t: f64, m_t: f64, n_t: f64) -> Self {
        self.k_t = k_t;
        self.m_t = m_t;
        self.n_t = n_t;
        self
    }

    /// Set the transport law family.
    pub fn with_transport_law(mut self, law: TransportLaw) -> Self {
        self.transport_law = law;
        self
    }

    /// Set the response function.
    pub fn with_response(mut self, response: ResponseShape) -> Self {
        self.response = response;
        self
    }

    /// Set rock and sediment densities.
    pub fn with_densities(mut self, rock: f64, sediment: f64) -> Self {
        self.rock_density = rock;
        self.sediment_density = sediment;
        self
    }

    /// Set the runoff rate.
    pub fn with_runoff(mut self, runoff: impl Into<RunoffRate>) -> Self {
        self.runoff_rate = runoff.into();
        self
    }

    /// Set the refinement budget and tolerance.
    pub fn with_refinement(mut self, repeats: usize, tolerance: f64) -> Self {
        self.pseudoimplicit_repeats = repeats;
        self.refinement_tolerance = tolerance;
        self
    }

    /// Set sub-step selection.
    pub fn with_stability(mut self, stability: StabilityConfig) -> Self {
        self.stability = stability;
        self
    }

    /// Select the response function and transport law by name.
    pub fn with_named_laws(mut self, response: &str, transport: &str) -> Result<Self> {
        self.response = response.parse()?;
        self.transport_law = transport.parse()?;
        Ok(self)
    }

    /// Sediment-to-rock density ratio applied to deposited volumes.
    pub fn porosity(&self) -> f64 {
        self.sediment_density / self.rock_density
    }

    pub(crate) fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("rock_density", self.rock_density),
            ("sediment_density", self.sediment_density),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(SedDepError::invalid_parameter(name, value));
            }
        }
        if self.pseudoimplicit_repeats == 0 {
            return Err(SedDepError::invalid_parameter("pseudoimplicit_repeats", 0.0));
        }
        if !(self.refinement_tolerance.is_finite() && self.refinement_tolerance > 0.0) {
            return Err(SedDepError::invalid_parameter(
                "refinement_tolerance",
                self.refinement_tolerance,
            ));
        }
        if let RunoffRate::Constant(rate) = self.runoff_rate {
            if !rate.is_finite() {
                return Err(SedDepError::invalid_parameter("runoff_rate", rate));
            }
        }
        self.stability.validate()
    }
}
