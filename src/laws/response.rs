//! Sediment-flux response functions f(Qs/Qc).
//!
//! The response function scales detachment-limited incision by the
//! relative sediment flux x = Qs/Qc:
//!
//! ```text
//! E = f(x) * K * A^m * S^n
//! ```
//!
//! f = 1 means full detachment-limited erosion, f = 0 means the bed is
//! fully covered. All shapes are defined on x ∈ [0, 1] only; callers must
//! route x ≥ 1 to pure deposition before evaluating.
//!
//! Shapes (Hobley et al., 2011):
//! - `Constant`: f = 1 (pure stream power)
//! - `LinearDecline`: f = 1 - x
//! - `AlmostParabolic`: f = 2.6x + 0.1 for x ≤ 0.1, else 1 - 4(x - 0.5)²
//! - `GeneralizedHumped`: f = norm·κ·(x^ν + c)·exp(-φx)
//!
//! A true parabola 1 - 4(x - 0.5)² has f(0) = 0, which starves channel heads
//! of erosion and is numerically unstable; it is rejected at configuration.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SedDepError};

/// Number of sample intervals on [0, 1] used to locate the hump peak.
const HUMP_SAMPLE_INTERVALS: usize = 1000;

/// Golden-section iterations used to refine the sampled peak.
const HUMP_REFINE_ITERATIONS: usize = 60;

/// Response-function family as requested in configuration.
///
/// This is the unresolved tag; [`ResponseFunction`] is the evaluated form
/// carrying its normalisation constant.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResponseShape {
    /// f(x) = 1 everywhere.
    Constant,
    /// f(x) = 1 - x.
    LinearDecline,
    /// Parabolic cover effect with a linear ramp near x = 0.
    AlmostParabolic,
    /// Four-parameter tools-and-cover hump.
    GeneralizedHumped {
        /// Amplitude.
        kappa: f64,
        /// Rate of rise of the tools limb.
        nu: f64,
        /// Rate of fall of the cover limb.
        phi: f64,
        /// Asymmetry.
        c: f64,
    },
}

impl Default for ResponseShape {
    fn default() -> Self {
        Self::leh_valley()
    }
}

impl ResponseShape {
    /// Generalized hump fitted to the Leh valley (Hobley et al., 2011).
    ///
    /// - kappa: 13.683
    /// - nu: 1.13
    /// - phi: 4.24
    /// - c: 0.00181
    pub fn leh_valley() -> Self {
        Self::GeneralizedHumped {
            kappa: 13.683,
            nu: 1.13,
            phi: 4.24,
            c: 0.00181,
        }
    }

    /// Canonical configuration name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Constant => "None",
            Self::LinearDecline => "linear_decline",
            Self::AlmostParabolic => "almost_parabolic",
            Self::GeneralizedHumped { .. } => "generalized_humped",
        }
    }
}

impl fmt::Display for ResponseShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResponseShape {
    type Err = SedDepError;

    /// Parse a family name. `generalized_humped` gets the Leh valley
    /// parameters; override them with
    /// [`SedDepConfig::with_response`](crate::eroder::SedDepConfig::with_response).
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "generalized_humped" => Ok(Self::leh_valley()),
            "None" | "constant" => Ok(Self::Constant),
            "linear_decline" => Ok(Self::LinearDecline),
            "almost_parabolic" => Ok(Self::AlmostParabolic),
            "parabolic" => Err(SedDepError::UnsupportedResponseFunction {
                name: s.to_string(),
                reason: "numerically unstable at channel heads; use 'almost_parabolic'"
                    .to_string(),
            }),
            other => Err(SedDepError::UnknownResponseFunction(other.to_string())),
        }
    }
}

/// Resolved response function, dispatched once per evaluation by `match`.
///
/// Built once at configuration time; the hump normalisation is computed
/// here and never again.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ResponseFunction {
    /// f(x) = 1.
    Constant,
    /// f(x) = 1 - x.
    LinearDecline,
    /// Parabola with linear ramp below x = 0.1.
    AlmostParabolic,
    /// Hump rescaled so its peak on [0, 1] is exactly 1.
    GeneralizedHumped {
        kappa: f64,
        nu: f64,
        phi: f64,
        c: f64,
        /// 1 / max of the raw hump on [0, 1].
        norm: f64,
    },
}

impl ResponseFunction {
    /// Resolve a configured shape, computing the hump normalisation.
    pub fn new(shape: ResponseShape) -> Result<Self> {
        match shape {
            ResponseShape::Constant => Ok(Self::Constant),
            ResponseShape::LinearDecline => Ok(Self::LinearDecline),
            ResponseShape::AlmostParabolic => Ok(Self::AlmostParabolic),
            ResponseShape::GeneralizedHumped { kappa, nu, phi, c } => {
                for (name, value) in [
                    ("kappa_hump", kappa),
                    ("nu_hump", nu),
                    ("phi_hump", phi),
                    ("c_hump", c),
                ] {
                    if !value.is_finite() {
                        return Err(SedDepError::invalid_parameter(name, value));
                    }
                }
                let peak = humped_peak(kappa, nu, phi, c);
                if !(peak.is_finite() && peak > 0.0) {
                    return Err(SedDepError::invalid_parameter("kappa_hump", kappa));
                }
                Ok(Self::GeneralizedHumped {
                    kappa,
                    nu,
                    phi,
                    c,
                    norm: 1.0 / peak,
                })
            }
        }
    }

    /// The configuration tag this function was resolved from.
    pub fn shape(&self) -> ResponseShape {
        match *self {
            Self::Constant => ResponseShape::Constant,
            Self::LinearDecline => ResponseShape::LinearDecline,
            Self::AlmostParabolic => ResponseShape::AlmostParabolic,
            Self::GeneralizedHumped {
                kappa, nu, phi, c, ..
            } => ResponseShape::GeneralizedHumped { kappa, nu, phi, c },
        }
    }

    /// Normalisation constant (1 for the unnormalised shapes).
    pub fn normalization(&self) -> f64 {
        match *self {
            Self::GeneralizedHumped { norm, .. } => norm,
            _ => 1.0,
        }
    }

    /// Evaluate f(x) for x ∈ [0, 1].
    #[inline(always)]
    pub fn eval(&self, x: f64) -> f64 {
        match *self {
            Self::Constant => 1.0,
            Self::LinearDecline => 1.0 - x,
            Self::AlmostParabolic => {
                if x > 0.1 {
                    1.0 - 4.0 * (x - 0.5) * (x - 0.5)
                } else {
                    2.6 * x + 0.1
                }
            }
            Self::GeneralizedHumped {
                kappa,
                nu,
                phi,
                c,
                norm,
            } => norm * humped_raw(x, kappa, nu, phi, c),
        }
    }

    /// Evaluate f over a slice of relative fluxes.
    ///
    /// # Panics
    ///
    /// Panics if `xs` and `out` have different lengths.
    pub fn eval_into(&self, xs: &[f64], out: &mut [f64]) {
        assert_eq!(xs.len(), out.len(), "xs and out must have same length");
        for (o, &x) in out.iter_mut().zip(xs) {
            *o = self.eval(x);
        }
    }

    /// Sample the curve at `n_points` evenly spaced x on [0, 1].
    ///
    /// Returns (x, f(x)) pairs; useful for inspecting or plotting the
    /// configured shape.
    pub fn sample(&self, n_points: usize) -> Vec<(f64, f64)> {
        match n_points {
            0 => Vec::new(),
            1 => vec![(0.0, self.eval(0.0))],
            _ => {
                let step = 1.0 / (n_points - 1) as f64;
                (0..n_points)
                    .map(|i| {
                        let x = i as f64 * step;
                        (x, self.eval(x))
                    })
                    .collect()
            }
        }
    }
}

/// Raw (unnormalised) generalized hump.
#[inline(always)]
fn humped_raw(x: f64, kappa: f64, nu: f64, phi: f64, c: f64) -> f64 {
    kappa * (x.powf(nu) + c) * (-phi * x).exp()
}

/// Maximum of the raw hump on [0, 1].
///
/// Dense sampling finds the bracket, golden-section search refines the
/// peak inside it so that rescaling puts the continuous maximum at 1.
fn humped_peak(kappa: f64, nu: f64, phi: f64, c: f64) -> f64 {
    let f = |x: f64| humped_raw(x, kappa, nu, phi, c);
    let step = 1.0 / HUMP_SAMPLE_INTERVALS as f64;

    let mut best_i = 0;
    let mut best = f(0.0);
    for i in 1..=HUMP_SAMPLE_INTERVALS {
        let v = f(i as f64 * step);
        if v > best {
            best = v;
            best_i = i;
        }
    }

    let mut lo = (best_i as f64 - 1.0).max(0.0) * step;
    let mut hi = (best_i as f64 + 1.0).min(HUMP_SAMPLE_INTERVALS as f64) * step;
    let inv_phi = (5.0_f64.sqrt() - 1.0) / 2.0;
    let mut x1 = hi - inv_phi * (hi - lo);
    let mut x2 = lo + inv_phi * (hi - lo);
    let mut f1 = f(x1);
    let mut f2 = f(x2);
    for _ in 0..HUMP_REFINE_ITERATIONS {
        if f1 < f2 {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + inv_phi * (hi - lo);
            f2 = f(x2);
        } else {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - inv_phi * (hi - lo);
            f1 = f(x1);
        }
    }

    best.max(f1).max(f2)
}
