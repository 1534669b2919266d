//! Time quantity newtypes.
//!
//! These types prevent mixing up durations expressed in the external unit
//! (years) with the internal solver unit (seconds).

use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Length of a Julian year in seconds (365.25 days).
pub const SECONDS_PER_YEAR: f64 = 31_557_600.0;

/// One hour in seconds.
pub const SECONDS_PER_HOUR: f64 = 3600.0;

// =============================================================================
// Years (external time unit)
// =============================================================================

/// Duration in years.
///
/// The unit in which timesteps and rate prefactors are supplied.
///
/// # Example
///
/// ```
/// use sedflux_rs::types::Years;
///
/// let dt = Years::new(2.0);
/// assert_eq!(dt.to_seconds().get(), 63_115_200.0);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default)]
#[repr(transparent)]
pub struct Years(f64);

impl Years {
    /// Create a new duration in years.
    #[inline]
    pub const fn new(years: f64) -> Self {
        Self(years)
    }

    /// Zero duration.
    pub const ZERO: Self = Self(0.0);

    /// Get the raw value in years.
    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Convert to seconds.
    #[inline]
    pub fn to_seconds(self) -> Seconds {
        Seconds(self.0 * SECONDS_PER_YEAR)
    }

    /// Convert a per-year rate prefactor into a per-second one.
    #[inline]
    pub fn per_year_to_per_second(rate: f64) -> f64 {
        rate / SECONDS_PER_YEAR
    }
}

impl fmt::Display for Years {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}yr", self.0)
    }
}

impl From<f64> for Years {
    #[inline]
    fn from(years: f64) -> Self {
        Self(years)
    }
}

impl From<Years> for Seconds {
    #[inline]
    fn from(y: Years) -> Seconds {
        y.to_seconds()
    }
}

// =============================================================================
// Seconds (internal time unit)
// =============================================================================

/// Duration in seconds.
///
/// All rates inside the router are volumes or lengths per second.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default)]
#[repr(transparent)]
pub struct Seconds(f64);

impl Seconds {
    /// Create a new duration in seconds.
    #[inline]
    pub const fn new(seconds: f64) -> Self {
        Self(seconds)
    }

    /// Zero duration.
    pub const ZERO: Self = Self(0.0);

    /// Get the raw value in seconds.
    #[inline]
    pub fn get(self) -> f64 {
        self.0
    }

    /// Convert to years.
    #[inline]
    pub fn to_years(self) -> Years {
        Years(self.0 / SECONDS_PER_YEAR)
    }

    /// Smaller of two durations.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        Self(self.0.min(other.0))
    }

    /// Larger of two durations.
    #[inline]
    pub fn max(self, other: Self) -> Self {
        Self(self.0.max(other.0))
    }
}

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3e}s", self.0)
    }
}

impl From<Seconds> for f64 {
    #[inline]
    fn from(s: Seconds) -> f64 {
        s.0
    }
}

impl Add for Seconds {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Seconds {
    #[inline]
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Seconds {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}
