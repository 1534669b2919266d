//! Sediment volume accounting for one erosion call.
//!
//! Volumes are solid (unexpanded) volumes in m³. With
//! `supply + eroded = deposited + exported + capped` holding per routing
//! pass, the residual measures only floating-point drift.

use crate::solver::RouterStats;
use crate::types::Seconds;

/// Volumes moved during one erosion call.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SedimentBudget {
    /// Hillslope sediment mobilised into channels (m³)
    pub supplied_m3: f64,
    /// Bedrock eroded (m³)
    pub eroded_m3: f64,
    /// Sediment left on the bed (m³)
    pub deposited_m3: f64,
    /// Sediment passed into boundary nodes (m³)
    pub exported_m3: f64,
    /// Eroded sediment discarded because the flux exceeded capacity (m³)
    pub capped_m3: f64,
}

impl SedimentBudget {
    /// Add one sub-step worth of routing rates.
    pub fn accumulate(&mut self, stats: &RouterStats, step: Seconds) {
        let dt = step.get();
        self.supplied_m3 += stats.supply_rate * dt;
        self.eroded_m3 += stats.erosion_rate * dt;
        self.deposited_m3 += stats.deposition_rate * dt;
        self.exported_m3 += stats.export_rate * dt;
        self.capped_m3 += stats.capped_rate * dt;
    }

    /// Sources minus sinks (m³).
    pub fn residual_m3(&self) -> f64 {
        self.supplied_m3 + self.eroded_m3 - self.deposited_m3 - self.exported_m3 - self.capped_m3
    }

    /// Residual relative to the total source volume.
    pub fn relative_residual(&self) -> f64 {
        let sources = self.supplied_m3 + self.eroded_m3;
        if sources > 0.0 {
            self.residual_m3().abs() / sources
        } else {
            self.residual_m3().abs()
        }
    }

    /// Format the budget as a single line.
    pub fn summary_line(&self) -> String {
        format!(
            "in={:.4e} eroded={:.4e} dep={:.4e} out={:.4e} capped={:.4e} m3",
            self.supplied_m3, self.eroded_m3, self.deposited_m3, self.exported_m3, self.capped_m3
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_accumulate_scales_by_step() {
        let stats = RouterStats {
            supply_rate: 2.0,
            erosion_rate: 1.0,
            deposition_rate: 0.5,
            export_rate: 2.0,
            capped_rate: 0.5,
            ..Default::default()
        };
        let mut budget = SedimentBudget::default();
        budget.accumulate(&stats, Seconds::new(10.0));
        budget.accumulate(&stats, Seconds::new(5.0));
        assert_relative_eq!(budget.supplied_m3, 30.0);
        assert_relative_eq!(budget.exported_m3, 30.0);
        assert_relative_eq!(budget.residual_m3(), 0.0);
        assert_eq!(budget.relative_residual(), 0.0);
    }

    #[test]
    fn test_empty_budget() {
        let budget = SedimentBudget::default();
        assert_eq!(budget.relative_residual(), 0.0);
        assert!(budget.summary_line().contains("eroded=0.0000e0"));
    }
}
