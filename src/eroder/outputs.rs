//! Per-node fields published after each erosion call.

/// Field names under which outputs are conventionally stored.
pub mod field_names {
    /// Volumetric transport capacity (m³/s)
    pub const TRANSPORT_CAPACITY: &str = "channel_sediment__volumetric_transport_capacity";
    /// Volumetric sediment discharge into each node (m³/s)
    pub const SEDIMENT_DISCHARGE: &str = "channel_sediment__volumetric_discharge";
    /// Sediment discharge over capacity
    pub const RELATIVE_FLUX: &str = "channel_sediment__relative_flux";
    /// Bed shear stress (Pa)
    pub const BED_SHEAR_STRESS: &str = "channel__bed_shear_stress";
    /// Water discharge (m³/s)
    pub const WATER_DISCHARGE: &str = "channel__discharge";
}

/// Output fields from the last sub-step of an erosion call.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErosionOutputs {
    /// Transport capacity Qc (m³/s)
    pub transport_capacity: Vec<f64>,
    /// Fluvial sediment discharge delivered from upstream, local supply excluded (m³/s)
    pub sediment_discharge: Vec<f64>,
    /// Qs/Qc
    pub relative_flux: Vec<f64>,
    /// Not computed; zero-filled
    pub bed_shear_stress: Vec<f64>,
    /// Runoff times drainage area (m³/s)
    pub water_discharge: Vec<f64>,
    /// Transport-limited classification
    pub is_transport_limited: Vec<bool>,
}

impl ErosionOutputs {
    /// Zero-filled outputs for `n_nodes`.
    pub fn zeros(n_nodes: usize) -> Self {
        Self {
            transport_capacity: vec![0.0; n_nodes],
            sediment_discharge: vec![0.0; n_nodes],
            relative_flux: vec![0.0; n_nodes],
            bed_shear_stress: vec![0.0; n_nodes],
            water_discharge: vec![0.0; n_nodes],
            is_transport_limited: vec![false; n_nodes],
        }
    }

    /// Look up a floating-point output by field name.
    pub fn field(&self, name: &str) -> Option<&[f64]> {
        match name {
            field_names::TRANSPORT_CAPACITY => Some(&self.transport_capacity),
            field_names::SEDIMENT_DISCHARGE => Some(&self.sediment_discharge),
            field_names::RELATIVE_FLUX => Some(&self.relative_flux),
            field_names::BED_SHEAR_STRESS => Some(&self.bed_shear_stress),
            field_names::WATER_DISCHARGE => Some(&self.water_discharge),
            _ => None,
        }
    }

    /// Names of all floating-point output fields.
    pub fn field_names() -> [&'static str; 5] {
        [
            field_names::TRANSPORT_CAPACITY,
            field_names::SEDIMENT_DISCHARGE,
            field_names::RELATIVE_FLUX,
            field_names::BED_SHEAR_STRESS,
            field_names::WATER_DISCHARGE,
        ]
    }
}
