use crate::config::SimulationConfig;
use crate::penalty::DISPLAY_ROUGHNESS_CEILING;
use serde::{Deserialize, Serialize};

/// Snapshot of a simulated hull and its accumulated costs.
///
/// Instantaneous fields are recomputed on every transition; cumulative
/// fields only grow while time advances.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    /// Simulated days elapsed.
    pub day: f64,
    /// Average hull roughness (microns).
    pub roughness: f64,
    /// Antifouling coating condition (percent).
    pub coating_health: f64,

    /// Drag increase over a clean hull (percent).
    pub drag_penalty: f64,
    /// Fuel increase over a clean hull (percent).
    pub fuel_penalty: f64,
    /// Current fuel burn rate (tonnes/day).
    pub daily_fuel_tonnes: f64,

    /// Cumulative CO2 (tonnes).
    pub emissions: f64,
    pub emissions_clean: f64,
    pub emissions_penalty: f64,

    /// Cumulative fuel cost (currency units).
    pub fuel_cost_total: f64,
    pub fuel_cost_clean: f64,
    pub fuel_cost_penalty: f64,

    pub config: SimulationConfig,
}

impl SimulationState {
    /// Fuel burn rate the hull would have without fouling (tonnes/day).
    pub fn clean_fuel_tonnes(&self) -> f64 {
        self.daily_fuel_tonnes / (1.0 + self.fuel_penalty / 100.0)
    }

    /// Roughness as a fraction of the display ceiling, clamped to [0, 1].
    pub fn display_fraction(&self) -> f64 {
        (self.roughness / DISPLAY_ROUGHNESS_CEILING).clamp(0.0, 1.0)
    }
}
