use crate::catalog::VesselProfile;

/// Tonnes of CO2 emitted per tonne of heavy fuel oil burned.
pub const CO2_FACTOR: f64 = 3.114;

/// Coefficient of the roughness-to-penalty power law (percent).
pub const PENALTY_COEFF: f64 = 0.5;
/// Exponent of the roughness-to-penalty power law.
pub const PENALTY_EXPONENT: f64 = 0.67;

/// Coating health lost per simulated day (percentage points).
pub const COATING_DECAY_PER_DAY: f64 = 0.05;
/// Extra fouling growth at zero coating health, relative to full health.
pub const COATING_FOULING_BOOST: f64 = 0.5;

/// Roughness shown as a fully fouled hull by presentation layers (microns).
pub const DISPLAY_ROUGHNESS_CEILING: f64 = 1500.0;

/// Instantaneous penalties at a given roughness and operating speed.
#[derive(Debug, PartialEq, Clone, Copy)]
pub struct Penalties {
    /// Drag increase over a clean hull (percent).
    pub drag: f64,
    /// Fuel increase over a clean hull (percent).
    pub fuel: f64,
    /// Clean-hull fuel rate at the operating speed (tonnes/day).
    pub clean_fuel_tonnes: f64,
}

impl Penalties {
    /// Fuel rate including the fouling penalty (tonnes/day).
    pub fn daily_fuel_tonnes(&self) -> f64 {
        self.clean_fuel_tonnes * (1.0 + self.fuel / 100.0)
    }
}

/// Compute drag and fuel penalties for a hull.
///
/// Both penalties follow a concave power law of the roughness increase over
/// the vessel's own baseline. The clean-hull fuel rate scales with the cube
/// of the speed ratio and does not depend on roughness.
pub fn compute_penalties(roughness: f64, vessel: &VesselProfile, speed: f64) -> Penalties {
    let delta_ahr = (roughness - vessel.base_roughness).max(0.0);
    let roughness_penalty = if delta_ahr > 0.0 {
        PENALTY_COEFF * delta_ahr.powf(PENALTY_EXPONENT)
    } else {
        0.0
    };

    let clean_fuel_tonnes = vessel.base_fuel * (speed / vessel.ref_speed).powi(3);

    Penalties {
        drag: roughness_penalty.max(0.0),
        fuel: roughness_penalty.max(0.0),
        clean_fuel_tonnes,
    }
}

/// Multiplier on fouling growth from coating wear, from 1.0 at full health to 1.5 at none.
pub fn coating_factor(coating_health: f64) -> f64 {
    1.0 + (1.0 - coating_health / 100.0) * COATING_FOULING_BOOST
}

#[cfg(test)]
pub(crate) fn assert_close(a: f64, b: f64, tol: f64) {
    assert!((a - b).abs() <= tol, "{a} is not within {tol} of {b}");
}
