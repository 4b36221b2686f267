use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Physical and operational reference parameters of a vessel.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct VesselProfile {
    pub id: String,
    pub name: String,
    pub category: String,

    /// Reference speed (knots).
    pub ref_speed: f64,
    /// Fuel consumption at reference speed with a clean hull (tonnes/day).
    pub base_fuel: f64,
    /// Hull length (metres).
    pub hull_length: f64,
    /// Average hull roughness of the clean hull (microns).
    pub base_roughness: f64,
    /// Roughness growth at full coating health (microns/day).
    pub fouling_rate: f64,

    pub description: String,
}

impl VesselProfile {
    pub(crate) fn validate(&self) -> SimResult<()> {
        check_positive("reference speed", self.ref_speed)?;
        check_positive("base fuel consumption", self.base_fuel)?;
        check_positive("hull length", self.hull_length)?;
        check_positive("base roughness", self.base_roughness)?;
        if !self.fouling_rate.is_finite() || self.fouling_rate < 0.0 {
            return Err(SimError::InvalidConfig {
                field: "fouling rate",
                value: self.fouling_rate,
            });
        }
        Ok(())
    }
}

fn check_positive(field: &'static str, value: f64) -> SimResult<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimError::InvalidConfig { field, value });
    }
    Ok(())
}

const DEFAULT_ID: &str = "bulk-panamax";

static CATALOG: LazyLock<Vec<VesselProfile>> = LazyLock::new(|| {
    let entries = [
        (
            "container-feeder",
            "Feeder Container Ship",
            "Container",
            [16.0, 28.0, 170.0, 120.0, 1.4],
            "Short-sea feeder of about 1,700 TEU serving hub ports.",
        ),
        (
            "container-neopanamax",
            "Neo-Panamax Container Ship",
            "Container",
            [19.0, 150.0, 366.0, 110.0, 1.1],
            "Deep-sea liner of about 14,000 TEU on long east-west loops.",
        ),
        (
            "bulk-panamax",
            "Panamax Bulk Carrier",
            "Bulk Carrier",
            [13.5, 35.0, 225.0, 100.0, 1.3],
            "Dry bulk carrier of about 80,000 DWT trading grain and coal.",
        ),
        (
            "bulk-capesize",
            "Capesize Bulk Carrier",
            "Bulk Carrier",
            [12.5, 55.0, 292.0, 105.0, 1.2],
            "Ore carrier of about 180,000 DWT with long idle periods at anchor.",
        ),
        (
            "tanker-aframax",
            "Aframax Tanker",
            "Tanker",
            [14.0, 45.0, 245.0, 115.0, 1.5],
            "Crude tanker of about 110,000 DWT on regional warm-water routes.",
        ),
        (
            "tanker-vlcc",
            "Very Large Crude Carrier",
            "Tanker",
            [13.0, 75.0, 330.0, 110.0, 1.3],
            "Crude tanker of about 300,000 DWT on Gulf to Asia voyages.",
        ),
        (
            "cruise-large",
            "Large Cruise Ship",
            "Passenger",
            [20.0, 180.0, 330.0, 95.0, 0.9],
            "Cruise ship with a frequent hull cleaning schedule.",
        ),
        (
            "ferry-ropax",
            "Ro-Pax Ferry",
            "Passenger",
            [21.0, 60.0, 200.0, 100.0, 2.0],
            "Vehicle and passenger ferry with short port stays in coastal water.",
        ),
        (
            "lng-carrier",
            "LNG Carrier",
            "Gas Carrier",
            [19.5, 130.0, 295.0, 90.0, 1.0],
            "Membrane-type LNG carrier of about 174,000 m3.",
        ),
    ];

    entries
        .into_iter()
        .map(|(id, name, category, num, description)| {
            let [ref_speed, base_fuel, hull_length, base_roughness, fouling_rate] = num;
            VesselProfile {
                id: id.to_string(),
                name: name.to_string(),
                category: category.to_string(),
                ref_speed,
                base_fuel,
                hull_length,
                base_roughness,
                fouling_rate,
                description: description.to_string(),
            }
        })
        .collect()
});

/// All vessels in display order.
pub fn list() -> &'static [VesselProfile] {
    &CATALOG
}

/// Distinct categories in first-seen order.
pub fn categories() -> Vec<&'static str> {
    let mut categories: Vec<&'static str> = Vec::new();
    for vessel in list() {
        if !categories.contains(&vessel.category.as_str()) {
            categories.push(vessel.category.as_str());
        }
    }
    categories
}

/// Vessels of one category in display order.
pub fn by_category(category: &str) -> Vec<&'static VesselProfile> {
    list()
        .iter()
        .filter(|vessel| vessel.category == category)
        .collect()
}

/// Look up a vessel by identifier.
///
/// # Errors
/// Returns [`SimError::UnknownVessel`] if no vessel has the given identifier.
pub fn by_id(id: &str) -> SimResult<&'static VesselProfile> {
    list()
        .iter()
        .find(|vessel| vessel.id == id)
        .ok_or_else(|| SimError::UnknownVessel(id.to_string()))
}

/// Vessel used when no vessel is configured explicitly.
pub fn default_profile() -> &'static VesselProfile {
    by_id(DEFAULT_ID).unwrap_or(&list()[0])
}
