use crate::catalog::{self, VesselProfile};
use crate::error::{SimError, SimResult};
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::{fmt::Debug, fs, ops::RangeBounds, path::Path};

/// Fuel price used when none is configured (currency units per tonne).
pub const DEFAULT_FUEL_PRICE: f64 = 500.0;
/// Time multiplier used when none is configured (simulated days per real second).
pub const DEFAULT_TIME_MULTIPLIER: f64 = 1.0;

/// Configuration in effect for a simulation.
///
/// Never modified in place: [`SimulationConfig::merged`] builds a validated
/// replacement instead.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub vessel: VesselProfile,
    /// Operating speed (knots).
    pub speed_knots: f64,
    /// Simulated days per real second.
    pub time_multiplier: f64,
    /// Currency units per tonne of fuel.
    pub fuel_price: f64,
}

/// Partial configuration. Fields left as `None` keep their current value.
#[derive(Debug, Default, Clone)]
pub struct ConfigUpdate {
    pub vessel: Option<VesselProfile>,
    pub speed_knots: Option<f64>,
    pub time_multiplier: Option<f64>,
    pub fuel_price: Option<f64>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        self.vessel.is_none()
            && self.speed_knots.is_none()
            && self.time_multiplier.is_none()
            && self.fuel_price.is_none()
    }
}

impl SimulationConfig {
    /// Build a configuration from overrides on top of the defaults.
    ///
    /// Without an explicit speed, the vessel in effect sails at its reference speed.
    pub fn from_overrides(overrides: ConfigUpdate) -> SimResult<Self> {
        let vessel = overrides
            .vessel
            .unwrap_or_else(|| catalog::default_profile().clone());
        let cfg = Self {
            speed_knots: overrides.speed_knots.unwrap_or(vessel.ref_speed),
            time_multiplier: overrides
                .time_multiplier
                .unwrap_or(DEFAULT_TIME_MULTIPLIER),
            fuel_price: overrides.fuel_price.unwrap_or(DEFAULT_FUEL_PRICE),
            vessel,
        };
        cfg.validate()?;
        Ok(cfg)
    }

    /// Merge an update onto this configuration and validate the result.
    pub fn merged(&self, update: ConfigUpdate) -> SimResult<Self> {
        let cfg = Self {
            vessel: update.vessel.unwrap_or_else(|| self.vessel.clone()),
            speed_knots: update.speed_knots.unwrap_or(self.speed_knots),
            time_multiplier: update.time_multiplier.unwrap_or(self.time_multiplier),
            fuel_price: update.fuel_price.unwrap_or(self.fuel_price),
        };
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> SimResult<()> {
        self.vessel.validate()?;
        check_non_negative("operating speed", self.speed_knots)?;
        check_non_negative("time multiplier", self.time_multiplier)?;
        check_non_negative("fuel price", self.fuel_price)?;
        Ok(())
    }
}

fn check_non_negative(field: &'static str, value: f64) -> SimResult<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimError::InvalidConfig { field, value });
    }
    Ok(())
}

/// Operating parameters as written in a run file, with the vessel named by id.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OperationSpec {
    pub vessel: Option<String>,
    pub speed_knots: Option<f64>,
    pub time_multiplier: Option<f64>,
    pub fuel_price: Option<f64>,
}

impl OperationSpec {
    /// Resolve the vessel id against the catalog.
    pub fn to_update(&self) -> SimResult<ConfigUpdate> {
        let vessel = match &self.vessel {
            Some(id) => Some(catalog::by_id(id)?.clone()),
            None => None,
        };
        Ok(ConfigUpdate {
            vessel,
            speed_knots: self.speed_knots,
            time_multiplier: self.time_multiplier,
            fuel_price: self.fuel_price,
        })
    }
}

/// Frame pacing of a headless run.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunParams {
    /// Real seconds to simulate.
    pub duration_secs: f64,
    /// Nominal real seconds per frame.
    pub frame_secs: f64,
    /// Log-space standard deviation of the frame time jitter.
    #[serde(default)]
    pub frame_jitter: f64,
    /// Upper bound on a single frame delta.
    pub max_frame_secs: f64,
    /// Number of frames between saved snapshots.
    pub frames_per_save: usize,
    /// Jitter seed. Drawn from the OS when absent.
    pub seed: Option<u64>,
}

/// Timed user action applied during a headless run.
///
/// Changes are applied before the reset when both are present.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScheduledAction {
    /// Elapsed real seconds at which the action fires.
    pub at_secs: f64,
    #[serde(default)]
    pub reset: bool,
    pub vessel: Option<String>,
    pub speed_knots: Option<f64>,
    pub time_multiplier: Option<f64>,
    pub fuel_price: Option<f64>,
}

impl ScheduledAction {
    pub fn operation(&self) -> OperationSpec {
        OperationSpec {
            vessel: self.vessel.clone(),
            speed_knots: self.speed_knots,
            time_multiplier: self.time_multiplier,
            fuel_price: self.fuel_price,
        }
    }
}

/// Contents of a simulation directory's `config.toml`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    #[serde(default)]
    pub operation: OperationSpec,
    pub run: RunParams,
    #[serde(default)]
    pub schedule: Vec<ScheduledAction>,
}

impl RunConfig {
    /// Load a [`RunConfig`] from a TOML file and validate it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, deserialized,
    /// or if the configuration values are invalid.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self> {
        let cfg: RunConfig = toml::from_str(contents).context("failed to deserialize config")?;
        cfg.validate().context("failed to validate config")?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        let update = self
            .operation
            .to_update()
            .context("invalid operation")?;
        SimulationConfig::from_overrides(update).context("invalid operation")?;

        let run = &self.run;
        check_num(run.duration_secs, 1e-3..=1e6).context("invalid run duration")?;
        check_num(run.frame_secs, 1e-4..=10.0).context("invalid frame duration")?;
        check_num(run.frame_jitter, 0.0..1.0).context("invalid frame jitter")?;
        check_num(run.max_frame_secs, run.frame_secs..=3600.0)
            .context("invalid maximum frame duration")?;
        check_num(run.frames_per_save, 1..1_000_000).context("invalid number of frames per save")?;

        let mut prev_at_secs = 0.0;
        for (i_action, action) in self.schedule.iter().enumerate() {
            check_action(action, prev_at_secs, run.duration_secs)
                .with_context(|| format!("invalid scheduled action {i_action}"))?;
            prev_at_secs = action.at_secs;
        }

        Ok(())
    }
}

fn check_action(action: &ScheduledAction, min_at_secs: f64, max_at_secs: f64) -> Result<()> {
    // Actions must be listed in firing order.
    check_num(action.at_secs, min_at_secs..=max_at_secs).context("invalid firing time")?;
    let operation = action.operation();
    if !action.reset && operation == OperationSpec::default() {
        bail!("action must reset or change at least one parameter");
    }
    let update = operation.to_update().context("invalid change")?;
    for (field, value) in [
        ("speed", update.speed_knots),
        ("time multiplier", update.time_multiplier),
        ("fuel price", update.fuel_price),
    ] {
        if let Some(value) = value {
            check_num(value, 0.0..f64::INFINITY).with_context(|| format!("invalid {field}"))?;
        }
    }
    Ok(())
}

fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}
