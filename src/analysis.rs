use crate::model::SimulationState;
use crate::stats::Accumulator;
use anyhow::{Context, Result};
use rmp_serde::decode;
use std::{
    fs::File,
    io::{BufReader, BufWriter, ErrorKind},
    path::Path,
};

pub trait Obs {
    fn update(&mut self, state: &SimulationState) -> Result<()>;
    fn report(&self) -> serde_json::Value;
}

/// Distribution of the fuel penalty over saved snapshots.
pub struct FuelPenalty {
    acc: Accumulator,
}

impl FuelPenalty {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for FuelPenalty {
    fn update(&mut self, state: &SimulationState) -> Result<()> {
        self.acc.add(state.fuel_penalty);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "fuel_penalty": self.acc.report() })
    }
}

/// Distribution of the daily fuel burn over saved snapshots.
pub struct DailyFuel {
    acc: Accumulator,
}

impl DailyFuel {
    pub fn new() -> Self {
        Self {
            acc: Accumulator::new(),
        }
    }
}

impl Obs for DailyFuel {
    fn update(&mut self, state: &SimulationState) -> Result<()> {
        self.acc.add(state.daily_fuel_tonnes);
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "daily_fuel_tonnes": self.acc.report() })
    }
}

/// Share of emissions caused by fouling at the last snapshot.
pub struct PenaltyShare {
    share: f64,
}

impl PenaltyShare {
    pub fn new() -> Self {
        Self { share: 0.0 }
    }
}

impl Obs for PenaltyShare {
    fn update(&mut self, state: &SimulationState) -> Result<()> {
        self.share = if state.emissions > 0.0 {
            state.emissions_penalty / state.emissions
        } else {
            0.0
        };
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        serde_json::json!({ "penalty_share": self.share })
    }
}

/// Hull condition and accumulated totals at the last snapshot.
pub struct FinalTotals {
    last: Option<SimulationState>,
}

impl FinalTotals {
    pub fn new() -> Self {
        Self { last: None }
    }
}

impl Obs for FinalTotals {
    fn update(&mut self, state: &SimulationState) -> Result<()> {
        self.last = Some(state.clone());
        Ok(())
    }

    fn report(&self) -> serde_json::Value {
        let Some(state) = &self.last else {
            return serde_json::json!({ "final_totals": null });
        };
        serde_json::json!({
            "final_totals": {
                "vessel": state.config.vessel.id,
                "day": state.day,
                "roughness": state.roughness,
                "coating_health": state.coating_health,
                "display_fraction": state.display_fraction(),
                "daily_fuel_tonnes": state.daily_fuel_tonnes,
                "clean_fuel_tonnes": state.clean_fuel_tonnes(),
                "emissions": state.emissions,
                "emissions_clean": state.emissions_clean,
                "emissions_penalty": state.emissions_penalty,
                "fuel_cost_total": state.fuel_cost_total,
                "fuel_cost_clean": state.fuel_cost_clean,
                "fuel_cost_penalty": state.fuel_cost_penalty,
            }
        })
    }
}

pub struct Analyzer {
    n_states: usize,
    obs_ptr_vec: Vec<Box<dyn Obs>>,
}

impl Analyzer {
    pub fn new() -> Self {
        let obs_ptr_vec: Vec<Box<dyn Obs>> = vec![
            Box::new(FuelPenalty::new()),
            Box::new(DailyFuel::new()),
            Box::new(PenaltyShare::new()),
            Box::new(FinalTotals::new()),
        ];
        Self {
            n_states: 0,
            obs_ptr_vec,
        }
    }

    pub fn add_state(&mut self, state: &SimulationState) -> Result<()> {
        for obs in &mut self.obs_ptr_vec {
            obs.update(state).context("failed to update observable")?;
        }
        self.n_states += 1;
        Ok(())
    }

    /// Feed every snapshot of a trajectory file to the observables.
    pub fn add_file<P: AsRef<Path>>(&mut self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::open(file).with_context(|| format!("failed to open {file:?}"))?;
        let mut reader = BufReader::new(file);

        loop {
            let state: SimulationState = match decode::from_read(&mut reader) {
                Ok(state) => state,
                Err(decode::Error::InvalidMarkerRead(err))
                    if err.kind() == ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(err) => return Err(err).context("failed to read state"),
            };
            self.add_state(&state)?;
        }

        log::info!("analyzed {} states", self.n_states);
        Ok(())
    }

    pub fn save_results<P: AsRef<Path>>(&self, file: P) -> Result<()> {
        let file = file.as_ref();
        let file = File::create(file).with_context(|| format!("failed to create {file:?}"))?;
        let writer = BufWriter::new(file);

        let reports: Vec<_> = self.obs_ptr_vec.iter().map(|obs| obs.report()).collect();
        serde_json::to_writer_pretty(writer, &reports).context("failed to serialize results")?;
        Ok(())
    }
}
