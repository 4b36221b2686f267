use crate::config::{ConfigUpdate, SimulationConfig};
use crate::error::SimResult;
use crate::model::SimulationState;
use crate::penalty::{CO2_FACTOR, COATING_DECAY_PER_DAY, coating_factor, compute_penalties};

/// Simulation engine.
///
/// Owns the current [`SimulationState`] and replaces it as a whole on every
/// transition, so a borrowed snapshot is always internally consistent.
#[derive(Debug, Clone)]
pub struct Engine {
    state: SimulationState,
}

impl Engine {
    /// Create a new `Engine` from configuration overrides on top of the defaults.
    ///
    /// # Errors
    /// Returns [`crate::error::SimError::InvalidConfig`] if the merged
    /// configuration is invalid.
    pub fn new(overrides: ConfigUpdate) -> SimResult<Self> {
        let cfg = SimulationConfig::from_overrides(overrides)?;
        log::debug!("constructing engine for {:?}", cfg.vessel.id);
        Ok(Self {
            state: initial_state(cfg),
        })
    }

    /// Current state. Only the engine's transitions can change it.
    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Advance the simulation by an elapsed wall-clock interval.
    ///
    /// Negative or non-finite intervals are ignored, as are intervals so long
    /// that the resulting state would overflow.
    pub fn advance(&mut self, elapsed_secs: f64) {
        let sim_days = elapsed_secs * self.state.config.time_multiplier;
        if !sim_days.is_finite() || elapsed_secs < 0.0 {
            log::warn!("ignoring invalid elapsed time {elapsed_secs}");
            return;
        }
        let next = step(&self.state, sim_days);
        if !is_finite(&next) {
            log::warn!("ignoring elapsed time {elapsed_secs} that overflows the state");
            return;
        }
        self.state = next;
    }

    /// Replace the supplied configuration fields, keeping accumulated history.
    ///
    /// # Errors
    /// Returns [`crate::error::SimError::InvalidConfig`] if the merged
    /// configuration is invalid. The current state is left untouched.
    pub fn reconfigure(&mut self, update: ConfigUpdate) -> SimResult<()> {
        let cfg = self.state.config.merged(update)?;
        log::debug!("reconfiguring engine to {cfg:?}");

        let penalties = compute_penalties(self.state.roughness, &cfg.vessel, cfg.speed_knots);
        self.state = SimulationState {
            drag_penalty: penalties.drag,
            fuel_penalty: penalties.fuel,
            daily_fuel_tonnes: penalties.daily_fuel_tonnes(),
            config: cfg,
            ..self.state.clone()
        };
        Ok(())
    }

    /// Restore the initial state under the current configuration.
    pub fn reset(&mut self) {
        log::debug!("resetting engine at day {:.3}", self.state.day);
        self.state = initial_state(self.state.config.clone());
    }
}

fn initial_state(cfg: SimulationConfig) -> SimulationState {
    let roughness = cfg.vessel.base_roughness;
    let penalties = compute_penalties(roughness, &cfg.vessel, cfg.speed_knots);
    SimulationState {
        day: 0.0,
        roughness,
        coating_health: 100.0,
        drag_penalty: penalties.drag,
        fuel_penalty: penalties.fuel,
        daily_fuel_tonnes: penalties.daily_fuel_tonnes(),
        emissions: 0.0,
        emissions_clean: 0.0,
        emissions_penalty: 0.0,
        fuel_cost_total: 0.0,
        fuel_cost_clean: 0.0,
        fuel_cost_penalty: 0.0,
        config: cfg,
    }
}

fn step(prev: &SimulationState, sim_days: f64) -> SimulationState {
    let cfg = &prev.config;

    // Worn coating accelerates fouling; coating wear itself is linear in time.
    let roughness = prev.roughness
        + cfg.vessel.fouling_rate * sim_days * coating_factor(prev.coating_health);
    let coating_health = (prev.coating_health - COATING_DECAY_PER_DAY * sim_days).max(0.0);

    let penalties = compute_penalties(roughness, &cfg.vessel, cfg.speed_knots);
    let clean_fuel = penalties.clean_fuel_tonnes;
    let daily_fuel = penalties.daily_fuel_tonnes();

    // Rectangular integration at the post-step rates.
    let clean_fuel_burned = clean_fuel * sim_days;
    let penalty_fuel_burned = (daily_fuel - clean_fuel) * sim_days;

    let step_emissions_clean = clean_fuel_burned * CO2_FACTOR;
    let step_emissions_penalty = penalty_fuel_burned * CO2_FACTOR;
    let step_cost_clean = clean_fuel_burned * cfg.fuel_price;
    let step_cost_penalty = penalty_fuel_burned * cfg.fuel_price;

    SimulationState {
        day: prev.day + sim_days,
        roughness,
        coating_health,
        drag_penalty: penalties.drag,
        fuel_penalty: penalties.fuel,
        daily_fuel_tonnes: daily_fuel,
        emissions: prev.emissions + step_emissions_clean + step_emissions_penalty,
        emissions_clean: prev.emissions_clean + step_emissions_clean,
        emissions_penalty: prev.emissions_penalty + step_emissions_penalty,
        fuel_cost_total: prev.fuel_cost_total + step_cost_clean + step_cost_penalty,
        fuel_cost_clean: prev.fuel_cost_clean + step_cost_clean,
        fuel_cost_penalty: prev.fuel_cost_penalty + step_cost_penalty,
        config: cfg.clone(),
    }
}

fn is_finite(state: &SimulationState) -> bool {
    [
        state.day,
        state.roughness,
        state.coating_health,
        state.drag_penalty,
        state.fuel_penalty,
        state.daily_fuel_tonnes,
        state.emissions,
        state.emissions_clean,
        state.emissions_penalty,
        state.fuel_cost_total,
        state.fuel_cost_clean,
        state.fuel_cost_penalty,
    ]
    .iter()
    .all(|val| val.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{self, VesselProfile};
    use crate::error::SimError;
    use crate::penalty::assert_close;

    fn default_engine() -> Engine {
        Engine::new(ConfigUpdate::default()).unwrap()
    }

    fn assert_additive(state: &SimulationState) {
        let tol = 1e-9 * state.emissions.max(state.fuel_cost_total).max(1.0);
        assert_close(
            state.emissions,
            state.emissions_clean + state.emissions_penalty,
            tol,
        );
        assert_close(
            state.fuel_cost_total,
            state.fuel_cost_clean + state.fuel_cost_penalty,
            tol,
        );
    }

    fn assert_history_eq(a: &SimulationState, b: &SimulationState) {
        assert_eq!(a.day, b.day);
        assert_eq!(a.roughness, b.roughness);
        assert_eq!(a.coating_health, b.coating_health);
        assert_eq!(a.emissions, b.emissions);
        assert_eq!(a.emissions_clean, b.emissions_clean);
        assert_eq!(a.emissions_penalty, b.emissions_penalty);
        assert_eq!(a.fuel_cost_total, b.fuel_cost_total);
        assert_eq!(a.fuel_cost_clean, b.fuel_cost_clean);
        assert_eq!(a.fuel_cost_penalty, b.fuel_cost_penalty);
    }

    #[test]
    fn construct_starts_clean() {
        let engine = default_engine();
        let state = engine.state();
        assert_eq!(state.day, 0.0);
        assert_eq!(state.roughness, catalog::default_profile().base_roughness);
        assert_eq!(state.coating_health, 100.0);
        assert_eq!(state.drag_penalty, 0.0);
        assert_eq!(state.fuel_penalty, 0.0);
        assert_eq!(state.daily_fuel_tonnes, catalog::default_profile().base_fuel);
        assert_eq!(state.emissions, 0.0);
        assert_eq!(state.fuel_cost_total, 0.0);
    }

    #[test]
    fn construct_rejects_invalid_overrides() {
        let result = Engine::new(ConfigUpdate {
            fuel_price: Some(-10.0),
            ..Default::default()
        });
        assert_eq!(
            result.unwrap_err(),
            SimError::InvalidConfig {
                field: "fuel price",
                value: -10.0
            }
        );
    }

    #[test]
    fn advance_single_step() {
        let mut engine = Engine::new(ConfigUpdate {
            time_multiplier: Some(2.0),
            fuel_price: Some(600.0),
            ..Default::default()
        })
        .unwrap();
        engine.advance(5.0);

        let state = engine.state();
        let vessel = &state.config.vessel;
        let sim_days = 10.0;
        assert_eq!(state.day, sim_days);
        // Coating is fresh for the whole step, so growth is not accelerated.
        assert_close(state.roughness, 100.0 + vessel.fouling_rate * sim_days, 1e-12);
        assert_close(state.coating_health, 100.0 - 0.05 * sim_days, 1e-12);

        let penalty = 0.5 * (vessel.fouling_rate * sim_days).powf(0.67);
        assert_close(state.fuel_penalty, penalty, 1e-9);
        assert_close(state.daily_fuel_tonnes, 35.0 * (1.0 + penalty / 100.0), 1e-9);
        assert_close(state.emissions_clean, 35.0 * 3.114 * sim_days, 1e-9);
        assert_close(
            state.emissions_penalty,
            35.0 * penalty / 100.0 * 3.114 * sim_days,
            1e-9,
        );
        assert_close(state.fuel_cost_clean, 35.0 * 600.0 * sim_days, 1e-6);
        assert_additive(state);
    }

    #[test]
    fn advance_reaches_reference_penalty() {
        // A fouling rate of 10 um/day over 10 days at full coating gives 200 um.
        let mut vessel = catalog::default_profile().clone();
        vessel.fouling_rate = 10.0;
        let mut engine = Engine::new(ConfigUpdate {
            vessel: Some(vessel),
            time_multiplier: Some(10.0),
            ..Default::default()
        })
        .unwrap();
        engine.advance(1.0);

        let state = engine.state();
        assert_close(state.roughness, 200.0, 1e-12);
        assert_close(state.drag_penalty, 10.9388, 1e-3);
        assert_eq!(state.drag_penalty, state.fuel_penalty);
        assert_close(state.clean_fuel_tonnes(), 35.0, 1e-9);
        assert_close(state.daily_fuel_tonnes, 38.8286, 1e-3);
    }

    #[test]
    fn worn_coating_accelerates_fouling() {
        let mut engine = default_engine();
        // 2500 days wears the coating off completely.
        engine.advance(2500.0);
        assert_eq!(engine.state().coating_health, 0.0);

        let before = engine.state().roughness;
        engine.advance(1.0);
        let rate = engine.state().config.vessel.fouling_rate;
        assert_close(engine.state().roughness - before, 1.5 * rate, 1e-9);
        assert_eq!(engine.state().coating_health, 0.0);
    }

    #[test]
    fn advance_is_monotonic() {
        let mut engine = default_engine();
        let deltas = [0.016, 0.5, 0.0, 3.0, 0.25, 120.0, 0.001, 900.0, 40.0];
        for &delta in deltas.iter().cycle().take(60) {
            let prev = engine.state().clone();
            engine.advance(delta);
            let state = engine.state();

            assert!(state.day >= prev.day);
            assert!(state.roughness >= prev.roughness);
            assert!(state.coating_health <= prev.coating_health);
            assert!((0.0..=100.0).contains(&state.coating_health));
            assert!(state.emissions >= prev.emissions);
            assert!(state.emissions_clean >= prev.emissions_clean);
            assert!(state.emissions_penalty >= prev.emissions_penalty);
            assert!(state.fuel_cost_total >= prev.fuel_cost_total);
            assert!(state.fuel_cost_clean >= prev.fuel_cost_clean);
            assert!(state.fuel_cost_penalty >= prev.fuel_cost_penalty);
            assert!(state.drag_penalty >= 0.0);
            assert_additive(state);
        }
    }

    #[test]
    fn advance_zero_is_identity() {
        let mut engine = default_engine();
        engine.advance(42.0);
        let before = engine.state().clone();
        engine.advance(0.0);
        assert_eq!(engine.state(), &before);
    }

    #[test]
    fn advance_ignores_invalid_elapsed_time() {
        let mut engine = default_engine();
        engine.advance(7.0);
        let before = engine.state().clone();
        for elapsed in [-1.0, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            engine.advance(elapsed);
            assert_eq!(engine.state(), &before);
        }
    }

    #[test]
    fn advance_ignores_overflowing_elapsed_time() {
        let mut vessel = catalog::default_profile().clone();
        vessel.fouling_rate = 0.0;
        let mut stopped = Engine::new(ConfigUpdate {
            vessel: Some(vessel),
            speed_knots: Some(0.0),
            time_multiplier: Some(3.0),
            ..Default::default()
        })
        .unwrap();
        stopped.advance(2.0);
        let before = stopped.state().clone();
        stopped.advance(f64::MAX);
        assert_eq!(stopped.state(), &before);

        let mut engine = default_engine();
        engine.advance(2.0);
        let before = engine.state().clone();
        for elapsed in [f64::MAX, 1e300] {
            engine.advance(elapsed);
            assert_eq!(engine.state(), &before);
        }

        engine.advance(1.0);
        assert!(engine.state().day > before.day);
    }

    #[test]
    fn reconfigure_preserves_history() {
        let mut engine = default_engine();
        engine.advance(100.0);
        let before = engine.state().clone();
        assert!(before.emissions > 0.0);

        engine
            .reconfigure(ConfigUpdate {
                speed_knots: Some(10.0),
                ..Default::default()
            })
            .unwrap();

        let after = engine.state();
        assert_history_eq(after, &before);
        assert_eq!(after.config.speed_knots, 10.0);
        assert_eq!(after.fuel_penalty, before.fuel_penalty);
        assert!(after.daily_fuel_tonnes < before.daily_fuel_tonnes);
        assert_close(
            after.clean_fuel_tonnes(),
            35.0 * (10.0_f64 / 13.5).powi(3),
            1e-9,
        );
    }

    #[test]
    fn reconfigure_vessel_recomputes_penalty_from_current_roughness() {
        let mut engine = default_engine();
        engine.advance(50.0);
        let before = engine.state().clone();

        let vessel = catalog::by_id("container-feeder").unwrap().clone();
        let expected = compute_penalties(before.roughness, &vessel, before.config.speed_knots);
        engine
            .reconfigure(ConfigUpdate {
                vessel: Some(vessel.clone()),
                ..Default::default()
            })
            .unwrap();

        let after = engine.state();
        assert_history_eq(after, &before);
        assert_eq!(after.config.vessel, vessel);
        assert_eq!(after.fuel_penalty, expected.fuel);
        assert_eq!(after.daily_fuel_tonnes, expected.daily_fuel_tonnes());
    }

    #[test]
    fn reconfigure_time_and_price_apply_to_later_steps() {
        let mut engine = default_engine();
        engine.advance(10.0);
        let before = engine.state().clone();

        engine
            .reconfigure(ConfigUpdate {
                time_multiplier: Some(3.0),
                fuel_price: Some(1000.0),
                ..Default::default()
            })
            .unwrap();
        assert_history_eq(engine.state(), &before);

        engine.advance(1.0);
        let state = engine.state();
        assert_close(state.day, before.day + 3.0, 1e-12);
        let cost_step = state.fuel_cost_clean - before.fuel_cost_clean;
        assert_close(cost_step, 35.0 * 1000.0 * 3.0, 1e-6);
    }

    #[test]
    fn rejected_reconfigure_keeps_state() {
        let mut engine = default_engine();
        engine.advance(30.0);
        let before = engine.state().clone();

        let mut vessel: VesselProfile = catalog::default_profile().clone();
        vessel.base_fuel = -5.0;
        for update in [
            ConfigUpdate {
                speed_knots: Some(f64::NAN),
                ..Default::default()
            },
            ConfigUpdate {
                time_multiplier: Some(-0.25),
                ..Default::default()
            },
            ConfigUpdate {
                vessel: Some(vessel),
                speed_knots: Some(12.0),
                ..Default::default()
            },
        ] {
            assert!(engine.reconfigure(update).is_err());
            assert_eq!(engine.state(), &before);
        }
    }

    #[test]
    fn reset_restores_baseline_under_current_config() {
        let mut engine = default_engine();
        engine.advance(200.0);
        let vessel = catalog::by_id("lng-carrier").unwrap().clone();
        engine
            .reconfigure(ConfigUpdate {
                vessel: Some(vessel.clone()),
                speed_knots: Some(17.0),
                time_multiplier: Some(0.25),
                fuel_price: Some(720.0),
            })
            .unwrap();
        engine.advance(80.0);
        let cfg = engine.state().config.clone();

        engine.reset();

        let state = engine.state();
        assert_eq!(state.config, cfg);
        assert_eq!(state.day, 0.0);
        assert_eq!(state.roughness, vessel.base_roughness);
        assert_eq!(state.coating_health, 100.0);
        assert_eq!(state.drag_penalty, 0.0);
        assert_eq!(state.fuel_penalty, 0.0);
        assert_eq!(state.emissions, 0.0);
        assert_eq!(state.emissions_clean, 0.0);
        assert_eq!(state.emissions_penalty, 0.0);
        assert_eq!(state.fuel_cost_total, 0.0);
        assert_eq!(state.fuel_cost_clean, 0.0);
        assert_eq!(state.fuel_cost_penalty, 0.0);
    }

    #[test]
    fn engines_are_independent() {
        let mut a = default_engine();
        let b = default_engine();
        a.advance(10.0);
        assert!(a.state().day > 0.0);
        assert_eq!(b.state().day, 0.0);
    }

    #[test]
    fn display_fraction_is_clamped() {
        let mut engine = default_engine();
        assert_close(engine.state().display_fraction(), 100.0 / 1500.0, 1e-12);
        engine.advance(5000.0);
        assert_eq!(engine.state().display_fraction(), 1.0);
    }
}
