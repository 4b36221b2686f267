use crate::analysis::Analyzer;
use crate::clock::FrameClock;
use crate::config::{ConfigUpdate, RunConfig, ScheduledAction};
use crate::engine::Engine;
use anyhow::{Context, Result};
use glob::glob;
use rmp_serde::encode;
use std::{
    fs::{self, File},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

pub struct Manager {
    sim_dir: PathBuf,
    cfg: RunConfig,
}

impl Manager {
    pub fn new<P: AsRef<Path>>(sim_dir: P) -> Result<Self> {
        let sim_dir = sim_dir.as_ref().to_path_buf();

        let cfg =
            RunConfig::from_file(sim_dir.join("config.toml")).context("failed to construct cfg")?;
        log::info!("{cfg:#?}");

        Ok(Self { sim_dir, cfg })
    }

    pub fn create_run(&self) -> Result<()> {
        let run_idx = self.count_run_dirs().context("failed to count run dirs")?;

        let run_dir = self.run_dir(run_idx);
        fs::create_dir_all(&run_dir).with_context(|| format!("failed to create {run_dir:?}"))?;
        log::info!("created {run_dir:?}");

        let update = self
            .cfg
            .operation
            .to_update()
            .context("failed to resolve operation")?;
        let mut engine = Engine::new(update).context("failed to construct engine")?;

        let file = self.trajectory_file(run_idx);
        let file = File::create(&file).with_context(|| format!("failed to create {file:?}"))?;
        let mut writer = BufWriter::new(file);

        perform_run(&self.cfg, &mut engine, &mut writer).context("failed to perform run")?;

        writer.flush().context("failed to flush writer stream")?;

        Ok(())
    }

    pub fn analyze_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let mut analyzer = Analyzer::new();

            analyzer
                .add_file(self.trajectory_file(run_idx))
                .context("failed to add file")?;

            let results_file = self.results_file(run_idx);
            analyzer
                .save_results(&results_file)
                .context("failed to save results")?;
            log::info!("saved {results_file:?}");
        }

        Ok(())
    }

    pub fn clean_sim(&self) -> Result<()> {
        let n_runs = self.count_run_dirs().context("failed to count run dirs")?;
        for run_idx in 0..n_runs {
            let run_dir = self.run_dir(run_idx);
            fs::remove_dir_all(&run_dir)
                .with_context(|| format!("failed to remove {run_dir:?}"))?;
            log::info!("removed {run_dir:?}");
        }

        Ok(())
    }

    fn count_run_dirs(&self) -> Result<usize> {
        let pattern = self.sim_dir.join("run-*");
        let pattern = pattern.to_str().context("pattern is not valid UTF-8")?;
        let count = glob(pattern)
            .context("failed to glob run dirs")?
            .filter_map(Result::ok)
            .filter(|p| p.is_dir())
            .count();
        Ok(count)
    }

    fn run_dir(&self, run_idx: usize) -> PathBuf {
        self.sim_dir.join(format!("run-{run_idx:04}"))
    }

    fn trajectory_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("trajectory.msgpack")
    }

    fn results_file(&self, run_idx: usize) -> PathBuf {
        self.run_dir(run_idx).join("results.json")
    }
}

/// Drive an engine through a full run, streaming snapshots to `writer`.
///
/// Actions due at time zero apply before the first frame; later ones apply at
/// the first frame boundary that reaches their firing time.
fn perform_run<W: Write>(cfg: &RunConfig, engine: &mut Engine, writer: &mut W) -> Result<()> {
    let run = &cfg.run;
    let mut clock = FrameClock::new(run).context("failed to construct frame clock")?;
    let mut pending = cfg.schedule.iter().peekable();

    const N_PROGRESS_REPORTS: usize = 10;
    let mut n_reports = 0;

    while let Some(action) = pending.next_if(|action| action.at_secs <= clock.elapsed_secs()) {
        apply_action(engine, action).context("failed to apply scheduled action")?;
    }

    encode::write(writer, engine.state()).context("failed to serialize state")?;

    let mut i_frame = 0;
    while let Some(delta) = clock.next() {
        engine.advance(delta);
        i_frame += 1;

        while let Some(action) = pending.next_if(|action| action.at_secs <= clock.elapsed_secs()) {
            apply_action(engine, action).context("failed to apply scheduled action")?;
        }

        if i_frame % run.frames_per_save == 0 {
            encode::write(writer, engine.state()).context("failed to serialize state")?;
        }

        let progress = clock.elapsed_secs() / run.duration_secs;
        if progress * N_PROGRESS_REPORTS as f64 >= (n_reports + 1) as f64 {
            n_reports += 1;
            log::info!(
                "completed {:06.2}% (day {:.1})",
                100.0 * progress,
                engine.state().day
            );
        }
    }

    if i_frame % run.frames_per_save != 0 {
        encode::write(writer, engine.state()).context("failed to serialize state")?;
    }

    Ok(())
}

fn apply_action(engine: &mut Engine, action: &ScheduledAction) -> Result<()> {
    let update: ConfigUpdate = action
        .operation()
        .to_update()
        .context("failed to resolve change")?;

    if !update.is_empty() {
        match engine.reconfigure(update) {
            Ok(()) => log::info!("reconfigured at {:.2} s: {:?}", action.at_secs, action.operation()),
            Err(err) => log::warn!("rejected change at {:.2} s: {err}", action.at_secs),
        }
    }

    if action.reset {
        engine.reset();
        log::info!("reset at {:.2} s", action.at_secs);
    }

    Ok(())
}
