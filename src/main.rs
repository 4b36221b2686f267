mod analysis;
mod catalog;
mod clock;
mod config;
mod engine;
mod error;
mod manager;
mod model;
mod penalty;
mod stats;

use crate::manager::Manager;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct CLI {
    #[arg(long)]
    sim_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    Create,

    Analyze,

    Clean,

    Vessels,
}

fn main() {
    env_logger::Builder::new()
        .format_timestamp_millis()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    if let Err(error) = run_cli() {
        log::error!("{error:#?}");
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let args = CLI::parse();
    log::info!("{args:#?}");

    match args.command {
        Command::Create => manager(args.sim_dir)?.create_run()?,
        Command::Analyze => manager(args.sim_dir)?.analyze_sim()?,
        Command::Clean => manager(args.sim_dir)?.clean_sim()?,
        Command::Vessels => print_vessels(),
    }

    Ok(())
}

fn manager(sim_dir: Option<PathBuf>) -> Result<Manager> {
    let sim_dir = sim_dir.context("--sim-dir is required")?;
    Manager::new(sim_dir).context("failed to construct mgr")
}

fn print_vessels() {
    let default_id = &catalog::default_profile().id;
    for category in catalog::categories() {
        println!("{category}");
        for vessel in catalog::by_category(category) {
            let marker = if &vessel.id == default_id { "*" } else { " " };
            println!(
                " {marker} {:<22} {:<28} {:>5.1} kn {:>6.1} t/d {:>4.0} m {:>4.0} um {:>4.2} um/d",
                vessel.id,
                vessel.name,
                vessel.ref_speed,
                vessel.base_fuel,
                vessel.hull_length,
                vessel.base_roughness,
                vessel.fouling_rate,
            );
            println!("     {}", vessel.description);
        }
    }
}
