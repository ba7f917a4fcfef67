mod config;

use crate::config::Config;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parasitoid_core::linearization::{fixed_point, NewtonSettings};
use parasitoid_core::models::PlanarExample;
use parasitoid_core::traits::SystemKind;
use parasitoid_core::{Report, Scenario};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the available scenarios.
    List,

    /// Run a scenario and write its figure data as JSON.
    Run {
        scenario: Scenario,

        /// Write the report here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,

        /// TOML file with integrator and root-finder settings.
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Print the eigenvalues at the fixed points of the two-variable example.
    Eigen,
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
    let args = Cli::parse();
    log::debug!("{args:#?}");

    match args.command {
        Command::List => {
            for scenario in Scenario::ALL {
                println!("{:<32} {}", scenario.name(), scenario.description());
            }
        }
        Command::Run {
            scenario,
            output,
            config,
        } => {
            let config = match config {
                Some(path) => Config::from_file(&path)
                    .with_context(|| format!("failed to load config {path:?}"))?,
                None => Config::default(),
            };
            let report = scenario.run(&config.run_settings())?;
            write_report(&report, output)?;
        }
        Command::Eigen => print_planar_eigenvalues()?,
    }

    Ok(())
}

fn write_report(report: &Report, output: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("failed to serialize report")?;
    match output {
        Some(path) => {
            fs::write(&path, json).with_context(|| format!("failed to write {path:?}"))?;
            log::info!("wrote {path:?}");
            for scalar in &report.scalars {
                println!("{} = {}", scalar.name, scalar.value);
            }
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_planar_eigenvalues() -> Result<()> {
    let guesses = [
        ("stable", PlanarExample::STABLE_FIXED_POINT),
        ("unstable", PlanarExample::UNSTABLE_FIXED_POINT),
    ];
    for (name, guess) in guesses {
        let point = fixed_point(&PlanarExample, SystemKind::Map, &guess, NewtonSettings::default())
            .with_context(|| format!("failed to locate the {name} fixed point"))?;
        let rho = point
            .eigenvalues
            .iter()
            .map(|l| l.modulus())
            .fold(0.0, f64::max);
        println!("fixed point {:?} ({name})", point.state);
        for lambda in &point.eigenvalues {
            println!("  λ = {:.6} {:+.6}i", lambda.re, lambda.im);
        }
        println!("  rho = {rho}");
    }
    Ok(())
}
