//! Command-line front end of the SNIP sewer network planner

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
    process::ExitCode,
    time::Duration,
};

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use snip::{
    InputOptions, ScenarioInputs, SnipConfig, SweepCase, run_scenario, run_sweep,
    run_with_deadline, write_results, write_sweep_csv,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snip")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Plans centralised and decentralised sewer networks for rural settlements")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Plan one scenario and write its layers
    Run {
        #[command(flatten)]
        layers: Layers,

        /// Output directory for the GeoJSON layers and statistics
        #[arg(short, long, default_value = "snip-output")]
        output: PathBuf,

        /// Also write the private house connections
        #[arg(long)]
        connections: bool,

        /// Give up after this many seconds
        #[arg(long)]
        deadline: Option<u64>,
    },

    /// Run sensitivity cases in parallel
    Sweep {
        #[command(flatten)]
        layers: Layers,

        /// TOML file with a `[[case]]` table per run
        #[arg(long)]
        cases: PathBuf,

        /// Summary CSV, one row per case
        #[arg(short, long, default_value = "sweep.csv")]
        summary: PathBuf,

        /// Directory receiving the layers of every case
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the default scenario file
    Defaults,
}

#[derive(Args)]
struct Layers {
    /// Scenario TOML, defaults are used for missing keys
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Street centrelines (GeoJSON)
    #[arg(long)]
    streets: PathBuf,

    /// Terrain samples (CSV with x, y, z columns)
    #[arg(long)]
    terrain: PathBuf,

    /// Buildings (GeoJSON points or footprints)
    #[arg(long)]
    buildings: PathBuf,
}

/// Contents of a scenario TOML file
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct ScenarioFile {
    input: InputOptions,
    #[serde(flatten)]
    config: SnipConfig,
}

#[derive(Debug, Deserialize)]
struct SweepFile {
    #[serde(rename = "case")]
    cases: Vec<SweepCase>,
}

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn read_toml<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}

fn load(layers: &Layers) -> CliResult<(ScenarioInputs, SnipConfig)> {
    let scenario: ScenarioFile = match &layers.config {
        Some(path) => read_toml(path)?,
        None => ScenarioFile::default(),
    };
    scenario.config.validate()?;
    let inputs = ScenarioInputs::from_files(
        &layers.streets,
        &layers.terrain,
        &layers.buildings,
        &scenario.input,
    )?;
    Ok((inputs, scenario.config))
}

fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Command::Run {
            layers,
            output,
            connections,
            deadline,
        } => {
            let (inputs, config) = load(&layers)?;
            let result = match deadline {
                Some(secs) => run_with_deadline(inputs, &config, Duration::from_secs(secs))?,
                None => run_scenario(inputs, &config)?,
            };
            write_results(&output, &result, &config.sewer, connections)?;
            println!("{}", serde_json::to_string_pretty(&result.statistics)?);
        }
        Command::Sweep {
            layers,
            cases,
            summary,
            output,
        } => {
            let (inputs, config) = load(&layers)?;
            let SweepFile { cases } = read_toml(&cases)?;

            let outcomes = run_sweep(&inputs, &config, &cases, output.as_deref());
            let mut rows = Vec::with_capacity(cases.len());
            for (case, outcome) in cases.iter().zip(outcomes) {
                match outcome {
                    Ok(row) => rows.push(row),
                    Err(e) => error!("Case {} failed: {e}", case.name),
                }
            }
            write_sweep_csv(File::create(&summary)?, &rows)?;
            info!(
                "{} of {} cases written to {}",
                rows.len(),
                cases.len(),
                summary.display()
            );
        }
        Command::Defaults => {
            print!("{}", toml::to_string_pretty(&ScenarioFile::default())?);
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
