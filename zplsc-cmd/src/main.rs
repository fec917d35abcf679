mod config;
mod echogram;
mod info;
mod particles;

use std::io::stderr;
use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CalibrationArgs {
    /// JSON file with calibration coefficients and deployment parameters.
    ///
    /// The file may contain a "calibration" object with any of the per-channel arrays
    /// ds, tvr, vtx, bp, el and a thermistor object, and an "environment" object with
    /// salinity, pressure and bins_to_average. Anything not provided uses the built-in
    /// defaults.
    #[arg(short, long, value_name = "path")]
    calibration: Option<PathBuf>,

    /// Number of range bins to average. Overrides the calibration file.
    #[arg(short, long, value_name = "n")]
    bins_to_average: Option<usize>,
}

impl CalibrationArgs {
    fn load(&self) -> Result<Config> {
        Ok(Config::load(self.calibration.as_deref())?.with_bins_to_average(self.bins_to_average))
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decode ZPLSC-C profile files to particles.
    ///
    /// Particles are written to stdout as JSON, one per line, in input file order. Files
    /// are decoded concurrently.
    Particles {
        #[command(flatten)]
        calibration: CalibrationArgs,

        /// Input profile files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Show information about profile files
    Info {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: info::Format,

        #[command(flatten)]
        calibration: CalibrationArgs,

        /// Input profile files.
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
    /// Write echogram data for a profile file as JSON.
    ///
    /// The output contains the record times, channel frequencies, the bin depth range and
    /// the backscatter (Sv, dB) of every record by channel.
    Echogram {
        #[command(flatten)]
        calibration: CalibrationArgs,

        /// Delete output file if it already exists
        #[arg(long, action)]
        clobber: bool,

        /// Output file path.
        #[arg(short, long, default_value = "echogram.json", value_name = "path")]
        output: PathBuf,

        /// Input profile file.
        input: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(stderr)
        .with_ansi(false)
        .without_time()
        .with_env_filter(
            EnvFilter::try_from_env("ZPLSC_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    debug!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"));

    match &cli.command {
        Commands::Particles {
            calibration,
            inputs,
        } => particles::particles(inputs, &calibration.load()?),
        Commands::Info {
            format,
            calibration,
            inputs,
        } => info::info(inputs, format, &calibration.load()?),
        Commands::Echogram {
            calibration,
            clobber,
            output,
            input,
        } => echogram::echogram(input, output, *clobber, &calibration.load()?),
    }
}
