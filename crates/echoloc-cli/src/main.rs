//! TDOA Acoustic Localization CLI
//!
//! This CLI provides tools for:
//! - Running batches of simulated localization trials
//! - Inspecting the microphone ring geometry
//! - Localizing a single explicit source through the full pipeline
//!
//! Plotting and audio file decoding are external collaborators; the CLI
//! emits text/CSV/JSON tables they can consume.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use echoloc_core::geometry::SensorArray;
use echoloc_core::types::Point3;
use echoloc_core::waveform::Waveform;
use echoloc_sim::runner::{FailurePolicy, RunnerConfig, TrialRunner};
use std::fs;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "echoloc")]
#[command(author, version, about = "TDOA acoustic source localization simulator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a batch of simulated localization trials
    Run {
        /// Number of trials
        #[arg(short, long, default_value = "10")]
        trials: usize,

        /// Number of sensors on the ring (minimum 4)
        #[arg(short, long, default_value = "8")]
        sensors: usize,

        /// Delay-estimation worker count (1 = sequential)
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// Ring radius in scene units
        #[arg(long, default_value = "50.0")]
        radius: f64,

        /// RNG seed for reproducible runs
        #[arg(long)]
        seed: Option<u64>,

        /// Additive noise SNR in dB (omit for clean signals)
        #[arg(long)]
        snr: Option<f64>,

        /// Stop the whole run on the first failed trial
        #[arg(long)]
        fail_fast: bool,

        /// Chirp template duration in milliseconds
        #[arg(long, default_value = "50.0")]
        template_ms: f64,

        /// Output format (text, csv, json)
        #[arg(long, short = 'o', default_value = "text")]
        output_format: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Print the sensor ring geometry
    Geometry {
        /// Number of sensors on the ring
        #[arg(short, long, default_value = "8")]
        sensors: usize,

        /// Ring radius in scene units
        #[arg(long, default_value = "50.0")]
        radius: f64,
    },

    /// Localize one explicit source through the full pipeline
    Locate {
        /// Source x coordinate
        #[arg(short)]
        x: f64,

        /// Source y coordinate
        #[arg(short)]
        y: f64,

        /// Source z coordinate
        #[arg(short)]
        z: f64,

        /// Number of sensors on the ring
        #[arg(short, long, default_value = "8")]
        sensors: usize,

        /// Delay-estimation worker count
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// Ring radius in scene units
        #[arg(long, default_value = "50.0")]
        radius: f64,

        /// Chirp template duration in milliseconds
        #[arg(long, default_value = "50.0")]
        template_ms: f64,
    },
}

#[allow(clippy::too_many_arguments)]
fn cmd_run(
    trials: usize,
    sensors: usize,
    workers: usize,
    radius: f64,
    seed: Option<u64>,
    snr: Option<f64>,
    fail_fast: bool,
    template_ms: f64,
    output_format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let waveform = chirp_template(template_ms)?;
    let config = RunnerConfig {
        trials,
        sensors,
        radius,
        workers,
        seed,
        snr_db: snr,
        failure_policy: if fail_fast {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Skip
        },
    };

    let mut runner = TrialRunner::new(config, waveform).context("invalid run configuration")?;
    let report = runner.run().context("run aborted")?;

    let rendered = match output_format.as_str() {
        "text" => report.format_text(),
        "csv" => report.format_csv(),
        "json" => report.format_json(),
        other => bail!("unknown output format: {other} (expected text, csv, or json)"),
    };

    match output {
        Some(path) => {
            fs::write(&path, rendered)
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!("report written to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

fn cmd_geometry(sensors: usize, radius: f64) -> Result<()> {
    let array = SensorArray::ring(sensors, radius);

    println!("Sensor ring: {sensors} sensors, radius {radius}");
    println!("{:>4}  {:>10}  {:>10}  {:>10}", "#", "x", "y", "z");
    for (i, p) in array.positions().iter().enumerate() {
        println!("{:>4}  {:>10.4}  {:>10.4}  {:>10.4}", i, p.x, p.y, p.z);
    }
    Ok(())
}

fn cmd_locate(
    x: f64,
    y: f64,
    z: f64,
    sensors: usize,
    workers: usize,
    radius: f64,
    template_ms: f64,
) -> Result<()> {
    let waveform = chirp_template(template_ms)?;
    let config = RunnerConfig {
        trials: 1,
        sensors,
        radius,
        workers,
        seed: None,
        snr_db: None,
        failure_policy: FailurePolicy::Abort,
    };

    let mut runner = TrialRunner::new(config, waveform).context("invalid configuration")?;
    let truth = Point3::new(x, y, z);
    let record = runner.locate(truth).context("localization failed")?;

    println!("true position:      {}", record.truth);
    println!("estimated position: {}", record.estimate);
    println!("euclidean error:    {:.6}", record.error);
    println!("estimation time:    {:.6}s", record.estimation_secs);
    Ok(())
}

fn chirp_template(template_ms: f64) -> Result<Waveform> {
    Waveform::chirp(200.0, 2000.0, template_ms / 1000.0).context("invalid template duration")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            trials,
            sensors,
            workers,
            radius,
            seed,
            snr,
            fail_fast,
            template_ms,
            output_format,
            output,
        } => cmd_run(
            trials,
            sensors,
            workers,
            radius,
            seed,
            snr,
            fail_fast,
            template_ms,
            output_format,
            output,
        ),

        Commands::Geometry { sensors, radius } => cmd_geometry(sensors, radius),

        Commands::Locate {
            x,
            y,
            z,
            sensors,
            workers,
            radius,
            template_ms,
        } => cmd_locate(x, y, z, sensors, workers, radius, template_ms),
    }
}
