//! overlayd - Racing overlay estimator daemon
//!
//! Runs the fuel, energy, relative and standings loops against a recorded
//! or synthetic telemetry session, and exposes the standalone fuel
//! calculator.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use racing_overlay_fuel::{CalculatorInput, RaceLength, calculate};
use racing_overlay_service::{OverlayConfig, OverlayOutputs, OverlayService};
use racing_overlay_standings::to_sentinel_indices;
use racing_overlay_telemetry::{ReplaySource, SyntheticSession, TelemetryRecording};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "overlayd")]
#[command(about = "Racing overlay estimators: fuel, energy, relative and standings")]
#[command(version)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run every enabled module against a replayed or synthetic session
    Run(RunArgs),

    /// Write a synthetic session to a recording file
    Synthesize {
        /// Output recording path (JSON)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        session: SessionArgs,
    },

    /// Estimate total consumption and pit stops for a race
    Calculate(CalculateArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Configuration file (.yaml, .yml or .json)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Recording to replay; a synthetic session runs when omitted
    #[arg(short, long)]
    replay: Option<PathBuf>,

    /// Directory for saved reference laps, overriding the config file
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Playback speed multiplier
    #[arg(long, default_value_t = 1.0)]
    speed: f64,

    /// Restart the recording when it ends
    #[arg(long)]
    looping: bool,

    /// Seconds between status reports
    #[arg(long, default_value_t = 5)]
    report_interval: u64,

    #[command(flatten)]
    session: SessionArgs,
}

#[derive(Args)]
struct SessionArgs {
    /// Laps driven by the synthetic player
    #[arg(long, default_value_t = 5)]
    laps: u32,

    /// Synthetic lap time in seconds
    #[arg(long, default_value_t = 60.0)]
    lap_time: f64,

    /// Lap on which the synthetic player refuels
    #[arg(long)]
    pit_lap: Option<u32>,

    /// Give the synthetic car a virtual energy limit
    #[arg(long)]
    hybrid: bool,

    /// Comma-separated opponent classes
    #[arg(long, value_delimiter = ',')]
    opponents: Vec<String>,
}

impl SessionArgs {
    fn session(&self) -> SyntheticSession {
        let opponents: Vec<&str> = self.opponents.iter().map(String::as_str).collect();
        let mut session = SyntheticSession {
            laps: self.laps,
            lap_time: self.lap_time,
            pit_lap: self.pit_lap,
            ..SyntheticSession::default()
        }
        .with_opponents(&opponents);
        if self.hybrid {
            session.max_energy = 900.0;
            session.energy_per_lap = 7.5;
        }
        session
    }
}

#[derive(Args)]
struct CalculateArgs {
    /// Race length in minutes
    #[arg(long, conflicts_with = "laps", required_unless_present = "laps")]
    minutes: Option<f64>,

    /// Race length in laps
    #[arg(long)]
    laps: Option<u32>,

    #[arg(long, default_value_t = 0)]
    formation_laps: u32,

    /// Average lap time in seconds
    #[arg(long)]
    lap_time: f64,

    /// Seconds lost per pit stop
    #[arg(long, default_value_t = 0.0)]
    pit_seconds: f64,

    #[arg(long)]
    capacity: f64,

    /// Consumption per lap
    #[arg(long)]
    consumption: f64,

    /// Amount in the tank at the start, defaults to a full tank
    #[arg(long)]
    start_amount: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("overlayd={log_level},racing_overlay={log_level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Synthesize { output, session } => synthesize(&output, &session),
        Commands::Calculate(args) => calculate_race(&args),
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => OverlayConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => OverlayConfig::default(),
    };
    if let Some(dir) = args.data_dir.clone() {
        config.storage.data_dir = dir;
    }

    let recording = match &args.replay {
        Some(path) => TelemetryRecording::load(path)
            .with_context(|| format!("Failed to load recording {}", path.display()))?,
        None => args.session.session().generate(),
    };
    info!(
        combo = %recording.combo_id(),
        frames = recording.frames.len(),
        duration = recording.metadata.duration_seconds,
        "Replaying session"
    );

    let source = Arc::new(
        ReplaySource::new(recording)
            .with_playback_speed(args.speed)
            .with_looping(args.looping),
    );
    let mut service = OverlayService::new(config, source.clone());
    service.start();
    let outputs = service.outputs();

    let mut report = tokio::time::interval(Duration::from_secs(args.report_interval.max(1)));
    loop {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result.context("Failed to listen for Ctrl+C")?;
                info!("Received Ctrl+C");
                break;
            }
            _ = report.tick() => {
                report_status(&outputs);
                if source.is_finished() {
                    info!("Replay finished");
                    break;
                }
            }
        }
    }

    service.shutdown().await;
    report_status(&outputs);
    Ok(())
}

fn report_status(outputs: &OverlayOutputs) {
    if let Some(fuel) = outputs.fuel() {
        info!(
            amount = %format!("{:.2}", fuel.amount_current),
            per_lap = %format!("{:.3}", fuel.estimated_consumption),
            delta = %format!("{:+.3}", fuel.delta_consumption),
            laps = %format!("{:.1}", fuel.estimated_laps),
            pit_stops = %format!("{:.2}", fuel.pit_stops_end_stint),
            "Fuel"
        );
    }
    if let Some(energy) = outputs.energy() {
        info!(
            amount = %format!("{:.1}%", energy.amount_current),
            per_lap = %format!("{:.3}", energy.estimated_consumption),
            ratio = %format!("{:.3}", outputs.hybrid_ratio()),
            "Energy"
        );
    }
    let relative = outputs.relative();
    let standings = outputs.standings();
    info!(
        relative = ?to_sentinel_indices(&relative.indices),
        standings = ?to_sentinel_indices(&standings.indices),
        multi_class = standings.multi_class,
        history = outputs.history().len(),
        "Running order"
    );
}

fn synthesize(output: &Path, args: &SessionArgs) -> Result<()> {
    let recording = args.session().generate();
    recording
        .save(output)
        .with_context(|| format!("Failed to write recording {}", output.display()))?;
    info!(
        path = ?output,
        frames = recording.frames.len(),
        combo = %recording.combo_id(),
        "Synthetic session written"
    );
    Ok(())
}

fn calculate_race(args: &CalculateArgs) -> Result<()> {
    let race_length = match (args.minutes, args.laps) {
        (Some(minutes), None) => RaceLength::Minutes(minutes),
        (None, Some(laps)) => RaceLength::Laps(laps),
        _ => bail!("Specify exactly one of --minutes or --laps"),
    };
    let input = CalculatorInput {
        race_length,
        formation_laps: args.formation_laps,
        lap_time: args.lap_time,
        pit_stop_seconds: args.pit_seconds,
        tank_capacity: args.capacity,
        consumption: args.consumption,
        start_amount: args.start_amount,
    };
    let Some(result) = calculate(&input) else {
        bail!("Lap time, capacity, consumption and race length must all be positive");
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialize result")?
    );
    Ok(())
}
