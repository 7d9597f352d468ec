//! imucal CLI - batch calibration over a recorded or simulated sample feed.

pub mod output;
pub mod sink;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use imucal_core::{CalibrationConfig, CalibrationSession, CalibrationStatus, Stream};
use imucal_sim::{generate_session, read_csv, write_csv, SampleRecord, SensorConfig};
use output::{write_report_csv, write_report_json, EventLog, SampleLogs};
use sink::LogSink;
use std::path::{Path, PathBuf};
use tracing::info;

/// Public function that can be called from the main binary
pub fn run_cli_main(args: &[&str]) -> Result<()> {
    let args = Args::parse_from(args);
    let summary = run(&args)?;
    print_summary(&summary);
    Ok(())
}

#[derive(Parser, Debug)]
#[command(name = "imucal-cli")]
#[command(about = "Online IMU calibration over a recorded or simulated feed")]
#[command(version)]
pub struct Args {
    /// Recorded samples (CSV with a stream,x,y,z header). Simulated if absent.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Calibration config (JSON); missing keys take their defaults
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(short, long, default_value = "output")]
    output_dir: PathBuf,

    /// Report file format
    #[arg(short, long, value_enum, default_value = "csv")]
    format: OutputFormat,

    /// Stop feeding samples once the session is calibrated
    #[arg(long)]
    stop_when_calibrated: bool,

    /// Once calibrated, stop after this many samples without any refinement
    #[arg(long)]
    stop_after_quiet: Option<usize>,

    // ── Simulation options ────────────────────────────────────
    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value_t = 1.0)]
    noise_scale: f64,

    /// Stationary samples per pose
    #[arg(long, default_value_t = 200)]
    hold_samples: usize,

    /// Also write the simulated feed as a recorded-sample CSV
    #[arg(long)]
    save_input: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Csv,
    Json,
}

/// What a batch run did, for printing and for callers.
#[derive(Debug)]
pub struct RunSummary {
    pub records: usize,
    pub fed: usize,
    pub events: usize,
    pub status: CalibrationStatus,
    pub bias_pushes: usize,
    pub report: PathBuf,
}

pub fn load_config(path: Option<&Path>) -> Result<CalibrationConfig> {
    let Some(path) = path else {
        return Ok(CalibrationConfig::default());
    };
    let text =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn load_records(args: &Args) -> Result<Vec<SampleRecord>> {
    if let Some(path) = &args.input {
        info!("reading samples from {}", path.display());
        return read_csv(path);
    }

    let cfg = SensorConfig {
        noise_scale: args.noise_scale,
        hold_samples: args.hold_samples,
        seed: args.seed,
        ..Default::default()
    };
    let data = generate_session(&cfg)?;
    info!(samples = data.len(), seed = cfg.seed, "simulated session");
    if let Some(path) = &args.save_input {
        write_csv(path, &data)?;
    }
    Ok(data.iter().map(SampleRecord::from).collect())
}

pub fn run(args: &Args) -> Result<RunSummary> {
    let config = load_config(args.config.as_deref())?;
    let records = load_records(args)?;

    std::fs::create_dir_all(&args.output_dir)?;
    let mut logs = SampleLogs::new(&args.output_dir)?;
    let mut event_log = EventLog::create(&args.output_dir.join("events.csv"))?;

    let mut session = CalibrationSession::start(config, LogSink::default());
    let mut fed = 0;
    let mut events = 0;
    let mut last_progress = 0;

    for rec in &records {
        if session.is_calibrated() {
            if args.stop_when_calibrated {
                info!(fed, "calibrated, stopping early");
                break;
            }
            if args
                .stop_after_quiet
                .is_some_and(|quiet| fed - last_progress >= quiet)
            {
                info!(fed, last_progress, "calibrated and quiet, stopping early");
                break;
            }
        }
        fed += 1;

        let parsed = rec
            .stream
            .parse::<Stream>()
            .and_then(|s| rec.raw().into_sample(s).map(|v| (s, v)));
        let (stream, sample) = match parsed {
            Ok(p) => p,
            Err(e) => {
                session.reject(e);
                continue;
            }
        };

        if let Some(event) = session.handle(stream, sample) {
            if event.is_progress() {
                last_progress = fed;
            }
            event_log.write(fed, &event)?;
            events += 1;
        }
        let calibrated = session.compensation().apply(stream, sample);
        logs.write(stream, sample, calibrated)?;
    }

    logs.flush()?;
    event_log.flush()?;

    let status = session.status();
    let report = match args.format {
        OutputFormat::Csv => {
            let path = args.output_dir.join("report.csv");
            write_report_csv(&path, &status)?;
            path
        }
        OutputFormat::Json => {
            let path = args.output_dir.join("report.json");
            write_report_json(&path, &status)?;
            path
        }
    };

    Ok(RunSummary {
        records: records.len(),
        fed,
        events,
        status,
        bias_pushes: session.sink().bias_pushes,
        report,
    })
}

fn print_summary(summary: &RunSummary) {
    let s = &summary.status;
    println!("\nCalibration Summary:");
    println!("  Samples:     {} read, {} fed", summary.records, summary.fed);
    println!("  Accepted:    {} ({} dropped)", s.accepted, s.dropped);
    println!("  Events:      {}", summary.events);
    match &s.gyro_bias {
        Some(b) => println!(
            "  Gyro bias:   {:.5} {:.5} {:.5} ({} pushes)",
            b.x, b.y, b.z, summary.bias_pushes
        ),
        None => println!("  Gyro bias:   not found"),
    }
    for (axis, range) in ["x", "y", "z"].iter().zip(s.accel_ranges.iter()) {
        match range {
            Some(r) => println!(
                "  Accel {}:     offset {:.4}, scale {:.4}",
                axis, r.offset, r.scale
            ),
            None => println!("  Accel {}:     incomplete", axis),
        }
    }
    match &s.mag_range {
        Some(r) => println!(
            "  Mag:         offset {:.4} {:.4} {:.4}, scale {:.4} {:.4} {:.4}",
            r.offset.x, r.offset.y, r.offset.z, r.scale.x, r.scale.y, r.scale.z
        ),
        None => println!("  Mag:         incomplete"),
    }
    if !s.still_needed.is_empty() {
        println!("  Still need:  {}", s.still_needed.join(" "));
    }
    println!("  Calibrated:  {}", s.calibrated);
    println!("  Report:      {}", summary.report.display());
    println!("-----------------------------");
}
