//! Power Log
//!
//! Builds and flashes the power-measurement firmware onto an Arduino, then
//! records the tab-separated telemetry it streams over serial into CSV files.
//!
//! # Features
//!
//! - **Firmware build/flash**: drives `arduino-cli` with board-specific flags
//! - **Port auto-detection**: picks the first port that reports an Arduino
//! - **Session capture**: `#START`/`#STOP` markers from the firmware split the
//!   log into timestamped files; without markers one file is appended to
//!
//! # Usage
//!
//! ```bash
//! # Compile, flash and log with external trigger markers
//! power-log run --target-board ZCU102 --ext-trigger
//!
//! # Log from an already flashed board
//! power-log capture -p /dev/ttyACM0 --log bench
//!
//! # List serial ports and show which one would be auto-detected
//! power-log ports
//! ```

mod capture;
mod config;
mod error;
mod serial;
mod signals;
mod toolchain;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use capture::{CaptureEngine, CaptureOptions, Termination};
use config::Settings;
use serial::PortConfig;
use toolchain::ArduinoCli;

/// Power Log
///
/// Build, flash and log power telemetry from embedded measurement boards
#[derive(Parser)]
#[command(name = "power-log")]
#[command(version)]
#[command(about = "Log and monitor power on ZCU102/ZCU106 platforms")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output (debug logging, echo every captured line)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (default: ./power-log.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile and upload the sketch, then capture telemetry
    Run {
        /// Sketch directory or .ino file
        #[arg(short, long)]
        sketch: Option<PathBuf>,

        /// Target board under measurement (e.g., ZCU102, ZCU106)
        #[arg(short = 'b', long)]
        target_board: Option<String>,

        /// Fully-Qualified Board Name of the measurement MCU
        #[arg(long)]
        fqbn: Option<String>,

        #[command(flatten)]
        capture: CaptureArgs,
    },

    /// Capture telemetry from an already flashed board
    Capture {
        #[command(flatten)]
        capture: CaptureArgs,
    },

    /// List available serial ports
    Ports,
}

#[derive(Args)]
struct CaptureArgs {
    /// Serial port (auto-detect if omitted)
    #[arg(short, long)]
    port: Option<String>,

    /// CSV output path (default: power_log_<timestamp>.csv)
    #[arg(long)]
    log: Option<PathBuf>,

    /// Directory output files are placed in (overrides config)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Start/stop sampling on external trigger
    #[arg(short = 't', long)]
    ext_trigger: bool,
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    if let Err(e) = dispatch(cli) {
        eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
        std::process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            sketch,
            target_board,
            fqbn,
            capture,
        } => handle_run(&settings, cli.verbose, sketch, target_board, fqbn, capture),
        Commands::Capture { capture } => {
            let port = serial::resolve(capture.port.as_deref())?;
            handle_capture(&settings, cli.verbose, &port, &capture)
        }
        Commands::Ports => serial::port::print_ports(),
    }
}

fn handle_run(
    settings: &Settings,
    verbose: bool,
    sketch: Option<PathBuf>,
    target_board: Option<String>,
    fqbn: Option<String>,
    capture: CaptureArgs,
) -> Result<()> {
    let sketch = sketch.unwrap_or_else(|| settings.toolchain.sketch.clone());
    let sketch = toolchain::resolve_sketch(&sketch)?;
    let target_board = target_board.unwrap_or_else(|| settings.toolchain.target_board.clone());
    let ext_trigger = capture.ext_trigger || settings.capture.ext_trigger;

    let cli = ArduinoCli::new(
        settings.toolchain.cli.clone(),
        fqbn.unwrap_or_else(|| settings.toolchain.fqbn.clone()),
    )
    .with_verbose(verbose);

    println!(
        "{} Compiling {} for board {}",
        "[*]".cyan().bold(),
        sketch.display().to_string().white(),
        target_board.white()
    );
    cli.compile(&sketch, &ArduinoCli::build_flags(&target_board, ext_trigger))?;

    let port = serial::resolve(capture.port.as_deref())?;

    println!(
        "{} Uploading to {} ({})",
        "[*]".cyan().bold(),
        port.white(),
        cli.fqbn()
    );
    cli.upload(&sketch, &port)?;
    println!("{} Firmware uploaded", "[OK]".green().bold());

    handle_capture(settings, verbose, &port, &capture)
}

fn handle_capture(
    settings: &Settings,
    verbose: bool,
    port: &str,
    args: &CaptureArgs,
) -> Result<()> {
    let log_dir = args
        .log_dir
        .clone()
        .unwrap_or_else(|| settings.capture.log_dir.clone());
    let log = args.log.as_deref().map(toolchain::expand_home);
    let base_path = capture::output_path(log.as_deref(), &log_dir, chrono::Local::now());

    let options = CaptureOptions::new(&base_path)
        .with_ext_trigger(args.ext_trigger || settings.capture.ext_trigger)
        .with_echo(verbose);
    let port_config = PortConfig::new(port)
        .with_baud_rate(settings.serial.baud_rate)
        .with_timeout(settings.serial.read_timeout())
        .with_settle_delay(settings.serial.settle_delay());

    print_header(&port_config, &options);

    let interrupted = signals::install().context("Failed to install signal handlers")?;
    let mut engine = CaptureEngine::new(options);
    let result = capture::run(&mut engine, &port_config, interrupted);

    print_summary(&engine, result.as_ref().ok().copied());
    result?;
    Ok(())
}

fn print_header(port_config: &PortConfig, options: &CaptureOptions) {
    println!("{}", "=".repeat(70).dimmed());
    println!("{}: {}", "Port".cyan(), port_config.port_path.white());
    println!("{}: {}", "Baud".cyan(), port_config.baud_rate.to_string().white());
    println!(
        "{}: {}",
        "Log".cyan(),
        options.base_path.display().to_string().white()
    );
    let mode = if options.ext_trigger {
        "external trigger (#START/#STOP)"
    } else {
        "free-running"
    };
    println!("{}: {}", "Mode".cyan(), mode.white());
    println!("{}", "=".repeat(70).dimmed());
    println!("{}", "Press Ctrl+C to stop\n".yellow());
}

fn print_summary(engine: &CaptureEngine, termination: Option<Termination>) {
    let summary = engine.summary();

    println!("\n{}", "=".repeat(70).dimmed());
    println!("{}", "--- Capture Summary ---".cyan().bold());
    println!("Lines read: {}", summary.lines_read);
    println!("Rows written: {}", summary.rows_written);
    println!("Sessions opened: {}", summary.sessions_opened);
    if summary.lines_dropped > 0 {
        println!(
            "{} {} data lines arrived outside a session and were dropped",
            "[WARNING]".yellow().bold(),
            summary.lines_dropped
        );
    }
    let mut shown: Vec<&PathBuf> = Vec::new();
    for file in &summary.files {
        if !shown.contains(&file) {
            println!("{} {}", "[LOG]".cyan().bold(), file.display().to_string().white());
            shown.push(file);
        }
    }
    match termination {
        Some(end) => println!("Ended: {}", end.to_string().green()),
        None => println!("Ended: {}", "error".red().bold()),
    }
    println!("{}", "=".repeat(70).dimmed());
}
