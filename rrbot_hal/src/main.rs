//! # RRBot HAL Binary
//!
//! Loads the host configuration, brings the RRBot adapter up through its
//! lifecycle and runs the read/write control loop until signalled.
//!
//! # Usage
//!
//! ```bash
//! # Run against the serial port named in the config
//! rrbot_hal --config config/rrbot_hal.toml
//!
//! # Run without hardware (in-memory echoing serial device)
//! rrbot_hal --config config/rrbot_hal.toml --loopback --cycles 500
//!
//! # Print the exported interfaces as JSON and exit
//! rrbot_hal --config config/rrbot_hal.toml --list-interfaces
//!
//! # Verbose logging
//! rrbot_hal --config config/rrbot_hal.toml -v
//! ```

use clap::Parser;
use rrbot_common::hal::config::HalConfig;
use rrbot_common::hal::consts::{DEFAULT_CONFIG_PATH, RRBOT_LOOPBACK_DRIVER_NAME};
use rrbot_hal::core::HalCore;
use rrbot_hal::drivers::builtin_registry;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use tracing::{Level, error, info};
use tracing_subscriber::EnvFilter;

/// RRBot HAL - joint and GPIO hardware adapter with a serial GPIO relay
#[derive(Parser, Debug)]
#[command(name = "rrbot_hal")]
#[command(version)]
#[command(about = "RRBot joint and GPIO hardware adapter with serial GPIO relay")]
#[command(long_about = None)]
struct Args {
    /// Path to the host configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Driver to load (overrides `driver` in the config file)
    #[arg(short, long)]
    driver: Option<String>,

    /// Use the in-memory echoing serial device instead of a real port
    #[arg(long, conflicts_with = "driver")]
    loopback: bool,

    /// Stop after this many cycles (overrides `max_cycles`)
    #[arg(long)]
    cycles: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,

    /// Print the exported state and command interfaces as JSON and exit
    #[arg(long)]
    list_interfaces: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("HAL startup failed: {}", e);
        eprintln!("rrbot_hal: {e}");
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = HalCore::load_config(&args.config)?;
    setup_tracing(&args, &config);

    info!("RRBot HAL v{} starting...", env!("CARGO_PKG_VERSION"));

    if let Some(cycles) = args.cycles {
        config.max_cycles = cycles;
    }

    let driver_name = if args.loopback {
        info!("Loopback mode enabled (no serial hardware)");
        RRBOT_LOOPBACK_DRIVER_NAME.to_string()
    } else if let Some(driver) = &args.driver {
        info!("Driver from CLI: {}", driver);
        driver.clone()
    } else {
        config.driver.clone()
    };

    let mut hal_core = HalCore::new(config, builtin_registry())?;

    if args.list_interfaces {
        hal_core.prepare(&driver_name)?;
        println!("{}", interfaces_json(&hal_core)?);
        hal_core.shutdown()?;
        return Ok(());
    }

    let running = hal_core.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    hal_core.init(&driver_name)?;

    if let Err(e) = hal_core.run() {
        error!("Control loop error: {}", e);
    }

    if let Some(diag) = hal_core.driver_diagnostics() {
        info!(
            "Driver diagnostics: cycles={}, lines_received={}, tokens_written={}, write_faults={}",
            diag.cycle_count, diag.lines_received, diag.tokens_written, diag.write_faults
        );
    }

    hal_core.shutdown()?;

    info!("RRBot HAL shutdown complete");
    Ok(())
}

/// Exported handles as a JSON document.
fn interfaces_json(hal_core: &HalCore) -> Result<String, serde_json::Error> {
    let state: Vec<String> = hal_core
        .state_interfaces()
        .iter()
        .map(|h| h.full_name())
        .collect();
    let command: Vec<String> = hal_core
        .command_interfaces()
        .iter()
        .map(|h| h.full_name())
        .collect();
    serde_json::to_string_pretty(&serde_json::json!({
        "hardware": hal_core.config().hardware.name,
        "state_interfaces": state,
        "command_interfaces": command,
    }))
}

/// Setup tracing subscriber based on CLI arguments and the config's log level.
fn setup_tracing(args: &Args, config: &HalConfig) {
    let filter = if args.verbose {
        EnvFilter::from_default_env().add_directive(Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.shared.log_level.as_directive()))
    };

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
