//! Procline - main entry point
//!
//! Wires the step sequencer to a simulated device manager and drives the
//! external control loop: poll readiness, advance when the line is ready,
//! stop once the sequence reaches "finished".

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info};

use procline::cli::{Cli, Commands};
use procline::config::ControllerConfig;
use procline::controller::ProcessController;
use procline::devices::DeviceStatusManager;
use procline::program::{Program, load_lines};

/// Initialize the tracing subscriber with appropriate settings
fn init_logger() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            // RUST_LOG overrides the default level
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Main application entry point
fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logger();
    info!("procline starting up");

    let cli = Cli::parse_args();
    debug!("CLI arguments parsed");

    match cli.command {
        Some(Commands::Run {
            config,
            sequence,
            command,
        }) => run_line(config, sequence, command)?,
        Some(Commands::Compile { sequence }) => compile_sequence(&sequence)?,
        Some(Commands::Validate { config }) => validate_config(&config),
        None => {
            info!("no command specified, running with defaults");
            run_line(None, None, None)?;
        }
    }

    Ok(())
}

/// Run the process line until the sequence completes.
///
/// Devices are simulated: every dispatched instruction completes
/// immediately, so the loop is driven by the sequence alone. A real
/// deployment replaces the simulated manager with one fed by a transport.
fn run_line(
    config_path: Option<PathBuf>,
    sequence: Option<PathBuf>,
    command: Option<String>,
) -> anyhow::Result<()> {
    let mut config = match config_path {
        Some(path) => {
            info!(path = %path.display(), "loading configuration");
            ControllerConfig::load_from_file(&path)?
        }
        None => ControllerConfig::default(),
    };
    if let Some(sequence) = sequence {
        config.sequence_file = sequence;
    }
    if let Some(command) = command {
        config.initial_command = command;
    }
    config.validate()?;

    let devices = DeviceStatusManager::simulated();
    let mut controller =
        ProcessController::new(devices, &config.initial_command, &config.sequence_file);

    while !controller.is_sequence_completed() {
        if controller.is_ready_to_next_step() {
            controller.move_to_next_step();
            println!("step {:3}  {}", controller.step_index(), controller.get_current_step());
        } else {
            thread::sleep(Duration::from_millis(config.poll_interval_ms));
        }
    }

    info!(final_step = %controller.get_current_step(), "sequence completed");
    println!("✓ Sequence completed: {}", controller.get_current_step());
    Ok(())
}

/// Compile a sequence file and print the flattened instruction list.
fn compile_sequence(path: &Path) -> procline::Result<()> {
    let raw = load_lines(path)?;
    let program = Program::compile(&raw)?;

    for (index, step) in program.steps().iter().enumerate() {
        println!("{index:3}  {step}");
    }
    println!("✓ Compiled {} steps", program.len());
    Ok(())
}

/// Validate a configuration file and report the result.
fn validate_config(path: &Path) {
    info!(path = %path.display(), "validating configuration file");
    let result = ControllerConfig::load_from_file(path)
        .and_then(|config| config.validate().context("Configuration validation failed"));
    match result {
        Ok(()) => {
            info!("configuration validation successful");
            println!("✓ Configuration file is valid: {}", path.display());
        }
        Err(e) => {
            eprintln!("✗ Configuration invalid: {e:#}");
            std::process::exit(1);
        }
    }
}
