use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Procline - process line step sequencer
#[derive(Parser)]
#[command(name = "procline")]
#[command(about = "Drives a fixed process line through a scripted instruction sequence")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the process line against a sequence file (simulated devices)
    Run {
        /// Path to configuration file (built-in defaults when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Sequence file, overrides the configured path
        #[arg(short, long)]
        sequence: Option<PathBuf>,

        /// Initial command dispatched at construction, overrides the
        /// configured one ("init" starts the sequence immediately)
        #[arg(long)]
        command: Option<String>,
    },
    /// Compile a sequence file and print the flattened steps
    Compile {
        /// Path to sequence file
        sequence: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
