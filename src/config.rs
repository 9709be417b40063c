//! Configuration file handling for the process line controller.
//!
//! A small JSON config carries the knobs the binary needs: where the
//! sequence source lives, the command dispatched at construction, and how
//! often the control loop polls device readiness.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Longest accepted poll interval (one minute).
const MAX_POLL_INTERVAL_MS: u64 = 60_000;

/// Controller configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Path to the sequence source file
    pub sequence_file: PathBuf,

    /// Command dispatched by the controller at construction.
    /// The literal "init" starts consuming the sequence immediately.
    pub initial_command: String,

    /// Delay between readiness polls in the control loop, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            sequence_file: PathBuf::from("sequences/process.seq"),
            initial_command: "init".to_string(),
            poll_interval_ms: 200,
        }
    }
}

impl ControllerConfig {
    /// Create a new configuration with sensible defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.sequence_file.as_os_str().is_empty() {
            anyhow::bail!("Sequence file must be specified");
        }

        if self.initial_command.trim().is_empty() {
            anyhow::bail!("Initial command must be specified");
        }

        if self.poll_interval_ms == 0 {
            anyhow::bail!("Poll interval must be at least 1 ms");
        }
        if self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            anyhow::bail!(
                "Poll interval must be at most {} ms",
                MAX_POLL_INTERVAL_MS
            );
        }

        Ok(())
    }
}
