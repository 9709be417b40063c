//! Error handling module for procline
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Library consumers match on these; the binary boundary may still wrap them
//! with anyhow context.

use thiserror::Error;

use crate::compiler::CompileError;
use crate::devices::DeviceError;

/// Main error type for procline
#[derive(Error, Debug)]
pub enum ProclineError {
    /// IO errors (sequence file, config file)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Sequence compilation errors
    #[error("Sequence compile error: {0}")]
    Compile(#[from] CompileError),

    /// Device subsystem errors
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    /// Configuration errors (loading, parsing, validation)
    #[error("Configuration error: {0}")]
    Config(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// General errors (catch-all for edge cases)
    #[error("{0}")]
    General(String),
}

/// Result type alias for procline operations
pub type Result<T> = std::result::Result<T, ProclineError>;

// Convenient error constructors
impl ProclineError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a general error
    pub fn general(msg: impl Into<String>) -> Self {
        Self::General(msg.into())
    }
}
