//! Procline Library
//!
//! Core functionality for driving a fixed physical process line through a
//! scripted, loop-expandable instruction sequence.

pub mod cli;
pub mod compiler;
pub mod config;
pub mod controller;
pub mod devices;
pub mod error;
pub mod program;

// Re-export main types for convenience
pub use compiler::{CompileError, compile};
pub use config::ControllerConfig;
pub use controller::{LINE_DEVICES, ProcessController, UPDATE_ERROR, UPDATE_SUCCESS};
pub use devices::{DeviceControl, DeviceError, DeviceState, DeviceStatusManager, Situation};
pub use error::{ProclineError, Result};
pub use program::{FALLBACK_LINES, FINISHED, Program, load_lines};
