//! Device registry and status tracking for the process line.
//!
//! The sequencer talks to the device subsystem through the
//! [`DeviceControl`] trait, so tests substitute a fake and real deployments
//! wire up a transport. [`DeviceStatusManager`] is the concrete registry:
//! one state per named device, command tokens resolved to their target
//! device, and an optional simulated transport for running without
//! hardware.

use std::collections::BTreeMap;

use strum::{Display, EnumIter, EnumString};
use thiserror::Error;
use tracing::{debug, warn};

use crate::program::FINISHED;

/// Readiness situation queried across all registered devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Situation {
    /// Every device idle and ready for the next instruction
    Standby,
    /// At least one device executing an instruction
    Busy,
}

/// State of a single registered device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum DeviceState {
    /// Registered but not yet reporting
    #[default]
    Offline,
    /// Idle and ready for an instruction
    Standby,
    /// Executing an instruction
    Busy,
    /// Reported an unrecoverable condition
    Fault,
}

/// Errors raised by the device subsystem.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Command string contained no tokens
    #[error("empty device command")]
    EmptyCommand,

    /// A command token named no registered device
    #[error("no registered device matches token: {token}")]
    UnknownDevice { token: String },

    /// A status report arrived for a device that was never registered
    #[error("device not registered: {name}")]
    NotRegistered { name: String },
}

/// Seam between the step sequencer and the device subsystem.
///
/// The sequencer only needs registration, command dispatch, and the
/// all-devices readiness query; everything else (transport, protocol,
/// per-device detail) stays behind the implementation.
pub trait DeviceControl {
    /// Toggle bulk-registration mode. While set, readiness validation is
    /// suppressed for newly added devices.
    fn set_initializing(&mut self, initializing: bool);

    /// Register a device by name.
    fn add_device(&mut self, name: &str);

    /// Dispatch a command of whitespace-separated `<device>_<action>`
    /// tokens to the targeted devices. Fails as a unit: no device is
    /// touched unless every token resolves.
    fn update_device_status(&mut self, command: &str) -> Result<(), DeviceError>;

    /// Whether every registered device satisfies the given situation.
    fn check_devices(&self, situation: Situation) -> bool;
}

/// A single device on the line.
#[derive(Debug, Clone, Default)]
struct Device {
    state: DeviceState,
    last_command: Option<String>,
}

/// Registry of line devices with per-device status tracking.
///
/// Command tokens are resolved by device-name prefix: `slider_shelf_1`
/// targets the device `slider` with action `shelf_1`. The sequence
/// sentinel `finished` targets no device and always succeeds.
#[derive(Debug, Default)]
pub struct DeviceStatusManager {
    devices: BTreeMap<String, Device>,
    initializing: bool,
    simulated: bool,
}

impl DeviceStatusManager {
    /// A manager expecting a real transport to feed status reports.
    pub fn new() -> Self {
        Self::default()
    }

    /// A manager with a simulated transport: every dispatched instruction
    /// completes immediately and the device returns to standby. Lets a
    /// full line run terminate without hardware attached.
    pub fn simulated() -> Self {
        Self {
            simulated: true,
            ..Self::default()
        }
    }

    /// Record a status report from the transport layer.
    pub fn report_status(&mut self, name: &str, state: DeviceState) -> Result<(), DeviceError> {
        match self.devices.get_mut(name) {
            Some(device) => {
                debug!(device = name, %state, "device status report");
                device.state = state;
                Ok(())
            }
            None => Err(DeviceError::NotRegistered {
                name: name.to_string(),
            }),
        }
    }

    /// Current state of a device, if registered.
    pub fn device_state(&self, name: &str) -> Option<DeviceState> {
        self.devices.get(name).map(|d| d.state)
    }

    /// Last command token dispatched to a device, if any.
    pub fn last_command(&self, name: &str) -> Option<&str> {
        self.devices
            .get(name)
            .and_then(|d| d.last_command.as_deref())
    }

    /// Registered device names in stable order.
    pub fn device_names(&self) -> Vec<&str> {
        self.devices.keys().map(String::as_str).collect()
    }

    /// Resolve a command token to the registered device it targets.
    ///
    /// A token targets a device when it equals the device name or starts
    /// with the name followed by `_`.
    fn resolve_target(&self, token: &str) -> Option<String> {
        self.devices
            .keys()
            .find(|name| {
                token == name.as_str()
                    || (token.starts_with(name.as_str())
                        && token.as_bytes().get(name.len()) == Some(&b'_'))
            })
            .cloned()
    }
}

impl DeviceControl for DeviceStatusManager {
    fn set_initializing(&mut self, initializing: bool) {
        self.initializing = initializing;
    }

    fn add_device(&mut self, name: &str) {
        // During the initializing window devices are not yet in a
        // meaningful state to validate against, so they enroll straight
        // into standby. Outside it a device must report in first.
        let state = if self.initializing {
            DeviceState::Standby
        } else {
            warn!(
                device = name,
                "registered outside the initializing window, awaiting first status report"
            );
            DeviceState::Offline
        };
        self.devices.insert(
            name.to_string(),
            Device {
                state,
                last_command: None,
            },
        );
    }

    fn update_device_status(&mut self, command: &str) -> Result<(), DeviceError> {
        let tokens: Vec<&str> = command.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(DeviceError::EmptyCommand);
        }

        // Resolve every token before touching any device: an update with
        // an unknown token fails as a unit.
        let mut targets: Vec<(String, String)> = Vec::with_capacity(tokens.len());
        for token in tokens {
            if token == FINISHED {
                continue;
            }
            match self.resolve_target(token) {
                Some(name) => targets.push((name, token.to_string())),
                None => {
                    return Err(DeviceError::UnknownDevice {
                        token: token.to_string(),
                    });
                }
            }
        }

        for (name, token) in targets {
            if let Some(device) = self.devices.get_mut(&name) {
                device.state = if self.simulated {
                    // Simulated transport: the instruction completes at once.
                    DeviceState::Standby
                } else {
                    DeviceState::Busy
                };
                device.last_command = Some(token.clone());
                debug!(device = %name, command = %token, state = %device.state, "dispatched");
            }
        }
        Ok(())
    }

    fn check_devices(&self, situation: Situation) -> bool {
        match situation {
            Situation::Standby => self
                .devices
                .values()
                .all(|d| d.state == DeviceState::Standby),
            Situation::Busy => self.devices.values().any(|d| d.state == DeviceState::Busy),
        }
    }
}
