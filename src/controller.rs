//! Step-cursor state machine that walks a compiled program.
//!
//! The controller owns a [`Program`] and a cursor, dispatching one
//! instruction at a time to the device subsystem. It never gates itself:
//! an external control loop polls [`ProcessController::is_ready_to_next_step`]
//! and advances with [`ProcessController::move_to_next_step`] when the line
//! reports standby.
//!
//! # State Flow
//!
//! ```text
//! construction (register devices, compile program, initial dispatch)
//!     ↓
//! Dispatching(0) → Dispatching(1) → ... → Dispatching(N-1)
//!     ↓
//! Completed  (cursor past the "finished" sentinel)
//! ```
//!
//! Construction-time compilation is the only fallible part; at runtime the
//! controller never fails, it only surfaces dispatch outcomes as messages.

use std::path::Path;

use tracing::{info, warn};

use crate::devices::{DeviceControl, Situation};
use crate::program::{FALLBACK_LINES, Program, load_lines};

/// The fixed device set of the process line.
pub const LINE_DEVICES: [&str; 4] = ["weighing", "slider", "cobotta", "plc"];

/// Initial command that skips the index-0 re-dispatch.
const INIT: &str = "init";

/// Message surfaced for a successful device-status update.
pub const UPDATE_SUCCESS: &str = "update device status success";
/// Message surfaced for a failed device-status update.
pub const UPDATE_ERROR: &str = "update device status error";

/// Walks a compiled instruction sequence against the line devices.
#[derive(Debug)]
pub struct ProcessController<D: DeviceControl> {
    devices: D,
    program: Program,
    step_index: usize,
    current_step: String,
    /// Disarms the index-0 re-dispatch after it has fired once.
    initial_reissued: bool,
}

impl<D: DeviceControl> ProcessController<D> {
    /// Build a controller from a sequence file.
    ///
    /// Registers the fixed device set inside the manager's initializing
    /// window, compiles the sequence (substituting the built-in fallback
    /// lines when the file cannot be read), then performs the initial
    /// dispatch with `command`.
    ///
    /// Construction never fails: a missing source falls back to
    /// [`FALLBACK_LINES`] and a compile error installs the single-step
    /// terminal program, so the controller always converges to
    /// `"finished"`.
    pub fn new<P: AsRef<Path>>(devices: D, command: &str, sequence_file: P) -> Self {
        let raw = match load_lines(&sequence_file) {
            Ok(lines) => {
                info!(path = %sequence_file.as_ref().display(), "loaded process sequence");
                lines
            }
            Err(err) => {
                warn!(
                    path = %sequence_file.as_ref().display(),
                    %err,
                    "sequence source unavailable, using built-in fallback"
                );
                FALLBACK_LINES.iter().map(|s| s.to_string()).collect()
            }
        };
        Self::from_raw_lines(devices, command, raw)
    }

    /// Build a controller from already-loaded raw sequence lines.
    pub fn from_raw_lines(mut devices: D, command: &str, raw: Vec<String>) -> Self {
        devices.set_initializing(true);
        for name in LINE_DEVICES {
            devices.add_device(name);
        }
        devices.set_initializing(false);

        let program = match Program::compile(&raw) {
            Ok(program) => program,
            Err(err) => {
                warn!(%err, "sequence compile error, installing terminal program");
                Program::finished_only()
            }
        };
        info!(steps = program.len(), "process sequence ready");

        let mut controller = Self {
            devices,
            program,
            step_index: 0,
            current_step: command.to_string(),
            initial_reissued: false,
        };
        controller.move_to_next_step();
        controller
    }

    /// Whether every line device reports standby, i.e. the line may advance.
    ///
    /// Pure query; callers must poll this before advancing, the controller
    /// does not gate itself.
    pub fn is_ready_to_next_step(&self) -> bool {
        self.devices.check_devices(Situation::Standby)
    }

    /// Whether the cursor has consumed the whole program.
    pub fn is_sequence_completed(&self) -> bool {
        self.step_index >= self.program.len()
    }

    /// The last dispatched instruction.
    pub fn get_current_step(&self) -> &str {
        &self.current_step
    }

    /// Current cursor position into the program.
    #[inline]
    pub fn step_index(&self) -> usize {
        self.step_index
    }

    /// The compiled program this controller walks.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The injected device subsystem.
    pub fn devices(&self) -> &D {
        &self.devices
    }

    /// Mutable access for transport wiring (status reports etc.).
    pub fn devices_mut(&mut self) -> &mut D {
        &mut self.devices
    }

    /// Forward a command to the device subsystem and surface the outcome
    /// as a message.
    ///
    /// This is the single dispatch path for both the index-0 re-dispatch
    /// and the normal step advance. A failed update is surfaced, not
    /// raised.
    pub fn update_device_statuses(&mut self, command: &str) -> String {
        match self.devices.update_device_status(command) {
            Ok(()) => UPDATE_SUCCESS.to_string(),
            Err(err) => {
                warn!(%command, %err, "device status update failed");
                UPDATE_ERROR.to_string()
            }
        }
    }

    /// Advance the cursor by one instruction.
    ///
    /// The very first call with a non-`"init"` constructor command
    /// re-issues that command once without advancing the cursor; every
    /// later call dispatches `program[step_index]` and increments it.
    /// A failed dispatch does not block progression. Past the end of the
    /// program this is a no-op, so the cursor never exceeds the program
    /// length.
    pub fn move_to_next_step(&mut self) {
        if self.step_index == 0 && !self.initial_reissued && self.current_step != INIT {
            self.initial_reissued = true;
            let command = self.current_step.clone();
            let message = self.update_device_statuses(&command);
            info!(step = %command, %message, "re-issued initial command");
            return;
        }

        if self.is_sequence_completed() {
            return;
        }

        if let Some(step) = self.program.step(self.step_index) {
            self.current_step = step.to_string();
        }
        let command = self.current_step.clone();
        let message = self.update_device_statuses(&command);
        info!(index = self.step_index, step = %command, %message, "dispatched step");
        self.step_index += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::devices::DeviceError;
    use crate::program::FINISHED;

    /// Fake device subsystem recording every call the controller makes.
    #[derive(Debug, Default)]
    struct FakeDevices {
        registered: Vec<String>,
        registered_while_initializing: Vec<bool>,
        initializing: bool,
        dispatched: Vec<String>,
        ready: bool,
        fail_updates: bool,
    }

    impl FakeDevices {
        fn ready() -> Self {
            Self {
                ready: true,
                ..Self::default()
            }
        }
    }

    impl DeviceControl for FakeDevices {
        fn set_initializing(&mut self, initializing: bool) {
            self.initializing = initializing;
        }

        fn add_device(&mut self, name: &str) {
            self.registered.push(name.to_string());
            self.registered_while_initializing.push(self.initializing);
        }

        fn update_device_status(&mut self, command: &str) -> Result<(), DeviceError> {
            self.dispatched.push(command.to_string());
            if self.fail_updates {
                Err(DeviceError::UnknownDevice {
                    token: command.to_string(),
                })
            } else {
                Ok(())
            }
        }

        fn check_devices(&self, situation: Situation) -> bool {
            match situation {
                Situation::Standby => self.ready,
                Situation::Busy => !self.ready,
            }
        }
    }

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    // =========================================================================
    // Construction Tests
    // =========================================================================

    #[test]
    fn test_registers_fixed_device_set_while_initializing() {
        let controller =
            ProcessController::from_raw_lines(FakeDevices::ready(), INIT, lines(&["a"]));

        let devices = controller.devices();
        assert_eq!(
            devices.registered,
            vec!["weighing", "slider", "cobotta", "plc"]
        );
        assert!(devices.registered_while_initializing.iter().all(|&b| b));
        assert!(!devices.initializing);
    }

    #[test]
    fn test_init_command_dispatches_first_step_at_construction() {
        let controller =
            ProcessController::from_raw_lines(FakeDevices::ready(), INIT, lines(&["a", "b"]));

        assert_eq!(controller.get_current_step(), "a");
        assert_eq!(controller.step_index(), 1);
        assert_eq!(controller.devices().dispatched, vec!["a"]);
    }

    #[test]
    fn test_non_init_command_reissued_exactly_once() {
        let mut controller = ProcessController::from_raw_lines(
            FakeDevices::ready(),
            "slider_home",
            lines(&["a", "b"]),
        );

        // Construction re-issued the command without consuming the program.
        assert_eq!(controller.get_current_step(), "slider_home");
        assert_eq!(controller.step_index(), 0);
        assert_eq!(controller.devices().dispatched, vec!["slider_home"]);

        // The next call starts consuming the compiled sequence.
        controller.move_to_next_step();
        assert_eq!(controller.get_current_step(), "a");
        assert_eq!(controller.step_index(), 1);
        assert_eq!(controller.devices().dispatched, vec!["slider_home", "a"]);
    }

    #[test]
    fn test_compile_error_installs_terminal_program() {
        let controller = ProcessController::from_raw_lines(
            FakeDevices::ready(),
            INIT,
            lines(&["loop1_0", "a", "loop1_end"]),
        );

        assert_eq!(controller.program().steps(), &[FINISHED]);
        assert_eq!(controller.get_current_step(), FINISHED);
        assert!(controller.is_sequence_completed());
    }

    #[test]
    fn test_missing_sequence_file_compiles_fallback() {
        let controller = ProcessController::new(
            FakeDevices::ready(),
            INIT,
            "/definitely/not/a/sequence.seq",
        );

        // The fallback is compiled and populates the working sequence
        // (the controller does not come up empty).
        assert_eq!(controller.program().len(), FALLBACK_LINES.len());
        assert_eq!(controller.get_current_step(), FALLBACK_LINES[0]);
        assert!(!controller.is_sequence_completed());
    }

    // =========================================================================
    // Cursor Tests
    // =========================================================================

    #[test]
    fn test_cursor_monotonic_and_completion() {
        let mut controller =
            ProcessController::from_raw_lines(FakeDevices::ready(), INIT, lines(&["a", "b", "c"]));

        // Program is [a, b, c, finished]; construction consumed "a".
        let total = controller.program().len();
        let mut last_index = controller.step_index();

        while !controller.is_sequence_completed() {
            controller.move_to_next_step();
            assert!(controller.step_index() >= last_index);
            assert!(controller.step_index() <= total);
            last_index = controller.step_index();
        }

        assert_eq!(controller.step_index(), total);
        assert_eq!(controller.get_current_step(), FINISHED);
    }

    #[test]
    fn test_completion_after_exactly_n_calls() {
        let mut controller = ProcessController::from_raw_lines(
            FakeDevices::ready(),
            "warmup",
            lines(&["a", "b"]),
        );

        // Program is [a, b, finished]: N = 3. The constructor call was the
        // re-dispatch special case, so N more calls reach completion.
        let n = controller.program().len();
        for _ in 0..n {
            assert!(!controller.is_sequence_completed());
            controller.move_to_next_step();
        }
        assert!(controller.is_sequence_completed());
    }

    #[test]
    fn test_move_past_completion_is_noop() {
        let mut controller =
            ProcessController::from_raw_lines(FakeDevices::ready(), INIT, lines(&["a"]));

        while !controller.is_sequence_completed() {
            controller.move_to_next_step();
        }
        let index = controller.step_index();
        let dispatched = controller.devices().dispatched.len();

        controller.move_to_next_step();
        controller.move_to_next_step();

        assert_eq!(controller.step_index(), index);
        assert_eq!(controller.devices().dispatched.len(), dispatched);
        assert_eq!(controller.get_current_step(), FINISHED);
    }

    // =========================================================================
    // Dispatch Tests
    // =========================================================================

    #[test]
    fn test_update_messages() {
        let mut controller =
            ProcessController::from_raw_lines(FakeDevices::ready(), INIT, lines(&["a"]));

        assert_eq!(controller.update_device_statuses("a"), UPDATE_SUCCESS);

        controller.devices_mut().fail_updates = true;
        assert_eq!(controller.update_device_statuses("a"), UPDATE_ERROR);
    }

    #[test]
    fn test_failed_dispatch_still_advances() {
        let mut devices = FakeDevices::ready();
        devices.fail_updates = true;
        let mut controller = ProcessController::from_raw_lines(devices, INIT, lines(&["a", "b"]));

        // Every dispatch fails, the cursor advances regardless.
        assert_eq!(controller.step_index(), 1);
        controller.move_to_next_step();
        assert_eq!(controller.step_index(), 2);
        assert_eq!(controller.get_current_step(), "b");
    }

    #[test]
    fn test_readiness_delegates_to_devices() {
        let controller =
            ProcessController::from_raw_lines(FakeDevices::ready(), INIT, lines(&["a"]));
        assert!(controller.is_ready_to_next_step());
        // Idempotent without intervening device-state changes.
        assert!(controller.is_ready_to_next_step());

        let not_ready = FakeDevices::default();
        let controller = ProcessController::from_raw_lines(not_ready, INIT, lines(&["a"]));
        assert!(!controller.is_ready_to_next_step());
    }

    #[test]
    fn test_loop_markers_expand_before_walking() {
        let mut controller = ProcessController::from_raw_lines(
            FakeDevices::ready(),
            INIT,
            lines(&["loop1_2", "a", "loop1_end"]),
        );

        controller.move_to_next_step();
        controller.move_to_next_step();
        assert_eq!(
            controller.devices().dispatched,
            vec!["a", "a", FINISHED]
        );
        assert!(controller.is_sequence_completed());
    }
}
