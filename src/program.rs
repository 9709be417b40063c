//! Compiled programs and sequence source loading.
//!
//! A [`Program`] is the flat instruction list the step sequencer walks.
//! Construction goes through the compiler and guarantees the terminating
//! [`FINISHED`] sentinel, so downstream code never has to handle an empty
//! or unterminated sequence.

use std::fs;
use std::io;
use std::path::Path;

use crate::compiler::{CompileError, compile};

/// Terminating sentinel instruction. Every program ends with it.
pub const FINISHED: &str = "finished";

/// Built-in fallback used when the sequence source cannot be loaded:
/// device-init steps for the four line devices, a short demo pass, and the
/// terminating sentinel as its own entry.
pub const FALLBACK_LINES: [&str; 5] = [
    "slider_init cobotta_init weighing_init plc_init",
    "slider_shelf_1 plc_buzz",
    "weighing_open slider_weight_pos cobotta_test",
    "slider_init cobotta_init weighing_init plc_init",
    "finished",
];

/// A compiled, flattened instruction sequence.
///
/// Invariant: non-empty, no loop markers remain, and the last step is
/// always [`FINISHED`]. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    steps: Vec<String>,
}

impl Program {
    /// Compile raw lines into a program.
    ///
    /// Runs the loop-unrolling compiler, then appends the [`FINISHED`]
    /// sentinel if the output does not already end with it. The sentinel
    /// invariant therefore holds for every program this returns.
    ///
    /// # Errors
    ///
    /// Any [`CompileError`] from the compiler; no partial output survives.
    pub fn compile(raw: &[String]) -> Result<Self, CompileError> {
        let mut steps = compile(raw)?;
        if steps.last().map(String::as_str) != Some(FINISHED) {
            steps.push(FINISHED.to_string());
        }
        Ok(Self { steps })
    }

    /// The single-step terminal program installed when compilation fails.
    pub fn finished_only() -> Self {
        Self {
            steps: vec![FINISHED.to_string()],
        }
    }

    /// Compile the built-in fallback sequence.
    ///
    /// The fallback contains no loop markers, so compilation cannot fail;
    /// the terminal program stands in if it somehow does.
    pub fn fallback() -> Self {
        let raw: Vec<String> = FALLBACK_LINES.iter().map(|s| s.to_string()).collect();
        Self::compile(&raw).unwrap_or_else(|_| Self::finished_only())
    }

    /// Number of steps in the program (always at least 1).
    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false; present for API symmetry with `len`.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The step at `index`, or None past the end.
    pub fn step(&self, index: usize) -> Option<&str> {
        self.steps.get(index).map(String::as_str)
    }

    /// All steps in dispatch order.
    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

/// Load raw sequence lines from a file.
///
/// Blank lines and comment lines (first non-space character `#`) are
/// dropped; everything else is kept for the compiler.
pub fn load_lines<P: AsRef<Path>>(path: P) -> io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .map(|line| line.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lines(input: &[&str]) -> Vec<String> {
        input.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_sentinel_appended_when_absent() {
        let program = Program::compile(&lines(&["a", "b"])).expect("should compile");
        assert_eq!(program.steps(), &["a", "b", FINISHED]);
    }

    #[test]
    fn test_sentinel_not_duplicated() {
        let program = Program::compile(&lines(&["a", FINISHED])).expect("should compile");
        assert_eq!(program.steps(), &["a", FINISHED]);
    }

    #[test]
    fn test_empty_input_yields_terminal_program() {
        let program = Program::compile(&[]).expect("should compile");
        assert_eq!(program.steps(), &[FINISHED]);
        assert_eq!(program.len(), 1);
        assert!(!program.is_empty());
    }

    #[test]
    fn test_sentinel_holds_after_loop_expansion() {
        let program =
            Program::compile(&lines(&["loop1_2", "a", "loop1_end"])).expect("should compile");
        assert_eq!(program.steps(), &["a", "a", FINISHED]);
    }

    #[test]
    fn test_finished_only_is_single_sentinel() {
        let program = Program::finished_only();
        assert_eq!(program.steps(), &[FINISHED]);
    }

    #[test]
    fn test_fallback_compiles_and_terminates() {
        let program = Program::fallback();
        assert_eq!(program.len(), FALLBACK_LINES.len());
        assert_eq!(program.step(program.len() - 1), Some(FINISHED));
        // The sentinel is its own entry, not glued onto the last init step.
        assert_eq!(
            program.step(program.len() - 2),
            Some("slider_init cobotta_init weighing_init plc_init")
        );
    }

    #[test]
    fn test_step_accessor_bounds() {
        let program = Program::compile(&lines(&["a"])).expect("should compile");
        assert_eq!(program.step(0), Some("a"));
        assert_eq!(program.step(1), Some(FINISHED));
        assert_eq!(program.step(2), None);
    }

    #[test]
    fn test_load_lines_strips_blanks_and_comments() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "# process sequence").expect("write");
        writeln!(file).expect("write");
        writeln!(file, "slider_init").expect("write");
        writeln!(file, "   # indented comment").expect("write");
        writeln!(file, "  weighing_open").expect("write");
        writeln!(file, "   ").expect("write");

        let raw = load_lines(file.path()).expect("should load");
        assert_eq!(raw, vec!["slider_init", "  weighing_open"]);
    }

    #[test]
    fn test_load_lines_missing_file_is_io_error() {
        let err = load_lines("/definitely/not/here.seq").unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
