//! Sequence compiler for the process-line mini-language.
//!
//! Turns raw sequence lines into a flat, ordered instruction list by
//! unrolling `loop<ID>_<REPEAT>` ... `loop<ID>_end` blocks. The compiler is
//! pure: same input, same output, no side effects, no IO.
//!
//! # Grammar
//!
//! ```text
//! loop<ID>_<REPEAT>    open a loop (ID, REPEAT non-negative integers, REPEAT >= 1)
//! loop<ID>_end         close the innermost open loop (IDs must match)
//! anything else        a plain instruction, kept verbatim
//! ```
//!
//! Lines are matched whitespace-insensitively. A line that merely resembles
//! a marker but does not parse as one (`loopx_2`, `loop1_-1`) is a plain
//! instruction.

use thiserror::Error;

/// Errors raised while compiling a sequence.
///
/// A compile fails as a unit: on any error the whole output is discarded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    /// Loop declared with a repeat count of zero
    #[error("loop repeat must be > 0: {line}")]
    InvalidRepeat { line: String },

    /// `loop<ID>_end` with no open loop
    #[error("loop end without loop start: {line}")]
    UnmatchedLoopEnd { line: String },

    /// `loop<ID>_end` closing a different loop than the innermost open one
    #[error("loop id mismatch: expected loop{expected}_end, got loop{found}_end")]
    LoopIdMismatch { expected: u32, found: u32 },

    /// Input ended while a loop was still open
    #[error("unclosed loop: loop{id}_...")]
    UnclosedLoop { id: u32 },
}

/// An open loop during compilation.
///
/// Frames live on an explicit stack. The innermost open frame collects
/// instructions until its matching end marker pops it, at which point the
/// repeat-expanded block is merged into the enclosing scope.
#[derive(Debug)]
struct LoopFrame {
    id: u32,
    repeat: u32,
    block: Vec<String>,
}

/// Parse a `loop<ID>_<REPEAT>` marker. Returns None for anything else.
///
/// `loop<ID>_end` falls through here because "end" is not an integer.
fn parse_loop_start(line: &str) -> Option<(u32, u32)> {
    let rest = line.trim().strip_prefix("loop")?;
    let (id, repeat) = rest.split_once('_')?;
    Some((id.parse().ok()?, repeat.parse().ok()?))
}

/// Parse a `loop<ID>_end` marker. Returns None for anything else.
fn parse_loop_end(line: &str) -> Option<u32> {
    let rest = line.trim().strip_prefix("loop")?;
    let (id, tail) = rest.split_once('_')?;
    if tail != "end" {
        return None;
    }
    id.parse().ok()
}

/// Compile raw sequence lines into a flat instruction list.
///
/// Plain lines pass through in order. Loop blocks expand depth-first from
/// the innermost loop outward: an inner loop's expansion becomes ordinary
/// content of the enclosing block, expanded again when that block closes.
/// A loop with repeat `n` over a body of `k` instructions contributes
/// exactly `n * k` instructions to its enclosing scope, never interleaved.
///
/// # Errors
///
/// - [`CompileError::InvalidRepeat`] for a repeat count of zero
/// - [`CompileError::UnmatchedLoopEnd`] for an end marker with no open loop
/// - [`CompileError::LoopIdMismatch`] when an end marker closes the wrong loop
/// - [`CompileError::UnclosedLoop`] when input ends inside a loop
pub fn compile(raw: &[String]) -> Result<Vec<String>, CompileError> {
    let mut out: Vec<String> = Vec::new();
    let mut stack: Vec<LoopFrame> = Vec::new();

    for line in raw {
        if let Some((id, repeat)) = parse_loop_start(line) {
            if repeat == 0 {
                return Err(CompileError::InvalidRepeat {
                    line: line.trim().to_string(),
                });
            }
            stack.push(LoopFrame {
                id,
                repeat,
                block: Vec::new(),
            });
            continue;
        }

        if let Some(id) = parse_loop_end(line) {
            let frame = match stack.pop() {
                Some(frame) => frame,
                None => {
                    return Err(CompileError::UnmatchedLoopEnd {
                        line: line.trim().to_string(),
                    });
                }
            };
            if frame.id != id {
                return Err(CompileError::LoopIdMismatch {
                    expected: frame.id,
                    found: id,
                });
            }

            // Repeat-expand the closed block, preserving intra-block order.
            let mut expanded = Vec::with_capacity(frame.block.len() * frame.repeat as usize);
            for _ in 0..frame.repeat {
                expanded.extend_from_slice(&frame.block);
            }

            match stack.last_mut() {
                Some(parent) => parent.block.extend(expanded),
                None => out.extend(expanded),
            }
            continue;
        }

        // Plain instruction line
        let instruction = line.trim().to_string();
        match stack.last_mut() {
            Some(frame) => frame.block.push(instruction),
            None => out.push(instruction),
        }
    }

    if let Some(frame) = stack.last() {
        return Err(CompileError::UnclosedLoop { id: frame.id });
    }

    Ok(out)
}
