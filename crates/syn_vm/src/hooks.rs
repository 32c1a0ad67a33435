//! Optional instrumentation passed into the execution loop.
//!
//! Hooks observe execution and may stop it before an instruction takes
//! effect. They never alter instruction semantics; a run with [`NoHooks`]
//! behaves exactly like a run without instrumentation.

use crate::word::{Reg, Word};

/// Verdict returned by a hook.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Control {
    Continue,
    /// Stop the run with `UserStop` before the current instruction executes.
    Break,
}

pub trait Hooks {
    /// Called before `out` emits `ch`.
    fn before_output(&mut self, _pc: Word, _ch: char) -> Control {
        Control::Continue
    }

    /// Called whenever an operand resolves through register `reg`.
    fn on_register_read(&mut self, _pc: Word, _reg: Reg) -> Control {
        Control::Continue
    }

    /// Called after `in` consumed `ch`.
    fn on_input(&mut self, _pc: Word, _ch: char) {}

    /// Called when an output line completes.
    fn on_line(&mut self, _line: &str) {}

    /// Asked for more input when `in` finds the queue empty and the run does
    /// not suspend on input. `None` suspends the run anyway.
    fn input_needed(&mut self) -> Option<String> {
        None
    }
}

/// Hooks that do nothing.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoHooks;

impl Hooks for NoHooks {}
