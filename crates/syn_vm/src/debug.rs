//! Breakpoints, register watches and code patching.
//!
//! [`Debugger`] is a [`Hooks`] implementation owned by one caller and passed
//! into [`Machine::run_with`]; nothing here is shared between machines.

use crate::hooks::{Control, Hooks};
use crate::machine::Machine;
use crate::opcode::Opcode;
use crate::word::{Reg, Word};
use std::collections::{BTreeSet, VecDeque};
use tracing::info;

/// Why the debugger stopped the last run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum BreakHit {
    Output { pc: Word, ch: char },
    RegisterRead { pc: Word, reg: Reg },
}

#[derive(Clone, Debug, Default)]
pub struct Debugger {
    break_on_output: bool,
    watched: BTreeSet<Reg>,
    log_output: bool,
    script: VecDeque<String>,
    last_hit: Option<BreakHit>,
}

impl Debugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop before the next `out` emits a character.
    pub fn break_on_output(&mut self, enabled: bool) -> &mut Self {
        self.break_on_output = enabled;
        self
    }

    /// Stop whenever an operand reads `reg`.
    pub fn watch(&mut self, reg: Reg) -> &mut Self {
        self.watched.insert(reg);
        self
    }

    pub fn unwatch(&mut self, reg: Reg) -> &mut Self {
        self.watched.remove(&reg);
        self
    }

    /// Log completed output lines and consumed input at info level.
    pub fn log_output(&mut self, enabled: bool) -> &mut Self {
        self.log_output = enabled;
        self
    }

    /// Queues a line handed out when a non-suspending run needs input.
    pub fn script_line(&mut self, line: impl Into<String>) -> &mut Self {
        let mut line = line.into();
        if !line.ends_with('\n') {
            line.push('\n');
        }
        self.script.push_back(line);
        self
    }

    pub fn last_hit(&self) -> Option<BreakHit> {
        self.last_hit
    }

    fn hit(&mut self, hit: BreakHit) -> Control {
        info!(?hit, "breakpoint");
        self.last_hit = Some(hit);
        Control::Break
    }
}

impl Hooks for Debugger {
    fn before_output(&mut self, pc: Word, ch: char) -> Control {
        if self.break_on_output {
            return self.hit(BreakHit::Output { pc, ch });
        }
        Control::Continue
    }

    fn on_register_read(&mut self, pc: Word, reg: Reg) -> Control {
        if self.watched.contains(&reg) {
            return self.hit(BreakHit::RegisterRead { pc, reg });
        }
        Control::Continue
    }

    fn on_input(&mut self, pc: Word, ch: char) {
        if self.log_output {
            info!(pc, ?ch, "input");
        }
    }

    fn on_line(&mut self, line: &str) {
        if self.log_output {
            info!(line, "output");
        }
    }

    fn input_needed(&mut self) -> Option<String> {
        self.script.pop_front()
    }
}

/// Sends execution down the other arm of the most recent `jt`/`jf`.
///
/// Moves pc to the target the jump did not take and returns it. Any
/// instructions run since the jump keep their effects. `None` when no
/// conditional jump executed since the last load, restore or clone.
pub fn invert_last_branch(machine: &mut Machine) -> Option<Word> {
    let branch = machine.last_branch.as_mut()?;
    std::mem::swap(&mut branch.taken, &mut branch.other);
    machine.pc = branch.taken;
    info!(at = branch.at, pc = machine.pc, "branch inverted");
    Some(machine.pc)
}

/// Overwrites each address with `noop`. The cells show up in the memory diff.
pub fn patch_noops(machine: &mut Machine, addrs: impl IntoIterator<Item = Word>) {
    for addr in addrs {
        machine.write_memory(addr, Opcode::Noop.word());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::VmConfig;
    use crate::error::ExecError;
    use crate::exec::RunStatus;
    use crate::word::REGISTER_BASE;

    fn machine(text: &str) -> Machine {
        let mut m = Machine::new();
        m.load_text(text).unwrap();
        m
    }

    #[test]
    fn output_breakpoint_stops_before_emitting() {
        let mut m = machine("19,72,19,73,0");
        let mut dbg = Debugger::new();
        dbg.break_on_output(true);
        let status = m.run_with(&VmConfig::default(), &mut dbg);
        assert_eq!(status, RunStatus::Errored(ExecError::UserStop { pc: 0 }));
        assert_eq!(dbg.last_hit(), Some(BreakHit::Output { pc: 0, ch: 'H' }));
        assert_eq!(m.output_buffer(), "");
        assert_eq!(m.pc(), 0);

        dbg.break_on_output(false);
        assert_eq!(m.run_with(&VmConfig::default(), &mut dbg), RunStatus::Halted);
        assert_eq!(m.output_buffer(), "HI");
    }

    #[test]
    fn register_watch() {
        let r7 = Reg::new(7).unwrap();
        // set r0 5 ; add r1 r7 1 ; halt
        let text = format!(
            "1,{},5,9,{},{},1,0",
            REGISTER_BASE,
            REGISTER_BASE + 1,
            REGISTER_BASE + 7
        );
        let mut m = machine(&text);
        let mut dbg = Debugger::new();
        dbg.watch(r7);
        let status = m.run_with(&VmConfig::default(), &mut dbg);
        assert_eq!(status, RunStatus::Errored(ExecError::UserStop { pc: 3 }));
        assert_eq!(dbg.last_hit(), Some(BreakHit::RegisterRead { pc: 3, reg: r7 }));
        assert_eq!(m.registers()[0], 5);
        assert_eq!(m.registers()[1], 0);

        dbg.unwatch(r7);
        assert_eq!(m.run_with(&VmConfig::default(), &mut dbg), RunStatus::Halted);
        assert_eq!(m.registers()[1], 1);
    }

    #[test]
    fn writing_a_watched_register_does_not_break() {
        let mut m = machine(&format!("1,{},5,0", REGISTER_BASE));
        let mut dbg = Debugger::new();
        dbg.watch(Reg::new(0).unwrap());
        assert_eq!(m.run_with(&VmConfig::default(), &mut dbg), RunStatus::Halted);
    }

    #[test]
    fn scripted_input_feeds_non_suspending_runs() {
        let r0 = REGISTER_BASE;
        let mut m = machine(&format!("20,{r0},20,{r0},20,{r0},0"));
        let mut dbg = Debugger::new();
        dbg.script_line("ok").log_output(true);
        let cfg = VmConfig::default().with_suspend_on_input(false);
        assert_eq!(m.run_with(&cfg, &mut dbg), RunStatus::Halted);
        assert_eq!(m.registers()[0], 10);
        assert_eq!(m.input_echo(), "");
    }

    #[test]
    fn invert_branch_takes_the_other_arm() {
        // jf 0 6 ; out 'N' ; halt ; out 'Y' ; halt
        let mut m = machine("8,0,6,19,78,0,19,89,0");
        assert_eq!(invert_last_branch(&mut m), None);
        let mut dbg = Debugger::new();
        dbg.break_on_output(true);
        let cfg = VmConfig::default();
        assert!(m.run_with(&cfg, &mut dbg).error().is_some());
        assert_eq!(m.pc(), 6);

        assert_eq!(invert_last_branch(&mut m), Some(3));
        dbg.break_on_output(false);
        assert_eq!(m.run_with(&cfg, &mut dbg), RunStatus::Halted);
        assert_eq!(m.output_buffer(), "N");
    }

    #[test]
    fn noop_patch_is_tracked() {
        // out 'X' ; halt
        let mut m = machine("19,88,0");
        patch_noops(&mut m, [0, 1]);
        assert_eq!(m.changed().len(), 2);
        assert_eq!(m.run(true), RunStatus::Halted);
        assert_eq!(m.output_buffer(), "");
    }
}
