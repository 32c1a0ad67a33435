//! Fetch/decode/dispatch loop.
//!
//! Each step fetches the opcode at pc, decodes its operands, and dispatches
//! through [`InstructionSet`], a static table indexed by opcode number. Decode
//! failures leave pc on the instruction. Once decoded, pc moves past the
//! instruction even if the action faults or halts; jumps then overwrite it.
//! An action resolves all of its operands before it mutates anything, so a
//! fault never leaves registers, stack or memory half-updated. A hook
//! requesting a stop is the exception: pc stays put so the instruction can be
//! retried.
//!
//! # Suspension
//!
//! With `suspend_on_input`, an `in` instruction that finds the input queue
//! empty returns control to the caller before it is decoded; pc stays on the
//! instruction, which is retried on the next run once input was fed.

use crate::config::VmConfig;
use crate::decode::decode;
use crate::error::{ExecError, Result};
use crate::hooks::{Control, Hooks, NoHooks};
use crate::machine::{Branch, Machine};
use crate::opcode::{Opcode, OPCODE_COUNT};
use crate::snapshot::Snapshot;
use crate::word::{complement, wrap, Operand, Reg, Word, MAX_LITERAL};
use std::fmt;
use tracing::{debug, trace, warn};

/// How a run invocation ended.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RunStatus {
    /// A `halt` instruction was reached.
    Halted,
    /// Waiting for input; feed some and run again.
    Suspended,
    Errored(ExecError),
}

impl RunStatus {
    pub fn is_halted(&self) -> bool {
        matches!(self, RunStatus::Halted)
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, RunStatus::Suspended)
    }

    pub fn error(&self) -> Option<&ExecError> {
        match self {
            RunStatus::Errored(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Halted => write!(f, "halt instruction hit"),
            RunStatus::Suspended => write!(f, "waiting for input"),
            RunStatus::Errored(err) => write!(f, "{err}"),
        }
    }
}

/// Result of a single step.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Step {
    Continue,
    Halted,
    Suspended,
}

/// What an action asks the loop to do with pc.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Flow {
    Next,
    Jump(Word),
    Halt,
    /// No input available: leave pc on the instruction.
    Wait,
}

/// Per-instruction execution context handed to actions.
pub(crate) struct Exec<'m, 'h> {
    machine: &'m mut Machine,
    hooks: &'h mut dyn Hooks,
    cfg: &'m VmConfig,
    op: Opcode,
    pc: Word,
    next: Word,
}

impl Exec<'_, '_> {
    /// Resolves an operand word for reading.
    fn read(&mut self, word: Word) -> Result<Word> {
        match Operand::classify(word) {
            Some(Operand::Literal(v)) => Ok(v),
            Some(Operand::Register(reg)) => {
                if self.hooks.on_register_read(self.pc, reg) == Control::Break {
                    return Err(ExecError::UserStop { pc: self.pc });
                }
                Ok(self.machine.registers[reg.index()])
            }
            None => Err(self.invalid_operand(word)),
        }
    }

    /// Resolves a destination operand, which must name a register.
    fn dest(&self, word: Word) -> Result<Reg> {
        match Operand::classify(word) {
            Some(Operand::Register(reg)) => Ok(reg),
            Some(Operand::Literal(_)) => Err(ExecError::InvalidDestination {
                op: self.op,
                word,
                pc: self.pc,
            }),
            None => Err(self.invalid_operand(word)),
        }
    }

    fn invalid_operand(&self, word: Word) -> ExecError {
        ExecError::InvalidOperand {
            op: self.op,
            word,
            pc: self.pc,
        }
    }

    fn set(&mut self, reg: Reg, value: Word) {
        self.machine.registers[reg.index()] = value;
    }

    fn pop(&mut self) -> Result<Word> {
        self.machine.stack.pop().ok_or(ExecError::StackUnderflow {
            op: self.op,
            pc: self.pc,
        })
    }

    fn branch(&mut self, taken: bool, target: Word) -> Flow {
        let (to, other) = if taken {
            (target, self.next)
        } else {
            (self.next, target)
        };
        self.machine.last_branch = Some(Branch {
            at: self.pc,
            taken: to,
            other,
        });
        if taken {
            Flow::Jump(target)
        } else {
            Flow::Next
        }
    }

    /// `a = f(b, c)` with `a` a register.
    fn binary(&mut self, ops: &[Word], f: impl FnOnce(Word, Word) -> Result<Word>) -> Result<Flow> {
        let a = self.dest(ops[0])?;
        let b = self.read(ops[1])?;
        let c = self.read(ops[2])?;
        let value = f(b, c)?;
        self.set(a, value);
        Ok(Flow::Next)
    }
}

type Action = fn(&mut Exec<'_, '_>, &[Word]) -> Result<Flow>;

/// An entry of the instruction set: opcode metadata plus its semantics.
pub struct InstructionDef {
    pub opcode: Opcode,
    action: Action,
}

/// Immutable dispatch table indexed by opcode number.
pub struct InstructionSet {
    defs: [InstructionDef; OPCODE_COUNT],
}

static STANDARD: InstructionSet = InstructionSet {
    defs: [
        InstructionDef { opcode: Opcode::Halt, action: op_halt },
        InstructionDef { opcode: Opcode::Set, action: op_set },
        InstructionDef { opcode: Opcode::Push, action: op_push },
        InstructionDef { opcode: Opcode::Pop, action: op_pop },
        InstructionDef { opcode: Opcode::Eq, action: op_eq },
        InstructionDef { opcode: Opcode::Gt, action: op_gt },
        InstructionDef { opcode: Opcode::Jmp, action: op_jmp },
        InstructionDef { opcode: Opcode::Jt, action: op_jt },
        InstructionDef { opcode: Opcode::Jf, action: op_jf },
        InstructionDef { opcode: Opcode::Add, action: op_add },
        InstructionDef { opcode: Opcode::Mult, action: op_mult },
        InstructionDef { opcode: Opcode::Mod, action: op_mod },
        InstructionDef { opcode: Opcode::And, action: op_and },
        InstructionDef { opcode: Opcode::Or, action: op_or },
        InstructionDef { opcode: Opcode::Not, action: op_not },
        InstructionDef { opcode: Opcode::Rmem, action: op_rmem },
        InstructionDef { opcode: Opcode::Wmem, action: op_wmem },
        InstructionDef { opcode: Opcode::Call, action: op_call },
        InstructionDef { opcode: Opcode::Ret, action: op_ret },
        InstructionDef { opcode: Opcode::Out, action: op_out },
        InstructionDef { opcode: Opcode::In, action: op_in },
        InstructionDef { opcode: Opcode::Noop, action: op_noop },
    ],
};

impl InstructionSet {
    /// The standard instruction set.
    pub fn standard() -> &'static InstructionSet {
        &STANDARD
    }

    pub fn get(&self, word: Word) -> Option<&InstructionDef> {
        self.defs.get(word as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = &InstructionDef> {
        self.defs.iter()
    }
}

fn op_halt(_: &mut Exec<'_, '_>, _: &[Word]) -> Result<Flow> {
    Ok(Flow::Halt)
}

fn op_set(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let a = x.dest(ops[0])?;
    let b = x.read(ops[1])?;
    x.set(a, b);
    Ok(Flow::Next)
}

fn op_push(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let a = x.read(ops[0])?;
    x.machine.stack.push(a);
    Ok(Flow::Next)
}

fn op_pop(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let a = x.dest(ops[0])?;
    let v = x.pop()?;
    x.set(a, v);
    Ok(Flow::Next)
}

fn op_eq(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    x.binary(ops, |b, c| Ok((b == c) as Word))
}

fn op_gt(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    x.binary(ops, |b, c| Ok((b > c) as Word))
}

fn op_jmp(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    Ok(Flow::Jump(x.read(ops[0])?))
}

fn op_jt(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let a = x.read(ops[0])?;
    let b = x.read(ops[1])?;
    Ok(x.branch(a != 0, b))
}

fn op_jf(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let a = x.read(ops[0])?;
    let b = x.read(ops[1])?;
    Ok(x.branch(a == 0, b))
}

fn op_add(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    x.binary(ops, |b, c| Ok(wrap(b as u32 + c as u32)))
}

fn op_mult(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    x.binary(ops, |b, c| Ok(wrap(b as u32 * c as u32)))
}

fn op_mod(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let pc = x.pc;
    x.binary(ops, |b, c| {
        b.checked_rem(c).ok_or(ExecError::DivisionByZero { pc })
    })
}

fn op_and(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    x.binary(ops, |b, c| Ok(b & c))
}

fn op_or(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    x.binary(ops, |b, c| Ok(b | c))
}

fn op_not(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let a = x.dest(ops[0])?;
    let b = x.read(ops[1])?;
    x.set(a, complement(b));
    Ok(Flow::Next)
}

fn op_rmem(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let a = x.dest(ops[0])?;
    let addr = x.read(ops[1])?;
    let v = x.machine.memory.read(addr);
    x.set(a, v);
    Ok(Flow::Next)
}

fn op_wmem(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let addr = x.read(ops[0])?;
    let v = x.read(ops[1])?;
    x.machine.memory.write(addr, v);
    Ok(Flow::Next)
}

fn op_call(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let target = x.read(ops[0])?;
    x.machine.stack.push(x.next);
    Ok(Flow::Jump(target))
}

fn op_ret(x: &mut Exec<'_, '_>, _: &[Word]) -> Result<Flow> {
    Ok(Flow::Jump(x.pop()?))
}

fn op_out(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let value = x.read(ops[0])?;
    let printable = value == 10 || (32..=126).contains(&value);
    if x.cfg.strict_output && !printable {
        return Err(ExecError::InvalidOutputCharacter { value, pc: x.pc });
    }
    let ch = char::from_u32(value as u32).unwrap_or(char::REPLACEMENT_CHARACTER);
    if x.hooks.before_output(x.pc, ch) == Control::Break {
        return Err(ExecError::UserStop { pc: x.pc });
    }
    if let Some(line) = x.machine.console.emit(ch) {
        trace!(line, "output line");
        x.hooks.on_line(line);
    }
    Ok(Flow::Next)
}

fn op_in(x: &mut Exec<'_, '_>, ops: &[Word]) -> Result<Flow> {
    let a = x.dest(ops[0])?;
    if !x.machine.console.has_input() {
        match x.hooks.input_needed() {
            Some(text) => x.machine.console.feed(&text),
            None => return Ok(Flow::Wait),
        }
    }
    let Some(ch) = x.machine.console.peek_input() else {
        return Ok(Flow::Wait);
    };
    let value = Word::try_from(ch as u32)
        .ok()
        .filter(|v| *v <= MAX_LITERAL)
        .ok_or(ExecError::InvalidInputCharacter { ch, pc: x.pc })?;
    x.machine.console.take_input();
    x.set(a, value);
    x.hooks.on_input(x.pc, ch);
    Ok(Flow::Next)
}

fn op_noop(_: &mut Exec<'_, '_>, _: &[Word]) -> Result<Flow> {
    Ok(Flow::Next)
}

impl Machine {
    /// Runs until halt, fault or suspension.
    pub fn run(&mut self, suspend_on_input: bool) -> RunStatus {
        let cfg = VmConfig::default().with_suspend_on_input(suspend_on_input);
        self.run_with(&cfg, &mut NoHooks)
    }

    /// Runs under an explicit policy and instrumentation.
    pub fn run_with(&mut self, cfg: &VmConfig, hooks: &mut dyn Hooks) -> RunStatus {
        let isa = InstructionSet::standard();
        let mut steps: u64 = 0;
        loop {
            if let Some(limit) = cfg.step_limit {
                if steps >= limit {
                    debug!(pc = self.pc, limit, "step limit exhausted");
                    return RunStatus::Errored(ExecError::StepLimitExceeded { limit });
                }
            }
            match self.step_in(isa, cfg, hooks) {
                Ok(Step::Continue) => steps += 1,
                Ok(Step::Halted) => {
                    debug!(pc = self.pc, steps, "halted");
                    return RunStatus::Halted;
                }
                Ok(Step::Suspended) => {
                    debug!(pc = self.pc, steps, "suspended on input");
                    return RunStatus::Suspended;
                }
                Err(err) => {
                    match err {
                        ExecError::UserStop { .. } => debug!(%err, "stopped by hook"),
                        _ => warn!(%err, steps, "run stopped"),
                    }
                    return RunStatus::Errored(err);
                }
            }
        }
    }

    /// Executes exactly one instruction.
    pub fn step(&mut self, cfg: &VmConfig, hooks: &mut dyn Hooks) -> Result<Step> {
        self.step_in(InstructionSet::standard(), cfg, hooks)
    }

    fn step_in(
        &mut self,
        isa: &InstructionSet,
        cfg: &VmConfig,
        hooks: &mut dyn Hooks,
    ) -> Result<Step> {
        let pc = self.pc;
        if pc as usize >= self.memory.extent() {
            return Err(ExecError::EndOfProgram { pc });
        }
        let word = self.memory.read(pc);
        if cfg.suspend_on_input && word == Opcode::In.word() && !self.console.has_input() {
            return Ok(Step::Suspended);
        }
        let def = isa
            .get(word)
            .ok_or(ExecError::UnknownOpcode { opcode: word, pc })?;
        let decoded = decode(&self.memory, pc)?;
        let next = decoded.next_addr() as Word;
        trace!(pc, op = def.opcode.mnemonic(), "step");

        let mut exec = Exec {
            machine: self,
            hooks,
            cfg,
            op: def.opcode,
            pc,
            next,
        };
        let flow = match (def.action)(&mut exec, decoded.operands()) {
            Ok(flow) => flow,
            Err(err @ ExecError::UserStop { .. }) => return Err(err),
            Err(err) => {
                self.pc = next;
                return Err(err);
            }
        };

        match flow {
            Flow::Next => self.pc = next,
            Flow::Jump(target) => self.pc = target,
            Flow::Halt => {
                self.pc = next;
                return Ok(Step::Halted);
            }
            Flow::Wait => return Ok(Step::Suspended),
        }
        if def.opcode == Opcode::In && !self.console.has_input() {
            self.checkpoint = Some(Snapshot::capture(self));
            debug!(pc = self.pc, "input drained, checkpoint taken");
        }
        Ok(Step::Continue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::REGISTER_BASE;

    const R0: Word = REGISTER_BASE;
    const R1: Word = REGISTER_BASE + 1;
    const R2: Word = REGISTER_BASE + 2;

    fn machine(words: &[Word]) -> Machine {
        let mut m = Machine::new();
        m.load_image(words.to_vec()).unwrap();
        m
    }

    fn run(words: &[Word]) -> (Machine, RunStatus) {
        let mut m = machine(words);
        let status = m.run(true);
        (m, status)
    }

    fn step_once(m: &mut Machine) -> Result<Step> {
        m.step(&VmConfig::default(), &mut NoHooks)
    }

    #[test]
    fn table_matches_opcode_numbers() {
        for (i, def) in InstructionSet::standard().iter().enumerate() {
            assert_eq!(def.opcode.word() as usize, i);
        }
        assert!(InstructionSet::standard().get(22).is_none());
    }

    #[test]
    fn halt_moves_past_itself() {
        let (mut m, status) = run(&[21, 0, 21]);
        assert_eq!(status, RunStatus::Halted);
        assert_eq!(m.pc(), 2);
        assert_eq!(status.to_string(), "halt instruction hit");

        // resuming continues after the halt
        assert_eq!(
            m.run(true),
            RunStatus::Errored(ExecError::EndOfProgram { pc: 3 })
        );
    }

    #[test]
    fn set_and_add_wraparound() {
        let (m, status) = run(&[1, R1, 32767, 9, R0, R1, 5, 0]);
        assert!(status.is_halted());
        assert_eq!(m.registers()[0], 4);
    }

    #[test]
    fn mult_wraps() {
        let (m, _) = run(&[10, R0, 32767, 32767, 0]);
        assert_eq!(m.registers()[0], ((32767u32 * 32767) % 32768) as Word);
    }

    #[test]
    fn mod_and_bitwise() {
        let (m, _) = run(&[
            11, R0, 17, 5, //
            12, R1, 0b1100, 0b1010, //
            13, R2, 0b1100, 0b1010, //
            0,
        ]);
        assert_eq!(m.registers()[..3], [2, 0b1000, 0b1110]);
    }

    #[test]
    fn mod_by_zero_faults() {
        let (m, status) = run(&[11, R0, 17, 0]);
        assert_eq!(
            status,
            RunStatus::Errored(ExecError::DivisionByZero { pc: 0 })
        );
        assert_eq!(m.pc(), 4);
        assert_eq!(m.registers(), &[0; 8]);
    }

    #[test]
    fn not_complements_fifteen_bits() {
        let (m, _) = run(&[14, R0, 0, 14, R1, 32767, 0]);
        assert_eq!(m.registers()[0], 32767);
        assert_eq!(m.registers()[1], 0);
    }

    #[test]
    fn eq_and_gt() {
        let (m, _) = run(&[4, R0, 3, 3, 4, R1, 3, 4, 5, R2, 4, 3, 0]);
        assert_eq!(m.registers()[..3], [1, 0, 1]);
    }

    #[test]
    fn stack_is_lifo() {
        let mut m = machine(&[2, 1, 2, 2, 2, 3, 3, R0, 3, R1, 3, R2, 3, R2]);
        for _ in 0..5 {
            assert_eq!(step_once(&mut m), Ok(Step::Continue));
        }
        assert_eq!(m.registers()[0], 3);
        assert_eq!(m.registers()[1], 2);
        assert_eq!(m.stack(), [1]);
        assert_eq!(step_once(&mut m), Ok(Step::Continue));
        assert_eq!(m.registers()[2], 1);
        assert_eq!(
            step_once(&mut m),
            Err(ExecError::StackUnderflow { op: Opcode::Pop, pc: 12 })
        );
        assert_eq!(m.pc(), 14);
        assert_eq!(m.registers()[2], 1);
    }

    #[test]
    fn jumps_and_branches() {
        // 0: jt 1 6 ; 3: halt x3 ; 6: jf 1 3 ; 9: jmp 12 ; 12: jf 0 15 ... 15: halt
        let (m, status) = run(&[7, 1, 6, 0, 0, 0, 8, 1, 3, 6, 12, 0, 8, 0, 15, 0]);
        assert!(status.is_halted());
        assert_eq!(m.pc(), 16);
        assert_eq!(
            m.last_branch(),
            Some(Branch {
                at: 12,
                taken: 15,
                other: 15
            })
        );
    }

    #[test]
    fn call_and_ret() {
        // 0: call 4 ; 2: halt ; 3: noop ; 4: set r0 7 ; 7: ret
        let (m, status) = run(&[17, 4, 0, 21, 1, R0, 7, 18]);
        assert!(status.is_halted());
        assert_eq!(m.pc(), 3);
        assert_eq!(m.registers()[0], 7);
        assert!(m.stack().is_empty());
    }

    #[test]
    fn ret_on_empty_stack() {
        let (_, status) = run(&[18]);
        assert_eq!(
            status,
            RunStatus::Errored(ExecError::StackUnderflow { op: Opcode::Ret, pc: 0 })
        );
    }

    #[test]
    fn memory_round_trip_through_rmem_wmem() {
        let (m, _) = run(&[16, 9, 300, 15, R0, 9, 0, 0, 0, 0]);
        assert_eq!(m.registers()[0], 300);
        assert_eq!(m.changed().get(&9), Some(&300));
    }

    #[test]
    fn literal_destination_rejected_without_mutation() {
        let (m, status) = run(&[1, 5, 6]);
        assert_eq!(
            status,
            RunStatus::Errored(ExecError::InvalidDestination {
                op: Opcode::Set,
                word: 5,
                pc: 0
            })
        );
        assert_eq!(m.pc(), 3);
        assert_eq!(m.registers(), &[0; 8]);
    }

    #[test]
    fn pop_with_literal_destination_keeps_stack() {
        let (m, status) = run(&[2, 9, 3, 5]);
        assert!(matches!(
            status,
            RunStatus::Errored(ExecError::InvalidDestination { pc: 2, .. })
        ));
        assert_eq!(m.stack(), [9]);
    }

    #[test]
    fn operand_past_registers_rejected() {
        let (_, status) = run(&[2, 32776]);
        assert_eq!(
            status,
            RunStatus::Errored(ExecError::InvalidOperand {
                op: Opcode::Push,
                word: 32776,
                pc: 0
            })
        );
    }

    #[test]
    fn unknown_opcode_and_end_of_program() {
        let (_, status) = run(&[21, 99]);
        assert_eq!(
            status,
            RunStatus::Errored(ExecError::UnknownOpcode { opcode: 99, pc: 1 })
        );
        assert_eq!(status.to_string(), "unknown opcode: 99 at pc 1");
        let (_, status) = run(&[21]);
        assert_eq!(
            status,
            RunStatus::Errored(ExecError::EndOfProgram { pc: 1 })
        );
        let (_, status) = run(&[]);
        assert_eq!(
            status,
            RunStatus::Errored(ExecError::EndOfProgram { pc: 0 })
        );
    }

    #[test]
    fn output_collects_lines() {
        let (m, status) = run(&[19, 104, 19, 105, 19, 10, 19, 33, 0]);
        assert!(status.is_halted());
        assert_eq!(m.lines(), ["hi"]);
        assert_eq!(m.output_buffer(), "!");
    }

    #[test]
    fn strict_output_rejects_control_characters() {
        let (m, status) = run(&[19, 7]);
        assert_eq!(
            status,
            RunStatus::Errored(ExecError::InvalidOutputCharacter { value: 7, pc: 0 })
        );
        assert_eq!(m.output_buffer(), "");
        assert_eq!(m.pc(), 2);
    }

    #[test]
    fn decode_faults_leave_pc_on_the_instruction() {
        let (m, status) = run(&[21, 9, R0, 1]);
        assert_eq!(
            status,
            RunStatus::Errored(ExecError::EndOfProgram { pc: 1 })
        );
        assert_eq!(m.pc(), 1);
    }

    #[test]
    fn code_written_past_the_image_runs() {
        // wmem 20 19 ; wmem 21 65 ; jmp 20 ; 20: out 'A'
        let (m, status) = run(&[16, 20, 19, 16, 21, 65, 6, 20]);
        assert_eq!(
            status,
            RunStatus::Errored(ExecError::EndOfProgram { pc: 22 })
        );
        assert_eq!(m.output_buffer(), "A");
    }

    #[test]
    fn lenient_output_accepts_anything() {
        let mut m = machine(&[19, 7, 0]);
        let cfg = VmConfig::default().with_strict_output(false);
        assert_eq!(m.run_with(&cfg, &mut NoHooks), RunStatus::Halted);
        assert_eq!(m.output_buffer(), "\u{7}");
    }

    #[test]
    fn suspends_without_touching_state() {
        let mut m = machine(&[20, R0, 20, R1, 0]);
        assert_eq!(m.run(true), RunStatus::Suspended);
        assert_eq!(m.pc(), 0);
        assert_eq!(m.registers(), &[0; 8]);

        m.feed_input("a");
        assert_eq!(m.run(true), RunStatus::Suspended);
        assert_eq!(m.pc(), 2);
        assert_eq!(m.registers()[0], 'a' as Word);
        assert_eq!(m.input_echo(), "a");

        m.feed_input("\n");
        assert_eq!(m.run(true), RunStatus::Halted);
        assert_eq!(m.registers()[1], 10);
        assert_eq!(m.input_echo(), "");
    }

    #[test]
    fn checkpoint_taken_when_input_drains() {
        let mut m = machine(&[20, R0, 20, R1, 0]);
        m.feed_input("xy");
        assert_eq!(m.run(true), RunStatus::Halted);
        let cp = m.checkpoint().expect("checkpoint");
        assert_eq!(cp.pc, 4);
        assert_eq!(cp.registers[1], 'y' as Word);
        assert_eq!(cp.input, "");
        assert_eq!(cp.echo, "xy");
    }

    #[test]
    fn no_checkpoint_while_input_remains() {
        let mut m = machine(&[20, R0, 0]);
        m.feed_input("ab");
        assert_eq!(m.run(true), RunStatus::Halted);
        assert!(m.checkpoint().is_none());
        assert_eq!(m.pending_input(), "b");
    }

    #[test]
    fn non_ascii_input_faults() {
        let mut m = machine(&[20, R0, 0]);
        m.feed_input("\u{10000}");
        assert_eq!(
            m.run(true),
            RunStatus::Errored(ExecError::InvalidInputCharacter {
                ch: '\u{10000}',
                pc: 0
            })
        );
        assert_eq!(m.pending_input(), "\u{10000}");
    }

    #[test]
    fn without_suspension_empty_input_still_waits() {
        let mut m = machine(&[20, R0, 0]);
        let cfg = VmConfig::default().with_suspend_on_input(false);
        assert_eq!(m.run_with(&cfg, &mut NoHooks), RunStatus::Suspended);
        assert_eq!(m.pc(), 0);
    }

    #[test]
    fn step_limit_stops_loops() {
        let mut m = machine(&[6, 0]);
        let cfg = VmConfig::default().with_step_limit(100);
        assert_eq!(
            m.run_with(&cfg, &mut NoHooks),
            RunStatus::Errored(ExecError::StepLimitExceeded { limit: 100 })
        );
        assert_eq!(m.pc(), 0);
    }
}
