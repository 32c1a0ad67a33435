//! Machine state: memory, registers, stack, program counter and I/O buffers.

use crate::console::{Console, LineCursor};
use crate::decode::{self, Decoded, Disassembly};
use crate::error::{ImageError, Result};
use crate::image;
use crate::memory::Memory;
use crate::snapshot::Snapshot;
use crate::word::{Reg, Word, REGISTER_COUNT};
use std::collections::BTreeMap;
use tracing::debug;

/// The most recent conditional jump: where it went and where it would have gone.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Branch {
    /// Address of the `jt`/`jf` instruction.
    pub at: Word,
    /// The pc the jump produced.
    pub taken: Word,
    /// The pc the opposite outcome would have produced.
    pub other: Word,
}

/// A single virtual machine instance.
///
/// Instances own all of their mutable state; clones share only the
/// immutable program image and are otherwise fully independent.
#[derive(Debug, Default)]
pub struct Machine {
    pub(crate) memory: Memory,
    pub(crate) registers: [Word; REGISTER_COUNT],
    pub(crate) stack: Vec<Word>,
    pub(crate) pc: Word,
    pub(crate) console: Console,
    /// State captured when the input queue last ran dry.
    pub(crate) checkpoint: Option<Snapshot>,
    pub(crate) last_branch: Option<Branch>,
}

impl Machine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces memory with `words` and resets every other field.
    pub fn load_image(&mut self, words: Vec<Word>) -> std::result::Result<(), ImageError> {
        let words = image::check_size(words)?;
        debug!(words = words.len(), "program image loaded");
        *self = Self {
            memory: Memory::new(words),
            ..Self::default()
        };
        Ok(())
    }

    /// Loads a comma-separated decimal image.
    pub fn load_text(&mut self, text: &str) -> std::result::Result<(), ImageError> {
        self.load_image(image::parse_text(text)?)
    }

    /// Loads a raw little-endian 16-bit image.
    pub fn load_bytes(&mut self, bytes: &[u8]) -> std::result::Result<(), ImageError> {
        self.load_image(image::parse_bytes(bytes)?)
    }

    /// Queues characters for `in` instructions.
    pub fn feed_input(&mut self, text: &str) {
        self.console.feed(text);
    }

    pub fn pc(&self) -> Word {
        self.pc
    }

    /// Moves the program counter. Diagnostic use only.
    pub fn set_pc(&mut self, pc: Word) {
        self.pc = pc;
    }

    pub fn registers(&self) -> &[Word; REGISTER_COUNT] {
        &self.registers
    }

    pub fn register(&self, reg: Reg) -> Word {
        self.registers[reg.index()]
    }

    /// Overwrites a register. Diagnostic use only.
    pub fn set_register(&mut self, reg: Reg, value: Word) {
        self.registers[reg.index()] = value;
    }

    /// Stack contents, bottom first.
    pub fn stack(&self) -> &[Word] {
        &self.stack
    }

    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn read_memory(&self, addr: Word) -> Word {
        self.memory.read(addr)
    }

    /// Writes a memory cell outside of execution, tracked like `wmem`.
    pub fn write_memory(&mut self, addr: Word, value: Word) {
        self.memory.write(addr, value);
    }

    /// Memory cells that differ from the loaded image.
    pub fn changed(&self) -> &BTreeMap<Word, Word> {
        self.memory.changed()
    }

    pub fn pending_input(&self) -> String {
        self.console.pending_input()
    }

    /// Input consumed since the last newline.
    pub fn input_echo(&self) -> &str {
        self.console.echo()
    }

    /// Output emitted since the last newline.
    pub fn output_buffer(&self) -> &str {
        self.console.output()
    }

    /// Every completed output line, oldest first.
    pub fn lines(&self) -> &[String] {
        self.console.lines()
    }

    /// Completed lines starting at `index`.
    pub fn lines_from(&self, index: usize) -> impl Iterator<Item = &str> {
        let lines = self.console.lines();
        lines[index.min(lines.len())..].iter().map(String::as_str)
    }

    /// Lines completed since `cursor` last read.
    pub fn read_lines<'a>(&'a self, cursor: &mut LineCursor) -> impl Iterator<Item = &'a str> + 'a {
        cursor.read(self.console.lines())
    }

    /// State captured the last time an `in` instruction emptied the input queue.
    pub fn checkpoint(&self) -> Option<&Snapshot> {
        self.checkpoint.as_ref()
    }

    pub fn last_branch(&self) -> Option<Branch> {
        self.last_branch
    }

    /// Decodes the instruction at `addr` without executing it.
    pub fn decode_at(&self, addr: Word) -> Result<Decoded> {
        decode::decode(&self.memory, addr)
    }

    /// Sweeps all of memory from address 0.
    pub fn disassemble(&self) -> Disassembly<'_> {
        Disassembly::new(&self.memory, 0)
    }
}

impl Clone for Machine {
    /// Copies machine state for speculative execution. The line history,
    /// the input checkpoint and branch tracking stay with the original.
    fn clone(&self) -> Self {
        Self {
            memory: self.memory.clone(),
            registers: self.registers,
            stack: self.stack.clone(),
            pc: self.pc,
            console: self.console.fork(),
            checkpoint: None,
            last_branch: None,
        }
    }
}
