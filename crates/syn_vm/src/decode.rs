//! Instruction decoding and diagnostic rendering.
//!
//! Decoding reads the opcode and its raw operand words without resolving
//! them. Rendering shows literals as numbers and registers as `[i]`.

use crate::error::{ExecError, Result};
use crate::memory::Memory;
use crate::opcode::Opcode;
use crate::word::{Operand, Word};
use std::fmt;

/// One decoded instruction with unresolved operands.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Decoded {
    pub addr: Word,
    pub opcode: Opcode,
    operands: [Word; 3],
}

impl Decoded {
    pub fn operands(&self) -> &[Word] {
        &self.operands[..self.opcode.operand_count()]
    }

    /// Address of the instruction that follows.
    pub fn next_addr(&self) -> usize {
        self.addr as usize + self.opcode.arity()
    }
}

impl fmt::Display for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:5}: {}", self.addr, self.opcode.mnemonic())?;
        for word in self.operands() {
            match Operand::classify(*word) {
                Some(op) => write!(f, " {op}")?,
                None => write!(f, " <{word}>")?,
            }
        }
        if self.opcode == Opcode::Out {
            if let Some(Operand::Literal(v)) = Operand::classify(self.operands[0]) {
                match v {
                    10 => write!(f, "  ; '\\n'")?,
                    32..=126 => write!(f, "  ; {:?}", char::from(v as u8))?,
                    _ => {}
                }
            }
        }
        Ok(())
    }
}

/// Decodes the instruction at `addr`.
///
/// Fails with `EndOfProgram` when `addr` or any operand lies past the
/// memory extent, and with `UnknownOpcode` when the cell is not an opcode.
pub fn decode(memory: &Memory, addr: Word) -> Result<Decoded> {
    if addr as usize >= memory.extent() {
        return Err(ExecError::EndOfProgram { pc: addr });
    }
    let word = memory.read(addr);
    let opcode = Opcode::from_word(word).ok_or(ExecError::UnknownOpcode {
        opcode: word,
        pc: addr,
    })?;
    if addr as usize + opcode.arity() > memory.extent() {
        return Err(ExecError::EndOfProgram { pc: addr });
    }
    let mut operands = [0; 3];
    for (i, slot) in operands.iter_mut().take(opcode.operand_count()).enumerate() {
        *slot = memory.read(addr + 1 + i as Word);
    }
    Ok(Decoded {
        addr,
        opcode,
        operands,
    })
}

/// One line of a memory dump.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Listing {
    Instruction(Decoded),
    /// A cell that does not start a decodable instruction.
    Data { addr: Word, word: Word },
}

impl Listing {
    pub fn addr(&self) -> Word {
        match self {
            Listing::Instruction(d) => d.addr,
            Listing::Data { addr, .. } => *addr,
        }
    }
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Listing::Instruction(d) => d.fmt(f),
            Listing::Data { addr, word } => write!(f, "{addr:5}: .word {word}"),
        }
    }
}

/// Linear sweep over memory from a start address.
///
/// Undecodable cells are emitted as [`Listing::Data`] and the sweep moves on
/// by one word.
pub struct Disassembly<'a> {
    memory: &'a Memory,
    cursor: usize,
}

impl<'a> Disassembly<'a> {
    pub fn new(memory: &'a Memory, start: Word) -> Self {
        Self {
            memory,
            cursor: start as usize,
        }
    }
}

impl Iterator for Disassembly<'_> {
    type Item = Listing;

    fn next(&mut self) -> Option<Listing> {
        if self.cursor >= self.memory.extent() {
            return None;
        }
        let addr = self.cursor as Word;
        match decode(self.memory, addr) {
            Ok(d) => {
                self.cursor = d.next_addr();
                Some(Listing::Instruction(d))
            }
            Err(_) => {
                self.cursor += 1;
                Some(Listing::Data {
                    addr,
                    word: self.memory.read(addr),
                })
            }
        }
    }
}
