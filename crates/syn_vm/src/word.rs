//! Machine words and operand addressing.
//!
//! Every cell of memory, every register and every stack slot holds a 16-bit
//! word. When a word appears in operand position it is classified as:
//!
//! - a **literal** when it is below [`MODULUS`] (the word is its own value)
//! - a **register** when it lies in `32768..=32775` (word - 32768 is the index)
//!
//! Anything above 32775 is not a valid operand. Arithmetic wraps modulo
//! [`MODULUS`].

use std::fmt;

/// Base storage and operand unit.
pub type Word = u16;

/// Arithmetic modulus and first register word.
pub const MODULUS: Word = 32768;
/// Largest literal value (`0x7FFF`).
pub const MAX_LITERAL: Word = MODULUS - 1;
/// Word naming register 0.
pub const REGISTER_BASE: Word = MODULUS;
/// Size of the register file.
pub const REGISTER_COUNT: usize = 8;
/// Largest program image, in words: the 15-bit literal address space.
pub const MAX_IMAGE_WORDS: usize = MODULUS as usize;

/// Index of one of the eight registers.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct Reg(u8);

impl Reg {
    /// Returns the register with the given index, or `None` past the register file.
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < REGISTER_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The operand word that names this register.
    pub const fn word(self) -> Word {
        REGISTER_BASE + self.0 as Word
    }
}

impl fmt::Display for Reg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0)
    }
}

/// A classified operand word.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Operand {
    Literal(Word),
    Register(Reg),
}

impl Operand {
    /// Classifies `word`, returning `None` when it is neither a literal nor a register.
    pub const fn classify(word: Word) -> Option<Self> {
        if word <= MAX_LITERAL {
            Some(Operand::Literal(word))
        } else if ((word - REGISTER_BASE) as usize) < REGISTER_COUNT {
            Some(Operand::Register(Reg((word - REGISTER_BASE) as u8)))
        } else {
            None
        }
    }

    /// Resolves the operand against a register file.
    pub fn resolve(self, registers: &[Word; REGISTER_COUNT]) -> Word {
        match self {
            Operand::Literal(v) => v,
            Operand::Register(r) => registers[r.index()],
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Literal(v) => write!(f, "{v}"),
            Operand::Register(r) => write!(f, "{r}"),
        }
    }
}

/// Reduces an intermediate result modulo [`MODULUS`].
pub fn wrap(value: u32) -> Word {
    (value % MODULUS as u32) as Word
}

/// 15-bit bitwise complement.
pub fn complement(value: Word) -> Word {
    !value & MAX_LITERAL
}
