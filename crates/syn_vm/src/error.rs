use crate::opcode::Opcode;
use crate::word::Word;
use thiserror::Error;

/// Faults that end a run. None of them leaves an instruction half-applied.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecError {
    #[error("end of program at pc {pc}")]
    EndOfProgram { pc: Word },
    #[error("unknown opcode: {opcode} at pc {pc}")]
    UnknownOpcode { opcode: Word, pc: Word },
    #[error("invalid operand word {word} for {op:?} at pc {pc}")]
    InvalidOperand { op: Opcode, word: Word, pc: Word },
    #[error("invalid destination {word} for {op:?} at pc {pc}: not a register")]
    InvalidDestination { op: Opcode, word: Word, pc: Word },
    #[error("stack underflow for {op:?} at pc {pc}")]
    StackUnderflow { op: Opcode, pc: Word },
    #[error("division by zero at pc {pc}")]
    DivisionByZero { pc: Word },
    #[error("invalid output character {value} at pc {pc}")]
    InvalidOutputCharacter { value: Word, pc: Word },
    #[error("input character {ch:?} does not fit a machine word at pc {pc}")]
    InvalidInputCharacter { ch: char, pc: Word },
    #[error("stopped by caller at pc {pc}")]
    UserStop { pc: Word },
    #[error("step limit of {limit} exhausted")]
    StepLimitExceeded { limit: u64 },
}

impl ExecError {
    /// Program counter of the faulting instruction, when the fault has one.
    pub fn pc(&self) -> Option<Word> {
        match self {
            ExecError::EndOfProgram { pc }
            | ExecError::UnknownOpcode { pc, .. }
            | ExecError::InvalidOperand { pc, .. }
            | ExecError::InvalidDestination { pc, .. }
            | ExecError::StackUnderflow { pc, .. }
            | ExecError::DivisionByZero { pc }
            | ExecError::InvalidOutputCharacter { pc, .. }
            | ExecError::InvalidInputCharacter { pc, .. }
            | ExecError::UserStop { pc } => Some(*pc),
            ExecError::StepLimitExceeded { .. } => None,
        }
    }
}

/// Failures while turning text or bytes into a program image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ImageError {
    #[error("invalid word {token:?} at position {index}")]
    InvalidWord { index: usize, token: String },
    #[error("odd image length: {0} bytes")]
    OddLength(usize),
    #[error("image of {words} words exceeds the {max}-word address space")]
    TooLarge { words: usize, max: usize },
}

/// Failures while encoding or decoding a snapshot.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated snapshot: {needed} bytes needed at offset {offset}")]
    Truncated { offset: usize, needed: usize },
    #[error("{0} trailing bytes after snapshot")]
    TrailingBytes(usize),
    #[error("diff lists differ in length: {keys} keys, {values} values")]
    DiffMismatch { keys: usize, values: usize },
    #[error("invalid utf-8 in {field} buffer")]
    InvalidUtf8 { field: &'static str },
    #[error("{field} too long to encode: {len}")]
    TooLong { field: &'static str, len: usize },
}

pub type Result<T> = std::result::Result<T, ExecError>;
