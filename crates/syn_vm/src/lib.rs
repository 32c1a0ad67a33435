//! syn-vm - 16-bit word virtual machine with suspendable execution
//!
//! - 22 instructions over a 15-bit literal space and eight registers
//! - Cooperative suspension when an input instruction finds no input
//! - Copy-on-write memory: shared program image plus a per-machine diff
//! - Diff-based snapshots, cloneable in memory or archived to bytes
//! - Optional hooks for breakpoints and logging, never global

pub mod config;
pub mod console;
pub mod debug;
pub mod decode;
pub mod error;
pub mod exec;
pub mod hooks;
pub mod image;
pub mod machine;
pub mod memory;
pub mod opcode;
pub mod snapshot;
pub mod word;

pub use config::VmConfig;
pub use console::LineCursor;
pub use debug::{invert_last_branch, patch_noops, BreakHit, Debugger};
pub use decode::{decode, Decoded, Disassembly, Listing};
pub use error::{ExecError, ImageError, SnapshotError};
pub use exec::{InstructionSet, RunStatus, Step};
pub use hooks::{Control, Hooks, NoHooks};
pub use machine::{Branch, Machine};
pub use memory::Memory;
pub use opcode::Opcode;
pub use snapshot::{Snapshot, ARCHIVE_ENTRY};
pub use word::{Operand, Reg, Word};
