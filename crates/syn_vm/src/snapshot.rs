//! Point-in-time machine state and its durable encoding.
//!
//! A snapshot never contains the program image, only the diff against it,
//! so restoring requires the machine to hold the same image first.
//!
//! Raw encoding, all integers little-endian `u16`:
//!
//! ```text
//! pc
//! registers[0..8]
//! stack:   len, words...
//! keys:    len, addrs...
//! values:  len, words...
//! input:   len, utf-8 bytes...
//! echo:    len, utf-8 bytes...
//! output:  len, utf-8 bytes...
//! ```
//!
//! The durable form wraps that encoding as the single deflated entry
//! [`ARCHIVE_ENTRY`] of a zip archive.

use crate::error::SnapshotError;
use crate::machine::Machine;
use crate::word::{Word, REGISTER_COUNT};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Name of the archive member holding the encoded state.
pub const ARCHIVE_ENTRY: &str = "state.bin";

pub type Result<T> = std::result::Result<T, SnapshotError>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub pc: Word,
    pub registers: [Word; REGISTER_COUNT],
    pub stack: Vec<Word>,
    /// Memory cells that differ from the program image.
    pub changed: BTreeMap<Word, Word>,
    pub input: String,
    pub echo: String,
    pub output: String,
}

impl Snapshot {
    pub fn capture(machine: &Machine) -> Self {
        Self {
            pc: machine.pc,
            registers: machine.registers,
            stack: machine.stack.clone(),
            changed: machine.memory.changed().clone(),
            input: machine.console.pending_input(),
            echo: machine.console.echo().to_string(),
            output: machine.console.output().to_string(),
        }
    }

    /// Raw field encoding, without the archive wrapper.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut w = Writer::default();
        w.word(self.pc);
        for r in &self.registers {
            w.word(*r);
        }
        w.words("stack", &self.stack)?;
        let keys: Vec<Word> = self.changed.keys().copied().collect();
        let values: Vec<Word> = self.changed.values().copied().collect();
        w.words("diff keys", &keys)?;
        w.words("diff values", &values)?;
        w.text("input", &self.input)?;
        w.text("echo", &self.echo)?;
        w.text("output", &self.output)?;
        Ok(w.buf)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut r = Reader::new(bytes);
        let pc = r.word()?;
        let mut registers = [0; REGISTER_COUNT];
        for reg in registers.iter_mut() {
            *reg = r.word()?;
        }
        let stack = r.words()?;
        let keys = r.words()?;
        let values = r.words()?;
        if keys.len() != values.len() {
            return Err(SnapshotError::DiffMismatch {
                keys: keys.len(),
                values: values.len(),
            });
        }
        let input = r.text("input")?;
        let echo = r.text("echo")?;
        let output = r.text("output")?;
        r.finish()?;
        Ok(Self {
            pc,
            registers,
            stack,
            changed: keys.into_iter().zip(values).collect(),
            input,
            echo,
            output,
        })
    }

    /// Encodes into a compressed single-entry archive.
    pub fn to_archive(&self) -> Result<Vec<u8>> {
        let raw = self.encode()?;
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
        zip.start_file(ARCHIVE_ENTRY, options)?;
        zip.write_all(&raw)?;
        let bytes = zip.finish()?.into_inner();
        debug!(raw = raw.len(), archived = bytes.len(), "snapshot archived");
        Ok(bytes)
    }

    pub fn from_archive(bytes: &[u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entry = archive.by_name(ARCHIVE_ENTRY)?;
        let mut raw = Vec::new();
        entry.read_to_end(&mut raw)?;
        Self::decode(&raw)
    }

    /// Content address of the raw encoding: `b3:` followed by the hex blake3 digest.
    pub fn cid(&self) -> Result<String> {
        let raw = self.encode()?;
        Ok(format!("b3:{}", hex::encode(blake3::hash(&raw).as_bytes())))
    }
}

impl Machine {
    /// Captures the current state.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self)
    }

    /// Replaces pc, registers, stack, buffers and the memory diff with the
    /// snapshot's. The image stays; it must be the one the snapshot was taken
    /// against. Line history and debug state are cleared.
    pub fn restore(&mut self, snapshot: &Snapshot) {
        self.pc = snapshot.pc;
        self.registers = snapshot.registers;
        self.stack = snapshot.stack.clone();
        self.memory.replace_changed(snapshot.changed.clone());
        self.console
            .restore(&snapshot.input, &snapshot.echo, &snapshot.output);
        self.checkpoint = None;
        self.last_branch = None;
    }

    /// Durable save state.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        self.snapshot().to_archive()
    }

    /// Loads a save state produced by [`Machine::serialize`]. Load the same
    /// program image first.
    pub fn deserialize(&mut self, bytes: &[u8]) -> Result<()> {
        let snapshot = Snapshot::from_archive(bytes)?;
        debug!(
            pc = snapshot.pc,
            changed = snapshot.changed.len(),
            "restoring snapshot"
        );
        self.restore(&snapshot);
        Ok(())
    }
}

#[derive(Default)]
struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn word(&mut self, w: Word) {
        self.buf.extend_from_slice(&w.to_le_bytes());
    }

    fn len(&mut self, field: &'static str, len: usize) -> Result<()> {
        let w = Word::try_from(len).map_err(|_| SnapshotError::TooLong { field, len })?;
        self.word(w);
        Ok(())
    }

    fn words(&mut self, field: &'static str, words: &[Word]) -> Result<()> {
        self.len(field, words.len())?;
        for w in words {
            self.word(*w);
        }
        Ok(())
    }

    fn text(&mut self, field: &'static str, text: &str) -> Result<()> {
        self.len(field, text.len())?;
        self.buf.extend_from_slice(text.as_bytes());
        Ok(())
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    fn take(&mut self, needed: usize) -> Result<&'a [u8]> {
        let end = self.offset + needed;
        let chunk = self
            .bytes
            .get(self.offset..end)
            .ok_or(SnapshotError::Truncated {
                offset: self.offset,
                needed,
            })?;
        self.offset = end;
        Ok(chunk)
    }

    fn word(&mut self) -> Result<Word> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    fn words(&mut self) -> Result<Vec<Word>> {
        let len = self.word()? as usize;
        (0..len).map(|_| self.word()).collect()
    }

    fn text(&mut self, field: &'static str) -> Result<String> {
        let len = self.word()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SnapshotError::InvalidUtf8 { field })
    }

    fn finish(self) -> Result<()> {
        match self.bytes.len() - self.offset {
            0 => Ok(()),
            n => Err(SnapshotError::TrailingBytes(n)),
        }
    }
}
