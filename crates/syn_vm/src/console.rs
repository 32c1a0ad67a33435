//! Character I/O buffers.
//!
//! Input is a queue the caller fills and `in` drains one character at a
//! time; consumed characters are echoed until the next newline. Output
//! accumulates into a line buffer that is moved to the line history on every
//! newline, so callers read program output a line at a time.

use std::collections::VecDeque;

#[derive(Clone, Debug, Default)]
pub struct Console {
    pending: VecDeque<char>,
    echo: String,
    output: String,
    lines: Vec<String>,
}

impl Console {
    /// Appends characters to the pending-input queue.
    pub fn feed(&mut self, text: &str) {
        self.pending.extend(text.chars());
    }

    pub fn has_input(&self) -> bool {
        !self.pending.is_empty()
    }

    pub(crate) fn peek_input(&self) -> Option<char> {
        self.pending.front().copied()
    }

    pub(crate) fn take_input(&mut self) -> Option<char> {
        let ch = self.pending.pop_front()?;
        if ch == '\n' {
            self.echo.clear();
        } else {
            self.echo.push(ch);
        }
        Some(ch)
    }

    /// Appends an output character. Returns the completed line on newline.
    pub(crate) fn emit(&mut self, ch: char) -> Option<&str> {
        if ch != '\n' {
            self.output.push(ch);
            return None;
        }
        let line = std::mem::take(&mut self.output);
        self.lines.push(line);
        self.lines.last().map(String::as_str)
    }

    pub fn pending_input(&self) -> String {
        self.pending.iter().collect()
    }

    pub fn echo(&self) -> &str {
        &self.echo
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Copy of the three buffers without the line history.
    pub(crate) fn fork(&self) -> Self {
        Self {
            pending: self.pending.clone(),
            echo: self.echo.clone(),
            output: self.output.clone(),
            lines: Vec::new(),
        }
    }

    /// Replaces the buffers and drops the line history.
    pub(crate) fn restore(&mut self, input: &str, echo: &str, output: &str) {
        self.pending = input.chars().collect();
        self.echo = echo.to_string();
        self.output = output.to_string();
        self.lines.clear();
    }
}

/// Read position in a machine's line history.
///
/// The history is append-only, so a cursor stays valid while the machine
/// runs; reading yields every line completed since the previous read.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LineCursor {
    next: usize,
}

impl LineCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts reading at line `index`.
    pub fn at(index: usize) -> Self {
        Self { next: index }
    }

    pub fn position(&self) -> usize {
        self.next
    }

    /// Yields the unread lines and advances past them.
    pub fn read<'a>(&mut self, lines: &'a [String]) -> impl Iterator<Item = &'a str> + 'a {
        let start = self.next.min(lines.len());
        self.next = lines.len();
        lines[start..].iter().map(String::as_str)
    }
}
