use serde::{Deserialize, Serialize};

/// Run policy for [`Machine::run_with`](crate::Machine::run_with).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VmConfig {
    /// Return `Suspended` instead of consuming input when an `in` instruction
    /// finds the pending-input queue empty.
    pub suspend_on_input: bool,
    /// Reject output that is neither a newline nor printable ASCII.
    pub strict_output: bool,
    /// Maximum instructions per run invocation.
    pub step_limit: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            suspend_on_input: true,
            strict_output: true,
            step_limit: None,
        }
    }
}

impl VmConfig {
    pub fn with_suspend_on_input(mut self, suspend: bool) -> Self {
        self.suspend_on_input = suspend;
        self
    }

    pub fn with_strict_output(mut self, strict: bool) -> Self {
        self.strict_output = strict;
        self
    }

    pub fn with_step_limit(mut self, limit: u64) -> Self {
        self.step_limit = Some(limit);
        self
    }
}
