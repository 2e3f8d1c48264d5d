//! Print job types and per-item content rendering

use serde::{Deserialize, Serialize};

/// How a quantity greater than one is materialized on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepeatMode {
    /// Rewrite the device copy-count command (TSPL-style `PRINT 1,<n>`)
    CopyDirective,
    /// Repeat the content block literally, once per copy
    Repeat,
}

/// One printable unit of work: opaque printer-language text for exactly one
/// label, plus delivery options.
///
/// Jobs are immutable once enqueued; delivery bookkeeping lives in the queue,
/// keyed by an internal id, never on the job itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    /// Printer-language text for one label
    pub content: String,
    /// Number of physical copies, at least 1
    pub quantity: u32,
    /// How `quantity` is applied to the content
    pub repeat_mode: RepeatMode,
    /// A batch containing this job never receives the end-of-batch trailer
    pub suppress_trailer: bool,
}

impl PrintJob {
    /// Create a job with default options (single copy, copy-count directive).
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            quantity: 1,
            repeat_mode: RepeatMode::CopyDirective,
            suppress_trailer: false,
        }
    }

    /// Set the copy count; zero is clamped to one.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    pub fn with_repeat_mode(mut self, mode: RepeatMode) -> Self {
        self.repeat_mode = mode;
        self
    }

    /// Render the final content with the quantity applied.
    pub(crate) fn rendered(&self, copy_command: &str, separator: &str) -> String {
        if self.quantity <= 1 {
            return self.content.clone();
        }

        match self.repeat_mode {
            RepeatMode::Repeat => {
                vec![self.content.as_str(); self.quantity as usize].join(separator)
            }
            RepeatMode::CopyDirective => {
                rewrite_copy_command(&self.content, copy_command, self.quantity)
            }
        }
    }
}

/// A job accepted into a queue, tagged with its internal delivery id.
///
/// The id keys the per-pass sent-state set, so a chunk retake never re-sends
/// a job a superseded attempt already delivered.
#[derive(Debug, Clone)]
pub(crate) struct QueuedJob {
    pub id: u64,
    pub job: PrintJob,
}

/// Rewrite the last copy-count command line to carry `quantity`, or append
/// one if the content has none.
fn rewrite_copy_command(content: &str, command: &str, quantity: u32) -> String {
    let directive = format!("{command} 1,{quantity}");
    let prefix = format!("{command} ");

    let mut lines: Vec<&str> = content.lines().collect();
    let mut replaced = false;
    for line in lines.iter_mut().rev() {
        let trimmed = line.trim_start();
        if trimmed == command || trimmed.starts_with(&prefix) {
            *line = directive.as_str();
            replaced = true;
            break;
        }
    }
    if !replaced {
        lines.push(directive.as_str());
    }

    let mut out = lines.join("\n");
    if content.ends_with('\n') {
        out.push('\n');
    }
    out
}
