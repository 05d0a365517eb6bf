// SPDX-License-Identifier: MIT
//
// Output sinks: where encoded frames go.
//
// The renderer hands each produced frame to its sink in exactly one
// `write` call. An interactive sink receives escape-sequence streams; a
// non-interactive one (a pipe, a file, a test) receives the plain text of
// the frame instead.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::terminal;

/// Destination for encoded frames.
pub trait OutputSink: Send {
    /// Deliver one frame. Called at most once per produced frame.
    ///
    /// # Errors
    ///
    /// Any I/O failure. The renderer keeps its previous baseline and tries
    /// again on the next frame.
    fn write(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Whether the destination interprets escape sequences.
    fn is_interactive(&self) -> bool;
}

// ─── StdoutSink ─────────────────────────────────────────────────────────────

/// Process stdout. Interactive when stdout is a TTY.
#[derive(Debug, Clone, Copy)]
pub struct StdoutSink {
    interactive: bool,
}

impl StdoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self {
            interactive: terminal::is_stdout_tty(),
        }
    }

    /// Override TTY detection.
    #[must_use]
    pub const fn with_interactive(interactive: bool) -> Self {
        Self { interactive }
    }
}

impl Default for StdoutSink {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputSink for StdoutSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(bytes)?;
        out.flush()
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

// ─── CaptureSink ────────────────────────────────────────────────────────────

/// In-memory sink recording every write as a separate frame.
///
/// Clones share the same record, so a test can keep one handle while the
/// renderer owns another.
#[derive(Debug, Clone, Default)]
pub struct CaptureSink {
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
    interactive: bool,
}

impl CaptureSink {
    /// A sink that reports itself as a terminal.
    #[must_use]
    pub fn interactive() -> Self {
        Self {
            frames: Arc::default(),
            interactive: true,
        }
    }

    /// A sink that receives plain text.
    #[must_use]
    pub fn plain() -> Self {
        Self::default()
    }

    /// Number of writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.frames.lock().len()
    }

    /// Copy of every write so far, oldest first.
    #[must_use]
    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().clone()
    }

    /// Copy of the most recent write.
    #[must_use]
    pub fn last(&self) -> Option<Vec<u8>> {
        self.frames.lock().last().cloned()
    }

    /// Every write concatenated, as a terminal would have received it.
    #[must_use]
    pub fn stream(&self) -> Vec<u8> {
        self.frames.lock().concat()
    }
}

impl OutputSink for CaptureSink {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.frames.lock().push(bytes.to_vec());
        Ok(())
    }

    fn is_interactive(&self) -> bool {
        self.interactive
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
