// SPDX-License-Identifier: MIT
//
// BufferDiffer: turns two frames into the ops that take the terminal from
// one to the other.
//
// The output is a flat list of `DiffOp`s, the only contract between the
// differ and the encoder. The differ decides *what* changes; the encoder
// decides how many bytes that costs.
//
// Granularity is the row. A changed row is rewritten in full: move to its
// start, clear it, write its content. Row-level diffing costs a few extra
// bytes over cell-level diffing on partially changed rows, but it can never
// leave stale cells behind and it keeps the op stream trivially verifiable.
//
// Row content is emitted as runs of equal style. Trailing empty cells are
// not written (the clear-line already produced them), and continuation
// cells are skipped (the terminal advances two columns for a wide glyph).
//
// The differ tracks the style the terminal will be in as the ops are
// applied, starting from the default at the top of every frame. A run only
// gets a set-attribute when its style differs from that, and the style is
// reset to the default before every clear-line, since EL erases with the
// current background color.
//
// Two modes:
//
//   Sparse  one move + clear + content per changed row. Unchanged rows,
//           including gaps between changed rows, emit nothing.
//   Span    one move to the first changed row, then every row from first to
//           last changed (gaps included) as clear + content, CRLF-joined.

use crate::buffer::TerminalBuffer;
use crate::cell::{Cell, Style};
use crate::geometry::Size;

// ─── DiffOp ─────────────────────────────────────────────────────────────────

/// A single terminal change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    /// Make `Style` the active rendition.
    SetAttribute(Style),
    /// Move to column `x`, row `y` (0-indexed).
    MoveCursor { x: u16, y: u16 },
    /// Raw UTF-8 bytes: row content or a CRLF.
    WriteBytes(Vec<u8>),
    /// Erase from the cursor to the end of the line.
    ClearLine,
    /// Erase the whole screen and home the cursor.
    ClearScreen,
}

/// An ordered list of ops for one frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiffOps {
    ops: Vec<DiffOp>,
    full_redraw: bool,
}

impl DiffOps {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ops: Vec::new(),
            full_redraw: false,
        }
    }

    #[inline]
    pub fn push(&mut self, op: DiffOp) {
        self.ops.push(op);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Whether this frame starts from a cleared screen.
    #[inline]
    #[must_use]
    pub const fn is_full_redraw(&self) -> bool {
        self.full_redraw
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[DiffOp] {
        &self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DiffOp> {
        self.ops.iter()
    }

    /// Total content bytes carried by write ops.
    #[must_use]
    pub fn payload_len(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                DiffOp::WriteBytes(bytes) => bytes.len(),
                _ => 0,
            })
            .sum()
    }
}

impl<'a> IntoIterator for &'a DiffOps {
    type Item = &'a DiffOp;
    type IntoIter = std::slice::Iter<'a, DiffOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

// ─── BufferDiffer ───────────────────────────────────────────────────────────

/// How incremental frames address changed rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DiffMode {
    /// One cursor move per changed row.
    #[default]
    Sparse,
    /// One cursor move, then the inclusive range of changed rows.
    Span,
}

/// Computes [`DiffOps`] between two buffers.
#[derive(Debug, Clone, Copy, Default)]
pub struct BufferDiffer {
    mode: DiffMode,
}

impl BufferDiffer {
    #[must_use]
    pub const fn new(mode: DiffMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub const fn mode(&self) -> DiffMode {
        self.mode
    }

    /// Ops that turn a terminal showing `prev` into one showing `next`.
    ///
    /// No `prev`, or a `prev` whose size is not `size`, produces a full
    /// redraw. Identical buffers produce no ops.
    ///
    /// ```
    /// use n_render::buffer::TerminalBuffer;
    /// use n_render::diff::{BufferDiffer, DiffMode, DiffOp};
    ///
    /// let prev = TerminalBuffer::from_lines(4, &["AAAA", "BBBB"]);
    /// let next = TerminalBuffer::from_lines(4, &["AAAA", "CCCC"]);
    /// let ops = BufferDiffer::new(DiffMode::Sparse).diff(Some(&prev), &next, next.size());
    /// assert_eq!(
    ///     ops.as_slice(),
    ///     &[
    ///         DiffOp::MoveCursor { x: 0, y: 1 },
    ///         DiffOp::ClearLine,
    ///         DiffOp::WriteBytes(b"CCCC".to_vec()),
    ///     ]
    /// );
    /// ```
    #[must_use]
    pub fn diff(&self, prev: Option<&TerminalBuffer>, next: &TerminalBuffer, size: Size) -> DiffOps {
        let prev = prev.filter(|p| p.size() == size && next.size() == size);
        let Some(prev) = prev else {
            return full_redraw(next);
        };

        let changed = next.diff(prev);
        let mut out = RowEmitter::default();

        match self.mode {
            DiffMode::Sparse => {
                for y in changed {
                    out.ops.push(DiffOp::MoveCursor { x: 0, y });
                    out.row(next.row(y).unwrap_or_default());
                }
            }
            DiffMode::Span => {
                if let (Some(&first), Some(&last)) = (changed.first(), changed.last()) {
                    out.ops.push(DiffOp::MoveCursor { x: 0, y: first });
                    for y in first..=last {
                        if y > first {
                            out.crlf();
                        }
                        out.row(next.row(y).unwrap_or_default());
                    }
                }
            }
        }

        out.ops
    }
}

/// Clear the screen and write every row, CRLF-joined.
fn full_redraw(next: &TerminalBuffer) -> DiffOps {
    let mut out = RowEmitter::default();
    out.ops.full_redraw = true;
    out.ops.push(DiffOp::ClearScreen);
    for (y, row) in next.rows().enumerate() {
        if y > 0 {
            out.crlf();
        }
        out.row(row);
    }
    out.ops
}

// ─── RowEmitter ─────────────────────────────────────────────────────────────

/// Accumulates ops while tracking the style the terminal will be in.
#[derive(Default)]
struct RowEmitter {
    ops: DiffOps,
    active: Style,
}

impl RowEmitter {
    fn crlf(&mut self) {
        self.ops.push(DiffOp::WriteBytes(b"\r\n".to_vec()));
    }

    fn set_style(&mut self, style: Style) {
        if style != self.active {
            self.ops.push(DiffOp::SetAttribute(style));
            self.active = style;
        }
    }

    /// Clear the line at the cursor and write `row` from there.
    fn row(&mut self, row: &[Cell]) {
        self.set_style(Style::DEFAULT);
        self.ops.push(DiffOp::ClearLine);

        let end = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
        let mut run = String::new();
        let mut run_style = self.active;

        for cell in &row[..end] {
            let Some(ch) = cell.character() else {
                continue;
            };
            if cell.style != run_style && !run.is_empty() {
                self.flush_run(&mut run, run_style);
            }
            run_style = cell.style;
            run.push(ch);
        }
        self.flush_run(&mut run, run_style);
    }

    fn flush_run(&mut self, run: &mut String, style: Style) {
        if run.is_empty() {
            return;
        }
        self.set_style(style);
        self.ops.push(DiffOp::WriteBytes(std::mem::take(run).into_bytes()));
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
