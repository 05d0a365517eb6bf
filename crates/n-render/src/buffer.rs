// SPDX-License-Identifier: MIT
//
// TerminalBuffer: the 2D cell grid every node paints to.
//
// The renderer keeps two of these: the frame being painted and the frame the
// terminal is known to show. The differ compares them row by row; the walker
// blits cached surfaces into them; nodes write styled text into them through
// a clipped Canvas.
//
// Design:
//
//   - Flat `Vec<Cell>` with row-major indexing. A row's cells are contiguous,
//     so row equality is a single slice comparison and surfaces can be
//     captured and blitted with `copy_from_slice`.
//
//   - Writes never wrap and never fail. Text that runs past the right edge is
//     cut, rows outside the buffer are ignored. Painting is viewport-culled
//     upstream; by the time text gets here, dropping the overflow is correct.
//
//   - Wide characters occupy two columns: the lead cell holds the codepoint,
//     the next cell is a continuation (ch = 0). Every mutation keeps pairs
//     intact: overwriting either half of a wide character blanks the other
//     half, and a wide character that doesn't fit becomes a space. A half
//     glyph on screen is garbage in every terminal.

use unicode_width::UnicodeWidthChar;

use crate::cell::{Cell, Style};
use crate::geometry::{Point, Rect, Size};

// ─── TerminalBuffer ─────────────────────────────────────────────────────────

/// A 2D buffer of styled cells.
///
/// # Examples
///
/// ```
/// use n_render::buffer::TerminalBuffer;
/// use n_render::cell::Style;
/// use n_render::geometry::{Point, Size};
///
/// let mut buf = TerminalBuffer::new(Size::new(8, 2));
/// buf.write("hello, world", Point::new(0, 1), Style::DEFAULT);
/// assert_eq!(buf.line_text(1).as_deref(), Some("hello, w"));
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct TerminalBuffer {
    size: Size,
    cells: Vec<Cell>,
}

impl TerminalBuffer {
    // ─── Construction ────────────────────────────────────────────────────

    /// Create a buffer filled with empty cells.
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            size,
            cells: vec![Cell::EMPTY; size.area() as usize],
        }
    }

    /// Build a buffer from plain text rows, each padded or cut to `width`.
    /// Mostly for tests and fixtures.
    #[must_use]
    pub fn from_lines(width: u16, lines: &[&str]) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let height = lines.len().min(usize::from(u16::MAX)) as u16;
        let mut buf = Self::new(Size::new(width, height));
        for (y, line) in (0..height).zip(lines) {
            buf.write(line, Point::new(0, y), Style::DEFAULT);
        }
        buf
    }

    // ─── Accessors ───────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.size
    }

    #[inline]
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.size.width
    }

    #[inline]
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.size.height
    }

    /// The whole buffer as a rectangle at the origin.
    #[inline]
    #[must_use]
    pub const fn bounds(&self) -> Rect {
        Rect::from_size(self.size)
    }

    #[inline]
    #[must_use]
    pub const fn in_bounds(&self, x: u16, y: u16) -> bool {
        x < self.size.width && y < self.size.height
    }

    #[inline]
    const fn index(&self, x: u16, y: u16) -> usize {
        y as usize * self.size.width as usize + x as usize
    }

    #[inline]
    #[must_use]
    pub fn get(&self, x: u16, y: u16) -> Option<&Cell> {
        if self.in_bounds(x, y) {
            Some(&self.cells[self.index(x, y)])
        } else {
            None
        }
    }

    /// A single row as a slice. `None` if `y` is out of bounds.
    #[inline]
    #[must_use]
    pub fn row(&self, y: u16) -> Option<&[Cell]> {
        if y < self.size.height {
            let start = self.index(0, y);
            Some(&self.cells[start..start + usize::from(self.size.width)])
        } else {
            None
        }
    }

    /// Iterate rows top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        // chunks_exact panics on 0; a zero-width buffer has no cells anyway.
        self.cells
            .chunks_exact(usize::from(self.size.width).max(1))
            .take(usize::from(self.size.height))
    }

    /// The visible text of a row, continuation cells skipped and trailing
    /// spaces trimmed.
    #[must_use]
    pub fn line_text(&self, y: u16) -> Option<String> {
        let row = self.row(y)?;
        let text: String = row.iter().filter_map(|c| c.character()).collect();
        Some(text.trim_end_matches(' ').to_owned())
    }

    /// All rows as plain text joined by `\n`. This is the whole frame for
    /// sinks that are not terminals.
    #[must_use]
    pub fn to_plain_text(&self) -> String {
        (0..self.size.height)
            .filter_map(|y| self.line_text(y))
            .collect::<Vec<_>>()
            .join("\n")
    }

    // ─── Clear & Resize ──────────────────────────────────────────────────

    /// Reset every cell to an empty, default-styled space.
    pub fn clear(&mut self) {
        self.cells.fill(Cell::EMPTY);
    }

    /// Resize to `size`, keeping the cells that overlap the old grid.
    ///
    /// A no-op when the size is unchanged. Newly exposed cells are empty. A
    /// wide character cut in half by a narrower width becomes a space.
    pub fn prepare(&mut self, size: Size) {
        if size == self.size {
            return;
        }

        let mut cells = vec![Cell::EMPTY; size.area() as usize];
        let keep_w = usize::from(self.size.width.min(size.width));
        let keep_h = self.size.height.min(size.height);
        let new_w = usize::from(size.width);

        if keep_w > 0 {
            for y in 0..keep_h {
                let src = self.index(0, y);
                let dst = usize::from(y) * new_w;
                cells[dst..dst + keep_w].copy_from_slice(&self.cells[src..src + keep_w]);

                // Lead cell whose continuation fell off the new right edge.
                let last = dst + keep_w - 1;
                if keep_w < usize::from(self.size.width)
                    && self.cells[src + keep_w].is_continuation()
                {
                    cells[last].ch = u32::from(b' ');
                }
            }
        }

        self.size = size;
        self.cells = cells;
    }

    // ─── Direct Cell Access ──────────────────────────────────────────────

    /// Write a cell with wide-character cleanup. Returns `false` when out
    /// of bounds.
    pub fn set(&mut self, x: u16, y: u16, cell: Cell) -> bool {
        if !self.in_bounds(x, y) {
            return false;
        }
        self.break_wide_char_at(x, y);
        let idx = self.index(x, y);
        self.cells[idx] = cell;
        true
    }

    /// Break any wide character that touches `(x, y)`.
    ///
    /// - If `(x, y)` is a continuation, the owner at `x - 1` becomes a space.
    /// - If the cell after `(x, y)` is a continuation, it belonged to a wide
    ///   character starting here and is cleared.
    fn break_wide_char_at(&mut self, x: u16, y: u16) {
        let idx = self.index(x, y);

        if self.cells[idx].is_continuation() && x > 0 {
            self.cells[idx - 1].ch = u32::from(b' ');
        }

        if x + 1 < self.size.width && self.cells[idx + 1].is_continuation() {
            self.cells[idx + 1] = Cell::EMPTY;
        }
    }

    /// Place the continuation half of a wide character at `(x, y)`.
    ///
    /// Only the right-hand neighbour needs cleanup: the left-hand cell is
    /// the lead that was just written.
    fn set_continuation(&mut self, x: u16, y: u16, style: Style) {
        let idx = self.index(x, y);
        if x + 1 < self.size.width && self.cells[idx + 1].is_continuation() {
            self.cells[idx + 1] = Cell::EMPTY;
        }
        self.cells[idx] = Cell::continuation(style);
    }

    // ─── Text ────────────────────────────────────────────────────────────

    /// Write a styled run starting at `at`, never wrapping.
    ///
    /// Returns the number of columns consumed. Rows outside the buffer are
    /// silently ignored; text past the right edge is dropped.
    pub fn write(&mut self, text: &str, at: Point, style: Style) -> u16 {
        self.write_clipped(text, at, style, self.bounds())
    }

    /// Like [`write`](Self::write), but only cells inside `clip` are touched.
    ///
    /// Columns left of the clip still advance the pen, so a run that starts
    /// off to the left shows its visible tail at the right place. A wide
    /// character straddling a clip edge paints a space in its visible half.
    pub fn write_clipped(&mut self, text: &str, at: Point, style: Style, clip: Rect) -> u16 {
        let Some(clip) = clip.intersect(self.bounds()) else {
            return 0;
        };
        let y = at.y;
        if u32::from(y) < clip.top() || u32::from(y) >= clip.bottom() {
            return 0;
        }

        let (left, right) = (clip.left(), clip.right());
        let mut col = u32::from(at.x);

        for ch in text.chars() {
            if col >= right {
                break;
            }
            let w = char_width(ch) as u32;
            if w == 0 {
                continue;
            }

            let visible_from = col.max(left);
            let end = col + w;
            let fits = end <= right;

            // Both `col` and `visible_from` are below `right`, which came
            // from a u16-bounded rectangle.
            #[allow(clippy::cast_possible_truncation)]
            if w == 2 && col >= left && fits {
                self.set(col as u16, y, Cell::styled(ch, style));
                self.set_continuation(col as u16 + 1, y, style);
            } else if w == 1 && col >= left {
                self.set(col as u16, y, Cell::styled(ch, style));
            } else {
                // Partially visible wide character: blank what shows.
                for x in visible_from..end.min(right) {
                    self.set(x as u16, y, Cell::styled(' ', style));
                }
            }

            col = end;
        }

        #[allow(clippy::cast_possible_truncation)]
        let consumed = col.min(right).saturating_sub(u32::from(at.x)) as u16;
        consumed
    }

    /// Fill a rectangle with `cell`, clipped to the buffer.
    pub fn fill(&mut self, rect: Rect, cell: Cell) {
        let Some(area) = rect.intersect(self.bounds()) else {
            return;
        };
        let (x0, x1) = (area.origin.x, area.origin.x + area.size.width);
        for y in area.origin.y..area.origin.y + area.size.height {
            for x in x0..x1 {
                self.set(x, y, cell);
            }
        }
    }

    // ─── Surfaces ────────────────────────────────────────────────────────

    /// Copy out the rows covered by `rect` (clipped to the buffer).
    ///
    /// Returns the clipped rectangle and one boxed slice per row. Empty when
    /// `rect` lies outside the buffer.
    #[must_use]
    pub fn capture(&self, rect: Rect) -> (Rect, Vec<Box<[Cell]>>) {
        let Some(area) = rect.intersect(self.bounds()) else {
            return (Rect::new(rect.origin, Size::ZERO), Vec::new());
        };
        let x = area.origin.x;
        let w = usize::from(area.size.width);
        let lines = (area.origin.y..area.origin.y + area.size.height)
            .map(|y| {
                let start = self.index(x, y);
                self.cells[start..start + w].into()
            })
            .collect();
        (area, lines)
    }

    /// Copy `lines` into the buffer with their top-left cell at `at`,
    /// touching only cells inside `clip`.
    ///
    /// Wide characters cut by the clip edges are repaired so no half glyph
    /// survives at either side of the blitted region.
    pub fn blit(&mut self, lines: &[Box<[Cell]>], at: Point, clip: Rect) {
        let Some(clip) = clip.intersect(self.bounds()) else {
            return;
        };

        for (dy, line) in lines.iter().enumerate() {
            let y = u32::from(at.y) + dy as u32;
            if y < clip.top() {
                continue;
            }
            if y >= clip.bottom() {
                break;
            }

            let x_start = u32::from(at.x).max(clip.left());
            let x_end = (u32::from(at.x) + line.len() as u32).min(clip.right());
            if x_end <= x_start {
                continue;
            }

            // y < clip.bottom() and x_* ≤ clip.right(), all u16-bounded.
            #[allow(clippy::cast_possible_truncation)]
            let (y, x_start, x_end) = (y as u16, x_start as u16, x_end as u16);
            let src = usize::from(x_start - at.x);
            let len = usize::from(x_end - x_start);
            let dst = self.index(x_start, y);

            self.break_wide_char_at(x_start, y);
            if x_end - x_start > 1 {
                self.break_wide_char_at(x_end - 1, y);
            }
            self.cells[dst..dst + len].copy_from_slice(&line[src..src + len]);
            self.repair_row_edges(y, x_start, x_end);
        }
    }

    /// After a raw copy into `[x0, x1)` of row `y`, fix wide characters
    /// split by either edge.
    fn repair_row_edges(&mut self, y: u16, x0: u16, x1: u16) {
        let first = self.index(x0, y);
        if self.cells[first].is_continuation() {
            self.cells[first].ch = u32::from(b' ');
        }

        let last = self.index(x1 - 1, y);
        let lead_is_wide = self.cells[last]
            .character()
            .is_some_and(|ch| char_width(ch) == 2);
        let has_continuation = x1 < self.size.width && self.cells[last + 1].is_continuation();
        if lead_is_wide && !has_continuation {
            self.cells[last].ch = u32::from(b' ');
        }
    }

    // ─── Comparison ──────────────────────────────────────────────────────

    /// Row indices whose content differs from `other`.
    ///
    /// A size mismatch reports every row of `self` as changed.
    #[must_use]
    pub fn diff(&self, other: &Self) -> Vec<u16> {
        if self.size != other.size {
            return (0..self.size.height).collect();
        }
        (0..self.size.height)
            .filter(|&y| self.row(y) != other.row(y))
            .collect()
    }

    /// Overwrite this buffer with `other`, reusing the allocation when the
    /// sizes match.
    pub fn copy_from(&mut self, other: &Self) {
        if self.size == other.size {
            self.cells.copy_from_slice(&other.cells);
        } else {
            self.clone_from(other);
        }
    }
}

impl std::fmt::Debug for TerminalBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "TerminalBuffer({}x{})", self.size.width, self.size.height)
    }
}

// ─── Text Width Utilities ───────────────────────────────────────────────────

/// Display width of a character in terminal columns: 0 for control and
/// combining characters, 2 for wide characters, 1 otherwise.
///
/// ```
/// use n_render::buffer::char_width;
///
/// assert_eq!(char_width('a'), 1);
/// assert_eq!(char_width('中'), 2);
/// assert_eq!(char_width('\n'), 0);
/// ```
#[inline]
#[must_use]
pub fn char_width(ch: char) -> usize {
    ch.width().unwrap_or(0)
}

/// Display width of a string in terminal columns.
#[must_use]
pub fn string_width(s: &str) -> usize {
    s.chars().map(char_width).sum()
}

// ─── Tests ──────────────────────────────────────────────────────────────────
