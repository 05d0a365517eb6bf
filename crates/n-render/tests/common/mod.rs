// SPDX-License-Identifier: MIT
//
// Shared helpers for the integration tests.
//
// `TerminalModel` is a small VT interpreter covering exactly the subset the
// encoder emits: cursor position, erase line, erase display, SGR, cursor
// visibility, CR and LF. Feeding it an encoded frame and comparing the
// result with the buffer the frame was diffed from is how the tests check
// that what reaches the terminal is what was painted.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use n_render::buffer::{TerminalBuffer, char_width};
use n_render::cell::{Attr, Cell, Style};
use n_render::geometry::Size;
use n_render::node::{Canvas, Fingerprint, NodeId, Renderable};

// ─── TerminalModel ──────────────────────────────────────────────────────────

pub struct TerminalModel {
    size: Size,
    cells: Vec<Cell>,
    x: u16,
    y: u16,
    style: Style,
    cursor_visible: bool,
}

impl TerminalModel {
    pub fn new(size: Size) -> Self {
        Self {
            size,
            cells: vec![Cell::EMPTY; usize::from(size.width) * usize::from(size.height)],
            x: 0,
            y: 0,
            style: Style::DEFAULT,
            cursor_visible: true,
        }
    }

    /// A terminal already showing `buffer`.
    pub fn showing(buffer: &TerminalBuffer) -> Self {
        let mut model = Self::new(buffer.size());
        model.cells = buffer.rows().flatten().copied().collect();
        model
    }

    pub const fn cursor_visible(&self) -> bool {
        self.cursor_visible
    }

    pub const fn style(&self) -> Style {
        self.style
    }

    pub fn cell(&self, x: u16, y: u16) -> Cell {
        self.cells[self.index(x, y)]
    }

    pub fn row_text(&self, y: u16) -> String {
        let start = self.index(0, y);
        let row = &self.cells[start..start + usize::from(self.size.width)];
        row.iter()
            .filter_map(|c| c.character())
            .collect::<String>()
            .trim_end()
            .to_owned()
    }

    /// Panics with the first differing cell if the screen doesn't show
    /// exactly `buffer`.
    pub fn assert_shows(&self, buffer: &TerminalBuffer) {
        assert_eq!(self.size, buffer.size(), "screen size");
        for y in 0..self.size.height {
            for x in 0..self.size.width {
                let expected = buffer.get(x, y).copied().unwrap_or_default();
                assert_eq!(self.cell(x, y), expected, "cell ({x}, {y})");
            }
        }
    }

    pub fn feed(&mut self, bytes: &[u8]) {
        let text = std::str::from_utf8(bytes).expect("encoder output is UTF-8");
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '\x1b' => {
                    assert_eq!(chars.next(), Some('['), "only CSI sequences are emitted");
                    let private = chars.next_if_eq(&'?').is_some();
                    let mut params = String::new();
                    while let Some(c) = chars.next_if(|c| c.is_ascii_digit() || *c == ';') {
                        params.push(c);
                    }
                    let fin = chars.next().expect("CSI final byte");
                    self.csi(private, &params, fin);
                }
                '\r' => self.x = 0,
                '\n' => {
                    assert!(self.y + 1 < self.size.height, "line feed would scroll");
                    self.y += 1;
                }
                _ => self.print(ch),
            }
        }
    }

    fn csi(&mut self, private: bool, params: &str, fin: char) {
        let nums: Vec<u16> = params
            .split(';')
            .map(|p| if p.is_empty() { 0 } else { p.parse().expect("numeric parameter") })
            .collect();
        let first = nums.first().copied().unwrap_or(0);

        match (private, fin) {
            (true, 'h' | 'l') => {
                if first == 25 {
                    self.cursor_visible = fin == 'h';
                }
            }
            (false, 'H') => {
                let row = nums.first().copied().unwrap_or(1).max(1);
                let col = nums.get(1).copied().unwrap_or(1).max(1);
                self.y = (row - 1).min(self.size.height.saturating_sub(1));
                self.x = (col - 1).min(self.size.width.saturating_sub(1));
            }
            (false, 'J') => {
                assert_eq!(first, 2, "only full-screen erase is emitted");
                let blank = self.blank();
                self.cells.fill(blank);
            }
            (false, 'K') => {
                let blank = self.blank();
                for x in self.x..self.size.width {
                    let idx = self.index(x, self.y);
                    self.cells[idx] = blank;
                }
            }
            (false, 'm') => self.sgr(&nums),
            other => panic!("unexpected sequence {other:?} with params {params:?}"),
        }
    }

    fn sgr(&mut self, nums: &[u16]) {
        let mut i = 0;
        while i < nums.len() {
            match nums[i] {
                0 => self.style = Style::DEFAULT,
                1 => self.style.attrs |= Attr::BOLD,
                2 => self.style.attrs |= Attr::DIM,
                3 => self.style.attrs |= Attr::ITALIC,
                4 => self.style.attrs |= Attr::UNDERLINE,
                7 => self.style.attrs |= Attr::REVERSE,
                38 | 48 => {
                    assert_eq!(nums.get(i + 1), Some(&5), "only 256-color SGR is emitted");
                    let index = u8::try_from(nums[i + 2]).expect("palette index");
                    if nums[i] == 38 {
                        self.style.fg = Some(index);
                    } else {
                        self.style.bg = Some(index);
                    }
                    i += 2;
                }
                other => panic!("unexpected SGR code {other}"),
            }
            i += 1;
        }
    }

    fn print(&mut self, ch: char) {
        let w = u16::try_from(char_width(ch)).expect("narrow or wide");
        if w == 0 {
            return;
        }
        assert!(self.x + w <= self.size.width, "write past the right margin at row {}", self.y);

        let idx = self.index(self.x, self.y);
        self.cells[idx] = Cell::styled(ch, self.style);
        if w == 2 {
            self.cells[idx + 1] = Cell::continuation(self.style);
        }
        // Pending-wrap: the cursor may rest one past the last column.
        self.x += w;
    }

    /// Erase fills with the current background and nothing else.
    const fn blank(&self) -> Cell {
        Cell::styled(
            ' ',
            Style {
                attrs: Attr::empty(),
                fg: None,
                bg: self.style.bg,
            },
        )
    }

    fn index(&self, x: u16, y: u16) -> usize {
        usize::from(y) * usize::from(self.size.width) + usize::from(x)
    }
}

// ─── Probe ──────────────────────────────────────────────────────────────────

/// A one-line leaf that counts how often it is painted.
pub struct Probe {
    id: NodeId,
    text: String,
    paints: Arc<AtomicU32>,
}

impl Probe {
    pub fn new(id: NodeId, text: &str, paints: &Arc<AtomicU32>) -> Arc<Self> {
        Arc::new(Self {
            id,
            text: text.to_owned(),
            paints: Arc::clone(paints),
        })
    }
}

impl Renderable for Probe {
    fn id(&self) -> NodeId {
        self.id
    }

    fn measure(&self, available: Size) -> Size {
        let width = u16::try_from(self.text.chars().count()).unwrap_or(u16::MAX);
        Size::new(width, 1).min(available)
    }

    fn render(&self, canvas: &mut Canvas<'_>) {
        self.paints.fetch_add(1, Ordering::Relaxed);
        canvas.write(0, 0, &self.text, Style::DEFAULT);
    }

    fn structural_hash(&self) -> Fingerprint {
        Fingerprint::of(&self.text)
    }
}

pub fn paints(counter: &Arc<AtomicU32>) -> u32 {
    counter.load(Ordering::Relaxed)
}
