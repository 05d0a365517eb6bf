// SPDX-License-Identifier: MIT
//
// Cell: the atomic unit of terminal rendering.
//
// Every character position on screen is a Cell: a Unicode codepoint plus a
// Style. The whole pipeline exists to produce, diff, and encode these.
//
// Styles are plain values. Two cells look the same exactly when their
// styles compare equal, which is what lets the differ group runs and the
// encoder drop redundant SGR sequences without any identity tracking.
//
// Colors are indexed (the 256-color palette) or absent (terminal default).
// Indexed colors encode as `38;5;N` / `48;5;N` unconditionally, so the wire
// format never depends on which half of the palette a color falls in.
//
// Wide characters (CJK, some emoji) occupy two columns. The first cell
// holds the codepoint; the second is a continuation cell (ch = 0) carrying
// the same style so that reverse-video and backgrounds fill both columns.

// ─── Text Attributes ─────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Text attributes stored as a compact bitfield.
    ///
    /// These map directly to SGR parameters. Combine with bitwise OR:
    ///
    /// ```
    /// use n_render::cell::Attr;
    ///
    /// let style = Attr::BOLD | Attr::ITALIC;
    /// assert!(style.contains(Attr::BOLD));
    /// assert!(!style.contains(Attr::DIM));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Attr: u8 {
        /// SGR 1: increased intensity.
        const BOLD      = 1 << 0;
        /// SGR 2: decreased intensity (faint).
        const DIM       = 1 << 1;
        /// SGR 3: italic.
        const ITALIC    = 1 << 2;
        /// SGR 4: single underline.
        const UNDERLINE = 1 << 3;
        /// SGR 7: swap foreground and background.
        const REVERSE   = 1 << 4;
    }
}

/// SGR parameter for each attribute, in wire order.
const ATTR_CODES: [(Attr, u8); 5] = [
    (Attr::BOLD, 1),
    (Attr::DIM, 2),
    (Attr::ITALIC, 3),
    (Attr::UNDERLINE, 4),
    (Attr::REVERSE, 7),
];

// ─── Style ───────────────────────────────────────────────────────────────────

/// The complete visual style of a cell.
///
/// `fg` / `bg` are 256-color palette indices; `None` means the terminal's
/// default color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub attrs: Attr,
    pub fg: Option<u8>,
    pub bg: Option<u8>,
}

impl Style {
    /// No attributes, default colors.
    pub const DEFAULT: Self = Self {
        attrs: Attr::empty(),
        fg: None,
        bg: None,
    };

    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self::DEFAULT
    }

    #[inline]
    #[must_use]
    pub const fn attrs(self, attrs: Attr) -> Self {
        Self { attrs, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn fg(self, index: u8) -> Self {
        Self {
            fg: Some(index),
            ..self
        }
    }

    #[inline]
    #[must_use]
    pub const fn bg(self, index: u8) -> Self {
        Self {
            bg: Some(index),
            ..self
        }
    }

    /// The same style with colors stripped, for terminals without color.
    #[inline]
    #[must_use]
    pub const fn without_colors(self) -> Self {
        Self {
            attrs: self.attrs,
            fg: None,
            bg: None,
        }
    }

    /// Whether this is the terminal's default rendition.
    #[inline]
    #[must_use]
    pub fn is_default(self) -> bool {
        self == Self::DEFAULT
    }

    /// Whether switching from `self` to `next` can be done by only adding
    /// codes. If `self` has anything `next` lacks, SGR 0 must come first.
    #[must_use]
    pub fn is_subset_of(self, next: Self) -> bool {
        next.attrs.contains(self.attrs)
            && (self.fg.is_none() || self.fg == next.fg)
            && (self.bg.is_none() || self.bg == next.bg)
    }

    /// SGR parameters in wire order: bold, dim, italic, underline, reverse,
    /// foreground (`38;5;N`), background (`48;5;N`).
    ///
    /// ```
    /// use n_render::cell::{Attr, Style};
    ///
    /// let style = Style::new().attrs(Attr::BOLD).fg(3);
    /// assert_eq!(style.sgr_params(), "1;38;5;3");
    /// assert_eq!(Style::DEFAULT.sgr_params(), "");
    /// ```
    #[must_use]
    pub fn sgr_params(self) -> String {
        let mut parts: Vec<String> = ATTR_CODES
            .iter()
            .filter(|(flag, _)| self.attrs.contains(*flag))
            .map(|(_, code)| code.to_string())
            .collect();
        if let Some(fg) = self.fg {
            parts.push(format!("38;5;{fg}"));
        }
        if let Some(bg) = self.bg {
            parts.push(format!("48;5;{bg}"));
        }
        parts.join(";")
    }
}

// ─── Cell ────────────────────────────────────────────────────────────────────

/// A single terminal cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    /// Unicode codepoint to display.
    ///
    /// - `0` = continuation cell (second column of a wide character)
    /// - `b' '` (32) = empty / space (the default)
    pub ch: u32,
    pub style: Style,
}

/// Continuation marker: a cell whose `ch` is 0 belongs to the preceding
/// wide character and produces no character output.
const CONTINUATION: u32 = 0;

const SPACE: u32 = b' ' as u32;

impl Cell {
    /// Space, default style.
    pub const EMPTY: Self = Self {
        ch: SPACE,
        style: Style::DEFAULT,
    };

    #[inline]
    #[must_use]
    pub const fn new(ch: char) -> Self {
        Self {
            ch: ch as u32,
            style: Style::DEFAULT,
        }
    }

    #[inline]
    #[must_use]
    pub const fn styled(ch: char, style: Style) -> Self {
        Self {
            ch: ch as u32,
            style,
        }
    }

    /// The second column of a wide character, sharing its style.
    #[inline]
    #[must_use]
    pub const fn continuation(style: Style) -> Self {
        Self {
            ch: CONTINUATION,
            style,
        }
    }

    #[inline]
    #[must_use]
    pub const fn is_continuation(self) -> bool {
        self.ch == CONTINUATION
    }

    /// Whether this cell is a space in the default style. Trailing empty
    /// cells are never written; clear-line produces them for free.
    #[inline]
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.ch == SPACE && self.style.is_default()
    }

    /// The codepoint as a `char`. `None` for continuation cells.
    #[inline]
    #[must_use]
    pub const fn character(self) -> Option<char> {
        if self.ch == CONTINUATION {
            return None;
        }
        char::from_u32(self.ch)
    }

    #[inline]
    #[must_use]
    pub const fn with_style(self, style: Style) -> Self {
        Self { style, ..self }
    }
}

impl Default for Cell {
    #[inline]
    fn default() -> Self {
        Self::EMPTY
    }
}

impl std::fmt::Debug for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_continuation() {
            return write!(f, "Cell(continuation)");
        }
        let ch = char::from_u32(self.ch).unwrap_or('?');
        write!(f, "Cell({ch:?}")?;
        if !self.style.is_default() {
            write!(f, ", {:?}", self.style)?;
        }
        write!(f, ")")
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
