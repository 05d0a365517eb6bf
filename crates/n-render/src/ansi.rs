// SPDX-License-Identifier: MIT
//
// ANSI escape sequence generation.
//
// Pure functions that write escape sequences to any `impl Write`. No state,
// no decisions about when to emit. The encoder decides; this module only
// knows the byte-level encoding of the handful of commands a frame needs.
//
// Cursor positions are 0-indexed in our API and converted to 1-indexed for
// the terminal (CUP is 1-based).
//
// All functions return `io::Result` propagated from the underlying writer.
// In practice they never fail: the encoder writes into a `Vec<u8>`.

use std::io::{self, Write};

use crate::cell::Style;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// Move the cursor to `(x, y)` with CUP.
#[inline]
pub fn cursor_to(w: &mut impl Write, x: u16, y: u16) -> io::Result<()> {
    write!(w, "\x1b[{};{}H", u32::from(y) + 1, u32::from(x) + 1)
}

/// Move the cursor to the top-left corner.
#[inline]
pub fn cursor_home(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[H")
}

/// Hide the cursor (DECTCEM reset).
#[inline]
pub fn cursor_hide(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25l")
}

/// Show the cursor (DECTCEM set).
#[inline]
pub fn cursor_show(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?25h")
}

/// Carriage return plus line feed: start of the next row.
#[inline]
pub fn crlf(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\r\n")
}

// ─── Erase ───────────────────────────────────────────────────────────────────

/// Clear the whole screen (ED 2) and home the cursor.
///
/// ED 2 alone leaves the cursor where it was; every caller wants it at the
/// origin afterwards, so the two always travel together.
#[inline]
pub fn clear_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[2J")?;
    cursor_home(w)
}

/// Erase from the cursor to the end of the line (EL 0).
#[inline]
pub fn clear_line(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[K")
}

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Reset all SGR attributes to terminal defaults (SGR 0).
///
/// This clears everything. Whoever tracks the active style must treat it
/// as default afterwards.
#[inline]
pub fn reset(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[0m")
}

/// Emit the complete style as one CSI sequence.
///
/// Codes are semicolon-joined in the fixed wire order (see
/// [`Style::sgr_params`]). A style with no codes degenerates to SGR 0.
///
/// ```
/// use n_render::ansi;
/// use n_render::cell::{Attr, Style};
///
/// let mut out = Vec::new();
/// ansi::sgr(&mut out, Style::new().attrs(Attr::BOLD).fg(3)).unwrap();
/// assert_eq!(out, b"\x1b[1;38;5;3m");
/// ```
pub fn sgr(w: &mut impl Write, style: Style) -> io::Result<()> {
    let params = style.sgr_params();
    if params.is_empty() {
        return reset(w);
    }
    write!(w, "\x1b[{params}m")
}

// ─── Alternate Screen ────────────────────────────────────────────────────────

/// Switch to the alternate screen buffer (DECSET 1049).
#[inline]
pub fn enter_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049h")
}

/// Return to the main screen buffer (DECRST 1049).
#[inline]
pub fn exit_alt_screen(w: &mut impl Write) -> io::Result<()> {
    w.write_all(b"\x1b[?1049l")
}

// ─── Tests ───────────────────────────────────────────────────────────────────
