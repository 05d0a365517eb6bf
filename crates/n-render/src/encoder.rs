// SPDX-License-Identifier: MIT
//
// Encoder: serializes a frame's ops into one contiguous byte stream.
//
// Frame layout:
//
//   hide cursor · ops… · reset attributes · show cursor
//
// The encoder keeps one piece of terminal state: the active style. It
// starts every frame at the default (the previous frame's trailer reset
// it), and a set-attribute matching it costs zero bytes. A transition that
// only adds attributes or colors emits just the additions; one that removes
// anything emits SGR 0 first and then the full target style.
//
// Content writes are coalesced. Consecutive write ops are gathered into a
// pending run of at most `max_chunk` bytes before being appended, and any
// other op flushes the run first so ordering is preserved.
//
// The output buffer is reused across frames and pre-sized from a moving
// estimate of recent frame sizes plus a quarter of headroom. Steady-state
// frames never reallocate; a one-off huge frame doesn't pin memory forever.
//
// All output goes through the write guard: one encode and one hand-off per
// frame, each presenting the renderer's token.

use crate::ansi;
use crate::buffer::TerminalBuffer;
use crate::cell::Style;
use crate::diff::{DiffOp, DiffOps};
use crate::guard::{WriteGuard, WriteToken};

/// Floor for the moving frame-size estimate.
const MIN_ESTIMATE: usize = 1024;

// ─── Encoder ────────────────────────────────────────────────────────────────

/// Stateful op-to-bytes serializer owning the renderer's write guard.
#[derive(Debug)]
pub struct Encoder {
    guard: WriteGuard,
    out: Vec<u8>,
    pending: Vec<u8>,
    active: Style,
    estimate: usize,
    max_chunk: usize,
}

impl Encoder {
    /// A new encoder and the token that drives it.
    ///
    /// `max_chunk` bounds a single coalesced write run.
    #[must_use]
    pub fn new(max_chunk: usize) -> (Self, WriteToken) {
        let (guard, token) = WriteGuard::mint();
        let encoder = Self {
            guard,
            out: Vec::with_capacity(MIN_ESTIMATE),
            pending: Vec::new(),
            active: Style::DEFAULT,
            estimate: MIN_ESTIMATE,
            max_chunk: max_chunk.max(1),
        };
        (encoder, token)
    }

    /// Open a new frame on the guard.
    pub fn begin_frame(&mut self) {
        self.guard.begin_frame();
    }

    /// Refuse all further output.
    pub fn revoke(&mut self) {
        self.guard.revoke();
    }

    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.guard.is_revoked()
    }

    /// Bytes of the last encoded frame.
    #[inline]
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.out
    }

    /// The current moving estimate of frame size in bytes.
    #[inline]
    #[must_use]
    pub const fn estimate(&self) -> usize {
        self.estimate
    }

    /// Encode `ops` as an escape-sequence stream. Returns the byte count,
    /// or `None` if the guard refused.
    pub fn encode(&mut self, token: &WriteToken, ops: &DiffOps) -> Option<usize> {
        if !self.guard.admit_encode(token) {
            return None;
        }
        self.start();

        ansi::cursor_hide(&mut self.out).ok();
        for op in ops {
            match op {
                DiffOp::SetAttribute(style) => self.set_style(*style),
                DiffOp::WriteBytes(bytes) => self.push_bytes(bytes),
                DiffOp::MoveCursor { x, y } => {
                    self.flush_pending();
                    ansi::cursor_to(&mut self.out, *x, *y).ok();
                }
                DiffOp::ClearLine => {
                    self.flush_pending();
                    ansi::clear_line(&mut self.out).ok();
                }
                DiffOp::ClearScreen => {
                    self.flush_pending();
                    ansi::clear_screen(&mut self.out).ok();
                }
            }
        }
        self.flush_pending();
        ansi::reset(&mut self.out).ok();
        ansi::cursor_show(&mut self.out).ok();
        self.active = Style::DEFAULT;

        Some(self.finish())
    }

    /// Encode `buffer` as plain text for sinks that aren't terminals: rows
    /// right-trimmed, newline-terminated, no escape sequences.
    pub fn encode_plain(&mut self, token: &WriteToken, buffer: &TerminalBuffer) -> Option<usize> {
        if !self.guard.admit_encode(token) {
            return None;
        }
        self.start();
        self.out.extend_from_slice(buffer.to_plain_text().as_bytes());
        self.out.push(b'\n');
        Some(self.finish())
    }

    /// Release the encoded frame for the single sink write.
    pub fn handoff(&mut self, token: &WriteToken) -> Option<&[u8]> {
        if self.guard.admit_write(token) {
            Some(&self.out)
        } else {
            None
        }
    }

    // ── Internals ───────────────────────────────────────────────────────

    fn start(&mut self) {
        let target = self.estimate + self.estimate / 4;
        self.out.clear();
        if self.out.capacity() > target * 4 {
            self.out.shrink_to(target);
        }
        self.out.reserve(target);
        self.pending.clear();
        self.active = Style::DEFAULT;
    }

    fn finish(&mut self) -> usize {
        let len = self.out.len();
        self.estimate = ((self.estimate * 3 + len) / 4).max(MIN_ESTIMATE);
        len
    }

    fn set_style(&mut self, style: Style) {
        if style == self.active {
            return;
        }
        self.flush_pending();

        if style.is_default() {
            ansi::reset(&mut self.out).ok();
        } else if self.active.is_subset_of(style) {
            ansi::sgr(&mut self.out, additions(self.active, style)).ok();
        } else {
            ansi::reset(&mut self.out).ok();
            ansi::sgr(&mut self.out, style).ok();
        }
        self.active = style;
    }

    fn push_bytes(&mut self, bytes: &[u8]) {
        if !self.pending.is_empty() && self.pending.len() + bytes.len() > self.max_chunk {
            self.flush_pending();
        }
        self.pending.extend_from_slice(bytes);
        if self.pending.len() >= self.max_chunk {
            self.flush_pending();
        }
    }

    fn flush_pending(&mut self) {
        if !self.pending.is_empty() {
            self.out.extend_from_slice(&self.pending);
            self.pending.clear();
        }
    }
}

/// What `next` adds on top of `current`, given `current ⊆ next`.
fn additions(current: Style, next: Style) -> Style {
    Style {
        attrs: next.attrs.difference(current.attrs),
        fg: next.fg.filter(|_| next.fg != current.fg),
        bg: next.bg.filter(|_| next.bg != current.bg),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::Attr;
    use crate::diff::{BufferDiffer, DiffMode};
    use pretty_assertions::assert_eq;

    fn ops(list: Vec<DiffOp>) -> DiffOps {
        let mut ops = DiffOps::new();
        for op in list {
            ops.push(op);
        }
        ops
    }

    fn encode(list: Vec<DiffOp>) -> String {
        let (mut enc, token) = Encoder::new(4096);
        enc.begin_frame();
        enc.encode(&token, &ops(list)).unwrap();
        String::from_utf8(enc.bytes().to_vec()).unwrap()
    }

    // ── Frame layout ────────────────────────────────────────────────────

    #[test]
    fn full_redraw_bytes() {
        let next = TerminalBuffer::from_lines(5, &["HELLO"]);
        let diff = BufferDiffer::new(DiffMode::Sparse).diff(None, &next, next.size());
        let (mut enc, token) = Encoder::new(4096);
        enc.begin_frame();
        enc.encode(&token, &diff).unwrap();
        assert_eq!(
            String::from_utf8(enc.bytes().to_vec()).unwrap(),
            "\x1b[?25l\x1b[2J\x1b[H\x1b[KHELLO\x1b[0m\x1b[?25h"
        );
    }

    #[test]
    fn incremental_bytes() {
        let got = encode(vec![
            DiffOp::MoveCursor { x: 0, y: 1 },
            DiffOp::ClearLine,
            DiffOp::WriteBytes(b"CCCC".to_vec()),
        ]);
        assert_eq!(got, "\x1b[?25l\x1b[2;1H\x1b[KCCCC\x1b[0m\x1b[?25h");
    }

    // ── Attributes ──────────────────────────────────────────────────────

    #[test]
    fn repeated_attribute_is_emitted_once() {
        let style = Style::new().attrs(Attr::BOLD).fg(3);
        let got = encode(vec![
            DiffOp::SetAttribute(style),
            DiffOp::SetAttribute(style),
            DiffOp::WriteBytes(b"x".to_vec()),
        ]);
        assert_eq!(got.matches("\x1b[1;38;5;3m").count(), 1);
        assert_eq!(got, "\x1b[?25l\x1b[1;38;5;3mx\x1b[0m\x1b[?25h");
    }

    #[test]
    fn default_attribute_at_frame_start_is_dropped() {
        let got = encode(vec![DiffOp::SetAttribute(Style::DEFAULT)]);
        assert_eq!(got, "\x1b[?25l\x1b[0m\x1b[?25h");
    }

    #[test]
    fn additive_transition_emits_only_additions() {
        let bold = Style::new().attrs(Attr::BOLD);
        let got = encode(vec![
            DiffOp::SetAttribute(bold),
            DiffOp::SetAttribute(bold.fg(2)),
        ]);
        assert_eq!(got, "\x1b[?25l\x1b[1m\x1b[38;5;2m\x1b[0m\x1b[?25h");
    }

    #[test]
    fn subtractive_transition_resets_first() {
        let bold_red = Style::new().attrs(Attr::BOLD).fg(1);
        let red = Style::new().fg(1);
        let got = encode(vec![
            DiffOp::SetAttribute(bold_red),
            DiffOp::SetAttribute(red),
        ]);
        assert_eq!(got, "\x1b[?25l\x1b[1;38;5;1m\x1b[0m\x1b[38;5;1m\x1b[0m\x1b[?25h");
    }

    // ── Coalescing ──────────────────────────────────────────────────────

    #[test]
    fn adjacent_writes_are_merged() {
        let got = encode(vec![
            DiffOp::WriteBytes(b"ab".to_vec()),
            DiffOp::WriteBytes(b"\r\n".to_vec()),
            DiffOp::ClearLine,
            DiffOp::WriteBytes(b"cd".to_vec()),
        ]);
        assert_eq!(got, "\x1b[?25lab\r\n\x1b[Kcd\x1b[0m\x1b[?25h");
    }

    #[test]
    fn small_chunk_limit_keeps_byte_order() {
        let (mut enc, token) = Encoder::new(3);
        enc.begin_frame();
        let list = (0..10).map(|i| DiffOp::WriteBytes(vec![b'a' + i])).collect();
        enc.encode(&token, &ops(list)).unwrap();
        let text = String::from_utf8(enc.bytes().to_vec()).unwrap();
        assert!(text.contains("abcdefghij"));
    }

    // ── Capacity ────────────────────────────────────────────────────────

    #[test]
    fn estimate_tracks_frame_sizes() {
        let (mut enc, token) = Encoder::new(4096);
        assert_eq!(enc.estimate(), MIN_ESTIMATE);

        let big = ops(vec![DiffOp::WriteBytes(vec![b'x'; 9000])]);
        enc.begin_frame();
        let n = enc.encode(&token, &big).unwrap();
        assert_eq!(enc.estimate(), (MIN_ESTIMATE * 3 + n) / 4);

        for _ in 0..50 {
            enc.begin_frame();
            enc.encode(&token, &DiffOps::new()).unwrap();
        }
        assert_eq!(enc.estimate(), MIN_ESTIMATE);
    }

    // ── Plain output ────────────────────────────────────────────────────

    #[test]
    fn plain_encoding_has_no_escapes() {
        let buf = TerminalBuffer::from_lines(6, &["ab", "", "cd  "]);
        let (mut enc, token) = Encoder::new(4096);
        enc.begin_frame();
        enc.encode_plain(&token, &buf).unwrap();
        assert_eq!(enc.bytes(), b"ab\n\ncd\n");
    }

    // ── Guard ───────────────────────────────────────────────────────────

    #[test]
    fn handoff_once_per_frame() {
        let (mut enc, token) = Encoder::new(4096);
        enc.begin_frame();
        let n = enc.encode(&token, &DiffOps::new()).unwrap();
        assert_eq!(enc.handoff(&token).map(<[u8]>::len), Some(n));
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "second encode in one frame")]
    fn second_encode_in_frame_panics() {
        let (mut enc, token) = Encoder::new(4096);
        enc.begin_frame();
        let _ = enc.encode(&token, &DiffOps::new());
        let _ = enc.encode(&token, &DiffOps::new());
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "revoked write token")]
    fn revoked_encoder_panics() {
        let (mut enc, token) = Encoder::new(4096);
        enc.revoke();
        enc.begin_frame();
        let _ = enc.encode(&token, &DiffOps::new());
    }
}
