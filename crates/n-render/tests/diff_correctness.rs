// SPDX-License-Identifier: MIT
//
// Property tests: the encoded diff between two frames, replayed on a
// terminal showing the first, leaves the terminal showing the second.

mod common;

use common::TerminalModel;
use n_render::buffer::TerminalBuffer;
use n_render::cell::{Attr, Style};
use n_render::diff::{BufferDiffer, DiffMode};
use n_render::encoder::Encoder;
use n_render::geometry::{Point, Size};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

const STYLES: [Style; 7] = [
    Style::DEFAULT,
    Style::new().attrs(Attr::BOLD),
    Style::new().fg(3),
    Style::new().attrs(Attr::BOLD).fg(3),
    Style::new().bg(4),
    Style::new().attrs(Attr::UNDERLINE.union(Attr::REVERSE)),
    Style::new().attrs(Attr::DIM.union(Attr::ITALIC)).fg(200).bg(17),
];

type Stroke = (u16, u16, String, usize);

fn strokes() -> impl Strategy<Value = Vec<Stroke>> {
    prop::collection::vec(
        (0u16..12, 0u16..6, "[ab z中é]{0,6}", 0..STYLES.len()),
        0..14,
    )
}

fn paint(size: Size, strokes: &[Stroke]) -> TerminalBuffer {
    let mut buf = TerminalBuffer::new(size);
    for (x, y, text, style) in strokes {
        buf.write(text, Point::new(*x, *y), STYLES[*style]);
    }
    buf
}

fn encode(differ: BufferDiffer, prev: Option<&TerminalBuffer>, next: &TerminalBuffer) -> Vec<u8> {
    let ops = differ.diff(prev, next, next.size());
    let (mut encoder, token) = Encoder::new(64);
    encoder.begin_frame();
    encoder.encode(&token, &ops).expect("fresh guard admits an encode");
    encoder.bytes().to_vec()
}

fn sizes() -> impl Strategy<Value = Size> {
    (1u16..12, 1u16..6).prop_map(|(w, h)| Size::new(w, h))
}

proptest! {
    #[test]
    fn diff_replays_to_next_frame(
        size in sizes(),
        before in strokes(),
        after in strokes(),
        span in any::<bool>(),
    ) {
        let prev = paint(size, &before);
        let next = paint(size, &after);
        let mode = if span { DiffMode::Span } else { DiffMode::Sparse };

        let mut term = TerminalModel::showing(&prev);
        term.feed(&encode(BufferDiffer::new(mode), Some(&prev), &next));

        term.assert_shows(&next);
        prop_assert!(term.cursor_visible());
        prop_assert_eq!(term.style(), Style::DEFAULT);
    }

    #[test]
    fn full_redraw_replays_over_garbage(
        size in sizes(),
        garbage in strokes(),
        after in strokes(),
    ) {
        let next = paint(size, &after);
        let mut term = TerminalModel::showing(&paint(size, &garbage));
        term.feed(&encode(BufferDiffer::default(), None, &next));
        term.assert_shows(&next);
    }

    #[test]
    fn shape_change_is_a_full_redraw(
        old in sizes(),
        new in sizes(),
        before in strokes(),
        after in strokes(),
        span in any::<bool>(),
    ) {
        prop_assume!(old != new);
        let prev = paint(old, &before);
        let next = paint(new, &after);
        let differ = BufferDiffer::new(if span { DiffMode::Span } else { DiffMode::Sparse });

        let shaped = differ.diff(Some(&prev), &next, next.size());
        let fresh = differ.diff(None, &next, next.size());
        prop_assert!(shaped.is_full_redraw());
        prop_assert_eq!(shaped.as_slice(), fresh.as_slice());
    }

    #[test]
    fn identical_frames_produce_no_ops(size in sizes(), strokes in strokes()) {
        let a = paint(size, &strokes);
        let b = a.clone();
        prop_assert!(BufferDiffer::default().diff(Some(&a), &b, size).is_empty());
    }
}

// ── Fixed scenarios ─────────────────────────────────────────────────────

#[test]
fn single_changed_row_replays() {
    let prev = TerminalBuffer::from_lines(4, &["AAAA", "BBBB"]);
    let next = TerminalBuffer::from_lines(4, &["AAAA", "CCCC"]);
    let bytes = encode(BufferDiffer::default(), Some(&prev), &next);

    assert_eq!(
        String::from_utf8(bytes.clone()).unwrap(),
        "\x1b[?25l\x1b[2;1H\x1b[KCCCC\x1b[0m\x1b[?25h"
    );
    let mut term = TerminalModel::showing(&prev);
    term.feed(&bytes);
    assert_eq!(term.row_text(1), "CCCC");
    term.assert_shows(&next);
}

#[test]
fn shrinking_a_styled_row_clears_its_tail() {
    let mut prev = TerminalBuffer::new(Size::new(8, 1));
    prev.write("abcdefgh", Point::ORIGIN, Style::new().bg(4));
    let mut next = TerminalBuffer::new(Size::new(8, 1));
    next.write("ab", Point::ORIGIN, Style::new().bg(4));

    let mut term = TerminalModel::showing(&prev);
    term.feed(&encode(BufferDiffer::default(), Some(&prev), &next));
    term.assert_shows(&next);
}

#[test]
fn wide_glyphs_replay() {
    let prev = TerminalBuffer::from_lines(6, &["中文ab"]);
    let next = TerminalBuffer::from_lines(6, &["a中文b"]);
    let mut term = TerminalModel::showing(&prev);
    term.feed(&encode(BufferDiffer::new(DiffMode::Span), Some(&prev), &next));
    term.assert_shows(&next);
}
