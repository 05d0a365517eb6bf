// SPDX-License-Identifier: MIT
//
// Renderable: the node tree the walker reconciles every frame.
//
// A node is a read-only view over application state at the moment a frame
// is produced. It answers four questions and does one thing:
//
//   measure(available)  how much room it wants (pure)
//   children()          the ordered child list (stacked top to bottom)
//   structural_hash()   a fingerprint of everything that affects its pixels
//   dirty_reasons()     reasons to repaint regardless of the fingerprint
//   render(canvas)      paint itself (not its children) into a canvas
//
// Nodes are shared as `Arc<dyn Renderable>`: the application builds a fresh
// tree per update (cheap, mostly Arcs to long-lived leaves) and hands the
// root to the renderer, possibly from another thread.
//
// Identity matters. `NodeId` must be stable across frames for the same
// logical element; it is the first component of every cache key.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::buffer::{TerminalBuffer, char_width, string_width};
use crate::cell::{Cell, Style};
use crate::env::TerminalEnvironment;
use crate::geometry::{Point, Rect, Size};

// ─── Identity ───────────────────────────────────────────────────────────────

/// Process-unique identity of a logical UI element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

impl NodeId {
    /// Allocate a fresh id, never handed out before in this process.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wrap a caller-managed id. The caller is responsible for uniqueness.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

// ─── Fingerprint ────────────────────────────────────────────────────────────

/// A 64-bit summary of everything that affects a node's rendered output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint(pub u64);

impl Fingerprint {
    /// Hash any value into a fingerprint.
    ///
    /// ```
    /// use n_render::node::Fingerprint;
    ///
    /// assert_eq!(Fingerprint::of(&("price", 42)), Fingerprint::of(&("price", 42)));
    /// assert_ne!(Fingerprint::of(&("price", 42)), Fingerprint::of(&("price", 43)));
    /// ```
    #[must_use]
    pub fn of<T: Hash + ?Sized>(value: &T) -> Self {
        let mut hasher = DefaultHasher::new();
        value.hash(&mut hasher);
        Self(hasher.finish())
    }
}

// ─── Dirty Reasons ──────────────────────────────────────────────────────────

bitflags::bitflags! {
    /// Reasons a node must be repainted even when its fingerprint matches.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct DirtyReasons: u8 {
        /// The node's content changed in a way the fingerprint can't see
        /// (external resources, time-dependent output).
        const CONTENT_CHANGED     = 1 << 0;
        /// The node reads environment state beyond the capability snapshot.
        const ENVIRONMENT_CHANGED = 1 << 1;
    }
}

// ─── Renderable ─────────────────────────────────────────────────────────────

/// A paintable node.
///
/// Only `id`, `measure`, `render` and `structural_hash` are required.
/// Leaves keep the default empty `children`.
pub trait Renderable: Send + Sync {
    fn id(&self) -> NodeId;

    /// The size this node wants within `available`. Must be pure. The
    /// walker clamps the answer to `available`.
    fn measure(&self, available: Size) -> Size;

    /// Paint this node (not its children) into `canvas`.
    fn render(&self, canvas: &mut Canvas<'_>);

    /// Children, stacked top to bottom below this node's own header rows.
    fn children(&self) -> &[Arc<dyn Renderable>] {
        &[]
    }

    /// Fingerprint of this node's own content, style and layout config.
    /// Children are folded in by the walker.
    fn structural_hash(&self) -> Fingerprint;

    fn dirty_reasons(&self) -> DirtyReasons {
        DirtyReasons::empty()
    }

    /// Rows this node paints itself before its first child.
    fn header_rows(&self) -> u16 {
        0
    }
}

// ─── Canvas ─────────────────────────────────────────────────────────────────

/// A node's window into the frame buffer.
///
/// Coordinates are relative to the node's origin. Every write is clipped to
/// the visible part of the node's rectangle, so a node can never paint over
/// its siblings or outside the viewport. Colors and non-ASCII glyphs are
/// downgraded when the environment lacks them.
pub struct Canvas<'a> {
    buffer: &'a mut TerminalBuffer,
    rect: Rect,
    clip: Rect,
    env: TerminalEnvironment,
}

impl<'a> Canvas<'a> {
    /// A canvas for a node occupying `rect`, writable only inside `clip`.
    #[must_use]
    pub const fn new(
        buffer: &'a mut TerminalBuffer,
        rect: Rect,
        clip: Rect,
        env: TerminalEnvironment,
    ) -> Self {
        Self {
            buffer,
            rect,
            clip,
            env,
        }
    }

    /// Absolute position of the node's top-left cell.
    #[inline]
    #[must_use]
    pub const fn origin(&self) -> Point {
        self.rect.origin
    }

    /// The node's measured size.
    #[inline]
    #[must_use]
    pub const fn size(&self) -> Size {
        self.rect.size
    }

    #[inline]
    #[must_use]
    pub const fn env(&self) -> TerminalEnvironment {
        self.env
    }

    /// Write a styled run at `(x, y)` relative to the node. Returns the
    /// columns consumed.
    pub fn write(&mut self, x: u16, y: u16, text: &str, style: Style) -> u16 {
        let at = self.rect.origin.offset(x, y);
        let style = self.adapt_style(style);
        if self.env.unicode || text.is_ascii() {
            self.buffer.write_clipped(text, at, style, self.clip)
        } else {
            let ascii = ascii_fallback(text);
            self.buffer.write_clipped(&ascii, at, style, self.clip)
        }
    }

    /// Fill the whole node with `ch` in `style`.
    pub fn fill(&mut self, ch: char, style: Style) {
        let ch = if self.env.unicode || ch.is_ascii() { ch } else { '?' };
        let cell = Cell::styled(ch, self.adapt_style(style));
        self.buffer.fill(self.clip, cell);
    }

    fn adapt_style(&self, style: Style) -> Style {
        if self.env.color {
            style
        } else {
            style.without_colors()
        }
    }
}

/// Replace every non-ASCII glyph with `?` per column it would occupy, so
/// layout computed from the original text still lines up.
fn ascii_fallback(text: &str) -> String {
    text.chars()
        .flat_map(|ch| {
            let n = if ch.is_ascii() { 0 } else { char_width(ch) };
            let keep = ch.is_ascii().then_some(ch);
            keep.into_iter().chain(std::iter::repeat_n('?', n))
        })
        .collect()
}

// ─── Text ───────────────────────────────────────────────────────────────────

/// A leaf node: one or more lines of text in a single style.
#[derive(Debug, Clone)]
pub struct Text {
    id: NodeId,
    lines: Vec<String>,
    style: Style,
    reasons: DirtyReasons,
}

impl Text {
    /// Text split on `\n`, default style.
    pub fn new(id: NodeId, text: impl AsRef<str>) -> Self {
        Self {
            id,
            lines: text.as_ref().split('\n').map(str::to_owned).collect(),
            style: Style::DEFAULT,
            reasons: DirtyReasons::empty(),
        }
    }

    #[must_use]
    pub const fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Force a repaint for `reasons` regardless of the fingerprint.
    #[must_use]
    pub const fn dirty(mut self, reasons: DirtyReasons) -> Self {
        self.reasons = reasons;
        self
    }

    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }
}

impl Renderable for Text {
    fn id(&self) -> NodeId {
        self.id
    }

    fn measure(&self, available: Size) -> Size {
        let width = self.lines.iter().map(|l| string_width(l)).max().unwrap_or(0);
        let width = u16::try_from(width).unwrap_or(u16::MAX);
        let height = u16::try_from(self.lines.len()).unwrap_or(u16::MAX);
        Size::new(width, height).min(available)
    }

    fn render(&self, canvas: &mut Canvas<'_>) {
        for (y, line) in (0..canvas.size().height).zip(&self.lines) {
            canvas.write(0, y, line, self.style);
        }
    }

    fn structural_hash(&self) -> Fingerprint {
        Fingerprint::of(&(&self.lines, self.style))
    }

    fn dirty_reasons(&self) -> DirtyReasons {
        self.reasons
    }
}

// ─── Stack ──────────────────────────────────────────────────────────────────

/// A container: an optional title row, then its children top to bottom.
///
/// Takes the full available width so that titles and children share one
/// column edge.
#[derive(Clone)]
pub struct Stack {
    id: NodeId,
    title: Option<(String, Style)>,
    children: Vec<Arc<dyn Renderable>>,
}

impl Stack {
    #[must_use]
    pub const fn new(id: NodeId) -> Self {
        Self {
            id,
            title: None,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn title(mut self, title: impl Into<String>, style: Style) -> Self {
        self.title = Some((title.into(), style));
        self
    }

    #[must_use]
    pub fn child(mut self, child: Arc<dyn Renderable>) -> Self {
        self.children.push(child);
        self
    }

    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = Arc<dyn Renderable>>) -> Self {
        self.children.extend(children);
        self
    }
}

impl std::fmt::Debug for Stack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stack")
            .field("id", &self.id)
            .field("title", &self.title)
            .field("children", &self.children.len())
            .finish()
    }
}

impl Renderable for Stack {
    fn id(&self) -> NodeId {
        self.id
    }

    fn measure(&self, available: Size) -> Size {
        let mut used = self.header_rows().min(available.height);
        for child in &self.children {
            let remaining = Size::new(available.width, available.height - used);
            used += child.measure(remaining).min(remaining).height;
        }
        Size::new(available.width, used)
    }

    fn render(&self, canvas: &mut Canvas<'_>) {
        if let Some((title, style)) = &self.title {
            canvas.write(0, 0, title, *style);
        }
    }

    fn children(&self) -> &[Arc<dyn Renderable>] {
        &self.children
    }

    fn structural_hash(&self) -> Fingerprint {
        Fingerprint::of(&self.title)
    }

    fn header_rows(&self) -> u16 {
        u16::from(self.title.is_some())
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
