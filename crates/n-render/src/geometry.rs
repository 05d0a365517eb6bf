// SPDX-License-Identifier: MIT
//
// Geometry: points, sizes, rectangles, and the viewport.
//
// Everything here is in terminal cells: `x` is the column, `y` is the row,
// both 0-indexed from the top-left corner. Coordinates are `u16` because a
// terminal never has more than 65535 columns or rows, and every screen
// position is non-negative. Arithmetic saturates instead of wrapping, so a
// node pushed far below the bottom edge lands at `u16::MAX` and is culled
// rather than wrapping back onto the screen.
//
// Intersection treats zero-area results as "no intersection". The walker
// relies on this: a node that only touches the viewport edge is culled.

// ─── Point ──────────────────────────────────────────────────────────────────

/// A screen position in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    /// Column, 0-indexed.
    pub x: u16,
    /// Row, 0-indexed.
    pub y: u16,
}

impl Point {
    /// The top-left corner.
    pub const ORIGIN: Self = Self { x: 0, y: 0 };

    #[inline]
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Offset by `(dx, dy)`, saturating at `u16::MAX`.
    #[inline]
    #[must_use]
    pub const fn offset(self, dx: u16, dy: u16) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }
}

// ─── Size ───────────────────────────────────────────────────────────────────

/// Dimensions in character cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Number of columns.
    pub width: u16,
    /// Number of rows.
    pub height: u16,
}

impl Size {
    /// A zero-by-zero size.
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    #[inline]
    #[must_use]
    pub const fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Total number of cells (`width × height`).
    #[inline]
    #[must_use]
    pub const fn area(self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Whether either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Component-wise minimum. Used to clamp a measured size to the space
    /// that was actually offered.
    #[inline]
    #[must_use]
    pub fn min(self, other: Self) -> Self {
        Self {
            width: self.width.min(other.width),
            height: self.height.min(other.height),
        }
    }
}

// ─── Rect ───────────────────────────────────────────────────────────────────

/// An axis-aligned rectangle: origin plus size.
///
/// # Examples
///
/// ```
/// use n_render::geometry::{Point, Rect, Size};
///
/// let a = Rect::new(Point::new(0, 0), Size::new(10, 10));
/// let b = Rect::new(Point::new(5, 5), Size::new(10, 10));
/// let both = a.intersect(b).unwrap();
/// assert_eq!(both, Rect::new(Point::new(5, 5), Size::new(5, 5)));
///
/// // Touching edges do not intersect.
/// let c = Rect::new(Point::new(10, 0), Size::new(3, 3));
/// assert!(a.intersect(c).is_none());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub origin: Point,
    pub size: Size,
}

impl Rect {
    #[inline]
    #[must_use]
    pub const fn new(origin: Point, size: Size) -> Self {
        Self { origin, size }
    }

    /// A rectangle anchored at the origin.
    #[inline]
    #[must_use]
    pub const fn from_size(size: Size) -> Self {
        Self {
            origin: Point::ORIGIN,
            size,
        }
    }

    /// Left edge (inclusive).
    #[inline]
    #[must_use]
    pub const fn left(self) -> u32 {
        self.origin.x as u32
    }

    /// Top edge (inclusive).
    #[inline]
    #[must_use]
    pub const fn top(self) -> u32 {
        self.origin.y as u32
    }

    /// Right edge (exclusive). Widened to `u32` so `x + width` never
    /// overflows.
    #[inline]
    #[must_use]
    pub const fn right(self) -> u32 {
        self.origin.x as u32 + self.size.width as u32
    }

    /// Bottom edge (exclusive).
    #[inline]
    #[must_use]
    pub const fn bottom(self) -> u32 {
        self.origin.y as u32 + self.size.height as u32
    }

    /// Whether this rectangle has zero area.
    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.size.is_empty()
    }

    /// Whether a point lies inside this rectangle.
    #[inline]
    #[must_use]
    pub fn contains_point(self, p: Point) -> bool {
        let (x, y) = (u32::from(p.x), u32::from(p.y));
        x >= self.left() && x < self.right() && y >= self.top() && y < self.bottom()
    }

    /// Whether `other` lies entirely inside this rectangle.
    ///
    /// An empty `other` is contained by anything.
    #[must_use]
    pub fn contains_rect(self, other: Self) -> bool {
        other.is_empty()
            || (other.left() >= self.left()
                && other.top() >= self.top()
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    /// Compute the intersection of two rectangles.
    ///
    /// Returns `None` when they are disjoint or the overlap has zero area.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        let x1 = self.left().max(other.left());
        let y1 = self.top().max(other.top());
        let x2 = self.right().min(other.right());
        let y2 = self.bottom().min(other.bottom());

        if x2 > x1 && y2 > y1 {
            // All four edges came from u16 origins plus u16 extents of
            // rectangles that overlap, so the start is a valid u16 and the
            // extent is bounded by the smaller input's extent.
            #[allow(clippy::cast_possible_truncation)]
            Some(Self {
                origin: Point::new(x1 as u16, y1 as u16),
                size: Size::new((x2 - x1) as u16, (y2 - y1) as u16),
            })
        } else {
            None
        }
    }

    /// Express `other` relative to this rectangle's origin.
    ///
    /// Callers pass a rectangle already known to lie inside `self` (an
    /// intersection result); anything left of or above the origin clamps
    /// to zero.
    #[must_use]
    pub const fn relative(self, other: Self) -> Self {
        Self {
            origin: Point::new(
                other.origin.x.saturating_sub(self.origin.x),
                other.origin.y.saturating_sub(self.origin.y),
            ),
            size: other.size,
        }
    }
}

// ─── Viewport ───────────────────────────────────────────────────────────────

/// The visible region of the screen, used for culling.
///
/// A thin wrapper over [`Rect`] so call sites say what they mean: a
/// viewport answers "is this visible?", a rect is just a shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Viewport {
    rect: Rect,
}

impl Viewport {
    #[inline]
    #[must_use]
    pub const fn new(rect: Rect) -> Self {
        Self { rect }
    }

    /// A viewport covering a whole screen of `size`.
    #[inline]
    #[must_use]
    pub const fn full(size: Size) -> Self {
        Self {
            rect: Rect::from_size(size),
        }
    }

    /// The underlying rectangle.
    #[inline]
    #[must_use]
    pub const fn rect(self) -> Rect {
        self.rect
    }

    /// Whether nothing at all is visible.
    #[inline]
    #[must_use]
    pub const fn is_degenerate(self) -> bool {
        self.rect.is_empty()
    }

    /// The part of `rect` that is visible, or `None` if it is culled.
    #[inline]
    #[must_use]
    pub fn clip(self, rect: Rect) -> Option<Rect> {
        self.rect.intersect(rect)
    }

    /// Whether any part of `rect` is visible.
    #[inline]
    #[must_use]
    pub fn intersects(self, rect: Rect) -> bool {
        self.clip(rect).is_some()
    }

    /// Whether `rect` is entirely visible.
    #[inline]
    #[must_use]
    pub fn contains(self, rect: Rect) -> bool {
        self.rect.contains_rect(rect)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
