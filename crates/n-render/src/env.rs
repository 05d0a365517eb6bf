// SPDX-License-Identifier: MIT
//
// TerminalEnvironment: the capability snapshot a frame is painted under.
//
// Queried once at the start of every frame. It is part of every cache key:
// a surface painted without color is not the same surface as one painted
// with color, even if the node's content is identical. When the snapshot
// changes between frames the whole cache is dropped.
//
// Detection follows the usual conventions:
//
//   NO_COLOR (any value)       → no color
//   TERM=dumb                  → no color, no unicode
//   LC_ALL / LC_CTYPE / LANG   → unicode if the first one that is set
//                                mentions UTF-8

use crate::geometry::Size;

// ─── TerminalEnvironment ────────────────────────────────────────────────────

/// What the terminal can display, and how big it is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TerminalEnvironment {
    /// Whether indexed colors may be emitted.
    pub color: bool,
    /// Whether non-ASCII glyphs may be emitted.
    pub unicode: bool,
    /// Terminal size in cells.
    pub size: Size,
}

impl TerminalEnvironment {
    /// A fully capable terminal of the given size.
    #[inline]
    #[must_use]
    pub const fn new(size: Size) -> Self {
        Self {
            color: true,
            unicode: true,
            size,
        }
    }

    #[inline]
    #[must_use]
    pub const fn with_color(self, color: bool) -> Self {
        Self { color, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_unicode(self, unicode: bool) -> Self {
        Self { unicode, ..self }
    }

    #[inline]
    #[must_use]
    pub const fn with_size(self, size: Size) -> Self {
        Self { size, ..self }
    }

    /// Detect capabilities from the process environment.
    #[must_use]
    pub fn detect(size: Size) -> Self {
        Self::from_vars(|name| std::env::var(name).ok(), size)
    }

    /// Detect capabilities from an arbitrary variable lookup.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>, size: Size) -> Self {
        let dumb = lookup("TERM").is_some_and(|t| t == "dumb");
        let no_color = lookup("NO_COLOR").is_some();

        let locale = ["LC_ALL", "LC_CTYPE", "LANG"]
            .iter()
            .find_map(|name| lookup(name).filter(|v| !v.is_empty()));
        let utf8 = locale.is_some_and(|v| {
            let v = v.to_ascii_lowercase();
            v.contains("utf-8") || v.contains("utf8")
        });

        Self {
            color: !dumb && !no_color,
            unicode: !dumb && utf8,
            size,
        }
    }
}

// ─── EnvironmentSource ──────────────────────────────────────────────────────

/// Where the renderer gets its per-frame snapshot from.
///
/// Implemented for a fixed [`TerminalEnvironment`] (headless and tests) and
/// for any closure returning one (live terminals that re-query size).
pub trait EnvironmentSource: Send + Sync {
    fn snapshot(&self) -> TerminalEnvironment;
}

impl EnvironmentSource for TerminalEnvironment {
    fn snapshot(&self) -> TerminalEnvironment {
        *self
    }
}

impl<F> EnvironmentSource for F
where
    F: Fn() -> TerminalEnvironment + Send + Sync,
{
    fn snapshot(&self) -> TerminalEnvironment {
        self()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
