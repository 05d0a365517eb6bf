// SPDX-License-Identifier: MIT
//
// RenderCache: painted surfaces keyed by what produced them.
//
// A surface is served only for an exact `(node, fingerprint, environment)`
// match. There is no partial reuse: a different fingerprint or environment
// is a miss, full stop. On top of the exact-match store the cache remembers
// the last fingerprint stored per node, which lets the walker skip hashing
// a clean subtree and go straight to its previous surface.
//
// Surfaces are immutable once stored and handed out as `Arc<Surface>`, so
// concurrent readers never see a half-written one. Everything sits behind
// one `parking_lot::Mutex`; critical sections are a hash lookup or insert.
//
// Capacity is bounded with LRU eviction. When the environment snapshot
// changes, every entry and every remembered fingerprint is dropped at once.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;

use crate::buffer::TerminalBuffer;
use crate::cell::Cell;
use crate::env::TerminalEnvironment;
use crate::geometry::{Rect, Size};
use crate::node::{Fingerprint, NodeId};

// ─── Surface ────────────────────────────────────────────────────────────────

/// An immutable, already-painted rectangle of cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Surface {
    /// The node's bounding rectangle when it was painted.
    rect: Rect,
    /// The part of `rect` that was visible, in the same absolute frame.
    visible: Rect,
    /// Cells of `visible`, one boxed slice per row.
    lines: Vec<Box<[Cell]>>,
    env: TerminalEnvironment,
}

impl Surface {
    /// Capture the visible part of `rect` from `buffer`.
    #[must_use]
    pub fn capture(
        buffer: &TerminalBuffer,
        rect: Rect,
        visible: Rect,
        env: TerminalEnvironment,
    ) -> Self {
        let (visible, lines) = buffer.capture(visible);
        Self {
            rect,
            visible,
            lines,
            env,
        }
    }

    /// A surface with no cells, for nodes that measured to zero area.
    #[must_use]
    pub const fn empty(rect: Rect, env: TerminalEnvironment) -> Self {
        Self {
            rect,
            visible: Rect::new(rect.origin, Size::ZERO),
            lines: Vec::new(),
            env,
        }
    }

    #[inline]
    #[must_use]
    pub const fn rect(&self) -> Rect {
        self.rect
    }

    #[inline]
    #[must_use]
    pub const fn visible(&self) -> Rect {
        self.visible
    }

    #[inline]
    #[must_use]
    pub fn lines(&self) -> &[Box<[Cell]>] {
        &self.lines
    }

    #[inline]
    #[must_use]
    pub const fn env(&self) -> TerminalEnvironment {
        self.env
    }

    /// Whether this surface can stand in for a node now at `rect` with
    /// `visible` showing.
    ///
    /// The size must match exactly, and the region painted at store time
    /// must cover the region visible now (both relative to the node). A node
    /// that scrolled further into view needs cells nobody painted.
    #[must_use]
    pub fn fits(&self, rect: Rect, visible: Option<Rect>) -> bool {
        if self.rect.size != rect.size {
            return false;
        }
        let Some(visible) = visible else {
            return true;
        };
        let stored = self.rect.relative(self.visible);
        stored.contains_rect(rect.relative(visible))
    }

    /// Blit into `buffer` for a node now at `rect`, touching only `clip`.
    pub fn blit_into(&self, buffer: &mut TerminalBuffer, rect: Rect, clip: Rect) {
        if self.lines.is_empty() {
            return;
        }
        let offset = self.rect.relative(self.visible).origin;
        let at = rect.origin.offset(offset.x, offset.y);
        buffer.blit(&self.lines, at, clip);
    }
}

// ─── Keys & Stats ───────────────────────────────────────────────────────────

/// Exact identity of a painted surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub node: NodeId,
    pub fingerprint: Fingerprint,
    pub env: TerminalEnvironment,
}

impl CacheKey {
    #[inline]
    #[must_use]
    pub const fn new(node: NodeId, fingerprint: Fingerprint, env: TerminalEnvironment) -> Self {
        Self {
            node,
            fingerprint,
            env,
        }
    }
}

/// Lifetime counters, for telemetry and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub stores: u64,
    pub evictions: u64,
    /// Wholesale invalidations caused by environment changes.
    pub invalidations: u64,
}

// ─── RenderCache ────────────────────────────────────────────────────────────

struct CacheState {
    entries: LruCache<CacheKey, Arc<Surface>>,
    last: HashMap<NodeId, Fingerprint>,
    env: Option<TerminalEnvironment>,
    stats: CacheStats,
}

/// Internally synchronized surface cache, safe to share between renderers
/// and harnesses through an `Arc`.
pub struct RenderCache {
    state: Mutex<CacheState>,
}

impl RenderCache {
    /// A cache holding at most `capacity` surfaces. Zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                last: HashMap::new(),
                env: None,
                stats: CacheStats::default(),
            }),
        }
    }

    /// Record the environment for the coming frame. If it differs from the
    /// last one seen, every entry is dropped. Returns whether that happened.
    pub fn sync_environment(&self, env: TerminalEnvironment) -> bool {
        let mut state = self.state.lock();
        let changed = state.env.is_some_and(|prev| prev != env);
        if changed {
            let dropped = state.entries.len();
            state.entries.clear();
            state.last.clear();
            state.stats.invalidations += 1;
            tracing::info!(
                dropped,
                color = env.color,
                unicode = env.unicode,
                width = env.size.width,
                height = env.size.height,
                "terminal environment changed, render cache invalidated"
            );
        }
        state.env = Some(env);
        changed
    }

    /// The surface stored under exactly `key`, if any.
    pub fn lookup(&self, key: &CacheKey) -> Option<Arc<Surface>> {
        let mut state = self.state.lock();
        let hit = state
            .entries
            .get(key)
            .filter(|surface| surface.env == key.env)
            .cloned();
        if hit.is_some() {
            state.stats.hits += 1;
        } else {
            state.stats.misses += 1;
        }
        hit
    }

    /// The surface for `node` under the last fingerprint stored for it.
    pub fn lookup_previous(
        &self,
        node: NodeId,
        env: TerminalEnvironment,
    ) -> Option<(Fingerprint, Arc<Surface>)> {
        let fingerprint = self.previous_fingerprint(node)?;
        let surface = self.lookup(&CacheKey::new(node, fingerprint, env))?;
        Some((fingerprint, surface))
    }

    /// Store `surface` under `key` and remember `key.fingerprint` as the
    /// node's latest.
    pub fn store(&self, key: CacheKey, surface: Surface) -> Arc<Surface> {
        debug_assert_eq!(surface.env, key.env, "surface stored under a foreign environment");

        let surface = Arc::new(surface);
        let mut state = self.state.lock();
        if let Some((evicted, _)) = state.entries.push(key, Arc::clone(&surface)) {
            // `push` also hands back the old value when the key was present.
            if evicted != key {
                state.stats.evictions += 1;
                if state.last.get(&evicted.node) == Some(&evicted.fingerprint) {
                    state.last.remove(&evicted.node);
                }
            }
        }
        state.last.insert(key.node, key.fingerprint);
        state.stats.stores += 1;
        surface
    }

    #[must_use]
    pub fn previous_fingerprint(&self, node: NodeId) -> Option<Fingerprint> {
        self.state.lock().last.get(&node).copied()
    }

    /// Drop everything.
    pub fn invalidate_all(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.last.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.state.lock().stats
    }
}

impl std::fmt::Debug for RenderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RenderCache")
            .field("len", &state.entries.len())
            .field("capacity", &state.entries.cap())
            .field("stats", &state.stats)
            .finish_non_exhaustive()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
