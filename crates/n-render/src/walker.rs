// SPDX-License-Identifier: MIT
//
// Reconciling walker: paints a node tree into a buffer, reusing whatever
// the cache already holds.
//
// Depth-first, parents before children, children stacked top to bottom
// below their parent's header rows. Per node:
//
//   1. Measure against the space left, clamp, place at the running offset.
//   2. Zero area: store an empty surface, stop. Nothing to show or cull.
//   3. Outside the viewport: stop. Children are not visited.
//   4. Clean (not dirty, no dirty reasons, nothing dirty below it) and the
//      fast path is on: blit the surface stored under the node's previous
//      fingerprint, if it still fits. Stop.
//   5. Hash the subtree. Unless the node or a descendant carries dirty
//      reasons, a surface stored under exactly this fingerprint and
//      environment is blitted. Stop.
//   6. Paint the node, walk its children, capture the result.
//
// Captured surfaces are held back in the returned `Painted` frame. They
// reach the cache only on `commit`, so a frame abandoned after painting
// leaves the cache as it found it.
//
// The cache key fingerprint covers the whole subtree: the node's own
// structural hash, its measured size, its header, and every child's subtree
// fingerprint in order. A surface holds the children's cells too, so a
// parent's key must change when any child's output does. For the same
// reason dirtiness propagates upwards: a dirty leaf makes every ancestor
// take the slow path.
//
// Subtree fingerprints are memoized per frame by `(node, available size)`,
// so hashing the root and then descending into children that miss costs
// each node one hash, not one per ancestor.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::buffer::TerminalBuffer;
use crate::cache::{CacheKey, RenderCache, Surface};
use crate::env::TerminalEnvironment;
use crate::geometry::{Point, Rect, Size, Viewport};
use crate::graph::DirtySet;
use crate::node::{Canvas, Fingerprint, NodeId, Renderable};

// ─── Inputs & Outputs ───────────────────────────────────────────────────────

/// Everything a walk reads besides the tree and the target buffer.
#[derive(Clone, Copy)]
pub struct WalkContext<'a> {
    pub cache: &'a RenderCache,
    pub dirty: &'a DirtySet,
    pub viewport: Viewport,
    pub env: TerminalEnvironment,
    /// Serve clean nodes from their previous fingerprint without hashing.
    pub trust_dirty_tracking: bool,
}

/// What a walk did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkStats {
    /// Nodes reached, culled ones included.
    pub walked: u32,
    /// Nodes whose `render` ran.
    pub painted: u32,
    /// Nodes skipped for lying outside the viewport.
    pub culled: u32,
    /// Nodes served from the cache.
    pub hits: u32,
    /// Surfaces captured for the cache.
    pub stores: u32,
}

/// A painted frame whose surfaces have not been stored yet.
#[must_use = "surfaces reach the cache only through `commit`"]
pub struct Painted {
    pub stats: WalkStats,
    surfaces: Vec<(CacheKey, Surface)>,
}

impl Painted {
    /// Surfaces waiting for `commit`.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.surfaces.len()
    }

    /// Store every captured surface in `cache`.
    pub fn commit(self, cache: &RenderCache) -> WalkStats {
        for (key, surface) in self.surfaces {
            cache.store(key, surface);
        }
        self.stats
    }
}

/// Paint `root` into `target`, anchored at the top-left corner and offered
/// the whole buffer. The cache is only read.
pub fn paint(root: &dyn Renderable, target: &mut TerminalBuffer, ctx: &WalkContext<'_>) -> Painted {
    let available = target.size();
    let mut walker = Walker::new(target, ctx);
    walker.collect(root);
    walker.walk_node(root, Point::ORIGIN, available);
    Painted {
        stats: walker.stats,
        surfaces: walker.surfaces,
    }
}

/// [`paint`], then commit straight away.
pub fn walk(root: &dyn Renderable, target: &mut TerminalBuffer, ctx: &WalkContext<'_>) -> WalkStats {
    paint(root, target, ctx).commit(ctx.cache)
}

// ─── Walker ─────────────────────────────────────────────────────────────────

struct Walker<'a, 'c> {
    buffer: &'a mut TerminalBuffer,
    ctx: &'a WalkContext<'c>,
    /// Nodes that are dirty, carry dirty reasons, or have such a descendant.
    forced: HashSet<NodeId>,
    /// Nodes that carry dirty reasons or have a descendant that does.
    reasoned: HashSet<NodeId>,
    memo: HashMap<(NodeId, Size), Fingerprint>,
    surfaces: Vec<(CacheKey, Surface)>,
    stats: WalkStats,
}

impl<'a, 'c> Walker<'a, 'c> {
    fn new(buffer: &'a mut TerminalBuffer, ctx: &'a WalkContext<'c>) -> Self {
        Self {
            buffer,
            ctx,
            forced: HashSet::new(),
            reasoned: HashSet::new(),
            memo: HashMap::new(),
            surfaces: Vec::new(),
            stats: WalkStats::default(),
        }
    }

    /// Pre-pass: find the nodes that must skip the fast path, and those
    /// that must skip the cache altogether. Returns `(forced, reasoned)`
    /// for `node`.
    fn collect(&mut self, node: &dyn Renderable) -> (bool, bool) {
        let mut reasoned = !node.dirty_reasons().is_empty();
        let mut forced = reasoned || self.ctx.dirty.contains(node.id());
        for child in node.children() {
            let (child_forced, child_reasoned) = self.collect(child.as_ref());
            forced |= child_forced;
            reasoned |= child_reasoned;
        }
        if forced {
            self.forced.insert(node.id());
        }
        if reasoned {
            self.reasoned.insert(node.id());
        }
        (forced, reasoned)
    }

    fn is_forced(&self, id: NodeId) -> bool {
        self.ctx.dirty.is_all() || self.forced.contains(&id)
    }

    /// Walk one node placed at `origin` with `available` space. Returns the
    /// size it occupies, which the parent uses to place the next sibling.
    fn walk_node(&mut self, node: &dyn Renderable, origin: Point, available: Size) -> Size {
        self.stats.walked += 1;

        let size = node.measure(available).min(available);
        let rect = Rect::new(origin, size);
        let env = self.ctx.env;

        if size.is_empty() {
            let fingerprint = self.fingerprint(node, available);
            let key = CacheKey::new(node.id(), fingerprint, env);
            if self.ctx.cache.lookup(&key).is_none() {
                self.surfaces.push((key, Surface::empty(rect, env)));
                self.stats.stores += 1;
            }
            return size;
        }

        let Some(visible) = self.ctx.viewport.clip(rect) else {
            self.stats.culled += 1;
            return size;
        };

        if self.ctx.trust_dirty_tracking && !self.is_forced(node.id()) {
            let previous = self.ctx.cache.lookup_previous(node.id(), env);
            if self.try_blit(previous.map(|(_, surface)| surface), rect, visible) {
                return size;
            }
        }

        let fingerprint = self.fingerprint(node, available);
        let key = CacheKey::new(node.id(), fingerprint, env);

        if !self.reasoned.contains(&node.id()) {
            let exact = self.ctx.cache.lookup(&key);
            if self.try_blit(exact, rect, visible) {
                return size;
            }
        }

        node.render(&mut Canvas::new(self.buffer, rect, visible, env));
        self.stats.painted += 1;

        let mut used = node.header_rows().min(size.height);
        for child in node.children() {
            let remaining = Size::new(size.width, size.height - used);
            let child_size = self.walk_node(child.as_ref(), origin.offset(0, used), remaining);
            used += child_size.height;
        }

        let surface = Surface::capture(self.buffer, rect, visible, env);
        self.surfaces.push((key, surface));
        self.stats.stores += 1;
        size
    }

    /// Blit `surface` if it can stand in for a node at `rect`.
    fn try_blit(&mut self, surface: Option<Arc<Surface>>, rect: Rect, visible: Rect) -> bool {
        match surface {
            Some(surface) if surface.fits(rect, Some(visible)) => {
                surface.blit_into(self.buffer, rect, visible);
                self.stats.hits += 1;
                true
            }
            _ => false,
        }
    }

    /// Subtree fingerprint of `node` when offered `available`.
    fn fingerprint(&mut self, node: &dyn Renderable, available: Size) -> Fingerprint {
        if let Some(&fp) = self.memo.get(&(node.id(), available)) {
            return fp;
        }

        let size = node.measure(available).min(available);
        let mut hasher = DefaultHasher::new();
        node.structural_hash().hash(&mut hasher);
        size.hash(&mut hasher);
        node.header_rows().hash(&mut hasher);

        let mut used = node.header_rows().min(size.height);
        for child in node.children() {
            let remaining = Size::new(size.width, size.height - used);
            self.fingerprint(child.as_ref(), remaining).hash(&mut hasher);
            used += child.measure(remaining).min(remaining).height;
        }

        let fp = Fingerprint(hasher.finish());
        self.memo.insert((node.id(), available), fp);
        fp
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
