// SPDX-License-Identifier: MIT
//
// RenderGraph: which subtrees need repainting this frame.
//
// Collaborators that know what changed (a price ticked, a balance moved)
// mark the affected node ids against the root they render under. The
// renderer takes the set for its root at the start of a frame: taking is
// atomic, so marks that land while the walk is running belong to the next
// frame, and bits taken by a frame never survive it, whether the frame
// succeeds, fails, or is cancelled.
//
// Disabled, the graph reports every node as dirty. That turns the walker's
// trust-the-previous-fingerprint fast path off without touching the cache.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

use crate::node::NodeId;

// ─── DirtySet ───────────────────────────────────────────────────────────────

/// The dirty nodes for one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirtySet {
    /// Tracking is disabled: everything is dirty.
    All,
    /// Exactly these nodes were marked.
    Nodes(HashSet<NodeId>),
}

impl DirtySet {
    /// An empty set: nothing was marked.
    #[must_use]
    pub fn none() -> Self {
        Self::Nodes(HashSet::new())
    }

    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        match self {
            Self::All => true,
            Self::Nodes(ids) => ids.contains(&id),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Nodes(ids) if ids.is_empty())
    }

    #[must_use]
    pub const fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl FromIterator<NodeId> for DirtySet {
    fn from_iter<I: IntoIterator<Item = NodeId>>(iter: I) -> Self {
        Self::Nodes(iter.into_iter().collect())
    }
}

// ─── RenderGraph ────────────────────────────────────────────────────────────

#[derive(Debug)]
struct GraphState {
    enabled: bool,
    dirty: HashMap<NodeId, HashSet<NodeId>>,
}

/// Frame-scoped dirty tracking, keyed by root node.
///
/// Shared between the renderer and whatever tracks domain changes, usually
/// behind an `Arc`.
#[derive(Debug)]
pub struct RenderGraph {
    state: Mutex<GraphState>,
}

impl RenderGraph {
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GraphState {
                enabled: true,
                dirty: HashMap::new(),
            }),
        }
    }

    /// Mark `node` as needing a repaint in the next frame of `root`.
    pub fn mark_dirty(&self, root: NodeId, node: NodeId) {
        self.state
            .lock()
            .dirty
            .entry(root)
            .or_default()
            .insert(node);
    }

    /// Mark several nodes at once.
    pub fn mark_all(&self, root: NodeId, nodes: impl IntoIterator<Item = NodeId>) {
        self.state.lock().dirty.entry(root).or_default().extend(nodes);
    }

    /// Enable or disable tracking. Disabling drops all pending marks.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.state.lock();
        state.enabled = enabled;
        if !enabled {
            state.dirty.clear();
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    /// Remove and return the dirty set for `root`.
    pub fn take(&self, root: NodeId) -> DirtySet {
        let mut state = self.state.lock();
        if !state.enabled {
            return DirtySet::All;
        }
        DirtySet::Nodes(state.dirty.remove(&root).unwrap_or_default())
    }

    /// Drop pending marks for `root` without reading them.
    pub fn clear(&self, root: NodeId) {
        self.state.lock().dirty.remove(&root);
    }

    /// Whether `node` is currently marked under `root`.
    #[must_use]
    pub fn is_dirty(&self, root: NodeId, node: NodeId) -> bool {
        let state = self.state.lock();
        !state.enabled || state.dirty.get(&root).is_some_and(|ids| ids.contains(&node))
    }
}

impl Default for RenderGraph {
    fn default() -> Self {
        Self::new()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
