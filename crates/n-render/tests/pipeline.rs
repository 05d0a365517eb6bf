// SPDX-License-Identifier: MIT
//
// End-to-end behaviour of the renderer: caching, culling, environment
// changes, the single-writer rule, coalescing and cancellation.

mod common;

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::{Probe, TerminalModel, paints};
use n_render::buffer::TerminalBuffer;
use n_render::cache::{CacheKey, RenderCache, Surface};
use n_render::cell::Style;
use n_render::config::RendererConfig;
use n_render::env::TerminalEnvironment;
use n_render::geometry::{Rect, Size, Viewport};
use n_render::graph::DirtySet;
use n_render::node::{Canvas, Fingerprint, NodeId, Renderable, Stack, Text};
use n_render::pump::Admission;
use n_render::renderer::Renderer;
use n_render::sink::{CaptureSink, OutputSink};
use n_render::telemetry::{FrameOutcome, FrameReport};
use n_render::walker::{WalkContext, walk};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;

fn env(width: u16, height: u16) -> TerminalEnvironment {
    TerminalEnvironment::new(Size::new(width, height))
}

fn probe(id: NodeId, text: &str, counter: &Arc<AtomicU32>) -> Arc<dyn Renderable> {
    Probe::new(id, text, counter)
}

fn stack(id: NodeId, title: &str, children: Vec<Arc<dyn Renderable>>) -> Arc<dyn Renderable> {
    Arc::new(Stack::new(id).title(title, Style::DEFAULT).with_children(children))
}

// ── Cache soundness ─────────────────────────────────────────────────────

#[test]
fn unchanged_nodes_are_not_repainted() {
    let counter = Arc::new(AtomicU32::new(0));
    let sink = CaptureSink::interactive();
    let renderer = Renderer::new(RendererConfig::default(), sink.clone(), env(12, 4)).unwrap();
    let (root, a, b) = (NodeId::next(), NodeId::next(), NodeId::next());

    let tree = |b_text: &str| {
        stack(
            root,
            "Board",
            vec![probe(a, "alpha", &counter), probe(b, b_text, &counter)],
        )
    };

    renderer.schedule_render(tree("beta"));
    assert_eq!(paints(&counter), 2);

    // Same content, nothing dirty: both leaves come from the cache.
    renderer.schedule_render(tree("beta"));
    assert_eq!(paints(&counter), 2);
    assert_eq!(renderer.last_report().unwrap().outcome, FrameOutcome::Unchanged);

    // One leaf changes and is marked: only that leaf repaints.
    renderer.graph().mark_dirty(root, b);
    renderer.schedule_render(tree("gamma"));
    assert_eq!(paints(&counter), 3);

    let mut term = TerminalModel::new(Size::new(12, 4));
    term.feed(&sink.stream());
    assert_eq!(term.row_text(0), "Board");
    assert_eq!(term.row_text(1), "alpha");
    assert_eq!(term.row_text(2), "gamma");
}

#[test]
fn untrusted_tracking_catches_unmarked_changes() {
    let counter = Arc::new(AtomicU32::new(0));
    let sink = CaptureSink::interactive();
    let config = RendererConfig {
        trust_dirty_tracking: false,
        ..RendererConfig::default()
    };
    let renderer = Renderer::new(config, sink.clone(), env(8, 1)).unwrap();
    let id = NodeId::next();

    renderer.schedule_render(Probe::new(id, "one", &counter));
    renderer.schedule_render(Probe::new(id, "one", &counter));
    assert_eq!(paints(&counter), 1);

    renderer.schedule_render(Probe::new(id, "two", &counter));
    assert_eq!(paints(&counter), 2);

    let mut term = TerminalModel::new(Size::new(8, 1));
    term.feed(&sink.stream());
    assert_eq!(term.row_text(0), "two");
}

// ── Cache exactness ─────────────────────────────────────────────────────

#[test]
fn cache_never_serves_another_fingerprint() {
    let cache = RenderCache::new(16);
    let env = env(4, 1);
    let id = NodeId::next();
    let rect = Rect::from_size(Size::new(4, 1));
    let buffer = TerminalBuffer::from_lines(4, &["abcd"]);

    cache.store(
        CacheKey::new(id, Fingerprint(1), env),
        Surface::capture(&buffer, rect, rect, env),
    );

    assert!(cache.lookup(&CacheKey::new(id, Fingerprint(1), env)).is_some());
    assert!(cache.lookup(&CacheKey::new(id, Fingerprint(2), env)).is_none());
}

// ── Culling ─────────────────────────────────────────────────────────────

#[test]
fn offscreen_subtrees_are_neither_painted_nor_visited() {
    let counter = Arc::new(AtomicU32::new(0));
    let hidden_child = Arc::new(AtomicU32::new(0));
    let cache = RenderCache::new(64);
    let dirty = DirtySet::none();
    let environment = env(10, 2);

    // Rows 0-1 visible; the second panel starts at row 2.
    let root = Stack::new(NodeId::next())
        .child(Probe::new(NodeId::next(), "one", &counter))
        .child(Probe::new(NodeId::next(), "two", &counter))
        .child(stack(
            NodeId::next(),
            "Hidden",
            vec![probe(NodeId::next(), "deep", &hidden_child)],
        ));

    let mut target = TerminalBuffer::new(Size::new(10, 5));
    let ctx = WalkContext {
        cache: &cache,
        dirty: &dirty,
        viewport: Viewport::new(Rect::from_size(Size::new(10, 2))),
        env: environment,
        trust_dirty_tracking: true,
    };
    let stats = walk(&root, &mut target, &ctx);

    assert_eq!(paints(&counter), 2);
    assert_eq!(paints(&hidden_child), 0);
    assert_eq!(stats.culled, 1);
    assert_eq!(target.line_text(2).as_deref(), Some(""));
}

// ── Environment changes ─────────────────────────────────────────────────

#[test]
fn unicode_flip_invalidates_every_surface() {
    let flag = Arc::new(AtomicBool::new(false));
    let source = {
        let flag = Arc::clone(&flag);
        move || env(6, 1).with_unicode(flag.load(Ordering::Relaxed))
    };
    let sink = CaptureSink::interactive();
    let renderer = Renderer::new(RendererConfig::default(), sink.clone(), source).unwrap();
    let id = NodeId::next();
    let tree = || -> Arc<dyn Renderable> { Arc::new(Text::new(id, "a→b")) };

    renderer.schedule_render(tree());
    let mut term = TerminalModel::new(Size::new(6, 1));
    term.feed(&sink.stream());
    assert_eq!(term.row_text(0), "a?b");

    flag.store(true, Ordering::Relaxed);
    renderer.schedule_render(tree());
    let report = renderer.last_report().unwrap();
    assert_eq!(report.stats.cache_hits, 0);
    assert_eq!(report.stats.nodes_painted, 1);
    assert_eq!(renderer.cache().stats().invalidations, 1);

    let mut term = TerminalModel::new(Size::new(6, 1));
    term.feed(&sink.stream());
    assert_eq!(term.row_text(0), "a→b");
}

// ── Single writer ───────────────────────────────────────────────────────

/// A sink that counts writes in flight and stalls long enough for other
/// threads to pile up behind the frame.
#[derive(Clone)]
struct SlowSink {
    inner: CaptureSink,
    active: Arc<AtomicU32>,
    overlaps: Arc<AtomicU32>,
}

impl OutputSink for SlowSink {
    fn write(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlaps.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(std::time::Duration::from_millis(2));
        let result = self.inner.write(bytes);
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn is_interactive(&self) -> bool {
        true
    }
}

#[test]
fn concurrent_schedules_never_overlap_writes() {
    let sink = SlowSink {
        inner: CaptureSink::interactive(),
        active: Arc::new(AtomicU32::new(0)),
        overlaps: Arc::new(AtomicU32::new(0)),
    };
    let frames = Arc::new(Mutex::new(Vec::new()));
    let observer = {
        let frames = Arc::clone(&frames);
        move |r: &FrameReport| frames.lock().push(r.outcome)
    };
    let renderer = Arc::new(
        Renderer::new(RendererConfig::default(), sink.clone(), env(16, 1))
            .unwrap()
            .with_observer(observer),
    );
    let id = NodeId::next();
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let renderer = Arc::clone(&renderer);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for i in 0..20 {
                    renderer.graph().mark_dirty(id, id);
                    renderer.schedule_render(Arc::new(Text::new(id, format!("t{t} i{i}"))));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(sink.overlaps.load(Ordering::SeqCst), 0);
    let written = frames.lock().iter().filter(|o| o.is_written()).count();
    assert_eq!(sink.inner.writes(), written);
    assert!(written >= 1);
}

// ── Coalescing ──────────────────────────────────────────────────────────

/// A node that schedules the next update while it is being painted,
/// standing in for updates that arrive faster than frames complete.
struct Chatty {
    id: NodeId,
    value: u32,
    last: u32,
    renderer: Arc<Mutex<Option<Arc<Renderer>>>>,
}

impl Renderable for Chatty {
    fn id(&self) -> NodeId {
        self.id
    }

    fn measure(&self, available: Size) -> Size {
        Size::new(8, 1).min(available)
    }

    fn render(&self, canvas: &mut Canvas<'_>) {
        canvas.write(0, 0, &format!("v{}", self.value), Style::DEFAULT);
        if self.value < self.last {
            let renderer = self.renderer.lock().clone();
            if let Some(renderer) = renderer {
                // Several updates land during this frame; only the newest
                // should survive.
                for next in self.value + 1..=self.last.min(self.value + 3) {
                    renderer.graph().mark_dirty(self.id, self.id);
                    let admission = renderer.schedule_render(Arc::new(Self {
                        id: self.id,
                        value: next,
                        last: self.last,
                        renderer: Arc::clone(&self.renderer),
                    }));
                    assert_eq!(admission, Admission::Coalesced);
                }
            }
        }
    }

    fn structural_hash(&self) -> Fingerprint {
        Fingerprint::of(&self.value)
    }
}

#[test]
fn last_update_always_reaches_the_screen() {
    let sink = CaptureSink::interactive();
    let slot = Arc::new(Mutex::new(None));
    let renderer = Arc::new(Renderer::new(RendererConfig::default(), sink.clone(), env(8, 1)).unwrap());
    *slot.lock() = Some(Arc::clone(&renderer));
    let id = NodeId::next();

    renderer.schedule_render(Arc::new(Chatty {
        id,
        value: 0,
        last: 10,
        renderer: Arc::clone(&slot),
    }));

    let mut term = TerminalModel::new(Size::new(8, 1));
    term.feed(&sink.stream());
    assert_eq!(term.row_text(0), "v10");
    // 0 → 3 → 6 → 9 → 10: intermediate updates were coalesced away.
    assert_eq!(renderer.frames_produced(), 5);

    slot.lock().take();
}

#[test]
fn runaway_updates_hit_the_ceiling() {
    let sink = CaptureSink::interactive();
    let slot = Arc::new(Mutex::new(None));
    let config = RendererConfig {
        max_coalesced_frames: 2,
        ..RendererConfig::default()
    };
    let renderer = Arc::new(Renderer::new(config, sink.clone(), env(8, 1)).unwrap());
    *slot.lock() = Some(Arc::clone(&renderer));

    let admission = renderer.schedule_render(Arc::new(Chatty {
        id: NodeId::next(),
        value: 0,
        last: 100,
        renderer: Arc::clone(&slot),
    }));

    assert_eq!(admission, Admission::Started);
    assert_eq!(renderer.frames_produced(), 2);
    assert_eq!(sink.writes(), 2);

    slot.lock().take();
}

// ── Cancellation ────────────────────────────────────────────────────────

/// Cancels its renderer from inside the paint phase.
struct Canceller {
    id: NodeId,
    renderer: Arc<Mutex<Option<Arc<Renderer>>>>,
}

impl Renderable for Canceller {
    fn id(&self) -> NodeId {
        self.id
    }

    fn measure(&self, available: Size) -> Size {
        Size::new(4, 1).min(available)
    }

    fn render(&self, canvas: &mut Canvas<'_>) {
        canvas.write(0, 0, "new", Style::DEFAULT);
        if let Some(renderer) = self.renderer.lock().clone() {
            renderer.cancel();
        }
    }

    fn structural_hash(&self) -> Fingerprint {
        Fingerprint::of("canceller")
    }
}

#[test]
fn cancelled_frame_leaves_terminal_and_baseline_alone() {
    let sink = CaptureSink::interactive();
    let slot = Arc::new(Mutex::new(None));
    let renderer = Arc::new(Renderer::new(RendererConfig::default(), sink.clone(), env(4, 1)).unwrap());
    *slot.lock() = Some(Arc::clone(&renderer));
    let id = NodeId::next();

    renderer.schedule_render(Arc::new(Text::new(id, "old")));
    assert_eq!(sink.writes(), 1);
    let cached = renderer.cache().len();
    let fingerprint = renderer.cache().previous_fingerprint(id);

    renderer.graph().mark_dirty(id, id);
    renderer.schedule_render(Arc::new(Canceller {
        id,
        renderer: Arc::clone(&slot),
    }));
    assert_eq!(sink.writes(), 1);
    assert_eq!(renderer.last_report().unwrap().outcome, FrameOutcome::Abandoned);

    // Nothing the abandoned frame painted reached the cache.
    assert_eq!(renderer.cache().len(), cached);
    assert_eq!(renderer.cache().previous_fingerprint(id), fingerprint);

    // The baseline is still "old": re-rendering "old" writes nothing.
    renderer.graph().mark_dirty(id, id);
    renderer.schedule_render(Arc::new(Text::new(id, "old")));
    assert_eq!(sink.writes(), 1);
    assert_eq!(renderer.last_report().unwrap().outcome, FrameOutcome::Unchanged);

    slot.lock().take();
}
