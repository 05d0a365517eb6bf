// SPDX-License-Identifier: MIT
//
// Renderer: one terminal's frame pipeline, end to end.
//
// A frame runs these phases in order, on whichever thread won the pump:
//
//   1. Snapshot      environment from the source; a change wipes the cache
//   2. Paint         take the root's dirty set, walk the tree into `current`
//   3. Diff          `previous` vs `current` → ops (or plain-text compare)
//   4. Encode        ops → one byte stream, through the write guard
//   5. Write         one sink call, with scheduling rejected meanwhile
//   6. Commit        `current` becomes the new `previous`
//
// Cancellation is checked after paint, after diff and just before the
// write. Surfaces captured during paint are stored only once the frame is
// known not to be abandoned or dropped, so such a frame leaves `previous`,
// the sink and the cache as they were. A sink error skips the commit of
// `previous`, so the next frame diffs against what the terminal is actually
// showing. Its surfaces are still stored, being valid on their own.
//
// The two buffers swap on commit instead of copying. `current` is then the
// frame before last, which `prepare` + `clear` turn into a blank canvas.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;

use crate::buffer::TerminalBuffer;
use crate::cache::RenderCache;
use crate::config::RendererConfig;
use crate::diff::BufferDiffer;
use crate::encoder::Encoder;
use crate::env::EnvironmentSource;
use crate::error::Result;
use crate::geometry::{Size, Viewport};
use crate::graph::RenderGraph;
use crate::guard::WriteToken;
use crate::node::Renderable;
use crate::pump::{Admission, FramePump, FrameScope};
use crate::sink::OutputSink;
use crate::telemetry::{FrameObserver, FrameOutcome, FrameReport, FrameStats, PhaseTimings, TracingObserver};
use crate::walker::{self, WalkContext};

// ─── FrameProducer ──────────────────────────────────────────────────────────

/// Everything a frame mutates. Locked for the duration of one frame.
struct FrameProducer {
    token: WriteToken,
    encoder: Encoder,
    differ: BufferDiffer,
    current: TerminalBuffer,
    previous: Option<TerminalBuffer>,
    sink: Box<dyn OutputSink>,
    frames: u64,
}

/// The shared collaborators a frame reads.
struct FrameInputs<'a> {
    config: &'a RendererConfig,
    cache: &'a RenderCache,
    graph: &'a RenderGraph,
    env: &'a dyn EnvironmentSource,
}

impl FrameProducer {
    fn frame(&mut self, root: &dyn Renderable, scope: &FrameScope<'_>, inputs: &FrameInputs<'_>) -> FrameReport {
        self.frames += 1;
        let frame = self.frames;
        let mut timings = PhaseTimings::default();

        let env = inputs.env.snapshot();
        inputs.cache.sync_environment(env);
        self.encoder.begin_frame();

        // ── Paint ──
        let started = Instant::now();
        self.current.prepare(env.size);
        self.current.clear();
        let dirty = inputs.graph.take(root.id());
        let ctx = WalkContext {
            cache: inputs.cache,
            dirty: &dirty,
            viewport: Viewport::full(env.size),
            env,
            trust_dirty_tracking: inputs.config.trust_dirty_tracking,
        };
        let painted = walker::paint(root, &mut self.current, &ctx);
        timings.paint = started.elapsed();

        let report = self.present(frame, FrameStats::from_walk(painted.stats), timings, env.size, scope);
        if !matches!(report.outcome, FrameOutcome::Abandoned | FrameOutcome::Dropped) {
            painted.commit(inputs.cache);
        }
        report
    }

    /// Diff, encode, write and commit the painted `current` buffer.
    fn present(
        &mut self,
        frame: u64,
        mut stats: FrameStats,
        mut timings: PhaseTimings,
        size: Size,
        scope: &FrameScope<'_>,
    ) -> FrameReport {
        let report = |stats, timings, outcome| FrameReport {
            frame,
            stats,
            timings,
            outcome,
        };

        if scope.is_cancelled() {
            return report(stats, timings, FrameOutcome::Abandoned);
        }
        if self.encoder.is_revoked() {
            return report(stats, timings, FrameOutcome::Dropped);
        }

        // ── Diff + encode ──
        let encoded = if self.sink.is_interactive() {
            let started = Instant::now();
            let ops = self.differ.diff(self.previous.as_ref(), &self.current, size);
            timings.diff = started.elapsed();
            stats.ops = ops.len();
            stats.full_redraw = ops.is_full_redraw();

            if ops.is_empty() {
                return report(stats, timings, FrameOutcome::Unchanged);
            }
            if scope.is_cancelled() {
                return report(stats, timings, FrameOutcome::Abandoned);
            }

            let started = Instant::now();
            let encoded = self.encoder.encode(&self.token, &ops);
            timings.encode = started.elapsed();
            encoded
        } else {
            let started = Instant::now();
            let unchanged = self.previous.as_ref().is_some_and(|prev| *prev == self.current);
            timings.diff = started.elapsed();

            if unchanged {
                return report(stats, timings, FrameOutcome::Unchanged);
            }
            if scope.is_cancelled() {
                return report(stats, timings, FrameOutcome::Abandoned);
            }

            let started = Instant::now();
            let encoded = self.encoder.encode_plain(&self.token, &self.current);
            timings.encode = started.elapsed();
            encoded
        };

        if encoded.is_none() {
            return report(stats, timings, FrameOutcome::Dropped);
        }
        if scope.is_cancelled() {
            return report(stats, timings, FrameOutcome::Abandoned);
        }

        // ── Write ──
        let started = Instant::now();
        let Some(bytes) = self.encoder.handoff(&self.token) else {
            return report(stats, timings, FrameOutcome::Dropped);
        };
        let sink = &mut self.sink;
        let written = scope.writing(|| sink.write(bytes));
        timings.write = started.elapsed();

        if let Err(err) = written {
            tracing::warn!(frame, error = %err, "sink write failed, keeping previous frame as baseline");
            return report(stats, timings, FrameOutcome::Failed(err.kind()));
        }
        stats.bytes_written = bytes.len();

        // ── Commit ──
        let spare = self.previous.take().unwrap_or_else(|| TerminalBuffer::new(size));
        self.previous = Some(std::mem::replace(&mut self.current, spare));

        report(stats, timings, FrameOutcome::Written)
    }
}

// ─── Renderer ───────────────────────────────────────────────────────────────

/// Drives frames for one output sink.
///
/// `schedule_render` is safe to call from any thread. Calls that arrive
/// while a frame is in flight coalesce; the caller that found the renderer
/// idle produces every frame of the burst on its own thread.
///
/// ```
/// use std::sync::Arc;
/// use n_render::config::RendererConfig;
/// use n_render::env::TerminalEnvironment;
/// use n_render::geometry::Size;
/// use n_render::node::{NodeId, Text};
/// use n_render::renderer::Renderer;
/// use n_render::sink::CaptureSink;
///
/// let sink = CaptureSink::plain();
/// let env = TerminalEnvironment::new(Size::new(10, 1));
/// let renderer = Renderer::new(RendererConfig::default(), sink.clone(), env)?;
///
/// renderer.schedule_render(Arc::new(Text::new(NodeId::next(), "hi")));
/// assert_eq!(sink.last(), Some(b"hi\n".to_vec()));
/// # Ok::<(), n_render::error::RenderError>(())
/// ```
pub struct Renderer {
    config: RendererConfig,
    pump: FramePump<Arc<dyn Renderable>>,
    producer: Mutex<FrameProducer>,
    graph: Arc<RenderGraph>,
    cache: Arc<RenderCache>,
    env: Box<dyn EnvironmentSource>,
    observer: Box<dyn FrameObserver>,
    last_report: Mutex<Option<FrameReport>>,
}

impl Renderer {
    /// A renderer writing to `sink`, taking a capability snapshot from `env`
    /// every frame.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`](crate::error::RenderError) if
    /// `config` fails validation.
    pub fn new(
        config: RendererConfig,
        sink: impl OutputSink + 'static,
        env: impl EnvironmentSource + 'static,
    ) -> Result<Self> {
        config.validate()?;

        let (encoder, token) = Encoder::new(config.max_write_chunk);
        let producer = FrameProducer {
            token,
            encoder,
            differ: BufferDiffer::new(config.diff_mode),
            current: TerminalBuffer::new(Size::ZERO),
            previous: None,
            sink: Box::new(sink),
            frames: 0,
        };

        Ok(Self {
            pump: FramePump::new(config.max_coalesced_frames),
            producer: Mutex::new(producer),
            graph: Arc::new(RenderGraph::new()),
            cache: Arc::new(RenderCache::new(config.cache_capacity)),
            env: Box::new(env),
            observer: Box::new(TracingObserver),
            last_report: Mutex::new(None),
            config,
        })
    }

    /// Share `cache` with other renderers or harnesses.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<RenderCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Share `graph` with whoever marks nodes dirty.
    #[must_use]
    pub fn with_graph(mut self, graph: Arc<RenderGraph>) -> Self {
        self.graph = graph;
        self
    }

    /// Replace the default [`TracingObserver`].
    #[must_use]
    pub fn with_observer(mut self, observer: impl FrameObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Render the tree under `root`, now or coalesced into the frame in
    /// flight.
    pub fn schedule_render(&self, root: Arc<dyn Renderable>) -> Admission {
        self.pump.schedule(root, |root, scope| self.produce(root.as_ref(), scope))
    }

    /// Abandon the frame in flight at its next phase boundary and drop the
    /// pending update.
    pub fn cancel(&self) {
        self.pump.cancel();
    }

    /// Reject all future updates and revoke the write token. Waits for a
    /// frame in flight to finish.
    pub fn shutdown(&self) {
        self.pump.close();
        self.producer.lock().encoder.revoke();
        tracing::debug!(frames = self.pump.frames_produced(), "renderer shut down");
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.pump.is_closed()
    }

    /// Forget the baseline so the next frame is a full redraw. For hosts
    /// that know the screen was disturbed behind the renderer's back.
    pub fn force_full_redraw(&self) {
        self.producer.lock().previous = None;
    }

    /// Report of the most recent frame.
    #[must_use]
    pub fn last_report(&self) -> Option<FrameReport> {
        *self.last_report.lock()
    }

    /// Frames produced so far, whatever their outcome.
    #[must_use]
    pub fn frames_produced(&self) -> u64 {
        self.pump.frames_produced()
    }

    #[must_use]
    pub const fn graph(&self) -> &Arc<RenderGraph> {
        &self.graph
    }

    #[must_use]
    pub const fn cache(&self) -> &Arc<RenderCache> {
        &self.cache
    }

    #[must_use]
    pub const fn config(&self) -> &RendererConfig {
        &self.config
    }

    fn produce(&self, root: &dyn Renderable, scope: &FrameScope<'_>) {
        let started = Instant::now();
        let inputs = FrameInputs {
            config: &self.config,
            cache: &self.cache,
            graph: &self.graph,
            env: self.env.as_ref(),
        };
        let report = self.producer.lock().frame(root, scope, &inputs);

        let elapsed = started.elapsed();
        if elapsed > self.config.frame_budget {
            tracing::warn!(
                frame = report.frame,
                elapsed_us = elapsed.as_micros(),
                budget_us = self.config.frame_budget.as_micros(),
                "frame over budget"
            );
        }

        *self.last_report.lock() = Some(report);
        self.observer.on_frame(&report);
    }
}

impl std::fmt::Debug for Renderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Renderer")
            .field("config", &self.config)
            .field("frames", &self.pump.frames_produced())
            .field("closed", &self.pump.is_closed())
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
