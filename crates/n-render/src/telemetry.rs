// SPDX-License-Identifier: MIT
//
// Frame telemetry: what each frame cost and how it ended.
//
// Every produced frame yields one `FrameReport`, handed to the renderer's
// `FrameObserver`. These are observability signals only; nothing in the
// pipeline reads them back. The default observer logs a one-line summary
// at debug level.

use std::time::Duration;

use crate::walker::WalkStats;

// ─── Outcome ────────────────────────────────────────────────────────────────

/// How a frame ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// Bytes reached the sink; the frame is the new baseline.
    Written,
    /// The frame matched the baseline. Nothing was written.
    Unchanged,
    /// Cancelled before the write. Baseline and sink untouched.
    Abandoned,
    /// The write guard refused (renderer shut down, or a guard violation in
    /// a release build).
    Dropped,
    /// The sink returned an error. The baseline was kept.
    Failed(std::io::ErrorKind),
}

impl FrameOutcome {
    #[must_use]
    pub const fn is_written(self) -> bool {
        matches!(self, Self::Written)
    }
}

// ─── Stats & Timings ────────────────────────────────────────────────────────

/// Per-frame counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub nodes_walked: u32,
    pub nodes_painted: u32,
    pub nodes_culled: u32,
    pub cache_hits: u32,
    pub cache_stores: u32,
    /// Diff ops produced (zero for plain output).
    pub ops: usize,
    /// Bytes handed to the sink (zero unless written).
    pub bytes_written: usize,
    pub full_redraw: bool,
}

impl FrameStats {
    #[must_use]
    pub const fn from_walk(walk: WalkStats) -> Self {
        Self {
            nodes_walked: walk.walked,
            nodes_painted: walk.painted,
            nodes_culled: walk.culled,
            cache_hits: walk.hits,
            cache_stores: walk.stores,
            ops: 0,
            bytes_written: 0,
            full_redraw: false,
        }
    }
}

/// Wall time per phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseTimings {
    pub paint: Duration,
    pub diff: Duration,
    pub encode: Duration,
    pub write: Duration,
}

impl PhaseTimings {
    #[must_use]
    pub fn total(&self) -> Duration {
        self.paint + self.diff + self.encode + self.write
    }
}

/// Everything known about one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    /// Renderer-local frame number, starting at 1.
    pub frame: u64,
    pub stats: FrameStats,
    pub timings: PhaseTimings,
    pub outcome: FrameOutcome,
}

// ─── Observers ──────────────────────────────────────────────────────────────

/// Receives a report for every frame the renderer produces.
pub trait FrameObserver: Send + Sync {
    fn on_frame(&self, report: &FrameReport);
}

impl<F> FrameObserver for F
where
    F: Fn(&FrameReport) + Send + Sync,
{
    fn on_frame(&self, report: &FrameReport) {
        self(report);
    }
}

/// Logs each frame at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl FrameObserver for TracingObserver {
    fn on_frame(&self, report: &FrameReport) {
        let s = &report.stats;
        let t = &report.timings;
        tracing::debug!(
            frame = report.frame,
            outcome = ?report.outcome,
            walked = s.nodes_walked,
            painted = s.nodes_painted,
            culled = s.nodes_culled,
            hits = s.cache_hits,
            stores = s.cache_stores,
            ops = s.ops,
            bytes = s.bytes_written,
            full_redraw = s.full_redraw,
            paint_us = t.paint.as_micros(),
            diff_us = t.diff.as_micros(),
            encode_us = t.encode.as_micros(),
            write_us = t.write.as_micros(),
            "frame"
        );
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
