// SPDX-License-Identifier: MIT
//
// FramePump: single-flight, coalescing frame scheduler.
//
// Updates arrive from anywhere (a ticker thread, an input handler, the
// sink's own callbacks). At most one frame is produced at a time, and at
// most one update waits behind it:
//
//   idle ──update──▶ in-flight          produce a frame on the caller's thread
//   in-flight ──update──▶ pending        the update replaces the pending one
//   in-flight ──done, pending──▶ in-flight   next frame with the pending update
//   in-flight ──done, no pending──▶ idle
//
// Whoever moves the pump out of idle runs the burst: it keeps producing
// frames until nothing is pending. Everyone else returns immediately. An
// update that gets overwritten in the pending slot is never rendered on its
// own; only the latest one is guaranteed to reach a frame.
//
// Two safety valves:
//
//   - A burst that produces `max_burst` frames and still finds an update
//     pending is ended. The pending update is dropped, a warning is logged,
//     and the pump goes back to idle for the next external update.
//
//   - While a frame is writing to the sink, scheduling is rejected outright.
//     A sink that re-enters the scheduler (directly or via a callback) can
//     not get a second stream onto the wire.
//
// A panic inside `produce` unwinds through a guard that puts the pump back
// to idle, so one bad frame doesn't wedge the scheduler forever.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;

// ─── Admission ──────────────────────────────────────────────────────────────

/// What happened to a scheduled update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The caller ran the burst; its update (and any that coalesced behind
    /// it) has been produced.
    Started,
    /// A frame was in flight; the update now sits in the pending slot.
    Coalesced,
    /// A frame was writing, or the pump is closed. The update is dropped.
    Rejected,
}

// ─── FrameScope ─────────────────────────────────────────────────────────────

/// The producing side's view of the pump during one frame.
pub struct FrameScope<'a> {
    writing: &'a AtomicBool,
    cancelled: &'a AtomicBool,
    position: usize,
}

impl FrameScope<'_> {
    /// Whether `cancel` was called since this frame started.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }

    /// Position of this frame within its burst, starting at 1.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Run `write` with scheduling rejected for its duration.
    pub fn writing<R>(&self, write: impl FnOnce() -> R) -> R {
        struct Reset<'a>(&'a AtomicBool);
        impl Drop for Reset<'_> {
            fn drop(&mut self) {
                self.0.store(false, Ordering::Release);
            }
        }

        self.writing.store(true, Ordering::Release);
        let _reset = Reset(self.writing);
        write()
    }
}

// ─── FramePump ──────────────────────────────────────────────────────────────

struct PumpState<U> {
    in_flight: bool,
    pending: Option<U>,
    closed: bool,
}

/// Serializes and coalesces frame production.
pub struct FramePump<U> {
    state: Mutex<PumpState<U>>,
    writing: AtomicBool,
    cancelled: AtomicBool,
    max_burst: usize,
    frames: AtomicU64,
    aborted_bursts: AtomicU64,
}

impl<U> FramePump<U> {
    /// A pump ending any burst after `max_burst` frames. Zero is treated as
    /// one.
    #[must_use]
    pub fn new(max_burst: usize) -> Self {
        Self {
            state: Mutex::new(PumpState {
                in_flight: false,
                pending: None,
                closed: false,
            }),
            writing: AtomicBool::new(false),
            cancelled: AtomicBool::new(false),
            max_burst: max_burst.max(1),
            frames: AtomicU64::new(0),
            aborted_bursts: AtomicU64::new(0),
        }
    }

    /// Submit `update`. If the pump was idle, `produce` runs on this thread
    /// for this update and every update that coalesces while it runs.
    pub fn schedule(&self, update: U, mut produce: impl FnMut(U, &FrameScope<'_>)) -> Admission {
        if self.writing.load(Ordering::Acquire) {
            return Admission::Rejected;
        }

        {
            let mut state = self.state.lock();
            if state.closed {
                return Admission::Rejected;
            }
            if state.in_flight {
                state.pending = Some(update);
                return Admission::Coalesced;
            }
            state.in_flight = true;
            self.cancelled.store(false, Ordering::Release);
        }

        let burst = BurstGuard { pump: self };
        let mut update = update;
        let mut position = 1;

        loop {
            let scope = FrameScope {
                writing: &self.writing,
                cancelled: &self.cancelled,
                position,
            };
            produce(update, &scope);
            self.frames.fetch_add(1, Ordering::Relaxed);

            let mut state = self.state.lock();
            let Some(next) = state.pending.take() else {
                state.in_flight = false;
                drop(state);
                burst.disarm();
                return Admission::Started;
            };

            if position >= self.max_burst {
                state.in_flight = false;
                drop(state);
                burst.disarm();
                self.aborted_bursts.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    frames = position,
                    "frame pump hit its coalescing ceiling, burst aborted and pending update dropped"
                );
                drop(next);
                return Admission::Started;
            }

            self.cancelled.store(false, Ordering::Release);
            drop(state);
            update = next;
            position += 1;
        }
    }

    /// Abandon the frame in flight at its next check and drop any pending
    /// update.
    pub fn cancel(&self) {
        let mut state = self.state.lock();
        state.pending = None;
        if state.in_flight {
            self.cancelled.store(true, Ordering::Release);
        }
    }

    /// Reject every future update and drop the pending one. A frame already
    /// in flight finishes normally.
    pub fn close(&self) {
        let mut state = self.state.lock();
        state.closed = true;
        state.pending = None;
    }

    /// Drop the pending update and clear cancellation and closure. Does not
    /// touch a frame in flight.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.pending = None;
        state.closed = false;
        self.cancelled.store(false, Ordering::Release);
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        self.state.lock().in_flight
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Frames produced over the pump's lifetime.
    #[must_use]
    pub fn frames_produced(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }

    /// Bursts ended by the coalescing ceiling.
    #[must_use]
    pub fn aborted_bursts(&self) -> u64 {
        self.aborted_bursts.load(Ordering::Relaxed)
    }
}

/// Puts the pump back to idle if a burst unwinds.
struct BurstGuard<'a, U> {
    pump: &'a FramePump<U>,
}

impl<U> BurstGuard<'_, U> {
    fn disarm(self) {
        std::mem::forget(self);
    }
}

impl<U> Drop for BurstGuard<'_, U> {
    fn drop(&mut self) {
        let mut state = self.pump.state.lock();
        state.in_flight = false;
        state.pending = None;
        self.pump.writing.store(false, Ordering::Release);
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
