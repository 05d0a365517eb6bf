// SPDX-License-Identifier: MIT
//
// WriteGuard: the single-writer net around the output path.
//
// A renderer mints one guard and one token at construction. The guard lives
// inside the encoder; the token lives with whoever drives frames. Every
// encode and every hand-off to the sink must present the token, and each is
// admitted at most once per frame:
//
//   begin_frame  →  admit_encode  →  admit_write  →  begin_frame  → …
//
// A foreign token, a revoked guard, a second encode, or a write without an
// encode is a programming error. Debug builds panic on the spot; release
// builds log a warning and refuse, which drops the frame instead of putting
// a second byte stream on the wire.
//
// The token is neither `Clone` nor `Copy`, so holding it is the capability.

use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_GUARD_ID: AtomicU64 = AtomicU64::new(1);

// ─── WriteToken ─────────────────────────────────────────────────────────────

/// Proof of authority to drive one renderer's output path.
#[derive(Debug, PartialEq, Eq)]
pub struct WriteToken {
    id: u64,
}

impl WriteToken {
    #[inline]
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

// ─── WriteGuard ─────────────────────────────────────────────────────────────

/// Per-frame admission state for encodes and writes.
#[derive(Debug)]
pub struct WriteGuard {
    id: u64,
    frame: u64,
    revoked: bool,
    encoded: bool,
    written: bool,
}

impl WriteGuard {
    /// A fresh guard and the only token it will ever accept.
    #[must_use]
    pub fn mint() -> (Self, WriteToken) {
        let id = NEXT_GUARD_ID.fetch_add(1, Ordering::Relaxed);
        let guard = Self {
            id,
            frame: 0,
            revoked: false,
            encoded: false,
            written: false,
        };
        (guard, WriteToken { id })
    }

    /// Open a new frame: one encode and one write become available.
    pub fn begin_frame(&mut self) {
        self.frame += 1;
        self.encoded = false;
        self.written = false;
    }

    #[inline]
    #[must_use]
    pub const fn frame(&self) -> u64 {
        self.frame
    }

    /// Permanently refuse all further admissions.
    pub fn revoke(&mut self) {
        self.revoked = true;
    }

    #[inline]
    #[must_use]
    pub const fn is_revoked(&self) -> bool {
        self.revoked
    }

    /// Admit the frame's single encode.
    pub fn admit_encode(&mut self, token: &WriteToken) -> bool {
        if !self.check(token) {
            return false;
        }
        if self.encoded {
            return self.violation("second encode in one frame");
        }
        self.encoded = true;
        true
    }

    /// Admit the frame's single hand-off to the sink.
    pub fn admit_write(&mut self, token: &WriteToken) -> bool {
        if !self.check(token) {
            return false;
        }
        if !self.encoded {
            return self.violation("write without an encoded frame");
        }
        if self.written {
            return self.violation("second write in one frame");
        }
        self.written = true;
        true
    }

    fn check(&self, token: &WriteToken) -> bool {
        if token.id != self.id {
            return self.violation("foreign write token");
        }
        if self.revoked {
            return self.violation("revoked write token");
        }
        true
    }

    fn violation(&self, what: &str) -> bool {
        if cfg!(debug_assertions) {
            panic!("write guard violation: {what} (guard {}, frame {})", self.id, self.frame);
        }
        tracing::warn!(guard = self.id, frame = self.frame, "write guard violation: {what}; frame dropped");
        false
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
