// SPDX-License-Identifier: MIT
//
// Renderer configuration.
//
// Plain data with defaults that suit an interactive terminal at roughly
// 80 frames per second. `validate` rejects values that would make the
// pipeline misbehave; `Renderer::new` calls it before building anything.

use std::time::Duration;

use crate::diff::DiffMode;
use crate::error::{RenderError, Result};

/// Smallest merged write-bytes run the encoder accepts.
pub const MIN_WRITE_CHUNK: usize = 64;

/// Tuning knobs for a [`Renderer`](crate::renderer::Renderer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RendererConfig {
    /// Advisory per-frame budget. A frame that takes longer logs a warning;
    /// nothing is preempted.
    pub frame_budget: Duration,

    /// Frames one pump burst may produce before a still-pending update is
    /// dropped. Must be at least 1.
    pub max_coalesced_frames: usize,

    /// Ceiling on a single merged run of text bytes in the encoded stream.
    /// Must be at least [`MIN_WRITE_CHUNK`].
    pub max_write_chunk: usize,

    /// Surfaces the render cache retains before evicting the least recently
    /// used. Must be at least 1.
    pub cache_capacity: usize,

    /// How changed rows are turned into ops.
    pub diff_mode: DiffMode,

    /// Let a clean node reuse its previous surface without recomputing its
    /// fingerprint. Turn off when the caller's dirty marking can't be
    /// trusted to catch every content change.
    pub trust_dirty_tracking: bool,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            frame_budget: Duration::from_millis(12),
            max_coalesced_frames: 128,
            max_write_chunk: 4096,
            cache_capacity: 4096,
            diff_mode: DiffMode::Sparse,
            trust_dirty_tracking: true,
        }
    }
}

impl RendererConfig {
    /// Check every bounded field.
    ///
    /// # Errors
    ///
    /// Returns [`RenderError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        if self.max_coalesced_frames == 0 {
            return Err(RenderError::InvalidConfig(
                "max_coalesced_frames must be at least 1".into(),
            ));
        }
        if self.max_write_chunk < MIN_WRITE_CHUNK {
            return Err(RenderError::InvalidConfig(format!(
                "max_write_chunk must be at least {MIN_WRITE_CHUNK}, got {}",
                self.max_write_chunk
            )));
        }
        if self.cache_capacity == 0 {
            return Err(RenderError::InvalidConfig(
                "cache_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
