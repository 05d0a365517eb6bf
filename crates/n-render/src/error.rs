// SPDX-License-Identifier: MIT
//
// Error types.
//
// Only setup can fail with a `Result`: bad configuration, or terminal I/O
// while entering or leaving a screen mode. Frame production never returns
// an error. A sink failure ends that frame (see `FrameOutcome::Failed`) and
// the next frame simply tries again.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("terminal I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid renderer configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, RenderError>;
