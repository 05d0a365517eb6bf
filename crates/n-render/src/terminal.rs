// SPDX-License-Identifier: MIT
//
// Terminal queries and the alternate-screen session.
//
// Safety: `ioctl(TIOCGWINSZ)`, `isatty` and the raw fd write in the panic
// hook are plain POSIX calls with no safe equivalent in std. Each unsafe
// block is one call.
//
// The renderer itself never touches the terminal: it writes bytes to a
// sink. These helpers are for hosts that own a real terminal. They size the
// first frame, pick the output mode and keep the user's shell intact.
//
// The panic hook writes a fixed restore sequence straight to fd 1, skipping
// Rust's stdout lock. A panic in the middle of a sink write holds that lock,
// and going through it would deadlock the hook.

#![allow(unsafe_code)]

use std::io::{self, Write};
use std::sync::Once;

use crate::ansi;
use crate::env::TerminalEnvironment;
use crate::error::Result;
use crate::geometry::Size;

// ─── Queries ────────────────────────────────────────────────────────────────

/// Current terminal size via `ioctl(TIOCGWINSZ)`.
///
/// `None` if stdout is not a terminal or the query fails.
#[cfg(unix)]
#[must_use]
pub fn get_size() -> Option<Size> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let result = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };

    if result == 0 && ws.ws_col > 0 && ws.ws_row > 0 {
        Some(Size::new(ws.ws_col, ws.ws_row))
    } else {
        None
    }
}

#[cfg(not(unix))]
#[must_use]
pub fn get_size() -> Option<Size> {
    None
}

/// Whether stdout is connected to a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_stdout_tty() -> bool {
    unsafe { libc::isatty(libc::STDOUT_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_stdout_tty() -> bool {
    false
}

/// Capability snapshot for the live terminal, falling back to `fallback`
/// when the size can't be queried.
#[must_use]
pub fn detect_environment(fallback: Size) -> TerminalEnvironment {
    TerminalEnvironment::detect(get_size().unwrap_or(fallback))
}

// ─── Panic-Safe Restore ─────────────────────────────────────────────────────

/// Reset attributes, show the cursor, leave the alternate screen.
const EMERGENCY_RESTORE: &[u8] = b"\x1b[0m\x1b[?25h\x1b[?1049l";

static PANIC_HOOK_INSTALLED: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK_INSTALLED.call_once(|| {
        let original = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            emergency_restore();
            original(info);
        }));
    });
}

fn emergency_restore() {
    #[cfg(unix)]
    unsafe {
        let _ = libc::write(
            libc::STDOUT_FILENO,
            EMERGENCY_RESTORE.as_ptr().cast::<libc::c_void>(),
            EMERGENCY_RESTORE.len(),
        );
    }

    #[cfg(not(unix))]
    {
        let _ = io::stdout().write_all(EMERGENCY_RESTORE);
        let _ = io::stdout().flush();
    }
}

// ─── AltScreen ──────────────────────────────────────────────────────────────

/// An alternate-screen session, restored on drop (and on panic).
///
/// ```no_run
/// use n_render::terminal::AltScreen;
///
/// let screen = AltScreen::enter()?;
/// // ... render frames ...
/// drop(screen);
/// # Ok::<(), n_render::error::RenderError>(())
/// ```
#[derive(Debug)]
pub struct AltScreen {
    active: bool,
}

impl AltScreen {
    /// Switch to the alternate screen and hide the cursor.
    ///
    /// # Errors
    ///
    /// Returns an error if stdout can't be written.
    pub fn enter() -> Result<Self> {
        install_panic_hook();
        let mut out = io::stdout().lock();
        ansi::enter_alt_screen(&mut out)?;
        ansi::cursor_hide(&mut out)?;
        ansi::clear_screen(&mut out)?;
        out.flush()?;
        Ok(Self { active: true })
    }

    /// Leave the alternate screen now instead of on drop.
    ///
    /// # Errors
    ///
    /// Returns an error if stdout can't be written.
    pub fn leave(mut self) -> Result<()> {
        self.restore()?;
        Ok(())
    }

    fn restore(&mut self) -> io::Result<()> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        let mut out = io::stdout().lock();
        ansi::reset(&mut out)?;
        ansi::cursor_show(&mut out)?;
        ansi::exit_alt_screen(&mut out)?;
        out.flush()
    }
}

impl Drop for AltScreen {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}

// ─── Tests ──────────────────────────────────────────────────────────────────
