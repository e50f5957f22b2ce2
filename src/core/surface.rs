//! Collaborator seams
//!
//! The session logic only talks to the windowing system and to the terminal
//! widget through these traits.

use std::io;
use thiserror::Error;

use super::placement::MonitorRect;

#[derive(Error, Debug)]
pub enum SurfaceError {
    #[error("Failed to open pseudo terminal: {0}")]
    Pty(String),

    #[error("Failed to spawn process: {0}")]
    Spawn(String),

    #[error("No command to spawn")]
    EmptyCommand,

    #[error("PTY I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Window manager hints
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowHints {
    pub decorated: bool,
    pub modal: bool,
    pub skip_taskbar: bool,
    pub skip_pager: bool,
}

impl WindowHints {
    /// Hints for a pop-up window
    pub const POPUP: WindowHints = WindowHints {
        decorated: false,
        modal: true,
        skip_taskbar: true,
        skip_pager: true,
    };
}

impl Default for WindowHints {
    fn default() -> Self {
        Self {
            decorated: true,
            modal: false,
            skip_taskbar: false,
            skip_pager: false,
        }
    }
}

/// A top-level window
pub trait Window {
    fn apply_hints(&mut self, hints: WindowHints);
    fn set_title(&mut self, title: &str);
    fn position(&self) -> (i32, i32);
    /// Geometry of the monitor containing the point, queried fresh
    fn monitor_at(&self, x: i32, y: i32) -> MonitorRect;
    fn size(&self) -> (u32, u32);
    /// Size left for the terminal surface inside the window
    fn content_size(&self) -> (u32, u32);
    fn resize(&mut self, width: u32, height: u32);
    fn move_to(&mut self, x: i32, y: i32);
    fn show(&mut self);
    fn destroy(&mut self);
}

/// A terminal widget able to run one child process
pub trait TerminalSurface {
    /// Resize the grid in cells
    fn resize(&mut self, cols: u16, rows: u16);

    /// Start `argv` attached to the surface.
    ///
    /// Returns immediately; the outcome is reported later as a
    /// `SessionEvent::SpawnFinished`.
    fn spawn_async(&mut self, argv: &[String]);

    /// Write text onto the grid as if the child had printed it
    fn show_message(&mut self, text: &str);

    /// Tear the surface down, hanging up the child if it is still running
    fn destroy(&mut self);

    /// Whether a child is attached and has not been reaped yet
    fn has_child(&self) -> bool;
}
