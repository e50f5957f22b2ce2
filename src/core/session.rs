//! Session management
//!
//! A session owns one window, one terminal surface and the command running in
//! it. It places the window, arms pop-up auto-dismiss and turns the child's
//! exit into the process exit status.

use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use super::dismiss::{DismissController, DEFAULT_DISMISS_DELAY};
use super::placement::{self, GridPosition, SizeFraction, WindowGeometry};
use super::surface::{SurfaceError, TerminalSurface, Window, WindowHints};
use super::timer::TimerQueue;
use crate::cli::Options;

/// Events delivered to the session by the event loop
#[derive(Debug)]
pub enum SessionEvent {
    FocusIn,
    FocusOut,
    Timer(SessionTimer),
    /// Result of `TerminalSurface::spawn_async`, carrying the child pid
    SpawnFinished(Result<u32, SurfaceError>),
    /// The child exited with this status
    ChildExited(i32),
    /// The program in the terminal asked for a new window title
    TitleChanged(String),
    /// The user or the host asked for the window to close
    CloseRequested,
}

/// Deferred tasks owned by the session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionTimer {
    Dismiss,
}

/// What the event loop should do next
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit(i32),
}

/// Session tunables that do not come from the command line
#[derive(Clone, Debug)]
pub struct SessionSettings {
    /// Window size when no size fraction was requested
    pub default_size: (u32, u32),
    pub dismiss_delay: Duration,
    pub title: String,
    /// Follow titles set by the program in the terminal
    pub dynamic_title: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            default_size: (80, 24),
            dismiss_delay: DEFAULT_DISMISS_DELAY,
            title: "Terminal".to_string(),
            dynamic_title: true,
        }
    }
}

pub struct TerminalSession<W: Window, S: TerminalSurface> {
    window: W,
    surface: S,
    command: Vec<String>,
    popup: bool,
    size_fraction: Option<SizeFraction>,
    anchor: Option<GridPosition>,
    settings: SessionSettings,
    /// Present only in pop-up mode
    dismiss: Option<DismissController>,
    geometry: Option<WindowGeometry>,
    /// The command never started; the window only shows the error
    spawn_failed: bool,
    destroyed: bool,
}

impl<W: Window, S: TerminalSurface> TerminalSession<W, S> {
    pub fn new(
        window: W,
        surface: S,
        command: Vec<String>,
        options: &Options,
        settings: SessionSettings,
    ) -> Self {
        let dismiss = options
            .popup
            .then(|| DismissController::new(settings.dismiss_delay));
        Self {
            window,
            surface,
            command,
            popup: options.popup,
            size_fraction: options.size_fraction,
            anchor: options.anchor,
            settings,
            dismiss,
            geometry: None,
            spawn_failed: false,
            destroyed: false,
        }
    }

    /// Set the window up, show it and start the command.
    ///
    /// The window is visible before the spawn result is known.
    pub fn start(&mut self) {
        let hints = if self.popup {
            WindowHints::POPUP
        } else {
            WindowHints::default()
        };
        self.window.apply_hints(hints);
        self.window.set_title(&self.settings.title);

        let geometry = placement::place(
            &mut self.window,
            self.size_fraction,
            self.anchor,
            self.settings.default_size,
        );
        self.geometry = Some(geometry);

        self.window.show();

        let (cols, rows) = self.window.content_size();
        self.surface.resize(clamp_cells(cols), clamp_cells(rows));

        info!("Spawning '{}'", self.command.join(" "));
        self.surface.spawn_async(&self.command);
    }

    pub fn handle(
        &mut self,
        event: SessionEvent,
        timers: &mut TimerQueue<SessionTimer>,
        now: Instant,
    ) -> Flow {
        match event {
            SessionEvent::FocusOut => {
                if let Some(dismiss) = self.dismiss.as_mut() {
                    if let Some(delay) = dismiss.focus_lost() {
                        debug!("Focus lost, dismissing in {:?}", delay);
                        timers.add(now, delay, SessionTimer::Dismiss);
                    }
                }
                Flow::Continue
            }
            SessionEvent::FocusIn => {
                if let Some(dismiss) = self.dismiss.as_mut() {
                    dismiss.focus_gained();
                }
                Flow::Continue
            }
            SessionEvent::Timer(SessionTimer::Dismiss) => {
                let fire = self
                    .dismiss
                    .as_mut()
                    .map(|d| d.timer_fired())
                    .unwrap_or(false);
                if fire && !self.destroyed {
                    info!("Pop-up lost focus, closing");
                    self.destroy()
                } else {
                    Flow::Continue
                }
            }
            SessionEvent::SpawnFinished(Ok(pid)) => {
                debug!("Child started with pid {}", pid);
                Flow::Continue
            }
            SessionEvent::SpawnFinished(Err(e)) => {
                let message = format!("failed to exec cmd '{}': {}", self.command.join(" "), e);
                warn!("{}", message);
                self.spawn_failed = true;
                if self.destroyed {
                    return Flow::Exit(0);
                }
                self.surface
                    .show_message(&format!("{}\r\n\r\nPress any key to close.\r\n", message));
                Flow::Continue
            }
            SessionEvent::ChildExited(status) => {
                info!("Child exited with status {}", status);
                Flow::Exit(status)
            }
            SessionEvent::TitleChanged(title) => {
                if self.settings.dynamic_title && !self.destroyed {
                    self.window.set_title(&title);
                }
                Flow::Continue
            }
            SessionEvent::CloseRequested => {
                info!("Close requested");
                self.destroy()
            }
        }
    }

    /// Whether the next key press should close the window instead of
    /// reaching a child
    pub fn closes_on_input(&self) -> bool {
        self.spawn_failed && !self.surface.has_child()
    }

    /// Close the window and hang up the child.
    ///
    /// The process keeps running until the child's exit is reported, so the
    /// exit status still comes from the child.
    pub fn destroy(&mut self) -> Flow {
        if !self.destroyed {
            self.destroyed = true;
            self.window.destroy();
            self.surface.destroy();
        }
        if self.surface.has_child() {
            Flow::Continue
        } else {
            Flow::Exit(0)
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn geometry(&self) -> Option<WindowGeometry> {
        self.geometry
    }

    pub fn window(&self) -> &W {
        &self.window
    }

    pub fn window_mut(&mut self) -> &mut W {
        &mut self.window
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }
}

fn clamp_cells(n: u32) -> u16 {
    n.clamp(1, u16::MAX as u32) as u16
}
