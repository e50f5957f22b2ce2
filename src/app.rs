//! Event loop
//!
//! Single-threaded: host terminal input, surface output and timers are all
//! handled here in turn. Only the PTY reader runs on its own thread.

use std::time::{Duration, Instant};

use anyhow::Context;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tracing::{debug, info, warn};

use crate::cli::Options;
use crate::config::Config;
use crate::core::pty::{PtySurface, SurfaceEvent};
use crate::core::session::{Flow, SessionEvent, SessionTimer, TerminalSession};
use crate::core::surface::TerminalSurface;
use crate::core::timer::TimerQueue;
use crate::signals;
use crate::ui::{InputModes, KeyMapper, Renderer, TuiWindow};

/// Upper bound on one wait for input, so child output is picked up promptly
const POLL_TIMEOUT: Duration = Duration::from_millis(10);

type Session = TerminalSession<TuiWindow, PtySurface>;

/// Run `command` in a window until it exits; returns the exit status.
pub fn run(options: &Options, command: Vec<String>, config: &Config) -> anyhow::Result<i32> {
    let mut renderer = Renderer::new(&config.profile, config.get_color_scheme())
        .context("Failed to open the controlling terminal")?;
    renderer.init().context("Failed to set up the terminal")?;

    let settings = config.session_settings();
    let (cols, rows) = settings.default_size;
    let surface = PtySurface::new(
        cols.clamp(1, u16::MAX as u32) as u16,
        rows.clamp(1, u16::MAX as u32) as u16,
        config.profile.scrollback_lines,
    )
    .with_scroll_on_output(config.profile.scroll_on_output);

    if let Err(e) = signals::install() {
        warn!("Failed to install signal handlers: {}", e);
    }

    let mut session = TerminalSession::new(TuiWindow::new(), surface, command, options, settings);
    session.start();
    if let Some(geometry) = session.geometry() {
        info!(
            "Window {}x{} at {:?}",
            geometry.width, geometry.height, geometry.position
        );
    }

    let result = event_loop(&mut session, &mut renderer, config.profile.audible_bell);
    let _ = renderer.cleanup();
    result
}

fn event_loop(
    session: &mut Session,
    renderer: &mut Renderer,
    audible_bell: bool,
) -> anyhow::Result<i32> {
    let mut timers: TimerQueue<SessionTimer> = TimerQueue::new();
    let mut redraw = false;

    loop {
        let now = Instant::now();

        if signals::take_close_request() {
            if let Flow::Exit(code) = session.handle(SessionEvent::CloseRequested, &mut timers, now) {
                return Ok(code);
            }
        }

        for ev in session.surface_mut().poll_events() {
            match ev {
                SurfaceEvent::Output => redraw = true,
                SurfaceEvent::Bell if audible_bell && !session.is_destroyed() => {
                    if let Err(e) = renderer.bell() {
                        warn!("Failed to ring the bell: {}", e);
                    }
                }
                _ => {}
            }
            if let Some(ev) = session_event(ev) {
                if let Flow::Exit(code) = session.handle(ev, &mut timers, now) {
                    return Ok(code);
                }
            }
        }

        for task in timers.pop_due(now) {
            if let Flow::Exit(code) = session.handle(SessionEvent::Timer(task), &mut timers, now) {
                return Ok(code);
            }
        }

        let full = session.window_mut().take_damage();
        if full || redraw {
            renderer.render(session.window(), session.surface().screen(), full)?;
            redraw = false;
        }

        let timeout = timers
            .timeout(Instant::now())
            .map_or(POLL_TIMEOUT, |t| t.min(POLL_TIMEOUT));
        if !event::poll(timeout)? {
            continue;
        }

        let flow = match event::read()? {
            Event::FocusGained => session.handle(SessionEvent::FocusIn, &mut timers, Instant::now()),
            Event::FocusLost => session.handle(SessionEvent::FocusOut, &mut timers, Instant::now()),
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if session.closes_on_input() {
                    session.handle(SessionEvent::CloseRequested, &mut timers, Instant::now())
                } else {
                    redraw |= handle_key(session, &key);
                    Flow::Continue
                }
            }
            Event::Paste(text) => {
                redraw |= leave_scrollback(session);
                let modes = InputModes::from_screen(session.surface().screen());
                send_input(session, &KeyMapper::paste(&text, &modes));
                Flow::Continue
            }
            Event::Resize(cols, rows) => {
                debug!("Host terminal resized to {}x{}", cols, rows);
                if let Some((c, r)) = session.window_mut().fit_to_monitor() {
                    session
                        .surface_mut()
                        .resize(c.min(u16::MAX as u32) as u16, r.min(u16::MAX as u32) as u16);
                }
                Flow::Continue
            }
            _ => Flow::Continue,
        };
        if let Flow::Exit(code) = flow {
            return Ok(code);
        }
    }
}

/// Handle a key press; returns whether the view changed
fn handle_key(session: &mut Session, key: &KeyEvent) -> bool {
    if let Some(pages) = scroll_pages(key) {
        let rows = session.surface().screen().size().0 as isize;
        session.surface_mut().scroll_view(pages * rows);
        return true;
    }

    let moved = leave_scrollback(session);
    let modes = InputModes::from_screen(session.surface().screen());
    if let Some(bytes) = KeyMapper::map(key, &modes) {
        send_input(session, &bytes);
    }
    moved
}

/// Shift+PageUp and Shift+PageDown page through scrollback
fn scroll_pages(key: &KeyEvent) -> Option<isize> {
    if key.modifiers != KeyModifiers::SHIFT {
        return None;
    }
    match key.code {
        KeyCode::PageUp => Some(1),
        KeyCode::PageDown => Some(-1),
        _ => None,
    }
}

fn leave_scrollback(session: &mut Session) -> bool {
    if session.surface().scroll_offset() == 0 {
        return false;
    }
    session.surface_mut().scroll_to_bottom();
    true
}

fn send_input(session: &mut Session, bytes: &[u8]) {
    if session.is_destroyed() {
        return;
    }
    if let Err(e) = session.surface_mut().write_input(bytes) {
        warn!("Failed to write to PTY: {}", e);
    }
}

/// Translate what the surface reported into session input
fn session_event(event: SurfaceEvent) -> Option<SessionEvent> {
    match event {
        SurfaceEvent::Spawned(result) => Some(SessionEvent::SpawnFinished(result)),
        SurfaceEvent::Exited(status) => Some(SessionEvent::ChildExited(status)),
        SurfaceEvent::TitleChanged(title) => Some(SessionEvent::TitleChanged(title)),
        SurfaceEvent::Output | SurfaceEvent::Bell => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::surface::SurfaceError;

    #[test]
    fn test_session_event_mapping() {
        assert!(matches!(
            session_event(SurfaceEvent::Exited(5)),
            Some(SessionEvent::ChildExited(5))
        ));
        assert!(matches!(
            session_event(SurfaceEvent::Spawned(Err(SurfaceError::EmptyCommand))),
            Some(SessionEvent::SpawnFinished(Err(_)))
        ));
        assert!(matches!(
            session_event(SurfaceEvent::TitleChanged("top".to_string())),
            Some(SessionEvent::TitleChanged(t)) if t == "top"
        ));
        assert!(session_event(SurfaceEvent::Output).is_none());
        assert!(session_event(SurfaceEvent::Bell).is_none());
    }

    #[test]
    fn test_scroll_keys() {
        let key = |code, modifiers| KeyEvent::new(code, modifiers);
        assert_eq!(scroll_pages(&key(KeyCode::PageUp, KeyModifiers::SHIFT)), Some(1));
        assert_eq!(scroll_pages(&key(KeyCode::PageDown, KeyModifiers::SHIFT)), Some(-1));
        // plain paging goes to the program
        assert_eq!(scroll_pages(&key(KeyCode::PageUp, KeyModifiers::NONE)), None);
        assert_eq!(
            scroll_pages(&key(KeyCode::PageUp, KeyModifiers::SHIFT | KeyModifiers::CONTROL)),
            None
        );
        assert_eq!(scroll_pages(&key(KeyCode::Up, KeyModifiers::SHIFT)), None);
    }
}
