//! PTY-backed terminal surface
//!
//! Runs the child on a `portable-pty` pseudo terminal and interprets its
//! output with `vt100`. A reader thread forwards raw output over a channel;
//! everything else happens on the event loop thread.

use std::collections::VecDeque;
use std::io::{Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use tracing::{debug, warn};

use super::surface::{SurfaceError, TerminalSurface};

pub type Result<T> = std::result::Result<T, SurfaceError>;

/// Events produced by [`PtySurface::poll_events`]
#[derive(Debug)]
pub enum SurfaceEvent {
    /// Outcome of the last `spawn_async`
    Spawned(Result<u32>),
    /// The screen changed
    Output,
    TitleChanged(String),
    /// The program rang the bell
    Bell,
    /// The child was reaped with this status
    Exited(i32),
}

/// Requests the program makes through escape sequences, collected while
/// the parser runs
#[derive(Debug, Default)]
struct ParserRequests {
    title: Option<String>,
    bell: bool,
}

impl vt100::Callbacks for ParserRequests {
    fn set_window_title(&mut self, _: &mut vt100::Screen, title: &[u8]) {
        self.title = Some(String::from_utf8_lossy(title).into_owned());
    }

    fn audible_bell(&mut self, _: &mut vt100::Screen) {
        self.bell = true;
    }
}

struct Running {
    master: Box<dyn MasterPty + Send>,
    writer: Box<dyn Write + Send>,
    output_rx: Receiver<Vec<u8>>,
}

pub struct PtySurface {
    cols: u16,
    rows: u16,
    parser: vt100::Parser<ParserRequests>,
    child: Option<Box<dyn Child + Send + Sync>>,
    running: Option<Running>,
    pending: VecDeque<SurfaceEvent>,
    /// Jump back to the live screen when output arrives
    scroll_on_output: bool,
    destroyed: bool,
}

impl PtySurface {
    pub fn new(cols: u16, rows: u16, scrollback: usize) -> Self {
        Self {
            cols,
            rows,
            parser: vt100::Parser::new_with_callbacks(rows, cols, scrollback, ParserRequests::default()),
            child: None,
            running: None,
            pending: VecDeque::new(),
            scroll_on_output: true,
            destroyed: false,
        }
    }

    pub fn with_scroll_on_output(mut self, enabled: bool) -> Self {
        self.scroll_on_output = enabled;
        self
    }

    pub fn screen(&self) -> &vt100::Screen {
        self.parser.screen()
    }

    /// Send keyboard input to the child
    pub fn write_input(&mut self, data: &[u8]) -> Result<()> {
        if let Some(running) = self.running.as_mut() {
            running.writer.write_all(data)?;
            running.writer.flush()?;
        }
        Ok(())
    }

    /// Rows scrolled back into history, 0 for the live screen
    pub fn scroll_offset(&self) -> usize {
        self.parser.screen().scrollback()
    }

    /// Move the view `delta` rows back into history, or forward if negative
    pub fn scroll_view(&mut self, delta: isize) {
        let current = self.scroll_offset();
        let target = if delta >= 0 {
            current.saturating_add(delta as usize)
        } else {
            current.saturating_sub(delta.unsigned_abs())
        };
        // clamped to the available history by vt100
        self.parser.screen_mut().set_scrollback(target);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.parser.screen_mut().set_scrollback(0);
    }

    /// Drain pending output and report what happened since the last call
    pub fn poll_events(&mut self) -> Vec<SurfaceEvent> {
        let mut events: Vec<SurfaceEvent> = self.pending.drain(..).collect();

        let mut chunks = Vec::new();
        if let Some(running) = self.running.as_ref() {
            loop {
                match running.output_rx.try_recv() {
                    Ok(data) => chunks.push(data),
                    Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
                }
            }
        }
        if !chunks.is_empty() {
            for data in &chunks {
                self.ingest(data);
            }
            events.extend(self.pending.drain(..));
        }

        if let Some(status) = self.reap() {
            events.push(SurfaceEvent::Exited(status));
        }

        events
    }

    /// Run output through the parser and queue what it produced
    fn ingest(&mut self, data: &[u8]) {
        self.parser.process(data);
        if self.scroll_on_output {
            self.scroll_to_bottom();
        }

        let requests = self.parser.callbacks_mut();
        let title = requests.title.take();
        let bell = std::mem::take(&mut requests.bell);

        if let Some(title) = title {
            self.pending.push_back(SurfaceEvent::TitleChanged(title));
        }
        if bell {
            self.pending.push_back(SurfaceEvent::Bell);
        }
        if !matches!(self.pending.back(), Some(SurfaceEvent::Output)) {
            self.pending.push_back(SurfaceEvent::Output);
        }
    }

    fn reap(&mut self) -> Option<i32> {
        let child = self.child.as_mut()?;
        match child.try_wait() {
            Ok(Some(status)) => {
                self.child = None;
                Some(status.exit_code() as i32)
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to poll child: {}", e);
                self.child = None;
                Some(1)
            }
        }
    }

    fn spawn(&mut self, argv: &[String]) -> Result<u32> {
        let (program, args) = argv.split_first().ok_or(SurfaceError::EmptyCommand)?;

        let pty_system = native_pty_system();
        let pair = pty_system
            .openpty(PtySize {
                rows: self.rows,
                cols: self.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| SurfaceError::Pty(e.to_string()))?;

        let mut cmd = CommandBuilder::new(program);
        cmd.args(args);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }
        cmd.env("TERM", "xterm-256color");
        cmd.env("COLORTERM", "truecolor");
        cmd.env("POPTERM", "1");

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| SurfaceError::Spawn(e.to_string()))?;
        // the child holds the only slave handle from here on
        drop(pair.slave);

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| SurfaceError::Pty(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| SurfaceError::Pty(e.to_string()))?;

        // ends on EOF once the child side is gone, or when the receiver is dropped
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        thread::spawn(move || {
            let mut buffer = [0u8; 4096];
            loop {
                match reader.read(&mut buffer) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if tx.send(buffer[..n].to_vec()).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        let pid = child.process_id().unwrap_or(0);
        self.child = Some(child);
        self.running = Some(Running {
            master: pair.master,
            writer,
            output_rx: rx,
        });
        Ok(pid)
    }
}

impl TerminalSurface for PtySurface {
    fn resize(&mut self, cols: u16, rows: u16) {
        let (cols, rows) = (cols.max(1), rows.max(1));
        self.cols = cols;
        self.rows = rows;
        self.parser.screen_mut().set_size(rows, cols);
        if let Some(running) = self.running.as_ref() {
            let size = PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            };
            if let Err(e) = running.master.resize(size) {
                warn!("Failed to resize PTY: {}", e);
            }
        }
    }

    fn spawn_async(&mut self, argv: &[String]) {
        let result = self.spawn(argv);
        self.pending.push_back(SurfaceEvent::Spawned(result));
    }

    fn show_message(&mut self, text: &str) {
        self.ingest(text.as_bytes());
    }

    fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        if let Some(child) = self.child.as_mut() {
            debug!("Hanging up child {:?}", child.process_id());
            if let Err(e) = child.kill() {
                warn!("Failed to kill child: {}", e);
            }
        }
        // closing the master delivers the hangup; the reader thread ends on EOF
        self.running = None;
    }

    fn has_child(&self) -> bool {
        self.child.is_some()
    }
}

impl Drop for PtySurface {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn titles(events: &[SurfaceEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::TitleChanged(t) => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_title_sequences() {
        let mut surface = PtySurface::new(80, 24, 0);
        surface.show_message("hello\x1b]0;vim\x07world");
        assert_eq!(titles(&surface.poll_events()), vec!["vim".to_string()]);

        surface.show_message("\x1b]2;htop\x1b\\");
        assert_eq!(titles(&surface.poll_events()), vec!["htop".to_string()]);

        surface.show_message("plain text\r\n");
        let events = surface.poll_events();
        assert!(titles(&events).is_empty());
        assert!(matches!(events.as_slice(), [SurfaceEvent::Output]));
    }

    #[test]
    fn test_icon_name_and_hyperlinks_are_not_titles() {
        let mut surface = PtySurface::new(80, 24, 0);
        surface.show_message("\x1b]1;icon\x07\x1b]8;;http://x\x07link\x1b]8;;\x07");
        assert!(titles(&surface.poll_events()).is_empty());
    }

    #[test]
    fn test_bell() {
        let mut surface = PtySurface::new(80, 24, 0);
        surface.show_message("ding\x07");
        let events = surface.poll_events();
        assert!(events.iter().any(|e| matches!(e, SurfaceEvent::Bell)));
        assert_eq!(surface.screen().contents(), "ding");
    }

    #[test]
    fn test_message_is_drawn() {
        let mut surface = PtySurface::new(40, 5, 0);
        surface.show_message("failed to exec cmd 'nope': not found\r\n");
        assert!(surface.screen().contents().contains("failed to exec cmd 'nope'"));
    }

    fn fill_history(surface: &mut PtySurface, lines: usize) {
        let text: String = (0..lines).map(|i| format!("line {}\r\n", i)).collect();
        surface.show_message(&text);
    }

    #[test]
    fn test_scrollback_view() {
        let mut surface = PtySurface::new(20, 5, 100).with_scroll_on_output(false);
        fill_history(&mut surface, 50);
        assert_eq!(surface.scroll_offset(), 0);

        surface.scroll_view(10);
        assert_eq!(surface.scroll_offset(), 10);
        surface.scroll_view(-4);
        assert_eq!(surface.scroll_offset(), 6);
        surface.scroll_view(-100);
        assert_eq!(surface.scroll_offset(), 0);

        // clamped to the history that exists
        surface.scroll_view(1000);
        assert_eq!(surface.scroll_offset(), 46);

        // output keeps the view on the same history rows
        surface.show_message("more\r\n");
        assert_eq!(surface.scroll_offset(), 47);
    }

    #[test]
    fn test_scroll_on_output_returns_to_live_screen() {
        let mut surface = PtySurface::new(20, 5, 100);
        fill_history(&mut surface, 50);
        surface.scroll_view(10);
        assert_eq!(surface.scroll_offset(), 10);
        surface.show_message("more\r\n");
        assert_eq!(surface.scroll_offset(), 0);
    }

    fn collect_until_exit(surface: &mut PtySurface) -> Vec<SurfaceEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut events = Vec::new();
        while Instant::now() < deadline {
            let batch = surface.poll_events();
            let done = batch.iter().any(|e| matches!(e, SurfaceEvent::Exited(_)));
            events.extend(batch);
            if done {
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        events
    }

    #[test]
    #[cfg(unix)]
    fn test_spawn_reports_exit_status() {
        let mut surface = PtySurface::new(80, 24, 0);
        surface.spawn_async(&["sh".to_string(), "-c".to_string(), "exit 7".to_string()]);
        let events = collect_until_exit(&mut surface);
        assert!(matches!(events.first(), Some(SurfaceEvent::Spawned(Ok(_)))));
        assert!(events.iter().any(|e| matches!(e, SurfaceEvent::Exited(7))));
        assert!(!surface.has_child());
    }

    #[test]
    #[cfg(unix)]
    fn test_child_title_reaches_events() {
        let mut surface = PtySurface::new(80, 24, 0);
        let script = "printf '\\033]2;from child\\007'".to_string();
        surface.spawn_async(&["sh".to_string(), "-c".to_string(), script]);
        let events = collect_until_exit(&mut surface);
        assert!(titles(&events).contains(&"from child".to_string()));
    }

    #[test]
    fn test_empty_command_fails_spawn() {
        let mut surface = PtySurface::new(80, 24, 0);
        surface.spawn_async(&[]);
        let events = surface.poll_events();
        assert!(matches!(
            events.as_slice(),
            [SurfaceEvent::Spawned(Err(SurfaceError::EmptyCommand))]
        ));
        assert!(!surface.has_child());
    }

    #[test]
    fn test_missing_program_fails_spawn() {
        let mut surface = PtySurface::new(80, 24, 0);
        surface.spawn_async(&["/nonexistent/popterm-test-binary".to_string()]);
        let events = surface.poll_events();
        assert!(matches!(events.as_slice(), [SurfaceEvent::Spawned(Err(_))]));
        assert!(!surface.has_child());
    }

    #[test]
    fn test_resize_updates_screen() {
        let mut surface = PtySurface::new(80, 24, 0);
        surface.resize(100, 30);
        assert_eq!(surface.screen().size(), (30, 100));
    }
}
