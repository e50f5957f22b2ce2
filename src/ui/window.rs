//! Window inside the host terminal
//!
//! The host terminal's cell grid plays the monitor; the window is a rectangle
//! of cells on it. Without an explicit move the window is centered, which is
//! where the window system would put it.

use tracing::{debug, warn};

use crate::core::placement::MonitorRect;
use crate::core::surface::{Window, WindowHints};

/// Fallback when the host terminal size cannot be queried
const FALLBACK_MONITOR: (u16, u16) = (80, 24);

pub struct TuiWindow {
    hints: WindowHints,
    title: String,
    size: (u32, u32),
    /// `None` until explicitly moved
    position: Option<(i32, i32)>,
    shown: bool,
    destroyed: bool,
    /// Needs a full repaint
    damaged: bool,
    monitor_override: Option<MonitorRect>,
}

impl TuiWindow {
    pub fn new() -> Self {
        Self {
            hints: WindowHints::default(),
            title: String::new(),
            size: (FALLBACK_MONITOR.0 as u32, FALLBACK_MONITOR.1 as u32),
            position: None,
            shown: false,
            destroyed: false,
            damaged: true,
            monitor_override: None,
        }
    }

    /// Window on a fixed monitor instead of the live host terminal
    #[cfg(test)]
    pub fn with_monitor(monitor: MonitorRect) -> Self {
        Self {
            monitor_override: Some(monitor),
            ..Self::new()
        }
    }

    fn monitor(&self) -> MonitorRect {
        if let Some(m) = self.monitor_override {
            return m;
        }
        let (cols, rows) = crossterm::terminal::size().unwrap_or_else(|e| {
            warn!("Failed to query terminal size: {}", e);
            FALLBACK_MONITOR
        });
        MonitorRect::new(0, 0, cols as u32, rows as u32)
    }

    pub fn hints(&self) -> WindowHints {
        self.hints
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn is_shown(&self) -> bool {
        self.shown && !self.destroyed
    }

    /// Cell rectangle `(x, y, width, height)` of the whole window
    pub fn rect(&self) -> (u16, u16, u16, u16) {
        let (x, y) = self.position();
        (
            x.max(0) as u16,
            y.max(0) as u16,
            self.size.0.min(u16::MAX as u32) as u16,
            self.size.1.min(u16::MAX as u32) as u16,
        )
    }

    /// Top-left cell of the terminal area
    pub fn content_origin(&self) -> (u16, u16) {
        let (x, y, _, _) = self.rect();
        if self.hints.decorated {
            (x + 1, y + 1)
        } else {
            (x, y)
        }
    }

    /// Take and clear the repaint request
    pub fn take_damage(&mut self) -> bool {
        std::mem::take(&mut self.damaged)
    }

    /// Keep the window on screen after the host terminal changed size.
    ///
    /// Returns the new content size if it changed.
    pub fn fit_to_monitor(&mut self) -> Option<(u32, u32)> {
        let before = self.content_size();
        let (w, h) = self.size;
        self.resize(w, h);
        if let Some((x, y)) = self.position {
            self.move_to(x, y);
        }
        self.damaged = true;
        let after = self.content_size();
        (after != before).then_some(after)
    }

    fn min_size(&self) -> u32 {
        if self.hints.decorated {
            3
        } else {
            1
        }
    }
}

impl Default for TuiWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl Window for TuiWindow {
    fn apply_hints(&mut self, hints: WindowHints) {
        debug!("Window hints: {:?}", hints);
        self.hints = hints;
        self.damaged = true;
    }

    fn set_title(&mut self, title: &str) {
        if self.title != title {
            self.title = title.to_string();
            self.damaged = true;
        }
    }

    fn position(&self) -> (i32, i32) {
        match self.position {
            Some(p) => p,
            None => {
                let m = self.monitor();
                (
                    m.x + (m.width.saturating_sub(self.size.0) / 2) as i32,
                    m.y + (m.height.saturating_sub(self.size.1) / 2) as i32,
                )
            }
        }
    }

    fn monitor_at(&self, _x: i32, _y: i32) -> MonitorRect {
        // a host terminal is a single monitor
        self.monitor()
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn content_size(&self) -> (u32, u32) {
        let (w, h) = self.size;
        if self.hints.decorated {
            (w.saturating_sub(2).max(1), h.saturating_sub(2).max(1))
        } else {
            (w.max(1), h.max(1))
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        let m = self.monitor();
        let min = self.min_size();
        self.size = (
            width.clamp(min, m.width.max(min)),
            height.clamp(min, m.height.max(min)),
        );
        self.damaged = true;
    }

    fn move_to(&mut self, x: i32, y: i32) {
        let m = self.monitor();
        let max_x = m.x + m.width.saturating_sub(self.size.0) as i32;
        let max_y = m.y + m.height.saturating_sub(self.size.1) as i32;
        self.position = Some((x.clamp(m.x, max_x), y.clamp(m.y, max_y)));
        self.damaged = true;
    }

    fn show(&mut self) {
        self.shown = true;
        self.damaged = true;
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.damaged = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::placement::{self, GridPosition, SizeFraction};

    fn monitor() -> MonitorRect {
        MonitorRect::new(0, 0, 200, 50)
    }

    #[test]
    fn test_resize_clamps_to_monitor() {
        let mut w = TuiWindow::with_monitor(monitor());
        w.resize(500, 10);
        assert_eq!(w.size(), (200, 10));
        w.resize(0, 0);
        assert_eq!(w.size(), (3, 3));
    }

    #[test]
    fn test_default_position_is_centered() {
        let mut w = TuiWindow::with_monitor(monitor());
        w.resize(100, 20);
        assert_eq!(w.position(), (50, 15));
    }

    #[test]
    fn test_content_area() {
        let mut w = TuiWindow::with_monitor(monitor());
        w.resize(40, 10);
        w.move_to(5, 5);
        assert_eq!(w.content_size(), (38, 8));
        assert_eq!(w.content_origin(), (6, 6));

        w.apply_hints(WindowHints::POPUP);
        assert_eq!(w.content_size(), (40, 10));
        assert_eq!(w.content_origin(), (5, 5));
    }

    #[test]
    fn test_placement_bottom_left() {
        let mut w = TuiWindow::with_monitor(monitor());
        let f = Some(SizeFraction { width: 0.5, height: 0.5 });
        placement::place(&mut w, f, Some(GridPosition::BottomLeft), (80, 24));
        assert_eq!(w.rect(), (0, 25, 100, 25));
    }

    #[test]
    fn test_damage_tracking() {
        let mut w = TuiWindow::with_monitor(monitor());
        assert!(w.take_damage());
        assert!(!w.take_damage());
        w.set_title("x");
        assert!(w.take_damage());
        w.set_title("x");
        assert!(!w.take_damage());
    }
}
