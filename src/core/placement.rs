//! Window placement
//!
//! Resolves the absolute geometry of the window from the monitor it is on,
//! an optional size fraction and an optional anchor on a 3x3 grid.

use super::surface::Window;

/// Rectangle of a monitor in the windowing system's coordinate space
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MonitorRect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl MonitorRect {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Window size as a fraction of the monitor size, each component in (0, 1]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SizeFraction {
    pub width: f32,
    pub height: f32,
}

/// Anchor point on a 3x3 grid, laid out like a numeric keypad.
///
/// ```text
/// 7 8 9
/// 4 5 6
/// 1 2 3
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GridPosition {
    BottomLeft,
    BottomCenter,
    BottomRight,
    MiddleLeft,
    Center,
    MiddleRight,
    TopLeft,
    TopCenter,
    TopRight,
}

impl GridPosition {
    pub const ALL: [GridPosition; 9] = [
        GridPosition::BottomLeft,
        GridPosition::BottomCenter,
        GridPosition::BottomRight,
        GridPosition::MiddleLeft,
        GridPosition::Center,
        GridPosition::MiddleRight,
        GridPosition::TopLeft,
        GridPosition::TopCenter,
        GridPosition::TopRight,
    ];

    /// Look up a keypad digit (1-9)
    pub fn from_keypad(digit: i64) -> Option<Self> {
        if (1..=9).contains(&digit) {
            Some(Self::ALL[(digit - 1) as usize])
        } else {
            None
        }
    }

    /// Normalized anchor `(ax, ay)`; `ay = 1` is the bottom edge
    pub fn fraction(self) -> (f32, f32) {
        match self {
            GridPosition::BottomLeft => (0.0, 1.0),
            GridPosition::BottomCenter => (0.5, 1.0),
            GridPosition::BottomRight => (1.0, 1.0),
            GridPosition::MiddleLeft => (0.0, 0.5),
            GridPosition::Center => (0.5, 0.5),
            GridPosition::MiddleRight => (1.0, 0.5),
            GridPosition::TopLeft => (0.0, 0.0),
            GridPosition::TopCenter => (0.5, 0.0),
            GridPosition::TopRight => (1.0, 0.0),
        }
    }
}

/// Resolved window geometry
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowGeometry {
    pub width: u32,
    pub height: u32,
    /// `None` leaves the position to the windowing system
    pub position: Option<(i32, i32)>,
}

/// Compute the window geometry for a monitor.
pub fn compute_geometry(
    monitor: MonitorRect,
    size_fraction: Option<SizeFraction>,
    anchor: Option<GridPosition>,
    default_size: (u32, u32),
) -> WindowGeometry {
    let (width, height) = match size_fraction {
        Some(f) => (
            scale(monitor.width, f.width),
            scale(monitor.height, f.height),
        ),
        None => default_size,
    };

    WindowGeometry {
        width,
        height,
        position: anchor.map(|a| anchor_origin(monitor, (width, height), a)),
    }
}

/// Top-left corner that puts a window of `size` at `anchor` on `monitor`
pub fn anchor_origin(monitor: MonitorRect, size: (u32, u32), anchor: GridPosition) -> (i32, i32) {
    let (ax, ay) = anchor.fraction();
    let free_w = monitor.width as f32 - size.0 as f32;
    let free_h = monitor.height as f32 - size.1 as f32;
    (
        monitor.x + (free_w * ax).round() as i32,
        monitor.y + (free_h * ay).round() as i32,
    )
}

/// Size and position `window` on the monitor it currently sits on.
///
/// The anchor is applied to the size the window actually ended up with, so a
/// windowing system that clamps the requested size still gets a correct
/// position.
pub fn place<W: Window + ?Sized>(
    window: &mut W,
    size_fraction: Option<SizeFraction>,
    anchor: Option<GridPosition>,
    default_size: (u32, u32),
) -> WindowGeometry {
    let (wx, wy) = window.position();
    let monitor = window.monitor_at(wx, wy);
    let requested = compute_geometry(monitor, size_fraction, anchor, default_size);

    window.resize(requested.width, requested.height);

    let (width, height) = window.size();
    let position = anchor.map(|a| anchor_origin(monitor, (width, height), a));
    if let Some((x, y)) = position {
        window.move_to(x, y);
    }

    tracing::debug!(
        "placed window {}x{} at {:?} on monitor {:?}",
        width,
        height,
        position,
        monitor
    );

    WindowGeometry { width, height, position }
}

fn scale(extent: u32, fraction: f32) -> u32 {
    (extent as f32 * fraction).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_HD: MonitorRect = MonitorRect::new(0, 0, 1920, 1080);

    fn half() -> Option<SizeFraction> {
        Some(SizeFraction { width: 0.5, height: 0.5 })
    }

    #[test]
    fn test_keypad_bijection() {
        let mut seen = std::collections::HashSet::new();
        for digit in 1..=9 {
            let pos = GridPosition::from_keypad(digit).unwrap();
            let (ax, ay) = pos.fraction();
            for v in [ax, ay] {
                assert!(v == 0.0 || v == 0.5 || v == 1.0);
            }
            assert!(seen.insert(((ax * 2.0) as u8, (ay * 2.0) as u8)));
        }
        assert_eq!(seen.len(), 9);

        assert_eq!(GridPosition::from_keypad(0), None);
        assert_eq!(GridPosition::from_keypad(10), None);
        assert_eq!(GridPosition::from_keypad(-3), None);
    }

    #[test]
    fn test_keypad_layout() {
        // 1 is bottom-left, 9 is top-right
        assert_eq!(GridPosition::from_keypad(1).unwrap().fraction(), (0.0, 1.0));
        assert_eq!(GridPosition::from_keypad(5).unwrap().fraction(), (0.5, 0.5));
        assert_eq!(GridPosition::from_keypad(9).unwrap().fraction(), (1.0, 0.0));
    }

    #[test]
    fn test_default_size_without_fraction() {
        let geo = compute_geometry(FULL_HD, None, None, (600, 600));
        assert_eq!(geo, WindowGeometry { width: 600, height: 600, position: None });
    }

    #[test]
    fn test_fraction_rounds_to_nearest_pixel() {
        let monitor = MonitorRect::new(0, 0, 1001, 999);
        let geo = compute_geometry(monitor, half(), None, (600, 600));
        // 500.5 and 499.5 round away from zero
        assert_eq!((geo.width, geo.height), (501, 500));
    }

    #[test]
    fn test_top_right_quadrant() {
        let geo = compute_geometry(FULL_HD, half(), GridPosition::from_keypad(9), (600, 600));
        assert_eq!(geo.width, 960);
        assert_eq!(geo.height, 540);
        assert_eq!(geo.position, Some((960, 0)));
    }

    #[test]
    fn test_corner_anchors() {
        let sizes = [(0.25, 0.75), (1.0, 1.0), (0.3, 0.1)];
        for monitor in [FULL_HD, MonitorRect::new(0, 0, 800, 600)] {
            for (w, h) in sizes {
                let f = Some(SizeFraction { width: w, height: h });
                let geo = compute_geometry(monitor, f, Some(GridPosition::TopLeft), (1, 1));
                assert_eq!(geo.position, Some((0, 0)));

                let geo = compute_geometry(monitor, f, Some(GridPosition::BottomRight), (1, 1));
                assert_eq!(
                    geo.position,
                    Some((
                        monitor.width as i32 - geo.width as i32,
                        monitor.height as i32 - geo.height as i32
                    ))
                );
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let a = compute_geometry(FULL_HD, half(), Some(GridPosition::Center), (600, 600));
        let b = compute_geometry(FULL_HD, half(), Some(GridPosition::Center), (600, 600));
        assert_eq!(a, b);
    }

    #[test]
    fn test_secondary_monitor_offset() {
        let monitor = MonitorRect::new(1920, 0, 1280, 1024);
        let geo = compute_geometry(monitor, half(), Some(GridPosition::TopLeft), (600, 600));
        assert_eq!(geo.position, Some((1920, 0)));
    }

    /// Window that refuses to grow beyond a fixed size
    struct ClampedWindow {
        monitor: MonitorRect,
        max: (u32, u32),
        size: (u32, u32),
        pos: (i32, i32),
        moved: bool,
    }

    impl Window for ClampedWindow {
        fn apply_hints(&mut self, _hints: crate::core::surface::WindowHints) {}
        fn set_title(&mut self, _title: &str) {}
        fn position(&self) -> (i32, i32) {
            self.pos
        }
        fn monitor_at(&self, _x: i32, _y: i32) -> MonitorRect {
            self.monitor
        }
        fn size(&self) -> (u32, u32) {
            self.size
        }
        fn content_size(&self) -> (u32, u32) {
            self.size
        }
        fn resize(&mut self, width: u32, height: u32) {
            self.size = (width.min(self.max.0), height.min(self.max.1));
        }
        fn move_to(&mut self, x: i32, y: i32) {
            self.pos = (x, y);
            self.moved = true;
        }
        fn show(&mut self) {}
        fn destroy(&mut self) {}
    }

    #[test]
    fn test_place_uses_actual_size() {
        let mut window = ClampedWindow {
            monitor: FULL_HD,
            max: (800, 400),
            size: (0, 0),
            pos: (0, 0),
            moved: false,
        };
        let geo = place(&mut window, half(), Some(GridPosition::BottomRight), (600, 600));
        assert_eq!((geo.width, geo.height), (800, 400));
        assert_eq!(window.pos, (1120, 680));
    }

    #[test]
    fn test_place_without_anchor_does_not_move() {
        let mut window = ClampedWindow {
            monitor: FULL_HD,
            max: (4000, 4000),
            size: (0, 0),
            pos: (17, 23),
            moved: false,
        };
        let geo = place(&mut window, None, None, (600, 600));
        assert_eq!(geo.position, None);
        assert_eq!(window.size, (600, 600));
        assert!(!window.moved);
    }
}
