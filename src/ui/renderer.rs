//! Terminal renderer using crossterm
//!
//! Paints the window and the terminal surface's screen onto the controlling
//! terminal. Output goes to `/dev/tty`, never to stdout, so a caller's pipe
//! on stdout stays clean.

use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{Hide, MoveTo, SetCursorStyle, Show},
    event::{
        DisableBracketedPaste, DisableFocusChange, EnableBracketedPaste, EnableFocusChange,
    },
    queue,
    style::{
        Attribute, Color as TermColor, Print, ResetColor, SetAttribute, SetBackgroundColor,
        SetForegroundColor,
    },
    terminal::{self, Clear, ClearType, DisableLineWrap, EnableLineWrap, EnterAlternateScreen,
        LeaveAlternateScreen, SetTitle},
};
use unicode_width::UnicodeWidthStr;

use crate::config::{ColorScheme, CursorBlinkMode, Profile};
use crate::ui::window::TuiWindow;

/// Terminal renderer
pub struct Renderer {
    out: BufWriter<File>,
    scheme: ColorScheme,
    cursor_blink: CursorBlinkMode,
    bold_is_bright: bool,
    /// Whether the terminal has been initialized
    initialized: bool,
    last_title: Option<String>,
}

impl Renderer {
    pub fn new(profile: &Profile, scheme: ColorScheme) -> io::Result<Self> {
        let tty = OpenOptions::new().read(true).write(true).open("/dev/tty")?;
        Ok(Self {
            out: BufWriter::new(tty),
            scheme,
            cursor_blink: profile.cursor_blink_mode,
            bold_is_bright: profile.bold_is_bright,
            initialized: false,
            last_title: None,
        })
    }

    /// Initialize the terminal for rendering
    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        queue!(
            self.out,
            EnterAlternateScreen,
            EnableFocusChange,
            EnableBracketedPaste,
            DisableLineWrap,
            Hide,
            Clear(ClearType::All),
            MoveTo(0, 0)
        )?;
        match self.cursor_blink {
            CursorBlinkMode::System => {}
            CursorBlinkMode::On => queue!(self.out, SetCursorStyle::BlinkingBlock)?,
            CursorBlinkMode::Off => queue!(self.out, SetCursorStyle::SteadyBlock)?,
        }
        self.out.flush()?;
        self.initialized = true;
        Ok(())
    }

    /// Cleanup the terminal
    pub fn cleanup(&mut self) -> io::Result<()> {
        if !self.initialized {
            return Ok(());
        }
        self.initialized = false;

        if self.cursor_blink != CursorBlinkMode::System {
            queue!(self.out, SetCursorStyle::DefaultUserShape)?;
        }
        queue!(
            self.out,
            ResetColor,
            SetAttribute(Attribute::Reset),
            Show,
            EnableLineWrap,
            DisableBracketedPaste,
            DisableFocusChange,
            LeaveAlternateScreen
        )?;
        self.out.flush()?;
        terminal::disable_raw_mode()
    }

    /// Paint one frame; `full` also repaints the frame and clears leftovers
    pub fn render(&mut self, window: &TuiWindow, screen: &vt100::Screen, full: bool) -> io::Result<()> {
        if self.last_title.as_deref() != Some(window.title()) {
            queue!(self.out, SetTitle(window.title()))?;
            self.last_title = Some(window.title().to_string());
        }

        if !window.is_shown() {
            if full {
                queue!(self.out, ResetColor, Clear(ClearType::All), Hide)?;
            }
            return self.out.flush();
        }

        queue!(self.out, Hide)?;
        if full {
            queue!(self.out, ResetColor, SetAttribute(Attribute::Reset), Clear(ClearType::All))?;
            if window.hints().decorated {
                self.draw_frame(window)?;
            }
        }
        self.draw_screen(window, screen)?;
        self.draw_cursor(window, screen)?;
        self.out.flush()
    }

    fn draw_frame(&mut self, window: &TuiWindow) -> io::Result<()> {
        let (x, y, w, h) = window.rect();
        if w < 2 || h < 2 {
            return Ok(());
        }
        let inner = (w - 2) as usize;
        let border = self.scheme.border.to_crossterm();
        let bg = self.scheme.background.to_crossterm();

        queue!(self.out, SetBackgroundColor(bg), SetForegroundColor(border))?;
        queue!(self.out, MoveTo(x, y), Print(format!("┌{}┐", "─".repeat(inner))))?;
        for row in 1..h - 1 {
            queue!(self.out, MoveTo(x, y + row), Print("│"))?;
            queue!(self.out, MoveTo(x + w - 1, y + row), Print("│"))?;
        }
        queue!(self.out, MoveTo(x, y + h - 1), Print(format!("└{}┘", "─".repeat(inner))))?;

        let title = fit_title(window.title(), inner.saturating_sub(2));
        if !title.is_empty() {
            let offset = (inner - title.width()) / 2;
            queue!(
                self.out,
                MoveTo(x + 1 + offset as u16, y),
                SetForegroundColor(self.scheme.title.to_crossterm()),
                Print(title)
            )?;
        }
        queue!(self.out, ResetColor)
    }

    fn draw_screen(&mut self, window: &TuiWindow, screen: &vt100::Screen) -> io::Result<()> {
        let (ox, oy) = window.content_origin();
        let (cw, ch) = content_cells(window);
        let (rows, cols) = screen.size();

        for row in 0..ch.min(rows) {
            queue!(self.out, MoveTo(ox, oy + row))?;
            let mut col = 0;
            while col < cw.min(cols) {
                let Some(cell) = screen.cell(row, col) else {
                    break;
                };
                if cell.is_wide_continuation() {
                    col += 1;
                    continue;
                }
                self.apply_style(cell)?;
                let text = cell.contents();
                if text.is_empty() {
                    queue!(self.out, Print(' '))?;
                } else if cell.is_wide() && col + 1 >= cw {
                    // no room for the second half
                    queue!(self.out, Print(' '))?;
                } else {
                    queue!(self.out, Print(text))?;
                }
                col += if cell.is_wide() { 2 } else { 1 };
            }
            queue!(self.out, SetAttribute(Attribute::Reset), ResetColor)?;
        }
        Ok(())
    }

    fn apply_style(&mut self, cell: &vt100::Cell) -> io::Result<()> {
        let mut fg = self.map_color(cell.fgcolor(), true);
        let mut bg = self.map_color(cell.bgcolor(), false);
        if self.bold_is_bright && cell.bold() {
            if let vt100::Color::Idx(i) = cell.fgcolor() {
                if i < 8 {
                    fg = TermColor::AnsiValue(i + 8);
                }
            }
        }
        if cell.inverse() {
            std::mem::swap(&mut fg, &mut bg);
        }

        queue!(
            self.out,
            SetAttribute(Attribute::Reset),
            SetForegroundColor(fg),
            SetBackgroundColor(bg)
        )?;
        if cell.bold() {
            queue!(self.out, SetAttribute(Attribute::Bold))?;
        }
        if cell.italic() {
            queue!(self.out, SetAttribute(Attribute::Italic))?;
        }
        if cell.underline() {
            queue!(self.out, SetAttribute(Attribute::Underlined))?;
        }
        Ok(())
    }

    fn map_color(&self, color: vt100::Color, foreground: bool) -> TermColor {
        match color {
            vt100::Color::Default if foreground => self.scheme.foreground.to_crossterm(),
            vt100::Color::Default => self.scheme.background.to_crossterm(),
            vt100::Color::Idx(i) => TermColor::AnsiValue(i),
            vt100::Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
        }
    }

    /// Pass a BEL on to the host terminal
    pub fn bell(&mut self) -> io::Result<()> {
        queue!(self.out, Print('\x07'))?;
        self.out.flush()
    }

    fn draw_cursor(&mut self, window: &TuiWindow, screen: &vt100::Screen) -> io::Result<()> {
        // the cursor belongs to the live screen, not to history
        if screen.hide_cursor() || screen.scrollback() > 0 {
            return Ok(());
        }
        let (row, col) = screen.cursor_position();
        let (cw, ch) = content_cells(window);
        if row < ch && col < cw {
            let (ox, oy) = window.content_origin();
            queue!(self.out, MoveTo(ox + col, oy + row), Show)?;
        }
        Ok(())
    }
}

impl Drop for Renderer {
    fn drop(&mut self) {
        let _ = self.cleanup();
    }
}

fn content_cells(window: &TuiWindow) -> (u16, u16) {
    use crate::core::surface::Window;
    let (w, h) = window.content_size();
    (w.min(u16::MAX as u32) as u16, h.min(u16::MAX as u32) as u16)
}

/// Truncate a title to `max` display columns
fn fit_title(title: &str, max: usize) -> String {
    if title.width() <= max {
        return title.to_string();
    }
    let mut out = String::new();
    for ch in title.chars() {
        let candidate = format!("{}{}", out, ch);
        if candidate.width() + 1 > max {
            break;
        }
        out = candidate;
    }
    if max > 0 {
        out.push('…');
    }
    out
}
