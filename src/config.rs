//! Configuration and profile settings for popterm.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.popterm/config.toml`
//! - The terminal profile (title, cursor, scrollback, bell, colors)
//! - Built-in color schemes
//!
//! # Configuration File
//!
//! ```toml
//! # tracing filter, overridden by POPTERM_LOG
//! log_level = "info"
//!
//! # Delay before a pop-up that lost focus is closed
//! dismiss_delay_ms = 10
//!
//! [window]
//! # Size in cells when --size is not given
//! default_width = 80
//! default_height = 24
//!
//! [profile]
//! title = "Terminal"
//! show_foreground_process_in_title = true
//! cursor_blink_mode = "system"   # system, on, off
//! scrollback_lines = 1000         # Shift+PageUp / Shift+PageDown to browse
//! scroll_on_output = true
//! audible_bell = true
//! bold_is_bright = false
//! color_scheme = "default"       # default, solarized-dark, nord, dracula,
//!                                # gruvbox-dark, tokyo-night
//! ```

use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::session::SessionSettings;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log filter directive
    pub log_level: String,
    /// Pop-up dismiss debounce in milliseconds
    pub dismiss_delay_ms: u64,
    pub window: WindowConfig,
    pub profile: Profile,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            dismiss_delay_ms: 10,
            window: WindowConfig::default(),
            profile: Profile::default(),
        }
    }
}

/// Window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    pub default_width: u32,
    pub default_height: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            default_width: 80,
            default_height: 24,
        }
    }
}

/// Cursor blinking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CursorBlinkMode {
    /// Leave whatever the host terminal does
    System,
    On,
    Off,
}

/// Terminal profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub title: String,
    /// Let programs in the terminal replace the title
    pub show_foreground_process_in_title: bool,
    pub cursor_blink_mode: CursorBlinkMode,
    pub scrollback_lines: usize,
    /// Return to the live screen when the program prints
    pub scroll_on_output: bool,
    /// Ring the host terminal's bell on BEL
    pub audible_bell: bool,
    /// Render bold text in the bright variant of the first 8 colors
    pub bold_is_bright: bool,
    pub color_scheme: String,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            title: "Terminal".to_string(),
            show_foreground_process_in_title: true,
            cursor_blink_mode: CursorBlinkMode::System,
            scrollback_lines: 1000,
            scroll_on_output: true,
            audible_bell: true,
            bold_is_bright: false,
            color_scheme: "default".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `~/.popterm/config.toml`.
    ///
    /// A missing file yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        match Self::get_config_path() {
            Some(path) if path.exists() => {
                let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
                    path: path.clone(),
                    source,
                })?;
                Self::parse(&content).map_err(|source| ConfigError::Parse { path, source })
            }
            _ => Ok(Self::default()),
        }
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        data_dir().map(|dir| dir.join("config.toml"))
    }

    pub fn dismiss_delay(&self) -> Duration {
        Duration::from_millis(self.dismiss_delay_ms)
    }

    /// Get the color scheme
    pub fn get_color_scheme(&self) -> ColorScheme {
        ColorScheme::by_name(&self.profile.color_scheme)
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            default_size: (self.window.default_width, self.window.default_height),
            dismiss_delay: self.dismiss_delay(),
            title: self.profile.title.clone(),
            dynamic_title: self.profile.show_foreground_process_in_title,
        }
    }
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Color scheme definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub name: String,
    /// Default text color
    pub foreground: Color,
    /// Default cell background
    pub background: Color,
    /// Frame around decorated windows
    pub border: Color,
    pub title: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_scheme()
    }
}

impl ColorScheme {
    /// Default color scheme
    pub fn default_scheme() -> Self {
        Self {
            name: "default".to_string(),
            foreground: Color::new(204, 204, 204),
            background: Color::new(24, 24, 24),
            border: Color::new(80, 80, 80),
            title: Color::new(100, 150, 255),
        }
    }

    pub fn solarized_dark() -> Self {
        Self {
            name: "solarized-dark".to_string(),
            foreground: Color::new(131, 148, 150),
            background: Color::new(0, 43, 54),
            border: Color::new(7, 54, 66),
            title: Color::new(38, 139, 210),
        }
    }

    pub fn nord() -> Self {
        Self {
            name: "nord".to_string(),
            foreground: Color::new(216, 222, 233),
            background: Color::new(46, 52, 64),
            border: Color::new(67, 76, 94),
            title: Color::new(136, 192, 208),
        }
    }

    pub fn dracula() -> Self {
        Self {
            name: "dracula".to_string(),
            foreground: Color::new(248, 248, 242),
            background: Color::new(40, 42, 54),
            border: Color::new(68, 71, 90),
            title: Color::new(189, 147, 249),
        }
    }

    pub fn gruvbox_dark() -> Self {
        Self {
            name: "gruvbox-dark".to_string(),
            foreground: Color::new(235, 219, 178),
            background: Color::new(40, 40, 40),
            border: Color::new(80, 73, 69),
            title: Color::new(250, 189, 47),
        }
    }

    pub fn tokyo_night() -> Self {
        Self {
            name: "tokyo-night".to_string(),
            foreground: Color::new(192, 202, 245),
            background: Color::new(26, 27, 38),
            border: Color::new(59, 66, 97),
            title: Color::new(122, 162, 247),
        }
    }

    /// Get scheme by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "solarized-dark" | "solarized_dark" => Self::solarized_dark(),
            "nord" => Self::nord(),
            "dracula" => Self::dracula(),
            "gruvbox-dark" | "gruvbox_dark" | "gruvbox" => Self::gruvbox_dark(),
            "tokyo-night" | "tokyo_night" | "tokyonight" => Self::tokyo_night(),
            _ => Self::default_scheme(),
        }
    }
}

/// `~/.popterm`
pub fn data_dir() -> Option<PathBuf> {
    std::env::var_os("HOME")
        .filter(|h| !h.is_empty())
        .map(|h| PathBuf::from(h).join(".popterm"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_partial_override() {
        let config = Config::parse(
            r#"
            dismiss_delay_ms = 50

            [window]
            default_width = 100

            [profile]
            title = "scratch"
            cursor_blink_mode = "off"
            color_scheme = "Nord"
            "#,
        )
        .unwrap();

        assert_eq!(config.dismiss_delay(), Duration::from_millis(50));
        assert_eq!(config.window.default_width, 100);
        assert_eq!(config.window.default_height, 24);
        assert_eq!(config.profile.title, "scratch");
        assert_eq!(config.profile.cursor_blink_mode, CursorBlinkMode::Off);
        assert!(config.profile.show_foreground_process_in_title);
        assert_eq!(config.get_color_scheme().name, "nord");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_scrollback_and_bell_settings() {
        let defaults = Profile::default();
        assert!(defaults.scroll_on_output);
        assert!(defaults.audible_bell);

        let config = Config::parse(
            "[profile]\nscrollback_lines = 0\nscroll_on_output = false\naudible_bell = false",
        )
        .unwrap();
        assert_eq!(config.profile.scrollback_lines, 0);
        assert!(!config.profile.scroll_on_output);
        assert!(!config.profile.audible_bell);
    }

    #[test]
    fn test_bad_blink_mode_rejected() {
        assert!(Config::parse("[profile]\ncursor_blink_mode = \"sometimes\"").is_err());
    }

    #[test]
    fn test_session_settings() {
        let mut config = Config::default();
        config.profile.show_foreground_process_in_title = false;
        let settings = config.session_settings();
        assert_eq!(settings.default_size, (80, 24));
        assert_eq!(settings.dismiss_delay, Duration::from_millis(10));
        assert_eq!(settings.title, "Terminal");
        assert!(!settings.dynamic_title);
    }

    #[test]
    fn test_unknown_scheme_falls_back() {
        assert_eq!(ColorScheme::by_name("neon").name, "default");
        assert_eq!(ColorScheme::by_name("tokyonight").name, "tokyo-night");
    }
}
