//! Command line parsing
//!
//! Turns the argument tokens into an immutable [`Options`] record. The record
//! is built once in `main` and handed to whatever needs it.

use std::io::{self, Write};

use thiserror::Error;

use crate::core::placement::{GridPosition, SizeFraction};

#[derive(Error, Debug, PartialEq)]
pub enum ArgError {
    #[error("Error parsing option {option}: {reason}")]
    InvalidArgument { option: &'static str, reason: String },

    #[error("Missing value for option {0}")]
    MissingValue(&'static str),

    #[error("Unknown option: {0}. Use --help for usage information")]
    UnknownOption(String),

    #[error("Option {0} does not take a value")]
    UnexpectedValue(&'static str),
}

fn invalid(option: &'static str, reason: impl Into<String>) -> ArgError {
    ArgError::InvalidArgument {
        option,
        reason: reason.into(),
    }
}

/// Process options
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    /// Undecorated, modal window that closes when it loses focus
    pub popup: bool,
    /// Hand our stdin/stdout to the command through a wrapper instance
    pub forward_stdio: bool,
    /// Set only in the wrapper instance: pid whose stdio to take over
    pub wrap_target_pid: Option<i32>,
    pub anchor: Option<GridPosition>,
    pub size_fraction: Option<SizeFraction>,
    /// Trailing command, `--` already stripped
    pub command: Vec<String>,
}

/// Outcome of parsing
#[derive(Debug, PartialEq)]
pub enum ParsedArgs {
    Run(Options),
    Help,
    Version,
}

/// Parse the tokens following the program name.
pub fn parse_args<I, S>(tokens: I) -> Result<ParsedArgs, ArgError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let args: Vec<String> = tokens.into_iter().map(Into::into).collect();
    let mut options = Options::default();
    let mut i = 0;

    while i < args.len() {
        let arg = args[i].as_str();

        if arg == "--" {
            i += 1;
            break;
        }
        if !arg.starts_with('-') || arg == "-" {
            break;
        }

        // --flag=value
        let (name, inline) = match arg.split_once('=') {
            Some((n, v)) if n.starts_with("--") => (n, Some(v.to_string())),
            _ => (arg, None),
        };

        match name {
            "-h" | "--help" => return Ok(ParsedArgs::Help),
            "-V" | "--version" => return Ok(ParsedArgs::Version),
            "--pop" => {
                no_value("--pop", &inline)?;
                options.popup = true;
            }
            "--stdio" => {
                no_value("--stdio", &inline)?;
                options.forward_stdio = true;
            }
            "--location" => {
                let value = take_value("--location", inline, &args, &mut i)?;
                options.anchor = Some(parse_location(&value)?);
            }
            "--size" => {
                let value = take_value("--size", inline, &args, &mut i)?;
                options.size_fraction = Some(parse_size(&value)?);
            }
            "--wrap-stdio" => {
                let value = take_value("--wrap-stdio", inline, &args, &mut i)?;
                options.wrap_target_pid = Some(parse_pid(&value)?);
            }
            _ => return Err(ArgError::UnknownOption(arg.to_string())),
        }
        i += 1;
    }

    options.command = args[i..].to_vec();
    Ok(ParsedArgs::Run(options))
}

fn no_value(option: &'static str, inline: &Option<String>) -> Result<(), ArgError> {
    match inline {
        Some(_) => Err(ArgError::UnexpectedValue(option)),
        None => Ok(()),
    }
}

fn take_value(
    option: &'static str,
    inline: Option<String>,
    args: &[String],
    i: &mut usize,
) -> Result<String, ArgError> {
    if let Some(v) = inline {
        return Ok(v);
    }
    *i += 1;
    args.get(*i).cloned().ok_or(ArgError::MissingValue(option))
}

/// Parse a keypad digit 1-9 into a grid anchor
pub fn parse_location(value: &str) -> Result<GridPosition, ArgError> {
    let n: i64 = value
        .trim_start()
        .parse()
        .map_err(|_| invalid("--location", "Location must be a number"))?;
    GridPosition::from_keypad(n)
        .ok_or_else(|| invalid("--location", "Location must be a number between 1 and 9"))
}

/// Parse `W,H` with both components in (0, 1]
pub fn parse_size(value: &str) -> Result<SizeFraction, ArgError> {
    let malformed = || invalid("--size", "Size must be WIDTH,HEIGHT (e.g. 0.5,0.5)");

    let (w, h) = value.split_once(',').ok_or_else(malformed)?;
    let width: f32 = parse_fraction(w).ok_or_else(malformed)?;
    let height: f32 = parse_fraction(h).ok_or_else(malformed)?;

    let in_range = |f: f32| f > 0.0 && f <= 1.0;
    if !in_range(width) || !in_range(height) {
        return Err(invalid(
            "--size",
            "Width and height must be greater than 0 and at most 1",
        ));
    }

    Ok(SizeFraction { width, height })
}

/// Plain decimal number; rejects `inf`, `nan` and trailing characters
fn parse_fraction(s: &str) -> Option<f32> {
    let s = s.trim_start();
    let digits = s.strip_prefix(['+', '-']).unwrap_or(s);
    let valid = !digits.is_empty()
        && digits.chars().any(|c| c.is_ascii_digit())
        && digits
            .chars()
            .all(|c| c.is_ascii_digit() || c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-');
    if !valid {
        return None;
    }
    s.parse().ok()
}

fn parse_pid(value: &str) -> Result<i32, ArgError> {
    value
        .trim_start()
        .parse::<i32>()
        .ok()
        .filter(|pid| *pid > 0)
        .ok_or_else(|| invalid("--wrap-stdio", "PID must be a positive number"))
}

/// Version string from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn print_version() {
    eprintln!("popterm {}", VERSION);
}

pub fn print_help() {
    let _ = write_help(&mut io::stderr().lock());
}

fn write_help(out: &mut impl Write) -> io::Result<()> {
    writeln!(out, "popterm {} - pop-up terminal", VERSION)?;
    writeln!(out)?;
    writeln!(out, "Usage: popterm [OPTIONS] [-- COMMAND...]")?;
    writeln!(out)?;
    writeln!(out, "Options:")?;
    writeln!(out, "  --pop                 Pop-up terminal: no decorations, closes when it loses focus")?;
    writeln!(out, "  --stdio               Forward this process's stdin and stdout to COMMAND")?;
    writeln!(out, "  --location LOCATION   Location on screen as a numpad digit")?;
    writeln!(out, "                        (e.g. 8: top-center, 6: middle-right)")?;
    writeln!(out, "  --size WIDTH,HEIGHT   Size as fraction of the screen size (e.g. 0.5,0.5)")?;
    writeln!(out, "  -V, --version         Show version")?;
    writeln!(out, "  -h, --help            Show this help")?;
    writeln!(out)?;
    writeln!(out, "COMMAND defaults to $SHELL, or sh if SHELL is unset.")?;
    writeln!(out, "The exit status is the exit status of COMMAND. With --stdio, popterm")?;
    writeln!(out, "stays running until COMMAND exits and then exits with its status.")?;
    writeln!(out, "Press any key to close a window whose COMMAND failed to start.")?;
    writeln!(out)?;
    writeln!(out, "Examples:")?;
    writeln!(out, "  popterm --pop --location 9 --size 0.5,0.5")?;
    writeln!(out, "  ls | popterm --stdio -- less")?;
    writeln!(out)?;
    writeln!(out, "Configuration: ~/.popterm/config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(tokens: &[&str]) -> Options {
        match parse_args(tokens.iter().copied()) {
            Ok(ParsedArgs::Run(o)) => o,
            other => panic!("unexpected parse result: {:?}", other),
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(run(&[]), Options::default());
    }

    #[test]
    fn test_flags_and_command() {
        let o = run(&["--pop", "--stdio", "--location", "9", "--size", "0.5,0.25", "--", "vim", "file.txt"]);
        assert!(o.popup);
        assert!(o.forward_stdio);
        assert_eq!(o.anchor, Some(GridPosition::TopRight));
        assert_eq!(o.size_fraction, Some(SizeFraction { width: 0.5, height: 0.25 }));
        assert_eq!(o.command, vec!["vim", "file.txt"]);
        assert_eq!(o.wrap_target_pid, None);
    }

    #[test]
    fn test_inline_values() {
        let o = run(&["--location=1", "--size=1,1", "--wrap-stdio=42", "cat"]);
        assert_eq!(o.anchor, Some(GridPosition::BottomLeft));
        assert_eq!(o.size_fraction, Some(SizeFraction { width: 1.0, height: 1.0 }));
        assert_eq!(o.wrap_target_pid, Some(42));
        assert_eq!(o.command, vec!["cat"]);
    }

    #[test]
    fn test_command_without_separator() {
        let o = run(&["--pop", "htop", "--delay", "5"]);
        assert_eq!(o.command, vec!["htop", "--delay", "5"]);
    }

    #[test]
    fn test_only_leading_separator_stripped() {
        let o = run(&["--", "sh", "-c", "echo -- hi"]);
        assert_eq!(o.command, vec!["sh", "-c", "echo -- hi"]);
        let o = run(&["--", "--", "x"]);
        assert_eq!(o.command, vec!["--", "x"]);
    }

    #[test]
    fn test_location_range() {
        for n in 1..=9 {
            assert!(parse_location(&n.to_string()).is_ok());
        }
        for bad in ["0", "10", "-1", "99"] {
            let err = parse_location(bad).unwrap_err();
            assert!(err.to_string().contains("between 1 and 9"), "{}", err);
        }
        let err = parse_location("top").unwrap_err();
        assert!(err.to_string().contains("Location must be a number"));
        assert!(!err.to_string().contains("between"));
    }

    #[test]
    fn test_location_rejects_trailing_characters() {
        assert_eq!(parse_location(" 5"), Ok(GridPosition::Center));
        for bad in ["5 ", "5x", "5\n", "5.0"] {
            let err = parse_location(bad).unwrap_err();
            assert!(err.to_string().contains("Location must be a number"), "{:?}", bad);
        }
    }

    #[test]
    fn test_size_accepts_unit_interval() {
        for (w, h) in [(0.5, 0.5), (1.0, 1.0), (0.01, 0.99), (0.333, 1.0)] {
            let s = parse_size(&format!("{},{}", w, h)).unwrap();
            assert_eq!(s, SizeFraction { width: w, height: h });
        }
    }

    #[test]
    fn test_size_rejects() {
        for bad in [
            "0,0.5", "0.5,0", "-0.5,0.5", "1.5,0.5", "0.5,2", "0.5", "0.5,0.5x", "0.5,0.5,0.5",
            "a,b", ",", "inf,1", "nan,0.5", "",
        ] {
            assert!(parse_size(bad).is_err(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_invalid_option_values() {
        assert!(matches!(
            parse_args(["--location", "12"]),
            Err(ArgError::InvalidArgument { option: "--location", .. })
        ));
        assert!(matches!(
            parse_args(["--wrap-stdio", "abc"]),
            Err(ArgError::InvalidArgument { option: "--wrap-stdio", .. })
        ));
        assert_eq!(parse_args(["--size"]), Err(ArgError::MissingValue("--size")));
        assert_eq!(parse_args(["--pop=yes"]), Err(ArgError::UnexpectedValue("--pop")));
        assert_eq!(
            parse_args(["--bogus"]),
            Err(ArgError::UnknownOption("--bogus".to_string()))
        );
    }

    #[test]
    fn test_help_explains_exit_status() {
        let mut buf = Vec::new();
        write_help(&mut buf).unwrap();
        let help = String::from_utf8(buf).unwrap();
        assert!(help.contains("--location LOCATION"));
        assert!(help.contains("The exit status is the exit status of COMMAND"));
        assert!(help.contains("exits with its status"));
    }

    #[test]
    fn test_help_and_version() {
        assert_eq!(parse_args(["--help"]), Ok(ParsedArgs::Help));
        assert_eq!(parse_args(["--pop", "-V"]), Ok(ParsedArgs::Version));
        // after the command starts, --help belongs to the command
        assert!(matches!(parse_args(["less", "--help"]), Ok(ParsedArgs::Run(_))));
    }
}
