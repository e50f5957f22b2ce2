//! popterm - a pop-up terminal
//!
//! Runs a command in a terminal window drawn inside the current terminal.
//! The window can be sized as a fraction of the screen, anchored to one of
//! nine numpad positions, and made a pop-up that closes as soon as it loses
//! focus. With `--stdio` the command reads the caller's stdin and writes the
//! caller's stdout, so popterm can sit in the middle of a pipeline.
//!
//! # Quick Start
//!
//! ```text
//! popterm                                   # $SHELL in a centered window
//! popterm --pop --location 9 --size 0.5,0.5 # pop-up in the top-right quarter
//! git diff | popterm --stdio -- less        # page a pipe in a window
//! ```
//!
//! The exit status is the command's exit status.

mod app;
mod cli;
mod config;
mod core;
mod relay;
mod signals;
mod ui;

use std::env;
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{ParsedArgs, VERSION};
use crate::config::Config;
use crate::relay::Role;

/// Log filter override
const LOG_ENV: &str = "POPTERM_LOG";

/// Initialize logging to `~/.popterm/popterm.log`.
///
/// Logging is best effort: without a writable log file nothing is recorded.
fn init_logging(default_filter: &str) {
    let Some(dir) = config::data_dir() else {
        return;
    };
    let _ = fs::create_dir_all(&dir);

    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("popterm.log"))
    else {
        return;
    };

    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

/// Path used to re-execute this binary as the stdio wrapper
fn self_exe() -> String {
    env::current_exe()
        .map(PathBuf::into_os_string)
        .ok()
        .and_then(|p| p.into_string().ok())
        .or_else(|| env::args().next())
        .unwrap_or_else(|| "popterm".to_string())
}

fn main() {
    let options = match cli::parse_args(env::args().skip(1)) {
        Ok(ParsedArgs::Run(options)) => options,
        Ok(ParsedArgs::Help) => {
            cli::print_help();
            process::exit(0);
        }
        Ok(ParsedArgs::Version) => {
            cli::print_version();
            process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let (config, config_error) = match Config::load() {
        Ok(c) => (c, None),
        Err(e) => (Config::default(), Some(e)),
    };

    init_logging(&config.log_level);
    if let Some(e) = config_error {
        warn!("{}; using defaults", e);
    }

    let role = Role::from_options(&options);
    info!("popterm {} starting as {:?}", VERSION, role);

    if let Role::Wrapper { pid } = role {
        process::exit(relay::run_wrapper(pid, &options.command));
    }

    let command = relay::surface_command(
        role,
        &self_exe(),
        process::id(),
        &options.command,
        env::var("SHELL").ok(),
    );

    match app::run(&options, command, &config) {
        Ok(code) => {
            info!("Exiting with status {}", code);
            process::exit(code);
        }
        Err(e) => {
            error!("{:#}", e);
            eprintln!("popterm: {:#}", e);
            process::exit(1);
        }
    }
}
