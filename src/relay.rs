//! Stdio forwarding through a re-executed wrapper
//!
//! A launcher started with `--stdio` runs the command through a second copy
//! of this binary:
//!
//! ```text
//! launcher (stdio = caller's pipe/tty)
//! └── terminal surface
//!     └── popterm --wrap-stdio <launcher pid> -- COMMAND...
//!         ├── fd 0 <- /proc/<launcher pid>/fd/0
//!         ├── fd 1 <- /proc/<launcher pid>/fd/1
//!         └── exec COMMAND (stderr stays on the terminal)
//! ```
//!
//! The launcher keeps its stdio open while the wrapper takes it over. There
//! is no completion channel back to the launcher: an exec failure in the
//! wrapper is only visible as the child's exit status.

use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::Command;

use thiserror::Error;
use tracing::{debug, error};

use crate::cli::Options;

/// Separator between the envelope's options and the command
const SEPARATOR: &str = "--";

#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to open {path}: {source}")]
    Descriptor {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to duplicate descriptor onto fd {target}: {source}")]
    Duplicate {
        target: RawFd,
        #[source]
        source: nix::Error,
    },

    #[error("failed to exec cmd '{command}': {source}")]
    Exec {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("No command to run")]
    EmptyCommand,
}

impl RelayError {
    /// Exit status of the wrapper after this error: the OS error code for a
    /// failed exec, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        match self {
            RelayError::Exec { source, .. } => source.raw_os_error().unwrap_or(1),
            _ => 1,
        }
    }
}

/// Which part this process instance plays
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// Opens a window and runs the command in it
    Direct,
    /// Opens a window and runs the command through a wrapper that inherits
    /// this process's stdio
    Launcher,
    /// Takes over `pid`'s stdin/stdout and execs the command; never opens a
    /// window
    Wrapper { pid: i32 },
}

impl Role {
    pub fn from_options(options: &Options) -> Self {
        match options.wrap_target_pid {
            Some(pid) => Role::Wrapper { pid },
            None if options.forward_stdio => Role::Launcher,
            None => Role::Direct,
        }
    }
}

/// Build the argument vector that re-executes this binary as a wrapper.
pub fn envelope(argv0: &str, pid: u32, command: &[String]) -> Vec<String> {
    let mut argv = Vec::with_capacity(command.len() + 4);
    argv.push(argv0.to_string());
    argv.push("--wrap-stdio".to_string());
    argv.push(pid.to_string());
    argv.push(SEPARATOR.to_string());
    argv.extend(command.iter().cloned());
    argv
}

/// The user's shell, falling back to `sh`
pub fn default_shell(shell_env: Option<String>) -> String {
    shell_env
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "sh".to_string())
}

/// The command to run: the one given, or the default shell when empty
pub fn resolve_command(command: &[String], shell_env: Option<String>) -> Vec<String> {
    if command.is_empty() {
        vec![default_shell(shell_env)]
    } else {
        command.to_vec()
    }
}

/// Command the terminal surface should spawn for `role`.
///
/// `shell_env` is consulted only when `command` is empty.
pub fn surface_command(
    role: Role,
    argv0: &str,
    pid: u32,
    command: &[String],
    shell_env: Option<String>,
) -> Vec<String> {
    let resolved = resolve_command(command, shell_env);
    match role {
        Role::Launcher => envelope(argv0, pid, &resolved),
        _ => resolved,
    }
}

/// Path of a descriptor of another process in proc-fs
pub fn proc_fd_path(pid: i32, fd: RawFd) -> PathBuf {
    PathBuf::from(format!("/proc/{}/fd/{}", pid, fd))
}

/// Replace our stdin and stdout with those of `pid`.
pub fn wrap_stdio(pid: i32) -> Result<(), RelayError> {
    let stdin_path = proc_fd_path(pid, 0);
    let stdin = File::open(&stdin_path).map_err(|source| RelayError::Descriptor {
        path: stdin_path,
        source,
    })?;
    redirect(&stdin, 0)?;
    drop(stdin);

    let stdout_path = proc_fd_path(pid, 1);
    let stdout = OpenOptions::new()
        .write(true)
        .open(&stdout_path)
        .map_err(|source| RelayError::Descriptor {
            path: stdout_path,
            source,
        })?;
    redirect(&stdout, 1)?;
    drop(stdout);

    debug!("Took over stdin/stdout of pid {}", pid);
    Ok(())
}

fn redirect(file: &File, target: RawFd) -> Result<(), RelayError> {
    nix::unistd::dup2(file.as_raw_fd(), target)
        .map(|_| ())
        .map_err(|source| RelayError::Duplicate { target, source })
}

/// Replace the process image with `command`, searching `PATH`.
///
/// Only returns on failure.
pub fn exec_command(command: &[String]) -> RelayError {
    let Some((program, args)) = command.split_first() else {
        return RelayError::EmptyCommand;
    };
    let source = Command::new(program).args(args).exec();
    RelayError::Exec {
        command: command.join(" "),
        source,
    }
}

/// Wrapper role: take over `pid`'s stdio and exec the command.
///
/// Returns the exit status to use when anything fails.
pub fn run_wrapper(pid: i32, command: &[String]) -> i32 {
    let err = match wrap_stdio(pid) {
        Ok(()) => exec_command(command),
        Err(e) => e,
    };
    error!("{}", err);
    eprintln!("popterm: {}", err);
    err.exit_code()
}
