//! Core session components.
//!
//! - **placement**: monitor-relative size and 3×3 grid anchoring
//! - **dismiss**: pop-up auto-dismiss on focus loss
//! - **timer**: one-shot deferred tasks for the event loop
//! - **surface**: window and terminal surface interfaces
//! - **pty**: terminal surface backed by a pseudo terminal
//! - **session**: one window, one surface, one command
//!
//! # Architecture
//!
//! ```text
//! TerminalSession
//! ├── Window (hints, title, geometry)
//! ├── TerminalSurface (PTY + child process)
//! └── DismissController (pop-up only)
//! ```

pub mod dismiss;
pub mod placement;
pub mod pty;
pub mod session;
pub mod surface;
pub mod timer;
