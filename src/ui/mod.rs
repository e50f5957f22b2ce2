//! User interface rendering and input handling.
//!
//! - **window**: the window as a cell rectangle inside the host terminal
//! - **renderer**: paints the window and the terminal screen to `/dev/tty`
//! - **keymapper**: keyboard input to PTY byte sequence mapping

pub mod keymapper;
pub mod renderer;
pub mod window;

pub use keymapper::{InputModes, KeyMapper};
pub use renderer::Renderer;
pub use window::TuiWindow;
