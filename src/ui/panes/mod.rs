//! TUI pane rendering modules
//!
//! # Pane Modules
//!
//! - [`memory`]: set cells of the address space with `sp` and `fp` rows highlighted
//! - [`frames`]: active call frames found by walking the saved-fp chain
//! - [`terminal`]: console output at the current step
//! - [`status`]: status bar with keybindings and replay position
//!
//! Each pane module exports a primary `render_*` function and, where the
//! pane scrolls, a scroll state type owned by the app.

mod utils;

pub mod frames;
pub mod memory;
pub mod status;
pub mod terminal;

pub use frames::{render_frames_pane, FramesRenderData};
pub use memory::{render_memory_pane, MemoryRenderData, MemoryScrollState};
pub use status::{render_status_bar, StatusRenderData};
pub use terminal::render_terminal_pane;
