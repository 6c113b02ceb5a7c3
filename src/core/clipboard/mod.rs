//! Clipboard change detection

mod monitor;
mod state;

pub use monitor::ClipboardMonitor;
pub use state::ClipboardState;
