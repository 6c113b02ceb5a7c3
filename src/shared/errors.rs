//! Strict error handling with CommandError enum
//!
//! All fallible operations in the engine return `CommandResult<T>`. Nothing
//! in this crate propagates an error across a component boundary: callers at
//! the seams log and degrade to no-ops.

use serde::Serialize;
use thiserror::Error;

/// Engine operation errors
#[derive(Error, Debug, Clone, Serialize)]
#[serde(tag = "type", content = "message")]
pub enum CommandError {
    /// System I/O error (database, file operations, etc.)
    #[error("System I/O error: {0}")]
    SystemIO(String),

    /// Accessibility permissions denied
    #[error("Accessibility permissions denied. Please enable in System Settings > Privacy & Security > Accessibility.")]
    AccessibilityDenied,

    /// Invalid input or parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Clipboard operation error
    #[error("Clipboard error: {0}")]
    ClipboardError(String),

    /// Unknown/unexpected error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Implement From for common error types
impl From<std::io::Error> for CommandError {
    fn from(err: std::io::Error) -> Self {
        CommandError::SystemIO(err.to_string())
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::InvalidInput(format!("JSON error: {}", err))
    }
}

// Helper type alias for engine results
pub type CommandResult<T> = Result<T, CommandError>;
