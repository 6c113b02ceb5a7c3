//! Pasteboard seam
//!
//! The OS clipboard is a single global mutable resource touched by the
//! monitor (read-only polling) and the coordinator (read on copy, write on
//! paste). Everything above this module talks to the `Pasteboard` trait so
//! the engine runs against `MemoryPasteboard` in tests and on non-macOS
//! builds.

use std::sync::{Arc, Mutex};

use crate::shared::errors::{CommandError, CommandResult};

#[cfg(target_os = "macos")]
pub mod macos;

/// Content classification for the types currently on the pasteboard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasteboardKind {
    Text,
    Tiff,
    Png,
}

impl PasteboardKind {
    pub fn is_image(&self) -> bool {
        matches!(self, PasteboardKind::Tiff | PasteboardKind::Png)
    }
}

/// Read/write access to the OS clipboard plus its revision counter
pub trait Pasteboard: Send + Sync {
    /// Monotonically increasing revision counter; bumps on every mutation
    fn change_count(&self) -> i64;
    /// Content types currently available
    fn types(&self) -> Vec<PasteboardKind>;
    fn read_text(&self) -> CommandResult<Option<String>>;
    fn read_image(&self) -> CommandResult<Option<Vec<u8>>>;
    /// Clears existing contents before writing
    fn write_text(&self, text: &str) -> CommandResult<()>;
    /// Clears existing contents before writing
    fn write_image(&self, bytes: &[u8]) -> CommandResult<()>;
}

/// Build the platform pasteboard
#[cfg(target_os = "macos")]
pub fn system_pasteboard() -> Arc<dyn Pasteboard> {
    Arc::new(macos::SystemPasteboard::new())
}

#[cfg(not(target_os = "macos"))]
pub fn system_pasteboard() -> Arc<dyn Pasteboard> {
    eprintln!("[Pasteboard] No native pasteboard on this platform, using in-memory fallback");
    Arc::new(MemoryPasteboard::new())
}

#[derive(Default)]
struct MemoryContents {
    change_count: i64,
    text: Option<String>,
    image: Option<Vec<u8>>,
}

/// In-process pasteboard fake with a bumping change counter
#[derive(Default)]
pub struct MemoryPasteboard {
    contents: Mutex<MemoryContents>,
}

impl MemoryPasteboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CommandResult<std::sync::MutexGuard<'_, MemoryContents>> {
        self.contents
            .lock()
            .map_err(|e| CommandError::ClipboardError(format!("Mutex poisoned: {}", e)))
    }

    /// Simulate an external app copying text (bumps the revision counter)
    pub fn set_text(&self, text: &str) {
        if let Ok(mut contents) = self.lock() {
            contents.change_count += 1;
            contents.text = Some(text.to_string());
            contents.image = None;
        }
    }

    /// Simulate an external app copying an image (bumps the revision counter)
    pub fn set_image(&self, bytes: Vec<u8>) {
        if let Ok(mut contents) = self.lock() {
            contents.change_count += 1;
            contents.text = None;
            contents.image = Some(bytes);
        }
    }
}

impl Pasteboard for MemoryPasteboard {
    fn change_count(&self) -> i64 {
        self.lock().map(|c| c.change_count).unwrap_or(0)
    }

    fn types(&self) -> Vec<PasteboardKind> {
        let mut kinds = Vec::new();
        if let Ok(contents) = self.lock() {
            if contents.text.is_some() {
                kinds.push(PasteboardKind::Text);
            }
            if contents.image.is_some() {
                kinds.push(PasteboardKind::Tiff);
            }
        }
        kinds
    }

    fn read_text(&self) -> CommandResult<Option<String>> {
        Ok(self.lock()?.text.clone())
    }

    fn read_image(&self) -> CommandResult<Option<Vec<u8>>> {
        Ok(self.lock()?.image.clone())
    }

    fn write_text(&self, text: &str) -> CommandResult<()> {
        let mut contents = self.lock()?;
        contents.change_count += 1;
        contents.text = Some(text.to_string());
        contents.image = None;
        Ok(())
    }

    fn write_image(&self, bytes: &[u8]) -> CommandResult<()> {
        let mut contents = self.lock()?;
        contents.change_count += 1;
        contents.text = None;
        contents.image = Some(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_count_bumps_on_every_mutation() {
        let board = MemoryPasteboard::new();
        assert_eq!(board.change_count(), 0);

        board.set_text("hello");
        assert_eq!(board.change_count(), 1);

        board.write_image(&[1, 2, 3]).expect("write");
        assert_eq!(board.change_count(), 2);
    }

    #[test]
    fn test_write_replaces_previous_contents() {
        let board = MemoryPasteboard::new();
        board.set_image(vec![1, 2, 3]);
        board.write_text("hello").expect("write");

        assert_eq!(board.read_text().expect("read"), Some("hello".to_string()));
        assert_eq!(board.read_image().expect("read"), None);
        assert_eq!(board.types(), vec![PasteboardKind::Text]);
    }

    #[test]
    fn test_image_type_classification() {
        let board = MemoryPasteboard::new();
        board.set_image(vec![0xFF; 16]);

        let kinds = board.types();
        assert!(kinds.iter().any(|k| k.is_image()));
        assert!(!kinds.contains(&PasteboardKind::Text));
    }
}
