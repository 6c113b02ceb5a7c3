//! Self-write suppression flag shared between the paste path and the monitor

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One-shot "ignore the next pasteboard change" latch.
///
/// Paste-back writes to the pasteboard and would otherwise be re-captured by
/// the next poll as a fresh change. The writer arms the latch right before
/// writing; the monitor consumes it when the change count moves.
#[derive(Clone, Default)]
pub struct ClipboardState {
    ignore_next: Arc<AtomicBool>,
}

impl ClipboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the latch: the next detected change is ours, skip it.
    pub fn suppress_next(&self) {
        self.ignore_next.store(true, Ordering::SeqCst);
    }

    /// Read-and-clear. Returns true exactly once per suppress_next call.
    pub fn consume(&self) -> bool {
        self.ignore_next.swap(false, Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_is_one_shot() {
        let state = ClipboardState::new();
        assert!(!state.consume());

        state.suppress_next();
        assert!(state.consume());
        assert!(!state.consume());
    }

    #[test]
    fn test_clones_share_the_latch() {
        let state = ClipboardState::new();
        let writer = state.clone();

        writer.suppress_next();
        assert!(state.consume());
    }
}
