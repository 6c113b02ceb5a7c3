//! Pasteboard polling monitor
//!
//! Polls the pasteboard change count on an interval and emits an event when
//! new image content appears. Text capture is gesture-driven, not poll-driven;
//! the monitor only watches for images (screenshots, copied pictures) because
//! those arrive with no keystroke to intercept.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;

use crate::core::clipboard::ClipboardState;
use crate::shared::errors::{CommandError, CommandResult};
use crate::shared::events::AppEvent;
use crate::system::pasteboard::Pasteboard;

const MAX_POLL_INTERVAL_MS: u64 = 5000;
const MAX_CONSECUTIVE_ERRORS: u32 = 10;

pub struct ClipboardMonitor {
    pasteboard: Arc<dyn Pasteboard>,
    events: UnboundedSender<AppEvent>,
    state: ClipboardState,
    poll_interval_ms: u64,
    enabled: Arc<Mutex<bool>>,
    running: Arc<AtomicBool>,
    // Baseline taken at construction so content already on the pasteboard
    // when the app starts is not imported retroactively.
    last_change_count: Arc<Mutex<i64>>,
}

impl ClipboardMonitor {
    pub fn new(
        pasteboard: Arc<dyn Pasteboard>,
        events: UnboundedSender<AppEvent>,
        state: ClipboardState,
        poll_interval_ms: u64,
    ) -> Self {
        let initial = pasteboard.change_count();
        Self {
            pasteboard,
            events,
            state,
            poll_interval_ms,
            enabled: Arc::new(Mutex::new(true)),
            running: Arc::new(AtomicBool::new(false)),
            last_change_count: Arc::new(Mutex::new(initial)),
        }
    }

    /// One poll step. Returns true when an image change event was emitted.
    pub fn tick(&self) -> CommandResult<bool> {
        let current = self.pasteboard.change_count();
        {
            let mut last = self
                .last_change_count
                .lock()
                .map_err(|e| CommandError::SystemIO(format!("Mutex poisoned: {}", e)))?;
            if current == *last {
                return Ok(false);
            }
            *last = current;
        }

        // A change we caused ourselves (paste-back) is consumed silently
        if self.state.consume() {
            println!("[ClipboardMonitor] Skipping self-inflicted change");
            return Ok(false);
        }

        // The baseline still advances while disabled, so changes made during
        // a disabled window are skipped for good rather than imported later
        if !self.is_enabled() {
            return Ok(false);
        }

        let has_image = self.pasteboard.types().iter().any(|kind| kind.is_image());
        if !has_image {
            return Ok(false);
        }

        match self.pasteboard.read_image()? {
            Some(bytes) => {
                println!("[ClipboardMonitor] Image change detected ({} bytes)", bytes.len());
                self.events
                    .send(AppEvent::ImageChanged(bytes))
                    .map_err(|e| CommandError::Unknown(format!("Event channel closed: {}", e)))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Spawn the polling loop. Errors back off up to MAX_POLL_INTERVAL_MS and
    /// the loop gives up after MAX_CONSECUTIVE_ERRORS in a row.
    pub fn start(self: &Arc<Self>) {
        if self.running.swap(true, Ordering::SeqCst) {
            println!("[ClipboardMonitor] Already running");
            return;
        }

        let monitor = Arc::clone(self);
        tokio::spawn(async move {
            println!(
                "[ClipboardMonitor] Started ({}ms interval)",
                monitor.poll_interval_ms
            );
            let mut consecutive_errors: u32 = 0;

            while monitor.running.load(Ordering::SeqCst) {
                match monitor.tick() {
                    Ok(_) => {
                        consecutive_errors = 0;
                    }
                    Err(e) => {
                        consecutive_errors += 1;
                        eprintln!(
                            "[ClipboardMonitor] Poll error ({}/{}): {}",
                            consecutive_errors, MAX_CONSECUTIVE_ERRORS, e
                        );
                        if consecutive_errors >= MAX_CONSECUTIVE_ERRORS {
                            eprintln!("[ClipboardMonitor] Too many consecutive errors, stopping");
                            monitor.running.store(false, Ordering::SeqCst);
                            break;
                        }
                    }
                }

                let backoff = monitor
                    .poll_interval_ms
                    .saturating_mul(1 << consecutive_errors.min(3))
                    .min(MAX_POLL_INTERVAL_MS);
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }
            println!("[ClipboardMonitor] Stopped");
        });
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    pub fn is_enabled(&self) -> bool {
        match self.enabled.lock() {
            Ok(enabled) => *enabled,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    pub fn set_enabled(&self, value: bool) {
        match self.enabled.lock() {
            Ok(mut enabled) => *enabled = value,
            Err(poisoned) => *poisoned.into_inner() = value,
        }
        println!(
            "[ClipboardMonitor] Capture {}",
            if value { "enabled" } else { "disabled" }
        );
    }

    pub fn toggle_enabled(&self) -> bool {
        let new_value = !self.is_enabled();
        self.set_enabled(new_value);
        new_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::system::pasteboard::MemoryPasteboard;
    use tokio::sync::mpsc::unbounded_channel;

    fn monitor_with_board() -> (
        ClipboardMonitor,
        Arc<MemoryPasteboard>,
        tokio::sync::mpsc::UnboundedReceiver<AppEvent>,
    ) {
        let board = Arc::new(MemoryPasteboard::new());
        let (tx, rx) = unbounded_channel();
        let monitor = ClipboardMonitor::new(
            Arc::clone(&board) as Arc<dyn Pasteboard>,
            tx,
            ClipboardState::new(),
            500,
        );
        (monitor, board, rx)
    }

    #[test]
    fn test_no_change_no_event() {
        let (monitor, _board, mut rx) = monitor_with_board();
        assert!(!monitor.tick().expect("tick"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_preexisting_content_not_imported() {
        let board = Arc::new(MemoryPasteboard::new());
        board.set_image(vec![1, 2, 3]);

        let (tx, mut rx) = unbounded_channel();
        let monitor = ClipboardMonitor::new(
            Arc::clone(&board) as Arc<dyn Pasteboard>,
            tx,
            ClipboardState::new(),
            500,
        );

        // Baseline was taken after set_image, so nothing is new
        assert!(!monitor.tick().expect("tick"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_image_change_emits_event() {
        let (monitor, board, mut rx) = monitor_with_board();

        board.set_image(vec![7, 7, 7]);
        assert!(monitor.tick().expect("tick"));
        assert_eq!(rx.try_recv().expect("event"), AppEvent::ImageChanged(vec![7, 7, 7]));

        // Same change count again: silent
        assert!(!monitor.tick().expect("tick"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_text_change_is_ignored() {
        let (monitor, board, mut rx) = monitor_with_board();

        board.set_text("hello");
        assert!(!monitor.tick().expect("tick"));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_self_write_is_suppressed_once() {
        let (monitor, board, mut rx) = monitor_with_board();

        monitor.state.suppress_next();
        board.set_image(vec![1]);
        assert!(!monitor.tick().expect("tick"));
        assert!(rx.try_recv().is_err());

        // The latch is spent: the next external change is captured
        board.set_image(vec![2]);
        assert!(monitor.tick().expect("tick"));
        assert_eq!(rx.try_recv().expect("event"), AppEvent::ImageChanged(vec![2]));
    }

    #[test]
    fn test_disabled_monitor_swallows_changes() {
        let (monitor, board, mut rx) = monitor_with_board();

        monitor.set_enabled(false);
        board.set_image(vec![5]);
        assert!(!monitor.tick().expect("tick"));
        assert!(rx.try_recv().is_err());

        // Re-enabling does not retroactively import the swallowed change
        assert!(!monitor.tick().expect("tick"));
        assert!(monitor.toggle_enabled());
        assert!(!monitor.tick().expect("tick"));
        assert!(rx.try_recv().is_err());

        board.set_image(vec![6]);
        assert!(monitor.tick().expect("tick"));
        assert_eq!(rx.try_recv().expect("event"), AppEvent::ImageChanged(vec![6]));
    }
}
