//! System-wide keystroke gesture interceptor
//!
//! Distinguishes a genuine user-initiated Cmd+C from the app's own
//! paste-back writes, and detects Return as the paste-commit gesture. The
//! tap observes and passes every event through unmodified; it never alters
//! normal copy/paste behavior.
//!
//! Key classification is a pure function so the contract is testable without
//! a live tap. The copy gesture is dispatched after a fixed delay to give
//! the OS time to populate the clipboard before the consumer reads it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

use crate::shared::events::AppEvent;
use crate::system::permissions;

#[cfg(target_os = "macos")]
mod macos;

// Virtual key codes (ANSI standard)
pub const KEY_C: u16 = 8;
pub const KEY_Q: u16 = 12;
pub const KEY_ONE: u16 = 18;
pub const KEY_RETURN: u16 = 36;
pub const KEY_M: u16 = 46;

/// Semantic gestures recognized from raw keydown events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    Copy,
    Paste,
    TogglePicker,
    ScreenshotMode,
    ToggleCopyCapture,
}

/// Map a keydown to a semantic gesture.
///
/// Return always commits a paste regardless of modifiers; the consumer gates
/// on text-field focus. Cmd+C is silenced by the capture flag without
/// removing the tap.
pub fn classify_keydown(command: bool, keycode: u16, capture_enabled: bool) -> Option<Gesture> {
    if keycode == KEY_RETURN {
        return Some(Gesture::Paste);
    }
    if !command {
        return None;
    }
    match keycode {
        KEY_C if capture_enabled => Some(Gesture::Copy),
        KEY_C => None,
        KEY_M => Some(Gesture::TogglePicker),
        KEY_ONE => Some(Gesture::ScreenshotMode),
        KEY_Q => Some(Gesture::ToggleCopyCapture),
        _ => None,
    }
}

/// Forward a classified gesture into the coordinator channel.
///
/// Copy is the only delayed dispatch: the clipboard has not settled at
/// keydown time, so the read is scheduled `copy_delay_ms` later from a
/// detached thread. Fire-and-forget; rapid repeated copies each schedule an
/// independent read.
pub(crate) fn dispatch_gesture(
    events: &UnboundedSender<AppEvent>,
    gesture: Gesture,
    copy_delay_ms: u64,
) {
    match gesture {
        Gesture::Copy => {
            let tx = events.clone();
            std::thread::spawn(move || {
                std::thread::sleep(Duration::from_millis(copy_delay_ms));
                let _ = tx.send(AppEvent::CopyGesture);
            });
        }
        Gesture::Paste => {
            let _ = events.send(AppEvent::PasteGesture);
        }
        Gesture::TogglePicker => {
            let _ = events.send(AppEvent::TogglePicker);
        }
        Gesture::ScreenshotMode => {
            let _ = events.send(AppEvent::ScreenshotMode);
        }
        Gesture::ToggleCopyCapture => {
            let _ = events.send(AppEvent::ToggleCopyCapture);
        }
    }
}

/// Installs the keydown tap and emits semantic gestures.
///
/// Installed once at startup; the copy-capture flag silences the copy path
/// without touching the tap itself.
pub struct GestureInterceptor {
    events: UnboundedSender<AppEvent>,
    copy_capture: Arc<AtomicBool>,
    copy_read_delay_ms: u64,
    installed: Arc<AtomicBool>,
}

impl GestureInterceptor {
    pub fn new(events: UnboundedSender<AppEvent>, copy_read_delay_ms: u64) -> Self {
        Self {
            events,
            copy_capture: Arc::new(AtomicBool::new(true)),
            copy_read_delay_ms,
            installed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared handle to the copy-capture flag (read by the tap callback)
    pub fn copy_capture_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.copy_capture)
    }

    pub fn is_copy_capture_enabled(&self) -> bool {
        self.copy_capture.load(Ordering::SeqCst)
    }

    pub fn set_copy_capture(&self, enabled: bool) {
        self.copy_capture.store(enabled, Ordering::SeqCst);
        println!("[GestureInterceptor] Copy capture set to {}", enabled);
    }

    /// Check permissions and install the tap. Returns false when the tap
    /// could not be installed (permission missing or unsupported platform).
    pub fn start(&self) -> bool {
        self.start_with_permission(permissions::is_trusted(true))
    }

    pub(crate) fn start_with_permission(&self, trusted: bool) -> bool {
        if !trusted {
            eprintln!("[GestureInterceptor] Accessibility not granted, tap not installed");
            let _ = self.events.send(AppEvent::PermissionNeeded);
            return false;
        }

        if self.installed.swap(true, Ordering::SeqCst) {
            // Tap is installed once; repeated starts are no-ops
            return true;
        }

        self.install_tap()
    }

    #[cfg(target_os = "macos")]
    fn install_tap(&self) -> bool {
        macos::install_tap(
            self.events.clone(),
            Arc::clone(&self.copy_capture),
            self.copy_read_delay_ms,
        )
    }

    #[cfg(not(target_os = "macos"))]
    fn install_tap(&self) -> bool {
        eprintln!("[GestureInterceptor] Event tap unavailable on this platform");
        self.installed.store(false, Ordering::SeqCst);
        false
    }

    /// Tear down the tap. Safe to call multiple times.
    pub fn stop(&self) {
        if !self.installed.swap(false, Ordering::SeqCst) {
            return;
        }
        #[cfg(target_os = "macos")]
        macos::teardown_tap();
        println!("[GestureInterceptor] Stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_classify_copy_requires_command_and_capture() {
        assert_eq!(classify_keydown(true, KEY_C, true), Some(Gesture::Copy));
        assert_eq!(classify_keydown(true, KEY_C, false), None);
        assert_eq!(classify_keydown(false, KEY_C, true), None);
    }

    #[test]
    fn test_classify_return_is_always_paste() {
        assert_eq!(classify_keydown(false, KEY_RETURN, true), Some(Gesture::Paste));
        assert_eq!(classify_keydown(true, KEY_RETURN, false), Some(Gesture::Paste));
    }

    #[test]
    fn test_classify_app_shortcuts() {
        assert_eq!(classify_keydown(true, KEY_M, true), Some(Gesture::TogglePicker));
        assert_eq!(classify_keydown(true, KEY_ONE, true), Some(Gesture::ScreenshotMode));
        assert_eq!(classify_keydown(true, KEY_Q, true), Some(Gesture::ToggleCopyCapture));
        assert_eq!(classify_keydown(false, KEY_M, true), None);
    }

    #[test]
    fn test_classify_unknown_key_is_ignored() {
        assert_eq!(classify_keydown(true, 0, true), None);
        assert_eq!(classify_keydown(false, 125, true), None);
    }

    #[test]
    fn test_permission_gating_installs_nothing() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let interceptor = GestureInterceptor::new(tx, 200);

        assert!(!interceptor.start_with_permission(false));
        assert_eq!(rx.try_recv(), Ok(AppEvent::PermissionNeeded));
        assert!(rx.try_recv().is_err());
        assert!(!interceptor.installed.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let interceptor = GestureInterceptor::new(tx, 200);

        interceptor.stop();
        interceptor.stop();
    }

    #[tokio::test]
    async fn test_paste_dispatch_is_immediate() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatch_gesture(&tx, Gesture::Paste, 200);
        assert_eq!(rx.try_recv(), Ok(AppEvent::PasteGesture));
    }

    #[tokio::test]
    async fn test_copy_dispatch_is_delayed() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        dispatch_gesture(&tx, Gesture::Copy, 10);

        // Not on the channel yet at keydown time
        assert!(rx.try_recv().is_err());

        let event = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for delayed copy")
            .expect("channel closed");
        assert_eq!(event, AppEvent::CopyGesture);
    }
}
