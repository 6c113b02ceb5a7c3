//! Channel-based event contract between the event sources and the engine.
//!
//! The gesture interceptor and the clipboard monitor are independent
//! producers; the coordinator loop in `lib.rs` is the single consumer and
//! the only writer of session state. The host UI subscribes to `UiSignal`.

/// Events flowing from the event sources into the coordinator
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// User pressed Cmd+C somewhere; dispatched after the copy-read delay
    CopyGesture,
    /// User pressed Return; gating on field focus happens in the consumer
    PasteGesture,
    /// The pasteboard changed and now carries an image payload
    ImageChanged(Vec<u8>),
    /// Cmd+M: show or hide the picker window
    TogglePicker,
    /// Cmd+1: enter screenshot capture mode
    ScreenshotMode,
    /// Cmd+Q: flip the copy-capture flag
    ToggleCopyCapture,
    /// Accessibility trust check failed; no tap was installed
    PermissionNeeded,
    /// Stop the coordinator loop
    Shutdown,
}

/// Signals flowing from the engine out to the host UI
#[derive(Debug, Clone, PartialEq)]
pub enum UiSignal {
    /// The visible projection or focus cursor changed; re-render the list
    HistoryChanged,
    /// A paste was committed; the picker should re-present itself
    PresentPicker,
    /// Show or hide the picker window
    TogglePicker,
    /// Begin the screenshot region-selection flow
    EnterScreenshotMode,
    /// Copy capture was toggled; reflect the new state in the menu
    CopyCaptureChanged(bool),
    /// Accessibility permission is missing; show remediation
    AuthorizationNeeded,
}
