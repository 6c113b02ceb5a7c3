//! History coordinator
//!
//! Single writer to the stores and single source of truth for session state:
//! which folder is selected, the active search term, and the focused clip.
//! The gesture interceptor and the clipboard monitor feed it events through
//! one channel; it pushes coarse-grained signals out to the host UI.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::core::clipboard::ClipboardState;
use crate::core::screenshot::TextRecognizer;
use crate::core::store::{ClipStore, FolderStore};
use crate::shared::events::{AppEvent, UiSignal};
use crate::shared::types::{Clip, Folder};
use crate::system::pasteboard::Pasteboard;

pub struct HistoryController {
    clips: ClipStore,
    folders: FolderStore,
    pasteboard: Arc<dyn Pasteboard>,
    clipboard_state: ClipboardState,
    copy_capture: Arc<AtomicBool>,
    recognizer: Arc<dyn TextRecognizer>,
    signals: UnboundedSender<UiSignal>,
    default_folder_name: String,

    // Session state, never persisted
    selected_folder: Option<Folder>,
    search: String,
    // None is "no focus"; movement is defensive in case the id falls out
    // of the projection between a recompute and the next keystroke
    focused_clip: Option<String>,
    renaming_folder: Option<String>,
    search_field_active: bool,
    frontmost: bool,
    authorization_needed: bool,
}

impl HistoryController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        clips: ClipStore,
        folders: FolderStore,
        pasteboard: Arc<dyn Pasteboard>,
        clipboard_state: ClipboardState,
        copy_capture: Arc<AtomicBool>,
        recognizer: Arc<dyn TextRecognizer>,
        signals: UnboundedSender<UiSignal>,
        default_folder_name: String,
    ) -> Self {
        let mut controller = Self {
            clips,
            folders,
            pasteboard,
            clipboard_state,
            copy_capture,
            recognizer,
            signals,
            default_folder_name,
            selected_folder: None,
            search: String::new(),
            focused_clip: None,
            renaming_folder: None,
            search_field_active: false,
            frontmost: false,
            authorization_needed: false,
        };
        controller.bootstrap();
        controller
    }

    /// Select the first folder, creating the default one on first run.
    fn bootstrap(&mut self) {
        let folder = match self.folders.list_folders().into_iter().next() {
            Some(folder) => Some(folder),
            None => self
                .folders
                .bootstrap_default_folder(&self.default_folder_name),
        };
        self.selected_folder = folder;
        self.refresh_focus();
    }

    // --- projection -------------------------------------------------------

    /// Clips of the selected folder, newest first, filtered by the active
    /// search term (case-insensitive substring over text content).
    pub fn visible_clips(&self) -> Vec<Clip> {
        let Some(folder) = &self.selected_folder else {
            return Vec::new();
        };

        let mut clips = self.clips.clips_for_folder(&folder.id);
        clips.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        if self.search.is_empty() {
            return clips;
        }
        let needle = self.search.to_lowercase();
        clips
            .into_iter()
            .filter(|clip| {
                clip.text
                    .as_deref()
                    .is_some_and(|text| text.to_lowercase().contains(&needle))
            })
            .collect()
    }

    /// Reset focus to the head of the projection (or clear it when empty).
    /// Called whenever the selected folder, the search term, or the folder's
    /// clip set changes.
    fn refresh_focus(&mut self) {
        self.focused_clip = self.visible_clips().first().map(|clip| clip.id.clone());
    }

    pub fn focused_clip_id(&self) -> Option<&str> {
        self.focused_clip.as_deref()
    }

    /// Step the focus cursor within the projection, clamped at both ends.
    /// No-op when nothing is focused or when the focused clip is no longer
    /// part of the projection.
    pub fn move_focus(&mut self, up: bool) {
        let Some(focused) = &self.focused_clip else {
            return;
        };
        let projection = self.visible_clips();
        let Some(index) = projection.iter().position(|clip| &clip.id == focused) else {
            return;
        };

        let next = if up {
            index.saturating_sub(1)
        } else {
            (index + 1).min(projection.len() - 1)
        };
        self.focused_clip = Some(projection[next].id.clone());
    }

    // --- search -----------------------------------------------------------

    pub fn set_search(&mut self, term: &str) {
        self.search = term.to_string();
        self.refresh_focus();
        let _ = self.signals.send(UiSignal::HistoryChanged);
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search_field_active(&mut self, active: bool) {
        self.search_field_active = active;
    }

    pub fn set_frontmost(&mut self, frontmost: bool) {
        self.frontmost = frontmost;
    }

    pub fn authorization_needed(&self) -> bool {
        self.authorization_needed
    }

    // --- paste-back -------------------------------------------------------

    /// Write the focused clip back to the pasteboard, preferring text over
    /// image, then ask the host UI to re-present the picker. No-op when
    /// nothing is focused.
    pub fn paste(&mut self) {
        let Some(focused) = self.focused_clip.clone() else {
            return;
        };
        let Some(clip) = self.clips.find_clip(&focused) else {
            eprintln!("[History] Focused clip {} vanished, paste skipped", focused);
            return;
        };

        // Our own write must not be re-captured by the next poll
        self.clipboard_state.suppress_next();
        let result = if let Some(text) = &clip.text {
            self.pasteboard.write_text(text)
        } else if let Some(image) = &clip.image {
            self.pasteboard.write_image(image)
        } else {
            Ok(())
        };
        if let Err(e) = result {
            eprintln!("[History] Failed to write clip to pasteboard: {}", e);
            return;
        }

        let _ = self.signals.send(UiSignal::PresentPicker);
    }

    // --- event handling ---------------------------------------------------

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::CopyGesture => self.on_copy_gesture(),
            AppEvent::PasteGesture => self.on_paste_gesture(),
            AppEvent::ImageChanged(bytes) => self.on_image_changed(bytes),
            AppEvent::TogglePicker => {
                let _ = self.signals.send(UiSignal::TogglePicker);
            }
            AppEvent::ScreenshotMode => {
                if self.frontmost {
                    let _ = self.signals.send(UiSignal::EnterScreenshotMode);
                }
            }
            AppEvent::ToggleCopyCapture => {
                if self.frontmost {
                    let enabled = !self.copy_capture.load(Ordering::SeqCst);
                    self.copy_capture.store(enabled, Ordering::SeqCst);
                    println!(
                        "[History] Copy capture {}",
                        if enabled { "enabled" } else { "disabled" }
                    );
                    let _ = self.signals.send(UiSignal::CopyCaptureChanged(enabled));
                }
            }
            AppEvent::PermissionNeeded => {
                self.authorization_needed = true;
                let _ = self.signals.send(UiSignal::AuthorizationNeeded);
            }
            AppEvent::Shutdown => {}
        }
    }

    /// Copy gesture fired (already delayed so the pasteboard has settled):
    /// read current text and persist it into the selected folder.
    fn on_copy_gesture(&mut self) {
        let text = match self.pasteboard.read_text() {
            Ok(Some(text)) => text,
            Ok(None) => return,
            Err(e) => {
                eprintln!("[History] Failed to read pasteboard text: {}", e);
                return;
            }
        };

        if self
            .clips
            .create_clip(self.selected_folder.as_ref(), Some(text), None)
            .is_some()
        {
            self.refresh_focus();
            let _ = self.signals.send(UiSignal::HistoryChanged);
        }
    }

    /// Return pressed: commit a paste, but only while our window is frontmost
    /// and no text field is swallowing the keystroke.
    fn on_paste_gesture(&mut self) {
        if self.search_field_active || !self.frontmost {
            return;
        }
        self.paste();
        // Next presentation shows the unfiltered history
        self.search.clear();
        let _ = self.signals.send(UiSignal::HistoryChanged);
    }

    /// Image appeared on the pasteboard (monitor path, no keystroke).
    fn on_image_changed(&mut self, bytes: Vec<u8>) {
        if self
            .clips
            .create_image_clip(self.selected_folder.as_ref(), bytes)
            .is_some()
        {
            self.refresh_focus();
            let _ = self.signals.send(UiSignal::HistoryChanged);
        }
    }

    // --- screenshot import ------------------------------------------------

    /// Import a captured region: one clip carrying the image bytes plus any
    /// text the OCR collaborator extracted from them. The image is also
    /// written back to the pasteboard so the capture is immediately pasteable.
    pub fn import_capture(&mut self, image: Vec<u8>) {
        let text = self.recognizer.recognize_text(&image);

        self.clipboard_state.suppress_next();
        if let Err(e) = self.pasteboard.write_image(&image) {
            eprintln!("[History] Failed to write capture to pasteboard: {}", e);
        }

        let text = (!text.is_empty()).then_some(text);
        if self
            .clips
            .create_clip(self.selected_folder.as_ref(), text, Some(image))
            .is_some()
        {
            self.refresh_focus();
            let _ = self.signals.send(UiSignal::HistoryChanged);
        }
    }

    // --- folders ----------------------------------------------------------

    pub fn selected_folder(&self) -> Option<&Folder> {
        self.selected_folder.as_ref()
    }

    pub fn list_folders(&self) -> Vec<Folder> {
        self.folders.list_folders()
    }

    pub fn select_folder(&mut self, id: &str) {
        let Some(folder) = self.folders.find_folder(id) else {
            eprintln!("[History] Cannot select missing folder {}", id);
            return;
        };
        self.selected_folder = Some(folder);
        self.refresh_focus();
        let _ = self.signals.send(UiSignal::HistoryChanged);
    }

    /// Create a folder and make it the selection.
    pub fn create_folder(&mut self, name: &str) -> Option<Folder> {
        let folder = self.folders.create_folder(name)?;
        self.selected_folder = Some(folder.clone());
        self.refresh_focus();
        let _ = self.signals.send(UiSignal::HistoryChanged);
        Some(folder)
    }

    /// Delete a folder (with its clips). When the selection is deleted, fall
    /// back to the first remaining folder or re-create the default one.
    pub fn delete_folder(&mut self, id: &str) {
        if !self.folders.delete_folder(id) {
            return;
        }
        if self.renaming_folder.as_deref() == Some(id) {
            self.renaming_folder = None;
        }

        if self.selected_folder.as_ref().is_some_and(|f| f.id == id) {
            self.selected_folder = None;
            self.bootstrap();
        } else {
            self.refresh_focus();
        }
        let _ = self.signals.send(UiSignal::HistoryChanged);
    }

    /// Mark a folder as being renamed (the edit-mode target for the UI)
    pub fn begin_rename(&mut self, id: &str) {
        if self.folders.find_folder(id).is_some() {
            self.renaming_folder = Some(id.to_string());
        }
    }

    pub fn renaming_folder_id(&self) -> Option<&str> {
        self.renaming_folder.as_deref()
    }

    pub fn commit_rename(&mut self, new_name: &str) {
        let Some(id) = self.renaming_folder.take() else {
            return;
        };
        let Some(renamed) = self.folders.rename_folder(&id, new_name) else {
            return;
        };
        if self.selected_folder.as_ref().is_some_and(|f| f.id == id) {
            self.selected_folder = Some(renamed);
        }
        let _ = self.signals.send(UiSignal::HistoryChanged);
    }

    pub fn cancel_rename(&mut self) {
        self.renaming_folder = None;
    }
}
