//! Clipfolio engine: folder-scoped clipboard history for macOS.
//!
//! Two event sources (a system-wide keystroke tap and a pasteboard poller)
//! feed a single coordinator over one channel; the coordinator owns all
//! session state and is the only writer to the stores. The host UI receives
//! coarse-grained [`UiSignal`]s and calls back into [`HistoryController`]
//! for navigation, search, folder management and screenshot import.

pub mod core;
pub mod shared;
pub mod system;

use std::sync::Arc;

use tokio::sync::mpsc;

pub use crate::core::clipboard::{ClipboardMonitor, ClipboardState};
pub use crate::core::history::HistoryController;
pub use crate::core::screenshot::{NoRecognizer, TextRecognizer};
pub use crate::core::store::{ClipStore, FolderStore, InMemoryStorage, RedbStorage, Storage};
pub use crate::shared::errors::{CommandError, CommandResult};
pub use crate::shared::events::{AppEvent, UiSignal};
pub use crate::shared::settings::AppSettings;
pub use crate::shared::types::{Clip, Folder};
pub use crate::system::gesture::GestureInterceptor;
pub use crate::system::pasteboard::{system_pasteboard, MemoryPasteboard, Pasteboard};

/// Wire up the engine and run the event loop until shutdown.
///
/// Standalone runner used by the binary: UI signals are logged rather than
/// rendered. An embedding host would instead keep the signal receiver and
/// drive its windows from it.
pub async fn run(settings: AppSettings) -> CommandResult<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let (signals_tx, mut signals_rx) = mpsc::unbounded_channel();

    let db_path = crate::core::store::default_db_path()?;
    println!("[Engine] Database at {}", db_path.display());
    let storage = crate::core::store::open_storage(&db_path);
    let clips = ClipStore::new(Arc::clone(&storage));
    let folders = FolderStore::new(storage);

    let pasteboard = system_pasteboard();
    let clipboard_state = ClipboardState::new();

    let interceptor = GestureInterceptor::new(
        events_tx.clone(),
        settings.preferences.copy_read_delay_ms,
    );
    let copy_capture = interceptor.copy_capture_handle();
    interceptor.start();

    let monitor = Arc::new(ClipboardMonitor::new(
        Arc::clone(&pasteboard),
        events_tx.clone(),
        clipboard_state.clone(),
        settings.preferences.poll_interval_ms,
    ));
    monitor.start();

    let mut controller = HistoryController::new(
        clips,
        folders,
        pasteboard,
        clipboard_state,
        copy_capture,
        Arc::new(NoRecognizer),
        signals_tx,
        settings.preferences.default_folder_name.clone(),
    );

    tokio::spawn(async move {
        while let Some(signal) = signals_rx.recv().await {
            println!("[Engine] Signal: {:?}", signal);
        }
    });

    println!(
        "[Engine] Running ({} picker, {} screenshot, {} capture toggle; Ctrl+C to exit)",
        settings.hotkeys.toggle_picker,
        settings.hotkeys.screenshot_mode,
        settings.hotkeys.toggle_copy_capture
    );

    loop {
        tokio::select! {
            event = events_rx.recv() => {
                match event {
                    Some(AppEvent::Shutdown) | None => break,
                    Some(event) => controller.handle_event(event),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                println!("[Engine] Shutdown requested");
                break;
            }
        }
    }

    monitor.stop();
    interceptor.stop();
    println!("[Engine] Stopped");
    Ok(())
}
