//! In-memory fallback storage (used if database initialization fails)

use std::collections::HashMap;
use std::sync::Mutex;

use super::Storage;
use crate::shared::errors::{CommandError, CommandResult};
use crate::shared::types::{Clip, Folder};

#[derive(Default)]
pub struct InMemoryStorage {
    folders: Mutex<HashMap<String, Folder>>,
    clips: Mutex<HashMap<String, Clip>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for InMemoryStorage {
    fn insert_folder(&self, folder: &Folder) -> CommandResult<()> {
        let mut folders = self
            .folders
            .lock()
            .map_err(|e| CommandError::SystemIO(format!("Mutex poisoned: {}", e)))?;
        folders.insert(folder.id.clone(), folder.clone());
        Ok(())
    }

    fn update_folder(&self, folder: &Folder) -> CommandResult<()> {
        self.insert_folder(folder)
    }

    fn fetch_folder(&self, id: &str) -> CommandResult<Option<Folder>> {
        let folders = self
            .folders
            .lock()
            .map_err(|e| CommandError::SystemIO(format!("Mutex poisoned: {}", e)))?;
        Ok(folders.get(id).cloned())
    }

    fn list_folders(&self) -> CommandResult<Vec<Folder>> {
        let folders = self
            .folders
            .lock()
            .map_err(|e| CommandError::SystemIO(format!("Mutex poisoned: {}", e)))?;
        let mut all: Vec<Folder> = folders.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    fn delete_folder_cascade(&self, id: &str) -> CommandResult<usize> {
        let mut folders = self
            .folders
            .lock()
            .map_err(|e| CommandError::SystemIO(format!("Mutex poisoned: {}", e)))?;
        let mut clips = self
            .clips
            .lock()
            .map_err(|e| CommandError::SystemIO(format!("Mutex poisoned: {}", e)))?;

        folders.remove(id);
        let before = clips.len();
        clips.retain(|_, clip| clip.folder_id != id);
        Ok(before - clips.len())
    }

    fn insert_clip(&self, clip: &Clip) -> CommandResult<()> {
        let mut clips = self
            .clips
            .lock()
            .map_err(|e| CommandError::SystemIO(format!("Mutex poisoned: {}", e)))?;
        clips.insert(clip.id.clone(), clip.clone());
        Ok(())
    }

    fn fetch_clip(&self, id: &str) -> CommandResult<Option<Clip>> {
        let clips = self
            .clips
            .lock()
            .map_err(|e| CommandError::SystemIO(format!("Mutex poisoned: {}", e)))?;
        Ok(clips.get(id).cloned())
    }

    fn clips_for_folder(&self, folder_id: &str) -> CommandResult<Vec<Clip>> {
        let clips = self
            .clips
            .lock()
            .map_err(|e| CommandError::SystemIO(format!("Mutex poisoned: {}", e)))?;
        Ok(clips
            .values()
            .filter(|clip| clip.folder_id == folder_id)
            .cloned()
            .collect())
    }
}
