//! Persistence layer for clips and folders
//!
//! A thin best-effort store: every operation that can fail logs and
//! degrades to a no-op instead of propagating. The two behavioral contracts
//! live here: image dedup on insert and cascade delete of a folder's clips.

use std::path::PathBuf;
use std::sync::Arc;

use directories::ProjectDirs;

use crate::shared::errors::{CommandError, CommandResult};
use crate::shared::types::{Clip, Folder};

mod memory;
mod redb_store;

pub use memory::InMemoryStorage;
pub use redb_store::RedbStorage;

/// Raw record access over the two entity kinds.
///
/// Implementations guarantee unique-id upsert semantics; ordering and
/// filtering beyond folder scope are the caller's concern.
pub trait Storage: Send + Sync {
    fn insert_folder(&self, folder: &Folder) -> CommandResult<()>;
    fn update_folder(&self, folder: &Folder) -> CommandResult<()>;
    fn fetch_folder(&self, id: &str) -> CommandResult<Option<Folder>>;
    fn list_folders(&self) -> CommandResult<Vec<Folder>>;
    /// Remove the folder and all of its clips in one transaction.
    /// Returns the number of clips removed.
    fn delete_folder_cascade(&self, id: &str) -> CommandResult<usize>;

    fn insert_clip(&self, clip: &Clip) -> CommandResult<()>;
    fn fetch_clip(&self, id: &str) -> CommandResult<Option<Clip>>;
    fn clips_for_folder(&self, folder_id: &str) -> CommandResult<Vec<Clip>>;
}

/// Database location under the platform data directory
pub fn default_db_path() -> CommandResult<PathBuf> {
    let proj_dirs = ProjectDirs::from("com", "clipfolio", "clipfolio")
        .ok_or_else(|| CommandError::SystemIO("Failed to get project directories".to_string()))?;
    Ok(proj_dirs.data_dir().join("clipfolio.redb"))
}

/// Open the embedded database, falling back to in-memory storage if
/// initialization fails (history is then lost on exit, but the app stays
/// usable).
pub fn open_storage(path: &std::path::Path) -> Arc<dyn Storage> {
    match RedbStorage::new(path) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            eprintln!(
                "[Store] Failed to initialize database: {}, using in-memory fallback",
                e
            );
            Arc::new(InMemoryStorage::new())
        }
    }
}

/// Clip operations with best-effort failure semantics
#[derive(Clone)]
pub struct ClipStore {
    storage: Arc<dyn Storage>,
}

impl ClipStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Create and persist a clip in `folder`. Logs and returns None when the
    /// folder is absent or the clip would carry no payload at all. Text
    /// content is taken as-is (empty string allowed).
    pub fn create_clip(
        &self,
        folder: Option<&Folder>,
        text: Option<String>,
        image: Option<Vec<u8>>,
    ) -> Option<Clip> {
        let Some(folder) = folder else {
            eprintln!("[ClipStore] Not found folder, clip dropped");
            return None;
        };
        if text.is_none() && image.is_none() {
            eprintln!("[ClipStore] Clip without any payload dropped");
            return None;
        }

        let clip = Clip::new(&folder.id, text, image);
        if let Err(e) = self.storage.insert_clip(&clip) {
            eprintln!("[ClipStore] Failed to save clip: {}", e);
            return None;
        }
        Some(clip)
    }

    /// Create and persist an image clip unless the same bytes already exist
    /// in the folder. Duplicate inserts are silent no-ops so repeated polls
    /// and multi-app clipboard echoes produce one entry.
    pub fn create_image_clip(&self, folder: Option<&Folder>, image: Vec<u8>) -> Option<Clip> {
        let Some(folder) = folder else {
            eprintln!("[ClipStore] Not found folder, image clip dropped");
            return None;
        };

        let existing = match self.storage.clips_for_folder(&folder.id) {
            Ok(clips) => clips,
            Err(e) => {
                eprintln!("[ClipStore] Failed to load clips for dedup check: {}", e);
                return None;
            }
        };

        let duplicate = existing
            .iter()
            .any(|clip| clip.image.as_deref() == Some(image.as_slice()));
        if duplicate {
            println!(
                "[ClipStore] Skipping duplicate image ({} bytes, {})",
                image.len(),
                fingerprint(&image)
            );
            return None;
        }

        let clip = Clip::new_image(&folder.id, image);
        if let Err(e) = self.storage.insert_clip(&clip) {
            eprintln!("[ClipStore] Failed to save image clip: {}", e);
            return None;
        }
        Some(clip)
    }

    /// Point lookup by id; absent on miss or on query error (logged)
    pub fn find_clip(&self, id: &str) -> Option<Clip> {
        match self.storage.fetch_clip(id) {
            Ok(clip) => clip,
            Err(e) => {
                eprintln!("[ClipStore] Failed to fetch clip {}: {}", id, e);
                None
            }
        }
    }

    pub fn clips_for_folder(&self, folder_id: &str) -> Vec<Clip> {
        self.storage.clips_for_folder(folder_id).unwrap_or_else(|e| {
            eprintln!("[ClipStore] Failed to load clips: {}", e);
            Vec::new()
        })
    }
}

/// Folder operations with best-effort failure semantics
#[derive(Clone)]
pub struct FolderStore {
    storage: Arc<dyn Storage>,
}

impl FolderStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    pub fn create_folder(&self, name: &str) -> Option<Folder> {
        let folder = Folder::new(name);
        if let Err(e) = self.storage.insert_folder(&folder) {
            eprintln!("[FolderStore] Failed to create folder: {}", e);
            return None;
        }
        Some(folder)
    }

    /// Physically remove the folder and all of its clips
    pub fn delete_folder(&self, id: &str) -> bool {
        match self.storage.delete_folder_cascade(id) {
            Ok(removed) => {
                println!("[FolderStore] Deleted folder {} and {} clips", id, removed);
                true
            }
            Err(e) => {
                eprintln!("[FolderStore] Failed to delete folder {}: {}", id, e);
                false
            }
        }
    }

    /// Rename by id. Re-fetches before mutating so a stale in-memory
    /// reference cannot clobber newer state.
    pub fn rename_folder(&self, id: &str, new_name: &str) -> Option<Folder> {
        let mut folder = match self.storage.fetch_folder(id) {
            Ok(Some(folder)) => folder,
            Ok(None) => {
                eprintln!("[FolderStore] Rename target {} not found", id);
                return None;
            }
            Err(e) => {
                eprintln!("[FolderStore] Failed to fetch folder {}: {}", id, e);
                return None;
            }
        };

        folder.name = new_name.to_string();
        if let Err(e) = self.storage.update_folder(&folder) {
            eprintln!("[FolderStore] Failed to rename folder: {}", e);
            return None;
        }
        Some(folder)
    }

    pub fn find_folder(&self, id: &str) -> Option<Folder> {
        match self.storage.fetch_folder(id) {
            Ok(folder) => folder,
            Err(e) => {
                eprintln!("[FolderStore] Failed to fetch folder {}: {}", id, e);
                None
            }
        }
    }

    pub fn list_folders(&self) -> Vec<Folder> {
        self.storage.list_folders().unwrap_or_else(|e| {
            eprintln!("[FolderStore] Failed to list folders: {}", e);
            Vec::new()
        })
    }

    /// First-run bootstrap: create the default folder when none exist.
    /// Returns the folder to select.
    pub fn bootstrap_default_folder(&self, name: &str) -> Option<Folder> {
        if !self.list_folders().is_empty() {
            return None;
        }
        println!("[FolderStore] No folders found, creating \"{}\"", name);
        self.create_folder(name)
    }
}

/// Short stable digest of an image payload for log lines
fn fingerprint(bytes: &[u8]) -> String {
    let head = &bytes[..bytes.len().min(8)];
    hex::encode(head)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores() -> (ClipStore, FolderStore) {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        (ClipStore::new(Arc::clone(&storage)), FolderStore::new(storage))
    }

    #[test]
    fn test_create_clip_requires_folder() {
        let (clips, folders) = stores();
        assert!(clips.create_clip(None, Some("hello".to_string()), None).is_none());

        let folder = folders.create_folder("work").expect("folder");
        let clip = clips
            .create_clip(Some(&folder), Some("hello".to_string()), None)
            .expect("clip");
        assert_eq!(clip.text.as_deref(), Some("hello"));
        assert_eq!(clips.clips_for_folder(&folder.id).len(), 1);
    }

    #[test]
    fn test_empty_text_is_allowed() {
        let (clips, folders) = stores();
        let folder = folders.create_folder("work").expect("folder");
        let clip = clips
            .create_clip(Some(&folder), Some(String::new()), None)
            .expect("clip");
        assert_eq!(clip.text.as_deref(), Some(""));
    }

    #[test]
    fn test_clip_without_payload_is_dropped() {
        let (clips, folders) = stores();
        let folder = folders.create_folder("work").expect("folder");

        assert!(clips.create_clip(Some(&folder), None, None).is_none());
        assert!(clips.clips_for_folder(&folder.id).is_empty());
    }

    #[test]
    fn test_image_dedup_within_one_folder() {
        let (clips, folders) = stores();
        let folder = folders.create_folder("shots").expect("folder");

        assert!(clips.create_image_clip(Some(&folder), vec![1, 2, 3]).is_some());
        assert!(clips.create_image_clip(Some(&folder), vec![1, 2, 3]).is_none());
        assert_eq!(clips.clips_for_folder(&folder.id).len(), 1);
    }

    #[test]
    fn test_image_dedup_is_folder_scoped() {
        let (clips, folders) = stores();
        let first = folders.create_folder("one").expect("folder");
        let second = folders.create_folder("two").expect("folder");

        assert!(clips.create_image_clip(Some(&first), vec![9, 9]).is_some());
        assert!(clips.create_image_clip(Some(&second), vec![9, 9]).is_some());
        assert_eq!(clips.clips_for_folder(&first.id).len(), 1);
        assert_eq!(clips.clips_for_folder(&second.id).len(), 1);
    }

    #[test]
    fn test_different_images_both_stored() {
        let (clips, folders) = stores();
        let folder = folders.create_folder("shots").expect("folder");

        assert!(clips.create_image_clip(Some(&folder), vec![1]).is_some());
        assert!(clips.create_image_clip(Some(&folder), vec![2]).is_some());
        assert_eq!(clips.clips_for_folder(&folder.id).len(), 2);
    }

    #[test]
    fn test_cascade_delete_removes_all_clips() {
        let (clips, folders) = stores();
        let folder = folders.create_folder("gone").expect("folder");

        let mut ids = Vec::new();
        for i in 0..3 {
            let clip = clips
                .create_clip(Some(&folder), Some(format!("clip {}", i)), None)
                .expect("clip");
            ids.push(clip.id);
        }

        assert!(folders.delete_folder(&folder.id));
        assert!(folders.find_folder(&folder.id).is_none());
        for id in ids {
            assert!(clips.find_clip(&id).is_none());
        }
    }

    #[test]
    fn test_rename_refetches_by_id() {
        let (_, folders) = stores();
        let folder = folders.create_folder("old").expect("folder");

        // Rename twice through stale handles; the second rename must see
        // the stored state, not the first handle's copy
        folders.rename_folder(&folder.id, "newer").expect("rename");
        let renamed = folders.rename_folder(&folder.id, "newest").expect("rename");
        assert_eq!(renamed.name, "newest");
        assert_eq!(folders.find_folder(&folder.id).expect("fetch").name, "newest");
    }

    #[test]
    fn test_rename_missing_folder_is_noop() {
        let (_, folders) = stores();
        assert!(folders.rename_folder("missing", "name").is_none());
    }

    #[test]
    fn test_bootstrap_only_when_empty() {
        let (_, folders) = stores();

        let bootstrapped = folders.bootstrap_default_folder("UnTitled").expect("folder");
        assert_eq!(bootstrapped.name, "UnTitled");
        assert_eq!(folders.list_folders().len(), 1);

        // Second bootstrap is a no-op
        assert!(folders.bootstrap_default_folder("UnTitled").is_none());
        assert_eq!(folders.list_folders().len(), 1);
    }

    #[test]
    fn test_find_clip_absent() {
        let (clips, _) = stores();
        assert!(clips.find_clip("nope").is_none());
    }
}
