//! Redb-based storage implementation
//!
//! Records are CBOR-encoded (image payloads stay binary). Cascade delete is
//! an explicit two-step remove inside a single write transaction, so a crash
//! mid-delete never leaves orphaned clips.

use std::path::Path;
use std::sync::Mutex;

use redb::{Database, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::Storage;
use crate::shared::errors::{CommandError, CommandResult};
use crate::shared::types::{Clip, Folder};

/// Key: folder id, Value: CBOR-encoded Folder
const FOLDER_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("folders");
/// Key: clip id, Value: CBOR-encoded Clip
const CLIP_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("clips");

fn encode<T: Serialize>(value: &T) -> CommandResult<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf)
        .map_err(|e| CommandError::InvalidInput(format!("CBOR encode error: {}", e)))?;
    Ok(buf)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> CommandResult<T> {
    ciborium::from_reader(bytes)
        .map_err(|e| CommandError::InvalidInput(format!("CBOR decode error: {}", e)))
}

pub struct RedbStorage {
    db: Mutex<Database>,
}

impl RedbStorage {
    pub fn new(path: &Path) -> CommandResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CommandError::SystemIO(format!("Failed to create data directory: {}", e)))?;
        }

        let db = Database::create(path)
            .map_err(|e| CommandError::SystemIO(format!("Failed to create database: {}", e)))?;

        // Initialize tables
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| CommandError::SystemIO(format!("Failed to begin write transaction: {}", e)))?;
            {
                let _ = write_txn
                    .open_table(FOLDER_TABLE)
                    .map_err(|e| CommandError::SystemIO(format!("Failed to open folder table: {}", e)))?;
                let _ = write_txn
                    .open_table(CLIP_TABLE)
                    .map_err(|e| CommandError::SystemIO(format!("Failed to open clip table: {}", e)))?;
            }
            write_txn
                .commit()
                .map_err(|e| CommandError::SystemIO(format!("Failed to commit transaction: {}", e)))?;
        }

        Ok(Self { db: Mutex::new(db) })
    }

    fn lock(&self) -> CommandResult<std::sync::MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| CommandError::SystemIO(format!("Mutex poisoned: {}", e)))
    }

    fn put(&self, table: TableDefinition<&str, &[u8]>, key: &str, value: &[u8]) -> CommandResult<()> {
        let db = self.lock()?;
        let write_txn = db
            .begin_write()
            .map_err(|e| CommandError::SystemIO(format!("Failed to begin write: {}", e)))?;
        {
            let mut t = write_txn
                .open_table(table)
                .map_err(|e| CommandError::SystemIO(format!("Failed to open table: {}", e)))?;
            t.insert(key, value)
                .map_err(|e| CommandError::SystemIO(format!("Failed to insert: {}", e)))?;
        }
        write_txn
            .commit()
            .map_err(|e| CommandError::SystemIO(format!("Failed to commit: {}", e)))?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(
        &self,
        table: TableDefinition<&str, &[u8]>,
        key: &str,
    ) -> CommandResult<Option<T>> {
        let db = self.lock()?;
        let read_txn = db
            .begin_read()
            .map_err(|e| CommandError::SystemIO(format!("Failed to begin read: {}", e)))?;
        let t = read_txn
            .open_table(table)
            .map_err(|e| CommandError::SystemIO(format!("Failed to open table: {}", e)))?;

        match t
            .get(key)
            .map_err(|e| CommandError::SystemIO(format!("Failed to read: {}", e)))?
        {
            Some(guard) => Ok(Some(decode(guard.value())?)),
            None => Ok(None),
        }
    }
}

impl Storage for RedbStorage {
    fn insert_folder(&self, folder: &Folder) -> CommandResult<()> {
        self.put(FOLDER_TABLE, &folder.id, &encode(folder)?)
    }

    fn update_folder(&self, folder: &Folder) -> CommandResult<()> {
        self.put(FOLDER_TABLE, &folder.id, &encode(folder)?)
    }

    fn fetch_folder(&self, id: &str) -> CommandResult<Option<Folder>> {
        self.get(FOLDER_TABLE, id)
    }

    fn list_folders(&self) -> CommandResult<Vec<Folder>> {
        let db = self.lock()?;
        let read_txn = db
            .begin_read()
            .map_err(|e| CommandError::SystemIO(format!("Failed to begin read: {}", e)))?;
        let t = read_txn
            .open_table(FOLDER_TABLE)
            .map_err(|e| CommandError::SystemIO(format!("Failed to open table: {}", e)))?;

        let mut folders = Vec::new();
        let iter = t
            .iter()
            .map_err(|e| CommandError::SystemIO(format!("Failed to create iterator: {}", e)))?;
        for entry in iter {
            let (_, value) = entry
                .map_err(|e| CommandError::SystemIO(format!("Failed to read entry: {}", e)))?;
            folders.push(decode::<Folder>(value.value())?);
        }

        folders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(folders)
    }

    fn delete_folder_cascade(&self, id: &str) -> CommandResult<usize> {
        let db = self.lock()?;
        let write_txn = db
            .begin_write()
            .map_err(|e| CommandError::SystemIO(format!("Failed to begin write: {}", e)))?;

        let removed;
        {
            let mut clips = write_txn
                .open_table(CLIP_TABLE)
                .map_err(|e| CommandError::SystemIO(format!("Failed to open clip table: {}", e)))?;

            // Children first, then the folder itself, all in this transaction
            let mut doomed = Vec::new();
            {
                let iter = clips
                    .iter()
                    .map_err(|e| CommandError::SystemIO(format!("Failed to iterate clips: {}", e)))?;
                for entry in iter {
                    let (key, value) = entry
                        .map_err(|e| CommandError::SystemIO(format!("Failed to read entry: {}", e)))?;
                    let clip: Clip = decode(value.value())?;
                    if clip.folder_id == id {
                        doomed.push(key.value().to_string());
                    }
                }
            }

            for key in &doomed {
                clips
                    .remove(key.as_str())
                    .map_err(|e| CommandError::SystemIO(format!("Failed to remove clip: {}", e)))?;
            }
            removed = doomed.len();

            let mut folders = write_txn
                .open_table(FOLDER_TABLE)
                .map_err(|e| CommandError::SystemIO(format!("Failed to open folder table: {}", e)))?;
            folders
                .remove(id)
                .map_err(|e| CommandError::SystemIO(format!("Failed to remove folder: {}", e)))?;
        }

        write_txn
            .commit()
            .map_err(|e| CommandError::SystemIO(format!("Failed to commit: {}", e)))?;
        Ok(removed)
    }

    fn insert_clip(&self, clip: &Clip) -> CommandResult<()> {
        self.put(CLIP_TABLE, &clip.id, &encode(clip)?)
    }

    fn fetch_clip(&self, id: &str) -> CommandResult<Option<Clip>> {
        self.get(CLIP_TABLE, id)
    }

    fn clips_for_folder(&self, folder_id: &str) -> CommandResult<Vec<Clip>> {
        let db = self.lock()?;
        let read_txn = db
            .begin_read()
            .map_err(|e| CommandError::SystemIO(format!("Failed to begin read: {}", e)))?;
        let t = read_txn
            .open_table(CLIP_TABLE)
            .map_err(|e| CommandError::SystemIO(format!("Failed to open table: {}", e)))?;

        let mut clips = Vec::new();
        let iter = t
            .iter()
            .map_err(|e| CommandError::SystemIO(format!("Failed to create iterator: {}", e)))?;
        for entry in iter {
            let (_, value) = entry
                .map_err(|e| CommandError::SystemIO(format!("Failed to read entry: {}", e)))?;
            let clip: Clip = decode(value.value())?;
            if clip.folder_id == folder_id {
                clips.push(clip);
            }
        }
        Ok(clips)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> (RedbStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = RedbStorage::new(&dir.path().join("test.redb")).expect("storage");
        (storage, dir)
    }

    #[test]
    fn test_folder_roundtrip() {
        let (storage, _dir) = temp_storage();
        let folder = Folder::new("work");

        storage.insert_folder(&folder).expect("insert");
        let fetched = storage.fetch_folder(&folder.id).expect("fetch").expect("some");
        assert_eq!(fetched, folder);
    }

    #[test]
    fn test_clip_image_bytes_survive_roundtrip() {
        let (storage, _dir) = temp_storage();
        let folder = Folder::new("shots");
        storage.insert_folder(&folder).expect("insert");

        let clip = Clip::new_image(&folder.id, vec![0u8, 1, 254, 255]);
        storage.insert_clip(&clip).expect("insert");

        let fetched = storage.fetch_clip(&clip.id).expect("fetch").expect("some");
        assert_eq!(fetched.image.as_deref(), Some(&[0u8, 1, 254, 255][..]));
        assert_eq!(fetched.created_at, clip.created_at);
    }

    #[test]
    fn test_cascade_delete_in_one_transaction() {
        let (storage, _dir) = temp_storage();
        let keep = Folder::new("keep");
        let drop = Folder::new("drop");
        storage.insert_folder(&keep).expect("insert");
        storage.insert_folder(&drop).expect("insert");

        let kept_clip = Clip::new_text(&keep.id, "stay".to_string());
        storage.insert_clip(&kept_clip).expect("insert");
        for i in 0..3 {
            let clip = Clip::new_text(&drop.id, format!("clip {}", i));
            storage.insert_clip(&clip).expect("insert");
        }

        let removed = storage.delete_folder_cascade(&drop.id).expect("cascade");
        assert_eq!(removed, 3);
        assert!(storage.fetch_folder(&drop.id).expect("fetch").is_none());
        assert!(storage.clips_for_folder(&drop.id).expect("list").is_empty());

        // Unrelated folder untouched
        assert_eq!(storage.clips_for_folder(&keep.id).expect("list").len(), 1);
    }

    #[test]
    fn test_list_folders_sorted_by_creation() {
        let (storage, _dir) = temp_storage();
        let mut first = Folder::new("first");
        let mut second = Folder::new("second");
        first.created_at = chrono::Utc::now() - chrono::Duration::seconds(10);
        second.created_at = chrono::Utc::now();

        storage.insert_folder(&second).expect("insert");
        storage.insert_folder(&first).expect("insert");

        let names: Vec<String> = storage
            .list_folders()
            .expect("list")
            .into_iter()
            .map(|f| f.name)
            .collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
