//! Persistence Adapter - key-value storage of the serialized document
//!
//! Persistence is best-effort. Load never fails (it falls back to a fresh
//! document) and save reports failure as `false` after logging it.

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::document::{has_document_shape, CvDocument};
use crate::ids::IdGenerator;
use crate::reducer::Entry;

pub const DEFAULT_STORAGE_KEY: &str = "cv-builder-data";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("Not a CV document: missing personal object or experience list")]
    InvalidShape,

    #[error("Malformed CV document: {0}")]
    InvalidDocument(#[source] serde_json::Error),
}

/// A named-slot string store, the durable home of the serialized document.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-process store. Optionally capped to simulate a storage quota.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slots: Mutex<HashMap<String, String>>,
    quota_bytes: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(quota_bytes: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            quota_bytes: Some(quota_bytes),
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.slots
            .lock()
            .map_err(|_| StorageError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if let Some(quota) = self.quota_bytes {
            if value.len() > quota {
                return Err(StorageError::Unavailable(format!(
                    "quota exceeded: {} bytes > {} bytes",
                    value.len(),
                    quota
                )));
            }
        }
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}

/// One `<key>.json` file per slot inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn slot_path(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.slot_path(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.slot_path(key);
        // Write-then-rename so a crash never leaves a half-written slot.
        let tmp = path.with_extension("json.tmp");
        {
            let mut file = fs::File::create(&tmp)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.slot_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// How the document returned by [`load_document`] came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The stored document was read back.
    Restored,
    /// Nothing was stored; a fresh document was created.
    Fresh,
    /// The slot was unreadable or corrupt; a fresh document replaced it.
    Recovered,
}

/// Parses document JSON, applying the minimal shape check before full decoding.
pub fn parse_document(text: &str) -> Result<CvDocument, ImportError> {
    let value: Value = serde_json::from_str(text).map_err(ImportError::InvalidJson)?;
    if !has_document_shape(&value) {
        return Err(ImportError::InvalidShape);
    }
    serde_json::from_value(value).map_err(ImportError::InvalidDocument)
}

fn fill_ids<T: Entry>(entries: &mut [T], ids: &dyn IdGenerator) -> usize {
    let mut filled = 0;
    for entry in entries.iter_mut().filter(|e| e.entry_id().trim().is_empty()) {
        *entry.entry_id_mut() = ids.next_id();
        filled += 1;
    }
    filled
}

/// Gives a decoded document everything older data may lack: a document id,
/// entry ids and timestamps. Returns how many identifiers were generated.
pub fn backfill_document(doc: &mut CvDocument, ids: &dyn IdGenerator, now: DateTime<Utc>) -> usize {
    let mut filled = 0;
    if doc.id.trim().is_empty() {
        doc.id = ids.next_id();
        filled += 1;
    }
    filled += fill_ids(&mut doc.experience, ids);
    filled += fill_ids(&mut doc.education, ids);
    filled += fill_ids(&mut doc.skills, ids);
    filled += fill_ids(&mut doc.projects, ids);
    filled += fill_ids(&mut doc.languages, ids);
    filled += fill_ids(&mut doc.certifications, ids);
    filled += fill_ids(&mut doc.references, ids);

    let missing = DateTime::<Utc>::default();
    match (doc.created_at == missing, doc.updated_at == missing) {
        (true, true) => {
            doc.created_at = now;
            doc.updated_at = now;
        }
        (true, false) => doc.created_at = doc.updated_at,
        (false, true) => doc.updated_at = doc.created_at,
        (false, false) => {}
    }
    filled
}

/// Parses stored or uploaded JSON and backfills whatever it is missing.
pub fn restore_document(
    text: &str,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
) -> Result<CvDocument, ImportError> {
    let mut doc = parse_document(text)?;
    let filled = backfill_document(&mut doc, ids, now);
    if filled > 0 {
        debug!("Generated {filled} missing identifiers for CV {}", doc.id);
    }
    Ok(doc)
}

pub fn load_document(
    store: &dyn KeyValueStore,
    key: &str,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
) -> (CvDocument, LoadOutcome) {
    let raw = match store.get(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            debug!("No stored CV under '{key}', starting fresh");
            return (CvDocument::new(ids.next_id(), now), LoadOutcome::Fresh);
        }
        Err(e) => {
            error!("Failed to read CV from storage slot '{key}': {e}");
            return (CvDocument::new(ids.next_id(), now), LoadOutcome::Recovered);
        }
    };

    match restore_document(&raw, ids, now) {
        Ok(doc) => {
            debug!("Restored CV {} from '{key}'", doc.id);
            (doc, LoadOutcome::Restored)
        }
        Err(e) => {
            warn!("Discarding corrupt CV data in '{key}': {e}");
            (CvDocument::new(ids.next_id(), now), LoadOutcome::Recovered)
        }
    }
}

/// Serializes and writes the document. Returns whether the write landed.
pub fn save_document(store: &dyn KeyValueStore, key: &str, doc: &CvDocument) -> bool {
    let json = match serde_json::to_string(doc) {
        Ok(json) => json,
        Err(e) => {
            error!("Failed to serialize CV {}: {e}", doc.id);
            return false;
        }
    };

    match store.set(key, &json) {
        Ok(()) => {
            debug!("Saved CV {} ({} bytes) to '{key}'", doc.id, json.len());
            true
        }
        Err(e) => {
            error!("Failed to save CV {} to '{key}': {e}", doc.id);
            false
        }
    }
}

/// Pretty JSON for the downloadable `.json` export.
pub fn export_json(doc: &CvDocument) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(doc)
}

/// Re-hydrates an uploaded `.json` export.
pub fn import_json(
    text: &str,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
) -> Result<CvDocument, ImportError> {
    restore_document(text, ids, now)
}

/// `john-doe-cv.json`, or `cv.json` when no name is set.
pub fn export_file_name(doc: &CvDocument) -> String {
    let slug: String = doc
        .full_name()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() {
        "cv.json".to_string()
    } else {
        format!("{}-cv.json", slug)
    }
}
