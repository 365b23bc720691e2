//! # Record Stores
//!
//! Storage backends holding encoded records as opaque bytes. Stores know
//! nothing about grids or meshes; `ChunkCache` does the encoding.
//!
//! - `MemoryStore`: a locked map, for tests and short-lived sessions.
//! - `FileStore`: one file per record in a directory. Writes go through a
//!   temp file and `rename`, so readers see either the old or the new file.
//!
//! Both enforce an optional byte quota over the encoded sizes.

use std::collections::HashMap;
use std::fs;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use parking_lot::{Mutex, RwLock};
use tempfile::NamedTempFile;

use crate::codec;
use crate::error::{CacheError, CacheResult};
use crate::key::ChunkKey;

/// Encoded record plus the metadata stores index by.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    /// Write time in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Encoded record.
    pub bytes: Vec<u8>,
}

/// What `query` predicates see for each entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryMeta {
    /// Entry key.
    pub key: ChunkKey,
    /// Write time in milliseconds since the Unix epoch.
    pub timestamp: u64,
    /// Encoded size in bytes.
    pub size: u64,
}

/// Key-value storage for encoded records.
pub trait RecordStore: Send + Sync {
    /// Returns the entry stored under `key`.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn get(&self, key: &ChunkKey) -> CacheResult<Option<StoredEntry>>;

    /// Inserts or replaces the entry under `key`.
    ///
    /// # Errors
    ///
    /// `QuotaExceeded` if the store would grow past its quota, or backend
    /// failures. The previous entry is kept on error.
    fn put(&self, key: &ChunkKey, entry: StoredEntry) -> CacheResult<()>;

    /// Removes the entry under `key`. Returns false if there was none.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn delete(&self, key: &ChunkKey) -> CacheResult<bool>;

    /// Removes the entry under `key` if it still matches `predicate` when the
    /// removal happens. Returns false if there was no entry or it no longer
    /// matches.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn delete_if(&self, key: &ChunkKey, predicate: &dyn Fn(&EntryMeta) -> bool) -> CacheResult<bool>;

    /// Metadata of every entry matching `predicate`.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn query(&self, predicate: &dyn Fn(&EntryMeta) -> bool) -> CacheResult<Vec<EntryMeta>>;

    /// Removes every entry.
    ///
    /// # Errors
    ///
    /// Backend failures.
    fn clear(&self) -> CacheResult<()>;
}

fn check_quota(quota: Option<u64>, needed: u64) -> CacheResult<()> {
    match quota {
        Some(limit) if needed > limit => Err(CacheError::QuotaExceeded { needed, limit }),
        _ => Ok(()),
    }
}

// ============================================================================
// MEMORY STORE
// ============================================================================

#[derive(Default)]
struct MemoryState {
    entries: HashMap<ChunkKey, StoredEntry>,
    used: u64,
}

/// In-memory store.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    quota: Option<u64>,
}

impl MemoryStore {
    /// Creates an unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding at most `quota` encoded bytes.
    #[must_use]
    pub fn with_quota(quota: u64) -> Self {
        Self {
            state: RwLock::default(),
            quota: Some(quota),
        }
    }

    /// Encoded bytes currently held.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        self.state.read().used
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Returns true if the store holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RecordStore for MemoryStore {
    fn get(&self, key: &ChunkKey) -> CacheResult<Option<StoredEntry>> {
        Ok(self.state.read().entries.get(key).cloned())
    }

    fn put(&self, key: &ChunkKey, entry: StoredEntry) -> CacheResult<()> {
        let mut state = self.state.write();
        let replaced = state.entries.get(key).map_or(0, |old| old.bytes.len() as u64);
        let needed = state.used - replaced + entry.bytes.len() as u64;
        check_quota(self.quota, needed)?;

        state.used = needed;
        state.entries.insert(key.clone(), entry);
        Ok(())
    }

    fn delete(&self, key: &ChunkKey) -> CacheResult<bool> {
        let mut state = self.state.write();
        match state.entries.remove(key) {
            Some(old) => {
                state.used -= old.bytes.len() as u64;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_if(&self, key: &ChunkKey, predicate: &dyn Fn(&EntryMeta) -> bool) -> CacheResult<bool> {
        let mut state = self.state.write();
        let Some(entry) = state.entries.get(key) else {
            return Ok(false);
        };
        let meta = EntryMeta {
            key: key.clone(),
            timestamp: entry.timestamp,
            size: entry.bytes.len() as u64,
        };
        if !predicate(&meta) {
            return Ok(false);
        }
        state.entries.remove(key);
        state.used -= meta.size;
        Ok(true)
    }

    fn query(&self, predicate: &dyn Fn(&EntryMeta) -> bool) -> CacheResult<Vec<EntryMeta>> {
        let state = self.state.read();
        Ok(state
            .entries
            .iter()
            .map(|(key, entry)| EntryMeta {
                key: key.clone(),
                timestamp: entry.timestamp,
                size: entry.bytes.len() as u64,
            })
            .filter(|meta| predicate(meta))
            .collect())
    }

    fn clear(&self) -> CacheResult<()> {
        let mut state = self.state.write();
        state.entries.clear();
        state.used = 0;
        Ok(())
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read();
        f.debug_struct("MemoryStore")
            .field("entries", &state.entries.len())
            .field("used", &state.used)
            .field("quota", &self.quota)
            .finish()
    }
}

// ============================================================================
// FILE STORE
// ============================================================================

/// Extension of record files.
const RECORD_EXTENSION: &str = "chunk";

/// One file per record, named by the hex-encoded key.
pub struct FileStore {
    dir: PathBuf,
    quota: Option<u64>,
    /// Encoded bytes on disk; writers hold the lock across the quota check.
    used: Mutex<u64>,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    ///
    /// # Errors
    ///
    /// `Io` if the directory cannot be created or listed.
    pub fn open(dir: impl AsRef<Path>) -> CacheResult<Self> {
        Self::open_with_quota(dir, None)
    }

    /// Opens a store that holds at most `quota` bytes when `Some`.
    ///
    /// # Errors
    ///
    /// `Io` if the directory cannot be created or listed.
    pub fn open_with_quota(dir: impl AsRef<Path>, quota: Option<u64>) -> CacheResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let mut used = 0;
        for (path, _) in Self::record_files(&dir)? {
            used += fs::metadata(&path)?.len();
        }
        tracing::debug!(dir = %dir.display(), used, "opened file store");

        Ok(Self {
            dir,
            quota,
            used: Mutex::new(used),
        })
    }

    /// Directory holding the record files.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Encoded bytes currently on disk.
    #[must_use]
    pub fn used_bytes(&self) -> u64 {
        *self.used.lock()
    }

    /// Path of the file for `key`.
    #[must_use]
    pub fn path_for(&self, key: &ChunkKey) -> PathBuf {
        self.dir.join(format!("{}.{RECORD_EXTENSION}", hex_encode(&key.to_string())))
    }

    /// Record files in `dir` with the key decoded from each name. Files
    /// with other extensions or undecodable names are skipped.
    fn record_files(dir: &Path) -> CacheResult<Vec<(PathBuf, ChunkKey)>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXTENSION) {
                continue;
            }
            let key = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(hex_decode)
                .and_then(|text| text.parse::<ChunkKey>().ok());
            match key {
                Some(key) => files.push((path, key)),
                None => tracing::warn!(path = %path.display(), "skipping unrecognized cache file"),
            }
        }
        Ok(files)
    }

    /// Metadata of the record file at `path`, or `None` if it is gone.
    /// Entries whose header cannot be read get timestamp 0 so pruning drops
    /// them.
    fn read_meta(path: &Path, key: ChunkKey) -> CacheResult<Option<EntryMeta>> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let size = file.metadata()?.len();
        let timestamp = match codec::read_header(&mut BufReader::new(file)) {
            Ok(header) => header.timestamp,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "unreadable cache header");
                0
            }
        };
        Ok(Some(EntryMeta { key, timestamp, size }))
    }

    fn file_size(path: &Path) -> CacheResult<u64> {
        match fs::metadata(path) {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(0),
            Err(e) => Err(e.into()),
        }
    }
}

impl RecordStore for FileStore {
    fn get(&self, key: &ChunkKey) -> CacheResult<Option<StoredEntry>> {
        let bytes = match fs::read(self.path_for(key)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let header = codec::read_header(&mut bytes.as_slice())?;
        Ok(Some(StoredEntry {
            timestamp: header.timestamp,
            bytes,
        }))
    }

    fn put(&self, key: &ChunkKey, entry: StoredEntry) -> CacheResult<()> {
        let path = self.path_for(key);
        let mut used = self.used.lock();

        let replaced = Self::file_size(&path)?;
        let needed = used.saturating_sub(replaced) + entry.bytes.len() as u64;
        check_quota(self.quota, needed)?;

        let mut file = NamedTempFile::new_in(&self.dir)?;
        file.write_all(&entry.bytes)?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| CacheError::Io(e.error))?;

        *used = needed;
        Ok(())
    }

    fn delete(&self, key: &ChunkKey) -> CacheResult<bool> {
        let path = self.path_for(key);
        let mut used = self.used.lock();
        let size = Self::file_size(&path)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                *used = used.saturating_sub(size);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn delete_if(&self, key: &ChunkKey, predicate: &dyn Fn(&EntryMeta) -> bool) -> CacheResult<bool> {
        let path = self.path_for(key);
        // Writers hold the same lock across their rename
        let mut used = self.used.lock();
        let Some(meta) = Self::read_meta(&path, key.clone())? else {
            return Ok(false);
        };
        if !predicate(&meta) {
            return Ok(false);
        }
        match fs::remove_file(&path) {
            Ok(()) => {
                *used = used.saturating_sub(meta.size);
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn query(&self, predicate: &dyn Fn(&EntryMeta) -> bool) -> CacheResult<Vec<EntryMeta>> {
        let mut matches = Vec::new();
        for (path, key) in Self::record_files(&self.dir)? {
            // Deleted since listing when None
            if let Some(meta) = Self::read_meta(&path, key)? {
                if predicate(&meta) {
                    matches.push(meta);
                }
            }
        }
        Ok(matches)
    }

    fn clear(&self) -> CacheResult<()> {
        let mut used = self.used.lock();
        for (path, _) in Self::record_files(&self.dir)? {
            match fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        *used = 0;
        Ok(())
    }
}

impl std::fmt::Debug for FileStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileStore")
            .field("dir", &self.dir)
            .field("quota", &self.quota)
            .field("used", &*self.used.lock())
            .finish()
    }
}

fn hex_encode(text: &str) -> String {
    use std::fmt::Write as _;
    text.bytes().fold(String::with_capacity(text.len() * 2), |mut out, b| {
        let _ = write!(out, "{b:02x}");
        out
    })
}

fn hex_decode(hex: &str) -> Option<String> {
    if hex.len() % 2 != 0 {
        return None;
    }
    let bytes = (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect::<Option<Vec<u8>>>()?;
    String::from_utf8(bytes).ok()
}
