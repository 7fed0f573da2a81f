//! Session persistence.
//!
//! Stores the authenticated session record in `${NATURECRIB_HOME}/session.json`
//! with restricted permissions (0600). The store is the app-wide source of
//! truth for "is a user logged in": the durable copy and an in-memory mirror
//! are updated together, and a failed write changes neither.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::paths;

/// Fixed storage key for the session record.
pub const SESSION_KEY: &str = "natureCribCredentials";

/// The authenticated principal's attribute record, as returned by the
/// remote service. Schema-agnostic: the exact field set is controlled by
/// the server.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Session(pub serde_json::Map<String, serde_json::Value>);

impl Session {
    /// Returns the value for an identity field, if present.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    /// Iterates over the identity fields.
    pub fn fields(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }
}

/// Durable key-value storage for serialized records.
///
/// Injectable so tests can force write failures; the file-backed
/// implementation is the production one.
pub trait Storage {
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    /// Removes a key, reporting whether it existed.
    fn remove_item(&self, key: &str) -> Result<bool>;
}

/// File-backed storage: a JSON key-to-value map written with restricted
/// permissions. Writes go through a sibling temp file and a rename, so a
/// failed write leaves the previous contents untouched.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// File-backed storage at the default session path.
    pub fn at_default_path() -> Self {
        Self::new(paths::session_path())
    }

    fn load_map(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read session store from {}", self.path.display()))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session store from {}", self.path.display()))
    }

    fn save_map(&self, map: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(map).context("Failed to serialize session store")?;

        let tmp_path = self.path.with_extension("json.tmp");

        // Write with restricted permissions
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        #[cfg(not(unix))]
        {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&tmp_path)
                .with_context(|| format!("Failed to open {} for writing", tmp_path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", tmp_path.display()))?;
        }

        fs::rename(&tmp_path, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))
    }
}

impl Storage for FileStorage {
    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut map = self.load_map()?;
        map.insert(key.to_string(), value.to_string());
        self.save_map(&map)
    }

    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load_map()?.get(key).cloned())
    }

    fn remove_item(&self, key: &str) -> Result<bool> {
        let mut map = self.load_map()?;
        let existed = map.remove(key).is_some();
        if existed {
            self.save_map(&map)?;
        }
        Ok(existed)
    }
}

/// The active session, mirrored in memory and persisted durably.
pub struct SessionStore {
    storage: Box<dyn Storage + Send + Sync>,
    current: Option<Session>,
}

impl SessionStore {
    /// Opens the store at the default session path, loading any persisted
    /// session into the in-memory mirror.
    pub fn open() -> Result<Self> {
        Self::with_storage(Box::new(FileStorage::at_default_path()))
    }

    /// Opens the store over a specific storage backend.
    pub fn with_storage(storage: Box<dyn Storage + Send + Sync>) -> Result<Self> {
        let current = match storage.get_item(SESSION_KEY)? {
            Some(raw) => Some(
                serde_json::from_str(&raw).context("Failed to parse persisted session record")?,
            ),
            None => None,
        };

        Ok(Self { storage, current })
    }

    /// Persists a session durably and updates the in-memory mirror.
    ///
    /// On failure neither the durable copy nor the mirror changes; the
    /// previously stored session (if any) remains active.
    pub fn persist(&mut self, session: &Session) -> Result<()> {
        let raw = serde_json::to_string(session).context("Failed to serialize session record")?;
        self.storage.set_item(SESSION_KEY, &raw)?;
        self.current = Some(session.clone());
        Ok(())
    }

    /// Returns the currently active session, if any.
    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    /// Destroys the stored session (logout), reporting whether one existed.
    pub fn clear(&mut self) -> Result<bool> {
        let existed = self.storage.remove_item(SESSION_KEY)?;
        self.current = None;
        Ok(existed)
    }
}
