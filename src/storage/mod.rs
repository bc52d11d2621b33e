//! Durable homes for the session list.
//!
//! The store only needs "load the whole list" and "save the whole list"
//! under one key, so any key-value backend can stand in for the browser's
//! local storage.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::{db::Database, models::TeaSession};

/// Storage key the session list lives under.
pub const SESSIONS_KEY: &str = "tea-sessions";

#[async_trait]
pub trait SessionStorage: Send + Sync {
    /// The persisted list, or an empty list when nothing was saved yet.
    async fn load(&self) -> Result<Vec<TeaSession>>;

    async fn save(&self, sessions: &[TeaSession]) -> Result<()>;
}

fn decode(raw: &str) -> Result<Vec<TeaSession>> {
    serde_json::from_str(raw).context("stored session list is not valid JSON")
}

/// One JSON file per key inside a directory.
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    pub fn new(dir: impl AsRef<Path>, key: &str) -> Self {
        Self {
            path: dir.as_ref().join(format!("{key}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SessionStorage for JsonFileStorage {
    async fn load(&self) -> Result<Vec<TeaSession>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read sessions from {}", self.path.display()))?;
        decode(&contents)
    }

    async fn save(&self, sessions: &[TeaSession]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let serialized = serde_json::to_string_pretty(sessions)?;
        // Readers only ever see a complete file.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serialized)
            .with_context(|| format!("Failed to write sessions to {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))
    }
}

/// Session list stored as a JSON value in the SQLite key-value table.
pub struct SqliteStorage {
    db: Database,
    key: String,
}

impl SqliteStorage {
    pub fn new(db: Database, key: impl Into<String>) -> Self {
        Self {
            db,
            key: key.into(),
        }
    }
}

#[async_trait]
impl SessionStorage for SqliteStorage {
    async fn load(&self) -> Result<Vec<TeaSession>> {
        match self.db.get_value(&self.key).await? {
            Some(raw) => decode(&raw),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, sessions: &[TeaSession]) -> Result<()> {
        let serialized = serde_json::to_string(sessions)?;
        self.db.put_value(&self.key, serialized).await
    }
}

/// Keeps the serialized list in memory. Round-trips through JSON exactly
/// like the durable backends, so tests see the same timestamp handling.
#[derive(Default)]
pub struct MemoryStorage {
    raw: Mutex<Option<String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds the stored value, e.g. with a corrupt payload.
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    pub fn raw(&self) -> Option<String> {
        match self.raw.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl SessionStorage for MemoryStorage {
    async fn load(&self) -> Result<Vec<TeaSession>> {
        match self.raw() {
            Some(raw) => decode(&raw),
            None => Ok(Vec::new()),
        }
    }

    async fn save(&self, sessions: &[TeaSession]) -> Result<()> {
        let serialized = serde_json::to_string(sessions)?;
        let mut guard = match self.raw.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(serialized);
        Ok(())
    }
}
