use crate::error::ProbeError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

pub const HISTORY_KEY: &str = "promptHistory";

/// String key-value persistence, the same surface a browser's localStorage offers.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, ProbeError>;
    fn set(&self, key: &str, value: &str) -> Result<(), ProbeError>;
    fn remove(&self, key: &str) -> Result<(), ProbeError>;
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, ProbeError> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ProbeError> {
        lock(&self.entries)?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), ProbeError> {
        lock(&self.entries)?.remove(key);
        Ok(())
    }
}

/// Stores every key as a string field of one JSON object on disk.
/// A missing file reads as an empty store.
pub struct FileStore {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    fn load(&self) -> Result<Map<String, Value>, ProbeError> {
        if !self.path.exists() {
            return Ok(Map::new());
        }
        let text = fs::read_to_string(&self.path)?;
        if text.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str::<Value>(&text)? {
            Value::Object(map) => Ok(map),
            _ => Err(ProbeError::Storage(format!(
                "{} does not contain a JSON object",
                self.path.display()
            ))),
        }
    }

    fn persist(&self, map: &Map<String, Value>) -> Result<(), ProbeError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(map)?)?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, ProbeError> {
        let _held = lock(&self.guard)?;
        Ok(self.load()?.get(key).and_then(|v| v.as_str()).map(str::to_string))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), ProbeError> {
        let _held = lock(&self.guard)?;
        let mut map = self.load()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.persist(&map)
    }

    fn remove(&self, key: &str) -> Result<(), ProbeError> {
        let _held = lock(&self.guard)?;
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.persist(&map)?;
        }
        Ok(())
    }
}

fn lock<T>(m: &Mutex<T>) -> Result<std::sync::MutexGuard<'_, T>, ProbeError> {
    m.lock().map_err(|_| ProbeError::Storage("store lock poisoned".into()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPrompt {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub model_id: String,
    pub model_name: String,
    pub original_input: String,
    pub optimized_prompt: String,
}

impl SavedPrompt {
    pub fn new(
        model_id: impl Into<String>,
        model_name: impl Into<String>,
        original_input: impl Into<String>,
        optimized_prompt: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            model_id: model_id.into(),
            model_name: model_name.into(),
            original_input: original_input.into(),
            optimized_prompt: optimized_prompt.into(),
        }
    }
}

/// Newest-first list of saved prompts kept under [`HISTORY_KEY`].
#[derive(Clone)]
pub struct PromptHistory {
    store: Arc<dyn KeyValueStore>,
    limit: usize,
}

impl PromptHistory {
    pub fn new(store: Arc<dyn KeyValueStore>, limit: usize) -> Self {
        Self { store, limit: limit.max(1) }
    }

    pub fn list(&self) -> Result<Vec<SavedPrompt>, ProbeError> {
        match self.store.get(HISTORY_KEY)? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn save(&self, record: &SavedPrompt) -> Result<(), ProbeError> {
        let mut items = self.list()?;
        items.insert(0, record.clone());
        items.truncate(self.limit);
        self.write(&items)
    }

    /// Removes every record with `id`; returns whether anything matched.
    pub fn delete(&self, id: &str) -> Result<bool, ProbeError> {
        let mut items = self.list()?;
        let before = items.len();
        items.retain(|p| p.id != id);
        if items.len() == before {
            return Ok(false);
        }
        self.replace(&items)?;
        Ok(true)
    }

    /// Overwrites the whole history, e.g. to put back a snapshot taken earlier.
    pub fn replace(&self, items: &[SavedPrompt]) -> Result<(), ProbeError> {
        if items.is_empty() {
            return self.store.remove(HISTORY_KEY);
        }
        let end = items.len().min(self.limit);
        self.write(&items[..end])
    }

    fn write(&self, items: &[SavedPrompt]) -> Result<(), ProbeError> {
        self.store.set(HISTORY_KEY, &serde_json::to_string(items)?)
    }
}
