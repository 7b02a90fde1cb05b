use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::message::ConversationHistory;

/// Persistence seam for the single history blob. `load` never fails: missing
/// or unparsable data comes back as an empty history.
pub trait HistoryStore: Send {
    fn load(&self) -> ConversationHistory;
    fn save(&self, history: &ConversationHistory) -> Result<()>;
    fn clear(&self) -> Result<()>;
}

/// History persisted as one JSON array in a single file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new() -> Self {
        Self {
            path: Self::default_path(),
        }
    }

    /// Store backed by a custom file (useful for testing).
    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn default_path() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gdchat")
            .join("history.json")
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Default for JsonFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl HistoryStore for JsonFileStore {
    fn load(&self) -> ConversationHistory {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return ConversationHistory::new(),
        };

        match serde_json::from_str(&contents) {
            Ok(history) => history,
            Err(e) => {
                tracing::warn!("stored history is unreadable, starting empty: {e}");
                ConversationHistory::new()
            }
        }
    }

    fn save(&self, history: &ConversationHistory) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string(history)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, &self.path)?;

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

/// In-memory store for tests and headless runs. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Option<ConversationHistory>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryStore for MemoryStore {
    fn load(&self) -> ConversationHistory {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_default()
    }

    fn save(&self, history: &ConversationHistory) -> Result<()> {
        let mut slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(history.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        *slot = None;
        Ok(())
    }
}
