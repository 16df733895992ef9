//! Persisted key-value storage and the language preference on top of it.
//!
//! Both the language preference and the translation cache live in a
//! [`KeyValueStore`]. Store failures are never fatal: callers log them and
//! keep running on in-memory state.

use crate::error::StoreError;
use crate::i18n::Language;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Store key under which the active language code is saved.
pub const LANGUAGE_KEY: &str = "app_language";

/// Minimal string key-value persistence.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// Volatile store, used for tests and when no file path is configured.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// All keys in a single JSON object file.
///
/// Every `set` rewrites the file through a temporary sibling and a rename,
/// so a crash mid-write leaves the previous contents intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>, StoreError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };

        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| {
            StoreError::Corrupt(format!("{} is not a JSON object: {}", self.path.display(), e))
        })
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut values = self.read_all()?;
        values.insert(key.to_string(), value.to_string());
        let serialized = serde_json::to_string_pretty(&values)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("json.tmp");
        std::fs::write(&tmp_path, serialized)?;
        std::fs::rename(&tmp_path, &self.path)?;

        debug!("Persisted '{}' to {}", key, self.path.display());
        Ok(())
    }
}

/// Load/save lifecycle of the active language.
#[derive(Clone)]
pub struct LanguageStore {
    store: Arc<dyn KeyValueStore>,
    default_language: Language,
}

impl LanguageStore {
    pub fn new(store: Arc<dyn KeyValueStore>, default_language: Language) -> Self {
        Self {
            store,
            default_language,
        }
    }

    /// The persisted language, or the default when nothing usable is stored.
    ///
    /// Read failures, unknown codes and disabled languages all degrade to the
    /// default.
    pub fn load(&self) -> Language {
        match self.store.get(LANGUAGE_KEY) {
            Ok(Some(code)) => match Language::from_code(code.trim()) {
                Ok(language) => language,
                Err(e) => {
                    warn!(
                        "Ignoring persisted language: {}. Using '{}'",
                        e, self.default_language
                    );
                    self.default_language
                }
            },
            Ok(None) => self.default_language,
            Err(e) => {
                warn!(
                    "Failed to read persisted language, using '{}': {}",
                    self.default_language, e
                );
                self.default_language
            }
        }
    }

    /// Persist `language`. Best-effort: failures are logged and returned for
    /// callers that care, but the in-memory state stays authoritative.
    pub fn save(&self, language: Language) -> Result<(), StoreError> {
        self.store.set(LANGUAGE_KEY, language.code()).map_err(|e| {
            warn!("Failed to persist language '{}': {}", language, e);
            e
        })
    }
}
