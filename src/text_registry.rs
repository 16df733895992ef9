//! Per-session record of which strings are currently on screen.
//!
//! Every `t(key, fallback)` call registers `key -> fallback`. A language
//! change walks the registry to pre-translate what users can see.
//! Registration is last-write-wins and entries are never removed, so the
//! registry is bounded by the number of distinct keys in the app.

use crate::cache::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One registered string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredText {
    pub key: String,
    pub source_text: String,
    pub last_seen: DateTime<Utc>,
}

pub struct TextRegistry {
    entries: Mutex<HashMap<String, RegisteredText>>,
    clock: Arc<dyn Clock>,
}

impl TextRegistry {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock,
        }
    }

    /// Record `source_text` as the latest text rendered for `key`.
    ///
    /// Returns `true` when the key is new or its text changed, so callers
    /// can drop work derived from the previous text.
    pub fn register(&self, key: &str, source_text: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        match entries.get_mut(key) {
            Some(existing) => {
                existing.last_seen = now;
                if existing.source_text == source_text {
                    false
                } else {
                    existing.source_text = source_text.to_string();
                    true
                }
            }
            None => {
                entries.insert(
                    key.to_string(),
                    RegisteredText {
                        key: key.to_string(),
                        source_text: source_text.to_string(),
                        last_seen: now,
                    },
                );
                true
            }
        }
    }

    /// Latest source text for `key`, if it has been registered.
    pub fn source_text(&self, key: &str) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).map(|entry| entry.source_text.clone())
    }

    pub fn get(&self, key: &str) -> Option<RegisteredText> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.get(key).cloned()
    }

    /// `(key, source_text)` pairs sorted by key.
    pub fn snapshot(&self) -> Vec<(String, String)> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let mut pairs: Vec<(String, String)> = entries
            .values()
            .map(|entry| (entry.key.clone(), entry.source_text.clone()))
            .collect();
        pairs.sort();
        pairs
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
