//! Key resolution with the fallback chain: active language, then English,
//! then the raw key.

use crate::i18n::{Language, StaticDictionary};
use regex::Regex;
use std::sync::{Arc, OnceLock};
use tracing::debug;

static NAMESPACED_KEY_REGEX: OnceLock<Regex> = OnceLock::new();

/// Whether `key` looks like a translation key rather than literal text.
///
/// A namespaced key has at least two dot-separated segments, each made of
/// ASCII letters, digits, `_` or `-`. `"dashboard.title"` qualifies;
/// `"Hello. World"` and `"Dashboard"` do not.
pub fn is_namespaced_key(key: &str) -> bool {
    let regex = NAMESPACED_KEY_REGEX.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_-]+(\.[A-Za-z0-9_-]+)+$").expect("Invalid key regex")
    });
    regex.is_match(key)
}

/// Resolves translation keys against a [`StaticDictionary`].
#[derive(Debug, Clone)]
pub struct KeyResolver {
    dictionary: Arc<StaticDictionary>,
    fallback: Language,
}

impl KeyResolver {
    pub fn new(dictionary: Arc<StaticDictionary>) -> Self {
        Self {
            dictionary,
            fallback: Language::canonical(),
        }
    }

    /// Resolver over the phrases shipped with the application.
    pub fn builtin() -> Self {
        Self::new(Arc::new(StaticDictionary::builtin().clone()))
    }

    pub fn dictionary(&self) -> &StaticDictionary {
        &self.dictionary
    }

    /// Look `key` up in `active`, then in the fallback language.
    ///
    /// An empty phrase in the active language counts as missing. Returns the
    /// phrase together with the language that supplied it, or `None` when
    /// neither table has the key.
    pub fn lookup(&self, key: &str, active: Language) -> Option<(&str, Language)> {
        if let Some(phrase) = self
            .dictionary
            .get(active, key)
            .filter(|phrase| !phrase.is_empty())
        {
            return Some((phrase, active));
        }

        if active != self.fallback {
            if let Some(phrase) = self.dictionary.get(self.fallback, key) {
                debug!(
                    "Key '{}' missing for '{}', using '{}' phrase",
                    key, active, self.fallback
                );
                return Some((phrase, self.fallback));
            }
        }

        None
    }

    /// Resolve `key` for `active`, returning the raw key when nothing matches.
    ///
    /// An unresolved key is returned as-is so the gap is visible on screen.
    pub fn resolve<'a>(&'a self, key: &'a str, active: Language) -> &'a str {
        match self.lookup(key, active) {
            Some((phrase, _)) => phrase,
            None => {
                debug!("Unresolved translation key '{}' for '{}'", key, active);
                key
            }
        }
    }
}
