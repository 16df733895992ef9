//! The localization service: current language, `t()`, free-text translation
//! and the language-change protocol.
//!
//! One `LocalizationService` is built at the composition root and cloned
//! (cheaply, it is an `Arc` handle) into every consumer.
//!
//! # Language change
//!
//! `change_language` moves through `Idle -> Translating -> Persisting ->
//! Published`:
//!
//! 1. **Translating**: every registered text the dictionary cannot answer is
//!    translated from the previous language to the new one. Failures degrade
//!    per item to the source text. New cache entries are written once, after
//!    the whole batch.
//! 2. **Persisting**: the new language becomes current in memory, then is
//!    saved. A failed save is logged and ignored.
//! 3. **Published**: the revision counter is bumped, watchers and listeners
//!    are notified. Consumers re-run `t()` for what they display.
//!
//! Only one change runs at a time. A second call while one is in flight is
//! rejected with [`LocalizationError::LanguageChangeInProgress`].

use crate::cache::{default_ttl, CacheLookup, Clock, SystemClock, TranslationCache};
use crate::config::Config;
use crate::error::LocalizationError;
use crate::i18n::{
    is_namespaced_key, KeyResolver, Language, LanguageRegistry, StaticDictionary,
    TranslationMetrics,
};
use crate::store::{JsonFileStore, KeyValueStore, LanguageStore};
use crate::text_registry::TextRegistry;
use crate::translation::{
    OpenAiTranslator, RemoteTranslationClient, TranslationProvider, Translated,
};
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Where a language change currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangePhase {
    Idle,
    Translating,
    Persisting,
    Published,
}

/// What `change_language` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// The requested language was already current; nothing happened
    Unchanged,
    Changed {
        previous: Language,
        current: Language,
        revision: u64,
        /// Registered texts pre-translated through the provider or cache
        retranslated: usize,
        /// Registered texts that kept their source text
        degraded: usize,
    },
}

/// Observable state for pull-based consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalizationSnapshot {
    pub language: Language,
    pub revision: u64,
    pub is_loading: bool,
}

/// Passed to listeners after a change is published.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LanguageChanged {
    pub previous: Language,
    pub current: Language,
    pub revision: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Listener = Arc<dyn Fn(&LanguageChanged) + Send + Sync>;

/// Construction knobs. `Default` gives production behaviour.
#[derive(Clone)]
pub struct ServiceOptions {
    /// Language used when nothing usable is persisted
    pub default_language: Language,
    pub cache_ttl: chrono::Duration,
    pub clock: Arc<dyn Clock>,
    pub dictionary: Arc<StaticDictionary>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            default_language: Language::canonical(),
            cache_ttl: default_ttl(),
            clock: Arc::new(SystemClock),
            dictionary: Arc::new(StaticDictionary::builtin().clone()),
        }
    }
}

/// A re-translation produced by the last language change.
#[derive(Debug, Clone)]
struct LiveTranslation {
    language: Language,
    source_text: String,
    translated: String,
}

#[derive(Debug, Clone, Copy)]
struct Status {
    language: Language,
    phase: ChangePhase,
}

struct Inner<P> {
    resolver: KeyResolver,
    language_store: LanguageStore,
    cache: TranslationCache,
    client: RemoteTranslationClient<P>,
    registry: TextRegistry,
    metrics: Arc<TranslationMetrics>,
    status: RwLock<Status>,
    revision: AtomicU64,
    changing: AtomicBool,
    live: RwLock<HashMap<String, LiveTranslation>>,
    snapshot_tx: watch::Sender<LocalizationSnapshot>,
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_listener_id: AtomicU64,
}

pub struct LocalizationService<P> {
    inner: Arc<Inner<P>>,
}

impl<P> Clone for LocalizationService<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl LocalizationService<OpenAiTranslator> {
    /// Wire the production service: OpenAI-compatible provider and a JSON
    /// file store at `config.store_path`.
    pub fn from_config(config: &Config) -> Result<Self, LocalizationError> {
        let provider = OpenAiTranslator::from_config(config)?;
        let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(&config.store_path));
        let options = ServiceOptions {
            default_language: config.default_language,
            cache_ttl: config.cache_ttl(),
            ..ServiceOptions::default()
        };
        Ok(Self::new(provider, store, options))
    }
}

impl<P: TranslationProvider + 'static> LocalizationService<P> {
    /// Build the service and load the persisted language.
    ///
    /// `store` backs both the language preference and the translation cache.
    pub fn new(provider: P, store: Arc<dyn KeyValueStore>, options: ServiceOptions) -> Self {
        let metrics = Arc::new(TranslationMetrics::new());
        let language_store = LanguageStore::new(Arc::clone(&store), options.default_language);
        let language = language_store.load();
        let cache = TranslationCache::load(store, Arc::clone(&options.clock), options.cache_ttl);

        info!("Localization starting in '{}' ({})", language, language.name());

        let (snapshot_tx, _) = watch::channel(LocalizationSnapshot {
            language,
            revision: 0,
            is_loading: false,
        });

        Self {
            inner: Arc::new(Inner {
                resolver: KeyResolver::new(options.dictionary),
                language_store,
                cache,
                client: RemoteTranslationClient::new(provider, Arc::clone(&metrics)),
                registry: TextRegistry::new(options.clock),
                metrics,
                status: RwLock::new(Status {
                    language,
                    phase: ChangePhase::Idle,
                }),
                revision: AtomicU64::new(0),
                changing: AtomicBool::new(false),
                live: RwLock::new(HashMap::new()),
                snapshot_tx,
                listeners: Mutex::new(Vec::new()),
                next_listener_id: AtomicU64::new(0),
            }),
        }
    }

    // ==================== Observable state ====================

    pub fn current_language(&self) -> Language {
        self.inner.status().language
    }

    /// True while a language change is translating or persisting.
    pub fn is_loading(&self) -> bool {
        matches!(
            self.inner.status().phase,
            ChangePhase::Translating | ChangePhase::Persisting
        )
    }

    pub fn phase(&self) -> ChangePhase {
        self.inner.status().phase
    }

    /// Monotonic token bumped once per published language change.
    pub fn revision(&self) -> u64 {
        self.inner.revision.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> LocalizationSnapshot {
        *self.inner.snapshot_tx.borrow()
    }

    /// Watch channel carrying the latest snapshot.
    pub fn subscribe(&self) -> watch::Receiver<LocalizationSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Register a callback run after every published language change.
    ///
    /// Callbacks run on the task that called `change_language` and must not
    /// call `change_language` themselves.
    pub fn on_language_changed<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&LanguageChanged) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((id, Arc::new(callback)));
        id
    }

    /// Returns whether a listener with this id was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock().unwrap_or_else(|e| e.into_inner());
        let before = listeners.len();
        listeners.retain(|(listener_id, _)| *listener_id != id);
        listeners.len() != before
    }

    pub fn supported_languages(&self) -> Vec<Language> {
        LanguageRegistry::get()
            .list_enabled()
            .iter()
            .filter_map(|config| Language::from_code_any(config.code))
            .collect()
    }

    pub fn metrics(&self) -> &TranslationMetrics {
        &self.inner.metrics
    }

    pub fn cache(&self) -> &TranslationCache {
        &self.inner.cache
    }

    pub fn text_registry(&self) -> &TextRegistry {
        &self.inner.registry
    }

    pub fn resolver(&self) -> &KeyResolver {
        &self.inner.resolver
    }

    // ==================== Lookups ====================

    /// Display string for `key` in the current language. Never fails.
    ///
    /// Namespaced keys resolve through the dictionary (current language,
    /// then English). When both miss, the re-translation of `fallback` from
    /// the last language change is used if it was made from the same text,
    /// then `fallback` itself, then the raw key.
    ///
    /// Anything that is not a namespaced key is treated as literal English
    /// text and served from the free-text cache when possible.
    ///
    /// Every call records `key -> fallback` (or the literal text) for the
    /// next language change.
    pub fn t(&self, key: &str, fallback: Option<&str>) -> String {
        let active = self.current_language();

        if !is_namespaced_key(key) {
            self.register(key, key);
            return self.literal_text(key, active);
        }

        if let Some(fallback) = fallback {
            self.register(key, fallback);
        }

        if let Some((phrase, _)) = self.inner.resolver.lookup(key, active) {
            return phrase.to_string();
        }

        let source_text = fallback
            .map(str::to_string)
            .or_else(|| self.inner.registry.source_text(key));
        if let Some(translated) = source_text
            .as_deref()
            .and_then(|source| self.live_translation(key, active, source))
        {
            return translated;
        }

        match fallback {
            Some(fallback) => fallback.to_string(),
            None => {
                debug!("Unresolved translation key '{}' for '{}'", key, active);
                key.to_string()
            }
        }
    }

    fn register(&self, key: &str, source_text: &str) {
        if self.inner.registry.register(key, source_text) {
            // The text behind this key changed; an older re-translation no
            // longer describes what is on screen.
            let mut live = self.inner.live.write().unwrap_or_else(|e| e.into_inner());
            if live
                .get(key)
                .is_some_and(|entry| entry.source_text != source_text)
            {
                live.remove(key);
            }
        }
    }

    fn live_translation(&self, key: &str, active: Language, source_text: &str) -> Option<String> {
        let live = self.inner.live.read().unwrap_or_else(|e| e.into_inner());
        live.get(key)
            .filter(|entry| entry.language == active && entry.source_text == source_text)
            .map(|entry| entry.translated.clone())
    }

    fn literal_text(&self, text: &str, active: Language) -> String {
        let canonical = Language::canonical();
        if active == canonical || text.trim().is_empty() {
            return text.to_string();
        }

        if let Some(translated) = self.live_translation(text, active, text) {
            return translated;
        }

        self.inner
            .cache
            .peek(canonical, active, text)
            .unwrap_or_else(|| text.to_string())
    }

    /// Best-effort translation of arbitrary text. Never fails.
    ///
    /// Blank text and `source == target` return `text` untouched without
    /// consulting the cache or the provider. A cache miss goes to the
    /// provider; a successful answer is cached, a failure returns `text`.
    ///
    /// The provider call runs on its own task, so a caller that stops
    /// waiting does not lose the result: it still lands in the cache.
    pub async fn translate_free_text(&self, text: &str, source: Language, target: Language) -> String {
        self.translate_item(text, source, target, Flush::Now)
            .await
            .into_text()
    }

    async fn translate_item(
        &self,
        text: &str,
        source: Language,
        target: Language,
        flush: Flush,
    ) -> Translated {
        if text.trim().is_empty() || source == target {
            return Translated::Original(text.to_string());
        }

        match self.inner.cache.get(source, target, text) {
            CacheLookup::Hit(translated) => {
                self.inner.metrics.record_cache_hit();
                debug!("Cache hit for {}->{}", source, target);
                return Translated::Remote(translated);
            }
            CacheLookup::Expired => {
                self.inner.metrics.record_cache_expiration();
                self.inner.metrics.record_cache_miss();
            }
            CacheLookup::Miss => self.inner.metrics.record_cache_miss(),
        }

        let inner = Arc::clone(&self.inner);
        let owned = text.to_string();
        let task = tokio::spawn(async move {
            let result = inner.fetch_and_cache(&owned, source, target).await;
            if flush == Flush::Now && result.is_remote() {
                Inner::flush_cache(inner).await;
            }
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                warn!("Translation task for {}->{} failed: {}", source, target, e);
                Translated::Original(text.to_string())
            }
        }
    }

    /// Translate from English into the current language.
    pub async fn translate_for_display(&self, text: &str) -> String {
        self.translate_free_text(text, Language::canonical(), self.current_language())
            .await
    }

    /// Guess the language of `text`; English when unsure. Never fails.
    pub async fn detect_language(&self, text: &str) -> Language {
        if text.trim().is_empty() {
            return Language::canonical();
        }
        self.inner.client.detect(text).await
    }

    // ==================== Language change ====================

    /// Switch the current language, pre-translating every registered text.
    ///
    /// Returns [`ChangeOutcome::Unchanged`] when `code` is already current.
    /// Fails only for unknown/disabled codes and for overlapping calls.
    pub async fn change_language(&self, code: &str) -> Result<ChangeOutcome, LocalizationError> {
        let target = Language::from_code(code)?;

        let Some(_guard) = ChangeGuard::acquire(&self.inner) else {
            error!(
                "change_language('{}') called while another change is in progress",
                code
            );
            return Err(LocalizationError::LanguageChangeInProgress(code.to_string()));
        };

        let previous = self.current_language();
        if target == previous {
            debug!("Language already '{}', nothing to do", target);
            return Ok(ChangeOutcome::Unchanged);
        }

        // Translating
        self.inner.set_phase(ChangePhase::Translating);
        self.inner.publish_snapshot(self.revision());

        let pending: Vec<(String, String)> = self
            .inner
            .registry
            .snapshot()
            .into_iter()
            // t() serves any dictionary phrase, English fallback included,
            // before a live re-translation
            .filter(|(key, _)| self.inner.resolver.lookup(key, target).is_none())
            .collect();

        let results = join_all(pending.into_iter().map(|(key, source_text)| async move {
            let result = self
                .translate_item(&source_text, previous, target, Flush::Deferred)
                .await;
            (key, source_text, result)
        }))
        .await;

        // One write for the whole batch
        Inner::flush_cache(Arc::clone(&self.inner)).await;

        let mut retranslated = 0;
        let mut degraded = 0;
        {
            let mut live = self.inner.live.write().unwrap_or_else(|e| e.into_inner());
            for (key, source_text, result) in results {
                if result.is_remote() {
                    retranslated += 1;
                } else {
                    degraded += 1;
                }
                live.insert(
                    key,
                    LiveTranslation {
                        language: target,
                        source_text,
                        translated: result.into_text(),
                    },
                );
            }
        }

        // Persisting
        {
            let mut status = self.inner.status.write().unwrap_or_else(|e| e.into_inner());
            status.phase = ChangePhase::Persisting;
            status.language = target;
        }
        if self.inner.language_store.save(target).is_err() {
            warn!("Continuing with '{}' for this session only", target);
        }

        // Published
        let revision = self.inner.revision.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.set_phase(ChangePhase::Published);
        self.inner.publish_snapshot(revision);

        let event = LanguageChanged {
            previous,
            current: target,
            revision,
        };
        self.inner.notify_listeners(&event);

        info!(
            "Language changed {} -> {} (revision {}, {} re-translated, {} kept source text)",
            previous, target, revision, retranslated, degraded
        );

        Ok(ChangeOutcome::Changed {
            previous,
            current: target,
            revision,
            retranslated,
            degraded,
        })
    }
}

impl<P: TranslationProvider> Inner<P> {
    fn status(&self) -> Status {
        *self.status.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_phase(&self, phase: ChangePhase) {
        self.status.write().unwrap_or_else(|e| e.into_inner()).phase = phase;
    }

    fn publish_snapshot(&self, revision: u64) {
        let status = self.status();
        self.snapshot_tx.send_replace(LocalizationSnapshot {
            language: status.language,
            revision,
            is_loading: matches!(
                status.phase,
                ChangePhase::Translating | ChangePhase::Persisting
            ),
        });
    }

    fn notify_listeners(&self, event: &LanguageChanged) {
        // Clone out so callbacks may add or remove listeners
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        for listener in listeners {
            listener(event);
        }
    }

    async fn fetch_and_cache(&self, text: &str, source: Language, target: Language) -> Translated {
        let result = self.client.translate(text, source, target).await;
        if result.is_remote() {
            self.cache.insert(source, target, text, result.as_str());
        }
        result
    }
}

impl<P: TranslationProvider + 'static> Inner<P> {
    /// Write pending cache entries on the blocking pool.
    async fn flush_cache(inner: Arc<Self>) {
        if !inner.cache.is_dirty() {
            return;
        }
        if let Err(e) = tokio::task::spawn_blocking(move || inner.cache.flush()).await {
            warn!("Translation cache flush task failed: {}", e);
        }
    }
}

/// When a fresh provider answer is written to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flush {
    /// Right after the answer arrives
    Now,
    /// By the caller, once for a whole batch
    Deferred,
}

/// Holds the single in-flight change slot. Dropping it (normally or because
/// the caller abandoned the future) frees the slot and leaves no change
/// half-reported.
struct ChangeGuard<'a, P: TranslationProvider> {
    inner: &'a Inner<P>,
}

impl<'a, P: TranslationProvider> ChangeGuard<'a, P> {
    fn acquire(inner: &'a Inner<P>) -> Option<Self> {
        inner
            .changing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { inner })
    }
}

impl<P: TranslationProvider> Drop for ChangeGuard<'_, P> {
    fn drop(&mut self) {
        let phase = self.inner.status().phase;
        if matches!(phase, ChangePhase::Translating | ChangePhase::Persisting) {
            warn!("Language change abandoned during {:?}", phase);
            self.inner.set_phase(ChangePhase::Idle);
            self.inner
                .publish_snapshot(self.inner.revision.load(Ordering::Acquire));
        }
        self.inner.changing.store(false, Ordering::Release);
    }
}
