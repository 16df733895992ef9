//! Time-expiring cache for free-text translations.
//!
//! Entries are keyed by the exact `(source, target, text)` triple. No case or
//! whitespace normalization is applied, so `"Hello"` and `"hello"` are cached
//! separately.
//!
//! Expiry is lazy: an entry older than the TTL is treated as a miss and
//! dropped when it is read through `get`. Nothing sweeps in the background;
//! [`TranslationCache::purge_expired`] exists for callers that want to
//! shrink the persisted blob, but the read-time check is what decides.
//!
//! Writes are batched: `insert` only marks the cache dirty and
//! [`TranslationCache::flush`] writes the whole blob once.

use crate::error::StoreError;
use crate::i18n::Language;
use crate::store::KeyValueStore;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Store key holding the serialized cache.
pub const CACHE_KEY: &str = "translation_cache";

/// Bumped whenever the persisted layout changes. Blobs written with another
/// version are discarded on load.
pub const CACHE_SCHEMA_VERSION: u32 = 1;

/// Default time-to-live for cached translations.
pub fn default_ttl() -> Duration {
    Duration::days(7)
}

/// Source of "now", injectable so expiry can be tested.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source: Language,
    target: Language,
    text: String,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    translated: String,
    stored_at: DateTime<Utc>,
}

/// Outcome of a cache read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheLookup {
    Hit(String),
    Miss,
    /// An entry existed but was older than the TTL; it has been dropped.
    Expired,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedCache {
    version: u32,
    entries: Vec<PersistedEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PersistedEntry {
    source: String,
    target: String,
    text: String,
    translated: String,
    stored_at: DateTime<Utc>,
}

pub struct TranslationCache {
    entries: Mutex<HashMap<CacheKey, CacheEntry>>,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    /// Set by `insert`, cleared once a flush has taken its snapshot
    dirty: AtomicBool,
    /// Orders flushes so an older snapshot never overwrites a newer one
    flush_lock: Mutex<()>,
}

impl TranslationCache {
    /// Build the cache from whatever `store` holds.
    ///
    /// Unreadable, unparseable or other-version blobs start an empty cache.
    pub fn load(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        let entries = match store.get(CACHE_KEY) {
            Ok(Some(blob)) => Self::decode(&blob),
            Ok(None) => HashMap::new(),
            Err(e) => {
                warn!("Failed to read translation cache, starting empty: {}", e);
                HashMap::new()
            }
        };

        debug!("Loaded {} cached translations", entries.len());

        Self {
            entries: Mutex::new(entries),
            store,
            clock,
            ttl,
            dirty: AtomicBool::new(false),
            flush_lock: Mutex::new(()),
        }
    }

    fn decode(blob: &str) -> HashMap<CacheKey, CacheEntry> {
        let persisted: PersistedCache = match serde_json::from_str(blob) {
            Ok(persisted) => persisted,
            Err(e) => {
                warn!("Discarding unparseable translation cache: {}", e);
                return HashMap::new();
            }
        };

        if persisted.version != CACHE_SCHEMA_VERSION {
            warn!(
                "Discarding translation cache with schema version {} (expected {})",
                persisted.version, CACHE_SCHEMA_VERSION
            );
            return HashMap::new();
        }

        persisted
            .entries
            .into_iter()
            .filter_map(|entry| {
                let source = Language::from_code_any(&entry.source)?;
                let target = Language::from_code_any(&entry.target)?;
                Some((
                    CacheKey {
                        source,
                        target,
                        text: entry.text,
                    },
                    CacheEntry {
                        translated: entry.translated,
                        stored_at: entry.stored_at,
                    },
                ))
            })
            .collect()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn key(source: Language, target: Language, text: &str) -> CacheKey {
        CacheKey {
            source,
            target,
            text: text.to_string(),
        }
    }

    /// Read an entry, dropping it if it has outlived the TTL.
    pub fn get(&self, source: Language, target: Language, text: &str) -> CacheLookup {
        let key = Self::key(source, target, text);
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        match entries.get(&key) {
            Some(entry) if now - entry.stored_at < self.ttl => {
                CacheLookup::Hit(entry.translated.clone())
            }
            Some(_) => {
                entries.remove(&key);
                debug!("Cached translation {}->{} expired", source, target);
                CacheLookup::Expired
            }
            None => CacheLookup::Miss,
        }
    }

    /// Read-only lookup for the render path: a fresh translation or `None`.
    ///
    /// Unlike [`get`](Self::get) an expired entry is left in place; the next
    /// `get` or [`purge_expired`](Self::purge_expired) removes it.
    pub fn peek(&self, source: Language, target: Language, text: &str) -> Option<String> {
        let key = Self::key(source, target, text);
        let now = self.clock.now();
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        entries
            .get(&key)
            .filter(|entry| now - entry.stored_at < self.ttl)
            .map(|entry| entry.translated.clone())
    }

    /// Store a translation stamped with the current time.
    ///
    /// Only memory is touched; the entry reaches the store on the next
    /// [`flush`](Self::flush).
    pub fn insert(&self, source: Language, target: Language, text: &str, translated: &str) {
        let entry = CacheEntry {
            translated: translated.to_string(),
            stored_at: self.clock.now(),
        };

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(Self::key(source, target, text), entry);
        self.dirty.store(true, Ordering::Release);
    }

    /// Entries inserted since the last flush have not been written yet.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Write the cache to the store if anything changed since the last
    /// flush. Blocking; failures are logged and leave the cache dirty.
    ///
    /// The entry lock is held only while the snapshot is taken, so lookups
    /// never wait on the store.
    pub fn flush(&self) {
        let _flush = self.flush_lock.lock().unwrap_or_else(|e| e.into_inner());
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return;
        }

        let persisted = self.snapshot();
        let count = persisted.entries.len();

        let result = serde_json::to_string(&persisted)
            .map_err(StoreError::from)
            .and_then(|blob| self.store.set(CACHE_KEY, &blob));

        match result {
            Ok(()) => debug!("Persisted {} cached translations", count),
            Err(e) => {
                self.dirty.store(true, Ordering::Release);
                warn!("Failed to persist translation cache: {}", e);
            }
        }
    }

    /// Drop every expired entry now and flush. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let removed = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            let before = entries.len();
            entries.retain(|_, entry| now - entry.stored_at < self.ttl);
            before - entries.len()
        };
        if removed > 0 {
            self.dirty.store(true, Ordering::Release);
            self.flush();
        }
        removed
    }

    /// Empty the cache and flush.
    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
        self.dirty.store(true, Ordering::Release);
        self.flush();
    }

    /// Number of entries held, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> PersistedCache {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        PersistedCache {
            version: CACHE_SCHEMA_VERSION,
            entries: entries
                .iter()
                .map(|(key, entry)| PersistedEntry {
                    source: key.source.code().to_string(),
                    target: key.target.code().to_string(),
                    text: key.text.clone(),
                    translated: entry.translated.clone(),
                    stored_at: entry.stored_at,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn cache_with_clock() -> (TranslationCache, Arc<ManualClock>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(t0()));
        let cache = TranslationCache::load(store.clone(), clock.clone(), default_ttl());
        (cache, clock, store)
    }

    struct ReadOnlyStore;

    impl KeyValueStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Corrupt("read-only".to_string()))
        }
    }

    /// Counts writes; reads always miss.
    #[derive(Default)]
    struct CountingStore {
        writes: std::sync::atomic::AtomicUsize,
    }

    impl KeyValueStore for CountingStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// A store whose writes take a while, like a slow flash disk.
    struct SlowStore(std::time::Duration);

    impl KeyValueStore for SlowStore {
        fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            std::thread::sleep(self.0);
            Ok(())
        }
    }

    // ==================== Lookup Tests ====================

    #[test]
    fn test_insert_then_hit() {
        let (cache, _, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "Hello", "नमस्ते");
        assert_eq!(
            cache.get(Language::ENGLISH, Language::HINDI, "Hello"),
            CacheLookup::Hit("नमस्ते".to_string())
        );
    }

    #[test]
    fn test_miss_for_unknown_text() {
        let (cache, _, _) = cache_with_clock();
        assert_eq!(
            cache.get(Language::ENGLISH, Language::HINDI, "Hello"),
            CacheLookup::Miss
        );
    }

    #[test]
    fn test_key_is_case_sensitive() {
        let (cache, _, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "Hello", "upper");
        cache.insert(Language::ENGLISH, Language::HINDI, "hello", "lower");

        assert_eq!(cache.len(), 2);
        assert_eq!(
            cache.peek(Language::ENGLISH, Language::HINDI, "Hello").as_deref(),
            Some("upper")
        );
        assert_eq!(
            cache.peek(Language::ENGLISH, Language::HINDI, "hello").as_deref(),
            Some("lower")
        );
    }

    #[test]
    fn test_key_is_whitespace_sensitive() {
        let (cache, _, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "Hello", "x");
        assert_eq!(cache.peek(Language::ENGLISH, Language::HINDI, "Hello "), None);
    }

    #[test]
    fn test_key_includes_direction() {
        let (cache, _, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "Hello", "x");
        assert_eq!(cache.peek(Language::HINDI, Language::ENGLISH, "Hello"), None);
        assert_eq!(cache.peek(Language::ENGLISH, Language::TELUGU, "Hello"), None);
    }

    // ==================== TTL Tests ====================

    #[test]
    fn test_hit_just_before_ttl() {
        let (cache, clock, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "Hello", "नमस्ते");

        clock.set(t0() + default_ttl() - Duration::seconds(1));
        assert!(matches!(
            cache.get(Language::ENGLISH, Language::HINDI, "Hello"),
            CacheLookup::Hit(_)
        ));
    }

    #[test]
    fn test_miss_just_after_ttl() {
        let (cache, clock, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "Hello", "नमस्ते");

        clock.set(t0() + default_ttl() + Duration::seconds(1));
        assert_eq!(
            cache.get(Language::ENGLISH, Language::HINDI, "Hello"),
            CacheLookup::Expired
        );
        // Evicted on read
        assert_eq!(
            cache.get(Language::ENGLISH, Language::HINDI, "Hello"),
            CacheLookup::Miss
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_exactly_ttl_is_expired() {
        let (cache, clock, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "Hello", "x");
        clock.advance(default_ttl());
        assert_eq!(cache.peek(Language::ENGLISH, Language::HINDI, "Hello"), None);
    }

    #[test]
    fn test_expired_entries_are_not_swept_without_a_read() {
        let (cache, clock, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "a", "x");
        clock.advance(Duration::days(30));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_rewrite_refreshes_timestamp() {
        let (cache, clock, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "a", "old");
        clock.advance(Duration::days(6));
        cache.insert(Language::ENGLISH, Language::HINDI, "a", "new");
        clock.advance(Duration::days(6));
        assert_eq!(
            cache.peek(Language::ENGLISH, Language::HINDI, "a").as_deref(),
            Some("new")
        );
    }

    #[test]
    fn test_purge_expired() {
        let (cache, clock, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "old", "x");
        clock.advance(Duration::days(8));
        cache.insert(Language::ENGLISH, Language::HINDI, "fresh", "y");

        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.peek(Language::ENGLISH, Language::HINDI, "fresh").is_some());
    }

    // ==================== Persistence Tests ====================

    #[test]
    fn test_persists_across_reload() {
        let (cache, clock, store) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::TELUGU, "Hello", "హలో");
        cache.flush();

        let reloaded = TranslationCache::load(store, clock, default_ttl());
        assert_eq!(
            reloaded.peek(Language::ENGLISH, Language::TELUGU, "Hello").as_deref(),
            Some("హలో")
        );
    }

    #[test]
    fn test_reload_keeps_original_timestamp() {
        let (cache, clock, store) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::TELUGU, "Hello", "హలో");
        cache.flush();
        clock.advance(Duration::days(8));

        let reloaded = TranslationCache::load(store, clock, default_ttl());
        assert_eq!(
            reloaded.get(Language::ENGLISH, Language::TELUGU, "Hello"),
            CacheLookup::Expired
        );
    }

    #[test]
    fn test_other_schema_version_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                CACHE_KEY,
                r#"{"version":0,"entries":[{"source":"en","target":"hi","text":"Hello","translated":"x","stored_at":"2026-03-01T12:00:00Z"}]}"#,
            )
            .unwrap();

        let cache =
            TranslationCache::load(store, Arc::new(ManualClock::new(t0())), default_ttl());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_garbage_blob_is_ignored() {
        let store = Arc::new(MemoryStore::new());
        store.set(CACHE_KEY, "{{{").unwrap();
        let cache = TranslationCache::load(store, Arc::new(SystemClock), default_ttl());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unknown_language_entries_are_skipped() {
        let store = Arc::new(MemoryStore::new());
        store
            .set(
                CACHE_KEY,
                r#"{"version":1,"entries":[
                    {"source":"en","target":"zz","text":"a","translated":"x","stored_at":"2026-03-01T12:00:00Z"},
                    {"source":"en","target":"hi","text":"b","translated":"y","stored_at":"2026-03-01T12:00:00Z"}
                ]}"#,
            )
            .unwrap();

        let cache =
            TranslationCache::load(store, Arc::new(ManualClock::new(t0())), default_ttl());
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.peek(Language::ENGLISH, Language::HINDI, "b").as_deref(),
            Some("y")
        );
    }

    #[test]
    fn test_insert_does_not_write_until_flush() {
        let (cache, clock, store) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "a", "x");
        cache.insert(Language::ENGLISH, Language::HINDI, "b", "y");

        assert!(cache.is_dirty());
        assert_eq!(store.get(CACHE_KEY).unwrap(), None);

        cache.flush();
        assert!(!cache.is_dirty());
        assert_eq!(TranslationCache::load(store, clock, default_ttl()).len(), 2);
    }

    #[test]
    fn test_flush_skips_clean_cache() {
        let store = Arc::new(CountingStore::default());
        let cache = TranslationCache::load(
            store.clone(),
            Arc::new(ManualClock::new(t0())),
            default_ttl(),
        );

        cache.flush();
        cache.insert(Language::ENGLISH, Language::HINDI, "a", "x");
        cache.flush();
        cache.flush();

        assert_eq!(store.writes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_flush_stays_dirty() {
        let cache = TranslationCache::load(
            Arc::new(ReadOnlyStore),
            Arc::new(ManualClock::new(t0())),
            default_ttl(),
        );
        cache.insert(Language::ENGLISH, Language::HINDI, "Hello", "नमस्ते");
        cache.flush();
        assert!(cache.is_dirty());
    }

    #[test]
    fn test_peek_is_not_blocked_by_slow_store() {
        let store = Arc::new(SlowStore(std::time::Duration::from_millis(300)));
        let cache = Arc::new(TranslationCache::load(
            store,
            Arc::new(ManualClock::new(t0())),
            default_ttl(),
        ));
        cache.insert(Language::ENGLISH, Language::HINDI, "Report a pothole", "गड्ढे की शिकायत");

        let writer = {
            let cache = Arc::clone(&cache);
            std::thread::spawn(move || cache.flush())
        };
        std::thread::sleep(std::time::Duration::from_millis(50));

        let start = std::time::Instant::now();
        let found = cache.peek(Language::ENGLISH, Language::HINDI, "Report a pothole");
        let waited = start.elapsed();
        writer.join().unwrap();

        assert_eq!(found.as_deref(), Some("गड्ढे की शिकायत"));
        assert!(waited < std::time::Duration::from_millis(100), "waited {:?}", waited);
    }

    #[test]
    fn test_peek_leaves_expired_entry_in_place() {
        let (cache, clock, _) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "Hello", "x");
        clock.advance(default_ttl() + Duration::seconds(1));

        assert_eq!(cache.peek(Language::ENGLISH, Language::HINDI, "Hello"), None);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(Language::ENGLISH, Language::HINDI, "Hello"),
            CacheLookup::Expired
        );
        assert!(cache.is_empty());
    }

    #[test]
    fn test_write_failure_keeps_memory_entry() {
        let cache = TranslationCache::load(
            Arc::new(ReadOnlyStore),
            Arc::new(ManualClock::new(t0())),
            default_ttl(),
        );
        cache.insert(Language::ENGLISH, Language::HINDI, "Hello", "नमस्ते");
        assert_eq!(
            cache.peek(Language::ENGLISH, Language::HINDI, "Hello").as_deref(),
            Some("नमस्ते")
        );
    }

    #[test]
    fn test_clear_persists_empty_cache() {
        let (cache, clock, store) = cache_with_clock();
        cache.insert(Language::ENGLISH, Language::HINDI, "a", "x");
        cache.clear();
        assert!(cache.is_empty());
        assert!(TranslationCache::load(store, clock, default_ttl()).is_empty());
    }

    proptest! {
        #[test]
        fn prop_distinct_texts_never_collide(a in "[ -~]{0,12}", b in "[ -~]{0,12}") {
            prop_assume!(a != b);
            let (cache, _, _) = cache_with_clock();
            cache.insert(Language::ENGLISH, Language::HINDI, &a, "A");
            cache.insert(Language::ENGLISH, Language::HINDI, &b, "B");
            prop_assert_eq!(cache.peek(Language::ENGLISH, Language::HINDI, &a), Some("A".to_string()));
            prop_assert_eq!(cache.peek(Language::ENGLISH, Language::HINDI, &b), Some("B".to_string()));
        }
    }
}
