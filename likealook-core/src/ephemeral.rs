//! Short-lived in-memory storage for uploaded images
//!
//! Uploads are staged here so that an external matcher can fetch them by URL.
//! The store is bounded twice: entries older than `max_age` are treated as
//! absent (and dropped lazily when touched), and the live count never exceeds
//! `max_entries` after a `put` (oldest insertion is evicted first).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{LikeALookError, Result};
use crate::resources::join_url;

/// Reserved collection name under which ephemeral entries are addressed.
pub const EPHEMERAL_COLLECTION: &str = "ephemeral";

/// Id returned by [`EphemeralStore::put`] when the store is disabled.
/// It never refers to stored content.
pub const EPHEMERALS_DISABLED: &str = "EphemeralsNotEnabled";

/// Default maximum age for ephemeral entries (5 minutes)
pub const DEFAULT_MAX_AGE_SECS: i64 = 300;

/// Default maximum number of live ephemeral entries
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock used in production.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Used for expiry tests.
#[derive(Debug)]
pub struct ManualClock {
    base: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

/// Ephemeral store settings
#[derive(Debug, Clone)]
pub struct EphemeralConfig {
    /// Master switch (default: true)
    pub enabled: bool,
    /// Maximum entry age in seconds; zero or negative disables the store (default: 300)
    pub max_age_secs: i64,
    /// Maximum live entries; zero disables the store (default: 100)
    pub max_entries: usize,
    /// Prefix used when composing resource URLs
    pub url_prefix: String,
}

impl Default for EphemeralConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            max_entries: DEFAULT_MAX_ENTRIES,
            url_prefix: crate::resources::DEFAULT_URL_PREFIX.to_string(),
        }
    }
}

struct Entry {
    content: Arc<[u8]>,
    created: Instant,
}

#[derive(Default)]
struct Entries {
    by_id: HashMap<String, Entry>,
    /// Ids in insertion order, oldest first
    order: VecDeque<String>,
}

impl Entries {
    fn remove(&mut self, id: &str) {
        if self.by_id.remove(id).is_some() {
            self.order.retain(|existing| existing != id);
        }
    }
}

/// Capacity- and age-bounded store for uploaded images
pub struct EphemeralStore {
    entries: Mutex<Entries>,
    enabled: bool,
    max_age: Duration,
    max_entries: usize,
    url_prefix: String,
    clock: Arc<dyn Clock>,
}

impl EphemeralStore {
    /// Create a store reading time from the system clock
    pub fn new(config: EphemeralConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store with an explicit clock
    pub fn with_clock(config: EphemeralConfig, clock: Arc<dyn Clock>) -> Self {
        let enabled = config.enabled && config.max_age_secs > 0 && config.max_entries > 0;
        let store = Self {
            entries: Mutex::new(Entries::default()),
            enabled,
            max_age: Duration::from_secs(config.max_age_secs.max(0) as u64),
            max_entries: config.max_entries,
            url_prefix: config.url_prefix,
            clock,
        };

        if enabled {
            info!(
                max_age_secs = store.max_age.as_secs(),
                max_entries = store.max_entries,
                "Ephemeral store enabled"
            );
        } else {
            info!("Ephemeral store disabled by configuration");
        }
        store
    }

    /// Stage `content` under `id`, or under a fresh UUID when `id` is `None`.
    ///
    /// A supplied id replaces any live entry with the same id and moves it to
    /// the young end of the eviction order. Returns the effective id, or
    /// [`EPHEMERALS_DISABLED`] without storing anything when the store is off.
    pub fn put(&self, id: Option<String>, content: impl Into<Arc<[u8]>>) -> String {
        if !self.enabled {
            debug!("Ephemeral store disabled, not staging content");
            return EPHEMERALS_DISABLED.to_string();
        }

        let id = id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let now = self.clock.now();
        let entry = Entry {
            content: content.into(),
            created: now,
        };

        let mut entries = self.lock();
        if entries.by_id.insert(id.clone(), entry).is_some() {
            entries.order.retain(|existing| existing != &id);
        }
        entries.order.push_back(id.clone());
        self.evict(&mut entries, now);

        debug!(id = %id, live = entries.by_id.len(), "Ephemeral entry staged");
        id
    }

    /// Fetch the content for `id`.
    ///
    /// Fails with `NotFound` when the id is unknown or the entry has outlived
    /// `max_age`; an expired entry is removed as part of the failed lookup.
    pub fn get(&self, id: &str) -> Result<Arc<[u8]>> {
        let now = self.clock.now();
        let mut entries = self.lock();

        match entries.by_id.get(id) {
            None => {
                return Err(LikeALookError::NotFound(format!(
                    "The ephemeral '{id}' could not be located"
                )))
            }
            Some(entry) if !self.is_expired(entry, now) => return Ok(Arc::clone(&entry.content)),
            Some(_) => {}
        }

        entries.remove(id);
        debug!(id = %id, "Ephemeral entry expired on lookup");
        Err(LikeALookError::NotFound(format!(
            "The ephemeral '{id}' was expired"
        )))
    }

    /// Same expiry rules as [`get`](Self::get), reported as a boolean.
    pub fn contains(&self, id: &str) -> bool {
        let now = self.clock.now();
        let mut entries = self.lock();

        let expired = match entries.by_id.get(id) {
            None => return false,
            Some(entry) => self.is_expired(entry, now),
        };
        if expired {
            entries.remove(id);
            debug!(id = %id, "Ephemeral entry expired on lookup");
        }
        !expired
    }

    /// URL under which `id` is served. Does not consult the store.
    pub fn url_for(&self, id: &str) -> String {
        join_url(&self.url_prefix, &format!("{EPHEMERAL_COLLECTION}/{id}"))
    }

    /// Number of physically held entries (expired ones included until touched)
    pub fn len(&self) -> usize {
        self.lock().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    fn is_expired(&self, entry: &Entry, now: Instant) -> bool {
        now.saturating_duration_since(entry.created) > self.max_age
    }

    /// Drop oldest entries while over capacity, plus any expired entries at the old end.
    fn evict(&self, entries: &mut Entries, now: Instant) {
        while let Some(oldest) = entries.order.front() {
            let over_capacity = entries.by_id.len() > self.max_entries;
            let expired = entries
                .by_id
                .get(oldest)
                .map_or(true, |entry| self.is_expired(entry, now));
            if !over_capacity && !expired {
                break;
            }

            if let Some(oldest) = entries.order.pop_front() {
                entries.by_id.remove(&oldest);
                debug!(id = %oldest, over_capacity, expired, "Ephemeral entry evicted");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for EphemeralStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralStore")
            .field("enabled", &self.enabled)
            .field("entries", &self.len())
            .field("max_age", &self.max_age)
            .field("max_entries", &self.max_entries)
            .field("url_prefix", &self.url_prefix)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(max_age_secs: i64, max_entries: usize) -> EphemeralConfig {
        EphemeralConfig {
            enabled: true,
            max_age_secs,
            max_entries,
            url_prefix: "http://localhost:3000/resource/".to_string(),
        }
    }

    fn store_with_clock(max_age_secs: i64, max_entries: usize) -> (EphemeralStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let store = EphemeralStore::with_clock(config(max_age_secs, max_entries), clock.clone());
        (store, clock)
    }

    #[test]
    fn test_put_generated_id_round_trip() {
        let (store, _) = store_with_clock(300, 10);
        let id = store.put(None, b"portrait bytes".to_vec());

        assert_ne!(id, EPHEMERALS_DISABLED);
        assert!(Uuid::parse_str(&id).is_ok(), "Generated id should be a UUID");
        assert_eq!(&*store.get(&id).unwrap(), b"portrait bytes");
        assert!(store.contains(&id));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let (store, _) = store_with_clock(300, 1000);
        let ids: std::collections::HashSet<_> =
            (0..500).map(|_| store.put(None, vec![1u8])).collect();
        assert_eq!(ids.len(), 500);
    }

    #[test]
    fn test_put_supplied_id_overwrites() {
        let (store, _) = store_with_clock(300, 10);
        assert_eq!(store.put(Some("face".into()), b"old".to_vec()), "face");
        assert_eq!(store.put(Some("face".into()), b"new".to_vec()), "face");

        assert_eq!(&*store.get("face").unwrap(), b"new");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let (store, _) = store_with_clock(300, 10);
        assert!(matches!(
            store.get("missing"),
            Err(LikeALookError::NotFound(_))
        ));
        assert!(!store.contains("missing"));
    }

    #[test]
    fn test_expired_entry_is_not_found_and_removed() {
        let (store, clock) = store_with_clock(300, 10);
        let id = store.put(None, b"x".to_vec());

        clock.advance(Duration::from_secs(300));
        assert!(store.contains(&id), "Exactly max_age old is still live");

        clock.advance(Duration::from_millis(1));
        assert!(matches!(store.get(&id), Err(LikeALookError::NotFound(_))));
        assert_eq!(store.len(), 0, "Expired entry should be dropped on lookup");

        // Lazy deletion is idempotent
        assert!(!store.contains(&id));
        assert!(!store.contains(&id));
    }

    #[test]
    fn test_contains_removes_expired_entry() {
        let (store, clock) = store_with_clock(5, 10);
        let id = store.put(None, b"x".to_vec());

        clock.advance(Duration::from_secs(6));
        assert!(!store.contains(&id));
        assert_eq!(store.len(), 0);
        assert!(store.get(&id).is_err());
    }

    #[test]
    fn test_capacity_bound_evicts_oldest() {
        let (store, _) = store_with_clock(300, 3);
        let ids: Vec<String> = (0..10)
            .map(|i| {
                let id = store.put(Some(format!("id{i}")), vec![i as u8]);
                assert!(store.len() <= 3, "Live size must stay within capacity");
                id
            })
            .collect();

        for evicted in &ids[..7] {
            assert!(!store.contains(evicted), "{evicted} should have been evicted");
        }
        for kept in &ids[7..] {
            assert!(store.contains(kept), "{kept} should still be live");
        }
    }

    #[test]
    fn test_overwrite_refreshes_eviction_order() {
        let (store, _) = store_with_clock(300, 2);
        store.put(Some("a".into()), b"1".to_vec());
        store.put(Some("b".into()), b"2".to_vec());
        store.put(Some("a".into()), b"3".to_vec());
        store.put(Some("c".into()), b"4".to_vec());

        assert!(!store.contains("b"), "b is now the oldest insertion");
        assert!(store.contains("a"));
        assert!(store.contains("c"));
    }

    #[test]
    fn test_put_drops_expired_oldest_entries() {
        let (store, clock) = store_with_clock(10, 5);
        store.put(Some("old".into()), b"1".to_vec());
        clock.advance(Duration::from_secs(11));
        store.put(Some("fresh".into()), b"2".to_vec());

        assert_eq!(store.len(), 1);
        assert!(store.contains("fresh"));
    }

    #[test]
    fn test_disabled_by_zero_entries() {
        let (store, _) = store_with_clock(300, 0);
        assert!(!store.is_enabled());

        let id = store.put(None, b"x".to_vec());
        assert_eq!(id, EPHEMERALS_DISABLED);
        assert!(!store.contains(&id));
        assert!(store.get(&id).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn test_disabled_by_non_positive_age() {
        let (store, _) = store_with_clock(0, 10);
        assert_eq!(store.put(Some("given".into()), b"x".to_vec()), EPHEMERALS_DISABLED);
        assert!(!store.contains("given"));

        let (store, _) = store_with_clock(-5, 10);
        assert!(!store.is_enabled());
    }

    #[test]
    fn test_disabled_by_flag() {
        let store = EphemeralStore::new(EphemeralConfig {
            enabled: false,
            ..Default::default()
        });
        assert_eq!(store.put(None, b"x".to_vec()), EPHEMERALS_DISABLED);
    }

    #[test]
    fn test_url_for_does_not_consult_store() {
        let (store, _) = store_with_clock(300, 10);
        assert_eq!(
            store.url_for("unknown"),
            "http://localhost:3000/resource/ephemeral/unknown"
        );

        let store = EphemeralStore::new(EphemeralConfig {
            url_prefix: "http://localhost/api/resource".to_string(),
            ..Default::default()
        });
        assert_eq!(
            store.url_for("abc"),
            "http://localhost/api/resource/ephemeral/abc"
        );
    }

    #[test]
    fn test_concurrent_puts_respect_capacity() {
        let (store, _) = store_with_clock(300, 8);
        let store = Arc::new(store);

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        let id = store.put(Some(format!("t{t}-{i}")), vec![t as u8]);
                        let _ = store.get(&id);
                        assert!(store.len() <= 8);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(store.len(), 8);
    }
}
