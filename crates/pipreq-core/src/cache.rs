use crate::config::CacheConfig;
use std::collections::HashMap;

/// Maximum number of cached entries to prevent unbounded memory growth.
pub const MAX_CACHE_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
struct CachedEntry<V> {
    value: V,
    inserted_at: u64,
}

/// Bounded cache of parsed values keyed by their raw requirement line.
///
/// The cache is owned by the caller and passed explicitly into the call
/// sites that want memoized parsing; nothing in the model keeps a
/// process-wide cache. When the cache is full, the oldest tenth of the
/// entries is evicted before the next insert.
///
/// Keys are trimmed before lookup, so `"requests "` and `"requests"` share
/// an entry.
///
/// # Examples
///
/// ```
/// use pipreq_core::cache::LineCache;
///
/// let mut cache: LineCache<usize> = LineCache::with_capacity(10);
/// let len = cache
///     .get_or_try_insert_with("requests>=2.0", |line| Ok::<_, ()>(line.len()))
///     .unwrap();
/// assert_eq!(len, 13);
/// assert_eq!(cache.get(" requests>=2.0 "), Some(&13));
/// ```
#[derive(Debug, Clone)]
pub struct LineCache<V> {
    entries: HashMap<String, CachedEntry<V>>,
    capacity: usize,
    clock: u64,
}

impl<V: Clone> LineCache<V> {
    /// Creates a cache holding at most [`MAX_CACHE_ENTRIES`] entries.
    pub fn new() -> Self {
        Self::with_capacity(MAX_CACHE_ENTRIES)
    }

    /// Creates a cache with an explicit size limit (at least one entry).
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::with_capacity(config.max_entries)
    }

    pub fn get(&self, line: &str) -> Option<&V> {
        self.entries.get(line.trim()).map(|entry| &entry.value)
    }

    /// Inserts a value, evicting the oldest entries first if the cache is full.
    pub fn insert(&mut self, line: &str, value: V) {
        let key = line.trim();
        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            self.evict_entries();
        }

        self.clock += 1;
        self.entries.insert(
            key.to_string(),
            CachedEntry {
                value,
                inserted_at: self.clock,
            },
        );
    }

    /// Returns a clone of the cached value, or computes, stores and returns it.
    ///
    /// Failed computations are not cached.
    pub fn get_or_try_insert_with<E, F>(&mut self, line: &str, compute: F) -> Result<V, E>
    where
        F: FnOnce(&str) -> Result<V, E>,
    {
        if let Some(value) = self.get(line) {
            tracing::trace!("line cache hit: {}", line.trim());
            return Ok(value.clone());
        }

        let value = compute(line.trim())?;
        self.insert(line, value.clone());
        Ok(value)
    }

    pub fn remove(&mut self, line: &str) -> Option<V> {
        self.entries.remove(line.trim()).map(|entry| entry.value)
    }

    /// Returns the number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the cache contains no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Clears all cached entries.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Evicts approximately 10% of cache entries, oldest first.
    fn evict_entries(&mut self) {
        let target_removals = (self.capacity / 10).max(1);

        let mut entries_to_remove: Vec<(String, u64)> = self
            .entries
            .iter()
            .map(|(key, entry)| (key.clone(), entry.inserted_at))
            .collect();

        entries_to_remove.sort_by_key(|(_, inserted_at)| *inserted_at);

        let mut removed = 0;
        for (key, _) in entries_to_remove.iter().take(target_removals) {
            self.entries.remove(key);
            removed += 1;
        }

        tracing::debug!("evicted {} line cache entries", removed);
    }
}

impl<V: Clone> Default for LineCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
