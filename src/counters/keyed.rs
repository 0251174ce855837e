//! Keyed counter registry guarded by a single mutex.
//!
//! This module provides [`KeyedCounter`], a map from string keys to counts
//! that any number of threads may update concurrently without losing
//! increments.

use std::collections::BTreeMap;
use std::fmt::{self, Debug};
use std::sync::{Mutex, MutexGuard};

use crate::counters::{lock_recovering, Observable, ObservableEntry};

/// A registry of named counts, safe to share across threads.
///
/// Every read-modify-write on the map runs inside one mutually exclusive
/// critical section, so `N` concurrent increments of the same key raise its
/// count by exactly `N`.
///
/// Registries are plain values: build one explicitly and share it through
/// `Arc` (or a `static` built with [`KeyedCounter::named`]). Any number of
/// independent registries can coexist.
///
/// # Examples
///
/// Basic usage:
///
/// ```rust
/// use conteggi::counters::keyed::KeyedCounter;
///
/// let counter = KeyedCounter::new();
/// counter.increment("someKey");
/// counter.increment("someKey");
/// assert_eq!(counter.value("someKey"), 2);
/// assert_eq!(counter.value("anyKey"), 0);
/// ```
///
/// Multi-threaded usage:
///
/// ```rust
/// use conteggi::counters::keyed::KeyedCounter;
/// use std::sync::Arc;
/// use std::thread;
///
/// let counter = Arc::new(KeyedCounter::new());
/// let mut handles = vec![];
///
/// for _ in 0..4 {
///     let c = Arc::clone(&counter);
///     handles.push(thread::spawn(move || {
///         for _ in 0..1000 {
///             c.increment("someKey");
///         }
///     }));
/// }
///
/// for h in handles {
///     h.join().unwrap();
/// }
///
/// assert_eq!(counter.value("someKey"), 4000);
/// ```
pub struct KeyedCounter {
    name: &'static str,
    counts: Mutex<BTreeMap<String, u64>>,
}

impl KeyedCounter {
    /// Creates a new, empty registry with no name.
    pub const fn new() -> Self {
        Self::named("")
    }

    /// Creates a new, empty registry with the given name.
    ///
    /// Being `const`, this can initialize a `static`:
    ///
    /// ```rust
    /// use conteggi::counters::keyed::KeyedCounter;
    ///
    /// static REQUESTS: KeyedCounter = KeyedCounter::named("requests");
    ///
    /// REQUESTS.increment("GET");
    /// assert_eq!(REQUESTS.value("GET"), 1);
    /// ```
    pub const fn named(name: &'static str) -> Self {
        KeyedCounter {
            name,
            counts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Sets the name of this registry, returning `self` for method chaining.
    ///
    /// ```rust
    /// use conteggi::counters::keyed::KeyedCounter;
    /// use conteggi::counters::Observable;
    ///
    /// let counter = KeyedCounter::new().with_name("http_requests");
    /// assert_eq!(counter.name(), "http_requests");
    /// ```
    pub fn with_name(self, name: &'static str) -> Self {
        Self { name, ..self }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, u64>> {
        lock_recovering(&self.counts, self.name)
    }

    /// Increments the count of `key` by one.
    #[inline]
    pub fn increment(&self, key: &str) {
        self.add(key, 1);
    }

    /// Adds `value` to the count of `key`.
    ///
    /// The count saturates at `u64::MAX`.
    ///
    /// ```rust
    /// use conteggi::counters::keyed::KeyedCounter;
    ///
    /// let counter = KeyedCounter::new();
    /// counter.add("bytes", 512);
    /// counter.add("bytes", 512);
    /// assert_eq!(counter.value("bytes"), 1024);
    /// ```
    pub fn add(&self, key: &str, value: u64) {
        let mut counts = self.lock();
        match counts.get_mut(key) {
            Some(count) => *count = count.saturating_add(value),
            None => {
                counts.insert(key.to_owned(), value);
            }
        }
    }

    /// Returns the count of `key`, or 0 if it was never incremented.
    #[inline]
    pub fn value(&self, key: &str) -> u64 {
        self.lock().get(key).copied().unwrap_or(0)
    }

    /// Returns the count of `key` and removes it from the registry.
    ///
    /// ```rust
    /// use conteggi::counters::keyed::KeyedCounter;
    ///
    /// let counter = KeyedCounter::new();
    /// counter.add("period", 7);
    /// assert_eq!(counter.value_and_reset("period"), 7);
    /// assert_eq!(counter.value("period"), 0);
    /// ```
    pub fn value_and_reset(&self, key: &str) -> u64 {
        self.lock().remove(key).unwrap_or(0)
    }

    /// Returns `true` if `key` has been counted at least once since the last reset.
    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no key has been counted.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Returns all keys in ascending order.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    /// Returns all `(key, count)` pairs in ascending key order.
    pub fn entries(&self) -> Vec<(String, u64)> {
        self.lock()
            .iter()
            .map(|(key, count)| (key.clone(), *count))
            .collect()
    }

    /// Returns all `(key, count)` pairs and empties the registry.
    ///
    /// Useful for periodic collection: increments racing with this call are
    /// either returned now or kept for the next call.
    pub fn entries_and_reset(&self) -> Vec<(String, u64)> {
        std::mem::take(&mut *self.lock()).into_iter().collect()
    }

    /// Removes every key.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Observable for KeyedCounter {
    #[inline]
    fn name(&self) -> &str {
        self.name
    }

    fn expand(&self) -> Vec<ObservableEntry<'_>> {
        self.entries()
            .into_iter()
            .map(|(key, value)| ObservableEntry::new(self.name, key, value))
            .collect()
    }

    fn expand_and_reset(&self) -> Vec<ObservableEntry<'_>> {
        self.entries_and_reset()
            .into_iter()
            .map(|(key, value)| ObservableEntry::new(self.name, key, value))
            .collect()
    }
}

impl Default for KeyedCounter {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for KeyedCounter {
    /// Formats the registry as `name{ key:value key:value ... }`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.name)?;
        for (key, count) in self.lock().iter() {
            write!(f, " {key}:{count}")?;
        }
        write!(f, " }}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn hammer(
        counter: &Arc<KeyedCounter>,
        key: &'static str,
        tasks: usize,
    ) -> Vec<thread::JoinHandle<()>> {
        (0..tasks)
            .map(|_| {
                let c = Arc::clone(counter);
                thread::spawn(move || c.increment(key))
            })
            .collect()
    }

    #[test]
    fn test_new() {
        let counter = KeyedCounter::new();
        assert!(counter.is_empty());
        assert_eq!(counter.len(), 0);
        assert_eq!(counter.name(), "");
    }

    #[test]
    fn test_unknown_key_is_zero() {
        let counter = KeyedCounter::new();
        assert_eq!(counter.value("anyKey"), 0);
        assert!(!counter.contains("anyKey"));
    }

    #[test]
    fn test_increment() {
        let counter = KeyedCounter::new();
        counter.increment("a");
        assert_eq!(counter.value("a"), 1);
        counter.increment("a");
        counter.increment("a");
        assert_eq!(counter.value("a"), 3);
        assert!(counter.contains("a"));
    }

    #[test]
    fn test_add_saturates() {
        let counter = KeyedCounter::new();
        counter.add("big", u64::MAX - 1);
        counter.add("big", 10);
        assert_eq!(counter.value("big"), u64::MAX);
    }

    #[test]
    fn test_add_zero_creates_key() {
        let counter = KeyedCounter::new();
        counter.add("seen", 0);
        assert!(counter.contains("seen"));
        assert_eq!(counter.value("seen"), 0);
    }

    #[test]
    fn test_value_and_reset() {
        let counter = KeyedCounter::new();
        counter.add("a", 5);
        counter.add("b", 2);
        assert_eq!(counter.value_and_reset("a"), 5);
        assert_eq!(counter.value("a"), 0);
        assert_eq!(counter.value("b"), 2);
        assert_eq!(counter.value_and_reset("missing"), 0);
    }

    #[test]
    fn test_keys_sorted() {
        let counter = KeyedCounter::new();
        counter.increment("c");
        counter.increment("a");
        counter.increment("b");
        assert_eq!(counter.keys(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_entries_and_reset() {
        let counter = KeyedCounter::new();
        counter.add("x", 3);
        counter.add("y", 4);
        let entries = counter.entries_and_reset();
        assert_eq!(entries, vec![("x".to_string(), 3), ("y".to_string(), 4)]);
        assert!(counter.is_empty());
        assert_eq!(counter.value("x"), 0);
    }

    #[test]
    fn test_clear() {
        let counter = KeyedCounter::new();
        counter.increment("x");
        counter.clear();
        assert!(counter.is_empty());
    }

    #[test]
    fn test_with_name_preserves_counts() {
        let counter = KeyedCounter::new();
        counter.increment("k");
        let counter = counter.with_name("renamed");
        assert_eq!(counter.name(), "renamed");
        assert_eq!(counter.value("k"), 1);
    }

    #[test]
    fn test_static_named() {
        static STATIC_COUNTER: KeyedCounter = KeyedCounter::named("static");
        STATIC_COUNTER.increment("k");
        assert_eq!(STATIC_COUNTER.name(), "static");
        assert!(STATIC_COUNTER.value("k") >= 1);
    }

    #[test]
    fn test_default() {
        let counter = KeyedCounter::default();
        assert!(counter.is_empty());
        assert_eq!(counter.name(), "");
    }

    #[test]
    fn test_debug() {
        let counter = KeyedCounter::new().with_name("dbg");
        counter.add("k", 5);
        let debug_str = format!("{:?}", counter);
        assert_eq!(debug_str, "dbg{ k:5 }");
    }

    #[test]
    fn test_expand() {
        let counter = KeyedCounter::new().with_name("hits");
        counter.add("b", 2);
        counter.add("a", 1);
        let entries = counter.expand();
        assert_eq!(
            entries,
            vec![
                ObservableEntry::new("hits", "a", 1),
                ObservableEntry::new("hits", "b", 2),
            ]
        );
        assert_eq!(counter.len(), 2);
    }

    #[test]
    fn test_expand_and_reset() {
        let counter = KeyedCounter::new().with_name("hits");
        counter.add("a", 1);
        let entries = counter.expand_and_reset();
        assert_eq!(entries, vec![ObservableEntry::new("hits", "a", 1)]);
        assert!(counter.expand().is_empty());
    }

    #[test]
    fn test_concurrent_same_key() {
        let counter = Arc::new(KeyedCounter::new());
        for handle in hammer(&counter, "someKey", 1000) {
            handle.join().unwrap();
        }
        assert_eq!(counter.value("someKey"), 1000);
    }

    #[test]
    fn test_concurrent_distinct_keys() {
        let counter = Arc::new(KeyedCounter::new());
        let mut handles = hammer(&counter, "a", 300);
        handles.extend(hammer(&counter, "b", 200));
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(counter.value("a"), 300);
        assert_eq!(counter.value("b"), 200);
    }

    #[test]
    fn test_interleaved_keys_no_lost_updates() {
        const KEYS: usize = 10;
        const PER_KEY: usize = 100;

        let counter = Arc::new(KeyedCounter::new());
        let keys: Vec<String> = (0..KEYS).map(|i| format!("key-{i}")).collect();

        let handles: Vec<_> = (0..KEYS * PER_KEY)
            .map(|i| {
                let c = Arc::clone(&counter);
                let key = keys[i % KEYS].clone();
                thread::spawn(move || c.increment(&key))
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        for key in &keys {
            assert_eq!(counter.value(key), PER_KEY as u64);
        }
        assert!(counter.entries().iter().all(|(_, v)| *v <= PER_KEY as u64));
        assert_eq!(counter.len(), KEYS);
    }

    #[test]
    fn test_keeps_counting_after_poison() {
        let counter = Arc::new(KeyedCounter::new().with_name("poisoned"));
        counter.increment("k");

        let c = Arc::clone(&counter);
        let result = thread::spawn(move || {
            let _guard = c.counts.lock().unwrap();
            panic!("task failed inside the critical section");
        })
        .join();
        assert!(result.is_err());

        counter.increment("k");
        assert_eq!(counter.value("k"), 2);
    }
}
