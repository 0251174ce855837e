//! Core module containing the keyed counter registry and the observation
//! interface shared by every exporter.
//!
//! # Architecture
//!
//! A registry is a single map from keys to counts protected by one mutex.
//! Every operation, read or write, is a single critical section:
//!
//! ```text
//!                          ┌─────────────────────────────────────┐
//!                          │           KeyedCounter              │
//!   Task 0 ──increment──►  │  Mutex ─┬─ "someKey"   ► 998        │
//!   Task 1 ──increment──►  │ (one at │  "otherKey"  ► 12         │
//!   Task 2 ──increment──►  │  a time)└─ ...                      │
//!        ...               └─────────────────────────────────────┘
//!                                          │
//!                                          ▼
//!                                value() after the barrier
//! ```
//!
//! # Poisoning
//!
//! The guard is released on every exit path, unwinding included. A task
//! that panics inside a critical section leaves the mutex poisoned; each
//! critical section performs one self-contained map update, so the map is
//! still consistent and the registry keeps using it after logging a
//! warning.

pub mod keyed;

use std::fmt::{Debug, Display};
use std::sync::{Mutex, MutexGuard};

/// Display name exporters use for registries created without a name.
pub const UNNAMED: &str = "(unnamed)";

/// A single `(registry, key, count)` observation.
///
/// Observers flatten registries into entries so that several registries can
/// be rendered together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservableEntry<'a> {
    /// The name of the registry this entry belongs to.
    pub name: &'a str,
    /// The key inside the registry.
    pub key: String,
    /// The count observed for `key`.
    pub value: u64,
}

impl<'a> ObservableEntry<'a> {
    /// Creates a new entry.
    pub fn new(name: &'a str, key: impl Into<String>, value: u64) -> Self {
        Self {
            name,
            key: key.into(),
            value,
        }
    }
}

/// A trait for registries that can be observed to retrieve their counts.
///
/// This is the interface exporters (tables, JSON, snapshots) read through.
///
/// # Examples
///
/// ```rust
/// use conteggi::counters::keyed::KeyedCounter;
/// use conteggi::counters::Observable;
///
/// let counter = KeyedCounter::new().with_name("requests");
/// counter.increment("GET");
/// counter.increment("GET");
/// counter.increment("POST");
///
/// let entries = counter.expand();
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].key, "GET");
/// assert_eq!(entries[0].value, 2);
/// ```
pub trait Observable: Debug {
    /// Returns the name of this registry, or an empty string if unnamed.
    fn name(&self) -> &str;

    /// Returns one entry per key, sorted by key.
    ///
    /// The entries are read inside a single critical section, so they form
    /// a consistent view of the registry.
    fn expand(&self) -> Vec<ObservableEntry<'_>>;

    /// Returns one entry per key and empties the registry.
    ///
    /// Reading and clearing happen in the same critical section: every
    /// increment lands either in the returned entries or in the next
    /// collection, never in both and never in neither.
    fn expand_and_reset(&self) -> Vec<ObservableEntry<'_>>;
}

impl Display for dyn Observable + '_ {
    /// Formats the registry as `name{key=value, ...}`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{{", self.name())?;
        for (i, entry) in self.expand().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", entry.key, entry.value)?;
        }
        write!(f, "}}")
    }
}

/// Acquires `mutex`, recovering the data if a previous holder panicked.
pub(crate) fn lock_recovering<'a, T>(mutex: &'a Mutex<T>, name: &str) -> MutexGuard<'a, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("counter '{name}' lock poisoned by a panicking task, recovering");
        poisoned.into_inner()
    })
}
