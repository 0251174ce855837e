//! Snapshot types for serializing registry state.
//!
//! This module provides serializable snapshot types that capture the counts
//! of one or more registries at a point in time.
//!
//! # Feature Flag
//!
//! This module requires the `serde` feature:
//!
//! ```toml
//! [dependencies]
//! conteggi = { version = "0.1", features = ["serde"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use conteggi::counters::keyed::KeyedCounter;
//! use conteggi::counters::Observable;
//! use conteggi::snapshot::MetricsSnapshot;
//!
//! let requests = KeyedCounter::new().with_name("requests");
//! requests.add("GET", 42);
//!
//! let counters: Vec<&dyn Observable> = vec![&requests];
//! let snapshot = MetricsSnapshot::collect(counters.into_iter());
//!
//! assert_eq!(snapshot.get("requests", "GET").map(|c| c.value), Some(42));
//! assert_eq!(snapshot.total("requests"), 42);
//! ```

use crate::counters::{Observable, ObservableEntry, UNNAMED};
use serde::{Deserialize, Serialize};

/// A snapshot of a single key of a registry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// The name of the registry.
    pub name: String,
    /// The key inside the registry.
    pub key: String,
    /// The count of `key`.
    pub value: u64,
}

impl CounterSnapshot {
    /// Creates a new counter snapshot.
    pub fn new(name: impl Into<String>, key: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
            value,
        }
    }

    /// Creates a snapshot from an observed entry.
    ///
    /// Entries of unnamed registries are named [`UNNAMED`].
    pub fn from_entry(entry: ObservableEntry<'_>) -> Self {
        Self {
            name: if entry.name.is_empty() {
                UNNAMED.to_string()
            } else {
                entry.name.to_string()
            },
            key: entry.key,
            value: entry.value,
        }
    }
}

/// A collection of counter snapshots, typically a point-in-time capture of
/// every registry of an application.
///
/// # Examples
///
/// ```rust
/// use conteggi::snapshot::{CounterSnapshot, MetricsSnapshot};
///
/// let snapshot = MetricsSnapshot::new(vec![
///     CounterSnapshot::new("requests", "GET", 1000),
///     CounterSnapshot::new("requests", "POST", 5),
/// ]);
///
/// assert_eq!(snapshot.get("requests", "GET").unwrap().value, 1000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Optional timestamp in milliseconds since Unix epoch.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub timestamp_ms: Option<u64>,
    /// The counter snapshots.
    pub counters: Vec<CounterSnapshot>,
}

impl MetricsSnapshot {
    /// Creates a new metrics snapshot with the given counters.
    pub fn new(counters: Vec<CounterSnapshot>) -> Self {
        Self {
            timestamp_ms: None,
            counters,
        }
    }

    /// Creates a new metrics snapshot with counters and a timestamp.
    pub fn with_timestamp(counters: Vec<CounterSnapshot>, timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            counters,
        }
    }

    /// Finds the snapshot of `key` in the registry called `name`.
    pub fn get(&self, name: &str, key: &str) -> Option<&CounterSnapshot> {
        self.counters
            .iter()
            .find(|c| c.name == name && c.key == key)
    }

    /// Sums the counts of every key of the registry called `name`.
    pub fn total(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .filter(|c| c.name == name)
            .fold(0u64, |acc, c| acc.saturating_add(c.value))
    }

    /// Collects snapshots from an iterator of observable registries.
    pub fn collect<'a>(counters: impl Iterator<Item = &'a dyn Observable>) -> Self {
        Self::new(
            counters
                .flat_map(|c| c.expand())
                .map(CounterSnapshot::from_entry)
                .collect(),
        )
    }

    /// Collects snapshots from an iterator of observable registries and resets them.
    pub fn collect_and_reset<'a>(counters: impl Iterator<Item = &'a dyn Observable>) -> Self {
        Self::new(
            counters
                .flat_map(|c| c.expand_and_reset())
                .map(CounterSnapshot::from_entry)
                .collect(),
        )
    }

    /// Collects snapshots with a timestamp.
    pub fn collect_with_timestamp<'a>(
        counters: impl Iterator<Item = &'a dyn Observable>,
        timestamp_ms: u64,
    ) -> Self {
        Self {
            timestamp_ms: Some(timestamp_ms),
            ..Self::collect(counters)
        }
    }
}
