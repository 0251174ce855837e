//! JSON observer for serializing registries.
//!
//! This module provides [`JsonObserver`], which serializes a collection of
//! [`Observable`] registries to JSON using the snapshot types from
//! [`crate::snapshot`].
//!
//! # Feature Flag
//!
//! This module requires the `json` feature:
//!
//! ```toml
//! [dependencies]
//! conteggi = { version = "0.1", features = ["json"] }
//! ```
//!
//! # Examples
//!
//! ```rust
//! use conteggi::counters::keyed::KeyedCounter;
//! use conteggi::counters::Observable;
//! use conteggi::observers::json::JsonObserver;
//!
//! let requests = KeyedCounter::new().with_name("http_requests");
//! requests.add("GET", 1000);
//! requests.add("POST", 5);
//!
//! let counters: Vec<&dyn Observable> = vec![&requests];
//! let json = JsonObserver::new().to_json(counters.into_iter())?;
//!
//! assert_eq!(
//!     json,
//!     r#"[{"name":"http_requests","key":"GET","value":1000},{"name":"http_requests","key":"POST","value":5}]"#
//! );
//! # Ok::<(), conteggi::observers::ObserverError>(())
//! ```

use std::collections::BTreeSet;

use crate::counters::{Observable, UNNAMED};
use crate::observers::{ObserverError, Result};
use crate::snapshot::{CounterSnapshot, MetricsSnapshot};
use serde::Serialize;

/// Configuration for the JSON observer.
#[derive(Debug, Clone, Default)]
pub struct JsonConfig {
    /// Whether to pretty-print the JSON output.
    pub pretty: bool,
    /// Whether to include a timestamp in the output.
    pub include_timestamp: bool,
    /// Whether to wrap counters in a [`MetricsSnapshot`] object.
    pub wrap_in_snapshot: bool,
}

/// An observer that serializes registries to JSON.
///
/// Two registries sharing a name could produce ambiguous `(name, key)`
/// pairs; serialization refuses them with [`ObserverError::Metric`] before
/// any registry is read or reset.
#[derive(Debug, Clone, Default)]
pub struct JsonObserver {
    config: JsonConfig,
}

impl JsonObserver {
    /// Creates a new JSON observer with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new JSON observer with the specified configuration.
    pub fn with_config(config: JsonConfig) -> Self {
        Self { config }
    }

    /// Enables or disables pretty-printing.
    pub fn pretty(mut self, enabled: bool) -> Self {
        self.config.pretty = enabled;
        self
    }

    /// Enables or disables timestamp inclusion.
    ///
    /// Only has effect when `wrap_in_snapshot` is also enabled.
    pub fn include_timestamp(mut self, enabled: bool) -> Self {
        self.config.include_timestamp = enabled;
        self
    }

    /// Enables or disables wrapping the output in a [`MetricsSnapshot`].
    pub fn wrap_in_snapshot(mut self, enabled: bool) -> Self {
        self.config.wrap_in_snapshot = enabled;
        self
    }

    /// Collects registries into one [`CounterSnapshot`] per key.
    pub fn collect<'a>(
        &self,
        counters: impl Iterator<Item = &'a dyn Observable>,
    ) -> Vec<CounterSnapshot> {
        MetricsSnapshot::collect(counters).counters
    }

    /// Collects registries and resets them.
    pub fn collect_and_reset<'a>(
        &self,
        counters: impl Iterator<Item = &'a dyn Observable>,
    ) -> Vec<CounterSnapshot> {
        MetricsSnapshot::collect_and_reset(counters).counters
    }

    /// Serializes registries to a JSON string.
    pub fn to_json<'a>(
        &self,
        counters: impl Iterator<Item = &'a dyn Observable>,
    ) -> Result<String> {
        let counters = distinct_names(counters)?;
        self.serialize(self.collect(counters.into_iter()))
    }

    /// Serializes registries to JSON and resets them.
    pub fn to_json_and_reset<'a>(
        &self,
        counters: impl Iterator<Item = &'a dyn Observable>,
    ) -> Result<String> {
        let counters = distinct_names(counters)?;
        self.serialize(self.collect_and_reset(counters.into_iter()))
    }

    /// Serializes registries to a compact JSON byte vector.
    pub fn to_json_bytes<'a>(
        &self,
        counters: impl Iterator<Item = &'a dyn Observable>,
    ) -> Result<Vec<u8>> {
        let counters = distinct_names(counters)?;
        let snapshots = self.collect(counters.into_iter());
        if self.config.wrap_in_snapshot {
            Ok(serde_json::to_vec(&self.wrap(snapshots))?)
        } else {
            Ok(serde_json::to_vec(&snapshots)?)
        }
    }

    fn wrap(&self, snapshots: Vec<CounterSnapshot>) -> MetricsSnapshot {
        if self.config.include_timestamp {
            MetricsSnapshot::with_timestamp(snapshots, current_timestamp_ms())
        } else {
            MetricsSnapshot::new(snapshots)
        }
    }

    fn serialize(&self, snapshots: Vec<CounterSnapshot>) -> Result<String> {
        if self.config.wrap_in_snapshot {
            self.encode(&self.wrap(snapshots))
        } else {
            self.encode(&snapshots)
        }
    }

    fn encode<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let json = if self.config.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };
        Ok(json)
    }
}

/// Collects the registries, refusing two that export under the same name.
///
/// Runs on names alone so that nothing is drained when the export is refused.
fn distinct_names<'a>(
    counters: impl Iterator<Item = &'a dyn Observable>,
) -> Result<Vec<&'a dyn Observable>> {
    let counters: Vec<&'a dyn Observable> = counters.collect();
    let mut seen = BTreeSet::new();
    for counter in &counters {
        let name = match counter.name() {
            "" => UNNAMED,
            name => name,
        };
        if !seen.insert(name) {
            return Err(ObserverError::Metric(format!(
                "duplicate registry name {name}"
            )));
        }
    }
    Ok(counters)
}

/// Returns the current timestamp in milliseconds since Unix epoch.
fn current_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
