//! # Conteggi - Mutex-Guarded Keyed Counters
//!
//! A Rust library providing a thread-safe registry of named counts and a
//! deterministic completion barrier for the tasks that update it.
//!
//! ## The Problem
//!
//! Counting events by key from many concurrent tasks needs two things:
//!
//! 1. **No lost updates**: a read-modify-write on a shared map must never
//!    interleave with another one, or increments silently disappear.
//! 2. **A sound read point**: the caller must know that every task has
//!    finished before reading. Sleeping "long enough" is not a
//!    synchronization mechanism; under scheduling variance it reads early.
//!
//! ## The Solution
//!
//! - [`KeyedCounter`](counters::keyed::KeyedCounter) keeps a
//!   `BTreeMap<String, u64>` behind a single mutex. Every operation is one
//!   critical section, and the guard is released on every exit path,
//!   unwinding included.
//! - [`Launcher`](launcher::Launcher) spawns tasks against a shared registry
//!   and blocks in [`wait`](launcher::Launcher::wait) on a counting
//!   [`WaitGroup`](crossbeam_utils::sync::WaitGroup) until each task has
//!   returned or unwound.
//!
//! ## Quick Start
//!
//! ```rust
//! use conteggi::counters::keyed::KeyedCounter;
//! use conteggi::launcher::Launcher;
//! use std::sync::Arc;
//!
//! // Registries are explicit values, shared through Arc
//! let counter = Arc::new(KeyedCounter::new().with_name("events"));
//!
//! let mut launcher = Launcher::new(Arc::clone(&counter));
//! launcher.spawn_increments("someKey", 1000)?;
//! launcher.wait()?;
//!
//! assert_eq!(counter.value("someKey"), 1000);
//! assert_eq!(counter.value("anyKey"), 0);
//! # Ok::<(), conteggi::launcher::LaunchError>(())
//! ```
//!
//! ## Thread Safety
//!
//! [`KeyedCounter`](counters::keyed::KeyedCounter) is `Send + Sync`. Several
//! independent registries can coexist; none of them is a process-wide
//! singleton unless the caller puts one in a `static`.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade and installs no logger:
//! task start/exit at `trace`, barrier waits at `debug`, lock poisoning
//! recovery at `warn`.
//!
//! ## Observers
//!
//! Optional observer modules export registries, each gated behind a feature
//! flag:
//!
//! | Feature | Module | Description |
//! |---------|--------|-------------|
//! | `table` | [`observers::table`] | Pretty-print registries as ASCII tables |
//! | `serde` | [`snapshot`] | Serializable point-in-time snapshots |
//! | `json` | [`observers::json`] | Serialize registries to JSON |
//! | `full` | All observers | Enables all observer modules |
//!
//! ### Example: Table Output
//!
//! ```rust,ignore
//! use conteggi::counters::keyed::KeyedCounter;
//! use conteggi::counters::Observable;
//! use conteggi::observers::table::TableObserver;
//!
//! let requests = KeyedCounter::new().with_name("http_requests");
//! requests.add("GET", 1000);
//!
//! let counters: Vec<&dyn Observable> = vec![&requests];
//! println!("{}", TableObserver::new().render(counters.into_iter()));
//! ```
//!
//! ### Example: JSON Output
//!
//! ```rust,ignore
//! use conteggi::observers::json::JsonObserver;
//!
//! let json = JsonObserver::new()
//!     .pretty(true)
//!     .to_json(counters.into_iter())?;
//! ```

pub mod counters;
pub mod launcher;
pub mod observers;

#[cfg(feature = "serde")]
pub mod snapshot;
