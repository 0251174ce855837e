//! Task launcher with a deterministic completion barrier.
//!
//! [`Launcher`] spawns independent tasks against a shared
//! [`KeyedCounter`] and lets the caller block until every one of them has
//! finished before reading. The barrier is a counting
//! [`WaitGroup`](crossbeam_utils::sync::WaitGroup): each task owns one
//! handle and releases it when it returns or unwinds, so [`Launcher::wait`]
//! never returns while a task is still running its work, and never hangs
//! because a task panicked.
//!
//! # Examples
//!
//! ```rust
//! use conteggi::counters::keyed::KeyedCounter;
//! use conteggi::launcher::Launcher;
//! use std::sync::Arc;
//!
//! let counter = Arc::new(KeyedCounter::new());
//! let mut launcher = Launcher::new(Arc::clone(&counter));
//!
//! launcher.spawn_increments("someKey", 1000)?;
//! let report = launcher.wait()?;
//!
//! assert_eq!(report.launched, 1000);
//! assert_eq!(counter.value("someKey"), 1000);
//! # Ok::<(), conteggi::launcher::LaunchError>(())
//! ```

use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_utils::sync::WaitGroup;
use thiserror::Error;

use crate::counters::keyed::KeyedCounter;

/// Errors raised while launching or joining tasks.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The operating system refused to create a thread.
    #[error("failed to spawn task: {0}")]
    Spawn(#[from] io::Error),

    /// Some tasks ended without completing their work (they panicked).
    #[error("only {completed} of {launched} tasks completed")]
    Incomplete {
        /// Number of tasks spawned.
        launched: usize,
        /// Number of tasks that returned normally.
        completed: usize,
    },
}

/// Result type for launcher operations.
pub type Result<T> = std::result::Result<T, LaunchError>;

/// Configuration for the threads spawned by a [`Launcher`].
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    /// Prefix of each thread name; the task index is appended as `-N`.
    pub thread_name_prefix: String,
    /// Stack size for each thread, or `None` for the platform default.
    pub stack_size: Option<usize>,
}

impl Default for LauncherConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "conteggi-task".to_string(),
            stack_size: None,
        }
    }
}

/// Outcome of a successful [`Launcher::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchReport {
    /// Number of tasks spawned.
    pub launched: usize,
    /// Number of tasks that returned normally.
    pub completed: usize,
}

/// Spawns tasks against a shared registry and waits for all of them.
///
/// The launcher is consumed by [`wait`](Launcher::wait); start a new one
/// for the next batch of tasks.
pub struct Launcher {
    counter: Arc<KeyedCounter>,
    config: LauncherConfig,
    wait_group: WaitGroup,
    launched: usize,
    completed: Arc<AtomicUsize>,
}

impl Launcher {
    /// Creates a launcher with the default configuration.
    pub fn new(counter: Arc<KeyedCounter>) -> Self {
        Self::with_config(counter, LauncherConfig::default())
    }

    /// Creates a launcher with the specified configuration.
    pub fn with_config(counter: Arc<KeyedCounter>, config: LauncherConfig) -> Self {
        Self {
            counter,
            config,
            wait_group: WaitGroup::new(),
            launched: 0,
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sets the thread name prefix.
    pub fn thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name_prefix = prefix.into();
        self
    }

    /// Sets the stack size of spawned threads.
    pub fn stack_size(mut self, size: usize) -> Self {
        self.config.stack_size = Some(size);
        self
    }

    /// Returns the registry the tasks operate on.
    pub fn counter(&self) -> &Arc<KeyedCounter> {
        &self.counter
    }

    /// Returns the number of tasks spawned so far.
    pub fn launched(&self) -> usize {
        self.launched
    }

    /// Spawns one task running `task` against the registry.
    ///
    /// The task counts as completed only if `task` returns; a panic still
    /// releases the barrier but is reported by [`wait`](Launcher::wait).
    pub fn spawn<F>(&mut self, task: F) -> Result<()>
    where
        F: FnOnce(&KeyedCounter) + Send + 'static,
    {
        let id = self.launched;
        let mut builder =
            thread::Builder::new().name(format!("{}-{id}", self.config.thread_name_prefix));
        if let Some(size) = self.config.stack_size {
            builder = builder.stack_size(size);
        }

        let counter = Arc::clone(&self.counter);
        let completed = Arc::clone(&self.completed);
        let wait_group = self.wait_group.clone();

        builder.spawn(move || {
            log::trace!("task {id} starting");
            task(&*counter);
            completed.fetch_add(1, Ordering::Release);
            drop(wait_group);
            log::trace!("task {id} exiting");
        })?;

        self.launched += 1;
        Ok(())
    }

    /// Spawns one task that increments `key` once.
    pub fn spawn_increment(&mut self, key: impl Into<String>) -> Result<()> {
        let key = key.into();
        self.spawn(move |counter| counter.increment(&key))
    }

    /// Spawns `tasks` independent tasks, each incrementing `key` once.
    ///
    /// Stops at the first spawn failure; tasks already spawned keep running
    /// and are still covered by the barrier.
    pub fn spawn_increments(&mut self, key: &str, tasks: usize) -> Result<()> {
        let key: Arc<str> = Arc::from(key);
        for _ in 0..tasks {
            let key = Arc::clone(&key);
            self.spawn(move |counter| counter.increment(&key))?;
        }
        Ok(())
    }

    /// Blocks until every spawned task has finished.
    ///
    /// Returns [`LaunchError::Incomplete`] if any task panicked. The
    /// increments of the tasks that did complete are visible either way.
    pub fn wait(self) -> Result<LaunchReport> {
        let Launcher {
            wait_group,
            launched,
            completed,
            ..
        } = self;

        log::debug!("waiting for {launched} tasks");
        wait_group.wait();

        let completed = completed.load(Ordering::Acquire);
        log::debug!("{completed} of {launched} tasks completed");

        if completed == launched {
            Ok(LaunchReport {
                launched,
                completed,
            })
        } else {
            Err(LaunchError::Incomplete {
                launched,
                completed,
            })
        }
    }
}

/// Launches `tasks` concurrent increments of `key`, waits for all of them,
/// and returns the final count of `key`.
///
/// If spawning fails partway, the tasks already running are still waited for
/// before the spawn error is returned, so the registry is quiescent either way.
///
/// ```rust
/// use conteggi::counters::keyed::KeyedCounter;
/// use conteggi::launcher::run_increments;
/// use std::sync::Arc;
///
/// let counter = Arc::new(KeyedCounter::new());
/// assert_eq!(run_increments(&counter, "someKey", 1000)?, 1000);
/// # Ok::<(), conteggi::launcher::LaunchError>(())
/// ```
pub fn run_increments(counter: &Arc<KeyedCounter>, key: &str, tasks: usize) -> Result<u64> {
    increments_on(Launcher::new(Arc::clone(counter)), key, tasks)?;
    Ok(counter.value(key))
}

fn increments_on(mut launcher: Launcher, key: &str, tasks: usize) -> Result<LaunchReport> {
    if let Err(err) = launcher.spawn_increments(key, tasks) {
        let spawned = launcher.launched();
        log::debug!("spawn failed after {spawned} tasks: {err}");
        // the spawn error wins over any panic among the tasks that did start
        let _ = launcher.wait();
        return Err(err);
    }
    launcher.wait()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_no_tasks() {
        let counter = Arc::new(KeyedCounter::new());
        let report = Launcher::new(Arc::clone(&counter)).wait().unwrap();
        assert_eq!(
            report,
            LaunchReport {
                launched: 0,
                completed: 0
            }
        );
        assert_eq!(counter.value("someKey"), 0);
    }

    #[test]
    fn test_run_increments_reference_scenario() {
        let counter = Arc::new(KeyedCounter::new());
        assert_eq!(run_increments(&counter, "someKey", 1000).unwrap(), 1000);
    }

    #[test]
    fn test_run_increments_various_sizes() {
        for n in [0, 1, 2, 17, 256] {
            let counter = Arc::new(KeyedCounter::new());
            assert_eq!(run_increments(&counter, "k", n).unwrap(), n as u64);
        }
    }

    #[test]
    fn test_fresh_registry_reads_zero() {
        let counter = Arc::new(KeyedCounter::new());
        run_increments(&counter, "someKey", 10).unwrap();
        assert_eq!(counter.value("anyKey"), 0);
    }

    #[test]
    fn test_distinct_keys_do_not_interfere() {
        let counter = Arc::new(KeyedCounter::new());
        let mut launcher = Launcher::new(Arc::clone(&counter));
        launcher.spawn_increments("a", 150).unwrap();
        launcher.spawn_increments("b", 70).unwrap();
        assert_eq!(launcher.launched(), 220);
        launcher.wait().unwrap();

        assert_eq!(counter.value("a"), 150);
        assert_eq!(counter.value("b"), 70);
    }

    #[test]
    fn test_interleaved_keys() {
        let counter = Arc::new(KeyedCounter::new());
        let mut launcher = Launcher::new(Arc::clone(&counter));
        for i in 0..1000 {
            launcher.spawn_increment(format!("key-{}", i % 10)).unwrap();
        }
        let report = launcher.wait().unwrap();
        assert_eq!(report.completed, 1000);

        let entries = counter.entries();
        assert_eq!(entries.len(), 10);
        for (_, count) in entries {
            assert_eq!(count, 100);
        }
    }

    #[test]
    fn test_wait_covers_slow_tasks() {
        let counter = Arc::new(KeyedCounter::new());
        let mut launcher = Launcher::new(Arc::clone(&counter));
        for _ in 0..8 {
            launcher
                .spawn(|c| {
                    thread::sleep(Duration::from_millis(50));
                    c.increment("slow");
                })
                .unwrap();
        }
        launcher.wait().unwrap();
        assert_eq!(counter.value("slow"), 8);
    }

    #[test]
    fn test_panicking_task_is_reported() {
        let counter = Arc::new(KeyedCounter::new());
        let mut launcher = Launcher::new(Arc::clone(&counter));
        launcher.spawn_increment("k").unwrap();
        launcher
            .spawn(|c| {
                c.increment("k");
                panic!("task failed after its increment");
            })
            .unwrap();
        launcher.spawn_increment("k").unwrap();

        match launcher.wait() {
            Err(LaunchError::Incomplete {
                launched,
                completed,
            }) => {
                assert_eq!(launched, 3);
                assert_eq!(completed, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(counter.value("k"), 3);
    }

    #[test]
    fn test_thread_name_prefix() {
        let counter = Arc::new(KeyedCounter::new());
        let mut launcher = Launcher::new(Arc::clone(&counter)).thread_name_prefix("worker");
        launcher
            .spawn(|c| {
                let name = thread::current().name().map(str::to_owned);
                assert_eq!(name.as_deref(), Some("worker-0"));
                c.increment("named");
            })
            .unwrap();
        launcher.wait().unwrap();
        assert_eq!(counter.value("named"), 1);
    }

    #[test]
    fn test_stack_size() {
        let counter = Arc::new(KeyedCounter::new());
        let mut launcher = Launcher::new(Arc::clone(&counter)).stack_size(256 * 1024);
        launcher.spawn_increments("k", 4).unwrap();
        launcher.wait().unwrap();
        assert_eq!(counter.value("k"), 4);
    }

    #[test]
    fn test_independent_registries() {
        let first = Arc::new(KeyedCounter::new());
        let second = Arc::new(KeyedCounter::new());
        run_increments(&first, "k", 30).unwrap();
        run_increments(&second, "k", 5).unwrap();
        assert_eq!(first.value("k"), 30);
        assert_eq!(second.value("k"), 5);
    }

    // No address space can hold a stack this large, so `Builder::spawn` fails.
    const UNSPAWNABLE_STACK: usize = 1 << 52;

    #[test]
    fn test_spawn_failure_is_reported() {
        let counter = Arc::new(KeyedCounter::new());
        let mut launcher = Launcher::new(Arc::clone(&counter)).stack_size(UNSPAWNABLE_STACK);

        let err = launcher.spawn_increment("k").unwrap_err();
        assert!(matches!(err, LaunchError::Spawn(_)));
        assert!(err.to_string().starts_with("failed to spawn task: "));
        assert_eq!(launcher.launched(), 0);

        let report = launcher.wait().unwrap();
        assert_eq!(report.launched, 0);
        assert_eq!(counter.value("k"), 0);
    }

    #[test]
    fn test_spawn_failure_waits_for_running_tasks() {
        let counter = Arc::new(KeyedCounter::new());
        let mut launcher = Launcher::new(Arc::clone(&counter));
        for _ in 0..3 {
            launcher
                .spawn(|c| {
                    thread::sleep(Duration::from_millis(100));
                    c.increment("slow");
                })
                .unwrap();
        }

        let launcher = launcher.stack_size(UNSPAWNABLE_STACK);
        let err = increments_on(launcher, "k", 5).unwrap_err();

        assert!(matches!(err, LaunchError::Spawn(_)));
        // all three slow tasks finished before the error came back
        assert_eq!(counter.value("slow"), 3);
        assert_eq!(counter.value("k"), 0);
    }

    #[test]
    fn test_error_display() {
        let err = LaunchError::Incomplete {
            launched: 10,
            completed: 9,
        };
        assert_eq!(err.to_string(), "only 9 of 10 tasks completed");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_async_tasks() {
        let counter = Arc::new(KeyedCounter::new());
        let handles: Vec<_> = (0..1000)
            .map(|_| {
                let c = Arc::clone(&counter);
                tokio::spawn(async move { c.increment("someKey") })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(counter.value("someKey"), 1000);
    }
}
