//! Launches 1000 concurrent increments of one key and prints the final count.
//!
//! Run with:
//! ```bash
//! cargo run --example safe_counter
//! ```

use conteggi::counters::keyed::KeyedCounter;
use conteggi::launcher::{LaunchError, Launcher};
use std::sync::Arc;

const TASKS: usize = 1000;
const KEY: &str = "someKey";

fn main() -> Result<(), LaunchError> {
    let counter = Arc::new(KeyedCounter::new().with_name("safe_counter"));

    let mut launcher = Launcher::new(Arc::clone(&counter));
    launcher.spawn_increments(KEY, TASKS)?;
    launcher.wait()?;

    println!("{}", counter.value(KEY));
    Ok(())
}
