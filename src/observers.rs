//! Observer implementations for exporting registry counts.
//!
//! - [`table`] - Pretty-print registries as tables using the `tabled` crate
//! - [`json`] - Serialize registries to JSON format
//!
//! # Unified Error Handling
//!
//! Observers share the [`ObserverError`] type, so switching between them
//! does not change error handling code.
//!
//! # Feature Flags
//!
//! - `table` - Enables the [`table`] module
//! - `json` - Enables the [`json`] module
//! - `full` - Enables all observer modules
//!
//! # Example
//!
//! ```rust,ignore
//! use conteggi::counters::keyed::KeyedCounter;
//! use conteggi::counters::Observable;
//! use conteggi::observers::Result;
//!
//! static REQUESTS: KeyedCounter = KeyedCounter::named("requests");
//! static ERRORS: KeyedCounter = KeyedCounter::named("errors");
//!
//! fn export_metrics() -> Result<()> {
//!     let counters: &[&'static dyn Observable] = &[&REQUESTS, &ERRORS];
//!
//!     #[cfg(feature = "table")]
//!     {
//!         use conteggi::observers::table::TableObserver;
//!         println!("{}", TableObserver::new().render(counters.iter().copied()));
//!     }
//!
//!     #[cfg(feature = "json")]
//!     {
//!         use conteggi::observers::json::JsonObserver;
//!         println!("{}", JsonObserver::new().to_json(counters.iter().copied())?);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod error;

pub use error::{ObserverError, Result};

#[cfg(feature = "table")]
pub mod table;

#[cfg(feature = "json")]
pub mod json;
