//! # Keepsake Core
//!
//! A single-process, in-memory key-value store with per-key TTL and
//! snapshot persistence.
//!
//! ## Features
//!
//! - Lazy expiration: every read is the enforcement point, no sweeper task
//! - JSON snapshots with atomic replace, loaded back on open
//! - Autosave mode that persists after every mutation, plus optional
//!   interval-based snapshotting
//! - A small command API for an external dispatcher to drive
//!
//! ## Example
//!
//! ```rust,no_run
//! use keepsake_core::{Store, StoreConfig, Value};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = StoreConfig::default().with_snapshot_path("dump.json");
//!     let store = Store::open(config)?;
//!
//!     // 1 hour TTL
//!     store.set("country", "USA", Some(3600))?;
//!     assert_eq!(store.get("country"), Some(Value::from("USA")));
//!
//!     // Final snapshot
//!     store.close()?;
//!     Ok(())
//! }
//! ```

mod clock;
mod commands;
mod config;
mod entry;
mod snapshot;
mod store;

pub use commands::{execute, Command, Reply};
pub use config::{StoreConfig, DEFAULT_SNAPSHOT_PATH, DEFAULT_TTL};
pub use entry::{Entry, Value};
pub use snapshot::SnapshotError;
pub use store::{Store, StoreError};
