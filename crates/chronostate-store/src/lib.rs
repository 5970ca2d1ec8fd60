//! # Chronostate Store
//!
//! The collaborator interfaces the state server reads from, plus SQLite and
//! in-memory implementations.
//!
//! ## Key Types
//!
//! - [`ActionLog`] - Append-only history of file mutations
//! - [`FileStateIndex`] - Current state of every tracked file
//! - [`ObjectStore`] - Content-addressed file versions
//! - [`SyncStateSource`] - Per-device sequence numbers and forwarding hints
//! - [`SqliteStore`] - Persistent backend implementing all four
//! - [`MemoryStore`] - In-memory backend for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use chronostate_core::{Fingerprint, Name};
//! use chronostate_store::{ActionLog, NewAction, SqliteStore};
//!
//! async fn example() {
//!     let store = SqliteStore::open("state.db").unwrap();
//!     let device = Name::parse("/alice/laptop").unwrap();
//!
//!     let record = store
//!         .append_action(NewAction::update(device, "notes.txt", Fingerprint::of(b"hi")))
//!         .await
//!         .unwrap();
//!     assert_eq!(record.version, 0);
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Appends maintain the index**: an update upserts the file's state, a
//!   delete removes it, unless a newer version is already tracked.
//! - **Deterministic scans**: actions come back newest first with log
//!   position as the tie-break.

pub mod error;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{
    ActionLog, FileStateIndex, NewAction, ObjectStore, StateStore, Stores, SyncStateSource,
};
