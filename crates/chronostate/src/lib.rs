//! # Chronostate
//!
//! A request/response layer exposing a file-sync node's internal state to
//! local consumers over a named-data network.
//!
//! The server registers two prefixes, `/localhost/<device>/<app>/<folder>/info`
//! for queries and `.../cmd` for commands, and answers:
//!
//! - `info/state/<nonce>` - known devices and their sequence numbers
//! - `info/actions/all/<nonce>/<segment>` - action history, newest first
//! - `info/actions/file/<nonce>/<file>/<segment>` - history of one file
//! - `info/filestate/all/<nonce>/<segment>` - current state of tracked files
//! - `cmd/restore/file/<name>/<version>/<fingerprint>` - roll a file back
//!
//! Listings are published one segment per interest. Every segment carries
//! the index of the final segment, so the first fetch tells the consumer
//! how many more to make.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use chronostate::{StateClient, StateServer, StateServerConfig};
//! use chronostate_core::Name;
//! use chronostate_face::MemoryFace;
//! use chronostate_store::{SqliteStore, Stores};
//!
//! async fn example() -> chronostate::Result<()> {
//!     let face = MemoryFace::new();
//!     let store = Arc::new(SqliteStore::open("state.db")?);
//!     let config = StateServerConfig::new(Name::parse("/alice/laptop")?, "docs", "/home/alice/docs");
//!
//!     let server = StateServer::start(face.clone(), Stores::from_shared(store), config.clone()).await?;
//!
//!     let client = StateClient::new(face, &config);
//!     for file in client.files().await? {
//!         println!("{} v{}", file.filename, file.version);
//!     }
//!
//!     server.shutdown().await
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Non-blocking dispatch**: the face's delivery callback only routes and
//!   queues; scans and restores run on the server's worker pool.
//! - **Unknown names are ignored**: a name under our prefix that matches no
//!   route gets no response, as does a malformed restore.
//! - **Atomic restore**: content is verified against its fingerprint, then
//!   written to a temporary file and renamed into place.

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod scheduler;
pub mod server;

pub use client::StateClient;
pub use config::StateServerConfig;
pub use error::{ErrorKind, Result, ServerError};
pub use handlers::restore::{RestorePhase, RestoreRequest};
pub use router::{Request, RouteTable, Scope};
pub use scheduler::Scheduler;
pub use server::StateServer;
