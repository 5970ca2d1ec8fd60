//! # Chronostate Face
//!
//! The named-data network as the state server sees it: register a prefix,
//! receive interests under it, publish data packets. Consumers express
//! interests and wait for data.
//!
//! Real deployments plug a forwarder client in behind [`Face`] and
//! [`Consumer`]; [`MemoryFace`] is an in-process forwarder for tests.
//!
//! ## Message Flow
//!
//! ```text
//! Consumer                 Face                   Producer
//!   |--- Interest ---------->|                        |
//!   |                        |--- handler(prefix) --->|
//!   |                        |<------ put_data -------|
//!   |<-------- Data ---------|                        |
//! ```

pub mod error;
pub mod face;
pub mod packet;

pub use error::{FaceError, Result};
pub use face::{memory::MemoryFace, Consumer, Face, InterestHandler, RegisteredPrefixId};
pub use packet::{Data, Interest};
