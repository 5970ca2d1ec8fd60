//! # Chronostate Core
//!
//! Pure primitives for the chronostate state server: hierarchical names,
//! content fingerprints, the records served to local consumers, and the
//! segment encoder that pages listings into bounded responses.
//!
//! This crate contains no I/O, no storage, no networking.
//!
//! ## Key Types
//!
//! - [`Name`] / [`Component`] - Hierarchical request and response names
//! - [`Fingerprint`] - BLAKE3 digest identifying one file version's content
//! - [`ActionRecord`] - One historical mutation of a tracked file
//! - [`FileStateRecord`] - Current state of one tracked file
//! - [`SyncNodeView`] - One peer's known sequence number
//! - [`Segment`] - A bounded page of an ordered listing
//!
//! ## Segmentation
//!
//! ```rust
//! use chronostate_core::segment::{encode, PAGE_LIMIT};
//!
//! let segments = encode((0..250).collect::<Vec<u32>>(), PAGE_LIMIT);
//! assert_eq!(segments.len(), 3);
//! assert_eq!(segments[0].last_index, 2);
//! assert!(segments[2].is_final());
//! ```

pub mod codec;
pub mod error;
pub mod name;
pub mod records;
pub mod segment;
pub mod types;

pub use codec::{
    decode_payload, encode_payload, ActionsPayload, FilesPayload, PayloadFormat, RestoreStatus,
    StatePayload,
};
pub use error::{CoreError, Result};
pub use name::{Component, Name};
pub use records::{newest_first, ActionKind, ActionRecord, ActionRef, FileStateRecord, SyncNodeView};
pub use segment::{Segment, PAGE_LIMIT};
pub use types::{DeviceName, Fingerprint, SeqNo, Version};
