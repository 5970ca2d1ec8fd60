//! # Chronostate Testkit
//!
//! Testing utilities for chronostate.
//!
//! - **Golden vectors**: fixed segmentation and name-spelling cases
//! - **Generators**: Proptest strategies for records and action histories
//! - **Fixtures**: a memory store, memory face and scratch folder in one
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use chronostate_testkit::generators::ActionParams;
//!
//! proptest! {
//!     #[test]
//!     fn actions_validate(params: ActionParams) {
//!         prop_assert!(params.to_new_action().validate().is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use chronostate_testkit::fixtures::TestFixture;
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let fixture = TestFixture::new();
//! let fingerprints = fixture.record_versions("notes.txt", &[b"v0", b"v1"]).await;
//! assert_eq!(fingerprints.len(), 2);
//! # });
//! ```

pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fixtures::{multi_device_fixtures, random_content, TestFixture};
pub use generators::{history, ActionParams};
pub use vectors::{name_vectors, segment_vectors, verify_all_vectors, NameVector, SegmentVector};
