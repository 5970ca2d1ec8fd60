//! Store traits: the abstract interfaces the state server reads from.
//!
//! The history store, tracked-file index and object store are owned by the
//! surrounding sync node; the state server only holds shared references.
//! Implementations must be safe for many concurrent readers and serialize
//! writers internally.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chronostate_core::{
    ActionKind, ActionRecord, DeviceName, FileStateRecord, Fingerprint, Name, SeqNo,
    SyncNodeView, Version,
};

use crate::error::{Result, StoreError};

/// An action to append to the log.
///
/// `seq_no` and `version` are assigned by the store when left as `None`:
/// the device's next sequence number, and the file's next version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    pub device: DeviceName,
    pub seq_no: Option<SeqNo>,
    pub kind: ActionKind,
    pub filename: String,
    pub version: Option<Version>,
    pub timestamp: i64,
    pub fingerprint: Option<Fingerprint>,
    pub mtime: i64,
    pub mode: u32,
    pub segment_count: u64,
}

impl NewAction {
    /// An update of `filename` to content with the given fingerprint.
    pub fn update(device: DeviceName, filename: impl Into<String>, fingerprint: Fingerprint) -> Self {
        Self {
            device,
            seq_no: None,
            kind: ActionKind::Update,
            filename: filename.into(),
            version: None,
            timestamp: 0,
            fingerprint: Some(fingerprint),
            mtime: 0,
            mode: 0o644,
            segment_count: 1,
        }
    }

    /// A deletion of `filename`.
    pub fn delete(device: DeviceName, filename: impl Into<String>) -> Self {
        Self {
            device,
            seq_no: None,
            kind: ActionKind::Delete,
            filename: filename.into(),
            version: None,
            timestamp: 0,
            fingerprint: None,
            mtime: 0,
            mode: 0,
            segment_count: 0,
        }
    }

    pub fn at(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_version(mut self, version: Version) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_seq_no(mut self, seq_no: SeqNo) -> Self {
        self.seq_no = Some(seq_no);
        self
    }

    /// Reject updates without a fingerprint.
    pub fn validate(&self) -> Result<()> {
        if self.filename.is_empty() {
            return Err(StoreError::InvalidData("empty filename".into()));
        }
        if self.kind == ActionKind::Update && self.fingerprint.is_none() {
            return Err(StoreError::InvalidData(format!(
                "update of {} has no fingerprint",
                self.filename
            )));
        }
        Ok(())
    }
}

/// Append-only history of file mutations.
#[async_trait]
pub trait ActionLog: Send + Sync {
    /// Append an action.
    ///
    /// Assigns the log position (and any missing sequence number or
    /// version), updates the tracked-file index and the device's sync-node
    /// sequence number, and returns the stored record.
    async fn append_action(&self, action: NewAction) -> Result<ActionRecord>;

    /// All actions, optionally only those for one file, newest first.
    ///
    /// Ties on timestamp are broken by log position, later first, so
    /// repeated scans of an unchanged log return identical sequences.
    async fn scan_actions(&self, filename: Option<&str>) -> Result<Vec<ActionRecord>>;

    /// Number of actions in the log.
    async fn action_count(&self) -> Result<u64>;
}

/// Index of currently tracked files; at most one record per filename.
#[async_trait]
pub trait FileStateIndex: Send + Sync {
    /// All tracked files ordered by filename.
    async fn list_files(&self) -> Result<Vec<FileStateRecord>>;

    async fn get_file(&self, filename: &str) -> Result<Option<FileStateRecord>>;

    /// Insert or replace the record for `record.filename`.
    async fn upsert_file(&self, record: &FileStateRecord) -> Result<()>;

    /// Stop tracking a file. Returns whether a record existed.
    async fn remove_file(&self, filename: &str) -> Result<bool>;
}

/// Content-addressed object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store content, returning its fingerprint. Idempotent.
    async fn put_object(&self, content: Bytes) -> Result<Fingerprint>;

    async fn get_object(&self, fingerprint: &Fingerprint) -> Result<Option<Bytes>>;

    /// The fingerprint recorded for `version` of `filename`, if that version
    /// was ever produced by an update.
    async fn lookup_version(&self, filename: &str, version: Version) -> Result<Option<Fingerprint>>;
}

/// Membership and sequence-number view of the sync tree.
#[async_trait]
pub trait SyncStateSource: Send + Sync {
    /// Point-in-time view of every known device, ordered by device name.
    async fn sync_nodes(&self) -> Result<Vec<SyncNodeView>>;

    /// Record (or clear) the forwarding hint for a device.
    async fn set_forwarding_hint(&self, device: &DeviceName, hint: Option<Name>) -> Result<()>;
}

/// A single backend implementing every collaborator interface.
pub trait StateStore: ActionLog + FileStateIndex + ObjectStore + SyncStateSource {}

impl<S: ActionLog + FileStateIndex + ObjectStore + SyncStateSource> StateStore for S {}

/// Shared handles to the four collaborators.
///
/// Cloning is cheap; every clone refers to the same underlying stores.
#[derive(Clone)]
pub struct Stores {
    pub actions: Arc<dyn ActionLog>,
    pub files: Arc<dyn FileStateIndex>,
    pub objects: Arc<dyn ObjectStore>,
    pub sync: Arc<dyn SyncStateSource>,
}

impl Stores {
    /// Use one backend for all four collaborators.
    pub fn from_shared<S: StateStore + 'static>(store: Arc<S>) -> Self {
        Self {
            actions: store.clone(),
            files: store.clone(),
            objects: store.clone(),
            sync: store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_requires_fingerprint() {
        let device = Name::parse("/alice").unwrap();
        let mut action = NewAction::update(device.clone(), "a.txt", Fingerprint::of(b"x"));
        assert!(action.validate().is_ok());

        action.fingerprint = None;
        assert!(matches!(action.validate(), Err(StoreError::InvalidData(_))));

        assert!(NewAction::delete(device.clone(), "a.txt").validate().is_ok());
        assert!(NewAction::delete(device, "").validate().is_err());
    }
}
