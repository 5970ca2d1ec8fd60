//! In-memory implementation of the store traits.
//!
//! Same semantics as SQLite, nothing persisted. All state sits behind one
//! `tokio::sync::RwLock`: listings and lookups share the read lock, appends
//! and index writes take the write lock. The lock is fair, so a waiting
//! writer holds back new readers until it has run.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;

use chronostate_core::{
    newest_first, ActionKind, ActionRecord, DeviceName, FileStateRecord, Fingerprint, Name,
    SeqNo, SyncNodeView, Version,
};

use crate::error::Result;
use crate::traits::{ActionLog, FileStateIndex, NewAction, ObjectStore, SyncStateSource};

/// In-memory store implementation.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Actions in log-position order.
    actions: Vec<ActionRecord>,

    /// Tracked files keyed by filename.
    files: BTreeMap<String, FileStateRecord>,

    /// Content keyed by fingerprint.
    objects: HashMap<Fingerprint, Bytes>,

    /// Fingerprint recorded for each (filename, version) update.
    versions: HashMap<(String, Version), Fingerprint>,

    /// Sync tree: highest seq and forwarding hint per device.
    nodes: BTreeMap<DeviceName, (Option<SeqNo>, Option<Name>)>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreInner {
    fn latest_for_file(&self, filename: &str) -> Option<&ActionRecord> {
        self.actions.iter().rev().find(|a| a.filename == filename)
    }

    fn next_seq_no(&self, device: &DeviceName) -> SeqNo {
        self.nodes
            .get(device)
            .and_then(|(seq, _)| *seq)
            .map_or(0, |seq| seq + 1)
    }

    fn apply_to_index(&mut self, record: &ActionRecord) {
        let current = self.files.get(&record.filename).map(|f| f.version);
        if current.is_some_and(|v| v > record.version) {
            return;
        }
        match (record.kind, record.fingerprint) {
            (ActionKind::Update, Some(fingerprint)) => {
                self.files.insert(
                    record.filename.clone(),
                    FileStateRecord {
                        filename: record.filename.clone(),
                        version: record.version,
                        fingerprint,
                        owner: record.action_ref(),
                        mtime: record.mtime,
                        mode: record.mode,
                        segment_count: record.segment_count,
                    },
                );
            }
            _ => {
                self.files.remove(&record.filename);
            }
        }
    }
}

#[async_trait]
impl ActionLog for MemoryStore {
    async fn append_action(&self, action: NewAction) -> Result<ActionRecord> {
        action.validate()?;
        let mut inner = self.inner.write().await;

        let parent = inner.latest_for_file(&action.filename);
        let version = action
            .version
            .unwrap_or_else(|| parent.map(|p| p.version + 1).unwrap_or(0));
        let parent = parent.map(ActionRecord::action_ref);
        let seq_no = action
            .seq_no
            .unwrap_or_else(|| inner.next_seq_no(&action.device));

        let record = ActionRecord {
            device: action.device,
            seq_no,
            kind: action.kind,
            filename: action.filename,
            version,
            timestamp: action.timestamp,
            fingerprint: action.fingerprint,
            mtime: action.mtime,
            mode: action.mode,
            segment_count: action.segment_count,
            parent,
            log_position: inner.actions.len() as u64 + 1,
        };

        if let (ActionKind::Update, Some(fingerprint)) = (record.kind, record.fingerprint) {
            inner
                .versions
                .insert((record.filename.clone(), record.version), fingerprint);
        }
        inner.apply_to_index(&record);

        let node = inner
            .nodes
            .entry(record.device.clone())
            .or_insert((None, None));
        node.0 = Some(node.0.map_or(seq_no, |seen| seen.max(seq_no)));

        inner.actions.push(record.clone());
        Ok(record)
    }

    async fn scan_actions(&self, filename: Option<&str>) -> Result<Vec<ActionRecord>> {
        let inner = self.inner.read().await;
        let mut actions: Vec<ActionRecord> = inner
            .actions
            .iter()
            .filter(|a| filename.map_or(true, |f| a.filename == f))
            .cloned()
            .collect();
        newest_first(&mut actions);
        Ok(actions)
    }

    async fn action_count(&self) -> Result<u64> {
        Ok(self.inner.read().await.actions.len() as u64)
    }
}

#[async_trait]
impl FileStateIndex for MemoryStore {
    async fn list_files(&self) -> Result<Vec<FileStateRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.files.values().cloned().collect())
    }

    async fn get_file(&self, filename: &str) -> Result<Option<FileStateRecord>> {
        let inner = self.inner.read().await;
        Ok(inner.files.get(filename).cloned())
    }

    async fn upsert_file(&self, record: &FileStateRecord) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.files.insert(record.filename.clone(), record.clone());
        Ok(())
    }

    async fn remove_file(&self, filename: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        Ok(inner.files.remove(filename).is_some())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, content: Bytes) -> Result<Fingerprint> {
        let fingerprint = Fingerprint::of(&content);
        let mut inner = self.inner.write().await;
        inner.objects.entry(fingerprint).or_insert(content);
        Ok(fingerprint)
    }

    async fn get_object(&self, fingerprint: &Fingerprint) -> Result<Option<Bytes>> {
        let inner = self.inner.read().await;
        Ok(inner.objects.get(fingerprint).cloned())
    }

    async fn lookup_version(&self, filename: &str, version: Version) -> Result<Option<Fingerprint>> {
        let inner = self.inner.read().await;
        Ok(inner.versions.get(&(filename.to_string(), version)).copied())
    }
}

#[async_trait]
impl SyncStateSource for MemoryStore {
    async fn sync_nodes(&self) -> Result<Vec<SyncNodeView>> {
        let inner = self.inner.read().await;
        Ok(inner
            .nodes
            .iter()
            .map(|(device, (seq_no, hint))| SyncNodeView {
                device: device.clone(),
                seq_no: *seq_no,
                forwarding_hint: hint.clone(),
            })
            .collect())
    }

    async fn set_forwarding_hint(&self, device: &DeviceName, hint: Option<Name>) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.nodes.entry(device.clone()).or_insert((None, None)).1 = hint;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> DeviceName {
        Name::parse("/alice/laptop").unwrap()
    }

    #[tokio::test]
    async fn test_append_assigns_versions_and_parents() {
        let store = MemoryStore::new();

        let v0 = store
            .append_action(NewAction::update(alice(), "a.txt", Fingerprint::of(b"0")).at(10))
            .await
            .unwrap();
        let v1 = store
            .append_action(NewAction::update(alice(), "a.txt", Fingerprint::of(b"1")).at(20))
            .await
            .unwrap();

        assert_eq!(v0.version, 0);
        assert_eq!(v1.version, 1);
        assert_eq!(v0.seq_no, 0);
        assert_eq!(v1.seq_no, 1);
        assert_eq!(v1.parent, Some(v0.action_ref()));
        assert_eq!(v1.log_position, 2);

        let file = store.get_file("a.txt").await.unwrap().unwrap();
        assert_eq!(file.version, 1);
        assert_eq!(file.fingerprint, Fingerprint::of(b"1"));
    }

    #[tokio::test]
    async fn test_delete_removes_file_state() {
        let store = MemoryStore::new();
        store
            .append_action(NewAction::update(alice(), "a.txt", Fingerprint::of(b"0")))
            .await
            .unwrap();
        store
            .append_action(NewAction::delete(alice(), "a.txt"))
            .await
            .unwrap();

        assert!(store.get_file("a.txt").await.unwrap().is_none());
        assert_eq!(store.action_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_stale_remote_update_does_not_regress_index() {
        let store = MemoryStore::new();
        let bob = Name::parse("/bob").unwrap();
        store
            .append_action(
                NewAction::update(alice(), "a.txt", Fingerprint::of(b"5")).with_version(5),
            )
            .await
            .unwrap();
        store
            .append_action(
                NewAction::update(bob, "a.txt", Fingerprint::of(b"2")).with_version(2),
            )
            .await
            .unwrap();

        assert_eq!(store.get_file("a.txt").await.unwrap().unwrap().version, 5);
        assert_eq!(
            store.lookup_version("a.txt", 2).await.unwrap(),
            Some(Fingerprint::of(b"2"))
        );
    }

    #[tokio::test]
    async fn test_scan_filter_and_order() {
        let store = MemoryStore::new();
        for (i, name) in ["a", "b", "a", "b"].iter().enumerate() {
            store
                .append_action(
                    NewAction::update(alice(), *name, Fingerprint::of(&[i as u8])).at(100),
                )
                .await
                .unwrap();
        }

        let all = store.scan_actions(None).await.unwrap();
        let positions: Vec<u64> = all.iter().map(|a| a.log_position).collect();
        assert_eq!(positions, vec![4, 3, 2, 1]);

        let only_a = store.scan_actions(Some("a")).await.unwrap();
        assert_eq!(only_a.len(), 2);
        assert!(only_a.iter().all(|a| a.filename == "a"));
        assert_eq!(only_a[0].log_position, 3);
    }

    #[tokio::test]
    async fn test_objects_are_content_addressed() {
        let store = MemoryStore::new();
        let fp = store.put_object(Bytes::from_static(b"hello")).await.unwrap();
        assert_eq!(fp, Fingerprint::of(b"hello"));
        assert_eq!(store.put_object(Bytes::from_static(b"hello")).await.unwrap(), fp);
        assert_eq!(
            store.get_object(&fp).await.unwrap(),
            Some(Bytes::from_static(b"hello"))
        );
        assert!(store.get_object(&Fingerprint::ZERO).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sync_nodes_track_highest_seq() {
        let store = MemoryStore::new();
        store
            .append_action(
                NewAction::update(alice(), "a", Fingerprint::of(b"a")).with_seq_no(7),
            )
            .await
            .unwrap();
        store
            .append_action(
                NewAction::update(alice(), "b", Fingerprint::of(b"b")).with_seq_no(3),
            )
            .await
            .unwrap();
        let hint = Name::parse("/site/ucla").unwrap();
        store
            .set_forwarding_hint(&alice(), Some(hint.clone()))
            .await
            .unwrap();

        let nodes = store.sync_nodes().await.unwrap();
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].seq_no, Some(7));
        assert_eq!(nodes[0].forwarding_hint, Some(hint));
    }

    #[tokio::test]
    async fn test_hint_before_first_action_keeps_seq_at_zero() {
        let store = MemoryStore::new();
        let hint = Name::parse("/site/ucla").unwrap();
        store
            .set_forwarding_hint(&alice(), Some(hint.clone()))
            .await
            .unwrap();

        let nodes = store.sync_nodes().await.unwrap();
        assert_eq!(nodes[0].seq_no, None);
        assert_eq!(nodes[0].forwarding_hint, Some(hint.clone()));

        let first = store
            .append_action(NewAction::update(alice(), "a", Fingerprint::of(b"a")))
            .await
            .unwrap();
        assert_eq!(first.seq_no, 0);

        let nodes = store.sync_nodes().await.unwrap();
        assert_eq!(nodes[0].seq_no, Some(0));
        assert_eq!(nodes[0].forwarding_hint, Some(hint));
    }
}
