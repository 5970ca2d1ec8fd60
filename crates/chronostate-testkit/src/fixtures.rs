//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use chronostate_core::{ActionRecord, DeviceName, Fingerprint, Name};
use chronostate_face::MemoryFace;
use chronostate_store::{ActionLog, MemoryStore, NewAction, ObjectStore, Stores};
use tempfile::TempDir;

/// A device, a memory store, a memory face and a scratch shared folder.
pub struct TestFixture {
    pub device: DeviceName,
    pub store: Arc<MemoryStore>,
    pub face: Arc<MemoryFace>,
    pub dir: TempDir,
}

impl TestFixture {
    /// Create a fixture for device `/test/device`.
    pub fn new() -> Self {
        Self::for_device(Name::new().append("test").append("device"))
    }

    pub fn for_device(device: DeviceName) -> Self {
        Self {
            device,
            store: Arc::new(MemoryStore::new()),
            face: MemoryFace::new(),
            dir: TempDir::new().unwrap_or_else(|e| panic!("failed to create temp dir: {e}")),
        }
    }

    /// Shared handles to the memory store.
    pub fn stores(&self) -> Stores {
        Stores::from_shared(self.store.clone())
    }

    /// The shared folder root.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path_of(&self, filename: &str) -> PathBuf {
        self.dir.path().join(filename)
    }

    /// Store each content in turn as a new version of `filename`.
    ///
    /// Version `i` gets content `versions[i]` and timestamp `i`. Returns the
    /// fingerprints in version order.
    pub async fn record_versions(&self, filename: &str, versions: &[&[u8]]) -> Vec<Fingerprint> {
        let mut fingerprints = Vec::with_capacity(versions.len());
        for (i, content) in versions.iter().enumerate() {
            let fingerprint = self
                .store
                .put_object(Bytes::copy_from_slice(content))
                .await
                .unwrap_or_else(|e| panic!("put_object failed: {e}"));
            self.store
                .append_action(
                    NewAction::update(self.device.clone(), filename, fingerprint).at(i as i64),
                )
                .await
                .unwrap_or_else(|e| panic!("append_action failed: {e}"));
            fingerprints.push(fingerprint);
        }
        fingerprints
    }

    /// Append `count` updates spread over a handful of files.
    ///
    /// Timestamps repeat every 7 actions so listings exercise the
    /// log-position tie-break.
    pub async fn populate_actions(&self, count: usize) -> Vec<ActionRecord> {
        let mut records = Vec::with_capacity(count);
        for i in 0..count {
            let filename = format!("file-{}.txt", i % 5);
            let fingerprint = Fingerprint::of(format!("content {i}").as_bytes());
            let record = self
                .store
                .append_action(
                    NewAction::update(self.device.clone(), filename, fingerprint)
                        .at((i / 7) as i64),
                )
                .await
                .unwrap_or_else(|e| panic!("append_action failed: {e}"));
            records.push(record);
        }
        records
    }

    /// Write `content` into the shared folder.
    pub fn write_file(&self, filename: &str, content: &[u8]) {
        std::fs::write(self.path_of(filename), content)
            .unwrap_or_else(|e| panic!("failed to write {filename}: {e}"));
    }

    /// Read a file from the shared folder, `None` if absent.
    pub fn read_file(&self, filename: &str) -> Option<Vec<u8>> {
        std::fs::read(self.path_of(filename)).ok()
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixtures for `count` distinct devices, `/test/device-<i>`.
pub fn multi_device_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| TestFixture::for_device(Name::new().append("test").append(format!("device-{i}"))))
        .collect()
}

/// Random content of `len` bytes.
pub fn random_content(len: usize) -> Vec<u8> {
    (0..len).map(|_| rand::random::<u8>()).collect()
}
