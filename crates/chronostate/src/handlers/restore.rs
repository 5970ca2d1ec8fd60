//! `restore/file/<relative-name>/<version>/<fingerprint>`: roll a tracked
//! file back to a recorded version.
//!
//! A restore moves through `Received → Validating → Applying → Done`, or
//! ends `Rejected` at any step. The file on disk is only ever replaced by
//! an atomic rename, so a failed restore leaves the previous content intact.
//! Restores of the same file are serialized; different files do not contend.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use chronostate_core::{
    ActionKind, ActionRef, Component, DeviceName, FileStateRecord, Fingerprint, Name,
    RestoreStatus, Version,
};
use chronostate_store::Stores;
use tempfile::NamedTempFile;
use tokio::sync::OwnedMutexGuard;

use crate::error::{ErrorKind, Result, ServerError};
use crate::server::ServerContext;

/// Parsed restore parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreRequest {
    /// Bare file name relative to the shared folder root.
    pub filename: String,
    pub version: Version,
    /// Expected fingerprint of the version's content.
    pub fingerprint: Fingerprint,
}

impl RestoreRequest {
    pub fn new(filename: impl Into<String>, version: Version, fingerprint: Fingerprint) -> Self {
        Self {
            filename: filename.into(),
            version,
            fingerprint,
        }
    }

    /// Parse `<relative-name>/<version>/<fingerprint>`.
    ///
    /// The fingerprint may be 32 raw bytes or 64 hex characters.
    pub fn parse(args: &[Component]) -> Result<Self> {
        let [file, version, fingerprint] = args else {
            return Err(ServerError::MalformedRequest(format!(
                "restore takes 3 parameters, got {}",
                args.len()
            )));
        };

        let filename = file
            .to_utf8()
            .filter(|s| is_bare_file_name(s))
            .ok_or_else(|| ServerError::MalformedRequest(format!("not a bare file name: {file}")))?;
        let version = version
            .to_number()
            .ok_or_else(|| ServerError::MalformedRequest(format!("bad version: {version}")))?;
        let fingerprint = parse_fingerprint(fingerprint).ok_or_else(|| {
            ServerError::MalformedRequest(format!("bad fingerprint: {fingerprint}"))
        })?;

        Ok(Self::new(filename, version, fingerprint))
    }

    /// The name components this request parses from.
    pub fn to_components(&self) -> Vec<Component> {
        vec![
            Component::from_text(&self.filename),
            Component::from_number(self.version),
            Component::from_text(&self.fingerprint.to_hex()),
        ]
    }
}

fn is_bare_file_name(s: &str) -> bool {
    !s.is_empty() && s != "." && s != ".." && !s.contains(['/', '\\', '\0'])
}

fn parse_fingerprint(component: &Component) -> Option<Fingerprint> {
    if component.len() == 32 {
        return Fingerprint::try_from(component.as_bytes()).ok();
    }
    Fingerprint::from_hex(component.to_utf8()?).ok()
}

/// Progress of one restore, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestorePhase {
    Received,
    Validating,
    Applying,
    Done,
    Rejected(ErrorKind),
}

fn enter(filename: &str, phase: RestorePhase) {
    tracing::debug!(file = filename, ?phase, "restore");
}

/// Per-file restore locks.
#[derive(Default)]
pub(crate) struct RestoreLocks {
    files: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl RestoreLocks {
    /// Wait until no other restore of `filename` is running.
    pub(crate) async fn lock(&self, filename: &str) -> RestoreGuard<'_> {
        let entry = self
            .files
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(filename.to_string())
            .or_default()
            .clone();
        let guard = entry.lock_owned().await;
        RestoreGuard {
            locks: self,
            filename: filename.to_string(),
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.files.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

pub(crate) struct RestoreGuard<'a> {
    locks: &'a RestoreLocks,
    filename: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut files = self.locks.files.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map still holds it: nobody is waiting.
        if files
            .get(&self.filename)
            .is_some_and(|entry| Arc::strong_count(entry) == 1)
        {
            files.remove(&self.filename);
        }
    }
}

/// Validate `request` and write the version into `root`.
///
/// On success the file-state index already reflects the restored version
/// when this returns.
pub async fn restore(
    stores: &Stores,
    root: &Path,
    device: &DeviceName,
    request: &RestoreRequest,
) -> Result<FileStateRecord> {
    let filename = &request.filename;
    enter(filename, RestorePhase::Validating);

    let not_found = || ServerError::NotFound {
        filename: filename.clone(),
        version: request.version,
    };

    let recorded = stores
        .objects
        .lookup_version(filename, request.version)
        .await?
        .ok_or_else(not_found)?;
    if recorded != request.fingerprint {
        return Err(ServerError::IntegrityMismatch {
            filename: filename.clone(),
            expected: request.fingerprint,
            actual: recorded,
        });
    }

    let content = stores
        .objects
        .get_object(&recorded)
        .await?
        .ok_or_else(not_found)?;
    let actual = Fingerprint::of(&content);
    if actual != recorded {
        return Err(ServerError::IntegrityMismatch {
            filename: filename.clone(),
            expected: recorded,
            actual,
        });
    }

    let origin = stores
        .actions
        .scan_actions(Some(filename))
        .await?
        .into_iter()
        .find(|a| a.kind == ActionKind::Update && a.version == request.version);

    enter(filename, RestorePhase::Applying);
    let mode = origin.as_ref().map_or(0, |a| a.mode);
    let target = root.join(filename);
    let written = apply(target, content, recorded, mode)
        .await
        .map_err(|source| ServerError::ApplyFailed {
            filename: filename.clone(),
            source,
        })?;
    if !written {
        tracing::debug!(file = %filename, "content already matches, write skipped");
    }

    let record = FileStateRecord {
        filename: filename.clone(),
        version: request.version,
        fingerprint: recorded,
        owner: origin.as_ref().map_or_else(
            || ActionRef {
                device: device.clone(),
                seq_no: 0,
            },
            |a| a.action_ref(),
        ),
        mtime: now_secs(),
        mode: if mode == 0 { 0o644 } else { mode },
        segment_count: origin.as_ref().map_or(1, |a| a.segment_count),
    };
    stores.files.upsert_file(&record).await?;

    enter(filename, RestorePhase::Done);
    Ok(record)
}

/// Write `content` to `target` unless it is already there.
///
/// Returns whether anything was written.
async fn apply(
    target: PathBuf,
    content: Bytes,
    fingerprint: Fingerprint,
    mode: u32,
) -> std::io::Result<bool> {
    tokio::task::spawn_blocking(move || {
        if let Ok(existing) = std::fs::read(&target) {
            if Fingerprint::of(&existing) == fingerprint {
                return Ok(false);
            }
        }
        write_atomically(&target, &content, mode)?;
        Ok(true)
    })
    .await
    .map_err(std::io::Error::other)?
}

/// Write to a temporary file beside `target`, then rename over it.
fn write_atomically(target: &Path, content: &[u8], mode: u32) -> std::io::Result<()> {
    let dir = target
        .parent()
        .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::InvalidInput, "no parent directory"))?;
    std::fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;

    #[cfg(unix)]
    if mode != 0 {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(mode & 0o7777))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

pub(crate) async fn execute(ctx: &ServerContext, name: &Name, args: &[Component]) -> Result<()> {
    let request = match RestoreRequest::parse(args) {
        Ok(request) => request,
        Err(e) => {
            // May belong to some other consumer of the namespace.
            tracing::debug!(name = %name, error = %e, "dropping malformed restore");
            return Ok(());
        }
    };
    enter(&request.filename, RestorePhase::Received);

    let _guard = ctx.restore_locks.lock(&request.filename).await;
    tracing::info!(file = %request.filename, version = request.version, "restoring file");

    let result = restore(
        &ctx.stores,
        &ctx.config.root_dir,
        &ctx.config.device_name,
        &request,
    )
    .await;

    let status = match result {
        Ok(record) => {
            tracing::info!(file = %record.filename, version = record.version, "file restored");
            RestoreStatus::Ok
        }
        Err(e) => {
            let kind = e.kind().unwrap_or(ErrorKind::ApplyFailed);
            enter(&request.filename, RestorePhase::Rejected(kind));
            tracing::warn!(file = %request.filename, version = request.version, error = %e, "restore rejected");
            RestoreStatus::Failed {
                kind: kind.as_str().to_string(),
                message: e.to_string(),
            }
        }
    };

    ctx.publish_outcome(name, &status).await
}
