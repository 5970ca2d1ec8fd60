//! Records served by the state server: actions, file states and sync nodes.

use serde::{Deserialize, Serialize};

use crate::name::Name;
use crate::types::{DeviceName, Fingerprint, SeqNo, Version};

/// What an action did to its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Update,
    Delete,
}

impl ActionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "update" => Some(ActionKind::Update),
            "delete" => Some(ActionKind::Delete),
            _ => None,
        }
    }
}

/// Identity of one action: the device that produced it and its sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionRef {
    pub device: DeviceName,
    pub seq_no: SeqNo,
}

/// One historical mutation of a tracked file. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Device that performed the action.
    pub device: DeviceName,
    /// Sequence number within that device's log.
    pub seq_no: SeqNo,
    pub kind: ActionKind,
    /// Path relative to the shared folder root.
    pub filename: String,
    pub version: Version,
    /// Unix milliseconds at which the action was recorded.
    pub timestamp: i64,
    /// Content fingerprint. Present for updates, absent for deletes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fingerprint: Option<Fingerprint>,
    #[serde(default)]
    pub mtime: i64,
    #[serde(default)]
    pub mode: u32,
    /// Number of content segments in the object store.
    #[serde(default)]
    pub segment_count: u64,
    /// The previous action on the same file, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ActionRef>,
    /// Store-assigned insertion counter; breaks timestamp ties.
    pub log_position: u64,
}

impl ActionRecord {
    pub fn action_ref(&self) -> ActionRef {
        ActionRef {
            device: self.device.clone(),
            seq_no: self.seq_no,
        }
    }
}

/// Sort actions into listing order: newest timestamp first, later insertion
/// first among equal timestamps.
pub fn newest_first(actions: &mut [ActionRecord]) {
    actions.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| b.log_position.cmp(&a.log_position))
    });
}

/// Current state of one tracked file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStateRecord {
    pub filename: String,
    pub version: Version,
    pub fingerprint: Fingerprint,
    /// The action that produced this state.
    pub owner: ActionRef,
    #[serde(default)]
    pub mtime: i64,
    #[serde(default)]
    pub mode: u32,
    #[serde(default)]
    pub segment_count: u64,
}

/// One peer's known state in the sync tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncNodeView {
    pub device: DeviceName,
    /// Highest sequence number seen from this device; `None` for a device
    /// known only through its forwarding hint.
    #[serde(default)]
    pub seq_no: Option<SeqNo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forwarding_hint: Option<Name>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn action(timestamp: i64, log_position: u64) -> ActionRecord {
        ActionRecord {
            device: Name::parse("/alice").unwrap(),
            seq_no: log_position,
            kind: ActionKind::Update,
            filename: "a.txt".into(),
            version: log_position,
            timestamp,
            fingerprint: Some(Fingerprint::of(&log_position.to_be_bytes())),
            mtime: 0,
            mode: 0o644,
            segment_count: 1,
            parent: None,
            log_position,
        }
    }

    #[test]
    fn test_newest_first_orders_by_timestamp() {
        let mut actions = vec![action(10, 1), action(30, 2), action(20, 3)];
        newest_first(&mut actions);
        let ts: Vec<i64> = actions.iter().map(|a| a.timestamp).collect();
        assert_eq!(ts, vec![30, 20, 10]);
    }

    #[test]
    fn test_newest_first_breaks_ties_by_log_position() {
        let mut actions = vec![action(10, 1), action(10, 3), action(10, 2)];
        newest_first(&mut actions);
        let pos: Vec<u64> = actions.iter().map(|a| a.log_position).collect();
        assert_eq!(pos, vec![3, 2, 1]);
    }

    #[test]
    fn test_action_kind_str() {
        assert_eq!(ActionKind::parse("update"), Some(ActionKind::Update));
        assert_eq!(ActionKind::parse(ActionKind::Delete.as_str()), Some(ActionKind::Delete));
        assert_eq!(ActionKind::parse("rename"), None);
    }

    #[test]
    fn test_delete_omits_fingerprint_in_json() {
        let mut a = action(1, 1);
        a.kind = ActionKind::Delete;
        a.fingerprint = None;
        let json = serde_json::to_value(&a).unwrap();
        assert!(json.get("fingerprint").is_none());
        assert_eq!(json["kind"], "delete");
    }
}
