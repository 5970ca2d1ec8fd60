//! Proptest generators for property-based testing.

use proptest::prelude::*;

use chronostate_core::{
    ActionKind, ActionRecord, ActionRef, Component, DeviceName, FileStateRecord, Fingerprint,
    Name,
};
use chronostate_store::NewAction;

/// Generate a name component of printable ASCII.
pub fn component() -> impl Strategy<Value = Component> {
    "[a-zA-Z0-9._~-]{1,12}".prop_map(|s| Component::from_text(&s))
}

/// Generate a device name of one to three components.
pub fn device_name() -> impl Strategy<Value = DeviceName> {
    prop::collection::vec(component(), 1..=3)
        .prop_map(|components| Name::from_components(components))
}

/// Generate a bare file name.
pub fn filename() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}\\.(txt|md|bin)".prop_map(String::from)
}

/// Generate a random Fingerprint.
pub fn fingerprint() -> impl Strategy<Value = Fingerprint> {
    any::<[u8; 32]>().prop_map(Fingerprint::from_bytes)
}

/// Generate an ActionKind.
pub fn action_kind() -> impl Strategy<Value = ActionKind> {
    prop_oneof![3 => Just(ActionKind::Update), 1 => Just(ActionKind::Delete)]
}

/// Generate a reasonable timestamp, coarse enough to produce ties.
pub fn timestamp() -> impl Strategy<Value = i64> {
    (0i64..50).prop_map(|t| 1_700_000_000_000 + t * 1000)
}

/// Parameters for one action to append.
#[derive(Debug, Clone)]
pub struct ActionParams {
    pub device: DeviceName,
    pub filename: String,
    pub kind: ActionKind,
    pub timestamp: i64,
    pub content: Vec<u8>,
}

impl ActionParams {
    /// The action to append. Updates carry the fingerprint of `content`.
    pub fn to_new_action(&self) -> NewAction {
        match self.kind {
            ActionKind::Update => NewAction::update(
                self.device.clone(),
                self.filename.clone(),
                Fingerprint::of(&self.content),
            ),
            ActionKind::Delete => NewAction::delete(self.device.clone(), self.filename.clone()),
        }
        .at(self.timestamp)
    }
}

impl Arbitrary for ActionParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            device_name(),
            filename(),
            action_kind(),
            timestamp(),
            prop::collection::vec(any::<u8>(), 0..64),
        )
            .prop_map(|(device, filename, kind, timestamp, content)| ActionParams {
                device,
                filename,
                kind,
                timestamp,
                content,
            })
            .boxed()
    }
}

/// Generate a history of actions over a small pool of devices and files,
/// so that files see several versions.
pub fn history(max_len: usize) -> impl Strategy<Value = Vec<ActionParams>> {
    (
        prop::collection::vec(device_name(), 1..=3),
        prop::collection::vec(filename(), 1..=4),
    )
        .prop_flat_map(move |(devices, files)| {
            let action = (
                prop::sample::select(devices),
                prop::sample::select(files),
                action_kind(),
                timestamp(),
                prop::collection::vec(any::<u8>(), 0..16),
            )
                .prop_map(|(device, filename, kind, timestamp, content)| ActionParams {
                    device,
                    filename,
                    kind,
                    timestamp,
                    content,
                });
            prop::collection::vec(action, 0..=max_len)
        })
}

/// Generate a standalone ActionRecord with an arbitrary log position.
pub fn action_record() -> impl Strategy<Value = ActionRecord> {
    (
        any::<ActionParams>(),
        0u64..1000,
        0u64..1000,
        1u64..100_000,
    )
        .prop_map(|(params, seq_no, version, log_position)| ActionRecord {
            fingerprint: (params.kind == ActionKind::Update)
                .then(|| Fingerprint::of(&params.content)),
            device: params.device,
            seq_no,
            kind: params.kind,
            filename: params.filename,
            version,
            timestamp: params.timestamp,
            mtime: 0,
            mode: 0o644,
            segment_count: 1,
            parent: None,
            log_position,
        })
}

/// Generate a FileStateRecord.
pub fn file_state_record() -> impl Strategy<Value = FileStateRecord> {
    (filename(), 0u64..1000, fingerprint(), device_name(), 0u64..1000).prop_map(
        |(filename, version, fingerprint, device, seq_no)| FileStateRecord {
            filename,
            version,
            fingerprint,
            owner: ActionRef { device, seq_no },
            mtime: 0,
            mode: 0o644,
            segment_count: 1,
        },
    )
}
