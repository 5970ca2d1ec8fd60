//! Response payload encoding.
//!
//! Every response packet carries one serde-encoded payload. JSON is the
//! default so local consumers (scripts, web views) can read responses
//! directly; CBOR is available for compact binary consumers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::records::{ActionRecord, FileStateRecord, SyncNodeView};
use crate::segment::Segment;

/// Wire format of response payloads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadFormat {
    #[default]
    Json,
    Cbor,
}

/// Response to a `state` query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatePayload {
    pub nodes: Vec<SyncNodeView>,
}

/// One segment of an `actions` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionsPayload {
    pub segment: u64,
    pub last_segment: u64,
    pub actions: Vec<ActionRecord>,
}

impl From<Segment<ActionRecord>> for ActionsPayload {
    fn from(seg: Segment<ActionRecord>) -> Self {
        Self {
            segment: seg.index,
            last_segment: seg.last_index,
            actions: seg.records,
        }
    }
}

/// One segment of a `filestate` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilesPayload {
    pub segment: u64,
    pub last_segment: u64,
    pub files: Vec<FileStateRecord>,
}

impl From<Segment<FileStateRecord>> for FilesPayload {
    fn from(seg: Segment<FileStateRecord>) -> Self {
        Self {
            segment: seg.index,
            last_segment: seg.last_index,
            files: seg.records,
        }
    }
}

/// Outcome of a restore command, published under the command's name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RestoreStatus {
    Ok,
    Failed { kind: String, message: String },
}

impl RestoreStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, RestoreStatus::Ok)
    }
}

/// Encode a payload in the given format.
pub fn encode_payload<T: Serialize>(value: &T, format: PayloadFormat) -> Result<Vec<u8>> {
    match format {
        PayloadFormat::Json => {
            serde_json::to_vec(value).map_err(|e| CoreError::Encoding(e.to_string()))
        }
        PayloadFormat::Cbor => {
            let mut buf = Vec::new();
            ciborium::into_writer(value, &mut buf)
                .map_err(|e| CoreError::Encoding(e.to_string()))?;
            Ok(buf)
        }
    }
}

/// Decode a payload in the given format.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8], format: PayloadFormat) -> Result<T> {
    match format {
        PayloadFormat::Json => {
            serde_json::from_slice(bytes).map_err(|e| CoreError::Decoding(e.to_string()))
        }
        PayloadFormat::Cbor => {
            ciborium::from_reader(bytes).map_err(|e| CoreError::Decoding(e.to_string()))
        }
    }
}
