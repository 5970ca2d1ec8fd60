//! Consumer-side helper for querying a state server.

use std::sync::Arc;
use std::time::Duration;

use chronostate_core::{
    decode_payload, ActionRecord, ActionsPayload, Component, FileStateRecord, FilesPayload,
    Fingerprint, Name, PayloadFormat, RestoreStatus, StatePayload, SyncNodeView, Version,
};
use chronostate_face::{Consumer, Data, Interest};
use serde::de::DeserializeOwned;

use crate::config::StateServerConfig;
use crate::error::{Result, ServerError};
use crate::handlers::restore::RestoreRequest;

/// Highest final segment index a listing may announce.
const MAX_LAST_SEGMENT: u64 = u32::MAX as u64;

/// Fetches listings segment by segment and reassembles them.
pub struct StateClient<C: Consumer> {
    consumer: Arc<C>,
    info_prefix: Name,
    cmd_prefix: Name,
    format: PayloadFormat,
    timeout: Duration,
}

impl<C: Consumer> StateClient<C> {
    /// A client for the server `config` describes.
    pub fn new(consumer: Arc<C>, config: &StateServerConfig) -> Self {
        Self {
            consumer,
            info_prefix: config.info_prefix(),
            cmd_prefix: config.cmd_prefix(),
            format: config.payload_format,
            timeout: Duration::from_secs(4),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Snapshot of every known device.
    pub async fn state(&self) -> Result<Vec<SyncNodeView>> {
        let name = self.info_prefix.clone().append("state").append(nonce());
        let data = self.fetch(name).await?;
        let payload: StatePayload = decode_payload(&data.content, self.format)?;
        Ok(payload.nodes)
    }

    /// The full action history, or the history of one file.
    pub async fn actions(&self, file: Option<&str>) -> Result<Vec<ActionRecord>> {
        let base = self.actions_base(file)?;
        let pages: Vec<ActionsPayload> = self.fetch_all(&base).await?;
        Ok(pages.into_iter().flat_map(|p| p.actions).collect())
    }

    /// One segment of the action history.
    pub async fn actions_segment(&self, file: Option<&str>, segment: u64) -> Result<ActionsPayload> {
        let name = self.actions_base(file)?.append_number(segment);
        let data = self.fetch(name).await?;
        Ok(decode_payload(&data.content, self.format)?)
    }

    /// Every tracked file.
    pub async fn files(&self) -> Result<Vec<FileStateRecord>> {
        let base = self
            .info_prefix
            .clone()
            .append("filestate")
            .append("all")
            .append(nonce());
        let pages: Vec<FilesPayload> = self.fetch_all(&base).await?;
        Ok(pages.into_iter().flat_map(|p| p.files).collect())
    }

    /// Ask the server to restore `filename` to `version`.
    pub async fn restore(
        &self,
        filename: &str,
        version: Version,
        fingerprint: Fingerprint,
    ) -> Result<RestoreStatus> {
        let request = RestoreRequest::new(filename, version, fingerprint);
        let name = request
            .to_components()
            .into_iter()
            .fold(
                self.cmd_prefix.clone().append("restore").append("file"),
                |name, component| name.append(component),
            );
        let data = self.fetch(name).await?;
        Ok(decode_payload(&data.content, self.format)?)
    }

    fn actions_base(&self, file: Option<&str>) -> Result<Name> {
        let base = self.info_prefix.clone().append("actions");
        let Some(file) = file else {
            return Ok(base.append("all").append(nonce()));
        };
        let parts: Vec<&str> = file.split('/').filter(|part| !part.is_empty()).collect();
        if parts.is_empty() {
            return Err(ServerError::MalformedRequest(format!(
                "file filter {file:?} names no file"
            )));
        }
        Ok(parts
            .into_iter()
            .fold(base.append("file").append(nonce()), |name, part| name.append(part)))
    }

    /// Fetch segment 0, then every segment up to the final one it names.
    async fn fetch_all<P: DeserializeOwned>(&self, base: &Name) -> Result<Vec<P>> {
        let first = self.fetch(base.clone().append_number(0)).await?;
        let last = first.final_segment().unwrap_or(0);
        if last > MAX_LAST_SEGMENT {
            return Err(ServerError::BadResponse {
                name: first.name.to_string(),
                reason: format!("final segment {last} out of range"),
            });
        }

        let mut pages = Vec::new();
        pages.push(decode_payload(&first.content, self.format)?);
        for segment in 1..=last {
            let data = self.fetch(base.clone().append_number(segment)).await?;
            pages.push(decode_payload(&data.content, self.format)?);
        }
        Ok(pages)
    }

    async fn fetch(&self, name: Name) -> Result<Data> {
        let interest = Interest::new(name.clone()).with_nonce(rand::random());
        self.consumer
            .express_interest(interest, self.timeout)
            .await?
            .ok_or_else(|| ServerError::NoResponse(name.to_string()))
    }
}

fn nonce() -> Component {
    Component::from_number(rand::random::<u64>())
}
