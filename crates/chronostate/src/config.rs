//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use chronostate_core::{Component, Name, PayloadFormat, PAGE_LIMIT};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ServerError};

/// Local scope every prefix lives under.
pub const LOCALHOST: &str = "localhost";

/// Default application name.
pub const DEFAULT_APP_NAME: &str = "chronoshare";

/// Configuration for a [`StateServer`](crate::StateServer).
///
/// Loadable from JSON; `freshness` is given in milliseconds:
///
/// ```rust
/// use chronostate::StateServerConfig;
///
/// let config = StateServerConfig::from_json(
///     r#"{"device_name": "/alice/laptop", "shared_folder": "docs", "freshness": 1000}"#,
/// )
/// .unwrap();
/// assert_eq!(config.info_prefix().to_string(), "/localhost/alice/laptop/chronoshare/docs/info");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateServerConfig {
    /// This node's identity.
    pub device_name: Name,
    /// Name of the shared folder being served.
    pub shared_folder: String,
    pub app_name: String,
    /// Directory restored files are written into.
    pub root_dir: PathBuf,
    /// Freshness period put on every response. `None` leaves it unset.
    #[serde(with = "millis")]
    pub freshness: Option<Duration>,
    /// Maximum records per segment.
    pub page_limit: usize,
    /// Number of scheduler workers.
    pub workers: usize,
    pub payload_format: PayloadFormat,
}

impl Default for StateServerConfig {
    fn default() -> Self {
        Self {
            device_name: Name::new(),
            shared_folder: String::new(),
            app_name: DEFAULT_APP_NAME.to_string(),
            root_dir: PathBuf::from("."),
            freshness: None,
            page_limit: PAGE_LIMIT,
            workers: 2,
            payload_format: PayloadFormat::Json,
        }
    }
}

impl StateServerConfig {
    /// Create a config for `device_name` serving `shared_folder` from `root_dir`.
    pub fn new(device_name: Name, shared_folder: impl Into<String>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            device_name,
            shared_folder: shared_folder.into(),
            root_dir: root_dir.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a JSON config document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_freshness(mut self, freshness: Duration) -> Self {
        self.freshness = Some(freshness);
        self
    }

    pub fn with_page_limit(mut self, page_limit: usize) -> Self {
        self.page_limit = page_limit;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_payload_format(mut self, format: PayloadFormat) -> Self {
        self.payload_format = format;
        self
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    /// Check the values a server cannot start with.
    pub fn validate(&self) -> Result<()> {
        if self.device_name.is_empty() {
            return Err(ServerError::Config("device_name is empty".into()));
        }
        if self.shared_folder.is_empty() {
            return Err(ServerError::Config("shared_folder is empty".into()));
        }
        if self.app_name.is_empty() {
            return Err(ServerError::Config("app_name is empty".into()));
        }
        if self.page_limit == 0 {
            return Err(ServerError::Config("page_limit must be positive".into()));
        }
        if self.workers == 0 {
            return Err(ServerError::Config("workers must be positive".into()));
        }
        Ok(())
    }

    /// `/localhost/<device>/<app>/<shared folder>`
    fn scope(&self) -> Name {
        Name::new()
            .append(LOCALHOST)
            .append_name(&self.device_name)
            .append(Component::from_text(&self.app_name))
            .append(Component::from_text(&self.shared_folder))
    }

    /// Prefix for queries.
    pub fn info_prefix(&self) -> Name {
        self.scope().append("info")
    }

    /// Prefix for commands.
    pub fn cmd_prefix(&self) -> Name {
        self.scope().append("cmd")
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        value
            .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
            .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StateServerConfig::default();
        assert_eq!(config.app_name, "chronoshare");
        assert_eq!(config.page_limit, 100);
        assert_eq!(config.freshness, None);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_prefixes() {
        let config = StateServerConfig::new(Name::parse("/alice/laptop").unwrap(), "docs", "/tmp");
        assert_eq!(
            config.info_prefix().to_string(),
            "/localhost/alice/laptop/chronoshare/docs/info"
        );
        assert_eq!(
            config.cmd_prefix().to_string(),
            "/localhost/alice/laptop/chronoshare/docs/cmd"
        );
    }

    #[test]
    fn test_from_json() {
        let config = StateServerConfig::from_json(
            r#"{
                "device_name": "/bob",
                "shared_folder": "music",
                "root_dir": "/srv/music",
                "freshness": 250,
                "page_limit": 10,
                "payload_format": "cbor"
            }"#,
        )
        .unwrap();

        assert_eq!(config.freshness, Some(Duration::from_millis(250)));
        assert_eq!(config.page_limit, 10);
        assert_eq!(config.workers, 2);
        assert_eq!(config.payload_format, PayloadFormat::Cbor);
        assert_eq!(config.root_dir, PathBuf::from("/srv/music"));
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(StateServerConfig::from_json("not json").is_err());
        assert!(StateServerConfig::from_json(r#"{"device_name": "/bob"}"#).is_err());
        assert!(StateServerConfig::from_json(
            r#"{"device_name": "/bob", "shared_folder": "x", "page_limit": 0}"#
        )
        .is_err());
    }
}
