// Client settings
// Layered: built-in defaults, then an optional TOML file, then `HAVEN_WIZARD_*` environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::api::client::ClientConfig;

pub const ENV_PREFIX: &str = "HAVEN_WIZARD";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid base_url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("failed to render settings: {0}")]
    Render(#[from] toml::ser::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Root URL of the HAVEN configuration service.
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Interval of the background relay status poll.
    pub status_poll_secs: u64,
    /// Maximum lines kept by each log view.
    pub log_view_cap: usize,
    pub notification_ttl_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            request_timeout_secs: 10,
            connect_timeout_secs: 5,
            status_poll_secs: 10,
            log_view_cap: 500,
            notification_ttl_ms: 4000,
            log_dir: None,
        }
    }
}

/// Where settings come from.
#[derive(Debug, Clone, Default)]
pub struct SettingsSources {
    /// TOML file to read.
    pub file: Option<PathBuf>,
    /// Fail when `file` does not exist (true for a path given on the command line).
    pub file_required: bool,
    /// Replaces the process environment; used by tests.
    pub env: Option<HashMap<String, String>>,
}

impl Settings {
    pub fn load(sources: &SettingsSources) -> Result<Self, SettingsError> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("base_url", defaults.base_url.as_str())?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .set_default("connect_timeout_secs", defaults.connect_timeout_secs as i64)?
            .set_default("status_poll_secs", defaults.status_poll_secs as i64)?
            .set_default("log_view_cap", defaults.log_view_cap as i64)?
            .set_default("notification_ttl_ms", defaults.notification_ttl_ms as i64)?;

        if let Some(path) = &sources.file {
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(sources.file_required),
            );
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(sources.env.clone()),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let url = Url::parse(&self.base_url).map_err(|e| SettingsError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(SettingsError::InvalidBaseUrl {
                url: self.base_url.clone(),
                reason: "scheme must be http or https".to_string(),
            });
        }
        if self.request_timeout_secs == 0 {
            return Err(SettingsError::Zero("request_timeout_secs"));
        }
        if self.status_poll_secs == 0 {
            return Err(SettingsError::Zero("status_poll_secs"));
        }
        if self.log_view_cap == 0 {
            return Err(SettingsError::Zero("log_view_cap"));
        }
        Ok(())
    }

    /// Apply a `--base-url` override from the command line.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self, SettingsError> {
        self.base_url = base_url.trim().to_string();
        self.validate()?;
        Ok(self)
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url.clone(),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs.max(1)),
        }
    }

    pub fn status_poll_interval(&self) -> Duration {
        Duration::from_secs(self.status_poll_secs)
    }

    pub fn notification_ttl(&self) -> Duration {
        Duration::from_millis(self.notification_ttl_ms)
    }

    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }

    /// Effective settings as TOML.
    pub fn to_toml(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
