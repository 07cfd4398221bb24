//! Typed access to the HAVEN configuration service.
//!
//! `HavenApi` is the seam between the application core and the network: production code uses
//! `HttpHavenClient`, tests use in-memory stubs.

pub mod client;
pub mod relays;
pub mod sse;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

use crate::models::log::LogLevel;
use crate::models::responses::{ImportInfo, RelayStatus, TorInfo, VersionInfo};

pub use client::HttpHavenClient;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("client configuration error: {0}")]
    Config(String),
    #[error("network error: {0}")]
    Transport(String),
    #[error("server returned {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("malformed response: {0}")]
    Decode(String),
    #[error("{0}")]
    Server(String),
    #[error("stream interrupted: {0}")]
    Stream(String),
}

/// The two editable relay lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayListKind {
    Blastr,
    Import,
}

impl RelayListKind {
    pub const ALL: [RelayListKind; 2] = [RelayListKind::Blastr, RelayListKind::Import];

    pub fn as_str(&self) -> &'static str {
        match self {
            RelayListKind::Blastr => "blastr",
            RelayListKind::Import => "import",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RelayListKind::Blastr => "Blastr",
            RelayListKind::Import => "Import",
        }
    }
}

/// Server push feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Import,
    Logs,
}

impl StreamKind {
    pub fn path(&self) -> &'static str {
        match self {
            StreamKind::Import => "/api/import/stream",
            StreamKind::Logs => "/api/logs/stream",
        }
    }
}

/// Decoded push-stream event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// `{type: "status", status}`
    Status(String),
    /// Any other `type`, carrying a message line.
    Log { level: LogLevel, message: String },
}

pub type EventStream = BoxStream<'static, Result<StreamEvent, ApiError>>;

#[async_trait]
pub trait HavenApi: Send + Sync {
    async fn get_env(&self) -> Result<String, ApiError>;

    async fn save_env(&self, content: &str) -> Result<(), ApiError>;

    async fn get_relays(&self, kind: RelayListKind) -> Result<Vec<String>, ApiError>;

    async fn save_relays(&self, kind: RelayListKind, relays: &[String]) -> Result<(), ApiError>;

    async fn status(&self) -> Result<RelayStatus, ApiError>;

    async fn version(&self) -> Result<VersionInfo, ApiError>;

    async fn tor(&self) -> Result<TorInfo, ApiError>;

    async fn restart(&self) -> Result<(), ApiError>;

    async fn run_import(&self) -> Result<(), ApiError>;

    async fn cancel_import(&self) -> Result<(), ApiError>;

    async fn import_info(&self) -> Result<ImportInfo, ApiError>;

    /// Full relay log as plain text.
    async fn logs(&self) -> Result<String, ApiError>;

    /// Open a push feed. The returned stream ends when the server closes it.
    async fn subscribe(&self, kind: StreamKind) -> Result<EventStream, ApiError>;
}
