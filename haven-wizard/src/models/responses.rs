// API response models
// Shapes returned by the HAVEN configuration service. Every payload is flattened into the
// `{ success, error?, ... }` envelope, so unknown or missing fields must not fail decoding.

use serde::{Deserialize, Serialize};

// =========================
// Generic wrapper
// =========================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            message: None,
            data,
        }
    }

    /// Server-side failure text, falling back to a generic message.
    pub fn error_text(&self) -> String {
        self.error
            .clone()
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

/// Payload of endpoints that only acknowledge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Empty {}

// =========================
// Configuration
// =========================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvContent {
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayListPayload {
    #[serde(default)]
    pub relays: Vec<String>,
}

// =========================
// Status / info
// =========================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayStatus {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub health: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub running: Option<bool>,
}

impl RelayStatus {
    /// Running and reporting healthy; the only state in which an import may start.
    pub fn is_ready(&self) -> bool {
        self.status == "running" && self.health == "healthy"
    }

    pub fn is_running(&self) -> bool {
        self.status == "running" || self.running == Some(true)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionInfo {
    #[serde(default)]
    pub version: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorInfo {
    #[serde(default)]
    pub available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportInfo {
    #[serde(default)]
    pub relay_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogsPayload {
    #[serde(default)]
    pub logs: String,
}

// =========================
// Push stream payload
// =========================

/// One `data:` payload of an event stream.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
