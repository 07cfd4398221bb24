// Input validation utilities
// Owner identity + relay host checks run before anything is sent to the config service.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Required literal prefix of an owner public key.
pub const NPUB_PREFIX: &str = "npub1";

const HOST_SCHEMES: [&str; 4] = ["wss://", "ws://", "https://", "http://"];

/// Validation failures raised synchronously, before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid configuration mode: expected 'simple' or 'full'")]
    InvalidMode,
    #[error("Owner npub is required")]
    MissingOwnerIdentity,
    #[error("Owner npub must start with 'npub1'")]
    MalformedOwnerIdentity,
    #[error("Relay URL is required")]
    MissingRelayHost,
    #[error("Relay URL '{0}' is not a valid host[:port]")]
    MalformedRelayHost(String),
    #[error("Relay URL mixes 'localhost' and '127.0.0.1'; pick one")]
    AmbiguousRelayHost,
    #[error("Configuration cannot be empty")]
    EmptyConfiguration,
    #[error("Please enter a relay URL")]
    EmptyRelay,
    #[error("This relay is already in the list")]
    DuplicateRelay,
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Validate the owner identity (opaque `npub1...` string). Returns the trimmed value.
pub fn validate_owner_npub(raw: &str) -> Result<String, ValidationError> {
    let npub = raw.trim();
    if npub.is_empty() || npub == "null" || npub == "undefined" {
        return Err(ValidationError::MissingOwnerIdentity);
    }
    if !npub.starts_with(NPUB_PREFIX) {
        return Err(ValidationError::MalformedOwnerIdentity);
    }
    Ok(npub.to_string())
}

/// Strip a leading ws/wss/http/https scheme and any path suffix.
///
/// No validation happens here; `validate_relay_host` is the checked variant.
pub fn normalize_relay_host(raw: &str) -> String {
    let mut s = raw.trim();
    let lowered = s.to_ascii_lowercase();
    for scheme in HOST_SCHEMES {
        if lowered.starts_with(scheme) {
            s = &s[scheme.len()..];
            break;
        }
    }
    match s.find('/') {
        Some(idx) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

static HOST_RE: OnceLock<Result<Regex, regex::Error>> = OnceLock::new();

/// Validate a relay host and return its canonical bare `host[:port]` form.
pub fn validate_relay_host(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingRelayHost);
    }
    if trimmed.contains("localhost") && trimmed.contains("127.0.0.1") {
        return Err(ValidationError::AmbiguousRelayHost);
    }

    let host = normalize_relay_host(trimmed);
    let host_re = HOST_RE
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9.\-]+(:[0-9]{1,5})?$"))
        .as_ref()
        .map_err(|e| ValidationError::Internal(format!("failed to compile host regex: {}", e)))?;
    if host.is_empty() || !host_re.is_match(&host) {
        return Err(ValidationError::MalformedRelayHost(trimmed.to_string()));
    }
    Ok(host)
}
