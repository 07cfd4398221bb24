// Logging utilities
// Structured logging with JSON and human-readable formats

use log::Level;
use serde_json::json;
use std::collections::HashMap;

/// Key fragments whose values never reach a log file.
const SECRET_KEY_MARKERS: [&str; 4] = ["SECRET", "PASSWORD", "TOKEN", "ACCESS_KEY"];

/// Mask sensitive data in logs
pub fn mask_sensitive(input: &str) -> String {
    let chars: Vec<char> = input.chars().collect();
    if chars.len() <= 8 {
        return "***".to_string();
    }

    let visible = 4;
    let start: String = chars[..visible].iter().collect();
    let end: String = chars[chars.len() - visible..].iter().collect();

    format!("{}...{}", start, end)
}

pub fn is_secret_key(key: &str) -> bool {
    let upper = key.to_ascii_uppercase();
    SECRET_KEY_MARKERS.iter().any(|m| upper.contains(m))
}

/// Mask the values of secret-looking keys in `.env`-style text; other lines pass through.
pub fn mask_env_secrets(text: &str) -> String {
    text.lines()
        .map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                return line.to_string();
            }
            match line.split_once('=') {
                Some((key, value)) if is_secret_key(key.trim()) => {
                    let bare = value.trim().trim_matches('"');
                    if bare.is_empty() {
                        line.to_string()
                    } else {
                        format!("{}={}", key, mask_sensitive(bare))
                    }
                }
                _ => line.to_string(),
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse phase and step from log message
/// Extracts [PHASE: ...] and [STEP: ...] patterns
pub fn parse_log_metadata(message: &str) -> (Option<String>, Option<String>, String) {
    let mut phase = None;
    let mut step = None;
    let mut cleaned_message = message.to_string();

    if let Some(start) = message.find("[PHASE:") {
        if let Some(end) = message[start..].find(']') {
            let phase_str = message[start + 7..start + end].trim();
            phase = Some(phase_str.to_string());
            cleaned_message = format!("{} {}", &message[..start], &message[start + end + 1..])
                .trim()
                .to_string();
        }
    }

    if let Some(start) = cleaned_message.find("[STEP:") {
        if let Some(end) = cleaned_message[start..].find(']') {
            let step_str = cleaned_message[start + 6..start + end].trim();
            step = Some(step_str.to_string());
            cleaned_message = format!(
                "{} {}",
                &cleaned_message[..start],
                &cleaned_message[start + end + 1..]
            )
            .trim()
            .to_string();
        }
    }

    (phase, step, cleaned_message)
}

/// Format log entry as JSON for structured logging
pub fn format_json_log(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    phase: Option<&str>,
    step: Option<&str>,
    context: Option<&HashMap<String, serde_json::Value>>,
) -> String {
    let mut log_entry = json!({
        "timestamp": timestamp,
        "level": level.as_str(),
        "target": target,
        "message": message,
    });

    if let Some(phase) = phase {
        log_entry["phase"] = json!(phase);
    }

    if let Some(step) = step {
        log_entry["step"] = json!(step);
    }

    if let Some(context) = context {
        log_entry["context"] = json!(context);
    }

    serde_json::to_string(&log_entry).unwrap_or_else(|_| "{}".to_string())
}

/// Format log entry as human-readable text
pub fn format_human_readable_log(
    timestamp: &str,
    level: Level,
    target: &str,
    message: &str,
    phase: Option<&str>,
    step: Option<&str>,
) -> String {
    let mut log_line = format!("[{}] [{}]", timestamp, level.as_str());

    if let Some(phase) = phase {
        log_line.push_str(&format!(" [PHASE: {}]", phase));
    }

    if let Some(step) = step {
        log_line.push_str(&format!(" [STEP: {}]", step));
    }

    log_line.push_str(&format!(" [{}] {}", target, message));
    log_line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_is_lifted_out_of_the_message() {
        let (phase, step, msg) =
            parse_log_metadata("[PHASE: wizard] [STEP: save] Configuration saved");
        assert_eq!(phase.as_deref(), Some("wizard"));
        assert_eq!(step.as_deref(), Some("save"));
        assert_eq!(msg, "Configuration saved");
    }

    #[test]
    fn message_without_metadata_is_untouched() {
        let (phase, step, msg) = parse_log_metadata("plain message");
        assert!(phase.is_none() && step.is_none());
        assert_eq!(msg, "plain message");
    }

    #[test]
    fn json_line_carries_phase_and_context() {
        let mut ctx = HashMap::new();
        ctx.insert("correlation_id".to_string(), json!("abc123"));
        let line = format_json_log(
            "2026-01-01T00:00:00Z",
            Level::Info,
            "haven_wizard::app",
            "Saved",
            Some("wizard"),
            Some("save"),
            Some(&ctx),
        );
        let v: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(v["phase"], "wizard");
        assert_eq!(v["step"], "save");
        assert_eq!(v["context"]["correlation_id"], "abc123");
        assert_eq!(v["level"], "INFO");
    }

    #[test]
    fn human_line_layout() {
        let line = format_human_readable_log(
            "12:00:00",
            Level::Warn,
            "haven_wizard::api",
            "slow",
            Some("api"),
            None,
        );
        assert_eq!(line, "[12:00:00] [WARN] [PHASE: api] [haven_wizard::api] slow");
    }

    #[test]
    fn env_secrets_are_masked() {
        let text = "S3_ACCESS_KEY_ID=\"AKIAEXAMPLE\"\nS3_SECRET_KEY=\"hunter2hunter2\"\nS3_REGION=\"eu\"\nS3_BUCKET_NAME=\"\"\n# S3_SECRET_KEY=old";
        let masked = mask_env_secrets(text);
        assert!(!masked.contains("hunter2"));
        assert!(!masked.contains("AKIAEXAMPLE"));
        assert!(masked.contains("S3_SECRET_KEY=hunt...ter2"));
        assert!(masked.contains("S3_REGION=\"eu\""));
        assert!(masked.contains("# S3_SECRET_KEY=old"));
    }

    #[test]
    fn empty_secret_values_stay_visible_as_empty() {
        assert_eq!(mask_env_secrets("S3_SECRET_KEY=\"\""), "S3_SECRET_KEY=\"\"");
    }

    #[test]
    fn mask_sensitive_short_values_fully_masked() {
        assert_eq!(mask_sensitive("abc"), "***");
        assert_eq!(mask_sensitive("12345678"), "***");
    }

    #[test]
    fn mask_sensitive_long_values_partially_masked() {
        let masked = mask_sensitive("abcdefghijklmnop");
        assert_eq!(masked, "abcd...mnop");
    }
}
