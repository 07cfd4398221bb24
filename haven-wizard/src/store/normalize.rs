//! Merge precedence and value coercion.

use super::document::{strip_quotes, ConfigDocument};

/// Pick the value for `key`: explicit form value (even empty) > existing document > default.
pub fn resolve<'a>(
    key: &str,
    form_value: Option<&'a str>,
    existing: &'a ConfigDocument,
    default: &'a str,
) -> &'a str {
    if let Some(v) = form_value {
        return v;
    }
    existing.get(key).unwrap_or(default)
}

/// Map common truthy/falsy spellings to `"true"`/`"false"`; anything else falls back to `default`.
pub fn normalize_boolean(value: Option<&str>, default: bool) -> &'static str {
    let fallback = if default { "true" } else { "false" };
    let Some(value) = value else {
        return fallback;
    };
    let v = strip_quotes(value).to_ascii_lowercase();
    match v.as_str() {
        "true" | "1" | "yes" => "true",
        "false" | "0" | "no" => "false",
        _ => fallback,
    }
}

/// Parse a numeric value; unparseable or non-finite input falls back to `default`.
/// Integral results are rendered without a decimal point.
pub fn normalize_number(value: Option<&str>, default: i64) -> String {
    let Some(value) = value else {
        return default.to_string();
    };
    let v = strip_quotes(value);

    if let Ok(n) = v.parse::<i64>() {
        return n.to_string();
    }

    match v.parse::<f64>() {
        Ok(f) if f.is_finite() => {
            if f.fract() == 0.0 && f.abs() < 9.0e15 {
                (f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        _ => default.to_string(),
    }
}

/// Flatten a free-text value onto one line so it survives the line-oriented file format.
pub fn normalize_text(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}
