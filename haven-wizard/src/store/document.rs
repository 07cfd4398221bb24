//! In-memory form of the persisted `.env`-style configuration text.
//!
//! Parsing is best effort: blank lines and `#` comments are skipped, lines that do not look like
//! `KEY=VALUE` are dropped without error. The serializer regenerates the whole file, so comments
//! and ordering of known keys are not preserved across a wizard save.

use std::collections::HashMap;

/// One `KEY=VALUE` assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigEntry {
    pub key: String,
    /// Value with one layer of surrounding double quotes removed, trimmed.
    pub value: String,
    /// Text after `=` as written (trimmed), used to re-emit keys the wizard does not manage.
    pub raw: String,
}

/// Ordered key/value view of the configuration file. Keys are unique; the last assignment wins
/// and keeps the position of the first one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDocument {
    entries: Vec<ConfigEntry>,
    index: HashMap<String, usize>,
}

/// Outcome of a parse: the document plus the (1-based) numbers of lines that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseReport {
    pub document: ConfigDocument,
    pub dropped_lines: Vec<usize>,
}

impl ConfigDocument {
    /// Parse configuration text, silently dropping malformed lines.
    pub fn parse(text: &str) -> Self {
        Self::parse_with_report(text).document
    }

    /// Parse configuration text and report which lines were dropped.
    pub fn parse_with_report(text: &str) -> ParseReport {
        let mut report = ParseReport::default();

        for (i, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, raw)) = line.split_once('=') else {
                report.dropped_lines.push(i + 1);
                continue;
            };
            if !is_config_key(key) {
                report.dropped_lines.push(i + 1);
                continue;
            }

            report.document.insert_raw(key, raw.trim());
        }

        report
    }

    /// Insert (or overwrite) a key with an already-unquoted value.
    pub fn insert(&mut self, key: &str, value: &str) {
        let entry = ConfigEntry {
            key: key.to_string(),
            value: value.trim().to_string(),
            raw: value.trim().to_string(),
        };
        self.upsert(entry);
    }

    fn insert_raw(&mut self, key: &str, raw: &str) {
        let entry = ConfigEntry {
            key: key.to_string(),
            value: strip_quotes(raw).to_string(),
            raw: raw.to_string(),
        };
        self.upsert(entry);
    }

    fn upsert(&mut self, entry: ConfigEntry) {
        match self.index.get(&entry.key) {
            Some(&pos) => self.entries[pos] = entry,
            None => {
                self.index.insert(entry.key.clone(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Quote-stripped value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entry(key).map(|e| e.value.as_str())
    }

    pub fn entry(&self, key: &str) -> Option<&ConfigEntry> {
        self.index.get(key).map(|&pos| &self.entries[pos])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    pub fn entries(&self) -> impl Iterator<Item = &ConfigEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `UPPER_SNAKE_CASE` key: first char `A-Z` or `_`, then `A-Z`, `0-9` or `_`.
pub fn is_config_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_uppercase() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}

/// Remove one layer of surrounding double quotes, then trim.
pub fn strip_quotes(value: &str) -> &str {
    let v = value.trim();
    if v.len() >= 2 && v.starts_with('"') && v.ends_with('"') {
        v[1..v.len() - 1].trim()
    } else {
        v
    }
}
