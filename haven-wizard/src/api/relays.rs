//! Editable copies of the blastr/import relay lists.

use std::collections::HashMap;

use super::RelayListKind;
use crate::utils::validation::ValidationError;

/// Strip a leading `ws://`/`wss://` (any case) and trailing slashes.
pub fn normalize_relay_url(url: &str) -> String {
    let url = url.trim();
    let lowered = url.to_ascii_lowercase();
    let rest = if lowered.starts_with("wss://") {
        &url[6..]
    } else if lowered.starts_with("ws://") {
        &url[5..]
    } else {
        url
    };
    rest.trim_end_matches('/').to_string()
}

/// Local working copies of both lists. Edits are not persisted until saved.
#[derive(Debug, Clone, Default)]
pub struct RelayLists {
    lists: HashMap<RelayListKind, Vec<String>>,
}

impl RelayLists {
    pub fn get(&self, kind: RelayListKind) -> &[String] {
        self.lists.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn replace(&mut self, kind: RelayListKind, relays: Vec<String>) {
        self.lists.insert(kind, relays);
    }

    /// Append a relay after normalization. Returns the stored form.
    pub fn add(&mut self, kind: RelayListKind, raw: &str) -> Result<String, ValidationError> {
        if raw.trim().is_empty() {
            return Err(ValidationError::EmptyRelay);
        }
        let relay = normalize_relay_url(raw);
        let list = self.lists.entry(kind).or_default();
        if list.contains(&relay) {
            return Err(ValidationError::DuplicateRelay);
        }
        list.push(relay.clone());
        Ok(relay)
    }

    pub fn remove(&mut self, kind: RelayListKind, index: usize) -> Option<String> {
        let list = self.lists.get_mut(&kind)?;
        if index < list.len() {
            Some(list.remove(index))
        } else {
            None
        }
    }

    /// Replace one entry in place with its normalized form.
    pub fn update(&mut self, kind: RelayListKind, index: usize, raw: &str) -> bool {
        match self.lists.get_mut(&kind).and_then(|l| l.get_mut(index)) {
            Some(slot) => {
                *slot = normalize_relay_url(raw);
                true
            }
            None => false,
        }
    }
}
