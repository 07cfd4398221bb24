//! FormBinder: mapping between wizard inputs and configuration keys.

pub mod binder;
pub mod fields;

use std::collections::HashMap;

pub use binder::{build_document, load_into_form};
pub use fields::{FieldSpec, InputKind, Visibility, WizardMode};

/// Current input values keyed by form key. An absent key is distinct from an empty one: an empty
/// value is still an explicit user choice and wins over the stored configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    values: HashMap<String, String>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.values.remove(key)
    }

    /// True when the value is absent or blank after trimming.
    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).map_or(true, |v| v.trim().is_empty())
    }

    /// Whether `spec` is currently shown, given the other inputs.
    pub fn is_visible(&self, spec: &FieldSpec) -> bool {
        match spec.visibility {
            Visibility::Always => true,
            Visibility::WhenEquals { form_key, value } => {
                self.get(form_key).map(str::trim) == Some(value)
            }
        }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormValues {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}
