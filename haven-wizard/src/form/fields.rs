//! Declarative table of the wizard's form inputs.

use crate::store::schema::{self, ValueKind};
use crate::utils::validation::ValidationError;

/// Wizard track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WizardMode {
    /// One page of essentials; everything else derived.
    Simple,
    /// Seven pages of explicit per-field control.
    Full,
}

impl WizardMode {
    pub fn parse(value: &str) -> Result<Self, ValidationError> {
        match value.trim() {
            "simple" => Ok(WizardMode::Simple),
            "full" => Ok(WizardMode::Full),
            _ => Err(ValidationError::InvalidMode),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WizardMode::Simple => "simple",
            WizardMode::Full => "full",
        }
    }

    pub fn last_step(&self) -> u8 {
        match self {
            WizardMode::Simple => 1,
            WizardMode::Full => 7,
        }
    }

    pub fn owner_form_key(&self) -> &'static str {
        match self {
            WizardMode::Simple => OWNER_NPUB,
            WizardMode::Full => OWNER_NPUB_FULL,
        }
    }

    pub fn host_form_key(&self) -> &'static str {
        match self {
            WizardMode::Simple => RELAY_URL_SIMPLE,
            WizardMode::Full => RELAY_URL,
        }
    }
}

pub const OWNER_NPUB: &str = "OWNER_NPUB";
pub const OWNER_NPUB_FULL: &str = "OWNER_NPUB_FULL";
pub const RELAY_URL: &str = "RELAY_URL";
pub const RELAY_URL_SIMPLE: &str = "RELAY_URL_SIMPLE";
pub const USERNAME: &str = "USERNAME";
pub const BACKUP_PROVIDER: &str = "BACKUP_PROVIDER";

/// How the terminal renders and edits the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Text,
    Toggle,
    Choice(&'static [&'static str]),
}

/// Whether an input is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Always,
    /// Shown only when another form input currently holds `value`.
    WhenEquals {
        form_key: &'static str,
        value: &'static str,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub form_key: &'static str,
    /// Configuration key written from this input; `None` for inputs that only feed derivations.
    pub config_key: Option<&'static str>,
    pub label: &'static str,
    pub kind: ValueKind,
    pub input: InputKind,
    pub mode: WizardMode,
    pub step: u8,
    pub required: bool,
    pub visibility: Visibility,
}

impl FieldSpec {
    /// Default shown when the configuration does not carry the key.
    pub fn default_value(&self) -> &'static str {
        self.config_key
            .and_then(schema::field)
            .map(|f| f.default)
            .unwrap_or("")
    }
}

const fn input(
    mode: WizardMode,
    step: u8,
    form_key: &'static str,
    label: &'static str,
    kind: ValueKind,
) -> FieldSpec {
    let input = match kind {
        ValueKind::Boolean => InputKind::Toggle,
        _ => InputKind::Text,
    };
    FieldSpec {
        form_key,
        config_key: Some(form_key),
        label,
        kind,
        input,
        mode,
        step,
        required: false,
        visibility: Visibility::Always,
    }
}

const fn required(mut spec: FieldSpec) -> FieldSpec {
    spec.required = true;
    spec
}

const fn maps_to(mut spec: FieldSpec, config_key: Option<&'static str>) -> FieldSpec {
    spec.config_key = config_key;
    spec
}

const fn choice(mut spec: FieldSpec, options: &'static [&'static str]) -> FieldSpec {
    spec.input = InputKind::Choice(options);
    spec
}

const fn when_s3(mut spec: FieldSpec) -> FieldSpec {
    spec.visibility = Visibility::WhenEquals {
        form_key: BACKUP_PROVIDER,
        value: schema::BACKUP_PROVIDER_S3,
    };
    spec
}

use ValueKind::{Boolean, Host, Integer, String as Text};
use WizardMode::{Full, Simple};

/// Every form input, grouped by mode and step, in display order.
pub const FIELDS: &[FieldSpec] = &[
    // Simple, step 1
    required(input(Simple, 1, OWNER_NPUB, "Your npub", Text)),
    required(maps_to(
        input(Simple, 1, RELAY_URL_SIMPLE, "Relay domain", Host),
        Some(RELAY_URL),
    )),
    required(maps_to(
        input(Simple, 1, USERNAME, "Your name", Text),
        None,
    )),
    // Full, step 1: owner and relay
    required(maps_to(
        input(Full, 1, OWNER_NPUB_FULL, "Owner npub", Text),
        Some(OWNER_NPUB),
    )),
    required(input(Full, 1, RELAY_URL, "Relay domain", Host)),
    input(Full, 1, "RELAY_PORT", "Port", Integer),
    input(Full, 1, "RELAY_BIND_ADDRESS", "Bind address", Text),
    // Full, step 2: database and storage
    choice(
        input(Full, 2, "DB_ENGINE", "Database engine", Text),
        &["badger", "lmdb"],
    ),
    input(Full, 2, "LMDB_MAPSIZE", "LMDB map size (0 = default)", Integer),
    input(Full, 2, "BLOSSOM_PATH", "Media storage path", Text),
    // Full, step 3: private relay
    input(Full, 3, "PRIVATE_RELAY_NAME", "Name", Text),
    input(Full, 3, "PRIVATE_RELAY_DESCRIPTION", "Description", Text),
    input(Full, 3, "PRIVATE_RELAY_ICON", "Icon URL", Text),
    input(Full, 3, "PRIVATE_RELAY_ALLOW_EMPTY_FILTERS", "Allow empty filters", Boolean),
    input(Full, 3, "PRIVATE_RELAY_ALLOW_COMPLEX_FILTERS", "Allow complex filters", Boolean),
    // Full, step 4: chat relay
    input(Full, 4, "CHAT_RELAY_NAME", "Name", Text),
    input(Full, 4, "CHAT_RELAY_DESCRIPTION", "Description", Text),
    input(Full, 4, "CHAT_RELAY_ICON", "Icon URL", Text),
    input(Full, 4, "CHAT_RELAY_WOT_DEPTH", "Web-of-trust depth", Integer),
    input(Full, 4, "CHAT_RELAY_WOT_REFRESH_INTERVAL_HOURS", "WoT refresh (hours)", Integer),
    input(Full, 4, "CHAT_RELAY_MINIMUM_FOLLOWERS", "Minimum followers", Integer),
    // Full, step 5: outbox relay
    input(Full, 5, "OUTBOX_RELAY_NAME", "Name", Text),
    input(Full, 5, "OUTBOX_RELAY_DESCRIPTION", "Description", Text),
    input(Full, 5, "OUTBOX_RELAY_ICON", "Icon URL", Text),
    // Full, step 6: inbox relay
    input(Full, 6, "INBOX_RELAY_NAME", "Name", Text),
    input(Full, 6, "INBOX_RELAY_DESCRIPTION", "Description", Text),
    input(Full, 6, "INBOX_RELAY_ICON", "Icon URL", Text),
    input(Full, 6, "INBOX_PULL_INTERVAL_SECONDS", "Pull interval (seconds)", Integer),
    // Full, step 7: import, backup and logging
    input(Full, 7, "IMPORT_START_DATE", "Import notes since (YYYY-MM-DD)", Text),
    choice(
        input(Full, 7, BACKUP_PROVIDER, "Backup provider", Text),
        &["none", "s3"],
    ),
    input(Full, 7, "BACKUP_INTERVAL_HOURS", "Backup interval (hours)", Integer),
    when_s3(input(Full, 7, "S3_ACCESS_KEY_ID", "S3 access key id", Text)),
    when_s3(input(Full, 7, "S3_SECRET_KEY", "S3 secret key", Text)),
    when_s3(input(Full, 7, "S3_ENDPOINT", "S3 endpoint", Text)),
    when_s3(input(Full, 7, "S3_REGION", "S3 region", Text)),
    when_s3(input(Full, 7, "S3_BUCKET_NAME", "S3 bucket", Text)),
    choice(
        input(Full, 7, "HAVEN_LOG_LEVEL", "Log level", Text),
        &["DEBUG", "INFO", "WARN", "ERROR"],
    ),
    input(Full, 7, "TZ", "Time zone", Text),
];

/// Step titles for the full track, indexed by `step - 1`.
pub const FULL_STEP_TITLES: [&str; 7] = [
    "Owner & Relay",
    "Database & Storage",
    "Private Relay",
    "Chat Relay",
    "Outbox Relay",
    "Inbox Relay",
    "Import, Backup & Logging",
];

pub fn step_title(mode: WizardMode, step: u8) -> &'static str {
    match (mode, step) {
        (Simple, 1) => "Quick Setup",
        (Full, s @ 1..=7) => FULL_STEP_TITLES[usize::from(s - 1)],
        _ => "Choose a setup mode",
    }
}

/// Inputs placed on one page, in display order.
pub fn fields_for_step(mode: WizardMode, step: u8) -> impl Iterator<Item = &'static FieldSpec> {
    FIELDS
        .iter()
        .filter(move |f| f.mode == mode && f.step == step)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_config_key_is_known_to_the_schema() {
        for f in FIELDS {
            if let Some(key) = f.config_key {
                assert!(schema::is_managed(key), "{} is not in the schema", key);
            }
        }
    }

    #[test]
    fn required_sets_per_mode() {
        let simple: Vec<_> = FIELDS
            .iter()
            .filter(|f| f.mode == Simple && f.required)
            .map(|f| f.form_key)
            .collect();
        assert_eq!(simple, vec![OWNER_NPUB, RELAY_URL_SIMPLE, USERNAME]);

        let full: Vec<_> = FIELDS
            .iter()
            .filter(|f| f.mode == Full && f.required)
            .map(|f| f.form_key)
            .collect();
        assert_eq!(full, vec![OWNER_NPUB_FULL, RELAY_URL]);
    }

    #[test]
    fn every_full_step_has_inputs() {
        for step in 1..=7 {
            assert!(fields_for_step(Full, step).next().is_some(), "step {}", step);
        }
        assert_eq!(step_title(Full, 7), "Import, Backup & Logging");
        assert_eq!(step_title(Simple, 0), "Choose a setup mode");
    }

    #[test]
    fn mode_parsing() {
        assert_eq!(WizardMode::parse("simple"), Ok(Simple));
        assert_eq!(WizardMode::parse("full"), Ok(Full));
        assert_eq!(WizardMode::parse("expert"), Err(ValidationError::InvalidMode));
    }
}
