use super::fields::{
    fields_for_step, FieldSpec, WizardMode, FIELDS, OWNER_NPUB, RELAY_URL, USERNAME,
};
use super::FormValues;
use crate::store::schema::{self, RelayProfile, ValueKind};
use crate::store::{normalize_boolean, resolve, serialize, ConfigDocument};
use crate::utils::validation::{
    normalize_relay_host, validate_owner_npub, validate_relay_host, ValidationError,
};

const PRIVATE_NAME_SUFFIX: &str = "'s Private Relay";
const FALLBACK_USERNAME: &str = "My";

/// Populate wizard inputs from a stored configuration. Keys the form does not expose stay in the
/// document and are written back untouched on save.
pub fn load_into_form(doc: &ConfigDocument) -> FormValues {
    let mut form = FormValues::new();

    for spec in FIELDS {
        let Some(key) = spec.config_key else {
            continue;
        };
        form.set(spec.form_key, load_value(spec, doc.get(key)));
    }

    let username = doc
        .get(&RelayProfile::Private.name_key())
        .and_then(|name| name.strip_suffix(PRIVATE_NAME_SUFFIX))
        .map(str::trim)
        .unwrap_or_default()
        .to_string();
    form.set(USERNAME, username);

    form
}

fn load_value(spec: &FieldSpec, stored: Option<&str>) -> String {
    let default = spec.default_value();
    match spec.kind {
        ValueKind::Boolean => normalize_boolean(stored, default == "true").to_string(),
        ValueKind::Host => normalize_relay_host(stored.unwrap_or(default)),
        ValueKind::String | ValueKind::Integer => stored.unwrap_or(default).to_string(),
    }
}

/// Merge the form over the existing configuration and render the new file.
///
/// Owner identity and relay host are validated first; nothing is produced on failure.
pub fn build_document(
    mode: Option<WizardMode>,
    form: &FormValues,
    existing: &ConfigDocument,
) -> Result<String, ValidationError> {
    let mode = mode.ok_or(ValidationError::InvalidMode)?;

    let owner = validate_owner_npub(resolve(
        OWNER_NPUB,
        form.get(mode.owner_form_key()),
        existing,
        "",
    ))?;
    let host_default = schema::field(RELAY_URL).map(|f| f.default).unwrap_or("");
    let host = validate_relay_host(resolve(
        RELAY_URL,
        form.get(mode.host_form_key()),
        existing,
        host_default,
    ))?;

    // Baseline: existing > default for every managed key.
    let mut values = ConfigDocument::default();
    for field in schema::all_fields() {
        values.insert(field.key, resolve(field.key, None, existing, field.default));
    }

    match mode {
        WizardMode::Simple => {
            let username = form
                .get(USERNAME)
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .unwrap_or(FALLBACK_USERNAME);
            for profile in RelayProfile::ALL {
                values.insert(&profile.name_key(), &profile.display_name(username));
                values.insert(&profile.description_key(), profile.default_description());
                values.insert(&profile.icon_key(), "");
            }
        }
        WizardMode::Full => {
            for step in 1..=mode.last_step() {
                for spec in fields_for_step(mode, step) {
                    let Some(key) = spec.config_key else {
                        continue;
                    };
                    let default = spec.default_value();
                    values.insert(key, resolve(key, form.get(spec.form_key), existing, default));
                }
            }
        }
    }

    values.insert(OWNER_NPUB, &owner);
    values.insert(RELAY_URL, &host);
    for profile in RelayProfile::ALL {
        values.insert(&profile.npub_key(), &owner);
    }

    Ok(serialize(&values, existing))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::fields::{OWNER_NPUB_FULL, RELAY_URL_SIMPLE};

    const NPUB: &str = "npub1testowner";

    fn simple_form(username: &str) -> FormValues {
        [
            (OWNER_NPUB, NPUB),
            (RELAY_URL_SIMPLE, "relay.example.com"),
            (USERNAME, username),
        ]
        .into_iter()
        .collect()
    }

    fn full_form() -> FormValues {
        let mut form = load_into_form(&ConfigDocument::default());
        form.set(OWNER_NPUB_FULL, NPUB);
        form.set(RELAY_URL, "relay.example.com");
        form
    }

    #[test]
    fn missing_mode_is_rejected() {
        assert_eq!(
            build_document(None, &simple_form("Alice"), &ConfigDocument::default()),
            Err(ValidationError::InvalidMode)
        );
    }

    #[test]
    fn simple_mode_derives_profiles_from_username() {
        let text = build_document(
            Some(WizardMode::Simple),
            &simple_form("Alice"),
            &ConfigDocument::default(),
        )
        .unwrap();
        assert!(text.contains("PRIVATE_RELAY_NAME=\"Alice's Private Relay\"\n"));
        assert!(text.contains("CHAT_RELAY_NAME=\"Alice's Chat Relay\"\n"));
        assert!(text.contains("OUTBOX_RELAY_NAME=\"Alice's Outbox Relay\"\n"));
        assert!(text.contains("INBOX_RELAY_NAME=\"Alice's Inbox Relay\"\n"));
        assert!(text.contains("INBOX_RELAY_DESCRIPTION=\"Send your interactions with my notes here\"\n"));
        assert!(text.contains("CHAT_RELAY_NPUB=\"npub1testowner\"\n"));
        assert!(text.contains("OUTBOX_RELAY_ICON=\"\"\n"));

        let anon = build_document(
            Some(WizardMode::Simple),
            &simple_form("  "),
            &ConfigDocument::default(),
        )
        .unwrap();
        assert!(anon.contains("PRIVATE_RELAY_NAME=\"My's Private Relay\"\n"));
    }

    #[test]
    fn simple_mode_keeps_existing_rate_limits_and_settings() {
        let existing = ConfigDocument::parse(
            "CHAT_RELAY_EVENT_IP_LIMITER_MAX_TOKENS=500\nRELAY_PORT=4444\nBACKUP_PROVIDER=\"s3\"\nS3_REGION=\"eu\"\n",
        );
        let text =
            build_document(Some(WizardMode::Simple), &simple_form("Bob"), &existing).unwrap();
        assert!(text.contains("CHAT_RELAY_EVENT_IP_LIMITER_MAX_TOKENS=500\n"));
        assert!(text.contains("RELAY_PORT=4444\n"));
        assert!(text.contains("S3_REGION=\"eu\"\n"));
    }

    #[test]
    fn host_is_written_in_canonical_form() {
        let mut form = simple_form("Alice");
        form.set(RELAY_URL_SIMPLE, "wss://relay.example.com/");
        let text =
            build_document(Some(WizardMode::Simple), &form, &ConfigDocument::default()).unwrap();
        assert!(text.contains("RELAY_URL=\"relay.example.com\"\n"));
    }

    #[test]
    fn invalid_owner_or_host_produces_nothing() {
        let mut form = simple_form("Alice");
        form.set(OWNER_NPUB, "abc123");
        assert_eq!(
            build_document(Some(WizardMode::Simple), &form, &ConfigDocument::default()),
            Err(ValidationError::MalformedOwnerIdentity)
        );

        let mut form = simple_form("Alice");
        form.set(RELAY_URL_SIMPLE, "localhost and 127.0.0.1");
        assert_eq!(
            build_document(Some(WizardMode::Simple), &form, &ConfigDocument::default()),
            Err(ValidationError::AmbiguousRelayHost)
        );
    }

    #[test]
    fn owner_falls_back_to_existing_document() {
        let existing = ConfigDocument::parse("OWNER_NPUB=\"npub1stored\"\n");
        let mut form = simple_form("Alice");
        form.remove(OWNER_NPUB);
        let text = build_document(Some(WizardMode::Simple), &form, &existing).unwrap();
        assert!(text.contains("OWNER_NPUB=\"npub1stored\"\n"));
    }

    #[test]
    fn present_but_empty_form_value_wins_over_existing() {
        let existing = ConfigDocument::parse(
            "PRIVATE_RELAY_ICON=\"https://example.com/i.png\"\nCHAT_RELAY_ICON=\"https://example.com/c.png\"\n",
        );
        let mut form = full_form();
        form.set("PRIVATE_RELAY_ICON", "");
        form.remove("CHAT_RELAY_ICON");
        let text = build_document(Some(WizardMode::Full), &form, &existing).unwrap();
        assert!(text.contains("PRIVATE_RELAY_ICON=\"\"\n"));
        assert!(text.contains("CHAT_RELAY_ICON=\"https://example.com/c.png\"\n"));
    }

    #[test]
    fn full_mode_sources_private_filters_from_form_only() {
        let existing = ConfigDocument::parse(
            "CHAT_RELAY_ALLOW_EMPTY_FILTERS=true\nPRIVATE_RELAY_EVENT_IP_LIMITER_MAX_TOKENS=7\n",
        );
        let mut form = full_form();
        form.set("PRIVATE_RELAY_ALLOW_EMPTY_FILTERS", "false");
        form.set("CHAT_RELAY_ALLOW_EMPTY_FILTERS", "false");
        let text = build_document(Some(WizardMode::Full), &form, &existing).unwrap();
        assert!(text.contains("PRIVATE_RELAY_ALLOW_EMPTY_FILTERS=false\n"));
        assert!(text.contains("CHAT_RELAY_ALLOW_EMPTY_FILTERS=true\n"));
        assert!(text.contains("PRIVATE_RELAY_EVENT_IP_LIMITER_MAX_TOKENS=7\n"));
    }

    #[test]
    fn s3_block_follows_backup_provider() {
        let mut form = full_form();
        form.set("BACKUP_PROVIDER", "s3");
        form.set("S3_BUCKET_NAME", "relay-backups");
        let with = build_document(Some(WizardMode::Full), &form, &ConfigDocument::default())
            .unwrap();
        assert!(with.contains("S3_BUCKET_NAME=\"relay-backups\"\n"));

        form.set("BACKUP_PROVIDER", "none");
        let without = build_document(Some(WizardMode::Full), &form, &ConfigDocument::default())
            .unwrap();
        assert!(!without.contains("S3_"));
    }

    #[test]
    fn load_then_build_is_stable() {
        let existing = ConfigDocument::parse("UNMANAGED_KEY=\"x\"\n");
        let mut form = full_form();
        form.set("BACKUP_PROVIDER", "s3");
        form.set("S3_ENDPOINT", "https://s3.example.com");
        form.set("CHAT_RELAY_WOT_DEPTH", "4");
        let first = build_document(Some(WizardMode::Full), &form, &existing).unwrap();

        let reloaded = ConfigDocument::parse(&first);
        let form2 = load_into_form(&reloaded);
        assert_eq!(form2.get(OWNER_NPUB_FULL), Some(NPUB));
        assert_eq!(form2.get(RELAY_URL_SIMPLE), Some("relay.example.com"));
        let second = build_document(Some(WizardMode::Full), &form2, &reloaded).unwrap();
        assert_eq!(first, second);
        assert!(second.contains("UNMANAGED_KEY=\"x\"\n"));
    }

    #[test]
    fn username_is_recovered_from_private_relay_name() {
        let doc = ConfigDocument::parse(
            "PRIVATE_RELAY_NAME=\"Alice's Private Relay\"\nRELAY_URL=\"wss://relay.example.com/x\"\nPRIVATE_RELAY_ALLOW_EMPTY_FILTERS=\"YES\"\n",
        );
        let form = load_into_form(&doc);
        assert_eq!(form.get(USERNAME), Some("Alice"));
        assert_eq!(form.get(RELAY_URL), Some("relay.example.com"));
        assert_eq!(form.get("PRIVATE_RELAY_ALLOW_EMPTY_FILTERS"), Some("true"));

        let plain = load_into_form(&ConfigDocument::parse("PRIVATE_RELAY_NAME=\"Vault\"\n"));
        assert_eq!(plain.get(USERNAME), Some(""));
    }
}
