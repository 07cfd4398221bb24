//! Typed layout of the generated `.env` file: ordered sections, each an ordered list of keys with
//! a coercion kind and a default.

/// How a value is coerced and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Free text, rendered quoted.
    String,
    /// `true`/`false`, rendered bare.
    Boolean,
    /// Number, rendered bare.
    Integer,
    /// Bare `host[:port]`, rendered quoted.
    Host,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub key: &'static str,
    pub kind: ValueKind,
    pub default: &'static str,
}

impl FieldDef {
    const fn text(key: &'static str, default: &'static str) -> Self {
        Self {
            key,
            kind: ValueKind::String,
            default,
        }
    }

    const fn flag(key: &'static str, default: &'static str) -> Self {
        Self {
            key,
            kind: ValueKind::Boolean,
            default,
        }
    }

    const fn number(key: &'static str, default: &'static str) -> Self {
        Self {
            key,
            kind: ValueKind::Integer,
            default,
        }
    }

    const fn host(key: &'static str, default: &'static str) -> Self {
        Self {
            key,
            kind: ValueKind::Host,
            default,
        }
    }

    pub fn default_bool(&self) -> bool {
        self.default == "true"
    }

    pub fn default_number(&self) -> i64 {
        self.default.parse().unwrap_or(0)
    }
}

/// When a section is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionCondition {
    Always,
    /// Only when the resolved value of `key` equals `value`.
    KeyEquals {
        key: &'static str,
        value: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct Section {
    pub header: &'static [&'static str],
    pub fields: &'static [FieldDef],
    pub condition: SectionCondition,
}

pub const OWNER_NPUB: &str = "OWNER_NPUB";
pub const RELAY_URL: &str = "RELAY_URL";
pub const BACKUP_PROVIDER: &str = "BACKUP_PROVIDER";
pub const BACKUP_PROVIDER_S3: &str = "s3";

/// The four relay profiles sharing the same field shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayProfile {
    Private,
    Chat,
    Outbox,
    Inbox,
}

impl RelayProfile {
    pub const ALL: [RelayProfile; 4] = [
        RelayProfile::Private,
        RelayProfile::Chat,
        RelayProfile::Outbox,
        RelayProfile::Inbox,
    ];

    pub fn prefix(&self) -> &'static str {
        match self {
            RelayProfile::Private => "PRIVATE_RELAY",
            RelayProfile::Chat => "CHAT_RELAY",
            RelayProfile::Outbox => "OUTBOX_RELAY",
            RelayProfile::Inbox => "INBOX_RELAY",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            RelayProfile::Private => "Private Relay",
            RelayProfile::Chat => "Chat Relay",
            RelayProfile::Outbox => "Outbox Relay",
            RelayProfile::Inbox => "Inbox Relay",
        }
    }

    /// Description written in simple mode.
    pub fn default_description(&self) -> &'static str {
        match self {
            RelayProfile::Private => "A safe place to store my drafts and ecash",
            RelayProfile::Chat => "A relay for private chats",
            RelayProfile::Outbox => "A relay and Blossom server for public messages and media",
            RelayProfile::Inbox => "Send your interactions with my notes here",
        }
    }

    pub fn name_key(&self) -> String {
        format!("{}_NAME", self.prefix())
    }

    pub fn npub_key(&self) -> String {
        format!("{}_NPUB", self.prefix())
    }

    pub fn description_key(&self) -> String {
        format!("{}_DESCRIPTION", self.prefix())
    }

    pub fn icon_key(&self) -> String {
        format!("{}_ICON", self.prefix())
    }

    /// Display name derived from a username, e.g. `Alice's Chat Relay`.
    pub fn display_name(&self, username: &str) -> String {
        format!("{}'s {}", username, self.title())
    }
}

const OWNER_FIELDS: &[FieldDef] = &[FieldDef::text(OWNER_NPUB, "")];

const RELAY_FIELDS: &[FieldDef] = &[
    FieldDef::host(RELAY_URL, "localhost:3355"),
    FieldDef::number("RELAY_PORT", "3355"),
    FieldDef::text("RELAY_BIND_ADDRESS", "0.0.0.0"),
];

const DATABASE_FIELDS: &[FieldDef] = &[
    FieldDef::text("DB_ENGINE", "badger"),
    FieldDef::number("LMDB_MAPSIZE", "0"),
];

const STORAGE_FIELDS: &[FieldDef] = &[FieldDef::text("BLOSSOM_PATH", "/haven/blossom")];

const PRIVATE_FIELDS: &[FieldDef] = &[
    FieldDef::text("PRIVATE_RELAY_NAME", "My Private Relay"),
    FieldDef::text("PRIVATE_RELAY_NPUB", ""),
    FieldDef::text(
        "PRIVATE_RELAY_DESCRIPTION",
        "A safe place to store my drafts and ecash",
    ),
    FieldDef::text("PRIVATE_RELAY_ICON", ""),
];

const PRIVATE_LIMITS: &[FieldDef] = &[
    FieldDef::number("PRIVATE_RELAY_EVENT_IP_LIMITER_TOKENS_PER_INTERVAL", "50"),
    FieldDef::number("PRIVATE_RELAY_EVENT_IP_LIMITER_INTERVAL", "1"),
    FieldDef::number("PRIVATE_RELAY_EVENT_IP_LIMITER_MAX_TOKENS", "100"),
    FieldDef::flag("PRIVATE_RELAY_ALLOW_EMPTY_FILTERS", "true"),
    FieldDef::flag("PRIVATE_RELAY_ALLOW_COMPLEX_FILTERS", "true"),
    FieldDef::number("PRIVATE_RELAY_CONNECTION_RATE_LIMITER_TOKENS_PER_INTERVAL", "3"),
    FieldDef::number("PRIVATE_RELAY_CONNECTION_RATE_LIMITER_INTERVAL", "5"),
    FieldDef::number("PRIVATE_RELAY_CONNECTION_RATE_LIMITER_MAX_TOKENS", "9"),
];

const CHAT_FIELDS: &[FieldDef] = &[
    FieldDef::text("CHAT_RELAY_NAME", "My Chat Relay"),
    FieldDef::text("CHAT_RELAY_NPUB", ""),
    FieldDef::text("CHAT_RELAY_DESCRIPTION", "A relay for private chats"),
    FieldDef::text("CHAT_RELAY_ICON", ""),
    FieldDef::number("CHAT_RELAY_WOT_DEPTH", "3"),
    FieldDef::number("CHAT_RELAY_WOT_REFRESH_INTERVAL_HOURS", "24"),
    FieldDef::number("CHAT_RELAY_MINIMUM_FOLLOWERS", "3"),
];

const CHAT_LIMITS: &[FieldDef] = &[
    FieldDef::number("CHAT_RELAY_EVENT_IP_LIMITER_TOKENS_PER_INTERVAL", "50"),
    FieldDef::number("CHAT_RELAY_EVENT_IP_LIMITER_INTERVAL", "1"),
    FieldDef::number("CHAT_RELAY_EVENT_IP_LIMITER_MAX_TOKENS", "100"),
    FieldDef::flag("CHAT_RELAY_ALLOW_EMPTY_FILTERS", "false"),
    FieldDef::flag("CHAT_RELAY_ALLOW_COMPLEX_FILTERS", "false"),
    FieldDef::number("CHAT_RELAY_CONNECTION_RATE_LIMITER_TOKENS_PER_INTERVAL", "3"),
    FieldDef::number("CHAT_RELAY_CONNECTION_RATE_LIMITER_INTERVAL", "3"),
    FieldDef::number("CHAT_RELAY_CONNECTION_RATE_LIMITER_MAX_TOKENS", "9"),
];

const OUTBOX_FIELDS: &[FieldDef] = &[
    FieldDef::text("OUTBOX_RELAY_NAME", "My Outbox Relay"),
    FieldDef::text("OUTBOX_RELAY_NPUB", ""),
    FieldDef::text(
        "OUTBOX_RELAY_DESCRIPTION",
        "A relay and Blossom server for public messages and media",
    ),
    FieldDef::text("OUTBOX_RELAY_ICON", ""),
];

const OUTBOX_LIMITS: &[FieldDef] = &[
    FieldDef::number("OUTBOX_RELAY_EVENT_IP_LIMITER_TOKENS_PER_INTERVAL", "10"),
    FieldDef::number("OUTBOX_RELAY_EVENT_IP_LIMITER_INTERVAL", "60"),
    FieldDef::number("OUTBOX_RELAY_EVENT_IP_LIMITER_MAX_TOKENS", "100"),
    FieldDef::flag("OUTBOX_RELAY_ALLOW_EMPTY_FILTERS", "false"),
    FieldDef::flag("OUTBOX_RELAY_ALLOW_COMPLEX_FILTERS", "false"),
    FieldDef::number("OUTBOX_RELAY_CONNECTION_RATE_LIMITER_TOKENS_PER_INTERVAL", "3"),
    FieldDef::number("OUTBOX_RELAY_CONNECTION_RATE_LIMITER_INTERVAL", "1"),
    FieldDef::number("OUTBOX_RELAY_CONNECTION_RATE_LIMITER_MAX_TOKENS", "9"),
];

const INBOX_FIELDS: &[FieldDef] = &[
    FieldDef::text("INBOX_RELAY_NAME", "My Inbox Relay"),
    FieldDef::text("INBOX_RELAY_NPUB", ""),
    FieldDef::text(
        "INBOX_RELAY_DESCRIPTION",
        "Send your interactions with my notes here",
    ),
    FieldDef::text("INBOX_RELAY_ICON", ""),
    FieldDef::number("INBOX_PULL_INTERVAL_SECONDS", "600"),
];

const INBOX_LIMITS: &[FieldDef] = &[
    FieldDef::number("INBOX_RELAY_EVENT_IP_LIMITER_TOKENS_PER_INTERVAL", "10"),
    FieldDef::number("INBOX_RELAY_EVENT_IP_LIMITER_INTERVAL", "1"),
    FieldDef::number("INBOX_RELAY_EVENT_IP_LIMITER_MAX_TOKENS", "20"),
    FieldDef::flag("INBOX_RELAY_ALLOW_EMPTY_FILTERS", "false"),
    FieldDef::flag("INBOX_RELAY_ALLOW_COMPLEX_FILTERS", "false"),
    FieldDef::number("INBOX_RELAY_CONNECTION_RATE_LIMITER_TOKENS_PER_INTERVAL", "3"),
    FieldDef::number("INBOX_RELAY_CONNECTION_RATE_LIMITER_INTERVAL", "1"),
    FieldDef::number("INBOX_RELAY_CONNECTION_RATE_LIMITER_MAX_TOKENS", "9"),
];

const IMPORT_FIELDS: &[FieldDef] = &[
    FieldDef::text("IMPORT_START_DATE", "2025-10-13"),
    FieldDef::number("IMPORT_QUERY_INTERVAL_SECONDS", "600"),
    FieldDef::number("IMPORT_OWNER_NOTES_FETCH_TIMEOUT_SECONDS", "60"),
    FieldDef::number("IMPORT_TAGGED_NOTES_FETCH_TIMEOUT_SECONDS", "120"),
    FieldDef::text("IMPORT_SEED_RELAYS_FILE", "/haven-config/relays_import.json"),
];

const BACKUP_FIELDS: &[FieldDef] = &[
    FieldDef::text(BACKUP_PROVIDER, "none"),
    FieldDef::number("BACKUP_INTERVAL_HOURS", "24"),
];

const S3_FIELDS: &[FieldDef] = &[
    FieldDef::text("S3_ACCESS_KEY_ID", ""),
    FieldDef::text("S3_SECRET_KEY", ""),
    FieldDef::text("S3_ENDPOINT", ""),
    FieldDef::text("S3_REGION", ""),
    FieldDef::text("S3_BUCKET_NAME", ""),
];

const BLASTR_FIELDS: &[FieldDef] = &[FieldDef::text(
    "BLASTR_RELAYS_FILE",
    "/haven-config/relays_blastr.json",
)];

const WOT_FIELDS: &[FieldDef] = &[FieldDef::number("WOT_FETCH_TIMEOUT_SECONDS", "60")];

const LOGGING_FIELDS: &[FieldDef] = &[
    FieldDef::text("HAVEN_LOG_LEVEL", "INFO"),
    FieldDef::text("TZ", "UTC"),
];

const fn always(header: &'static [&'static str], fields: &'static [FieldDef]) -> Section {
    Section {
        header,
        fields,
        condition: SectionCondition::Always,
    }
}

/// Every section of the generated file, in output order.
pub const SECTIONS: &[Section] = &[
    always(
        &[
            "# Owner Configuration (REQUIRED)",
            "# Your Nostr public key (npub format)",
            "# Get this from your Nostr client or generate one at https://nostr.how",
        ],
        OWNER_FIELDS,
    ),
    always(&["# Relay Configuration (REQUIRED)"], RELAY_FIELDS),
    always(&["# Database Configuration"], DATABASE_FIELDS),
    always(&["# Media Storage Path"], STORAGE_FIELDS),
    always(&["## Private Relay Settings"], PRIVATE_FIELDS),
    always(&["## Private Relay Rate Limiters"], PRIVATE_LIMITS),
    always(&["## Chat Relay Settings"], CHAT_FIELDS),
    always(&["## Chat Relay Rate Limiters"], CHAT_LIMITS),
    always(&["## Outbox Relay Settings"], OUTBOX_FIELDS),
    always(&["## Outbox Relay Rate Limiters"], OUTBOX_LIMITS),
    always(&["## Inbox Relay Settings"], INBOX_FIELDS),
    always(&["## Inbox Relay Rate Limiters"], INBOX_LIMITS),
    always(&["## Import Settings"], IMPORT_FIELDS),
    always(&["## Backup Settings"], BACKUP_FIELDS),
    Section {
        header: &["## S3 Backup Settings"],
        fields: S3_FIELDS,
        condition: SectionCondition::KeyEquals {
            key: BACKUP_PROVIDER,
            value: BACKUP_PROVIDER_S3,
        },
    },
    always(&["## Blastr Settings"], BLASTR_FIELDS),
    always(&["## WOT Settings"], WOT_FIELDS),
    always(&["## Logging"], LOGGING_FIELDS),
];

/// Header of the trailing section holding keys the wizard does not manage.
pub const EXTRA_SECTION_HEADER: &str = "## Additional Settings";

/// Every managed field, in output order.
pub fn all_fields() -> impl Iterator<Item = &'static FieldDef> {
    SECTIONS.iter().flat_map(|s| s.fields.iter())
}

pub fn field(key: &str) -> Option<&'static FieldDef> {
    all_fields().find(|f| f.key == key)
}

pub fn is_managed(key: &str) -> bool {
    field(key).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_unique_across_sections() {
        let mut seen = HashSet::new();
        for f in all_fields() {
            assert!(seen.insert(f.key), "duplicate key {}", f.key);
        }
    }

    #[test]
    fn numeric_and_boolean_defaults_are_well_formed() {
        for f in all_fields() {
            match f.kind {
                ValueKind::Integer => assert!(
                    f.default.parse::<i64>().is_ok(),
                    "bad numeric default for {}",
                    f.key
                ),
                ValueKind::Boolean => assert!(
                    f.default == "true" || f.default == "false",
                    "bad boolean default for {}",
                    f.key
                ),
                _ => {}
            }
        }
    }

    #[test]
    fn profile_keys_exist_in_schema() {
        for p in RelayProfile::ALL {
            assert!(is_managed(&p.name_key()));
            assert!(is_managed(&p.npub_key()));
            assert!(is_managed(&p.description_key()));
            assert!(is_managed(&p.icon_key()));
        }
        assert_eq!(
            RelayProfile::Chat.display_name("Alice"),
            "Alice's Chat Relay"
        );
    }
}
