// Application state (in-memory)
//
// NOTE: This is NOT persisted. The configuration document is re-fetched on every launch and after
// every save; relay lists, logs and import progress live only as long as the process.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::api::relays::RelayLists;
use crate::api::{RelayListKind, StreamKind};
use crate::form::FormValues;
use crate::import::RunStatusTracker;
use crate::models::log::LogView;
use crate::models::responses::{ImportInfo, RelayStatus, TorInfo};
use crate::store::ConfigDocument;
use crate::wizard::WizardController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Wizard,
    Relays,
    Import,
    Logs,
    Advanced,
}

impl Tab {
    pub const ALL: [Tab; 5] = [Tab::Wizard, Tab::Relays, Tab::Import, Tab::Logs, Tab::Advanced];

    pub fn title(&self) -> &'static str {
        match self {
            Tab::Wizard => "Configuration",
            Tab::Relays => "Relays",
            Tab::Import => "Import Notes",
            Tab::Logs => "Logs",
            Tab::Advanced => "Advanced",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    pub expires_at: Instant,
}

/// One flag per resource; a second request while the flag is set is refused.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    pub env_save: bool,
    pub relay_save: HashSet<RelayListKind>,
    pub restart: bool,
    pub logs_download: bool,
}

/// Latest subscription generation per push feed. Messages tagged with an older generation
/// belong to a subscription that has since been replaced and are dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamGenerations {
    pub import: u64,
    pub logs: u64,
}

impl StreamGenerations {
    pub fn current(&self, kind: StreamKind) -> u64 {
        match kind {
            StreamKind::Import => self.import,
            StreamKind::Logs => self.logs,
        }
    }

    pub fn bump(&mut self, kind: StreamKind) -> u64 {
        let slot = match kind {
            StreamKind::Import => &mut self.import,
            StreamKind::Logs => &mut self.logs,
        };
        *slot += 1;
        *slot
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    pub tab: Tab,

    // Configuration
    pub document: ConfigDocument,
    pub env_loaded: bool,
    pub form: FormValues,
    pub wizard: WizardController,
    pub advanced_text: String,

    // Relay lists
    pub relays: RelayLists,

    // Service info
    pub relay_status: Option<RelayStatus>,
    pub status_error: Option<String>,
    pub version: Option<String>,
    pub tor: Option<TorInfo>,

    // Import
    pub import: RunStatusTracker,
    pub import_info: Option<ImportInfo>,

    // Relay log viewer
    pub relay_log: LogView,
    pub logs_streaming: bool,

    pub notification: Option<Notification>,
    pub notification_ttl: Duration,
    pub in_flight: InFlight,
    pub streams: StreamGenerations,
}

impl AppState {
    pub fn new(log_cap: usize, notification_ttl: Duration) -> Self {
        Self {
            tab: Tab::Wizard,
            document: ConfigDocument::default(),
            env_loaded: false,
            form: FormValues::new(),
            wizard: WizardController::new(),
            advanced_text: String::new(),
            relays: RelayLists::default(),
            relay_status: None,
            status_error: None,
            version: None,
            tor: None,
            import: RunStatusTracker::new(log_cap),
            import_info: None,
            relay_log: LogView::with_cap(log_cap),
            logs_streaming: false,
            notification: None,
            notification_ttl,
            in_flight: InFlight::default(),
            streams: StreamGenerations::default(),
        }
    }

    pub fn notify(&mut self, kind: NotificationKind, message: impl Into<String>) {
        self.notification = Some(Notification {
            kind,
            message: message.into(),
            expires_at: Instant::now() + self.notification_ttl,
        });
    }

    /// Drop the notification once its display time has passed.
    pub fn expire_notification(&mut self, now: Instant) -> bool {
        match &self.notification {
            Some(n) if n.expires_at <= now => {
                self.notification = None;
                true
            }
            _ => false,
        }
    }
}
