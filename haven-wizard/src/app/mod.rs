//! AppController: the single owner of application state.
//!
//! Every user intent and every background result is a synchronous transition on `AppState` that
//! returns the commands to run next. Nothing here awaits or touches the network, so a transition
//! always runs to completion before the next one starts.

pub mod commands;
pub mod executor;

use std::time::Instant;

use log::{debug, info, warn};
use uuid::Uuid;

use crate::api::{RelayListKind, StreamEvent, StreamKind};
use crate::form::{build_document, load_into_form, WizardMode};
use crate::import::{ImportRunState, StreamControl};
use crate::models::log::LogLevel;
use crate::models::state::{AppState, NotificationKind, Tab};
use crate::store::ConfigDocument;
use crate::utils::logging::mask_env_secrets;
use crate::utils::validation::ValidationError;
use crate::wizard::AdvanceOutcome;

pub use commands::{Command, SaveOrigin, StreamUpdate, UiMsg};
pub use executor::Executor;

pub const REQUIRED_FIELDS_NOTICE: &str = "Please fill in all required fields";
pub const LOG_STREAM_LOST_LINE: &str = "Connection to log stream lost";
const BUSY_NOTICE: &str = "Please wait for the current request to finish";

pub struct AppController {
    state: AppState,
}

impl AppController {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Initial fetches issued once the loop is running.
    pub fn startup(&mut self) -> Vec<Command> {
        info!("[PHASE: app] [STEP: startup] Loading configuration, relay lists and status");
        vec![
            Command::LoadEnv,
            Command::LoadRelays(RelayListKind::Blastr),
            Command::LoadRelays(RelayListKind::Import),
            Command::CheckStatus,
            Command::LoadVersion,
            Command::LoadTor,
        ]
    }

    // =========================
    // Tabs
    // =========================

    pub fn switch_tab(&mut self, tab: Tab) -> Vec<Command> {
        let previous = self.state.tab;
        if tab == previous {
            return Vec::new();
        }
        let mut cmds = Vec::new();
        if previous == Tab::Logs {
            cmds.extend(self.close_stream(StreamKind::Logs));
        }
        self.state.tab = tab;
        debug!("[PHASE: app] [STEP: tab] {:?} -> {:?}", previous, tab);

        match tab {
            Tab::Wizard => {
                self.state.wizard.reset();
                cmds.push(Command::LoadEnv);
            }
            Tab::Relays => {}
            Tab::Import => cmds.push(Command::LoadImportInfo),
            Tab::Logs => {
                self.state.relay_log.clear();
                self.state.logs_streaming = true;
                let generation = self.state.streams.bump(StreamKind::Logs);
                cmds.push(Command::OpenStream {
                    kind: StreamKind::Logs,
                    generation,
                });
            }
            Tab::Advanced => cmds.push(Command::LoadEnv),
        }
        cmds
    }

    // =========================
    // Wizard
    // =========================

    pub fn select_mode(&mut self, mode: WizardMode) -> Vec<Command> {
        if self.state.wizard.select_mode(mode) {
            info!("[PHASE: wizard] [STEP: mode] Selected {} setup", mode.as_str());
        }
        Vec::new()
    }

    pub fn set_field(&mut self, form_key: &str, value: impl Into<String>) {
        self.state.form.set(form_key, value);
    }

    pub fn wizard_next(&mut self) -> Vec<Command> {
        let st = &mut self.state;
        match st.wizard.advance(&st.form) {
            AdvanceOutcome::Blocked(missing) => {
                debug!("[PHASE: wizard] [STEP: next] Missing {:?}", missing);
                st.notify(NotificationKind::Error, REQUIRED_FIELDS_NOTICE);
                Vec::new()
            }
            AdvanceOutcome::SaveRequested => self.wizard_save(),
            AdvanceOutcome::Moved | AdvanceOutcome::Ignored => Vec::new(),
        }
    }

    pub fn wizard_back(&mut self) -> Vec<Command> {
        self.state.wizard.retreat();
        Vec::new()
    }

    pub fn wizard_jump(&mut self, step: u8) -> Vec<Command> {
        self.state.wizard.jump_to(step);
        Vec::new()
    }

    pub fn wizard_save(&mut self) -> Vec<Command> {
        let st = &mut self.state;
        if st.in_flight.env_save {
            st.notify(NotificationKind::Info, BUSY_NOTICE);
            return Vec::new();
        }
        if !st.env_loaded {
            st.notify(
                NotificationKind::Error,
                "Configuration has not been loaded yet; retrying",
            );
            return vec![Command::LoadEnv];
        }

        let mut missing = st.wizard.check_current_step(&st.form);
        if missing.is_empty() {
            missing = st.wizard.missing_anywhere(&st.form);
        }
        if !missing.is_empty() {
            warn!("[PHASE: wizard] [STEP: save] Required fields empty: {:?}", missing);
            st.notify(NotificationKind::Error, REQUIRED_FIELDS_NOTICE);
            return Vec::new();
        }

        match build_document(st.wizard.mode(), &st.form, &st.document) {
            Ok(content) => {
                let correlation_id = Uuid::new_v4().simple().to_string();
                info!(
                    "[PHASE: wizard] [STEP: save] Saving configuration ({} bytes) correlation_id={}",
                    content.len(),
                    correlation_id
                );
                debug!("[PHASE: wizard] [STEP: save] {}", mask_env_secrets(&content));
                st.in_flight.env_save = true;
                vec![Command::SaveEnv {
                    origin: SaveOrigin::Wizard,
                    content,
                    correlation_id,
                }]
            }
            Err(e) => {
                warn!("[PHASE: wizard] [STEP: save] Validation failed: {}", e);
                st.notify(NotificationKind::Error, e.to_string());
                Vec::new()
            }
        }
    }

    // =========================
    // Advanced editor
    // =========================

    pub fn set_advanced_text(&mut self, text: impl Into<String>) {
        self.state.advanced_text = text.into();
    }

    /// Discard local edits and fetch the stored configuration again.
    pub fn advanced_reload(&mut self) -> Vec<Command> {
        vec![Command::LoadEnv]
    }

    pub fn advanced_save(&mut self) -> Vec<Command> {
        let st = &mut self.state;
        if st.in_flight.env_save {
            st.notify(NotificationKind::Info, BUSY_NOTICE);
            return Vec::new();
        }
        if st.advanced_text.trim().is_empty() {
            st.notify(
                NotificationKind::Error,
                ValidationError::EmptyConfiguration.to_string(),
            );
            return Vec::new();
        }
        let correlation_id = Uuid::new_v4().simple().to_string();
        info!(
            "[PHASE: advanced] [STEP: save] Saving raw configuration correlation_id={}",
            correlation_id
        );
        st.in_flight.env_save = true;
        vec![Command::SaveEnv {
            origin: SaveOrigin::Advanced,
            content: st.advanced_text.clone(),
            correlation_id,
        }]
    }

    // =========================
    // Relay lists
    // =========================

    pub fn relay_add(&mut self, kind: RelayListKind, raw: &str) -> bool {
        match self.state.relays.add(kind, raw) {
            Ok(relay) => {
                debug!("[PHASE: relays] [STEP: add] {} += {}", kind.as_str(), relay);
                self.state
                    .notify(NotificationKind::Info, "Relay added (remember to save)");
                true
            }
            Err(e) => {
                self.state.notify(NotificationKind::Error, e.to_string());
                false
            }
        }
    }

    pub fn relay_remove(&mut self, kind: RelayListKind, index: usize) {
        if self.state.relays.remove(kind, index).is_some() {
            self.state
                .notify(NotificationKind::Info, "Relay removed (remember to save)");
        }
    }

    pub fn relay_update(&mut self, kind: RelayListKind, index: usize, raw: &str) {
        self.state.relays.update(kind, index, raw);
    }

    pub fn relay_save(&mut self, kind: RelayListKind) -> Vec<Command> {
        let st = &mut self.state;
        if !st.in_flight.relay_save.insert(kind) {
            st.notify(NotificationKind::Info, BUSY_NOTICE);
            return Vec::new();
        }
        let relays = st.relays.get(kind).to_vec();
        info!(
            "[PHASE: relays] [STEP: save] Saving {} {} relay(s)",
            relays.len(),
            kind.as_str()
        );
        vec![Command::SaveRelays { kind, relays }]
    }

    pub fn relay_reload(&mut self, kind: RelayListKind) -> Vec<Command> {
        vec![Command::LoadRelays(kind)]
    }

    // =========================
    // Service actions
    // =========================

    pub fn restart(&mut self) -> Vec<Command> {
        let st = &mut self.state;
        if st.in_flight.restart {
            st.notify(NotificationKind::Info, BUSY_NOTICE);
            return Vec::new();
        }
        st.in_flight.restart = true;
        st.notify(NotificationKind::Info, "Restarting HAVEN relay...");
        info!("[PHASE: service] [STEP: restart] Restart requested");
        vec![Command::Restart]
    }

    pub fn import_start(&mut self) -> Vec<Command> {
        let st = &mut self.state;
        match st.import.begin_start(st.relay_status.as_ref()) {
            Ok(()) => {
                let correlation_id = Uuid::new_v4().simple().to_string();
                info!(
                    "[PHASE: import] [STEP: start] Starting import correlation_id={}",
                    correlation_id
                );
                vec![Command::RunImport { correlation_id }]
            }
            Err(refusal) => {
                st.notify(NotificationKind::Error, refusal.message());
                Vec::new()
            }
        }
    }

    pub fn import_cancel(&mut self) -> Vec<Command> {
        if self.state.import.begin_cancel() {
            info!("[PHASE: import] [STEP: cancel] Cancel requested");
            vec![Command::CancelImport]
        } else {
            Vec::new()
        }
    }

    pub fn download_logs(&mut self) -> Vec<Command> {
        let st = &mut self.state;
        if st.in_flight.logs_download {
            st.notify(NotificationKind::Info, BUSY_NOTICE);
            return Vec::new();
        }
        st.in_flight.logs_download = true;
        vec![Command::DownloadLogs]
    }

    // =========================
    // Timers
    // =========================

    /// Clear an expired notification. Returns true when something changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.state.expire_notification(now)
    }

    /// Periodic status poll; also reconciles the import tracker while its tab is open.
    pub fn poll(&mut self) -> Vec<Command> {
        let mut cmds = vec![Command::CheckStatus];
        let import = &self.state.import;
        if self.state.tab == Tab::Import && !import.is_subscribed() && !import.request_in_flight()
        {
            cmds.push(Command::LoadImportInfo);
        }
        cmds
    }

    // =========================
    // Results
    // =========================

    pub fn apply(&mut self, msg: UiMsg) -> Vec<Command> {
        match msg {
            UiMsg::EnvLoaded(Ok(content)) => {
                self.adopt_env(content);
                Vec::new()
            }
            UiMsg::EnvLoaded(Err(e)) => {
                warn!("[PHASE: config] [STEP: load] {}", e);
                self.state.notify(
                    NotificationKind::Error,
                    format!("Failed to load environment config: {}", e),
                );
                Vec::new()
            }
            UiMsg::EnvSaved {
                origin,
                result,
                reloaded,
            } => {
                self.state.in_flight.env_save = false;
                match result {
                    Ok(()) => {
                        info!("[PHASE: config] [STEP: save] Saved from {:?}", origin);
                        let notice = match origin {
                            SaveOrigin::Wizard => {
                                "Configuration saved successfully. Restart HAVEN to apply changes."
                            }
                            SaveOrigin::Advanced => "Configuration saved successfully",
                        };
                        self.state.notify(NotificationKind::Success, notice);
                        if let Some(content) = reloaded {
                            self.adopt_env(content);
                        }
                    }
                    Err(e) => {
                        warn!("[PHASE: config] [STEP: save] {}", e);
                        self.state
                            .notify(NotificationKind::Error, format!("Failed to save: {}", e));
                    }
                }
                Vec::new()
            }
            UiMsg::RelaysLoaded { kind, result } => {
                match result {
                    Ok(relays) => self.state.relays.replace(kind, relays),
                    Err(e) => self.state.notify(
                        NotificationKind::Error,
                        format!("Failed to load {} relays: {}", kind.as_str(), e),
                    ),
                }
                Vec::new()
            }
            UiMsg::RelaysSaved { kind, result } => {
                self.state.in_flight.relay_save.remove(&kind);
                match result {
                    Ok(()) => self.state.notify(
                        NotificationKind::Success,
                        format!("{} configuration saved successfully", kind.title()),
                    ),
                    Err(e) => self
                        .state
                        .notify(NotificationKind::Error, format!("Failed to save: {}", e)),
                }
                Vec::new()
            }
            UiMsg::StatusChecked(result) => {
                match result {
                    Ok(status) => {
                        self.state.relay_status = Some(status);
                        self.state.status_error = None;
                    }
                    Err(e) => {
                        debug!("[PHASE: service] [STEP: status] {}", e);
                        self.state.relay_status = None;
                        self.state.status_error = Some(e.to_string());
                    }
                }
                Vec::new()
            }
            UiMsg::VersionLoaded(result) => {
                match result {
                    Ok(version) => self.state.version = Some(version),
                    Err(e) => debug!("[PHASE: service] [STEP: version] {}", e),
                }
                Vec::new()
            }
            UiMsg::TorLoaded(result) => {
                match result {
                    Ok(tor) => self.state.tor = Some(tor),
                    Err(e) => debug!("[PHASE: service] [STEP: tor] {}", e),
                }
                Vec::new()
            }
            UiMsg::Restarted(result) => {
                self.state.in_flight.restart = false;
                match result {
                    Ok(()) => self.state.notify(
                        NotificationKind::Success,
                        "HAVEN relay restarted successfully",
                    ),
                    Err(e) => self
                        .state
                        .notify(NotificationKind::Error, format!("Failed to restart: {}", e)),
                }
                Vec::new()
            }
            UiMsg::ImportStarted(Ok(())) => {
                if self.state.import.start_accepted() {
                    let generation = self.state.streams.bump(StreamKind::Import);
                    vec![Command::OpenStream {
                        kind: StreamKind::Import,
                        generation,
                    }]
                } else {
                    Vec::new()
                }
            }
            UiMsg::ImportStarted(Err(e)) => {
                warn!("[PHASE: import] [STEP: start] {}", e);
                self.state.import.start_rejected(&e.to_string());
                self.state.notify(
                    NotificationKind::Error,
                    format!("Failed to start import: {}", e),
                );
                Vec::new()
            }
            UiMsg::ImportCancelled(Ok(())) => {
                self.state.import.cancel_accepted();
                Vec::new()
            }
            UiMsg::ImportCancelled(Err(e)) => {
                self.state.import.cancel_failed();
                self.state.notify(
                    NotificationKind::Error,
                    format!("Failed to cancel import: {}", e),
                );
                Vec::new()
            }
            UiMsg::ImportInfoLoaded(Ok(info)) => {
                let mut cmds = Vec::new();
                if let Some(status) = info.status.as_deref() {
                    let server_active = ImportRunState::from_wire(status)
                        .map_or(false, |s| s.is_active());
                    self.state.import.reconcile(status);
                    if server_active && self.state.import.needs_stream() {
                        info!("[PHASE: import] [STEP: reconcile] Re-attaching to running import");
                        self.state.import.attach_stream();
                        let generation = self.state.streams.bump(StreamKind::Import);
                        cmds.push(Command::OpenStream {
                            kind: StreamKind::Import,
                            generation,
                        });
                    }
                }
                self.state.import_info = Some(info);
                cmds
            }
            UiMsg::ImportInfoLoaded(Err(e)) => {
                warn!("[PHASE: import] [STEP: info] {}", e);
                self.state.notify(
                    NotificationKind::Error,
                    "Failed to load import information",
                );
                Vec::new()
            }
            UiMsg::Stream {
                kind,
                generation,
                update,
            } => {
                if generation != self.state.streams.current(kind) {
                    debug!(
                        "[PHASE: stream] [STEP: stale] Dropping {:?} message from generation {}",
                        kind, generation
                    );
                    return Vec::new();
                }
                match kind {
                    StreamKind::Import => self.apply_import_stream(update),
                    StreamKind::Logs => self.apply_log_stream(update),
                }
            }
            UiMsg::LogsDownloaded(result) => {
                self.state.in_flight.logs_download = false;
                match result {
                    Ok(path) => self.state.notify(
                        NotificationKind::Success,
                        format!("Logs saved to {}", path.display()),
                    ),
                    Err(e) => self.state.notify(
                        NotificationKind::Error,
                        format!("Failed to download logs: {}", e),
                    ),
                }
                Vec::new()
            }
        }
    }

    fn adopt_env(&mut self, content: String) {
        let report = ConfigDocument::parse_with_report(&content);
        if !report.dropped_lines.is_empty() {
            warn!(
                "[PHASE: config] [STEP: parse] Ignored malformed lines {:?}",
                report.dropped_lines
            );
        }
        self.state.document = report.document;
        self.state.env_loaded = true;
        // Inputs are only refreshed before a track is chosen so a reload never clobbers edits.
        if self.state.wizard.mode().is_none() {
            self.state.form = load_into_form(&self.state.document);
        }
        self.state.advanced_text = content;
    }

    fn apply_import_stream(&mut self, update: StreamUpdate) -> Vec<Command> {
        match update {
            StreamUpdate::Event(event) => {
                if self.state.import.apply_event(event) == StreamControl::Continue {
                    return Vec::new();
                }
                match self.state.import.state() {
                    ImportRunState::Completed => self
                        .state
                        .notify(NotificationKind::Success, "Import completed successfully!"),
                    ImportRunState::Failed => self.state.notify(
                        NotificationKind::Error,
                        "Import failed. Check logs for details.",
                    ),
                    ImportRunState::Cancelled => {
                        self.state.notify(NotificationKind::Info, "Import cancelled")
                    }
                    _ => {}
                }
                let mut cmds = self.close_stream(StreamKind::Import);
                cmds.push(Command::LoadImportInfo);
                cmds
            }
            StreamUpdate::Lost(e) => {
                warn!("[PHASE: import] [STEP: stream] {}", e);
                self.state.import.stream_lost();
                Vec::new()
            }
            StreamUpdate::Ended => {
                self.state.import.stream_ended();
                Vec::new()
            }
        }
    }

    fn apply_log_stream(&mut self, update: StreamUpdate) -> Vec<Command> {
        match update {
            StreamUpdate::Event(StreamEvent::Log { level, message }) => {
                self.state.relay_log.push(level, message);
            }
            StreamUpdate::Event(StreamEvent::Status(_)) => {}
            StreamUpdate::Lost(e) => {
                warn!("[PHASE: logs] [STEP: stream] {}", e);
                self.state.relay_log.push(LogLevel::Error, LOG_STREAM_LOST_LINE);
                self.state.logs_streaming = false;
            }
            StreamUpdate::Ended => self.state.logs_streaming = false,
        }
        Vec::new()
    }

    /// Retire the current subscription; anything it still delivers is stale.
    fn close_stream(&mut self, kind: StreamKind) -> Vec<Command> {
        self.state.streams.bump(kind);
        if kind == StreamKind::Logs {
            self.state.logs_streaming = false;
        }
        vec![Command::CloseStream(kind)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::models::responses::{ImportInfo, RelayStatus};
    use std::time::Duration;

    const OWNER: &str = "npub1ownerownerowner";
    const EXISTING: &str = "OWNER_NPUB=\"npub1previous\"\nRELAY_URL=\"relay.example.com\"\nCUSTOM_FLAG=on\n";

    fn controller() -> AppController {
        AppController::new(AppState::new(100, Duration::from_secs(4)))
    }

    fn loaded() -> AppController {
        let mut app = controller();
        app.apply(UiMsg::EnvLoaded(Ok(EXISTING.to_string())));
        app
    }

    fn healthy() -> RelayStatus {
        RelayStatus {
            status: "running".into(),
            health: "healthy".into(),
            running: Some(true),
        }
    }

    fn notice(app: &AppController) -> Option<(NotificationKind, String)> {
        app.state()
            .notification
            .as_ref()
            .map(|n| (n.kind, n.message.clone()))
    }

    fn running_import(app: &mut AppController) -> u64 {
        app.apply(UiMsg::StatusChecked(Ok(healthy())));
        assert!(matches!(
            app.import_start().as_slice(),
            [Command::RunImport { .. }]
        ));
        match app.apply(UiMsg::ImportStarted(Ok(()))).as_slice() {
            [Command::OpenStream {
                kind: StreamKind::Import,
                generation,
            }] => *generation,
            other => panic!("unexpected commands {:?}", other),
        }
    }

    #[test]
    fn startup_loads_everything_once() {
        let cmds = controller().startup();
        assert_eq!(cmds.len(), 6);
        assert!(cmds.contains(&Command::LoadEnv));
        assert!(cmds.contains(&Command::LoadRelays(RelayListKind::Import)));
    }

    #[test]
    fn env_load_fills_form_and_editor() {
        let app = loaded();
        assert!(app.state().env_loaded);
        assert_eq!(app.state().form.get("OWNER_NPUB"), Some("npub1previous"));
        assert_eq!(app.state().form.get("RELAY_URL_SIMPLE"), Some("relay.example.com"));
        assert_eq!(app.state().advanced_text, EXISTING);
    }

    #[test]
    fn simple_track_saves_once_and_guards_in_flight() {
        let mut app = loaded();
        app.select_mode(WizardMode::Simple);
        app.set_field("OWNER_NPUB", OWNER);
        app.set_field("USERNAME", "alice");

        let cmds = app.wizard_next();
        let [Command::SaveEnv {
            origin: SaveOrigin::Wizard,
            content,
            correlation_id,
        }] = cmds.as_slice()
        else {
            panic!("expected a save, got {:?}", cmds);
        };
        assert!(content.contains(&format!("OWNER_NPUB=\"{}\"", OWNER)));
        assert!(content.contains("PRIVATE_RELAY_NAME=\"alice's Private Relay\""));
        assert!(content.contains("CUSTOM_FLAG=on"));
        assert_eq!(correlation_id.len(), 32);
        assert!(app.state().in_flight.env_save);

        assert!(app.wizard_save().is_empty());
        assert_eq!(
            notice(&app).map(|n| n.1),
            Some(BUSY_NOTICE.to_string())
        );
    }

    #[test]
    fn blocked_step_shows_required_notice() {
        let mut app = loaded();
        app.select_mode(WizardMode::Simple);
        app.set_field("USERNAME", "");
        assert!(app.wizard_next().is_empty());
        assert_eq!(
            notice(&app),
            Some((NotificationKind::Error, REQUIRED_FIELDS_NOTICE.to_string()))
        );
        assert!(app.state().wizard.is_invalid("USERNAME"));
    }

    #[test]
    fn invalid_owner_is_reported_without_a_request() {
        let mut app = loaded();
        app.select_mode(WizardMode::Simple);
        app.set_field("OWNER_NPUB", "nsec1secret");
        app.set_field("USERNAME", "bob");
        assert!(app.wizard_next().is_empty());
        assert_eq!(
            notice(&app).map(|n| n.1),
            Some(ValidationError::MalformedOwnerIdentity.to_string())
        );
        assert!(!app.state().in_flight.env_save);
    }

    #[test]
    fn save_before_load_refetches_instead() {
        let mut app = controller();
        app.select_mode(WizardMode::Simple);
        assert_eq!(app.wizard_save(), vec![Command::LoadEnv]);
    }

    #[test]
    fn save_result_clears_flag_and_adopts_reloaded_text() {
        let mut app = loaded();
        app.state.in_flight.env_save = true;
        app.apply(UiMsg::EnvSaved {
            origin: SaveOrigin::Advanced,
            result: Ok(()),
            reloaded: Some("OWNER_NPUB=\"npub1fresh\"\n".into()),
        });
        assert!(!app.state().in_flight.env_save);
        assert_eq!(app.state().document.get("OWNER_NPUB"), Some("npub1fresh"));
        assert_eq!(
            notice(&app),
            Some((
                NotificationKind::Success,
                "Configuration saved successfully".to_string()
            ))
        );

        app.state.in_flight.env_save = true;
        app.apply(UiMsg::EnvSaved {
            origin: SaveOrigin::Wizard,
            result: Err(ApiError::Server("disk full".into())),
            reloaded: None,
        });
        assert!(!app.state().in_flight.env_save);
        assert_eq!(
            notice(&app).map(|n| n.1),
            Some("Failed to save: disk full".to_string())
        );
    }

    #[test]
    fn advanced_editor_rejects_blank_content() {
        let mut app = loaded();
        app.set_advanced_text("   \n");
        assert!(app.advanced_save().is_empty());
        assert_eq!(
            notice(&app).map(|n| n.1),
            Some("Configuration cannot be empty".to_string())
        );
        app.set_advanced_text("OWNER_NPUB=\"npub1x\"");
        assert!(matches!(
            app.advanced_save().as_slice(),
            [Command::SaveEnv {
                origin: SaveOrigin::Advanced,
                ..
            }]
        ));
    }

    #[test]
    fn entering_configuration_tab_resets_wizard() {
        let mut app = loaded();
        app.select_mode(WizardMode::Full);
        app.switch_tab(Tab::Relays);
        let cmds = app.switch_tab(Tab::Wizard);
        assert_eq!(cmds, vec![Command::LoadEnv]);
        assert_eq!(app.state().wizard.mode(), None);
        assert_eq!(app.state().wizard.step(), 0);
    }

    #[test]
    fn reselecting_configuration_tab_keeps_progress() {
        let mut app = loaded();
        app.select_mode(WizardMode::Full);
        app.wizard_next();
        let step = app.state().wizard.step();
        assert!(app.switch_tab(Tab::Wizard).is_empty());
        assert_eq!(app.state().wizard.mode(), Some(WizardMode::Full));
        assert_eq!(app.state().wizard.step(), step);
    }

    #[test]
    fn relay_save_is_guarded_per_list() {
        let mut app = controller();
        assert!(app.relay_add(RelayListKind::Blastr, "wss://relay.damus.io/"));
        assert!(!app.relay_add(RelayListKind::Blastr, "relay.damus.io"));
        assert_eq!(
            app.relay_save(RelayListKind::Blastr),
            vec![Command::SaveRelays {
                kind: RelayListKind::Blastr,
                relays: vec!["relay.damus.io".to_string()],
            }]
        );
        assert!(app.relay_save(RelayListKind::Blastr).is_empty());
        assert_eq!(app.relay_save(RelayListKind::Import).len(), 1);

        app.apply(UiMsg::RelaysSaved {
            kind: RelayListKind::Blastr,
            result: Ok(()),
        });
        assert!(!app.state().in_flight.relay_save.contains(&RelayListKind::Blastr));
        assert_eq!(
            notice(&app).map(|n| n.1),
            Some("Blastr configuration saved successfully".to_string())
        );
    }

    #[test]
    fn import_refused_without_healthy_relay() {
        let mut app = controller();
        assert!(app.import_start().is_empty());
        assert_eq!(app.state().import.state(), ImportRunState::Idle);
        assert!(notice(&app).is_some());
    }

    #[test]
    fn import_run_to_completion() {
        let mut app = controller();
        let generation = running_import(&mut app);
        assert_eq!(app.state().import.state(), ImportRunState::Running);

        app.apply(UiMsg::Stream {
            kind: StreamKind::Import,
            generation,
            update: StreamUpdate::Event(StreamEvent::Log {
                level: LogLevel::Info,
                message: "Fetching notes".into(),
            }),
        });
        let cmds = app.apply(UiMsg::Stream {
            kind: StreamKind::Import,
            generation,
            update: StreamUpdate::Event(StreamEvent::Status("completed".into())),
        });
        assert_eq!(
            cmds,
            vec![
                Command::CloseStream(StreamKind::Import),
                Command::LoadImportInfo
            ]
        );
        assert_eq!(app.state().import.state(), ImportRunState::Completed);
        assert_eq!(app.state().import.log().len(), 1);
        assert_eq!(
            notice(&app),
            Some((
                NotificationKind::Success,
                "Import completed successfully!".to_string()
            ))
        );
    }

    #[test]
    fn rejected_import_returns_to_idle() {
        let mut app = controller();
        app.apply(UiMsg::StatusChecked(Ok(healthy())));
        app.import_start();
        app.apply(UiMsg::ImportStarted(Err(ApiError::Server(
            "Import already running".into(),
        ))));
        assert_eq!(app.state().import.state(), ImportRunState::Idle);
        assert_eq!(
            notice(&app).map(|n| n.1),
            Some("Failed to start import: Import already running".to_string())
        );
    }

    #[test]
    fn stale_stream_messages_are_dropped() {
        let mut app = controller();
        let generation = running_import(&mut app);
        app.apply(UiMsg::Stream {
            kind: StreamKind::Import,
            generation: generation - 1,
            update: StreamUpdate::Event(StreamEvent::Status("failed".into())),
        });
        assert_eq!(app.state().import.state(), ImportRunState::Running);
    }

    #[test]
    fn lost_import_stream_keeps_state() {
        let mut app = controller();
        let generation = running_import(&mut app);
        app.apply(UiMsg::Stream {
            kind: StreamKind::Import,
            generation,
            update: StreamUpdate::Lost(ApiError::Stream("reset".into())),
        });
        assert_eq!(app.state().import.state(), ImportRunState::Running);
        assert!(!app.state().import.is_subscribed());
    }

    #[test]
    fn cancel_failure_restores_running() {
        let mut app = controller();
        running_import(&mut app);
        assert_eq!(app.import_cancel(), vec![Command::CancelImport]);
        assert_eq!(app.state().import.state(), ImportRunState::Cancelling);
        app.apply(UiMsg::ImportCancelled(Err(ApiError::Transport("down".into()))));
        assert_eq!(app.state().import.state(), ImportRunState::Running);
    }

    #[test]
    fn cancel_after_completion_sends_nothing() {
        let mut app = controller();
        let generation = running_import(&mut app);
        app.apply(UiMsg::Stream {
            kind: StreamKind::Import,
            generation,
            update: StreamUpdate::Event(StreamEvent::Status("completed".into())),
        });
        assert_eq!(app.state().import.state(), ImportRunState::Completed);
        assert!(app.import_cancel().is_empty());
        assert_eq!(app.state().import.state(), ImportRunState::Completed);
    }

    #[test]
    fn import_info_reattaches_to_a_server_side_run() {
        let mut app = controller();
        app.switch_tab(Tab::Import);
        assert!(app.poll().contains(&Command::LoadImportInfo));
        let cmds = app.apply(UiMsg::ImportInfoLoaded(Ok(ImportInfo {
            relay_count: 3,
            import_start_date: Some("2024-01-01".into()),
            status: Some("running".into()),
        })));
        assert!(matches!(
            cmds.as_slice(),
            [Command::OpenStream {
                kind: StreamKind::Import,
                ..
            }]
        ));
        assert_eq!(app.state().import.state(), ImportRunState::Running);
        assert!(!app.poll().contains(&Command::LoadImportInfo));
    }

    #[test]
    fn log_stream_follows_the_logs_tab() {
        let mut app = controller();
        let cmds = app.switch_tab(Tab::Logs);
        let [Command::OpenStream {
            kind: StreamKind::Logs,
            generation,
        }] = cmds.as_slice()
        else {
            panic!("expected log stream, got {:?}", cmds);
        };
        let generation = *generation;
        app.apply(UiMsg::Stream {
            kind: StreamKind::Logs,
            generation,
            update: StreamUpdate::Event(StreamEvent::Log {
                level: LogLevel::Warning,
                message: "slow query".into(),
            }),
        });
        assert_eq!(app.state().relay_log.len(), 1);

        let cmds = app.switch_tab(Tab::Relays);
        assert_eq!(cmds, vec![Command::CloseStream(StreamKind::Logs)]);
        app.apply(UiMsg::Stream {
            kind: StreamKind::Logs,
            generation,
            update: StreamUpdate::Event(StreamEvent::Log {
                level: LogLevel::Info,
                message: "late".into(),
            }),
        });
        assert_eq!(app.state().relay_log.len(), 1);
        assert!(!app.state().logs_streaming);
    }

    #[test]
    fn log_stream_loss_appends_line() {
        let mut app = controller();
        app.switch_tab(Tab::Logs);
        let generation = app.state().streams.current(StreamKind::Logs);
        app.apply(UiMsg::Stream {
            kind: StreamKind::Logs,
            generation,
            update: StreamUpdate::Lost(ApiError::Transport("refused".into())),
        });
        let last = app.state().relay_log.lines().last().map(|l| l.message.clone());
        assert_eq!(last.as_deref(), Some(LOG_STREAM_LOST_LINE));
    }

    #[test]
    fn restart_is_single_flight() {
        let mut app = controller();
        assert_eq!(app.restart(), vec![Command::Restart]);
        assert!(app.restart().is_empty());
        app.apply(UiMsg::Restarted(Ok(())));
        assert!(!app.state().in_flight.restart);
        assert_eq!(
            notice(&app).map(|n| n.1),
            Some("HAVEN relay restarted successfully".to_string())
        );
    }

    #[test]
    fn notifications_expire_on_tick() {
        let mut app = controller();
        app.restart();
        assert!(!app.tick(Instant::now()));
        assert!(app.tick(Instant::now() + Duration::from_secs(5)));
        assert!(app.state().notification.is_none());
    }
}
