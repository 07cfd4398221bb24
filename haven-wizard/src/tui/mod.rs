//! Terminal UI for the HAVEN configuration service.
//!
//! Layout:
//! - Centered window titled "HAVEN Setup" with a tab row (F1-F5) and a relay status badge
//! - Tab body: configuration wizard, relay lists, note import, live logs, raw editor
//! - Notification line and a bottom row with key help and buttons
//! - Modal confirmations (restart, import, remove relay, quit)
//!
//! Note: Logging is file-only in TUI mode (stdout logging is disabled) to avoid corrupting the terminal UI.

mod draw;
mod input;

use std::cell::Cell;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use log::info;
use ratatui::backend::{CrosstermBackend, TestBackend};
use ratatui::buffer::Buffer;
use ratatui::Terminal;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use crate::api::{HttpHavenClient, RelayListKind, StreamEvent, StreamKind};
use crate::app::{AppController, Command, Executor, UiMsg};
use crate::form::fields::fields_for_step;
use crate::form::{FieldSpec, InputKind, WizardMode};
use crate::models::log::LogLevel;
use crate::models::responses::{ImportInfo, RelayStatus};
use crate::models::state::{AppState, Tab};
use crate::settings::Settings;
use crate::utils::logging::is_secret_key;
use crate::utils::path_resolver::resolve_download_folder;
use crate::wizard::ActionButton;

use draw::draw;
use input::{TextArea, TextInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ButtonFocus {
    Back,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusTarget {
    Field(usize),
    Button(ButtonFocus),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Modal {
    ConfirmRestart,
    ConfirmImport,
    ConfirmRemoveRelay { kind: RelayListKind, index: usize },
    ConfirmQuit,
}

/// View-local state layered over the application state.
struct TuiState {
    app: AppController,
    focus: FocusTarget,
    /// Track highlighted on the welcome page.
    mode_choice: WizardMode,
    /// Editor bound to the focused text input of the wizard, if any.
    field_input: TextInput,
    field_key: Option<&'static str>,
    relay_kind: RelayListKind,
    relay_input: TextInput,
    relay_selected: usize,
    relay_editing: Option<usize>,
    editor: TextArea,
    /// Lines scrolled up from the bottom of the import and relay log views.
    import_scroll: usize,
    log_scroll: usize,
    /// Rows available to the import or relay log view at the last draw.
    log_view_height: Cell<usize>,
    modal: Option<Modal>,
    modal_yes: bool,
    quit: bool,
}

impl TuiState {
    fn new(app: AppController) -> Self {
        let mut state = Self {
            app,
            focus: FocusTarget::Field(0),
            mode_choice: WizardMode::Simple,
            field_input: TextInput::default(),
            field_key: None,
            relay_kind: RelayListKind::Blastr,
            relay_input: TextInput::default(),
            relay_selected: 0,
            relay_editing: None,
            editor: TextArea::default(),
            import_scroll: 0,
            log_scroll: 0,
            log_view_height: Cell::new(0),
            modal: None,
            modal_yes: false,
            quit: false,
        };
        sync_from_app(&mut state);
        state
    }
}

/// Inputs shown on the current wizard page.
fn visible_fields(state: &TuiState) -> Vec<&'static FieldSpec> {
    let app = state.app.state();
    let Some(mode) = app.wizard.mode() else {
        return Vec::new();
    };
    fields_for_step(mode, app.wizard.step())
        .filter(|f| app.form.is_visible(f))
        .collect()
}

fn focused_field(state: &TuiState) -> Option<&'static FieldSpec> {
    match state.focus {
        FocusTarget::Field(i) => visible_fields(state).get(i).copied(),
        FocusTarget::Button(_) => None,
    }
}

/// Point the line editor at the focused input.
fn rebind_input(state: &mut TuiState) {
    match focused_field(state) {
        Some(spec) if spec.input == InputKind::Text => {
            let value = state.app.state().form.get(spec.form_key).unwrap_or("");
            let masked = spec.config_key.map_or(false, is_secret_key);
            state.field_input = TextInput::new(value, masked);
            state.field_key = Some(spec.form_key);
        }
        _ => state.field_key = None,
    }
}

/// Reconcile view-local copies with application state after messages were applied.
fn sync_from_app(state: &mut TuiState) {
    let field_count = visible_fields(state).len();
    if let FocusTarget::Field(i) = state.focus {
        if i >= field_count && state.app.state().wizard.mode().is_some() {
            state.focus = FocusTarget::Button(ButtonFocus::Next);
            state.field_key = None;
        }
    }
    if let Some(key) = state.field_key {
        let value = state.app.state().form.get(key).unwrap_or("");
        if value != state.field_input.value {
            state.field_input.set(value);
        }
    }

    let advanced = &state.app.state().advanced_text;
    if *advanced != state.editor.text() {
        let text = advanced.clone();
        state.editor.set_text(&text);
    }

    let relay_count = state.app.state().relays.get(state.relay_kind).len();
    state.relay_selected = state.relay_selected.min(relay_count.saturating_sub(1));
}

pub fn run(settings: &Settings) -> Result<()> {
    info!("[PHASE: tui] [STEP: start] Starting TUI wizard");

    let runtime = tokio::runtime::Runtime::new()?;
    let api = Arc::new(HttpHavenClient::new(settings.client_config())?);
    info!(
        "[PHASE: tui] [STEP: connect] Using configuration service at {}",
        api.base_url()
    );
    let (tx, rx) = unbounded_channel::<UiMsg>();
    let mut executor = Executor::new(
        api,
        tx,
        runtime.handle().clone(),
        resolve_download_folder(),
    );

    let mut terminal = setup_terminal()?;
    let result = run_loop(&mut terminal, settings, &mut executor, rx);
    executor.shutdown();
    restore_terminal(&mut terminal)?;

    info!("[PHASE: tui] [STEP: exit] TUI closed");
    result
}

fn new_app_state(settings: &Settings) -> AppState {
    AppState::new(settings.log_view_cap, settings.notification_ttl())
}

const SMOKE_ENV: &str = "OWNER_NPUB=\"npub1smokeowner0000000000000000000000000000000000000000000000\"\n\
RELAY_URL=\"relay.example.com\"\n\
PRIVATE_RELAY_NAME=\"satoshi's Private Relay\"\n\
BACKUP_PROVIDER=\"s3\"\n\
S3_BUCKET_NAME=\"haven-backups\"\n\
S3_SECRET_KEY=\"supersecretvalue\"\n\
CUSTOM_SETTING=keep-me\n";

fn new_smoke_state(target: &str, settings: &Settings) -> TuiState {
    // Smoke-only: seeded state for deterministic page rendering; no request is ever sent.
    let mut app = AppController::new(new_app_state(settings));
    app.apply(UiMsg::EnvLoaded(Ok(SMOKE_ENV.to_string())));
    app.apply(UiMsg::StatusChecked(Ok(RelayStatus {
        status: "running".into(),
        health: "healthy".into(),
        running: Some(true),
    })));
    app.apply(UiMsg::VersionLoaded(Ok("1.0.0".into())));
    app.apply(UiMsg::RelaysLoaded {
        kind: RelayListKind::Blastr,
        result: Ok(vec!["relay.damus.io".into(), "nos.lol".into()]),
    });
    app.apply(UiMsg::RelaysLoaded {
        kind: RelayListKind::Import,
        result: Ok(vec!["relay.primal.net".into()]),
    });

    let mut state = TuiState::new(app);
    match target {
        "simple" => {
            state.app.select_mode(WizardMode::Simple);
        }
        t if t.starts_with("full") => {
            let step = t[4..].parse::<u8>().unwrap_or(1).clamp(1, 7);
            state.app.select_mode(WizardMode::Full);
            for _ in 1..step {
                state.app.wizard_next();
            }
        }
        "relays" => {
            state.app.switch_tab(Tab::Relays);
        }
        "import" => {
            state.app.switch_tab(Tab::Import);
            state.app.apply(UiMsg::ImportInfoLoaded(Ok(ImportInfo {
                relay_count: 1,
                import_start_date: Some("2024-01-01".into()),
                status: Some("idle".into()),
            })));
            state.app.import_start();
            state.app.apply(UiMsg::ImportStarted(Ok(())));
            let generation = state.app.state().streams.current(StreamKind::Import);
            for (level, message) in [
                (LogLevel::Info, "Stopping HAVEN for import"),
                (LogLevel::Success, "Imported 120 notes from relay.primal.net"),
            ] {
                state.app.apply(UiMsg::Stream {
                    kind: StreamKind::Import,
                    generation,
                    update: crate::app::StreamUpdate::Event(StreamEvent::Log {
                        level,
                        message: message.into(),
                    }),
                });
            }
        }
        "logs" => {
            state.app.switch_tab(Tab::Logs);
            let generation = state.app.state().streams.current(StreamKind::Logs);
            for (level, message) in [
                (LogLevel::Info, "haven relay listening on :3355"),
                (LogLevel::Warning, "wot refresh took 12s"),
            ] {
                state.app.apply(UiMsg::Stream {
                    kind: StreamKind::Logs,
                    generation,
                    update: crate::app::StreamUpdate::Event(StreamEvent::Log {
                        level,
                        message: message.into(),
                    }),
                });
            }
        }
        "advanced" => {
            state.app.switch_tab(Tab::Advanced);
        }
        "restart" => {
            state.modal = Some(Modal::ConfirmRestart);
        }
        _ => {}
    }
    state.focus = FocusTarget::Field(0);
    rebind_input(&mut state);
    sync_from_app(&mut state);
    state
}

fn render_smoke(target: &str, settings: &Settings) -> Result<Buffer> {
    let t = target.trim().to_ascii_lowercase();
    let state = new_smoke_state(t.as_str(), settings);

    // In-memory backend: no raw mode or alternate screen.
    let backend = TestBackend::new(100, 30);
    let mut terminal = Terminal::new(backend)?;
    terminal.draw(|f| draw(f.size(), f, &state))?;
    Ok(terminal.backend().buffer().clone())
}

/// Non-interactive smoke mode: render a single frame and exit.
/// Target pages: welcome|simple|full1..full7|relays|import|logs|advanced|restart
pub fn smoke(settings: &Settings, target: &str) -> Result<()> {
    info!(
        "[PHASE: tui] [STEP: smoke] Rendering single-frame TUI smoke target={}",
        target
    );
    render_smoke(target, settings)?;
    Ok(())
}

fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    terminal.backend_mut().execute(LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    settings: &Settings,
    executor: &mut Executor,
    mut rx: UnboundedReceiver<UiMsg>,
) -> Result<()> {
    let tick_rate = Duration::from_millis(100);
    let poll_every = settings.status_poll_interval();
    let mut last_poll = Instant::now();
    let mut state = TuiState::new(AppController::new(new_app_state(settings)));
    executor.run_all(state.app.startup());

    while !state.quit {
        let cmds = drain_messages(&mut state, &mut rx);
        executor.run_all(cmds);
        state.app.tick(Instant::now());
        if last_poll.elapsed() >= poll_every {
            last_poll = Instant::now();
            executor.run_all(state.app.poll());
        }

        terminal.draw(|f| draw(f.size(), f, &state))?;

        if event::poll(tick_rate)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let cmds = handle_key(&mut state, key);
                    executor.run_all(cmds);
                }
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    Ok(())
}

fn drain_messages(state: &mut TuiState, rx: &mut UnboundedReceiver<UiMsg>) -> Vec<Command> {
    let mut cmds = Vec::new();
    while let Ok(msg) = rx.try_recv() {
        cmds.extend(state.app.apply(msg));
    }
    sync_from_app(state);
    cmds
}

fn open_modal(state: &mut TuiState, modal: Modal) {
    state.modal = Some(modal);
    state.modal_yes = false;
}

fn switch_tab(state: &mut TuiState, tab: Tab) -> Vec<Command> {
    if state.app.state().tab == tab {
        return Vec::new();
    }
    let cmds = state.app.switch_tab(tab);
    match tab {
        Tab::Wizard => {
            state.focus = FocusTarget::Field(0);
            state.mode_choice = WizardMode::Simple;
            rebind_input(state);
        }
        Tab::Relays => state.relay_editing = None,
        Tab::Import => state.import_scroll = 0,
        Tab::Logs => state.log_scroll = 0,
        Tab::Advanced => {}
    }
    cmds
}

fn handle_key(state: &mut TuiState, key: KeyEvent) -> Vec<Command> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    if ctrl && key.code == KeyCode::Char('c') {
        state.quit = true;
        return Vec::new();
    }

    if let Some(modal) = state.modal.clone() {
        return handle_modal_key(state, modal, key.code);
    }

    match key.code {
        KeyCode::F(n @ 1..=5) => return switch_tab(state, Tab::ALL[usize::from(n - 1)]),
        KeyCode::F(9) => {
            open_modal(state, Modal::ConfirmRestart);
            return Vec::new();
        }
        KeyCode::F(10) => {
            open_modal(state, Modal::ConfirmQuit);
            return Vec::new();
        }
        _ => {}
    }

    match state.app.state().tab {
        Tab::Wizard => handle_wizard_key(state, key.code),
        Tab::Relays => handle_relays_key(state, key.code, ctrl),
        Tab::Import => handle_import_key(state, key.code),
        Tab::Logs => handle_logs_key(state, key.code),
        Tab::Advanced => handle_advanced_key(state, key.code, ctrl),
    }
}

fn handle_modal_key(state: &mut TuiState, modal: Modal, code: KeyCode) -> Vec<Command> {
    let confirm = match code {
        KeyCode::Left | KeyCode::Right | KeyCode::Tab | KeyCode::BackTab => {
            state.modal_yes = !state.modal_yes;
            return Vec::new();
        }
        KeyCode::Char('y') => true,
        KeyCode::Char('n') | KeyCode::Esc => false,
        KeyCode::Enter => state.modal_yes,
        _ => return Vec::new(),
    };
    state.modal = None;
    if !confirm {
        return Vec::new();
    }

    match modal {
        Modal::ConfirmRestart => state.app.restart(),
        Modal::ConfirmImport => state.app.import_start(),
        Modal::ConfirmRemoveRelay { kind, index } => {
            state.app.relay_remove(kind, index);
            sync_from_app(state);
            Vec::new()
        }
        Modal::ConfirmQuit => {
            state.quit = true;
            Vec::new()
        }
    }
}

fn handle_wizard_key(state: &mut TuiState, code: KeyCode) -> Vec<Command> {
    let wizard = state.app.state().wizard.clone();
    let Some(mode) = wizard.mode() else {
        return match code {
            KeyCode::Up | KeyCode::Down | KeyCode::Left | KeyCode::Right | KeyCode::Tab => {
                state.mode_choice = match state.mode_choice {
                    WizardMode::Simple => WizardMode::Full,
                    WizardMode::Full => WizardMode::Simple,
                };
                Vec::new()
            }
            KeyCode::Enter => {
                let cmds = state.app.select_mode(state.mode_choice);
                state.focus = FocusTarget::Field(0);
                rebind_input(state);
                cmds
            }
            KeyCode::Esc => {
                open_modal(state, Modal::ConfirmQuit);
                Vec::new()
            }
            _ => Vec::new(),
        };
    };

    match code {
        KeyCode::Tab | KeyCode::Down => {
            move_focus(state, true);
            return Vec::new();
        }
        KeyCode::BackTab | KeyCode::Up => {
            move_focus(state, false);
            return Vec::new();
        }
        KeyCode::Esc => {
            open_modal(state, Modal::ConfirmQuit);
            return Vec::new();
        }
        _ => {}
    }

    match state.focus {
        FocusTarget::Button(button) => match code {
            KeyCode::Left | KeyCode::Right => {
                let other = match button {
                    ButtonFocus::Back => ButtonFocus::Next,
                    ButtonFocus::Next => ButtonFocus::Back,
                };
                state.focus = FocusTarget::Button(other);
                Vec::new()
            }
            KeyCode::Enter => press_button(state, button),
            KeyCode::Char(d @ '1'..='7') if mode == WizardMode::Full => {
                let cmds = state.app.wizard_jump(d as u8 - b'0');
                if state.app.state().wizard.step() != wizard.step() {
                    state.focus = FocusTarget::Field(0);
                    rebind_input(state);
                }
                cmds
            }
            _ => Vec::new(),
        },
        FocusTarget::Field(_) => {
            if code == KeyCode::Enter {
                move_focus(state, true);
                return Vec::new();
            }
            if let Some(spec) = focused_field(state) {
                edit_field(state, spec, code);
            }
            Vec::new()
        }
    }
}

fn edit_field(state: &mut TuiState, spec: &'static FieldSpec, code: KeyCode) {
    let current = state
        .app
        .state()
        .form
        .get(spec.form_key)
        .unwrap_or("")
        .to_string();
    match spec.input {
        InputKind::Text => {
            if state.field_input.handle_key(code) {
                let value = state.field_input.value.clone();
                state.app.set_field(spec.form_key, value);
            }
        }
        InputKind::Toggle => {
            if matches!(code, KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right) {
                let next = if current == "true" { "false" } else { "true" };
                state.app.set_field(spec.form_key, next);
            }
        }
        InputKind::Choice(options) => {
            let step: isize = match code {
                KeyCode::Right | KeyCode::Char(' ') => 1,
                KeyCode::Left => -1,
                _ => return,
            };
            let len = options.len() as isize;
            let idx = options
                .iter()
                .position(|o| *o == current)
                .map_or(0, |i| i as isize);
            let next = options[(idx + step).rem_euclid(len) as usize];
            state.app.set_field(spec.form_key, next);
            sync_from_app(state);
        }
    }
}

fn press_button(state: &mut TuiState, button: ButtonFocus) -> Vec<Command> {
    let before = state.app.state().wizard.step();
    let cmds = match button {
        ButtonFocus::Back => state.app.wizard_back(),
        ButtonFocus::Next => match state.app.state().wizard.action_button() {
            Some(ActionButton::Save) => state.app.wizard_save(),
            Some(ActionButton::Next) => state.app.wizard_next(),
            None => Vec::new(),
        },
    };
    if state.app.state().wizard.step() != before {
        state.focus = FocusTarget::Field(0);
        rebind_input(state);
    }
    cmds
}

fn move_focus(state: &mut TuiState, forward: bool) {
    let fields = visible_fields(state).len();
    let show_back = state.app.state().wizard.shows_back();
    let mut order: Vec<FocusTarget> = (0..fields).map(FocusTarget::Field).collect();
    if show_back {
        order.push(FocusTarget::Button(ButtonFocus::Back));
    }
    order.push(FocusTarget::Button(ButtonFocus::Next));

    let pos = order.iter().position(|f| *f == state.focus).unwrap_or(0);
    let next = if forward {
        (pos + 1) % order.len()
    } else {
        (pos + order.len() - 1) % order.len()
    };
    state.focus = order[next];
    rebind_input(state);
}

fn handle_relays_key(state: &mut TuiState, code: KeyCode, ctrl: bool) -> Vec<Command> {
    let kind = state.relay_kind;
    if ctrl {
        return match code {
            KeyCode::Char('s') => state.app.relay_save(kind),
            KeyCode::Char('r') => state.app.relay_reload(kind),
            KeyCode::Char('d') => {
                let index = state.relay_selected;
                if index < state.app.state().relays.get(kind).len() {
                    open_modal(state, Modal::ConfirmRemoveRelay { kind, index });
                }
                Vec::new()
            }
            KeyCode::Char('e') => {
                if let Some(relay) = state.app.state().relays.get(kind).get(state.relay_selected)
                {
                    let relay = relay.clone();
                    state.relay_input.set(relay);
                    state.relay_editing = Some(state.relay_selected);
                }
                Vec::new()
            }
            _ => Vec::new(),
        };
    }

    match code {
        KeyCode::Tab | KeyCode::BackTab => {
            state.relay_kind = match kind {
                RelayListKind::Blastr => RelayListKind::Import,
                RelayListKind::Import => RelayListKind::Blastr,
            };
            state.relay_selected = 0;
            state.relay_editing = None;
            state.relay_input.set("");
        }
        KeyCode::Up => state.relay_selected = state.relay_selected.saturating_sub(1),
        KeyCode::Down => {
            let len = state.app.state().relays.get(kind).len();
            state.relay_selected = (state.relay_selected + 1).min(len.saturating_sub(1));
        }
        KeyCode::Enter => {
            let raw = state.relay_input.value.clone();
            match state.relay_editing.take() {
                Some(index) => {
                    state.app.relay_update(kind, index, &raw);
                    state.relay_input.set("");
                }
                None => {
                    if state.app.relay_add(kind, &raw) {
                        state.relay_input.set("");
                        state.relay_selected = state.app.state().relays.get(kind).len() - 1;
                    }
                }
            }
        }
        KeyCode::Esc => {
            if state.relay_editing.take().is_some() {
                state.relay_input.set("");
            } else {
                open_modal(state, Modal::ConfirmQuit);
            }
        }
        other => {
            state.relay_input.handle_key(other);
        }
    }
    Vec::new()
}

/// Adjust a scroll-back offset, never past the point where the first line is on screen.
fn scroll(offset: &mut usize, code: KeyCode, line_count: usize, height: usize) -> bool {
    let max = line_count.saturating_sub(height);
    match code {
        KeyCode::Up => *offset = (*offset + 1).min(max),
        KeyCode::Down => *offset = offset.saturating_sub(1),
        KeyCode::PageUp => *offset = (*offset + 10).min(max),
        KeyCode::PageDown => *offset = offset.saturating_sub(10),
        KeyCode::End => *offset = 0,
        _ => return false,
    }
    true
}

fn handle_import_key(state: &mut TuiState, code: KeyCode) -> Vec<Command> {
    let line_count = state.app.state().import.log().len();
    if scroll(
        &mut state.import_scroll,
        code,
        line_count,
        state.log_view_height.get(),
    ) {
        return Vec::new();
    }
    match code {
        KeyCode::Enter | KeyCode::Char('r') => {
            if !state.app.state().import.state().is_active() {
                open_modal(state, Modal::ConfirmImport);
            }
            Vec::new()
        }
        KeyCode::Char('c') => state.app.import_cancel(),
        KeyCode::Esc => {
            open_modal(state, Modal::ConfirmQuit);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn handle_logs_key(state: &mut TuiState, code: KeyCode) -> Vec<Command> {
    let line_count = state.app.state().relay_log.len();
    if scroll(
        &mut state.log_scroll,
        code,
        line_count,
        state.log_view_height.get(),
    ) {
        return Vec::new();
    }
    match code {
        KeyCode::Char('d') => state.app.download_logs(),
        KeyCode::Esc => {
            open_modal(state, Modal::ConfirmQuit);
            Vec::new()
        }
        _ => Vec::new(),
    }
}

fn handle_advanced_key(state: &mut TuiState, code: KeyCode, ctrl: bool) -> Vec<Command> {
    if ctrl {
        return match code {
            KeyCode::Char('s') => state.app.advanced_save(),
            KeyCode::Char('r') => state.app.advanced_reload(),
            _ => Vec::new(),
        };
    }
    if code == KeyCode::Esc {
        open_modal(state, Modal::ConfirmQuit);
        return Vec::new();
    }
    if state.editor.handle_key(code) {
        let text = state.editor.text();
        state.app.set_advanced_text(text);
    }
    Vec::new()
}
