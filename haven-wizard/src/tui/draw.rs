// Frame rendering for the terminal UI. Reads `TuiState` and only records the log view height.

use ratatui::layout::{Alignment, Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap};
use ratatui::Frame;

use super::{ButtonFocus, FocusTarget, Modal, TuiState};
use crate::api::RelayListKind;
use crate::form::fields::{step_title, FULL_STEP_TITLES};
use crate::form::{FieldSpec, InputKind, WizardMode};
use crate::models::log::{LogLevel, LogLine};
use crate::models::state::{NotificationKind, Tab};
use crate::utils::logging::is_secret_key;
use crate::wizard::ActionButton;

pub(super) fn draw(area: Rect, f: &mut Frame<'_>, state: &TuiState) {
    let window_area = centered_window(area, 100, 30);
    let app = state.app.state();

    let title = match &app.version {
        Some(v) => format!("HAVEN Setup (v{})", v),
        None => "HAVEN Setup".to_string(),
    };
    f.render_widget(Block::default().borders(Borders::ALL).title(title), window_area);

    let inner = window_area.inner(&Margin {
        vertical: 1,
        horizontal: 1,
    });
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
                Constraint::Length(1),
            ]
            .as_ref(),
        )
        .split(inner);

    draw_header(f, rows[0], state);
    match app.tab {
        Tab::Wizard => draw_wizard(f, rows[1], state),
        Tab::Relays => draw_relays(f, rows[1], state),
        Tab::Import => draw_import(f, rows[1], state),
        Tab::Logs => draw_logs(f, rows[1], state),
        Tab::Advanced => draw_advanced(f, rows[1], state),
    }
    draw_notification(f, rows[2], state);
    draw_footer(f, rows[3], state);

    if let Some(modal) = &state.modal {
        draw_confirm_modal(f, window_area, state, modal);
    }
}

fn centered_window(area: Rect, width: u16, height: u16) -> Rect {
    let w = width
        .min(area.width.saturating_sub(2))
        .max(60)
        .min(area.width);
    let h = height
        .min(area.height.saturating_sub(2))
        .max(20)
        .min(area.height);
    let x = area.x + (area.width.saturating_sub(w)) / 2;
    let y = area.y + (area.height.saturating_sub(h)) / 2;
    Rect {
        x,
        y,
        width: w,
        height: h,
    }
}

fn draw_header(f: &mut Frame<'_>, area: Rect, state: &TuiState) {
    let app = state.app.state();
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(22)].as_ref())
        .split(area);

    let mut spans = Vec::new();
    for (i, tab) in Tab::ALL.iter().enumerate() {
        if i > 0 {
            spans.push(Span::raw("  "));
        }
        let style = if *tab == app.tab {
            Style::default().add_modifier(Modifier::REVERSED | Modifier::BOLD)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!("F{} {}", i + 1, tab.title()), style));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), cols[0]);

    let badge = match &app.relay_status {
        Some(status) if status.is_running() => {
            Span::styled("HAVEN Running", Style::default().fg(Color::Green))
        }
        Some(_) => Span::styled("HAVEN Stopped", Style::default().fg(Color::Red)),
        None => Span::styled("Status Unknown", Style::default().fg(Color::Yellow)),
    };
    f.render_widget(
        Paragraph::new(Line::from(badge)).alignment(Alignment::Right),
        cols[1],
    );
}

fn draw_notification(f: &mut Frame<'_>, area: Rect, state: &TuiState) {
    let Some(n) = &state.app.state().notification else {
        return;
    };
    let color = match n.kind {
        NotificationKind::Info => Color::Cyan,
        NotificationKind::Success => Color::Green,
        NotificationKind::Error => Color::Red,
    };
    f.render_widget(
        Paragraph::new(Span::styled(n.message.clone(), Style::default().fg(color))),
        area,
    );
}

fn help_text(state: &TuiState) -> &'static str {
    let app = state.app.state();
    match app.tab {
        Tab::Wizard => match app.wizard.mode() {
            None => "Up/Down choose  Enter select  F9 restart  F10 quit",
            Some(WizardMode::Simple) => "Tab move  Enter next  Space toggle  F10 quit",
            Some(WizardMode::Full) => "Tab move  Left/Right choose  1-7 jump back  F10 quit",
        },
        Tab::Relays => "Tab list  Enter add  ^E edit  ^D remove  ^S save  ^R reload",
        Tab::Import => "Enter start import  c cancel  Up/Down scroll",
        Tab::Logs => "d download  Up/Down scroll  End follow",
        Tab::Advanced => "^S save  ^R reload  F9 restart",
    }
}

fn draw_footer(f: &mut Frame<'_>, area: Rect, state: &TuiState) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(24)].as_ref())
        .split(area);
    f.render_widget(
        Paragraph::new(Span::styled(
            help_text(state),
            Style::default().fg(Color::DarkGray),
        )),
        cols[0],
    );
    let app = state.app.state();
    if app.tab == Tab::Wizard && app.wizard.mode().is_some() {
        draw_buttons(f, cols[1], state);
    }
}

fn draw_buttons(f: &mut Frame<'_>, area: Rect, state: &TuiState) {
    let app = state.app.state();
    let next_label = match app.wizard.action_button() {
        Some(ActionButton::Save) => "Save",
        _ => "Next",
    };
    let saving = app.in_flight.env_save;

    let mut spans = Vec::new();
    if app.wizard.shows_back() {
        spans.push(button_text(
            "Back",
            state.focus == FocusTarget::Button(ButtonFocus::Back),
            true,
        ));
        spans.push(Span::raw(" "));
    }
    spans.push(button_text(
        next_label,
        state.focus == FocusTarget::Button(ButtonFocus::Next),
        !saving,
    ));

    let p = Paragraph::new(Text::from(Line::from(spans))).alignment(Alignment::Right);
    f.render_widget(p, area);
}

fn button_text(label: &str, focused: bool, enabled: bool) -> Span<'static> {
    let mut style = Style::default();
    if !enabled {
        style = style.fg(Color::DarkGray);
    }
    if focused && enabled {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Span::styled(format!("[ {} ]", label), style)
}

// =========================
// Configuration wizard
// =========================

fn draw_wizard(f: &mut Frame<'_>, area: Rect, state: &TuiState) {
    let app = state.app.state();
    let Some(mode) = app.wizard.mode() else {
        draw_welcome(f, area, state);
        return;
    };
    let step = app.wizard.step();
    let last = app.wizard.last_step();

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(
            [
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(0),
            ]
            .as_ref(),
        )
        .split(area);

    let heading = match mode {
        WizardMode::Simple => step_title(mode, step).to_string(),
        WizardMode::Full => format!("Step {} of {}: {}", step, last, step_title(mode, step)),
    };
    f.render_widget(
        Paragraph::new(Span::styled(
            heading,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        rows[0],
    );

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(Color::Cyan))
        .ratio(app.wizard.progress().clamp(0.0, 1.0))
        .label(format!("{}/{}", step, last));
    f.render_widget(gauge, rows[1]);

    if mode == WizardMode::Full {
        let spans: Vec<Span> = FULL_STEP_TITLES
            .iter()
            .enumerate()
            .map(|(i, title)| {
                let n = i as u8 + 1;
                let style = if n == step {
                    Style::default().add_modifier(Modifier::BOLD)
                } else if n < step {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                let short = title.split_whitespace().next().unwrap_or(title);
                Span::styled(format!("{}.{} ", n, short), style)
            })
            .collect();
        f.render_widget(Paragraph::new(Line::from(spans)), rows[2]);
    }

    let fields = super::visible_fields(state);
    let mut lines = vec![Line::from("")];
    for (i, spec) in fields.iter().enumerate() {
        lines.push(field_line(state, spec, state.focus == FocusTarget::Field(i)));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "* required",
        Style::default().fg(Color::DarkGray),
    )));
    f.render_widget(Paragraph::new(Text::from(lines)), rows[3]);
}

fn field_line(state: &TuiState, spec: &FieldSpec, focused: bool) -> Line<'static> {
    let app = state.app.state();
    let raw = app.form.get(spec.form_key).unwrap_or("");
    let value = match spec.input {
        InputKind::Text if focused && state.field_key == Some(spec.form_key) => {
            format!("{}_", state.field_input.display())
        }
        InputKind::Text => {
            if spec.config_key.map_or(false, is_secret_key) {
                "*".repeat(raw.chars().count())
            } else {
                raw.to_string()
            }
        }
        InputKind::Toggle => {
            if raw == "true" {
                "[x]".to_string()
            } else {
                "[ ]".to_string()
            }
        }
        InputKind::Choice(_) => format!("< {} >", raw),
    };

    let mut label_style = Style::default();
    if app.wizard.is_invalid(spec.form_key) {
        label_style = label_style.fg(Color::Red);
    }
    if focused {
        label_style = label_style.add_modifier(Modifier::BOLD);
    }
    let marker = if focused { "> " } else { "  " };
    let required = if spec.required { "*" } else { "" };
    Line::from(vec![
        Span::raw(marker),
        Span::styled(format!("{:<34}", format!("{}{}", spec.label, required)), label_style),
        Span::raw(value),
    ])
}

fn draw_welcome(f: &mut Frame<'_>, area: Rect, state: &TuiState) {
    let app = state.app.state();
    let option = |mode: WizardMode, title: &str, detail: &str| {
        let selected = state.mode_choice == mode;
        let style = if selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        vec![
            Line::from(Span::styled(
                format!("{} {}", if selected { "(x)" } else { "( )" }, title),
                style,
            )),
            Line::from(format!("    {}", detail)),
            Line::from(""),
        ]
    };

    let mut lines = vec![
        Line::from("Configure your HAVEN relay."),
        Line::from(""),
    ];
    lines.extend(option(
        WizardMode::Simple,
        "Quick Setup",
        "Owner npub, relay domain and your name. Everything else uses sensible defaults.",
    ));
    lines.extend(option(
        WizardMode::Full,
        "Full Setup",
        "Seven pages covering storage, every relay, imports, backups and logging.",
    ));

    if !app.env_loaded {
        lines.push(Line::from(Span::styled(
            "Loading current configuration...",
            Style::default().fg(Color::Yellow),
        )));
    }
    if let Some(tor) = &app.tor {
        let text = match (&tor.address, tor.available) {
            (Some(address), true) => format!("Tor address: {}", address),
            _ => "Tor: not available".to_string(),
        };
        lines.push(Line::from(text));
    }

    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Choose a setup mode"))
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);
}

// =========================
// Relay lists
// =========================

fn draw_relays(f: &mut Frame<'_>, area: Rect, state: &TuiState) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(3)].as_ref())
        .split(area);
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)].as_ref())
        .split(rows[0]);

    for (kind, col) in RelayListKind::ALL.iter().zip(cols.iter()) {
        draw_relay_list(f, *col, state, *kind);
    }

    let title = match state.relay_editing {
        Some(_) => format!("Edit {} relay (Enter apply, Esc cancel)", state.relay_kind.title()),
        None => format!("Add {} relay", state.relay_kind.title()),
    };
    let input = Paragraph::new(format!("{}_", state.relay_input.display()))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(input, rows[1]);
}

fn draw_relay_list(f: &mut Frame<'_>, area: Rect, state: &TuiState, kind: RelayListKind) {
    let app = state.app.state();
    let active = kind == state.relay_kind;
    let relays = app.relays.get(kind);

    let mut lines = Vec::new();
    if relays.is_empty() {
        lines.push(Line::from(Span::styled(
            "No relays configured",
            Style::default().fg(Color::DarkGray),
        )));
    }
    for (i, relay) in relays.iter().enumerate() {
        let style = if active && i == state.relay_selected {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        lines.push(Line::from(Span::styled(relay.clone(), style)));
    }

    let mut title = format!("{} ({})", kind.title(), relays.len());
    if app.in_flight.relay_save.contains(&kind) {
        title.push_str(" saving...");
    }
    let border = if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default()
    };
    let visible = area.height.saturating_sub(2) as usize;
    let offset = state.relay_selected.saturating_sub(visible.saturating_sub(1));
    let p = Paragraph::new(Text::from(lines))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(title),
        )
        .scroll((offset as u16, 0));
    f.render_widget(p, area);
}

// =========================
// Import and logs
// =========================

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Info => Color::Reset,
        LogLevel::Success => Color::Green,
        LogLevel::Warning => Color::Yellow,
        LogLevel::Error => Color::Red,
    }
}

/// Tail of `lines` that fits in `height`, `scroll` lines up from the bottom.
fn log_lines<'a>(
    lines: impl DoubleEndedIterator<Item = &'a LogLine> + ExactSizeIterator,
    height: usize,
    scroll: usize,
) -> Vec<Line<'static>> {
    let total = lines.len();
    let end = total.saturating_sub(scroll.min(total.saturating_sub(height)));
    let start = end.saturating_sub(height);
    lines
        .skip(start)
        .take(end - start)
        .map(|l| {
            Line::from(vec![
                Span::styled(
                    format!("{} {:<5} ", l.received_at.format("%H:%M:%S"), l.level.label()),
                    Style::default().fg(Color::DarkGray),
                ),
                Span::styled(l.message.clone(), Style::default().fg(level_color(l.level))),
            ])
        })
        .collect()
}

fn draw_import(f: &mut Frame<'_>, area: Rect, state: &TuiState) {
    let app = state.app.state();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(5), Constraint::Min(0)].as_ref())
        .split(area);

    let relays = match app.import_info.as_ref().map_or(0, |i| i.relay_count) {
        0 => "None configured".to_string(),
        n => format!("{} relay(s)", n),
    };
    let since = app
        .import_info
        .as_ref()
        .and_then(|i| i.import_start_date.clone())
        .unwrap_or_else(|| "Not set".to_string());
    let run = app.import.state();
    let status_style = if run.is_active() {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };
    let info = Paragraph::new(Text::from(vec![
        Line::from(format!("Import relays:  {}", relays)),
        Line::from(format!("Import since:   {}", since)),
        Line::from(vec![
            Span::raw("Status:         "),
            Span::styled(run.label(), status_style),
        ]),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Import Notes"));
    f.render_widget(info, rows[0]);

    let log = app.import.log();
    let height = rows[1].height.saturating_sub(2) as usize;
    state.log_view_height.set(height);
    let lines = if log.is_empty() {
        vec![Line::from(Span::styled(
            "No import activity yet",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        log_lines(log.lines(), height, state.import_scroll)
    };
    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title("Import progress"));
    f.render_widget(p, rows[1]);
}

fn draw_logs(f: &mut Frame<'_>, area: Rect, state: &TuiState) {
    let app = state.app.state();
    let title = if app.logs_streaming {
        "Relay logs (live)"
    } else {
        "Relay logs (disconnected)"
    };
    let title = if app.in_flight.logs_download {
        format!("{} downloading...", title)
    } else {
        title.to_string()
    };
    let height = area.height.saturating_sub(2) as usize;
    state.log_view_height.set(height);
    let lines = log_lines(app.relay_log.lines(), height, state.log_scroll);
    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

// =========================
// Raw editor
// =========================

fn draw_advanced(f: &mut Frame<'_>, area: Rect, state: &TuiState) {
    let editor = &state.editor;
    let height = area.height.saturating_sub(2) as usize;
    let top = editor.row.saturating_sub(height.saturating_sub(1));

    let cursor_style = Style::default().add_modifier(Modifier::REVERSED);
    let lines: Vec<Line> = editor
        .lines
        .iter()
        .enumerate()
        .skip(top)
        .take(height)
        .map(|(row, text)| {
            if row != editor.row {
                return Line::from(text.clone());
            }
            let chars: Vec<char> = text.chars().collect();
            let col = editor.col.min(chars.len());
            let before: String = chars[..col].iter().collect();
            let at = chars.get(col).map_or(" ".to_string(), |c| c.to_string());
            let after: String = chars.get(col + 1..).map_or(String::new(), |s| s.iter().collect());
            Line::from(vec![
                Span::raw(before),
                Span::styled(at, cursor_style),
                Span::raw(after),
            ])
        })
        .collect();

    let mut title = "Raw configuration (.env)".to_string();
    if state.app.state().in_flight.env_save {
        title.push_str(" saving...");
    }
    let p = Paragraph::new(Text::from(lines))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(p, area);
}

// =========================
// Modals
// =========================

fn draw_confirm_modal(f: &mut Frame<'_>, window_area: Rect, state: &TuiState, modal: &Modal) {
    let (title, body) = match modal {
        Modal::ConfirmRestart => (
            "Restart HAVEN?".to_string(),
            "The relay will be unavailable for a few seconds while it restarts.".to_string(),
        ),
        Modal::ConfirmImport => (
            "Start import?".to_string(),
            "HAVEN stops while notes are imported from the import relays, then starts again."
                .to_string(),
        ),
        Modal::ConfirmRemoveRelay { kind, index } => {
            let relay = state
                .app
                .state()
                .relays
                .get(*kind)
                .get(*index)
                .cloned()
                .unwrap_or_default();
            (
                "Remove relay?".to_string(),
                format!("Remove {} from the {} list?", relay, kind.title()),
            )
        }
        Modal::ConfirmQuit => (
            "Quit?".to_string(),
            "Unsaved changes will be lost.".to_string(),
        ),
    };

    let modal_w = 60u16.min(window_area.width.saturating_sub(4)).max(40);
    let modal_h = 7u16;
    let x = window_area.x + (window_area.width.saturating_sub(modal_w)) / 2;
    let y = window_area.y + (window_area.height.saturating_sub(modal_h)) / 2;
    let area = Rect {
        x,
        y,
        width: modal_w,
        height: modal_h,
    };

    f.render_widget(Clear, area);
    let block = Block::default().borders(Borders::ALL).title(title);
    let p = Paragraph::new(Text::from(vec![Line::from(body), Line::from("")]))
        .block(block)
        .wrap(Wrap { trim: false });
    f.render_widget(p, area);

    let buttons_area = Rect {
        x: area.x + 1,
        y: area.y + area.height - 2,
        width: area.width - 2,
        height: 1,
    };
    let focused = Style::default().add_modifier(Modifier::REVERSED);
    let yes = Span::styled(
        "[ Yes ]",
        if state.modal_yes {
            focused
        } else {
            Style::default()
        },
    );
    let no = Span::styled(
        "[ No ]",
        if state.modal_yes {
            Style::default()
        } else {
            focused
        },
    );
    let line = Line::from(vec![yes, Span::raw(" "), no]);
    f.render_widget(
        Paragraph::new(Text::from(line)).alignment(Alignment::Right),
        buttons_area,
    );
}
