// HAVEN configuration wizard
// Main library entry point

pub mod api;
pub mod app;
pub mod form;
pub mod import;
pub mod models;
pub mod settings;
pub mod store;
pub mod tui;
pub mod utils;
pub mod wizard;

use std::path::Path;

use log::{error, info};

use settings::Settings;

/// Initialize logging system with dual format (JSON + human-readable)
fn init_logging(
    with_stdout: bool,
    log_dir_override: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let log_dir = utils::path_resolver::resolve_log_folder(log_dir_override)?;

    let timestamp = chrono::Utc::now().format("%Y-%m-%d-%H%M%S");

    // JSON log file for structured parsing
    let json_log_file = log_dir.join(format!("haven-wizard-{}.log", timestamp));

    // Human-readable log file (.txt)
    let txt_log_file = log_dir.join(format!("haven-wizard-{}.txt", timestamp));

    // - JSON format to .log file
    // - Human-readable format to .txt file
    // - Optional: human-readable to stdout (disabled for TUI to avoid corrupting the terminal UI)
    let mut dispatch = fern::Dispatch::new().level(log::LevelFilter::Debug);

    if with_stdout {
        dispatch = dispatch.chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Info)
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}", txt_line));
                })
                .chain(std::io::stdout()),
        );
    }

    dispatch = dispatch
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_utc = chrono::Utc::now().to_rfc3339();
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let json_line = utils::logging::format_json_log(
                        &timestamp_utc,
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                        None,
                    );
                    out.finish(format_args!("{}\n", json_line));
                })
                .chain(fern::log_file(json_log_file)?),
        )
        .chain(
            fern::Dispatch::new()
                .format(move |out, message, record| {
                    let timestamp_local = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    let message_str = format!("{}", message);
                    let (phase, step, cleaned_message) =
                        utils::logging::parse_log_metadata(&message_str);
                    let txt_line = utils::logging::format_human_readable_log(
                        &timestamp_local.to_string(),
                        record.level(),
                        record.target(),
                        &cleaned_message,
                        phase.as_deref(),
                        step.as_deref(),
                    );
                    out.finish(format_args!("{}\n", txt_line));
                })
                .chain(fern::log_file(txt_log_file)?),
        );

    dispatch.apply()?;

    log::info!(
        "[PHASE: initialization] Logging initialized, log directory: {:?}",
        log_dir
    );
    Ok(())
}

/// Interactive terminal wizard.
pub fn run_tui(settings: Settings) {
    // Initialize logging (no stdout to avoid corrupting the TUI)
    if let Err(e) = init_logging(false, settings.log_dir()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] HAVEN wizard starting at {} base_url={}",
        chrono::Utc::now(),
        settings.base_url
    );

    if let Err(e) = tui::run(&settings) {
        error!("[PHASE: tui] [STEP: fatal] TUI exited with error: {:?}", e);
        eprintln!("HAVEN wizard error: {}", e);
        std::process::exit(1);
    }
}

/// Non-interactive TUI smoke mode (for automated checks).
/// Renders a single frame into an in-memory buffer and exits.
pub fn run_tui_smoke(settings: Settings, target: Option<String>) {
    if let Err(e) = init_logging(false, settings.log_dir()) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "[PHASE: initialization] TUI smoke starting at {}",
        chrono::Utc::now()
    );

    let target = target.as_deref().unwrap_or("welcome");
    if let Err(e) = tui::smoke(&settings, target) {
        error!(
            "[PHASE: tui] [STEP: smoke] TUI smoke exited with error: {:?}",
            e
        );
        eprintln!("HAVEN wizard error: {}", e);
        std::process::exit(1);
    }
}

/// Print the effective settings as TOML and exit.
pub fn print_settings(settings: &Settings) {
    match settings.to_toml() {
        Ok(text) => print!("{}", text),
        Err(e) => {
            eprintln!("Failed to render settings: {}", e);
            std::process::exit(1);
        }
    }
}
