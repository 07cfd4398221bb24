use std::path::PathBuf;

use haven_wizard::settings::{Settings, SettingsSources};
use haven_wizard::utils::path_resolver::resolve_settings_path;

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("{}=", name);
    args.iter()
        .find_map(|a| a.strip_prefix(prefix.as_str()))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn load_settings(args: &[String]) -> Settings {
    // An explicit --settings path must exist; the default location is optional.
    let sources = match flag_value(args, "--settings") {
        Some(path) => SettingsSources {
            file: Some(PathBuf::from(path)),
            file_required: true,
            env: None,
        },
        None => SettingsSources {
            file: resolve_settings_path(),
            file_required: false,
            env: None,
        },
    };

    let settings = Settings::load(&sources).and_then(|s| match flag_value(args, "--base-url") {
        Some(url) => s.with_base_url(url),
        None => Ok(s),
    });
    match settings {
        Ok(s) => s,
        Err(e) => {
            eprintln!("HAVEN wizard: {}", e);
            std::process::exit(2);
        }
    }
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let settings = load_settings(&args);

    if args.iter().any(|a| a == "--print-settings") {
        haven_wizard::print_settings(&settings);
        return;
    }

    // Non-interactive TUI smoke test mode (for automated checks).
    // Renders a single frame for a specific page and exits 0.
    // Usage: --tui-smoke or --tui-smoke=welcome|simple|full1..full7|relays|import|logs|advanced|restart
    if let Some(arg) = args
        .iter()
        .find(|a| a.as_str() == "--tui-smoke" || a.starts_with("--tui-smoke="))
    {
        let target = arg
            .split_once('=')
            .map(|(_, v)| v.to_string())
            .filter(|v| !v.trim().is_empty());
        haven_wizard::run_tui_smoke(settings, target);
        return;
    }

    // --tui is accepted for symmetry; the terminal wizard is the only interface.
    haven_wizard::run_tui(settings);
}
