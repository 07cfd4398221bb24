use anyhow::Result;
use std::path::{Path, PathBuf};

const APP_DIR: &str = "haven-wizard";

/// Resolve the folder the executable runs from (absolute path)
pub fn resolve_deployment_folder() -> Result<PathBuf> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(dir) = exe_path.parent() {
            return Ok(dir.to_path_buf());
        }
    }

    // Fallback: current working directory
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    Ok(cwd)
}

/// Resolve log folder (absolute path), creating it if needed.
///
/// Order: explicit override, then the per-user data directory, then next to the executable.
pub fn resolve_log_folder(override_dir: Option<&Path>) -> Result<PathBuf> {
    let log_dir = match override_dir {
        Some(dir) => dir.to_path_buf(),
        None => match dirs::data_local_dir() {
            Some(base) => base.join(APP_DIR).join("logs"),
            None => resolve_deployment_folder()?.join("haven_wizard_logs"),
        },
    };
    std::fs::create_dir_all(&log_dir)
        .map_err(|e| anyhow::anyhow!("Failed to create log folder: {}", e))?;
    Ok(log_dir)
}

/// Default location of the client settings file. The file itself is optional.
pub fn resolve_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("settings.toml"))
}

/// Where a downloaded relay log is written.
pub fn resolve_download_folder() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_log_folder_is_created() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("logs");
        let resolved = resolve_log_folder(Some(&target)).unwrap();
        assert_eq!(resolved, target);
        assert!(target.is_dir());
    }

    #[test]
    fn settings_path_ends_with_app_file() {
        if let Some(path) = resolve_settings_path() {
            assert!(path.ends_with("haven-wizard/settings.toml"));
        }
    }
}
