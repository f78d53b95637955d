use std::path::{Path, PathBuf};

use tubegrab_core::fs_paths::{AppPaths, DesktopPaths};

use crate::models::settings::AppSettings;

const SETTINGS_FILE: &str = "settings.json";

pub fn settings_path() -> PathBuf {
    DesktopPaths.data_dir().join(SETTINGS_FILE)
}

/// Reads settings from `path`, falling back to defaults when the file is missing or broken.
pub fn load_settings_from(path: &Path) -> AppSettings {
    let raw = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return AppSettings::default(),
    };
    match serde_json::from_str::<AppSettings>(&raw) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!("[config] ignoring unreadable {}: {}", path.display(), e);
            AppSettings::default()
        }
    }
}

pub fn load_settings() -> AppSettings {
    load_settings_from(&settings_path())
}

pub fn save_settings_to(path: &Path, settings: &AppSettings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    Ok(())
}

pub fn save_settings(settings: &AppSettings) -> anyhow::Result<()> {
    save_settings_to(&settings_path(), settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from(&dir.path().join("nope.json"));
        assert_eq!(settings.transfer.timeout_secs, 300);
    }

    #[test]
    fn broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_settings_from(&path).resolver.input_name, "url");
    }

    #[test]
    fn saved_settings_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = AppSettings::default();
        settings.resolver.headless = true;
        settings.transfer.referer = "https://example.com/".into();
        save_settings_to(&path, &settings).unwrap();

        let loaded = load_settings_from(&path);
        assert!(loaded.resolver.headless);
        assert_eq!(loaded.transfer.referer, "https://example.com/");
    }
}
