use crate::settings::OverlaySettings;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};

pub const SETTINGS_FILE_NAME: &str = "screendraw_settings.json";

pub fn settings_path_from_exe_path(exe_path: &Path) -> Result<PathBuf> {
    let parent = exe_path
        .parent()
        .ok_or_else(|| anyhow!("executable path has no parent: {}", exe_path.display()))?;
    Ok(parent.join(SETTINGS_FILE_NAME))
}

pub fn resolve_settings_path() -> Result<PathBuf> {
    let exe_path = std::env::current_exe().context("resolve current executable")?;
    settings_path_from_exe_path(&exe_path)
}

/// Loads the settings file next to the executable; a missing or empty file
/// yields defaults.
pub fn load() -> Result<OverlaySettings> {
    let path = resolve_settings_path()?;
    load_from_path(&path)
}

pub fn save(settings: &OverlaySettings) -> Result<PathBuf> {
    let path = resolve_settings_path()?;
    save_to_path(&path, settings)?;
    Ok(path)
}

fn load_from_path(path: &Path) -> Result<OverlaySettings> {
    if !path.exists() {
        return Ok(OverlaySettings::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read settings file {}", path.display()))?;
    if content.trim().is_empty() {
        return Ok(OverlaySettings::default());
    }

    serde_json::from_str(&content)
        .with_context(|| format!("deserialize settings file {}", path.display()))
}

fn save_to_path(path: &Path, settings: &OverlaySettings) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create settings parent folder {}", parent.display()))?;
    }

    let json = serde_json::to_string_pretty(settings).context("serialize overlay settings")?;
    std::fs::write(path, json).with_context(|| format!("write settings file {}", path.display()))
}
