//! Startup settings.
//!
//! The only persisted preference is the display theme, read once at startup.
//! `WF_THEME` overrides the settings file; a missing or garbled file falls
//! back to the default.

use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    theme: Option<String>,
}

/// Settings file under the platform config directory.
fn settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("workflowgenie-cli").join("settings.json"))
}

pub fn load_theme() -> Theme {
    if let Ok(v) = std::env::var("WF_THEME") {
        return theme_from_str(&v);
    }
    match settings_path().and_then(|p| fs::read_to_string(p).ok()) {
        Some(raw) => theme_from_settings(&raw),
        None => Theme::default(),
    }
}

fn theme_from_settings(raw: &str) -> Theme {
    match serde_json::from_str::<SettingsFile>(raw) {
        Ok(SettingsFile { theme: Some(v) }) => theme_from_str(&v),
        _ => Theme::default(),
    }
}

/// Anything that is not exactly `"dark"` reads as the light theme.
fn theme_from_str(v: &str) -> Theme {
    if v == "dark" {
        Theme::Dark
    } else {
        Theme::Light
    }
}
