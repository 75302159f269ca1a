// Application settings
// Loaded from ~/.config/gridedit/settings.json

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Initial rendering mode for every column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayPreference {
    Raw,
    #[default]
    Friendly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // Server
    #[serde(rename = "server.url")]
    pub server_url: String,

    #[serde(rename = "server.timeoutSecs")]
    pub timeout_secs: u64,

    // Display
    #[serde(rename = "display.mode")]
    pub display_mode: DisplayPreference,

    // Grid
    #[serde(rename = "grid.orderColumn")]
    pub order_column: String,

    #[serde(rename = "grid.preferredYear")]
    pub preferred_year: i32,

    #[serde(rename = "grid.applyYearFilter")]
    pub apply_year_filter: bool,

    // Editor
    #[serde(rename = "editor.confirmDiscard")]
    pub confirm_discard: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:5000".to_string(),
            timeout_secs: 60,
            display_mode: DisplayPreference::Friendly,
            order_column: "DATE_COMMITTED".to_string(),
            preferred_year: 2015,
            apply_year_filter: true,
            confirm_discard: true,
        }
    }
}

const DEFAULT_FILE: &str = r#"{
    // Persistence server
    "server.url": "http://localhost:5000",
    "server.timeoutSecs": 60,

    // "friendly" renders coded values as labels, "raw" shows stored values
    "display.mode": "friendly",

    // Default order and year filter
    "grid.orderColumn": "DATE_COMMITTED",
    "grid.preferredYear": 2015,
    "grid.applyYearFilter": true,

    // Ask before discarding unsaved edits
    "editor.confirmDiscard": true
}
"#;

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("gridedit");
        config_dir.join("settings.json")
    }

    /// Load settings from disk, falling back to defaults
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from a specific file. Writes the commented default file when
    /// missing; unreadable or invalid files yield defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            create_default_file(path);
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents).unwrap_or_else(|e| {
                log::warn!("Error parsing {}: {}; using default settings", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                log::warn!("Error reading {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Parse settings text. Lines starting with `//` are comments.
    pub fn parse(contents: &str) -> Result<Self, serde_json::Error> {
        let cleaned: String = contents
            .lines()
            .filter(|line| !line.trim().starts_with("//"))
            .collect::<Vec<_>>()
            .join("\n");
        serde_json::from_str(&cleaned)
    }

    /// Save current settings to disk
    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }

        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Get the config file path for display/opening
    pub fn config_path_display() -> String {
        Self::config_path().to_string_lossy().to_string()
    }
}

fn create_default_file(path: &Path) {
    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            log::warn!("Error creating config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, DEFAULT_FILE) {
        log::warn!("Error writing default settings.json: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_file_matches_defaults() {
        assert_eq!(Settings::parse(DEFAULT_FILE).unwrap(), Settings::default());
    }

    #[test]
    fn test_first_load_writes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gridedit").join("settings.json");

        let settings = Settings::load_from(&path);
        assert_eq!(settings, Settings::default());
        assert!(path.exists());
        assert!(fs::read_to_string(&path).unwrap().contains("// Persistence server"));
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(
            &path,
            "{\n  // local dev server\n  \"server.url\": \"http://10.0.0.2:8000\",\n  \"display.mode\": \"raw\"\n}\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.server_url, "http://10.0.0.2:8000");
        assert_eq!(settings.display_mode, DisplayPreference::Raw);
        assert_eq!(settings.timeout_secs, 60);
        assert!(settings.apply_year_filter);
    }

    #[test]
    fn test_invalid_file_falls_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn test_save_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let settings = Settings {
            preferred_year: 2019,
            confirm_discard: false,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"grid.preferredYear\": 2019"));
        assert_eq!(Settings::load_from(&path), settings);
    }
}
