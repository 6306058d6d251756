// Application settings
// Loaded from ~/.config/packdock/config.json

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable that overrides `WEBHOOK_URL` from the config file.
/// Keeps the webhook endpoint out of on-disk config on shared machines.
pub const WEBHOOK_URL_ENV: &str = "PACKDOCK_WEBHOOK_URL";

/// Operator-editable settings. Key names follow the config.json the scan
/// stations already have, so an existing file keeps working.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Remove stale already-received past-due records during sync.
    #[serde(rename = "AUTO_TRIM")]
    pub auto_trim: bool,

    /// How far past due a scanned record must be before trimming.
    #[serde(rename = "TRIM_AFTER_DAYS")]
    pub trim_after_days: i64,

    /// Pause between watch-mode sync checks.
    #[serde(rename = "SYNC_INTERVAL_SECS")]
    pub sync_interval_secs: u64,

    #[serde(rename = "WEBHOOK_ENABLED")]
    pub webhook_enabled: bool,

    #[serde(rename = "WEBHOOK_URL", skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Manifest to sync when the command line does not name one.
    #[serde(rename = "MANIFEST_FILE", skip_serializing_if = "Option::is_none")]
    pub manifest_file: Option<PathBuf>,

    /// Ledger database location. Defaults next to the config file.
    #[serde(rename = "DB_PATH", skip_serializing_if = "Option::is_none")]
    pub db_path: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            auto_trim: false,
            trim_after_days: 60,
            sync_interval_secs: 300,
            webhook_enabled: false,
            webhook_url: None,
            manifest_file: None,
            db_path: None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("packdock")
            .join("config.json")
    }

    /// Effective database path: configured, or `packdock.db` next to the
    /// config file.
    pub fn database_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(|| {
            Self::config_path()
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("packdock.db")
        })
    }

    /// Load settings from the default location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&Self::config_path())
    }

    /// Load from a specific file. A missing or unreadable file yields
    /// defaults rather than an error; a half-edited config must never keep
    /// the dock from scanning.
    pub fn load_from(path: &Path) -> Self {
        let mut settings = if !path.exists() {
            Self::default()
        } else {
            match fs::read_to_string(path) {
                Ok(contents) => match serde_json::from_str(&contents) {
                    Ok(settings) => settings,
                    Err(e) => {
                        log::error!("failed to parse {}: {e}", path.display());
                        Self::default()
                    }
                },
                Err(e) => {
                    log::error!("failed to read {}: {e}", path.display());
                    Self::default()
                }
            }
        };
        settings.apply_webhook_override(std::env::var(WEBHOOK_URL_ENV).ok().as_deref());
        settings
    }

    /// Save to a specific file. Writes a sibling temp file and renames it
    /// into place so a crash mid-write cannot truncate the config.
    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| e.to_string())?;
        fs::rename(&tmp, path).map_err(|e| e.to_string())
    }

    pub fn save(&self) -> Result<(), String> {
        self.save_to(&Self::config_path())
    }

    fn apply_webhook_override(&mut self, value: Option<&str>) {
        if let Some(url) = value {
            if !url.is_empty() {
                self.webhook_url = Some(url.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("nope.json"));
        assert!(!settings.auto_trim);
        assert_eq!(settings.trim_after_days, 60);
        assert_eq!(settings.sync_interval_secs, 300);
    }

    #[test]
    fn garbage_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let settings = Settings::load_from(&path);
        assert_eq!(settings.trim_after_days, Settings::default().trim_after_days);
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"AUTO_TRIM": true, "WEBHOOK_URL": "https://hooks.example/x"}"#)
            .unwrap();
        let settings = Settings::load_from(&path);
        assert!(settings.auto_trim);
        assert_eq!(settings.webhook_url.as_deref(), Some("https://hooks.example/x"));
        assert_eq!(settings.trim_after_days, 60);
    }

    #[test]
    fn save_round_trips_and_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let mut settings = Settings::default();
        settings.auto_trim = true;
        settings.sync_interval_secs = 60;
        settings.manifest_file = Some(PathBuf::from("/srv/dock/manifest.csv"));
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path);
        assert_eq!(loaded, settings);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn env_override_replaces_file_value() {
        let mut settings = Settings {
            webhook_url: Some("https://hooks.example/from-file".into()),
            ..Settings::default()
        };
        settings.apply_webhook_override(Some("https://hooks.example/from-env"));
        assert_eq!(
            settings.webhook_url.as_deref(),
            Some("https://hooks.example/from-env")
        );

        // Empty and unset leave the file value alone.
        settings.apply_webhook_override(Some(""));
        settings.apply_webhook_override(None);
        assert_eq!(
            settings.webhook_url.as_deref(),
            Some("https://hooks.example/from-env")
        );
    }
}
