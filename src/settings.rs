//! Persisted user settings.
//!
//! A plain JSON document holding the defaults the converter starts from. A
//! missing or corrupt file silently falls back to the documented defaults,
//! and saving is best-effort: the converter keeps working without a writable
//! config directory.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::utils::TargetFormat;

/// Persisted settings record.
///
/// Theme and accent color belong to the presentation layer and are carried
/// here as plain data only, so an external UI can round-trip them through the
/// same document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    /// Presentation theme name ("system", "light", "dark")
    pub theme: String,
    /// Presentation accent color, hex RGB
    pub accent_color: String,
    /// Default quality for lossy targets (1-100)
    pub default_quality: u8,
    /// Default aspect-ratio policy for resizes
    pub maintain_aspect_ratio: bool,
    /// Default target format
    pub default_output_format: TargetFormat,
    /// Output directory from the previous run
    pub last_output_directory: Option<PathBuf>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
            accent_color: "#0078D4".to_string(),
            default_quality: 90,
            maintain_aspect_ratio: true,
            default_output_format: TargetFormat::Jpeg,
            last_output_directory: None,
        }
    }
}

/// Loads and saves [`AppSettings`] at a fixed path.
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the platform config location, e.g.
    /// `~/.config/image-converter/config.json` on Linux.
    pub fn at_default_location() -> Self {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        Self::new(base.join("image-converter").join("config.json"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the settings document. Absent or unparseable state falls back to
    /// defaults without surfacing an error.
    pub fn load(&self) -> AppSettings {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(settings) => settings,
                Err(e) => {
                    warn!("Ignoring corrupt settings file {}: {e}", self.path.display());
                    AppSettings::default()
                }
            },
            Err(_) => {
                debug!("No settings file at {}, using defaults", self.path.display());
                AppSettings::default()
            }
        }
    }

    /// Writes the settings document, creating the parent directory as needed.
    /// Failures are logged and swallowed.
    pub fn save(&self, settings: &AppSettings) {
        let result = (|| -> std::io::Result<()> {
            if let Some(parent) = self.path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let json = serde_json::to_string_pretty(settings)
                .map_err(|e| std::io::Error::other(e.to_string()))?;
            std::fs::write(&self.path, json)
        })();

        if let Err(e) = result {
            warn!("Could not save settings to {}: {e}", self.path.display());
        }
    }
}
