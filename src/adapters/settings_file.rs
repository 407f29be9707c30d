//! JSON settings file adapter.
//!
//! Implements [`ConfigPort`] on top of a single JSON document on disk.
//!
//! - Missing file: defaults (first run).
//! - Unparsable file: [`ConfigError::Corrupted`]; the file is left alone so
//!   the operator can inspect it.
//! - Saves are validated first, then written to a sibling temp file and
//!   renamed over the original, so a crash never leaves a torn document.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::Settings;

/// Environment variable naming the settings file.
pub const SETTINGS_ENV: &str = "FILAMON_SETTINGS";

/// File used when [`SETTINGS_ENV`] is unset.
pub const DEFAULT_SETTINGS_FILE: &str = "filamon.json";

pub struct JsonSettingsFile {
    path: PathBuf,
}

impl JsonSettingsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path from [`SETTINGS_ENV`], falling back to [`DEFAULT_SETTINGS_FILE`].
    pub fn from_env() -> Self {
        let path = std::env::var_os(SETTINGS_ENV)
            .map_or_else(|| PathBuf::from(DEFAULT_SETTINGS_FILE), PathBuf::from);
        Self::new(path)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigPort for JsonSettingsFile {
    fn load(&self) -> Result<Settings, ConfigError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(
                    "JsonSettingsFile: {} not found, using defaults",
                    self.path.display()
                );
                return Ok(Settings::default());
            }
            Err(e) => {
                warn!("JsonSettingsFile: reading {} failed: {}", self.path.display(), e);
                return Err(ConfigError::IoError);
            }
        };
        let settings = serde_json::from_str(&text).map_err(|e| {
            warn!("JsonSettingsFile: {} is corrupted: {}", self.path.display(), e);
            ConfigError::Corrupted
        })?;
        info!("JsonSettingsFile: loaded {}", self.path.display());
        Ok(settings)
    }

    fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        let body = serde_json::to_vec_pretty(settings).map_err(|_| ConfigError::IoError)?;
        let tmp = self.temp_path();
        fs::write(&tmp, &body).map_err(|e| {
            warn!("JsonSettingsFile: writing {} failed: {}", tmp.display(), e);
            ConfigError::IoError
        })?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            warn!("JsonSettingsFile: replacing {} failed: {}", self.path.display(), e);
            ConfigError::IoError
        })?;
        info!(
            "JsonSettingsFile: saved {} ({} bytes)",
            self.path.display(),
            body.len()
        );
        Ok(())
    }
}
