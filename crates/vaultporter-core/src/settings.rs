//! Persistent settings store for vault registrations and transfer defaults
//!
//! The shell owns the settings document ([`TransferSettings`]); this module
//! only knows where it lives and how to read and write it.
//!
//! Settings location:
//! - Linux/macOS: $XDG_CONFIG_HOME/vaultporter/ or ~/.config/vaultporter/
//! - Windows: %APPDATA%\vaultporter\
//! - Fallback: ~/.vaultporter/ (all platforms)
//!
//! The document is written as YAML to a sibling temp file and renamed into
//! place so a crash mid-write never leaves a truncated file behind.

use crate::config::TransferSettings;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use tokio::fs;

const SETTINGS_FILE: &str = "settings.yaml";

/// Reads and writes [`TransferSettings`]
#[derive(Debug, Clone)]
pub struct SettingsStore {
    settings_file: PathBuf,
}

impl SettingsStore {
    /// Use the platform-specific settings directory
    pub async fn init() -> Result<Self> {
        let dir = Self::get_config_dir()?;
        Self::in_dir(&dir).await
    }

    /// Store settings in a specific directory (useful for testing)
    pub async fn in_dir(dir: &Path) -> Result<Self> {
        if !dir.exists() {
            fs::create_dir_all(dir).await.map_err(Error::io)?;
        }

        Ok(Self {
            settings_file: dir.join(SETTINGS_FILE),
        })
    }

    /// Store settings in an explicit file
    pub fn at(settings_file: impl Into<PathBuf>) -> Self {
        Self {
            settings_file: settings_file.into(),
        }
    }

    /// Get the platform-specific settings directory
    fn get_config_dir() -> Result<PathBuf> {
        if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(config_home).join("vaultporter"));
        }

        #[cfg(target_os = "windows")]
        {
            if let Ok(app_data) = std::env::var("APPDATA") {
                return Ok(PathBuf::from(app_data).join("vaultporter"));
            }
        }

        #[cfg(not(target_os = "windows"))]
        {
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home).join(".config").join("vaultporter"));
            }
        }

        if let Ok(home) = std::env::var("HOME") {
            return Ok(PathBuf::from(home).join(".vaultporter"));
        }

        Err(Error::config_error(
            "Cannot determine settings directory: HOME not set and no platform-specific override found",
        ))
    }

    /// Load settings; a missing file yields defaults
    pub async fn load(&self) -> Result<TransferSettings> {
        if !self.settings_file.exists() {
            log::debug!(
                "No settings at {}, using defaults",
                self.settings_file.display()
            );
            return Ok(TransferSettings::default());
        }

        let content = fs::read_to_string(&self.settings_file)
            .await
            .map_err(Error::io)?;

        let settings: TransferSettings = serde_yaml::from_str(&content)
            .map_err(|e| Error::config_error(format!("Invalid settings file: {}", e)))?;

        log::debug!(
            "Loaded {} vaults from {}",
            settings.vaults.len(),
            self.settings_file.display()
        );

        Ok(settings)
    }

    /// Save settings atomically
    pub async fn save(&self, settings: &TransferSettings) -> Result<()> {
        let yaml = serde_yaml::to_string(settings)
            .map_err(|e| Error::config_error(format!("Failed to serialize settings: {}", e)))?;

        if let Some(parent) = self.settings_file.parent() {
            fs::create_dir_all(parent).await.map_err(Error::io)?;
        }

        let temp_path = self.settings_file.with_extension("yaml.tmp");
        fs::write(&temp_path, yaml).await.map_err(Error::io)?;
        fs::rename(&temp_path, &self.settings_file)
            .await
            .map_err(Error::io)?;

        log::debug!(
            "Saved {} vaults to {}",
            settings.vaults.len(),
            self.settings_file.display()
        );

        Ok(())
    }

    /// Remove the settings file
    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.settings_file).await {
            Ok(()) => {
                log::info!("Settings cleared at {}", self.settings_file.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(e)),
        }
    }

    /// Path of the settings file
    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }
}
