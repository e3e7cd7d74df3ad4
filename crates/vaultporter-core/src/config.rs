//! Configuration types: per-vault settings and the persisted settings document.
//!
//! Follows a builder pattern for vault configuration with validation.

use crate::error::{Error, Result};
use crate::models::{MoveOptions, RecentDestination};
use crate::utils::generate_id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// Maximum number of entries kept in [`TransferSettings::recent_destinations`]
pub const MAX_RECENT_DESTINATIONS: usize = 20;

/// Default age after which leftover backups are swept
pub const DEFAULT_BACKUP_RETENTION_HOURS: u64 = 24;

/// Configuration for a single known vault
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Opaque unique identifier, stable across restarts
    pub id: String,
    /// Display label
    pub name: String,
    /// Absolute path to the vault root
    pub path: PathBuf,
    /// Last known validation result (a cache, not a live guarantee)
    #[serde(default)]
    pub is_valid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl VaultConfig {
    /// Create a new vault config with builder
    pub fn builder(name: impl Into<String>, path: impl Into<PathBuf>) -> VaultConfigBuilder {
        VaultConfigBuilder::new(name, path)
    }

    /// Validate the vault configuration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::validation_error("Vault name cannot be empty"));
        }

        if !self.path.is_absolute() {
            return Err(Error::config_error(format!(
                "Vault path must be absolute: {}",
                self.path.display()
            )));
        }

        if !self.path.exists() {
            return Err(Error::config_error(format!(
                "Vault path does not exist: {}",
                self.path.display()
            )));
        }

        if !self.path.is_dir() {
            return Err(Error::config_error(format!(
                "Vault path is not a directory: {}",
                self.path.display()
            )));
        }

        Ok(())
    }

    /// Apply the mutable fields of `patch`; `id` is never changed.
    pub fn merge(&mut self, patch: VaultConfigPatch) {
        if let Some(name) = patch.name {
            self.name = name;
        }
        if let Some(path) = patch.path {
            self.path = path;
        }
        if let Some(is_valid) = patch.is_valid {
            self.is_valid = is_valid;
        }
        if let Some(last_accessed) = patch.last_accessed {
            self.last_accessed = Some(last_accessed);
        }
        if let Some(description) = patch.description {
            self.description = Some(description).filter(|d| !d.is_empty());
        }
        if let Some(color) = patch.color {
            self.color = Some(color).filter(|c| !c.is_empty());
        }
    }
}

/// Partial update for [`VaultConfig::merge`]. `None` leaves a field alone;
/// an empty description or color clears it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultConfigPatch {
    pub name: Option<String>,
    pub path: Option<PathBuf>,
    pub is_valid: Option<bool>,
    pub last_accessed: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// Builder for VaultConfig
pub struct VaultConfigBuilder {
    id: Option<String>,
    name: String,
    path: PathBuf,
    is_valid: bool,
    description: Option<String>,
    color: Option<String>,
}

impl VaultConfigBuilder {
    /// Create a new builder
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            id: None,
            name: name.into(),
            path: path.into(),
            is_valid: false,
            description: None,
            color: None,
        }
    }

    /// Use a known id instead of generating one
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn valid(mut self, is_valid: bool) -> Self {
        self.is_valid = is_valid;
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Build without touching the filesystem
    pub fn build_unchecked(self) -> VaultConfig {
        VaultConfig {
            id: self.id.unwrap_or_else(generate_id),
            name: self.name,
            path: self.path,
            is_valid: self.is_valid,
            last_accessed: None,
            description: self.description,
            color: self.color,
        }
    }

    /// Build and validate
    pub fn build(self) -> Result<VaultConfig> {
        let config = self.build_unchecked();
        config.validate()?;
        Ok(config)
    }
}

/// The persisted settings document owned by the shell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferSettings {
    /// Known vaults, in display order
    pub vaults: Vec<VaultConfig>,
    /// Defaults applied when the caller does not override them
    pub default_options: MoveOptions,
    /// Most-recent-first, capped at [`MAX_RECENT_DESTINATIONS`]
    pub recent_destinations: Vec<RecentDestination>,
    pub last_used_vault: Option<String>,
    /// Run discovery when no vaults are configured
    pub auto_discover: bool,
    pub backup_retention_hours: u64,
}

impl Default for TransferSettings {
    fn default() -> Self {
        Self {
            vaults: vec![],
            default_options: MoveOptions::default(),
            recent_destinations: vec![],
            last_used_vault: None,
            auto_discover: true,
            backup_retention_hours: DEFAULT_BACKUP_RETENTION_HOURS,
        }
    }
}

impl TransferSettings {
    /// Create new settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        let ids: HashSet<_> = self.vaults.iter().map(|v| &v.id).collect();
        if ids.len() != self.vaults.len() {
            return Err(Error::config_error("Vault ids must be unique"));
        }

        if self.backup_retention_hours == 0 {
            return Err(Error::config_error(
                "backup_retention_hours must be greater than zero",
            ));
        }

        if let Some(last) = &self.last_used_vault
            && !self.vaults.iter().any(|v| &v.id == last)
        {
            return Err(Error::config_error(format!(
                "last_used_vault '{}' is not a configured vault",
                last
            )));
        }

        Ok(())
    }

    /// Look up a vault by id
    pub fn vault(&self, id: &str) -> Option<&VaultConfig> {
        self.vaults.iter().find(|v| v.id == id)
    }

    /// The last used vault, falling back to the first configured one
    pub fn default_vault(&self) -> Result<&VaultConfig> {
        self.last_used_vault
            .as_deref()
            .and_then(|id| self.vault(id))
            .or_else(|| self.vaults.first())
            .ok_or_else(|| Error::config_error("No destination vault configured"))
    }

    /// Record a successful destination: moves it to the front of the
    /// recent list, trims to the cap, and remembers the vault.
    pub fn record_destination(&mut self, vault_id: impl Into<String>, path: impl Into<String>) {
        let vault_id = vault_id.into();
        let path = path.into();

        self.recent_destinations
            .retain(|d| !(d.vault_id == vault_id && d.path == path));
        self.recent_destinations.insert(
            0,
            RecentDestination {
                vault_id: vault_id.clone(),
                path,
                timestamp: Utc::now(),
            },
        );
        self.recent_destinations.truncate(MAX_RECENT_DESTINATIONS);
        self.last_used_vault = Some(vault_id);
    }

    /// Drop a vault together with everything that refers to it
    pub fn forget_vault(&mut self, vault_id: &str) {
        self.vaults.retain(|v| v.id != vault_id);
        self.recent_destinations.retain(|d| d.vault_id != vault_id);
        if self.last_used_vault.as_deref() == Some(vault_id) {
            self.last_used_vault = None;
        }
    }
}
