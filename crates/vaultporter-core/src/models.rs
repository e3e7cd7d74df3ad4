//! Core data models for vault transfers.
//!
//! These types are shared by the registry, the transfer engine and the
//! command-line shell. Most of them serialize so the shell can persist
//! defaults or print results as JSON.

use crate::config::VaultConfig;
use crate::utils::{PathValidator, normalize_path};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Outcome of checking whether a directory is a vault.
///
/// Computed fresh on every call; callers decide whether to cache it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultValidationResult {
    /// Marker folder present (the only authoritative signal)
    pub is_valid: bool,
    pub has_marker_folder: bool,
    pub has_plugins_subfolder: bool,
    pub has_data_file: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl VaultValidationResult {
    /// Invalid result carrying an error message
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// What to do when the target path is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictStrategy {
    /// Abort the transfer
    Skip,
    /// Replace the existing file
    Overwrite,
    /// Pick the next free `name N.ext`
    #[default]
    Rename,
    /// Defer to the caller; currently resolved like `Rename`
    Ask,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Skip => write!(f, "skip"),
            Self::Overwrite => write!(f, "overwrite"),
            Self::Rename => write!(f, "rename"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

impl std::str::FromStr for ConflictStrategy {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "skip" => Ok(Self::Skip),
            "overwrite" => Ok(Self::Overwrite),
            "rename" => Ok(Self::Rename),
            "ask" => Ok(Self::Ask),
            other => Err(crate::Error::config_error(format!(
                "Unknown conflict strategy: {} (supported: skip, overwrite, rename, ask)",
                other
            ))),
        }
    }
}

/// Per-call transfer options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveOptions {
    /// Remove the source after a verified copy (move instead of copy)
    pub delete_original: bool,
    /// Copy created/modified timestamps onto the target
    pub preserve_metadata: bool,
    /// Whether the shell should render progress updates
    pub show_progress: bool,
    pub conflict_strategy: ConflictStrategy,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            delete_original: true,
            preserve_metadata: true,
            show_progress: true,
            conflict_strategy: ConflictStrategy::Rename,
        }
    }
}

impl MoveOptions {
    /// Options for a copy that leaves the source in place
    pub fn copy() -> Self {
        Self {
            delete_original: false,
            ..Default::default()
        }
    }

    pub fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.conflict_strategy = strategy;
        self
    }
}

/// Result of a single transfer. Never carries a panic or an `Err`; failures
/// are reported through `success` and `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub success: bool,
    /// Vault-rooted path of the written file (e.g. `/Inbox/Draft 1.md`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Backup kept behind after a failed cleanup, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_path: Option<PathBuf>,
    /// Wall-clock duration in milliseconds
    pub duration: u64,
}

impl MoveResult {
    pub fn succeeded(new_path: impl Into<String>, duration: u64) -> Self {
        Self {
            success: true,
            new_path: Some(new_path.into()),
            error: None,
            backup_path: None,
            duration,
        }
    }

    pub fn failed(error: impl Into<String>, duration: u64) -> Self {
        Self {
            success: false,
            new_path: None,
            error: Some(error.into()),
            backup_path: None,
            duration,
        }
    }
}

/// Lifecycle status of a [`MoveOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationStatus {
    Pending,
    Success,
    Failed,
}

/// One in-flight or completed transfer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveOperation {
    /// Unique operation id; also names the backup file
    pub id: String,
    /// Source file, relative to `source_vault_root`
    pub file: PathBuf,
    pub source_vault_root: PathBuf,
    pub target_vault: VaultConfig,
    /// Vault-rooted target path (final after conflict resolution)
    pub target_path: String,
    pub created_at: DateTime<Utc>,
    pub status: OperationStatus,
    pub error: Option<String>,
}

impl MoveOperation {
    pub fn new(
        id: impl Into<String>,
        file: impl Into<PathBuf>,
        source_vault_root: impl Into<PathBuf>,
        target_vault: VaultConfig,
        target_path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            file: file.into(),
            source_vault_root: source_vault_root.into(),
            target_vault,
            target_path: target_path.into(),
            created_at: Utc::now(),
            status: OperationStatus::Pending,
            error: None,
        }
    }

    /// Absolute, lexically normalized path of the source file; the tracker
    /// keys on this. Fails when `file` climbs out of the source vault.
    pub fn source_path(&self) -> crate::Result<PathBuf> {
        PathValidator::validate_path_in_vault(&normalize_path(&self.source_vault_root), &self.file)
    }

    pub fn mark_success(&mut self) {
        self.status = OperationStatus::Success;
        self.error = None;
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = OperationStatus::Failed;
        self.error = Some(error.into());
    }
}

/// Pipeline stage reported through progress callbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransferStage {
    Preparing,
    Reading,
    Writing,
    Verifying,
    Cleaning,
    Complete,
}

impl fmt::Display for TransferStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Preparing => write!(f, "preparing"),
            Self::Reading => write!(f, "reading"),
            Self::Writing => write!(f, "writing"),
            Self::Verifying => write!(f, "verifying"),
            Self::Cleaning => write!(f, "cleaning"),
            Self::Complete => write!(f, "complete"),
        }
    }
}

/// A single progress update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferProgress {
    pub stage: TransferStage,
    /// 0..=100
    pub percentage: u8,
    pub message: String,
}

impl TransferProgress {
    pub fn new(stage: TransferStage, percentage: u8, message: impl Into<String>) -> Self {
        Self {
            stage,
            percentage: percentage.min(100),
            message: message.into(),
        }
    }
}

/// A destination the user moved something to recently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentDestination {
    pub vault_id: String,
    /// Vault-rooted folder path
    pub path: String,
    pub timestamp: DateTime<Utc>,
}

/// Counts of tracked operations by status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationStatistics {
    pub active: usize,
    pub completed: usize,
    pub failed: usize,
}
