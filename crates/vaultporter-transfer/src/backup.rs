//! Private backup store for in-flight transfers.
//!
//! When a transfer deletes its source, the source is first copied here under
//! a name derived from the operation id. Backups normally live only for the
//! duration of one transfer; anything left behind by a crash is removed by
//! [`BackupStore::cleanup_old`] once it passes the retention window.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use vaultporter_core::{DEFAULT_BACKUP_RETENTION_HOURS, Result};
use vaultporter_vault::{FileSystem, TokioFileSystem};

/// File-name prefix that marks a file as ours
pub const BACKUP_PREFIX: &str = "vaultporter-backup-";

/// Directory name used under the system temp dir
const BACKUP_DIR_NAME: &str = "vaultporter-backups";

/// Backup files for transfers in progress
#[derive(Clone)]
pub struct BackupStore {
    dir: PathBuf,
    fs: Arc<dyn FileSystem>,
    retention: Duration,
}

impl BackupStore {
    /// Store backups in `dir`
    pub fn new(dir: impl Into<PathBuf>, fs: Arc<dyn FileSystem>) -> Self {
        Self {
            dir: dir.into(),
            fs,
            retention: Duration::from_secs(DEFAULT_BACKUP_RETENTION_HOURS * 3600),
        }
    }

    /// Store backups under the system temp directory
    pub fn in_temp_dir(fs: Arc<dyn FileSystem>) -> Self {
        Self::new(std::env::temp_dir().join(BACKUP_DIR_NAME), fs)
    }

    /// How old a backup must be before the sweep removes it
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Backup location for an operation. `suffix` distinguishes several
    /// backups belonging to the same operation.
    pub fn backup_path(&self, operation_id: &str, suffix: &str) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", BACKUP_PREFIX, operation_id, suffix))
    }

    /// Copy `original` into the store
    pub async fn create(&self, operation_id: &str, suffix: &str, original: &Path) -> Result<PathBuf> {
        self.fs.create_dir_all(&self.dir).await?;
        let backup = self.backup_path(operation_id, suffix);
        self.fs.copy(original, &backup).await?;
        log::debug!("Backed up {} to {}", original.display(), backup.display());
        Ok(backup)
    }

    /// Copy a backup back over `original`
    pub async fn restore(&self, backup: &Path, original: &Path) -> Result<()> {
        if let Some(parent) = original.parent() {
            self.fs.create_dir_all(parent).await?;
        }
        self.fs.copy(backup, original).await?;
        log::info!("Restored {} from backup", original.display());
        Ok(())
    }

    /// Delete a backup
    pub async fn discard(&self, backup: &Path) -> Result<()> {
        self.fs.remove_file(backup).await
    }

    /// Delete prefixed files older than the retention window.
    ///
    /// Never fails; returns how many backups were removed.
    pub async fn cleanup_old(&self) -> usize {
        let entries = match self.fs.read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.is_not_found() => return 0,
            Err(e) => {
                log::warn!("Cannot read backup dir {}: {}", self.dir.display(), e);
                return 0;
            }
        };

        let now = SystemTime::now();
        let mut removed = 0;

        for entry in entries {
            if entry.is_dir || !entry.name.starts_with(BACKUP_PREFIX) {
                continue;
            }

            let modified = match self.fs.metadata(&entry.path).await {
                Ok(stats) => stats.modified,
                Err(e) => {
                    log::warn!("Cannot stat backup {}: {}", entry.path.display(), e);
                    continue;
                }
            };

            let age = modified.and_then(|m| now.duration_since(m).ok());
            if !matches!(age, Some(age) if age > self.retention) {
                continue;
            }

            match self.fs.remove_file(&entry.path).await {
                Ok(()) => {
                    log::debug!("Removed stale backup {}", entry.path.display());
                    removed += 1;
                }
                Err(e) => log::warn!("Failed to remove backup {}: {}", entry.path.display(), e),
            }
        }

        if removed > 0 {
            log::info!("Removed {} stale backups from {}", removed, self.dir.display());
        }
        removed
    }
}

impl Default for BackupStore {
    fn default() -> Self {
        Self::in_temp_dir(Arc::new(TokioFileSystem::new()))
    }
}

impl std::fmt::Debug for BackupStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupStore")
            .field("dir", &self.dir)
            .field("retention", &self.retention)
            .finish()
    }
}
