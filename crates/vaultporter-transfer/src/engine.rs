//! Transfer engine: a staged, checksum-verified copy/delete pipeline.
//!
//! Stages run in strict order and each transition is reported:
//!
//! | stage | % | work |
//! |---|---|---|
//! | preparing | 0 | track the operation, resolve target conflicts |
//! | reading | 20-30 | read the source, back it up when moving |
//! | writing | 40-70 | create folders, write, copy timestamps |
//! | verifying | 80 | SHA-256 of source and target from disk |
//! | cleaning | 90 | delete source then backup (moves only) |
//! | complete | 100 | |
//!
//! Any failure marks the operation failed and rolls back. Rollback is
//! best-effort and never fails. The tracker entry is always removed.

use crate::backup::BackupStore;
use crate::conflict::resolve_conflict;
use crate::progress::{BatchProgress, BatchProgressCallback, ProgressCallback, ProgressReporter};
use crate::tracker::OperationTracker;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::instrument;
use vaultporter_core::prelude::*;
use vaultporter_core::OperationTimer;
use vaultporter_vault::{FileSystem, VaultRegistry};

/// Suffix for the backup of a target displaced by `overwrite`
const DISPLACED_SUFFIX: &str = "-target";

/// Filesystem effects of a transfer so far; drives rollback
#[derive(Debug, Default)]
struct TransferState {
    source: PathBuf,
    /// Target path once writing started
    target: Option<PathBuf>,
    /// Backup of the source (moves only)
    backup: Option<PathBuf>,
    /// Backup of a pre-existing target being overwritten
    displaced: Option<PathBuf>,
}

impl TransferState {
    fn touched_disk(&self) -> bool {
        self.target.is_some() || self.backup.is_some() || self.displaced.is_some()
    }
}

/// Removes the tracker entry however the transfer ends
struct ActiveGuard<'a> {
    tracker: &'a OperationTracker,
    id: String,
}

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.tracker.end_operation(&self.id);
    }
}

/// Moves and copies files between vaults
pub struct TransferEngine {
    registry: VaultRegistry,
    fs: Arc<dyn FileSystem>,
    tracker: Arc<OperationTracker>,
    backups: BackupStore,
}

impl TransferEngine {
    /// Engine using the registry's filesystem and a backup dir under the
    /// system temp directory
    pub fn new(registry: VaultRegistry) -> Self {
        let fs = registry.fs();
        Self {
            backups: BackupStore::in_temp_dir(Arc::clone(&fs)),
            registry,
            fs,
            tracker: Arc::new(OperationTracker::new()),
        }
    }

    /// Keep backups in `dir`
    pub fn with_backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        let retention = self.backups.retention();
        self.backups = BackupStore::new(dir, Arc::clone(&self.fs)).with_retention(retention);
        self
    }

    /// How long stray backups survive before the sweep removes them
    pub fn with_backup_retention(mut self, retention: Duration) -> Self {
        self.backups = self.backups.with_retention(retention);
        self
    }

    /// Apply persisted settings (currently the backup retention window)
    pub fn with_settings(self, settings: &TransferSettings) -> Self {
        self.with_backup_retention(Duration::from_secs(settings.backup_retention_hours * 3600))
    }

    pub fn registry(&self) -> &VaultRegistry {
        &self.registry
    }

    pub fn tracker(&self) -> &Arc<OperationTracker> {
        &self.tracker
    }

    pub fn backups(&self) -> &BackupStore {
        &self.backups
    }

    /// Whether a transfer for this absolute source path is in flight
    pub fn is_active(&self, source: &Path) -> bool {
        self.tracker.is_active(source)
    }

    /// Advisory cancel; see [`OperationTracker::cancel`]
    pub fn cancel_operation(&self, source: &Path) -> bool {
        self.tracker.cancel(source)
    }

    pub fn statistics(&self) -> OperationStatistics {
        self.tracker.statistics()
    }

    /// Transfer one file into `target_folder` of `target_vault`.
    ///
    /// `file` is relative to `source_vault_root`. Never returns an error;
    /// failures are reported through [`MoveResult`].
    #[instrument(
        skip_all,
        fields(file = %file.display(), vault = %target_vault.name, folder = target_folder),
        name = "transfer_file"
    )]
    pub async fn transfer_file(
        &self,
        file: &Path,
        source_vault_root: &Path,
        target_vault: &VaultConfig,
        target_folder: &str,
        options: &MoveOptions,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> MoveResult {
        let timer = OperationTimer::new();
        let mut reporter = ProgressReporter::new(on_progress);

        let Some(file_name) = file.file_name().map(|n| n.to_string_lossy().into_owned()) else {
            return MoveResult::failed(
                Error::invalid_path(format!("Not a file: {}", file.display())).to_string(),
                timer.elapsed_ms(),
            );
        };

        let mut operation = MoveOperation::new(
            timer.operation_id(),
            file,
            source_vault_root,
            target_vault.clone(),
            join_vault_path(target_folder, &file_name),
        );

        reporter.report(TransferStage::Preparing, 0, format!("Preparing {}", file_name));

        let source = match operation.source_path() {
            Ok(source) => source,
            Err(e) => {
                log::warn!("Refusing transfer of {}: {}", file.display(), e);
                return MoveResult::failed(e.to_string(), timer.elapsed_ms());
            }
        };

        if let Err(e) = self.tracker.begin_operation(operation.clone()) {
            log::warn!("{}", e);
            return MoveResult::failed(e.to_string(), timer.elapsed_ms());
        }
        let _guard = ActiveGuard {
            tracker: &self.tracker,
            id: operation.id.clone(),
        };

        let mut state = TransferState {
            source: source.clone(),
            ..Default::default()
        };

        let outcome = self
            .run_pipeline(&mut operation, &mut state, options, &mut reporter)
            .await;
        let duration = timer.elapsed_ms();
        self.tracker.metrics().duration_ms.record(duration as f64);

        match outcome {
            Ok(new_path) => {
                operation.mark_success();
                self.tracker.mark_success(&source);
                let action = if options.delete_original { "Moved" } else { "Copied" };
                log::info!(
                    "{} {} to {}:{} in {}ms",
                    action,
                    source.display(),
                    target_vault.name,
                    new_path,
                    duration
                );
                MoveResult::succeeded(new_path, duration)
            }
            Err(e) => {
                operation.mark_failed(e.to_string());
                self.tracker.mark_failed(&source, e.to_string());

                if e.is_cancellation() {
                    log::info!("Transfer of {} cancelled: {}", source.display(), e);
                } else {
                    log::error!(
                        "Transfer of {} failed during {}: {}",
                        source.display(),
                        reporter
                            .last_stage()
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "preparing".to_string()),
                        e
                    );
                }

                if state.touched_disk() {
                    self.rollback(&state).await;
                }

                let mut result = MoveResult::failed(e.to_string(), duration);
                if let Some(backup) = &state.backup
                    && self.fs.exists(backup).await
                {
                    result.backup_path = Some(backup.clone());
                }
                result
            }
        }
    }

    async fn run_pipeline(
        &self,
        operation: &mut MoveOperation,
        state: &mut TransferState,
        options: &MoveOptions,
        reporter: &mut ProgressReporter<'_>,
    ) -> Result<String> {
        let source = state.source.clone();
        let vault = &operation.target_vault;

        if self.registry.file_exists_at(vault, &operation.target_path).await {
            match resolve_conflict(
                &self.registry,
                vault,
                &operation.target_path,
                options.conflict_strategy,
            )
            .await
            {
                Some(resolved) => operation.target_path = resolved,
                None => return Err(Error::conflict_skipped(operation.target_path.clone())),
            }
        }

        let target = PathValidator::resolve(&vault.path, &operation.target_path)?;
        if target == source {
            return Err(Error::invalid_path(format!(
                "Source and target are the same file: {}",
                source.display()
            )));
        }

        // Reading
        reporter.report(TransferStage::Reading, 20, "Reading source file");
        let content = self.fs.read(&source).await.map_err(|e| {
            if e.is_not_found() {
                Error::file_not_found(&source)
            } else {
                e
            }
        })?;
        let stats = self.fs.metadata(&source).await?;
        if options.delete_original {
            state.backup = Some(self.backups.create(&operation.id, "", &source).await?);
        }
        reporter.report(
            TransferStage::Reading,
            30,
            format!("Read {} bytes", content.len()),
        );

        // Writing
        reporter.report(TransferStage::Writing, 40, "Writing target file");
        if self.fs.exists(&target).await {
            state.displaced = Some(
                self.backups
                    .create(&operation.id, DISPLACED_SUFFIX, &target)
                    .await?,
            );
        }
        if let Some(parent) = target.parent() {
            self.fs.create_dir_all(parent).await?;
        }
        state.target = Some(target.clone());
        self.fs.write(&target, &content).await?;

        if options.preserve_metadata
            && let Err(e) = self.fs.set_times(&target, &stats).await
        {
            log::warn!("Could not preserve timestamps on {}: {}", target.display(), e);
        }
        reporter.report(TransferStage::Writing, 70, "Target written");

        // Verifying
        reporter.report(TransferStage::Verifying, 80, "Verifying checksums");
        let expected = self.fs.checksum(&source).await?;
        let actual = self.fs.checksum(&target).await?;
        if expected != actual {
            return Err(Error::checksum_mismatch(&target, expected, actual));
        }

        // Cleaning
        if options.delete_original {
            reporter.report(TransferStage::Cleaning, 90, "Removing source file");
            self.fs.remove_file(&source).await?;
            if let Some(backup) = state.backup.take() {
                self.discard_backup(&backup).await;
            }
        }
        if let Some(displaced) = state.displaced.take() {
            self.discard_backup(&displaced).await;
        }

        self.tracker.metrics().bytes_transferred.add(stats.size);
        reporter.report(TransferStage::Complete, 100, "Transfer complete");
        Ok(operation.target_path.clone())
    }

    /// Undo whatever a failed transfer did. Never fails.
    async fn rollback(&self, state: &TransferState) {
        self.tracker.metrics().rollbacks.increment();

        if let Some(target) = &state.target {
            if let Err(e) = self.fs.remove_file(target).await {
                log::warn!("Rollback: failed to remove {}: {}", target.display(), e);
            }

            if let Some(displaced) = &state.displaced {
                match self.backups.restore(displaced, target).await {
                    Ok(()) => self.discard_backup(displaced).await,
                    Err(e) => log::error!(
                        "Rollback: failed to restore {} (backup kept at {}): {}",
                        target.display(),
                        displaced.display(),
                        e
                    ),
                }
            }
        } else if let Some(displaced) = &state.displaced {
            self.discard_backup(displaced).await;
        }

        if let Some(backup) = &state.backup {
            if !self.fs.exists(&state.source).await
                && let Err(e) = self.backups.restore(backup, &state.source).await
            {
                log::error!(
                    "Rollback: failed to restore {} (backup kept at {}): {}",
                    state.source.display(),
                    backup.display(),
                    e
                );
                return;
            }
            self.discard_backup(backup).await;
        }
    }

    async fn discard_backup(&self, backup: &Path) {
        if let Err(e) = self.backups.discard(backup).await {
            log::warn!("Failed to remove backup {}: {}", backup.display(), e);
        }
    }

    /// Transfer several files one after another.
    ///
    /// Results keep input order. With [`ConflictStrategy::Ask`] the batch
    /// stops at the first failure; every other strategy runs the whole list.
    #[allow(clippy::too_many_arguments)]
    pub async fn transfer_files(
        &self,
        files: &[PathBuf],
        source_vault_root: &Path,
        target_vault: &VaultConfig,
        target_folder: &str,
        options: &MoveOptions,
        on_batch_progress: Option<BatchProgressCallback<'_>>,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> IndexMap<PathBuf, MoveResult> {
        let total = files.len();
        let mut results = IndexMap::with_capacity(total);

        for (index, file) in files.iter().enumerate() {
            if let Some(callback) = on_batch_progress {
                callback(BatchProgress {
                    index,
                    total,
                    file_name: file
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_default(),
                });
            }

            let result = self
                .transfer_file(
                    file,
                    source_vault_root,
                    target_vault,
                    target_folder,
                    options,
                    on_progress,
                )
                .await;
            let failed = !result.success;
            results.insert(file.clone(), result);

            if failed && options.conflict_strategy == ConflictStrategy::Ask {
                log::warn!(
                    "Stopping batch after failure on {} ({}/{})",
                    file.display(),
                    index + 1,
                    total
                );
                break;
            }
        }

        results
    }

    /// Remove stray backups older than the retention window
    pub async fn cleanup_old_backups(&self) -> usize {
        self.backups.cleanup_old().await
    }

    /// Run [`Self::cleanup_old_backups`] every `interval` on a background
    /// task. The first sweep runs immediately.
    pub fn spawn_backup_sweeper(&self, interval: Duration) -> JoinHandle<()> {
        let backups = self.backups.clone();
        tokio::spawn(async move {
            log::debug!("Backup sweeper started (interval {:?})", interval);
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                backups.cleanup_old().await;
            }
        })
    }
}
