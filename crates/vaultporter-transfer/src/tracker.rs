//! Operation tracker: the index of transfers in flight.
//!
//! Keyed by the absolute, lexically normalized source path, which is what
//! enforces "at most one active transfer per source file". Lookups normalize
//! the same way, so `a/../Draft.md` and `Draft.md` hit the same entry. Entries are removed when a transfer ends, so
//! [`OperationTracker::statistics`] only sees what is still tracked; the
//! lifetime counters in [`TransferMetrics`] survive removal.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::path::{Path, PathBuf};
use vaultporter_core::prelude::*;

/// In-flight transfer index
#[derive(Debug, Default)]
pub struct OperationTracker {
    active: DashMap<PathBuf, MoveOperation>,
    metrics: TransferMetrics,
}

impl OperationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a transfer for this source path is in flight
    pub fn is_active(&self, source: &Path) -> bool {
        self.active.contains_key(&normalize_path(source))
    }

    /// Register a transfer. Fails with [`Error::OperationActive`] when the
    /// same source is already tracked, or with a path error when the source
    /// escapes its vault.
    pub fn begin_operation(&self, operation: MoveOperation) -> Result<String> {
        let key = operation.source_path()?;
        match self.active.entry(key) {
            Entry::Occupied(entry) => Err(Error::operation_active(entry.key().clone())),
            Entry::Vacant(entry) => {
                let id = operation.id.clone();
                log::debug!("Begin operation {} for {}", id, entry.key().display());
                entry.insert(operation);
                self.metrics.started.increment();
                Ok(id)
            }
        }
    }

    /// Mark the tracked transfer for `source` as succeeded
    pub fn mark_success(&self, source: &Path) {
        if let Some(mut op) = self.active.get_mut(&normalize_path(source)) {
            op.mark_success();
        }
    }

    /// Mark the tracked transfer for `source` as failed
    pub fn mark_failed(&self, source: &Path, error: impl Into<String>) {
        if let Some(mut op) = self.active.get_mut(&normalize_path(source)) {
            op.mark_failed(error);
        }
    }

    /// Remove an operation by id and fold its outcome into the lifetime
    /// counters. Unknown ids (already cancelled) are ignored.
    pub fn end_operation(&self, id: &str) -> Option<MoveOperation> {
        let key = self
            .active
            .iter()
            .find(|entry| entry.value().id == id)
            .map(|entry| entry.key().clone())?;

        let (_, op) = self.active.remove(&key)?;
        self.record_outcome(&op);
        log::debug!("End operation {} ({:?})", op.id, op.status);
        Some(op)
    }

    /// Advisory cancel: mark the transfer failed and stop tracking it.
    /// The running pipeline is not interrupted.
    pub fn cancel(&self, source: &Path) -> bool {
        match self.active.remove(&normalize_path(source)) {
            Some((_, mut op)) => {
                op.mark_failed(Error::cancelled("requested by user").to_string());
                self.record_outcome(&op);
                log::info!("Cancelled operation {} for {}", op.id, source.display());
                true
            }
            None => false,
        }
    }

    /// Counts over the currently tracked entries
    pub fn statistics(&self) -> OperationStatistics {
        let mut stats = OperationStatistics::default();
        for entry in self.active.iter() {
            match entry.value().status {
                OperationStatus::Pending => stats.active += 1,
                OperationStatus::Success => stats.completed += 1,
                OperationStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Counts since this tracker was created
    pub fn lifetime_statistics(&self) -> OperationStatistics {
        OperationStatistics {
            active: self.active.len(),
            completed: self.metrics.succeeded.value() as usize,
            failed: self.metrics.failed.value() as usize,
        }
    }

    pub fn metrics(&self) -> &TransferMetrics {
        &self.metrics
    }

    fn record_outcome(&self, op: &MoveOperation) {
        match op.status {
            OperationStatus::Success => self.metrics.succeeded.increment(),
            OperationStatus::Failed => self.metrics.failed.increment(),
            OperationStatus::Pending => {}
        }
    }
}
