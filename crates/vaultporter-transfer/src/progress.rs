//! Progress reporting for single transfers and batches.
//!
//! Callbacks are invoked synchronously on the transfer task, in stage order.

use serde::{Deserialize, Serialize};
use vaultporter_core::{TransferProgress, TransferStage};

/// Per-stage progress callback
pub type ProgressCallback<'a> = &'a (dyn Fn(TransferProgress) + Send + Sync);

/// Per-file batch callback
pub type BatchProgressCallback<'a> = &'a (dyn Fn(BatchProgress) + Send + Sync);

/// Reported before each file of a batch starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchProgress {
    /// Zero-based position in the batch
    pub index: usize,
    pub total: usize,
    pub file_name: String,
}

impl BatchProgress {
    /// Fraction of the batch already finished, as a percentage
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            (self.index as f64 / self.total as f64) * 100.0
        }
    }
}

/// Forwards stage transitions to an optional callback
pub(crate) struct ProgressReporter<'a> {
    callback: Option<ProgressCallback<'a>>,
    last: Option<(TransferStage, u8)>,
}

impl<'a> ProgressReporter<'a> {
    pub(crate) fn new(callback: Option<ProgressCallback<'a>>) -> Self {
        Self {
            callback,
            last: None,
        }
    }

    pub(crate) fn report(&mut self, stage: TransferStage, percentage: u8, message: impl Into<String>) {
        let progress = TransferProgress::new(stage, percentage, message);
        log::trace!("{} {}%: {}", progress.stage, progress.percentage, progress.message);
        self.last = Some((progress.stage, progress.percentage));
        if let Some(callback) = self.callback {
            callback(progress);
        }
    }

    /// Last stage reported, for failure messages
    pub(crate) fn last_stage(&self) -> Option<TransferStage> {
        self.last.map(|(stage, _)| stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_reporter_forwards_in_order() {
        let seen = Mutex::new(Vec::new());
        let callback = |p: TransferProgress| seen.lock().unwrap().push((p.stage, p.percentage));

        let mut reporter = ProgressReporter::new(Some(&callback));
        reporter.report(TransferStage::Preparing, 0, "start");
        reporter.report(TransferStage::Reading, 20, "read");
        assert_eq!(reporter.last_stage(), Some(TransferStage::Reading));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(TransferStage::Preparing, 0), (TransferStage::Reading, 20)]
        );
    }

    #[test]
    fn test_reporter_without_callback() {
        let mut reporter = ProgressReporter::new(None);
        reporter.report(TransferStage::Complete, 100, "done");
        assert_eq!(reporter.last_stage(), Some(TransferStage::Complete));
    }

    #[test]
    fn test_batch_percentage() {
        let progress = BatchProgress {
            index: 1,
            total: 4,
            file_name: "a.md".into(),
        };
        assert_eq!(progress.percentage(), 25.0);
    }
}
