//! # VaultPorter Core
//!
//! Core data models, error types, and settings for moving files between
//! Obsidian vaults. This crate defines the canonical types that all other
//! crates depend on.
//!
//! ## Core Modules
//!
//! - [`models`] - Transfer data types (MoveOptions, MoveResult, MoveOperation, ...)
//! - [`error`] - Error type and Result alias
//! - [`config`] - Vault configuration and the persisted settings document
//! - [`settings`] - Reading and writing the settings document
//! - [`metrics`] - Counters and histograms for transfer statistics
//! - [`utils`] - Id generation and vault-rooted path helpers
//!
//! ## Usage Examples
//!
//! ```
//! use vaultporter_core::prelude::*;
//!
//! let options = MoveOptions::copy().with_strategy(ConflictStrategy::Skip);
//! assert!(!options.delete_original);
//!
//! let mut settings = TransferSettings::default();
//! settings.record_destination("vault-id", "/Inbox");
//! assert_eq!(settings.recent_destinations.len(), 1);
//! ```
//!
//! ### Error Handling
//!
//! ```
//! use vaultporter_core::prelude::*;
//!
//! fn check() -> Result<()> {
//!     Err(Error::conflict_skipped("/Inbox/Draft.md"))
//! }
//! assert!(check().unwrap_err().is_cancellation());
//! ```

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod settings;
pub mod utils;

pub use config::*;
pub use error::{Error, Result};
pub use metrics::{Counter, Histogram, HistogramStats, TransferMetrics};
pub use models::*;
pub use settings::SettingsStore;
pub use utils::{
    OperationTimer, PathValidator, generate_id, join_vault_path, normalize_path,
    normalize_vault_path, to_json_string, to_vault_path,
};

/// Marker folder whose presence makes a directory a vault
pub const VAULT_MARKER_FOLDER: &str = ".obsidian";

/// Re-export commonly used types
pub mod prelude {
    pub use crate::VAULT_MARKER_FOLDER;
    pub use crate::config::{TransferSettings, VaultConfig, VaultConfigPatch};
    pub use crate::error::{Error, Result};
    pub use crate::metrics::TransferMetrics;
    pub use crate::models::{
        ConflictStrategy, MoveOperation, MoveOptions, MoveResult, OperationStatistics,
        OperationStatus, RecentDestination, TransferProgress, TransferStage,
        VaultValidationResult,
    };
    pub use crate::settings::SettingsStore;
    pub use crate::utils::{
        PathValidator, generate_id, join_vault_path, normalize_path, normalize_vault_path,
    };
}
