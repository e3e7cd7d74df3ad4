//! # Vault Transfer
//!
//! Move or copy a file from one vault to another without losing data when
//! something fails partway through.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vaultporter_transfer::prelude::*;
//! use std::path::Path;
//!
//! # async fn example() -> Result<()> {
//! let registry = VaultRegistry::new();
//! let target = VaultConfig::builder("Archive", "/vaults/archive").build()?;
//! let engine = TransferEngine::new(registry);
//!
//! let print = |p: TransferProgress| println!("{} {}%", p.stage, p.percentage);
//! let result = engine
//!     .transfer_file(
//!         Path::new("Inbox/Draft.md"),
//!         Path::new("/vaults/work"),
//!         &target,
//!         "/Inbox",
//!         &MoveOptions::default(),
//!         Some(&print),
//!     )
//!     .await;
//!
//! if let Some(path) = result.new_path {
//!     println!("Moved to {}", path);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`engine`] - The staged transfer pipeline and batch transfers
//! - [`conflict`] - What to do when the target path is taken
//! - [`backup`] - Private backup store and the stale-backup sweep
//! - [`tracker`] - In-flight operation index and statistics
//! - [`progress`] - Progress callback types

pub mod backup;
pub mod conflict;
pub mod engine;
pub mod progress;
pub mod tracker;

pub use backup::{BACKUP_PREFIX, BackupStore};
pub use conflict::resolve_conflict;
pub use engine::TransferEngine;
pub use progress::{BatchProgress, BatchProgressCallback, ProgressCallback};
pub use tracker::OperationTracker;
pub use vaultporter_vault::prelude::*;

pub mod prelude {
    pub use crate::backup::*;
    pub use crate::conflict::*;
    pub use crate::engine::*;
    pub use crate::progress::*;
    pub use crate::tracker::*;
    pub use vaultporter_vault::prelude::*;
}
