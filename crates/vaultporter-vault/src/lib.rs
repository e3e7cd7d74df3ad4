//! # Vault Access
//!
//! Vault registry, validation, discovery and the filesystem seam used by the
//! transfer engine.
//!
//! ## Quick Start
//!
//! ```no_run
//! use vaultporter_vault::prelude::*;
//! use std::path::Path;
//!
//! # async fn example() -> Result<()> {
//! let registry = VaultRegistry::new();
//! let result = registry.validate(Path::new("/path/to/vault")).await;
//! if result.is_valid {
//!     let vault = VaultConfig::builder("Notes", "/path/to/vault").build()?;
//!     registry.add(vault.clone()).await?;
//!     for folder in registry.list_folders(&vault).await {
//!         println!("{}", folder);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Modules
//!
//! ### Registry
//!
//! [`registry::VaultRegistry`] holds the known vaults in display order:
//! - Validate a directory as a vault
//! - List folders inside a vault (walked on the blocking pool)
//! - Check whether a vault-rooted path is taken
//! - Find the next free `name N.ext`
//!
//! ### Discovery
//!
//! [`discovery::VaultDiscovery`] scans conventional locations for vaults:
//!
//! ```no_run
//! use vaultporter_vault::prelude::*;
//!
//! # async fn example() {
//! for vault in VaultDiscovery::new().discover().await {
//!     println!("{} -> {}", vault.name, vault.path.display());
//! }
//! # }
//! ```
//!
//! ### Filesystem
//!
//! [`fs::FileSystem`] is the async seam every disk access goes through.
//! [`fs::TokioFileSystem`] is the real implementation; tests substitute
//! slow or failing ones.
//!
//! ## Thread Safety
//!
//! `VaultRegistry` uses `Arc<RwLock<...>>` internally and is cheap to clone.
//! Clones share the same index.

pub mod discovery;
pub mod fs;
pub mod registry;

pub use discovery::{VaultDiscovery, expand_path};
pub use fs::{DirEntryInfo, FileStats, FileSystem, TokioFileSystem};
pub use registry::{VaultRegistry, validate_vault};
pub use vaultporter_core::prelude::*;

pub mod prelude {
    pub use crate::discovery::*;
    pub use crate::fs::*;
    pub use crate::registry::*;
    pub use vaultporter_core::prelude::*;
}
