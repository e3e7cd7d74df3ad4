//! Vault discovery: scan conventional locations for directories that look
//! like vaults.
//!
//! Discovered vaults are returned, never registered. The caller decides
//! which of them to add to the registry.

use crate::fs::{FileSystem, TokioFileSystem};
use crate::registry::validate_vault;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::instrument;
use vaultporter_core::prelude::*;

/// Candidate roots relative to the home directory, common to all platforms
const COMMON_ROOTS: &[&str] = &[
    "~",
    "~/Documents",
    "~/Desktop",
    "~/Dropbox",
    "~/OneDrive",
    "~/Obsidian",
    "~/Documents/Obsidian",
];

#[cfg(target_os = "macos")]
const PLATFORM_ROOTS: &[&str] = &[
    "~/Library/Mobile Documents/iCloud~md~obsidian/Documents",
    "~/iCloud Drive",
];

#[cfg(not(target_os = "macos"))]
const PLATFORM_ROOTS: &[&str] = &[];

/// Expand `~` and environment variables in a user-supplied path.
///
/// Unresolvable variables leave the path as written.
pub fn expand_path(path: &str) -> PathBuf {
    match shellexpand::full(path) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(e) => {
            log::debug!("Failed to expand {}: {}", path, e);
            PathBuf::from(shellexpand::tilde(path).as_ref())
        }
    }
}

/// Scans candidate roots for vaults
pub struct VaultDiscovery {
    fs: Arc<dyn FileSystem>,
    roots: Vec<PathBuf>,
}

impl VaultDiscovery {
    /// Discovery over the platform-conventional locations
    pub fn new() -> Self {
        let roots = COMMON_ROOTS
            .iter()
            .chain(PLATFORM_ROOTS)
            .map(|root| expand_path(root))
            .collect();
        Self::with_roots(roots)
    }

    /// Discovery over an explicit list of roots
    pub fn with_roots(roots: Vec<PathBuf>) -> Self {
        Self {
            fs: Arc::new(TokioFileSystem::new()),
            roots,
        }
    }

    /// Use a different filesystem
    pub fn with_fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = fs;
        self
    }

    /// Candidate roots this discovery will scan
    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Find vaults under the candidate roots. Never fails; unreadable roots
    /// are logged and skipped.
    #[instrument(skip(self), fields(roots = self.roots.len()), name = "vault_discover")]
    pub async fn discover(&self) -> Vec<VaultConfig> {
        let mut seen = HashSet::new();
        let mut found = Vec::new();

        for root in &self.roots {
            match self.fs.metadata(root).await {
                Ok(stats) if stats.is_dir => {}
                Ok(_) => continue,
                Err(e) => {
                    if !e.is_not_found() {
                        log::warn!("Skipping discovery root {}: {}", root.display(), e);
                    }
                    continue;
                }
            }

            self.consider(root, &mut seen, &mut found).await;

            let entries = match self.fs.read_dir(root).await {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("Cannot read discovery root {}: {}", root.display(), e);
                    continue;
                }
            };

            for entry in entries {
                if entry.is_dir && !entry.is_hidden() {
                    self.consider(&entry.path, &mut seen, &mut found).await;
                }
            }
        }

        log::info!("Discovered {} vaults", found.len());
        found
    }

    async fn consider(
        &self,
        path: &Path,
        seen: &mut HashSet<PathBuf>,
        found: &mut Vec<VaultConfig>,
    ) {
        if !validate_vault(self.fs.as_ref(), path).await.is_valid {
            return;
        }

        let absolute = self
            .fs
            .canonicalize(path)
            .await
            .unwrap_or_else(|_| path.to_path_buf());
        if !seen.insert(absolute.clone()) {
            return;
        }

        let name = absolute
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| absolute.display().to_string());

        log::debug!("Found vault '{}' at {}", name, absolute.display());
        found.push(VaultConfig::builder(name, absolute).valid(true).build_unchecked());
    }
}

impl Default for VaultDiscovery {
    fn default() -> Self {
        Self::new()
    }
}
