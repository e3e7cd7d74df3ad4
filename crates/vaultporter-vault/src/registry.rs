//! Vault registry: the in-memory index of known vaults, plus validation and
//! folder/name queries against a vault on disk.
//!
//! The index keeps insertion order so the shell can present vaults in the
//! order the user arranged them. Bulk loading replaces the whole index.

use crate::fs::{FileSystem, TokioFileSystem};
use indexmap::IndexMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::instrument;
use vaultporter_core::prelude::*;
use vaultporter_core::to_vault_path;
use walkdir::WalkDir;

/// Sub-folder of the marker folder that holds community plugins
pub const PLUGINS_FOLDER: &str = "plugins";

/// Files inside the marker folder that indicate a vault has been opened
pub const DATA_FILES: &[&str] = &[
    "app.json",
    "workspace.json",
    "core-plugins.json",
];

/// Upper bound on `name N.ext` candidates before falling back to a timestamp
pub const MAX_RENAME_ATTEMPTS: u32 = 10_000;

/// Check whether `path` is a vault.
///
/// Never fails: problems are reported through
/// [`VaultValidationResult::error`]. A directory is a vault iff it contains
/// the marker folder; plugins and data files are reported but optional, so
/// a freshly created vault still validates.
pub async fn validate_vault(fs: &dyn FileSystem, path: &Path) -> VaultValidationResult {
    let stats = match fs.metadata(path).await {
        Ok(stats) => stats,
        Err(e) if e.is_not_found() => {
            return VaultValidationResult::invalid(format!(
                "Path does not exist: {}",
                path.display()
            ));
        }
        Err(e) => {
            return VaultValidationResult::invalid(format!(
                "Cannot access {}: {}",
                path.display(),
                e
            ));
        }
    };

    if !stats.is_dir {
        return VaultValidationResult::invalid(format!(
            "Path is not a directory: {}",
            path.display()
        ));
    }

    let marker = path.join(VAULT_MARKER_FOLDER);
    let has_marker_folder = matches!(fs.metadata(&marker).await, Ok(m) if m.is_dir);
    if !has_marker_folder {
        return VaultValidationResult {
            error: Some(format!("Missing {} folder", VAULT_MARKER_FOLDER)),
            ..Default::default()
        };
    }

    let has_plugins_subfolder =
        matches!(fs.metadata(&marker.join(PLUGINS_FOLDER)).await, Ok(m) if m.is_dir);

    let mut has_data_file = false;
    for name in DATA_FILES {
        if fs.exists(&marker.join(name)).await {
            has_data_file = true;
            break;
        }
    }

    VaultValidationResult {
        is_valid: true,
        has_marker_folder,
        has_plugins_subfolder,
        has_data_file,
        error: None,
    }
}

/// Split a file name into stem and extension. Leading-dot names such as
/// `.gitignore` have no extension.
fn split_name(name: &str) -> (&str, Option<&str>) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], Some(&name[idx + 1..])),
        _ => (name, None),
    }
}

/// Registry of known vaults
pub struct VaultRegistry {
    vaults: Arc<RwLock<IndexMap<String, VaultConfig>>>,
    fs: Arc<dyn FileSystem>,
}

impl VaultRegistry {
    /// Create an empty registry backed by the real filesystem
    pub fn new() -> Self {
        Self::with_fs(Arc::new(TokioFileSystem::new()))
    }

    /// Create an empty registry using the given filesystem
    pub fn with_fs(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            vaults: Arc::new(RwLock::new(IndexMap::new())),
            fs,
        }
    }

    /// Create a registry pre-loaded from persisted settings
    pub fn from_settings(settings: &TransferSettings) -> Self {
        let index = settings
            .vaults
            .iter()
            .map(|v| (v.id.clone(), v.clone()))
            .collect();
        Self {
            vaults: Arc::new(RwLock::new(index)),
            fs: Arc::new(TokioFileSystem::new()),
        }
    }

    /// The filesystem this registry validates against
    pub fn fs(&self) -> Arc<dyn FileSystem> {
        Arc::clone(&self.fs)
    }

    /// Generate an id for a new vault
    pub fn generate_id() -> String {
        generate_id()
    }

    /// Validate a directory as a vault
    #[instrument(skip(self), fields(path = %path.display()), name = "registry_validate")]
    pub async fn validate(&self, path: &Path) -> VaultValidationResult {
        validate_vault(self.fs.as_ref(), path).await
    }

    /// Add a new vault
    pub async fn add(&self, vault: VaultConfig) -> Result<()> {
        let mut vaults = self.vaults.write().await;

        if vaults.contains_key(&vault.id) {
            return Err(Error::config_error(format!(
                "Vault id '{}' already exists",
                vault.id
            )));
        }

        if let Some(existing) = vaults.values().find(|v| v.path == vault.path) {
            return Err(Error::config_error(format!(
                "Vault '{}' is already registered at {}",
                existing.name,
                vault.path.display()
            )));
        }

        log::info!("Registered vault '{}' -> {}", vault.name, vault.path.display());
        vaults.insert(vault.id.clone(), vault);
        Ok(())
    }

    /// Merge `patch` into an existing vault; the id never changes
    pub async fn update(&self, id: &str, patch: VaultConfigPatch) -> Result<VaultConfig> {
        let mut vaults = self.vaults.write().await;
        let vault = vaults
            .get_mut(id)
            .ok_or_else(|| Error::not_found(format!("Vault '{}' not found", id)))?;
        vault.merge(patch);
        Ok(vault.clone())
    }

    /// Remove a vault, returning its configuration
    pub async fn remove(&self, id: &str) -> Result<VaultConfig> {
        let mut vaults = self.vaults.write().await;
        vaults
            .shift_remove(id)
            .ok_or_else(|| Error::not_found(format!("Vault '{}' not found", id)))
    }

    /// Get a vault by id
    pub async fn get(&self, id: &str) -> Result<VaultConfig> {
        let vaults = self.vaults.read().await;
        vaults
            .get(id)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("Vault '{}' not found", id)))
    }

    /// Find a vault by id or, failing that, by case-insensitive name
    pub async fn find(&self, id_or_name: &str) -> Option<VaultConfig> {
        let vaults = self.vaults.read().await;
        vaults.get(id_or_name).cloned().or_else(|| {
            vaults
                .values()
                .find(|v| v.name.eq_ignore_ascii_case(id_or_name))
                .cloned()
        })
    }

    /// List all vaults in display order
    pub async fn list(&self) -> Vec<VaultConfig> {
        self.vaults.read().await.values().cloned().collect()
    }

    /// Replace the whole index
    pub async fn load_all(&self, configs: Vec<VaultConfig>) {
        let mut vaults = self.vaults.write().await;
        *vaults = configs.into_iter().map(|v| (v.id.clone(), v)).collect();
    }

    /// Reorder the index to match `ids`. Unknown ids are rejected; vaults not
    /// mentioned keep their relative order after the listed ones.
    pub async fn reorder(&self, ids: &[String]) -> Result<()> {
        let mut vaults = self.vaults.write().await;

        if let Some(unknown) = ids.iter().find(|id| !vaults.contains_key(*id)) {
            return Err(Error::not_found(format!("Vault '{}' not found", unknown)));
        }

        let mut reordered = IndexMap::with_capacity(vaults.len());
        for id in ids {
            if let Some(vault) = vaults.shift_remove(id) {
                reordered.insert(id.clone(), vault);
            }
        }
        reordered.extend(vaults.drain(..));
        *vaults = reordered;
        Ok(())
    }

    /// Record that a vault was just used
    pub async fn touch(&self, id: &str) -> Result<()> {
        self.update(
            id,
            VaultConfigPatch {
                last_accessed: Some(chrono::Utc::now()),
                ..Default::default()
            },
        )
        .await
        .map(|_| ())
    }

    /// Re-validate every vault and refresh its cached `is_valid` flag.
    /// Returns how many flags changed.
    #[instrument(skip(self), name = "registry_revalidate")]
    pub async fn revalidate_all(&self) -> usize {
        let snapshot = self.list().await;
        let mut changed = 0;

        for vault in snapshot {
            let result = self.validate(&vault.path).await;
            if result.is_valid != vault.is_valid {
                if let Some(error) = &result.error {
                    log::warn!("Vault '{}' is no longer valid: {}", vault.name, error);
                }
                let patch = VaultConfigPatch {
                    is_valid: Some(result.is_valid),
                    ..Default::default()
                };
                if self.update(&vault.id, patch).await.is_ok() {
                    changed += 1;
                }
            }
        }

        changed
    }

    /// Number of registered vaults
    pub async fn len(&self) -> usize {
        self.vaults.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.vaults.read().await.is_empty()
    }

    /// Enumerate every non-hidden folder in the vault as vault-rooted paths,
    /// sorted, always including `/`.
    ///
    /// The walk reads the real filesystem on tokio's blocking pool. Symlinks
    /// are not followed. Unreadable sub-directories are logged and skipped.
    pub async fn list_folders(&self, vault: &VaultConfig) -> Vec<String> {
        let root = vault.path.clone();
        let name = vault.name.clone();

        match tokio::task::spawn_blocking(move || walk_folders(&root, &name)).await {
            Ok(folders) => folders,
            Err(e) => {
                log::error!("Folder walk for vault '{}' failed: {}", vault.name, e);
                vec!["/".to_string()]
            }
        }
    }

    /// Whether a vault-rooted path is occupied
    pub async fn file_exists_at(&self, vault: &VaultConfig, relative_path: &str) -> bool {
        match PathValidator::resolve(&vault.path, relative_path) {
            Ok(full) => self.fs.exists(&full).await,
            Err(_) => false,
        }
    }

    /// Return `relative_path` if free, otherwise the first free
    /// `stem N.ext` for N = 1, 2, ...
    ///
    /// Gives up after [`MAX_RENAME_ATTEMPTS`] and falls back to a
    /// millisecond-timestamp suffix.
    pub async fn next_available_name(&self, vault: &VaultConfig, relative_path: &str) -> String {
        let normalized = normalize_vault_path(relative_path);
        if !self.file_exists_at(vault, &normalized).await {
            return normalized;
        }

        let (folder, name) = match normalized.rfind('/') {
            Some(idx) => (&normalized[..idx], &normalized[idx + 1..]),
            None => ("", normalized.as_str()),
        };
        let (stem, ext) = split_name(name);
        let build = |suffix: &str| {
            let file = match ext {
                Some(ext) => format!("{} {}.{}", stem, suffix, ext),
                None => format!("{} {}", stem, suffix),
            };
            join_vault_path(folder, &file)
        };

        for counter in 1..=MAX_RENAME_ATTEMPTS {
            let candidate = build(&counter.to_string());
            if !self.file_exists_at(vault, &candidate).await {
                return candidate;
            }
        }

        log::warn!(
            "No free name for {} after {} attempts, using timestamp suffix",
            normalized,
            MAX_RENAME_ATTEMPTS
        );
        build(&chrono::Utc::now().timestamp_millis().to_string())
    }
}

impl Default for VaultRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for VaultRegistry {
    fn clone(&self) -> Self {
        Self {
            vaults: self.vaults.clone(),
            fs: self.fs.clone(),
        }
    }
}

fn walk_folders(root: &Path, vault_name: &str) -> Vec<String> {
    let mut folders = vec!["/".to_string()];

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| !e.file_name().to_string_lossy().starts_with('.'));

    for entry in walker {
        match entry {
            Ok(entry) if entry.file_type().is_dir() => {
                if let Some(vault_path) = to_vault_path(root, entry.path()) {
                    folders.push(vault_path);
                }
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("Skipping unreadable folder in vault '{}': {}", vault_name, e);
            }
        }
    }

    folders.sort();
    folders.dedup();
    folders
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn create_test_vault(name: &str) -> VaultConfig {
        VaultConfig::builder(name, PathBuf::from(format!("/tmp/{}", name)))
            .id(name)
            .build_unchecked()
    }

    fn make_vault_dir(temp: &TempDir) -> VaultConfig {
        std::fs::create_dir_all(temp.path().join(".obsidian")).unwrap();
        VaultConfig::builder("test", temp.path()).valid(true).build_unchecked()
    }

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("Draft.md"), ("Draft", Some("md")));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", Some("gz")));
        assert_eq!(split_name(".gitignore"), (".gitignore", None));
        assert_eq!(split_name("README"), ("README", None));
    }

    #[tokio::test]
    async fn test_validate_missing_path() {
        let registry = VaultRegistry::new();
        let result = registry.validate(Path::new("/definitely/not/here")).await;
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("does not exist"));
    }

    #[tokio::test]
    async fn test_validate_file_is_not_vault() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("note.md");
        std::fs::write(&file, "x").unwrap();

        let result = VaultRegistry::new().validate(&file).await;
        assert!(!result.is_valid);
        assert!(result.error.unwrap().contains("not a directory"));
    }

    #[tokio::test]
    async fn test_validate_empty_marker_is_valid() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join(".obsidian")).unwrap();

        let result = VaultRegistry::new().validate(temp.path()).await;
        assert!(result.is_valid);
        assert!(result.has_marker_folder);
        assert!(!result.has_plugins_subfolder);
        assert!(!result.has_data_file);
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_validate_full_vault() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".obsidian/plugins")).unwrap();
        std::fs::write(temp.path().join(".obsidian/app.json"), "{}").unwrap();

        let result = VaultRegistry::new().validate(temp.path()).await;
        assert!(result.is_valid && result.has_plugins_subfolder && result.has_data_file);
    }

    #[tokio::test]
    async fn test_validate_without_marker() {
        let temp = TempDir::new().unwrap();
        let result = VaultRegistry::new().validate(temp.path()).await;
        assert!(!result.is_valid);
        assert!(!result.has_marker_folder);
    }

    #[tokio::test]
    async fn test_crud() {
        let registry = VaultRegistry::new();
        registry.add(create_test_vault("a")).await.unwrap();
        registry.add(create_test_vault("b")).await.unwrap();
        assert_eq!(registry.len().await, 2);

        assert!(registry.add(create_test_vault("a")).await.is_err());

        let updated = registry
            .update(
                "a",
                VaultConfigPatch {
                    name: Some("Alpha".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.id, "a");
        assert_eq!(registry.get("a").await.unwrap().name, "Alpha");
        assert_eq!(registry.find("alpha").await.unwrap().id, "a");

        registry.remove("a").await.unwrap();
        assert!(registry.get("a").await.is_err());
        assert!(registry.remove("a").await.is_err());
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate_path() {
        let registry = VaultRegistry::new();
        registry.add(create_test_vault("a")).await.unwrap();
        let mut dup = create_test_vault("a");
        dup.id = "other".into();
        assert!(registry.add(dup).await.is_err());
    }

    #[tokio::test]
    async fn test_load_all_replaces_and_reorder() {
        let registry = VaultRegistry::new();
        registry.add(create_test_vault("old")).await.unwrap();

        registry
            .load_all(vec![
                create_test_vault("a"),
                create_test_vault("b"),
                create_test_vault("c"),
            ])
            .await;
        assert!(registry.get("old").await.is_err());

        registry.reorder(&["c".into(), "a".into()]).await.unwrap();
        let order: Vec<String> = registry.list().await.into_iter().map(|v| v.id).collect();
        assert_eq!(order, vec!["c", "a", "b"]);

        assert!(registry.reorder(&["ghost".into()]).await.is_err());
    }

    #[tokio::test]
    async fn test_touch_sets_last_accessed() {
        let registry = VaultRegistry::new();
        registry.add(create_test_vault("a")).await.unwrap();
        registry.touch("a").await.unwrap();
        assert!(registry.get("a").await.unwrap().last_accessed.is_some());
    }

    #[tokio::test]
    async fn test_revalidate_all() {
        let temp = TempDir::new().unwrap();
        let registry = VaultRegistry::new();
        let mut vault = make_vault_dir(&temp);
        vault.is_valid = false;
        let id = vault.id.clone();
        registry.add(vault).await.unwrap();

        assert_eq!(registry.revalidate_all().await, 1);
        assert!(registry.get(&id).await.unwrap().is_valid);
        assert_eq!(registry.revalidate_all().await, 0);
    }

    #[tokio::test]
    async fn test_list_folders() {
        let temp = TempDir::new().unwrap();
        let vault = make_vault_dir(&temp);
        std::fs::create_dir_all(temp.path().join("Notes/Daily")).unwrap();
        std::fs::create_dir_all(temp.path().join("Archive")).unwrap();
        std::fs::create_dir_all(temp.path().join(".trash/old")).unwrap();
        std::fs::write(temp.path().join("Notes/a.md"), "a").unwrap();

        let folders = VaultRegistry::new().list_folders(&vault).await;
        assert_eq!(folders, vec!["/", "/Archive", "/Notes", "/Notes/Daily"]);
    }

    #[tokio::test]
    async fn test_list_folders_missing_root_still_has_root() {
        let vault = create_test_vault("does-not-exist-anywhere");
        let folders = VaultRegistry::new().list_folders(&vault).await;
        assert_eq!(folders, vec!["/"]);
    }

    #[tokio::test]
    async fn test_file_exists_at() {
        let temp = TempDir::new().unwrap();
        let vault = make_vault_dir(&temp);
        std::fs::create_dir_all(temp.path().join("Inbox")).unwrap();
        std::fs::write(temp.path().join("Inbox/Draft.md"), "x").unwrap();

        let registry = VaultRegistry::new();
        assert!(registry.file_exists_at(&vault, "/Inbox/Draft.md").await);
        assert!(!registry.file_exists_at(&vault, "/Inbox/Other.md").await);
        assert!(!registry.file_exists_at(&vault, "/../etc/passwd").await);
    }

    #[tokio::test]
    async fn test_next_available_name() {
        let temp = TempDir::new().unwrap();
        let vault = make_vault_dir(&temp);
        std::fs::create_dir_all(temp.path().join("Inbox")).unwrap();
        let registry = VaultRegistry::new();

        assert_eq!(
            registry.next_available_name(&vault, "/Inbox/Draft.md").await,
            "/Inbox/Draft.md"
        );

        std::fs::write(temp.path().join("Inbox/Draft.md"), "x").unwrap();
        std::fs::write(temp.path().join("Inbox/Draft 1.md"), "x").unwrap();
        let next = registry.next_available_name(&vault, "/Inbox/Draft.md").await;
        assert_eq!(next, "/Inbox/Draft 2.md");

        // Already unique: unchanged
        assert_eq!(registry.next_available_name(&vault, &next).await, next);
    }

    #[tokio::test]
    async fn test_next_available_name_without_extension() {
        let temp = TempDir::new().unwrap();
        let vault = make_vault_dir(&temp);
        std::fs::write(temp.path().join("README"), "x").unwrap();

        let next = VaultRegistry::new().next_available_name(&vault, "README").await;
        assert_eq!(next, "/README 1");
    }

    #[tokio::test]
    async fn test_from_settings() {
        let mut settings = TransferSettings::new();
        settings.vaults.push(create_test_vault("a"));
        let registry = VaultRegistry::from_settings(&settings);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_clone_shares_index() {
        let registry = VaultRegistry::new();
        let clone = registry.clone();
        registry.add(create_test_vault("a")).await.unwrap();
        assert_eq!(clone.len().await, 1);
    }
}
