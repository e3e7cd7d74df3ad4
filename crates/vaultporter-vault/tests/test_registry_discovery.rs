//! Registry and discovery tests against real directory trees

use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vaultporter_vault::prelude::*;

fn make_vault(parent: &Path, name: &str) -> PathBuf {
    let path = parent.join(name);
    std::fs::create_dir_all(path.join(".obsidian/plugins")).unwrap();
    std::fs::write(path.join(".obsidian/workspace.json"), "{}").unwrap();
    path
}

// ==================== Discovery ====================

#[tokio::test]
async fn test_discovery_with_no_vaults() {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("Documents/notes")).unwrap();
    std::fs::create_dir_all(temp.path().join("Desktop")).unwrap();

    let discovery = VaultDiscovery::with_roots(vec![
        temp.path().join("Documents"),
        temp.path().join("Desktop"),
        temp.path().join("Dropbox"),
    ]);
    assert!(discovery.discover().await.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_discovery_skips_unreadable_root() {
    use std::os::unix::fs::PermissionsExt;

    let temp = TempDir::new().unwrap();
    let locked = temp.path().join("locked");
    make_vault(&locked, "Hidden");
    let open = temp.path().join("open");
    make_vault(&open, "Visible");

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o000)).unwrap();

    let discovery = VaultDiscovery::with_roots(vec![locked.clone(), open]);
    let found = discovery.discover().await;

    std::fs::set_permissions(&locked, std::fs::Permissions::from_mode(0o755)).unwrap();

    // Root may bypass permissions; only the readable vault is guaranteed
    assert!(found.iter().any(|v| v.name == "Visible"));
    assert!(found.iter().all(|v| v.is_valid));
}

#[tokio::test]
async fn test_discovered_vaults_register_cleanly() {
    let temp = TempDir::new().unwrap();
    make_vault(temp.path(), "Work");
    make_vault(temp.path(), "Personal");

    let registry = VaultRegistry::new();
    for vault in VaultDiscovery::with_roots(vec![temp.path().to_path_buf()])
        .discover()
        .await
    {
        registry.add(vault).await.unwrap();
    }

    assert_eq!(registry.len().await, 2);
    for vault in registry.list().await {
        assert!(vault.path.is_absolute());
        let result = registry.validate(&vault.path).await;
        assert!(result.is_valid && result.has_plugins_subfolder && result.has_data_file);
    }
}

// ==================== Registry ====================

#[tokio::test]
async fn test_registry_names_follow_disk_state() {
    let temp = TempDir::new().unwrap();
    let root = make_vault(temp.path(), "Work");
    std::fs::create_dir_all(root.join("Inbox")).unwrap();
    std::fs::write(root.join("Inbox/Draft.md"), "x").unwrap();

    let vault = VaultConfig::builder("Work", &root).build().unwrap();
    let registry = VaultRegistry::new();

    let first = registry.next_available_name(&vault, "/Inbox/Draft.md").await;
    assert_eq!(first, "/Inbox/Draft 1.md");
    assert!(!registry.file_exists_at(&vault, &first).await);

    std::fs::write(root.join("Inbox/Draft 1.md"), "x").unwrap();
    assert_eq!(
        registry.next_available_name(&vault, "/Inbox/Draft.md").await,
        "/Inbox/Draft 2.md"
    );

    let folders = registry.list_folders(&vault).await;
    assert_eq!(folders, vec!["/", "/Inbox"]);
}

#[cfg(unix)]
#[tokio::test]
async fn test_list_folders_does_not_follow_symlinks() {
    let temp = TempDir::new().unwrap();
    let root = make_vault(temp.path(), "Work");
    std::fs::create_dir_all(root.join("Notes")).unwrap();
    std::os::unix::fs::symlink(&root, root.join("Notes/loop")).unwrap();

    let vault = VaultConfig::builder("Work", &root).build().unwrap();
    let folders = VaultRegistry::new().list_folders(&vault).await;
    assert_eq!(folders, vec!["/", "/Notes"]);
}

#[tokio::test]
async fn test_settings_round_trip_through_registry() {
    let temp = TempDir::new().unwrap();
    let root = make_vault(temp.path(), "Work");
    let store = SettingsStore::in_dir(&temp.path().join("config")).await.unwrap();

    let mut settings = store.load().await.unwrap();
    settings
        .vaults
        .push(VaultConfig::builder("Work", &root).id("work").build().unwrap());
    store.save(&settings).await.unwrap();

    let registry = VaultRegistry::from_settings(&store.load().await.unwrap());
    assert_eq!(registry.get("work").await.unwrap().path, root);
}
