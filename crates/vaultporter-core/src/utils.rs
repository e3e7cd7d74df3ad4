//! Shared utilities for operations across vaultporter crates.
//!
//! Provides helpers for:
//! - Serialization with consistent error handling
//! - Id generation
//! - Vault-rooted path handling and traversal checks
//! - Operation timing

use crate::{Error, Result};
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

/// Generic JSON serialization with consistent error handling
pub fn to_json_string<T: serde::Serialize + ?Sized>(data: &T, context: &str) -> Result<String> {
    serde_json::to_string_pretty(data).map_err(|e| {
        Error::config_error(format!("Failed to serialize {} as JSON: {}", context, e))
    })
}

/// Generate an id from the current millisecond timestamp (base 36) and a
/// random suffix. Unique enough for a single process creating ids at human
/// cadence; not a distributed id scheme.
pub fn generate_id() -> String {
    let millis = chrono::Utc::now().timestamp_millis().max(0) as u64;
    let random = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}", to_base36(millis), &random[..8])
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}

/// Normalize a vault-rooted path: forward slashes, a single leading `/`,
/// no trailing slash, no empty or `.` segments. The root is `/`.
pub fn normalize_vault_path(path: &str) -> String {
    let segments: Vec<&str> = path
        .split(['/', '\\'])
        .filter(|s| !s.is_empty() && *s != ".")
        .collect();
    format!("/{}", segments.join("/"))
}

/// Join a vault-rooted folder and a file name
pub fn join_vault_path(folder: &str, name: &str) -> String {
    let folder = normalize_vault_path(folder);
    if folder == "/" {
        normalize_vault_path(name)
    } else {
        normalize_vault_path(&format!("{}/{}", folder, name))
    }
}

/// Convert a path relative to `root` into vault-rooted form
pub fn to_vault_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let joined = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    Some(normalize_vault_path(&joined))
}

/// Resolve `.` and `..` segments without touching the filesystem.
///
/// `..` at the root is dropped. Two spellings of the same path normalize to
/// the same value as long as no symlinks are involved.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

/// Path validation helpers
pub struct PathValidator;

impl PathValidator {
    /// Resolve a vault-rooted (or relative) path against `vault_root`,
    /// refusing anything that would escape the root.
    ///
    /// The check is purely lexical so it works for paths that do not exist yet.
    pub fn validate_path_in_vault(vault_root: &Path, path: &Path) -> Result<PathBuf> {
        let mut normalized = PathBuf::new();
        let mut depth = 0usize;

        for component in path.components() {
            match component {
                Component::ParentDir => {
                    if depth == 0 {
                        return Err(Error::path_traversal(vault_root.join(path)));
                    }
                    normalized.pop();
                    depth -= 1;
                }
                Component::Normal(name) => {
                    normalized.push(name);
                    depth += 1;
                }
                // Vault-rooted paths start with `/`; it means the vault root.
                Component::RootDir | Component::CurDir => {}
                Component::Prefix(_) => {
                    return Err(Error::invalid_path(format!(
                        "Path must be relative to the vault: {}",
                        path.display()
                    )));
                }
            }
        }

        Ok(vault_root.join(normalized))
    }

    /// Resolve a vault-rooted string path
    pub fn resolve(vault_root: &Path, vault_path: &str) -> Result<PathBuf> {
        let normalized = normalize_vault_path(vault_path);
        Self::validate_path_in_vault(vault_root, Path::new(&normalized))
    }
}

/// Tracks an operation id and its elapsed time
pub struct OperationTimer {
    operation_id: String,
    start_time: Instant,
}

impl OperationTimer {
    /// Start timing a new operation with a fresh id
    pub fn new() -> Self {
        Self {
            operation_id: uuid::Uuid::new_v4().to_string(),
            start_time: Instant::now(),
        }
    }

    /// Get the operation ID
    pub fn operation_id(&self) -> &str {
        &self.operation_id
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.start_time.elapsed().as_millis() as u64
    }
}

impl Default for OperationTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_to_json_string() {
        let json = to_json_string(&vec!["a", "b"], "list").unwrap();
        assert!(json.contains("\"a\""));
    }

    #[test]
    fn test_generate_id_unique() {
        let ids: HashSet<String> = (0..1000).map(|_| generate_id()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(ids.iter().all(|id| id.contains('-')));
    }

    #[test]
    fn test_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
    }

    #[test]
    fn test_normalize_vault_path() {
        assert_eq!(normalize_vault_path(""), "/");
        assert_eq!(normalize_vault_path("/"), "/");
        assert_eq!(normalize_vault_path("Inbox/"), "/Inbox");
        assert_eq!(normalize_vault_path("//Notes/./Daily"), "/Notes/Daily");
        assert_eq!(normalize_vault_path("Notes\\Daily"), "/Notes/Daily");
    }

    #[test]
    fn test_join_vault_path() {
        assert_eq!(join_vault_path("/", "Draft.md"), "/Draft.md");
        assert_eq!(join_vault_path("/Inbox", "Draft.md"), "/Inbox/Draft.md");
        assert_eq!(join_vault_path("Inbox/", "Draft.md"), "/Inbox/Draft.md");
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/vaults/work/x/../Draft.md")),
            PathBuf::from("/vaults/work/Draft.md")
        );
        assert_eq!(
            normalize_path(Path::new("/vaults/./work/Draft.md")),
            PathBuf::from("/vaults/work/Draft.md")
        );
        assert_eq!(normalize_path(Path::new("/../a.md")), PathBuf::from("/a.md"));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_to_vault_path() {
        let root = Path::new("/vault");
        assert_eq!(
            to_vault_path(root, Path::new("/vault/Notes/Daily")).as_deref(),
            Some("/Notes/Daily")
        );
        assert_eq!(to_vault_path(root, root).as_deref(), Some("/"));
        assert!(to_vault_path(root, Path::new("/elsewhere")).is_none());
    }

    #[test]
    fn test_path_validator_valid() {
        let vault_root = PathBuf::from("/vault");
        let result = PathValidator::resolve(&vault_root, "/notes/file.md").unwrap();
        assert_eq!(result, PathBuf::from("/vault/notes/file.md"));

        let result =
            PathValidator::validate_path_in_vault(&vault_root, Path::new("a/../b.md")).unwrap();
        assert_eq!(result, PathBuf::from("/vault/b.md"));
    }

    #[test]
    fn test_path_validator_traversal() {
        let vault_root = PathBuf::from("/vault");
        let path = Path::new("../../../etc/passwd");
        let result = PathValidator::validate_path_in_vault(&vault_root, path);
        assert!(result.is_err());
    }

    #[test]
    fn test_operation_timer() {
        let timer = OperationTimer::new();
        assert!(!timer.operation_id().is_empty());
        assert!(timer.elapsed_ms() < 1000);
    }
}
