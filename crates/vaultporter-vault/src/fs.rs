//! Filesystem abstraction used by the registry and the transfer engine.
//!
//! Every primitive the engine needs goes through [`FileSystem`], so tests can
//! slow down, fail, or corrupt individual calls. [`TokioFileSystem`] is the
//! real implementation.

use async_trait::async_trait;
use filetime::FileTime;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tokio::fs;
use tokio::io::AsyncReadExt;
use vaultporter_core::{Error, Result};

/// Read buffer size for streaming checksums
const HASH_BUFFER_SIZE: usize = 64 * 1024;

/// Subset of file metadata the engine cares about
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    pub size: u64,
    pub is_dir: bool,
    pub is_file: bool,
    pub created: Option<SystemTime>,
    pub modified: Option<SystemTime>,
    pub accessed: Option<SystemTime>,
}

impl From<std::fs::Metadata> for FileStats {
    fn from(meta: std::fs::Metadata) -> Self {
        Self {
            size: meta.len(),
            is_dir: meta.is_dir(),
            is_file: meta.is_file(),
            created: meta.created().ok(),
            modified: meta.modified().ok(),
            accessed: meta.accessed().ok(),
        }
    }
}

/// A directory entry returned by [`FileSystem::read_dir`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntryInfo {
    pub path: PathBuf,
    pub name: String,
    pub is_dir: bool,
}

impl DirEntryInfo {
    /// Dot-prefixed names are hidden
    pub fn is_hidden(&self) -> bool {
        self.name.starts_with('.')
    }
}

/// Asynchronous filesystem primitives
#[async_trait]
pub trait FileSystem: Send + Sync {
    async fn read(&self, path: &Path) -> Result<Vec<u8>>;

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;

    async fn metadata(&self, path: &Path) -> Result<FileStats>;

    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Remove a file. A missing file counts as already removed.
    async fn remove_file(&self, path: &Path) -> Result<()>;

    async fn copy(&self, from: &Path, to: &Path) -> Result<u64>;

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>>;

    async fn exists(&self, path: &Path) -> bool;

    /// Apply accessed/modified times from `stats`
    async fn set_times(&self, path: &Path, stats: &FileStats) -> Result<()>;

    /// Hex SHA-256 of the file content, streamed from disk
    async fn checksum(&self, path: &Path) -> Result<String>;

    /// Absolute path with symlinks resolved
    async fn canonicalize(&self, path: &Path) -> Result<PathBuf>;
}

/// [`FileSystem`] backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for TokioFileSystem {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).await.map_err(Error::io)
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        fs::write(path, contents).await.map_err(Error::io)
    }

    async fn metadata(&self, path: &Path) -> Result<FileStats> {
        fs::metadata(path)
            .await
            .map(FileStats::from)
            .map_err(Error::io)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).await.map_err(Error::io)
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::io(e)),
        }
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        fs::copy(from, to).await.map_err(Error::io)
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>> {
        let mut entries = fs::read_dir(path).await.map_err(Error::io)?;
        let mut out = Vec::new();

        while let Some(entry) = entries.next_entry().await.map_err(Error::io)? {
            // file_type() does not follow symlinks, so linked directories
            // are reported as non-directories.
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            out.push(DirEntryInfo {
                path: entry.path(),
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir,
            });
        }

        Ok(out)
    }

    async fn exists(&self, path: &Path) -> bool {
        fs::try_exists(path).await.unwrap_or(false)
    }

    async fn set_times(&self, path: &Path, stats: &FileStats) -> Result<()> {
        let path = path.to_path_buf();
        let accessed = stats.accessed.or(stats.modified).map(FileTime::from_system_time);
        let modified = stats.modified.map(FileTime::from_system_time);

        let Some(modified) = modified else {
            return Err(Error::other("Source modification time unavailable"));
        };
        let accessed = accessed.unwrap_or(modified);

        tokio::task::spawn_blocking(move || filetime::set_file_times(&path, accessed, modified))
            .await
            .map_err(|e| Error::other(format!("set_times task failed: {}", e)))?
            .map_err(Error::io)
    }

    async fn checksum(&self, path: &Path) -> Result<String> {
        let mut file = fs::File::open(path).await.map_err(Error::io)?;
        let mut hasher = Sha256::new();
        let mut buf = vec![0u8; HASH_BUFFER_SIZE];

        loop {
            let n = file.read(&mut buf).await.map_err(Error::io)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }

        Ok(format!("{:x}", hasher.finalize()))
    }

    async fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        fs::canonicalize(path).await.map_err(Error::io)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let path = temp.path().join("note.md");

        fs.write(&path, b"hello").await.unwrap();
        assert_eq!(fs.read(&path).await.unwrap(), b"hello");
        assert!(fs.exists(&path).await);

        let stats = fs.metadata(&path).await.unwrap();
        assert_eq!(stats.size, 5);
        assert!(stats.is_file);
    }

    #[tokio::test]
    async fn test_remove_missing_file_is_ok() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        assert!(fs.remove_file(&temp.path().join("missing.md")).await.is_ok());
    }

    #[tokio::test]
    async fn test_checksum_matches_in_memory_digest() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let path = temp.path().join("big.bin");
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        fs.write(&path, &content).await.unwrap();

        let expected = format!("{:x}", Sha256::digest(&content));
        assert_eq!(fs.checksum(&path).await.unwrap(), expected);
    }

    #[tokio::test]
    async fn test_set_times_copies_mtime() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        let src = temp.path().join("src.md");
        let dst = temp.path().join("dst.md");
        fs.write(&src, b"a").await.unwrap();
        fs.write(&dst, b"a").await.unwrap();

        let old = SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000_000);
        filetime::set_file_mtime(&src, FileTime::from_system_time(old)).unwrap();

        let stats = fs.metadata(&src).await.unwrap();
        fs.set_times(&dst, &stats).await.unwrap();
        assert_eq!(fs.metadata(&dst).await.unwrap().modified, Some(old));
    }

    #[tokio::test]
    async fn test_read_dir_reports_hidden_and_dirs() {
        let temp = TempDir::new().unwrap();
        let fs = TokioFileSystem::new();
        fs.create_dir_all(&temp.path().join(".obsidian")).await.unwrap();
        fs.create_dir_all(&temp.path().join("Notes")).await.unwrap();
        fs.write(&temp.path().join("a.md"), b"").await.unwrap();

        let mut entries = fs.read_dir(temp.path()).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 3);
        assert!(entries[0].is_hidden() && entries[0].is_dir);
        assert!(!entries[2].is_dir);
    }
}
