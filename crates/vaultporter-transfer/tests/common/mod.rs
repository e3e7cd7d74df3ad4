//! Shared fixtures for transfer integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::sync::Notify;
use vaultporter_transfer::prelude::*;

/// How a [`StubFs`] misbehaves
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fault {
    None,
    /// Writes half the content, then fails
    FailWrite,
    /// Writes altered content and reports success
    CorruptWrite,
    /// Refuses to delete this one path
    FailRemove(PathBuf),
    /// Refuses to delete anything inside this directory
    FailRemoveUnder(PathBuf),
    /// Deletes this one path, then reports failure
    RemoveThenFail(PathBuf),
    /// Cannot set timestamps
    FailSetTimes,
}

/// A real filesystem with an injectable fault and an optional gate that
/// holds every `read` until released
pub struct StubFs {
    inner: TokioFileSystem,
    fault: Fault,
    gate: Option<Gate>,
}

#[derive(Clone)]
pub struct Gate {
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

impl Gate {
    pub fn new() -> Self {
        Self {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Notify::new()),
        }
    }
}

impl StubFs {
    pub fn new(fault: Fault) -> Self {
        Self {
            inner: TokioFileSystem::new(),
            fault,
            gate: None,
        }
    }

    pub fn gated(gate: Gate) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(Fault::None)
        }
    }
}

#[async_trait]
impl FileSystem for StubFs {
    async fn read(&self, path: &Path) -> Result<Vec<u8>> {
        if let Some(gate) = &self.gate {
            gate.entered.notify_one();
            gate.release.notified().await;
        }
        self.inner.read(path).await
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        match self.fault {
            Fault::FailWrite => {
                self.inner
                    .write(path, &contents[..contents.len() / 2])
                    .await?;
                Err(Error::io(std::io::Error::other("disk full")))
            }
            Fault::CorruptWrite => {
                let mut corrupted = contents.to_vec();
                corrupted.extend_from_slice(b"\ncorrupted");
                self.inner.write(path, &corrupted).await
            }
            _ => self.inner.write(path, contents).await,
        }
    }

    async fn metadata(&self, path: &Path) -> Result<FileStats> {
        self.inner.metadata(path).await
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.inner.create_dir_all(path).await
    }

    async fn remove_file(&self, path: &Path) -> Result<()> {
        match &self.fault {
            Fault::FailRemove(refused) if refused == path => {
                Err(Error::io(std::io::Error::new(
                    std::io::ErrorKind::PermissionDenied,
                    "source is read-only",
                )))
            }
            Fault::FailRemoveUnder(dir) if path.starts_with(dir) => Err(Error::io(
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "backup dir is locked"),
            )),
            Fault::RemoveThenFail(flaky) if flaky == path => {
                self.inner.remove_file(path).await?;
                Err(Error::io(std::io::Error::other("connection reset")))
            }
            _ => self.inner.remove_file(path).await,
        }
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        self.inner.copy(from, to).await
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntryInfo>> {
        self.inner.read_dir(path).await
    }

    async fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path).await
    }

    async fn set_times(&self, path: &Path, stats: &FileStats) -> Result<()> {
        if self.fault == Fault::FailSetTimes {
            return Err(Error::io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "timestamps not supported",
            )));
        }
        self.inner.set_times(path, stats).await
    }

    async fn checksum(&self, path: &Path) -> Result<String> {
        self.inner.checksum(path).await
    }

    async fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        self.inner.canonicalize(path).await
    }
}

/// Two vaults and a backup dir inside one temp dir
pub struct TestVaults {
    pub temp: TempDir,
    pub source_root: PathBuf,
    pub target: VaultConfig,
}

impl TestVaults {
    pub fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let source_root = temp.path().join("work");
        let target_root = temp.path().join("archive");
        for root in [&source_root, &target_root] {
            std::fs::create_dir_all(root.join(".obsidian")).unwrap();
        }
        let target = VaultConfig::builder("Archive", &target_root)
            .valid(true)
            .build()
            .unwrap();
        Self {
            temp,
            source_root,
            target,
        }
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.temp.path().join("backups")
    }

    /// Write a file relative to the source vault
    pub fn source_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.source_root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Write a file relative to the target vault
    pub fn target_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.target.path.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn engine(&self) -> TransferEngine {
        TransferEngine::new(VaultRegistry::new()).with_backup_dir(self.backup_dir())
    }

    pub fn engine_with(&self, fs: Arc<dyn FileSystem>) -> TransferEngine {
        TransferEngine::new(VaultRegistry::with_fs(fs)).with_backup_dir(self.backup_dir())
    }

    /// Files left in the backup dir
    pub fn leftover_backups(&self) -> usize {
        std::fs::read_dir(self.backup_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}
