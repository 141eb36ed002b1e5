//! Save blob persistence
//!
//! The game keeps its whole save state in one opaque blob. The server never looks
//! inside it: `put` stores the bytes verbatim, `get` hands them back.

use async_trait::async_trait;
use hyper::body::Bytes;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::resolve::is_missing;

/// Single-slot blob store
#[async_trait]
pub trait SaveStore: Send + Sync {
    /// Replace the stored blob
    async fn put(&self, data: Bytes) -> io::Result<()>;

    /// Current blob, `None` if nothing was ever saved
    async fn get(&self) -> io::Result<Option<Bytes>>;
}

/// Distinguishes temp files of concurrent saves within one process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Blob stored in a single file
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Delete temp files left by saves that never reached their rename,
    /// e.g. after a crash. Must run before this process starts saving.
    pub async fn remove_orphans(&self) -> io::Result<usize> {
        let Some(file_name) = self.path.file_name() else {
            return Ok(0);
        };
        let prefix = format!(".{}.", file_name.to_string_lossy());
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));

        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if is_missing(&e) => return Ok(0),
            Err(e) => return Err(e),
        };

        let mut removed = 0;
        while let Some(entry) = entries.next_entry().await? {
            let is_orphan = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(&prefix) && n.ends_with(".tmp"));
            if is_orphan {
                match fs::remove_file(entry.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) if is_missing(&e) => {}
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(removed)
    }

    /// Sibling temp path, so the final rename never crosses filesystems
    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map_or_else(|| "save".into(), |n| n.to_string_lossy());
        let seq = TEMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        self.path
            .with_file_name(format!(".{file_name}.{}.{seq}.tmp", std::process::id()))
    }
}

#[async_trait]
impl SaveStore for FileStore {
    async fn put(&self, data: Bytes) -> io::Result<()> {
        let temp_path = self.temp_path();

        let write = async {
            let mut file = fs::File::create(&temp_path).await?;
            file.write_all(&data).await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &self.path).await
        };

        if let Err(e) = write.await {
            // Leave no orphaned temp file behind
            let _ = fs::remove_file(&temp_path).await;
            return Err(e);
        }
        Ok(())
    }

    async fn get(&self) -> io::Result<Option<Bytes>> {
        match fs::read(&self.path).await {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if is_missing(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// In-memory store for router tests
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryStore {
    blob: std::sync::Mutex<Option<Bytes>>,
}

#[cfg(test)]
#[async_trait]
impl SaveStore for MemoryStore {
    async fn put(&self, data: Bytes) -> io::Result<()> {
        *self.blob.lock().unwrap() = Some(data);
        Ok(())
    }

    async fn get(&self) -> io::Result<Option<Bytes>> {
        Ok(self.blob.lock().unwrap().clone())
    }
}
