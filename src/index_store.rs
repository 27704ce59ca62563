//! File-backed [`IndexStore`]: one `<owner-key>.jvi` artifact per owner.
//!
//! Saves write a uniquely named temp file in the index directory, `fsync`
//! it, and rename it over the target. Rename is atomic on the same
//! filesystem, so a reader opens either the previous artifact or the new
//! one and never a partial write, even with several `jrnl` processes
//! saving at once.
//!
//! Owner ids made only of ASCII letters, digits, and `_` are used as the
//! file stem directly. Anything else is replaced by a SHA-256 digest so
//! owner strings can never escape the index directory.

use anyhow::anyhow;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use journal_harness_core::error::{EngineError, Result};
use journal_harness_core::index::VectorIndex;
use journal_harness_core::store::IndexStore;

const EXTENSION: &str = "jvi";
const MAX_PLAIN_KEY: usize = 64;

pub struct FileIndexStore {
    dir: PathBuf,
}

impl FileIndexStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, owner: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", owner_key(owner), EXTENSION))
    }
}

/// File stem for `owner`.
pub fn owner_key(owner: &str) -> String {
    let plain = !owner.is_empty()
        && owner.len() <= MAX_PLAIN_KEY
        && owner.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        return owner.to_string();
    }
    let digest = Sha256::digest(owner.as_bytes());
    let hex: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    format!("sha256-{}", hex)
}

fn io_error(action: &str, path: &Path, err: std::io::Error) -> EngineError {
    EngineError::Storage(anyhow!("Failed to {} {}: {}", action, path.display(), err))
}

/// Write `bytes` to a temp file unique to this call, `fsync` it, and
/// rename it over `path`. Concurrent writers (in this process or another)
/// each rename a complete file; the last rename wins.
fn write_replace(dir: &Path, path: &Path, bytes: &[u8]) -> Result<()> {
    let mut tmp = tempfile::Builder::new()
        .prefix(".jvi-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| io_error("create temp file in", dir, e))?;
    tmp.write_all(bytes)
        .map_err(|e| io_error("write", tmp.path(), e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| io_error("sync", tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| io_error("replace", path, e.error))?;
    Ok(())
}

#[async_trait]
impl IndexStore for FileIndexStore {
    async fn load(&self, owner: &str) -> Result<Option<VectorIndex>> {
        let path = self.path_for(owner);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(io_error("read", &path, e)),
        };

        let index = VectorIndex::from_bytes(&bytes)?;
        if index.owner() != owner {
            return Err(EngineError::IndexCorrupt(format!(
                "{} holds the index of another owner",
                path.display()
            )));
        }
        Ok(Some(index))
    }

    async fn save(&self, owner: &str, index: &VectorIndex) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error("create", &self.dir, e))?;

        let dir = self.dir.clone();
        let path = self.path_for(owner);
        let bytes = index.to_bytes();
        let len = bytes.len();

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_replace(&dir, &target, &bytes))
            .await
            .map_err(|e| EngineError::Storage(anyhow!("index write task failed: {}", e)))??;

        tracing::debug!(owner, path = %path.display(), bytes = len, "saved vector index");
        Ok(())
    }

    async fn delete(&self, owner: &str) -> Result<()> {
        let path = self.path_for(owner);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("delete", &path, e)),
        }
    }
}
