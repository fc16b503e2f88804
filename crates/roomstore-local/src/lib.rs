//! Local filesystem backend for room-finder.
//!
//! Serves the same `Rooms/...` layout from a directory on disk, typically a
//! checkout of the content repository. Version tokens are content hashes, so a
//! write or delete is rejected when the file changed since it was read.

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use roomstore_core::naming::join_path;
use roomstore_core::{
    content_sha, Blob, ContentEntry, ContentStore, EntryKind, StoreError, WriteOutcome,
};
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Content store rooted at a local directory.
#[derive(Debug, Clone)]
pub struct LocalContentStore {
    root: PathBuf,
}

impl LocalContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a store path onto the filesystem, refusing anything that would
    /// leave the root.
    fn resolve(&self, path: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(path.trim_matches('/'));
        let mut resolved = self.root.clone();
        for component in relative.components() {
            match component {
                Component::Normal(part) => resolved.push(part),
                Component::CurDir => {}
                _ => {
                    return Err(StoreError::InvalidName(format!(
                        "path '{}' escapes the content root",
                        path
                    )))
                }
            }
        }
        Ok(resolved)
    }

    async fn file_entry(&self, store_path: &str, full: &Path) -> Result<ContentEntry, StoreError> {
        let content = fs::read(full).await?;
        let name = full
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(ContentEntry {
            name,
            path: store_path.to_string(),
            kind: EntryKind::File,
            sha: Some(content_sha(&content)),
            size: content.len() as u64,
            download_url: None,
        })
    }

    /// Current content of a file, `None` if it does not exist or is a directory.
    async fn read_existing(&self, full: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::metadata(full).await {
            Ok(meta) if meta.is_file() => Ok(Some(fs::read(full).await?)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Remove empty directories from `start` upward, stopping at the root.
    async fn prune_empty_dirs(&self, start: Option<&Path>) {
        let mut current = start.map(Path::to_path_buf);
        while let Some(dir) = current {
            if dir == self.root || !dir.starts_with(&self.root) {
                break;
            }
            // remove_dir only succeeds on empty directories
            if fs::remove_dir(&dir).await.is_err() {
                break;
            }
            debug!("Removed empty directory {}", dir.display());
            current = dir.parent().map(Path::to_path_buf);
        }
    }
}

#[async_trait]
impl ContentStore for LocalContentStore {
    #[instrument(skip(self), level = "debug")]
    async fn list_children(&self, path: &str) -> Result<Vec<ContentEntry>, StoreError> {
        let full = self.resolve(path)?;
        let store_path = path.trim_matches('/');

        let meta = match fs::metadata(&full).await {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        if meta.is_file() {
            return Ok(vec![self.file_entry(store_path, &full).await?]);
        }

        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(&full).await?;
        while let Some(child) = read_dir.next_entry().await? {
            let name = child.file_name().to_string_lossy().into_owned();
            // Skip hidden files (.git, .DS_Store, ...)
            if name.starts_with('.') {
                continue;
            }

            let child_path = join_path(store_path, &name);
            let file_type = match child.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    warn!("Skipping {}: {}", child.path().display(), e);
                    continue;
                }
            };

            if file_type.is_dir() {
                entries.push(ContentEntry {
                    name,
                    path: child_path,
                    kind: EntryKind::Dir,
                    sha: None,
                    size: 0,
                    download_url: None,
                });
            } else {
                entries.push(self.file_entry(&child_path, &child.path()).await?);
            }
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    #[instrument(skip(self), level = "debug")]
    async fn read_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        let full = self.resolve(path)?;
        Ok(self.read_existing(&full).await?.map(|content| Blob {
            path: path.trim_matches('/').to_string(),
            sha: content_sha(&content),
            content,
        }))
    }

    #[instrument(skip(self, content), level = "debug", fields(data_len = content.len()))]
    async fn write_blob(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<WriteOutcome, StoreError> {
        let full = self.resolve(path)?;
        if full == self.root || fs::metadata(&full).await.map(|m| m.is_dir()).unwrap_or(false) {
            return Err(StoreError::Conflict(format!("{} is a directory", path)));
        }

        let existing = self.read_existing(&full).await?;
        if let Some(current) = &existing {
            if sha != Some(content_sha(current).as_str()) {
                return Err(StoreError::Conflict(format!(
                    "{} exists and the supplied version token is missing or stale",
                    path
                )));
            }
        }

        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, content).await?;

        debug!("{}: wrote {} bytes to {}", message, content.len(), full.display());
        let new_sha = content_sha(content);
        Ok(if existing.is_some() {
            WriteOutcome::Updated { sha: new_sha }
        } else {
            WriteOutcome::Created { sha: new_sha }
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_blob(&self, path: &str, sha: &str, message: &str) -> Result<(), StoreError> {
        let full = self.resolve(path)?;
        let current = self
            .read_existing(&full)
            .await?
            .ok_or_else(|| StoreError::NotFound(path.to_string()))?;

        if content_sha(&current) != sha {
            return Err(StoreError::Conflict(format!("{} changed since it was read", path)));
        }

        fs::remove_file(&full).await?;
        self.prune_empty_dirs(full.parent()).await;

        debug!("{}: removed {}", message, full.display());
        Ok(())
    }
}
