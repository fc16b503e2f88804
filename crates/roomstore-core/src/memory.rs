use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, instrument};

use crate::error::StoreError;
use crate::naming::{join_path, split_path};
use crate::store::ContentStore;
use crate::token::content_sha;
use crate::types::{Blob, ContentEntry, EntryKind, WriteOutcome};

#[derive(Debug, Clone)]
struct StoredBlob {
    content: Vec<u8>,
    sha: String,
}

/// In-process content store.
///
/// Keeps blobs in a flat path -> content map; directories exist implicitly
/// while they contain at least one blob, as in a git tree.
#[derive(Debug, Default)]
pub struct MemoryContentStore {
    blobs: DashMap<String, StoredBlob>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    fn normalize(path: &str) -> String {
        path.trim_matches('/').to_string()
    }

    fn file_entry(path: &str, blob: &StoredBlob) -> ContentEntry {
        let (_, name) = split_path(path);
        ContentEntry {
            name: name.to_string(),
            path: path.to_string(),
            kind: EntryKind::File,
            sha: Some(blob.sha.clone()),
            size: blob.content.len() as u64,
            download_url: None,
        }
    }

    fn is_directory(&self, path: &str) -> bool {
        let prefix = format!("{}/", path);
        self.blobs.iter().any(|e| e.key().starts_with(&prefix))
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn list_children(&self, path: &str) -> Result<Vec<ContentEntry>, StoreError> {
        let path = Self::normalize(path);

        if let Some(blob) = self.blobs.get(&path) {
            return Ok(vec![Self::file_entry(&path, blob.value())]);
        }

        let prefix = if path.is_empty() {
            String::new()
        } else {
            format!("{}/", path)
        };

        let mut children: BTreeMap<String, ContentEntry> = BTreeMap::new();
        for entry in self.blobs.iter() {
            let Some(rest) = entry.key().strip_prefix(&prefix) else {
                continue;
            };
            match rest.split_once('/') {
                Some((dir, _)) => {
                    children.entry(dir.to_string()).or_insert_with(|| ContentEntry {
                        name: dir.to_string(),
                        path: join_path(&path, dir),
                        kind: EntryKind::Dir,
                        sha: None,
                        size: 0,
                        download_url: None,
                    });
                }
                None => {
                    children.insert(rest.to_string(), Self::file_entry(entry.key(), entry.value()));
                }
            }
        }

        Ok(children.into_values().collect())
    }

    async fn read_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        let path = Self::normalize(path);
        Ok(self.blobs.get(&path).map(|blob| Blob {
            path: path.clone(),
            sha: blob.sha.clone(),
            content: blob.content.clone(),
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
        let path = Self::normalize(path);
        if path.is_empty() || self.is_directory(&path) {
            return Err(StoreError::Conflict(format!("{} is a directory", path)));
        }

        let new_sha = content_sha(content);
        let stored = StoredBlob {
            content: content.to_vec(),
            sha: new_sha.clone(),
        };

        let outcome = match self.blobs.entry(path.clone()) {
            Entry::Occupied(mut existing) => {
                if sha != Some(existing.get().sha.as_str()) {
                    return Err(StoreError::Conflict(format!(
                        "{} exists and the supplied version token is missing or stale",
                        path
                    )));
                }
                existing.insert(stored);
                WriteOutcome::Updated { sha: new_sha }
            }
            Entry::Vacant(slot) => {
                slot.insert(stored);
                WriteOutcome::Created { sha: new_sha }
            }
        };

        debug!("{}: {}", message, path);
        Ok(outcome)
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_blob(&self, path: &str, sha: &str, message: &str) -> Result<(), StoreError> {
        let path = Self::normalize(path);
        match self.blobs.entry(path.clone()) {
            Entry::Occupied(existing) => {
                if existing.get().sha != sha {
                    return Err(StoreError::Conflict(format!(
                        "{} changed since it was read",
                        path
                    )));
                }
                existing.remove();
                debug!("{}: {}", message, path);
                Ok(())
            }
            Entry::Vacant(_) => Err(StoreError::NotFound(path)),
        }
    }
}
