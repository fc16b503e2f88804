use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::error::StoreError;
use crate::naming::{join_path, split_path, validate_name};
use crate::types::{Blob, ContentEntry, EntryKind, WriteOutcome};

/// Path-addressed blob store with optimistic-concurrency version tokens.
///
/// Backends implement the four primitives. The composite operations
/// (`rename_blob`, `delete_tree`, `move_tree`) are built on them and run
/// strictly sequentially; none of them is atomic.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// List the entries at `path`.
    ///
    /// A directory lists its children, a file lists itself as a single entry,
    /// and a missing path lists nothing.
    async fn list_children(&self, path: &str) -> Result<Vec<ContentEntry>, StoreError>;

    /// Read a blob and its current version token. `None` if the path is missing.
    async fn read_blob(&self, path: &str) -> Result<Option<Blob>, StoreError>;

    /// Create or update a blob.
    ///
    /// Updating an existing path requires its current `sha`; a missing or stale
    /// token is rejected with `StoreError::Conflict`.
    async fn write_blob(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<WriteOutcome, StoreError>;

    /// Delete a blob. `sha` must be the token from the most recent read or list.
    async fn delete_blob(&self, path: &str, sha: &str, message: &str) -> Result<(), StoreError>;

    /// Read a blob as text. Missing paths read as the empty string.
    async fn read_text(&self, path: &str) -> Result<String, StoreError> {
        Ok(self
            .read_blob(path)
            .await?
            .map(|blob| String::from_utf8_lossy(&blob.content).into_owned())
            .unwrap_or_default())
    }

    /// Whether anything is stored at `path`.
    async fn exists(&self, path: &str) -> Result<bool, StoreError> {
        Ok(!self.list_children(path).await?.is_empty())
    }

    /// Every file below `path`, depth first.
    async fn list_files_recursive(&self, path: &str) -> Result<Vec<ContentEntry>, StoreError> {
        let mut files = Vec::new();
        for entry in self.list_children(path).await? {
            match entry.kind {
                EntryKind::File => files.push(entry),
                EntryKind::Dir => files.extend(self.list_files_recursive(&entry.path).await?),
            }
        }
        Ok(files)
    }

    /// Rename a blob within its directory by creating the new path and
    /// deleting the old one. Returns the new path.
    ///
    /// Fails without writing if anything already exists at the destination.
    /// If the old blob cannot be deleted after the copy was created, the copy
    /// is deleted once (best effort) and `StoreError::PartialFailure` is returned.
    #[instrument(skip(self), level = "debug")]
    async fn rename_blob(&self, old_path: &str, new_name: &str) -> Result<String, StoreError> {
        validate_name(new_name)?;
        let (parent, old_name) = split_path(old_path);
        if old_name == new_name {
            return Err(StoreError::InvalidName(format!(
                "'{}' is already named '{}'",
                old_path, new_name
            )));
        }
        let new_path = join_path(parent, new_name);

        let old = self
            .read_blob(old_path)
            .await?
            .ok_or_else(|| StoreError::NotFound(old_path.to_string()))?;

        if self.exists(&new_path).await? {
            return Err(StoreError::AlreadyExists(new_path));
        }

        let message = format!("Rename {} to {}", old_name, new_name);
        let created = self
            .write_blob(&new_path, &old.content, &message, None)
            .await?;

        if let Err(delete_err) = self.delete_blob(old_path, &old.sha, &message).await {
            warn!(
                "Rename {} -> {}: deleting old blob failed ({}), rolling back",
                old_path, new_path, delete_err
            );
            let rollback_message = format!("Roll back rename of {}", old_name);
            let detail = match self
                .delete_blob(&new_path, created.sha(), &rollback_message)
                .await
            {
                Ok(()) => format!(
                    "deleting {} failed ({}); the copy at {} was removed",
                    old_path, delete_err, new_path
                ),
                Err(rollback_err) => format!(
                    "deleting {} failed ({}); removing the copy at {} also failed ({}), both paths exist",
                    old_path, delete_err, new_path, rollback_err
                ),
            };
            return Err(StoreError::PartialFailure {
                operation: "rename".to_string(),
                detail,
            });
        }

        debug!("Renamed {} -> {}", old_path, new_path);
        Ok(new_path)
    }

    /// Delete everything under `path`, returning the number of blobs deleted.
    ///
    /// Every leaf is attempted even after a failure; if any delete failed the
    /// result is `StoreError::Incomplete`. A missing path deletes nothing.
    #[instrument(skip(self), level = "debug")]
    async fn delete_tree(&self, path: &str) -> Result<usize, StoreError> {
        let mut attempted = 0usize;
        let mut failed = 0usize;

        for child in self.list_children(path).await? {
            match child.kind {
                EntryKind::File => {
                    attempted += 1;
                    let Some(sha) = child.sha.as_deref() else {
                        warn!("No version token listed for {}, cannot delete", child.path);
                        failed += 1;
                        continue;
                    };
                    let message = format!("Delete file {}", child.name);
                    if let Err(e) = self.delete_blob(&child.path, sha, &message).await {
                        warn!("Failed to delete {}: {}", child.path, e);
                        failed += 1;
                    }
                }
                EntryKind::Dir => match self.delete_tree(&child.path).await {
                    Ok(deleted) => attempted += deleted,
                    Err(StoreError::Incomplete {
                        attempted: sub_attempted,
                        failed: sub_failed,
                        ..
                    }) => {
                        attempted += sub_attempted;
                        failed += sub_failed;
                    }
                    Err(e) => {
                        warn!("Failed to delete directory {}: {}", child.path, e);
                        attempted += 1;
                        failed += 1;
                    }
                },
            }
        }

        if failed > 0 {
            return Err(StoreError::Incomplete {
                path: path.to_string(),
                attempted,
                failed,
            });
        }

        debug!("Deleted {} blobs under {}", attempted, path);
        Ok(attempted)
    }

    /// Move a whole directory by copying every blob to `to` and then deleting
    /// `from`. Returns the number of blobs moved.
    ///
    /// Copies already written are removed (best effort) if a copy fails.
    #[instrument(skip(self), level = "debug")]
    async fn move_tree(&self, from: &str, to: &str) -> Result<usize, StoreError> {
        if self.exists(to).await? {
            return Err(StoreError::AlreadyExists(to.to_string()));
        }

        let files = self.list_files_recursive(from).await?;
        if files.is_empty() {
            return Err(StoreError::NotFound(from.to_string()));
        }

        let from_prefix = from.trim_matches('/');
        let mut written: Vec<(String, String)> = Vec::with_capacity(files.len());

        for file in &files {
            let relative = file
                .path
                .strip_prefix(from_prefix)
                .unwrap_or(&file.path)
                .trim_start_matches('/');
            let target = join_path(to, relative);
            let message = format!("Move {} to {}", file.path, target);

            let copied = match self.read_blob(&file.path).await {
                Ok(Some(blob)) => self.write_blob(&target, &blob.content, &message, None).await,
                Ok(None) => Err(StoreError::NotFound(file.path.clone())),
                Err(e) => Err(e),
            };

            match copied {
                Ok(outcome) => written.push((target, outcome.sha().to_string())),
                Err(e) => {
                    warn!("Copying {} failed ({}), removing {} copies", file.path, e, written.len());
                    for (path, sha) in &written {
                        if let Err(cleanup_err) = self
                            .delete_blob(path, sha, &format!("Roll back move to {}", to))
                            .await
                        {
                            warn!("Failed to remove copy {}: {}", path, cleanup_err);
                        }
                    }
                    return Err(e);
                }
            }
        }

        if let Err(e) = self.delete_tree(from).await {
            return Err(StoreError::PartialFailure {
                operation: "move".to_string(),
                detail: format!("copied {} to {} but removing the source failed: {}", from, to, e),
            });
        }

        debug!("Moved {} blobs from {} to {}", written.len(), from, to);
        Ok(written.len())
    }
}
