//! `ContentStore` backed by a GitHub repository.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use roomstore_core::{Blob, ContentEntry, ContentStore, EntryKind, StoreError, WriteOutcome};
use tracing::{debug, instrument};

use crate::client::{ContentItem, Contents, GitHubClient};
use crate::config::GitHubConfig;

/// GitHub repository as a room content store.
///
/// Every call is a single Contents API request (retried on 429/5xx).
pub struct GitHubContentStore {
    client: GitHubClient,
}

impl GitHubContentStore {
    pub fn new(config: GitHubConfig) -> Result<Self, StoreError> {
        Ok(Self {
            client: GitHubClient::new(config)?,
        })
    }

    pub fn client(&self) -> &GitHubClient {
        &self.client
    }

    fn to_entry(item: ContentItem) -> Option<ContentEntry> {
        let kind = match item.item_type.as_str() {
            "dir" => EntryKind::Dir,
            "file" | "symlink" => EntryKind::File,
            other => {
                debug!("Skipping {} entry {}", other, item.path);
                return None;
            }
        };
        Some(ContentEntry {
            name: item.name,
            path: item.path,
            sha: match kind {
                EntryKind::File => Some(item.sha),
                EntryKind::Dir => None,
            },
            size: item.size,
            kind,
            download_url: item.download_url,
        })
    }
}

/// Decode a Contents API base64 payload (GitHub wraps it at 60 columns).
pub fn decode_content(encoded: &str) -> Result<Vec<u8>, StoreError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| StoreError::Decode(format!("Invalid base64 content: {}", e)))
}

#[async_trait]
impl ContentStore for GitHubContentStore {
    #[instrument(skip(self), level = "debug")]
    async fn list_children(&self, path: &str) -> Result<Vec<ContentEntry>, StoreError> {
        let entries = match self.client.get_contents(path).await? {
            None => Vec::new(),
            Some(Contents::Dir(items)) => items.into_iter().filter_map(Self::to_entry).collect(),
            Some(Contents::File(item)) => Self::to_entry(*item).into_iter().collect(),
        };
        debug!("Listed {} entries at {}", entries.len(), path);
        Ok(entries)
    }

    #[instrument(skip(self), level = "debug")]
    async fn read_blob(&self, path: &str) -> Result<Option<Blob>, StoreError> {
        let item = match self.client.get_contents(path).await? {
            Some(Contents::File(item)) => *item,
            Some(Contents::Dir(_)) | None => return Ok(None),
        };

        let inline = item
            .content
            .as_deref()
            .filter(|c| !c.trim().is_empty() && item.encoding.as_deref() != Some("none"));

        let content = match (inline, item.download_url.as_deref()) {
            (Some(encoded), _) => decode_content(encoded)?,
            // Above the inline size limit the payload is omitted.
            (None, Some(url)) if item.size > 0 => self.client.download_raw(url).await?,
            _ => Vec::new(),
        };

        Ok(Some(Blob {
            path: item.path,
            sha: item.sha,
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
        let result = self
            .client
            .put_contents(path, STANDARD.encode(content), message, sha)
            .await?;

        Ok(if result.created {
            WriteOutcome::Created { sha: result.sha }
        } else {
            WriteOutcome::Updated { sha: result.sha }
        })
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete_blob(&self, path: &str, sha: &str, message: &str) -> Result<(), StoreError> {
        self.client.delete_contents(path, sha, message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_content_strips_line_breaks() {
        assert_eq!(decode_content("aGVs\nbG8=\n").unwrap(), b"hello".to_vec());
        assert_eq!(decode_content("").unwrap(), Vec::<u8>::new());
        assert!(decode_content("***").is_err());
    }

    #[test]
    fn test_to_entry_skips_submodules() {
        let item = ContentItem {
            name: "vendor".into(),
            path: "vendor".into(),
            sha: "s".into(),
            item_type: "submodule".into(),
            size: 0,
            content: None,
            encoding: None,
            download_url: None,
        };
        assert!(GitHubContentStore::to_entry(item).is_none());
    }
}
