//! Room-level operations over a `ContentStore`.
//!
//! Layout under the base path:
//! ```text
//! <base>/<room>/info.txt
//! <base>/<room>/<ordinal>.<ext>
//! <base>/<room>/<subfolder>/info.txt
//! <base>/<room>/<subfolder>/thumbnail.jpg
//! <base>/<room>/<subfolder>/<ordinal>.<ext>
//! ```

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use crate::error::StoreError;
use crate::naming::{
    allocate_next_ordinal, extension_for_content_type, is_reserved, join_path, validate_name,
    OrdinalScheme, INFO_FILE, THUMBNAIL_FILE,
};
use crate::store::ContentStore;
use crate::types::{ContentEntry, RoomView, SubfolderView, WriteOutcome};

/// Rooms, subfolders and media files stored below a base path.
pub struct RoomCatalog {
    store: Arc<dyn ContentStore>,
    base_path: String,
    scheme: OrdinalScheme,
}

impl RoomCatalog {
    pub fn new(store: Arc<dyn ContentStore>, base_path: impl Into<String>, scheme: OrdinalScheme) -> Self {
        Self {
            store,
            base_path: base_path.into().trim_matches('/').to_string(),
            scheme,
        }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub fn scheme(&self) -> OrdinalScheme {
        self.scheme
    }

    pub fn room_path(&self, room: &str) -> String {
        join_path(&self.base_path, room)
    }

    /// Path of a room, or of one of its subfolders.
    pub fn container_path(&self, room: &str, subfolder: Option<&str>) -> String {
        let room_path = self.room_path(room);
        match subfolder {
            Some(sub) => join_path(&room_path, sub),
            None => room_path,
        }
    }

    async fn ensure_exists(&self, path: &str) -> Result<(), StoreError> {
        if self.store.exists(path).await? {
            Ok(())
        } else {
            Err(StoreError::NotFound(path.to_string()))
        }
    }

    /// Names of all rooms. Listing failures degrade to an empty list.
    #[instrument(skip(self), level = "debug")]
    pub async fn list_rooms(&self) -> Vec<String> {
        match self.store.list_children(&self.base_path).await {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| e.is_dir())
                .map(|e| e.name)
                .collect(),
            Err(e) => {
                warn!("Failed to list rooms under {}: {}", self.base_path, e);
                Vec::new()
            }
        }
    }

    /// Rooms whose name contains `term`, ignoring case.
    pub async fn search_rooms(&self, term: &str) -> Vec<String> {
        let term = term.trim().to_lowercase();
        self.list_rooms()
            .await
            .into_iter()
            .filter(|room| room.to_lowercase().contains(&term))
            .collect()
    }

    /// Create a room holding an empty `info.txt`.
    #[instrument(skip(self), level = "debug")]
    pub async fn create_room(&self, name: &str) -> Result<(), StoreError> {
        validate_name(name)?;
        let room_path = self.room_path(name);
        if self.store.exists(&room_path).await? {
            return Err(StoreError::AlreadyExists(format!("Room {}", name)));
        }

        self.store
            .write_blob(
                &join_path(&room_path, INFO_FILE),
                b"",
                &format!("Create room {}", name),
                None,
            )
            .await?;

        info!("Created room {}", name);
        Ok(())
    }

    /// Description of a room; empty when it has none.
    pub async fn room_info(&self, room: &str) -> Result<String, StoreError> {
        self.store
            .read_text(&join_path(&self.room_path(room), INFO_FILE))
            .await
    }

    /// Description of a subfolder; empty when it has none.
    pub async fn subfolder_info(&self, room: &str, subfolder: &str) -> Result<String, StoreError> {
        self.store
            .read_text(&join_path(&self.container_path(room, Some(subfolder)), INFO_FILE))
            .await
    }

    /// Replace the `info.txt` of a room or subfolder.
    #[instrument(skip(self, text), level = "debug", fields(text_len = text.len()))]
    pub async fn update_info(
        &self,
        room: &str,
        subfolder: Option<&str>,
        text: &str,
    ) -> Result<WriteOutcome, StoreError> {
        let container = self.container_path(room, subfolder);
        self.ensure_exists(&container).await?;

        let info_path = join_path(&container, INFO_FILE);
        let current = self.store.read_blob(&info_path).await?;
        self.store
            .write_blob(
                &info_path,
                text.as_bytes(),
                "Update info.txt",
                current.as_ref().map(|blob| blob.sha.as_str()),
            )
            .await
    }

    /// Media files of a room or subfolder, reserved names excluded, sorted by name.
    pub async fn list_media(
        &self,
        room: &str,
        subfolder: Option<&str>,
    ) -> Result<Vec<ContentEntry>, StoreError> {
        let mut media: Vec<ContentEntry> = self
            .store
            .list_children(&self.container_path(room, subfolder))
            .await?
            .into_iter()
            .filter(|e| e.is_file() && !is_reserved(&e.name))
            .collect();
        media.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(media)
    }

    /// Subfolder names of a room.
    pub async fn list_subfolders(&self, room: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .store
            .list_children(&self.room_path(room))
            .await?
            .into_iter()
            .filter(|e| e.is_dir())
            .map(|e| e.name)
            .collect())
    }

    /// Everything shown for a room: description, media and subfolders.
    #[instrument(skip(self), level = "debug")]
    pub async fn room_view(&self, room: &str) -> Result<RoomView, StoreError> {
        let room_path = self.room_path(room);
        let entries = self.store.list_children(&room_path).await?;
        if entries.is_empty() {
            return Err(StoreError::NotFound(format!("Room {}", room)));
        }

        let mut media = Vec::new();
        let mut subfolder_names = Vec::new();
        for entry in entries {
            if entry.is_dir() {
                subfolder_names.push(entry.name);
            } else if !is_reserved(&entry.name) {
                media.push(entry);
            }
        }
        media.sort_by(|a, b| a.name.cmp(&b.name));

        let mut subfolders = Vec::with_capacity(subfolder_names.len());
        for name in subfolder_names {
            let sub_entries = self
                .store
                .list_children(&join_path(&room_path, &name))
                .await?;
            let thumbnail = sub_entries
                .iter()
                .find(|e| e.is_file() && e.name == THUMBNAIL_FILE)
                .cloned();
            let mut sub_media: Vec<ContentEntry> = sub_entries
                .into_iter()
                .filter(|e| e.is_file() && !is_reserved(&e.name))
                .collect();
            sub_media.sort_by(|a, b| a.name.cmp(&b.name));

            subfolders.push(SubfolderView {
                info: self.subfolder_info(room, &name).await?,
                name,
                thumbnail,
                media: sub_media,
            });
        }

        Ok(RoomView {
            name: room.to_string(),
            info: self.room_info(room).await?,
            media,
            subfolders,
        })
    }

    /// Create a subfolder with its description and thumbnail.
    #[instrument(skip(self, info, thumbnail), level = "debug", fields(thumbnail_len = thumbnail.len()))]
    pub async fn create_subfolder(
        &self,
        room: &str,
        name: &str,
        info: &str,
        thumbnail: &[u8],
    ) -> Result<(), StoreError> {
        validate_name(name)?;
        if is_reserved(name) {
            return Err(StoreError::InvalidName(format!("'{}' is reserved", name)));
        }
        self.ensure_exists(&self.room_path(room)).await?;

        let sub_path = self.container_path(room, Some(name));
        if self.store.exists(&sub_path).await? {
            return Err(StoreError::AlreadyExists(format!("Subfolder {}/{}", room, name)));
        }

        let info_path = join_path(&sub_path, INFO_FILE);
        let created = self
            .store
            .write_blob(
                &info_path,
                info.as_bytes(),
                &format!("Create subfolder {} in {}", name, room),
                None,
            )
            .await?;

        // A subfolder without its thumbnail must not be left behind.
        if let Err(thumb_err) = self
            .store
            .write_blob(
                &join_path(&sub_path, THUMBNAIL_FILE),
                thumbnail,
                &format!("Add thumbnail for {}/{}", room, name),
                None,
            )
            .await
        {
            warn!(
                "Creating subfolder {}/{}: thumbnail write failed ({}), rolling back",
                room, name, thumb_err
            );
            let detail = match self
                .store
                .delete_blob(
                    &info_path,
                    created.sha(),
                    &format!("Roll back subfolder {} in {}", name, room),
                )
                .await
            {
                Ok(()) => format!(
                    "writing the thumbnail of {} failed ({}); the subfolder was removed",
                    sub_path, thumb_err
                ),
                Err(rollback_err) => format!(
                    "writing the thumbnail of {} failed ({}); removing {} also failed ({})",
                    sub_path, thumb_err, info_path, rollback_err
                ),
            };
            return Err(StoreError::PartialFailure {
                operation: "create subfolder".to_string(),
                detail,
            });
        }

        info!("Created subfolder {}/{}", room, name);
        Ok(())
    }

    /// Replace a subfolder's thumbnail.
    #[instrument(skip(self, thumbnail), level = "debug", fields(thumbnail_len = thumbnail.len()))]
    pub async fn replace_thumbnail(
        &self,
        room: &str,
        subfolder: &str,
        thumbnail: &[u8],
    ) -> Result<WriteOutcome, StoreError> {
        let sub_path = self.container_path(room, Some(subfolder));
        self.ensure_exists(&sub_path).await?;

        let thumb_path = join_path(&sub_path, THUMBNAIL_FILE);
        let current = self.store.read_blob(&thumb_path).await?;
        self.store
            .write_blob(
                &thumb_path,
                thumbnail,
                &format!("Update thumbnail for {}/{}", room, subfolder),
                current.as_ref().map(|blob| blob.sha.as_str()),
            )
            .await
    }

    /// Store a new media file under the next free ordinal. Returns its path.
    #[instrument(skip(self, data), level = "debug", fields(data_len = data.len()))]
    pub async fn upload_media(
        &self,
        room: &str,
        subfolder: Option<&str>,
        content_type: &str,
        data: &[u8],
    ) -> Result<String, StoreError> {
        let ext = extension_for_content_type(content_type);
        if ext.is_empty() {
            return Err(StoreError::InvalidName(format!(
                "cannot derive a file extension from '{}'",
                content_type
            )));
        }

        let container = self.container_path(room, subfolder);
        let existing = self.store.list_children(&container).await?;
        if existing.is_empty() {
            return Err(StoreError::NotFound(container));
        }

        let ordinal = allocate_next_ordinal(
            existing.iter().filter(|e| e.is_file()).map(|e| e.name.as_str()),
            self.scheme,
        );
        let file_name = format!("{}.{}", ordinal, ext);
        let file_path = join_path(&container, &file_name);

        self.store
            .write_blob(
                &file_path,
                data,
                &format!("Add file {} to {}", file_name, room),
                None,
            )
            .await?;

        debug!("Uploaded {} ({} bytes)", file_path, data.len());
        Ok(file_path)
    }

    /// Rename a media file. Reserved names can be neither source nor target.
    pub async fn rename_media(
        &self,
        room: &str,
        subfolder: Option<&str>,
        old_name: &str,
        new_name: &str,
    ) -> Result<String, StoreError> {
        validate_name(old_name)?;
        for name in [old_name, new_name] {
            if is_reserved(name) {
                return Err(StoreError::InvalidName(format!("'{}' is reserved", name)));
            }
        }
        let old_path = join_path(&self.container_path(room, subfolder), old_name);
        self.store.rename_blob(&old_path, new_name).await
    }

    pub async fn rename_room(&self, old_name: &str, new_name: &str) -> Result<usize, StoreError> {
        validate_name(new_name)?;
        self.store
            .move_tree(&self.room_path(old_name), &self.room_path(new_name))
            .await
    }

    pub async fn rename_subfolder(
        &self,
        room: &str,
        old_name: &str,
        new_name: &str,
    ) -> Result<usize, StoreError> {
        validate_name(new_name)?;
        if is_reserved(new_name) {
            return Err(StoreError::InvalidName(format!("'{}' is reserved", new_name)));
        }
        self.store
            .move_tree(
                &self.container_path(room, Some(old_name)),
                &self.container_path(room, Some(new_name)),
            )
            .await
    }

    /// Delete one media file, using the version token from the current listing.
    /// Reserved files cannot be deleted this way.
    #[instrument(skip(self), level = "debug")]
    pub async fn delete_media(
        &self,
        room: &str,
        subfolder: Option<&str>,
        name: &str,
    ) -> Result<(), StoreError> {
        validate_name(name)?;
        if is_reserved(name) {
            return Err(StoreError::InvalidName(format!("'{}' is reserved", name)));
        }
        let path = join_path(&self.container_path(room, subfolder), name);
        let entry = self
            .store
            .list_children(&path)
            .await?
            .into_iter()
            .find(|e| e.is_file() && e.path == path)
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        let sha = entry
            .sha
            .ok_or_else(|| StoreError::Decode(format!("no version token listed for {}", path)))?;

        self.store
            .delete_blob(&path, &sha, &format!("Delete file {}", name))
            .await
    }

    pub async fn delete_subfolder(&self, room: &str, subfolder: &str) -> Result<usize, StoreError> {
        validate_name(subfolder)?;
        self.store
            .delete_tree(&self.container_path(room, Some(subfolder)))
            .await
    }

    pub async fn delete_room(&self, room: &str) -> Result<usize, StoreError> {
        validate_name(room)?;
        let deleted = self.store.delete_tree(&self.room_path(room)).await?;
        info!("Deleted room {} ({} files)", room, deleted);
        Ok(deleted)
    }
}
