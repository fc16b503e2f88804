use serde::{Deserialize, Serialize};

/// Kind of an entry in a directory listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    File,
    Dir,
}

/// A file or directory entry from a content store listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentEntry {
    /// Last path segment
    pub name: String,
    /// Full path relative to the store root
    pub path: String,
    pub kind: EntryKind,
    /// Version token required to update or delete (files only)
    pub sha: Option<String>,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Direct download location, if the store exposes one
    pub download_url: Option<String>,
}

impl ContentEntry {
    pub fn is_file(&self) -> bool {
        self.kind == EntryKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Decoded blob content together with its current version token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    pub path: String,
    pub sha: String,
    pub content: Vec<u8>,
}

/// Result of a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Created { sha: String },
    Updated { sha: String },
}

impl WriteOutcome {
    /// Version token of the blob as written.
    pub fn sha(&self) -> &str {
        match self {
            WriteOutcome::Created { sha } | WriteOutcome::Updated { sha } => sha,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, WriteOutcome::Created { .. })
    }
}

/// How a media file should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a file by its extension.
    pub fn from_name(name: &str) -> Self {
        let ext = name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "mp4" | "mov" | "webm" => MediaKind::Video,
            _ => MediaKind::Image,
        }
    }
}

/// Aggregated content of one subfolder (access point).
#[derive(Debug, Clone, Serialize)]
pub struct SubfolderView {
    pub name: String,
    pub info: String,
    pub thumbnail: Option<ContentEntry>,
    pub media: Vec<ContentEntry>,
}

/// Aggregated content of one room.
#[derive(Debug, Clone, Serialize)]
pub struct RoomView {
    pub name: String,
    pub info: String,
    pub media: Vec<ContentEntry>,
    pub subfolders: Vec<SubfolderView>,
}
