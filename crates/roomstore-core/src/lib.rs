//! Core traits and types for room-finder content stores.
//!
//! - `ContentStore`: path-addressed blob store with version tokens, plus the
//!   composite rename / tree-delete / tree-move operations built on it
//! - `RoomCatalog`: rooms, subfolders and media files on top of a store
//! - `MemoryContentStore`: in-process store
//! - `naming`: reserved names, ordinal allocation, extension mapping

mod catalog;
mod error;
mod memory;
pub mod naming;
mod store;
mod token;
mod types;

pub use catalog::RoomCatalog;
pub use error::StoreError;
pub use memory::MemoryContentStore;
pub use naming::{allocate_next_ordinal, extension_for_content_type, OrdinalScheme};
pub use store::ContentStore;
pub use token::content_sha;
pub use types::{
    Blob, ContentEntry, EntryKind, MediaKind, RoomView, SubfolderView, WriteOutcome,
};
