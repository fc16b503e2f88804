//! GitHub Contents API backend for room-finder.
//!
//! Treats one repository as a path-addressed blob store: listings and reads
//! are `GET`s, writes are commits through `PUT`, deletes are commits through
//! `DELETE`. Blob `sha`s are the version tokens.

mod client;
mod config;
mod retry;
mod store;

pub use client::{error_for_status, ContentItem, Contents, GitHubClient, PutResult};
pub use config::{GitHubConfig, DEFAULT_API_URL};
pub use retry::RetryPolicy;
pub use store::{decode_content, GitHubContentStore};
