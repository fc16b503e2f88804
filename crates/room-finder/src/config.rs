use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use roomstore_core::{ContentStore, OrdinalScheme};
use roomstore_github::{GitHubConfig, GitHubContentStore, RetryPolicy, DEFAULT_API_URL};
use roomstore_local::LocalContentStore;

/// Where room content is stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// GitHub repository via the Contents API
    Github,
    /// Directory on disk (e.g. a checkout of the content repository)
    Local,
}

/// Configuration for the room-finder command line.
#[derive(Parser, Debug)]
#[command(name = "room-finder")]
#[command(about = "Search rooms and manage their content in a GitHub-backed room store")]
pub struct Config {
    /// Storage backend
    #[arg(long, value_enum, default_value = "github", env = "ROOMS_BACKEND")]
    pub backend: Backend,

    /// GitHub repository holding the rooms (owner/name)
    #[arg(long, env = "ROOMS_REPOSITORY")]
    pub repository: Option<String>,

    /// Branch to read and commit to (repository default when unset)
    #[arg(long, env = "ROOMS_BRANCH")]
    pub branch: Option<String>,

    /// GitHub access token; without one only public reads work
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// GitHub API root
    #[arg(long, default_value = DEFAULT_API_URL, env = "GITHUB_API_URL")]
    pub api_url: String,

    /// Directory holding the rooms, relative to the store root
    #[arg(long, default_value = "Rooms", env = "ROOMS_BASE_PATH")]
    pub base_path: String,

    /// Root directory for the local backend
    #[arg(long, default_value = ".", env = "ROOMS_LOCAL_ROOT")]
    pub local_root: PathBuf,

    /// How new media files are named: numeric (1, 2, ...) or alphabetic (a, b, ...)
    #[arg(long, default_value = "numeric", env = "ROOMS_ORDINAL_SCHEME")]
    pub ordinal_scheme: OrdinalScheme,

    /// Retries for rate-limited (429) and server-error (5xx) responses
    #[arg(long, default_value = "3", env = "ROOMS_MAX_RETRIES")]
    pub max_retries: u32,

    /// Delay before the first retry; doubles on each further retry
    #[arg(long, default_value = "500", env = "ROOMS_RETRY_BASE_DELAY_MS")]
    pub retry_base_delay_ms: u64,

    /// Password that unlocks the admin commands
    #[arg(long, env = "ROOMS_ADMIN_PASSWORD", hide_env_values = true)]
    pub admin_password: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Credentials for admin commands.
#[derive(Args, Debug, Clone, Default)]
pub struct AdminArgs {
    /// Admin password
    #[arg(long, env = "ROOMS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List rooms, optionally filtered by a case-insensitive search term
    Rooms {
        #[arg(long)]
        search: Option<String>,
    },
    /// Show a room's description, media and subfolders
    Show {
        room: String,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Create an empty room
    CreateRoom {
        room: String,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Replace the description of a room or subfolder
    SetInfo {
        room: String,
        #[arg(long)]
        subfolder: Option<String>,
        /// New description text
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        text: Option<String>,
        /// Read the new description from a file
        #[arg(long)]
        file: Option<PathBuf>,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Add a subfolder (access point) with its thumbnail
    AddSubfolder {
        room: String,
        name: String,
        /// Thumbnail image, stored as thumbnail.jpg
        #[arg(long)]
        thumbnail: PathBuf,
        /// Description text
        #[arg(long, default_value = "")]
        info: String,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Replace a subfolder's thumbnail
    SetThumbnail {
        room: String,
        subfolder: String,
        image: PathBuf,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Upload a media file under the next free name
    Upload {
        room: String,
        file: PathBuf,
        #[arg(long)]
        subfolder: Option<String>,
        /// Content type; guessed from the file extension when omitted
        #[arg(long)]
        content_type: Option<String>,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Rename a media file
    RenameFile {
        room: String,
        old_name: String,
        new_name: String,
        #[arg(long)]
        subfolder: Option<String>,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Rename a room (copies every file, then deletes the old room)
    RenameRoom {
        old_name: String,
        new_name: String,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Rename a subfolder (copies every file, then deletes the old subfolder)
    RenameSubfolder {
        room: String,
        old_name: String,
        new_name: String,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Delete a media file
    DeleteFile {
        room: String,
        name: String,
        #[arg(long)]
        subfolder: Option<String>,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Delete a subfolder and everything in it
    DeleteSubfolder {
        room: String,
        subfolder: String,
        #[command(flatten)]
        admin: AdminArgs,
    },
    /// Delete a room and everything in it
    DeleteRoom {
        room: String,
        #[command(flatten)]
        admin: AdminArgs,
    },
}

impl Command {
    /// Admin credentials if this command mutates the store.
    pub fn admin_args(&self) -> Option<&AdminArgs> {
        match self {
            Command::Rooms { .. } | Command::Show { .. } => None,
            Command::CreateRoom { admin, .. }
            | Command::SetInfo { admin, .. }
            | Command::AddSubfolder { admin, .. }
            | Command::SetThumbnail { admin, .. }
            | Command::Upload { admin, .. }
            | Command::RenameFile { admin, .. }
            | Command::RenameRoom { admin, .. }
            | Command::RenameSubfolder { admin, .. }
            | Command::DeleteFile { admin, .. }
            | Command::DeleteSubfolder { admin, .. }
            | Command::DeleteRoom { admin, .. } => Some(admin),
        }
    }
}

impl Config {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: Duration::from_millis(self.retry_base_delay_ms),
        }
    }

    /// Build the configured content store.
    pub fn build_store(&self) -> anyhow::Result<Arc<dyn ContentStore>> {
        match self.backend {
            Backend::Github => {
                let repository = self
                    .repository
                    .as_deref()
                    .context("--repository (ROOMS_REPOSITORY) is required for the github backend")?;

                let mut github = GitHubConfig::new(repository)
                    .with_api_url(self.api_url.as_str())
                    .with_retry(self.retry_policy());
                if let Some(token) = &self.github_token {
                    github = github.with_token(token.as_str());
                }
                if let Some(branch) = &self.branch {
                    github = github.with_branch(branch.as_str());
                }

                Ok(Arc::new(GitHubContentStore::new(github)?))
            }
            Backend::Local => Ok(Arc::new(LocalContentStore::new(self.local_root.clone()))),
        }
    }
}
